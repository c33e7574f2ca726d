//! Run-scoped logging.
//!
//! Gives every analysis run a stable id so its lifecycle events can be
//! correlated across the session log.

use tracing::{error, info};
use uuid::Uuid;

/// Logger for one analysis run.
#[derive(Debug, Clone)]
pub struct RunLogger {
    run_id: String,
    operation: String,
}

impl RunLogger {
    /// Create a new run logger for an operation (e.g. "storyboard_analysis").
    pub fn new(operation: &str) -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
            operation: operation.to_string(),
        }
    }

    /// Log the start of the run.
    pub fn log_start(&self, message: &str) {
        info!(
            run_id = %self.run_id,
            operation = %self.operation,
            "Run started: {}", message
        );
    }

    /// Log a progress update.
    pub fn log_progress(&self, message: &str) {
        info!(
            run_id = %self.run_id,
            operation = %self.operation,
            "Run progress: {}", message
        );
    }

    /// Log a run failure.
    pub fn log_error(&self, message: &str) {
        error!(
            run_id = %self.run_id,
            operation = %self.operation,
            "Run failed: {}", message
        );
    }

    /// Log run completion.
    pub fn log_completion(&self, message: &str) {
        info!(
            run_id = %self.run_id,
            operation = %self.operation,
            "Run completed: {}", message
        );
    }

    /// Get the run id.
    pub fn run_id(&self) -> &str {
        &self.run_id
    }
}
