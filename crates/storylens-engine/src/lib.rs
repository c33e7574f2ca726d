//! Storyboard analysis orchestrator.
//!
//! This crate provides:
//! - The session state machine (`Idle → Analyzing → Capturing → Success`,
//!   with `Error` reachable from either in-flight state)
//! - The Gemini analyzer client behind the [`StoryboardAnalyzer`] seam
//! - Snapshot publishing for progressive thumbnail reveal
//! - Run-scoped logging and environment configuration

pub mod config;
pub mod error;
pub mod gemini;
pub mod logging;
pub mod session;

pub use config::EngineConfig;
pub use error::{EngineError, EngineResult, GENERIC_FAILURE_MESSAGE};
pub use gemini::{GeminiClient, StoryboardAnalyzer, DEFAULT_MODEL};
pub use logging::RunLogger;
pub use session::StoryboardSession;
