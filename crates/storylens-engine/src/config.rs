//! Engine configuration.

/// Default analysis model.
pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Analysis model name
    pub model: String,
    /// Per-seek timeout for thumbnail capture
    pub seek_timeout_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            seek_timeout_secs: 30,
        }
    }
}

impl EngineConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            model: std::env::var("STORYLENS_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            seek_timeout_secs: std::env::var("STORYLENS_SEEK_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.seek_timeout_secs, 30);
    }
}
