//! # Observability Configuration
//!
//! Environment-specific logging settings.

use crate::errors::{AppError, AppResult};

const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Output format of the tracing subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Some(LogFormat::Json),
            "pretty" => Some(LogFormat::Pretty),
            _ => None,
        }
    }
}

/// Observability configuration for different environments
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    /// Environment name (development, staging, production)
    pub environment: String,
    /// Log level for this crate
    pub log_level: String,
    /// Subscriber output format
    pub log_format: LogFormat,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            log_level: "info".to_string(),
            log_format: LogFormat::Json,
        }
    }
}

impl ObservabilityConfig {
    /// Load configuration from any key/value source
    ///
    /// An unrecognized `LOG_FORMAT` falls back to JSON.
    pub fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Self {
        Self {
            environment: lookup("ENVIRONMENT").unwrap_or_else(|| "development".to_string()),
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            log_format: lookup("LOG_FORMAT")
                .and_then(|value| LogFormat::parse(&value))
                .unwrap_or(LogFormat::Json),
        }
    }

    /// Check if running in development environment
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// Pretty output in development or when explicitly requested
    pub fn use_pretty_output(&self) -> bool {
        self.is_development() || self.log_format == LogFormat::Pretty
    }

    /// Validate configuration
    pub fn validate(&self) -> AppResult<()> {
        if self.environment.trim().is_empty() {
            return Err(AppError::Config("ENVIRONMENT cannot be empty".to_string()));
        }

        if !VALID_LOG_LEVELS.contains(&self.log_level.to_ascii_lowercase().as_str()) {
            return Err(AppError::Config(format!(
                "Invalid log level '{}', expected one of {}",
                self.log_level,
                VALID_LOG_LEVELS.join(", ")
            )));
        }

        Ok(())
    }
}
