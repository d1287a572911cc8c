//! Error types for the vacancy broker
//!
//! The three boundary operations (`register_agent`, `handle_request`,
//! `get_status`) never surface these; they are returned by lifecycle calls
//! and by the direct result lookup.

use thiserror::Error;
use uuid::Uuid;

/// Main error type for broker operations
#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("Broker already started")]
    AlreadyStarted,

    #[error("Broker is not running")]
    NotRunning,

    #[error("No result stored for request {request_id}")]
    ResultNotFound { request_id: Uuid },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Configuration error: {0}")]
    ConfigError(#[from] crate::config::ConfigError),
}

impl BrokerError {
    /// Create result not found error
    pub fn result_not_found(request_id: Uuid) -> Self {
        Self::ResultNotFound { request_id }
    }

    /// Create invalid input error
    pub fn invalid_input<S: Into<String>>(message: S) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }
}

/// Sanitize error messages before they reach logs
pub fn sanitize_error_message(message: &str) -> String {
    let mut sanitized = message.to_string();

    // Remove common secret patterns
    if let Ok(secrets) = regex::Regex::new(r"(?i)(password|token|key|secret)[=:]\s*\S+") {
        sanitized = secrets.replace_all(&sanitized, "${1}=***").to_string();
    }

    // Query strings can carry credentials for upstream APIs
    if let Ok(credentials) = regex::Regex::new(r"(?i)(https?://)[^/\s:@]+:[^/\s@]+@") {
        sanitized = credentials.replace_all(&sanitized, "${1}***@").to_string();
    }

    // Truncate very long messages - ensure total length is <= 500
    if sanitized.len() > 500 {
        let truncate_suffix = "...[truncated]";
        let mut cut = 500 - truncate_suffix.len();
        while !sanitized.is_char_boundary(cut) {
            cut -= 1;
        }
        sanitized = format!("{}{}", &sanitized[..cut], truncate_suffix);
    }

    sanitized
}

/// Result type for broker operations
pub type BrokerResult<T> = Result<T, BrokerError>;
