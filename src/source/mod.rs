//! Vacancy source abstraction
//!
//! A vacancy source turns a free-text query into an ordered list of
//! vacancies. The broker treats every failure as a soft failure, so the
//! error type only needs to classify what went wrong.

pub mod hh;

pub use hh::{HhConfig, HhVacancySource};

use crate::protocol::{FailureKind, VacancyRecord};
use async_trait::async_trait;
use thiserror::Error;

/// Vacancy source trait for dependency injection and testing
#[async_trait]
pub trait VacancySource: Send + Sync {
    /// Source name used in logs (e.g., "hh")
    fn name(&self) -> &str;

    /// Fetch vacancies matching the query, in the order the source ranks them
    async fn fetch(&self, query: &str) -> Result<Vec<VacancyRecord>, FetchError>;
}

/// Vacancy source errors
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("Upstream returned status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("Invalid response: {0}")]
    Decode(String),
    #[error("Request timed out: {0}")]
    Timeout(String),
    #[error("Source task failed: {0}")]
    Internal(String),
}

impl FetchError {
    /// Diagnostic tag stored on the soft-failure result
    pub fn kind(&self) -> FailureKind {
        match self {
            FetchError::Network(_) => FailureKind::Network,
            FetchError::Status { .. } => FailureKind::Status,
            FetchError::Decode(_) => FailureKind::Decode,
            FetchError::Timeout(_) => FailureKind::Timeout,
            FetchError::Internal(_) => FailureKind::Internal,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            FetchError::Timeout(error.to_string())
        } else if error.is_decode() {
            FetchError::Decode(error.to_string())
        } else if let Some(status) = error.status() {
            FetchError::Status {
                status: status.as_u16(),
                message: error.to_string(),
            }
        } else {
            FetchError::Network(error.to_string())
        }
    }
}
