//! Observability: structured logging, metrics and the status HTTP server

pub mod health;
pub mod logging;
pub mod metrics;

// Re-export for convenience
pub use health::StatusServer;
pub use logging::{init_default_logging, init_logging, LogFormat};
pub use metrics::{MetricsCollector, MetricsSnapshot};

// Span macros for structured logging
pub use logging::{lifecycle_span, request_span, worker_span};
