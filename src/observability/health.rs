//! Status and health HTTP server
//!
//! Exposes the broker's status report, metrics and health probes over
//! HTTP for operators and container orchestration.

use crate::broker::VacancyBroker;
use crate::observability::metrics::current_timestamp;
use serde::Serialize;
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;
use warp::http::StatusCode;
use warp::Filter;

/// HTTP status server bound to one broker
pub struct StatusServer {
    broker: VacancyBroker,
    port: u16,
}

impl StatusServer {
    /// Create new status server
    pub fn new(broker: VacancyBroker, port: u16) -> Self {
        Self { broker, port }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Build the route tree
    pub fn routes(
        self: Arc<Self>,
    ) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
        let status_server = self.clone();
        let health_server = self.clone();
        let metrics_server = self.clone();
        let ready_server = self.clone();

        // GET /status - dispatcher status report
        let status_route = warp::path("status").and(warp::get()).and_then(move || {
            let server = status_server.clone();
            async move { Ok::<_, Infallible>(warp::reply::json(&server.broker.get_status())) }
        });

        // GET /health - overall health with individual checks
        let health_route = warp::path("health").and(warp::get()).and_then(move || {
            let server = health_server.clone();
            async move {
                let health = server.health_status();
                let status_code = if health.status == "healthy" {
                    StatusCode::OK
                } else {
                    StatusCode::SERVICE_UNAVAILABLE
                };
                Ok::<_, Infallible>(warp::reply::with_status(
                    warp::reply::json(&health),
                    status_code,
                ))
            }
        });

        // GET /metrics - complete metrics export
        let metrics_route = warp::path("metrics").and(warp::get()).and_then(move || {
            let server = metrics_server.clone();
            async move { Ok::<_, Infallible>(warp::reply::json(&server.broker.metrics_snapshot())) }
        });

        // GET /ready - readiness probe
        let ready_route = warp::path("ready").and(warp::get()).and_then(move || {
            let server = ready_server.clone();
            async move {
                let ready = server.broker.is_running();
                let response = ReadinessResponse {
                    ready,
                    timestamp: current_timestamp(),
                };
                let status_code = if ready {
                    StatusCode::OK
                } else {
                    StatusCode::SERVICE_UNAVAILABLE
                };
                Ok::<_, Infallible>(warp::reply::with_status(
                    warp::reply::json(&response),
                    status_code,
                ))
            }
        });

        // GET /live - liveness probe
        let live_route = warp::path("live").and(warp::get()).map(|| {
            warp::reply::json(&LivenessResponse {
                alive: true,
                timestamp: current_timestamp(),
            })
        });

        // GET / - endpoint index
        let root_route = warp::path::end().and(warp::get()).map(|| {
            let endpoints: HashMap<&str, &str> = [
                ("/status", "Dispatcher status report"),
                ("/health", "Overall health status with detailed checks"),
                ("/metrics", "Request counters and processing times"),
                ("/ready", "Readiness probe"),
                ("/live", "Liveness probe"),
            ]
            .into_iter()
            .collect();
            warp::reply::json(&ApiDocumentationResponse { endpoints })
        });

        status_route
            .or(health_route)
            .or(metrics_route)
            .or(ready_route)
            .or(live_route)
            .or(root_route)
    }

    /// Serve until the process exits
    pub async fn start(self: Arc<Self>) {
        let port = self.port;
        tracing::info!(port, "Starting status server");
        warp::serve(self.routes()).run(([0, 0, 0, 0], port)).await;
    }

    fn health_status(&self) -> HealthStatus {
        let now = current_timestamp();
        let status = self.broker.get_status();

        let mut checks = HashMap::new();
        checks.insert("broker".to_string(), self.check_running(now));
        checks.insert(
            "workers".to_string(),
            Self::check_workers(self.broker.live_workers(), now),
        );

        let overall_healthy = checks.values().all(|check| check.status == "healthy");

        HealthStatus {
            status: if overall_healthy {
                "healthy".to_string()
            } else {
                "degraded".to_string()
            },
            timestamp: now,
            broker_id: self.broker.config().broker.id.clone(),
            uptime_seconds: status.uptime,
            checks,
        }
    }

    fn check_running(&self, now: u64) -> HealthCheck {
        if self.broker.is_running() {
            HealthCheck::healthy("Broker is dispatching requests", now)
        } else {
            HealthCheck::unhealthy("Broker is not running", now)
        }
    }

    /// Only pool workers count; external agent registrations never process requests
    fn check_workers(live_workers: usize, now: u64) -> HealthCheck {
        if live_workers > 0 {
            HealthCheck::healthy(format!("{live_workers} pool workers running"), now)
        } else {
            HealthCheck::unhealthy("No pool workers running", now)
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthCheck {
    pub status: String,
    pub message: Option<String>,
    pub last_check: u64,
}

impl HealthCheck {
    fn healthy<S: Into<String>>(message: S, now: u64) -> Self {
        Self {
            status: "healthy".to_string(),
            message: Some(message.into()),
            last_check: now,
        }
    }

    fn unhealthy<S: Into<String>>(message: S, now: u64) -> Self {
        Self {
            status: "unhealthy".to_string(),
            message: Some(message.into()),
            last_check: now,
        }
    }
}

#[derive(Debug, Serialize)]
struct HealthStatus {
    status: String,
    timestamp: u64,
    broker_id: String,
    uptime_seconds: u64,
    checks: HashMap<String, HealthCheck>,
}

#[derive(Debug, Serialize)]
struct ReadinessResponse {
    ready: bool,
    timestamp: u64,
}

#[derive(Debug, Serialize)]
struct LivenessResponse {
    alive: bool,
    timestamp: u64,
}

#[derive(Debug, Serialize)]
struct ApiDocumentationResponse {
    endpoints: HashMap<&'static str, &'static str>,
}
