//! Broker message types
//!
//! This module defines the request, result and status structures that flow
//! between callers, the task queue, execution units and the result store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// User id carried by a timeout sentinel
pub const SENTINEL_USER_ID: i64 = 0;

/// Status string returned by every registration call
pub const REGISTRATION_SUCCESS: &str = "success";

/// Status string reported while the broker is serving requests
pub const STATUS_RUNNING: &str = "running";

/// A caller's search request
///
/// # Examples
/// ```
/// use vacancy_broker::protocol::VacancyRequest;
///
/// let request = VacancyRequest::new("rust developer", 42);
/// assert_eq!(request.user_id, 42);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VacancyRequest {
    /// Free-text search query handed to the vacancy source
    pub query: String,
    /// Identifier of the user that submitted the query
    pub user_id: i64,
}

impl VacancyRequest {
    pub fn new<S: Into<String>>(query: S, user_id: i64) -> Self {
        Self {
            query: query.into(),
            user_id,
        }
    }
}

/// A request waiting in the task queue
#[derive(Debug, Clone, PartialEq)]
pub struct QueuedRequest {
    pub request_id: Uuid,
    pub request: VacancyRequest,
    pub enqueued_at: DateTime<Utc>,
}

impl QueuedRequest {
    pub fn new(request_id: Uuid, request: VacancyRequest) -> Self {
        Self {
            request_id,
            request,
            enqueued_at: Utc::now(),
        }
    }
}

/// A single vacancy as produced by a vacancy source
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VacancyRecord {
    pub title: String,
    pub company: String,
    #[serde(default)]
    pub salary: Option<String>,
    pub url: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl VacancyRecord {
    pub fn new<S: Into<String>>(title: S, company: S, url: S) -> Self {
        Self {
            title: title.into(),
            company: company.into(),
            salary: None,
            url: url.into(),
            description: None,
        }
    }

    pub fn with_salary<S: Into<String>>(mut self, salary: S) -> Self {
        self.salary = Some(salary.into());
        self
    }

    pub fn with_description<S: Into<String>>(mut self, description: S) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Diagnostic tag recorded when a vacancy source failed
///
/// Only present on soft failures; a successful result never carries it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Network,
    Status,
    Decode,
    Timeout,
    /// The source panicked or its task was cancelled
    Internal,
}

/// Result delivered to the waiting caller
///
/// A response with `user_id == 0` is the timeout sentinel. A soft failure
/// has the caller's real `user_id`, no vacancies and a `failure` tag.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VacancyResponse {
    pub vacancies: Vec<VacancyRecord>,
    pub user_id: i64,
    pub request_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
}

impl VacancyResponse {
    /// Successful result for a completed request
    pub fn completed(request_id: Uuid, user_id: i64, vacancies: Vec<VacancyRecord>) -> Self {
        Self {
            vacancies,
            user_id,
            request_id,
            failure: None,
        }
    }

    /// Empty result recorded after the vacancy source failed
    pub fn soft_failure(request_id: Uuid, user_id: i64, kind: FailureKind) -> Self {
        Self {
            vacancies: Vec::new(),
            user_id,
            request_id,
            failure: Some(kind),
        }
    }

    /// Result returned to a caller whose wait elapsed
    pub fn timeout_sentinel(request_id: Uuid) -> Self {
        Self {
            vacancies: Vec::new(),
            user_id: SENTINEL_USER_ID,
            request_id,
            failure: None,
        }
    }

    /// True when this is the timeout sentinel rather than a real result
    pub fn is_timeout(&self) -> bool {
        self.user_id == SENTINEL_USER_ID
    }

    /// True when the vacancy source failed for this request
    pub fn is_soft_failure(&self) -> bool {
        self.failure.is_some()
    }
}

/// Response to an agent registration call
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegistrationResponse {
    pub status: String,
}

impl RegistrationResponse {
    pub fn success() -> Self {
        Self {
            status: REGISTRATION_SUCCESS.to_string(),
        }
    }
}

/// A registered worker identity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentInfo {
    pub agent_id: String,
    pub registered_at: DateTime<Utc>,
}

impl AgentInfo {
    pub fn new<S: Into<String>>(agent_id: S) -> Self {
        Self {
            agent_id: agent_id.into(),
            registered_at: Utc::now(),
        }
    }
}

/// Aggregated system status
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SystemStatus {
    pub status: String,
    /// Seconds since the broker was constructed
    pub uptime: u64,
    pub active_agents: usize,
    pub queue_size: usize,
    pub processed_requests: u64,
}
