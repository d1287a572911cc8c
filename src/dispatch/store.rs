//! Result store and rendezvous
//!
//! Execution units write each result once under its request id. Waiters
//! poll the store until the entry appears or their deadline passes; the
//! first reader removes the entry.

use crate::error::{BrokerError, BrokerResult};
use crate::protocol::VacancyResponse;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Debug)]
struct StoredResult {
    response: VacancyResponse,
    stored_at: Instant,
}

/// Outcome of waiting on the store
#[derive(Debug, Clone, PartialEq)]
pub enum WaitOutcome {
    Ready(VacancyResponse),
    TimedOut(VacancyResponse),
}

impl WaitOutcome {
    pub fn into_response(self) -> VacancyResponse {
        match self {
            WaitOutcome::Ready(response) | WaitOutcome::TimedOut(response) => response,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, WaitOutcome::TimedOut(_))
    }
}

/// Concurrent map of completed results keyed by request id
#[derive(Debug, Clone, Default)]
pub struct ResultStore {
    results: Arc<Mutex<HashMap<Uuid, StoredResult>>>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a completed result. Each request id is written once.
    pub fn insert(&self, response: VacancyResponse) {
        let request_id = response.request_id;
        let previous = self.results().insert(
            request_id,
            StoredResult {
                response,
                stored_at: Instant::now(),
            },
        );

        if previous.is_some() {
            warn!(request_id = %request_id, "Result overwritten for request");
        }
    }

    /// Remove and return the result if present
    pub fn take(&self, request_id: &Uuid) -> Option<VacancyResponse> {
        self.results()
            .remove(request_id)
            .map(|stored| stored.response)
    }

    /// Direct lookup with pop semantics; absent ids are an error
    pub fn lookup(&self, request_id: &Uuid) -> BrokerResult<VacancyResponse> {
        self.take(request_id)
            .ok_or_else(|| BrokerError::result_not_found(*request_id))
    }

    pub fn contains(&self, request_id: &Uuid) -> bool {
        self.results().contains_key(request_id)
    }

    /// Number of unclaimed results
    pub fn len(&self) -> usize {
        self.results().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Poll until the result for `request_id` appears or `timeout` elapses.
    ///
    /// On timeout the sentinel response (`user_id = 0`) is returned. The
    /// final sleep is clamped to the deadline, so a timeout is reported no
    /// earlier than `timeout` and no later than one poll interval after it.
    /// A timeout too large to represent as a deadline waits indefinitely.
    pub async fn await_result(
        &self,
        request_id: Uuid,
        timeout: Duration,
        poll_interval: Duration,
    ) -> WaitOutcome {
        let deadline = Instant::now().checked_add(timeout);

        loop {
            if let Some(response) = self.take(&request_id) {
                debug!(request_id = %request_id, "Result claimed by waiter");
                return WaitOutcome::Ready(response);
            }

            let pause = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        debug!(
                            request_id = %request_id,
                            timeout_ms = timeout.as_millis() as u64,
                            "Wait for result timed out"
                        );
                        return WaitOutcome::TimedOut(VacancyResponse::timeout_sentinel(
                            request_id,
                        ));
                    }
                    poll_interval.min(deadline - now)
                }
                None => poll_interval,
            };

            tokio::time::sleep(pause).await;
        }
    }

    /// Remove results stored longer than `ttl` ago; returns how many
    pub fn evict_older_than(&self, ttl: Duration) -> usize {
        let now = Instant::now();
        let mut results = self.results();
        let before = results.len();

        results.retain(|request_id, stored| {
            let keep = now.duration_since(stored.stored_at) < ttl;
            if !keep {
                debug!(request_id = %request_id, "Evicting unclaimed result");
            }
            keep
        });

        before - results.len()
    }

    fn results(&self) -> MutexGuard<'_, HashMap<Uuid, StoredResult>> {
        match self.results.lock() {
            Ok(results) => results,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
