//! Mock implementations for testing
//!
//! Provides a scriptable `VacancySource` so the broker can be exercised
//! without reaching a real vacancy API.

use crate::protocol::VacancyRecord;
use crate::source::{FetchError, VacancySource};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Mock vacancy source for testing
#[derive(Debug, Default, Clone)]
pub struct MockVacancySource {
    pub vacancies: Vec<VacancyRecord>,
    pub per_query: HashMap<String, Vec<VacancyRecord>>,
    pub failing_queries: Vec<String>,
    pub panicking_queries: Vec<String>,
    pub should_fail: bool,
    pub delay: Option<Duration>,
    pub calls: Arc<AtomicUsize>,
    pub queries: Arc<Mutex<Vec<String>>>,
}

impl MockVacancySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the same list for every query
    pub fn with_vacancies(vacancies: Vec<VacancyRecord>) -> Self {
        Self {
            vacancies,
            ..Default::default()
        }
    }

    /// Fail every query with a network error
    pub fn with_failure() -> Self {
        Self {
            should_fail: true,
            ..Default::default()
        }
    }

    /// Sleep before answering each query
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Answer `query` with a dedicated list
    pub fn with_query_response<S: Into<String>>(
        mut self,
        query: S,
        vacancies: Vec<VacancyRecord>,
    ) -> Self {
        self.per_query.insert(query.into(), vacancies);
        self
    }

    /// Fail only for `query`
    pub fn with_failing_query<S: Into<String>>(mut self, query: S) -> Self {
        self.failing_queries.push(query.into());
        self
    }

    /// Panic inside `fetch` for `query`
    pub fn with_panicking_query<S: Into<String>>(mut self, query: S) -> Self {
        self.panicking_queries.push(query.into());
        self
    }

    /// Number of fetches started so far
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Queries in the order they reached the source
    pub fn received_queries(&self) -> Vec<String> {
        match self.queries.lock() {
            Ok(queries) => queries.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl VacancySource for MockVacancySource {
    fn name(&self) -> &str {
        "mock"
    }

    async fn fetch(&self, query: &str) -> Result<Vec<VacancyRecord>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut queries) = self.queries.lock() {
            queries.push(query.to_string());
        }

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.panicking_queries.iter().any(|q| q == query) {
            panic!("mock source panicked on {query:?}");
        }

        if self.should_fail || self.failing_queries.iter().any(|q| q == query) {
            return Err(FetchError::Network("Mock source failure".to_string()));
        }

        Ok(self
            .per_query
            .get(query)
            .cloned()
            .unwrap_or_else(|| self.vacancies.clone()))
    }
}

/// Build `count` distinct records titled `"{prefix} {n}"`
pub fn sample_vacancies(prefix: &str, count: usize) -> Vec<VacancyRecord> {
    (0..count)
        .map(|n| {
            VacancyRecord::new(
                format!("{prefix} {n}"),
                "Mock Co".to_string(),
                format!("https://example.com/vacancy/{n}"),
            )
        })
        .collect()
}
