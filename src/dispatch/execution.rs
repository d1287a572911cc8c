//! Execution unit
//!
//! Runs one queued request end to end: fetch from the vacancy source,
//! flatten the outcome into a response, store it and count it. Source
//! failures become empty results; nothing is retried or propagated.
//!
//! The fetch runs in its own task so a panicking source fails only the
//! request it was serving, not the worker that dequeued it.

use crate::dispatch::store::ResultStore;
use crate::error::sanitize_error_message;
use crate::observability::metrics::MetricsCollector;
use crate::protocol::{QueuedRequest, VacancyRecord, VacancyResponse};
use crate::source::{FetchError, VacancySource};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinError;
use tracing::{error, info, warn, Instrument};
use uuid::Uuid;

/// Internal outcome of a fetch, before flattening
pub type ExecutionOutcome = Result<Vec<VacancyRecord>, FetchError>;

/// Shared handles an execution unit needs
#[derive(Clone)]
pub struct ExecutionContext {
    pub source: Arc<dyn VacancySource>,
    pub store: ResultStore,
    pub metrics: Arc<MetricsCollector>,
}

/// Flatten an outcome into the response shape delivered to callers (pure function)
pub fn flatten_outcome(
    request_id: Uuid,
    user_id: i64,
    outcome: ExecutionOutcome,
) -> VacancyResponse {
    match outcome {
        Ok(vacancies) => VacancyResponse::completed(request_id, user_id, vacancies),
        Err(e) => VacancyResponse::soft_failure(request_id, user_id, e.kind()),
    }
}

/// Run the source fetch in a separate task, mapping a panic to `FetchError::Internal`
async fn fetch_isolated(ctx: &ExecutionContext, query: &str) -> ExecutionOutcome {
    let source = Arc::clone(&ctx.source);
    let query = query.to_string();

    let fetch = async move { source.fetch(&query).await }.instrument(tracing::Span::current());

    match tokio::spawn(fetch).await {
        Ok(outcome) => outcome,
        Err(e) => {
            let message = join_error_message(e);
            error!(
                source = ctx.source.name(),
                error = %sanitize_error_message(&message),
                "Vacancy source task failed"
            );
            Err(FetchError::Internal(message))
        }
    }
}

fn join_error_message(error: JoinError) -> String {
    if !error.is_panic() {
        return error.to_string();
    }

    let payload = error.into_panic();
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("source panicked: {message}")
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("source panicked: {message}")
    } else {
        "source panicked".to_string()
    }
}

/// Process a single request and store its result
pub async fn execute(ctx: &ExecutionContext, entry: QueuedRequest, agent_id: &str) {
    let QueuedRequest {
        request_id,
        request,
        ..
    } = entry;

    let span = crate::request_span!(
        request_id = %request_id,
        user_id = request.user_id,
        agent_id = %agent_id
    );

    async move {
        let started = Instant::now();
        ctx.metrics.execution_started();

        let outcome = fetch_isolated(ctx, &request.query).await;
        let elapsed = started.elapsed();

        match &outcome {
            Ok(vacancies) => {
                info!(
                    source = ctx.source.name(),
                    vacancies = vacancies.len(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Request processed"
                );
            }
            Err(e) => {
                warn!(
                    source = ctx.source.name(),
                    error = %sanitize_error_message(&e.to_string()),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Vacancy source failed, storing empty result"
                );
            }
        }

        let response = flatten_outcome(request_id, request.user_id, outcome);
        let soft_failure = response.is_soft_failure();
        ctx.store.insert(response);

        if soft_failure {
            ctx.metrics.execution_soft_failed(elapsed);
        } else {
            ctx.metrics.execution_completed(elapsed);
        }
    }
    .instrument(span)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{FailureKind, VacancyRequest};
    use crate::testing::mocks::MockVacancySource;

    fn context(source: MockVacancySource) -> ExecutionContext {
        ExecutionContext {
            source: Arc::new(source),
            store: ResultStore::new(),
            metrics: Arc::new(MetricsCollector::new()),
        }
    }

    #[test]
    fn test_flatten_success() {
        let request_id = Uuid::new_v4();
        let vacancies = vec![VacancyRecord::new("A", "B", "C")];

        let response = flatten_outcome(request_id, 9, Ok(vacancies.clone()));
        assert_eq!(response.vacancies, vacancies);
        assert_eq!(response.failure, None);
    }

    #[test]
    fn test_flatten_failure_is_empty_with_kind() {
        let response = flatten_outcome(
            Uuid::new_v4(),
            9,
            Err(FetchError::Timeout("slow".to_string())),
        );
        assert!(response.vacancies.is_empty());
        assert_eq!(response.user_id, 9);
        assert_eq!(response.failure, Some(FailureKind::Timeout));
    }

    #[tokio::test]
    async fn test_execute_stores_result_and_counts() {
        let records = vec![
            VacancyRecord::new("First", "Acme", "u1"),
            VacancyRecord::new("Second", "Acme", "u2"),
        ];
        let ctx = context(MockVacancySource::with_vacancies(records.clone()));
        let request_id = Uuid::new_v4();

        execute(
            &ctx,
            QueuedRequest::new(request_id, VacancyRequest::new("python", 42)),
            "agent-test",
        )
        .await;

        let response = ctx.store.take(&request_id).unwrap();
        assert_eq!(response.vacancies, records);
        assert_eq!(response.user_id, 42);
        assert_eq!(ctx.metrics.processed_requests(), 1);
    }

    #[tokio::test]
    async fn test_execute_soft_failure_still_counts() {
        let ctx = context(MockVacancySource::with_failure());
        let request_id = Uuid::new_v4();

        execute(
            &ctx,
            QueuedRequest::new(request_id, VacancyRequest::new("x", 7)),
            "agent-test",
        )
        .await;

        let response = ctx.store.take(&request_id).unwrap();
        assert!(response.vacancies.is_empty());
        assert_eq!(response.user_id, 7);
        assert!(response.is_soft_failure());
        assert_eq!(ctx.metrics.processed_requests(), 1);
        assert_eq!(ctx.metrics.get_metrics().requests.soft_failed, 1);
    }

    #[tokio::test]
    async fn test_panicking_source_stores_internal_failure() {
        let ctx = context(MockVacancySource::new().with_panicking_query("boom"));
        let request_id = Uuid::new_v4();

        execute(
            &ctx,
            QueuedRequest::new(request_id, VacancyRequest::new("boom", 11)),
            "agent-test",
        )
        .await;

        let response = ctx.store.take(&request_id).unwrap();
        assert!(response.vacancies.is_empty());
        assert_eq!(response.user_id, 11);
        assert_eq!(response.failure, Some(FailureKind::Internal));
        assert_eq!(ctx.metrics.processed_requests(), 1);
    }
}
