//! Vacancy broker service object
//!
//! `VacancyBroker` owns every piece of dispatcher state: the agent
//! registry, the task queue, the result store and the metrics collector.
//! It is built once at startup and shared by cloning; all clones see the
//! same state.

use crate::config::BrokerConfig;
use crate::dispatch::{
    spawn_eviction_task, AgentRegistry, ExecutionContext, ResultStore, TaskQueue, WorkerPool,
};
use crate::error::{BrokerError, BrokerResult};
use crate::observability::metrics::{MetricsCollector, MetricsSnapshot};
use crate::protocol::{
    RegistrationResponse, SystemStatus, VacancyRequest, VacancyResponse, STATUS_RUNNING,
};
use crate::source::VacancySource;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, Instrument};
use uuid::Uuid;

/// Background tasks owned by a started broker
struct BrokerTasks {
    pool: WorkerPool,
    eviction: JoinHandle<()>,
}

struct BrokerInner {
    config: BrokerConfig,
    registry: AgentRegistry,
    queue: TaskQueue,
    store: ResultStore,
    metrics: Arc<MetricsCollector>,
    source: Arc<dyn VacancySource>,
    live_workers: Arc<AtomicUsize>,
    started: AtomicBool,
    running: AtomicBool,
    tasks: Mutex<Option<BrokerTasks>>,
}

/// Request dispatcher with result rendezvous
#[derive(Clone)]
pub struct VacancyBroker {
    inner: Arc<BrokerInner>,
}

impl VacancyBroker {
    /// Build a broker from validated configuration and a vacancy source
    pub fn new(config: BrokerConfig, source: Arc<dyn VacancySource>) -> BrokerResult<Self> {
        config.validate()?;

        Ok(Self {
            inner: Arc::new(BrokerInner {
                config,
                registry: AgentRegistry::new(),
                queue: TaskQueue::new(),
                store: ResultStore::new(),
                metrics: Arc::new(MetricsCollector::new()),
                source,
                live_workers: Arc::new(AtomicUsize::new(0)),
                started: AtomicBool::new(false),
                running: AtomicBool::new(false),
                tasks: Mutex::new(None),
            }),
        })
    }

    /// Spawn the worker pool and the eviction task.
    ///
    /// A broker starts at most once; a second call fails with
    /// `AlreadyStarted`, including after `shutdown`.
    pub async fn start(&self) -> BrokerResult<()> {
        if self
            .inner
            .started
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(BrokerError::AlreadyStarted);
        }

        let config = &self.inner.config;
        let span = crate::lifecycle_span!(broker_id = %config.broker.id, event = "start");

        async {
            let ctx = ExecutionContext {
                source: Arc::clone(&self.inner.source),
                store: self.inner.store.clone(),
                metrics: Arc::clone(&self.inner.metrics),
            };

            let pool = WorkerPool::spawn(
                config.dispatcher.pool_size,
                self.inner.queue.clone(),
                self.inner.registry.clone(),
                ctx,
                Arc::clone(&self.inner.live_workers),
            );
            let eviction = spawn_eviction_task(
                self.inner.store.clone(),
                Arc::clone(&self.inner.metrics),
                config.result_ttl(),
                config.eviction_interval(),
            );

            *self.inner.tasks.lock().await = Some(BrokerTasks { pool, eviction });
            self.inner.running.store(true, Ordering::SeqCst);

            info!(
                pool_size = config.dispatcher.pool_size,
                source = self.inner.source.name(),
                request_timeout_secs = config.dispatcher.request_timeout_secs,
                "Broker started"
            );
        }
        .instrument(span)
        .await;

        Ok(())
    }

    /// Register an external agent identity. Idempotent, always succeeds.
    pub fn register_agent(&self, agent_id: &str) -> RegistrationResponse {
        self.inner.registry.register(agent_id);
        RegistrationResponse::success()
    }

    /// Remove an agent identity; returns whether it was registered
    pub fn deregister_agent(&self, agent_id: &str) -> bool {
        self.inner.registry.deregister(agent_id)
    }

    /// Enqueue a request without waiting for its result
    pub fn submit<S: Into<String>>(&self, query: S, user_id: i64) -> Uuid {
        let request_id = Uuid::new_v4();
        let request = VacancyRequest::new(query, user_id);

        debug!(
            request_id = %request_id,
            user_id,
            queue_size = self.inner.queue.size(),
            "Request submitted"
        );

        self.inner.metrics.request_received();
        self.inner.queue.enqueue(request_id, request);
        request_id
    }

    /// Submit a request and wait up to the configured timeout for its result
    pub async fn handle_request<S: Into<String>>(
        &self,
        query: S,
        user_id: i64,
    ) -> VacancyResponse {
        let request_id = self.submit(query, user_id);
        self.await_result(request_id, self.inner.config.request_timeout())
            .await
    }

    /// Wait for a result, returning the timeout sentinel if none arrives
    pub async fn await_result(&self, request_id: Uuid, timeout: Duration) -> VacancyResponse {
        let outcome = self
            .inner
            .store
            .await_result(request_id, timeout, self.inner.config.poll_interval())
            .await;

        if outcome.is_timeout() {
            self.inner.metrics.request_timed_out();
            info!(
                request_id = %request_id,
                timeout_ms = timeout.as_millis() as u64,
                "Request timed out, returning sentinel"
            );
        }

        outcome.into_response()
    }

    /// Take a finished result without waiting
    pub fn lookup_result(&self, request_id: Uuid) -> BrokerResult<VacancyResponse> {
        self.inner.store.lookup(&request_id)
    }

    /// Aggregate status counters
    pub fn get_status(&self) -> SystemStatus {
        SystemStatus {
            status: STATUS_RUNNING.to_string(),
            uptime: self.inner.metrics.uptime().as_secs(),
            active_agents: self.inner.registry.count(),
            queue_size: self.inner.queue.size(),
            processed_requests: self.inner.metrics.processed_requests(),
        }
    }

    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.inner.metrics.get_metrics()
    }

    /// Pool workers still running; external registrations are not counted
    pub fn live_workers(&self) -> usize {
        self.inner.live_workers.load(Ordering::SeqCst)
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    pub fn config(&self) -> &BrokerConfig {
        &self.inner.config
    }

    /// Number of unclaimed results currently stored
    pub fn pending_results(&self) -> usize {
        self.inner.store.len()
    }

    /// Stop accepting work from the queue and wait for workers to finish.
    ///
    /// Queued requests are drained before workers exit. Results already
    /// stored remain claimable.
    pub async fn shutdown(&self) -> BrokerResult<()> {
        let tasks = self
            .inner
            .tasks
            .lock()
            .await
            .take()
            .ok_or(BrokerError::NotRunning)?;

        let span = crate::lifecycle_span!(
            broker_id = %self.inner.config.broker.id,
            event = "shutdown"
        );

        async {
            info!(
                queue_size = self.inner.queue.size(),
                "Shutting down broker, draining queue"
            );
            self.inner.running.store(false, Ordering::SeqCst);
            self.inner.queue.close();

            tasks.eviction.abort();
            if let Err(e) = tasks.eviction.await {
                if !e.is_cancelled() {
                    error!("Eviction task shutdown error: {}", e);
                }
            }

            tasks.pool.join().await;
            info!("Broker shutdown complete");
        }
        .instrument(span)
        .await;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{VacancyRecord, SENTINEL_USER_ID};
    use crate::testing::mocks::MockVacancySource;

    fn broker(source: MockVacancySource) -> VacancyBroker {
        VacancyBroker::new(BrokerConfig::test_config(), Arc::new(source)).unwrap()
    }

    #[tokio::test]
    async fn test_start_twice_fails() {
        let broker = broker(MockVacancySource::new());

        broker.start().await.unwrap();
        assert!(matches!(
            broker.start().await,
            Err(BrokerError::AlreadyStarted)
        ));
        broker.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_before_start_fails() {
        let broker = broker(MockVacancySource::new());
        assert!(matches!(
            broker.shutdown().await,
            Err(BrokerError::NotRunning)
        ));
    }

    #[tokio::test]
    async fn test_invalid_config_rejected() {
        let mut config = BrokerConfig::test_config();
        config.dispatcher.pool_size = 0;

        let result = VacancyBroker::new(config, Arc::new(MockVacancySource::new()));
        assert!(matches!(result, Err(BrokerError::ConfigError(_))));
    }

    #[tokio::test]
    async fn test_status_reflects_pool_and_external_agents() {
        let broker = broker(MockVacancySource::new());
        broker.start().await.unwrap();

        broker.register_agent("bot-frontend");
        broker.register_agent("bot-frontend");

        let status = broker.get_status();
        assert_eq!(status.status, "running");
        assert_eq!(status.active_agents, 3);
        assert_eq!(broker.live_workers(), 2);
        assert_eq!(status.queue_size, 0);
        assert_eq!(status.processed_requests, 0);

        assert!(broker.deregister_agent("bot-frontend"));
        assert!(!broker.deregister_agent("bot-frontend"));
        broker.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_handle_request_round_trip() {
        let records = vec![VacancyRecord::new("Rust Dev", "Acme", "https://a")];
        let broker = broker(MockVacancySource::with_vacancies(records.clone()));
        broker.start().await.unwrap();

        let response = broker.handle_request("rust", 5).await;
        assert_eq!(response.vacancies, records);
        assert_eq!(response.user_id, 5);
        assert_eq!(broker.get_status().processed_requests, 1);

        broker.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_timeout_counts_but_does_not_process() {
        let broker = broker(MockVacancySource::new());

        // Not started, so nothing will ever complete
        let request_id = broker.submit("never", 3);
        let response = broker.await_result(request_id, Duration::ZERO).await;

        assert_eq!(response.user_id, SENTINEL_USER_ID);
        assert_eq!(broker.metrics_snapshot().requests.timed_out, 1);
        assert_eq!(broker.get_status().processed_requests, 0);
        assert_eq!(broker.get_status().queue_size, 1);
    }

    #[tokio::test]
    async fn test_unbounded_wait_returns_result() {
        let broker = broker(MockVacancySource::with_vacancies(vec![VacancyRecord::new(
            "Rust Dev", "Acme", "https://a",
        )]));
        broker.start().await.unwrap();

        let request_id = broker.submit("rust", 6);
        let response = broker.await_result(request_id, Duration::MAX).await;

        assert_eq!(response.user_id, 6);
        assert_eq!(response.vacancies.len(), 1);
        broker.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_drains_queue() {
        let broker = broker(MockVacancySource::new().with_delay(Duration::from_millis(20)));
        broker.start().await.unwrap();

        let ids: Vec<Uuid> = (1..=4).map(|n| broker.submit("q", n)).collect();
        broker.shutdown().await.unwrap();

        assert!(!broker.is_running());
        assert_eq!(broker.get_status().active_agents, 0);
        assert_eq!(broker.live_workers(), 0);
        for id in ids {
            assert!(broker.lookup_result(id).is_ok());
        }
    }
}
