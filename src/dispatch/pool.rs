//! Bounded worker pool
//!
//! A fixed set of workers pulls from the shared task queue in FIFO order.
//! Each worker is a registered agent for as long as it runs and processes
//! one request at a time, so at most `pool_size` requests are in flight.

use crate::dispatch::execution::{execute, ExecutionContext};
use crate::dispatch::queue::TaskQueue;
use crate::dispatch::registry::AgentRegistry;
use crate::dispatch::store::ResultStore;
use crate::observability::metrics::MetricsCollector;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn, Instrument};
use uuid::Uuid;

/// Generate a worker identity of the form `agent-<8 hex chars>`
pub fn generate_agent_id() -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("agent-{}", &id[..8])
}

/// Running pool of queue workers
pub struct WorkerPool {
    agent_ids: Vec<String>,
    handles: Vec<JoinHandle<()>>,
    live: Arc<AtomicUsize>,
}

/// Keeps a worker registered and counted until its task ends, however it ends
struct WorkerGuard {
    agent_id: String,
    registry: AgentRegistry,
    live: Arc<AtomicUsize>,
}

impl WorkerGuard {
    fn new(agent_id: String, registry: AgentRegistry, live: Arc<AtomicUsize>) -> Self {
        live.fetch_add(1, Ordering::SeqCst);
        Self {
            agent_id,
            registry,
            live,
        }
    }
}

impl Drop for WorkerGuard {
    fn drop(&mut self) {
        self.registry.deregister(&self.agent_id);
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

impl WorkerPool {
    /// Register `size` workers and start them.
    ///
    /// Workers are registered and counted in `live` before this returns;
    /// each deregisters itself once the queue is closed and drained.
    pub fn spawn(
        size: usize,
        queue: TaskQueue,
        registry: AgentRegistry,
        ctx: ExecutionContext,
        live: Arc<AtomicUsize>,
    ) -> Self {
        let mut agent_ids = Vec::with_capacity(size);
        let mut handles = Vec::with_capacity(size);

        for _ in 0..size {
            let mut agent_id = generate_agent_id();
            while !registry.register(&agent_id) {
                agent_id = generate_agent_id();
            }

            let guard = WorkerGuard::new(agent_id.clone(), registry.clone(), Arc::clone(&live));
            let handle = tokio::spawn(run_worker(guard, queue.clone(), ctx.clone()));

            agent_ids.push(agent_id);
            handles.push(handle);
        }

        info!(pool_size = size, "Worker pool started");
        Self {
            agent_ids,
            handles,
            live,
        }
    }

    pub fn agent_ids(&self) -> &[String] {
        &self.agent_ids
    }

    pub fn size(&self) -> usize {
        self.handles.len()
    }

    /// Workers whose task has not exited yet
    pub fn live_workers(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    /// Wait for every worker to exit. The queue must be closed first.
    pub async fn join(self) {
        for handle in self.handles {
            if let Err(e) = handle.await {
                error!(error = %e, "Worker task failed");
            }
        }
    }
}

async fn run_worker(guard: WorkerGuard, queue: TaskQueue, ctx: ExecutionContext) {
    let span = crate::worker_span!(agent_id = %guard.agent_id);

    async move {
        debug!("Worker waiting for requests");

        while let Some(entry) = queue.dequeue().await {
            execute(&ctx, entry, &guard.agent_id).await;
        }

        info!("Worker stopped, queue closed");
        drop(guard);
    }
    .instrument(span)
    .await
}

/// Periodically drop results nobody claimed within `ttl`
pub fn spawn_eviction_task(
    store: ResultStore,
    metrics: Arc<MetricsCollector>,
    ttl: Duration,
    every: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.tick().await; // First tick completes immediately, skip it

        loop {
            interval.tick().await;

            let evicted = store.evict_older_than(ttl);
            if evicted > 0 {
                metrics.results_evicted(evicted as u64);
                warn!(
                    evicted,
                    ttl_secs = ttl.as_secs(),
                    remaining = store.len(),
                    "Evicted unclaimed results"
                );
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{VacancyRecord, VacancyRequest, VacancyResponse};
    use crate::testing::mocks::MockVacancySource;
    use tokio::time::timeout;

    fn context(source: MockVacancySource) -> ExecutionContext {
        ExecutionContext {
            source: Arc::new(source),
            store: ResultStore::new(),
            metrics: Arc::new(MetricsCollector::new()),
        }
    }

    #[test]
    fn test_agent_id_format() {
        let id = generate_agent_id();
        assert_eq!(id.len(), "agent-".len() + 8);
        assert!(id.starts_with("agent-"));
        assert!(id[6..].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[tokio::test]
    async fn test_workers_register_and_deregister() {
        let queue = TaskQueue::new();
        let registry = AgentRegistry::new();
        let live = Arc::new(AtomicUsize::new(0));
        let pool = WorkerPool::spawn(
            3,
            queue.clone(),
            registry.clone(),
            context(MockVacancySource::new()),
            Arc::clone(&live),
        );

        assert_eq!(pool.size(), 3);
        assert_eq!(pool.live_workers(), 3);
        assert_eq!(registry.count(), 3);
        for agent_id in pool.agent_ids() {
            assert!(registry.contains(agent_id));
        }

        queue.close();
        timeout(Duration::from_secs(1), pool.join())
            .await
            .expect("workers should stop after close");
        assert_eq!(registry.count(), 0);
        assert_eq!(live.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_pool_bounds_in_flight() {
        let source = MockVacancySource::with_vacancies(vec![VacancyRecord::new("a", "b", "c")])
            .with_delay(Duration::from_millis(30));
        let ctx = context(source.clone());
        let queue = TaskQueue::new();
        let pool = WorkerPool::spawn(
            2,
            queue.clone(),
            AgentRegistry::new(),
            ctx.clone(),
            Arc::new(AtomicUsize::new(0)),
        );

        let ids: Vec<Uuid> = (0..6).map(|_| Uuid::new_v4()).collect();
        for (n, id) in ids.iter().enumerate() {
            queue.enqueue(*id, VacancyRequest::new("q", n as i64 + 1));
        }
        queue.close();
        timeout(Duration::from_secs(2), pool.join())
            .await
            .expect("backlog should drain");

        assert_eq!(source.call_count(), 6);
        let metrics = ctx.metrics.get_metrics();
        assert_eq!(metrics.requests.processed, 6);
        assert!(metrics.requests.max_in_flight <= 2);
        for id in ids {
            assert!(ctx.store.contains(&id));
        }
    }

    #[tokio::test]
    async fn test_workers_survive_panicking_source() {
        let source = MockVacancySource::with_vacancies(vec![VacancyRecord::new("a", "b", "c")])
            .with_panicking_query("boom");
        let ctx = context(source);
        let queue = TaskQueue::new();
        let pool = WorkerPool::spawn(
            1,
            queue.clone(),
            AgentRegistry::new(),
            ctx.clone(),
            Arc::new(AtomicUsize::new(0)),
        );

        let panicked = Uuid::new_v4();
        let healthy = Uuid::new_v4();
        queue.enqueue(panicked, VacancyRequest::new("boom", 1));
        queue.enqueue(healthy, VacancyRequest::new("fine", 2));

        let store = ctx.store.clone();
        let outcome = store
            .await_result(healthy, Duration::from_secs(2), Duration::from_millis(10))
            .await;
        assert!(!outcome.is_timeout());
        assert_eq!(outcome.into_response().vacancies.len(), 1);
        assert_eq!(pool.live_workers(), 1);
        assert!(store.take(&panicked).unwrap().is_soft_failure());

        queue.close();
        timeout(Duration::from_secs(1), pool.join())
            .await
            .expect("worker should still stop cleanly");
    }

    #[tokio::test]
    async fn test_aborted_worker_is_not_counted() {
        let queue = TaskQueue::new();
        let registry = AgentRegistry::new();
        let live = Arc::new(AtomicUsize::new(0));
        let pool = WorkerPool::spawn(
            2,
            queue.clone(),
            registry.clone(),
            context(MockVacancySource::new()),
            Arc::clone(&live),
        );

        for handle in &pool.handles {
            handle.abort();
        }
        pool.join().await;

        assert_eq!(live.load(Ordering::SeqCst), 0);
        assert_eq!(registry.count(), 0);
    }

    #[tokio::test]
    async fn test_eviction_task_counts_evictions() {
        let store = ResultStore::new();
        let metrics = Arc::new(MetricsCollector::new());
        store.insert(VacancyResponse::completed(Uuid::new_v4(), 1, Vec::new()));

        let handle = spawn_eviction_task(
            store.clone(),
            metrics.clone(),
            Duration::from_millis(10),
            Duration::from_millis(20),
        );
        tokio::time::sleep(Duration::from_millis(80)).await;
        handle.abort();

        assert!(store.is_empty());
        assert_eq!(metrics.get_metrics().results.evicted, 1);
    }
}
