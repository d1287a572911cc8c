//! Task queue
//!
//! Unbounded FIFO of requests awaiting assignment. Any number of workers
//! may wait on `dequeue`; each queued request is handed to exactly one.

use crate::protocol::{QueuedRequest, VacancyRequest};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::Notify;
use uuid::Uuid;

#[derive(Debug, Default)]
struct QueueInner {
    pending: Mutex<VecDeque<QueuedRequest>>,
    available: Notify,
    closed: AtomicBool,
}

/// Shared FIFO task queue
#[derive(Debug, Clone, Default)]
pub struct TaskQueue {
    inner: Arc<QueueInner>,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a request. Never blocks; requests enqueued after `close`
    /// are still accepted and drained by any remaining consumer.
    pub fn enqueue(&self, request_id: Uuid, request: VacancyRequest) {
        self.pending()
            .push_back(QueuedRequest::new(request_id, request));
        self.inner.available.notify_one();
    }

    /// Wait for the next request in FIFO order.
    ///
    /// Returns `None` once the queue is closed and fully drained.
    pub async fn dequeue(&self) -> Option<QueuedRequest> {
        loop {
            // Register interest before checking so a concurrent enqueue or
            // close between the check and the await is not lost.
            let notified = self.inner.available.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut pending = self.pending();
                if let Some(entry) = pending.pop_front() {
                    // Pass the wakeup on in case more work is waiting
                    if !pending.is_empty() {
                        self.inner.available.notify_one();
                    }
                    return Some(entry);
                }
                if self.is_closed() {
                    return None;
                }
            }

            notified.await;
        }
    }

    /// Number of pending requests
    pub fn size(&self) -> usize {
        self.pending().len()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Stop waiting consumers once the backlog is drained
    pub fn close(&self) {
        self.inner.closed.store(true, Ordering::SeqCst);
        self.inner.available.notify_waiters();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    fn pending(&self) -> MutexGuard<'_, VecDeque<QueuedRequest>> {
        match self.inner.pending.lock() {
            Ok(pending) => pending,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
