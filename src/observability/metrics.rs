//! Thread-safe metrics collection
//!
//! Atomic counters for request lifecycle events plus a bounded window of
//! processing times. Each broker owns its own collector.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Number of processing time samples kept for percentile calculation
const PROCESSING_TIME_WINDOW: usize = 1000;

/// Thread-safe metrics collector using atomics and a mutex-guarded window
pub struct MetricsCollector {
    requests_received: AtomicU64,
    requests_completed: AtomicU64,
    requests_soft_failed: AtomicU64,
    requests_timed_out: AtomicU64,
    results_evicted: AtomicU64,
    in_flight: AtomicU64,
    max_in_flight: AtomicU64,

    processing_times: Mutex<Vec<u64>>, // in milliseconds

    started: Instant,
    started_at: u64,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            requests_received: AtomicU64::new(0),
            requests_completed: AtomicU64::new(0),
            requests_soft_failed: AtomicU64::new(0),
            requests_timed_out: AtomicU64::new(0),
            results_evicted: AtomicU64::new(0),
            in_flight: AtomicU64::new(0),
            max_in_flight: AtomicU64::new(0),
            processing_times: Mutex::new(Vec::new()),
            started: Instant::now(),
            started_at: current_timestamp(),
        }
    }

    pub fn request_received(&self) {
        self.requests_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn execution_started(&self) {
        let now_in_flight = self.in_flight.fetch_add(1, Ordering::Relaxed) + 1;
        self.max_in_flight
            .fetch_max(now_in_flight, Ordering::Relaxed);
    }

    pub fn execution_completed(&self, duration: Duration) {
        self.requests_completed.fetch_add(1, Ordering::Relaxed);
        self.execution_finished(duration);
    }

    pub fn execution_soft_failed(&self, duration: Duration) {
        self.requests_soft_failed.fetch_add(1, Ordering::Relaxed);
        self.execution_finished(duration);
    }

    fn execution_finished(&self, duration: Duration) {
        // Saturate rather than wrap if a finish is recorded without a start
        let _ = self
            .in_flight
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| {
                Some(n.saturating_sub(1))
            });
        self.record_processing_time(duration);
    }

    pub fn request_timed_out(&self) {
        self.requests_timed_out.fetch_add(1, Ordering::Relaxed);
    }

    pub fn results_evicted(&self, count: u64) {
        self.results_evicted.fetch_add(count, Ordering::Relaxed);
    }

    fn record_processing_time(&self, duration: Duration) {
        if let Ok(mut times) = self.processing_times.lock() {
            times.push(duration.as_millis() as u64);

            if times.len() > PROCESSING_TIME_WINDOW {
                times.remove(0);
            }
        }
    }

    /// Requests that reached a terminal state (success or soft failure)
    pub fn processed_requests(&self) -> u64 {
        self.requests_completed.load(Ordering::Relaxed)
            + self.requests_soft_failed.load(Ordering::Relaxed)
    }

    pub fn uptime(&self) -> Duration {
        self.started.elapsed()
    }

    /// Calculate processing time statistics (pure function)
    fn calculate_processing_time_statistics(&self) -> (f64, f64, f64, f64) {
        if let Ok(times) = self.processing_times.lock() {
            if times.is_empty() {
                (0.0, 0.0, 0.0, 0.0)
            } else {
                let mut sorted_times = times.clone();
                sorted_times.sort_unstable();

                let avg = sorted_times.iter().sum::<u64>() as f64 / sorted_times.len() as f64;
                let p50 = percentile(&sorted_times, 50.0);
                let p95 = percentile(&sorted_times, 95.0);
                let p99 = percentile(&sorted_times, 99.0);

                (avg, p50, p95, p99)
            }
        } else {
            (0.0, 0.0, 0.0, 0.0)
        }
    }

    /// Get complete metrics snapshot
    pub fn get_metrics(&self) -> MetricsSnapshot {
        let (avg_processing_time_ms, p50, p95, p99) = self.calculate_processing_time_statistics();

        MetricsSnapshot {
            requests: RequestMetrics {
                received: self.requests_received.load(Ordering::Relaxed),
                completed: self.requests_completed.load(Ordering::Relaxed),
                soft_failed: self.requests_soft_failed.load(Ordering::Relaxed),
                timed_out: self.requests_timed_out.load(Ordering::Relaxed),
                processed: self.processed_requests(),
                in_flight: self.in_flight.load(Ordering::Relaxed),
                max_in_flight: self.max_in_flight.load(Ordering::Relaxed),
                avg_processing_time_ms,
                processing_time_p50_ms: p50,
                processing_time_p95_ms: p95,
                processing_time_p99_ms: p99,
            },
            results: ResultMetrics {
                evicted: self.results_evicted.load(Ordering::Relaxed),
            },
            uptime_seconds: self.uptime().as_secs(),
            started_at: self.started_at,
            timestamp: current_timestamp(),
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub requests: RequestMetrics,
    pub results: ResultMetrics,
    pub uptime_seconds: u64,
    pub started_at: u64,
    pub timestamp: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RequestMetrics {
    pub received: u64,
    pub completed: u64,
    pub soft_failed: u64,
    pub timed_out: u64,
    pub processed: u64,
    pub in_flight: u64,
    pub max_in_flight: u64,
    pub avg_processing_time_ms: f64,
    pub processing_time_p50_ms: f64,
    pub processing_time_p95_ms: f64,
    pub processing_time_p99_ms: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResultMetrics {
    pub evicted: u64,
}

pub(crate) fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

fn percentile(sorted_data: &[u64], percentile: f64) -> f64 {
    if sorted_data.is_empty() {
        return 0.0;
    }

    let len = sorted_data.len();
    let index = (percentile / 100.0) * (len - 1) as f64;

    if index.fract() == 0.0 {
        sorted_data[index as usize] as f64
    } else {
        let lower_index = index.floor() as usize;
        let upper_index = index.ceil() as usize;
        let lower_value = sorted_data[lower_index] as f64;
        let upper_value = sorted_data[upper_index] as f64;

        lower_value + (upper_value - lower_value) * index.fract()
    }
}
