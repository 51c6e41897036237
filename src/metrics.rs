//! Metrics and observability for the analyzer

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use serde::{Deserialize, Serialize};

use crate::error::ErrorKind;
use crate::handler::BackendKind;

/// Analysis counters, shared between threads
pub struct Metrics {
    pub total_requests: AtomicU64,
    pub successful_requests: AtomicU64,
    pub failed_requests: AtomicU64,
    pub total_latency_ms: AtomicU64,

    // Per-backend counters
    pub imagemagick_count: AtomicU64,
    pub native_count: AtomicU64,

    // Per-failure counters
    pub not_analyzable_count: AtomicU64,
    pub malformed_output_count: AtomicU64,
    pub upstream_failure_count: AtomicU64,
    pub environment_error_count: AtomicU64,
}

impl Metrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            total_requests: AtomicU64::new(0),
            successful_requests: AtomicU64::new(0),
            failed_requests: AtomicU64::new(0),
            total_latency_ms: AtomicU64::new(0),
            imagemagick_count: AtomicU64::new(0),
            native_count: AtomicU64::new(0),
            not_analyzable_count: AtomicU64::new(0),
            malformed_output_count: AtomicU64::new(0),
            upstream_failure_count: AtomicU64::new(0),
            environment_error_count: AtomicU64::new(0),
        })
    }

    /// Record one analysis. `backend` is `None` when no backend was selected.
    pub fn record_request(&self, backend: Option<BackendKind>, outcome: Result<(), ErrorKind>, latency_ms: u64) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.total_latency_ms.fetch_add(latency_ms, Ordering::Relaxed);

        match backend {
            Some(BackendKind::ImageMagick) => self.imagemagick_count.fetch_add(1, Ordering::Relaxed),
            Some(BackendKind::Native) => self.native_count.fetch_add(1, Ordering::Relaxed),
            None => 0,
        };

        match outcome {
            Ok(()) => {
                self.successful_requests.fetch_add(1, Ordering::Relaxed);
            }
            Err(kind) => {
                self.failed_requests.fetch_add(1, Ordering::Relaxed);
                let counter = match kind {
                    ErrorKind::NotAnalyzable => &self.not_analyzable_count,
                    ErrorKind::MalformedOutput => &self.malformed_output_count,
                    ErrorKind::UpstreamFailure => &self.upstream_failure_count,
                    ErrorKind::Environment => &self.environment_error_count,
                };
                counter.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let total = self.total_requests.load(Ordering::Relaxed);
        let latency = self.total_latency_ms.load(Ordering::Relaxed);

        MetricsSnapshot {
            total_requests: total,
            successful_requests: self.successful_requests.load(Ordering::Relaxed),
            failed_requests: self.failed_requests.load(Ordering::Relaxed),
            avg_latency_ms: if total > 0 { latency / total } else { 0 },
            imagemagick_count: self.imagemagick_count.load(Ordering::Relaxed),
            native_count: self.native_count.load(Ordering::Relaxed),
            not_analyzable_count: self.not_analyzable_count.load(Ordering::Relaxed),
            malformed_output_count: self.malformed_output_count.load(Ordering::Relaxed),
            upstream_failure_count: self.upstream_failure_count.load(Ordering::Relaxed),
            environment_error_count: self.environment_error_count.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub avg_latency_ms: u64,
    pub imagemagick_count: u64,
    pub native_count: u64,
    pub not_analyzable_count: u64,
    pub malformed_output_count: u64,
    pub upstream_failure_count: u64,
    pub environment_error_count: u64,
}
