//! Request counters
//!
//! Coarse monitoring only. Counters use relaxed atomics: no update is lost,
//! but a snapshot taken during concurrent requests may be momentarily stale.

use sdk::types::MetricsSnapshot;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug)]
pub struct Metrics {
    requests: AtomicU64,
    errors: AtomicU64,
    model_version: String,
}

impl Metrics {
    pub fn new(model_version: impl Into<String>) -> Self {
        Self {
            requests: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            model_version: model_version.into(),
        }
    }

    pub fn record_request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Count one request, and one error if `result` failed
    pub fn observe<T, E>(&self, result: &Result<T, E>) {
        self.record_request();
        if result.is_err() {
            self.record_error();
        }
    }

    pub fn model_version(&self) -> &str {
        &self.model_version
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            request_count: self.requests.load(Ordering::Relaxed),
            error_count: self.errors.load(Ordering::Relaxed),
            model_version: self.model_version.clone(),
        }
    }
}
