use tracing::{info, warn};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Upstream call counters shared by every provider adapter
#[derive(Debug, Default)]
pub struct ProviderCallMetrics {
    pub total_requests: AtomicU64,
    pub pages_fetched: AtomicU64,
    pub errors: AtomicU64,
    pub holiday_years_loaded: AtomicU64,
}

impl ProviderCallMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_request(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_page(&self) {
        self.pages_fetched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
        warn!("Provider call failed");
    }

    pub fn record_holiday_load(&self) {
        self.holiday_years_loaded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_stats(&self) -> ProviderCallStats {
        ProviderCallStats {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            pages_fetched: self.pages_fetched.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            holiday_years_loaded: self.holiday_years_loaded.load(Ordering::Relaxed),
        }
    }

    pub fn log_stats(&self) {
        let stats = self.get_stats();
        info!(
            requests = stats.total_requests,
            pages = stats.pages_fetched,
            errors = stats.errors,
            holiday_years = stats.holiday_years_loaded,
            "Provider call metrics"
        );
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderCallStats {
    pub total_requests: u64,
    pub pages_fetched: u64,
    pub errors: u64,
    pub holiday_years_loaded: u64,
}

static PROVIDER_METRICS: std::sync::LazyLock<ProviderCallMetrics> =
    std::sync::LazyLock::new(ProviderCallMetrics::new);

pub fn provider_metrics() -> &'static ProviderCallMetrics {
    &PROVIDER_METRICS
}

/// Logs the elapsed time of an operation when finished
pub struct OperationTimer {
    operation: String,
    start: Instant,
}

impl OperationTimer {
    pub fn new(operation: &str) -> Self {
        Self {
            operation: operation.to_string(),
            start: Instant::now(),
        }
    }

    pub fn finish(self) {
        let duration = self.start.elapsed();
        info!(
            operation = %self.operation,
            duration_ms = duration.as_millis(),
            "Operation completed"
        );
    }
}
