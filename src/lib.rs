// dora-metrics library - delivery performance metrics from CI and source-host data
// This exposes the core components for testing and integration

pub mod calendar;
pub mod classify;
pub mod config;
pub mod errors;
pub mod http;
pub mod metrics;
pub mod model;
pub mod observability;
pub mod orchestrator;
pub mod pool;
pub mod providers;
pub mod rounding;
pub mod telemetry;

// Re-export key types for easy access
pub use calendar::{CalendarVariant, HolidayCache, WorkDayCalendar, WorkInfo};
pub use classify::{classify_deploys, steps_until};
pub use config::DoraMetricsConfig;
pub use errors::{AggregationError, FetchError};
pub use http::RateLimitedHttpClient;
pub use metrics::{MetricKind, MetricReport};
pub use observability::{provider_metrics, OperationTimer, ProviderCallMetrics};
pub use orchestrator::{ReportGenerator, ReportRequest};
pub use pool::WorkerPool;
pub use providers::{BuildkiteClient, ExecutionSource, GitHubSourceHost, SourceHost};
pub use telemetry::{generate_correlation_id, init_telemetry};
