use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

/// Install JSON structured logging on stderr.
///
/// `RUST_LOG` wins over `default_level` when set. Stdout stays free for reports.
pub fn init_telemetry(default_level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(default_level))?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(true)
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .try_init()?;

    tracing::debug!("Telemetry initialized with structured logging");
    Ok(())
}

/// Generate a correlation ID for linking the calls of one report
pub fn generate_correlation_id() -> String {
    Uuid::new_v4().to_string()
}

/// Span wrapping every upstream call made for one aggregation request
pub fn create_report_span(correlation_id: &str, pipelines: usize) -> tracing::Span {
    tracing::info_span!(
        "dora_report",
        correlation.id = correlation_id,
        pipelines = pipelines
    )
}
