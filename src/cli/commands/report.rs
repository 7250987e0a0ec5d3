use super::{Command, Services};
use anyhow::{Context, Result};
use dora_metrics::{DoraMetricsConfig, ReportGenerator, ReportRequest, WorkerPool};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

pub struct ReportCommand {
    pub request: PathBuf,
    pub pretty: bool,
}

impl ReportCommand {
    pub fn new(request: PathBuf) -> Self {
        Self {
            request,
            pretty: false,
        }
    }

    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }
}

/// Reads a request as TOML when the extension says so, JSON otherwise.
pub fn read_request(path: &Path) -> Result<ReportRequest> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read request file {}", path.display()))?;

    let is_toml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let request = if is_toml {
        toml::from_str(&content).context("Invalid TOML request")?
    } else {
        serde_json::from_str(&content).context("Invalid JSON request")?
    };
    Ok(request)
}

impl Command for ReportCommand {
    async fn execute(&self, config: &DoraMetricsConfig) -> Result<()> {
        let request = read_request(&self.request)?;
        info!(
            pipelines = request.pipelines.len(),
            start = %request.start_time,
            end = %request.end_time,
            "Generating report"
        );

        let services = Services::new(config)?;
        let generator = ReportGenerator::new(
            Arc::new(services.buildkite(config)?),
            services.source_host(config)?,
            services.calendar.clone(),
            WorkerPool::new(config.workers.pool_size),
            config.buildkite.page_size,
        );

        let report = generator.generate(&request).await?;
        let output = if self.pretty {
            serde_json::to_string_pretty(&report)?
        } else {
            serde_json::to_string(&report)?
        };
        println!("{output}");
        Ok(())
    }
}
