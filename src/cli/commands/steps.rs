use super::{Command, Services};
use anyhow::Result;
use chrono::{DateTime, Utc};
use dora_metrics::model::{PipelineRef, TimeWindow};
use dora_metrics::orchestrator::collect_step_names;
use dora_metrics::{steps_until, DoraMetricsConfig, WorkerPool};
use std::sync::Arc;

pub struct StepsCommand {
    pub org: String,
    pub pipeline: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub until: Option<String>,
    pub branches: Vec<String>,
}

impl Command for StepsCommand {
    async fn execute(&self, config: &DoraMetricsConfig) -> Result<()> {
        let services = Services::new(config)?;
        let pipeline = PipelineRef {
            org_id: self.org.clone(),
            pipeline_id: self.pipeline.clone(),
            name: self.pipeline.clone(),
            step: self.until.clone().unwrap_or_default(),
            repository: None,
            branches: self.branches.clone(),
        };
        let window = TimeWindow::new(self.start.timestamp_millis(), self.end.timestamp_millis());

        let names = collect_step_names(
            Arc::new(services.buildkite(config)?),
            pipeline,
            window,
            config.buildkite.page_size,
            WorkerPool::new(config.workers.pool_size),
        )
        .await?;

        let names = match &self.until {
            Some(target) => steps_until(&names, target),
            None => names,
        };
        for name in names {
            println!("{name}");
        }
        Ok(())
    }
}
