use super::fetch::fetch_pipelines;
use crate::calendar::{parse_offset, CalendarVariant, WorkDayCalendar};
use crate::classify::classify_deploys;
use crate::errors::AggregationError;
use crate::metrics::lead_time::{self, LeadTimeContext};
use crate::metrics::{
    change_failure_rate, deployment_frequency, mean_time_to_recovery, LeadTimeForChanges,
    MetricKind, MetricReport,
};
use crate::model::{DeployBucket, PipelineRef, TimeWindow};
use crate::observability::{provider_metrics, OperationTimer};
use crate::pool::WorkerPool;
use crate::providers::{ExecutionSource, SourceHost};
use crate::telemetry::{create_report_span, generate_correlation_id};
use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, Instrument};

fn default_timezone() -> String {
    "UTC".to_string()
}

/// One aggregation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRequest {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Fixed UTC offset used for calendar-day boundaries, e.g. `+08:00`
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default)]
    pub calendar: CalendarVariant,
    pub pipelines: Vec<PipelineRef>,
    #[serde(default = "MetricKind::all")]
    pub metrics: Vec<MetricKind>,
    #[serde(default)]
    pub consider_holidays: bool,
}

impl ReportRequest {
    pub fn window(&self) -> TimeWindow {
        TimeWindow::new(
            self.start_time.timestamp_millis(),
            self.end_time.timestamp_millis(),
        )
    }

    fn wants(&self, metric: MetricKind) -> bool {
        self.metrics.contains(&metric)
    }
}

/// Fetches, classifies and measures the pipelines of a [`ReportRequest`]
#[derive(Clone)]
pub struct ReportGenerator {
    executions: Arc<dyn ExecutionSource>,
    source_host: Option<Arc<dyn SourceHost>>,
    calendar: WorkDayCalendar,
    pool: WorkerPool,
    page_size: u32,
}

impl ReportGenerator {
    pub fn new(
        executions: Arc<dyn ExecutionSource>,
        source_host: Option<Arc<dyn SourceHost>>,
        calendar: WorkDayCalendar,
        pool: WorkerPool,
        page_size: u32,
    ) -> Self {
        Self {
            executions,
            source_host,
            calendar,
            pool,
            page_size: page_size.max(1),
        }
    }

    pub fn calendar(&self) -> &WorkDayCalendar {
        &self.calendar
    }

    /// Runs the whole request or fails it; partial reports are never returned.
    pub async fn generate(&self, request: &ReportRequest) -> Result<MetricReport, AggregationError> {
        let correlation_id = generate_correlation_id();
        let span = create_report_span(&correlation_id, request.pipelines.len());

        let result = self
            .generate_inner(request, correlation_id)
            .instrument(span.clone())
            .await;

        let _entered = span.enter();
        match &result {
            Ok(_) => provider_metrics().log_stats(),
            Err(err) => error!(status = err.status(), error = %err, "Report failed"),
        }
        result
    }

    async fn generate_inner(
        &self,
        request: &ReportRequest,
        correlation_id: String,
    ) -> Result<MetricReport, AggregationError> {
        let timer = OperationTimer::new("dora_report");
        let window = request.window();
        if window.end <= window.start {
            return Err(AggregationError::internal("report window ends before it starts"));
        }
        let tz = parse_offset(&request.timezone).ok_or_else(|| {
            AggregationError::internal(format!("unsupported timezone: {}", request.timezone))
        })?;

        let mut report = MetricReport {
            correlation_id,
            ..MetricReport::default()
        };
        if request.metrics.is_empty() || request.pipelines.is_empty() {
            info!("Nothing to measure");
            timer.finish();
            return Ok(report);
        }

        if !self.executions.verify_access().await? {
            return Err(AggregationError::PermissionDenied {
                status: 403,
                message: format!(
                    "{} token may not read the requested pipelines",
                    self.executions.provider()
                ),
            });
        }

        let fetched = fetch_pipelines(
            Arc::clone(&self.executions),
            &request.pipelines,
            window,
            self.page_size,
            &self.pool,
        )
        .await?;

        let classified: Vec<(PipelineRef, DeployBucket)> = fetched
            .into_iter()
            .map(|(pipeline, records)| {
                let bucket = classify_deploys(&pipeline.name, &records, &pipeline.step, &window);
                info!(
                    pipeline = %pipeline.name,
                    step = %pipeline.step,
                    passed = bucket.passed_count(),
                    failed = bucket.failed_count(),
                    "Deploys classified"
                );
                (pipeline, bucket)
            })
            .collect();
        let buckets: Vec<DeployBucket> = classified.iter().map(|(_, b)| b.clone()).collect();

        if request.wants(MetricKind::DeploymentFrequency) {
            let work_days = self
                .calendar
                .business_days_between(window.start, window.end, tz, request.calendar)
                .await?;
            report.deployment_frequency = Some(deployment_frequency::calculate(&buckets, work_days));
        }
        if request.wants(MetricKind::ChangeFailureRate) {
            report.change_failure_rate = Some(change_failure_rate::calculate(&buckets));
        }
        if request.wants(MetricKind::MeanTimeToRecovery) {
            report.mean_time_to_recovery = Some(mean_time_to_recovery::calculate(&buckets));
        }
        if request.wants(MetricKind::LeadTimeForChanges) {
            report.lead_time_for_changes =
                Some(self.lead_times(request, classified, tz).await?);
        }

        timer.finish();
        info!(pipelines = buckets.len(), "Report generated");
        Ok(report)
    }

    async fn lead_times(
        &self,
        request: &ReportRequest,
        classified: Vec<(PipelineRef, DeployBucket)>,
        tz: FixedOffset,
    ) -> Result<LeadTimeForChanges, AggregationError> {
        let host = self.source_host.clone().ok_or_else(|| {
            AggregationError::internal("lead time requested without a source host")
        })?;

        let tasks = classified.into_iter().map(|(pipeline, bucket)| {
            let host = Arc::clone(&host);
            let pool = self.pool.clone();
            let calendar = self.calendar.clone();
            let variant = request.calendar;
            let consider_holidays = request.consider_holidays;
            async move {
                if bucket.passed.is_empty() {
                    let empty = lead_time::summarize(&pipeline.name, &pipeline.step, Vec::new());
                    return Ok::<_, AggregationError>(empty);
                }

                let raw = pipeline.repository.as_deref().ok_or_else(|| {
                    AggregationError::internal(format!(
                        "pipeline {} has no repository to correlate",
                        pipeline.name
                    ))
                })?;
                let repository = pool.run(host.resolve_repository_full_name(raw)).await?;

                let ctx = Arc::new(LeadTimeContext {
                    host,
                    repository,
                    pool,
                    calendar,
                    tz,
                    variant,
                    consider_holidays,
                });
                let records = lead_time::collect_lead_times(ctx, &bucket.passed).await?;
                Ok::<_, AggregationError>(lead_time::summarize(
                    &pipeline.name,
                    &pipeline.step,
                    records,
                ))
            }
        });

        let pipelines = self.pool.join_all(tasks).await?;
        Ok(lead_time::calculate(pipelines))
    }
}
