//! Whole-report aggregation over in-memory providers

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use dora_metrics::calendar::StaticHolidays;
use dora_metrics::model::{
    CommitRef, ExecutionRecord, PipelineRef, PullRequestRef, StepRecord, StepStatus, TimeWindow,
    HOUR_MS,
};
use dora_metrics::providers::github::parse_repository_slug;
use dora_metrics::providers::{ExecutionPage, PaginationHint};
use dora_metrics::{
    AggregationError, CalendarVariant, ExecutionSource, FetchError, HolidayCache, MetricKind,
    ReportGenerator, ReportRequest, SourceHost, WorkDayCalendar, WorkerPool,
};
use std::collections::HashMap;
use std::sync::Arc;

// Monday 2024-06-03 00:00 UTC
const MON: i64 = 1_717_372_800_000;

struct FakeCi {
    runs: HashMap<String, Vec<ExecutionRecord>>,
    failure: Option<FetchError>,
    access: bool,
}

impl FakeCi {
    fn new(runs: Vec<(&str, Vec<ExecutionRecord>)>) -> Self {
        Self {
            runs: runs
                .into_iter()
                .map(|(id, records)| (id.to_string(), records))
                .collect(),
            failure: None,
            access: true,
        }
    }
}

#[async_trait]
impl ExecutionSource for FakeCi {
    fn provider(&self) -> &'static str {
        "fake-ci"
    }

    async fn fetch_execution_page(
        &self,
        pipeline: &PipelineRef,
        _page: u32,
        _page_size: u32,
        _window: &TimeWindow,
    ) -> Result<ExecutionPage, FetchError> {
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        Ok(ExecutionPage {
            records: self.runs.get(&pipeline.pipeline_id).cloned().unwrap_or_default(),
            hint: PaginationHint::Exhausted,
        })
    }

    async fn verify_access(&self) -> Result<bool, FetchError> {
        Ok(self.access)
    }
}

struct FakeHost;

#[async_trait]
impl SourceHost for FakeHost {
    async fn fetch_pull_requests_for_commit(
        &self,
        repository: &str,
        commit_id: &str,
    ) -> Result<Vec<PullRequestRef>, FetchError> {
        match (repository, commit_id) {
            ("acme/api", "abc") => Ok(vec![PullRequestRef {
                number: 12,
                created_at: MON + 9 * HOUR_MS,
                merged_at: Some(MON + 33 * HOUR_MS),
            }]),
            _ => Ok(vec![]),
        }
    }

    async fn fetch_first_commit_of_pull_request(
        &self,
        _repository: &str,
        pr_number: u64,
    ) -> Result<Option<CommitRef>, FetchError> {
        Ok((pr_number == 12).then(|| CommitRef {
            sha: "first".to_string(),
            authored_at: Some(MON + 8 * HOUR_MS),
        }))
    }

    async fn resolve_repository_full_name(&self, raw: &str) -> Result<String, FetchError> {
        parse_repository_slug(raw).ok_or_else(|| FetchError::status("fake-host", 404, raw))
    }
}

fn run(number: u64, commit: &str, created_at: i64, status: StepStatus) -> ExecutionRecord {
    ExecutionRecord {
        number,
        commit_id: Some(commit.to_string()),
        created_at,
        steps: vec![
            StepRecord {
                name: "build".to_string(),
                status: StepStatus::Passed,
                started_at: Some(created_at + 60_000),
                finished_at: Some(created_at + 20 * 60_000),
            },
            StepRecord {
                name: "deploy".to_string(),
                status,
                started_at: Some(created_at + 30 * 60_000),
                finished_at: Some(created_at + HOUR_MS),
            },
        ],
    }
}

fn pipeline(id: &str, repository: &str) -> PipelineRef {
    PipelineRef {
        org_id: "acme".to_string(),
        pipeline_id: id.to_string(),
        name: id.to_uppercase(),
        step: "deploy".to_string(),
        repository: Some(repository.to_string()),
        branches: vec![],
    }
}

fn calendar() -> WorkDayCalendar {
    let source = Arc::new(StaticHolidays::new(HashMap::new()));
    WorkDayCalendar::new(Arc::new(HolidayCache::new(source)))
}

fn generator(ci: FakeCi) -> ReportGenerator {
    ReportGenerator::new(
        Arc::new(ci),
        Some(Arc::new(FakeHost)),
        calendar(),
        WorkerPool::new(3),
        100,
    )
}

/// Mon 2024-06-03 .. Sat 2024-06-15: ten work days
fn request(pipelines: Vec<PipelineRef>) -> ReportRequest {
    ReportRequest {
        start_time: Utc.with_ymd_and_hms(2024, 6, 3, 0, 0, 0).unwrap(),
        end_time: Utc.with_ymd_and_hms(2024, 6, 15, 0, 0, 0).unwrap(),
        timezone: "UTC".to_string(),
        calendar: CalendarVariant::Regular,
        pipelines,
        metrics: MetricKind::all(),
        consider_holidays: false,
    }
}

fn two_pipelines() -> FakeCi {
    FakeCi::new(vec![
        ("api", vec![run(1, "abc", MON + 34 * HOUR_MS, StepStatus::Passed)]),
        ("web", vec![run(7, "def", MON + 2 * HOUR_MS, StepStatus::Failed)]),
    ])
}

#[tokio::test]
async fn test_report_covers_all_four_metrics() {
    let report = generator(two_pipelines())
        .generate(&request(vec![
            pipeline("api", "https://github.com/acme/api.git"),
            pipeline("web", "acme/web"),
        ]))
        .await
        .unwrap();

    assert!(!report.correlation_id.is_empty());

    let df = report.deployment_frequency.unwrap();
    assert_eq!(df.work_days, 10);
    assert_eq!(df.pipelines[0].frequency, 0.1);
    assert_eq!(df.pipelines[1].frequency, 0.0);
    assert_eq!(df.average_frequency, 0.05);
    assert_eq!(df.pipelines[0].daily[0].date, "06/04/2024");

    let cfr = report.change_failure_rate.unwrap();
    assert_eq!(cfr.pipelines[0].rate, 0.0);
    assert_eq!(cfr.pipelines[1].rate, 1.0);
    assert_eq!(cfr.average_rate, 0.5);

    let mttr = report.mean_time_to_recovery.unwrap();
    assert_eq!(mttr.average_hours, 0.0);

    let lead = report.lead_time_for_changes.unwrap();
    let record = &lead.pipelines[0].records[0];
    // first commit Mon 08:00, merged Tue 09:00, deploy finished Tue 11:00
    assert_eq!(record.pr_delay, 25 * HOUR_MS);
    assert_eq!(record.pipeline_delay, 2 * HOUR_MS);
    assert_eq!(record.total_time, 27 * HOUR_MS);
    assert_eq!(record.total_work_days, Some(1.13));
    assert!(lead.pipelines[1].records.is_empty());
    assert_eq!(lead.average_total_hours, 27.0);
}

#[tokio::test]
async fn test_mttr_pairs_first_failure_with_next_pass() {
    // failed, failed, passed, failed, passed, one hour apart
    let statuses = [
        StepStatus::Failed,
        StepStatus::Failed,
        StepStatus::Passed,
        StepStatus::Failed,
        StepStatus::Passed,
    ];
    let runs = statuses
        .iter()
        .enumerate()
        .map(|(i, status)| run(i as u64 + 1, "zzz", MON + i as i64 * HOUR_MS, *status))
        .collect();
    let mut req = request(vec![pipeline("api", "acme/api")]);
    req.metrics = vec![MetricKind::MeanTimeToRecovery];

    let report = generator(FakeCi::new(vec![("api", runs)]))
        .generate(&req)
        .await
        .unwrap();

    let mttr = report.mean_time_to_recovery.unwrap();
    assert_eq!(mttr.pipelines[0].recovery_count, 2);
    assert_eq!(mttr.pipelines[0].hours, 1.5);
    assert!(report.deployment_frequency.is_none());
    assert!(report.lead_time_for_changes.is_none());
}

#[tokio::test]
async fn test_unselected_lead_time_needs_no_source_host() {
    let mut req = request(vec![pipeline("api", "acme/api")]);
    req.metrics = vec![MetricKind::ChangeFailureRate];

    let generator = ReportGenerator::new(
        Arc::new(two_pipelines()),
        None,
        calendar(),
        WorkerPool::new(2),
        100,
    );
    let report = generator.generate(&req).await.unwrap();
    assert_eq!(report.change_failure_rate.unwrap().runs_total, 1);

    req.metrics = vec![MetricKind::LeadTimeForChanges];
    let err = generator.generate(&req).await.unwrap_err();
    assert!(matches!(err, AggregationError::InternalAggregationError(_)));
}

#[tokio::test]
async fn test_pipeline_without_deploys_needs_no_repository() {
    let ci = FakeCi::new(vec![
        ("api", vec![run(1, "abc", MON + 34 * HOUR_MS, StepStatus::Passed)]),
        ("idle", vec![]),
    ]);
    let mut idle = pipeline("idle", "unused");
    idle.repository = None;

    let mut req = request(vec![pipeline("api", "acme/api"), idle]);
    req.metrics = vec![MetricKind::LeadTimeForChanges];

    let lead = generator(ci)
        .generate(&req)
        .await
        .unwrap()
        .lead_time_for_changes
        .unwrap();
    assert_eq!(lead.pipelines.len(), 2);
    assert_eq!(lead.pipelines[0].records.len(), 1);
    assert_eq!(lead.pipelines[1].name, "IDLE");
    assert!(lead.pipelines[1].records.is_empty());
    assert_eq!(lead.average_total_hours, 27.0);
}

#[tokio::test]
async fn test_denied_token_fails_before_fetching() {
    let mut ci = two_pipelines();
    ci.access = false;
    ci.failure = Some(FetchError::status("fake-ci", 500, "must not be reached"));

    let err = generator(ci)
        .generate(&request(vec![pipeline("api", "acme/api")]))
        .await
        .unwrap_err();
    assert!(matches!(err, AggregationError::PermissionDenied { status: 403, .. }));
}

#[tokio::test]
async fn test_upstream_failure_fails_whole_report() {
    let mut ci = two_pipelines();
    ci.failure = Some(FetchError::status("fake-ci", 429, "slow down"));

    let err = generator(ci)
        .generate(&request(vec![pipeline("api", "acme/api"), pipeline("web", "acme/web")]))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        AggregationError::ServiceUnavailable {
            status: 429,
            message: "fake-ci responded with status 429: slow down".to_string(),
        }
    );
}

#[tokio::test]
async fn test_holidays_shorten_lead_time_over_weekend() {
    // Merged Fri 2024-06-07 09:00, deployed Mon 2024-06-10 around 10:00
    let friday = MON + 4 * 24 * HOUR_MS;
    let monday = MON + 7 * 24 * HOUR_MS;

    struct WeekendHost {
        merged_at: i64,
    }

    #[async_trait]
    impl SourceHost for WeekendHost {
        async fn fetch_pull_requests_for_commit(
            &self,
            _repository: &str,
            _commit_id: &str,
        ) -> Result<Vec<PullRequestRef>, FetchError> {
            Ok(vec![PullRequestRef {
                number: 5,
                created_at: self.merged_at - HOUR_MS,
                merged_at: Some(self.merged_at),
            }])
        }

        async fn fetch_first_commit_of_pull_request(
            &self,
            _repository: &str,
            _pr_number: u64,
        ) -> Result<Option<CommitRef>, FetchError> {
            Ok(None)
        }

        async fn resolve_repository_full_name(&self, raw: &str) -> Result<String, FetchError> {
            Ok(raw.to_string())
        }
    }

    let ci = FakeCi::new(vec![("api", vec![run(3, "abc", monday + 9 * HOUR_MS, StepStatus::Passed)])]);
    let mut req = request(vec![pipeline("api", "acme/api")]);
    req.metrics = vec![MetricKind::LeadTimeForChanges];
    req.consider_holidays = true;

    let generator = ReportGenerator::new(
        Arc::new(ci),
        Some(Arc::new(WeekendHost {
            merged_at: friday + 9 * HOUR_MS,
        })),
        calendar(),
        WorkerPool::new(2),
        100,
    );
    let lead = generator.generate(&req).await.unwrap().lead_time_for_changes.unwrap();
    let record = &lead.pipelines[0].records[0];

    assert_eq!(record.pr_delay, HOUR_MS);
    // Fri 09:00 .. Mon 10:00 is 73h wall clock, minus the weekend
    assert_eq!(record.pipeline_delay, 25 * HOUR_MS);
}

#[tokio::test]
async fn test_reports_are_deterministic() {
    let pipelines = vec![pipeline("api", "acme/api"), pipeline("web", "acme/web")];
    let generator = generator(two_pipelines());

    let mut first = generator.generate(&request(pipelines.clone())).await.unwrap();
    let mut second = generator.generate(&request(pipelines)).await.unwrap();
    assert_ne!(first.correlation_id, second.correlation_id);

    first.correlation_id.clear();
    second.correlation_id.clear();
    assert_eq!(first, second);
}
