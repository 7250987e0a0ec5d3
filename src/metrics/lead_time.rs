use super::types::{LeadTimeForChanges, PipelineLeadTime};
use crate::calendar::{CalendarVariant, WorkDayCalendar};
use crate::errors::AggregationError;
use crate::model::{DeployRecord, LeadTimeRecord, Millis, PullRequestRef, HOUR_MS};
use crate::pool::WorkerPool;
use crate::providers::SourceHost;
use crate::rounding::ratio;
use chrono::FixedOffset;
use std::sync::Arc;
use tracing::{debug, info};

const HOURS_PLACES: u32 = 2;

/// What a lead-time task needs besides the deploy itself
#[derive(Clone)]
pub struct LeadTimeContext {
    pub host: Arc<dyn SourceHost>,
    /// Canonical `owner/name` on the source host
    pub repository: String,
    pub pool: WorkerPool,
    pub calendar: WorkDayCalendar,
    pub tz: FixedOffset,
    pub variant: CalendarVariant,
    pub consider_holidays: bool,
}

/// One lead-time record per passed deploy, in input order.
///
/// Each deploy becomes its own task; the upstream calls inside it share the pool's
/// slots with every other fetch of the report.
pub async fn collect_lead_times(
    ctx: Arc<LeadTimeContext>,
    passed: &[DeployRecord],
) -> Result<Vec<LeadTimeRecord>, AggregationError> {
    let tasks = passed.iter().cloned().map(|deploy| {
        let ctx = Arc::clone(&ctx);
        async move { lead_time_task(&ctx, deploy).await }
    });

    let records = ctx.pool.join_all(tasks).await?;
    info!(
        repository = %ctx.repository,
        records = records.len(),
        no_merge = records.iter().filter(|r| r.is_no_merge()).count(),
        "Lead times collected"
    );
    Ok(records)
}

async fn lead_time_task(
    ctx: &LeadTimeContext,
    deploy: DeployRecord,
) -> Result<LeadTimeRecord, AggregationError> {
    let commit_id = deploy
        .commit_id
        .clone()
        .filter(|id| !id.is_empty())
        .ok_or_else(|| {
            AggregationError::internal(format!(
                "deploy #{} has no commit to correlate",
                deploy.run_number
            ))
        })?;

    let pulls = ctx
        .pool
        .run(ctx.host.fetch_pull_requests_for_commit(&ctx.repository, &commit_id))
        .await?;
    let merged = pulls.into_iter().find(|pr| pr.merged_at.is_some());

    let first_commit_at = match &merged {
        Some(pr) => ctx
            .pool
            .run(ctx.host.fetch_first_commit_of_pull_request(&ctx.repository, pr.number))
            .await?
            .and_then(|commit| commit.authored_at),
        None => None,
    };

    let mut record = lead_time_for(&deploy, commit_id, merged.as_ref(), first_commit_at);
    debug!(
        commit = %record.commit_id,
        pr = merged.as_ref().map(|pr| pr.number),
        total_ms = record.total_time,
        "Lead time computed"
    );

    if ctx.consider_holidays {
        apply_work_time(ctx, &mut record, deploy.started_at).await?;
    }

    record.total_work_days = Some(
        ctx.calendar
            .business_days_to_two_decimal_scale(
                change_started_at(&record, deploy.started_at),
                record.deploy_finished_at,
                ctx.tz,
                ctx.variant,
            )
            .await?,
    );

    Ok(record)
}

/// Raw wall-clock lead time of a deploy.
///
/// Without a merged pull request the whole lead time is the deploy step itself and the
/// PR delay is zero. Otherwise the PR delay runs from the first commit (or, when the
/// host does not know it, from PR creation) to the merge.
pub fn lead_time_for(
    deploy: &DeployRecord,
    commit_id: String,
    merged: Option<&PullRequestRef>,
    first_commit_at: Option<Millis>,
) -> LeadTimeRecord {
    let Some((pr, merged_at)) = merged.and_then(|pr| pr.merged_at.map(|at| (pr, at))) else {
        let total = deploy.finished_at - deploy.started_at;
        return LeadTimeRecord {
            commit_id,
            pr_created_at: None,
            pr_merged_at: None,
            first_commit_at: None,
            pipeline_created_at: deploy.pipeline_created_at,
            deploy_finished_at: deploy.finished_at,
            pr_delay: 0,
            pipeline_delay: total,
            total_time: total,
            total_work_days: None,
        };
    };

    let pr_delay = merged_at - first_commit_at.unwrap_or(pr.created_at);
    let pipeline_delay = deploy.finished_at - merged_at;

    LeadTimeRecord {
        commit_id,
        pr_created_at: Some(pr.created_at),
        pr_merged_at: Some(merged_at),
        first_commit_at,
        pipeline_created_at: deploy.pipeline_created_at,
        deploy_finished_at: deploy.finished_at,
        pr_delay,
        pipeline_delay,
        total_time: pr_delay + pipeline_delay,
        total_work_days: None,
    }
}

fn change_started_at(record: &LeadTimeRecord, deploy_started_at: Millis) -> Millis {
    record
        .first_commit_at
        .or(record.pr_created_at)
        .unwrap_or(deploy_started_at)
}

/// Replaces raw delays with boundary-inclusive work time.
async fn apply_work_time(
    ctx: &LeadTimeContext,
    record: &mut LeadTimeRecord,
    deploy_started_at: Millis,
) -> Result<(), AggregationError> {
    let work_time = |start: Millis, end: Millis| async move {
        ctx.calendar
            .work_time_and_holiday_between(start, end, ctx.tz, ctx.variant)
            .await
            .map(|info| info.work_time_ms)
    };

    match record.pr_merged_at {
        Some(merged_at) => {
            record.pr_delay = work_time(change_started_at(record, deploy_started_at), merged_at).await?;
            record.pipeline_delay = work_time(merged_at, record.deploy_finished_at).await?;
        }
        None => {
            record.pipeline_delay = work_time(deploy_started_at, record.deploy_finished_at).await?;
        }
    }
    record.total_time = record.pr_delay + record.pipeline_delay;
    Ok(())
}

fn average_hours(records: &[LeadTimeRecord], field: impl Fn(&LeadTimeRecord) -> i64) -> f64 {
    let total: i64 = records.iter().map(field).sum();
    ratio(total, records.len() as i64 * HOUR_MS, HOURS_PLACES)
}

/// Per-pipeline averages in hours.
pub fn summarize(name: &str, step: &str, records: Vec<LeadTimeRecord>) -> PipelineLeadTime {
    PipelineLeadTime {
        name: name.to_string(),
        step: step.to_string(),
        average_pr_delay_hours: average_hours(&records, |r| r.pr_delay),
        average_pipeline_delay_hours: average_hours(&records, |r| r.pipeline_delay),
        average_total_hours: average_hours(&records, |r| r.total_time),
        records,
    }
}

/// Report-level averages weigh every record equally, whichever pipeline it came from.
pub fn calculate(pipelines: Vec<PipelineLeadTime>) -> LeadTimeForChanges {
    let all: Vec<LeadTimeRecord> = pipelines
        .iter()
        .flat_map(|p| p.records.iter().cloned())
        .collect();

    LeadTimeForChanges {
        average_pr_delay_hours: average_hours(&all, |r| r.pr_delay),
        average_pipeline_delay_hours: average_hours(&all, |r| r.pipeline_delay),
        average_total_hours: average_hours(&all, |r| r.total_time),
        pipelines,
    }
}
