use super::types::{ChangeFailureRate, PipelineChangeFailureRate};
use crate::model::DeployBucket;
use crate::rounding::ratio;

const RATE_PLACES: u32 = 4;

/// Failed share of deploys per pipeline; the aggregate is weighted by run count
/// (`Σfailed / Σtotal`), not a mean of the per-pipeline rates.
pub fn calculate(buckets: &[DeployBucket]) -> ChangeFailureRate {
    let pipelines: Vec<PipelineChangeFailureRate> = buckets
        .iter()
        .map(|bucket| PipelineChangeFailureRate {
            name: bucket.pipeline_name.clone(),
            step: bucket.step.clone(),
            failed_count: bucket.failed_count(),
            total_count: bucket.total_runs(),
            rate: ratio(
                bucket.failed_count() as i64,
                bucket.total_runs() as i64,
                RATE_PLACES,
            ),
        })
        .collect();

    let (failed_total, runs_total) = pipelines
        .iter()
        .fold((0, 0), |(failed, total), p| (failed + p.failed_count, total + p.total_count));

    ChangeFailureRate {
        average_rate: ratio(failed_total as i64, runs_total as i64, RATE_PLACES),
        pipelines,
        failed_total,
        runs_total,
    }
}
