use super::types::{MeanTimeToRecovery, PipelineMeanTimeToRecovery};
use crate::model::{DeployBucket, StepStatus, HOUR_MS};
use crate::rounding::{ratio, round_half_up};

const HOURS_PLACES: u32 = 1;

/// Time from the first failure of an incident to the next passing deploy.
pub fn calculate(buckets: &[DeployBucket]) -> MeanTimeToRecovery {
    let pipelines: Vec<PipelineMeanTimeToRecovery> = buckets
        .iter()
        .map(|bucket| {
            let (total_recovery_ms, recovery_count) = recoveries(bucket);
            let hours = if bucket.failed.is_empty() || recovery_count == 0 {
                0.0
            } else {
                ratio(
                    total_recovery_ms,
                    recovery_count as i64 * HOUR_MS,
                    HOURS_PLACES,
                )
            };
            PipelineMeanTimeToRecovery {
                name: bucket.pipeline_name.clone(),
                step: bucket.step.clone(),
                recovery_count,
                total_recovery_ms,
                hours,
            }
        })
        .collect();

    // Pipelines without incidents still count toward the mean.
    let average_hours = if pipelines.is_empty() {
        0.0
    } else {
        round_half_up(
            pipelines.iter().map(|p| p.hours).sum::<f64>() / pipelines.len() as f64,
            HOURS_PLACES,
        )
    };

    MeanTimeToRecovery {
        pipelines,
        average_hours,
    }
}

/// Total recovery time and number of closed incidents.
///
/// Deploys are walked in pipeline-creation order. The first failure opens an incident,
/// further failures leave it open, and the next pass closes it.
pub fn recoveries(bucket: &DeployBucket) -> (i64, usize) {
    if bucket.failed.is_empty() {
        return (0, 0);
    }

    let mut deploys: Vec<_> = bucket.passed.iter().chain(bucket.failed.iter()).collect();
    deploys.sort_by_key(|d| (d.pipeline_created_at, d.finished_at));

    let mut open_failure: Option<i64> = None;
    let mut total = 0;
    let mut count = 0;

    for deploy in deploys {
        match (deploy.status, open_failure) {
            (StepStatus::Failed, None) => open_failure = Some(deploy.pipeline_created_at),
            (StepStatus::Passed, Some(opened_at)) => {
                total += deploy.pipeline_created_at - opened_at;
                count += 1;
                open_failure = None;
            }
            _ => {}
        }
    }

    (total, count)
}
