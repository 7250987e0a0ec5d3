use super::types::{DailyDeploymentCount, DeploymentFrequency, PipelineDeploymentFrequency};
use crate::model::{DeployBucket, DeployRecord};
use chrono::{DateTime, NaiveDate};
use std::collections::BTreeMap;

/// Passed deploys per work day, per pipeline and averaged across pipelines.
pub fn calculate(buckets: &[DeployBucket], work_days: i64) -> DeploymentFrequency {
    let pipelines: Vec<PipelineDeploymentFrequency> = buckets
        .iter()
        .map(|bucket| {
            let passed_count = bucket.passed_count();
            let frequency = if work_days > 0 && passed_count > 0 {
                passed_count as f64 / work_days as f64
            } else {
                0.0
            };
            PipelineDeploymentFrequency {
                name: bucket.pipeline_name.clone(),
                step: bucket.step.clone(),
                passed_count,
                frequency,
                daily: daily_counts(&bucket.passed),
            }
        })
        .collect();

    let average_frequency = if pipelines.is_empty() {
        0.0
    } else {
        pipelines.iter().map(|p| p.frequency).sum::<f64>() / pipelines.len() as f64
    };

    DeploymentFrequency {
        work_days,
        pipelines,
        average_frequency,
    }
}

/// Passed deploys grouped by their UTC finish date, oldest first.
pub fn daily_counts(passed: &[DeployRecord]) -> Vec<DailyDeploymentCount> {
    let mut per_day: BTreeMap<NaiveDate, u32> = BTreeMap::new();
    for deploy in passed {
        if let Some(finished) = DateTime::from_timestamp_millis(deploy.finished_at) {
            *per_day.entry(finished.date_naive()).or_insert(0) += 1;
        }
    }

    per_day
        .into_iter()
        .map(|(date, count)| DailyDeploymentCount {
            date: date.format("%m/%d/%Y").to_string(),
            count,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{StepStatus, DAY_MS};

    fn passed_at(finished_at: i64) -> DeployRecord {
        DeployRecord {
            run_number: 1,
            pipeline_created_at: finished_at - 1000,
            started_at: finished_at - 500,
            finished_at,
            commit_id: None,
            status: StepStatus::Passed,
        }
    }

    fn bucket(name: &str, passed: Vec<DeployRecord>) -> DeployBucket {
        DeployBucket {
            pipeline_name: name.to_string(),
            step: "deploy".to_string(),
            passed,
            failed: Vec::new(),
        }
    }

    #[test]
    fn aggregate_is_mean_of_pipelines() {
        let buckets = vec![bucket("a", vec![passed_at(DAY_MS)]), bucket("b", vec![])];
        let result = calculate(&buckets, 10);

        assert_eq!(result.pipelines[0].frequency, 0.1);
        assert_eq!(result.pipelines[1].frequency, 0.0);
        assert_eq!(result.average_frequency, 0.05);
    }

    #[test]
    fn zero_work_days_yield_zero() {
        let buckets = vec![bucket("a", vec![passed_at(DAY_MS), passed_at(2 * DAY_MS)])];
        let result = calculate(&buckets, 0);
        assert_eq!(result.pipelines[0].frequency, 0.0);
        assert_eq!(result.average_frequency, 0.0);
    }

    #[test]
    fn no_pipelines_yield_zero() {
        let result = calculate(&[], 5);
        assert!(result.pipelines.is_empty());
        assert_eq!(result.average_frequency, 0.0);
    }

    #[test]
    fn daily_breakdown_groups_by_utc_date() {
        // 2024-06-03T00:00:00Z
        let monday = 1_717_372_800_000;
        let passed = vec![
            passed_at(monday + 3_600_000),
            passed_at(monday + DAY_MS + 1),
            passed_at(monday + 20 * 3_600_000),
        ];
        let daily = daily_counts(&passed);
        assert_eq!(
            daily,
            vec![
                DailyDeploymentCount { date: "06/03/2024".to_string(), count: 2 },
                DailyDeploymentCount { date: "06/04/2024".to_string(), count: 1 },
            ]
        );
    }
}
