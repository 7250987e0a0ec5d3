//! Turns raw pipeline runs into passed/failed deploy buckets.

use crate::model::{DeployBucket, DeployRecord, ExecutionRecord, StepStatus, TimeWindow};

/// Classify every run's `end_step` into a [`DeployBucket`] clipped to `window`.
///
/// When a run has several matching steps, the passed/failed one finishing last inside
/// the window is authoritative. Runs without a usable match contribute nothing.
pub fn classify_deploys(
    pipeline_name: &str,
    records: &[ExecutionRecord],
    end_step: &str,
    window: &TimeWindow,
) -> DeployBucket {
    let mut passed = Vec::new();
    let mut failed = Vec::new();

    for record in records {
        let Some(deploy) = deploy_for_run(record, end_step, window) else {
            continue;
        };
        match deploy.status {
            StepStatus::Passed => passed.push(deploy),
            StepStatus::Failed => failed.push(deploy),
            StepStatus::Other => {}
        }
    }

    sort_by_finish(&mut passed);
    sort_by_finish(&mut failed);

    DeployBucket {
        pipeline_name: pipeline_name.to_string(),
        step: end_step.to_string(),
        passed,
        failed,
    }
}

fn deploy_for_run(
    record: &ExecutionRecord,
    end_step: &str,
    window: &TimeWindow,
) -> Option<DeployRecord> {
    record
        .steps
        .iter()
        .filter(|step| step.name == end_step)
        .filter(|step| matches!(step.status, StepStatus::Passed | StepStatus::Failed))
        .filter_map(|step| match (step.started_at, step.finished_at) {
            (Some(started), Some(finished)) if window.contains(finished) => {
                Some((step, started, finished))
            }
            _ => None,
        })
        // max_by_key keeps the last of equal keys
        .max_by_key(|(_, _, finished)| *finished)
        .map(|(step, started_at, finished_at)| DeployRecord {
            run_number: record.number,
            pipeline_created_at: record.created_at,
            started_at,
            finished_at,
            commit_id: record.commit_id.clone(),
            status: step.status,
        })
}

// Run number breaks ties so that fetch order never leaks into the result.
fn sort_by_finish(deploys: &mut [DeployRecord]) {
    deploys.sort_by_key(|d| (d.finished_at, d.run_number));
}

/// Step names from the start of the pipeline up to and including `target`.
/// Empty when `target` is not one of the steps.
pub fn steps_until(steps: &[String], target: &str) -> Vec<String> {
    match steps.iter().position(|name| name == target) {
        Some(index) => steps[..=index].to_vec(),
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::StepRecord;

    fn step(name: &str, status: StepStatus, started: i64, finished: i64) -> StepRecord {
        StepRecord {
            name: name.to_string(),
            status,
            started_at: Some(started),
            finished_at: Some(finished),
        }
    }

    fn run(number: u64, created: i64, steps: Vec<StepRecord>) -> ExecutionRecord {
        ExecutionRecord {
            number,
            commit_id: Some(format!("sha-{number}")),
            created_at: created,
            steps,
        }
    }

    #[test]
    fn buckets_by_status_and_drops_other() {
        let records = vec![
            run(1, 10, vec![step("deploy", StepStatus::Passed, 20, 30)]),
            run(2, 40, vec![step("deploy", StepStatus::Failed, 50, 60)]),
            run(3, 70, vec![step("deploy", StepStatus::Other, 80, 90)]),
            run(4, 70, vec![step("build", StepStatus::Passed, 80, 90)]),
        ];
        let bucket = classify_deploys("api", &records, "deploy", &TimeWindow::new(0, 100));

        assert_eq!(bucket.passed.len(), 1);
        assert_eq!(bucket.failed.len(), 1);
        assert_eq!(bucket.passed[0].run_number, 1);
        assert_eq!(bucket.passed[0].commit_id.as_deref(), Some("sha-1"));
        assert_eq!(bucket.failed[0].pipeline_created_at, 40);
    }

    #[test]
    fn clips_to_window_excluding_start() {
        let records = vec![
            run(1, 0, vec![step("deploy", StepStatus::Passed, 5, 100)]),
            run(2, 0, vec![step("deploy", StepStatus::Passed, 5, 101)]),
            run(3, 0, vec![step("deploy", StepStatus::Passed, 5, 200)]),
            run(4, 0, vec![step("deploy", StepStatus::Passed, 5, 201)]),
        ];
        let bucket = classify_deploys("api", &records, "deploy", &TimeWindow::new(100, 200));
        let numbers: Vec<u64> = bucket.passed.iter().map(|d| d.run_number).collect();
        assert_eq!(numbers, vec![2, 3]);
    }

    #[test]
    fn latest_matching_step_wins() {
        let records = vec![run(
            1,
            0,
            vec![
                step("deploy", StepStatus::Failed, 10, 20),
                step("deploy", StepStatus::Passed, 30, 40),
                step("deploy", StepStatus::Passed, 50, 500),
            ],
        )];
        let bucket = classify_deploys("api", &records, "deploy", &TimeWindow::new(0, 100));
        assert!(bucket.failed.is_empty());
        assert_eq!(bucket.passed.len(), 1);
        assert_eq!(bucket.passed[0].finished_at, 40);
    }

    #[test]
    fn missing_timestamps_contribute_nothing() {
        let mut unfinished = step("deploy", StepStatus::Passed, 10, 20);
        unfinished.finished_at = None;
        let mut unstarted = step("deploy", StepStatus::Failed, 10, 20);
        unstarted.started_at = None;

        let records = vec![run(1, 0, vec![unfinished]), run(2, 0, vec![unstarted])];
        let bucket = classify_deploys("api", &records, "deploy", &TimeWindow::new(0, 100));
        assert_eq!(bucket.total_runs(), 0);
    }

    #[test]
    fn classification_is_deterministic_regardless_of_fetch_order() {
        let records = vec![
            run(3, 0, vec![step("deploy", StepStatus::Passed, 1, 50)]),
            run(1, 0, vec![step("deploy", StepStatus::Failed, 1, 30)]),
            run(2, 0, vec![step("deploy", StepStatus::Passed, 1, 50)]),
        ];
        let window = TimeWindow::new(0, 100);
        let first = classify_deploys("api", &records, "deploy", &window);
        let again = classify_deploys("api", &records, "deploy", &window);
        assert_eq!(first, again);

        let mut reversed = records.clone();
        reversed.reverse();
        assert_eq!(first, classify_deploys("api", &reversed, "deploy", &window));
        assert_eq!(first.passed[0].run_number, 2);
    }

    #[test]
    fn steps_until_returns_inclusive_prefix() {
        let steps: Vec<String> = ["build", "test", "deploy", "smoke"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(steps_until(&steps, "deploy"), vec!["build", "test", "deploy"]);
        assert_eq!(steps_until(&steps, "build"), vec!["build"]);
        assert!(steps_until(&steps, "release").is_empty());
    }
}
