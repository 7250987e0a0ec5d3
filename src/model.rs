use serde::{Deserialize, Serialize};

/// Epoch milliseconds, UTC.
pub type Millis = i64;

pub const HOUR_MS: i64 = 3_600_000;
pub const DAY_MS: i64 = 86_400_000;

/// Outcome of a single pipeline step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Passed,
    Failed,
    Other,
}

impl From<&str> for StepStatus {
    fn from(state: &str) -> Self {
        match state {
            "passed" => StepStatus::Passed,
            "failed" | "timed_out" => StepStatus::Failed,
            _ => StepStatus::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    pub name: String,
    pub status: StepStatus,
    pub started_at: Option<Millis>,
    pub finished_at: Option<Millis>,
}

/// One pipeline run as returned by an execution provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub number: u64,
    pub commit_id: Option<String>,
    pub created_at: Millis,
    pub steps: Vec<StepRecord>,
}

/// A classified run of a pipeline's end step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployRecord {
    pub run_number: u64,
    pub pipeline_created_at: Millis,
    pub started_at: Millis,
    pub finished_at: Millis,
    pub commit_id: Option<String>,
    pub status: StepStatus,
}

/// Passed and failed deploys of one pipeline step, both clipped to the query window
/// and ordered by finish time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployBucket {
    pub pipeline_name: String,
    pub step: String,
    pub passed: Vec<DeployRecord>,
    pub failed: Vec<DeployRecord>,
}

impl DeployBucket {
    pub fn passed_count(&self) -> usize {
        self.passed.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    pub fn total_runs(&self) -> usize {
        self.passed.len() + self.failed.len()
    }
}

/// Query window, `(start, end]` for deploy classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: Millis,
    pub end: Millis,
}

impl TimeWindow {
    pub fn new(start: Millis, end: Millis) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, instant: Millis) -> bool {
        instant > self.start && instant <= self.end
    }
}

/// A deployment pipeline the caller wants measured, together with the step that marks
/// a deploy and the repository its commits live in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineRef {
    pub org_id: String,
    pub pipeline_id: String,
    pub name: String,
    pub step: String,
    #[serde(default)]
    pub repository: Option<String>,
    #[serde(default)]
    pub branches: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestRef {
    pub number: u64,
    pub created_at: Millis,
    pub merged_at: Option<Millis>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRef {
    pub sha: String,
    pub authored_at: Option<Millis>,
}

/// Lead time of one passed deploy. All durations are milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadTimeRecord {
    pub commit_id: String,
    pub pr_created_at: Option<Millis>,
    pub pr_merged_at: Option<Millis>,
    pub first_commit_at: Option<Millis>,
    pub pipeline_created_at: Millis,
    pub deploy_finished_at: Millis,
    pub pr_delay: i64,
    pub pipeline_delay: i64,
    pub total_time: i64,
    /// Fractional work days from the start of the change to the end of the deploy
    pub total_work_days: Option<f64>,
}

impl LeadTimeRecord {
    /// True when the deploy could not be tied to a merged pull request.
    pub fn is_no_merge(&self) -> bool {
        self.pr_merged_at.is_none()
    }
}
