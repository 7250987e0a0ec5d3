use crate::model::LeadTimeRecord;
use serde::{Deserialize, Serialize};

/// Which of the four delivery metrics a report should contain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    DeploymentFrequency,
    ChangeFailureRate,
    MeanTimeToRecovery,
    LeadTimeForChanges,
}

impl MetricKind {
    pub fn all() -> Vec<MetricKind> {
        vec![
            MetricKind::DeploymentFrequency,
            MetricKind::ChangeFailureRate,
            MetricKind::MeanTimeToRecovery,
            MetricKind::LeadTimeForChanges,
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyDeploymentCount {
    /// `MM/dd/yyyy`, UTC
    pub date: String,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineDeploymentFrequency {
    pub name: String,
    pub step: String,
    pub passed_count: usize,
    pub frequency: f64,
    pub daily: Vec<DailyDeploymentCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeploymentFrequency {
    pub work_days: i64,
    pub pipelines: Vec<PipelineDeploymentFrequency>,
    /// Mean of the per-pipeline frequencies
    pub average_frequency: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineChangeFailureRate {
    pub name: String,
    pub step: String,
    pub failed_count: usize,
    pub total_count: usize,
    pub rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangeFailureRate {
    pub pipelines: Vec<PipelineChangeFailureRate>,
    pub failed_total: usize,
    pub runs_total: usize,
    /// Failed over total across every pipeline combined
    pub average_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineMeanTimeToRecovery {
    pub name: String,
    pub step: String,
    pub recovery_count: usize,
    pub total_recovery_ms: i64,
    pub hours: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeanTimeToRecovery {
    pub pipelines: Vec<PipelineMeanTimeToRecovery>,
    pub average_hours: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineLeadTime {
    pub name: String,
    pub step: String,
    pub records: Vec<LeadTimeRecord>,
    pub average_pr_delay_hours: f64,
    pub average_pipeline_delay_hours: f64,
    pub average_total_hours: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeadTimeForChanges {
    pub pipelines: Vec<PipelineLeadTime>,
    pub average_pr_delay_hours: f64,
    pub average_pipeline_delay_hours: f64,
    pub average_total_hours: f64,
}

/// Everything one aggregation request produces
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricReport {
    pub correlation_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deployment_frequency: Option<DeploymentFrequency>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change_failure_rate: Option<ChangeFailureRate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean_time_to_recovery: Option<MeanTimeToRecovery>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lead_time_for_changes: Option<LeadTimeForChanges>,
}
