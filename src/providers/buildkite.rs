use super::{ExecutionPage, ExecutionSource, PaginationHint};
use crate::errors::FetchError;
use crate::http::RateLimitedHttpClient;
use crate::model::{ExecutionRecord, PipelineRef, StepRecord, StepStatus, TimeWindow};
use crate::observability::provider_metrics;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;
use tracing::{debug, info, warn};

const PROVIDER: &str = "buildkite";

/// Scopes a token needs to read builds of every configured pipeline
pub const REQUIRED_SCOPES: [&str; 3] = ["read_builds", "read_organizations", "read_pipelines"];

#[derive(Debug, Deserialize)]
struct Build {
    number: u64,
    commit: Option<String>,
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    jobs: Vec<Job>,
}

#[derive(Debug, Deserialize)]
struct Job {
    name: Option<String>,
    state: Option<String>,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct AccessToken {
    #[serde(default)]
    scopes: Vec<String>,
}

impl Build {
    fn into_record(self) -> Option<ExecutionRecord> {
        let created_at = self.created_at?.timestamp_millis();
        let steps = self
            .jobs
            .into_iter()
            .filter_map(|job| {
                Some(StepRecord {
                    name: job.name?,
                    status: job.state.as_deref().map(StepStatus::from).unwrap_or(StepStatus::Other),
                    started_at: job.started_at.map(|t| t.timestamp_millis()),
                    finished_at: job.finished_at.map(|t| t.timestamp_millis()),
                })
            })
            .collect();

        Some(ExecutionRecord {
            number: self.number,
            commit_id: self.commit.filter(|c| !c.is_empty()),
            created_at,
            steps,
        })
    }
}

/// Buildkite REST adapter
#[derive(Debug, Clone)]
pub struct BuildkiteClient {
    http: RateLimitedHttpClient,
    base_url: String,
    token: String,
}

impl BuildkiteClient {
    pub fn new(http: RateLimitedHttpClient, base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    fn builds_url(&self, pipeline: &PipelineRef) -> String {
        format!(
            "{}/v2/organizations/{}/pipelines/{}/builds",
            self.base_url, pipeline.org_id, pipeline.pipeline_id
        )
    }
}

fn rfc3339(instant: i64) -> String {
    DateTime::from_timestamp_millis(instant)
        .unwrap_or_default()
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Empty or `null` bodies are an empty page, not an error.
fn parse_builds(body: &str) -> Result<Vec<Build>, FetchError> {
    let trimmed = body.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Vec::new());
    }
    serde_json::from_str::<Option<Vec<Build>>>(trimmed)
        .map(Option::unwrap_or_default)
        .map_err(|e| FetchError::Decode {
            provider: PROVIDER,
            message: e.to_string(),
        })
}

#[async_trait]
impl ExecutionSource for BuildkiteClient {
    fn provider(&self) -> &'static str {
        PROVIDER
    }

    async fn fetch_execution_page(
        &self,
        pipeline: &PipelineRef,
        page: u32,
        page_size: u32,
        window: &TimeWindow,
    ) -> Result<ExecutionPage, FetchError> {
        let mut query = vec![
            ("page".to_string(), page.to_string()),
            ("per_page".to_string(), page_size.to_string()),
            ("finished_from".to_string(), rfc3339(window.start)),
            ("created_to".to_string(), rfc3339(window.end)),
        ];
        query.extend(
            pipeline
                .branches
                .iter()
                .map(|branch| ("branch[]".to_string(), branch.clone())),
        );

        let response = self
            .http
            .get(PROVIDER, &self.builds_url(pipeline), &query, Some(&self.token))
            .await?;
        provider_metrics().record_page();

        let builds = parse_builds(&response.body)?;
        let fetched = builds.len();
        let records: Vec<ExecutionRecord> = builds.into_iter().filter_map(Build::into_record).collect();
        if records.len() < fetched {
            warn!(
                pipeline = %pipeline.name,
                page,
                dropped = fetched - records.len(),
                "Builds without a creation time were skipped"
            );
        }

        let hint = PaginationHint::from_link_header(response.link.as_deref());
        debug!(pipeline = %pipeline.name, page, records = records.len(), ?hint, "Fetched build page");

        Ok(ExecutionPage { records, hint })
    }

    async fn verify_access(&self) -> Result<bool, FetchError> {
        let url = format!("{}/v2/access-token", self.base_url);
        let response = self.http.get(PROVIDER, &url, &[], Some(&self.token)).await?;
        let token: AccessToken = serde_json::from_str(&response.body).map_err(|e| FetchError::Decode {
            provider: PROVIDER,
            message: e.to_string(),
        })?;

        let missing: Vec<&str> = REQUIRED_SCOPES
            .iter()
            .copied()
            .filter(|scope| !token.scopes.iter().any(|s| s == scope))
            .collect();
        if !missing.is_empty() {
            warn!(?missing, "Buildkite token lacks required scopes");
            return Ok(false);
        }

        info!("Buildkite token verified");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_and_empty_bodies_are_empty_pages() {
        assert!(parse_builds("").unwrap().is_empty());
        assert!(parse_builds("null").unwrap().is_empty());
        assert!(parse_builds(" [] ").unwrap().is_empty());
        assert!(parse_builds("{not json").is_err());
    }

    #[test]
    fn maps_builds_to_execution_records() {
        let body = r#"[{
            "number": 42,
            "commit": "abc123",
            "created_at": "2024-06-03T10:00:00.000Z",
            "jobs": [
                {"type": "waiter"},
                {"type": "script", "name": "Deploy", "state": "passed",
                 "started_at": "2024-06-03T10:05:00.000Z", "finished_at": "2024-06-03T10:10:00.000Z"},
                {"type": "script", "name": "Smoke", "state": "canceled"}
            ]
        }]"#;
        let records: Vec<ExecutionRecord> = parse_builds(body)
            .unwrap()
            .into_iter()
            .filter_map(Build::into_record)
            .collect();

        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.number, 42);
        assert_eq!(record.commit_id.as_deref(), Some("abc123"));
        assert_eq!(record.created_at, 1_717_408_800_000);
        assert_eq!(record.steps.len(), 2);
        assert_eq!(record.steps[0].status, StepStatus::Passed);
        assert_eq!(record.steps[0].finished_at, Some(1_717_409_400_000));
        assert_eq!(record.steps[1].status, StepStatus::Other);
        assert_eq!(record.steps[1].started_at, None);
    }

    #[test]
    fn window_bounds_are_rfc3339() {
        assert_eq!(rfc3339(1_717_372_800_000), "2024-06-03T00:00:00.000Z");
    }
}
