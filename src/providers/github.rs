use super::SourceHost;
use crate::errors::FetchError;
use crate::model::{CommitRef, PullRequestRef};
use crate::observability::provider_metrics;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use governor::{DefaultDirectRateLimiter, Jitter};
use octocrab::Octocrab;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use tracing::debug;

const PROVIDER: &str = "github";

static REPOSITORY: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r"^(?:(?:https?|ssh|git)://(?:[^@/]+@)?[^/]+/|[^@/:\s]+@[^:\s]+:)?([^/\s]+)/([^/\s]+?)(?:\.git)?/?$",
    )
    .ok()
});

/// Extracts `owner/name` from a slug, an HTTPS clone URL or an SSH remote.
pub fn parse_repository_slug(raw: &str) -> Option<String> {
    let caps = REPOSITORY.as_ref()?.captures(raw.trim())?;
    Some(format!("{}/{}", caps.get(1)?.as_str(), caps.get(2)?.as_str()))
}

#[derive(Debug, Deserialize)]
struct PullRequest {
    number: u64,
    created_at: DateTime<Utc>,
    merged_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct PullRequestCommit {
    sha: String,
    commit: CommitDetail,
}

#[derive(Debug, Deserialize)]
struct CommitDetail {
    author: Option<CommitAuthor>,
}

#[derive(Debug, Deserialize)]
struct CommitAuthor {
    date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct Repository {
    full_name: String,
}

/// GitHub REST adapter built on octocrab
#[derive(Clone)]
pub struct GitHubSourceHost {
    octocrab: Octocrab,
    rate_limiter: Option<Arc<DefaultDirectRateLimiter>>,
}

impl std::fmt::Debug for GitHubSourceHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubSourceHost")
            .field("rate_limited", &self.rate_limiter.is_some())
            .finish()
    }
}

impl GitHubSourceHost {
    pub fn new(token: &str, base_url: Option<&str>) -> Result<Self, FetchError> {
        let mut builder = Octocrab::builder().personal_token(token.to_string());
        if let Some(base_url) = base_url {
            builder = builder.base_uri(base_url)?;
        }
        Ok(Self {
            octocrab: builder.build()?,
            rate_limiter: None,
        })
    }

    /// Shares a limiter with the other adapters so all calls draw from one quota.
    pub fn with_rate_limiter(mut self, rate_limiter: Arc<DefaultDirectRateLimiter>) -> Self {
        self.rate_limiter = Some(rate_limiter);
        self
    }

    async fn get<T: DeserializeOwned>(&self, route: String) -> Result<T, FetchError> {
        if let Some(limiter) = &self.rate_limiter {
            limiter
                .until_ready_with_jitter(Jitter::up_to(Duration::from_millis(100)))
                .await;
        }
        provider_metrics().record_request();
        debug!(provider = PROVIDER, route = %route, "Executing provider request");

        self.octocrab
            .get::<T, _, ()>(route, None::<&()>)
            .await
            .map_err(|e| {
                provider_metrics().record_error();
                FetchError::from(e)
            })
    }
}

#[async_trait]
impl SourceHost for GitHubSourceHost {
    async fn fetch_pull_requests_for_commit(
        &self,
        repository: &str,
        commit_id: &str,
    ) -> Result<Vec<PullRequestRef>, FetchError> {
        let pulls: Vec<PullRequest> = self
            .get(format!("/repos/{repository}/commits/{commit_id}/pulls"))
            .await?;
        Ok(pulls
            .into_iter()
            .map(|pr| PullRequestRef {
                number: pr.number,
                created_at: pr.created_at.timestamp_millis(),
                merged_at: pr.merged_at.map(|t| t.timestamp_millis()),
            })
            .collect())
    }

    async fn fetch_first_commit_of_pull_request(
        &self,
        repository: &str,
        pr_number: u64,
    ) -> Result<Option<CommitRef>, FetchError> {
        // GitHub lists pull request commits oldest first.
        let commits: Vec<PullRequestCommit> = self
            .get(format!("/repos/{repository}/pulls/{pr_number}/commits"))
            .await?;
        Ok(commits.into_iter().next().map(|c| CommitRef {
            sha: c.sha,
            authored_at: c
                .commit
                .author
                .and_then(|a| a.date)
                .map(|t| t.timestamp_millis()),
        }))
    }

    async fn resolve_repository_full_name(&self, raw: &str) -> Result<String, FetchError> {
        let slug = parse_repository_slug(raw).ok_or_else(|| FetchError::Status {
            provider: PROVIDER,
            status: 404,
            message: format!("unrecognised repository reference: {raw}"),
        })?;
        let repository: Repository = self.get(format!("/repos/{slug}")).await?;
        Ok(repository.full_name)
    }
}
