//! Capability interfaces over the upstream tools, one implementation per provider.

pub mod buildkite;
pub mod github;
pub mod pagination;

pub use buildkite::BuildkiteClient;
pub use github::GitHubSourceHost;
pub use pagination::PaginationHint;

use crate::errors::FetchError;
use crate::model::{CommitRef, ExecutionRecord, PipelineRef, PullRequestRef, TimeWindow};
use async_trait::async_trait;

/// One page of pipeline runs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionPage {
    pub records: Vec<ExecutionRecord>,
    pub hint: PaginationHint,
}

/// A CI runner (or any tool) that records pipeline executions
#[async_trait]
pub trait ExecutionSource: Send + Sync {
    fn provider(&self) -> &'static str;

    async fn fetch_execution_page(
        &self,
        pipeline: &PipelineRef,
        page: u32,
        page_size: u32,
        window: &TimeWindow,
    ) -> Result<ExecutionPage, FetchError>;

    /// Whether the configured credential may read what a report needs.
    async fn verify_access(&self) -> Result<bool, FetchError> {
        Ok(true)
    }
}

/// A source-code host that knows pull requests and commits
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SourceHost: Send + Sync {
    async fn fetch_pull_requests_for_commit(
        &self,
        repository: &str,
        commit_id: &str,
    ) -> Result<Vec<PullRequestRef>, FetchError>;

    /// Earliest commit of the pull request, if the host reports one.
    async fn fetch_first_commit_of_pull_request(
        &self,
        repository: &str,
        pr_number: u64,
    ) -> Result<Option<CommitRef>, FetchError>;

    /// Canonical `owner/name` for a URL, SSH remote or slug.
    async fn resolve_repository_full_name(&self, raw: &str) -> Result<String, FetchError>;
}
