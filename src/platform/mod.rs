//! Platform services for GitHub
//!
//! Provides the interface the backport engine uses for commit lookups and
//! pull request creation.

mod github;

pub use github::{GitHubService, parse_repo_slug};

use crate::error::Result;
use crate::types::{HistoryQuery, PlatformConfig, PullRequest, PullRequestPayload, RemoteCommit};
use async_trait::async_trait;

/// Platform service trait for commit and PR operations
///
/// Read-only lookups never touch the working copy, so callers may issue
/// them concurrently.
#[async_trait]
pub trait PlatformService: Send + Sync {
    /// Look up a single commit by (possibly abbreviated) revision id
    async fn fetch_commit_by_sha(&self, sha: &str) -> Result<Option<RemoteCommit>>;

    /// List commits on a branch, newest first
    ///
    /// Each entry carries the first associated pull request, unverified.
    async fn fetch_commit_history(&self, query: &HistoryQuery) -> Result<Vec<RemoteCommit>>;

    /// Resolve a login to the node id used by history author filters
    async fn fetch_author_id(&self, login: &str) -> Result<Option<String>>;

    /// Login of the authenticated user
    async fn current_user_login(&self) -> Result<String>;

    /// Create a pull request
    async fn create_pull_request(&self, payload: &PullRequestPayload) -> Result<PullRequest>;

    /// Add labels to an issue or pull request
    async fn add_labels(&self, number: u64, labels: &[String]) -> Result<()>;

    /// Add assignees to an issue or pull request
    async fn add_assignees(&self, number: u64, assignees: &[String]) -> Result<()>;

    /// Get the platform configuration
    fn config(&self) -> &PlatformConfig;
}
