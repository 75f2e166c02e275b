//! Core types for backport

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Number of sha characters used for short commit references
pub const SHORT_SHA_LEN: usize = 7;

/// Shorten a revision id to its display form
pub fn short_sha(sha: &str) -> &str {
    sha.char_indices()
        .nth(SHORT_SHA_LEN)
        .map_or(sha, |(idx, _)| &sha[..idx])
}

/// A commit selected for backporting
///
/// Produced by the commit resolver and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    /// Full revision id
    pub sha: String,
    /// Message as recorded in git
    pub original_message: String,
    /// Originating PR number (verified association or parsed from message)
    pub pull_number: Option<u64>,
    /// First message line with its reference appended, for display
    pub formatted_message: String,
    /// Branch the commit was taken from
    pub source_branch: String,
    /// Target branches derived from the originating PR's labels
    pub target_branches_from_labels: Vec<String>,
    /// Backport PRs that already exist for this commit
    pub existing_target_pull_requests: Vec<ExistingTargetPullRequest>,
    /// When the commit was committed, if known
    pub committed_date: Option<DateTime<Utc>>,
}

impl Commit {
    /// Abbreviated sha
    pub fn short_sha(&self) -> &str {
        short_sha(&self.sha)
    }

    /// First line of the original message
    pub fn first_line(&self) -> &str {
        crate::commits::first_line(&self.original_message)
    }

    /// Short reference used in branch names: `pr-<n>` or `commit-<sha>`
    pub fn short_ref(&self) -> String {
        self.pull_number.map_or_else(
            || format!("commit-{}", self.short_sha()),
            |n| format!("pr-{n}"),
        )
    }

    /// Long reference used in PR bodies: `#<n>` or the short sha
    pub fn long_ref(&self) -> String {
        self.pull_number
            .map_or_else(|| self.short_sha().to_string(), |n| format!("#{n}"))
    }
}

/// A backport PR found for a commit on some target branch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExistingTargetPullRequest {
    /// Target branch the PR merges into
    pub branch: String,
    /// PR number
    pub number: u64,
    /// PR state
    pub state: PrState,
}

/// PR state (open, closed, merged)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrState {
    /// PR is open
    Open,
    /// PR was closed without merging
    Closed,
    /// PR was merged
    Merged,
}

impl std::fmt::Display for PrState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Closed => write!(f, "closed"),
            Self::Merged => write!(f, "merged"),
        }
    }
}

/// Where a target branch came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BranchSource {
    /// Passed explicitly by the caller
    Explicit,
    /// Derived from PR labels via the label mapping
    Label,
    /// Picked interactively
    Prompt,
}

impl std::fmt::Display for BranchSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Explicit => write!(f, "explicit"),
            Self::Label => write!(f, "label"),
            Self::Prompt => write!(f, "prompt"),
        }
    }
}

/// A branch to backport into
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetBranch {
    /// Branch name
    pub name: String,
    /// How the branch was resolved
    pub source: BranchSource,
}

impl TargetBranch {
    /// Create a target branch
    pub fn new(name: impl Into<String>, source: BranchSource) -> Self {
        Self {
            name: name.into(),
            source,
        }
    }
}

/// A pull request as returned by the platform after creation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    /// PR number
    pub number: u64,
    /// Web URL for the PR
    pub html_url: String,
    /// Base branch name
    pub base_ref: String,
    /// Head branch name
    pub head_ref: String,
    /// PR title
    pub title: String,
}

/// Everything needed to open a backport PR
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestPayload {
    /// PR title
    pub title: String,
    /// PR body
    pub body: String,
    /// `<owner>:<branch>` head reference
    pub head: String,
    /// Target branch
    pub base: String,
    /// Local and remote backport branch name
    pub branch_name: String,
    /// Open as draft
    pub draft: bool,
    /// Allow maintainers to push to the head branch
    pub maintainer_can_modify: bool,
}

/// Repository coordinates for the platform service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformConfig {
    /// Repository owner (user or organization)
    pub owner: String,
    /// Repository name
    pub repo: String,
    /// Custom host (None for github.com)
    pub host: Option<String>,
}

// =============================================================================
// Raw platform data (before verification and formatting)
// =============================================================================

/// A commit as reported by the platform's history or lookup APIs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCommit {
    /// Full revision id
    pub sha: String,
    /// Full commit message
    pub message: String,
    /// Commit date
    pub committed_date: Option<DateTime<Utc>>,
    /// First PR associated with the commit, unverified
    pub associated_pull_request: Option<AssociatedPullRequest>,
}

/// A PR the platform associates with a commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssociatedPullRequest {
    /// PR number
    pub number: u64,
    /// Owner of the repository the PR belongs to
    pub repo_owner: String,
    /// Name of the repository the PR belongs to
    pub repo_name: String,
    /// Sha of the merge commit, if merged
    pub merge_commit_sha: Option<String>,
    /// Branch the PR merged into
    pub base_ref: String,
    /// Label names
    pub labels: Vec<String>,
    /// PRs that cross-reference this one
    pub cross_references: Vec<CrossReferencedPullRequest>,
}

/// A PR mentioning another PR in its timeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrossReferencedPullRequest {
    /// PR number
    pub number: u64,
    /// PR state
    pub state: PrState,
    /// Base branch
    pub base_ref: String,
    /// Head branch
    pub head_ref: String,
}

/// Parameters for a commit history query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryQuery {
    /// Branch whose history is listed
    pub source_branch: String,
    /// GitHub node id of the author (None = all authors)
    pub author_id: Option<String>,
    /// Only commits touching this path
    pub path: Option<String>,
    /// Maximum entries returned
    pub max_number: usize,
}
