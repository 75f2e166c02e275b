//! Commit resolution
//!
//! Turns platform history into [`Commit`]s: verifies the associated pull
//! request, formats the display message, maps labels to target branches and
//! finds backports that already exist. Never touches the working copy.

mod message;

pub use message::{first_line, formatted_message, pull_number_from_message};

use crate::branches::BranchLabelMapping;
use crate::config::RunOptions;
use crate::error::{DomainError, Result};
use crate::platform::PlatformService;
use crate::prompt::Prompter;
use crate::types::{
    AssociatedPullRequest, Commit, ExistingTargetPullRequest, HistoryQuery, PlatformConfig,
    RemoteCommit,
};
use tracing::debug;

/// What to list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitQuery {
    /// Branch the commits come from
    pub source_branch: String,
    /// Only commits by this login (None = all authors)
    pub author: Option<String>,
    /// Only commits touching this path
    pub path: Option<String>,
    /// Maximum number of candidates
    pub max_number: usize,
    /// Exact revision; overrides the other filters
    pub sha: Option<String>,
}

impl CommitQuery {
    /// Build the query for a run
    pub fn from_options(options: &RunOptions) -> Self {
        Self {
            source_branch: options.source_branch.clone(),
            author: options.author_filter().map(ToString::to_string),
            path: options.path.clone(),
            max_number: options.max_number,
            sha: options.sha.clone(),
        }
    }
}

/// The associated PR, if it really is the PR that produced this commit
fn verified_pull_request<'a>(
    remote: &'a RemoteCommit,
    repo: &PlatformConfig,
) -> Option<&'a AssociatedPullRequest> {
    remote.associated_pull_request.as_ref().filter(|pr| {
        pr.repo_owner == repo.owner
            && pr.repo_name == repo.repo
            && pr.merge_commit_sha.as_deref() == Some(remote.sha.as_str())
    })
}

/// Whether `head_ref` names a backport branch for PR `number`
fn is_backport_head_for(head_ref: &str, number: u64) -> bool {
    let Some(rest) = head_ref.strip_prefix("backport/") else {
        return false;
    };
    let wanted = format!("pr-{number}");
    rest.rsplit('/')
        .next()
        .is_some_and(|refs| refs.split('_').any(|r| r == wanted))
}

fn existing_backports(pr: &AssociatedPullRequest) -> Vec<ExistingTargetPullRequest> {
    let mut existing: Vec<ExistingTargetPullRequest> = Vec::new();
    for xref in &pr.cross_references {
        if !is_backport_head_for(&xref.head_ref, pr.number) {
            continue;
        }
        if existing.iter().any(|e| e.number == xref.number) {
            continue;
        }
        existing.push(ExistingTargetPullRequest {
            branch: xref.base_ref.clone(),
            number: xref.number,
            state: xref.state,
        });
    }
    existing
}

/// Build a [`Commit`] from platform data (pure)
pub fn to_commit(
    remote: RemoteCommit,
    default_source_branch: &str,
    repo: &PlatformConfig,
    mapping: &BranchLabelMapping,
) -> Commit {
    let (pull_number, source_branch, target_branches_from_labels, existing_target_pull_requests) =
        match verified_pull_request(&remote, repo) {
            Some(pr) => (
                Some(pr.number),
                pr.base_ref.clone(),
                mapping.branches_for_labels(&pr.labels),
                existing_backports(pr),
            ),
            None => (
                pull_number_from_message(&remote.message),
                default_source_branch.to_string(),
                Vec::new(),
                Vec::new(),
            ),
        };

    Commit {
        formatted_message: formatted_message(&remote.message, pull_number, &remote.sha),
        sha: remote.sha,
        original_message: remote.message,
        pull_number,
        source_branch,
        target_branches_from_labels,
        existing_target_pull_requests,
        committed_date: remote.committed_date,
    }
}

/// Fetch candidate commits, newest first
pub async fn fetch_commits(
    platform: &dyn PlatformService,
    query: &CommitQuery,
    mapping: &BranchLabelMapping,
) -> Result<Vec<Commit>> {
    let repo = platform.config();

    if let Some(sha) = &query.sha {
        debug!(sha = %sha, "looking up commit");
        let remote = platform
            .fetch_commit_by_sha(sha)
            .await?
            .ok_or_else(|| DomainError::CommitNotFound {
                branch: query.source_branch.clone(),
                sha: sha.clone(),
            })?;
        return Ok(vec![to_commit(remote, &query.source_branch, repo, mapping)]);
    }

    let author_id = match &query.author {
        Some(login) => Some(
            platform
                .fetch_author_id(login)
                .await?
                .ok_or_else(|| DomainError::UnknownAuthor {
                    login: login.clone(),
                })?,
        ),
        None => None,
    };

    let history = platform
        .fetch_commit_history(&HistoryQuery {
            source_branch: query.source_branch.clone(),
            author_id,
            path: query.path.clone(),
            max_number: query.max_number,
        })
        .await?;

    if history.is_empty() {
        return Err(DomainError::no_commits(query.author.as_deref(), query.path.as_deref()).into());
    }

    Ok(history
        .into_iter()
        .map(|remote| to_commit(remote, &query.source_branch, repo, mapping))
        .collect())
}

/// One selection line: message plus existing backport status
pub fn commit_choice(commit: &Commit) -> String {
    if commit.existing_target_pull_requests.is_empty() {
        return commit.formatted_message.clone();
    }
    let status = commit
        .existing_target_pull_requests
        .iter()
        .map(|pr| format!("{} ({})", pr.branch, pr.state))
        .collect::<Vec<_>>()
        .join(", ");
    format!("{} [{status}]", commit.formatted_message)
}

/// Let the user pick from `candidates` (newest first)
///
/// Returns the chosen commits oldest first, the order they are replayed in.
pub async fn select_commits(
    candidates: Vec<Commit>,
    prompter: &dyn Prompter,
    multiple: bool,
) -> Result<Vec<Commit>> {
    let choices: Vec<String> = candidates.iter().map(commit_choice).collect();
    let mut indices = prompter.select_commits(&choices, multiple).await?;
    indices.sort_unstable();
    indices.dedup();

    let selected: Vec<Commit> = candidates
        .into_iter()
        .enumerate()
        .filter(|(i, _)| indices.contains(i))
        .map(|(_, c)| c)
        .rev()
        .collect();

    if selected.is_empty() {
        return Err(DomainError::NoCommits {
            message: "No commits were selected".to_string(),
        }
        .into());
    }
    Ok(selected)
}
