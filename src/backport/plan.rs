//! Backport planning - pure functions for creating backport plans
//!
//! No I/O happens here. The selected commits and target branches are
//! gathered beforehand and turned into one task per target branch.

use crate::backport::naming::backport_branch_name;
use crate::config::RunOptions;
use crate::error::Result;
use crate::types::{Commit, TargetBranch};

/// One target branch worth of work
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackportTask {
    /// Branch the PR is opened against
    pub target_branch: TargetBranch,
    /// Commits to replay, oldest first
    pub commits: Vec<Commit>,
    /// Name of the backport branch
    pub branch_name: String,
    /// Remote the target and source branches are fetched from
    pub upstream_remote: String,
    /// Remote the backport branch is pushed to
    pub push_remote: String,
}

impl BackportTask {
    /// `head` value for the pull request (`<push remote>:<branch>`)
    pub fn head(&self) -> String {
        format!("{}:{}", self.push_remote, self.branch_name)
    }
}

impl std::fmt::Display for BackportTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let refs = self
            .commits
            .iter()
            .map(Commit::long_ref)
            .collect::<Vec<_>>()
            .join(", ");
        write!(
            f,
            "{refs} -> {} ({})",
            self.target_branch.name, self.branch_name
        )
    }
}

/// Backport plan - the functional core output
///
/// Created by [`create_backport_plan`] (pure) and run by
/// `execute_backports` (effectful).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackportPlan {
    /// Tasks in target branch order
    pub tasks: Vec<BackportTask>,
}

impl BackportPlan {
    /// Check if there is nothing to do
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Number of target branches
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }
}

/// Create a backport plan (PURE - no I/O, easily testable)
///
/// Every task gets the full commit list. Duplicate target branches keep
/// their first occurrence.
pub fn create_backport_plan(
    commits: &[Commit],
    target_branches: &[TargetBranch],
    options: &RunOptions,
) -> Result<BackportPlan> {
    let push_remote = options.push_remote()?.to_string();
    let mut tasks: Vec<BackportTask> = Vec::with_capacity(target_branches.len());

    for target in target_branches {
        if tasks.iter().any(|t| t.target_branch.name == target.name) {
            continue;
        }
        tasks.push(BackportTask {
            target_branch: target.clone(),
            commits: commits.to_vec(),
            branch_name: backport_branch_name(&target.name, commits),
            upstream_remote: options.repo_owner.clone(),
            push_remote: push_remote.clone(),
        });
    }

    Ok(BackportPlan { tasks })
}
