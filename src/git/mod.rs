//! Working-copy operations
//!
//! The backport engine owns exactly one local clone. Everything that touches
//! it goes through [`GitClient`]; the engine guarantees calls are made one at
//! a time, in commit order within a task and task order across branches.

mod cli;
mod signature;

pub use cli::{GitCli, remote_url};
pub use signature::{
    is_already_exists, is_cherry_pick_conflict, is_empty_cherry_pick, is_missing_remote_ref,
    is_no_cherry_pick_in_progress, is_no_such_remote, parse_changed_paths, parse_conflicting_files,
};

use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;

/// Result of replaying one commit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CherryPickOutcome {
    /// Commit applied cleanly
    Applied,
    /// git stopped with unmerged paths
    Conflict,
}

/// Result of `cherry-pick --continue`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContinueOutcome {
    /// git created the commit
    Continued,
    /// Nothing was in progress; the user already committed by hand
    AlreadyCompleted,
}

/// Git operations on the local clone
#[async_trait]
pub trait GitClient: Send + Sync {
    /// Path of the working copy
    fn repo_path(&self) -> &Path;

    /// `reset --hard` followed by `clean -d --force`
    async fn reset_and_clean(&self) -> Result<()>;

    /// Force-fetch `<remote> <branch>:<branch>`
    ///
    /// A missing remote ref is reported as `DomainError::InvalidBranch`.
    async fn fetch_branch(&self, remote: &str, branch: &str) -> Result<()>;

    /// Create (or reset) `branch` at `start_point` and check it out, without
    /// upstream tracking
    async fn checkout_new_branch(&self, branch: &str, start_point: &str) -> Result<()>;

    /// Cherry-pick one commit; `mainline` selects the parent for merge commits
    ///
    /// An empty cherry-pick is reported as `DomainError::EmptyCherryPick`.
    async fn cherry_pick(&self, sha: &str, mainline: Option<u32>) -> Result<CherryPickOutcome>;

    /// Finish an in-progress cherry-pick without opening an editor
    async fn cherry_pick_continue(&self) -> Result<ContinueOutcome>;

    /// Files still containing conflict markers, relative to the repo root
    async fn conflicting_files(&self) -> Result<Vec<String>>;

    /// Tracked files with unstaged changes, relative to the repo root
    async fn unstaged_files(&self) -> Result<Vec<String>>;

    /// Stage all changes to tracked files
    async fn stage_all(&self) -> Result<()>;

    /// Rewrite the author of the current commit
    async fn amend_author(&self, name: &str, email: &str) -> Result<()>;

    /// Force-push `branch` to `remote` under the same name
    async fn push_branch(&self, remote: &str, branch: &str) -> Result<()>;

    /// Check out `source_branch`, then delete the local `branch`
    async fn delete_branch(&self, source_branch: &str, branch: &str) -> Result<()>;

    /// Remove and re-add a remote
    ///
    /// "No such remote" and "already exists" failures are expected and
    /// swallowed.
    async fn setup_remote(&self, name: &str, url: &str) -> Result<()>;
}
