//! Human-in-the-loop conflict resolution
//!
//! When a cherry-pick stops on conflicts the engine does not try to merge
//! anything itself. It lists the files that need attention, waits for the
//! user to fix and stage them, and checks again, as many times as the user
//! is willing to continue.

use crate::error::{DomainError, Result};
use crate::git::GitClient;
use crate::prompt::Prompter;
use crate::types::Commit;
use tracing::{debug, warn};

/// Snapshot of the working copy while a cherry-pick is stopped
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConflictState {
    /// Files still containing conflict markers
    pub unmerged_paths: Vec<String>,
    /// Tracked files with unstaged changes
    pub unstaged_paths: Vec<String>,
    /// Nothing left to resolve or stage
    pub index_clean: bool,
}

impl ConflictState {
    /// Inspect the working copy
    ///
    /// With `stage`, unstaged changes left once all markers are gone are
    /// staged and count as resolved.
    pub async fn inspect(git: &dyn GitClient, stage: bool) -> Result<Self> {
        let unmerged_paths = git.conflicting_files().await?;
        if !unmerged_paths.is_empty() {
            return Ok(Self {
                unmerged_paths,
                unstaged_paths: Vec::new(),
                index_clean: false,
            });
        }

        let unstaged_paths = git.unstaged_files().await?;
        if unstaged_paths.is_empty() {
            return Ok(Self {
                index_clean: true,
                ..Self::default()
            });
        }
        if stage {
            debug!(count = unstaged_paths.len(), "staging resolved files");
            git.stage_all().await?;
            return Ok(Self {
                index_clean: true,
                ..Self::default()
            });
        }
        Ok(Self {
            unmerged_paths: Vec::new(),
            unstaged_paths,
            index_clean: false,
        })
    }
}

/// Options for the conflict loop
#[derive(Debug, Clone, Copy, Default)]
pub struct ConflictOptions {
    /// Non-interactive: fail instead of prompting
    pub ci: bool,
    /// Stage leftover changes after each confirmation
    pub auto_stage: bool,
}

/// How the conflict loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictResolution {
    /// All conflicts resolved and staged
    Resolved,
    /// The user gave up
    Aborted,
}

enum LoopState {
    Dirty(ConflictState),
    Prompted,
    Clean,
}

/// Build the question shown while the working copy is dirty
pub fn conflict_prompt(git: &dyn GitClient, commit: &Commit, state: &ConflictState) -> String {
    let repo = git.repo_path();
    let (heading, paths) = if state.unmerged_paths.is_empty() {
        (
            "The following files are unstaged. Stage them before continuing",
            &state.unstaged_paths,
        )
    } else {
        (
            "The following files have conflicts. Resolve them, stage them, then continue",
            &state.unmerged_paths,
        )
    };
    let files = paths
        .iter()
        .map(|p| format!("  - {}", repo.join(p).display()))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "Cherry-picking {} ({}) stopped.\n{heading}:\n{files}\n\nPress ENTER when done",
        commit.short_sha(),
        commit.first_line(),
    )
}

/// Drive the resolve-stage-confirm loop until the index is clean or the
/// user declines
pub async fn resolve_conflicts(
    git: &dyn GitClient,
    prompter: &dyn Prompter,
    commit: &Commit,
    options: ConflictOptions,
) -> Result<ConflictResolution> {
    if options.ci {
        let state = ConflictState::inspect(git, false).await?;
        warn!(
            sha = commit.short_sha(),
            files = ?state.unmerged_paths,
            "conflicts while running non-interactively"
        );
        return Err(DomainError::ConflictsInCi {
            sha: commit.short_sha().to_string(),
        }
        .into());
    }

    let initial = ConflictState::inspect(git, false).await?;
    let mut state = if initial.index_clean {
        LoopState::Clean
    } else {
        LoopState::Dirty(initial)
    };
    let mut attempts = 0_usize;

    loop {
        state = match state {
            LoopState::Dirty(current) => {
                attempts += 1;
                debug!(
                    attempts,
                    unmerged = current.unmerged_paths.len(),
                    unstaged = current.unstaged_paths.len(),
                    "waiting for conflict resolution"
                );
                let message = conflict_prompt(git, commit, &current);
                if !prompter.confirm(&message).await? {
                    return Ok(ConflictResolution::Aborted);
                }
                LoopState::Prompted
            }
            LoopState::Prompted => {
                let next = ConflictState::inspect(git, options.auto_stage).await?;
                if next.index_clean {
                    LoopState::Clean
                } else {
                    LoopState::Dirty(next)
                }
            }
            LoopState::Clean => return Ok(ConflictResolution::Resolved),
        };
    }
}
