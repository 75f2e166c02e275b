//! Backport execution - effectful operations
//!
//! Takes a [`BackportPlan`] (created by the pure planning functions) and
//! runs each task against the local clone and the platform API. Tasks run
//! one after another; a failing task is reported and the next one starts.

use crate::backport::conflict::{ConflictOptions, ConflictResolution, resolve_conflicts};
use crate::backport::plan::{BackportPlan, BackportTask};
use crate::backport::progress::{ProgressCallback, TaskPhase};
use crate::backport::publish::{FollowUps, build_pull_request_payload, publish_pull_request};
use crate::config::RunOptions;
use crate::error::{DomainError, Error, Result};
use crate::git::{CherryPickOutcome, ContinueOutcome, GitClient};
use crate::platform::PlatformService;
use crate::prompt::Prompter;
use crate::types::{PullRequest, PullRequestPayload, TargetBranch};
use tracing::{debug, error, info, warn};

/// Everything a run talks to
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    /// Local clone
    pub git: &'a dyn GitClient,
    /// Hosting platform
    pub platform: &'a dyn PlatformService,
    /// Interactive questions
    pub prompter: &'a dyn Prompter,
    /// Progress observer
    pub progress: &'a dyn ProgressCallback,
}

/// How a task ended
#[derive(Debug)]
pub enum TaskStatus {
    /// Branch prepared and, unless dry run, PR opened
    Success {
        /// The created PR (None on dry run)
        pull_request: Option<PullRequest>,
        /// Payload the PR was (or would have been) opened with
        payload: PullRequestPayload,
        /// Follow-up calls that failed
        follow_up_errors: Vec<String>,
        /// Nothing was pushed
        dry_run: bool,
    },
    /// The task stopped
    Failure {
        /// Phase the task was in
        phase: TaskPhase,
        /// What went wrong
        error: Error,
    },
}

/// Result of one task
#[derive(Debug)]
pub struct TaskOutcome {
    /// Branch the task targeted
    pub target_branch: TargetBranch,
    /// How it ended
    pub status: TaskStatus,
}

impl TaskOutcome {
    /// Check if the task succeeded
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self.status, TaskStatus::Success { .. })
    }

    /// The created PR, if any
    #[must_use]
    pub const fn pull_request(&self) -> Option<&PullRequest> {
        match &self.status {
            TaskStatus::Success {
                pull_request: Some(pr),
                ..
            } => Some(pr),
            _ => None,
        }
    }

    /// The error, for failed tasks
    #[must_use]
    pub const fn error(&self) -> Option<&Error> {
        match &self.status {
            TaskStatus::Failure { error, .. } => Some(error),
            TaskStatus::Success { .. } => None,
        }
    }
}

/// Result of a whole run
#[derive(Debug, Default)]
pub struct BackportRunResult {
    /// One outcome per task, in plan order
    pub outcomes: Vec<TaskOutcome>,
}

impl BackportRunResult {
    /// Number of successful tasks
    #[must_use]
    pub fn success_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    /// Number of failed tasks
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.outcomes.len() - self.success_count()
    }

    /// Check if every task succeeded
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failure_count() == 0
    }

    /// Check if the user aborted any task
    #[must_use]
    pub fn was_aborted(&self) -> bool {
        self.outcomes
            .iter()
            .any(|o| matches!(o.error().and_then(Error::as_domain), Some(DomainError::Aborted)))
    }
}

/// Tracks the current phase and reports transitions
struct PhaseTracker<'a> {
    target_branch: &'a str,
    progress: &'a dyn ProgressCallback,
    current: TaskPhase,
}

impl<'a> PhaseTracker<'a> {
    fn new(target_branch: &'a str, progress: &'a dyn ProgressCallback) -> Self {
        Self {
            target_branch,
            progress,
            current: TaskPhase::Init,
        }
    }

    async fn enter(&mut self, phase: TaskPhase) {
        debug!(target_branch = self.target_branch, %phase, "task phase");
        self.progress.on_phase(self.target_branch, &phase).await;
        self.current = phase;
    }
}

/// Execute the backport plan (EFFECTFUL)
///
/// Errors are caught per task and recorded in the returned outcomes, so
/// this never fails as a whole.
pub async fn execute_backports(
    plan: &BackportPlan,
    options: &RunOptions,
    collaborators: Collaborators<'_>,
) -> BackportRunResult {
    let mut result = BackportRunResult::default();

    for task in &plan.tasks {
        let target = &task.target_branch.name;
        collaborators
            .progress
            .on_message(&format!("Backporting to {target}"))
            .await;

        let mut tracker = PhaseTracker::new(target, collaborators.progress);
        tracker.enter(TaskPhase::Init).await;

        let status = match execute_task(task, options, collaborators, &mut tracker).await {
            Ok(status) => {
                tracker.enter(TaskPhase::Done).await;
                info!(target_branch = %target, "backport succeeded");
                status
            }
            Err(e) => {
                let phase = tracker.current.clone();
                tracker.enter(TaskPhase::Failed).await;
                error!(target_branch = %target, %phase, error = %e, "backport failed");
                TaskStatus::Failure { phase, error: e }
            }
        };

        let outcome = TaskOutcome {
            target_branch: task.target_branch.clone(),
            status,
        };
        collaborators.progress.on_task_complete(&outcome).await;
        result.outcomes.push(outcome);
    }

    result
}

async fn execute_task(
    task: &BackportTask,
    options: &RunOptions,
    collaborators: Collaborators<'_>,
    tracker: &mut PhaseTracker<'_>,
) -> Result<TaskStatus> {
    let git = collaborators.git;
    let target = &task.target_branch.name;

    tracker.enter(TaskPhase::BranchSetup).await;
    git.reset_and_clean().await?;
    git.fetch_branch(&task.upstream_remote, target).await?;
    git.checkout_new_branch(&task.branch_name, target).await?;

    let conflict_options = ConflictOptions {
        ci: options.ci,
        auto_stage: options.auto_stage,
    };

    for (index, commit) in task.commits.iter().enumerate() {
        tracker.enter(TaskPhase::CherryPicking(index)).await;
        git.fetch_branch(&task.upstream_remote, &commit.source_branch)
            .await?;

        if git.cherry_pick(&commit.sha, options.mainline).await? == CherryPickOutcome::Conflict {
            tracker.enter(TaskPhase::ConflictResolution(index)).await;
            match resolve_conflicts(git, collaborators.prompter, commit, conflict_options).await? {
                ConflictResolution::Aborted => return Err(DomainError::Aborted.into()),
                ConflictResolution::Resolved => {
                    if git.cherry_pick_continue().await? == ContinueOutcome::AlreadyCompleted {
                        collaborators
                            .progress
                            .on_message(&format!(
                                "Commit {} was already committed",
                                commit.short_sha()
                            ))
                            .await;
                    }
                }
            }
        }

        if let Some((name, email)) = options.author_override() {
            git.amend_author(name, email).await?;
        }
    }

    let payload = build_pull_request_payload(task, options);

    if options.dry_run {
        info!(branch = %task.branch_name, "dry run, not pushing");
        return Ok(TaskStatus::Success {
            pull_request: None,
            payload,
            follow_up_errors: Vec::new(),
            dry_run: true,
        });
    }

    tracker.enter(TaskPhase::Pushing).await;
    git.push_branch(&task.push_remote, &task.branch_name).await?;
    tracker.enter(TaskPhase::Pushed).await;

    let follow_ups = FollowUps::for_task(task, options);
    let published = publish_pull_request(collaborators.platform, &payload, &follow_ups).await?;
    tracker.enter(TaskPhase::PrCreated).await;
    tracker.enter(TaskPhase::Labeled).await;

    if let Err(e) = git
        .delete_branch(&options.source_branch, &task.branch_name)
        .await
    {
        warn!(branch = %task.branch_name, error = %e, "failed to delete local backport branch");
    }

    Ok(TaskStatus::Success {
        pull_request: Some(published.pull_request),
        payload,
        follow_up_errors: published.follow_up_errors,
        dry_run: false,
    })
}
