//! Progress reporting for backport runs
//!
//! The engine never talks to a terminal. It reports through a
//! [`ProgressCallback`] passed in by the caller.

use crate::backport::execute::TaskOutcome;
use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedSender;

/// Phase of a single backport task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskPhase {
    /// Nothing done yet
    Init,
    /// Resetting the working copy and creating the backport branch
    BranchSetup,
    /// Replaying the commit at this index
    CherryPicking(usize),
    /// Waiting for the user to resolve conflicts of the commit at this index
    ConflictResolution(usize),
    /// Force-pushing the backport branch
    Pushing,
    /// Branch pushed
    Pushed,
    /// Pull request opened
    PrCreated,
    /// Labels and assignees applied
    Labeled,
    /// Finished successfully
    Done,
    /// Finished with an error
    Failed,
}

impl std::fmt::Display for TaskPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Init => write!(f, "init"),
            Self::BranchSetup => write!(f, "branch setup"),
            Self::CherryPicking(i) => write!(f, "cherry-picking commit {}", i + 1),
            Self::ConflictResolution(i) => write!(f, "resolving conflicts in commit {}", i + 1),
            Self::Pushing => write!(f, "pushing"),
            Self::Pushed => write!(f, "pushed"),
            Self::PrCreated => write!(f, "pull request created"),
            Self::Labeled => write!(f, "labels applied"),
            Self::Done => write!(f, "done"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Observer for backport progress
#[async_trait]
pub trait ProgressCallback: Send + Sync {
    /// A task entered a new phase
    async fn on_phase(&self, target_branch: &str, phase: &TaskPhase);

    /// Free-form status line
    async fn on_message(&self, message: &str);

    /// A task finished, successfully or not
    async fn on_task_complete(&self, outcome: &TaskOutcome);

    /// Clone transfer progress, 0-100
    async fn on_clone_progress(&self, percent: u8);
}

/// Progress callback that ignores everything
pub struct NoopProgress;

#[async_trait]
impl ProgressCallback for NoopProgress {
    async fn on_phase(&self, _target_branch: &str, _phase: &TaskPhase) {}
    async fn on_message(&self, _message: &str) {}
    async fn on_task_complete(&self, _outcome: &TaskOutcome) {}
    async fn on_clone_progress(&self, _percent: u8) {}
}

/// Event emitted by [`ChannelProgress`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// See [`ProgressCallback::on_phase`]
    Phase {
        /// Task target branch
        target_branch: String,
        /// New phase
        phase: TaskPhase,
    },
    /// See [`ProgressCallback::on_message`]
    Message(String),
    /// See [`ProgressCallback::on_task_complete`]
    TaskComplete {
        /// Task target branch
        target_branch: String,
        /// Whether the task succeeded
        success: bool,
    },
    /// See [`ProgressCallback::on_clone_progress`]
    Clone(u8),
}

/// Progress callback forwarding events into a channel
///
/// Send failures (receiver dropped) are ignored.
pub struct ChannelProgress {
    sender: UnboundedSender<ProgressEvent>,
}

impl ChannelProgress {
    /// Wrap a sender
    pub const fn new(sender: UnboundedSender<ProgressEvent>) -> Self {
        Self { sender }
    }
}

#[async_trait]
impl ProgressCallback for ChannelProgress {
    async fn on_phase(&self, target_branch: &str, phase: &TaskPhase) {
        let _ = self.sender.send(ProgressEvent::Phase {
            target_branch: target_branch.to_string(),
            phase: phase.clone(),
        });
    }

    async fn on_message(&self, message: &str) {
        let _ = self.sender.send(ProgressEvent::Message(message.to_string()));
    }

    async fn on_task_complete(&self, outcome: &TaskOutcome) {
        let _ = self.sender.send(ProgressEvent::TaskComplete {
            target_branch: outcome.target_branch.name.clone(),
            success: outcome.is_success(),
        });
    }

    async fn on_clone_progress(&self, percent: u8) {
        let _ = self.sender.send(ProgressEvent::Clone(percent));
    }
}
