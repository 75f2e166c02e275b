//! Backport engine
//!
//! Planning is pure ([`create_backport_plan`]); execution is effectful
//! ([`execute_backports`]) and only talks to the outside world through the
//! collaborator traits.

mod conflict;
mod execute;
pub mod naming;
mod plan;
mod progress;
mod publish;

pub use conflict::{
    ConflictOptions, ConflictResolution, ConflictState, conflict_prompt, resolve_conflicts,
};
pub use execute::{
    BackportRunResult, Collaborators, TaskOutcome, TaskStatus, execute_backports,
};
pub use plan::{BackportPlan, BackportTask, create_backport_plan};
pub use progress::{ChannelProgress, NoopProgress, ProgressCallback, ProgressEvent, TaskPhase};
pub use publish::{FollowUps, Published, build_pull_request_payload, publish_pull_request};
