//! backport - replay merged commits onto release branches
//!
//! This library provides the backport engine: it resolves which commits and
//! pull requests are involved, decides the target branches, cherry-picks the
//! commits onto a fresh branch per target, drives the human-in-the-loop
//! conflict retry loop, and opens a pull request for every target branch.
//!
//! # Architecture
//!
//! The engine is interface-agnostic. Every effectful collaborator is a trait
//! object passed in explicitly:
//! - [`git::GitClient`] - the single local working copy
//! - [`platform::PlatformService`] - the GitHub API
//! - [`prompt::Prompter`] - interactive questions
//! - [`backport::ProgressCallback`] - progress reporting
//!
//! All I/O is async and state is passed explicitly (no globals).

pub mod auth;
pub mod backport;
pub mod branches;
pub mod commits;
pub mod config;
pub mod error;
pub mod git;
pub mod platform;
pub mod prompt;
pub mod types;

pub use error::{DomainError, Error, Result};
pub use types::*;
