//! Shared fixtures for integration and unit tests

#![allow(dead_code)]

pub mod mock_git;
pub mod mock_platform;
pub mod mock_prompt;

pub use mock_git::{MockGitClient, Snapshot};
pub use mock_platform::MockPlatformService;
pub use mock_prompt::ScriptedPrompter;

use backport::config::{ConfigFile, RunOptions};
use backport::types::{AssociatedPullRequest, Commit, RemoteCommit};

/// Options for `elastic/kibana`, pushing to the `sqren` fork
pub fn make_options() -> RunOptions {
    make_options_with(ConfigFile::default())
}

/// Like [`make_options`] with some fields overridden
pub fn make_options_with(overrides: ConfigFile) -> RunOptions {
    let base = ConfigFile {
        repo_owner: Some("elastic".to_string()),
        repo_name: Some("kibana".to_string()),
        username: Some("sqren".to_string()),
        access_token: Some("token".to_string()),
        ..ConfigFile::default()
    };
    RunOptions::resolve(base.overlay(overrides)).unwrap()
}

/// A commit from PR `pull_number` on main
pub fn make_commit(sha: &str, message: &str, pull_number: Option<u64>) -> Commit {
    let formatted = match pull_number {
        Some(n) if !message.ends_with(&format!("(#{n})")) => format!("{message} (#{n})"),
        _ => message.to_string(),
    };
    Commit {
        sha: sha.to_string(),
        original_message: message.to_string(),
        pull_number,
        formatted_message: formatted,
        source_branch: "main".to_string(),
        target_branches_from_labels: vec![],
        existing_target_pull_requests: vec![],
        committed_date: None,
    }
}

/// A history entry whose PR (if any) merged as exactly this commit
pub fn make_remote_commit(
    sha: &str,
    message: &str,
    pull_number: Option<u64>,
    labels: &[&str],
) -> RemoteCommit {
    RemoteCommit {
        sha: sha.to_string(),
        message: message.to_string(),
        committed_date: None,
        associated_pull_request: pull_number.map(|number| AssociatedPullRequest {
            number,
            repo_owner: "elastic".to_string(),
            repo_name: "kibana".to_string(),
            merge_commit_sha: Some(sha.to_string()),
            base_ref: "main".to_string(),
            labels: labels.iter().map(ToString::to_string).collect(),
            cross_references: vec![],
        }),
    }
}
