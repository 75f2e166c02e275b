//! Mock platform service for testing
//!
//! These are test utilities - not all may be used in every test binary.

#![allow(dead_code)]

use async_trait::async_trait;
use backport::error::{DomainError, Error, Result, TransportError};
use backport::platform::PlatformService;
use backport::types::{
    HistoryQuery, PlatformConfig, PullRequest, PullRequestPayload, RemoteCommit,
};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

/// Call record for `add_labels`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelCall {
    pub number: u64,
    pub labels: Vec<String>,
}

/// Call record for `add_assignees`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssigneeCall {
    pub number: u64,
    pub assignees: Vec<String>,
}

/// Simple mock platform service for testing
///
/// Features:
/// - Auto-incrementing PR numbers
/// - Call tracking for verification
/// - Canned history, sha and author responses
/// - Error injection for failure path testing
pub struct MockPlatformService {
    config: PlatformConfig,
    next_pr_number: AtomicU64,
    login: String,
    history: Mutex<Vec<RemoteCommit>>,
    commits_by_sha: Mutex<HashMap<String, RemoteCommit>>,
    author_ids: Mutex<HashMap<String, String>>,
    // Call tracking
    history_calls: Mutex<Vec<HistoryQuery>>,
    create_pr_calls: Mutex<Vec<PullRequestPayload>>,
    label_calls: Mutex<Vec<LabelCall>>,
    assignee_calls: Mutex<Vec<AssigneeCall>>,
    // Error injection
    error_on_create_pr: Mutex<Option<String>>,
    error_on_add_labels: Mutex<Option<String>>,
    error_on_add_assignees: Mutex<Option<String>>,
    invalid_source_branch: Mutex<bool>,
}

impl MockPlatformService {
    /// Create a new mock with the given config
    pub fn with_config(config: PlatformConfig) -> Self {
        Self {
            config,
            next_pr_number: AtomicU64::new(100),
            login: "sqren".to_string(),
            history: Mutex::new(Vec::new()),
            commits_by_sha: Mutex::new(HashMap::new()),
            author_ids: Mutex::new(HashMap::new()),
            history_calls: Mutex::new(Vec::new()),
            create_pr_calls: Mutex::new(Vec::new()),
            label_calls: Mutex::new(Vec::new()),
            assignee_calls: Mutex::new(Vec::new()),
            error_on_create_pr: Mutex::new(None),
            error_on_add_labels: Mutex::new(None),
            error_on_add_assignees: Mutex::new(None),
            invalid_source_branch: Mutex::new(false),
        }
    }

    /// Mock for `elastic/kibana` on github.com
    pub fn new() -> Self {
        Self::with_config(PlatformConfig {
            owner: "elastic".to_string(),
            repo: "kibana".to_string(),
            host: None,
        })
    }

    // === Canned responses ===

    /// Set the commit history (newest first)
    pub fn set_history(&self, commits: Vec<RemoteCommit>) {
        *self.history.lock().unwrap() = commits;
    }

    /// Make a commit findable by sha
    pub fn add_commit(&self, commit: RemoteCommit) {
        self.commits_by_sha
            .lock()
            .unwrap()
            .insert(commit.sha.clone(), commit);
    }

    /// Register a GitHub user
    pub fn add_author(&self, login: &str, id: &str) {
        self.author_ids
            .lock()
            .unwrap()
            .insert(login.to_string(), id.to_string());
    }

    // === Error injection methods ===

    /// Make `create_pull_request` return an error
    pub fn fail_create_pr(&self, msg: &str) {
        *self.error_on_create_pr.lock().unwrap() = Some(msg.to_string());
    }

    /// Make `add_labels` return an error
    pub fn fail_add_labels(&self, msg: &str) {
        *self.error_on_add_labels.lock().unwrap() = Some(msg.to_string());
    }

    /// Make `add_assignees` return an error
    pub fn fail_add_assignees(&self, msg: &str) {
        *self.error_on_add_assignees.lock().unwrap() = Some(msg.to_string());
    }

    /// Make history queries report a missing source branch
    pub fn fail_source_branch(&self) {
        *self.invalid_source_branch.lock().unwrap() = true;
    }

    // === Call inspection ===

    pub fn history_calls(&self) -> Vec<HistoryQuery> {
        self.history_calls.lock().unwrap().clone()
    }

    pub fn create_pr_calls(&self) -> Vec<PullRequestPayload> {
        self.create_pr_calls.lock().unwrap().clone()
    }

    pub fn label_calls(&self) -> Vec<LabelCall> {
        self.label_calls.lock().unwrap().clone()
    }

    pub fn assignee_calls(&self) -> Vec<AssigneeCall> {
        self.assignee_calls.lock().unwrap().clone()
    }

    // === Assertion helpers ===

    /// Assert a PR was opened from `head` into `base`
    pub fn assert_pr_created(&self, head: &str, base: &str) {
        let calls = self.create_pr_calls();
        assert!(
            calls.iter().any(|c| c.head == head && c.base == base),
            "expected PR {head} -> {base}, got {calls:?}"
        );
    }
}

impl Default for MockPlatformService {
    fn default() -> Self {
        Self::new()
    }
}

fn injected(slot: &Mutex<Option<String>>, context: &str) -> Result<()> {
    match slot.lock().unwrap().as_ref() {
        Some(msg) => Err(Error::Transport(TransportError::new(context, msg.clone()))),
        None => Ok(()),
    }
}

#[async_trait]
impl PlatformService for MockPlatformService {
    async fn fetch_commit_by_sha(&self, sha: &str) -> Result<Option<RemoteCommit>> {
        let commits = self.commits_by_sha.lock().unwrap();
        Ok(commits
            .values()
            .find(|c| c.sha.starts_with(sha))
            .cloned())
    }

    async fn fetch_commit_history(&self, query: &HistoryQuery) -> Result<Vec<RemoteCommit>> {
        self.history_calls.lock().unwrap().push(query.clone());
        if *self.invalid_source_branch.lock().unwrap() {
            return Err(DomainError::InvalidBranch {
                branch: query.source_branch.clone(),
            }
            .into());
        }
        Ok(self
            .history
            .lock()
            .unwrap()
            .iter()
            .take(query.max_number)
            .cloned()
            .collect())
    }

    async fn fetch_author_id(&self, login: &str) -> Result<Option<String>> {
        Ok(self.author_ids.lock().unwrap().get(login).cloned())
    }

    async fn current_user_login(&self) -> Result<String> {
        Ok(self.login.clone())
    }

    async fn create_pull_request(&self, payload: &PullRequestPayload) -> Result<PullRequest> {
        self.create_pr_calls.lock().unwrap().push(payload.clone());
        injected(&self.error_on_create_pr, "create pull request")?;

        let number = self.next_pr_number.fetch_add(1, Ordering::SeqCst);
        Ok(PullRequest {
            number,
            html_url: format!(
                "https://github.com/{}/{}/pull/{number}",
                self.config.owner, self.config.repo
            ),
            base_ref: payload.base.clone(),
            head_ref: payload.branch_name.clone(),
            title: payload.title.clone(),
        })
    }

    async fn add_labels(&self, number: u64, labels: &[String]) -> Result<()> {
        self.label_calls.lock().unwrap().push(LabelCall {
            number,
            labels: labels.to_vec(),
        });
        injected(&self.error_on_add_labels, "add labels")
    }

    async fn add_assignees(&self, number: u64, assignees: &[String]) -> Result<()> {
        self.assignee_calls.lock().unwrap().push(AssigneeCall {
            number,
            assignees: assignees.to_vec(),
        });
        injected(&self.error_on_add_assignees, "add assignees")
    }

    fn config(&self) -> &PlatformConfig {
        &self.config
    }
}
