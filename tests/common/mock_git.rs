//! Mock git client for testing
//!
//! Records every call as a short string and replays scripted working-copy
//! states for the conflict loop.

#![allow(dead_code)]

use async_trait::async_trait;
use backport::error::{DomainError, Error, Result};
use backport::git::{CherryPickOutcome, ContinueOutcome, GitClient};
use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Working copy as seen by one inspection
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub unmerged: Vec<String>,
    pub unstaged: Vec<String>,
}

impl Snapshot {
    /// Files with conflict markers
    pub fn unmerged(paths: &[&str]) -> Self {
        Self {
            unmerged: paths.iter().map(ToString::to_string).collect(),
            unstaged: Vec::new(),
        }
    }

    /// Markers gone but changes not staged
    pub fn unstaged(paths: &[&str]) -> Self {
        Self {
            unmerged: Vec::new(),
            unstaged: paths.iter().map(ToString::to_string).collect(),
        }
    }
}

pub struct MockGitClient {
    repo_path: PathBuf,
    calls: Mutex<Vec<String>>,
    conflicting_shas: Mutex<HashSet<String>>,
    empty_shas: Mutex<HashSet<String>>,
    missing_branches: Mutex<HashSet<String>>,
    snapshots: Mutex<VecDeque<Snapshot>>,
    current: Mutex<Snapshot>,
    continue_outcome: Mutex<ContinueOutcome>,
    error_on_push: Mutex<Option<String>>,
}

impl MockGitClient {
    pub fn new() -> Self {
        Self {
            repo_path: PathBuf::from("/tmp/backport/repositories/elastic/kibana"),
            calls: Mutex::new(Vec::new()),
            conflicting_shas: Mutex::new(HashSet::new()),
            empty_shas: Mutex::new(HashSet::new()),
            missing_branches: Mutex::new(HashSet::new()),
            snapshots: Mutex::new(VecDeque::new()),
            current: Mutex::new(Snapshot::default()),
            continue_outcome: Mutex::new(ContinueOutcome::Continued),
            error_on_push: Mutex::new(None),
        }
    }

    // === Scripting ===

    /// Cherry-picking `sha` stops on conflicts
    pub fn conflict_on(&self, sha: &str) {
        self.conflicting_shas.lock().unwrap().insert(sha.to_string());
    }

    /// Cherry-picking `sha` produces an empty commit
    pub fn empty_on(&self, sha: &str) {
        self.empty_shas.lock().unwrap().insert(sha.to_string());
    }

    /// Fetching `branch` fails as if it doesn't exist upstream
    pub fn missing_branch(&self, branch: &str) {
        self.missing_branches
            .lock()
            .unwrap()
            .insert(branch.to_string());
    }

    /// States returned by successive inspections; clean once exhausted
    pub fn script_snapshots(&self, snapshots: Vec<Snapshot>) {
        *self.snapshots.lock().unwrap() = snapshots.into();
    }

    pub fn set_continue_outcome(&self, outcome: ContinueOutcome) {
        *self.continue_outcome.lock().unwrap() = outcome;
    }

    pub fn fail_push(&self, msg: &str) {
        *self.error_on_push.lock().unwrap() = Some(msg.to_string());
    }

    // === Call inspection ===

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of recorded calls starting with `prefix`
    pub fn count(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

impl Default for MockGitClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GitClient for MockGitClient {
    fn repo_path(&self) -> &Path {
        &self.repo_path
    }

    async fn reset_and_clean(&self) -> Result<()> {
        self.record("reset".to_string());
        Ok(())
    }

    async fn fetch_branch(&self, remote: &str, branch: &str) -> Result<()> {
        self.record(format!("fetch {remote} {branch}"));
        if self.missing_branches.lock().unwrap().contains(branch) {
            return Err(DomainError::InvalidBranch {
                branch: branch.to_string(),
            }
            .into());
        }
        Ok(())
    }

    async fn checkout_new_branch(&self, branch: &str, start_point: &str) -> Result<()> {
        self.record(format!("checkout {branch} {start_point}"));
        Ok(())
    }

    async fn cherry_pick(&self, sha: &str, mainline: Option<u32>) -> Result<CherryPickOutcome> {
        match mainline {
            Some(m) => self.record(format!("cherry-pick -m {m} {sha}")),
            None => self.record(format!("cherry-pick {sha}")),
        }
        if self.empty_shas.lock().unwrap().contains(sha) {
            return Err(DomainError::EmptyCherryPick {
                sha: sha.chars().take(7).collect(),
            }
            .into());
        }
        if self.conflicting_shas.lock().unwrap().contains(sha) {
            return Ok(CherryPickOutcome::Conflict);
        }
        Ok(CherryPickOutcome::Applied)
    }

    async fn cherry_pick_continue(&self) -> Result<ContinueOutcome> {
        self.record("continue".to_string());
        Ok(*self.continue_outcome.lock().unwrap())
    }

    async fn conflicting_files(&self) -> Result<Vec<String>> {
        self.record("diff-check".to_string());
        let next = self.snapshots.lock().unwrap().pop_front().unwrap_or_default();
        let unmerged = next.unmerged.clone();
        *self.current.lock().unwrap() = next;
        Ok(unmerged)
    }

    async fn unstaged_files(&self) -> Result<Vec<String>> {
        self.record("diff-names".to_string());
        Ok(self.current.lock().unwrap().unstaged.clone())
    }

    async fn stage_all(&self) -> Result<()> {
        self.record("stage".to_string());
        self.current.lock().unwrap().unstaged.clear();
        Ok(())
    }

    async fn amend_author(&self, name: &str, email: &str) -> Result<()> {
        self.record(format!("amend {name} <{email}>"));
        Ok(())
    }

    async fn push_branch(&self, remote: &str, branch: &str) -> Result<()> {
        self.record(format!("push {remote} {branch}"));
        match self.error_on_push.lock().unwrap().as_ref() {
            Some(msg) => Err(Error::Internal(msg.clone())),
            None => Ok(()),
        }
    }

    async fn delete_branch(&self, source_branch: &str, branch: &str) -> Result<()> {
        self.record(format!("delete {branch} from {source_branch}"));
        Ok(())
    }

    async fn setup_remote(&self, name: &str, url: &str) -> Result<()> {
        self.record(format!("remote {name} {url}"));
        Ok(())
    }
}
