//! Target branch resolution
//!
//! Branches come from, in order of precedence: explicit arguments, labels
//! on the originating pull requests, or an interactive choice.

use crate::config::{LabelMapping, RunOptions, TargetBranchPolicy};
use crate::error::{DomainError, Error, Result};
use crate::prompt::Prompter;
use crate::types::{BranchSource, Commit, PrState, TargetBranch};
use regex::Regex;
use tracing::debug;

/// Compiled `label pattern -> branch` rules
#[derive(Debug, Clone, Default)]
pub struct BranchLabelMapping {
    rules: Vec<(Regex, String)>,
}

impl PartialEq for BranchLabelMapping {
    fn eq(&self, other: &Self) -> bool {
        self.rules.len() == other.rules.len()
            && self
                .rules
                .iter()
                .zip(&other.rules)
                .all(|((a, x), (b, y))| a.as_str() == b.as_str() && x == y)
    }
}

impl Eq for BranchLabelMapping {}

impl BranchLabelMapping {
    /// Compile the configured rules, rejecting invalid patterns
    pub fn compile(mapping: &[LabelMapping]) -> Result<Self> {
        let rules = mapping
            .iter()
            .map(|m| {
                Regex::new(&m.pattern)
                    .map(|re| (re, m.branch.clone()))
                    .map_err(|e| {
                        Error::Config(format!(
                            "invalid branch label pattern \"{}\": {e}",
                            m.pattern
                        ))
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { rules })
    }

    /// Check if no rules are configured
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Branch for a single label; the first matching rule wins
    pub fn branch_for_label(&self, label: &str) -> Option<String> {
        self.rules
            .iter()
            .find(|(re, _)| re.is_match(label))
            .map(|(re, branch)| re.replace(label, branch.as_str()).into_owned())
            .filter(|b| !b.is_empty())
    }

    /// Branches for a PR's labels, deduplicated in label order
    pub fn branches_for_labels(&self, labels: &[String]) -> Vec<String> {
        let mut branches: Vec<String> = Vec::new();
        for branch in labels.iter().filter_map(|l| self.branch_for_label(l)) {
            if !branches.contains(&branch) {
                branches.push(branch);
            }
        }
        branches
    }
}

/// Label-derived branches of one commit, minus branches it was already
/// backported to
fn pending_label_branches(commit: &Commit) -> Vec<String> {
    commit
        .target_branches_from_labels
        .iter()
        .filter(|branch| {
            let merged = commit
                .existing_target_pull_requests
                .iter()
                .any(|pr| &pr.branch == *branch && pr.state == PrState::Merged);
            if merged {
                debug!(sha = commit.short_sha(), branch = %branch, "already backported");
            }
            !merged
        })
        .cloned()
        .collect()
}

/// Combine per-commit branch lists under a policy
pub fn combine_label_branches(commits: &[Commit], policy: TargetBranchPolicy) -> Result<Vec<String>> {
    let per_commit: Vec<Vec<String>> = commits.iter().map(pending_label_branches).collect();

    match policy {
        TargetBranchPolicy::Union => {
            let mut all: Vec<String> = Vec::new();
            for branch in per_commit.iter().flatten() {
                if !all.contains(branch) {
                    all.push(branch.clone());
                }
            }
            Ok(all)
        }
        TargetBranchPolicy::Intersection => {
            let Some((first, rest)) = per_commit.split_first() else {
                return Ok(Vec::new());
            };
            Ok(first
                .iter()
                .filter(|b| rest.iter().all(|other| other.contains(b)))
                .cloned()
                .collect())
        }
        TargetBranchPolicy::Reject => {
            let Some(first) = per_commit.first() else {
                return Ok(Vec::new());
            };
            let same = |other: &Vec<String>| {
                other.len() == first.len() && other.iter().all(|b| first.contains(b))
            };
            if per_commit.iter().all(same) {
                return Ok(first.clone());
            }
            let details = commits
                .iter()
                .zip(&per_commit)
                .map(|(c, branches)| format!("{}: [{}]", c.long_ref(), branches.join(", ")))
                .collect::<Vec<_>>()
                .join("; ");
            Err(DomainError::MismatchedTargetBranches { details }.into())
        }
    }
}

fn dedup_names(names: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for name in names {
        let name = name.trim().to_string();
        if !name.is_empty() && !out.contains(&name) {
            out.push(name);
        }
    }
    out
}

/// Resolve the branches to backport into
///
/// Explicit branches win; then label-derived ones; then the user picks
/// from `target_branch_choices` (never in CI mode).
pub async fn resolve_target_branches(
    explicit: &[String],
    commits: &[Commit],
    options: &RunOptions,
    prompter: &dyn Prompter,
) -> Result<Vec<TargetBranch>> {
    let explicit = dedup_names(explicit.iter().cloned());
    if !explicit.is_empty() {
        return Ok(explicit
            .into_iter()
            .map(|b| TargetBranch::new(b, BranchSource::Explicit))
            .collect());
    }

    let from_labels = dedup_names(combine_label_branches(commits, options.target_branch_policy)?);
    if !from_labels.is_empty() {
        debug!(branches = ?from_labels, "target branches from labels");
        return Ok(from_labels
            .into_iter()
            .map(|b| TargetBranch::new(b, BranchSource::Label))
            .collect());
    }

    let choices = dedup_names(options.target_branch_choices.iter().cloned());
    if choices.is_empty() {
        return Err(DomainError::NoTargetBranches(
            "There are no branches to backport to. Pass --branch or configure target_branch_choices".to_string(),
        )
        .into());
    }
    if options.ci {
        return Err(DomainError::NoTargetBranches(
            "No target branch given and none could be derived from labels".to_string(),
        )
        .into());
    }

    let selected = dedup_names(
        prompter
            .select_branches(&choices, options.multiple_branches)
            .await?,
    );
    if selected.is_empty() {
        return Err(DomainError::NoTargetBranches("No target branch selected".to_string()).into());
    }
    Ok(selected
        .into_iter()
        .map(|b| TargetBranch::new(b, BranchSource::Prompt))
        .collect())
}
