//! Run configuration
//!
//! Options come from three layers, later ones winning:
//! 1. global config (`~/.backport/config.toml`)
//! 2. project config (nearest `.backportrc.toml`)
//! 3. command-line flags
//!
//! Each layer is a [`ConfigFile`] with every field optional. The merged
//! result is validated into [`RunOptions`], which the engine only reads.

mod storage;

pub use storage::{
    GLOBAL_CONFIG_FILE, PROJECT_CONFIG_FILE, ensure_global_config, find_project_config,
    global_config_path, load_config_file, repo_path,
};

use crate::backport::naming::{DEFAULT_PR_DESCRIPTION, DEFAULT_PR_TITLE};
use crate::branches::BranchLabelMapping;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Default number of commits listed for selection
pub const DEFAULT_MAX_NUMBER: usize = 10;

/// Largest page GitHub's GraphQL `history(first:)` accepts
pub const MAX_HISTORY_PAGE: usize = 100;

/// How label-derived target branches combine across commits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetBranchPolicy {
    /// Every branch any commit maps to
    #[default]
    Union,
    /// Only branches every commit maps to
    Intersection,
    /// Fail unless all commits map to the same branches
    Reject,
}

impl FromStr for TargetBranchPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "union" => Ok(Self::Union),
            "intersection" => Ok(Self::Intersection),
            "reject" => Ok(Self::Reject),
            other => Err(Error::Config(format!(
                "unknown target branch policy \"{other}\" (expected union, intersection or reject)"
            ))),
        }
    }
}

/// One `label pattern -> branch` rule
///
/// `pattern` is a regular expression; `branch` may use `$1`-style capture
/// references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelMapping {
    /// Regex matched against PR label names
    pub pattern: String,
    /// Target branch, with capture references expanded
    pub branch: String,
}

/// One configuration layer; every field is optional
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
#[allow(missing_docs)]
pub struct ConfigFile {
    pub repo_owner: Option<String>,
    pub repo_name: Option<String>,
    pub access_token: Option<String>,
    pub username: Option<String>,
    pub author: Option<String>,
    pub all: Option<bool>,
    pub path: Option<String>,
    pub max_number: Option<usize>,
    pub sha: Option<String>,
    pub source_branch: Option<String>,
    pub target_branches: Option<Vec<String>>,
    pub target_branch_choices: Option<Vec<String>>,
    pub branch_label_mapping: Option<Vec<LabelMapping>>,
    pub target_branch_policy: Option<TargetBranchPolicy>,
    pub multiple_commits: Option<bool>,
    pub multiple_branches: Option<bool>,
    pub fork: Option<bool>,
    pub dry_run: Option<bool>,
    pub ci: Option<bool>,
    pub pr_title: Option<String>,
    pub pr_description: Option<String>,
    pub pr_description_suffix: Option<String>,
    pub target_pr_labels: Option<Vec<String>>,
    pub source_pr_labels: Option<Vec<String>>,
    pub assignees: Option<Vec<String>>,
    pub auto_assign: Option<bool>,
    pub draft: Option<bool>,
    pub maintainer_can_modify: Option<bool>,
    pub auto_stage: Option<bool>,
    pub reset_author: Option<bool>,
    pub git_author_name: Option<String>,
    pub git_author_email: Option<String>,
    pub mainline: Option<u32>,
    pub git_hostname: Option<String>,
    pub github_api_base_url_v3: Option<String>,
    pub github_api_base_url_v4: Option<String>,
}

macro_rules! overlay_fields {
    ($base:ident, $top:ident, $($field:ident),+ $(,)?) => {
        ConfigFile {
            $($field: $top.$field.or($base.$field),)+
        }
    };
}

impl ConfigFile {
    /// Layer `top` over `self`; fields set in `top` win
    #[must_use]
    pub fn overlay(self, top: Self) -> Self {
        let base = self;
        overlay_fields!(
            base,
            top,
            repo_owner,
            repo_name,
            access_token,
            username,
            author,
            all,
            path,
            max_number,
            sha,
            source_branch,
            target_branches,
            target_branch_choices,
            branch_label_mapping,
            target_branch_policy,
            multiple_commits,
            multiple_branches,
            fork,
            dry_run,
            ci,
            pr_title,
            pr_description,
            pr_description_suffix,
            target_pr_labels,
            source_pr_labels,
            assignees,
            auto_assign,
            draft,
            maintainer_can_modify,
            auto_stage,
            reset_author,
            git_author_name,
            git_author_email,
            mainline,
            git_hostname,
            github_api_base_url_v3,
            github_api_base_url_v4,
        )
    }
}

/// Validated options for one run
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs, clippy::struct_excessive_bools)]
pub struct RunOptions {
    pub repo_owner: String,
    pub repo_name: String,
    pub access_token: Option<String>,
    pub username: Option<String>,
    pub author: Option<String>,
    pub all: bool,
    pub path: Option<String>,
    pub max_number: usize,
    pub sha: Option<String>,
    pub source_branch: String,
    pub target_branches: Vec<String>,
    pub target_branch_choices: Vec<String>,
    pub branch_label_mapping: BranchLabelMapping,
    pub target_branch_policy: TargetBranchPolicy,
    pub multiple_commits: bool,
    pub multiple_branches: bool,
    pub fork: bool,
    pub dry_run: bool,
    pub ci: bool,
    pub pr_title: String,
    pub pr_description: String,
    pub pr_description_suffix: Option<String>,
    pub target_pr_labels: Vec<String>,
    pub source_pr_labels: Vec<String>,
    pub assignees: Vec<String>,
    pub auto_assign: bool,
    pub draft: bool,
    pub maintainer_can_modify: bool,
    pub auto_stage: bool,
    pub reset_author: bool,
    pub git_author_name: Option<String>,
    pub git_author_email: Option<String>,
    pub mainline: Option<u32>,
    pub git_hostname: String,
    pub github_api_base_url_v3: Option<String>,
    pub github_api_base_url_v4: Option<String>,
}

impl RunOptions {
    /// Validate a merged configuration
    pub fn resolve(config: ConfigFile) -> Result<Self> {
        let repo_owner = config
            .repo_owner
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                Error::Config(
                    "repository owner is missing (use --repo owner/name or set repo_owner)".to_string(),
                )
            })?;
        let repo_name = config
            .repo_name
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                Error::Config(
                    "repository name is missing (use --repo owner/name or set repo_name)".to_string(),
                )
            })?;

        let branch_label_mapping =
            BranchLabelMapping::compile(&config.branch_label_mapping.unwrap_or_default())?;

        let max_number = config.max_number.unwrap_or(DEFAULT_MAX_NUMBER);
        if !(1..=MAX_HISTORY_PAGE).contains(&max_number) {
            return Err(Error::Config(format!(
                "max_number must be between 1 and {MAX_HISTORY_PAGE}"
            )));
        }

        let reset_author = config.reset_author.unwrap_or(false);
        if reset_author && (config.git_author_name.is_none() || config.git_author_email.is_none()) {
            return Err(Error::Config(
                "reset_author requires git_author_name and git_author_email".to_string(),
            ));
        }

        Ok(Self {
            repo_owner,
            repo_name,
            access_token: config.access_token.filter(|s| !s.is_empty()),
            username: config.username.filter(|s| !s.is_empty()),
            author: config.author,
            all: config.all.unwrap_or(false),
            path: config.path,
            max_number,
            sha: config.sha,
            source_branch: config.source_branch.unwrap_or_else(|| "main".to_string()),
            target_branches: config.target_branches.unwrap_or_default(),
            target_branch_choices: config.target_branch_choices.unwrap_or_default(),
            branch_label_mapping,
            target_branch_policy: config.target_branch_policy.unwrap_or_default(),
            multiple_commits: config.multiple_commits.unwrap_or(false),
            multiple_branches: config.multiple_branches.unwrap_or(true),
            fork: config.fork.unwrap_or(true),
            dry_run: config.dry_run.unwrap_or(false),
            ci: config.ci.unwrap_or(false),
            pr_title: config.pr_title.unwrap_or_else(|| DEFAULT_PR_TITLE.to_string()),
            pr_description: config
                .pr_description
                .unwrap_or_else(|| DEFAULT_PR_DESCRIPTION.to_string()),
            pr_description_suffix: config.pr_description_suffix,
            target_pr_labels: config.target_pr_labels.unwrap_or_default(),
            source_pr_labels: config.source_pr_labels.unwrap_or_default(),
            assignees: config.assignees.unwrap_or_default(),
            auto_assign: config.auto_assign.unwrap_or(false),
            draft: config.draft.unwrap_or(false),
            maintainer_can_modify: config.maintainer_can_modify.unwrap_or(false),
            auto_stage: config.auto_stage.unwrap_or(false),
            reset_author,
            git_author_name: config.git_author_name,
            git_author_email: config.git_author_email,
            mainline: config.mainline,
            git_hostname: config
                .git_hostname
                .unwrap_or_else(|| "github.com".to_string()),
            github_api_base_url_v3: config.github_api_base_url_v3,
            github_api_base_url_v4: config.github_api_base_url_v4,
        })
    }

    /// Author login to filter history by; `None` lists all authors
    ///
    /// Defaults to the configured username unless `all` is set.
    pub fn author_filter(&self) -> Option<&str> {
        if self.all {
            return None;
        }
        self.author.as_deref().or(self.username.as_deref())
    }

    /// Remote the backport branch is pushed to
    pub fn push_remote(&self) -> Result<&str> {
        if self.fork {
            self.username
                .as_deref()
                .ok_or_else(|| {
                    Error::Config("username is required when pushing to a fork".to_string())
                })
        } else {
            Ok(&self.repo_owner)
        }
    }

    /// Assignees for created PRs (`auto_assign` assigns the user)
    pub fn effective_assignees(&self) -> Vec<String> {
        match (self.auto_assign, self.username.as_ref()) {
            (true, Some(user)) if !self.assignees.contains(user) => {
                let mut all = self.assignees.clone();
                all.push(user.clone());
                all
            }
            _ => self.assignees.clone(),
        }
    }

    /// Author to stamp on cherry-picked commits, when configured
    pub fn author_override(&self) -> Option<(&str, &str)> {
        if !self.reset_author {
            return None;
        }
        self.git_author_name
            .as_deref()
            .zip(self.git_author_email.as_deref())
    }
}
