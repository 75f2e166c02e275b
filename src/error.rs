//! Error types for backport
//!
//! Errors come in three explicit kinds: domain errors are user-facing and
//! carry only a message, transport errors wrap GitHub API failures, and
//! subprocess errors carry the git invocation that failed.

use std::fmt;
use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type
#[derive(Debug, Error)]
pub enum Error {
    /// User-facing failure; the message is all that should be shown
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// GitHub API failure
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// git subprocess failure
    #[error(transparent)]
    Subprocess(#[from] SubprocessError),

    /// Invalid or missing configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// No usable credentials
    #[error("authentication error: {0}")]
    Auth(String),

    /// Filesystem or process spawning failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Anything else
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether this error should be shown as a plain message, without
    /// diagnostic context
    pub const fn is_domain(&self) -> bool {
        matches!(self, Self::Domain(_))
    }

    /// The domain error, if this is one
    pub const fn as_domain(&self) -> Option<&DomainError> {
        match self {
            Self::Domain(e) => Some(e),
            _ => None,
        }
    }
}

/// User-facing failures of the backport workflow
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// Target (or source) branch missing upstream
    #[error("The branch \"{branch}\" is invalid or doesn't exist")]
    InvalidBranch {
        /// Branch name as requested
        branch: String,
    },

    /// Commit resolution produced nothing; the message is pre-rendered
    #[error("{message}")]
    NoCommits {
        /// Rendered explanation
        message: String,
    },

    /// Exact revision lookup failed
    #[error("No commit found on branch \"{branch}\" with sha \"{sha}\"")]
    CommitNotFound {
        /// Source branch searched
        branch: String,
        /// Requested revision id
        sha: String,
    },

    /// Author filter names an unknown GitHub user
    #[error("No GitHub user found with login \"{login}\"")]
    UnknownAuthor {
        /// Requested login
        login: String,
    },

    /// User declined to continue conflict resolution
    #[error("Aborted")]
    Aborted,

    /// Cherry-pick produced no changes
    #[error(
        "Cherry-pick failed because the selected commit ({sha}) is empty. Did you already backport this commit?"
    )]
    EmptyCherryPick {
        /// Short sha of the commit
        sha: String,
    },

    /// Conflict hit while running non-interactively
    #[error("Commit {sha} could not be cherry-picked due to conflicts")]
    ConflictsInCi {
        /// Short sha of the commit
        sha: String,
    },

    /// Nothing to backport into
    #[error("{0}")]
    NoTargetBranches(String),

    /// Label mapping disagreed between commits under the reject policy
    #[error("The selected commits map to different target branches: {details}")]
    MismatchedTargetBranches {
        /// Per-commit branch sets
        details: String,
    },
}

impl DomainError {
    /// Build the "no commits" error for a history query
    pub fn no_commits(author: Option<&str>, path: Option<&str>) -> Self {
        let path_text = path
            .map(|p| format!(" touching files in path: \"{p}\""))
            .unwrap_or_default();
        let message = match author {
            Some(author) => format!(
                "There are no commits by \"{author}\" in this repository{path_text}. Try with `--all` for commits by all users or `--author=<username>` for commits from a specific user"
            ),
            None => format!("There are no commits in this repository{path_text}"),
        };
        Self::NoCommits { message }
    }
}

/// A GitHub API failure with its structured error body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportError {
    /// What we were doing (e.g. "create pull request")
    pub context: String,
    /// Top-level message from the API
    pub message: String,
    /// Field-level errors, rendered
    pub errors: Vec<String>,
    /// Link to the relevant API docs
    pub documentation_url: Option<String>,
    /// HTTP status, when known
    pub status: Option<u16>,
}

impl TransportError {
    /// Create a transport error with just a context and message
    pub fn new(context: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            context: context.into(),
            message: message.into(),
            errors: Vec::new(),
            documentation_url: None,
            status: None,
        }
    }

    /// Replace the context (used when an error bubbles up through `?`)
    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GitHub API error ({}): {}", self.context, self.message)?;
        if let Some(status) = self.status {
            write!(f, " [HTTP {status}]")?;
        }
        for error in &self.errors {
            write!(f, "\n  - {error}")?;
        }
        if let Some(url) = &self.documentation_url {
            write!(f, "\n  see {url}")?;
        }
        Ok(())
    }
}

impl std::error::Error for TransportError {}

impl From<octocrab::Error> for TransportError {
    fn from(err: octocrab::Error) -> Self {
        match err {
            octocrab::Error::GitHub { source, .. } => Self {
                context: "GitHub REST request".to_string(),
                message: source.message.clone(),
                errors: source
                    .errors
                    .as_ref()
                    .map(|errors| errors.iter().map(ToString::to_string).collect())
                    .unwrap_or_default(),
                documentation_url: source.documentation_url.clone(),
                status: Some(source.status_code.as_u16()),
            },
            other => Self::new("GitHub REST request", other.to_string()),
        }
    }
}

impl From<octocrab::Error> for Error {
    fn from(err: octocrab::Error) -> Self {
        Self::Transport(err.into())
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(TransportError {
            status: err.status().map(|s| s.as_u16()),
            ..TransportError::new("GitHub GraphQL request", err.to_string())
        })
    }
}

/// A git invocation that exited unsuccessfully
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubprocessError {
    /// Command line, without secrets
    pub command: String,
    /// Exit code (None when killed by a signal)
    pub code: Option<i32>,
    /// Captured stdout
    pub stdout: String,
    /// Captured stderr
    pub stderr: String,
}

impl fmt::Display for SubprocessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "`{}` failed with exit code {code}", self.command)?,
            None => write!(f, "`{}` was terminated by a signal", self.command)?,
        }
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            write!(f, ": {stderr}")?;
        }
        Ok(())
    }
}

impl std::error::Error for SubprocessError {}

impl SubprocessError {
    /// Whether either output stream contains `needle`
    pub fn output_contains(&self, needle: &str) -> bool {
        self.stderr.contains(needle) || self.stdout.contains(needle)
    }
}
