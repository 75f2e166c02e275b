//! Authentication for GitHub
//!
//! Supports configured tokens, environment variables and the gh CLI.

mod github;

pub use github::{GitHubAuthConfig, TOKEN_ENV_VARS, get_github_auth, token_from_env};

/// Source of authentication token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthSource {
    /// Token from a config file or `--access-token`
    Config,
    /// Token from environment variable
    EnvVar,
    /// Token from the gh CLI
    Cli,
}

impl std::fmt::Display for AuthSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config => write!(f, "config"),
            Self::EnvVar => write!(f, "environment"),
            Self::Cli => write!(f, "gh cli"),
        }
    }
}
