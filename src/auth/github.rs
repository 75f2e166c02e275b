//! GitHub token lookup

use super::AuthSource;
use crate::error::{Error, Result};
use std::env;
use tokio::process::Command;
use tracing::debug;

/// Environment variables checked for a token, in order
pub const TOKEN_ENV_VARS: [&str; 2] = ["GITHUB_TOKEN", "GH_TOKEN"];

/// A resolved GitHub token
#[derive(Debug, Clone)]
pub struct GitHubAuthConfig {
    /// Access token
    pub token: String,
    /// Where the token came from
    pub source: AuthSource,
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Token from the environment, if any
pub fn token_from_env() -> Option<String> {
    TOKEN_ENV_VARS
        .iter()
        .find_map(|var| env::var(var).ok().as_deref().and_then(non_empty))
}

async fn token_from_gh_cli(hostname: &str) -> Option<String> {
    let mut cmd = Command::new("gh");
    cmd.args(["auth", "token"]);
    if hostname != "github.com" {
        cmd.args(["--hostname", hostname]);
    }
    match cmd.output().await {
        Ok(output) if output.status.success() => {
            non_empty(&String::from_utf8_lossy(&output.stdout))
        }
        Ok(output) => {
            debug!(code = ?output.status.code(), "gh auth token returned no token");
            None
        }
        Err(e) => {
            debug!(error = %e, "gh cli not available");
            None
        }
    }
}

/// Find a GitHub token
///
/// Order: `configured`, then [`TOKEN_ENV_VARS`], then `gh auth token`.
pub async fn get_github_auth(configured: Option<&str>, hostname: &str) -> Result<GitHubAuthConfig> {
    if let Some(token) = configured.and_then(non_empty) {
        return Ok(GitHubAuthConfig {
            token,
            source: AuthSource::Config,
        });
    }

    if let Some(token) = token_from_env() {
        debug!("using GitHub token from environment");
        return Ok(GitHubAuthConfig {
            token,
            source: AuthSource::EnvVar,
        });
    }

    if let Some(token) = token_from_gh_cli(hostname).await {
        debug!("using GitHub token from gh cli");
        return Ok(GitHubAuthConfig {
            token,
            source: AuthSource::Cli,
        });
    }

    Err(Error::Auth(format!(
        "no GitHub token found for {hostname}. Set access_token in ~/.backport/config.toml, export GITHUB_TOKEN, or run `gh auth login`"
    )))
}
