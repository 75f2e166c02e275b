//! Shared command context
//!
//! Loads and merges configuration, authenticates, and prepares the local
//! clone with its remotes.

use backport::auth::get_github_auth;
use backport::backport::ProgressCallback;
use backport::config::{
    ConfigFile, RunOptions, ensure_global_config, find_project_config, load_config_file,
    repo_path,
};
use backport::error::{Error, Result};
use backport::git::{GitCli, GitClient, remote_url};
use backport::platform::{GitHubService, PlatformService};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Everything a backport run needs
///
/// This performs the common setup:
/// - Merge global, project and command-line configuration
/// - Resolve the access token and username
/// - Create the platform service
/// - Clone the repository (first run) and point remotes at upstream and fork
pub struct CommandContext {
    /// Validated options, with token and username filled in
    pub options: RunOptions,
    /// Platform service
    pub platform: Box<dyn PlatformService>,
    /// The local clone
    pub git: GitCli,
}

/// Merge config layers: global, then project, then `overrides`
pub fn load_config(home: &Path, cwd: &Path, overrides: ConfigFile) -> Result<ConfigFile> {
    let global_path = ensure_global_config(home)?;
    let global = load_config_file(&global_path)?;

    let project = match find_project_config(cwd) {
        Some(path) => {
            debug!(path = %path.display(), "using project config");
            load_config_file(&path)?
        }
        None => ConfigFile::default(),
    };

    Ok(global.overlay(project).overlay(overrides))
}

fn create_platform(options: &RunOptions, token: &str) -> Result<GitHubService> {
    let host = (options.git_hostname != "github.com").then(|| options.git_hostname.clone());
    match &options.github_api_base_url_v4 {
        Some(graphql_url) => GitHubService::with_api_urls(
            token,
            options.repo_owner.clone(),
            options.repo_name.clone(),
            host,
            options.github_api_base_url_v3.as_deref(),
            graphql_url,
        ),
        None => GitHubService::new(
            token,
            options.repo_owner.clone(),
            options.repo_name.clone(),
            host,
        ),
    }
}

impl CommandContext {
    /// Create a new command context
    pub async fn new(
        cwd: &Path,
        overrides: ConfigFile,
        progress: &dyn ProgressCallback,
    ) -> Result<Self> {
        let home: PathBuf = dirs::home_dir()
            .ok_or_else(|| Error::Config("could not determine home directory".to_string()))?;

        let mut options = RunOptions::resolve(load_config(&home, cwd, overrides)?)?;

        let auth = get_github_auth(options.access_token.as_deref(), &options.git_hostname).await?;
        debug!(source = %auth.source, "resolved access token");
        options.access_token = Some(auth.token.clone());

        let platform = create_platform(&options, &auth.token)?;

        if options.username.is_none() {
            options.username = Some(platform.current_user_login().await?);
        }

        let path = repo_path(&home, &options.repo_owner, &options.repo_name);
        let upstream_url = remote_url(
            &options.git_hostname,
            &auth.token,
            &options.repo_owner,
            &options.repo_name,
        );
        let git = if GitCli::is_cloned(&path) {
            GitCli::new(&path)
        } else {
            progress
                .on_message(&format!(
                    "Cloning {}/{} into {}",
                    options.repo_owner,
                    options.repo_name,
                    path.display()
                ))
                .await;
            GitCli::clone_repo(&upstream_url, &path, progress).await?
        };

        git.setup_remote(&options.repo_owner, &upstream_url).await?;
        if options.fork {
            let fork_owner = options.push_remote()?;
            let fork_url = remote_url(
                &options.git_hostname,
                &auth.token,
                fork_owner,
                &options.repo_name,
            );
            git.setup_remote(fork_owner, &fork_url).await?;
        }

        Ok(Self {
            options,
            platform: Box::new(platform),
            git,
        })
    }
}
