//! `GitClient` backed by the git executable

use super::signature::{
    is_already_exists, is_cherry_pick_conflict, is_empty_cherry_pick, is_missing_remote_ref,
    is_no_cherry_pick_in_progress, is_no_such_remote, parse_changed_paths, parse_conflicting_files,
};
use super::{CherryPickOutcome, ContinueOutcome, GitClient};
use crate::backport::ProgressCallback;
use crate::error::{DomainError, Result, SubprocessError};
use crate::types::short_sha;
use async_trait::async_trait;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::sync::LazyLock;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tracing::{debug, info};

static CLONE_PROGRESS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Receiving objects:\s+(\d+)%").expect("valid regex"));

/// Build the authenticated HTTPS URL for a remote
pub fn remote_url(git_hostname: &str, access_token: &str, owner: &str, repo: &str) -> String {
    format!("https://x-access-token:{access_token}@{git_hostname}/{owner}/{repo}.git")
}

/// Hide credentials embedded in a URL argument
fn redact(arg: &str) -> String {
    match (arg.find("x-access-token:"), arg.find('@')) {
        (Some(start), Some(end)) if start < end => {
            let prefix_end = start + "x-access-token:".len();
            format!("{}***{}", &arg[..prefix_end], &arg[end..])
        }
        _ => arg.to_string(),
    }
}

fn command_line(args: &[&str]) -> String {
    let rendered: Vec<String> = args.iter().map(|a| redact(a)).collect();
    format!("git {}", rendered.join(" "))
}

fn subprocess_error(args: &[&str], output: &Output) -> SubprocessError {
    SubprocessError {
        command: command_line(args),
        code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    }
}

fn git_command(cwd: &Path) -> Command {
    let mut cmd = Command::new("git");
    cmd.current_dir(cwd)
        .env("GIT_TERMINAL_PROMPT", "0")
        .env("LC_ALL", "C")
        .stdin(Stdio::null());
    cmd
}

/// Git executable operating on one clone
#[derive(Debug, Clone)]
pub struct GitCli {
    repo_path: PathBuf,
}

impl GitCli {
    /// Use an existing clone
    pub fn new(repo_path: impl Into<PathBuf>) -> Self {
        Self {
            repo_path: repo_path.into(),
        }
    }

    /// Whether a clone already exists at `repo_path`
    pub fn is_cloned(repo_path: &Path) -> bool {
        repo_path.join(".git").exists()
    }

    /// Clone `url` into `repo_path`, reporting transfer progress
    pub async fn clone_repo(
        url: &str,
        repo_path: &Path,
        progress: &dyn ProgressCallback,
    ) -> Result<Self> {
        let parent = repo_path.parent().unwrap_or(repo_path);
        tokio::fs::create_dir_all(parent).await?;

        let path_arg = repo_path.to_string_lossy().into_owned();
        let args = ["clone", "--progress", url, path_arg.as_str()];
        debug!(command = %command_line(&args), "cloning");

        let mut child = git_command(parent)
            .args(args)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()?;

        let mut stderr_text = String::new();
        if let Some(mut stderr) = child.stderr.take() {
            let mut buf = [0_u8; 4096];
            let mut last_percent = None;
            loop {
                let n = stderr.read(&mut buf).await?;
                if n == 0 {
                    break;
                }
                let chunk = String::from_utf8_lossy(&buf[..n]);
                for caps in CLONE_PROGRESS.captures_iter(&chunk) {
                    if let Ok(percent) = caps[1].parse::<u8>()
                        && last_percent != Some(percent)
                    {
                        last_percent = Some(percent);
                        progress.on_clone_progress(percent).await;
                    }
                }
                stderr_text.push_str(&chunk);
            }
        }

        let status = child.wait().await?;
        if !status.success() {
            return Err(SubprocessError {
                command: command_line(&args),
                code: status.code(),
                stdout: String::new(),
                stderr: stderr_text,
            }
            .into());
        }

        info!(path = %repo_path.display(), "cloned repository");
        Ok(Self::new(repo_path))
    }

    /// Run git and return its output regardless of exit status
    async fn output(&self, args: &[&str]) -> Result<Output> {
        debug!(command = %command_line(args), "running git");
        Ok(git_command(&self.repo_path).args(args).output().await?)
    }

    /// Run git, failing on a non-zero exit
    async fn run(&self, args: &[&str]) -> std::result::Result<String, SubprocessError> {
        let output = match self.output(args).await {
            Ok(output) => output,
            Err(e) => {
                return Err(SubprocessError {
                    command: command_line(args),
                    code: None,
                    stdout: String::new(),
                    stderr: e.to_string(),
                });
            }
        };
        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        } else {
            let err = subprocess_error(args, &output);
            debug!(error = %err, "git failed");
            Err(err)
        }
    }
}

#[async_trait]
impl GitClient for GitCli {
    fn repo_path(&self) -> &Path {
        &self.repo_path
    }

    async fn reset_and_clean(&self) -> Result<()> {
        self.run(&["reset", "--hard"]).await?;
        self.run(&["clean", "-d", "--force"]).await?;
        Ok(())
    }

    async fn fetch_branch(&self, remote: &str, branch: &str) -> Result<()> {
        let refspec = format!("{branch}:{branch}");
        match self
            .run(&["fetch", remote, &refspec, "--force", "--update-head-ok"])
            .await
        {
            Ok(_) => Ok(()),
            Err(e) if is_missing_remote_ref(&e) => Err(DomainError::InvalidBranch {
                branch: branch.to_string(),
            }
            .into()),
            Err(e) => Err(e.into()),
        }
    }

    async fn checkout_new_branch(&self, branch: &str, start_point: &str) -> Result<()> {
        self.run(&["checkout", "-B", branch, start_point, "--no-track"])
            .await?;
        Ok(())
    }

    async fn cherry_pick(&self, sha: &str, mainline: Option<u32>) -> Result<CherryPickOutcome> {
        let mainline_arg = mainline.map(|m| m.to_string());
        let mut args = vec!["cherry-pick"];
        if let Some(m) = mainline_arg.as_deref() {
            args.extend(["-m", m]);
        }
        args.push(sha);

        match self.run(&args).await {
            Ok(_) => Ok(CherryPickOutcome::Applied),
            Err(e) if is_empty_cherry_pick(&e) => Err(DomainError::EmptyCherryPick {
                sha: short_sha(sha).to_string(),
            }
            .into()),
            Err(e) if is_cherry_pick_conflict(&e) => {
                debug!(sha, "cherry-pick stopped on conflicts");
                Ok(CherryPickOutcome::Conflict)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn cherry_pick_continue(&self) -> Result<ContinueOutcome> {
        match self
            .run(&["-c", "core.editor=true", "cherry-pick", "--continue"])
            .await
        {
            Ok(_) => Ok(ContinueOutcome::Continued),
            Err(e) if is_no_cherry_pick_in_progress(&e) => {
                info!("cherry-pick was already completed manually");
                Ok(ContinueOutcome::AlreadyCompleted)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn conflicting_files(&self) -> Result<Vec<String>> {
        let args = ["--no-pager", "diff", "--check"];
        let output = self.output(&args).await?;
        match output.status.code() {
            Some(0) => Ok(Vec::new()),
            // exit 2 = problems found; the listing is on stdout
            Some(2) => Ok(parse_conflicting_files(&String::from_utf8_lossy(
                &output.stdout,
            ))),
            _ => Err(subprocess_error(&args, &output).into()),
        }
    }

    async fn unstaged_files(&self) -> Result<Vec<String>> {
        let stdout = self.run(&["--no-pager", "diff", "--name-only"]).await?;
        Ok(parse_changed_paths(&stdout))
    }

    async fn stage_all(&self) -> Result<()> {
        self.run(&["add", "--update"]).await?;
        Ok(())
    }

    async fn amend_author(&self, name: &str, email: &str) -> Result<()> {
        let author = format!("{name} <{email}>");
        self.run(&["commit", "--amend", "--no-edit", "--author", &author])
            .await?;
        Ok(())
    }

    async fn push_branch(&self, remote: &str, branch: &str) -> Result<()> {
        let refspec = format!("{branch}:{branch}");
        self.run(&["push", remote, &refspec, "--force"]).await?;
        Ok(())
    }

    async fn delete_branch(&self, source_branch: &str, branch: &str) -> Result<()> {
        self.run(&["checkout", source_branch]).await?;
        self.run(&["branch", "-D", branch]).await?;
        Ok(())
    }

    async fn setup_remote(&self, name: &str, url: &str) -> Result<()> {
        match self.run(&["remote", "rm", name]).await {
            Ok(_) => {}
            Err(e) if is_no_such_remote(&e) => debug!(name, "remote did not exist"),
            Err(e) => return Err(e.into()),
        }
        match self.run(&["remote", "add", name, url]).await {
            Ok(_) => Ok(()),
            Err(e) if is_already_exists(&e) => {
                debug!(name, "remote already exists");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}
