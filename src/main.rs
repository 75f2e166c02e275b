//! backport - CLI entry point

mod cli;

use anyhow::Context;
use anstream::eprintln;
use backport::config::{ConfigFile, TargetBranchPolicy};
use backport::error::Error;
use backport::platform::parse_repo_slug;
use clap::Parser;
use cli::style::Stylize;
use std::process::ExitCode;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser, Debug)]
#[command(name = "backport")]
#[command(version, about = "Backport merged commits to release branches", long_about = None)]
#[allow(clippy::struct_excessive_bools)]
struct Args {
    /// Repository as owner/name (or a GitHub URL)
    #[arg(long)]
    repo: Option<String>,

    /// Target branch to backport to (repeatable)
    #[arg(short = 'b', long = "branch")]
    branches: Vec<String>,

    /// Backport this commit instead of choosing from a list
    #[arg(long)]
    sha: Option<String>,

    /// Only list commits by this GitHub login
    #[arg(long, conflicts_with = "all")]
    author: Option<String>,

    /// List commits by all authors
    #[arg(long)]
    all: bool,

    /// Only list commits touching this path
    #[arg(long)]
    path: Option<String>,

    /// Number of commits to list
    #[arg(short = 'n', long)]
    max_number: Option<usize>,

    /// Branch the commits come from
    #[arg(long)]
    source_branch: Option<String>,

    /// Prepare branches locally but don't push or open pull requests
    #[arg(long)]
    dry_run: bool,

    /// Push to the upstream repository instead of your fork
    #[arg(long)]
    no_fork: bool,

    /// Non-interactive mode: never prompt, fail on conflicts
    #[arg(long)]
    ci: bool,

    /// Label to add to the backport pull request (repeatable)
    #[arg(short = 'l', long = "label")]
    labels: Vec<String>,

    /// Label to add to the original pull request (repeatable)
    #[arg(long = "source-pr-label")]
    source_pr_labels: Vec<String>,

    /// User to assign to the backport pull request (repeatable)
    #[arg(long = "assignee")]
    assignees: Vec<String>,

    /// Assign the backport pull request to yourself
    #[arg(long)]
    auto_assign: bool,

    /// Select multiple commits and branches
    #[arg(long)]
    multiple: bool,

    /// Select multiple commits
    #[arg(long)]
    multiple_commits: bool,

    /// Select multiple target branches
    #[arg(long)]
    multiple_branches: bool,

    /// How label-derived branches combine across commits
    #[arg(long, value_name = "union|intersection|reject")]
    target_branch_policy: Option<TargetBranchPolicy>,

    /// Pull request title template
    #[arg(long)]
    pr_title: Option<String>,

    /// Pull request body template
    #[arg(long)]
    pr_description: Option<String>,

    /// Open pull requests as drafts
    #[arg(long)]
    draft: bool,

    /// Stage resolved files automatically after each confirmation
    #[arg(long)]
    auto_stage: bool,

    /// Set the configured git author on cherry-picked commits
    #[arg(long)]
    reset_author: bool,

    /// Parent number for cherry-picking merge commits
    #[arg(long)]
    mainline: Option<u32>,

    /// GitHub access token
    #[arg(long)]
    access_token: Option<String>,

    /// Your GitHub login (defaults to the token's user)
    #[arg(long)]
    username: Option<String>,

    /// Git host (GitHub Enterprise)
    #[arg(long)]
    git_hostname: Option<String>,

    /// Show debug logs
    #[arg(short, long)]
    verbose: bool,
}

fn flag(set: bool) -> Option<bool> {
    set.then_some(true)
}

fn non_empty(values: Vec<String>) -> Option<Vec<String>> {
    (!values.is_empty()).then_some(values)
}

impl Args {
    /// Command-line layer of the configuration
    fn into_config(self) -> anyhow::Result<ConfigFile> {
        let (repo_owner, repo_name) = match self.repo.as_deref() {
            Some(slug) => {
                let (owner, name) = parse_repo_slug(slug)?;
                (Some(owner), Some(name))
            }
            None => (None, None),
        };

        Ok(ConfigFile {
            repo_owner,
            repo_name,
            access_token: self.access_token,
            username: self.username,
            author: self.author,
            all: flag(self.all),
            path: self.path,
            max_number: self.max_number,
            sha: self.sha,
            source_branch: self.source_branch,
            target_branches: non_empty(self.branches),
            target_branch_policy: self.target_branch_policy,
            multiple_commits: flag(self.multiple || self.multiple_commits),
            multiple_branches: flag(self.multiple || self.multiple_branches),
            fork: self.no_fork.then_some(false),
            dry_run: flag(self.dry_run),
            ci: flag(self.ci),
            pr_title: self.pr_title,
            pr_description: self.pr_description,
            target_pr_labels: non_empty(self.labels),
            source_pr_labels: non_empty(self.source_pr_labels),
            assignees: non_empty(self.assignees),
            auto_assign: flag(self.auto_assign),
            draft: flag(self.draft),
            auto_stage: flag(self.auto_stage),
            reset_author: flag(self.reset_author),
            mainline: self.mainline,
            git_hostname: self.git_hostname,
            ..ConfigFile::default()
        })
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .try_init()
        .ok();
}

async fn run(args: Args) -> anyhow::Result<bool> {
    let cwd = std::env::current_dir().context("failed to read current directory")?;
    let overrides = args.into_config()?;
    Ok(cli::run::run_backport(&cwd, overrides).await?)
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);

    match run(args).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            match e.downcast_ref::<Error>() {
                // Domain errors are meant for the user as-is
                Some(domain) if domain.is_domain() => eprintln!("{}", domain.failure()),
                _ => eprintln!("{} {e:#}", "Error:".failure()),
            }
            ExitCode::FAILURE
        }
    }
}
