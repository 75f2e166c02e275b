//! Backport command

use crate::cli::context::CommandContext;
use crate::cli::style::{Stylize, arrow, check, cross};
use crate::cli::{CliProgress, DialoguerPrompter};
use anstream::{eprintln, println};
use backport::backport::{
    BackportPlan, BackportRunResult, Collaborators, TaskStatus, create_backport_plan,
    execute_backports,
};
use backport::branches::resolve_target_branches;
use backport::commits::{CommitQuery, fetch_commits, select_commits};
use backport::config::ConfigFile;
use backport::error::{Error, Result};
use backport::types::Commit;
use std::path::Path;
use supports_hyperlinks::Stream;
use terminal_link::Link;

/// Run a backport; returns whether every target branch succeeded
pub async fn run_backport(cwd: &Path, overrides: ConfigFile) -> Result<bool> {
    let progress = CliProgress::compact();
    let prompter = DialoguerPrompter;

    let ctx = CommandContext::new(cwd, overrides, &progress).await?;
    let options = &ctx.options;

    let query = CommitQuery::from_options(options);
    let candidates =
        fetch_commits(ctx.platform.as_ref(), &query, &options.branch_label_mapping).await?;

    let commits = if query.sha.is_some() {
        candidates
    } else if options.ci {
        return Err(Error::Config(
            "--sha is required in CI mode; commits cannot be picked interactively".to_string(),
        ));
    } else {
        select_commits(candidates, &prompter, options.multiple_commits).await?
    };

    let targets =
        resolve_target_branches(&options.target_branches, &commits, options, &prompter).await?;
    let plan = create_backport_plan(&commits, &targets, options)?;

    print_plan(&commits, &plan);

    let collaborators = Collaborators {
        git: &ctx.git,
        platform: ctx.platform.as_ref(),
        prompter: &prompter,
        progress: &progress,
    };
    let result = execute_backports(&plan, options, collaborators).await;

    print_summary(&result);
    Ok(result.is_success())
}

fn print_plan(commits: &[Commit], plan: &BackportPlan) {
    println!("{}:", "Backporting".emphasis());
    for commit in commits {
        println!("  {} {}", arrow(), commit.formatted_message);
    }
    println!(
        "{} {}",
        "To:".emphasis(),
        plan.tasks
            .iter()
            .map(|t| t.target_branch.name.accent())
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!();
}

fn pr_link(url: &str) -> String {
    if supports_hyperlinks::on(Stream::Stdout) {
        Link::new(url, url).to_string()
    } else {
        url.to_string()
    }
}

fn print_summary(result: &BackportRunResult) {
    println!();
    for outcome in &result.outcomes {
        let branch = outcome.target_branch.name.accent();
        match &outcome.status {
            TaskStatus::Success {
                pull_request: Some(pr),
                follow_up_errors,
                ..
            } => {
                println!(
                    "{} {branch}: {} {}",
                    check(),
                    format!("#{}", pr.number).emphasis(),
                    pr_link(&pr.html_url)
                );
                for warning in follow_up_errors {
                    println!("    {}", warning.warning());
                }
            }
            TaskStatus::Success { payload, .. } => {
                println!("{} {branch}: {}", check(), "dry run, nothing pushed".muted());
                println!("    {} {}", "Branch:".muted(), payload.branch_name);
                println!("    {} {}", "Title:".muted(), payload.title);
            }
            TaskStatus::Failure { phase, error } => {
                eprintln!(
                    "{} {branch}: {} {}",
                    cross(),
                    error.failure(),
                    format!("(during {phase})").muted()
                );
            }
        }
    }

    let failures = result.failure_count();
    if failures == 0 {
        println!(
            "{}",
            format!("Backported to {} branch(es)", result.success_count()).success()
        );
    } else {
        eprintln!(
            "{}",
            format!(
                "{} of {} backport(s) failed",
                failures,
                result.outcomes.len()
            )
            .failure()
        );
    }
}
