//! Pull request publishing
//!
//! Opening the PR is the only step that can fail a task here. Labels,
//! assignees and source-PR labels are applied afterwards, each on its own;
//! a failure is logged and reported but never undoes the PR.

use crate::backport::naming::{pr_body, pr_title};
use crate::backport::plan::BackportTask;
use crate::config::RunOptions;
use crate::error::Result;
use crate::platform::PlatformService;
use crate::types::{PullRequest, PullRequestPayload};
use tracing::{info, warn};

/// Build the payload for a task's pull request (pure)
pub fn build_pull_request_payload(task: &BackportTask, options: &RunOptions) -> PullRequestPayload {
    let target = &task.target_branch.name;
    PullRequestPayload {
        title: pr_title(
            &options.pr_title,
            target,
            &options.source_branch,
            &task.commits,
        ),
        body: pr_body(
            &options.pr_description,
            options.pr_description_suffix.as_deref(),
            target,
            &options.source_branch,
            &task.commits,
        ),
        head: task.head(),
        base: target.clone(),
        branch_name: task.branch_name.clone(),
        draft: options.draft,
        maintainer_can_modify: options.maintainer_can_modify,
    }
}

/// Metadata applied after the PR exists
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FollowUps {
    /// Labels for the new PR
    pub target_labels: Vec<String>,
    /// Assignees for the new PR
    pub assignees: Vec<String>,
    /// Labels added to each originating PR
    pub source_labels: Vec<String>,
    /// Originating PR numbers
    pub source_pull_numbers: Vec<u64>,
}

impl FollowUps {
    /// Collect follow-ups for a task
    pub fn for_task(task: &BackportTask, options: &RunOptions) -> Self {
        let mut source_pull_numbers: Vec<u64> = Vec::new();
        for number in task.commits.iter().filter_map(|c| c.pull_number) {
            if !source_pull_numbers.contains(&number) {
                source_pull_numbers.push(number);
            }
        }
        Self {
            target_labels: options.target_pr_labels.clone(),
            assignees: options.effective_assignees(),
            source_labels: options.source_pr_labels.clone(),
            source_pull_numbers,
        }
    }
}

/// A created PR plus the follow-ups that did not go through
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Published {
    /// The new pull request
    pub pull_request: PullRequest,
    /// One message per failed follow-up
    pub follow_up_errors: Vec<String>,
}

/// Open the PR, then apply follow-ups (EFFECTFUL)
pub async fn publish_pull_request(
    platform: &dyn PlatformService,
    payload: &PullRequestPayload,
    follow_ups: &FollowUps,
) -> Result<Published> {
    let pull_request = platform.create_pull_request(payload).await?;
    info!(
        number = pull_request.number,
        url = %pull_request.html_url,
        "created backport pull request"
    );

    let mut follow_up_errors = Vec::new();

    if !follow_ups.target_labels.is_empty() {
        if let Err(e) = platform
            .add_labels(pull_request.number, &follow_ups.target_labels)
            .await
        {
            warn!(number = pull_request.number, error = %e, "failed to add labels");
            follow_up_errors.push(format!("Could not add labels to #{}: {e}", pull_request.number));
        }
    }

    if !follow_ups.assignees.is_empty() {
        if let Err(e) = platform
            .add_assignees(pull_request.number, &follow_ups.assignees)
            .await
        {
            warn!(number = pull_request.number, error = %e, "failed to add assignees");
            follow_up_errors.push(format!(
                "Could not add assignees to #{}: {e}",
                pull_request.number
            ));
        }
    }

    if !follow_ups.source_labels.is_empty() {
        for number in &follow_ups.source_pull_numbers {
            if let Err(e) = platform.add_labels(*number, &follow_ups.source_labels).await {
                warn!(number, error = %e, "failed to label source pull request");
                follow_up_errors.push(format!("Could not add labels to source #{number}: {e}"));
            }
        }
    }

    Ok(Published {
        pull_request,
        follow_up_errors,
    })
}
