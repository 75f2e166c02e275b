//! Deterministic naming for backport branches and pull requests
//!
//! Everything here is pure: the same target branch and commit list always
//! produce the same branch name, title and body.

use crate::types::Commit;

/// Maximum length of the ref segment after `backport/<target>/`
pub const MAX_REF_SEGMENT_LEN: usize = 200;

/// Maximum length of the joined commit messages in a PR title
pub const MAX_TITLE_MESSAGES_LEN: usize = 200;

/// Default PR title template
pub const DEFAULT_PR_TITLE: &str = "[{targetBranch}] {commitMessages}";

/// Default PR body template
pub const DEFAULT_PR_DESCRIPTION: &str = "{defaultPrDescription}";

fn truncate_chars(s: &str, max: usize) -> &str {
    s.char_indices().nth(max).map_or(s, |(idx, _)| &s[..idx])
}

/// Name of the branch holding the backport of `commits` to `target_branch`
///
/// `backport/<target>/<short-ref>_<short-ref>...`, with the ref segment cut
/// at [`MAX_REF_SEGMENT_LEN`] characters.
pub fn backport_branch_name(target_branch: &str, commits: &[Commit]) -> String {
    let refs = commits
        .iter()
        .map(Commit::short_ref)
        .collect::<Vec<_>>()
        .join("_");
    format!(
        "backport/{target_branch}/{}",
        truncate_chars(&refs, MAX_REF_SEGMENT_LEN)
    )
}

/// Strip a trailing `(<ref>)` matching the commit's own reference
pub fn strip_reference<'a>(line: &'a str, commit: &Commit) -> &'a str {
    let line = line.trim_end();
    let token = format!("({})", commit.long_ref());
    line.strip_suffix(&token).map_or(line, str::trim_end)
}

/// Render the PR title
pub fn pr_title(template: &str, target_branch: &str, source_branch: &str, commits: &[Commit]) -> String {
    let messages = commits
        .iter()
        .map(Commit::first_line)
        .collect::<Vec<_>>()
        .join(" | ");
    template
        .replace("{targetBranch}", target_branch)
        .replace("{sourceBranch}", source_branch)
        .replace(
            "{commitMessages}",
            truncate_chars(&messages, MAX_TITLE_MESSAGES_LEN),
        )
}

/// One ` - <message> (<ref>)` line per commit
pub fn commit_message_list(commits: &[Commit]) -> String {
    commits
        .iter()
        .map(|c| format!(" - {} ({})", strip_reference(c.first_line(), c), c.long_ref()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// The built-in description used for `{defaultPrDescription}`
pub fn default_pr_description(target_branch: &str, commits: &[Commit]) -> String {
    format!(
        "Backports the following commits to {target_branch}:\n{}",
        commit_message_list(commits)
    )
}

/// Render the PR body, appending `suffix` after a blank line
pub fn pr_body(
    template: &str,
    suffix: Option<&str>,
    target_branch: &str,
    source_branch: &str,
    commits: &[Commit],
) -> String {
    let mut body = template
        .replace(
            "{defaultPrDescription}",
            &default_pr_description(target_branch, commits),
        )
        .replace("{commitMessages}", &commit_message_list(commits))
        .replace("{targetBranch}", target_branch)
        .replace("{sourceBranch}", source_branch);

    if let Some(suffix) = suffix.map(str::trim).filter(|s| !s.is_empty()) {
        body.push_str("\n\n");
        body.push_str(suffix);
    }
    body
}
