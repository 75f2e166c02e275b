//! Commit message helpers

use crate::types::short_sha;
use regex::Regex;
use std::sync::LazyLock;

static TRAILING_PR_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(#(\d+)\)\s*$").expect("valid regex"));

/// First line of a message, trimmed
pub fn first_line(message: &str) -> &str {
    message.lines().next().unwrap_or_default().trim()
}

/// PR number from a trailing `(#<n>)` on the first line
///
/// Used when the platform's association can't be verified, e.g. for
/// squash merges done outside the PR UI.
pub fn pull_number_from_message(message: &str) -> Option<u64> {
    TRAILING_PR_REF
        .captures(first_line(message))
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Display message: first line plus ` (#<n>)` or ` (<short sha>)`
///
/// The reference is not added when the line already ends with it.
pub fn formatted_message(message: &str, pull_number: Option<u64>, sha: &str) -> String {
    let line = first_line(message);
    let reference = pull_number.map_or_else(|| short_sha(sha).to_string(), |n| format!("#{n}"));
    let token = format!("({reference})");
    if line.ends_with(&token) {
        line.to_string()
    } else {
        format!("{line} {token}")
    }
}
