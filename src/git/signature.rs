//! Interpretation of git exit signatures
//!
//! A handful of failures are expected and mean something specific to the
//! backport flow. Everything else is a plain subprocess error.

use crate::error::SubprocessError;

/// `cherry-pick` stopped on conflicts
pub fn is_cherry_pick_conflict(err: &SubprocessError) -> bool {
    err.code == Some(1)
        && (err.output_contains("after resolving the conflicts")
            || err.output_contains("error: could not apply")
            || err.output_contains("CONFLICT ("))
}

/// `cherry-pick` produced nothing to commit
pub fn is_empty_cherry_pick(err: &SubprocessError) -> bool {
    err.output_contains("The previous cherry-pick is now empty")
}

/// `cherry-pick --continue` with nothing in progress
pub fn is_no_cherry_pick_in_progress(err: &SubprocessError) -> bool {
    err.output_contains("no cherry-pick or revert in progress")
}

/// `fetch` of a ref the remote does not have
pub fn is_missing_remote_ref(err: &SubprocessError) -> bool {
    err.output_contains("couldn't find remote ref")
        || err.output_contains("Invalid refspec")
        || err.output_contains("is not a commit and a branch")
}

/// `remote rm` of a remote that does not exist
pub fn is_no_such_remote(err: &SubprocessError) -> bool {
    err.code == Some(2)
        || err.output_contains("No such remote")
        || err.output_contains("Could not remove config section")
}

/// `remote add` of a remote that already exists
pub fn is_already_exists(err: &SubprocessError) -> bool {
    err.output_contains("already exists")
}

/// Parse `git diff --check` output into the unique set of files that still
/// contain conflict markers, in first-seen order
pub fn parse_conflicting_files(output: &str) -> Vec<String> {
    let mut files: Vec<String> = Vec::new();
    for line in output.lines() {
        let Some((location, message)) = line.split_once(": ") else {
            continue;
        };
        if !message.contains("conflict marker") {
            continue;
        }
        // location is `<path>:<line>`
        let Some((path, line_no)) = location.rsplit_once(':') else {
            continue;
        };
        if line_no.parse::<u64>().is_err() {
            continue;
        }
        if !files.iter().any(|f| f == path) {
            files.push(path.to_string());
        }
    }
    files
}

/// Parse `git diff --name-only` output into unique paths, in first-seen order
///
/// Unmerged paths are listed once per index stage and again for the
/// working tree change.
pub fn parse_changed_paths(output: &str) -> Vec<String> {
    let mut paths: Vec<String> = Vec::new();
    for path in output.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if !paths.iter().any(|p| p == path) {
            paths.push(path.to_string());
        }
    }
    paths
}
