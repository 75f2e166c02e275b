//! Integration tests for backport

#![allow(deprecated)] // cargo_bin is the standard way to test CLI binaries

mod common;

use assert_cmd::Command;
use backport::backport::NoopProgress;
use backport::error::{DomainError, Error};
use backport::git::{CherryPickOutcome, ContinueOutcome, GitCli, GitClient};
use backport::platform::{GitHubService, PlatformService};
use backport::types::{HistoryQuery, PrState};
use mockito::{Matcher, Server};
use predicates::prelude::*;
use serde_json::json;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

// =============================================================================
// CLI Tests
// =============================================================================

#[test]
fn test_cli_help() {
    let mut cmd = Command::cargo_bin("backport").unwrap();
    cmd.arg("--help");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Backport merged commits"))
        .stdout(predicate::str::contains("--target-branch-policy"));
}

#[test]
fn test_cli_version() {
    let mut cmd = Command::cargo_bin("backport").unwrap();
    cmd.arg("--version");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_cli_rejects_unknown_target_branch_policy() {
    let mut cmd = Command::cargo_bin("backport").unwrap();
    cmd.args(["--target-branch-policy", "sometimes"]);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("unknown target branch policy"));
}

#[test]
fn test_cli_rejects_invalid_repo() {
    let mut cmd = Command::cargo_bin("backport").unwrap();
    cmd.args(["--repo", "not-a-slug", "--ci"]);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("invalid repository"));
}

#[test]
fn test_cli_author_conflicts_with_all() {
    let mut cmd = Command::cargo_bin("backport").unwrap();
    cmd.args(["--author", "sqren", "--all"]);

    cmd.assert().failure();
}

// =============================================================================
// Git CLI Tests
// =============================================================================

/// Run git synchronously for fixture setup, panicking on failure
fn git(dir: &Path, args: &[&str]) -> String {
    let output = std::process::Command::new("git")
        .current_dir(dir)
        .args(args)
        .env("GIT_AUTHOR_NAME", "Fixture")
        .env("GIT_AUTHOR_EMAIL", "fixture@example.com")
        .env("GIT_COMMITTER_NAME", "Fixture")
        .env("GIT_COMMITTER_EMAIL", "fixture@example.com")
        .env("LC_ALL", "C")
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "git {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

fn commit_file(dir: &Path, file: &str, contents: &str, message: &str) -> String {
    std::fs::write(dir.join(file), contents).unwrap();
    git(dir, &["add", file]);
    git(dir, &["commit", "-m", message]);
    git(dir, &["rev-parse", "HEAD"])
}

/// Upstream repo plus a working clone
///
/// History on `main`: base -> `change` (a.txt one -> two) -> `addition`
/// (new b.txt). `7.x` branches at base and rewrites a.txt to "seven", so
/// `change` conflicts there while `addition` applies cleanly.
struct Fixture {
    _dir: TempDir,
    upstream: PathBuf,
    git: GitCli,
    change: String,
    addition: String,
}

impl Fixture {
    async fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let upstream = dir.path().join("upstream");
        std::fs::create_dir_all(&upstream).unwrap();

        git(&upstream, &["init", "--quiet"]);
        git(&upstream, &["symbolic-ref", "HEAD", "refs/heads/main"]);
        commit_file(&upstream, "a.txt", "one\n", "Initial commit");

        git(&upstream, &["checkout", "--quiet", "-b", "7.x"]);
        commit_file(&upstream, "a.txt", "seven\n", "Release 7.x");

        git(&upstream, &["checkout", "--quiet", "main"]);
        let change = commit_file(&upstream, "a.txt", "two\n", "Change a (#1)");
        let addition = commit_file(&upstream, "b.txt", "bee\n", "Add b (#2)");

        let clone_path = dir.path().join("repositories").join("elastic").join("kibana");
        let url = upstream.to_string_lossy().into_owned();
        let git_cli = GitCli::clone_repo(&url, &clone_path, &NoopProgress)
            .await
            .unwrap();
        git(&clone_path, &["config", "user.name", "Backport Tester"]);
        git(&clone_path, &["config", "user.email", "tester@example.com"]);

        Self {
            _dir: dir,
            upstream,
            git: git_cli,
            change,
            addition,
        }
    }

    fn clone_path(&self) -> &Path {
        self.git.repo_path()
    }

    /// Check out a fresh backport branch from upstream 7.x
    async fn start_backport(&self, branch: &str) {
        self.git.fetch_branch("origin", "7.x").await.unwrap();
        self.git.checkout_new_branch(branch, "7.x").await.unwrap();
    }
}

#[tokio::test]
async fn test_git_clone_detects_existing_clone() {
    let fixture = Fixture::new().await;
    assert!(GitCli::is_cloned(fixture.clone_path()));
    assert!(!GitCli::is_cloned(&fixture.clone_path().join("missing")));
}

#[tokio::test]
async fn test_git_clean_cherry_pick() {
    let fixture = Fixture::new().await;
    fixture.start_backport("backport/7.x/pr-2").await;

    let outcome = fixture.git.cherry_pick(&fixture.addition, None).await.unwrap();

    assert_eq!(outcome, CherryPickOutcome::Applied);
    assert_eq!(
        git(fixture.clone_path(), &["rev-parse", "--abbrev-ref", "HEAD"]),
        "backport/7.x/pr-2"
    );
    assert_eq!(
        std::fs::read_to_string(fixture.clone_path().join("b.txt")).unwrap(),
        "bee\n"
    );
    assert_eq!(
        std::fs::read_to_string(fixture.clone_path().join("a.txt")).unwrap(),
        "seven\n"
    );
}

#[tokio::test]
async fn test_git_conflict_resolution_flow() {
    let fixture = Fixture::new().await;
    fixture.start_backport("backport/7.x/pr-1").await;

    let outcome = fixture.git.cherry_pick(&fixture.change, None).await.unwrap();
    assert_eq!(outcome, CherryPickOutcome::Conflict);
    assert_eq!(
        fixture.git.conflicting_files().await.unwrap(),
        vec!["a.txt".to_string()]
    );

    // User resolves the markers but forgets to stage
    std::fs::write(fixture.clone_path().join("a.txt"), "two\n").unwrap();
    assert!(fixture.git.conflicting_files().await.unwrap().is_empty());
    assert_eq!(
        fixture.git.unstaged_files().await.unwrap(),
        vec!["a.txt".to_string()]
    );

    fixture.git.stage_all().await.unwrap();
    assert!(fixture.git.unstaged_files().await.unwrap().is_empty());

    assert_eq!(
        fixture.git.cherry_pick_continue().await.unwrap(),
        ContinueOutcome::Continued
    );
    assert_eq!(
        git(fixture.clone_path(), &["log", "-1", "--format=%s"]),
        "Change a (#1)"
    );
}

#[tokio::test]
async fn test_git_continue_without_cherry_pick_in_progress() {
    let fixture = Fixture::new().await;

    assert_eq!(
        fixture.git.cherry_pick_continue().await.unwrap(),
        ContinueOutcome::AlreadyCompleted
    );
}

#[tokio::test]
async fn test_git_empty_cherry_pick() {
    let fixture = Fixture::new().await;
    fixture
        .git
        .checkout_new_branch("backport/main/pr-2", "main")
        .await
        .unwrap();

    let err = fixture
        .git
        .cherry_pick(&fixture.addition, None)
        .await
        .unwrap_err();

    assert!(matches!(
        err.as_domain(),
        Some(DomainError::EmptyCherryPick { .. })
    ));
}

#[tokio::test]
async fn test_git_fetch_missing_branch() {
    let fixture = Fixture::new().await;

    let err = fixture
        .git
        .fetch_branch("origin", "does-not-exist")
        .await
        .unwrap_err();

    match err {
        Error::Domain(DomainError::InvalidBranch { branch }) => {
            assert_eq!(branch, "does-not-exist");
        }
        other => panic!("expected InvalidBranch, got {other:?}"),
    }
}

#[tokio::test]
async fn test_git_amend_author() {
    let fixture = Fixture::new().await;
    fixture.start_backport("backport/7.x/pr-2").await;
    fixture.git.cherry_pick(&fixture.addition, None).await.unwrap();

    fixture
        .git
        .amend_author("Release Bot", "bot@example.com")
        .await
        .unwrap();

    assert_eq!(
        git(fixture.clone_path(), &["log", "-1", "--format=%an <%ae>"]),
        "Release Bot <bot@example.com>"
    );
}

#[tokio::test]
async fn test_git_push_and_delete_branch() {
    let fixture = Fixture::new().await;
    fixture.start_backport("backport/7.x/pr-2").await;
    fixture.git.cherry_pick(&fixture.addition, None).await.unwrap();

    fixture
        .git
        .push_branch("origin", "backport/7.x/pr-2")
        .await
        .unwrap();
    let pushed = git(
        &fixture.upstream,
        &["rev-parse", "refs/heads/backport/7.x/pr-2"],
    );
    assert_eq!(pushed, git(fixture.clone_path(), &["rev-parse", "HEAD"]));

    fixture
        .git
        .delete_branch("main", "backport/7.x/pr-2")
        .await
        .unwrap();
    assert_eq!(
        git(fixture.clone_path(), &["rev-parse", "--abbrev-ref", "HEAD"]),
        "main"
    );
    assert!(git(fixture.clone_path(), &["branch", "--list", "backport/*"]).is_empty());
}

#[tokio::test]
async fn test_git_reset_and_clean() {
    let fixture = Fixture::new().await;
    std::fs::write(fixture.clone_path().join("a.txt"), "dirty\n").unwrap();
    std::fs::create_dir_all(fixture.clone_path().join("scratch")).unwrap();
    std::fs::write(fixture.clone_path().join("scratch/notes.txt"), "x").unwrap();

    fixture.git.reset_and_clean().await.unwrap();

    assert_eq!(
        std::fs::read_to_string(fixture.clone_path().join("a.txt")).unwrap(),
        "two\n"
    );
    assert!(!fixture.clone_path().join("scratch").exists());
}

#[tokio::test]
async fn test_git_setup_remote_is_idempotent() {
    let fixture = Fixture::new().await;
    let url = fixture.upstream.to_string_lossy().into_owned();

    fixture.git.setup_remote("elastic", &url).await.unwrap();
    fixture.git.setup_remote("elastic", &url).await.unwrap();

    assert_eq!(
        git(fixture.clone_path(), &["remote", "get-url", "elastic"]),
        url
    );
    fixture.git.fetch_branch("elastic", "7.x").await.unwrap();
}

// =============================================================================
// GitHub GraphQL Tests
// =============================================================================

fn github_service(server: &Server) -> GitHubService {
    GitHubService::with_api_urls(
        "token",
        "elastic".to_string(),
        "kibana".to_string(),
        None,
        Some(server.url().as_str()),
        &format!("{}/graphql", server.url()),
    )
    .unwrap()
}

fn history_query() -> HistoryQuery {
    HistoryQuery {
        source_branch: "main".to_string(),
        author_id: Some("MDQ6VXNlcjIwOTk2Ng==".to_string()),
        path: None,
        max_number: 10,
    }
}

#[tokio::test]
async fn test_github_commit_history() {
    let mut server = Server::new_async().await;
    let body = json!({
        "data": {
            "repository": {
                "ref": {
                    "target": {
                        "history": {
                            "nodes": [{
                                "oid": "a1b2c3d4e5f6",
                                "message": "Fix the thing (#55)",
                                "committedDate": "2024-03-01T12:00:00Z",
                                "associatedPullRequests": {
                                    "nodes": [{
                                        "number": 55,
                                        "baseRefName": "main",
                                        "mergeCommit": { "oid": "a1b2c3d4e5f6" },
                                        "repository": {
                                            "name": "kibana",
                                            "owner": { "login": "elastic" }
                                        },
                                        "labels": { "nodes": [{ "name": "v7.2.0" }] },
                                        "timelineItems": {
                                            "nodes": [
                                                {
                                                    "source": {
                                                        "__typename": "PullRequest",
                                                        "number": 60,
                                                        "state": "MERGED",
                                                        "baseRefName": "7.x",
                                                        "headRefName": "backport/7.x/pr-55"
                                                    }
                                                },
                                                {
                                                    "source": {
                                                        "__typename": "Issue",
                                                        "number": 61
                                                    }
                                                }
                                            ]
                                        }
                                    }]
                                }
                            }]
                        }
                    }
                }
            }
        }
    });
    let mock = server
        .mock("POST", "/graphql")
        .match_header("authorization", "Bearer token")
        .match_body(Matcher::PartialJson(json!({
            "variables": {
                "repoOwner": "elastic",
                "repoName": "kibana",
                "sourceBranch": "refs/heads/main",
                "maxNumber": 10
            }
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(body.to_string())
        .create_async()
        .await;

    let service = github_service(&server);
    let commits = service.fetch_commit_history(&history_query()).await.unwrap();

    mock.assert_async().await;
    assert_eq!(commits.len(), 1);
    let commit = &commits[0];
    assert_eq!(commit.sha, "a1b2c3d4e5f6");
    assert_eq!(commit.message, "Fix the thing (#55)");
    assert!(commit.committed_date.is_some());

    let pr = commit.associated_pull_request.as_ref().unwrap();
    assert_eq!(pr.number, 55);
    assert_eq!(pr.repo_owner, "elastic");
    assert_eq!(pr.merge_commit_sha.as_deref(), Some("a1b2c3d4e5f6"));
    assert_eq!(pr.labels, vec!["v7.2.0".to_string()]);
    // Issues referencing the PR are not backports
    assert_eq!(pr.cross_references.len(), 1);
    assert_eq!(pr.cross_references[0].state, PrState::Merged);
    assert_eq!(pr.cross_references[0].head_ref, "backport/7.x/pr-55");
}

#[tokio::test]
async fn test_github_history_missing_branch() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/graphql")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "data": { "repository": { "ref": null } } }).to_string())
        .create_async()
        .await;

    let service = github_service(&server);
    let err = service
        .fetch_commit_history(&history_query())
        .await
        .unwrap_err();

    match err {
        Error::Domain(DomainError::InvalidBranch { branch }) => assert_eq!(branch, "main"),
        other => panic!("expected InvalidBranch, got {other:?}"),
    }
}

#[tokio::test]
async fn test_github_author_not_found() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/graphql")
        .match_body(Matcher::PartialJson(json!({ "variables": { "login": "ghost" } })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "data": { "user": null },
                "errors": [{
                    "type": "NOT_FOUND",
                    "message": "Could not resolve to a User with the login of 'ghost'."
                }]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let service = github_service(&server);
    assert_eq!(service.fetch_author_id("ghost").await.unwrap(), None);
}

#[tokio::test]
async fn test_github_author_found() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/graphql")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "data": { "user": { "id": "MDQ6VXNlcjIwOTk2Ng==" } } }).to_string())
        .create_async()
        .await;

    let service = github_service(&server);
    assert_eq!(
        service.fetch_author_id("sqren").await.unwrap().as_deref(),
        Some("MDQ6VXNlcjIwOTk2Ng==")
    );
}

#[tokio::test]
async fn test_github_commit_by_sha_not_a_commit() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/graphql")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({ "data": { "repository": { "object": { "__typename": "Tree" } } } })
                .to_string(),
        )
        .create_async()
        .await;

    let service = github_service(&server);
    assert!(service.fetch_commit_by_sha("abc1234").await.unwrap().is_none());
}

#[tokio::test]
async fn test_github_http_error() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/graphql")
        .with_status(401)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "message": "Bad credentials",
                "documentation_url": "https://docs.github.com/graphql"
            })
            .to_string(),
        )
        .create_async()
        .await;

    let service = github_service(&server);
    let err = service
        .fetch_commit_history(&history_query())
        .await
        .unwrap_err();

    match err {
        Error::Transport(transport) => {
            assert_eq!(transport.status, Some(401));
            assert_eq!(transport.message, "Bad credentials");
            assert_eq!(transport.context, "fetch commit history");
        }
        other => panic!("expected transport error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_github_graphql_errors_are_transport_errors() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/graphql")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "data": null,
                "errors": [{ "message": "Something went wrong" }]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let service = github_service(&server);
    let err = service
        .fetch_commit_history(&history_query())
        .await
        .unwrap_err();

    assert!(err.to_string().contains("Something went wrong"));
    assert!(!err.is_domain());
}
