//! GitHub platform service implementation

use crate::error::{DomainError, Error, Result, TransportError};
use crate::platform::PlatformService;
use crate::types::{
    AssociatedPullRequest, CrossReferencedPullRequest, HistoryQuery, PlatformConfig, PrState,
    PullRequest, PullRequestPayload, RemoteCommit,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use octocrab::Octocrab;
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::debug;

const SOURCE_COMMIT_FRAGMENT: &str = r"
    fragment SourceCommit on Commit {
        oid
        message
        committedDate
        associatedPullRequests(first: 1) {
            nodes {
                number
                baseRefName
                mergeCommit { oid }
                repository { name owner { login } }
                labels(first: 50) { nodes { name } }
                timelineItems(itemTypes: CROSS_REFERENCED_EVENT, first: 20) {
                    nodes {
                        ... on CrossReferencedEvent {
                            source {
                                __typename
                                ... on PullRequest { number state baseRefName headRefName }
                            }
                        }
                    }
                }
            }
        }
    }
";

const COMMIT_HISTORY_QUERY: &str = r"
    query CommitHistory(
        $repoOwner: String!
        $repoName: String!
        $sourceBranch: String!
        $maxNumber: Int!
        $authorId: ID
        $historyPath: String
    ) {
        repository(owner: $repoOwner, name: $repoName) {
            ref(qualifiedName: $sourceBranch) {
                target {
                    ... on Commit {
                        history(first: $maxNumber, author: { id: $authorId }, path: $historyPath) {
                            nodes { ...SourceCommit }
                        }
                    }
                }
            }
        }
    }
";

const COMMIT_BY_SHA_QUERY: &str = r"
    query CommitBySha($repoOwner: String!, $repoName: String!, $sha: String!) {
        repository(owner: $repoOwner, name: $repoName) {
            object(expression: $sha) {
                __typename
                ...SourceCommit
            }
        }
    }
";

const AUTHOR_ID_QUERY: &str = r"
    query AuthorId($login: String!) {
        user(login: $login) { id }
    }
";

// GraphQL envelope

#[derive(Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    errors: Option<Vec<GraphQlError>>,
}

#[derive(Deserialize)]
struct GraphQlError {
    message: String,
    #[serde(rename = "type")]
    kind: Option<String>,
}

/// Error body returned by GitHub on non-2xx responses
#[derive(Deserialize)]
struct ApiErrorBody {
    message: String,
    documentation_url: Option<String>,
    #[serde(default)]
    errors: Vec<Value>,
}

// GraphQL response types

#[derive(Deserialize)]
struct Nodes<T> {
    nodes: Vec<T>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommitNode {
    oid: String,
    message: String,
    committed_date: Option<DateTime<Utc>>,
    associated_pull_requests: Option<Nodes<PullRequestNode>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PullRequestNode {
    number: u64,
    base_ref_name: String,
    merge_commit: Option<OidNode>,
    repository: RepositoryNode,
    labels: Option<Nodes<LabelNode>>,
    timeline_items: Option<Nodes<TimelineNode>>,
}

#[derive(Deserialize)]
struct OidNode {
    oid: String,
}

#[derive(Deserialize)]
struct RepositoryNode {
    name: String,
    owner: OwnerNode,
}

#[derive(Deserialize)]
struct OwnerNode {
    login: String,
}

#[derive(Deserialize)]
struct LabelNode {
    name: String,
}

#[derive(Deserialize)]
struct TimelineNode {
    source: Option<CrossReferenceSource>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CrossReferenceSource {
    #[serde(rename = "__typename")]
    typename: String,
    number: Option<u64>,
    state: Option<String>,
    base_ref_name: Option<String>,
    head_ref_name: Option<String>,
}

#[derive(Deserialize)]
struct HistoryData {
    repository: Option<HistoryRepository>,
}

#[derive(Deserialize)]
struct HistoryRepository {
    #[serde(rename = "ref")]
    git_ref: Option<HistoryRef>,
}

#[derive(Deserialize)]
struct HistoryRef {
    target: HistoryTarget,
}

#[derive(Deserialize)]
struct HistoryTarget {
    history: Option<Nodes<CommitNode>>,
}

#[derive(Deserialize)]
struct ObjectData {
    repository: Option<ObjectRepository>,
}

#[derive(Deserialize)]
struct ObjectRepository {
    object: Option<Value>,
}

#[derive(Deserialize)]
struct AuthorData {
    user: Option<UserNode>,
}

#[derive(Deserialize)]
struct UserNode {
    id: String,
}

fn parse_pr_state(state: &str) -> PrState {
    match state {
        "MERGED" => PrState::Merged,
        "OPEN" => PrState::Open,
        _ => PrState::Closed,
    }
}

impl CrossReferenceSource {
    /// Only pull requests are interesting; issues mentioning the PR are dropped
    fn into_pull_request(self) -> Option<CrossReferencedPullRequest> {
        if self.typename != "PullRequest" {
            return None;
        }
        Some(CrossReferencedPullRequest {
            number: self.number?,
            state: parse_pr_state(self.state.as_deref().unwrap_or_default()),
            base_ref: self.base_ref_name?,
            head_ref: self.head_ref_name?,
        })
    }
}

impl From<PullRequestNode> for AssociatedPullRequest {
    fn from(pr: PullRequestNode) -> Self {
        Self {
            number: pr.number,
            repo_owner: pr.repository.owner.login,
            repo_name: pr.repository.name,
            merge_commit_sha: pr.merge_commit.map(|c| c.oid),
            base_ref: pr.base_ref_name,
            labels: pr
                .labels
                .map(|l| l.nodes.into_iter().map(|n| n.name).collect())
                .unwrap_or_default(),
            cross_references: pr
                .timeline_items
                .map(|t| {
                    t.nodes
                        .into_iter()
                        .filter_map(|n| n.source.and_then(CrossReferenceSource::into_pull_request))
                        .collect()
                })
                .unwrap_or_default(),
        }
    }
}

impl From<CommitNode> for RemoteCommit {
    fn from(node: CommitNode) -> Self {
        Self {
            sha: node.oid,
            message: node.message,
            committed_date: node.committed_date,
            associated_pull_request: node
                .associated_pull_requests
                .and_then(|prs| prs.nodes.into_iter().next())
                .map(Into::into),
        }
    }
}

/// Parse `owner/repo` or a GitHub remote URL into (owner, repo)
pub fn parse_repo_slug(input: &str) -> Result<(String, String)> {
    let trimmed = input.trim().trim_end_matches('/');
    let path = if let Some(rest) = trimmed.strip_prefix("git@") {
        // git@github.com:owner/repo.git
        rest.split_once(':').map(|(_, path)| path.to_string())
    } else if trimmed.contains("://") {
        url::Url::parse(trimmed)
            .ok()
            .map(|u| u.path().trim_matches('/').to_string())
    } else {
        Some(trimmed.to_string())
    };

    let path = path.ok_or_else(|| Error::Config(format!("invalid repository: {input}")))?;
    let path = path.trim_end_matches(".git");
    match path.split('/').collect::<Vec<_>>().as_slice() {
        [owner, repo] if !owner.is_empty() && !repo.is_empty() => {
            Ok(((*owner).to_string(), (*repo).to_string()))
        }
        _ => Err(Error::Config(format!(
            "invalid repository \"{input}\", expected owner/repo"
        ))),
    }
}

/// GitHub service using octocrab for REST and reqwest for GraphQL
pub struct GitHubService {
    client: Octocrab,
    config: PlatformConfig,
    /// Token for raw GraphQL requests
    token: String,
    /// HTTP client for raw GraphQL requests
    http_client: Client,
    /// GraphQL endpoint
    graphql_url: String,
}

impl GitHubService {
    /// Create a new GitHub service
    ///
    /// With a custom host, the REST API lives at `https://<host>/api/v3` and
    /// GraphQL at `https://<host>/api/graphql` (GitHub Enterprise layout).
    pub fn new(token: &str, owner: String, repo: String, host: Option<String>) -> Result<Self> {
        let (rest_url, graphql_url) = match host.as_deref() {
            Some(h) if h != "github.com" => (
                Some(format!("https://{h}/api/v3")),
                format!("https://{h}/api/graphql"),
            ),
            _ => (None, "https://api.github.com/graphql".to_string()),
        };
        Self::with_api_urls(token, owner, repo, host, rest_url.as_deref(), &graphql_url)
    }

    /// Create a service with explicit endpoints
    pub fn with_api_urls(
        token: &str,
        owner: String,
        repo: String,
        host: Option<String>,
        rest_url: Option<&str>,
        graphql_url: &str,
    ) -> Result<Self> {
        let mut builder = Octocrab::builder().personal_token(token.to_string());
        if let Some(url) = rest_url {
            builder = builder
                .base_uri(url)
                .map_err(|e| TransportError::new("configure REST client", e.to_string()))?;
        }
        let client = builder
            .build()
            .map_err(|e| TransportError::new("configure REST client", e.to_string()))?;

        let http_client = Client::builder()
            .user_agent("backport")
            .build()
            .map_err(|e| TransportError::new("configure GraphQL client", e.to_string()))?;

        Ok(Self {
            client,
            config: PlatformConfig { owner, repo, host },
            token: token.to_string(),
            http_client,
            graphql_url: graphql_url.to_string(),
        })
    }

    /// Send a GraphQL request and return the raw envelope
    async fn graphql_raw<T: DeserializeOwned>(
        &self,
        context: &str,
        query: &str,
        variables: Value,
    ) -> Result<GraphQlResponse<T>> {
        let response = self
            .http_client
            .post(&self.graphql_url)
            .bearer_auth(&self.token)
            .header("Accept", "application/vnd.github+json")
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await
            .map_err(|e| transport_from_reqwest(context, &e))?;

        let status = response.status();
        if !status.is_success() {
            let body: Option<ApiErrorBody> = response.json().await.ok();
            let mut err = TransportError::new(
                context,
                body.as_ref()
                    .map_or_else(|| status.to_string(), |b| b.message.clone()),
            );
            err.status = Some(status.as_u16());
            if let Some(body) = body {
                err.documentation_url = body.documentation_url;
                err.errors = body.errors.iter().map(ToString::to_string).collect();
            }
            return Err(err.into());
        }

        response
            .json()
            .await
            .map_err(|e| transport_from_reqwest(context, &e))
    }

    /// Send a GraphQL request, failing on any reported error
    async fn graphql<T: DeserializeOwned>(
        &self,
        context: &str,
        query: &str,
        variables: Value,
    ) -> Result<T> {
        let response: GraphQlResponse<T> = self.graphql_raw(context, query, variables).await?;
        if let Some(errors) = response.errors
            && !errors.is_empty()
        {
            return Err(graphql_errors(context, errors));
        }
        response
            .data
            .ok_or_else(|| TransportError::new(context, "No data in GraphQL response").into())
    }
}

fn transport_from_reqwest(context: &str, err: &reqwest::Error) -> Error {
    let mut transport = TransportError::new(context, err.to_string());
    transport.status = err.status().map(|s| s.as_u16());
    transport.into()
}

fn graphql_errors(context: &str, errors: Vec<GraphQlError>) -> Error {
    let mut messages = errors.into_iter().map(|e| e.message);
    let first = messages.next().unwrap_or_default();
    let mut err = TransportError::new(context, first);
    err.errors = messages.collect();
    err.into()
}

#[async_trait]
impl PlatformService for GitHubService {
    async fn fetch_commit_by_sha(&self, sha: &str) -> Result<Option<RemoteCommit>> {
        debug!(sha, "fetching commit by sha");
        let query = format!("{COMMIT_BY_SHA_QUERY}\n{SOURCE_COMMIT_FRAGMENT}");
        let data: ObjectData = self
            .graphql(
                "fetch commit by sha",
                &query,
                json!({
                    "repoOwner": self.config.owner,
                    "repoName": self.config.repo,
                    "sha": sha,
                }),
            )
            .await?;

        let Some(object) = data.repository.and_then(|r| r.object) else {
            debug!(sha, "no object found");
            return Ok(None);
        };
        if object.get("__typename").and_then(Value::as_str) != Some("Commit") {
            debug!(sha, "object is not a commit");
            return Ok(None);
        }

        let node: CommitNode = serde_json::from_value(object).map_err(|e| {
            TransportError::new("fetch commit by sha", format!("unexpected response: {e}"))
        })?;
        debug!(sha = %node.oid, "found commit");
        Ok(Some(node.into()))
    }

    async fn fetch_commit_history(&self, query: &HistoryQuery) -> Result<Vec<RemoteCommit>> {
        debug!(
            branch = %query.source_branch,
            author_id = ?query.author_id,
            path = ?query.path,
            max = query.max_number,
            "fetching commit history"
        );
        let graphql_query = format!("{COMMIT_HISTORY_QUERY}\n{SOURCE_COMMIT_FRAGMENT}");
        let data: HistoryData = self
            .graphql(
                "fetch commit history",
                &graphql_query,
                json!({
                    "repoOwner": self.config.owner,
                    "repoName": self.config.repo,
                    "sourceBranch": format!("refs/heads/{}", query.source_branch),
                    "maxNumber": query.max_number,
                    "authorId": query.author_id,
                    "historyPath": query.path,
                }),
            )
            .await?;

        let git_ref = data
            .repository
            .and_then(|r| r.git_ref)
            .ok_or_else(|| DomainError::InvalidBranch {
                branch: query.source_branch.clone(),
            })?;

        let commits: Vec<RemoteCommit> = git_ref
            .target
            .history
            .map(|h| h.nodes.into_iter().map(Into::into).collect())
            .unwrap_or_default();
        debug!(count = commits.len(), "fetched commit history");
        Ok(commits)
    }

    async fn fetch_author_id(&self, login: &str) -> Result<Option<String>> {
        debug!(login, "fetching author id");
        let response: GraphQlResponse<AuthorData> = self
            .graphql_raw("fetch author id", AUTHOR_ID_QUERY, json!({ "login": login }))
            .await?;

        if let Some(user) = response.data.and_then(|d| d.user) {
            return Ok(Some(user.id));
        }
        match response.errors {
            Some(errors) if errors.iter().any(|e| e.kind.as_deref() != Some("NOT_FOUND")) => {
                Err(graphql_errors("fetch author id", errors))
            }
            _ => {
                debug!(login, "no user found");
                Ok(None)
            }
        }
    }

    async fn current_user_login(&self) -> Result<String> {
        debug!("fetching authenticated user");
        let user = self
            .client
            .current()
            .user()
            .await
            .map_err(|e| TransportError::from(e).with_context("fetch authenticated user"))?;
        Ok(user.login)
    }

    async fn create_pull_request(&self, payload: &PullRequestPayload) -> Result<PullRequest> {
        debug!(head = %payload.head, base = %payload.base, draft = payload.draft, "creating PR");
        let pulls = self.client.pulls(&self.config.owner, &self.config.repo);
        let pr = pulls
            .create(&payload.title, &payload.head, &payload.base)
            .body(&payload.body)
            .draft(payload.draft)
            .maintainer_can_modify(payload.maintainer_can_modify)
            .send()
            .await
            .map_err(|e| TransportError::from(e).with_context("create pull request"))?;

        let result = PullRequest {
            number: pr.number,
            html_url: pr
                .html_url
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default(),
            base_ref: pr.base.ref_field.clone(),
            head_ref: pr.head.ref_field.clone(),
            title: pr.title.clone().unwrap_or_default(),
        };
        debug!(pr_number = result.number, "created PR");
        Ok(result)
    }

    async fn add_labels(&self, number: u64, labels: &[String]) -> Result<()> {
        debug!(number, ?labels, "adding labels");
        self.client
            .issues(&self.config.owner, &self.config.repo)
            .add_labels(number, labels)
            .await
            .map_err(|e| TransportError::from(e).with_context("add labels"))?;
        Ok(())
    }

    async fn add_assignees(&self, number: u64, assignees: &[String]) -> Result<()> {
        debug!(number, ?assignees, "adding assignees");
        let assignees: Vec<&str> = assignees.iter().map(String::as_str).collect();
        self.client
            .issues(&self.config.owner, &self.config.repo)
            .add_assignees(number, &assignees)
            .await
            .map_err(|e| TransportError::from(e).with_context("add assignees"))?;
        Ok(())
    }

    fn config(&self) -> &PlatformConfig {
        &self.config
    }
}
