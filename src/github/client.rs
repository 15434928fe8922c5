use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use octocrab::{Octocrab, Page};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{DeckError, Result};
use crate::github::issue::{Issue, IssueState};
use crate::tracker::{ListQuery, Removal, StateFilter, Tracker};

pub struct GitHubClient {
    octocrab: Octocrab,
}

impl GitHubClient {
    pub fn new() -> Result<Self> {
        let token = std::env::var("GITHUB_TOKEN")
            .map_err(|_| DeckError::GitHub("GITHUB_TOKEN not set".into()))?;

        let octocrab = Octocrab::builder()
            .personal_token(token)
            .build()
            .map_err(|e| DeckError::GitHub(format!("failed to build octocrab: {e}")))?;

        Ok(Self { octocrab })
    }
}

fn split_repo(repo: &str) -> Result<(&str, &str)> {
    repo.split_once('/')
        .ok_or_else(|| DeckError::GitHub(format!("repo must be owner/repo: {repo}")))
}

fn is_not_found(err: &octocrab::Error) -> bool {
    matches!(err, octocrab::Error::GitHub { source, .. } if source.status_code.as_u16() == 404)
}

#[derive(Serialize)]
struct ListParams<'a> {
    state: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    since: Option<String>,
    per_page: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    assignee: Option<&'a str>,
}

#[derive(Deserialize)]
struct RawUser {
    login: String,
}

#[derive(Deserialize)]
struct RawLabel {
    name: String,
}

#[derive(Deserialize)]
struct RawIssue {
    number: u64,
    title: String,
    user: RawUser,
    #[serde(default)]
    labels: Vec<RawLabel>,
    #[serde(default)]
    assignees: Vec<RawUser>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    closed_at: Option<DateTime<Utc>>,
    closed_by: Option<RawUser>,
    pull_request: Option<serde_json::Value>,
}

impl RawIssue {
    fn into_issue(self, repo: &str) -> Issue {
        Issue {
            repo: repo.to_string(),
            number: self.number,
            title: self.title,
            author: self.user.login,
            labels: self.labels.into_iter().map(|l| l.name).collect(),
            assignees: self.assignees.into_iter().map(|a| a.login).collect(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            closed_at: self.closed_at,
            closed_by: self.closed_by.map(|u| u.login),
            is_pull_request: self.pull_request.is_some(),
        }
    }
}

#[async_trait]
impl Tracker for GitHubClient {
    async fn list_issues(&self, repo: &str, query: &ListQuery) -> Result<Vec<Issue>> {
        let (owner, name) = split_repo(repo)?;
        info!("fetching issues for {repo} (state={:?})", query.state);

        let params = ListParams {
            state: match query.state {
                StateFilter::Open => "open",
                StateFilter::Closed => "closed",
                StateFilter::All => "all",
            },
            since: query
                .since_days
                .map(|days| (Utc::now() - Duration::days(i64::from(days))).to_rfc3339()),
            per_page: 100,
            assignee: query.assignee.as_deref(),
        };

        let first: Page<RawIssue> = self
            .octocrab
            .get(format!("/repos/{owner}/{name}/issues"), Some(&params))
            .await?;
        let items = self.octocrab.all_pages(first).await?;

        // Pull requests are kept here and flagged; the filter pipeline drops them.
        let issues: Vec<Issue> = items.into_iter().map(|i| i.into_issue(repo)).collect();

        debug!("{repo}: {} issues", issues.len());
        Ok(issues)
    }

    async fn add_labels(&self, repo: &str, number: u64, labels: &[String]) -> Result<()> {
        let (owner, name) = split_repo(repo)?;
        info!("adding labels {labels:?} to {repo}#{number}");

        self.octocrab
            .issues(owner, name)
            .add_labels(number, labels)
            .await?;

        Ok(())
    }

    async fn remove_label(&self, repo: &str, number: u64, label: &str) -> Removal {
        let (owner, name) = match split_repo(repo) {
            Ok(parts) => parts,
            Err(e) => return Removal::Failed(e),
        };
        info!("removing label {label} from {repo}#{number}");

        match self
            .octocrab
            .issues(owner, name)
            .remove_label(number, label)
            .await
        {
            Ok(_) => Removal::Removed,
            Err(e) if is_not_found(&e) => Removal::AlreadyAbsent,
            Err(e) => Removal::Failed(DeckError::GitHub(format!("remove label failed: {e}"))),
        }
    }

    async fn set_assignee(&self, repo: &str, number: u64, login: &str) -> Result<()> {
        let (owner, name) = split_repo(repo)?;
        info!("assigning {login} to {repo}#{number}");

        self.octocrab
            .issues(owner, name)
            .add_assignees(number, &[login])
            .await?;

        Ok(())
    }

    async fn remove_assignee(&self, repo: &str, number: u64, login: &str) -> Removal {
        let (owner, name) = match split_repo(repo) {
            Ok(parts) => parts,
            Err(e) => return Removal::Failed(e),
        };
        info!("unassigning {login} from {repo}#{number}");

        match self
            .octocrab
            .issues(owner, name)
            .remove_assignees(number, &[login])
            .await
        {
            Ok(_) => Removal::Removed,
            Err(e) if is_not_found(&e) => Removal::AlreadyAbsent,
            Err(e) => Removal::Failed(DeckError::GitHub(format!("remove assignee failed: {e}"))),
        }
    }

    async fn set_state(&self, repo: &str, number: u64, state: IssueState) -> Result<()> {
        let (owner, name) = split_repo(repo)?;
        info!("setting {repo}#{number} to {state:?}");

        let state = match state {
            IssueState::Open => octocrab::models::IssueState::Open,
            IssueState::Closed => octocrab::models::IssueState::Closed,
        };
        self.octocrab
            .issues(owner, name)
            .update(number)
            .state(state)
            .send()
            .await?;

        Ok(())
    }

    async fn add_comment(&self, repo: &str, number: u64, body: &str) -> Result<u64> {
        let (owner, name) = split_repo(repo)?;
        info!("adding comment to {repo}#{number}");

        let comment = self
            .octocrab
            .issues(owner, name)
            .create_comment(number, body)
            .await?;

        Ok(comment.id.0)
    }

    async fn closed_by(&self, repo: &str, number: u64) -> Result<Option<String>> {
        let (owner, name) = split_repo(repo)?;
        debug!("looking up who closed {repo}#{number}");

        // Only the single-issue endpoint reports `closed_by`.
        let raw: RawIssue = self
            .octocrab
            .get(format!("/repos/{owner}/{name}/issues/{number}"), None::<&()>)
            .await?;

        Ok(raw.closed_by.map(|u| u.login))
    }
}
