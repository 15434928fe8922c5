use async_trait::async_trait;

use crate::error::{DeckError, Result};
use crate::github::issue::{Issue, IssueState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum StateFilter {
    #[default]
    Open,
    Closed,
    All,
}

/// Parameters for a single repository listing.
#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery {
    pub state: StateFilter,
    pub assignee: Option<String>,
    /// Only issues touched within this many days are returned; `None`
    /// lists regardless of activity.
    pub since_days: Option<u32>,
}

impl ListQuery {
    pub fn new(state: StateFilter, since_days: u32) -> Self {
        Self {
            state,
            assignee: None,
            since_days: Some(since_days),
        }
    }

    /// Drops the activity window, e.g. to find long-idle issues.
    pub fn unbounded(mut self) -> Self {
        self.since_days = None;
        self
    }

    pub fn assignee(mut self, login: impl Into<String>) -> Self {
        self.assignee = Some(login.into());
        self
    }
}

/// Outcome of removing a label or assignee. Absence is a distinct,
/// successful outcome rather than an error.
#[derive(Debug)]
pub enum Removal {
    Removed,
    AlreadyAbsent,
    Failed(DeckError),
}

/// Remote issue tracker operations the pipeline and workflow depend on.
#[async_trait]
pub trait Tracker: Send + Sync {
    async fn list_issues(&self, repo: &str, query: &ListQuery) -> Result<Vec<Issue>>;

    async fn add_labels(&self, repo: &str, number: u64, labels: &[String]) -> Result<()>;

    async fn remove_label(&self, repo: &str, number: u64, label: &str) -> Removal;

    async fn set_assignee(&self, repo: &str, number: u64, login: &str) -> Result<()>;

    async fn remove_assignee(&self, repo: &str, number: u64, login: &str) -> Removal;

    async fn set_state(&self, repo: &str, number: u64, state: IssueState) -> Result<()>;

    /// Returns the id of the created comment.
    async fn add_comment(&self, repo: &str, number: u64, body: &str) -> Result<u64>;

    /// Login that closed the issue. Listings do not carry it.
    async fn closed_by(&self, repo: &str, number: u64) -> Result<Option<String>>;
}
