use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueState {
  Open,
  Closed,
}

/// Point-in-time snapshot of a remote issue. Workflow transitions never
/// update it; the next fetch reflects their effect.
#[derive(Debug, Clone, PartialEq)]
pub struct Issue {
  /// `owner/name`, compared case-insensitively.
  pub repo: String,
  pub number: u64,
  pub title: String,
  pub author: String,
  pub labels: Vec<String>,
  pub assignees: Vec<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
  pub closed_at: Option<DateTime<Utc>>,
  pub closed_by: Option<String>,
  pub is_pull_request: bool,
}

impl Issue {
  pub fn is_closed(&self) -> bool {
    self.closed_at.is_some()
  }

  pub fn has_label(&self, name: &str) -> bool {
    self.labels.iter().any(|l| l == name)
  }

  pub fn in_repo(&self, repo: &str) -> bool {
    self.repo.eq_ignore_ascii_case(repo)
  }

  pub fn permalink(&self, host: &str) -> String {
    format!("https://{host}/{}/issues/{}", self.repo, self.number)
  }
}

impl std::fmt::Display for Issue {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}#{}: {}", self.repo, self.number, self.title)
  }
}
