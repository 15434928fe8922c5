use chrono::{DateTime, Duration, Utc};

use crate::github::issue::Issue;

pub fn exclude_pull_requests(issues: Vec<Issue>) -> Vec<Issue> {
  issues.into_iter().filter(|i| !i.is_pull_request).collect()
}

pub fn has_label(issue: &Issue, name: &str) -> bool {
  issue.has_label(name)
}

pub fn assigned_to(issue: &Issue, login: &str) -> bool {
  issue.assignees.iter().any(|a| a == login)
}

pub fn closed_within(issue: &Issue, days: u32, now: DateTime<Utc>) -> bool {
  issue
    .closed_at
    .is_some_and(|closed| now - closed < Duration::days(i64::from(days)))
}

pub fn updated_within(issue: &Issue, days: u32, now: DateTime<Utc>) -> bool {
  now - issue.updated_at < Duration::days(i64::from(days))
}

pub fn closed_by(issue: &Issue, login: &str) -> bool {
  issue.closed_by.as_deref() == Some(login)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
  UpdatedAt,
  ClosedAt,
}

/// A reusable set of predicates applied in a fixed order, then an optional
/// stable sort. Pull requests are always dropped first.
#[derive(Debug, Clone, Default)]
pub struct IssueFilter {
  /// Every listed label must be present.
  pub labels: Vec<String>,
  pub assignee: Option<String>,
  pub closed_within: Option<u32>,
  pub updated_within: Option<u32>,
  /// Keep only issues NOT updated within this many days.
  pub stale_after: Option<u32>,
  pub closed_by: Option<String>,
  pub sort: Option<SortKey>,
}

impl IssueFilter {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn label(mut self, name: impl Into<String>) -> Self {
    self.labels.push(name.into());
    self
  }

  pub fn assignee(mut self, login: impl Into<String>) -> Self {
    self.assignee = Some(login.into());
    self
  }

  pub fn closed_within(mut self, days: u32) -> Self {
    self.closed_within = Some(days);
    self
  }

  pub fn updated_within(mut self, days: u32) -> Self {
    self.updated_within = Some(days);
    self
  }

  pub fn stale_after(mut self, days: u32) -> Self {
    self.stale_after = Some(days);
    self
  }

  pub fn closed_by(mut self, login: impl Into<String>) -> Self {
    self.closed_by = Some(login.into());
    self
  }

  pub fn sort_by(mut self, key: SortKey) -> Self {
    self.sort = Some(key);
    self
  }

  pub fn matches(&self, issue: &Issue, now: DateTime<Utc>) -> bool {
    !issue.is_pull_request
      && self.labels.iter().all(|l| has_label(issue, l))
      && self.assignee.as_deref().map_or(true, |a| assigned_to(issue, a))
      && self.closed_within.map_or(true, |d| closed_within(issue, d, now))
      && self.updated_within.map_or(true, |d| updated_within(issue, d, now))
      && self.stale_after.map_or(true, |d| !updated_within(issue, d, now))
      && self.closed_by.as_deref().map_or(true, |c| closed_by(issue, c))
  }

  pub fn apply(&self, issues: Vec<Issue>, now: DateTime<Utc>) -> Vec<Issue> {
    let mut kept: Vec<Issue> = exclude_pull_requests(issues)
      .into_iter()
      .filter(|i| self.matches(i, now))
      .collect();

    // sort_by_key is stable, so ties keep aggregation (registry) order.
    match self.sort {
      Some(SortKey::UpdatedAt) => kept.sort_by_key(|i| i.updated_at),
      Some(SortKey::ClosedAt) => kept.sort_by_key(|i| i.closed_at),
      None => {}
    }
    kept
  }
}
