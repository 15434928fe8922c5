use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info};

use crate::error::{DeckError, Result};
use crate::github::issue::Issue;
use crate::tracker::{ListQuery, Tracker};

/// One repository's listing: registry index, repository, result.
pub type RepoFetch<T> = (usize, String, Result<Vec<T>>);

/// Concurrent single-issue lookups.
const MAX_LOOKUPS: usize = 8;

/// Lists issues in every repository concurrently and merges them.
///
/// The result is complete or absent: any repository failing (including a
/// timeout) fails the whole fetch. Issues come back grouped by repository in
/// registry order, whatever order the requests finished in.
pub async fn fetch_issues(
  tracker: Arc<dyn Tracker>,
  repos: &[String],
  query: &ListQuery,
  timeout: Duration,
) -> Result<Vec<Issue>> {
  let mut task_set = JoinSet::new();

  for (index, repo) in repos.iter().enumerate() {
    let tracker = tracker.clone();
    let repo = repo.clone();
    let query = query.clone();

    task_set.spawn(async move {
      let result = match tokio::time::timeout(timeout, tracker.list_issues(&repo, &query)).await {
        Ok(result) => result,
        Err(_) => Err(DeckError::Timeout(format!(
          "listing {repo} exceeded {}s",
          timeout.as_secs()
        ))),
      };
      (index, repo, result)
    });
  }

  let issues = join_all_or_fail(task_set).await?;
  info!("fetched {} issue(s) from {} repo(s)", issues.len(), repos.len());
  Ok(issues)
}

/// Fills in `closed_by` for closed issues whose listing left it empty, one
/// lookup per issue. Like `fetch_issues`, one failed or timed-out lookup
/// fails the whole call. Order is preserved.
pub async fn complete_closed_by(
  tracker: Arc<dyn Tracker>,
  mut issues: Vec<Issue>,
  timeout: Duration,
) -> Result<Vec<Issue>> {
  let missing: Vec<usize> = issues
    .iter()
    .enumerate()
    .filter(|(_, i)| i.is_closed() && i.closed_by.is_none())
    .map(|(index, _)| index)
    .collect();
  if missing.is_empty() {
    return Ok(issues);
  }

  let semaphore = Arc::new(Semaphore::new(MAX_LOOKUPS));
  let mut task_set = JoinSet::new();

  for (slot, &index) in missing.iter().enumerate() {
    let tracker = tracker.clone();
    let semaphore = semaphore.clone();
    let repo = issues[index].repo.clone();
    let number = issues[index].number;

    task_set.spawn(async move {
      let reference = format!("{repo}#{number}");
      let result = match semaphore.acquire().await {
        Ok(_permit) => match tokio::time::timeout(timeout, tracker.closed_by(&repo, number)).await {
          Ok(result) => result.map(|login| vec![login]),
          Err(_) => Err(DeckError::Timeout(format!(
            "looking up {reference} exceeded {}s",
            timeout.as_secs()
          ))),
        },
        Err(e) => Err(DeckError::GitHub(format!("lookup of {reference} cancelled: {e}"))),
      };
      (slot, reference, result)
    });
  }

  let closers = join_all_or_fail(task_set).await?;
  info!("looked up closer of {} issue(s)", closers.len());
  for (index, login) in missing.into_iter().zip(closers) {
    issues[index].closed_by = login;
  }
  Ok(issues)
}

/// Waits for every task in the set. The first failure aborts the remaining
/// tasks and is returned; otherwise the lists are concatenated by index.
pub async fn join_all_or_fail<T: Send + 'static>(
  mut task_set: JoinSet<RepoFetch<T>>,
) -> Result<Vec<T>> {
  let mut slots: Vec<Option<Vec<T>>> = Vec::new();
  slots.resize_with(task_set.len(), || None);

  while let Some(joined) = task_set.join_next().await {
    match joined {
      Ok((index, _, Ok(items))) => {
        if index >= slots.len() {
          slots.resize_with(index + 1, || None);
        }
        slots[index] = Some(items);
      }
      Ok((_, repo, Err(e))) => {
        error!("fetch failed for {repo}: {e}");
        task_set.abort_all();
        return Err(DeckError::Aggregation {
          repo,
          source: Box::new(e),
        });
      }
      Err(e) => {
        task_set.abort_all();
        return Err(DeckError::GitHub(format!("fetch task failed: {e}")));
      }
    }
  }

  Ok(slots.into_iter().flatten().flatten().collect())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::github::issue::fixture::{closed_days_ago, issue};
  use crate::tracker::memory::{Call, MemoryTracker};
  use crate::tracker::StateFilter;

  fn repos(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
  }

  #[tokio::test]
  async fn test_merges_in_registry_order() {
    let tracker = MemoryTracker::new(vec![
      issue("acme/b", 1),
      issue("acme/a", 1),
      issue("acme/b", 2),
      issue("acme/a", 2),
    ])
    .delayed_list("acme/a", Duration::from_millis(50));

    let issues = fetch_issues(
      Arc::new(tracker),
      &repos(&["acme/a", "acme/b"]),
      &ListQuery::new(StateFilter::Open, 100),
      Duration::from_secs(5),
    )
    .await
    .unwrap();

    let keys: Vec<_> = issues.iter().map(|i| (i.repo.as_str(), i.number)).collect();
    assert_eq!(
      keys,
      vec![("acme/a", 1), ("acme/a", 2), ("acme/b", 1), ("acme/b", 2)]
    );
  }

  #[tokio::test]
  async fn test_one_failure_fails_everything() {
    let tracker =
      MemoryTracker::new(vec![issue("acme/a", 1), issue("acme/b", 1)]).failing_list("acme/b");

    let err = fetch_issues(
      Arc::new(tracker),
      &repos(&["acme/a", "acme/b"]),
      &ListQuery::new(StateFilter::Open, 100),
      Duration::from_secs(5),
    )
    .await
    .unwrap_err();

    match err {
      DeckError::Aggregation { repo, .. } => assert_eq!(repo, "acme/b"),
      other => panic!("unexpected error: {other}"),
    }
  }

  #[tokio::test]
  async fn test_timeout_is_a_fetch_failure() {
    let tracker = MemoryTracker::new(vec![issue("acme/a", 1), issue("acme/slow", 1)])
      .delayed_list("acme/slow", Duration::from_secs(30));

    let err = fetch_issues(
      Arc::new(tracker),
      &repos(&["acme/a", "acme/slow"]),
      &ListQuery::new(StateFilter::Open, 100),
      Duration::from_millis(50),
    )
    .await
    .unwrap_err();

    match err {
      DeckError::Aggregation { repo, source } => {
        assert_eq!(repo, "acme/slow");
        assert!(matches!(*source, DeckError::Timeout(_)));
      }
      other => panic!("unexpected error: {other}"),
    }
  }

  #[tokio::test]
  async fn test_query_is_passed_to_every_repo() {
    let mut mine = issue("acme/a", 1);
    mine.assignees = vec!["alice".into()];
    let closed = closed_days_ago(issue("acme/b", 2), 5, "bob");
    let tracker = Arc::new(MemoryTracker::new(vec![mine, issue("acme/a", 3), closed]));

    let issues = fetch_issues(
      tracker.clone(),
      &repos(&["acme/a", "acme/b"]),
      &ListQuery::new(StateFilter::Open, 100).assignee("alice"),
      Duration::from_secs(5),
    )
    .await
    .unwrap();

    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].number, 1);
    assert_eq!(tracker.calls().len(), 2);
  }

  #[tokio::test]
  async fn test_listed_closers_are_looked_up() {
    let tracker = Arc::new(MemoryTracker::new(vec![
      closed_days_ago(issue("acme/a", 1), 3, "bob"),
      issue("acme/a", 2),
      closed_days_ago(issue("acme/b", 4), 5, "alice"),
    ]));
    let repos = repos(&["acme/a", "acme/b"]);
    let query = ListQuery::new(StateFilter::All, 100);

    let listed = fetch_issues(tracker.clone(), &repos, &query, Duration::from_secs(5))
      .await
      .unwrap();
    assert!(listed.iter().all(|i| i.closed_by.is_none()));

    let completed = complete_closed_by(tracker.clone(), listed, Duration::from_secs(5))
      .await
      .unwrap();
    let closers: Vec<_> = completed
      .iter()
      .map(|i| (i.number, i.closed_by.as_deref()))
      .collect();
    assert_eq!(closers, vec![(1, Some("bob")), (2, None), (4, Some("alice"))]);

    let lookups = tracker
      .calls()
      .into_iter()
      .filter(|c| matches!(c, Call::ClosedBy(..)))
      .count();
    assert_eq!(lookups, 2);
  }

  #[tokio::test]
  async fn test_failed_closer_lookup_fails_everything() {
    let tracker = MemoryTracker::new(vec![closed_days_ago(issue("acme/a", 1), 3, "bob")])
      .failing_op("closed_by");
    let mut listed = closed_days_ago(issue("acme/a", 1), 3, "bob");
    listed.closed_by = None;

    let err = complete_closed_by(Arc::new(tracker), vec![listed], Duration::from_secs(5))
      .await
      .unwrap_err();
    match err {
      DeckError::Aggregation { repo, .. } => assert_eq!(repo, "acme/a#1"),
      other => panic!("unexpected error: {other}"),
    }
  }

  #[tokio::test]
  async fn test_known_closers_need_no_lookup() {
    let tracker = Arc::new(MemoryTracker::new(vec![]));
    let issues = vec![closed_days_ago(issue("acme/a", 1), 3, "bob"), issue("acme/a", 2)];

    let completed = complete_closed_by(tracker.clone(), issues.clone(), Duration::from_secs(5))
      .await
      .unwrap();
    assert_eq!(completed, issues);
    assert!(tracker.calls().is_empty());
  }

  async fn crashing_listing() -> RepoFetch<u64> {
    panic!("listing crashed")
  }

  #[tokio::test]
  async fn test_join_all_or_fail_reports_panics() {
    let mut task_set: JoinSet<RepoFetch<u64>> = JoinSet::new();
    task_set.spawn(async { (0, "acme/a".to_string(), Ok(vec![1, 2])) });
    task_set.spawn(crashing_listing());

    let err = join_all_or_fail(task_set).await.unwrap_err();
    assert!(err.to_string().contains("fetch task failed"));
  }

  #[tokio::test]
  async fn test_join_all_or_fail_orders_by_index() {
    let mut task_set: JoinSet<RepoFetch<u64>> = JoinSet::new();
    task_set.spawn(async {
      tokio::time::sleep(Duration::from_millis(20)).await;
      (0, "acme/a".to_string(), Ok(vec![1]))
    });
    task_set.spawn(async { (1, "acme/b".to_string(), Ok(vec![2, 3])) });
    task_set.spawn(async { (2, "acme/c".to_string(), Ok(vec![])) });

    assert_eq!(join_all_or_fail(task_set).await.unwrap(), vec![1, 2, 3]);
  }
}
