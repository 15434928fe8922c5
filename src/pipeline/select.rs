use crate::github::issue::Issue;

/// A user-supplied issue reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
  /// `42`: may match in several repositories.
  BareNumber(u64),
  /// `org/repo/42`
  Qualified { repo: String, number: u64 },
  Invalid,
}

fn positive_number(s: &str) -> Option<u64> {
  if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
    return None;
  }
  s.parse().ok().filter(|n| *n > 0)
}

impl Selector {
  pub fn parse(token: &str) -> Self {
    if let Some(number) = positive_number(token) {
      return Selector::BareNumber(number);
    }

    let parts: Vec<&str> = token.split('/').collect();
    match parts.as_slice() {
      [org, repo, number] if !org.is_empty() && !repo.is_empty() => match positive_number(number) {
        Some(number) => Selector::Qualified {
          repo: format!("{org}/{repo}"),
          number,
        },
        None => Selector::Invalid,
      },
      _ => Selector::Invalid,
    }
  }

  pub fn matches(&self, issue: &Issue) -> bool {
    match self {
      Selector::BareNumber(number) => issue.number == *number,
      Selector::Qualified { repo, number } => issue.number == *number && issue.in_repo(repo),
      Selector::Invalid => false,
    }
  }
}

/// First non-pull-request issue matching the selector, in collection
/// order. Since the aggregate is in registry order, an ambiguous bare
/// number resolves to the earliest configured repository.
pub fn resolve<'a>(selector: &Selector, issues: &'a [Issue]) -> Option<&'a Issue> {
  issues
    .iter()
    .filter(|i| !i.is_pull_request)
    .find(|i| selector.matches(i))
}
