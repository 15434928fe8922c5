use crate::github::issue::{Issue, IssueState};

pub const ON_DECK: &str = "on-deck";
pub const IN_PROGRESS: &str = "in-progress";
pub const BLOCKED: &str = "blocked";
pub const BUG: &str = "bug";

/// Where an issue sits in the workflow, read from its labels and state.
/// `blocked` is tracked separately and combines with any stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
  Backlog,
  OnDeck,
  InProgress,
  Closed,
}

impl Stage {
  pub fn of(issue: &Issue) -> Self {
    if issue.is_closed() {
      Stage::Closed
    } else if issue.has_label(IN_PROGRESS) {
      Stage::InProgress
    } else if issue.has_label(ON_DECK) {
      Stage::OnDeck
    } else {
      Stage::Backlog
    }
  }
}

impl std::fmt::Display for Stage {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let s = match self {
      Stage::Backlog => "backlog",
      Stage::OnDeck => ON_DECK,
      Stage::InProgress => IN_PROGRESS,
      Stage::Closed => "closed",
    };
    f.write_str(s)
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
  MkOnDeck,
  WorkOn,
  Take,
  Drop,
  Block,
  Unblock,
  Tag(String),
  Untag(String),
  Close,
  Comment(String),
}

/// One remote mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
  AddLabel(String),
  RemoveLabel(String),
  Assign(String),
  Unassign(String),
  SetState(IssueState),
  Comment(String),
}

impl std::fmt::Display for Step {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Step::AddLabel(label) => write!(f, "add label {label}"),
      Step::RemoveLabel(label) => write!(f, "remove label {label}"),
      Step::Assign(login) => write!(f, "assign {login}"),
      Step::Unassign(login) => write!(f, "unassign {login}"),
      Step::SetState(IssueState::Open) => write!(f, "reopen"),
      Step::SetState(IssueState::Closed) => write!(f, "close"),
      Step::Comment(_) => write!(f, "add comment"),
    }
  }
}

fn add(label: &str) -> Step {
  Step::AddLabel(label.to_string())
}

fn remove(label: &str) -> Step {
  Step::RemoveLabel(label.to_string())
}

impl Transition {
  pub fn name(&self) -> &'static str {
    match self {
      Transition::MkOnDeck => "mkondeck",
      Transition::WorkOn => "workon",
      Transition::Take => "take",
      Transition::Drop => "drop",
      Transition::Block => "blocked",
      Transition::Unblock => "unblocked",
      Transition::Tag(_) => "tag",
      Transition::Untag(_) => "untag",
      Transition::Close => "close",
      Transition::Comment(_) => "comment",
    }
  }

  /// Verb phrase for notifications: "<operator> <action> <issue>".
  pub fn action(&self) -> String {
    match self {
      Transition::MkOnDeck => "put on deck".to_string(),
      Transition::WorkOn => "started working on".to_string(),
      Transition::Take => "took".to_string(),
      Transition::Drop => "dropped".to_string(),
      Transition::Block => "marked as blocked".to_string(),
      Transition::Unblock => "unblocked".to_string(),
      Transition::Tag(label) => format!("tagged {label}"),
      Transition::Untag(label) => format!("removed tag {label} from"),
      Transition::Close => "closed".to_string(),
      Transition::Comment(_) => "commented on".to_string(),
    }
  }

  /// Remote mutations in the order they must run. The order is
  /// observable remotely: a closed issue is reopened before it is
  /// relabeled, and workflow labels are cleared before closing.
  pub fn plan(&self, issue: &Issue, operator: &str) -> Vec<Step> {
    match self {
      Transition::MkOnDeck => vec![add(ON_DECK), remove(IN_PROGRESS)],
      Transition::WorkOn => {
        let mut steps = Vec::new();
        if issue.is_closed() {
          steps.push(Step::SetState(IssueState::Open));
        }
        steps.extend([
          add(IN_PROGRESS),
          remove(ON_DECK),
          remove(BLOCKED),
          Step::Assign(operator.to_string()),
        ]);
        steps
      }
      Transition::Take => vec![Step::Assign(operator.to_string())],
      Transition::Drop => vec![
        Step::Unassign(operator.to_string()),
        remove(IN_PROGRESS),
        remove(ON_DECK),
      ],
      Transition::Block => vec![add(BLOCKED)],
      Transition::Unblock => vec![remove(BLOCKED)],
      Transition::Tag(label) => vec![add(label)],
      Transition::Untag(label) => vec![remove(label)],
      Transition::Close => vec![
        remove(IN_PROGRESS),
        remove(ON_DECK),
        remove(BLOCKED),
        Step::SetState(IssueState::Closed),
      ],
      Transition::Comment(body) => vec![Step::Comment(body.clone())],
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::github::issue::fixture::*;

  #[test]
  fn test_stage_of() {
    assert_eq!(Stage::of(&issue("acme/a", 1)), Stage::Backlog);
    assert_eq!(Stage::of(&labeled(issue("acme/a", 1), &[ON_DECK])), Stage::OnDeck);
    assert_eq!(
      Stage::of(&labeled(issue("acme/a", 1), &[ON_DECK, IN_PROGRESS, BLOCKED])),
      Stage::InProgress
    );
    let closed = closed_days_ago(labeled(issue("acme/a", 1), &[IN_PROGRESS]), 1, "bob");
    assert_eq!(Stage::of(&closed), Stage::Closed);
  }

  #[test]
  fn test_workon_plan_open_issue() {
    let steps = Transition::WorkOn.plan(&issue("acme/a", 1), "alice");
    assert_eq!(
      steps,
      vec![
        add(IN_PROGRESS),
        remove(ON_DECK),
        remove(BLOCKED),
        Step::Assign("alice".into()),
      ]
    );
  }

  #[test]
  fn test_workon_plan_reopens_first() {
    let closed = closed_days_ago(issue("acme/a", 1), 3, "bob");
    let steps = Transition::WorkOn.plan(&closed, "alice");
    assert_eq!(steps[0], Step::SetState(IssueState::Open));
    assert_eq!(steps.len(), 5);
  }

  #[test]
  fn test_close_plan_clears_labels_before_closing() {
    let steps = Transition::Close.plan(&issue("acme/a", 1), "alice");
    assert_eq!(
      steps,
      vec![
        remove(IN_PROGRESS),
        remove(ON_DECK),
        remove(BLOCKED),
        Step::SetState(IssueState::Closed),
      ]
    );
  }

  #[test]
  fn test_drop_and_mkondeck_plans() {
    let i = issue("acme/a", 1);
    assert_eq!(
      Transition::Drop.plan(&i, "alice"),
      vec![
        Step::Unassign("alice".into()),
        remove(IN_PROGRESS),
        remove(ON_DECK)
      ]
    );
    assert_eq!(
      Transition::MkOnDeck.plan(&i, "alice"),
      vec![add(ON_DECK), remove(IN_PROGRESS)]
    );
  }

  #[test]
  fn test_tags_touch_only_their_label() {
    let i = labeled(issue("acme/a", 1), &[IN_PROGRESS]);
    assert_eq!(
      Transition::Tag("perf".into()).plan(&i, "alice"),
      vec![add("perf")]
    );
    assert_eq!(
      Transition::Untag("perf".into()).plan(&i, "alice"),
      vec![remove("perf")]
    );
  }

  #[test]
  fn test_step_display() {
    assert_eq!(add(BLOCKED).to_string(), "add label blocked");
    assert_eq!(Step::SetState(IssueState::Open).to_string(), "reopen");
    assert_eq!(Step::Unassign("alice".into()).to_string(), "unassign alice");
  }
}
