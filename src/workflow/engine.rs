use std::sync::Arc;

use tracing::{info, warn};

use crate::error::{DeckError, Result};
use crate::github::issue::Issue;
use crate::notify::{Notification, Notifier};
use crate::tracker::{Removal, Tracker};
use crate::workflow::transition::{Step, Transition};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepEffect {
  Applied,
  /// Removal of a label or assignee that was not there.
  AlreadyAbsent,
  Commented(u64),
}

#[derive(Debug, Default)]
pub struct Outcome {
  pub effects: Vec<(Step, StepEffect)>,
}

impl Outcome {
  pub fn comment_id(&self) -> Option<u64> {
    self.effects.iter().find_map(|(_, effect)| match effect {
      StepEffect::Commented(id) => Some(*id),
      _ => None,
    })
  }

  pub fn already_absent(&self) -> usize {
    self
      .effects
      .iter()
      .filter(|(_, effect)| *effect == StepEffect::AlreadyAbsent)
      .count()
  }
}

/// Drives transitions against the tracker on behalf of one operator.
pub struct Workflow {
  tracker: Arc<dyn Tracker>,
  operator: String,
  host: String,
  notifier: Notifier,
}

impl Workflow {
  pub fn new(tracker: Arc<dyn Tracker>, operator: &str, host: &str, notifier: Notifier) -> Self {
    Self {
      tracker,
      operator: operator.to_string(),
      host: host.to_string(),
      notifier,
    }
  }

  /// Runs the transition's steps one at a time. A failing step stops the
  /// sequence; steps already applied stay applied.
  pub async fn apply(&self, issue: &Issue, transition: &Transition) -> Result<Outcome> {
    let steps = transition.plan(issue, &self.operator);
    info!("{issue}: {} ({} step(s))", transition.name(), steps.len());

    let mut outcome = Outcome::default();
    for (applied, step) in steps.into_iter().enumerate() {
      match self.run_step(issue, &step).await {
        Ok(effect) => outcome.effects.push((step, effect)),
        Err(e) => {
          return Err(DeckError::Transition {
            transition: format!("{} {}#{}", transition.name(), issue.repo, issue.number),
            step: step.to_string(),
            applied,
            source: Box::new(e),
          });
        }
      }
    }

    if self.notifier.has_channels() {
      let notification = Notification::new(&self.operator, &transition.action(), issue, &self.host);
      self.notifier.notify(&notification).await;
    }

    Ok(outcome)
  }

  async fn run_step(&self, issue: &Issue, step: &Step) -> Result<StepEffect> {
    let (repo, number) = (issue.repo.as_str(), issue.number);
    match step {
      Step::AddLabel(label) => {
        self
          .tracker
          .add_labels(repo, number, std::slice::from_ref(label))
          .await?;
        Ok(StepEffect::Applied)
      }
      Step::RemoveLabel(label) => {
        removal_effect(self.tracker.remove_label(repo, number, label).await, issue, step)
      }
      Step::Assign(login) => {
        self.tracker.set_assignee(repo, number, login).await?;
        Ok(StepEffect::Applied)
      }
      Step::Unassign(login) => {
        removal_effect(self.tracker.remove_assignee(repo, number, login).await, issue, step)
      }
      Step::SetState(state) => {
        self.tracker.set_state(repo, number, *state).await?;
        Ok(StepEffect::Applied)
      }
      Step::Comment(body) => {
        let id = self.tracker.add_comment(repo, number, body).await?;
        Ok(StepEffect::Commented(id))
      }
    }
  }
}

fn removal_effect(removal: Removal, issue: &Issue, step: &Step) -> Result<StepEffect> {
  match removal {
    Removal::Removed => Ok(StepEffect::Applied),
    Removal::AlreadyAbsent => {
      warn!("{}#{}: {step}: already absent", issue.repo, issue.number);
      Ok(StepEffect::AlreadyAbsent)
    }
    Removal::Failed(e) => Err(e),
  }
}
