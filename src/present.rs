use std::process::Command;

use tracing::{info, warn};

use crate::error::{DeckError, Result};
use crate::github::issue::Issue;
use crate::workflow::transition::Stage;

/// Extra column shown after the title.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detail {
  None,
  Closed,
  Updated,
}

pub fn issue_line(issue: &Issue, detail: Detail) -> String {
  let mut line = format!("{}#{}  {}", issue.repo, issue.number, issue.title);
  if !issue.labels.is_empty() {
    line.push_str(&format!("  [{}]", issue.labels.join(", ")));
  }
  match detail {
    Detail::None => {}
    Detail::Closed => {
      if let Some(closed_at) = issue.closed_at {
        line.push_str(&format!("  closed {}", closed_at.format("%Y-%m-%d")));
      }
      if let Some(by) = &issue.closed_by {
        line.push_str(&format!(" by {by}"));
      }
    }
    Detail::Updated => {
      line.push_str(&format!("  updated {}", issue.updated_at.format("%Y-%m-%d")));
    }
  }
  line
}

pub fn issue_details(issue: &Issue, host: &str) -> String {
  let assignees = if issue.assignees.is_empty() {
    "-".to_string()
  } else {
    issue.assignees.join(", ")
  };
  let labels = if issue.labels.is_empty() {
    "-".to_string()
  } else {
    issue.labels.join(", ")
  };
  let blocked = if issue.has_label(crate::workflow::transition::BLOCKED) {
    " (blocked)"
  } else {
    ""
  };

  format!(
    "{issue}\nStage:     {}{blocked}\nLabels:    {labels}\nAssignees: {assignees}\nAuthor:    {}\nCreated:   {}\nUpdated:   {}\nURL:       {}",
    Stage::of(issue),
    issue.author,
    issue.created_at.format("%Y-%m-%d"),
    issue.updated_at.format("%Y-%m-%d %H:%M"),
    issue.permalink(host),
  )
}

pub fn print_issues(issues: &[Issue], detail: Detail) {
  if issues.is_empty() {
    println!("No issues.");
    return;
  }
  for issue in issues {
    println!("{}", issue_line(issue, detail));
  }
}

fn opener() -> &'static str {
  if cfg!(target_os = "macos") {
    "open"
  } else {
    "xdg-open"
  }
}

pub fn open_in_browser(url: &str) -> Result<()> {
  info!("opening {url}");

  let status = Command::new(opener()).arg(url).status()?;
  if !status.success() {
    return Err(DeckError::Io(std::io::Error::other(format!(
      "{} {url} exited with {status}",
      opener()
    ))));
  }
  Ok(())
}

/// Opens every issue; a failure for one is logged and the rest still open.
pub fn open_all(issues: &[Issue], host: &str) {
  for issue in issues {
    if let Err(e) = open_in_browser(&issue.permalink(host)) {
      warn!("could not open {issue}: {e}");
    }
  }
}
