mod config;
mod error;
mod github;
mod notify;
mod pipeline;
mod present;
mod tracker;
mod workflow;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::{error, info};

use crate::config::Config;
use crate::error::{DeckError, Result};
use crate::github::client::GitHubClient;
use crate::github::issue::Issue;
use crate::notify::Notifier;
use crate::pipeline::fetch::{complete_closed_by, fetch_issues};
use crate::pipeline::filter::{exclude_pull_requests, IssueFilter, SortKey};
use crate::pipeline::select::{resolve, Selector};
use crate::present::Detail;
use crate::tracker::{ListQuery, StateFilter, Tracker};
use crate::workflow::engine::Workflow;
use crate::workflow::transition::{Transition, BLOCKED, BUG, IN_PROGRESS, ON_DECK};

#[derive(Parser)]
#[command(
  name = "deckhand",
  about = "Label-driven issue workflow across many GitHub repositories"
)]
struct Cli {
  #[command(subcommand)]
  command: Commands,

  /// Path to config file
  #[arg(short, long, default_value = "deckhand.yaml")]
  config: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
  /// List issues across all repositories
  List {
    /// Only issues carrying this label (repeatable)
    #[arg(long)]
    label: Vec<String>,
    /// Only issues assigned to the operator
    #[arg(long)]
    mine: bool,
    #[arg(long, value_enum, default_value_t = StateFilter::Open)]
    state: StateFilter,
    /// Only issues updated within this many days
    #[arg(long)]
    updated: Option<u32>,
    /// Open every match in the browser
    #[arg(long)]
    open: bool,
  },
  /// Open issues assigned to the operator
  Mine {
    #[arg(long)]
    open: bool,
  },
  /// Issues labeled on-deck
  Ondeck {
    #[arg(long)]
    open: bool,
  },
  /// Issues labeled in-progress
  Wip {
    #[arg(long)]
    open: bool,
  },
  /// Issues labeled bug
  Bugs {
    #[arg(long)]
    open: bool,
  },
  /// Without a selector, list blocked issues; with one, mark it blocked
  Blocked {
    selector: Option<String>,
    #[arg(long)]
    open: bool,
  },
  /// Remove the blocked label
  Unblocked { selector: String },
  /// Recently closed issues, oldest close first
  Closed {
    /// Closed within this many days [default: settings.closed_days]
    #[arg(long)]
    days: Option<u32>,
    /// Only issues closed by this login
    #[arg(long)]
    by: Option<String>,
    /// Only issues closed by the operator
    #[arg(long, conflicts_with = "by")]
    mine: bool,
    #[arg(long)]
    open: bool,
  },
  /// Open issues not updated recently, least recently updated first
  Stale {
    /// Not updated within this many days [default: settings.stale_days]
    #[arg(long)]
    days: Option<u32>,
    #[arg(long)]
    open: bool,
  },
  /// Show one issue
  Show {
    selector: String,
    #[arg(long)]
    open: bool,
  },
  /// Put an issue on deck
  Mkondeck { selector: String },
  /// Start working on an issue (reopens it if closed)
  Workon { selector: String },
  /// Assign an issue to the operator
  Take { selector: String },
  /// Unassign the operator and clear workflow labels
  Drop { selector: String },
  /// Add an arbitrary label
  Tag { selector: String, label: String },
  /// Remove an arbitrary label
  Untag { selector: String, label: String },
  /// Clear workflow labels and close
  Close { selector: String },
  /// Add a comment
  Comment { selector: String, text: String },
}

#[tokio::main]
async fn main() {
  tracing_subscriber::fmt()
    .with_env_filter(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
    )
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();

  if let Err(e) = run(cli).await {
    error!("{e}");
    std::process::exit(1);
  }
}

async fn run(cli: Cli) -> Result<()> {
  let config = Config::load(&cli.config)?;

  match cli.command {
    Commands::List {
      label,
      mine,
      state,
      updated,
      open,
    } => {
      let mut query = ListQuery::new(state, config.settings.lookback_days);
      let mut filter = label
        .into_iter()
        .fold(IssueFilter::new(), |filter, l| filter.label(l));
      if mine {
        query = query.assignee(config.operator.as_str());
        filter = filter.assignee(config.operator.as_str());
      }
      if let Some(days) = updated {
        filter = filter.updated_within(days);
      }
      cmd_list(&config, query, filter, Detail::None, open).await
    }
    Commands::Mine { open } => {
      let query = open_query(&config).assignee(config.operator.as_str());
      let filter = IssueFilter::new().assignee(config.operator.as_str());
      cmd_list(&config, query, filter, Detail::None, open).await
    }
    Commands::Ondeck { open } => cmd_label(&config, ON_DECK, open).await,
    Commands::Wip { open } => cmd_label(&config, IN_PROGRESS, open).await,
    Commands::Bugs { open } => cmd_label(&config, BUG, open).await,
    Commands::Blocked {
      selector: None,
      open,
    } => cmd_label(&config, BLOCKED, open).await,
    Commands::Blocked {
      selector: Some(selector),
      ..
    } => cmd_transition(&config, &selector, Transition::Block).await,
    Commands::Unblocked { selector } => {
      cmd_transition(&config, &selector, Transition::Unblock).await
    }
    Commands::Closed {
      days,
      by,
      mine,
      open,
    } => {
      let days = days.unwrap_or(config.settings.closed_days);
      let by = by.or_else(|| mine.then(|| config.operator.clone()));
      cmd_closed(&config, days, by, open).await
    }
    Commands::Stale { days, open } => {
      let filter = IssueFilter::new()
        .stale_after(days.unwrap_or(config.settings.stale_days))
        .sort_by(SortKey::UpdatedAt);
      // Stale issues are by definition outside any activity window.
      let query = open_query(&config).unbounded();
      cmd_list(&config, query, filter, Detail::Updated, open).await
    }
    Commands::Show { selector, open } => cmd_show(&config, &selector, open).await,
    Commands::Mkondeck { selector } => {
      cmd_transition(&config, &selector, Transition::MkOnDeck).await
    }
    Commands::Workon { selector } => cmd_transition(&config, &selector, Transition::WorkOn).await,
    Commands::Take { selector } => cmd_transition(&config, &selector, Transition::Take).await,
    Commands::Drop { selector } => cmd_transition(&config, &selector, Transition::Drop).await,
    Commands::Tag { selector, label } => {
      cmd_transition(&config, &selector, Transition::Tag(label)).await
    }
    Commands::Untag { selector, label } => {
      cmd_transition(&config, &selector, Transition::Untag(label)).await
    }
    Commands::Close { selector } => cmd_transition(&config, &selector, Transition::Close).await,
    Commands::Comment { selector, text } => {
      cmd_transition(&config, &selector, Transition::Comment(text)).await
    }
  }
}

fn open_query(config: &Config) -> ListQuery {
  ListQuery::new(StateFilter::Open, config.settings.lookback_days)
}

fn connect() -> Result<Arc<dyn Tracker>> {
  Ok(Arc::new(GitHubClient::new()?))
}

/// Fresh aggregate snapshot with pull requests removed.
async fn snapshot(
  config: &Config,
  tracker: Arc<dyn Tracker>,
  query: &ListQuery,
) -> Result<Vec<Issue>> {
  let timeout = Duration::from_secs(config.settings.request_timeout_secs);
  let issues = fetch_issues(tracker, &config.repos, query, timeout).await?;
  Ok(exclude_pull_requests(issues))
}

async fn cmd_list(
  config: &Config,
  query: ListQuery,
  filter: IssueFilter,
  detail: Detail,
  open: bool,
) -> Result<()> {
  let issues = snapshot(config, connect()?, &query).await?;
  let matched = filter.apply(issues, chrono::Utc::now());
  show_matches(config, &matched, detail, open);
  Ok(())
}

fn show_matches(config: &Config, matched: &[Issue], detail: Detail, open: bool) {
  present::print_issues(matched, detail);
  if open {
    present::open_all(matched, &config.settings.host);
  }
}

/// Issues closed within `days`, oldest close first. Listings do not say who
/// closed an issue, so filtering by closer looks each candidate up.
async fn cmd_closed(config: &Config, days: u32, by: Option<String>, open: bool) -> Result<()> {
  let tracker = connect()?;
  // Anything closed within `days` was also updated within `days`.
  let query = ListQuery::new(
    StateFilter::Closed,
    days.max(config.settings.lookback_days),
  );
  let now = chrono::Utc::now();
  let recent = IssueFilter::new()
    .closed_within(days)
    .apply(snapshot(config, tracker.clone(), &query).await?, now);

  let mut filter = IssueFilter::new().sort_by(SortKey::ClosedAt);
  let candidates = match by {
    Some(login) => {
      filter = filter.closed_by(login);
      let timeout = Duration::from_secs(config.settings.request_timeout_secs);
      complete_closed_by(tracker, recent, timeout).await?
    }
    None => recent,
  };

  show_matches(config, &filter.apply(candidates, now), Detail::Closed, open);
  Ok(())
}

async fn cmd_label(config: &Config, label: &str, open: bool) -> Result<()> {
  let filter = IssueFilter::new().label(label);
  cmd_list(config, open_query(config), filter, Detail::None, open).await
}

/// Resolves a selector against a fresh snapshot of open and closed issues.
/// Unparseable selectors are reported as not found without connecting.
async fn resolve_target(config: &Config, token: &str) -> Result<(Arc<dyn Tracker>, Issue)> {
  let selector = Selector::parse(token);
  if selector == Selector::Invalid {
    return Err(DeckError::NotFound(token.to_string()));
  }

  let tracker = connect()?;
  let query = ListQuery::new(StateFilter::All, config.settings.lookback_days);
  let issues = snapshot(config, tracker.clone(), &query).await?;
  let issue = resolve(&selector, &issues)
    .cloned()
    .ok_or_else(|| DeckError::NotFound(token.to_string()))?;
  Ok((tracker, issue))
}

async fn cmd_show(config: &Config, token: &str, open: bool) -> Result<()> {
  let (_, issue) = resolve_target(config, token).await?;

  println!("{}", present::issue_details(&issue, &config.settings.host));
  if open {
    present::open_in_browser(&issue.permalink(&config.settings.host))?;
  }
  Ok(())
}

async fn cmd_transition(config: &Config, token: &str, transition: Transition) -> Result<()> {
  let (tracker, issue) = resolve_target(config, token).await?;

  let workflow = Workflow::new(
    tracker,
    &config.operator,
    &config.settings.host,
    Notifier::from_config(config),
  );
  let outcome = workflow.apply(&issue, &transition).await?;

  info!(
    "{}: {} applied {} step(s), {} already absent",
    issue,
    transition.name(),
    outcome.effects.len(),
    outcome.already_absent()
  );
  match outcome.comment_id() {
    Some(id) => println!("{}#{}: comment {id} added", issue.repo, issue.number),
    None => println!("{}#{}: {} done", issue.repo, issue.number, transition.name()),
  }
  Ok(())
}
