use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum DeckError {
  #[error("config error: {0}")]
  Config(String),

  #[error("config file not found: {0}")]
  ConfigNotFound(PathBuf),

  #[error("github error: {0}")]
  GitHub(String),

  #[error("timeout: {0}")]
  Timeout(String),

  #[error("fetch failed for {repo}: {source}")]
  Aggregation {
    repo: String,
    #[source]
    source: Box<DeckError>,
  },

  #[error("No issue found matching '{0}'")]
  NotFound(String),

  #[error("{transition} stopped at step {step} ({applied} step(s) already applied): {source}")]
  Transition {
    transition: String,
    step: String,
    applied: usize,
    #[source]
    source: Box<DeckError>,
  },

  #[error("notify error: {0}")]
  Notify(String),

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  #[error("yaml error: {0}")]
  Yaml(#[from] serde_yaml::Error),

  #[error("octocrab error: {0}")]
  Octocrab(#[from] octocrab::Error),

  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, DeckError>;
