use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{DeckError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Repositories in priority order. Ambiguous bare issue numbers
    /// resolve to the earliest repository in this list.
    pub repos: Vec<String>,
    /// GitHub login used as the assignee for workon/take/drop.
    pub operator: String,
    #[serde(default)]
    pub settings: Settings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_lookback_days")]
    pub lookback_days: u32,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_stale_days")]
    pub stale_days: u32,
    #[serde(default = "default_closed_days")]
    pub closed_days: u32,
    #[serde(default)]
    pub slack_webhook_url: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: default_host(),
            lookback_days: default_lookback_days(),
            request_timeout_secs: default_request_timeout(),
            stale_days: default_stale_days(),
            closed_days: default_closed_days(),
            slack_webhook_url: None,
        }
    }
}

fn default_host() -> String {
    "github.com".to_string()
}
fn default_lookback_days() -> u32 {
    100
}
fn default_request_timeout() -> u64 {
    30
}
fn default_stale_days() -> u32 {
    30
}
fn default_closed_days() -> u32 {
    63
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(DeckError::ConfigNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.repos.is_empty() {
            return Err(DeckError::Config("no repos configured".into()));
        }
        if self.operator.trim().is_empty() {
            return Err(DeckError::Config("operator must not be empty".into()));
        }
        for (i, repo) in self.repos.iter().enumerate() {
            match repo.split_once('/') {
                Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/') => {}
                _ => {
                    return Err(DeckError::Config(format!(
                        "repo must be in owner/repo format: {repo}"
                    )))
                }
            }
            if self.repos[..i].iter().any(|r| r.eq_ignore_ascii_case(repo)) {
                return Err(DeckError::Config(format!("duplicate repo: {repo}")));
            }
        }
        Ok(())
    }

    /// Webhook from the config file, falling back to `SLACK_WEBHOOK_URL`.
    pub fn slack_webhook_url(&self) -> Option<String> {
        self.settings
            .slack_webhook_url
            .clone()
            .or_else(|| std::env::var("SLACK_WEBHOOK_URL").ok())
            .filter(|url| !url.is_empty())
    }
}
