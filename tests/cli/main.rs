use std::io::Write;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::NamedTempFile;

fn deckhand() -> Command {
  let mut cmd = Command::cargo_bin("deckhand").unwrap();
  cmd.env_remove("RUST_LOG").env("NOTIFY_DISABLED", "1");
  cmd
}

fn config_file() -> NamedTempFile {
  let mut f = NamedTempFile::new().unwrap();
  writeln!(
    f,
    "repos:\n  - acme/web\n  - acme/api\noperator: alice\nsettings:\n  request_timeout_secs: 1"
  )
  .unwrap();
  f
}

#[test]
fn help_lists_workflow_commands() {
  deckhand()
    .arg("--help")
    .assert()
    .success()
    .stdout(predicate::str::contains("workon"))
    .stdout(predicate::str::contains("mkondeck"))
    .stdout(predicate::str::contains("closed"));
}

#[test]
fn missing_config_fails() {
  deckhand()
    .args(["--config", "/nonexistent/deckhand.yaml", "list"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("config file not found"));
}

#[test]
fn invalid_config_fails() {
  let mut f = NamedTempFile::new().unwrap();
  writeln!(f, "repos: []\noperator: alice").unwrap();

  deckhand()
    .arg("--config")
    .arg(f.path())
    .arg("list")
    .assert()
    .failure()
    .stderr(predicate::str::contains("no repos configured"));
}

#[test]
fn invalid_selector_is_not_found_without_fetching() {
  let config = config_file();

  deckhand()
    .env_remove("GITHUB_TOKEN")
    .arg("--config")
    .arg(config.path())
    .args(["workon", "abc"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("No issue found matching 'abc'"))
    .stdout(predicate::str::is_empty());
}

#[test]
fn listing_requires_a_token() {
  let config = config_file();

  deckhand()
    .env_remove("GITHUB_TOKEN")
    .arg("--config")
    .arg(config.path())
    .arg("list")
    .assert()
    .failure()
    .stderr(predicate::str::contains("GITHUB_TOKEN not set"));
}

#[test]
fn closed_rejects_by_with_mine() {
  let config = config_file();

  deckhand()
    .arg("--config")
    .arg(config.path())
    .args(["closed", "--by", "bob", "--mine"])
    .assert()
    .failure();
}
