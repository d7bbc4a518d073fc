//! Runtime configuration for the `gradewatch` binary.
//!
//! A TOML file layered under `GRADEWATCH__*` environment variables, e.g.
//! `GRADEWATCH__UPSTREAM__API_URL`.

use std::{path::{Path, PathBuf}, time::Duration};

use gradewatch_api::auth::AuthConfig;
use gradewatch_upstream::UpstreamConfig;
use serde::Deserialize;

use crate::{
  credentials::StaticCredentials,
  diff::{DiffPolicy, Sensitivity},
  poller::PollerSettings,
};

pub const ENV_PREFIX: &str = "GRADEWATCH";

fn default_interval_secs() -> u64 { 900 }
fn default_max_concurrency() -> usize { 5 }
fn default_failure_threshold() -> u32 { 3 }
fn default_true() -> bool { true }
fn default_threshold() -> f64 { Sensitivity::DEFAULT_THRESHOLD }
fn default_store_path() -> PathBuf { PathBuf::from("~/.local/share/gradewatch/grades.db") }
fn default_host() -> String { "127.0.0.1".to_string() }
fn default_port() -> u16 { 8080 }

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensitivityKind {
  #[default]
  Exact,
  Meaningful,
  Significant,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
  #[serde(default = "default_interval_secs")]
  pub interval_secs:                u64,
  #[serde(default = "default_max_concurrency")]
  pub max_concurrency:              usize,
  #[serde(default = "default_failure_threshold")]
  pub failure_escalation_threshold: u32,
  #[serde(default = "default_true")]
  pub notify_new_courses:           bool,
  #[serde(default)]
  pub sensitivity:                  SensitivityKind,
  /// Minimum numeric change under `sensitivity = "significant"`.
  #[serde(default = "default_threshold")]
  pub significant_threshold:        f64,
  /// Term ids polled when the homepage lists none.
  #[serde(default)]
  pub fallback_term_ids:            Vec<String>,
  #[serde(default = "default_store_path")]
  pub store_path:                   PathBuf,
  pub upstream:                     UpstreamConfig,
  /// Admin router; disabled when absent.
  #[serde(default)]
  pub http:                         Option<HttpConfig>,
  #[serde(default)]
  pub notifier:                     NotifierConfig,
  #[serde(default)]
  pub users:                        Vec<UserConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
  #[serde(default = "default_host")]
  pub host:                String,
  #[serde(default = "default_port")]
  pub port:                u16,
  pub admin_username:      String,
  pub admin_password_hash: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotifierConfig {
  /// Changes and escalations are POSTed here; logged otherwise.
  #[serde(default)]
  pub webhook_url: Option<String>,
}

#[derive(Clone, Deserialize)]
pub struct UserConfig {
  pub username: String,
  /// Enables automatic re-login. Without it an expired session needs a
  /// manual login through the admin API.
  #[serde(default)]
  pub password: Option<String>,
}

impl std::fmt::Debug for UserConfig {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("UserConfig")
      .field("username", &self.username)
      .field("password", &self.password.as_ref().map(|_| "<redacted>"))
      .finish()
  }
}

impl Settings {
  /// Read `path` (optional) and the environment.
  pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
      .build()?
      .try_deserialize()
  }

  pub fn diff_policy(&self) -> DiffPolicy {
    let sensitivity = match self.sensitivity {
      SensitivityKind::Exact => Sensitivity::Exact,
      SensitivityKind::Meaningful => Sensitivity::Meaningful,
      SensitivityKind::Significant => Sensitivity::Significant {
        threshold: self.significant_threshold,
      },
    };
    DiffPolicy {
      notify_new_courses: self.notify_new_courses,
      sensitivity,
    }
  }

  pub fn poller_settings(&self) -> PollerSettings {
    PollerSettings {
      interval:          Duration::from_secs(self.interval_secs.max(1)),
      max_concurrency:   self.max_concurrency.max(1),
      failure_threshold: self.failure_escalation_threshold.max(1),
    }
  }

  pub fn usernames(&self) -> Vec<String> {
    self.users.iter().map(|u| u.username.clone()).collect()
  }

  pub fn credentials(&self) -> StaticCredentials {
    StaticCredentials::from_pairs(self.users.iter().filter_map(|u| {
      Some((u.username.clone(), u.password.clone()?))
    }))
  }

  pub fn auth_config(&self) -> Option<AuthConfig> {
    self.http.as_ref().map(|h| AuthConfig {
      username:      h.admin_username.clone(),
      password_hash: h.admin_password_hash.clone(),
    })
  }
}
