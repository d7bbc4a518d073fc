//! `CycleDriver`: the seam between the poller and the admin API.
//!
//! The API crate knows nothing about sessions, fetching or diffing; it only
//! asks a driver to run a cycle, accept a manual login, or report health.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{change::ChangeEvent, credentials::Credentials, error::DriverError};

/// How one user's cycle ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CycleOutcome {
  /// First successful fetch; stored without emitting events.
  Baseline { records: usize },
  /// Nothing changed.
  Unchanged,
  /// Events were handed to the notifier and the snapshot was stored.
  Notified { events: Vec<ChangeEvent> },
  /// The notifier refused the events; the snapshot was not stored so the
  /// same changes are detected again next cycle.
  NotifyFailed { events: usize },
  /// Events were handed off but the snapshot could not be stored.
  PersistFailed,
  /// The upstream returned no grades at all.
  Empty,
  /// No valid session could be obtained.
  AuthFailed { escalated: bool },
  /// Fetching failed; retried next cycle.
  FetchFailed { consecutive: u32 },
  /// The user was not processed this cycle.
  Skipped { reason: String },
}

impl CycleOutcome {
  pub fn is_success(&self) -> bool {
    matches!(
      self,
      Self::Baseline { .. } | Self::Unchanged | Self::Notified { .. } | Self::Empty
    )
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleReport {
  pub cycle_id:    Uuid,
  pub username:    String,
  pub started_at:  DateTime<Utc>,
  pub finished_at: DateTime<Utc>,
  #[serde(flatten)]
  pub outcome:     CycleOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
  pub users:            usize,
  pub cycles_completed: u64,
  pub last_cycle_at:    Option<DateTime<Utc>>,
}

pub trait CycleDriver: Send + Sync {
  /// Run one cycle for `username` now, serialized against any scheduled
  /// cycle for the same user.
  fn trigger<'a>(
    &'a self,
    username: &'a str,
  ) -> impl Future<Output = Result<CycleReport, DriverError>> + Send + 'a;

  /// Log in with fresh credentials, replacing the user's session and
  /// clearing any suppressed auth failure.
  fn login(
    &self,
    credentials: Credentials,
  ) -> impl Future<Output = Result<(), DriverError>> + Send + '_;

  fn health(&self) -> impl Future<Output = HealthReport> + Send + '_;
}
