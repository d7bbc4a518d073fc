//! The `Notifier` trait and the escalations it may receive.

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::{change::ChangeEvent, error::NotifyError};

/// Conditions reported to the notifier outside the normal change stream.
///
/// Everything else (transient network errors, per-term parse failures) is
/// absorbed by the pipeline and never reaches the notifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Escalation {
  /// The session could not be revalidated or re-established.
  AuthFailed,
  /// Fetching failed on this many consecutive cycles.
  RepeatedFetchFailure { consecutive: u32 },
}

/// Receives ordered change events. Delivery and formatting are its concern;
/// a returned `Ok` means the hand-off happened.
pub trait Notifier: Send + Sync {
  fn notify<'a>(
    &'a self,
    username: &'a str,
    events: &'a [ChangeEvent],
  ) -> impl Future<Output = Result<(), NotifyError>> + Send + 'a;

  fn escalate<'a>(
    &'a self,
    username: &'a str,
    escalation: Escalation,
  ) -> impl Future<Output = Result<(), NotifyError>> + Send + 'a;
}
