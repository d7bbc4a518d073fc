//! Notifier implementations selected by configuration.

use std::time::Duration;

use gradewatch_core::{
  NotifyError,
  change::ChangeEvent,
  notify::{Escalation, Notifier},
};
use serde::Serialize;

// ─── Log ─────────────────────────────────────────────────────────────────────

/// Writes every event to the `tracing` log. Used when no webhook is set.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
  async fn notify(&self, username: &str, events: &[ChangeEvent]) -> Result<(), NotifyError> {
    for e in events {
      tracing::info!(
        %username,
        term = %e.term_id,
        course = %e.course_code,
        field = %e.field,
        old = e.old_value.as_deref().unwrap_or(""),
        new = e.new_value.as_deref().unwrap_or(""),
        "grade changed"
      );
    }
    Ok(())
  }

  async fn escalate(&self, username: &str, escalation: Escalation) -> Result<(), NotifyError> {
    tracing::warn!(%username, ?escalation, "escalation");
    Ok(())
  }
}

// ─── Webhook ─────────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct EventsPayload<'a> {
  username: &'a str,
  events:   &'a [ChangeEvent],
}

#[derive(Serialize)]
struct EscalationPayload<'a> {
  username:   &'a str,
  escalation: Escalation,
}

/// POSTs JSON to a fixed URL: `{username, events}` for changes and
/// `{username, escalation}` for escalations. Any non-2xx answer is a
/// failed hand-off.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
  client: reqwest::Client,
  url:    String,
}

impl WebhookNotifier {
  pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
    Ok(Self {
      client: reqwest::Client::builder().timeout(timeout).build()?,
      url:    url.into(),
    })
  }

  async fn post<T: Serialize>(&self, body: &T) -> Result<(), NotifyError> {
    self
      .client
      .post(&self.url)
      .json(body)
      .send()
      .await
      .and_then(reqwest::Response::error_for_status)
      .map_err(|e| NotifyError(e.to_string()))?;
    Ok(())
  }
}

impl Notifier for WebhookNotifier {
  async fn notify(&self, username: &str, events: &[ChangeEvent]) -> Result<(), NotifyError> {
    self.post(&EventsPayload { username, events }).await
  }

  async fn escalate(&self, username: &str, escalation: Escalation) -> Result<(), NotifyError> {
    self
      .post(&EscalationPayload {
        username,
        escalation,
      })
      .await
  }
}

// ─── Configured ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum ConfiguredNotifier {
  Log(LogNotifier),
  Webhook(WebhookNotifier),
}

impl Notifier for ConfiguredNotifier {
  async fn notify(&self, username: &str, events: &[ChangeEvent]) -> Result<(), NotifyError> {
    match self {
      Self::Log(n) => n.notify(username, events).await,
      Self::Webhook(n) => n.notify(username, events).await,
    }
  }

  async fn escalate(&self, username: &str, escalation: Escalation) -> Result<(), NotifyError> {
    match self {
      Self::Log(n) => n.escalate(username, escalation).await,
      Self::Webhook(n) => n.escalate(username, escalation).await,
    }
  }
}
