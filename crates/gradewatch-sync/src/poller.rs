//! Scheduled per-user polling.
//!
//! Each user owns a slot behind a `tokio::sync::Mutex`. A cycle holds its
//! user's lock from validation to persistence, which serializes the timer
//! against manual triggers for the same user. The slot map itself is fixed
//! at construction and never locked.

use std::{
  collections::BTreeMap,
  future::Future,
  sync::{Arc, Mutex as StdMutex, PoisonError},
  time::Duration,
};

use chrono::{DateTime, Utc};
use gradewatch_core::{
  DriverError, SessionError,
  credentials::{CredentialProvider, Credentials},
  driver::{CycleDriver, CycleOutcome, CycleReport, HealthReport},
  notify::{Escalation, Notifier},
  session::Session,
  snapshot::GradeSnapshot,
  store::SnapshotStore,
  upstream::Upstream,
};
use tokio::{
  sync::{Mutex, Semaphore},
  task::JoinSet,
  time::MissedTickBehavior,
};
use uuid::Uuid;

use crate::{
  diff::DiffPolicy,
  fetcher::{Fetched, GradeFetcher},
  fingerprint::fingerprint,
  session::SessionManager,
};

#[derive(Debug, Clone)]
pub struct PollerSettings {
  pub interval:          Duration,
  /// Users polled at the same time.
  pub max_concurrency:   usize,
  /// Consecutive failed fetches before the notifier hears about it.
  pub failure_threshold: u32,
}

impl Default for PollerSettings {
  fn default() -> Self {
    Self {
      interval:          Duration::from_secs(900),
      max_concurrency:   5,
      failure_threshold: 3,
    }
  }
}

#[derive(Debug, Default)]
struct UserSlot {
  session:               Option<Session>,
  /// Set once `AuthFailed` has been surfaced; cleared by a manual login.
  auth_failure_reported: bool,
  consecutive_failures:  u32,
  failure_escalated:     bool,
}

#[derive(Debug, Default)]
struct Stats {
  cycles_completed: u64,
  last_cycle_at:    Option<DateTime<Utc>>,
}

pub struct Poller<U, S, N, C> {
  sessions:    SessionManager<U>,
  fetcher:     GradeFetcher<U>,
  store:       Arc<S>,
  notifier:    Arc<N>,
  credentials: Option<C>,
  policy:      DiffPolicy,
  settings:    PollerSettings,
  slots:       BTreeMap<String, Arc<Mutex<UserSlot>>>,
  stats:       StdMutex<Stats>,
}

impl<U, S, N, C> Poller<U, S, N, C>
where
  U: Upstream,
  S: SnapshotStore,
  N: Notifier,
  C: CredentialProvider,
{
  pub fn new(
    sessions: SessionManager<U>,
    fetcher: GradeFetcher<U>,
    store: Arc<S>,
    notifier: Arc<N>,
    credentials: Option<C>,
    usernames: impl IntoIterator<Item = String>,
  ) -> Self {
    Self {
      sessions,
      fetcher,
      store,
      notifier,
      credentials,
      policy: DiffPolicy::default(),
      settings: PollerSettings::default(),
      slots: usernames
        .into_iter()
        .map(|u| (u, Arc::new(Mutex::new(UserSlot::default()))))
        .collect(),
      stats: StdMutex::new(Stats::default()),
    }
  }

  pub fn with_policy(mut self, policy: DiffPolicy) -> Self {
    self.policy = policy;
    self
  }

  pub fn with_settings(mut self, settings: PollerSettings) -> Self {
    self.settings = settings;
    self
  }

  /// Run one cycle for `username` under its lock.
  pub async fn run_cycle(&self, username: &str) -> Result<CycleReport, DriverError> {
    let slot = self
      .slots
      .get(username)
      .ok_or_else(|| DriverError::UnknownUser(username.to_string()))?;
    let mut slot = slot.lock().await;

    let cycle_id = Uuid::new_v4();
    let started_at = Utc::now();
    let outcome = self.cycle(username, &mut slot).await;
    let finished_at = Utc::now();
    drop(slot);

    {
      let mut stats = self.stats.lock().unwrap_or_else(PoisonError::into_inner);
      stats.cycles_completed += 1;
      stats.last_cycle_at = Some(finished_at);
    }
    tracing::info!(
      %username,
      %cycle_id,
      success = outcome.is_success(),
      ?outcome,
      "cycle finished"
    );
    Ok(CycleReport {
      cycle_id,
      username: username.to_string(),
      started_at,
      finished_at,
      outcome,
    })
  }

  async fn cycle(&self, username: &str, slot: &mut UserSlot) -> CycleOutcome {
    if slot.auth_failure_reported {
      return CycleOutcome::Skipped {
        reason: "authentication failed; waiting for manual login".into(),
      };
    }

    // Validating
    let credentials = self.credentials.as_ref();
    let validated = match slot.session.take() {
      Some(session) => self.sessions.ensure_valid(session, credentials).await,
      None => self.sessions.establish(username, credentials).await,
    };
    let session = match validated {
      Ok(session) => session,
      Err(SessionError::Relogin(e)) if e.is_transient() => {
        tracing::warn!(%username, error = %e, "re-login failed transiently");
        return self.fetch_failed(username, slot).await;
      }
      Err(e) => return self.auth_failed(username, slot, e).await,
    };
    slot.session = Some(session.clone());

    let previous = match self.store.get_last_snapshot(username).await {
      Ok(previous) => previous,
      Err(e) => {
        tracing::warn!(%username, error = %e, "failed to load previous snapshot");
        return CycleOutcome::Skipped {
          reason: format!("store unavailable: {e}"),
        };
      }
    };

    // Fetching
    let fetched = match self.fetcher.fetch_all(&session).await {
      Ok(fetched) => fetched,
      Err(e) => {
        tracing::warn!(%username, error = %e, "fetch failed");
        return self.fetch_failed(username, slot).await;
      }
    };
    slot.consecutive_failures = 0;
    slot.failure_escalated = false;

    let mut current = match fetched {
      Fetched::Snapshot(snapshot) => snapshot,
      Fetched::Empty => {
        if previous.is_none() {
          let baseline = GradeSnapshot::new(username, Utc::now(), Vec::new());
          if !self.persist(&baseline).await {
            return CycleOutcome::PersistFailed;
          }
        }
        return CycleOutcome::Empty;
      }
    };

    // Diffing
    if let Some(previous) = &previous {
      let carried = current.carry_forward(previous);
      if carried > 0 {
        tracing::debug!(%username, carried, "kept records of failed or empty terms");
      }
    }
    let events = self.policy.diff(previous.as_ref(), &current);

    if !events.is_empty() {
      // Notifying: hand-off first, so a crash before the write re-notifies.
      if let Err(e) = self.notifier.notify(username, &events).await {
        tracing::warn!(%username, error = %e, "notifier rejected events");
        return CycleOutcome::NotifyFailed {
          events: events.len(),
        };
      }
      if !self.persist(&current).await {
        return CycleOutcome::PersistFailed;
      }
      return CycleOutcome::Notified { events };
    }

    match previous.filter(|p| !p.is_empty()) {
      None => {
        if !self.persist(&current).await {
          return CycleOutcome::PersistFailed;
        }
        CycleOutcome::Baseline {
          records: current.len(),
        }
      }
      Some(previous) => {
        if fingerprint(&previous) == fingerprint(&current) {
          return CycleOutcome::Unchanged;
        }
        if !self.persist(&current).await {
          return CycleOutcome::PersistFailed;
        }
        CycleOutcome::Unchanged
      }
    }
  }

  async fn persist(&self, snapshot: &GradeSnapshot) -> bool {
    match self.store.put_snapshot(snapshot).await {
      Ok(()) => true,
      Err(e) => {
        tracing::warn!(username = %snapshot.username, error = %e, "failed to persist snapshot");
        false
      }
    }
  }

  async fn auth_failed(
    &self,
    username: &str,
    slot: &mut UserSlot,
    err: SessionError,
  ) -> CycleOutcome {
    tracing::warn!(%username, error = %err, "authentication failed");
    slot.auth_failure_reported = true;
    let escalated = match self.notifier.escalate(username, Escalation::AuthFailed).await {
      Ok(()) => true,
      Err(e) => {
        tracing::warn!(%username, error = %e, "failed to escalate auth failure");
        false
      }
    };
    CycleOutcome::AuthFailed { escalated }
  }

  async fn fetch_failed(&self, username: &str, slot: &mut UserSlot) -> CycleOutcome {
    slot.consecutive_failures += 1;
    let consecutive = slot.consecutive_failures;
    if consecutive >= self.settings.failure_threshold && !slot.failure_escalated {
      match self
        .notifier
        .escalate(username, Escalation::RepeatedFetchFailure { consecutive })
        .await
      {
        Ok(()) => slot.failure_escalated = true,
        Err(e) => {
          tracing::warn!(%username, error = %e, "failed to escalate fetch failures")
        }
      }
    }
    CycleOutcome::FetchFailed { consecutive }
  }
}

impl<U, S, N, C> Poller<U, S, N, C>
where
  U: Upstream + 'static,
  S: SnapshotStore + 'static,
  N: Notifier + 'static,
  C: CredentialProvider + 'static,
{
  /// One cycle for every user, at most `max_concurrency` at a time.
  ///
  /// Dropping the returned future aborts the cycles still in flight.
  pub async fn run_all(self: &Arc<Self>) -> Vec<CycleReport> {
    let permits = Arc::new(Semaphore::new(self.settings.max_concurrency.max(1)));
    let mut set = JoinSet::new();
    for username in self.slots.keys().cloned() {
      let poller = Arc::clone(self);
      let permits = Arc::clone(&permits);
      set.spawn(async move {
        let _permit = permits.acquire_owned().await.ok()?;
        poller.run_cycle(&username).await.ok()
      });
    }

    let mut reports = Vec::with_capacity(self.slots.len());
    while let Some(joined) = set.join_next().await {
      match joined {
        Ok(Some(report)) => reports.push(report),
        Ok(None) => {}
        Err(e) => tracing::error!(error = %e, "cycle task failed"),
      }
    }
    reports
  }

  /// Poll every `interval` until `shutdown` resolves.
  pub async fn run(self: Arc<Self>, shutdown: impl Future<Output = ()>) {
    let mut ticker = tokio::time::interval(self.settings.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(shutdown);

    tracing::info!(
      users = self.slots.len(),
      interval_secs = self.settings.interval.as_secs(),
      "poller started"
    );
    loop {
      tokio::select! {
        _ = &mut shutdown => break,
        _ = ticker.tick() => {
          tokio::select! {
            _ = &mut shutdown => {
              tracing::info!("shutdown during cycle; abandoning in-flight work");
              break;
            }
            reports = self.run_all() => {
              let ok = reports.iter().filter(|r| r.outcome.is_success()).count();
              tracing::info!(users = reports.len(), ok, "polling round finished");
            }
          }
        }
      }
    }
    tracing::info!("poller stopped");
  }
}

impl<U, S, N, C> CycleDriver for Poller<U, S, N, C>
where
  U: Upstream,
  S: SnapshotStore,
  N: Notifier,
  C: CredentialProvider,
{
  async fn trigger(&self, username: &str) -> Result<CycleReport, DriverError> {
    self.run_cycle(username).await
  }

  async fn login(&self, credentials: Credentials) -> Result<(), DriverError> {
    let slot = self
      .slots
      .get(&credentials.username)
      .ok_or_else(|| DriverError::UnknownUser(credentials.username.clone()))?;
    let session = self.sessions.login(&credentials).await?;
    let mut slot = slot.lock().await;
    slot.session = Some(session);
    slot.auth_failure_reported = false;
    tracing::info!(username = %credentials.username, "manual login succeeded");
    Ok(())
  }

  async fn health(&self) -> HealthReport {
    let stats = self.stats.lock().unwrap_or_else(PoisonError::into_inner);
    HealthReport {
      users:            self.slots.len(),
      cycles_completed: stats.cycles_completed,
      last_cycle_at:    stats.last_cycle_at,
    }
  }
}
