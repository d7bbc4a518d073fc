//! Session lifecycle: login, validation probe and re-login on expiry.
//!
//! Holds no per-user state. The caller owns each [`Session`] and passes it
//! in; a refreshed session is returned as a new value. Network errors are
//! never retried here.

use std::sync::Arc;

use chrono::Utc;
use gradewatch_core::{
  AuthError, SessionError,
  credentials::{CredentialProvider, Credentials},
  session::Session,
  upstream::Upstream,
};

pub struct SessionManager<U> {
  upstream: Arc<U>,
}

impl<U> Clone for SessionManager<U> {
  fn clone(&self) -> Self {
    Self {
      upstream: Arc::clone(&self.upstream),
    }
  }
}

impl<U: Upstream> SessionManager<U> {
  pub fn new(upstream: Arc<U>) -> Self { Self { upstream } }

  pub async fn login(&self, credentials: &Credentials) -> Result<Session, AuthError> {
    let grant = self.upstream.login(credentials).await?;
    tracing::debug!(username = %credentials.username, "logged in");
    Ok(Session::from_grant(&credentials.username, grant, Utc::now()))
  }

  /// Probe the upstream with the session's token.
  ///
  /// Fail-closed: any transport error, non-success status, GraphQL error or
  /// missing identity counts as invalid. A token whose known expiry has
  /// passed is invalid without a probe.
  pub async fn validate(&self, session: &Session) -> bool {
    if session.is_expired_at(Utc::now()) {
      return false;
    }
    match self.upstream.probe(&session.token).await {
      Ok(env) => !env.has_errors() && env.user().is_some(),
      Err(e) => {
        tracing::debug!(username = %session.username, error = %e, "probe failed");
        false
      }
    }
  }

  /// Return a session known to be valid, re-logging in through `provider`
  /// when the current one is not.
  pub async fn ensure_valid<P: CredentialProvider>(
    &self,
    session: Session,
    provider: Option<&P>,
  ) -> Result<Session, SessionError> {
    if self.validate(&session).await {
      return Ok(Session {
        validated_at: Utc::now(),
        ..session
      });
    }
    tracing::info!(username = %session.username, "session invalid; re-authenticating");
    self.establish(&session.username, provider).await
  }

  /// Log in from scratch with credentials from `provider`.
  pub async fn establish<P: CredentialProvider>(
    &self,
    username: &str,
    provider: Option<&P>,
  ) -> Result<Session, SessionError> {
    let Some(provider) = provider else {
      return Err(SessionError::Expired);
    };
    let Some(credentials) = provider.credentials(username).await else {
      return Err(SessionError::Expired);
    };
    Ok(self.login(&credentials).await?)
  }
}
