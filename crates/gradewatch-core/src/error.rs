//! Error taxonomy shared by every `gradewatch` crate.
//!
//! Transient and per-term failures are absorbed by the fetcher and the
//! poller; only authentication failure and repeated fetch failure ever reach
//! the notifier (see [`crate::notify::Escalation`]).

use thiserror::Error;

/// Failure to obtain a session token from the upstream login endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
  /// The upstream rejected the username/password pair. Terminal and
  /// user-facing.
  #[error("invalid credentials")]
  InvalidCredentials,

  /// The request never produced an HTTP response.
  #[error("network error: {0}")]
  Network(String),

  /// The upstream answered, but not with something usable (5xx, 429,
  /// non-JSON body, unknown status).
  #[error("upstream unavailable: {0}")]
  UpstreamUnavailable(String),
}

impl AuthError {
  /// Whether retrying on the next scheduled cycle could succeed.
  pub fn is_transient(&self) -> bool { !matches!(self, Self::InvalidCredentials) }
}

/// Failure of an authenticated upstream query.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UpstreamError {
  #[error("network error: {0}")]
  Network(String),

  /// HTTP 401/403: the bearer token is no longer accepted.
  #[error("token rejected by upstream")]
  Unauthorized,

  #[error("unexpected HTTP status {0}")]
  Status(u16),

  /// The body was not a decodable JSON envelope.
  #[error("malformed upstream response: {0}")]
  Schema(String),
}

/// Raised when a [`Session`](crate::session::Session) cannot be kept alive.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
  /// Validation failed and no credentials were available to re-login.
  #[error("session expired")]
  Expired,

  /// Validation failed and the re-login attempt failed too.
  #[error("re-login failed: {0}")]
  Relogin(#[from] AuthError),
}

/// Failure of a whole fetch cycle. Per-term failures never surface here;
/// they are recorded in [`GradeSnapshot::failed_terms`](crate::snapshot::GradeSnapshot).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
  /// Transient; retried on the next scheduled cycle, never immediately.
  #[error("network error: {0}")]
  Network(String),

  /// The token was rejected mid-fetch; revalidation happens next cycle.
  #[error("token expired during fetch")]
  TokenExpired,

  /// The term list could not be read at all.
  #[error("upstream schema error: {0}")]
  UpstreamSchema(String),
}

impl From<UpstreamError> for FetchError {
  fn from(err: UpstreamError) -> Self {
    match err {
      UpstreamError::Unauthorized => Self::TokenExpired,
      UpstreamError::Network(msg) => Self::Network(msg),
      UpstreamError::Status(code) => Self::Network(format!("HTTP {code}")),
      UpstreamError::Schema(msg) => Self::UpstreamSchema(msg),
    }
  }
}

/// Notifier collaborator failure. Delivery is the notifier's concern; the
/// poller only needs to know whether the hand-off happened.
#[derive(Debug, Error)]
#[error("notifier error: {0}")]
pub struct NotifyError(pub String);

/// Errors surfaced by a [`CycleDriver`](crate::driver::CycleDriver) to the
/// admin API.
#[derive(Debug, Error)]
pub enum DriverError {
  #[error("unknown user: {0}")]
  UnknownUser(String),

  #[error(transparent)]
  Auth(#[from] AuthError),
}
