//! An opaque upstream token bound to one username.
//!
//! A session is a plain value threaded through every call. Refreshing
//! produces a new `Session` that replaces the old one wholesale.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The result of a successful upstream login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginGrant {
  pub token:      String,
  /// Taken from the token itself when the upstream issues JWTs.
  pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
  pub username:     String,
  pub token:        String,
  pub expires_at:   Option<DateTime<Utc>>,
  pub validated_at: DateTime<Utc>,
}

impl Session {
  /// Build a session from a fresh login; a new login counts as validated.
  pub fn from_grant(
    username: impl Into<String>,
    grant: LoginGrant,
    now: DateTime<Utc>,
  ) -> Self {
    Self {
      username:     username.into(),
      token:        grant.token,
      expires_at:   grant.expires_at,
      validated_at: now,
    }
  }

  /// True once the known expiry has passed. Sessions without an expiry never
  /// report expired here; only a probe can tell.
  pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
    self.expires_at.is_some_and(|exp| exp <= now)
  }
}

impl std::fmt::Debug for Session {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Session")
      .field("username", &self.username)
      .field("token", &"<redacted>")
      .field("expires_at", &self.expires_at)
      .field("validated_at", &self.validated_at)
      .finish()
  }
}
