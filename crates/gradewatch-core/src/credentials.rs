//! Credentials and the collaborator that can supply them again later.
//!
//! Credentials are ephemeral: the core holds them only for the duration of a
//! login call and never persists them.

use std::{fmt, future::Future};

/// A username/password pair. `Debug` never prints the password.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
  pub username: String,
  pub password: String,
}

impl Credentials {
  pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
    Self {
      username: username.into(),
      password: password.into(),
    }
  }
}

impl fmt::Debug for Credentials {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Credentials")
      .field("username", &self.username)
      .field("password", &"<redacted>")
      .finish()
  }
}

/// Supplies cached credentials for automatic re-authentication.
///
/// Returning `None` is always acceptable; the poller degrades to
/// `AuthFailed` for that user instead of failing the cycle.
pub trait CredentialProvider: Send + Sync {
  fn credentials<'a>(
    &'a self,
    username: &'a str,
  ) -> impl Future<Output = Option<Credentials>> + Send + 'a;
}

/// A provider that never has credentials.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCredentials;

impl CredentialProvider for NoCredentials {
  async fn credentials(&self, _username: &str) -> Option<Credentials> { None }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn debug_redacts_password() {
    let creds = Credentials::new("student", "hunter2");
    let printed = format!("{creds:?}");
    assert!(printed.contains("student"));
    assert!(!printed.contains("hunter2"));
  }
}
