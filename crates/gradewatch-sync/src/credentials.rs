//! Credentials supplied from configuration.

use std::collections::BTreeMap;

use gradewatch_core::credentials::{CredentialProvider, Credentials};

/// Passwords listed in the `[[users]]` configuration table.
///
/// Users configured without a password get `None`, which makes an expired
/// session surface as an auth failure until someone logs in manually.
#[derive(Clone, Default)]
pub struct StaticCredentials {
  passwords: BTreeMap<String, String>,
}

impl StaticCredentials {
  pub fn from_pairs<U, P>(pairs: impl IntoIterator<Item = (U, P)>) -> Self
  where
    U: Into<String>,
    P: Into<String>,
  {
    Self {
      passwords: pairs
        .into_iter()
        .map(|(u, p)| (u.into(), p.into()))
        .collect(),
    }
  }
}

impl CredentialProvider for StaticCredentials {
  async fn credentials(&self, username: &str) -> Option<Credentials> {
    self
      .passwords
      .get(username)
      .map(|password| Credentials::new(username, password.clone()))
  }
}
