//! Expiry extraction for JWT-shaped tokens.
//!
//! The signature is not verified; the claim is only used to skip a probe
//! for a token that has certainly expired.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Utc};
use serde::Deserialize;

#[derive(Deserialize)]
struct Claims {
  exp: Option<i64>,
}

/// The `exp` claim of a JWT, or `None` for opaque tokens.
pub fn token_expiry(token: &str) -> Option<DateTime<Utc>> {
  let mut parts = token.split('.');
  let (_header, payload, _sig) = (parts.next()?, parts.next()?, parts.next()?);
  if parts.next().is_some() {
    return None;
  }
  let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
  let claims: Claims = serde_json::from_slice(&bytes).ok()?;
  DateTime::from_timestamp(claims.exp?, 0)
}
