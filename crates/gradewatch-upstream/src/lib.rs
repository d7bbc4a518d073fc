//! GraphQL-over-HTTP client for the institutional grade portal.
//!
//! Implements [`gradewatch_core::upstream::Upstream`] with `reqwest`. Status
//! codes and envelopes are mapped onto the core error taxonomy here so the
//! pipeline never sees HTTP details.

mod client;
mod jwt;
mod queries;

pub use client::{ClientError, GraphqlClient, UpstreamConfig};
pub use jwt::token_expiry;
