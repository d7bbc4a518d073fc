//! The `Upstream` trait: the institutional system as seen by the pipeline.
//!
//! Implemented over HTTP by `gradewatch-upstream`. The session manager and
//! the fetcher are written against this trait so they can be exercised with
//! in-memory fakes.

use std::future::Future;

use crate::{
  credentials::Credentials,
  error::{AuthError, UpstreamError},
  page::{Envelope, GuiData, PageData, PageQuery},
  session::LoginGrant,
};

pub trait Upstream: Send + Sync {
  /// Exchange credentials for a bearer token.
  fn login<'a>(
    &'a self,
    credentials: &'a Credentials,
  ) -> impl Future<Output = Result<LoginGrant, AuthError>> + Send + 'a;

  /// Lightweight identity query used to validate a token.
  fn probe<'a>(
    &'a self,
    token: &'a str,
  ) -> impl Future<Output = Result<Envelope<GuiData>, UpstreamError>> + Send + 'a;

  /// A `getPage` query. A decodable envelope is returned as-is, GraphQL
  /// errors included; interpreting it is the caller's job.
  fn page<'a>(
    &'a self,
    token: &'a str,
    query: &'a PageQuery,
  ) -> impl Future<Output = Result<Envelope<PageData>, UpstreamError>> + Send + 'a;
}
