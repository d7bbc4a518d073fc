//! Core types and trait definitions for gradewatch.
//!
//! This crate has no HTTP or database dependencies. It
//! defines the canonical grade model, the error taxonomy, and the
//! collaborator traits that the fetch/diff/poll pipeline is written against.

// Native `async fn` in traits; the `Send` bounds are spelled out on the
// trait methods themselves.
#![allow(async_fn_in_trait)]

pub mod change;
pub mod credentials;
pub mod driver;
pub mod error;
pub mod grade;
pub mod notify;
pub mod page;
pub mod session;
pub mod snapshot;
pub mod store;
pub mod upstream;

pub use error::{
  AuthError, DriverError, FetchError, NotifyError, SessionError, UpstreamError,
};
