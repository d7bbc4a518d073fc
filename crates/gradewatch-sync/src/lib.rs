//! The grade polling pipeline.
//!
//! Wires the session manager, the dual-path fetcher, the diff engine and the
//! scheduled poller together over the collaborator traits in
//! [`gradewatch_core`]. The `gradewatch` binary in this crate builds the
//! concrete stack (HTTP upstream, SQLite store, configured notifier).

pub mod config;
pub mod credentials;
pub mod diff;
pub mod fetcher;
pub mod fingerprint;
pub mod notify;
pub mod poller;
pub mod session;

pub use diff::{DiffPolicy, Sensitivity};
pub use fetcher::{Fetched, GradeFetcher};
pub use poller::{Poller, PollerSettings};
pub use session::SessionManager;

#[cfg(test)]
mod fakes;
