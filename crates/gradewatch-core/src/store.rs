//! The `SnapshotStore` trait.
//!
//! Implemented by storage backends (e.g. `gradewatch-store-sqlite`). The
//! poller depends on this abstraction only.

use std::future::Future;

use crate::snapshot::GradeSnapshot;

/// Last-known-snapshot storage, one snapshot per user.
pub trait SnapshotStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// The most recently stored snapshot for `username`, if any.
  fn get_last_snapshot<'a>(
    &'a self,
    username: &'a str,
  ) -> impl Future<Output = Result<Option<GradeSnapshot>, Self::Error>> + Send + 'a;

  /// Replace the stored snapshot for `snapshot.username`.
  ///
  /// Must be atomic: afterwards either the whole new snapshot is visible or
  /// the old one still is. Never a partial merge.
  fn put_snapshot<'a>(
    &'a self,
    snapshot: &'a GradeSnapshot,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}
