//! Every record observed for one user in one fetch cycle.
//!
//! A snapshot replaces its predecessor as a whole. The only place records
//! from two cycles are ever combined is [`GradeSnapshot::carry_forward`],
//! and that works on whole terms, never on individual fields.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::grade::GradeRecord;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeSnapshot {
  pub username:     String,
  pub fetched_at:   DateTime<Utc>,
  pub records:      Vec<GradeRecord>,
  /// Terms whose data could not be obtained this cycle.
  #[serde(default)]
  pub failed_terms: Vec<String>,
  /// Terms that were read but held no course rows this cycle. Not
  /// persisted.
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub empty_terms:  Vec<String>,
}

impl GradeSnapshot {
  pub fn new(
    username: impl Into<String>,
    fetched_at: DateTime<Utc>,
    records: Vec<GradeRecord>,
  ) -> Self {
    Self {
      username: username.into(),
      fetched_at,
      records,
      failed_terms: Vec::new(),
      empty_terms: Vec::new(),
    }
  }

  pub fn is_empty(&self) -> bool { self.records.is_empty() }

  pub fn len(&self) -> usize { self.records.len() }

  /// Records keyed by `(term_id, course_code)`.
  pub fn index(&self) -> BTreeMap<(&str, &str), &GradeRecord> {
    self.records.iter().map(|r| (r.key(), r)).collect()
  }

  /// Distinct term ids present in the records.
  pub fn term_ids(&self) -> BTreeSet<&str> {
    self.records.iter().map(|r| r.term_id.as_str()).collect()
  }

  /// Sort records by `(term_id, course_code)`.
  pub fn sort(&mut self) {
    self.records.sort_by(|a, b| a.key().cmp(&b.key()));
  }

  /// Copy the previous snapshot's records for every failed or empty term
  /// into this one, so a term that could not be fetched, or came back with
  /// no rows, keeps its last good data.
  ///
  /// Terms that already have records in `self` are left alone. Returns the
  /// number of records carried over.
  pub fn carry_forward(&mut self, previous: &GradeSnapshot) -> usize {
    if self.failed_terms.is_empty() && self.empty_terms.is_empty() {
      return 0;
    }
    let present: BTreeSet<String> =
      self.term_ids().into_iter().map(str::to_owned).collect();
    let carried: Vec<GradeRecord> = previous
      .records
      .iter()
      .filter(|r| {
        self
          .failed_terms
          .iter()
          .chain(&self.empty_terms)
          .any(|t| *t == r.term_id)
          && !present.contains(&r.term_id)
      })
      .cloned()
      .collect();
    let n = carried.len();
    self.records.extend(carried);
    self.sort();
    n
  }
}
