//! Content fingerprint for grade snapshots.
//!
//! SHA-256 over the records sorted by `(term_id, course_code)` plus the
//! failed term ids. `fetched_at` and the unstored empty term ids are
//! excluded, so two fetches of unchanged grades hash the same regardless
//! of row order.

use gradewatch_core::{grade::GradeRecord, snapshot::GradeSnapshot};
use sha2::{Digest, Sha256};

pub fn fingerprint(snapshot: &GradeSnapshot) -> String {
  let mut records: Vec<&GradeRecord> = snapshot.records.iter().collect();
  records.sort_by(|a, b| a.key().cmp(&b.key()));
  let mut failed: Vec<&str> =
    snapshot.failed_terms.iter().map(String::as_str).collect();
  failed.sort_unstable();

  let mut hasher = Sha256::new();
  for r in records {
    let fields: [&str; 8] = [
      &r.term_id,
      &r.term_name,
      &r.course_code,
      &r.course_name,
      &r.coursework_score,
      &r.final_exam_score,
      &r.total_score,
      r.status.as_ref(),
    ];
    for field in fields {
      hasher.update((field.len() as u64).to_le_bytes());
      hasher.update(field.as_bytes());
    }
    hasher.update(r.ects_credits.unwrap_or(f64::NAN).to_bits().to_le_bytes());
  }
  hasher.update([0xff]);
  for id in failed {
    hasher.update((id.len() as u64).to_le_bytes());
    hasher.update(id.as_bytes());
  }
  hex::encode(hasher.finalize())
}
