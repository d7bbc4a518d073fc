//! One field-level difference between two snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::grade::GradeField;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
  pub username:    String,
  pub term_id:     String,
  pub course_code: String,
  pub field:       GradeField,
  /// `None` for a course that was not present before.
  pub old_value:   Option<String>,
  pub new_value:   Option<String>,
  pub detected_at: DateTime<Utc>,
}

impl ChangeEvent {
  /// Ordering key: term, then course, then field name.
  pub fn sort_key(&self) -> (&str, &str, &str) {
    (&self.term_id, &self.course_code, self.field.as_ref())
  }
}
