//! Change detection between two grade snapshots.
//!
//! Records are matched by `(term_id, course_code)`. Each score field is
//! compared independently and emits its own event. Courses missing from the
//! current snapshot emit nothing. Events carry the current snapshot's
//! `fetched_at`, so the output depends only on the two inputs.

use gradewatch_core::{
  change::ChangeEvent,
  grade::{GradeField, GradeRecord},
  snapshot::GradeSnapshot,
};
use gradewatch_table::{is_placeholder, numeric_grade};

/// How small a score change may be and still be reported.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Sensitivity {
  /// Any differing raw string.
  #[default]
  Exact,
  /// Ignore moves between two placeholder values ("", "-", "not published").
  Meaningful,
  /// Numeric changes below `threshold` are ignored. Non-numeric changes are
  /// judged as [`Sensitivity::Meaningful`].
  Significant { threshold: f64 },
}

impl Sensitivity {
  pub const DEFAULT_THRESHOLD: f64 = 5.0;

  fn reports(&self, old: &str, new: &str) -> bool {
    if old == new {
      return false;
    }
    match self {
      Self::Exact => true,
      Self::Meaningful => !(is_placeholder(old) && is_placeholder(new)),
      Self::Significant { threshold } => {
        match (numeric_grade(old), numeric_grade(new)) {
          (Some(a), Some(b)) => (a - b).abs() >= *threshold,
          _ => Self::Meaningful.reports(old, new),
        }
      }
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiffPolicy {
  /// Emit a `presence` event for courses absent from a non-empty previous
  /// snapshot.
  pub notify_new_courses: bool,
  pub sensitivity:        Sensitivity,
}

impl Default for DiffPolicy {
  fn default() -> Self {
    Self {
      notify_new_courses: true,
      sensitivity:        Sensitivity::Exact,
    }
  }
}

impl DiffPolicy {
  /// Ordered change events from `previous` to `current`.
  ///
  /// A missing or empty `previous` is a first fetch: nothing is reported.
  pub fn diff(
    &self,
    previous: Option<&GradeSnapshot>,
    current: &GradeSnapshot,
  ) -> Vec<ChangeEvent> {
    let Some(previous) = previous.filter(|p| !p.is_empty()) else {
      return Vec::new();
    };
    let index = previous.index();
    let event = |r: &GradeRecord, field, old, new| ChangeEvent {
      username: current.username.clone(),
      term_id: r.term_id.clone(),
      course_code: r.course_code.clone(),
      field,
      old_value: old,
      new_value: new,
      detected_at: current.fetched_at,
    };

    let mut events = Vec::new();
    for record in &current.records {
      match index.get(&record.key()) {
        Some(old) => {
          for field in GradeField::SCORES {
            let (Some(before), Some(after)) = (old.score(field), record.score(field))
            else {
              continue;
            };
            if self.sensitivity.reports(before, after) {
              events.push(event(
                record,
                field,
                Some(before.to_string()),
                Some(after.to_string()),
              ));
            }
          }
        }
        None if self.notify_new_courses => {
          events.push(event(record, GradeField::Presence, None, Some(record.identity())));
        }
        None => {}
      }
    }
    events.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
    events
  }
}

/// [`DiffPolicy::diff`] with the default policy.
pub fn diff(previous: Option<&GradeSnapshot>, current: &GradeSnapshot) -> Vec<ChangeEvent> {
  DiffPolicy::default().diff(previous, current)
}
