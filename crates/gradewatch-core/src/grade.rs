//! The canonical grade record and the small enums it is built from.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// An academic period under which courses and grades are grouped.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Term {
  pub id:   String,
  pub name: String,
}

/// Where a normalized row belongs. Supplied by the fetcher, never parsed
/// out of the markup itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermContext {
  pub username:  String,
  pub term_id:   String,
  pub term_name: String,
}

impl TermContext {
  pub fn new(username: impl Into<String>, term: &Term) -> Self {
    Self {
      username:  username.into(),
      term_id:   term.id.clone(),
      term_name: term.name.clone(),
    }
  }
}

/// Publication state derived from the total score.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum GradeStatus {
  Published,
  NotPublished,
  Unknown,
}

/// The field a [`ChangeEvent`](crate::change::ChangeEvent) refers to.
///
/// `Presence` marks a course that was not present in the previous snapshot.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum GradeField {
  Coursework,
  FinalExam,
  Total,
  Presence,
}

impl GradeField {
  /// The score fields compared between two records of the same course.
  pub const SCORES: [GradeField; 3] =
    [GradeField::Coursework, GradeField::FinalExam, GradeField::Total];
}

/// One course in one term for one user, in canonical form.
///
/// Scores keep the raw upstream text; `numeric_grade` and `status` are
/// derived from `total_score` during normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeRecord {
  pub username:         String,
  pub term_id:          String,
  pub term_name:        String,
  pub course_code:      String,
  pub course_name:      String,
  pub ects_credits:     Option<f64>,
  pub coursework_score: String,
  pub final_exam_score: String,
  pub total_score:      String,
  pub numeric_grade:    Option<f64>,
  pub status:           GradeStatus,
}

impl GradeRecord {
  /// Uniqueness key within one user's snapshot.
  pub fn key(&self) -> (&str, &str) { (&self.term_id, &self.course_code) }

  /// The raw value of a score field. `Presence` has no stored value.
  pub fn score(&self, field: GradeField) -> Option<&str> {
    match field {
      GradeField::Coursework => Some(&self.coursework_score),
      GradeField::FinalExam => Some(&self.final_exam_score),
      GradeField::Total => Some(&self.total_score),
      GradeField::Presence => None,
    }
  }

  /// Human-readable identity used as the value of a presence event.
  pub fn identity(&self) -> String {
    if self.course_name == self.course_code {
      self.course_code.clone()
    } else {
      format!("{} ({})", self.course_name, self.course_code)
    }
  }
}
