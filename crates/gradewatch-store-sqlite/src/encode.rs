//! Encoding and decoding helpers between domain types and SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings, the failed-term list as compact
//! JSON, and statuses by their snake_case name.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use gradewatch_core::grade::{GradeRecord, GradeStatus};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── GradeStatus ─────────────────────────────────────────────────────────────

pub fn encode_status(s: GradeStatus) -> &'static str {
  match s {
    GradeStatus::Published => "published",
    GradeStatus::NotPublished => "not_published",
    GradeStatus::Unknown => "unknown",
  }
}

pub fn decode_status(s: &str) -> Result<GradeStatus> {
  GradeStatus::from_str(s).map_err(|_| Error::UnknownStatus(s.to_owned()))
}

// ─── Failed terms ────────────────────────────────────────────────────────────

pub fn encode_terms(terms: &[String]) -> Result<String> {
  Ok(serde_json::to_string(terms)?)
}

pub fn decode_terms(s: &str) -> Result<Vec<String>> {
  Ok(serde_json::from_str(s)?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read directly from a `grade_records` row.
pub struct RawRecord {
  pub term_id:          String,
  pub term_name:        String,
  pub course_code:      String,
  pub course_name:      String,
  pub ects_credits:     Option<f64>,
  pub coursework_score: String,
  pub final_exam_score: String,
  pub total_score:      String,
  pub numeric_grade:    Option<f64>,
  pub status:           String,
}

impl RawRecord {
  pub fn into_record(self, username: &str) -> Result<GradeRecord> {
    Ok(GradeRecord {
      username:         username.to_owned(),
      term_id:          self.term_id,
      term_name:        self.term_name,
      course_code:      self.course_code,
      course_name:      self.course_name,
      ects_credits:     self.ects_credits,
      coursework_score: self.coursework_score,
      final_exam_score: self.final_exam_score,
      total_score:      self.total_score,
      numeric_grade:    self.numeric_grade,
      status:           decode_status(&self.status)?,
    })
  }
}
