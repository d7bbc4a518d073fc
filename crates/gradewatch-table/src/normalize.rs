//! Raw row → canonical [`GradeRecord`].

use std::sync::LazyLock;

use gradewatch_core::grade::{GradeRecord, GradeStatus, TermContext};
use regex::Regex;

use crate::{headers::CanonicalField, parser::RawRow};

/// A numeric percentage such as `87 %`, `87%` or `87.5 %`.
static PUBLISHED: LazyLock<Option<Regex>> =
  LazyLock::new(|| Regex::new(r"^\s*\d+(?:[.,]\d+)?\s*%\s*$").ok());

/// Localized placeholders meaning "not yet published", compared after
/// trimming and lowercasing.
const NOT_PUBLISHED: &[&str] = &[
  "لم يتم النشر",
  "لم تنشر بعد",
  "غير منشور",
  "not published",
  "not yet published",
  "unpublished",
  "-",
  "—",
];

/// Replace Arabic-Indic and Eastern Arabic-Indic digits, the Arabic
/// decimal separator and the Arabic percent sign with their ASCII forms.
pub fn normalize_digits(s: &str) -> String {
  s.chars()
    .map(|c| match c {
      '\u{0660}'..='\u{0669}' => {
        char::from(b'0' + (c as u32 - 0x0660) as u8)
      }
      '\u{06F0}'..='\u{06F9}' => {
        char::from(b'0' + (c as u32 - 0x06F0) as u8)
      }
      '\u{066B}' => '.',
      '\u{066A}' => '%',
      _ => c,
    })
    .collect()
}

fn is_not_published(value: &str) -> bool {
  let v = value.trim().to_lowercase();
  NOT_PUBLISHED
    .iter()
    .any(|s| v == *s || (s.chars().count() > 1 && v.contains(s)))
}

/// Whether `value` stands for "no grade yet": empty or a not-published
/// sentinel.
pub fn is_placeholder(value: &str) -> bool {
  value.trim().is_empty() || is_not_published(value)
}

/// Publication status of a total score.
pub fn grade_status(total: &str) -> GradeStatus {
  let total = normalize_digits(total);
  if PUBLISHED.as_ref().is_some_and(|re| re.is_match(&total)) {
    GradeStatus::Published
  } else if is_not_published(&total) {
    GradeStatus::NotPublished
  } else {
    GradeStatus::Unknown
  }
}

/// Strip every character that is not a digit or a decimal separator and
/// parse the remainder.
pub fn numeric_grade(total: &str) -> Option<f64> {
  let digits: String = normalize_digits(total)
    .chars()
    .filter_map(|c| match c {
      '0'..='9' | '.' => Some(c),
      ',' => Some('.'),
      _ => None,
    })
    .collect();
  digits.parse().ok()
}

fn parse_credits(raw: &str) -> Option<f64> {
  normalize_digits(raw).trim().replace(',', ".").parse().ok()
}

/// A row whose code is purely numeric and whose name mentions the term is
/// a summary line (term average, credit totals), not a course.
fn is_summary_row(code: &str, name: &str) -> bool {
  let name = name.to_lowercase();
  !code.is_empty()
    && code.chars().all(|c| c.is_ascii_digit())
    && (name.contains("term") || name.contains("الفصل"))
}

/// Build a canonical record from a raw row. Returns `None` for rows that
/// carry neither a course name nor a code, and for summary rows. A missing
/// code falls back to the course name so every record has a key.
pub fn normalize(row: &RawRow, ctx: &TermContext) -> Option<GradeRecord> {
  let text = |f: CanonicalField| row.get(f).unwrap_or_default().trim().to_string();
  let name = text(CanonicalField::CourseName);
  let code = normalize_digits(&text(CanonicalField::CourseCode));
  if name.is_empty() && code.is_empty() {
    return None;
  }
  if is_summary_row(&code, &name) {
    return None;
  }
  let (code, name) = match (code.is_empty(), name.is_empty()) {
    (true, _) => (name.clone(), name),
    (_, true) => (code.clone(), code),
    _ => (code, name),
  };

  let total = text(CanonicalField::Total);
  Some(GradeRecord {
    username:         ctx.username.clone(),
    term_id:          ctx.term_id.clone(),
    term_name:        ctx.term_name.clone(),
    course_code:      code,
    course_name:      name,
    ects_credits:     parse_credits(&text(CanonicalField::Ects)),
    coursework_score: text(CanonicalField::Coursework),
    final_exam_score: text(CanonicalField::FinalExam),
    numeric_grade:    numeric_grade(&total),
    status:           grade_status(&total),
    total_score:      total,
  })
}

#[cfg(test)]
mod tests {
  use gradewatch_core::grade::Term;

  use super::*;
  use crate::parser::row_from_pairs;

  fn ctx() -> TermContext {
    TermContext::new("student", &Term {
      id:   "10459".into(),
      name: "Fall 2024".into(),
    })
  }

  #[test]
  fn percentage_is_published() {
    assert_eq!(grade_status("87 %"), GradeStatus::Published);
    assert_eq!(grade_status("87%"), GradeStatus::Published);
    assert_eq!(grade_status(" 92.5 % "), GradeStatus::Published);
    assert_eq!(grade_status("٨٧ %"), GradeStatus::Published);
    assert_eq!(grade_status("٨٧ ٪"), GradeStatus::Published);
    assert_eq!(numeric_grade("٩٢٫٥٪"), Some(92.5));
    assert_eq!(numeric_grade("87 %"), Some(87.0));
    assert_eq!(numeric_grade("٨٧ %"), Some(87.0));
  }

  #[test]
  fn sentinels_are_not_published() {
    for s in ["لم يتم النشر", "Not Published", " not yet published ", "-"] {
      assert_eq!(grade_status(s), GradeStatus::NotPublished, "{s}");
      assert_eq!(numeric_grade(s), None, "{s}");
    }
  }

  #[test]
  fn anything_else_is_unknown() {
    assert_eq!(grade_status(""), GradeStatus::Unknown);
    assert_eq!(grade_status("A+"), GradeStatus::Unknown);
    assert_eq!(grade_status("87"), GradeStatus::Unknown);
    assert_eq!(numeric_grade("87"), Some(87.0));
  }

  #[test]
  fn placeholders() {
    assert!(is_placeholder(""));
    assert!(is_placeholder("  "));
    assert!(is_placeholder("لم يتم النشر"));
    assert!(!is_placeholder("0"));
  }

  #[test]
  fn rejects_rows_without_name_or_code() {
    let row = row_from_pairs([("total", "87 %")]);
    assert!(normalize(&row, &ctx()).is_none());
  }

  #[test]
  fn code_falls_back_to_name() {
    let row = row_from_pairs([("course", "Physics"), ("total", "70 %")]);
    let r = normalize(&row, &ctx()).unwrap();
    assert_eq!(r.course_code, "Physics");
    assert_eq!(r.course_name, "Physics");
  }

  #[test]
  fn summary_rows_are_dropped() {
    let row = row_from_pairs([("course", "Term GPA"), ("code", "3")]);
    assert!(normalize(&row, &ctx()).is_none());
  }

  #[test]
  fn full_row() {
    let row = row_from_pairs([
      ("المقرر", "اللغة العربية (1)"),
      ("كود المقرر", "ARAB100"),
      ("رصيد ECTS", "2"),
      ("أعمال السنة", "38"),
      ("نظري", "49"),
      ("الدرجة", "87 %"),
    ]);
    let r = normalize(&row, &ctx()).unwrap();
    assert_eq!(r.username, "student");
    assert_eq!(r.term_id, "10459");
    assert_eq!(r.course_code, "ARAB100");
    assert_eq!(r.course_name, "اللغة العربية (1)");
    assert_eq!(r.ects_credits, Some(2.0));
    assert_eq!(r.coursework_score, "38");
    assert_eq!(r.final_exam_score, "49");
    assert_eq!(r.total_score, "87 %");
    assert_eq!(r.numeric_grade, Some(87.0));
    assert_eq!(r.status, GradeStatus::Published);
  }
}
