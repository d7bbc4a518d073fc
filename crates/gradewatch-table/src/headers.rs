//! Keyword-based column header matching.
//!
//! Column order and count vary from term to term, so columns are never
//! identified by position. Each canonical field owns a set of matchers; a
//! header is compared against the fields in [`RULES`] order and claimed by
//! the first one with a matching rule.

use std::fmt;

/// A normalized grade attribute that source columns are mapped onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CanonicalField {
  CourseName,
  CourseCode,
  Ects,
  Coursework,
  FinalExam,
  Total,
}

impl fmt::Display for CanonicalField {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Self::CourseName => "course_name",
      Self::CourseCode => "course_code",
      Self::Ects => "ects",
      Self::Coursework => "coursework",
      Self::FinalExam => "final_exam",
      Self::Total => "total",
    })
  }
}

enum Matcher {
  /// Header contains the keyword.
  Contains(&'static str),
  /// Header is exactly the keyword.
  Equals(&'static str),
}

impl Matcher {
  fn matches(&self, header: &str) -> bool {
    match self {
      Self::Contains(k) => header.contains(k),
      Self::Equals(k) => header == *k,
    }
  }
}

use CanonicalField::*;
use Matcher::*;

/// Evaluation order matters: "course code" must be claimed by the code rule
/// before the bare "course" keyword can claim it for the name, and
/// "coursework grade" by coursework before "grade" reaches the total.
static RULES: &[(CanonicalField, &[Matcher])] = &[
  (CourseCode, &[
    Contains("code"),
    Contains("كود"),
    Contains("رمز"),
    Equals("no."),
  ]),
  (Ects, &[
    Contains("ects"),
    Contains("credit"),
    Contains("رصيد"),
    Contains("ساعات"),
    Contains("الوحدات"),
  ]),
  (Coursework, &[
    Contains("coursework"),
    Contains("course work"),
    Contains("أعمال"),
    Contains("اعمال"),
    Contains("midterm"),
  ]),
  (Total, &[
    Contains("total"),
    Contains("مجموع"),
    Contains("الدرجة الكلية"),
    Contains("الدرجة النهائية"),
    Contains("التقدير"),
    Equals("final grade"),
    Equals("grade"),
    Equals("الدرجة"),
    Equals("درجة"),
  ]),
  (FinalExam, &[
    Contains("final"),
    Contains("exam"),
    Contains("نظري"),
    Contains("امتحان"),
    Contains("نهائي"),
  ]),
  (CourseName, &[
    Contains("course"),
    Contains("subject"),
    Contains("مقرر"),
    Contains("المادة"),
    Equals("name"),
  ]),
];

/// Trim, lowercase and collapse internal whitespace.
pub(crate) fn clean_header(raw: &str) -> String {
  raw.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

/// The canonical field a header names, if any.
pub fn match_header(raw: &str) -> Option<CanonicalField> {
  let header = clean_header(raw);
  if header.is_empty() {
    return None;
  }
  RULES
    .iter()
    .find(|(_, matchers)| matchers.iter().any(|m| m.matches(&header)))
    .map(|(field, _)| *field)
}

/// Map a header row to canonical fields by column index.
///
/// Each field is claimed by the first column that matches it; later
/// columns matching an already-claimed field are left unmapped.
pub(crate) fn map_columns(headers: &[String]) -> Vec<Option<CanonicalField>> {
  let mut claimed = Vec::new();
  headers
    .iter()
    .map(|h| {
      let field = match_header(h).filter(|f| !claimed.contains(f))?;
      claimed.push(field);
      Some(field)
    })
    .collect()
}
