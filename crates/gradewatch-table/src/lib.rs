//! Grade table codec for gradewatch.
//!
//! Turns semi-structured grade markup (and the name/value rows of the
//! structured API) into canonical [`GradeRecord`]s. Pure synchronous; no
//! HTTP or database dependencies.
//!
//! ```no_run
//! use gradewatch_core::grade::{Term, TermContext};
//!
//! let html = "<table><tr><th>Code</th><th>Total</th></tr>\
//!             <tr><td>MATH113</td><td>87 %</td></tr></table>";
//! let ctx = TermContext::new("student", &Term { id: "1".into(), name: "Fall".into() });
//! let records = gradewatch_table::extract(html, &ctx).unwrap();
//! assert_eq!(records[0].course_code, "MATH113");
//! ```

pub mod error;
mod headers;
mod normalize;
mod parser;

pub use error::{ParseError, Result};
use gradewatch_core::grade::{GradeRecord, TermContext};
pub use headers::{CanonicalField, match_header};
pub use normalize::{
  grade_status, is_placeholder, normalize, normalize_digits, numeric_grade,
};
pub use parser::{RawRow, parse, row_from_pairs};

/// Parse `markup` and normalize every row, dropping rows that do not
/// describe a course. Duplicates are kept; deduplication is the caller's
/// concern.
pub fn extract(markup: &str, ctx: &TermContext) -> Result<Vec<GradeRecord>> {
  Ok(
    parse(markup)?
      .iter()
      .filter_map(|row| normalize(row, ctx))
      .collect(),
  )
}
