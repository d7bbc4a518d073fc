//! HTML table extraction.
//!
//! Pipeline:
//!   markup fragment
//!     └─ every <table>          (merged, in document order)
//!          └─ header row        → map_columns() → Vec<Option<CanonicalField>>
//!               └─ data rows    → RawRow

use std::collections::BTreeMap;

use scraper::{ElementRef, Html, Selector};

use crate::{
  error::{ParseError, Result},
  headers::{CanonicalField, map_columns, match_header},
};

/// One extracted row: the cells whose column header matched a canonical
/// field, plus the remaining cells under their original header text.
///
/// A row with an empty `fields` map carries nothing usable and is dropped
/// by normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow {
  pub fields: BTreeMap<CanonicalField, String>,
  pub extras: Vec<(String, String)>,
}

impl RawRow {
  pub fn get(&self, field: CanonicalField) -> Option<&str> {
    self.fields.get(&field).map(String::as_str)
  }
}

fn selector(css: &'static str) -> Result<Selector> {
  Selector::parse(css).map_err(|_| ParseError::Selector(css))
}

/// Whitespace-collapsed text content of an element.
fn cell_text(el: ElementRef<'_>) -> String {
  el.text()
    .flat_map(str::split_whitespace)
    .collect::<Vec<_>>()
    .join(" ")
}

const MAX_COLSPAN: usize = 64;

/// Header texts with every `colspan` expanded into repeated column slots.
fn header_slots(cells: &[ElementRef<'_>]) -> Vec<String> {
  cells
    .iter()
    .flat_map(|cell| {
      let span = cell
        .value()
        .attr("colspan")
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(1)
        .clamp(1, MAX_COLSPAN);
      std::iter::repeat_n(cell_text(*cell), span)
    })
    .collect()
}

/// The `th`/`td` children of a row, excluding cells of nested tables.
fn row_cells(tr: ElementRef<'_>) -> Vec<ElementRef<'_>> {
  tr.children()
    .filter_map(ElementRef::wrap)
    .filter(|el| matches!(el.value().name(), "th" | "td"))
    .collect()
}

/// Whether `tr` belongs to `table` itself rather than to a table nested
/// inside it.
fn owned_by(tr: &ElementRef<'_>, table: &ElementRef<'_>) -> bool {
  tr.ancestors()
    .filter_map(ElementRef::wrap)
    .find(|el| el.value().name() == "table")
    .is_some_and(|el| el.id() == table.id())
}

/// Extract rows from every table in `markup`.
///
/// Returns [`ParseError::NoTable`] when the fragment has no table. A table
/// without data rows contributes nothing. Nested tables are read on their
/// own and never through their parent.
///
/// Cells are matched to header slots by position. Cells past the last
/// slot are ignored, and a row too short to reach the last mapped column
/// is skipped.
pub fn parse(markup: &str) -> Result<Vec<RawRow>> {
  let table_sel = selector("table")?;
  let tr_sel = selector("tr")?;

  let doc = Html::parse_fragment(markup);
  let mut tables = doc.select(&table_sel).peekable();
  if tables.peek().is_none() {
    return Err(ParseError::NoTable);
  }

  let mut rows = Vec::new();
  for table in tables {
    let trs: Vec<Vec<ElementRef<'_>>> = table
      .select(&tr_sel)
      .filter(|tr| owned_by(tr, &table))
      .map(row_cells)
      .collect();
    let header_idx = trs
      .iter()
      .position(|cells| cells.iter().any(|c| c.value().name() == "th"))
      .unwrap_or(0);
    let Some(header_cells) = trs.get(header_idx) else {
      continue;
    };

    let headers = header_slots(header_cells);
    let columns = map_columns(&headers);
    let required = columns
      .iter()
      .rposition(Option::is_some)
      .map_or(1, |last| last + 1);

    for cells in &trs[header_idx + 1..] {
      if cells.len() < required {
        continue;
      }
      let mut row = RawRow::default();
      for ((header, column), cell) in headers.iter().zip(&columns).zip(cells) {
        let text = cell_text(*cell);
        match column {
          Some(field) => {
            row.fields.insert(*field, text);
          }
          None => row.extras.push((header.clone(), text)),
        }
      }
      rows.push(row);
    }
  }
  Ok(rows)
}

/// Build a row from name/value pairs of the structured API, using the same
/// header rules as table columns.
pub fn row_from_pairs<'a>(
  pairs: impl IntoIterator<Item = (&'a str, &'a str)>,
) -> RawRow {
  let mut row = RawRow::default();
  for (name, value) in pairs {
    let value = value.trim().to_string();
    match match_header(name) {
      Some(field) if !row.fields.contains_key(&field) => {
        row.fields.insert(field, value);
      }
      _ => row.extras.push((name.to_string(), value)),
    }
  }
  row
}
