//! Dual-path grade retrieval.
//!
//! Each term is read from the structured `grades`/`courses` scope list
//! first. Only a response that decoded but carried nothing usable falls
//! back to parsing the term's embedded table markup; transport failures
//! abort the whole fetch instead.

use std::{collections::HashSet, sync::Arc};

use chrono::Utc;
use gradewatch_core::{
  FetchError, UpstreamError,
  grade::{GradeRecord, Term, TermContext},
  page::{Envelope, Page, PageData, PageQuery},
  session::Session,
  snapshot::GradeSnapshot,
  upstream::Upstream,
};
use gradewatch_table::{ParseError, normalize, row_from_pairs};

pub const HOMEPAGE: &str = "homepage";
pub const TERM_PAGE: &str = "test_student_tracks";
pub const TERM_PARAM: &str = "t_grade_id";

const GRADE_LISTS: [&str; 2] = ["grades", "courses"];

#[derive(Debug, Clone, PartialEq)]
pub enum Fetched {
  Snapshot(GradeSnapshot),
  /// Every term was read and none holds a course.
  Empty,
}

/// Result of inspecting one term's structured response.
#[derive(Debug)]
enum Classified {
  Sufficient(Vec<GradeRecord>),
  /// Decoded, but without a usable grade list. Carries the page, if any,
  /// for the markup fallback.
  Insufficient(Option<Page>),
  TransportFailure(FetchError),
}

pub struct GradeFetcher<U> {
  upstream:          Arc<U>,
  fallback_term_ids: Vec<String>,
}

impl<U> Clone for GradeFetcher<U> {
  fn clone(&self) -> Self {
    Self {
      upstream:          Arc::clone(&self.upstream),
      fallback_term_ids: self.fallback_term_ids.clone(),
    }
  }
}

impl<U: Upstream> GradeFetcher<U> {
  pub fn new(upstream: Arc<U>, fallback_term_ids: Vec<String>) -> Self {
    Self {
      upstream,
      fallback_term_ids,
    }
  }

  /// Fetch every term for the session's user.
  ///
  /// Terms whose data could not be obtained are listed in
  /// [`GradeSnapshot::failed_terms`], and terms read without a single course
  /// in [`GradeSnapshot::empty_terms`]. The call only fails outright on a
  /// transport error or when no term at all could be read.
  pub async fn fetch_all(&self, session: &Session) -> Result<Fetched, FetchError> {
    let terms = self.terms(&session.token).await?;
    if terms.is_empty() {
      tracing::info!(username = %session.username, "no terms available");
      return Ok(Fetched::Empty);
    }

    let mut snapshot = GradeSnapshot::new(&session.username, Utc::now(), Vec::new());
    for term in &terms {
      let ctx = TermContext::new(&session.username, term);
      match self.fetch_term(&session.token, &ctx).await? {
        Some(records) if records.is_empty() => {
          snapshot.empty_terms.push(term.id.clone());
        }
        Some(records) => snapshot.records.extend(records),
        None => snapshot.failed_terms.push(term.id.clone()),
      }
    }

    if snapshot.failed_terms.len() == terms.len() {
      return Err(FetchError::UpstreamSchema(format!(
        "none of {} terms could be read",
        terms.len()
      )));
    }
    if snapshot.is_empty() && snapshot.failed_terms.is_empty() {
      return Ok(Fetched::Empty);
    }
    snapshot.sort();
    tracing::debug!(
      username = %session.username,
      records = snapshot.len(),
      failed_terms = snapshot.failed_terms.len(),
      empty_terms = snapshot.empty_terms.len(),
      "fetched grades"
    );
    Ok(Fetched::Snapshot(snapshot))
  }

  /// The term list from the homepage tabs, or the configured fallback ids
  /// when the homepage lists none.
  pub async fn terms(&self, token: &str) -> Result<Vec<Term>, FetchError> {
    let listed = match self.upstream.page(token, &PageQuery::new(HOMEPAGE)).await {
      Ok(env) => env.page().map(terms_from_homepage).unwrap_or_default(),
      Err(UpstreamError::Schema(msg)) => {
        tracing::debug!(error = %msg, "homepage undecodable; using fallback terms");
        Vec::new()
      }
      Err(e) => return Err(e.into()),
    };
    if !listed.is_empty() {
      return Ok(listed);
    }
    Ok(
      self
        .fallback_term_ids
        .iter()
        .map(|id| Term {
          id:   id.clone(),
          name: format!("Term {id}"),
        })
        .collect(),
    )
  }

  /// Records for one term, deduplicated by course code. `None` when neither
  /// path produced anything readable.
  async fn fetch_term(
    &self,
    token: &str,
    ctx: &TermContext,
  ) -> Result<Option<Vec<GradeRecord>>, FetchError> {
    let query = PageQuery::new(TERM_PAGE).param(TERM_PARAM, &ctx.term_id);
    let response = self.upstream.page(token, &query).await;
    let records = match classify(response, ctx) {
      Classified::Sufficient(records) => records,
      Classified::TransportFailure(e) => return Err(e),
      Classified::Insufficient(page) => {
        tracing::debug!(term = %ctx.term_id, "structured grades insufficient; parsing markup");
        match page.as_ref().and_then(|p| records_from_markup(p, ctx)) {
          Some(records) => records,
          None => {
            tracing::warn!(term = %ctx.term_id, "term unreadable; skipping");
            return Ok(None);
          }
        }
      }
    };
    Ok(Some(dedup_by_code(records, ctx)))
  }
}

fn classify(
  response: Result<Envelope<PageData>, UpstreamError>,
  ctx: &TermContext,
) -> Classified {
  let env = match response {
    Ok(env) => env,
    Err(UpstreamError::Schema(msg)) => {
      tracing::debug!(term = %ctx.term_id, error = %msg, "structured response malformed");
      return Classified::Insufficient(None);
    }
    Err(e) => return Classified::TransportFailure(e.into()),
  };
  if env.has_errors() {
    tracing::debug!(term = %ctx.term_id, errors = env.errors.len(), "structured query errored");
    return Classified::Insufficient(env.page().cloned());
  }
  let Some(page) = env.page() else {
    return Classified::Insufficient(None);
  };

  let records: Vec<GradeRecord> = page
    .scopes()
    .filter(|s| s.name.as_deref().is_some_and(|n| GRADE_LISTS.contains(&n)))
    .flat_map(|s| s.array.iter())
    .map(|item| row_from_pairs(item.pairs()))
    .filter(|row| !row.fields.is_empty())
    .filter_map(|row| normalize(&row, ctx))
    .collect();
  if records.is_empty() {
    Classified::Insufficient(Some(page.clone()))
  } else {
    Classified::Sufficient(records)
  }
}

/// Parse every block body on the page. `None` when no body held a table.
fn records_from_markup(page: &Page, ctx: &TermContext) -> Option<Vec<GradeRecord>> {
  let mut parsed_any = false;
  let mut records = Vec::new();
  for body in page.blocks().into_iter().filter_map(|b| b.body.as_deref()) {
    match gradewatch_table::extract(body, ctx) {
      Ok(rows) => {
        parsed_any = true;
        records.extend(rows);
      }
      Err(ParseError::NoTable) => {}
      Err(e) => {
        tracing::debug!(term = %ctx.term_id, error = %e, "block markup unparseable");
      }
    }
  }
  parsed_any.then_some(records)
}

fn dedup_by_code(records: Vec<GradeRecord>, ctx: &TermContext) -> Vec<GradeRecord> {
  let mut seen = HashSet::new();
  records
    .into_iter()
    .filter(|r| {
      let first = seen.insert(r.course_code.clone());
      if !first {
        tracing::debug!(term = %ctx.term_id, course = %r.course_code, "dropping duplicate row");
      }
      first
    })
    .collect()
}

fn terms_from_homepage(page: &Page) -> Vec<Term> {
  let mut seen = HashSet::new();
  page
    .blocks()
    .into_iter()
    .filter(|b| b.kind.as_deref() == Some("tabs"))
    .flat_map(|b| b.config.iter())
    .filter(|c| c.name.as_deref() == Some("tabs"))
    .flat_map(|c| c.array.iter())
    .filter_map(|tab| {
      let id = tab
        .child("page_params")?
        .child(TERM_PARAM)?
        .value
        .as_deref()?
        .trim();
      if id.is_empty() {
        return None;
      }
      let name = tab
        .child("label")
        .and_then(|l| l.value.as_deref())
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map_or_else(|| format!("Term {id}"), str::to_owned);
      Some(Term {
        id: id.to_owned(),
        name,
      })
    })
    .filter(|t| seen.insert(t.id.clone()))
    .collect()
}

#[cfg(test)]
mod tests {
  use gradewatch_core::{credentials::Credentials, grade::GradeStatus};

  use super::*;
  use crate::{
    fakes::{FakeUpstream, arabic_table, homepage, markup_page, structured_page},
    session::SessionManager,
  };

  const FALL: &str = "10458";
  const SPRING: &str = "10457";

  async fn session(up: &Arc<FakeUpstream>) -> Session {
    SessionManager::new(Arc::clone(up))
      .login(&Credentials::new("student", "pw"))
      .await
      .unwrap()
  }

  fn fetcher(up: &Arc<FakeUpstream>) -> GradeFetcher<FakeUpstream> {
    GradeFetcher::new(Arc::clone(up), Vec::new())
  }

  fn snapshot(f: Fetched) -> GradeSnapshot {
    match f {
      Fetched::Snapshot(s) => s,
      Fetched::Empty => panic!("expected a snapshot"),
    }
  }

  fn eight_courses() -> String {
    arabic_table(&[
      ["اللغة العربية (1)", "ARAB100", "2", "38", "49", "87 %"],
      ["تفاضل وتكامل", "MATH113", "6", "20", "", "لم يتم النشر"],
      ["فيزياء عامة", "PHYS101", "6", "25", "45", "70 %"],
      ["كيمياء عامة", "CHEM101", "6", "22", "40", "62 %"],
      ["مقدمة في البرمجة", "CS101", "6", "30", "55", "85 %"],
      ["اللغة الإنجليزية", "ENGL101", "4", "28", "50", "78 %"],
      ["مهارات التواصل", "COMM100", "2", "18", "", "-"],
      ["الثقافة الإسلامية", "ISLM101", "2", "35", "58", "93 %"],
    ])
  }

  #[tokio::test]
  async fn empty_structured_list_falls_back_to_markup() {
    let up = Arc::new(FakeUpstream::new());
    up.set_page(HOMEPAGE, homepage(&[(FALL, "الفصل الدراسي الأول")]));
    let mut page = markup_page(&[&eight_courses()]);
    page["data"]["getPage"]["scope"] = serde_json::json!([{ "name": "grades", "array": [] }]);
    up.set_page(&format!("{TERM_PAGE}:{FALL}"), page);

    let s = snapshot(fetcher(&up).fetch_all(&session(&up).await).await.unwrap());
    assert_eq!(s.len(), 8);
    assert_eq!(s.index().len(), 8);
    assert!(s.failed_terms.is_empty());

    let idx = s.index();
    let arab = idx[&(FALL, "ARAB100")];
    assert_eq!(arab.course_name, "اللغة العربية (1)");
    assert_eq!(arab.term_name, "الفصل الدراسي الأول");
    assert_eq!(arab.status, GradeStatus::Published);
    assert_eq!(arab.numeric_grade, Some(87.0));

    let math = idx[&(FALL, "MATH113")];
    assert_eq!(math.status, GradeStatus::NotPublished);
    assert_eq!(math.numeric_grade, None);
  }

  #[tokio::test]
  async fn duplicate_code_keeps_first_row() {
    let up = Arc::new(FakeUpstream::new());
    up.set_page(HOMEPAGE, homepage(&[(FALL, "Fall")]));
    let table = arabic_table(&[
      ["اللغة العربية (1)", "ARAB100", "2", "38", "49", "87 %"],
      ["اللغة العربية (1)", "ARAB100", "2", "10", "10", "20 %"],
    ]);
    up.set_page(&format!("{TERM_PAGE}:{FALL}"), markup_page(&[&table]));

    let s = snapshot(fetcher(&up).fetch_all(&session(&up).await).await.unwrap());
    assert_eq!(s.len(), 1);
    assert_eq!(s.records[0].total_score, "87 %");
  }

  #[tokio::test]
  async fn structured_rows_win_over_markup() {
    let up = Arc::new(FakeUpstream::new());
    up.set_page(HOMEPAGE, homepage(&[(FALL, "Fall")]));
    let row: &[(&str, &str)] =
      &[("Course Code", "MATH113"), ("Course", "Calculus"), ("Total", "91 %")];
    let mut page = structured_page(&[row]);
    page["data"]["getPage"]["panels"] =
      serde_json::json!([{ "blocks": [{ "type": "simple", "body": eight_courses() }] }]);
    up.set_page(&format!("{TERM_PAGE}:{FALL}"), page);

    let s = snapshot(fetcher(&up).fetch_all(&session(&up).await).await.unwrap());
    assert_eq!(s.len(), 1);
    assert_eq!(s.records[0].course_name, "Calculus");
    assert_eq!(s.records[0].numeric_grade, Some(91.0));
  }

  #[tokio::test]
  async fn unreadable_term_is_recorded_and_others_kept() {
    let up = Arc::new(FakeUpstream::new());
    up.set_page(HOMEPAGE, homepage(&[(FALL, "Fall"), (SPRING, "Spring")]));
    up.set_page(&format!("{TERM_PAGE}:{FALL}"), markup_page(&[&eight_courses()]));
    up.set_page(&format!("{TERM_PAGE}:{SPRING}"), markup_page(&["<p>maintenance</p>"]));

    let s = snapshot(fetcher(&up).fetch_all(&session(&up).await).await.unwrap());
    assert_eq!(s.len(), 8);
    assert_eq!(s.failed_terms, vec![SPRING.to_string()]);
  }

  #[tokio::test]
  async fn transport_failure_is_not_masked() {
    let up = Arc::new(FakeUpstream::new());
    up.set_page(HOMEPAGE, homepage(&[(FALL, "Fall")]));
    up.set_page_error(&format!("{TERM_PAGE}:{FALL}"), UpstreamError::Status(503));
    let s = session(&up).await;
    assert!(matches!(
      fetcher(&up).fetch_all(&s).await,
      Err(FetchError::Network(_))
    ));

    up.reject_tokens(true);
    assert_eq!(fetcher(&up).fetch_all(&s).await, Err(FetchError::TokenExpired));
  }

  #[tokio::test]
  async fn malformed_term_response_falls_back() {
    let up = Arc::new(FakeUpstream::new());
    up.set_page(HOMEPAGE, homepage(&[(FALL, "Fall"), (SPRING, "Spring")]));
    up.set_page_error(&format!("{TERM_PAGE}:{FALL}"), UpstreamError::Schema("eof".into()));
    up.set_page(&format!("{TERM_PAGE}:{SPRING}"), markup_page(&[&eight_courses()]));

    let s = snapshot(fetcher(&up).fetch_all(&session(&up).await).await.unwrap());
    assert_eq!(s.failed_terms, vec![FALL.to_string()]);
    assert!(s.records.iter().all(|r| r.term_id == SPRING));
  }

  #[tokio::test]
  async fn every_term_failing_is_an_error() {
    let up = Arc::new(FakeUpstream::new());
    up.set_page(HOMEPAGE, homepage(&[(FALL, "Fall")]));
    let err = fetcher(&up).fetch_all(&session(&up).await).await.unwrap_err();
    assert!(matches!(err, FetchError::UpstreamSchema(_)));
  }

  #[tokio::test]
  async fn homepage_without_terms_uses_fallback_ids() {
    let up = Arc::new(FakeUpstream::new());
    up.set_page(&format!("{TERM_PAGE}:{SPRING}"), markup_page(&[&eight_courses()]));
    let fetcher = GradeFetcher::new(Arc::clone(&up), vec![SPRING.to_string()]);

    let s = snapshot(fetcher.fetch_all(&session(&up).await).await.unwrap());
    assert_eq!(s.len(), 8);
    assert_eq!(s.records[0].term_name, format!("Term {SPRING}"));
  }

  #[tokio::test]
  async fn no_terms_at_all_is_empty() {
    let up = Arc::new(FakeUpstream::new());
    let fetched = fetcher(&up).fetch_all(&session(&up).await).await.unwrap();
    assert_eq!(fetched, Fetched::Empty);
  }

  #[tokio::test]
  async fn term_with_empty_table_is_empty_result() {
    let up = Arc::new(FakeUpstream::new());
    up.set_page(HOMEPAGE, homepage(&[(FALL, "Fall")]));
    up.set_page(&format!("{TERM_PAGE}:{FALL}"), markup_page(&[&arabic_table(&[])]));
    let fetched = fetcher(&up).fetch_all(&session(&up).await).await.unwrap();
    assert_eq!(fetched, Fetched::Empty);
  }

  #[tokio::test]
  async fn term_with_empty_table_is_listed_beside_populated_ones() {
    let up = Arc::new(FakeUpstream::new());
    up.set_page(HOMEPAGE, homepage(&[(FALL, "Fall"), (SPRING, "Spring")]));
    up.set_page(&format!("{TERM_PAGE}:{FALL}"), markup_page(&[&arabic_table(&[])]));
    up.set_page(&format!("{TERM_PAGE}:{SPRING}"), markup_page(&[&eight_courses()]));

    let s = snapshot(fetcher(&up).fetch_all(&session(&up).await).await.unwrap());
    assert_eq!(s.len(), 8);
    assert_eq!(s.empty_terms, vec![FALL.to_string()]);
    assert!(s.failed_terms.is_empty());
  }

  #[test]
  fn homepage_tabs_yield_unique_terms() {
    let env: Envelope<PageData> = serde_json::from_value(homepage(&[
      (FALL, "Fall"),
      (FALL, "Fall again"),
      ("", "Broken"),
      (SPRING, " "),
    ]))
    .unwrap();
    let terms = terms_from_homepage(env.page().unwrap());
    assert_eq!(terms, vec![
      Term { id: FALL.into(), name: "Fall".into() },
      Term { id: SPRING.into(), name: format!("Term {SPRING}") },
    ]);
  }
}
