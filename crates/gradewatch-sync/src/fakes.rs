//! In-memory fakes of the collaborator traits, shared by the unit tests.

use std::{
  collections::HashMap,
  io,
  sync::{
    Mutex,
    atomic::{AtomicBool, AtomicUsize, Ordering},
  },
};

use gradewatch_core::{
  AuthError, NotifyError, UpstreamError,
  change::ChangeEvent,
  credentials::Credentials,
  notify::{Escalation, Notifier},
  page::{Envelope, GuiData, PageData, PageQuery},
  session::LoginGrant,
  snapshot::GradeSnapshot,
  store::SnapshotStore,
  upstream::Upstream,
};
use serde_json::{Value, json};

// ─── Upstream ────────────────────────────────────────────────────────────────

/// Accepts the password `pw` for every user and serves scripted pages.
///
/// Pages are keyed by name, or `name:param` for the first parameter value.
/// Unscripted pages answer with `getPage: null`.
pub struct FakeUpstream {
  probe_ok:       AtomicBool,
  network_down:   AtomicBool,
  reject_tokens:  AtomicBool,
  logins:         AtomicUsize,
  probes:         AtomicUsize,
  page_calls:     AtomicUsize,
  pages:          Mutex<HashMap<String, Result<Value, UpstreamError>>>,
}

impl FakeUpstream {
  pub fn new() -> Self {
    Self {
      probe_ok:      AtomicBool::new(true),
      network_down:  AtomicBool::new(false),
      reject_tokens: AtomicBool::new(false),
      logins:        AtomicUsize::new(0),
      probes:        AtomicUsize::new(0),
      page_calls:    AtomicUsize::new(0),
      pages:         Mutex::new(HashMap::new()),
    }
  }

  pub fn set_probe_ok(&self, ok: bool) { self.probe_ok.store(ok, Ordering::SeqCst) }

  pub fn fail_network(&self, down: bool) {
    self.network_down.store(down, Ordering::SeqCst)
  }

  pub fn reject_tokens(&self, reject: bool) {
    self.reject_tokens.store(reject, Ordering::SeqCst)
  }

  pub fn login_count(&self) -> usize { self.logins.load(Ordering::SeqCst) }

  pub fn probe_count(&self) -> usize { self.probes.load(Ordering::SeqCst) }

  pub fn page_count(&self) -> usize { self.page_calls.load(Ordering::SeqCst) }

  pub fn set_page(&self, key: &str, envelope: Value) {
    self.pages.lock().unwrap().insert(key.to_string(), Ok(envelope));
  }

  pub fn set_page_error(&self, key: &str, err: UpstreamError) {
    self.pages.lock().unwrap().insert(key.to_string(), Err(err));
  }

  fn down(&self) -> bool { self.network_down.load(Ordering::SeqCst) }
}

impl Upstream for FakeUpstream {
  async fn login(&self, credentials: &Credentials) -> Result<LoginGrant, AuthError> {
    if self.down() {
      return Err(AuthError::Network("connection refused".into()));
    }
    if credentials.password != "pw" {
      return Err(AuthError::InvalidCredentials);
    }
    let n = self.logins.fetch_add(1, Ordering::SeqCst) + 1;
    Ok(LoginGrant {
      token:      format!("tok-{n}"),
      expires_at: None,
    })
  }

  async fn probe(&self, _token: &str) -> Result<Envelope<GuiData>, UpstreamError> {
    self.probes.fetch_add(1, Ordering::SeqCst);
    if self.down() {
      return Err(UpstreamError::Network("connection refused".into()));
    }
    let body = if self.probe_ok.load(Ordering::SeqCst) {
      json!({ "data": { "getGUI": { "user": { "id": "1", "username": "student" } } } })
    } else {
      json!({ "data": { "getGUI": null }, "errors": [{ "message": "unauthenticated" }] })
    };
    Ok(serde_json::from_value(body).unwrap())
  }

  async fn page(
    &self,
    _token: &str,
    query: &PageQuery,
  ) -> Result<Envelope<PageData>, UpstreamError> {
    self.page_calls.fetch_add(1, Ordering::SeqCst);
    if self.down() {
      return Err(UpstreamError::Network("connection refused".into()));
    }
    if self.reject_tokens.load(Ordering::SeqCst) {
      return Err(UpstreamError::Unauthorized);
    }
    let key = match query.params.first() {
      Some(p) => format!("{}:{}", query.name, p.value),
      None => query.name.clone(),
    };
    let scripted = self.pages.lock().unwrap().get(&key).cloned();
    match scripted {
      Some(Ok(body)) => Ok(serde_json::from_value(body).unwrap()),
      Some(Err(e)) => Err(e),
      None => Ok(serde_json::from_value(json!({ "data": { "getPage": null } })).unwrap()),
    }
  }
}

// ─── Page builders ───────────────────────────────────────────────────────────

/// A homepage whose tab block lists the given `(term_id, label)` pairs.
pub fn homepage(terms: &[(&str, &str)]) -> Value {
  let tabs: Vec<Value> = terms
    .iter()
    .map(|(id, label)| {
      json!({ "name": "tab", "array": [
        { "name": "label", "value": label },
        { "name": "page_params", "array": [ { "name": "t_grade_id", "value": id } ] }
      ] })
    })
    .collect();
  json!({ "data": { "getPage": { "name": "homepage", "panels": [ { "blocks": [
    { "name": "terms", "type": "tabs", "config": [ { "name": "tabs", "array": tabs } ] }
  ] } ] } } })
}

/// A term page with no structured grades and one block per markup body.
pub fn markup_page(bodies: &[&str]) -> Value {
  let blocks: Vec<Value> = bodies
    .iter()
    .enumerate()
    .map(|(i, body)| json!({ "name": format!("block_{i}"), "type": "simple", "body": body }))
    .collect();
  json!({ "data": { "getPage": { "name": "test_student_tracks", "panels": [ { "blocks": blocks } ] } } })
}

/// A term page carrying a structured `grades` scope entry.
pub fn structured_page(rows: &[&[(&str, &str)]]) -> Value {
  let items: Vec<Value> = rows
    .iter()
    .map(|row| {
      let pairs: Vec<Value> = row
        .iter()
        .map(|(n, v)| json!({ "name": n, "value": v }))
        .collect();
      json!({ "name": "row", "array": pairs })
    })
    .collect();
  json!({ "data": { "getPage": {
    "name": "test_student_tracks",
    "scope": [ { "name": "grades", "array": items } ],
    "panels": []
  } } })
}

/// A grade table with the usual six Arabic headers.
pub fn arabic_table(rows: &[[&str; 6]]) -> String {
  let mut html = String::from(
    "<table><thead><tr><th>المقرر</th><th>كود المقرر</th><th>رصيد ECTS</th>\
     <th>أعمال السنة</th><th>نظري</th><th>الدرجة</th></tr></thead><tbody>",
  );
  for row in rows {
    html.push_str("<tr>");
    for cell in row {
      html.push_str(&format!("<td>{cell}</td>"));
    }
    html.push_str("</tr>");
  }
  html.push_str("</tbody></table>");
  html
}

// ─── Store ───────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryStore {
  snapshots: Mutex<HashMap<String, GradeSnapshot>>,
  fail_puts: AtomicBool,
  puts:      AtomicUsize,
}

impl MemoryStore {
  pub fn fail_puts(&self, fail: bool) { self.fail_puts.store(fail, Ordering::SeqCst) }

  pub fn put_count(&self) -> usize { self.puts.load(Ordering::SeqCst) }

  pub fn get(&self, username: &str) -> Option<GradeSnapshot> {
    self.snapshots.lock().unwrap().get(username).cloned()
  }

  pub fn insert(&self, snapshot: GradeSnapshot) {
    self
      .snapshots
      .lock()
      .unwrap()
      .insert(snapshot.username.clone(), snapshot);
  }
}

impl SnapshotStore for MemoryStore {
  type Error = io::Error;

  async fn get_last_snapshot(&self, username: &str) -> io::Result<Option<GradeSnapshot>> {
    Ok(self.get(username))
  }

  async fn put_snapshot(&self, snapshot: &GradeSnapshot) -> io::Result<()> {
    if self.fail_puts.load(Ordering::SeqCst) {
      return Err(io::Error::other("disk full"));
    }
    self.puts.fetch_add(1, Ordering::SeqCst);
    self.insert(snapshot.clone());
    Ok(())
  }
}

// ─── Notifier ────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingNotifier {
  pub batches:     Mutex<Vec<(String, Vec<ChangeEvent>)>>,
  pub escalations: Mutex<Vec<(String, Escalation)>>,
  fail:            AtomicBool,
}

impl RecordingNotifier {
  pub fn fail(&self, fail: bool) { self.fail.store(fail, Ordering::SeqCst) }

  pub fn batch_count(&self) -> usize { self.batches.lock().unwrap().len() }

  pub fn escalations(&self) -> Vec<(String, Escalation)> {
    self.escalations.lock().unwrap().clone()
  }
}

impl Notifier for RecordingNotifier {
  async fn notify(&self, username: &str, events: &[ChangeEvent]) -> Result<(), NotifyError> {
    if self.fail.load(Ordering::SeqCst) {
      return Err(NotifyError("channel closed".into()));
    }
    self
      .batches
      .lock()
      .unwrap()
      .push((username.to_string(), events.to_vec()));
    Ok(())
  }

  async fn escalate(&self, username: &str, escalation: Escalation) -> Result<(), NotifyError> {
    self
      .escalations
      .lock()
      .unwrap()
      .push((username.to_string(), escalation));
    Ok(())
  }
}
