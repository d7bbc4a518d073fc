//! Router tests against a scripted in-memory driver.

use std::sync::{
  Arc,
  atomic::{AtomicU64, Ordering},
};

use argon2::{Argon2, PasswordHasher, password_hash::SaltString};
use axum::{
  body::Body,
  http::{Request, StatusCode, header},
  response::Response,
};
use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use chrono::Utc;
use gradewatch_core::{
  AuthError, DriverError,
  credentials::Credentials,
  driver::{CycleDriver, CycleOutcome, CycleReport, HealthReport},
};
use rand_core::OsRng;
use serde_json::Value;
use tower::ServiceExt as _;
use uuid::Uuid;

use crate::{AuthConfig, api_router};

/// Knows one user, `alice`, whose upstream password is `pw`.
#[derive(Default)]
struct FakeDriver {
  cycles: AtomicU64,
}

impl CycleDriver for FakeDriver {
  async fn trigger(&self, username: &str) -> Result<CycleReport, DriverError> {
    if username != "alice" {
      return Err(DriverError::UnknownUser(username.to_string()));
    }
    self.cycles.fetch_add(1, Ordering::SeqCst);
    let now = Utc::now();
    Ok(CycleReport {
      cycle_id:    Uuid::new_v4(),
      username:    username.to_string(),
      started_at:  now,
      finished_at: now,
      outcome:     CycleOutcome::Unchanged,
    })
  }

  async fn login(&self, credentials: Credentials) -> Result<(), DriverError> {
    match (credentials.username.as_str(), credentials.password.as_str()) {
      ("alice", "pw") => Ok(()),
      ("alice", "down") => Err(AuthError::UpstreamUnavailable("HTTP 503".into()).into()),
      ("alice", _) => Err(AuthError::InvalidCredentials.into()),
      (other, _) => Err(DriverError::UnknownUser(other.to_string())),
    }
  }

  async fn health(&self) -> HealthReport {
    HealthReport {
      users:            1,
      cycles_completed: self.cycles.load(Ordering::SeqCst),
      last_cycle_at:    None,
    }
  }
}

fn auth_config() -> AuthConfig {
  let salt = SaltString::generate(&mut OsRng);
  let hash = Argon2::default()
    .hash_password(b"admin-secret", &salt)
    .unwrap()
    .to_string();
  AuthConfig {
    username:      "admin".to_string(),
    password_hash: hash,
  }
}

fn basic() -> String {
  format!("Basic {}", B64.encode("admin:admin-secret"))
}

async fn send(
  driver: Arc<FakeDriver>,
  auth: Option<AuthConfig>,
  method: &str,
  uri: &str,
  headers: Vec<(header::HeaderName, String)>,
  body: &str,
) -> Response {
  let mut builder = Request::builder().method(method).uri(uri);
  for (k, v) in headers {
    builder = builder.header(k, v);
  }
  let req = builder.body(Body::from(body.to_string())).unwrap();
  api_router(driver, auth).oneshot(req).await.unwrap()
}

async fn json(resp: Response) -> Value {
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  serde_json::from_slice(&bytes).unwrap()
}

fn json_headers() -> Vec<(header::HeaderName, String)> {
  vec![(header::CONTENT_TYPE, "application/json".to_string())]
}

// ── Health ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn health_is_open_even_with_auth() {
  let resp = send(
    Arc::default(),
    Some(auth_config()),
    "GET",
    "/health",
    vec![],
    "",
  )
  .await;
  assert_eq!(resp.status(), StatusCode::OK);
  let body = json(resp).await;
  assert_eq!(body["users"], 1);
  assert_eq!(body["cycles_completed"], 0);
}

// ── Check ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn check_runs_a_cycle() {
  let driver = Arc::new(FakeDriver::default());
  let resp = send(driver.clone(), None, "POST", "/users/alice/check", vec![], "").await;
  assert_eq!(resp.status(), StatusCode::OK);
  let body = json(resp).await;
  assert_eq!(body["username"], "alice");
  assert_eq!(body["outcome"], "unchanged");
  assert_eq!(driver.cycles.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn check_unknown_user_is_404() {
  let resp = send(Arc::default(), None, "POST", "/users/bob/check", vec![], "").await;
  assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  assert_eq!(json(resp).await["error"], "unknown user: bob");
}

#[tokio::test]
async fn check_requires_admin_auth_when_configured() {
  let driver = Arc::new(FakeDriver::default());
  let resp = send(
    driver.clone(),
    Some(auth_config()),
    "POST",
    "/users/alice/check",
    vec![],
    "",
  )
  .await;
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  assert!(resp.headers().contains_key(header::WWW_AUTHENTICATE));
  assert_eq!(driver.cycles.load(Ordering::SeqCst), 0);

  let resp = send(
    driver.clone(),
    Some(auth_config()),
    "POST",
    "/users/alice/check",
    vec![(header::AUTHORIZATION, basic())],
    "",
  )
  .await;
  assert_eq!(resp.status(), StatusCode::OK);
}

// ── Login ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn login_maps_driver_errors() {
  let cases = [
    (r#"{"password":"pw"}"#, StatusCode::NO_CONTENT),
    (r#"{"password":"wrong"}"#, StatusCode::UNAUTHORIZED),
    (r#"{"password":"down"}"#, StatusCode::BAD_GATEWAY),
  ];
  for (body, expected) in cases {
    let resp = send(
      Arc::default(),
      None,
      "POST",
      "/users/alice/login",
      json_headers(),
      body,
    )
    .await;
    assert_eq!(resp.status(), expected, "{body}");
  }
}

#[tokio::test]
async fn login_error_body_is_json() {
  let resp = send(
    Arc::default(),
    None,
    "POST",
    "/users/alice/login",
    json_headers(),
    r#"{"password":"wrong"}"#,
  )
  .await;
  assert_eq!(json(resp).await["error"], "invalid credentials");
}
