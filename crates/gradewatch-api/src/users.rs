//! Handlers for `/users/{username}/…` endpoints.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
};
use gradewatch_core::{
  credentials::Credentials,
  driver::{CycleDriver, CycleReport},
};
use serde::Deserialize;

use crate::error::ApiError;

// ─── Manual check ────────────────────────────────────────────────────────────

/// `POST /users/{username}/check`
pub async fn check<D: CycleDriver>(
  State(driver): State<Arc<D>>,
  Path(username): Path<String>,
) -> Result<Json<CycleReport>, ApiError> {
  let report = driver.trigger(&username).await?;
  tracing::info!(%username, cycle_id = %report.cycle_id, "manual check finished");
  Ok(Json(report))
}

// ─── Manual login ────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct LoginBody {
  pub password: String,
}

/// `POST /users/{username}/login`, body `{"password":"…"}`
pub async fn login<D: CycleDriver>(
  State(driver): State<Arc<D>>,
  Path(username): Path<String>,
  Json(body): Json<LoginBody>,
) -> Result<StatusCode, ApiError> {
  driver
    .login(Credentials::new(username.clone(), body.password))
    .await?;
  tracing::info!(%username, "manual login succeeded");
  Ok(StatusCode::NO_CONTENT)
}
