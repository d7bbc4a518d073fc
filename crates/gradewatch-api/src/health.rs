//! `GET /health`

use std::sync::Arc;

use axum::{Json, extract::State};
use gradewatch_core::driver::{CycleDriver, HealthReport};

pub async fn handler<D: CycleDriver>(State(driver): State<Arc<D>>) -> Json<HealthReport> {
  Json(driver.health().await)
}
