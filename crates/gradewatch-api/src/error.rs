//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use gradewatch_core::{AuthError, DriverError};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("unknown user: {0}")]
  UnknownUser(String),

  /// Admin credentials missing or wrong.
  #[error("unauthorized")]
  Unauthorized,

  /// The upstream rejected the student's credentials.
  #[error("invalid credentials")]
  InvalidCredentials,

  #[error("upstream unavailable: {0}")]
  BadGateway(String),
}

impl From<DriverError> for ApiError {
  fn from(err: DriverError) -> Self {
    match err {
      DriverError::UnknownUser(u) => Self::UnknownUser(u),
      DriverError::Auth(AuthError::InvalidCredentials) => Self::InvalidCredentials,
      DriverError::Auth(e) => Self::BadGateway(e.to_string()),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = match &self {
      ApiError::UnknownUser(_) => StatusCode::NOT_FOUND,
      ApiError::Unauthorized | ApiError::InvalidCredentials => {
        StatusCode::UNAUTHORIZED
      }
      ApiError::BadGateway(_) => StatusCode::BAD_GATEWAY,
    };
    let mut resp = (status, Json(json!({ "error": self.to_string() }))).into_response();
    if matches!(self, ApiError::Unauthorized) {
      resp.headers_mut().insert(
        header::WWW_AUTHENTICATE,
        HeaderValue::from_static("Basic realm=\"gradewatch\""),
      );
    }
    resp
  }
}
