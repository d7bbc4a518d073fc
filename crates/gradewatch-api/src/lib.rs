//! JSON admin API for gradewatch.
//!
//! Exposes an axum [`Router`] backed by any
//! [`gradewatch_core::driver::CycleDriver`]. The router knows nothing about
//! sessions, fetching or diffing; every route delegates to the driver.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/health` | Never authenticated |
//! | `POST` | `/users/{username}/check` | Runs a cycle now; 404 for unknown users |
//! | `POST` | `/users/{username}/login` | Body: `{"password":"…"}`; 204 on success |

pub mod auth;
pub mod error;
pub mod health;
pub mod users;

use std::sync::Arc;

use axum::{
  Router, middleware,
  routing::{get, post},
};
use gradewatch_core::driver::CycleDriver;

pub use auth::AuthConfig;
pub use error::ApiError;

/// Build the admin router for `driver`.
///
/// When `auth` is `Some`, every route except `/health` requires HTTP Basic
/// credentials matching it.
pub fn api_router<D>(driver: Arc<D>, auth: Option<AuthConfig>) -> Router<()>
where
  D: CycleDriver + 'static,
{
  let mut users = Router::new()
    .route("/users/{username}/check", post(users::check::<D>))
    .route("/users/{username}/login", post(users::login::<D>));
  if let Some(auth) = auth {
    users = users.route_layer(middleware::from_fn_with_state(
      Arc::new(auth),
      auth::require_basic_auth,
    ));
  }

  Router::new()
    .route("/health", get(health::handler::<D>))
    .merge(users)
    .with_state(driver)
}

#[cfg(test)]
mod tests;
