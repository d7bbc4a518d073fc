//! Async HTTP client for the portal's GraphQL endpoints.

use std::time::Duration;

use chrono::Utc;
use gradewatch_core::{
  AuthError, UpstreamError,
  credentials::Credentials,
  page::{Envelope, GuiData, PageData, PageQuery},
  session::LoginGrant,
  upstream::Upstream,
};
use reqwest::{
  Client, StatusCode,
  header::{ACCEPT_LANGUAGE, HeaderMap, HeaderName, HeaderValue, ORIGIN, REFERER},
};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::json;
use thiserror::Error;

use crate::{jwt::token_expiry, queries};

fn default_timeout_secs() -> u64 { 30 }

fn default_lang() -> String { "ar".to_string() }

/// Connection settings for the portal.
#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamConfig {
  /// Endpoint that accepts the `signinUser` mutation.
  pub login_url:    String,
  /// Endpoint for authenticated queries.
  pub api_url:      String,
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
  /// Sent as `x-lang` and first in `Accept-Language`.
  #[serde(default = "default_lang")]
  pub lang:         String,
  /// Sent as `Origin`, and with a trailing slash as `Referer`.
  #[serde(default)]
  pub origin:       Option<String>,
}

#[derive(Debug, Error)]
pub enum ClientError {
  #[error("invalid header value for {name}: {value:?}")]
  Header { name: &'static str, value: String },

  #[error("failed to build HTTP client: {0}")]
  Build(#[from] reqwest::Error),
}

#[derive(Deserialize)]
struct LoginData {
  login: Option<String>,
}

/// HTTP implementation of [`Upstream`].
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct GraphqlClient {
  client: Client,
  config: UpstreamConfig,
}

fn header(name: &'static str, value: &str) -> Result<HeaderValue, ClientError> {
  HeaderValue::from_str(value).map_err(|_| ClientError::Header {
    name,
    value: value.to_string(),
  })
}

impl GraphqlClient {
  pub fn new(config: UpstreamConfig) -> Result<Self, ClientError> {
    let mut headers = HeaderMap::new();
    let accept = format!("{},en;q=0.9", config.lang);
    headers.insert(ACCEPT_LANGUAGE, header("accept-language", &accept)?);
    headers.insert(
      HeaderName::from_static("x-lang"),
      header("x-lang", &config.lang)?,
    );
    if let Some(origin) = &config.origin {
      let origin = origin.trim_end_matches('/');
      headers.insert(ORIGIN, header("origin", origin)?);
      headers.insert(REFERER, header("referer", &format!("{origin}/"))?);
    }

    let client = Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .default_headers(headers)
      .build()?;
    Ok(Self { client, config })
  }

  /// POST an authenticated GraphQL request and decode its envelope.
  async fn query<T: DeserializeOwned>(
    &self,
    token: &str,
    body: serde_json::Value,
  ) -> Result<Envelope<T>, UpstreamError> {
    let resp = self
      .client
      .post(&self.config.api_url)
      .bearer_auth(token)
      .json(&body)
      .send()
      .await
      .map_err(|e| UpstreamError::Network(e.to_string()))?;

    match resp.status() {
      StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
        return Err(UpstreamError::Unauthorized);
      }
      s if !s.is_success() => return Err(UpstreamError::Status(s.as_u16())),
      _ => {}
    }
    let text = resp
      .text()
      .await
      .map_err(|e| UpstreamError::Network(e.to_string()))?;
    serde_json::from_str(&text).map_err(|e| UpstreamError::Schema(e.to_string()))
  }
}

impl Upstream for GraphqlClient {
  async fn login(&self, credentials: &Credentials) -> Result<LoginGrant, AuthError> {
    let body = json!({
      "operationName": "signinUser",
      "variables": {
        "username": credentials.username,
        "password": credentials.password,
      },
      "query": queries::LOGIN,
    });
    let resp = self
      .client
      .post(&self.config.login_url)
      .json(&body)
      .send()
      .await
      .map_err(|e| AuthError::Network(e.to_string()))?;

    let status = resp.status();
    match status {
      StatusCode::OK => {}
      StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
        return Err(AuthError::InvalidCredentials);
      }
      _ => return Err(AuthError::UpstreamUnavailable(format!("HTTP {status}"))),
    }

    let text = resp
      .text()
      .await
      .map_err(|e| AuthError::Network(e.to_string()))?;
    let envelope: Envelope<LoginData> = serde_json::from_str(&text)
      .map_err(|_| AuthError::UpstreamUnavailable("non-JSON login response".into()))?;

    match envelope.data.and_then(|d| d.login).filter(|t| !t.is_empty()) {
      Some(token) => {
        let expires_at = token_expiry(&token);
        if expires_at.is_some_and(|exp| exp <= Utc::now()) {
          tracing::warn!(
            username = %credentials.username,
            "upstream issued an already-expired token"
          );
        }
        Ok(LoginGrant { token, expires_at })
      }
      None => Err(AuthError::InvalidCredentials),
    }
  }

  async fn probe(&self, token: &str) -> Result<Envelope<GuiData>, UpstreamError> {
    self.query(token, json!({ "query": queries::PROBE })).await
  }

  async fn page(
    &self,
    token: &str,
    query: &PageQuery,
  ) -> Result<Envelope<PageData>, UpstreamError> {
    let body = json!({
      "operationName": "getPage",
      "variables": { "name": query.name, "params": query.params },
      "query": queries::GET_PAGE,
    });
    self.query(token, body).await
  }
}
