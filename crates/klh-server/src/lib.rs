//! HTTP server for KLH Connect.
//!
//! Composes the portal API (under `/api/v1`), the optional mock fixture
//! endpoints, request tracing and CORS into one axum [`Router`].

pub mod mock;

use std::path::{Path, PathBuf};

use axum::{
  Router,
  http::{HeaderValue, Method, header},
};
use chrono::FixedOffset;
use klh_api::{ApiState, api_router};
use klh_core::{
  account::{DEFAULT_EMAIL_DOMAIN, RegistrationRules},
  store::{AccountStore, CampusStore},
};
use serde::Deserialize;
use thiserror::Error;
use tower_http::{
  cors::{Any, CorsLayer},
  trace::TraceLayer,
};

pub use mock::MockConfig;

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and `KLH_*`
/// environment variables. Every key is optional.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
  pub host:                      String,
  pub port:                      u16,
  /// SQLite file, or `:memory:` for a throwaway store.
  pub store_path:                PathBuf,
  pub email_domain:              String,
  /// Offset used to read event dates that carry no offset of their own.
  pub campus_utc_offset_minutes: i32,
  pub mock:                      MockConfig,
  /// Allowed browser origin; `*` allows any, empty disables CORS.
  pub cors_origin:               Option<String>,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:                      "127.0.0.1".to_owned(),
      port:                      5000,
      store_path:                PathBuf::from(":memory:"),
      email_domain:              DEFAULT_EMAIL_DOMAIN.to_owned(),
      campus_utc_offset_minutes: 0,
      mock:                      MockConfig::default(),
      cors_origin:               Some("http://localhost:5173".to_owned()),
    }
  }
}

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("campus_utc_offset_minutes {0} is out of range")]
  InvalidOffset(i32),

  #[error("cors_origin {0:?} is not a valid header value")]
  InvalidCorsOrigin(String),

  #[error(transparent)]
  Load(#[from] config::ConfigError),
}

impl ServerConfig {
  pub fn is_in_memory(&self) -> bool { self.store_path.as_os_str() == ":memory:" }

  pub fn campus_offset(&self) -> Result<FixedOffset, ConfigError> {
    self
      .campus_utc_offset_minutes
      .checked_mul(60)
      .and_then(FixedOffset::east_opt)
      .ok_or(ConfigError::InvalidOffset(self.campus_utc_offset_minutes))
  }

  pub fn registration_rules(&self) -> RegistrationRules {
    RegistrationRules::for_domain(self.email_domain.clone())
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

/// Read `path` (if it exists) overlaid with `KLH_*` environment variables.
/// Nested keys use a double underscore, e.g. `KLH_MOCK__ENABLED=false`.
pub fn load_config(path: &Path) -> Result<ServerConfig, ConfigError> {
  let settings = config::Config::builder()
    .add_source(config::File::from(path).required(false))
    .add_source(
      config::Environment::with_prefix("KLH")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true),
    )
    .build()?;
  Ok(settings.try_deserialize()?)
}

// ─── Router ──────────────────────────────────────────────────────────────────

fn cors_layer(origin: &str) -> Result<CorsLayer, ConfigError> {
  let layer = CorsLayer::new()
    .allow_methods([Method::GET, Method::POST, Method::PUT])
    .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);
  if origin == "*" {
    return Ok(layer.allow_origin(Any));
  }
  let origin = HeaderValue::from_str(origin)
    .map_err(|_| ConfigError::InvalidCorsOrigin(origin.to_owned()))?;
  Ok(layer.allow_origin(origin))
}

/// Build the full application router.
pub fn router<S>(state: ApiState<S>, config: &ServerConfig) -> Result<Router, ConfigError>
where
  S: CampusStore + AccountStore + 'static,
{
  let mut app = Router::new().nest("/api/v1", api_router(state));
  if config.mock.enabled {
    app = app.merge(mock::router(config.mock.clone()));
  }
  if let Some(origin) = config.cors_origin.as_deref().filter(|o| !o.is_empty()) {
    app = app.layer(cors_layer(origin)?);
  }
  Ok(app.layer(TraceLayer::new_for_http()))
}

// ─── Integration tests ───────────────────────────────────────────────────────
