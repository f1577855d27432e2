//! Error types for `klh-core`.
//!
//! Every service operation returns [`Result`]; nothing is thrown past the
//! service boundary. The `Display` text is the human-readable message shown
//! next to the form that caused it.

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum Error {
  /// A required field is missing or malformed. Raised before any write.
  #[error("{0}")]
  Validation(String),

  #[error("sign in required")]
  Unauthenticated,

  /// A role or ownership rule was violated.
  #[error("forbidden: {0}")]
  Forbidden(String),

  #[error("{0}")]
  InvalidStateTransition(String),

  #[error("event {event_id} already took place on {event_date}")]
  EventExpired {
    event_id:   Uuid,
    event_date: DateTime<Utc>,
  },

  #[error("item not found: {0}")]
  ItemNotFound(Uuid),

  #[error("event not found: {0}")]
  EventNotFound(Uuid),

  /// A uniqueness rule outside the claim/enroll model, e.g. an email that is
  /// already registered.
  #[error("conflict: {0}")]
  Conflict(String),

  #[error("write failed: {0}")]
  WriteFailure(#[source] BoxError),

  #[error("read failed: {0}")]
  ReadFailure(#[source] BoxError),
}

impl Error {
  pub fn validation(msg: impl Into<String>) -> Self { Self::Validation(msg.into()) }

  pub fn forbidden(msg: impl Into<String>) -> Self { Self::Forbidden(msg.into()) }

  pub fn write<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::WriteFailure(Box::new(e))
  }

  pub fn read<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::ReadFailure(Box::new(e))
  }

  /// Stable snake_case discriminant, used as the `kind` field of API errors.
  pub fn kind(&self) -> &'static str {
    match self {
      Self::Validation(_) => "validation",
      Self::Unauthenticated => "unauthenticated",
      Self::Forbidden(_) => "forbidden",
      Self::InvalidStateTransition(_) => "invalid_state_transition",
      Self::EventExpired { .. } => "event_expired",
      Self::ItemNotFound(_) => "item_not_found",
      Self::EventNotFound(_) => "event_not_found",
      Self::Conflict(_) => "conflict",
      Self::WriteFailure(_) => "write_failure",
      Self::ReadFailure(_) => "read_failure",
    }
  }

  /// True when the store failed rather than the request being refused.
  pub fn is_store_failure(&self) -> bool {
    matches!(self, Self::WriteFailure(_) | Self::ReadFailure(_))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Trim `value` and reject it if nothing is left.
pub(crate) fn required(field: &str, value: &str) -> Result<String> {
  let trimmed = value.trim();
  if trimmed.is_empty() {
    return Err(Error::Validation(format!("{field} is required")));
  }
  Ok(trimmed.to_owned())
}
