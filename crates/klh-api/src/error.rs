//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  extract::rejection::JsonRejection,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use klh_core::Error as CoreError;
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error(transparent)]
  Core(#[from] CoreError),

  /// The bearer token is malformed, unknown or revoked.
  #[error("invalid or expired session token")]
  InvalidToken,

  #[error("invalid email or password")]
  InvalidCredentials,

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("internal error: {0}")]
  Internal(String),
}

impl From<JsonRejection> for ApiError {
  fn from(rejection: JsonRejection) -> Self { Self::BadRequest(rejection.body_text()) }
}

impl ApiError {
  fn status_and_kind(&self) -> (StatusCode, &'static str) {
    match self {
      ApiError::Core(e) => (core_status(e), e.kind()),
      ApiError::InvalidToken | ApiError::InvalidCredentials => {
        (StatusCode::UNAUTHORIZED, "unauthenticated")
      }
      ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "validation"),
      ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
    }
  }
}

fn core_status(e: &CoreError) -> StatusCode {
  match e {
    CoreError::Validation(_) => StatusCode::BAD_REQUEST,
    CoreError::Unauthenticated => StatusCode::UNAUTHORIZED,
    CoreError::Forbidden(_) => StatusCode::FORBIDDEN,
    CoreError::ItemNotFound(_) | CoreError::EventNotFound(_) => StatusCode::NOT_FOUND,
    CoreError::InvalidStateTransition(_) | CoreError::Conflict(_) => StatusCode::CONFLICT,
    CoreError::EventExpired { .. } => StatusCode::GONE,
    CoreError::WriteFailure(_) | CoreError::ReadFailure(_) => {
      StatusCode::INTERNAL_SERVER_ERROR
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, kind) = self.status_and_kind();
    if status.is_server_error() {
      tracing::error!(error = %self, "request failed");
    } else {
      tracing::debug!(error = %self, %status, "request refused");
    }
    (status, Json(json!({ "error": self.to_string(), "kind": kind }))).into_response()
  }
}

#[cfg(test)]
mod tests {
  use uuid::Uuid;

  use super::*;

  #[test]
  fn statuses_follow_the_error_taxonomy() {
    let cases = [
      (CoreError::validation("x"), StatusCode::BAD_REQUEST),
      (CoreError::Unauthenticated, StatusCode::UNAUTHORIZED),
      (CoreError::forbidden("x"), StatusCode::FORBIDDEN),
      (CoreError::ItemNotFound(Uuid::nil()), StatusCode::NOT_FOUND),
      (CoreError::InvalidStateTransition("x".into()), StatusCode::CONFLICT),
      (
        CoreError::EventExpired {
          event_id:   Uuid::nil(),
          event_date: chrono::Utc::now(),
        },
        StatusCode::GONE,
      ),
    ];
    for (err, status) in cases {
      assert_eq!(ApiError::from(err).into_response().status(), status);
    }
  }
}
