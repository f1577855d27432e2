//! `POST /feedback`: body `{"subject","category","message"}`; 201 + receipt.

use axum::{
  Json,
  extract::{State, rejection::JsonRejection},
  http::StatusCode,
  response::IntoResponse,
};
use klh_core::{
  service::feedback::FeedbackSubmission,
  store::{AccountStore, CampusStore},
};

use crate::{ApiState, error::ApiError};

pub async fn submit<S>(
  State(state): State<ApiState<S>>,
  body: Result<Json<FeedbackSubmission>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CampusStore + AccountStore + 'static,
{
  let Json(submission) = body?;
  let receipt = state.feedback.submit(submission)?;
  Ok((StatusCode::CREATED, Json(receipt)))
}
