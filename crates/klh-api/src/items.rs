//! Handlers for `/items` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/items` | Current board, `{"lost":[..],"found":[..]}` |
//! | `GET`  | `/items/live` | Server-sent `board` events, one per change |
//! | `POST` | `/items` | Body: [`ItemReport`]; 201 + stored item |
//! | `GET`  | `/items/{id}` | 404 if not found |
//! | `POST` | `/items/{id}/claim` | Body: `{"phone":"..."}` |

use std::convert::Infallible;

use axum::{
  Json,
  extract::{Path, State, rejection::JsonRejection},
  http::StatusCode,
  response::{
    IntoResponse,
    sse::{Event as SseEvent, KeepAlive, Sse},
  },
};
use futures_util::stream::{self, Stream};
use klh_core::{
  item::{Item, ItemBoard, ItemReport},
  store::{AccountStore, CampusStore},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{ApiState, auth::CurrentSession, error::ApiError};

/// `GET /items`
pub async fn board<S>(State(state): State<ApiState<S>>) -> Result<Json<ItemBoard>, ApiError>
where
  S: CampusStore + AccountStore + 'static,
{
  Ok(Json(state.lost_found.board().await?))
}

/// `GET /items/live`
pub async fn live<S>(
  State(state): State<ApiState<S>>,
) -> Result<Sse<impl Stream<Item = Result<SseEvent, Infallible>>>, ApiError>
where
  S: CampusStore + AccountStore + 'static,
{
  let subscription = state.lost_found.list_items().await?;
  let stream = stream::unfold(subscription, |mut subscription| async move {
    let Some(board) = subscription.next().await else {
      tracing::warn!("item feed closed");
      return None;
    };
    Some((Ok(crate::sse_json("board", &board)), subscription))
  });
  Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

/// `POST /items`
pub async fn report<S>(
  State(state): State<ApiState<S>>,
  current: CurrentSession,
  body: Result<Json<ItemReport>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CampusStore + AccountStore + 'static,
{
  let Json(report) = body?;
  let item = state.lost_found.report_item(&current.session, &report).await?;
  Ok((StatusCode::CREATED, Json(item)))
}

/// `GET /items/{id}`
pub async fn get_one<S>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Item>, ApiError>
where
  S: CampusStore + AccountStore + 'static,
{
  Ok(Json(state.lost_found.get_item(id).await?))
}

#[derive(Debug, Deserialize)]
pub struct ClaimForm {
  #[serde(default)]
  pub phone: String,
}

/// `POST /items/{id}/claim`
pub async fn claim<S>(
  State(state): State<ApiState<S>>,
  current: CurrentSession,
  Path(id): Path<Uuid>,
  body: Result<Json<ClaimForm>, JsonRejection>,
) -> Result<Json<Item>, ApiError>
where
  S: CampusStore + AccountStore + 'static,
{
  let Json(form) = body?;
  let item = state
    .lost_found
    .claim_item(&current.session, id, &form.phone)
    .await?;
  Ok(Json(item))
}
