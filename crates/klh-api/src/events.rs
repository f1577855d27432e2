//! Handlers for `/events` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/events` | Soonest first |
//! | `GET`  | `/events/live` | Server-sent `events` events, one per change |
//! | `POST` | `/events` | Body: [`EventDraft`]; Faculty or Admin; 201 |
//! | `GET`  | `/events/{id}` | 404 if not found |
//! | `POST` | `/events/{id}/enroll` | Students only, before the event date |
//! | `GET`  | `/events/{id}/enrollments` | Poster or Admin |

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
  event::{Enrollment, Event, EventDraft},
  store::{AccountStore, CampusStore},
};
use uuid::Uuid;

use crate::{ApiState, auth::CurrentSession, error::ApiError};

/// `GET /events`
pub async fn list<S>(State(state): State<ApiState<S>>) -> Result<Json<Vec<Event>>, ApiError>
where
  S: CampusStore + AccountStore + 'static,
{
  Ok(Json(state.events.events().await?))
}

/// `GET /events/live`
pub async fn live<S>(
  State(state): State<ApiState<S>>,
) -> Result<Sse<impl Stream<Item = Result<SseEvent, Infallible>>>, ApiError>
where
  S: CampusStore + AccountStore + 'static,
{
  let subscription = state.events.list_events().await?;
  let stream = stream::unfold(subscription, |mut subscription| async move {
    let Some(events) = subscription.next().await else {
      tracing::warn!("event feed closed");
      return None;
    };
    Some((Ok(crate::sse_json("events", &events)), subscription))
  });
  Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

/// `POST /events`
pub async fn post<S>(
  State(state): State<ApiState<S>>,
  current: CurrentSession,
  body: Result<Json<EventDraft>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CampusStore + AccountStore + 'static,
{
  let Json(draft) = body?;
  let event = state.events.post_event(&current.session, &draft).await?;
  Ok((StatusCode::CREATED, Json(event)))
}

/// `GET /events/{id}`
pub async fn get_one<S>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Event>, ApiError>
where
  S: CampusStore + AccountStore + 'static,
{
  Ok(Json(state.events.get_event(id).await?))
}

/// `POST /events/{id}/enroll`
pub async fn enroll<S>(
  State(state): State<ApiState<S>>,
  current: CurrentSession,
  Path(id): Path<Uuid>,
) -> Result<Json<Event>, ApiError>
where
  S: CampusStore + AccountStore + 'static,
{
  Ok(Json(state.events.enroll(&current.session, id).await?))
}

/// `GET /events/{id}/enrollments`
pub async fn enrollments<S>(
  State(state): State<ApiState<S>>,
  current: CurrentSession,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<Enrollment>>, ApiError>
where
  S: CampusStore + AccountStore + 'static,
{
  Ok(Json(state.events.view_enrollments(&current.session, id).await?))
}
