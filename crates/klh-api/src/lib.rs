//! JSON API for KLH Connect.
//!
//! Exposes an axum [`Router`] backed by any store implementing both
//! [`CampusStore`] and [`AccountStore`]. TLS and CORS are the caller's
//! responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api/v1", klh_api::api_router(ApiState::new(store.clone())))
//! ```

pub mod auth;
pub mod error;
pub mod events;
pub mod feedback;
pub mod items;

use std::sync::Arc;

use axum::{
  Router,
  response::sse::Event as SseEvent,
  routing::{get, post, put},
};
use chrono::FixedOffset;
use klh_core::{
  account::RegistrationRules,
  service::{EventsService, FeedbackService, LostFoundService},
  store::{AccountStore, CampusStore},
};
use serde::Serialize;

pub use error::ApiError;

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all handlers.
pub struct ApiState<S> {
  pub store:        Arc<S>,
  pub lost_found:   LostFoundService<S>,
  pub events:       EventsService<S>,
  pub feedback:     FeedbackService,
  pub registration: Arc<RegistrationRules>,
}

impl<S> Clone for ApiState<S> {
  fn clone(&self) -> Self {
    Self {
      store:        self.store.clone(),
      lost_found:   self.lost_found.clone(),
      events:       self.events.clone(),
      feedback:     self.feedback,
      registration: self.registration.clone(),
    }
  }
}

impl<S> ApiState<S>
where
  S: CampusStore + AccountStore + 'static,
{
  /// State with the default registration rules and naive event dates read
  /// as UTC.
  pub fn new(store: Arc<S>) -> Self {
    Self {
      lost_found: LostFoundService::new(store.clone()),
      events: EventsService::new(store.clone()),
      feedback: FeedbackService,
      registration: Arc::new(RegistrationRules::default()),
      store,
    }
  }

  pub fn with_registration_rules(mut self, rules: RegistrationRules) -> Self {
    self.registration = Arc::new(rules);
    self
  }

  pub fn with_campus_offset(mut self, offset: FixedOffset) -> Self {
    self.events = self.events.with_campus_offset(offset);
    self
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(state: ApiState<S>) -> Router<()>
where
  S: CampusStore + AccountStore + 'static,
{
  Router::new()
    // Accounts
    .route("/auth/register", post(auth::register::<S>))
    .route("/auth/login", post(auth::login::<S>))
    .route("/auth/logout", post(auth::logout::<S>))
    .route("/auth/me", get(auth::me))
    .route("/auth/profile", put(auth::complete_profile::<S>))
    // Lost & Found
    .route("/items", get(items::board::<S>).post(items::report::<S>))
    .route("/items/live", get(items::live::<S>))
    .route("/items/{id}", get(items::get_one::<S>))
    .route("/items/{id}/claim", post(items::claim::<S>))
    // Events
    .route("/events", get(events::list::<S>).post(events::post::<S>))
    .route("/events/live", get(events::live::<S>))
    .route("/events/{id}", get(events::get_one::<S>))
    .route("/events/{id}/enroll", post(events::enroll::<S>))
    .route("/events/{id}/enrollments", get(events::enrollments::<S>))
    // Feedback
    .route("/feedback", post(feedback::submit::<S>))
    .with_state(state)
}

/// One server-sent event carrying `value` as JSON.
fn sse_json<T: Serialize>(name: &str, value: &T) -> SseEvent {
  match SseEvent::default().event(name).json_data(value) {
    Ok(event) => event,
    Err(err) => {
      tracing::warn!(%err, "failed to encode live snapshot");
      SseEvent::default().event("error").data("snapshot unavailable")
    }
  }
}

// ─── Integration tests ───────────────────────────────────────────────────────
