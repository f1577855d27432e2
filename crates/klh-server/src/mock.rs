//! Fixture endpoints for front-end development, mounted at the root when
//! `mock.enabled` is set.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/` | Plain-text liveness line |
//! | `POST` | `/api/auth/login` | Only `test@klh.com` / `password` succeeds |
//! | `GET`  | `/api/lost-found` | Four fixture items |
//! | `GET`  | `/api/events` | Four fixture events |
//! | `POST` | `/api/feedback` | Same rules as the portal feedback form |
//! | `POST` | `/api/chatbot/query` | Canned keyword replies after a delay |

use std::time::Duration;

use axum::{
  Json, Router,
  extract::State,
  http::StatusCode,
  response::{IntoResponse, Response},
  routing::{get, post},
};
use klh_core::service::{FeedbackService, feedback::FeedbackSubmission};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

pub const MOCK_EMAIL: &str = "test@klh.com";
pub const MOCK_PASSWORD: &str = "password";
pub const MOCK_TOKEN: &str = "mock-jwt-token-12345";

/// `[mock]` section of the server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MockConfig {
  pub enabled:          bool,
  /// Delay before a chatbot reply is sent.
  pub chatbot_delay_ms: u64,
}

impl Default for MockConfig {
  fn default() -> Self {
    Self {
      enabled:          true,
      chatbot_delay_ms: 500,
    }
  }
}

pub fn router(config: MockConfig) -> Router {
  Router::new()
    .route("/", get(root))
    .route("/api/auth/login", post(login))
    .route("/api/lost-found", get(lost_found))
    .route("/api/events", get(events))
    .route("/api/feedback", post(feedback))
    .route("/api/chatbot/query", post(chatbot))
    .with_state(config)
}

fn msg(status: StatusCode, text: impl Into<String>) -> Response {
  (status, Json(json!({ "msg": text.into() }))).into_response()
}

async fn root() -> &'static str { "Mock Server is running!" }

// ─── Login ───────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LoginBody {
  email:    String,
  password: String,
}

async fn login(Json(body): Json<LoginBody>) -> Response {
  if body.email == MOCK_EMAIL && body.password == MOCK_PASSWORD {
    return Json(json!({
      "token": MOCK_TOKEN,
      "user": { "id": 1, "name": "Test Student", "email": body.email, "role": "Student" },
    }))
    .into_response();
  }
  msg(
    StatusCode::UNAUTHORIZED,
    format!("Invalid Credentials (Use {MOCK_EMAIL} / {MOCK_PASSWORD})"),
  )
}

// ─── Fixtures ────────────────────────────────────────────────────────────────

pub fn lost_found_fixtures() -> Value {
  json!([
    { "id": 101, "title": "Blue Backpack", "category": "Bag", "type": "Lost",
      "location": "Library, 2nd Floor", "status": "Lost", "reporter": "Test Student",
      "reportedAt": "2025-10-24" },
    { "id": 102, "title": "Found Apple Watch", "category": "Electronics", "type": "Found",
      "location": "Cafeteria Table 5", "status": "Found", "reporter": "Faculty A",
      "reportedAt": "2025-10-23" },
    { "id": 103, "title": "KLH ID Card (Smith)", "category": "Documents", "type": "Lost",
      "location": "Admin Building", "status": "Lost", "reporter": "Student B",
      "reportedAt": "2025-10-25" },
    { "id": 104, "title": "Black Keys on Lanyard", "category": "Keys", "type": "Lost",
      "location": "Parking Lot B", "status": "Lost", "reporter": "Student C",
      "reportedAt": "2025-10-22" },
  ])
}

pub fn event_fixtures() -> Value {
  json!([
    { "id": 201, "title": "Annual Tech Summit", "date": "2025-11-15",
      "location": "Auditorium A", "creator": "Faculty A", "attendees": 150 },
    { "id": 202, "title": "Career Workshop: Resume Building", "date": "2025-10-30",
      "location": "Conference Hall B", "creator": "Admin", "attendees": 45 },
    { "id": 203, "title": "Robotics Club Meeting", "date": "2025-10-27",
      "location": "Lab 101", "creator": "Student B", "attendees": 22 },
    { "id": 204, "title": "Campus Feedback Session", "date": "2025-11-05",
      "location": "Student Center", "creator": "Admin", "attendees": 80 },
  ])
}

async fn lost_found() -> Json<Value> { Json(lost_found_fixtures()) }

async fn events() -> Json<Value> { Json(event_fixtures()) }

// ─── Feedback ────────────────────────────────────────────────────────────────

async fn feedback(Json(submission): Json<FeedbackSubmission>) -> Response {
  match FeedbackService.submit(submission) {
    Ok(receipt) => (StatusCode::CREATED, Json(receipt)).into_response(),
    Err(err) => msg(StatusCode::BAD_REQUEST, err.to_string()),
  }
}

// ─── Chatbot ─────────────────────────────────────────────────────────────────

const GREETING: &str =
  "I am the KLH Connect AI assistant. How can I help you navigate the campus hub?";

/// Canned reply, chosen by the first keyword found (lost, event, feedback).
pub fn chatbot_reply(message: &str) -> &'static str {
  let message = message.to_lowercase();
  if message.contains("lost") {
    "To report a lost item, please visit the Lost & Found page and submit a new \
     report. We track all non-resolved items in real-time."
  } else if message.contains("event") {
    "You can find all upcoming events, including workshops and club meetings, on \
     the Events page. Use the filter feature to find what you need!"
  } else if message.contains("feedback") {
    "If you have a grievance or feedback, please use the dedicated Feedback \
     submission form available in the main navigation."
  } else {
    GREETING
  }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ChatbotQuery {
  message: String,
}

async fn chatbot(State(config): State<MockConfig>, Json(query): Json<ChatbotQuery>) -> Response {
  if query.message.trim().is_empty() {
    return msg(
      StatusCode::BAD_REQUEST,
      "Message is required for the chatbot query.",
    );
  }

  let reply = chatbot_reply(&query.message);
  tracing::debug!(query = %query.message, reply, "chatbot query");
  tokio::time::sleep(Duration::from_millis(config.chatbot_delay_ms)).await;
  Json(json!({ "response": reply })).into_response()
}
