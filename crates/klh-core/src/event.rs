//! Campus events and their enrollment rosters.

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone as _, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result, item::PersonRef};

/// One student's registration of interest. `enrolled_at` is the time the
/// enrollment was submitted, not a store timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
  pub uid:         String,
  pub name:        String,
  pub email:       String,
  pub enrolled_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
  pub id:           Uuid,
  pub title:        String,
  pub event_date:   DateTime<Utc>,
  pub location:     String,
  pub description:  String,
  pub posted_by:    PersonRef,
  pub created_at:   Option<DateTime<Utc>>,
  /// Append order. Unique by `uid`.
  pub enrollments:  Vec<Enrollment>,
  /// Refreshed by the store with every enrollment append.
  pub last_updated: Option<DateTime<Utc>>,
}

impl Event {
  pub fn is_enrolled(&self, uid: &str) -> bool {
    self.enrollments.iter().any(|e| e.uid == uid)
  }

  pub fn has_passed(&self, now: DateTime<Utc>) -> bool { self.event_date < now }

  pub fn is_posted_by(&self, uid: &str) -> bool { self.posted_by.uid == uid }
}

/// The post-event form as submitted. `event_date` is free text until parsed.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDraft {
  pub title:       String,
  pub event_date:  String,
  pub location:    String,
  pub description: String,
}

/// Input to [`crate::store::CampusStore::insert_event`].
#[derive(Debug, Clone)]
pub struct NewEvent {
  pub title:       String,
  pub event_date:  DateTime<Utc>,
  pub location:    String,
  pub description: String,
  pub posted_by:   PersonRef,
}

/// Formats accepted for a date-time without an offset, as produced by an
/// HTML `datetime-local` input.
const LOCAL_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S"];

/// Parse an event date. RFC 3339 strings carry their own offset; naive local
/// date-times are read in `campus_offset`.
pub fn parse_event_date(
  raw: &str,
  campus_offset: FixedOffset,
) -> Result<DateTime<Utc>> {
  let raw = raw.trim();
  if raw.is_empty() {
    return Err(Error::validation("event date is required"));
  }

  if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
    return Ok(dt.with_timezone(&Utc));
  }

  for format in LOCAL_FORMATS {
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
      return campus_offset
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| {
          Error::Validation(format!("event date {raw:?} is ambiguous"))
        });
    }
  }

  Err(Error::Validation(format!(
    "event date {raw:?} is not a valid date and time"
  )))
}

/// Chronological order, soonest first. Ties break on id so the order is
/// stable across snapshots.
pub fn sort_chronologically(events: &mut [Event]) {
  events.sort_by(|a, b| a.event_date.cmp(&b.event_date).then(a.id.cmp(&b.id)));
}

#[cfg(test)]
mod tests {
  use chrono::Timelike as _;

  use super::*;

  fn ist() -> FixedOffset { FixedOffset::east_opt(330 * 60).unwrap() }

  #[test]
  fn parses_rfc3339() {
    let dt = parse_event_date("2025-11-15T10:00:00Z", ist()).unwrap();
    assert_eq!(dt.hour(), 10);
  }

  #[test]
  fn parses_datetime_local_in_campus_offset() {
    let dt = parse_event_date("2025-11-15T10:00", ist()).unwrap();
    assert_eq!(dt.to_rfc3339(), "2025-11-15T04:30:00+00:00");
  }

  #[test]
  fn rejects_garbage_and_blank() {
    assert!(matches!(
      parse_event_date("next tuesday", ist()),
      Err(Error::Validation(_))
    ));
    assert!(matches!(
      parse_event_date("   ", ist()),
      Err(Error::Validation(_))
    ));
  }
}
