//! Posting events and enrolling in them.

use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Offset as _, Utc};
use uuid::Uuid;

use crate::{
  Error, Result,
  error::required,
  event::{Enrollment, Event, EventDraft, NewEvent, parse_event_date, sort_chronologically},
  live::{Snapshot, Subscription},
  session::{Capability, Session},
  store::{CampusStore, Conditional},
};

// ─── Decisions ───────────────────────────────────────────────────────────────

pub fn decide_post(
  session: &Session,
  draft: &EventDraft,
  campus_offset: FixedOffset,
) -> Result<NewEvent> {
  let poster = session.require(Capability::PostEvents)?;
  Ok(NewEvent {
    title:       required("title", &draft.title)?,
    event_date:  parse_event_date(&draft.event_date, campus_offset)?,
    location:    required("location", &draft.location)?,
    description: required("description", &draft.description)?,
    posted_by:   poster.snapshot(),
  })
}

/// Checks run in a fixed order: role, poster, date, duplicate.
pub fn decide_enrollment(
  event: &Event,
  session: &Session,
  now: DateTime<Utc>,
) -> Result<Enrollment> {
  let student = session.require(Capability::Enroll)?;

  if event.is_posted_by(&student.uid) {
    return Err(Error::forbidden("you cannot enroll in an event you posted"));
  }
  if event.has_passed(now) {
    return Err(Error::EventExpired {
      event_id:   event.id,
      event_date: event.event_date,
    });
  }
  if event.is_enrolled(&student.uid) {
    return Err(already_enrolled());
  }

  Ok(Enrollment {
    uid:         student.uid.clone(),
    name:        student.name.clone(),
    email:       student.email.clone(),
    enrolled_at: now,
  })
}

/// The poster sees their own roster; admins see every roster.
pub fn decide_roster_access(event: &Event, session: &Session) -> Result<()> {
  let viewer = session.require_identity()?;
  if event.is_posted_by(&viewer.uid) || viewer.can(Capability::ViewAnyRoster) {
    Ok(())
  } else {
    Err(Error::forbidden("only the poster can view enrollments"))
  }
}

fn already_enrolled() -> Error { Error::forbidden("you are already enrolled in this event") }

// ─── Service ─────────────────────────────────────────────────────────────────

pub struct EventsService<S> {
  store:         Arc<S>,
  campus_offset: FixedOffset,
}

impl<S> Clone for EventsService<S> {
  fn clone(&self) -> Self {
    Self {
      store:         self.store.clone(),
      campus_offset: self.campus_offset,
    }
  }
}

impl<S: CampusStore> EventsService<S> {
  /// Naive event dates are read as UTC.
  pub fn new(store: Arc<S>) -> Self {
    Self {
      store,
      campus_offset: Utc.fix(),
    }
  }

  /// Read naive event dates (`2025-11-15T10:00`) in `offset` instead of UTC.
  pub fn with_campus_offset(mut self, offset: FixedOffset) -> Self {
    self.campus_offset = offset;
    self
  }

  pub async fn post_event(&self, session: &Session, draft: &EventDraft) -> Result<Event> {
    let new_event = decide_post(session, draft, self.campus_offset)?;
    let event = self.store.insert_event(new_event).await.map_err(Error::write)?;
    tracing::info!(event_id = %event.id, event_date = %event.event_date, "event posted");
    Ok(event)
  }

  pub async fn enroll(&self, session: &Session, event_id: Uuid) -> Result<Event> {
    self.enroll_at(session, event_id, Utc::now()).await
  }

  /// [`enroll`](Self::enroll) with an explicit submission time.
  ///
  /// The store appends only if the uid is absent, so repeating the call never
  /// produces a second record.
  pub async fn enroll_at(
    &self,
    session: &Session,
    event_id: Uuid,
    now: DateTime<Utc>,
  ) -> Result<Event> {
    let event = self.get_event(event_id).await?;
    let enrollment = decide_enrollment(&event, session, now)?;
    let uid = enrollment.uid.clone();

    match self
      .store
      .append_enrollment(event_id, enrollment)
      .await
      .map_err(Error::write)?
    {
      Conditional::Applied(event) => {
        tracing::info!(%event_id, %uid, enrolled = event.enrollments.len(), "enrolled");
        Ok(event)
      }
      Conditional::PreconditionFailed => Err(already_enrolled()),
      Conditional::NotFound => Err(Error::EventNotFound(event_id)),
    }
  }

  /// The roster in append order.
  pub async fn view_enrollments(
    &self,
    session: &Session,
    event_id: Uuid,
  ) -> Result<Vec<Enrollment>> {
    let event = self.get_event(event_id).await?;
    decide_roster_access(&event, session)?;
    Ok(event.enrollments)
  }

  pub async fn get_event(&self, event_id: Uuid) -> Result<Event> {
    self
      .store
      .get_event(event_id)
      .await
      .map_err(Error::read)?
      .ok_or(Error::EventNotFound(event_id))
  }

  /// All events as they are right now, soonest first.
  pub async fn events(&self) -> Result<Vec<Event>> {
    let mut events = self.store.list_events().await.map_err(Error::read)?;
    sort_chronologically(&mut events);
    Ok(events)
  }

  /// Live calendar, soonest first.
  pub async fn list_events(&self) -> Result<Subscription<Snapshot<Event>, Vec<Event>>> {
    let sub = self.store.watch_events().await.map_err(Error::read)?;
    Ok(sub.map(|events: Snapshot<Event>| {
      let mut events = events.as_ref().clone();
      sort_chronologically(&mut events);
      events
    }))
  }
}
