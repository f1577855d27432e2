//! Integration tests for `SqliteStore` against an in-memory database.

use std::sync::Arc;

use chrono::{Duration, SecondsFormat, Utc};
use klh_core::{
  Error as CoreError,
  account::NewAccount,
  event::{Enrollment, EventDraft, NewEvent},
  item::{Claimant, ItemKind, ItemReport, ItemStatus, NewItem, PersonRef},
  service::{EventsService, LostFoundService},
  session::{Identity, Role, Session},
  store::{AccountStore, CampusStore, Conditional},
};
use uuid::Uuid;

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn person(uid: &str) -> PersonRef {
  PersonRef {
    uid:   uid.into(),
    name:  format!("User {uid}"),
    email: format!("{}@klh.edu.in", uid.to_lowercase()),
  }
}

fn session(uid: &str, role: Role) -> Session {
  let p = person(uid);
  Session::signed_in(Identity {
    uid:   p.uid,
    email: p.email,
    name:  p.name,
    role:  Some(role),
  })
}

fn new_item(kind: ItemKind, name: &str, reporter: &str) -> NewItem {
  NewItem {
    kind,
    name: name.into(),
    description: "Steel, dented near the cap".into(),
    location: "Central Library".into(),
    reported_by: person(reporter),
  }
}

fn claimant(uid: &str, phone: &str) -> Claimant {
  let p = person(uid);
  Claimant {
    uid:   p.uid,
    name:  p.name,
    email: p.email,
    phone: phone.into(),
  }
}

fn new_event(poster: &str, starts_in: Duration) -> NewEvent {
  NewEvent {
    title:       "Annual Tech Summit".into(),
    event_date:  Utc::now() + starts_in,
    location:    "Auditorium A".into(),
    description: "Keynotes and demos".into(),
    posted_by:   person(poster),
  }
}

fn enrollment(uid: &str) -> Enrollment {
  let p = person(uid);
  Enrollment {
    uid:         p.uid,
    name:        p.name,
    email:       p.email,
    enrolled_at: Utc::now(),
  }
}

// ─── Items ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn insert_and_get_item() {
  let s = store().await;

  let item = s
    .insert_item(new_item(ItemKind::Found, "Blue Water Bottle", "A"))
    .await
    .unwrap();
  assert_eq!(item.status(), ItemStatus::Unclaimed);
  assert!(item.reported_at.is_some());

  let fetched = s.get_item(item.id).await.unwrap().unwrap();
  assert_eq!(fetched.id, item.id);
  assert_eq!(fetched.kind, ItemKind::Found);
  assert_eq!(fetched.reported_by, person("A"));
  assert_eq!(fetched.claimed_by(), None);
}

#[tokio::test]
async fn get_item_missing_returns_none() {
  let s = store().await;
  assert!(s.get_item(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn claim_applies_once() {
  let s = store().await;
  let item = s
    .insert_item(new_item(ItemKind::Found, "Calculator", "A"))
    .await
    .unwrap();

  let Conditional::Applied(claimed) = s.claim_item(item.id, claimant("B", "555-0100")).await.unwrap()
  else {
    panic!("first claim should apply");
  };
  assert_eq!(claimed.status(), ItemStatus::Claimed);
  assert_eq!(claimed.claimed_by().unwrap().phone, "555-0100");
  assert!(claimed.claimed_at().is_some());

  let second = s.claim_item(item.id, claimant("C", "555-0199")).await.unwrap();
  assert_eq!(second, Conditional::PreconditionFailed);

  let stored = s.get_item(item.id).await.unwrap().unwrap();
  assert_eq!(stored.claimed_by().unwrap().uid, "B");
}

#[tokio::test]
async fn claim_missing_item_is_not_found() {
  let s = store().await;
  let outcome = s.claim_item(Uuid::new_v4(), claimant("B", "1")).await.unwrap();
  assert_eq!(outcome, Conditional::NotFound);
}

#[tokio::test]
async fn watch_items_yields_current_then_changes() {
  let s = store().await;
  s.insert_item(new_item(ItemKind::Lost, "ID Card", "A"))
    .await
    .unwrap();

  let mut sub = s.watch_items().await.unwrap();
  assert_eq!(sub.next().await.unwrap().len(), 1);

  s.insert_item(new_item(ItemKind::Found, "Umbrella", "B"))
    .await
    .unwrap();
  assert_eq!(sub.next().await.unwrap().len(), 2);
}

// ─── Events ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn insert_and_get_event() {
  let s = store().await;
  let event = s.insert_event(new_event("F", Duration::days(3))).await.unwrap();
  assert!(event.enrollments.is_empty());

  let fetched = s.get_event(event.id).await.unwrap().unwrap();
  assert_eq!(fetched.title, "Annual Tech Summit");
  assert_eq!(fetched.posted_by, person("F"));
  assert_eq!(fetched.last_updated, None);
}

#[tokio::test]
async fn enrollments_keep_append_order_and_reject_duplicates() {
  let s = store().await;
  let event = s.insert_event(new_event("F", Duration::days(1))).await.unwrap();

  for uid in ["S3", "S1", "S2"] {
    assert!(matches!(
      s.append_enrollment(event.id, enrollment(uid)).await.unwrap(),
      Conditional::Applied(_)
    ));
  }
  let dup = s.append_enrollment(event.id, enrollment("S1")).await.unwrap();
  assert_eq!(dup, Conditional::PreconditionFailed);

  let stored = s.get_event(event.id).await.unwrap().unwrap();
  let uids: Vec<_> = stored.enrollments.iter().map(|e| e.uid.as_str()).collect();
  assert_eq!(uids, ["S3", "S1", "S2"]);
  assert!(stored.last_updated.is_some());
}

#[tokio::test]
async fn enrollment_on_missing_event_is_not_found() {
  let s = store().await;
  let outcome = s.append_enrollment(Uuid::new_v4(), enrollment("S")).await.unwrap();
  assert_eq!(outcome, Conditional::NotFound);
}

#[tokio::test]
async fn list_events_carries_each_roster() {
  let s = store().await;
  let a = s.insert_event(new_event("F", Duration::days(1))).await.unwrap();
  let b = s.insert_event(new_event("F", Duration::days(2))).await.unwrap();
  s.append_enrollment(b.id, enrollment("S")).await.unwrap();

  let events = s.list_events().await.unwrap();
  assert_eq!(events.len(), 2);
  let roster = |id| {
    events
      .iter()
      .find(|e| e.id == id)
      .map(|e| e.enrollments.len())
  };
  assert_eq!(roster(a.id), Some(0));
  assert_eq!(roster(b.id), Some(1));
}

// ─── Accounts and sessions ───────────────────────────────────────────────────

fn new_account(email: &str, role: Option<Role>) -> NewAccount {
  NewAccount {
    name: "Ravi".into(),
    email: email.into(),
    role,
    password_hash: "$argon2id$stub".into(),
  }
}

#[tokio::test]
async fn duplicate_email_is_refused() {
  let s = store().await;
  let first = s.create_account(new_account("ravi@klh.edu.in", None)).await.unwrap();
  assert!(matches!(first, Conditional::Applied(_)));
  let second = s.create_account(new_account("ravi@klh.edu.in", None)).await.unwrap();
  assert_eq!(second, Conditional::PreconditionFailed);
}

#[tokio::test]
async fn credentials_carry_the_hash() {
  let s = store().await;
  s.create_account(new_account("ravi@klh.edu.in", Some(Role::Student)))
    .await
    .unwrap();

  let creds = s.find_credentials("ravi@klh.edu.in").await.unwrap().unwrap();
  assert_eq!(creds.password_hash, "$argon2id$stub");
  assert_eq!(creds.account.role, Some(Role::Student));
  assert!(s.find_credentials("nobody@klh.edu.in").await.unwrap().is_none());
}

#[tokio::test]
async fn role_is_set_once() {
  let s = store().await;
  let Conditional::Applied(account) =
    s.create_account(new_account("ravi@klh.edu.in", None)).await.unwrap()
  else {
    panic!("account should be created");
  };

  let done = s
    .complete_profile(&account.uid, "Ravi Kumar".into(), Role::Faculty)
    .await
    .unwrap();
  let Conditional::Applied(done) = done else { panic!("profile should complete") };
  assert_eq!(done.role, Some(Role::Faculty));
  assert_eq!(done.name, "Ravi Kumar");

  let again = s
    .complete_profile(&account.uid, "Ravi".into(), Role::Admin)
    .await
    .unwrap();
  assert_eq!(again, Conditional::PreconditionFailed);

  let missing = s.complete_profile("nope", "X".into(), Role::Admin).await.unwrap();
  assert_eq!(missing, Conditional::NotFound);
}

#[tokio::test]
async fn sessions_resolve_until_revoked() {
  let s = store().await;
  let Conditional::Applied(account) =
    s.create_account(new_account("ravi@klh.edu.in", None)).await.unwrap()
  else {
    panic!("account should be created");
  };

  s.create_session("digest-1".into(), &account.uid).await.unwrap();
  let resolved = s.resolve_session("digest-1").await.unwrap().unwrap();
  assert_eq!(resolved.uid, account.uid);

  assert!(s.revoke_session("digest-1").await.unwrap());
  assert!(!s.revoke_session("digest-1").await.unwrap());
  assert!(s.resolve_session("digest-1").await.unwrap().is_none());
}

// ─── Through the services ────────────────────────────────────────────────────

#[tokio::test]
async fn lost_and_found_end_to_end() {
  let store = Arc::new(store().await);
  let service = LostFoundService::new(store);

  let report = ItemReport {
    kind:        ItemKind::Found,
    name:        "Blue Water Bottle".into(),
    description: "Steel".into(),
    location:    "Canteen".into(),
  };
  let item = service.report_item(&session("A", Role::Student), &report).await.unwrap();

  let board = service.board().await.unwrap();
  assert!(board.lost.is_empty());
  assert_eq!(board.found.len(), 1);
  assert_eq!(board.found[0].status(), ItemStatus::Unclaimed);

  let claimed = service
    .claim_item(&session("B", Role::Student), item.id, "555-0100")
    .await
    .unwrap();
  assert_eq!(claimed.status(), ItemStatus::Claimed);
  assert_eq!(claimed.claimed_by().unwrap().phone, "555-0100");

  let err = service
    .claim_item(&session("C", Role::Student), item.id, "555-0199")
    .await
    .unwrap_err();
  assert!(matches!(err, CoreError::InvalidStateTransition(_)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_claims_have_one_winner() {
  let store = Arc::new(store().await);
  let service = LostFoundService::new(store.clone());
  let item = store
    .insert_item(new_item(ItemKind::Found, "Headphones", "A"))
    .await
    .unwrap();

  let attempts: Vec<_> = ["B", "C", "D", "E"]
    .into_iter()
    .map(|uid| {
      let service = service.clone();
      tokio::spawn(async move {
        service
          .claim_item(&session(uid, Role::Student), item.id, "555-0100")
          .await
      })
    })
    .collect();

  let mut winners = 0;
  for attempt in attempts {
    match attempt.await.unwrap() {
      Ok(_) => winners += 1,
      Err(err) => assert!(matches!(err, CoreError::InvalidStateTransition(_))),
    }
  }
  assert_eq!(winners, 1);
}

#[tokio::test]
async fn live_board_stays_partitioned() {
  let store = Arc::new(store().await);
  let service = LostFoundService::new(store.clone());
  let mut board = service.list_items().await.unwrap();
  assert!(board.next().await.unwrap().is_empty());

  store.insert_item(new_item(ItemKind::Lost, "Wallet", "A")).await.unwrap();
  store.insert_item(new_item(ItemKind::Found, "Keys", "B")).await.unwrap();

  // Snapshots may be coalesced; wait for the one holding both items.
  let board = loop {
    let board = board.next().await.unwrap();
    if board.len() == 2 {
      break board;
    }
  };
  assert_eq!(board.lost.len(), 1);
  assert_eq!(board.found.len(), 1);
  assert_ne!(board.lost[0].id, board.found[0].id);
}

fn draft_starting_in(offset: Duration) -> EventDraft {
  EventDraft {
    title:       "Guest Lecture on AI".into(),
    event_date:  (Utc::now() + offset).to_rfc3339_opts(SecondsFormat::Secs, true),
    location:    "C-Block Auditorium".into(),
    description: "Two speakers from industry".into(),
  }
}

#[tokio::test]
async fn events_end_to_end() {
  let store = Arc::new(store().await);
  let service = EventsService::new(store);
  let faculty = session("F", Role::Faculty);
  let student = session("S", Role::Student);

  let event = service
    .post_event(&faculty, &draft_starting_in(Duration::hours(1)))
    .await
    .unwrap();

  let enrolled = service.enroll(&student, event.id).await.unwrap();
  assert_eq!(enrolled.enrollments.len(), 1);
  assert_eq!(enrolled.enrollments[0].uid, "S");

  let err = service.enroll(&faculty, event.id).await.unwrap_err();
  assert!(matches!(err, CoreError::Forbidden(_)));

  let after = event.event_date + Duration::minutes(1);
  let err = service
    .enroll_at(&session("S2", Role::Student), event.id, after)
    .await
    .unwrap_err();
  assert!(matches!(err, CoreError::EventExpired { .. }));

  let roster = service.view_enrollments(&faculty, event.id).await.unwrap();
  assert_eq!(roster.len(), 1);
}

#[tokio::test]
async fn enrolling_twice_keeps_one_record() {
  let store = Arc::new(store().await);
  let service = EventsService::new(store);
  let event = service
    .post_event(&session("F", Role::Faculty), &draft_starting_in(Duration::days(2)))
    .await
    .unwrap();
  let student = session("S", Role::Student);

  service.enroll(&student, event.id).await.unwrap();
  let err = service.enroll(&student, event.id).await.unwrap_err();
  assert!(matches!(err, CoreError::Forbidden(_)));

  let event = service.get_event(event.id).await.unwrap();
  assert_eq!(event.enrollments.iter().filter(|e| e.uid == "S").count(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_enrolls_by_one_student_keep_one_record() {
  let store = Arc::new(store().await);
  let service = EventsService::new(store);
  let event = service
    .post_event(&session("F", Role::Faculty), &draft_starting_in(Duration::days(2)))
    .await
    .unwrap();

  let attempts: Vec<_> = (0..4)
    .map(|_| {
      let service = service.clone();
      tokio::spawn(async move { service.enroll(&session("S", Role::Student), event.id).await })
    })
    .collect();

  let mut succeeded = 0;
  for attempt in attempts {
    if attempt.await.unwrap().is_ok() {
      succeeded += 1;
    }
  }
  assert_eq!(succeeded, 1);

  let event = service.get_event(event.id).await.unwrap();
  assert_eq!(event.enrollments.len(), 1);
}

#[tokio::test]
async fn live_calendar_is_chronological() {
  let store = Arc::new(store().await);
  let service = EventsService::new(store.clone());
  store.insert_event(new_event("F", Duration::days(5))).await.unwrap();
  store.insert_event(new_event("F", Duration::days(1))).await.unwrap();

  let mut calendar = service.list_events().await.unwrap();
  let events = calendar.next().await.unwrap();
  assert_eq!(events.len(), 2);
  assert!(events[0].event_date < events[1].event_date);
}
