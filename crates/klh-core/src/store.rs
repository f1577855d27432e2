//! The store traits and the conditional-write result type.
//!
//! Backends (e.g. `klh-store-sqlite`) implement these; the services in
//! [`crate::service`] depend only on the traits. Every method is one atomic
//! store operation. Conditional writes check their precondition and apply
//! their change in the same operation, so two racing callers cannot both see
//! the precondition hold.
//!
//! All methods return `Send` futures so services can run inside axum
//! handlers on a multi-threaded runtime.

use std::future::Future;

use uuid::Uuid;

use crate::{
  account::{Account, Credentials, NewAccount},
  event::{Enrollment, Event, NewEvent},
  item::{Claimant, Item, NewItem},
  live::{Snapshot, Subscription},
  session::Role,
};

/// Result of a write that only applies if the stored document still matches
/// what the caller decided against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Conditional<T> {
  Applied(T),
  /// The document exists but no longer satisfies the precondition.
  PreconditionFailed,
  NotFound,
}

// ─── Campus collections ──────────────────────────────────────────────────────

pub trait CampusStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Items ─────────────────────────────────────────────────────────────

  /// Persist a new item. The store assigns `id` and `reported_at`; the item
  /// starts unclaimed.
  fn insert_item(
    &self,
    item: NewItem,
  ) -> impl Future<Output = Result<Item, Self::Error>> + Send + '_;

  fn get_item(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Item>, Self::Error>> + Send + '_;

  /// All items, in no particular order.
  fn list_items(
    &self,
  ) -> impl Future<Output = Result<Vec<Item>, Self::Error>> + Send + '_;

  /// Mark an item claimed by `claimant`, stamping `claimed_at`, only if it is
  /// still unclaimed.
  fn claim_item(
    &self,
    id: Uuid,
    claimant: Claimant,
  ) -> impl Future<Output = Result<Conditional<Item>, Self::Error>> + Send + '_;

  /// Live view of all items.
  fn watch_items(
    &self,
  ) -> impl Future<Output = Result<Subscription<Snapshot<Item>>, Self::Error>>
  + Send
  + '_;

  // ── Events ────────────────────────────────────────────────────────────

  /// Persist a new event with no enrollments. The store assigns `id` and
  /// `created_at`.
  fn insert_event(
    &self,
    event: NewEvent,
  ) -> impl Future<Output = Result<Event, Self::Error>> + Send + '_;

  fn get_event(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Event>, Self::Error>> + Send + '_;

  /// All events with their enrollments, in no particular order.
  fn list_events(
    &self,
  ) -> impl Future<Output = Result<Vec<Event>, Self::Error>> + Send + '_;

  /// Append `enrollment` to the event's roster, only if its uid is not
  /// already there, and refresh `last_updated` in the same operation.
  fn append_enrollment(
    &self,
    event_id: Uuid,
    enrollment: Enrollment,
  ) -> impl Future<Output = Result<Conditional<Event>, Self::Error>> + Send + '_;

  /// Live view of all events.
  fn watch_events(
    &self,
  ) -> impl Future<Output = Result<Subscription<Snapshot<Event>>, Self::Error>>
  + Send
  + '_;
}

// ─── Accounts and sessions ───────────────────────────────────────────────────

pub trait AccountStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Create an account. `PreconditionFailed` if the email is taken.
  fn create_account(
    &self,
    account: NewAccount,
  ) -> impl Future<Output = Result<Conditional<Account>, Self::Error>> + Send + '_;

  fn get_account<'a>(
    &'a self,
    uid: &'a str,
  ) -> impl Future<Output = Result<Option<Account>, Self::Error>> + Send + 'a;

  fn find_credentials<'a>(
    &'a self,
    email: &'a str,
  ) -> impl Future<Output = Result<Option<Credentials>, Self::Error>> + Send + 'a;

  /// Set name and role, only if the account has no role yet.
  fn complete_profile<'a>(
    &'a self,
    uid: &'a str,
    name: String,
    role: Role,
  ) -> impl Future<Output = Result<Conditional<Account>, Self::Error>> + Send + 'a;

  /// Remember a session token by its digest.
  fn create_session<'a>(
    &'a self,
    token_digest: String,
    uid: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// The account a session token digest belongs to, if any.
  fn resolve_session<'a>(
    &'a self,
    token_digest: &'a str,
  ) -> impl Future<Output = Result<Option<Account>, Self::Error>> + Send + 'a;

  /// Forget a session. Returns whether it existed.
  fn revoke_session<'a>(
    &'a self,
    token_digest: &'a str,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;
}
