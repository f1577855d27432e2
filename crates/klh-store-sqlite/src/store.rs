//! [`SqliteStore`]: the SQLite implementation of [`CampusStore`] and
//! [`AccountStore`].

use std::{collections::HashMap, path::Path, sync::Arc};

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use tokio::sync::{Mutex, watch};
use uuid::Uuid;

use klh_core::{
  account::{Account, Credentials, NewAccount},
  event::{Enrollment, Event, NewEvent},
  item::{ClaimState, Claimant, Item, NewItem},
  live::{Snapshot, Subscription},
  session::Role,
  store::{AccountStore, CampusStore, Conditional},
};

use crate::{
  Result,
  encode::{
    ACCOUNT_COLUMNS, ENROLLMENT_COLUMNS, EVENT_COLUMNS, ITEM_COLUMNS, RawAccount,
    RawEnrollment, RawEvent, RawItem, encode_dt, encode_role, encode_uuid,
  },
  error::Error,
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// The campus store backed by a single SQLite file.
///
/// Cloning is cheap; clones share the connection and the live channels.
#[derive(Clone)]
pub struct SqliteStore {
  conn:    tokio_rusqlite::Connection,
  items:   Arc<watch::Sender<Snapshot<Item>>>,
  events:  Arc<watch::Sender<Snapshot<Event>>>,
  /// Serializes load-and-publish so an older snapshot never overwrites a
  /// newer one.
  refresh: Arc<Mutex<()>>,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    Self::init(conn).await
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    Self::init(conn).await
  }

  async fn init(conn: tokio_rusqlite::Connection) -> Result<Self> {
    conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(Self {
      conn,
      items: Arc::new(watch::Sender::new(Arc::default())),
      events: Arc::new(watch::Sender::new(Arc::default())),
      refresh: Arc::new(Mutex::new(())),
    })
  }

  // ── Live views ────────────────────────────────────────────────────────

  async fn publish_items(&self) -> Result<()> {
    let _guard = self.refresh.lock().await;
    let items = self.load_items().await?;
    self.items.send_replace(Arc::new(items));
    Ok(())
  }

  async fn publish_events(&self) -> Result<()> {
    let _guard = self.refresh.lock().await;
    let events = self.load_events().await?;
    self.events.send_replace(Arc::new(events));
    Ok(())
  }

  /// Push a fresh item snapshot to subscribers, if there are any. The write
  /// has already landed, so a failure here only delays the live view.
  async fn items_changed(&self) {
    if self.items.receiver_count() == 0 {
      return;
    }
    if let Err(err) = self.publish_items().await {
      tracing::warn!(%err, "failed to publish item snapshot");
    }
  }

  async fn events_changed(&self) {
    if self.events.receiver_count() == 0 {
      return;
    }
    if let Err(err) = self.publish_events().await {
      tracing::warn!(%err, "failed to publish event snapshot");
    }
  }

  // ── Loading ───────────────────────────────────────────────────────────

  /// Every decodable item. Rows that fail to decode are logged and skipped.
  async fn load_items(&self) -> Result<Vec<Item>> {
    let raws: Vec<RawItem> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!("SELECT {ITEM_COLUMNS} FROM items"))?;
        let rows = stmt
          .query_map([], RawItem::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(keep_decodable(raws, RawItem::into_item, "item"))
  }

  async fn load_events(&self) -> Result<Vec<Event>> {
    let raws: Vec<RawEvent> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!("SELECT {EVENT_COLUMNS} FROM events"))?;
        let mut events = stmt
          .query_map([], RawEvent::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut stmt = conn.prepare(&format!(
          "SELECT {ENROLLMENT_COLUMNS} FROM enrollments ORDER BY seq"
        ))?;
        let mut rosters: HashMap<String, Vec<RawEnrollment>> = HashMap::new();
        for enrollment in stmt.query_map([], RawEnrollment::from_row)? {
          let enrollment = enrollment?;
          rosters
            .entry(enrollment.event_id.clone())
            .or_default()
            .push(enrollment);
        }

        for event in &mut events {
          event.enrollments = rosters.remove(&event.event_id).unwrap_or_default();
        }
        Ok(events)
      })
      .await?;

    Ok(keep_decodable(raws, RawEvent::into_event, "event"))
  }
}

fn keep_decodable<R, T>(
  raws: Vec<R>,
  decode: impl Fn(R) -> Result<T>,
  what: &str,
) -> Vec<T> {
  raws
    .into_iter()
    .filter_map(|raw| match decode(raw) {
      Ok(value) => Some(value),
      Err(err) => {
        tracing::warn!(%err, "skipping undecodable {what} row");
        None
      }
    })
    .collect()
}

fn select_item(
  conn: &rusqlite::Connection,
  id: &str,
) -> rusqlite::Result<Option<RawItem>> {
  conn
    .query_row(
      &format!("SELECT {ITEM_COLUMNS} FROM items WHERE item_id = ?1"),
      rusqlite::params![id],
      RawItem::from_row,
    )
    .optional()
}

fn select_event(
  conn: &rusqlite::Connection,
  id: &str,
) -> rusqlite::Result<Option<RawEvent>> {
  let Some(mut event) = conn
    .query_row(
      &format!("SELECT {EVENT_COLUMNS} FROM events WHERE event_id = ?1"),
      rusqlite::params![id],
      RawEvent::from_row,
    )
    .optional()?
  else {
    return Ok(None);
  };

  let mut stmt = conn.prepare(&format!(
    "SELECT {ENROLLMENT_COLUMNS} FROM enrollments WHERE event_id = ?1 ORDER BY seq"
  ))?;
  event.enrollments = stmt
    .query_map(rusqlite::params![id], RawEnrollment::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(Some(event))
}

fn select_account(
  conn: &rusqlite::Connection,
  uid: &str,
) -> rusqlite::Result<Option<RawAccount>> {
  conn
    .query_row(
      &format!("SELECT {ACCOUNT_COLUMNS} FROM users WHERE uid = ?1"),
      rusqlite::params![uid],
      RawAccount::from_row,
    )
    .optional()
}

fn exists(conn: &rusqlite::Connection, sql: &str, key: &str) -> rusqlite::Result<bool> {
  Ok(
    conn
      .query_row(sql, rusqlite::params![key], |_| Ok(()))
      .optional()?
      .is_some(),
  )
}

fn decode_conditional<R, T>(
  outcome: Conditional<R>,
  decode: impl FnOnce(R) -> Result<T>,
) -> Result<Conditional<T>> {
  Ok(match outcome {
    Conditional::Applied(raw) => Conditional::Applied(decode(raw)?),
    Conditional::PreconditionFailed => Conditional::PreconditionFailed,
    Conditional::NotFound => Conditional::NotFound,
  })
}

// ─── CampusStore impl ────────────────────────────────────────────────────────

impl CampusStore for SqliteStore {
  type Error = Error;

  // ── Items ─────────────────────────────────────────────────────────────

  async fn insert_item(&self, new: NewItem) -> Result<Item> {
    let reported_at = Utc::now();
    let item = Item {
      id:          Uuid::new_v4(),
      kind:        new.kind,
      name:        new.name,
      description: new.description,
      location:    new.location,
      reported_by: new.reported_by,
      reported_at: Some(reported_at),
      claim:       ClaimState::Unclaimed,
    };

    let id_str = encode_uuid(item.id);
    let kind_str = item.kind.as_ref().to_owned();
    let name = item.name.clone();
    let description = item.description.clone();
    let location = item.location.clone();
    let reporter = item.reported_by.clone();
    let at_str = encode_dt(reported_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO items (
             item_id, kind, name, description, location,
             reporter_uid, reporter_name, reporter_email, reported_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
          rusqlite::params![
            id_str,
            kind_str,
            name,
            description,
            location,
            reporter.uid,
            reporter.name,
            reporter.email,
            at_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    self.items_changed().await;
    Ok(item)
  }

  async fn get_item(&self, id: Uuid) -> Result<Option<Item>> {
    let id_str = encode_uuid(id);
    let raw = self
      .conn
      .call(move |conn| Ok(select_item(conn, &id_str)?))
      .await?;
    raw.map(RawItem::into_item).transpose()
  }

  async fn list_items(&self) -> Result<Vec<Item>> { self.load_items().await }

  async fn claim_item(&self, id: Uuid, claimant: Claimant) -> Result<Conditional<Item>> {
    let id_str = encode_uuid(id);
    let at_str = encode_dt(Utc::now());

    let outcome = self
      .conn
      .call(move |conn| {
        let changed = conn.execute(
          "UPDATE items
           SET status = 'claimed',
               claimant_uid = ?2, claimant_name = ?3,
               claimant_email = ?4, claimant_phone = ?5,
               claimed_at = ?6
           WHERE item_id = ?1 AND status = 'unclaimed'",
          rusqlite::params![
            id_str,
            claimant.uid,
            claimant.name,
            claimant.email,
            claimant.phone,
            at_str,
          ],
        )?;

        if changed == 0 {
          let present = exists(conn, "SELECT 1 FROM items WHERE item_id = ?1", &id_str)?;
          return Ok(if present {
            Conditional::PreconditionFailed
          } else {
            Conditional::NotFound
          });
        }
        Ok(match select_item(conn, &id_str)? {
          Some(raw) => Conditional::Applied(raw),
          None => Conditional::NotFound,
        })
      })
      .await?;

    let outcome = decode_conditional(outcome, RawItem::into_item)?;
    if matches!(outcome, Conditional::Applied(_)) {
      self.items_changed().await;
    }
    Ok(outcome)
  }

  async fn watch_items(&self) -> Result<Subscription<Snapshot<Item>>> {
    let rx = self.items.subscribe();
    self.publish_items().await?;
    Ok(Subscription::new(rx))
  }

  // ── Events ────────────────────────────────────────────────────────────

  async fn insert_event(&self, new: NewEvent) -> Result<Event> {
    let created_at = Utc::now();
    let event = Event {
      id:           Uuid::new_v4(),
      title:        new.title,
      event_date:   new.event_date,
      location:     new.location,
      description:  new.description,
      posted_by:    new.posted_by,
      created_at:   Some(created_at),
      enrollments:  Vec::new(),
      last_updated: None,
    };

    let id_str = encode_uuid(event.id);
    let title = event.title.clone();
    let date_str = encode_dt(event.event_date);
    let location = event.location.clone();
    let description = event.description.clone();
    let poster = event.posted_by.clone();
    let created_str = encode_dt(created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO events (
             event_id, title, event_date, location, description,
             poster_uid, poster_name, poster_email, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
          rusqlite::params![
            id_str,
            title,
            date_str,
            location,
            description,
            poster.uid,
            poster.name,
            poster.email,
            created_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    self.events_changed().await;
    Ok(event)
  }

  async fn get_event(&self, id: Uuid) -> Result<Option<Event>> {
    let id_str = encode_uuid(id);
    let raw = self
      .conn
      .call(move |conn| Ok(select_event(conn, &id_str)?))
      .await?;
    raw.map(RawEvent::into_event).transpose()
  }

  async fn list_events(&self) -> Result<Vec<Event>> { self.load_events().await }

  async fn append_enrollment(
    &self,
    event_id: Uuid,
    enrollment: Enrollment,
  ) -> Result<Conditional<Event>> {
    let id_str = encode_uuid(event_id);
    let enrolled_str = encode_dt(enrollment.enrolled_at);
    let updated_str = encode_dt(Utc::now());

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        if !exists(&tx, "SELECT 1 FROM events WHERE event_id = ?1", &id_str)? {
          return Ok(Conditional::NotFound);
        }

        let inserted = tx.execute(
          "INSERT INTO enrollments (event_id, uid, name, email, enrolled_at)
           VALUES (?1, ?2, ?3, ?4, ?5)
           ON CONFLICT (event_id, uid) DO NOTHING",
          rusqlite::params![
            id_str,
            enrollment.uid,
            enrollment.name,
            enrollment.email,
            enrolled_str,
          ],
        )?;
        if inserted == 0 {
          return Ok(Conditional::PreconditionFailed);
        }

        tx.execute(
          "UPDATE events SET last_updated = ?2 WHERE event_id = ?1",
          rusqlite::params![id_str, updated_str],
        )?;
        let event = select_event(&tx, &id_str)?;
        tx.commit()?;

        Ok(match event {
          Some(raw) => Conditional::Applied(raw),
          None => Conditional::NotFound,
        })
      })
      .await?;

    let outcome = decode_conditional(outcome, RawEvent::into_event)?;
    if matches!(outcome, Conditional::Applied(_)) {
      self.events_changed().await;
    }
    Ok(outcome)
  }

  async fn watch_events(&self) -> Result<Subscription<Snapshot<Event>>> {
    let rx = self.events.subscribe();
    self.publish_events().await?;
    Ok(Subscription::new(rx))
  }
}

// ─── AccountStore impl ───────────────────────────────────────────────────────

impl AccountStore for SqliteStore {
  type Error = Error;

  async fn create_account(&self, new: NewAccount) -> Result<Conditional<Account>> {
    let account = Account {
      uid:        Uuid::new_v4().simple().to_string(),
      name:       new.name,
      email:      new.email,
      role:       new.role,
      created_at: Utc::now(),
    };

    let uid = account.uid.clone();
    let name = account.name.clone();
    let email = account.email.clone();
    let role = account.role.map(encode_role);
    let at_str = encode_dt(account.created_at);
    let hash = new.password_hash;

    let inserted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "INSERT INTO users (uid, name, email, role, password_hash, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)
           ON CONFLICT (email) DO NOTHING",
          rusqlite::params![uid, name, email, role, hash, at_str],
        )?)
      })
      .await?;

    Ok(if inserted == 0 {
      Conditional::PreconditionFailed
    } else {
      Conditional::Applied(account)
    })
  }

  async fn get_account<'a>(&'a self, uid: &'a str) -> Result<Option<Account>> {
    let uid = uid.to_owned();
    let raw = self
      .conn
      .call(move |conn| Ok(select_account(conn, &uid)?))
      .await?;
    raw.map(RawAccount::into_account).transpose()
  }

  async fn find_credentials<'a>(&'a self, email: &'a str) -> Result<Option<Credentials>> {
    let email = email.to_owned();
    let raw = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {ACCOUNT_COLUMNS} FROM users WHERE email = ?1"),
              rusqlite::params![email],
              RawAccount::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw
      .map(|raw| {
        let (account, password_hash) = raw.into_parts()?;
        Ok(Credentials { account, password_hash })
      })
      .transpose()
  }

  async fn complete_profile<'a>(
    &'a self,
    uid: &'a str,
    name: String,
    role: Role,
  ) -> Result<Conditional<Account>> {
    let uid = uid.to_owned();
    let role_str = encode_role(role);

    let outcome = self
      .conn
      .call(move |conn| {
        let changed = conn.execute(
          "UPDATE users SET name = ?2, role = ?3 WHERE uid = ?1 AND role IS NULL",
          rusqlite::params![uid, name, role_str],
        )?;
        if changed == 0 {
          let present = exists(conn, "SELECT 1 FROM users WHERE uid = ?1", &uid)?;
          return Ok(if present {
            Conditional::PreconditionFailed
          } else {
            Conditional::NotFound
          });
        }
        Ok(match select_account(conn, &uid)? {
          Some(raw) => Conditional::Applied(raw),
          None => Conditional::NotFound,
        })
      })
      .await?;

    decode_conditional(outcome, RawAccount::into_account)
  }

  async fn create_session<'a>(&'a self, token_digest: String, uid: &'a str) -> Result<()> {
    let uid = uid.to_owned();
    let at_str = encode_dt(Utc::now());
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO sessions (token_digest, uid, created_at) VALUES (?1, ?2, ?3)",
          rusqlite::params![token_digest, uid, at_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn resolve_session<'a>(&'a self, token_digest: &'a str) -> Result<Option<Account>> {
    let digest = token_digest.to_owned();
    let raw = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT u.uid, u.name, u.email, u.role, u.created_at, u.password_hash
               FROM sessions s JOIN users u ON u.uid = s.uid
               WHERE s.token_digest = ?1",
              rusqlite::params![digest],
              RawAccount::from_row,
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawAccount::into_account).transpose()
  }

  async fn revoke_session<'a>(&'a self, token_digest: &'a str) -> Result<bool> {
    let digest = token_digest.to_owned();
    let removed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM sessions WHERE token_digest = ?1",
          rusqlite::params![digest],
        )?)
      })
      .await?;
    Ok(removed > 0)
  }
}
