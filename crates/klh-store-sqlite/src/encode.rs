//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings, UUIDs hyphenated lowercase strings, and
//! enums their lowercase (or, for roles, capitalised) names.

use chrono::{DateTime, Utc};
use klh_core::{
  account::Account,
  event::{Enrollment, Event},
  item::{ClaimState, Claimant, Item, ItemKind, ItemStatus, PersonRef},
  session::Role,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

fn decode_opt_dt(s: Option<&str>) -> Result<Option<DateTime<Utc>>> {
  s.map(decode_dt).transpose()
}

fn decode_kind(s: &str) -> Result<ItemKind> {
  s.parse()
    .map_err(|_| Error::Malformed(format!("unknown item kind: {s:?}")))
}

fn decode_status(s: &str) -> Result<ItemStatus> {
  s.parse()
    .map_err(|_| Error::Malformed(format!("unknown item status: {s:?}")))
}

pub fn encode_role(role: Role) -> &'static str {
  match role {
    Role::Student => "Student",
    Role::Faculty => "Faculty",
    Role::Admin => "Admin",
  }
}

fn decode_role(s: &str) -> Result<Role> {
  s.parse()
    .map_err(|_| Error::Malformed(format!("unknown role: {s:?}")))
}

// ─── Items ───────────────────────────────────────────────────────────────────

pub const ITEM_COLUMNS: &str = "item_id, kind, name, description, location, \
   reporter_uid, reporter_name, reporter_email, reported_at, status, \
   claimant_uid, claimant_name, claimant_email, claimant_phone, claimed_at";

/// Raw strings read directly from an `items` row.
pub struct RawItem {
  pub item_id:        String,
  pub kind:           String,
  pub name:           String,
  pub description:    String,
  pub location:       String,
  pub reporter_uid:   String,
  pub reporter_name:  String,
  pub reporter_email: String,
  pub reported_at:    String,
  pub status:         String,
  pub claimant_uid:   Option<String>,
  pub claimant_name:  Option<String>,
  pub claimant_email: Option<String>,
  pub claimant_phone: Option<String>,
  pub claimed_at:     Option<String>,
}

impl RawItem {
  /// Expects the columns in [`ITEM_COLUMNS`] order.
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      item_id:        row.get(0)?,
      kind:           row.get(1)?,
      name:           row.get(2)?,
      description:    row.get(3)?,
      location:       row.get(4)?,
      reporter_uid:   row.get(5)?,
      reporter_name:  row.get(6)?,
      reporter_email: row.get(7)?,
      reported_at:    row.get(8)?,
      status:         row.get(9)?,
      claimant_uid:   row.get(10)?,
      claimant_name:  row.get(11)?,
      claimant_email: row.get(12)?,
      claimant_phone: row.get(13)?,
      claimed_at:     row.get(14)?,
    })
  }

  pub fn into_item(self) -> Result<Item> {
    let id = decode_uuid(&self.item_id)?;

    let claim = match decode_status(&self.status)? {
      ItemStatus::Unclaimed => ClaimState::Unclaimed,
      ItemStatus::Claimed => {
        let (Some(uid), Some(at)) = (self.claimant_uid, self.claimed_at) else {
          return Err(Error::Malformed(format!(
            "item {id} is claimed without a claimant"
          )));
        };
        ClaimState::Claimed {
          by: Claimant {
            uid,
            name: self.claimant_name.unwrap_or_default(),
            email: self.claimant_email.unwrap_or_default(),
            phone: self.claimant_phone.unwrap_or_default(),
          },
          at: decode_dt(&at)?,
        }
      }
    };

    Ok(Item {
      id,
      kind: decode_kind(&self.kind)?,
      name: self.name,
      description: self.description,
      location: self.location,
      reported_by: PersonRef {
        uid:   self.reporter_uid,
        name:  self.reporter_name,
        email: self.reporter_email,
      },
      reported_at: Some(decode_dt(&self.reported_at)?),
      claim,
    })
  }
}

// ─── Events ──────────────────────────────────────────────────────────────────

pub const EVENT_COLUMNS: &str = "event_id, title, event_date, location, \
   description, poster_uid, poster_name, poster_email, created_at, last_updated";

pub const ENROLLMENT_COLUMNS: &str = "event_id, uid, name, email, enrolled_at";

pub struct RawEnrollment {
  pub event_id:    String,
  pub uid:         String,
  pub name:        String,
  pub email:       String,
  pub enrolled_at: String,
}

impl RawEnrollment {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      event_id:    row.get(0)?,
      uid:         row.get(1)?,
      name:        row.get(2)?,
      email:       row.get(3)?,
      enrolled_at: row.get(4)?,
    })
  }

  fn into_enrollment(self) -> Result<Enrollment> {
    Ok(Enrollment {
      uid:         self.uid,
      name:        self.name,
      email:       self.email,
      enrolled_at: decode_dt(&self.enrolled_at)?,
    })
  }
}

/// An `events` row plus its enrollment rows in append order.
pub struct RawEvent {
  pub event_id:     String,
  pub title:        String,
  pub event_date:   String,
  pub location:     String,
  pub description:  String,
  pub poster_uid:   String,
  pub poster_name:  String,
  pub poster_email: String,
  pub created_at:   String,
  pub last_updated: Option<String>,
  pub enrollments:  Vec<RawEnrollment>,
}

impl RawEvent {
  /// Expects the columns in [`EVENT_COLUMNS`] order. Enrollments are
  /// attached afterwards.
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      event_id:     row.get(0)?,
      title:        row.get(1)?,
      event_date:   row.get(2)?,
      location:     row.get(3)?,
      description:  row.get(4)?,
      poster_uid:   row.get(5)?,
      poster_name:  row.get(6)?,
      poster_email: row.get(7)?,
      created_at:   row.get(8)?,
      last_updated: row.get(9)?,
      enrollments:  Vec::new(),
    })
  }

  pub fn into_event(self) -> Result<Event> {
    Ok(Event {
      id:           decode_uuid(&self.event_id)?,
      title:        self.title,
      event_date:   decode_dt(&self.event_date)?,
      location:     self.location,
      description:  self.description,
      posted_by:    PersonRef {
        uid:   self.poster_uid,
        name:  self.poster_name,
        email: self.poster_email,
      },
      created_at:   Some(decode_dt(&self.created_at)?),
      enrollments:  self
        .enrollments
        .into_iter()
        .map(RawEnrollment::into_enrollment)
        .collect::<Result<_>>()?,
      last_updated: decode_opt_dt(self.last_updated.as_deref())?,
    })
  }
}

// ─── Accounts ────────────────────────────────────────────────────────────────

pub const ACCOUNT_COLUMNS: &str = "uid, name, email, role, created_at, password_hash";

pub struct RawAccount {
  pub uid:           String,
  pub name:          String,
  pub email:         String,
  pub role:          Option<String>,
  pub created_at:    String,
  pub password_hash: String,
}

impl RawAccount {
  /// Expects the columns in [`ACCOUNT_COLUMNS`] order.
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      uid:           row.get(0)?,
      name:          row.get(1)?,
      email:         row.get(2)?,
      role:          row.get(3)?,
      created_at:    row.get(4)?,
      password_hash: row.get(5)?,
    })
  }

  /// Splits off the password hash.
  pub fn into_parts(self) -> Result<(Account, String)> {
    let account = Account {
      uid:        self.uid,
      name:       self.name,
      email:      self.email,
      role:       self.role.as_deref().map(decode_role).transpose()?,
      created_at: decode_dt(&self.created_at)?,
    };
    Ok((account, self.password_hash))
  }

  pub fn into_account(self) -> Result<Account> { Ok(self.into_parts()?.0) }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn role_names_round_trip_through_strum() {
    for role in [Role::Student, Role::Faculty, Role::Admin] {
      assert_eq!(decode_role(encode_role(role)).unwrap(), role);
    }
    assert!(decode_role("student").is_err());
  }

  #[test]
  fn claimed_row_without_claimant_is_malformed() {
    let raw = RawItem {
      item_id:        encode_uuid(Uuid::new_v4()),
      kind:           "found".into(),
      name:           "Calculator".into(),
      description:    "Casio".into(),
      location:       "Library".into(),
      reporter_uid:   "u1".into(),
      reporter_name:  "A".into(),
      reporter_email: "a@klh.edu.in".into(),
      reported_at:    encode_dt(Utc::now()),
      status:         "claimed".into(),
      claimant_uid:   None,
      claimant_name:  None,
      claimant_email: None,
      claimant_phone: None,
      claimed_at:     None,
    };
    assert!(matches!(raw.into_item(), Err(Error::Malformed(_))));
  }
}
