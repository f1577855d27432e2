//! Lost & Found items.
//!
//! An item is reported once and may later be claimed once. The claim is a
//! single tagged value so the claimant and the claim time can never be set
//! apart from each other.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── Enumerations ────────────────────────────────────────────────────────────

/// Whether the reporter lost the item or found it. Fixed at creation.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ItemKind {
  Lost,
  Found,
}

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ItemStatus {
  Unclaimed,
  Claimed,
}

// ─── People ──────────────────────────────────────────────────────────────────

/// Snapshot of a user's identity, frozen into a record at write time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonRef {
  pub uid:   String,
  pub name:  String,
  pub email: String,
}

/// The person who claimed a found item, with a number the finder can call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claimant {
  pub uid:   String,
  pub name:  String,
  pub email: String,
  pub phone: String,
}

// ─── Item ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimState {
  Unclaimed,
  Claimed {
    by: Claimant,
    /// Store-assigned.
    at: DateTime<Utc>,
  },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "ItemDocument", try_from = "ItemDocument")]
pub struct Item {
  pub id:          Uuid,
  pub kind:        ItemKind,
  pub name:        String,
  pub description: String,
  pub location:    String,
  pub reported_by: PersonRef,
  /// Stamped by the store. `None` only for a write that has not been
  /// acknowledged yet.
  pub reported_at: Option<DateTime<Utc>>,
  pub claim:       ClaimState,
}

impl Item {
  pub fn status(&self) -> ItemStatus {
    match self.claim {
      ClaimState::Unclaimed => ItemStatus::Unclaimed,
      ClaimState::Claimed { .. } => ItemStatus::Claimed,
    }
  }

  pub fn is_claimed(&self) -> bool { self.status() == ItemStatus::Claimed }

  pub fn claimed_by(&self) -> Option<&Claimant> {
    match &self.claim {
      ClaimState::Claimed { by, .. } => Some(by),
      ClaimState::Unclaimed => None,
    }
  }

  pub fn claimed_at(&self) -> Option<DateTime<Utc>> {
    match &self.claim {
      ClaimState::Claimed { at, .. } => Some(*at),
      ClaimState::Unclaimed => None,
    }
  }
}

/// Flat document form of an [`Item`], as stored and sent over the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemDocument {
  id:          Uuid,
  kind:        ItemKind,
  name:        String,
  description: String,
  location:    String,
  status:      ItemStatus,
  reported_by: PersonRef,
  reported_at: Option<DateTime<Utc>>,
  claimed_by:  Option<Claimant>,
  claimed_at:  Option<DateTime<Utc>>,
}

impl From<Item> for ItemDocument {
  fn from(item: Item) -> Self {
    let status = item.status();
    let (claimed_by, claimed_at) = match item.claim {
      ClaimState::Unclaimed => (None, None),
      ClaimState::Claimed { by, at } => (Some(by), Some(at)),
    };
    Self {
      id: item.id,
      kind: item.kind,
      name: item.name,
      description: item.description,
      location: item.location,
      status,
      reported_by: item.reported_by,
      reported_at: item.reported_at,
      claimed_by,
      claimed_at,
    }
  }
}

impl TryFrom<ItemDocument> for Item {
  type Error = String;

  fn try_from(doc: ItemDocument) -> Result<Self, Self::Error> {
    let claim = match (doc.status, doc.claimed_by, doc.claimed_at) {
      (ItemStatus::Unclaimed, None, None) => ClaimState::Unclaimed,
      (ItemStatus::Claimed, Some(by), Some(at)) => ClaimState::Claimed { by, at },
      (status, by, at) => {
        return Err(format!(
          "item {}: status {status} with claimedBy {} and claimedAt {}",
          doc.id,
          if by.is_some() { "set" } else { "unset" },
          if at.is_some() { "set" } else { "unset" },
        ));
      }
    };
    Ok(Self {
      id: doc.id,
      kind: doc.kind,
      name: doc.name,
      description: doc.description,
      location: doc.location,
      reported_by: doc.reported_by,
      reported_at: doc.reported_at,
      claim,
    })
  }
}

// ─── Inputs ──────────────────────────────────────────────────────────────────

/// What a user types into the report form.
#[derive(Debug, Clone, Deserialize)]
pub struct ItemReport {
  pub kind:        ItemKind,
  pub name:        String,
  pub description: String,
  pub location:    String,
}

/// Input to [`crate::store::CampusStore::insert_item`]. Validated; `id` and
/// `reported_at` are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewItem {
  pub kind:        ItemKind,
  pub name:        String,
  pub description: String,
  pub location:    String,
  pub reported_by: PersonRef,
}

// ─── Board ───────────────────────────────────────────────────────────────────

/// The two lists shown on the Lost & Found page, newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ItemBoard {
  pub lost:  Vec<Item>,
  pub found: Vec<Item>,
}

impl ItemBoard {
  /// Partition by kind and sort each side by recency. Every item lands in
  /// exactly one partition.
  pub fn from_items(items: &[Item]) -> Self {
    let mut board = Self::default();
    for item in items {
      match item.kind {
        ItemKind::Lost => board.lost.push(item.clone()),
        ItemKind::Found => board.found.push(item.clone()),
      }
    }
    board.lost.sort_by(most_recent_first);
    board.found.sort_by(most_recent_first);
    board
  }

  pub fn len(&self) -> usize { self.lost.len() + self.found.len() }

  pub fn is_empty(&self) -> bool { self.len() == 0 }
}

/// Items still awaiting their `reported_at` stamp sort ahead of everything.
fn most_recent_first(a: &Item, b: &Item) -> Ordering {
  match (a.reported_at, b.reported_at) {
    (None, None) => Ordering::Equal,
    (None, Some(_)) => Ordering::Less,
    (Some(_), None) => Ordering::Greater,
    (Some(a), Some(b)) => b.cmp(&a),
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  fn reporter() -> PersonRef {
    PersonRef {
      uid:   "A".into(),
      name:  "Asha".into(),
      email: "asha@klh.edu.in".into(),
    }
  }

  fn item(kind: ItemKind, name: &str, secs: Option<i64>) -> Item {
    Item {
      id: Uuid::new_v4(),
      kind,
      name: name.into(),
      description: "desc".into(),
      location: "Library".into(),
      reported_by: reporter(),
      reported_at: secs.map(|s| Utc.timestamp_opt(s, 0).unwrap()),
      claim: ClaimState::Unclaimed,
    }
  }

  #[test]
  fn board_partitions_are_disjoint() {
    let items = vec![
      item(ItemKind::Lost, "wallet", Some(10)),
      item(ItemKind::Found, "bottle", Some(20)),
      item(ItemKind::Found, "keys", Some(30)),
    ];
    let board = ItemBoard::from_items(&items);
    assert_eq!(board.lost.len(), 1);
    assert_eq!(board.found.len(), 2);
    assert_eq!(board.len(), items.len());
    for lost in &board.lost {
      assert!(board.found.iter().all(|f| f.id != lost.id));
    }
  }

  #[test]
  fn board_sorts_newest_first_with_pending_on_top() {
    let items = vec![
      item(ItemKind::Found, "old", Some(10)),
      item(ItemKind::Found, "pending", None),
      item(ItemKind::Found, "new", Some(50)),
    ];
    let names: Vec<_> = ItemBoard::from_items(&items)
      .found
      .into_iter()
      .map(|i| i.name)
      .collect();
    assert_eq!(names, ["pending", "new", "old"]);
  }

  #[test]
  fn json_shape_is_flat() {
    let mut it = item(ItemKind::Found, "bottle", Some(10));
    it.claim = ClaimState::Claimed {
      by: Claimant {
        uid:   "B".into(),
        name:  "Bala".into(),
        email: "bala@klh.edu.in".into(),
        phone: "555-0100".into(),
      },
      at: Utc.timestamp_opt(20, 0).unwrap(),
    };
    let json = serde_json::to_value(&it).unwrap();
    assert_eq!(json["status"], "claimed");
    assert_eq!(json["kind"], "found");
    assert_eq!(json["claimedBy"]["phone"], "555-0100");
    assert_eq!(json["reportedBy"]["uid"], "A");

    let back: Item = serde_json::from_value(json).unwrap();
    assert_eq!(back, it);
  }

  #[test]
  fn claimed_status_without_claimant_is_rejected() {
    let json = serde_json::json!({
      "id": Uuid::new_v4(),
      "kind": "found",
      "name": "bottle",
      "description": "blue",
      "location": "Canteen",
      "status": "claimed",
      "reportedBy": { "uid": "A", "name": "Asha", "email": "asha@klh.edu.in" },
      "reportedAt": null,
      "claimedBy": null,
      "claimedAt": "2025-01-01T00:00:00Z",
    });
    assert!(serde_json::from_value::<Item>(json).is_err());
  }
}
