//! Reporting and claiming lost and found items.

use std::sync::Arc;

use uuid::Uuid;

use crate::{
  Error, Result,
  error::required,
  item::{Claimant, Item, ItemBoard, ItemKind, ItemReport, NewItem},
  live::{Snapshot, Subscription},
  session::{Capability, Session},
  store::{CampusStore, Conditional},
};

// ─── Decisions ───────────────────────────────────────────────────────────────

pub fn decide_report(session: &Session, report: &ItemReport) -> Result<NewItem> {
  let reporter = session.require(Capability::ReportItems)?;
  Ok(NewItem {
    kind:        report.kind,
    name:        required("item name", &report.name)?,
    description: required("description", &report.description)?,
    location:    required("location", &report.location)?,
    reported_by: reporter.snapshot(),
  })
}

pub fn decide_claim(item: &Item, session: &Session, phone: &str) -> Result<Claimant> {
  let claimant = session.require(Capability::ClaimItems)?;

  if item.kind == ItemKind::Lost {
    return Err(Error::InvalidStateTransition(
      "only found items can be claimed".into(),
    ));
  }
  if item.is_claimed() {
    return Err(already_claimed());
  }
  if item.reported_by.uid == claimant.uid {
    return Err(Error::forbidden(
      "you cannot claim an item you reported as found",
    ));
  }

  let phone = required("phone number", phone)?;
  Ok(Claimant {
    uid: claimant.uid.clone(),
    name: claimant.name.clone(),
    email: claimant.email.clone(),
    phone,
  })
}

fn already_claimed() -> Error {
  Error::InvalidStateTransition("item has already been claimed".into())
}

// ─── Service ─────────────────────────────────────────────────────────────────

pub struct LostFoundService<S> {
  store: Arc<S>,
}

impl<S> Clone for LostFoundService<S> {
  fn clone(&self) -> Self { Self { store: self.store.clone() } }
}

impl<S: CampusStore> LostFoundService<S> {
  pub fn new(store: Arc<S>) -> Self { Self { store } }

  pub async fn report_item(&self, session: &Session, report: &ItemReport) -> Result<Item> {
    let new_item = decide_report(session, report)?;
    let item = self.store.insert_item(new_item).await.map_err(Error::write)?;
    tracing::info!(item_id = %item.id, kind = %item.kind, "item reported");
    Ok(item)
  }

  /// Claim a found item. The store applies the claim only if the item is
  /// still unclaimed, so of two racing claims exactly one succeeds; the loser
  /// gets the same "already claimed" error as a late claimant.
  pub async fn claim_item(
    &self,
    session: &Session,
    item_id: Uuid,
    phone: &str,
  ) -> Result<Item> {
    let item = self.get_item(item_id).await?;
    let claimant = decide_claim(&item, session, phone)?;
    let claimant_uid = claimant.uid.clone();

    match self
      .store
      .claim_item(item_id, claimant)
      .await
      .map_err(Error::write)?
    {
      Conditional::Applied(item) => {
        tracing::info!(%item_id, claimant = %claimant_uid, "item claimed");
        Ok(item)
      }
      Conditional::PreconditionFailed => {
        tracing::debug!(%item_id, claimant = %claimant_uid, "claim lost the race");
        Err(already_claimed())
      }
      Conditional::NotFound => Err(Error::ItemNotFound(item_id)),
    }
  }

  pub async fn get_item(&self, item_id: Uuid) -> Result<Item> {
    self
      .store
      .get_item(item_id)
      .await
      .map_err(Error::read)?
      .ok_or(Error::ItemNotFound(item_id))
  }

  /// The board as it is right now.
  pub async fn board(&self) -> Result<ItemBoard> {
    let items = self.store.list_items().await.map_err(Error::read)?;
    Ok(ItemBoard::from_items(&items))
  }

  /// Live board: the current partitioned snapshot, then one per change.
  pub async fn list_items(&self) -> Result<Subscription<Snapshot<Item>, ItemBoard>> {
    let sub = self.store.watch_items().await.map_err(Error::read)?;
    Ok(sub.map(|items: Snapshot<Item>| ItemBoard::from_items(&items)))
  }
}

#[cfg(test)]
mod tests {
  use chrono::Utc;

  use super::*;
  use crate::{
    item::{ClaimState, PersonRef},
    session::{Identity, Role},
  };

  fn session(uid: &str, role: Option<Role>) -> Session {
    Session::signed_in(Identity {
      uid: uid.into(),
      email: format!("{uid}@klh.edu.in"),
      name: uid.into(),
      role,
    })
  }

  fn found_item(reporter: &str) -> Item {
    Item {
      id:          Uuid::new_v4(),
      kind:        ItemKind::Found,
      name:        "Blue Water Bottle".into(),
      description: "Steel, dented".into(),
      location:    "Canteen".into(),
      reported_by: PersonRef {
        uid:   reporter.into(),
        name:  reporter.into(),
        email: format!("{reporter}@klh.edu.in"),
      },
      reported_at: Some(Utc::now()),
      claim:       ClaimState::Unclaimed,
    }
  }

  fn report(name: &str) -> ItemReport {
    ItemReport {
      kind:        ItemKind::Found,
      name:        name.into(),
      description: "Steel".into(),
      location:    "Canteen".into(),
    }
  }

  #[test]
  fn report_snapshots_reporter() {
    let new_item = decide_report(&session("A", Some(Role::Student)), &report(" Bottle ")).unwrap();
    assert_eq!(new_item.name, "Bottle");
    assert_eq!(new_item.reported_by.uid, "A");
  }

  #[test]
  fn report_requires_fields_and_identity() {
    assert!(matches!(
      decide_report(&session("A", Some(Role::Student)), &report("  ")),
      Err(Error::Validation(_))
    ));
    assert!(matches!(
      decide_report(&Session::anonymous(), &report("Bottle")),
      Err(Error::Unauthenticated)
    ));
    assert!(matches!(
      decide_report(&session("A", None), &report("Bottle")),
      Err(Error::Forbidden(_))
    ));
  }

  #[test]
  fn reporter_cannot_claim_own_found_item() {
    let item = found_item("A");
    let err = decide_claim(&item, &session("A", Some(Role::Student)), "555-0100").unwrap_err();
    assert!(matches!(err, Error::Forbidden(_)));
  }

  #[test]
  fn claim_carries_phone() {
    let item = found_item("A");
    let claimant = decide_claim(&item, &session("B", Some(Role::Faculty)), " 555-0100 ").unwrap();
    assert_eq!(claimant.uid, "B");
    assert_eq!(claimant.phone, "555-0100");
  }

  #[test]
  fn claimed_item_cannot_be_claimed_again() {
    let mut item = found_item("A");
    let first = decide_claim(&item, &session("B", Some(Role::Student)), "555-0100").unwrap();
    item.claim = ClaimState::Claimed { by: first, at: Utc::now() };
    let err = decide_claim(&item, &session("C", Some(Role::Student)), "555-0199").unwrap_err();
    assert!(matches!(err, Error::InvalidStateTransition(_)));
  }

  #[test]
  fn lost_reports_are_not_claimable() {
    let mut item = found_item("A");
    item.kind = ItemKind::Lost;
    let err = decide_claim(&item, &session("B", Some(Role::Student)), "555-0100").unwrap_err();
    assert!(matches!(err, Error::InvalidStateTransition(_)));
  }

  #[test]
  fn claim_requires_phone() {
    let item = found_item("A");
    let err = decide_claim(&item, &session("B", Some(Role::Student)), "").unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
  }
}
