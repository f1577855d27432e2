//! Identity, roles and the per-request [`Session`].
//!
//! There is no ambient "current user". Callers build a [`Session`] (usually
//! from a bearer token) and pass it by reference into every service call.

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator as _;

use crate::{Error, Result, item::PersonRef};

// ─── Roles ───────────────────────────────────────────────────────────────────

/// Campus role, chosen once when registration is completed.
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
pub enum Role {
  Student,
  Faculty,
  Admin,
}

/// A privileged operation gated on role.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Capability {
  ReportItems,
  ClaimItems,
  PostEvents,
  Enroll,
  /// See the enrollment roster of any event, not only one's own.
  ViewAnyRoster,
}

impl Role {
  pub fn allows(self, capability: Capability) -> bool {
    use Capability::*;
    match self {
      Role::Student => matches!(capability, ReportItems | ClaimItems | Enroll),
      Role::Faculty => matches!(capability, ReportItems | ClaimItems | PostEvents),
      Role::Admin => !matches!(capability, Enroll),
    }
  }
}

// ─── Identity ────────────────────────────────────────────────────────────────

/// The authenticated user as the services see it. Read-only here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
  pub uid:   String,
  pub email: String,
  pub name:  String,
  /// `None` until the user has completed registration.
  pub role:  Option<Role>,
}

impl Identity {
  pub fn can(&self, capability: Capability) -> bool {
    self.role.is_some_and(|role| role.allows(capability))
  }

  /// Every capability this identity holds; empty while the role is unset.
  pub fn capabilities(&self) -> Vec<Capability> {
    Capability::iter().filter(|c| self.can(*c)).collect()
  }

  /// The identity fields embedded into records created by this user.
  pub fn snapshot(&self) -> PersonRef {
    PersonRef {
      uid:   self.uid.clone(),
      name:  self.name.clone(),
      email: self.email.clone(),
    }
  }
}

// ─── Session ─────────────────────────────────────────────────────────────────

/// The caller of a service operation: anonymous or signed in.
#[derive(Debug, Clone, Default)]
pub struct Session {
  identity: Option<Identity>,
}

impl Session {
  pub fn anonymous() -> Self { Self::default() }

  pub fn signed_in(identity: Identity) -> Self { Self { identity: Some(identity) } }

  pub fn identity(&self) -> Option<&Identity> { self.identity.as_ref() }

  pub fn require_identity(&self) -> Result<&Identity> {
    self.identity.as_ref().ok_or(Error::Unauthenticated)
  }

  /// Resolve the identity and check that its role grants `capability`.
  ///
  /// Identities without a role are refused every capability.
  pub fn require(&self, capability: Capability) -> Result<&Identity> {
    let identity = self.require_identity()?;
    if identity.role.is_none() {
      return Err(Error::forbidden(
        "complete your profile and choose a role first",
      ));
    }
    if !identity.can(capability) {
      return Err(Error::forbidden(match capability {
        Capability::PostEvents => "only Faculty or Admin may post events",
        Capability::Enroll => "only students can enroll in events",
        Capability::ViewAnyRoster => "only the poster can view enrollments",
        Capability::ReportItems | Capability::ClaimItems => {
          "your role cannot use the lost and found board"
        }
      }));
    }
    Ok(identity)
  }
}
