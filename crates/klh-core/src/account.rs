//! Registered users (the `users` collection) and registration rules.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  error::required,
  session::{Identity, Role},
};

/// Only addresses in this domain may register or sign in.
pub const DEFAULT_EMAIL_DOMAIN: &str = "@klh.edu.in";

pub const MIN_PASSWORD_LEN: usize = 6;

/// A registered user. The password hash never leaves the store layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
  pub uid:        String,
  pub name:       String,
  pub email:      String,
  pub role:       Option<Role>,
  pub created_at: DateTime<Utc>,
}

impl Account {
  pub fn identity(&self) -> Identity {
    Identity {
      uid:   self.uid.clone(),
      email: self.email.clone(),
      name:  self.name.clone(),
      role:  self.role,
    }
  }
}

/// The registration form as submitted.
#[derive(Debug, Clone, Deserialize)]
pub struct Registration {
  pub name:     String,
  pub email:    String,
  pub password: String,
  /// Left unset, the account exists but may not write anything until
  /// [`decide_profile_completion`] assigns a role.
  #[serde(default)]
  pub role:     Option<Role>,
}

/// Input to [`crate::store::AccountStore::create_account`].
#[derive(Debug, Clone)]
pub struct NewAccount {
  pub name:          String,
  pub email:         String,
  pub role:          Option<Role>,
  /// argon2 PHC string.
  pub password_hash: String,
}

/// An account together with its stored password hash, for sign-in.
#[derive(Debug, Clone)]
pub struct Credentials {
  pub account:       Account,
  pub password_hash: String,
}

#[derive(Debug, Clone)]
pub struct RegistrationRules {
  /// Required suffix, including the `@`.
  pub email_domain:     String,
  pub min_password_len: usize,
}

impl Default for RegistrationRules {
  fn default() -> Self {
    Self {
      email_domain:     DEFAULT_EMAIL_DOMAIN.to_owned(),
      min_password_len: MIN_PASSWORD_LEN,
    }
  }
}

impl RegistrationRules {
  pub fn for_domain(email_domain: impl Into<String>) -> Self {
    Self { email_domain: email_domain.into(), ..Self::default() }
  }

  /// Normalise `email` (trimmed, lowercase) and check its domain.
  pub fn check_email(&self, email: &str) -> Result<String> {
    let email = email.trim().to_lowercase();
    if email.is_empty()
      || !email.ends_with(&self.email_domain.to_lowercase())
      || email.len() <= self.email_domain.len()
    {
      return Err(Error::Validation(format!(
        "only {} emails are allowed",
        self.email_domain
      )));
    }
    Ok(email)
  }

  /// Validate a registration form. Returns the normalised name and email.
  pub fn check_registration(
    &self,
    registration: &Registration,
  ) -> Result<(String, String)> {
    let name = required("name", &registration.name)?;
    let email = self.check_email(&registration.email)?;
    if registration.password.chars().count() < self.min_password_len {
      return Err(Error::Validation(format!(
        "password is too weak; use at least {} characters",
        self.min_password_len
      )));
    }
    Ok((name, email))
  }
}

/// A role is chosen once. Completing the profile of an account that already
/// has one is refused.
pub fn decide_profile_completion(account: &Account, name: &str) -> Result<String> {
  if account.role.is_some() {
    return Err(Error::forbidden("your role has already been set"));
  }
  required("name", name)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn registration(email: &str, password: &str) -> Registration {
    Registration {
      name:     "Asha".into(),
      email:    email.into(),
      password: password.into(),
      role:     Some(Role::Student),
    }
  }

  #[test]
  fn institutional_domain_only() {
    let rules = RegistrationRules::default();
    assert!(rules.check_registration(&registration("a@gmail.com", "secret1")).is_err());
    assert!(rules.check_registration(&registration("@klh.edu.in", "secret1")).is_err());
    let (_, email) = rules
      .check_registration(&registration(" Asha@KLH.edu.in ", "secret1"))
      .unwrap();
    assert_eq!(email, "asha@klh.edu.in");
  }

  #[test]
  fn short_password_is_rejected() {
    let rules = RegistrationRules::default();
    let err = rules
      .check_registration(&registration("a@klh.edu.in", "12345"))
      .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
  }

  #[test]
  fn role_is_set_once() {
    let mut account = Account {
      uid:        "u".into(),
      name:       "Asha".into(),
      email:      "a@klh.edu.in".into(),
      role:       None,
      created_at: Utc::now(),
    };
    assert_eq!(decide_profile_completion(&account, " Asha K ").unwrap(), "Asha K");
    account.role = Some(Role::Student);
    assert!(matches!(
      decide_profile_completion(&account, "Asha"),
      Err(Error::Forbidden(_))
    ));
  }
}
