//! Registration, sign-in and the bearer-token session extractor.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/auth/register` | Body: [`Registration`]; 201 + `{token, identity}` |
//! | `POST` | `/auth/login` | Body: `{"email":..,"password":..}` |
//! | `POST` | `/auth/logout` | Revokes the presented token; 204 |
//! | `GET`  | `/auth/me` | Current identity and capabilities |
//! | `PUT`  | `/auth/profile` | Body: `{"name":..,"role":..}`; only while the role is unset |
//!
//! Tokens are 32 random bytes, URL-safe base64. The store only ever sees the
//! SHA-256 of a token.

use argon2::{
  Argon2, PasswordHash, PasswordHasher as _, PasswordVerifier as _,
  password_hash::SaltString,
};
use axum::{
  Json,
  extract::{FromRequestParts, State, rejection::JsonRejection},
  http::{StatusCode, header, request::Parts},
  response::IntoResponse,
};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use klh_core::{
  Error as CoreError,
  account::{Account, NewAccount, Registration, decide_profile_completion},
  session::{Capability, Identity, Role, Session},
  store::{AccountStore, CampusStore, Conditional},
};
use rand_core::{OsRng, RngCore as _};
use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};

use crate::{ApiState, error::ApiError};

// ─── Tokens and passwords ────────────────────────────────────────────────────

/// A freshly issued bearer token and the digest stored in its place.
pub struct IssuedToken {
  pub token:  String,
  pub digest: String,
}

pub fn issue_token() -> IssuedToken {
  let mut bytes = [0_u8; 32];
  OsRng.fill_bytes(&mut bytes);
  let token = URL_SAFE_NO_PAD.encode(bytes);
  let digest = token_digest(&token);
  IssuedToken { token, digest }
}

/// Hex SHA-256 of a bearer token.
pub fn token_digest(token: &str) -> String { hex::encode(Sha256::digest(token.as_bytes())) }

pub fn hash_password(password: &str) -> Result<String, ApiError> {
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|hash| hash.to_string())
    .map_err(|e| ApiError::Internal(format!("argon2 error: {e}")))
}

fn verify_password(password: &str, phc: &str) -> bool {
  PasswordHash::new(phc)
    .and_then(|parsed| Argon2::default().verify_password(password.as_bytes(), &parsed))
    .is_ok()
}

// ─── Extractor ───────────────────────────────────────────────────────────────

/// The caller's [`Session`], resolved from `Authorization: Bearer <token>`.
///
/// A request without the header is anonymous; a header carrying an unknown
/// token is rejected with 401.
pub struct CurrentSession {
  pub session:      Session,
  /// Digest of the presented token, if any.
  pub token_digest: Option<String>,
}

impl<S> FromRequestParts<ApiState<S>> for CurrentSession
where
  S: CampusStore + AccountStore + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &ApiState<S>,
  ) -> Result<Self, Self::Rejection> {
    let Some(value) = parts.headers.get(header::AUTHORIZATION) else {
      return Ok(Self { session: Session::anonymous(), token_digest: None });
    };

    let token = value
      .to_str()
      .ok()
      .and_then(|v| v.strip_prefix("Bearer "))
      .map(str::trim)
      .filter(|t| !t.is_empty())
      .ok_or(ApiError::InvalidToken)?;

    let digest = token_digest(token);
    let account = state
      .store
      .resolve_session(&digest)
      .await
      .map_err(CoreError::read)?
      .ok_or(ApiError::InvalidToken)?;

    Ok(Self {
      session:      Session::signed_in(account.identity()),
      token_digest: Some(digest),
    })
  }
}

// ─── Bodies ──────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct IdentityView {
  #[serde(flatten)]
  pub identity:     Identity,
  pub capabilities: Vec<Capability>,
}

impl From<Identity> for IdentityView {
  fn from(identity: Identity) -> Self {
    let capabilities = identity.capabilities();
    Self { identity, capabilities }
  }
}

#[derive(Debug, Serialize)]
pub struct SignedIn {
  pub token:    String,
  pub identity: IdentityView,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
  pub email:    String,
  pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ProfileForm {
  pub name: String,
  pub role: Role,
}

async fn start_session<S>(state: &ApiState<S>, account: &Account) -> Result<SignedIn, ApiError>
where
  S: CampusStore + AccountStore + 'static,
{
  let issued = issue_token();
  state
    .store
    .create_session(issued.digest, &account.uid)
    .await
    .map_err(CoreError::write)?;
  Ok(SignedIn {
    token:    issued.token,
    identity: account.identity().into(),
  })
}

// ─── Handlers ────────────────────────────────────────────────────────────────

/// `POST /auth/register`
pub async fn register<S>(
  State(state): State<ApiState<S>>,
  body: Result<Json<Registration>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CampusStore + AccountStore + 'static,
{
  let Json(registration) = body?;
  let (name, email) = state.registration.check_registration(&registration)?;
  let password_hash = hash_password(&registration.password)?;

  let new_account = NewAccount {
    name,
    email: email.clone(),
    role: registration.role,
    password_hash,
  };
  let account = match state
    .store
    .create_account(new_account)
    .await
    .map_err(CoreError::write)?
  {
    Conditional::Applied(account) => account,
    Conditional::PreconditionFailed | Conditional::NotFound => {
      return Err(CoreError::Conflict(format!("{email} is already registered")).into());
    }
  };

  tracing::info!(uid = %account.uid, role = ?account.role, "account registered");
  let signed_in = start_session(&state, &account).await?;
  Ok((StatusCode::CREATED, Json(signed_in)))
}

/// `POST /auth/login`
pub async fn login<S>(
  State(state): State<ApiState<S>>,
  body: Result<Json<LoginForm>, JsonRejection>,
) -> Result<Json<SignedIn>, ApiError>
where
  S: CampusStore + AccountStore + 'static,
{
  let Json(form) = body?;
  let email = state.registration.check_email(&form.email)?;

  let credentials = state
    .store
    .find_credentials(&email)
    .await
    .map_err(CoreError::read)?
    .ok_or(ApiError::InvalidCredentials)?;
  if !verify_password(&form.password, &credentials.password_hash) {
    tracing::debug!(%email, "password mismatch");
    return Err(ApiError::InvalidCredentials);
  }

  tracing::info!(uid = %credentials.account.uid, "signed in");
  Ok(Json(start_session(&state, &credentials.account).await?))
}

/// `POST /auth/logout`
pub async fn logout<S>(
  State(state): State<ApiState<S>>,
  current: CurrentSession,
) -> Result<StatusCode, ApiError>
where
  S: CampusStore + AccountStore + 'static,
{
  let digest = current.token_digest.ok_or(CoreError::Unauthenticated)?;
  state
    .store
    .revoke_session(&digest)
    .await
    .map_err(CoreError::write)?;
  Ok(StatusCode::NO_CONTENT)
}

/// `GET /auth/me`
pub async fn me(current: CurrentSession) -> Result<Json<IdentityView>, ApiError> {
  let identity = current.session.require_identity()?.clone();
  Ok(Json(identity.into()))
}

/// `PUT /auth/profile`
pub async fn complete_profile<S>(
  State(state): State<ApiState<S>>,
  current: CurrentSession,
  body: Result<Json<ProfileForm>, JsonRejection>,
) -> Result<Json<IdentityView>, ApiError>
where
  S: CampusStore + AccountStore + 'static,
{
  let Json(form) = body?;
  let uid = current.session.require_identity()?.uid.clone();

  let account = state
    .store
    .get_account(&uid)
    .await
    .map_err(CoreError::read)?
    .ok_or(CoreError::Unauthenticated)?;
  let name = decide_profile_completion(&account, &form.name)?;

  match state
    .store
    .complete_profile(&uid, name, form.role)
    .await
    .map_err(CoreError::write)?
  {
    Conditional::Applied(account) => {
      tracing::info!(%uid, role = %form.role, "profile completed");
      Ok(Json(account.identity().into()))
    }
    Conditional::PreconditionFailed => {
      Err(CoreError::forbidden("your role has already been set").into())
    }
    Conditional::NotFound => Err(CoreError::Unauthenticated.into()),
  }
}
