//! Token issuance, verification and role checks.
//!
//! Tokens are signed with RS256 only. The `kid` header selects the
//! verification key from the [`KeyStore`]; a token naming an unknown kid is
//! rejected rather than checked against some other key.
//!
//! # Example
//!
//! ```ignore
//! use roster_auth::{Auth, Claims};
//! use roster_models::Role;
//!
//! let auth = Auth::new(keystore);
//! let claims = Claims::new("roster", user_id.to_string(), vec![Role::User], max_age);
//! let token = auth.generate_active(&claims)?;
//!
//! let verified = auth.verify_token(&format!("Bearer {token}"))?;
//! auth.authorized(&verified, &[Role::Admin, Role::User])?;
//! ```

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, Header, Validation, decode, encode};
use roster_models::Role;
use serde_json::Value;
use thiserror::Error;

use crate::claims::Claims;
use crate::keystore::{KeyStore, KeyStoreError};

/// The only algorithm issued or accepted.
pub const ALGORITHM: Algorithm = Algorithm::RS256;

/// Clock skew tolerated on `exp` and `iat`, in seconds.
pub const LEEWAY_SECS: u64 = 60;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("expected authorization header format: Bearer <token>")]
    MissingBearer,
    #[error("kid missing from header")]
    KidMissing,
    #[error("kid malformed")]
    KidMalformed,
    #[error("fetching public key: {0}")]
    KeyLookup(#[source] KeyStoreError),
    #[error("fetching private key: {0}")]
    SigningKey(#[source] KeyStoreError),
    #[error("no active signing key")]
    NoActiveKey,
    #[error("token expired")]
    Expired,
    #[error("token issued in the future")]
    IssuedInFuture,
    #[error("invalid token: {0}")]
    InvalidToken(#[source] jsonwebtoken::errors::Error),
    #[error("signing token: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),
    #[error("attempted action is not allowed")]
    Forbidden,
}

/// Issues and verifies access tokens against a shared [`KeyStore`].
pub struct Auth {
    keys: Arc<KeyStore>,
    validation: Validation,
}

impl Auth {
    pub fn new(keys: Arc<KeyStore>) -> Self {
        let mut validation = Validation::new(ALGORITHM);
        validation.leeway = LEEWAY_SECS;
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp", "iat", "sub"]);

        Self { keys, validation }
    }

    pub fn keystore(&self) -> &Arc<KeyStore> {
        &self.keys
    }

    /// Signs `claims` with the private key registered under `kid`.
    ///
    /// # Arguments
    ///
    /// * `kid` - Key id; written to the token header
    /// * `claims` - Payload to sign
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::SigningKey`] if `kid` is not loaded.
    pub fn generate_token(&self, kid: &str, claims: &Claims) -> Result<String, AuthError> {
        let key = self.keys.private_key(kid).map_err(AuthError::SigningKey)?;

        let mut header = Header::new(ALGORITHM);
        header.kid = Some(kid.to_string());

        encode(&header, claims, &key).map_err(AuthError::Signing)
    }

    /// Signs `claims` with the active key.
    pub fn generate_active(&self, claims: &Claims) -> Result<String, AuthError> {
        let kid = self.keys.active_kid().ok_or(AuthError::NoActiveKey)?;
        self.generate_token(&kid, claims)
    }

    /// Verifies an `Authorization` header value and returns its claims.
    ///
    /// # Arguments
    ///
    /// * `bearer` - The full header value, `Bearer <token>`
    ///
    /// # Errors
    ///
    /// Checked in order:
    /// - [`AuthError::MissingBearer`] when the `Bearer ` prefix is absent
    /// - [`AuthError::InvalidToken`] when the header segment cannot be decoded
    /// - [`AuthError::KidMissing`] / [`AuthError::KidMalformed`] for the `kid` header
    /// - [`AuthError::KeyLookup`] when the kid is not loaded
    /// - [`AuthError::Expired`] or [`AuthError::InvalidToken`] when the
    ///   signature, algorithm or claims do not check out
    pub fn verify_token(&self, bearer: &str) -> Result<Claims, AuthError> {
        let token = bearer
            .strip_prefix("Bearer ")
            .ok_or(AuthError::MissingBearer)?;

        let kid = header_kid(token)?;
        let key = self.keys.public_key(&kid).map_err(AuthError::KeyLookup)?;

        let data = decode::<Claims>(token, &key, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::InvalidToken(e),
            }
        })?;

        if data.claims.iat > Utc::now().timestamp() + LEEWAY_SECS as i64 {
            return Err(AuthError::IssuedInFuture);
        }

        Ok(data.claims)
    }

    /// Succeeds when the claims hold at least one of the `allowed` roles.
    pub fn authorized(&self, claims: &Claims, allowed: &[Role]) -> Result<(), AuthError> {
        if claims.roles.iter().any(|role| allowed.contains(role)) {
            Ok(())
        } else {
            Err(AuthError::Forbidden)
        }
    }
}

/// Reads `kid` from the unverified header segment.
fn header_kid(token: &str) -> Result<String, AuthError> {
    let invalid = || AuthError::InvalidToken(ErrorKind::InvalidToken.into());

    let segment = token.split('.').next().ok_or_else(invalid)?;
    let raw = URL_SAFE_NO_PAD.decode(segment).map_err(|_| invalid())?;
    let header: Value = serde_json::from_slice(&raw).map_err(|_| invalid())?;

    match header.get("kid") {
        None | Some(Value::Null) => Err(AuthError::KidMissing),
        Some(Value::String(kid)) => Ok(kid.clone()),
        Some(_) => Err(AuthError::KidMalformed),
    }
}
