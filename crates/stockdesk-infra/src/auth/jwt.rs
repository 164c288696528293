//! HS256 JWT identity resolver.
//!
//! Tokens are minted by the auth service with claims
//! `{sub: <email>, role: "admin"|"client", exp}`. The resolver checks the
//! signature and expiry, then loads the account by email so the gate sees
//! the current approval status rather than whatever was true at login.
//!
//! The signing key is held in a [`SecretString`] and only exposed to build
//! jsonwebtoken keys.

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use stockdesk_core::presence::IdentityResolver;
use stockdesk_core::repository::user::UserRepository;
use stockdesk_types::error::AuthError;
use stockdesk_types::identity::{Role, UserAccount};
use tracing::debug;

/// Registered and private claims carried by a chat token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Account email.
    pub sub: String,
    pub role: Role,
    /// Expiry, seconds since the Unix epoch.
    pub exp: u64,
}

pub struct JwtIdentityResolver<U: UserRepository> {
    users: U,
    secret: SecretString,
    expiration_secs: u64,
}

impl<U: UserRepository> JwtIdentityResolver<U> {
    pub fn new(users: U, secret: SecretString, expiration_secs: u64) -> Self {
        Self {
            users,
            secret,
            expiration_secs,
        }
    }

    /// Access the user repository the resolver looks accounts up in.
    pub fn users(&self) -> &U {
        &self.users
    }

    /// Mint a token for `account`, valid for the configured lifetime.
    pub fn issue_token(&self, account: &UserAccount) -> Result<String, AuthError> {
        let claims = Claims {
            sub: account.email.clone(),
            role: account.role,
            exp: Utc::now().timestamp().max(0) as u64 + self.expiration_secs,
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.secret.expose_secret().as_bytes()),
        )
        .map_err(|e| AuthError::InvalidToken(e.to_string()))
    }

    /// Check signature and expiry and return the claims.
    pub fn decode_claims(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp", "sub"]);

        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.expose_secret().as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| AuthError::InvalidToken(e.to_string()))
    }
}

impl<U: UserRepository> IdentityResolver for JwtIdentityResolver<U> {
    async fn resolve_identity(&self, token: &str) -> Result<UserAccount, AuthError> {
        let claims = self.decode_claims(token)?;

        let account = self
            .users
            .get_by_email(&claims.sub)
            .await
            .map_err(|e| AuthError::Storage(e.to_string()))?
            .ok_or(AuthError::UnknownIdentity)?;

        if account.role != claims.role {
            debug!(user_id = %account.id, claimed = %claims.role, stored = %account.role, "role claim mismatch");
            return Err(AuthError::InvalidToken("role claim does not match account".to_string()));
        }

        Ok(account)
    }
}

impl<U: UserRepository> std::fmt::Debug for JwtIdentityResolver<U> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtIdentityResolver")
            .field("secret", &"[REDACTED]")
            .field("expiration_secs", &self.expiration_secs)
            .finish()
    }
}
