//! Admission-time authentication for inbound connections.
//!
//! The [`PresenceGate`] turns the bearer token presented at handshake time
//! into an [`Identity`], or refuses admission. Token validation itself is
//! delegated to an [`IdentityResolver`] (the external auth collaborator);
//! the gate adds the registration-approval policy on top.

use stockdesk_types::error::AuthError;
use stockdesk_types::identity::{ApprovalStatus, Identity, Role, UserAccount};
use tracing::debug;

/// Resolves a bearer token to the account it was issued for.
///
/// Implementations validate signature and expiry and look the account up in
/// the user store. `JwtIdentityResolver` in stockdesk-infra is the
/// production adapter.
pub trait IdentityResolver: Send + Sync {
    fn resolve_identity(
        &self,
        token: &str,
    ) -> impl std::future::Future<Output = Result<UserAccount, AuthError>> + Send;
}

/// Authenticates connection attempts before they reach the registry.
pub struct PresenceGate<R: IdentityResolver> {
    resolver: R,
}

impl<R: IdentityResolver> PresenceGate<R> {
    pub fn new(resolver: R) -> Self {
        Self { resolver }
    }

    /// Authenticate a raw token taken from the handshake.
    ///
    /// Fails when the token is absent or blank, when the resolver rejects it,
    /// or when it belongs to a client whose registration is not approved.
    pub async fn authenticate(&self, raw_token: Option<&str>) -> Result<Identity, AuthError> {
        let token = raw_token
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::MissingToken)?;

        let account = self.resolver.resolve_identity(token).await?;

        if account.role == Role::Client && account.approval_status != ApprovalStatus::Approved {
            debug!(user_id = %account.id, status = %account.approval_status, "rejecting unapproved client");
            return Err(AuthError::NotApproved(account.approval_status));
        }

        Ok(account.identity())
    }
}
