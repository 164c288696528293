//! User repository trait definition.
//!
//! Accounts belong to the external user store. The chat core reads them to
//! resolve recipients and partners; `create` and `set_approval` exist for
//! the admin CLI that seeds local deployments.

use stockdesk_types::error::RepositoryError;
use stockdesk_types::identity::{ApprovalStatus, NewUserAccount, Role, UserAccount, UserId};

/// Repository trait for user account lookups.
///
/// Implementations live in stockdesk-infra (e.g., `SqliteUserRepository`).
pub trait UserRepository: Send + Sync {
    /// Get an account by id.
    fn get_by_id(
        &self,
        id: UserId,
    ) -> impl std::future::Future<Output = Result<Option<UserAccount>, RepositoryError>> + Send;

    /// Get an account by its (unique) email address.
    fn get_by_email(
        &self,
        email: &str,
    ) -> impl std::future::Future<Output = Result<Option<UserAccount>, RepositoryError>> + Send;

    /// List accounts with the given role, ordered by id.
    ///
    /// When `approval` is set, only accounts in that approval state are returned.
    fn list_by_role(
        &self,
        role: Role,
        approval: Option<ApprovalStatus>,
    ) -> impl std::future::Future<Output = Result<Vec<UserAccount>, RepositoryError>> + Send;

    /// List every account, ordered by id.
    fn list_all(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<UserAccount>, RepositoryError>> + Send;

    /// Create an account. Returns `Conflict` if the email or username is taken.
    fn create(
        &self,
        account: &NewUserAccount,
    ) -> impl std::future::Future<Output = Result<UserAccount, RepositoryError>> + Send;

    /// Change an account's approval state. Returns `NotFound` for unknown ids.
    fn set_approval(
        &self,
        id: UserId,
        status: ApprovalStatus,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;
}
