//! Chat partner resolution.
//!
//! Chat is strictly between roles: every client may reach every admin and
//! every admin may reach every approved client. Pending and rejected clients
//! are never listed, matching the gate that refuses to admit them.

use stockdesk_types::error::RepositoryError;
use stockdesk_types::identity::{ApprovalStatus, Identity, PartnerSummary, Role};

use crate::repository::user::UserRepository;

/// Computes the set of users an identity may chat with.
pub struct PartnerResolver<U: UserRepository> {
    users: U,
}

impl<U: UserRepository> PartnerResolver<U> {
    pub fn new(users: U) -> Self {
        Self { users }
    }

    /// List the partners of `identity`, ordered by id.
    ///
    /// Presence is not included; query the registry for that.
    pub async fn list_partners(
        &self,
        identity: &Identity,
    ) -> Result<Vec<PartnerSummary>, RepositoryError> {
        let role = identity.role.counterpart();
        let approval = match role {
            Role::Client => Some(ApprovalStatus::Approved),
            Role::Admin => None,
        };

        let accounts = self.users.list_by_role(role, approval).await?;
        Ok(accounts.iter().map(|a| a.partner_summary()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{InMemoryUsers, account, identity};
    use stockdesk_types::identity::UserId;

    fn resolver() -> PartnerResolver<InMemoryUsers> {
        PartnerResolver::new(InMemoryUsers::with(vec![
            account(1, "alice", Role::Admin, ApprovalStatus::Approved),
            account(2, "bob", Role::Client, ApprovalStatus::Approved),
            account(3, "carol", Role::Client, ApprovalStatus::Pending),
            account(4, "erin", Role::Admin, ApprovalStatus::Pending),
            account(5, "frank", Role::Client, ApprovalStatus::Approved),
        ]))
    }

    fn ids(partners: &[PartnerSummary]) -> Vec<UserId> {
        partners.iter().map(|p| p.id).collect()
    }

    #[tokio::test]
    async fn client_sees_every_admin() {
        let partners = resolver()
            .list_partners(&identity(2, "bob", Role::Client))
            .await
            .unwrap();
        assert_eq!(ids(&partners), vec![UserId(1), UserId(4)]);
        assert!(partners.iter().all(|p| p.role == Role::Admin));
    }

    #[tokio::test]
    async fn admin_sees_only_approved_clients() {
        let partners = resolver()
            .list_partners(&identity(1, "alice", Role::Admin))
            .await
            .unwrap();
        assert_eq!(ids(&partners), vec![UserId(2), UserId(5)]);
        assert_eq!(partners[0].username, "bob");
    }

    #[tokio::test]
    async fn resolution_is_symmetric_under_role_swap() {
        let resolver = resolver();
        let admins = resolver
            .list_partners(&identity(2, "bob", Role::Client))
            .await
            .unwrap();
        let clients = resolver
            .list_partners(&identity(1, "alice", Role::Admin))
            .await
            .unwrap();

        // Every admin a client sees lists that client back, and vice versa.
        for admin in &admins {
            let back = resolver
                .list_partners(&identity(admin.id.0, &admin.username, admin.role))
                .await
                .unwrap();
            assert!(back.iter().any(|p| p.id == UserId(2)));
        }
        for client in &clients {
            let back = resolver
                .list_partners(&identity(client.id.0, &client.username, client.role))
                .await
                .unwrap();
            assert!(back.iter().any(|p| p.id == UserId(1)));
        }
    }
}
