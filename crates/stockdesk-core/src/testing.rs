//! In-memory doubles for the repository and resolver ports, shared by the
//! unit tests in this crate.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use stockdesk_types::chat::{ChatMessage, NewChatMessage};
use stockdesk_types::error::{AuthError, RepositoryError};
use stockdesk_types::identity::{
    ApprovalStatus, Identity, NewUserAccount, Role, UserAccount, UserId,
};

use crate::presence::IdentityResolver;
use crate::repository::message::MessageStore;
use crate::repository::user::UserRepository;

pub fn account(id: i64, username: &str, role: Role, status: ApprovalStatus) -> UserAccount {
    UserAccount {
        id: UserId(id),
        email: format!("{username}@example.com"),
        username: username.to_string(),
        role,
        approval_status: status,
        created_at: Utc::now(),
    }
}

pub fn identity(id: i64, username: &str, role: Role) -> Identity {
    Identity {
        id: UserId(id),
        username: username.to_string(),
        role,
    }
}

// --- Identity resolver ---

#[derive(Default)]
pub struct StaticResolver {
    tokens: HashMap<String, UserAccount>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(mut self, token: &str, account: UserAccount) -> Self {
        self.tokens.insert(token.to_string(), account);
        self
    }
}

impl IdentityResolver for StaticResolver {
    async fn resolve_identity(&self, token: &str) -> Result<UserAccount, AuthError> {
        self.tokens
            .get(token)
            .cloned()
            .ok_or_else(|| AuthError::InvalidToken("unknown token".to_string()))
    }
}

// --- Users ---

#[derive(Clone, Default)]
pub struct InMemoryUsers {
    accounts: Arc<Mutex<Vec<UserAccount>>>,
}

impl InMemoryUsers {
    pub fn with(accounts: Vec<UserAccount>) -> Self {
        Self {
            accounts: Arc::new(Mutex::new(accounts)),
        }
    }
}

impl UserRepository for InMemoryUsers {
    async fn get_by_id(&self, id: UserId) -> Result<Option<UserAccount>, RepositoryError> {
        Ok(self.accounts.lock().unwrap().iter().find(|a| a.id == id).cloned())
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<UserAccount>, RepositoryError> {
        Ok(self
            .accounts
            .lock()
            .unwrap()
            .iter()
            .find(|a| a.email == email)
            .cloned())
    }

    async fn list_by_role(
        &self,
        role: Role,
        approval: Option<ApprovalStatus>,
    ) -> Result<Vec<UserAccount>, RepositoryError> {
        Ok(self
            .accounts
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.role == role)
            .filter(|a| approval.is_none_or(|s| a.approval_status == s))
            .cloned()
            .collect())
    }

    async fn list_all(&self) -> Result<Vec<UserAccount>, RepositoryError> {
        Ok(self.accounts.lock().unwrap().clone())
    }

    async fn create(&self, new: &NewUserAccount) -> Result<UserAccount, RepositoryError> {
        let mut accounts = self.accounts.lock().unwrap();
        let id = accounts.iter().map(|a| a.id.0).max().unwrap_or(0) + 1;
        let account = UserAccount {
            id: UserId(id),
            email: new.email.clone(),
            username: new.username.clone(),
            role: new.role,
            approval_status: new.approval_status,
            created_at: Utc::now(),
        };
        accounts.push(account.clone());
        Ok(account)
    }

    async fn set_approval(
        &self,
        id: UserId,
        status: ApprovalStatus,
    ) -> Result<(), RepositoryError> {
        let mut accounts = self.accounts.lock().unwrap();
        let account = accounts
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or(RepositoryError::NotFound)?;
        account.approval_status = status;
        Ok(())
    }
}

// --- Messages ---

#[derive(Clone, Default)]
pub struct InMemoryMessages {
    rows: Arc<Mutex<Vec<ChatMessage>>>,
    failing: Arc<AtomicBool>,
}

impl InMemoryMessages {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with a query error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn all(&self) -> Vec<ChatMessage> {
        self.rows.lock().unwrap().clone()
    }

    fn check(&self) -> Result<(), RepositoryError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(RepositoryError::Query("database is locked".to_string()))
        } else {
            Ok(())
        }
    }
}

impl MessageStore for InMemoryMessages {
    async fn insert(&self, message: &NewChatMessage) -> Result<ChatMessage, RepositoryError> {
        self.check()?;
        let mut rows = self.rows.lock().unwrap();
        let stored = message.clone().with_id(rows.len() as i64 + 1);
        rows.push(stored.clone());
        Ok(stored)
    }

    async fn mark_read(
        &self,
        sender_id: UserId,
        receiver_id: UserId,
    ) -> Result<u64, RepositoryError> {
        self.check()?;
        let mut count = 0;
        for row in self.rows.lock().unwrap().iter_mut() {
            if row.sender_id == sender_id && row.receiver_id == receiver_id && !row.is_read {
                row.is_read = true;
                count += 1;
            }
        }
        Ok(count)
    }

    async fn history(
        &self,
        user_a: UserId,
        user_b: UserId,
    ) -> Result<Vec<ChatMessage>, RepositoryError> {
        self.check()?;
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|m| {
                (m.sender_id == user_a && m.receiver_id == user_b)
                    || (m.sender_id == user_b && m.receiver_id == user_a)
            })
            .cloned()
            .collect())
    }

    async fn unread_count_for(&self, user_id: UserId) -> Result<u64, RepositoryError> {
        self.check()?;
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.receiver_id == user_id && !m.is_read)
            .count() as u64)
    }

    async fn unread_grouped_by_sender(
        &self,
        user_id: UserId,
    ) -> Result<BTreeMap<UserId, Vec<ChatMessage>>, RepositoryError> {
        self.check()?;
        let mut grouped: BTreeMap<UserId, Vec<ChatMessage>> = BTreeMap::new();
        for row in self.rows.lock().unwrap().iter() {
            if row.receiver_id == user_id && !row.is_read {
                grouped.entry(row.sender_id).or_default().push(row.clone());
            }
        }
        Ok(grouped)
    }
}
