//! SQLite user repository.
//!
//! Implements `UserRepository` from `stockdesk-core` over the `users` table.

use chrono::{DateTime, Utc};
use sqlx::Row;
use stockdesk_core::repository::user::UserRepository;
use stockdesk_types::error::RepositoryError;
use stockdesk_types::identity::{ApprovalStatus, NewUserAccount, Role, UserAccount, UserId};

use super::pool::DatabasePool;

/// Placeholder stored for accounts seeded from the CLI. The auth service owns
/// real password hashes.
const UNSET_PASSWORD: &str = "!";

const SELECT_USER: &str =
    "SELECT id, email, username, role, approval_status, created_at FROM users";

pub struct SqliteUserRepository {
    pool: DatabasePool,
}

impl SqliteUserRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

struct UserRow {
    id: i64,
    email: String,
    username: String,
    role: String,
    approval_status: String,
    created_at: String,
}

impl UserRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            email: row.try_get("email")?,
            username: row.try_get("username")?,
            role: row.try_get("role")?,
            approval_status: row.try_get("approval_status")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn into_account(self) -> Result<UserAccount, RepositoryError> {
        let role: Role = self.role.parse().map_err(RepositoryError::Query)?;
        let approval_status: ApprovalStatus =
            self.approval_status.parse().map_err(RepositoryError::Query)?;

        Ok(UserAccount {
            id: UserId(self.id),
            email: self.email,
            username: self.username,
            role,
            approval_status,
            created_at: parse_datetime(&self.created_at)?,
        })
    }
}

pub(crate) fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

fn rows_to_accounts(rows: &[sqlx::sqlite::SqliteRow]) -> Result<Vec<UserAccount>, RepositoryError> {
    rows.iter()
        .map(|row| {
            UserRow::from_row(row)
                .map_err(|e| RepositoryError::Query(e.to_string()))?
                .into_account()
        })
        .collect()
}

impl UserRepository for SqliteUserRepository {
    async fn get_by_id(&self, id: UserId) -> Result<Option<UserAccount>, RepositoryError> {
        let row = sqlx::query(&format!("{SELECT_USER} WHERE id = ?"))
            .bind(id.as_i64())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        row.map(|r| {
            UserRow::from_row(&r)
                .map_err(|e| RepositoryError::Query(e.to_string()))?
                .into_account()
        })
        .transpose()
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<UserAccount>, RepositoryError> {
        let row = sqlx::query(&format!("{SELECT_USER} WHERE email = ?"))
            .bind(email)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        row.map(|r| {
            UserRow::from_row(&r)
                .map_err(|e| RepositoryError::Query(e.to_string()))?
                .into_account()
        })
        .transpose()
    }

    async fn list_by_role(
        &self,
        role: Role,
        approval: Option<ApprovalStatus>,
    ) -> Result<Vec<UserAccount>, RepositoryError> {
        let rows = match approval {
            Some(status) => {
                sqlx::query(&format!(
                    "{SELECT_USER} WHERE role = ? AND approval_status = ? ORDER BY id"
                ))
                .bind(role.to_string())
                .bind(status.to_string())
                .fetch_all(&self.pool.reader)
                .await
            }
            None => {
                sqlx::query(&format!("{SELECT_USER} WHERE role = ? ORDER BY id"))
                    .bind(role.to_string())
                    .fetch_all(&self.pool.reader)
                    .await
            }
        }
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        rows_to_accounts(&rows)
    }

    async fn list_all(&self) -> Result<Vec<UserAccount>, RepositoryError> {
        let rows = sqlx::query(&format!("{SELECT_USER} ORDER BY id"))
            .fetch_all(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        rows_to_accounts(&rows)
    }

    async fn create(&self, account: &NewUserAccount) -> Result<UserAccount, RepositoryError> {
        let created_at = Utc::now();

        let result = sqlx::query(
            "INSERT INTO users (email, username, hashed_password, role, approval_status, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&account.email)
        .bind(&account.username)
        .bind(UNSET_PASSWORD)
        .bind(account.role.to_string())
        .bind(account.approval_status.to_string())
        .bind(created_at.to_rfc3339())
        .execute(&self.pool.writer)
        .await;

        match result {
            Ok(done) => Ok(UserAccount {
                id: UserId(done.last_insert_rowid()),
                email: account.email.clone(),
                username: account.username.clone(),
                role: account.role,
                approval_status: account.approval_status,
                created_at,
            }),
            Err(sqlx::Error::Database(db_err)) if db_err.message().contains("UNIQUE") => {
                Err(RepositoryError::Conflict(format!(
                    "email '{}' or username '{}' already exists",
                    account.email, account.username
                )))
            }
            Err(e) => Err(RepositoryError::Query(e.to_string())),
        }
    }

    async fn set_approval(&self, id: UserId, status: ApprovalStatus) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE users SET approval_status = ? WHERE id = ?")
            .bind(status.to_string())
            .bind(id.as_i64())
            .execute(&self.pool.writer)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
