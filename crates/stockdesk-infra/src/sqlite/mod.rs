//! SQLite storage layer.
//!
//! Repository implementations backed by SQLite with WAL mode and split
//! read/write connection pools.

pub mod message;
pub mod pool;
pub mod user;

pub use message::SqliteMessageStore;
pub use pool::DatabasePool;
pub use user::SqliteUserRepository;
