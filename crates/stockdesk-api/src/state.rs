//! Application state wiring.
//!
//! `AppContext` is what every command needs: data dir, config, database and
//! the user repository. `AppState` adds the chat services and is only built
//! for commands that need a signing key (`serve`, `token`).

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use secrecy::{ExposeSecret, SecretString};
use stockdesk_core::chat::{DeliveryCoordinator, PartnerResolver};
use stockdesk_core::presence::{ConnectionRegistry, PresenceGate};
use stockdesk_infra::auth::JwtIdentityResolver;
use stockdesk_infra::config::{JWT_SECRET_ENV, load_server_config, resolve_database_url};
use stockdesk_infra::filesystem::{ensure_data_dir, resolve_data_dir};
use stockdesk_infra::sqlite::{DatabasePool, SqliteMessageStore, SqliteUserRepository};
use stockdesk_types::config::ServerConfig;

/// Concrete type aliases pinning the core generics to the SQLite adapters.
pub type ConcreteCoordinator = DeliveryCoordinator<SqliteUserRepository, SqliteMessageStore>;
pub type ConcreteResolver = JwtIdentityResolver<SqliteUserRepository>;
pub type ConcreteGate = PresenceGate<ConcreteResolver>;
pub type ConcretePartners = PartnerResolver<SqliteUserRepository>;

/// Storage and configuration shared by all commands.
pub struct AppContext {
    pub data_dir: PathBuf,
    pub config: Arc<ServerConfig>,
    pub db_pool: DatabasePool,
    pub users: SqliteUserRepository,
}

impl AppContext {
    /// Resolve the data dir, load config, and open (migrating) the database.
    pub async fn init() -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();
        ensure_data_dir(&data_dir)
            .await
            .with_context(|| format!("creating data directory {}", data_dir.display()))?;

        let config = Arc::new(load_server_config(&data_dir).await);
        let database_url = resolve_database_url(&config, &data_dir);
        let db_pool = DatabasePool::connect(&database_url)
            .await
            .with_context(|| format!("opening database {database_url}"))?;

        Ok(Self {
            users: SqliteUserRepository::new(db_pool.clone()),
            data_dir,
            config,
            db_pool,
        })
    }

    /// Build a token resolver over a fresh user repository.
    ///
    /// Fails if no signing key is configured.
    pub fn token_resolver(&self) -> anyhow::Result<ConcreteResolver> {
        let secret = self
            .config
            .jwt_secret
            .as_ref()
            .map(|s| s.expose_secret())
            .filter(|s| !s.is_empty())
            .with_context(|| {
                format!(
                    "no JWT secret configured: set {JWT_SECRET_ENV} or `jwt_secret` in {}",
                    self.data_dir.join("config.toml").display()
                )
            })?;

        Ok(JwtIdentityResolver::new(
            SqliteUserRepository::new(self.db_pool.clone()),
            SecretString::from(secret.to_string()),
            self.config.jwt_expiration_secs,
        ))
    }
}

/// Shared server state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<ConcreteCoordinator>,
    pub gate: Arc<ConcreteGate>,
    pub partners: Arc<ConcretePartners>,
    pub registry: Arc<ConnectionRegistry>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    /// Wire the chat services on top of an initialized context.
    pub fn from_context(ctx: &AppContext) -> anyhow::Result<Self> {
        let gate = PresenceGate::new(ctx.token_resolver()?);
        let registry = Arc::new(ConnectionRegistry::new());

        let coordinator = DeliveryCoordinator::new(
            SqliteUserRepository::new(ctx.db_pool.clone()),
            SqliteMessageStore::new(ctx.db_pool.clone()),
            Arc::clone(&registry),
        );
        let partners = PartnerResolver::new(SqliteUserRepository::new(ctx.db_pool.clone()));

        Ok(Self {
            coordinator: Arc::new(coordinator),
            gate: Arc::new(gate),
            partners: Arc::new(partners),
            registry,
            config: Arc::clone(&ctx.config),
        })
    }
}
