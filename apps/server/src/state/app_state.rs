//! Application state: every shared handle, owned in one place and passed by
//! construction. No component reaches for process globals.

use std::sync::Arc;

use tracing::{info, warn};

use crate::bots::BotManager;
use crate::config::ServerConfig;
use crate::error::AppError;
use crate::persistence::memory::InMemoryStore;
use crate::persistence::sea::SeaGameStore;
use crate::persistence::GameStore;
use crate::room::{RoomRegistry, RoomTimings};
use crate::state::security_config::SecurityConfig;

pub struct AppState {
    pub registry: Arc<RoomRegistry>,
    pub store: Arc<dyn GameStore>,
    pub security: SecurityConfig,
    pub config: ServerConfig,
}

impl AppState {
    /// Build the full state: store (Postgres when `DATABASE_URL` is set, the
    /// in-memory store otherwise), bot manager, and room registry.
    pub async fn build(config: ServerConfig) -> Result<Self, AppError> {
        let store: Arc<dyn GameStore> = match &config.database_url {
            Some(url) => {
                let store = SeaGameStore::connect(url)
                    .await
                    .map_err(|e| AppError::db_not_ready(e.to_string()))?;
                info!("connected to the event store");
                Arc::new(store)
            }
            None => {
                warn!("DATABASE_URL not set; events will only live in memory");
                Arc::new(InMemoryStore::new())
            }
        };
        Ok(Self::with_store(config, store))
    }

    /// Assemble state around an existing store (used by tests).
    pub fn with_store(config: ServerConfig, store: Arc<dyn GameStore>) -> Self {
        let bots = Arc::new(BotManager::from_config(&config));
        info!(strategy = bots.strategy_name(), "bot manager ready");
        let registry = Arc::new(RoomRegistry::new(
            store.clone(),
            bots,
            RoomTimings::new(config.turn_timeout),
        ));
        let security =
            SecurityConfig::new(config.player_token_secret.as_bytes(), config.player_token_ttl);
        Self {
            registry,
            store,
            security,
            config,
        }
    }
}
