//! Durable storage behind the rooms: an append-only event store plus the
//! end-of-game rollups. The in-memory log inside each room is the short-term
//! source of truth; this adapter trails it with retries.

pub mod memory;
pub mod sea;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::events::EventRecord;
use crate::domain::stats::{GameOutcome, LifetimeStats, PlayerOutcome};

#[derive(Debug, Error)]
pub enum StoreError {
    /// `(game_id, event_index)` is unique; a second write of the same slot is
    /// either a replayed retry (harmless) or a gap (corruption).
    #[error("event {index} for game {game_id} is out of sequence")]
    OutOfSequence { game_id: String, index: u64 },
    #[error("store backend unavailable: {0}")]
    Unavailable(String),
    #[error("store backend error: {0}")]
    Backend(String),
}

impl From<sea_orm::DbErr> for StoreError {
    fn from(err: sea_orm::DbErr) -> Self {
        match err {
            sea_orm::DbErr::Conn(e) => StoreError::Unavailable(e.to_string()),
            other => StoreError::Backend(other.to_string()),
        }
    }
}

/// Append/rollup contract. Implementations must make `append_events` atomic
/// per call: either every record lands with its index, or none do.
#[async_trait]
pub trait GameStore: Send + Sync {
    async fn append_events(&self, game_id: &str, records: &[EventRecord])
        -> Result<(), StoreError>;

    async fn load_events(&self, game_id: &str) -> Result<Vec<EventRecord>, StoreError>;

    async fn finalize_game(&self, outcome: &GameOutcome) -> Result<(), StoreError>;

    async fn update_player_lifetime(
        &self,
        user_id: &str,
        outcome: &PlayerOutcome,
    ) -> Result<(), StoreError>;

    async fn get_player_lifetime(&self, user_id: &str)
        -> Result<Option<LifetimeStats>, StoreError>;
}
