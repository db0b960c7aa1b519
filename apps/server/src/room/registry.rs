//! Process-wide room directory: `game_id → room` and `join_code → game_id`.
//! Rooms remove themselves from the maps when their worker exits.

use std::sync::{Arc, Weak};

use dashmap::DashMap;
use tracing::{info, warn};

use crate::bots::BotManager;
use crate::domain::state::{GameConfig, GameId};
use crate::error::AppError;
use crate::persistence::GameStore;
use crate::room::command::RoomCommand;
use crate::room::worker::{spawn_room, RoomHandle, RoomTimings};
use crate::utils::join_code::{generate_join_code, MAX_GENERATION_ATTEMPTS};

pub struct RoomRegistry {
    rooms: DashMap<GameId, RoomHandle>,
    join_codes: DashMap<String, GameId>,
    code_by_game: DashMap<GameId, String>,
    store: Arc<dyn GameStore>,
    bots: Arc<BotManager>,
    timings: RoomTimings,
}

impl RoomRegistry {
    pub fn new(store: Arc<dyn GameStore>, bots: Arc<BotManager>, timings: RoomTimings) -> Self {
        Self {
            rooms: DashMap::new(),
            join_codes: DashMap::new(),
            code_by_game: DashMap::new(),
            store,
            bots,
            timings,
        }
    }

    /// Create a room with a fresh game id and unique join code.
    pub fn create_room(
        self: &Arc<Self>,
        config: GameConfig,
    ) -> Result<(RoomHandle, String), AppError> {
        let game_id = format!("g_{}", ulid::Ulid::new().to_string().to_lowercase());

        let join_code = (0..MAX_GENERATION_ATTEMPTS)
            .map(|_| generate_join_code())
            .find(|code| !self.join_codes.contains_key(code))
            .ok_or_else(|| AppError::internal("could not allocate a unique join code"))?;

        let registry: Weak<RoomRegistry> = Arc::downgrade(self);
        let cleanup_game_id = game_id.clone();
        let on_exit = Box::new(move || {
            if let Some(registry) = registry.upgrade() {
                registry.forget(&cleanup_game_id);
            }
        });

        let handle = spawn_room(
            game_id.clone(),
            config,
            self.timings.clone(),
            self.store.clone(),
            self.bots.clone(),
            on_exit,
        );

        self.rooms.insert(game_id.clone(), handle.clone());
        self.join_codes.insert(join_code.clone(), game_id.clone());
        self.code_by_game.insert(game_id.clone(), join_code.clone());
        info!(game_id = %game_id, join_code = %join_code, "room created");

        Ok((handle, join_code))
    }

    pub fn room(&self, game_id: &str) -> Option<RoomHandle> {
        self.rooms.get(game_id).map(|r| r.value().clone())
    }

    pub fn room_by_join_code(&self, join_code: &str) -> Option<RoomHandle> {
        let game_id = self.join_codes.get(join_code)?.value().clone();
        self.room(&game_id)
    }

    pub fn active_rooms(&self) -> usize {
        self.rooms.len()
    }

    fn forget(&self, game_id: &str) {
        self.rooms.remove(game_id);
        if let Some((_, code)) = self.code_by_game.remove(game_id) {
            self.join_codes.remove(&code);
        }
        info!(game_id = %game_id, "room unregistered");
    }

    /// Ask every room to shut down (flush, goodbye, exit).
    pub async fn shutdown_all(&self) {
        let handles: Vec<RoomHandle> = self.rooms.iter().map(|r| r.value().clone()).collect();
        for handle in handles {
            if handle.send(RoomCommand::Shutdown).await.is_err() {
                warn!(game_id = %handle.game_id, "room already gone during shutdown");
            }
        }
    }
}
