//! In-memory store: the DB-less dev/test stand-in for the Postgres adapter.
//! Enforces the same `(game_id, event_index)` uniqueness contract.

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;

use crate::domain::events::EventRecord;
use crate::domain::stats::{apply_outcome, GameOutcome, LifetimeStats, PlayerOutcome};
use crate::persistence::{GameStore, StoreError};

#[derive(Default)]
pub struct InMemoryStore {
    events: DashMap<String, Mutex<Vec<EventRecord>>>,
    results: DashMap<String, GameOutcome>,
    lifetime: DashMap<String, LifetimeStats>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GameStore for InMemoryStore {
    async fn append_events(
        &self,
        game_id: &str,
        records: &[EventRecord],
    ) -> Result<(), StoreError> {
        let entry = self
            .events
            .entry(game_id.to_string())
            .or_insert_with(|| Mutex::new(Vec::new()));
        let mut log = entry.lock();

        // Validate the whole batch before touching the log: all-or-nothing.
        for (offset, record) in records.iter().enumerate() {
            let expected = log.len() as u64 + offset as u64;
            if record.event_index < expected {
                // Retried batch that already landed; at-most-once append.
                continue;
            }
            if record.event_index != expected {
                return Err(StoreError::OutOfSequence {
                    game_id: game_id.to_string(),
                    index: record.event_index,
                });
            }
        }

        for record in records {
            if record.event_index == log.len() as u64 {
                log.push(record.clone());
            }
        }
        Ok(())
    }

    async fn load_events(&self, game_id: &str) -> Result<Vec<EventRecord>, StoreError> {
        Ok(self
            .events
            .get(game_id)
            .map(|entry| entry.lock().clone())
            .unwrap_or_default())
    }

    async fn finalize_game(&self, outcome: &GameOutcome) -> Result<(), StoreError> {
        self.results.insert(outcome.game_id.clone(), outcome.clone());
        Ok(())
    }

    async fn update_player_lifetime(
        &self,
        user_id: &str,
        outcome: &PlayerOutcome,
    ) -> Result<(), StoreError> {
        let mut stats = self.lifetime.entry(user_id.to_string()).or_default();
        apply_outcome(&mut stats, outcome);
        Ok(())
    }

    async fn get_player_lifetime(
        &self,
        user_id: &str,
    ) -> Result<Option<LifetimeStats>, StoreError> {
        Ok(self.lifetime.get(user_id).map(|s| s.value().clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::events::GameEvent;
    use crate::domain::state::GameConfig;

    fn record(index: u64) -> EventRecord {
        EventRecord {
            event: GameEvent::GameCreated {
                config: GameConfig::new("seed"),
            },
            event_index: index,
            timestamp: 0,
            game_id: "g1".to_string(),
        }
    }

    #[tokio::test]
    async fn appends_are_contiguous() {
        let store = InMemoryStore::new();
        store
            .append_events("g1", &[record(0), record(1)])
            .await
            .unwrap();
        store.append_events("g1", &[record(2)]).await.unwrap();

        let log = store.load_events("g1").await.unwrap();
        assert_eq!(log.len(), 3);
    }

    #[tokio::test]
    async fn gap_is_rejected_atomically() {
        let store = InMemoryStore::new();
        store.append_events("g1", &[record(0)]).await.unwrap();

        let err = store
            .append_events("g1", &[record(1), record(3)])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::OutOfSequence { index: 3, .. }));

        // Nothing from the failed batch landed.
        assert_eq!(store.load_events("g1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn replayed_batch_is_idempotent() {
        let store = InMemoryStore::new();
        store
            .append_events("g1", &[record(0), record(1)])
            .await
            .unwrap();
        // A retry re-sends an already-persisted prefix.
        store
            .append_events("g1", &[record(0), record(1), record(2)])
            .await
            .unwrap();

        assert_eq!(store.load_events("g1").await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn lifetime_rollup_accumulates() {
        let store = InMemoryStore::new();
        let outcome = PlayerOutcome {
            player_id: "p1".into(),
            user_id: Some("u1".into()),
            is_bot: false,
            final_score: 12,
            is_winner: true,
            total_tricks: 9,
            highest_bid: Some(3),
            longest_win_streak: 2,
            longest_loss_streak: 1,
            misplays: 0,
        };
        store.update_player_lifetime("u1", &outcome).await.unwrap();
        store.update_player_lifetime("u1", &outcome).await.unwrap();

        let stats = store.get_player_lifetime("u1").await.unwrap().unwrap();
        assert_eq!(stats.games_played, 2);
        assert_eq!(stats.games_won, 2);
        assert_eq!(stats.most_consecutive_wins, 2);
        assert!(store.get_player_lifetime("u2").await.unwrap().is_none());
    }
}
