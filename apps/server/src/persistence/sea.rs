//! SeaORM/Postgres implementation of the store contract.
//!
//! Schema expectations: `game_events` carries a unique index on
//! `(game_id, event_index)`; `game_results` and `player_lifetime_stats` are
//! keyed by their ids. Writes are idempotent so the room's retry loop can
//! re-send a batch safely.

use async_trait::async_trait;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Database, DatabaseConnection, DbErr, EntityTrait, Order,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};

use crate::domain::events::EventRecord;
use crate::domain::stats::{apply_outcome, GameOutcome, LifetimeStats, PlayerOutcome};
use crate::entities::{game_events, game_results, player_lifetime_stats};
use crate::persistence::{GameStore, StoreError};

pub struct SeaGameStore {
    db: DatabaseConnection,
}

impl SeaGameStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let db = Database::connect(database_url)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(Self::new(db))
    }
}

fn record_to_row(record: &EventRecord) -> Result<game_events::ActiveModel, StoreError> {
    let envelope = serde_json::to_value(&record.event)
        .map_err(|e| StoreError::Backend(format!("event not serializable: {e}")))?;
    let payload = envelope
        .get("payload")
        .cloned()
        .unwrap_or(serde_json::Value::Null);

    Ok(game_events::ActiveModel {
        id: sea_orm::NotSet,
        game_id: Set(record.game_id.clone()),
        event_index: Set(record.event_index as i64),
        event_type: Set(record.event.kind().to_string()),
        payload: Set(payload.to_string()),
        timestamp: Set(record.timestamp),
    })
}

fn row_to_record(row: game_events::Model) -> Result<EventRecord, StoreError> {
    let payload: serde_json::Value = serde_json::from_str(&row.payload)
        .map_err(|e| StoreError::Backend(format!("stored payload is not JSON: {e}")))?;
    let envelope = serde_json::json!({
        "type": row.event_type,
        "payload": payload,
        "eventIndex": row.event_index as u64,
        "timestamp": row.timestamp,
        "gameId": row.game_id,
    });
    serde_json::from_value(envelope)
        .map_err(|e| StoreError::Backend(format!("stored event does not decode: {e}")))
}

fn stats_from_row(row: &player_lifetime_stats::Model) -> LifetimeStats {
    LifetimeStats {
        games_played: row.games_played as u32,
        games_won: row.games_won as u32,
        max_score: row.max_score,
        min_score: row.min_score,
        current_win_streak: row.current_win_streak as u32,
        current_loss_streak: row.current_loss_streak as u32,
        most_consecutive_wins: row.most_consecutive_wins as u32,
        most_consecutive_losses: row.most_consecutive_losses as u32,
    }
}

#[async_trait]
impl GameStore for SeaGameStore {
    async fn append_events(
        &self,
        _game_id: &str,
        records: &[EventRecord],
    ) -> Result<(), StoreError> {
        if records.is_empty() {
            return Ok(());
        }
        let rows = records
            .iter()
            .map(record_to_row)
            .collect::<Result<Vec<_>, _>>()?;

        let txn = self.db.begin().await?;
        let insert = game_events::Entity::insert_many(rows)
            .on_conflict(
                OnConflict::columns([
                    game_events::Column::GameId,
                    game_events::Column::EventIndex,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec(&txn)
            .await;
        match insert {
            // Every row already present: a replayed batch, not an error.
            Err(DbErr::RecordNotInserted) | Ok(_) => {}
            Err(other) => return Err(other.into()),
        }
        txn.commit().await?;
        Ok(())
    }

    async fn load_events(&self, game_id: &str) -> Result<Vec<EventRecord>, StoreError> {
        let rows = game_events::Entity::find()
            .filter(game_events::Column::GameId.eq(game_id))
            .order_by(game_events::Column::EventIndex, Order::Asc)
            .all(&self.db)
            .await?;
        rows.into_iter().map(row_to_record).collect()
    }

    async fn finalize_game(&self, outcome: &GameOutcome) -> Result<(), StoreError> {
        let summary = serde_json::to_string(outcome)
            .map_err(|e| StoreError::Backend(format!("outcome not serializable: {e}")))?;
        let row = game_results::ActiveModel {
            game_id: Set(outcome.game_id.clone()),
            summary: Set(summary),
            completed_at: Set(time::OffsetDateTime::now_utc().unix_timestamp()),
        };

        game_results::Entity::insert(row)
            .on_conflict(
                OnConflict::column(game_results::Column::GameId)
                    .update_columns([
                        game_results::Column::Summary,
                        game_results::Column::CompletedAt,
                    ])
                    .to_owned(),
            )
            .exec(&self.db)
            .await?;
        Ok(())
    }

    async fn update_player_lifetime(
        &self,
        user_id: &str,
        outcome: &PlayerOutcome,
    ) -> Result<(), StoreError> {
        let txn = self.db.begin().await?;

        let existing = player_lifetime_stats::Entity::find_by_id(user_id.to_string())
            .one(&txn)
            .await?;
        let mut stats = existing.as_ref().map(stats_from_row).unwrap_or_default();
        apply_outcome(&mut stats, outcome);

        let row = player_lifetime_stats::ActiveModel {
            user_id: Set(user_id.to_string()),
            games_played: Set(stats.games_played as i32),
            games_won: Set(stats.games_won as i32),
            max_score: Set(stats.max_score),
            min_score: Set(stats.min_score),
            current_win_streak: Set(stats.current_win_streak as i32),
            current_loss_streak: Set(stats.current_loss_streak as i32),
            most_consecutive_wins: Set(stats.most_consecutive_wins as i32),
            most_consecutive_losses: Set(stats.most_consecutive_losses as i32),
        };
        if existing.is_some() {
            row.update(&txn).await?;
        } else {
            row.insert(&txn).await?;
        }

        txn.commit().await?;
        Ok(())
    }

    async fn get_player_lifetime(
        &self,
        user_id: &str,
    ) -> Result<Option<LifetimeStats>, StoreError> {
        let row = player_lifetime_stats::Entity::find_by_id(user_id.to_string())
            .one(&self.db)
            .await?;
        Ok(row.as_ref().map(stats_from_row))
    }
}
