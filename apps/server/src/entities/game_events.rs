use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Append-only event rows. `(game_id, event_index)` carries a unique index so
/// replayed writes collide instead of forking the log.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "game_events")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(column_name = "game_id")]
    pub game_id: String,
    #[sea_orm(column_name = "event_index")]
    pub event_index: i64,
    #[sea_orm(column_name = "event_type")]
    pub event_type: String,
    #[sea_orm(column_type = "Text")]
    pub payload: String,
    pub timestamp: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
