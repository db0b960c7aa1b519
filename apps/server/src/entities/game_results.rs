use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One row per finished game: the full outcome rollup as JSON.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "game_results")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false, column_name = "game_id")]
    pub game_id: String,
    #[sea_orm(column_type = "Text")]
    pub summary: String,
    #[sea_orm(column_name = "completed_at")]
    pub completed_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
