use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Per-user rollup across games, keyed by the stable user id (bots and
/// anonymous guests have none and are never written here).
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "player_lifetime_stats")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false, column_name = "user_id")]
    pub user_id: String,
    #[sea_orm(column_name = "games_played")]
    pub games_played: i32,
    #[sea_orm(column_name = "games_won")]
    pub games_won: i32,
    #[sea_orm(column_name = "max_score")]
    pub max_score: Option<i32>,
    #[sea_orm(column_name = "min_score")]
    pub min_score: Option<i32>,
    #[sea_orm(column_name = "current_win_streak")]
    pub current_win_streak: i32,
    #[sea_orm(column_name = "current_loss_streak")]
    pub current_loss_streak: i32,
    #[sea_orm(column_name = "most_consecutive_wins")]
    pub most_consecutive_wins: i32,
    #[sea_orm(column_name = "most_consecutive_losses")]
    pub most_consecutive_losses: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
