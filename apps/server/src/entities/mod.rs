//! SeaORM entities for the persistence adapter.

pub mod game_events;
pub mod game_results;
pub mod player_lifetime_stats;
