#![cfg_attr(not(test), deny(clippy::expect_used, clippy::unwrap_used, clippy::panic, clippy::todo, clippy::unimplemented))]

pub mod auth;
pub mod bots;
pub mod config;
pub mod domain;
pub mod entities;
pub mod error;
pub mod errors;
pub mod persistence;
pub mod room;
pub mod routes;
pub mod state;
pub mod utils;
pub mod ws;

// Re-exports for public API
pub use auth::{mint_player_token, verify_for_game, verify_player_token, PlayerClaims};
pub use config::ServerConfig;
pub use error::AppError;
pub use errors::ErrorCode;
pub use state::app_state::AppState;
pub use state::security_config::SecurityConfig;

// Auto-initialize logging for unit tests
#[cfg(test)]
#[ctor::ctor]
fn init_test_logging() {
    server_test_support::logging::init();
}
