//! Player token auth: HS256 tokens bound to a `(game, player)` pair.

pub mod claims;
pub mod tokens;

pub use claims::PlayerClaims;
pub use tokens::{mint_player_token, verify_for_game, verify_player_token};
