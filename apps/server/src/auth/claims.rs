//! Claims carried by player tokens.

use serde::{Deserialize, Serialize};

pub const TOKEN_ISSUER: &str = "eldorado";
pub const TOKEN_AUDIENCE: &str = "eldorado-players";

/// Claims bound to one `(game, player)` pair. A token is only good for the
/// game it was minted for.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PlayerClaims {
    /// Player id
    pub sub: String,
    pub game_id: String,
    pub seat_index: Option<u8>,
    pub is_spectator: bool,
    pub iss: String,
    pub aud: String,
    /// Issued-at (seconds since epoch)
    pub iat: i64,
    /// Expiry (seconds since epoch)
    pub exp: i64,
}
