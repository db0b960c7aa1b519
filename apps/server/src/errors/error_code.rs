//! Transport-level error codes.
//!
//! Add new codes here; never pass ad-hoc strings as error codes. Each variant
//! maps 1:1 to the SCREAMING_SNAKE_CASE string that appears in HTTP and
//! websocket error bodies.

use core::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Frame or body was not parseable JSON
    InvalidJson,
    /// Parseable but semantically invalid input
    InvalidInput,
    /// Missing, malformed, or expired credentials
    Unauthorized,
    /// No room for the requested game id or join code
    RoomNotFound,
    /// Every seat is taken
    RoomFull,
    /// Unknown player or user id
    PlayerNotFound,
    /// Persistence backing store is not available
    DbNotReady,
    /// Anything we did not anticipate
    InternalError,
}

impl ErrorCode {
    /// Canonical wire string for this code.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidJson => "INVALID_JSON",
            Self::InvalidInput => "INVALID_INPUT",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::RoomNotFound => "ROOM_NOT_FOUND",
            Self::RoomFull => "ROOM_FULL",
            Self::PlayerNotFound => "PLAYER_NOT_FOUND",
            Self::DbNotReady => "DB_NOT_READY",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_strings_are_stable() {
        assert_eq!(ErrorCode::InvalidJson.as_str(), "INVALID_JSON");
        assert_eq!(ErrorCode::RoomNotFound.as_str(), "ROOM_NOT_FOUND");
        assert_eq!(ErrorCode::RoomFull.as_str(), "ROOM_FULL");
        assert_eq!(ErrorCode::DbNotReady.as_str(), "DB_NOT_READY");
        assert_eq!(
            serde_json::to_string(&ErrorCode::PlayerNotFound).unwrap(),
            "\"PLAYER_NOT_FOUND\""
        );
    }
}
