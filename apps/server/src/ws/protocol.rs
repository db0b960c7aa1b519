//! Wire messages for the bidirectional game connection. Tags and field names
//! are part of the protocol; do not rename casually.

use serde::{Deserialize, Serialize};

use crate::domain::events::EventRecord;
use crate::domain::state::GameId;
use crate::domain::view::ClientGameView;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientMsg {
    #[serde(rename_all = "camelCase")]
    PlayCard { card_id: String },
    Bid {
        value: u8,
    },
    RequestState,
    #[serde(rename_all = "camelCase")]
    UpdateProfile {
        display_name: Option<String>,
        avatar_seed: Option<String>,
        color: Option<String>,
    },
    Ping {
        nonce: Option<String>,
    },
}

#[allow(clippy::large_enum_variant)]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerMsg {
    #[serde(rename_all = "camelCase")]
    Welcome {
        player_id: String,
        game_id: GameId,
        seat_index: Option<u8>,
        is_spectator: bool,
    },
    StateFull {
        state: ClientGameView,
    },
    GameEvent {
        event: EventRecord,
    },
    Pong {
        nonce: Option<String>,
        ts: i64,
    },
    #[serde(rename_all = "camelCase")]
    TokenRefresh { game_id: GameId, token: String },
    Error {
        code: String,
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_tags_are_wire_stable() {
        let msg: ClientMsg = serde_json::from_str(r#"{"type":"PLAY_CARD","cardId":"d0:S:A"}"#).unwrap();
        assert!(matches!(msg, ClientMsg::PlayCard { card_id } if card_id == "d0:S:A"));

        let msg: ClientMsg = serde_json::from_str(r#"{"type":"BID","value":3}"#).unwrap();
        assert!(matches!(msg, ClientMsg::Bid { value: 3 }));

        let msg: ClientMsg = serde_json::from_str(r#"{"type":"REQUEST_STATE"}"#).unwrap();
        assert!(matches!(msg, ClientMsg::RequestState));

        let msg: ClientMsg = serde_json::from_str(r#"{"type":"PING","nonce":"n1"}"#).unwrap();
        assert!(matches!(msg, ClientMsg::Ping { .. }));
    }

    #[test]
    fn server_tags_are_wire_stable() {
        let json = serde_json::to_value(ServerMsg::Welcome {
            player_id: "p1".into(),
            game_id: "g1".into(),
            seat_index: Some(0),
            is_spectator: false,
        })
        .unwrap();
        assert_eq!(json["type"], "WELCOME");
        assert_eq!(json["playerId"], "p1");
        assert_eq!(json["seatIndex"], 0);

        let json = serde_json::to_value(ServerMsg::TokenRefresh {
            game_id: "g1".into(),
            token: "t".into(),
        })
        .unwrap();
        assert_eq!(json["type"], "TOKEN_REFRESH");
        assert_eq!(json["gameId"], "g1");
    }

    #[test]
    fn malformed_frames_do_not_parse() {
        assert!(serde_json::from_str::<ClientMsg>("not json").is_err());
        assert!(serde_json::from_str::<ClientMsg>(r#"{"type":"NO_SUCH"}"#).is_err());
        assert!(serde_json::from_str::<ClientMsg>(r#"{"value":3}"#).is_err());
    }
}
