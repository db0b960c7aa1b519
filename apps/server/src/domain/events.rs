//! Game events. The append-only log of `EventRecord`s is the system of
//! record; live state and every client view are projections of it.
//!
//! Wire shape per record: `{type, payload, eventIndex, timestamp, gameId}`.
//! Serialization must stay byte-stable: map-valued payloads use `BTreeMap`
//! so key order never depends on hash seeds.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::cards::{Card, Suit};
use crate::domain::errors::EngineErrorCode;
use crate::domain::state::{GameConfig, GameId, Player, PlayerId, RoundSummary};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    content = "payload",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum GameEvent {
    GameCreated {
        config: GameConfig,
    },
    PlayerJoined {
        player: Player,
    },
    RoundStarted {
        round_index: u8,
        cards_per_player: u8,
        round_seed: String,
        dealer_player_id: PlayerId,
        starting_player_id: PlayerId,
    },
    CardsDealt {
        hands: BTreeMap<PlayerId, Vec<Card>>,
    },
    TrumpRevealed {
        trump_card: Option<Card>,
        trump_suit: Option<Suit>,
    },
    PlayerBid {
        player_id: PlayerId,
        bid: u8,
    },
    BiddingComplete {
        bids: BTreeMap<PlayerId, u8>,
    },
    TrickStarted {
        trick_index: u8,
        leader_player_id: PlayerId,
    },
    CardPlayed {
        player_id: PlayerId,
        card: Card,
        order: u8,
    },
    TrumpBroken {
        player_id: PlayerId,
    },
    TrickCompleted {
        trick_index: u8,
        winning_player_id: PlayerId,
        winning_card_id: String,
    },
    RoundScored {
        summary: RoundSummary,
    },
    GameCompleted {
        final_scores: BTreeMap<PlayerId, i32>,
        winner_ids: Vec<PlayerId>,
    },
    InvalidAction {
        player_id: PlayerId,
        code: EngineErrorCode,
        message: String,
    },
}

impl GameEvent {
    /// The wire tag, also used as the `event_type` column in storage.
    pub const fn kind(&self) -> &'static str {
        match self {
            GameEvent::GameCreated { .. } => "GAME_CREATED",
            GameEvent::PlayerJoined { .. } => "PLAYER_JOINED",
            GameEvent::RoundStarted { .. } => "ROUND_STARTED",
            GameEvent::CardsDealt { .. } => "CARDS_DEALT",
            GameEvent::TrumpRevealed { .. } => "TRUMP_REVEALED",
            GameEvent::PlayerBid { .. } => "PLAYER_BID",
            GameEvent::BiddingComplete { .. } => "BIDDING_COMPLETE",
            GameEvent::TrickStarted { .. } => "TRICK_STARTED",
            GameEvent::CardPlayed { .. } => "CARD_PLAYED",
            GameEvent::TrumpBroken { .. } => "TRUMP_BROKEN",
            GameEvent::TrickCompleted { .. } => "TRICK_COMPLETED",
            GameEvent::RoundScored { .. } => "ROUND_SCORED",
            GameEvent::GameCompleted { .. } => "GAME_COMPLETED",
            GameEvent::InvalidAction { .. } => "INVALID_ACTION",
        }
    }

    /// Hand-hiding projection for broadcast. CARDS_DEALT carries every hand
    /// in the log; a connection only ever receives its own. All other events
    /// are public as-is (CARD_PLAYED reveals the card to the table anyway).
    pub fn redacted_for(&self, viewer: Option<&str>) -> GameEvent {
        match self {
            GameEvent::CardsDealt { hands } => {
                let own: BTreeMap<PlayerId, Vec<Card>> = hands
                    .iter()
                    .filter(|(pid, _)| Some(pid.as_str()) == viewer)
                    .map(|(pid, hand)| (pid.clone(), hand.clone()))
                    .collect();
                GameEvent::CardsDealt { hands: own }
            }
            other => other.clone(),
        }
    }
}

/// One committed log entry. `event_index` is dense, 0-based and monotonic per
/// game; the timestamp is assigned by the room at commit time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    #[serde(flatten)]
    pub event: GameEvent,
    pub event_index: u64,
    pub timestamp: i64,
    pub game_id: GameId,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cards::Rank;

    #[test]
    fn record_wire_shape_is_stable() {
        let record = EventRecord {
            event: GameEvent::PlayerBid {
                player_id: "p1".into(),
                bid: 3,
            },
            event_index: 7,
            timestamp: 1_700_000_000_000,
            game_id: "g1".into(),
        };
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(
            json,
            r#"{"type":"PLAYER_BID","payload":{"playerId":"p1","bid":3},"eventIndex":7,"timestamp":1700000000000,"gameId":"g1"}"#
        );
        let back: EventRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn cards_dealt_is_redacted_per_viewer() {
        let mut hands = BTreeMap::new();
        hands.insert("p1".to_string(), vec![Card::new(Suit::Hearts, Rank::Ace, 0)]);
        hands.insert("p2".to_string(), vec![Card::new(Suit::Clubs, Rank::Two, 0)]);
        let event = GameEvent::CardsDealt { hands };

        let GameEvent::CardsDealt { hands: for_p1 } = event.redacted_for(Some("p1")) else {
            panic!("redaction changed the event type");
        };
        assert!(for_p1.contains_key("p1"));
        assert!(!for_p1.contains_key("p2"));

        let GameEvent::CardsDealt { hands: for_spectator } = event.redacted_for(None) else {
            panic!("redaction changed the event type");
        };
        assert!(for_spectator.is_empty());
    }

    #[test]
    fn public_events_pass_through_redaction() {
        let event = GameEvent::CardPlayed {
            player_id: "p2".into(),
            card: Card::new(Suit::Spades, Rank::King, 0),
            order: 1,
        };
        assert_eq!(event.redacted_for(Some("p1")), event);
    }

    #[test]
    fn kind_matches_tag() {
        let event = GameEvent::TrumpBroken {
            player_id: "p1".into(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], event.kind());
    }
}
