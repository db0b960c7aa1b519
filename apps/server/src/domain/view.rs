//! Client-facing projection of game state. Only the viewer's own hand is
//! populated; everyone else is reduced to a hand count.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::cards::Card;
use crate::domain::state::{
    GameId, GamePhase, GameState, PlayerId, PlayerProfile, PlayerStatus, RoundState,
    RoundSummary, TrickState,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatView {
    pub player_id: PlayerId,
    pub seat_index: u8,
    pub profile: PlayerProfile,
    pub is_bot: bool,
    pub spectator: bool,
    pub status: PlayerStatus,
    pub hand_count: usize,
    pub tricks_won: u8,
    pub bid: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YouView {
    pub player_id: PlayerId,
    pub seat_index: Option<u8>,
    pub is_spectator: bool,
    pub hand: Vec<Card>,
}

/// Public slice of the round: everything except hands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundView {
    pub round_index: u8,
    pub cards_per_player: u8,
    pub trump_card: Option<Card>,
    pub trump_suit: Option<crate::domain::cards::Suit>,
    pub trump_broken: bool,
    pub bids: BTreeMap<PlayerId, Option<u8>>,
    pub bidding_complete: bool,
    pub trick_in_progress: Option<TrickState>,
    pub completed_tricks: Vec<TrickState>,
    pub dealer_player_id: PlayerId,
    pub starting_player_id: PlayerId,
}

impl RoundView {
    fn from_round(round: &RoundState) -> Self {
        Self {
            round_index: round.round_index,
            cards_per_player: round.cards_per_player,
            trump_card: round.trump_card,
            trump_suit: round.trump_suit,
            trump_broken: round.trump_broken,
            bids: round.bids.clone(),
            bidding_complete: round.bidding_complete,
            trick_in_progress: round.trick_in_progress.clone(),
            completed_tricks: round.completed_tricks.clone(),
            dealer_player_id: round.dealer_player_id.clone(),
            starting_player_id: round.starting_player_id.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientGameView {
    pub game_id: GameId,
    pub phase: GamePhase,
    pub players: Vec<SeatView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub you: Option<YouView>,
    pub round: Option<RoundView>,
    pub cumulative_scores: BTreeMap<PlayerId, i32>,
    pub round_summaries: Vec<RoundSummary>,
    pub current_turn: Option<PlayerId>,
}

/// Project the state for one viewer (None for an anonymous spectator).
pub fn client_view(state: &GameState, viewer: Option<&str>) -> ClientGameView {
    let players = state
        .players
        .iter()
        .map(|p| {
            let ps = state.player_states.get(&p.player_id);
            SeatView {
                player_id: p.player_id.clone(),
                seat_index: p.seat_index,
                profile: p.profile.clone(),
                is_bot: p.is_bot,
                spectator: p.spectator,
                status: p.status,
                hand_count: ps.map(|s| s.hand.len()).unwrap_or(0),
                tricks_won: ps.map(|s| s.tricks_won).unwrap_or(0),
                bid: ps.and_then(|s| s.bid),
            }
        })
        .collect();

    let you = viewer.and_then(|pid| {
        state.player(pid).map(|p| YouView {
            player_id: p.player_id.clone(),
            seat_index: (!p.spectator).then_some(p.seat_index),
            is_spectator: p.spectator,
            hand: state
                .player_states
                .get(pid)
                .map(|ps| ps.hand.clone())
                .unwrap_or_default(),
        })
    });

    ClientGameView {
        game_id: state.game_id.clone(),
        phase: state.phase,
        players,
        you,
        round: state.round.as_ref().map(RoundView::from_round),
        cumulative_scores: state.cumulative_scores.clone(),
        round_summaries: state.round_summaries.clone(),
        current_turn: state.current_turn(),
    }
}
