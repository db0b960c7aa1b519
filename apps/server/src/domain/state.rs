//! Game, round and trick state. Engine operations take a state and return a
//! new one; nothing here performs I/O.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::domain::cards::{Card, Suit};

pub type PlayerId = String;
pub type GameId = String;

pub const DEFAULT_ROUND_COUNT: u8 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameConfig {
    pub session_seed: String,
    pub round_count: u8,
    pub min_players: usize,
    pub max_players: usize,
}

impl GameConfig {
    pub fn new(session_seed: impl Into<String>) -> Self {
        Self {
            session_seed: session_seed.into(),
            round_count: DEFAULT_ROUND_COUNT,
            min_players: 2,
            max_players: 4,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GamePhase {
    Lobby,
    Bidding,
    Playing,
    Scoring,
    Completed,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlayerStatus {
    Active,
    Disconnected,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerProfile {
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_seed: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub player_id: PlayerId,
    /// Stable cross-game identity for lifetime stats; absent for bots and
    /// anonymous guests.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub seat_index: u8,
    pub profile: PlayerProfile,
    pub is_bot: bool,
    pub spectator: bool,
    pub status: PlayerStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerState {
    pub hand: Vec<Card>,
    pub tricks_won: u8,
    pub bid: Option<u8>,
    pub round_score_delta: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrickPlay {
    pub player_id: PlayerId,
    pub card: Card,
    pub order: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrickState {
    pub trick_index: u8,
    pub leader_player_id: PlayerId,
    pub led_suit: Option<Suit>,
    pub plays: Vec<TrickPlay>,
    pub completed: bool,
    pub winning_player_id: Option<PlayerId>,
    pub winning_card_id: Option<String>,
}

impl TrickState {
    pub fn open(trick_index: u8, leader_player_id: PlayerId) -> Self {
        Self {
            trick_index,
            leader_player_id,
            led_suit: None,
            plays: Vec::new(),
            completed: false,
            winning_player_id: None,
            winning_card_id: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundState {
    pub round_index: u8,
    pub cards_per_player: u8,
    pub round_seed: String,
    pub trump_card: Option<Card>,
    pub trump_suit: Option<Suit>,
    pub trump_broken: bool,
    /// One entry per active player; `None` until that player has bid.
    pub bids: BTreeMap<PlayerId, Option<u8>>,
    pub bidding_complete: bool,
    pub trick_in_progress: Option<TrickState>,
    pub completed_tricks: Vec<TrickState>,
    pub dealer_player_id: PlayerId,
    pub starting_player_id: PlayerId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundSummary {
    pub round_index: u8,
    pub cards_per_player: u8,
    pub trump_suit: Option<Suit>,
    pub bids: BTreeMap<PlayerId, u8>,
    pub tricks_won: BTreeMap<PlayerId, u8>,
    pub deltas: BTreeMap<PlayerId, i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    pub game_id: GameId,
    pub config: GameConfig,
    pub phase: GamePhase,
    /// Ordered by seat index; seat indices are stable for the game's life.
    pub players: Vec<Player>,
    pub player_states: BTreeMap<PlayerId, PlayerState>,
    pub cumulative_scores: BTreeMap<PlayerId, i32>,
    pub round: Option<RoundState>,
    pub round_summaries: Vec<RoundSummary>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl GameState {
    /// Non-spectator players in seat order.
    pub fn active_players(&self) -> Vec<&Player> {
        self.players.iter().filter(|p| !p.spectator).collect()
    }

    pub fn active_player_count(&self) -> usize {
        self.players.iter().filter(|p| !p.spectator).count()
    }

    pub fn player(&self, player_id: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.player_id == player_id)
    }

    pub fn player_mut(&mut self, player_id: &str) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.player_id == player_id)
    }

    /// Active player ids starting at `from` and continuing in seat order,
    /// wrapping around the table.
    pub fn seat_order_from(&self, from: &str) -> Vec<PlayerId> {
        let active = self.active_players();
        let Some(start) = active.iter().position(|p| p.player_id == from) else {
            return Vec::new();
        };
        (0..active.len())
            .map(|i| active[(start + i) % active.len()].player_id.clone())
            .collect()
    }

    /// The active player seated left of (after) `of`.
    pub fn player_left_of(&self, of: &str) -> Option<PlayerId> {
        let order = self.seat_order_from(of);
        order.get(1).cloned().or_else(|| order.first().cloned())
    }

    /// Whose action the game is waiting on, if anyone's.
    pub fn current_turn(&self) -> Option<PlayerId> {
        let round = self.round.as_ref()?;
        match self.phase {
            GamePhase::Bidding => {
                // Bids may arrive in any order; the nominal turn used for
                // timers and bots walks seat order from the starting player.
                let order = self.seat_order_from(&round.starting_player_id);
                order
                    .into_iter()
                    .find(|pid| matches!(round.bids.get(pid), Some(None)))
            }
            GamePhase::Playing => {
                let leader = match &round.trick_in_progress {
                    Some(trick) => {
                        let order = self.seat_order_from(&trick.leader_player_id);
                        return order.get(trick.plays.len()).cloned();
                    }
                    None => round
                        .completed_tricks
                        .last()
                        .and_then(|t| t.winning_player_id.clone())
                        .unwrap_or_else(|| round.starting_player_id.clone()),
                };
                Some(leader)
            }
            _ => None,
        }
    }

    /// Check the structural invariants that must hold at all times.
    pub fn verify_invariants(&self) -> Result<(), String> {
        // Seat indices are unique.
        let mut seats = BTreeSet::new();
        for p in &self.players {
            if !p.spectator && !seats.insert(p.seat_index) {
                return Err(format!("duplicate seat index {}", p.seat_index));
            }
        }

        // Cumulative scores are exactly the sum of round summary deltas.
        let mut expected: BTreeMap<&str, i32> = BTreeMap::new();
        for summary in &self.round_summaries {
            for (pid, delta) in &summary.deltas {
                *expected.entry(pid.as_str()).or_default() += delta;
            }
        }
        for p in self.active_players() {
            let have = self.cumulative_scores.get(&p.player_id).copied().unwrap_or(0);
            let want = expected.get(p.player_id.as_str()).copied().unwrap_or(0);
            if have != want {
                return Err(format!(
                    "cumulative score mismatch for {}: {have} != {want}",
                    p.player_id
                ));
            }
        }

        // Card conservation and uniqueness while a round's cards are live.
        // A round's cards become live at CARDS_DEALT, so a freshly-started
        // round with empty hands is exempt.
        if let Some(round) = &self.round {
            let dealt = self
                .player_states
                .values()
                .any(|ps| !ps.hand.is_empty())
                || !round.completed_tricks.is_empty()
                || round.trick_in_progress.is_some();
            if dealt && matches!(self.phase, GamePhase::Bidding | GamePhase::Playing) {
                let n = self.active_player_count();
                let expected_total = round.cards_per_player as usize * n;

                let mut seen: BTreeSet<String> = BTreeSet::new();
                let mut total = 0usize;

                for p in self.active_players() {
                    let hand = self
                        .player_states
                        .get(&p.player_id)
                        .map(|s| s.hand.as_slice())
                        .unwrap_or(&[]);
                    for card in hand {
                        if !seen.insert(card.id()) {
                            return Err(format!("card {} appears twice", card.id()));
                        }
                    }
                    total += hand.len();
                }

                for trick in round
                    .completed_tricks
                    .iter()
                    .chain(round.trick_in_progress.iter())
                {
                    for play in &trick.plays {
                        if !seen.insert(play.card.id()) {
                            return Err(format!("card {} appears twice", play.card.id()));
                        }
                        total += 1;
                    }
                }

                if total != expected_total {
                    return Err(format!(
                        "card conservation broken: {total} cards live, expected {expected_total}"
                    ));
                }
            }
        }

        Ok(())
    }
}
