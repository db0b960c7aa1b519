//! Bot strategy contract: a capability pair `{bid, play_card}` over read-only
//! snapshots. Strategies never touch room state; their decisions re-enter the
//! room as ordinary commands.

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::cards::{Card, Suit};
use crate::domain::engine;
use crate::domain::state::{GameId, GamePhase, GameState, PlayerId, TrickPlay};

#[derive(Debug)]
pub enum BotError {
    /// The strategy did not answer in time
    Timeout,
    /// Transport or protocol failure talking to a remote strategy
    Remote(String),
    /// The strategy produced something illegal
    InvalidDecision(String),
}

impl fmt::Display for BotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BotError::Timeout => write!(f, "bot decision timed out"),
            BotError::Remote(msg) => write!(f, "remote strategy failed: {msg}"),
            BotError::InvalidDecision(msg) => write!(f, "illegal bot decision: {msg}"),
        }
    }
}

impl std::error::Error for BotError {}

/// Read-only snapshot handed to a strategy for one decision. Also the JSON
/// body shipped to remote strategies, so it stays serializable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BotContext {
    pub game_id: GameId,
    pub player_id: PlayerId,
    pub phase: GamePhase,
    pub round_index: u8,
    pub cards_per_player: u8,
    /// Decisions draw jitter from this, so a replayed round gets identical
    /// bot behavior.
    pub round_seed: String,
    pub trump_suit: Option<Suit>,
    pub trump_broken: bool,
    pub led_suit: Option<Suit>,
    pub current_trick_plays: Vec<TrickPlay>,
    pub bids: BTreeMap<PlayerId, Option<u8>>,
    pub tricks_won: BTreeMap<PlayerId, u8>,
    pub cumulative_scores: BTreeMap<PlayerId, i32>,
    pub is_dealer: bool,
    pub hand: Vec<Card>,
    pub legal_bids: Vec<u8>,
    pub legal_plays: Vec<Card>,
}

impl BotContext {
    /// Snapshot the parts of the game a strategy may see. Returns None when
    /// there is no active round for the player.
    pub fn for_player(state: &GameState, player_id: &str) -> Option<Self> {
        let round = state.round.as_ref()?;
        let hand = state
            .player_states
            .get(player_id)
            .map(|ps| ps.hand.clone())
            .unwrap_or_default();
        let tricks_won = state
            .player_states
            .iter()
            .map(|(pid, ps)| (pid.clone(), ps.tricks_won))
            .collect();

        Some(Self {
            game_id: state.game_id.clone(),
            player_id: player_id.to_string(),
            phase: state.phase,
            round_index: round.round_index,
            cards_per_player: round.cards_per_player,
            round_seed: round.round_seed.clone(),
            trump_suit: round.trump_suit,
            trump_broken: round.trump_broken,
            led_suit: round.trick_in_progress.as_ref().and_then(|t| t.led_suit),
            current_trick_plays: round
                .trick_in_progress
                .as_ref()
                .map(|t| t.plays.clone())
                .unwrap_or_default(),
            bids: round.bids.clone(),
            tricks_won,
            cumulative_scores: state.cumulative_scores.clone(),
            is_dealer: round.dealer_player_id == player_id,
            hand,
            legal_bids: engine::legal_bids(state, player_id),
            legal_plays: engine::legal_plays(state, player_id),
        })
    }
}

/// A bot decision source. `Baseline` is pure and deterministic; `Remote`
/// calls out over HTTP and degrades to `Baseline`.
#[async_trait]
pub trait BotStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    async fn bid(&self, ctx: &BotContext) -> Result<u8, BotError>;

    async fn play_card(&self, ctx: &BotContext) -> Result<Card, BotError>;
}
