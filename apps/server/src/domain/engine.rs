//! Pure state transitions. Every operation takes a state snapshot and returns
//! `(new_state, events)` or an error; errors never mutate state, and nothing
//! here touches a clock or performs I/O. Timestamps and event indices are
//! assigned later, when the room commits the events.

use std::collections::BTreeMap;

use crate::domain::cards::{hand_has_suit, Card};
use crate::domain::dealing::{cards_per_player_for_round, deal_round};
use crate::domain::errors::EngineError;
use crate::domain::events::GameEvent;
use crate::domain::rng::round_seed;
use crate::domain::scoring::{round_delta, winners};
use crate::domain::state::{
    GameConfig, GameId, GamePhase, GameState, Player, PlayerId, PlayerProfile, PlayerState,
    PlayerStatus, RoundState, RoundSummary, TrickPlay, TrickState,
};
use crate::domain::tricks::resolve_winner;

/// Seat request for a joining player.
#[derive(Debug, Clone)]
pub struct SeatRequest {
    pub player_id: PlayerId,
    pub user_id: Option<String>,
    pub profile: PlayerProfile,
    pub is_bot: bool,
    pub spectator: bool,
}

/// Initialize a fresh game in the lobby.
pub fn create_game(game_id: impl Into<GameId>, config: GameConfig) -> (GameState, Vec<GameEvent>) {
    let state = GameState {
        game_id: game_id.into(),
        config: config.clone(),
        phase: GamePhase::Lobby,
        players: Vec::new(),
        player_states: BTreeMap::new(),
        cumulative_scores: BTreeMap::new(),
        round: None,
        round_summaries: Vec::new(),
        created_at: 0,
        updated_at: 0,
    };
    (state, vec![GameEvent::GameCreated { config }])
}

/// Seat a player (or attach a spectator). Seats are handed out in join order
/// and stay stable for the life of the game.
pub fn add_player(
    state: &GameState,
    request: SeatRequest,
) -> Result<(GameState, Vec<GameEvent>), EngineError> {
    if state.player(&request.player_id).is_some() {
        return Err(EngineError::round_not_ready(format!(
            "player {} already seated",
            request.player_id
        )));
    }
    if !request.spectator {
        if state.phase != GamePhase::Lobby {
            return Err(EngineError::round_not_ready(
                "cannot take a seat after the game has started",
            ));
        }
        if state.active_player_count() >= state.config.max_players {
            return Err(EngineError::round_not_ready("no free seats"));
        }
    }

    let mut next = state.clone();
    let player = Player {
        player_id: request.player_id.clone(),
        user_id: request.user_id,
        seat_index: next.players.len() as u8,
        profile: request.profile,
        is_bot: request.is_bot,
        spectator: request.spectator,
        status: PlayerStatus::Active,
    };
    next.players.push(player.clone());
    if !request.spectator {
        next.player_states
            .insert(request.player_id.clone(), PlayerState::default());
        next.cumulative_scores.insert(request.player_id, 0);
    }

    Ok((next, vec![GameEvent::PlayerJoined { player }]))
}

/// Start the next round: rotate the dealer, deal seeded hands, reveal trump.
pub fn start_round(state: &GameState) -> Result<(GameState, Vec<GameEvent>), EngineError> {
    if !matches!(state.phase, GamePhase::Lobby | GamePhase::Scoring) {
        return Err(EngineError::round_not_ready(format!(
            "cannot start a round from {:?}",
            state.phase
        )));
    }
    let active: Vec<PlayerId> = state
        .active_players()
        .iter()
        .map(|p| p.player_id.clone())
        .collect();
    if active.len() < state.config.min_players {
        return Err(EngineError::round_not_ready(format!(
            "need at least {} players, have {}",
            state.config.min_players,
            active.len()
        )));
    }

    let round_index = match &state.round {
        Some(round) => round.round_index + 1,
        None => 0,
    };
    if round_index >= state.config.round_count {
        return Err(EngineError::round_not_ready("all rounds already played"));
    }

    let cards_per_player = cards_per_player_for_round(state.config.round_count, round_index);
    let seed = round_seed(&state.config.session_seed, round_index);
    let deal = deal_round(&seed, active.len(), cards_per_player);

    let dealer_player_id = active[round_index as usize % active.len()].clone();
    let starting_player_id = state
        .player_left_of(&dealer_player_id)
        .unwrap_or_else(|| dealer_player_id.clone());

    let mut next = state.clone();
    let mut hands: BTreeMap<PlayerId, Vec<Card>> = BTreeMap::new();
    for (seat, pid) in active.iter().enumerate() {
        let hand = deal.hands[seat].clone();
        hands.insert(pid.clone(), hand.clone());
        next.player_states.insert(
            pid.clone(),
            PlayerState {
                hand,
                tricks_won: 0,
                bid: None,
                round_score_delta: 0,
            },
        );
    }

    next.round = Some(RoundState {
        round_index,
        cards_per_player,
        round_seed: seed.clone(),
        trump_card: deal.trump_card,
        trump_suit: deal.trump_suit,
        trump_broken: false,
        bids: active.iter().map(|pid| (pid.clone(), None)).collect(),
        bidding_complete: false,
        trick_in_progress: None,
        completed_tricks: Vec::new(),
        dealer_player_id: dealer_player_id.clone(),
        starting_player_id: starting_player_id.clone(),
    });
    next.phase = GamePhase::Bidding;

    let events = vec![
        GameEvent::RoundStarted {
            round_index,
            cards_per_player,
            round_seed: seed,
            dealer_player_id,
            starting_player_id,
        },
        GameEvent::CardsDealt { hands },
        GameEvent::TrumpRevealed {
            trump_card: deal.trump_card,
            trump_suit: deal.trump_suit,
        },
    ];

    Ok((next, events))
}

/// Record a bid. Bids may arrive in any order; the dealer is constrained by
/// the hook rule once every other bid is in.
pub fn apply_bid(
    state: &GameState,
    player_id: &str,
    bid: u8,
) -> Result<(GameState, Vec<GameEvent>), EngineError> {
    if state.phase != GamePhase::Bidding {
        return Err(EngineError::round_not_ready("not in the bidding phase"));
    }
    let round = state
        .round
        .as_ref()
        .ok_or_else(|| EngineError::round_not_ready("no round in progress"))?;

    match round.bids.get(player_id) {
        None => {
            return Err(EngineError::invalid_bid(format!(
                "{player_id} is not bidding in this round"
            )))
        }
        Some(Some(_)) => {
            return Err(EngineError::invalid_bid(format!(
                "{player_id} has already bid"
            )))
        }
        Some(None) => {}
    }
    if bid > round.cards_per_player {
        return Err(EngineError::invalid_bid(format!(
            "bid {bid} outside 0..={}",
            round.cards_per_player
        )));
    }

    // Hook rule: the dealer may not land total bids exactly on the number of
    // tricks once everyone else has committed.
    if player_id == round.dealer_player_id {
        let others: Vec<u8> = round
            .bids
            .iter()
            .filter(|(pid, _)| pid.as_str() != player_id)
            .filter_map(|(_, b)| *b)
            .collect();
        if others.len() == round.bids.len() - 1 {
            let total: u32 = others.iter().map(|b| *b as u32).sum::<u32>() + bid as u32;
            if total == round.cards_per_player as u32 {
                return Err(EngineError::hook_violation(format!(
                    "dealer bid {bid} would make total bids equal {} tricks",
                    round.cards_per_player
                )));
            }
        }
    }

    let mut next = state.clone();
    let mut events = vec![GameEvent::PlayerBid {
        player_id: player_id.to_string(),
        bid,
    }];

    if let Some(ps) = next.player_states.get_mut(player_id) {
        ps.bid = Some(bid);
    }
    if let Some(round) = next.round.as_mut() {
        round.bids.insert(player_id.to_string(), Some(bid));
        if round.bids.values().all(|b| b.is_some()) {
            round.bidding_complete = true;
            let bids: BTreeMap<PlayerId, u8> = round
                .bids
                .iter()
                .filter_map(|(pid, b)| b.map(|value| (pid.clone(), value)))
                .collect();
            events.push(GameEvent::BiddingComplete { bids });
            next.phase = GamePhase::Playing;
        }
    }

    Ok((next, events))
}

/// Play a card. May cascade through trick completion and round scoring.
pub fn play_card(
    state: &GameState,
    player_id: &str,
    card_id: &str,
) -> Result<(GameState, Vec<GameEvent>), EngineError> {
    let round = state
        .round
        .as_ref()
        .ok_or_else(|| EngineError::invalid_play("no round in progress"))?;
    if state.phase != GamePhase::Playing || !round.bidding_complete {
        return Err(EngineError::invalid_play("not in the playing phase"));
    }

    let expected = state
        .current_turn()
        .ok_or_else(|| EngineError::invalid_play("no player is expected to act"))?;
    if expected != player_id {
        return Err(EngineError::not_players_turn(format!(
            "it is {expected}'s turn, not {player_id}'s"
        )));
    }

    let card = Card::parse_id(card_id)
        .ok_or_else(|| EngineError::invalid_play(format!("unrecognized card id {card_id}")))?;
    let hand = state
        .player_states
        .get(player_id)
        .map(|ps| ps.hand.as_slice())
        .unwrap_or(&[]);
    if !hand.contains(&card) {
        return Err(EngineError::card_not_in_hand(format!(
            "{card_id} is not in {player_id}'s hand"
        )));
    }

    let leading = round.trick_in_progress.is_none();
    let led_suit = round.trick_in_progress.as_ref().and_then(|t| t.led_suit);

    // Follow suit when able.
    if let Some(led) = led_suit {
        if card.suit != led && hand_has_suit(hand, led) {
            return Err(EngineError::must_follow_suit(format!("must follow {led:?}")));
        }
    }

    // No leading trump until it is broken, unless the hand is all trump.
    if leading {
        if let Some(trump) = round.trump_suit {
            if !round.trump_broken && card.suit == trump && hand.iter().any(|c| c.suit != trump) {
                return Err(EngineError::cannot_lead_trump("trump has not been broken"));
            }
        }
    }

    let n = state.active_player_count();
    let mut next = state.clone();
    let mut events = Vec::new();

    if let Some(ps) = next.player_states.get_mut(player_id) {
        ps.hand.retain(|c| *c != card);
    }

    let mut trick_full = false;
    if let Some(round) = next.round.as_mut() {
        if round.trick_in_progress.is_none() {
            let trick_index = round.completed_tricks.len() as u8;
            round.trick_in_progress = Some(TrickState::open(trick_index, player_id.to_string()));
            events.push(GameEvent::TrickStarted {
                trick_index,
                leader_player_id: player_id.to_string(),
            });
        }

        let mut led = card.suit;
        let mut plays_len = 0;
        if let Some(trick) = round.trick_in_progress.as_mut() {
            let order = trick.plays.len() as u8;
            led = *trick.led_suit.get_or_insert(card.suit);
            trick.plays.push(TrickPlay {
                player_id: player_id.to_string(),
                card,
                order,
            });
            events.push(GameEvent::CardPlayed {
                player_id: player_id.to_string(),
                card,
                order,
            });
            plays_len = trick.plays.len();
        }

        if let Some(trump) = round.trump_suit {
            if !round.trump_broken && led != trump && card.suit == trump {
                round.trump_broken = true;
                events.push(GameEvent::TrumpBroken {
                    player_id: player_id.to_string(),
                });
            }
        }

        trick_full = plays_len == n;
    }

    if trick_full {
        complete_trick(&mut next, &mut events)?;
    }

    Ok((next, events))
}

/// Resolve a full trick. Internal continuation of `play_card`.
fn complete_trick(state: &mut GameState, events: &mut Vec<GameEvent>) -> Result<(), EngineError> {
    let n = state.active_player_count();

    let (winner, trick_index, round_done) = {
        let round = state
            .round
            .as_mut()
            .ok_or_else(|| EngineError::trick_incomplete("no round in progress"))?;
        let mut trick = round
            .trick_in_progress
            .take()
            .ok_or_else(|| EngineError::trick_incomplete("no trick in progress"))?;
        if trick.plays.len() != n {
            let have = trick.plays.len();
            round.trick_in_progress = Some(trick);
            return Err(EngineError::trick_incomplete(format!(
                "trick has {have} of {n} plays"
            )));
        }

        let led = trick
            .led_suit
            .ok_or_else(|| EngineError::trick_incomplete("trick has no led suit"))?;
        let winner = resolve_winner(&trick.plays, led, round.trump_suit)
            .ok_or_else(|| EngineError::trick_incomplete("trick has no plays"))?
            .clone();

        trick.completed = true;
        trick.winning_player_id = Some(winner.player_id.clone());
        trick.winning_card_id = Some(winner.card.id());
        let trick_index = trick.trick_index;
        round.completed_tricks.push(trick);
        let round_done = round.completed_tricks.len() == round.cards_per_player as usize;
        (winner, trick_index, round_done)
    };

    if let Some(ps) = state.player_states.get_mut(&winner.player_id) {
        ps.tricks_won += 1;
    }

    events.push(GameEvent::TrickCompleted {
        trick_index,
        winning_player_id: winner.player_id.clone(),
        winning_card_id: winner.card.id(),
    });

    if round_done {
        score_round(state, events)?;
    }
    Ok(())
}

/// Score a finished round. Internal continuation of `complete_trick`.
fn score_round(state: &mut GameState, events: &mut Vec<GameEvent>) -> Result<(), EngineError> {
    let active: Vec<PlayerId> = state
        .active_players()
        .iter()
        .map(|p| p.player_id.clone())
        .collect();
    let round = state
        .round
        .as_ref()
        .ok_or_else(|| EngineError::round_not_complete("no round in progress"))?;
    if round.completed_tricks.len() != round.cards_per_player as usize {
        return Err(EngineError::round_not_complete(format!(
            "{} of {} tricks played",
            round.completed_tricks.len(),
            round.cards_per_player
        )));
    }

    let mut bids = BTreeMap::new();
    let mut tricks_won = BTreeMap::new();
    let mut deltas = BTreeMap::new();
    for pid in &active {
        let ps = state
            .player_states
            .get(pid)
            .ok_or_else(|| EngineError::round_not_complete(format!("no state for {pid}")))?;
        let bid = ps
            .bid
            .ok_or_else(|| EngineError::round_not_complete(format!("{pid} never bid")))?;
        let delta = round_delta(bid, ps.tricks_won);
        bids.insert(pid.clone(), bid);
        tricks_won.insert(pid.clone(), ps.tricks_won);
        deltas.insert(pid.clone(), delta);
    }

    let summary = RoundSummary {
        round_index: round.round_index,
        cards_per_player: round.cards_per_player,
        trump_suit: round.trump_suit,
        bids,
        tricks_won,
        deltas: deltas.clone(),
    };
    let last_round = round.round_index + 1 == state.config.round_count;

    for pid in &active {
        let delta = deltas[pid];
        *state.cumulative_scores.entry(pid.clone()).or_insert(0) += delta;
        if let Some(ps) = state.player_states.get_mut(pid) {
            ps.round_score_delta = delta;
            ps.hand.clear();
        }
    }
    state.round_summaries.push(summary.clone());
    events.push(GameEvent::RoundScored { summary });

    if last_round {
        state.phase = GamePhase::Completed;
        let final_scores = state.cumulative_scores.clone();
        let winner_ids = winners(&final_scores);
        events.push(GameEvent::GameCompleted {
            final_scores,
            winner_ids,
        });
    } else {
        state.phase = GamePhase::Scoring;
    }
    Ok(())
}

/// Bids currently legal for a player, with the hook rule applied when the
/// dealer closes the auction. Used by bots and timeout fallbacks.
pub fn legal_bids(state: &GameState, player_id: &str) -> Vec<u8> {
    let Some(round) = &state.round else {
        return Vec::new();
    };
    if state.phase != GamePhase::Bidding || !matches!(round.bids.get(player_id), Some(None)) {
        return Vec::new();
    }
    (0..=round.cards_per_player)
        .filter(|bid| apply_bid(state, player_id, *bid).is_ok())
        .collect()
}

/// Cards the player could legally play right now.
pub fn legal_plays(state: &GameState, player_id: &str) -> Vec<Card> {
    let Some(round) = &state.round else {
        return Vec::new();
    };
    if state.phase != GamePhase::Playing {
        return Vec::new();
    }
    let hand = state
        .player_states
        .get(player_id)
        .map(|ps| ps.hand.clone())
        .unwrap_or_default();

    let led_suit = round.trick_in_progress.as_ref().and_then(|t| t.led_suit);
    if let Some(led) = led_suit {
        if hand_has_suit(&hand, led) {
            return hand.into_iter().filter(|c| c.suit == led).collect();
        }
        return hand;
    }

    // Leading a fresh trick.
    if let Some(trump) = round.trump_suit {
        if !round.trump_broken && hand.iter().any(|c| c.suit != trump) {
            return hand.into_iter().filter(|c| c.suit != trump).collect();
        }
    }
    hand
}
