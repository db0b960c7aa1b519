//! Rebuild game state from the event log alone.
//!
//! The fold applies each event's effect directly (it does not re-run the
//! engine), verifies the log is dense and single-game, and re-checks the
//! structural invariants after every step. A log that survives this is, by
//! construction, replayable byte-for-byte.

use crate::domain::errors::ReplayError;
use crate::domain::events::{EventRecord, GameEvent};
use crate::domain::state::{GamePhase, GameState, PlayerState, RoundState, TrickState};

fn corrupt(detail: impl Into<String>) -> ReplayError {
    ReplayError::CorruptLog {
        detail: detail.into(),
    }
}

/// Fold a full event log back into the state it produced.
pub fn replay_game(records: &[EventRecord]) -> Result<GameState, ReplayError> {
    let first = records.first().ok_or_else(|| corrupt("empty event log"))?;
    let GameEvent::GameCreated { config } = &first.event else {
        return Err(corrupt(format!(
            "log must open with GAME_CREATED, found {}",
            first.event.kind()
        )));
    };
    if first.event_index != 0 {
        return Err(corrupt(format!(
            "first event has index {}, expected 0",
            first.event_index
        )));
    }

    let (mut state, _) = crate::domain::engine::create_game(first.game_id.clone(), config.clone());
    state.created_at = first.timestamp;
    state.updated_at = first.timestamp;

    for (position, record) in records.iter().enumerate().skip(1) {
        if record.event_index != position as u64 {
            return Err(corrupt(format!(
                "event index {} at position {position}; the log has a gap or duplicate",
                record.event_index
            )));
        }
        if record.game_id != state.game_id {
            return Err(corrupt(format!(
                "event {} belongs to game {}, log is for {}",
                record.event_index, record.game_id, state.game_id
            )));
        }

        apply_event(&mut state, &record.event)?;
        state.updated_at = record.timestamp;

        state
            .verify_invariants()
            .map_err(|detail| ReplayError::InvariantViolation { detail })?;
    }

    Ok(state)
}

fn round_mut<'a>(state: &'a mut GameState) -> Result<&'a mut RoundState, ReplayError> {
    state
        .round
        .as_mut()
        .ok_or_else(|| corrupt("round event before ROUND_STARTED"))
}

fn apply_event(state: &mut GameState, event: &GameEvent) -> Result<(), ReplayError> {
    match event {
        GameEvent::GameCreated { .. } => {
            return Err(corrupt("duplicate GAME_CREATED"));
        }
        GameEvent::PlayerJoined { player } => {
            if state.player(&player.player_id).is_some() {
                return Err(corrupt(format!("{} joined twice", player.player_id)));
            }
            state.players.push(player.clone());
            if !player.spectator {
                state
                    .player_states
                    .insert(player.player_id.clone(), PlayerState::default());
                state.cumulative_scores.insert(player.player_id.clone(), 0);
            }
        }
        GameEvent::RoundStarted {
            round_index,
            cards_per_player,
            round_seed,
            dealer_player_id,
            starting_player_id,
        } => {
            let active: Vec<String> = state
                .active_players()
                .iter()
                .map(|p| p.player_id.clone())
                .collect();
            for pid in &active {
                state.player_states.insert(pid.clone(), PlayerState::default());
            }
            state.round = Some(RoundState {
                round_index: *round_index,
                cards_per_player: *cards_per_player,
                round_seed: round_seed.clone(),
                trump_card: None,
                trump_suit: None,
                trump_broken: false,
                bids: active.into_iter().map(|pid| (pid, None)).collect(),
                bidding_complete: false,
                trick_in_progress: None,
                completed_tricks: Vec::new(),
                dealer_player_id: dealer_player_id.clone(),
                starting_player_id: starting_player_id.clone(),
            });
            state.phase = GamePhase::Bidding;
        }
        GameEvent::CardsDealt { hands } => {
            for (pid, hand) in hands {
                let ps = state
                    .player_states
                    .get_mut(pid)
                    .ok_or_else(|| corrupt(format!("hand dealt to unknown player {pid}")))?;
                ps.hand = hand.clone();
            }
        }
        GameEvent::TrumpRevealed {
            trump_card,
            trump_suit,
        } => {
            let round = round_mut(state)?;
            round.trump_card = *trump_card;
            round.trump_suit = *trump_suit;
        }
        GameEvent::PlayerBid { player_id, bid } => {
            let round = round_mut(state)?;
            round.bids.insert(player_id.clone(), Some(*bid));
            let ps = state
                .player_states
                .get_mut(player_id)
                .ok_or_else(|| corrupt(format!("bid from unknown player {player_id}")))?;
            ps.bid = Some(*bid);
        }
        GameEvent::BiddingComplete { .. } => {
            let round = round_mut(state)?;
            round.bidding_complete = true;
            state.phase = GamePhase::Playing;
        }
        GameEvent::TrickStarted {
            trick_index,
            leader_player_id,
        } => {
            let round = round_mut(state)?;
            if round.trick_in_progress.is_some() {
                return Err(corrupt("TRICK_STARTED while a trick is in progress"));
            }
            round.trick_in_progress =
                Some(TrickState::open(*trick_index, leader_player_id.clone()));
        }
        GameEvent::CardPlayed {
            player_id,
            card,
            order,
        } => {
            let ps = state
                .player_states
                .get_mut(player_id)
                .ok_or_else(|| corrupt(format!("play from unknown player {player_id}")))?;
            let before = ps.hand.len();
            ps.hand.retain(|c| c != card);
            if ps.hand.len() == before {
                return Err(corrupt(format!(
                    "{player_id} played {} which is not in their hand",
                    card.id()
                )));
            }

            let round = round_mut(state)?;
            let trick = round
                .trick_in_progress
                .as_mut()
                .ok_or_else(|| corrupt("CARD_PLAYED outside a trick"))?;
            trick.led_suit.get_or_insert(card.suit);
            trick.plays.push(crate::domain::state::TrickPlay {
                player_id: player_id.clone(),
                card: *card,
                order: *order,
            });
        }
        GameEvent::TrumpBroken { .. } => {
            round_mut(state)?.trump_broken = true;
        }
        GameEvent::TrickCompleted {
            trick_index,
            winning_player_id,
            winning_card_id,
        } => {
            let round = round_mut(state)?;
            let mut trick = round
                .trick_in_progress
                .take()
                .ok_or_else(|| corrupt("TRICK_COMPLETED without a trick in progress"))?;
            if trick.trick_index != *trick_index {
                return Err(corrupt(format!(
                    "TRICK_COMPLETED for trick {trick_index}, current is {}",
                    trick.trick_index
                )));
            }
            trick.completed = true;
            trick.winning_player_id = Some(winning_player_id.clone());
            trick.winning_card_id = Some(winning_card_id.clone());
            round.completed_tricks.push(trick);

            let ps = state
                .player_states
                .get_mut(winning_player_id)
                .ok_or_else(|| corrupt(format!("unknown trick winner {winning_player_id}")))?;
            ps.tricks_won += 1;
        }
        GameEvent::RoundScored { summary } => {
            for (pid, delta) in &summary.deltas {
                *state.cumulative_scores.entry(pid.clone()).or_insert(0) += delta;
                if let Some(ps) = state.player_states.get_mut(pid) {
                    ps.round_score_delta = *delta;
                    ps.hand.clear();
                }
            }
            state.round_summaries.push(summary.clone());
            state.phase = GamePhase::Scoring;
        }
        GameEvent::GameCompleted { .. } => {
            state.phase = GamePhase::Completed;
        }
        GameEvent::InvalidAction { .. } => {
            // Recorded for stats; rejected actions change nothing.
        }
    }
    Ok(())
}
