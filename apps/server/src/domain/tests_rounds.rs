use crate::domain::engine;
use crate::domain::errors::EngineErrorCode;
use crate::domain::events::GameEvent;
use crate::domain::scoring::round_delta;
use crate::domain::state::GamePhase;
use crate::domain::test_helpers::{lobby, run_seeded_game, seat_request};

#[test]
fn start_round_deals_and_enters_bidding() {
    let (state, _) = lobby("seed", 10, 4);
    let (state, events) = engine::start_round(&state).unwrap();

    assert_eq!(state.phase, GamePhase::Bidding);
    let round = state.round.as_ref().unwrap();
    assert_eq!(round.round_index, 0);
    assert_eq!(round.cards_per_player, 10);
    assert_eq!(round.round_seed, "seed:0");
    assert_eq!(round.dealer_player_id, "p1");
    assert_eq!(round.starting_player_id, "p2");

    for pid in ["p1", "p2", "p3", "p4"] {
        assert_eq!(state.player_states[pid].hand.len(), 10);
    }

    let kinds: Vec<&str> = events.iter().map(|e| e.kind()).collect();
    assert_eq!(kinds, ["ROUND_STARTED", "CARDS_DEALT", "TRUMP_REVEALED"]);
    state.verify_invariants().unwrap();
}

#[test]
fn start_round_requires_enough_players() {
    let (state, _) = lobby("seed", 10, 1);
    let err = engine::start_round(&state).unwrap_err();
    assert_eq!(err.code, EngineErrorCode::RoundNotReady);
}

#[test]
fn start_round_rejected_mid_round() {
    let (state, _) = lobby("seed", 10, 3);
    let (state, _) = engine::start_round(&state).unwrap();
    let err = engine::start_round(&state).unwrap_err();
    assert_eq!(err.code, EngineErrorCode::RoundNotReady);
}

#[test]
fn seating_is_closed_once_started() {
    let (state, _) = lobby("seed", 10, 2);
    let (state, _) = engine::start_round(&state).unwrap();
    let err = engine::add_player(&state, seat_request("p9")).unwrap_err();
    assert_eq!(err.code, EngineErrorCode::RoundNotReady);
}

#[test]
fn dealer_rotates_every_round() {
    let (state, records) = run_seeded_game("rotate", 3, 3, "actions");
    assert_eq!(state.phase, GamePhase::Completed);

    let dealers: Vec<String> = records
        .iter()
        .filter_map(|r| match &r.event {
            GameEvent::RoundStarted {
                dealer_player_id, ..
            } => Some(dealer_player_id.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(dealers, ["p1", "p2", "p3"]);
}

#[test]
fn scoring_law_holds_for_every_round() {
    let (state, _) = run_seeded_game("law", 4, 3, "actions");
    assert_eq!(state.round_summaries.len(), 4);

    for summary in &state.round_summaries {
        let tricks_total: u32 = summary.tricks_won.values().map(|t| *t as u32).sum();
        assert_eq!(tricks_total, summary.cards_per_player as u32);
        for (pid, delta) in &summary.deltas {
            let bid = summary.bids[pid];
            let tricks = summary.tricks_won[pid];
            assert_eq!(*delta, round_delta(bid, tricks));
        }
    }
}

#[test]
fn cumulative_scores_are_the_sum_of_deltas() {
    let (state, _) = run_seeded_game("sums", 5, 4, "actions");
    state.verify_invariants().unwrap();

    for (pid, total) in &state.cumulative_scores {
        let expected: i32 = state
            .round_summaries
            .iter()
            .filter_map(|s| s.deltas.get(pid))
            .sum();
        assert_eq!(total, &expected);
    }
}

#[test]
fn game_completes_after_the_last_round() {
    let (state, records) = run_seeded_game("finish", 2, 2, "actions");
    assert_eq!(state.phase, GamePhase::Completed);

    let last = records.last().unwrap();
    let GameEvent::GameCompleted {
        final_scores,
        winner_ids,
    } = &last.event
    else {
        panic!("log must end with GAME_COMPLETED, got {}", last.event.kind());
    };
    assert_eq!(final_scores, &state.cumulative_scores);

    let top = final_scores.values().max().unwrap();
    for pid in winner_ids {
        assert_eq!(final_scores[pid], *top);
    }
}

#[test]
fn phases_never_move_backwards() {
    let (_, records) = run_seeded_game("forward", 3, 3, "actions");

    // Phase rank: LOBBY 0, BIDDING 1, PLAYING 2, SCORING 3; a new round may
    // re-enter BIDDING, but only from SCORING, and COMPLETED is terminal.
    let mut phase = GamePhase::Lobby;
    for record in &records {
        let next = match &record.event {
            GameEvent::RoundStarted { .. } => Some(GamePhase::Bidding),
            GameEvent::BiddingComplete { .. } => Some(GamePhase::Playing),
            GameEvent::RoundScored { .. } => Some(GamePhase::Scoring),
            GameEvent::GameCompleted { .. } => Some(GamePhase::Completed),
            _ => None,
        };
        if let Some(next) = next {
            let legal = matches!(
                (phase, next),
                (GamePhase::Lobby, GamePhase::Bidding)
                    | (GamePhase::Scoring, GamePhase::Bidding)
                    | (GamePhase::Bidding, GamePhase::Playing)
                    | (GamePhase::Playing, GamePhase::Scoring)
                    | (GamePhase::Scoring, GamePhase::Completed)
            );
            assert!(legal, "illegal transition {phase:?} -> {next:?}");
            phase = next;
        }
    }
    assert_eq!(phase, GamePhase::Completed);
}
