use crate::domain::engine;
use crate::domain::errors::EngineErrorCode;
use crate::domain::events::GameEvent;
use crate::domain::state::GamePhase;
use crate::domain::test_helpers::lobby;

fn bidding_state(n: usize) -> crate::domain::state::GameState {
    let (state, _) = lobby("seed", 3, n);
    let (state, _) = engine::start_round(&state).expect("start");
    state
}

#[test]
fn bid_out_of_range_is_rejected() {
    let state = bidding_state(3);
    let cards = state.round.as_ref().unwrap().cards_per_player;
    let err = engine::apply_bid(&state, "p2", cards + 1).unwrap_err();
    assert_eq!(err.code, EngineErrorCode::InvalidBid);
}

#[test]
fn double_bid_is_rejected() {
    let state = bidding_state(3);
    let (state, _) = engine::apply_bid(&state, "p2", 1).unwrap();
    let err = engine::apply_bid(&state, "p2", 2).unwrap_err();
    assert_eq!(err.code, EngineErrorCode::InvalidBid);
}

#[test]
fn unknown_player_cannot_bid() {
    let state = bidding_state(3);
    let err = engine::apply_bid(&state, "stranger", 0).unwrap_err();
    assert_eq!(err.code, EngineErrorCode::InvalidBid);
}

#[test]
fn bid_outside_bidding_phase_is_rejected() {
    let (state, _) = lobby("seed", 3, 3);
    let err = engine::apply_bid(&state, "p1", 0).unwrap_err();
    assert_eq!(err.code, EngineErrorCode::RoundNotReady);
}

#[test]
fn dealer_cannot_hook_the_round() {
    // Round 0 dealer is p1 (seat 0). cards_per_player = round_count = 3.
    let state = bidding_state(3);
    let (state, _) = engine::apply_bid(&state, "p2", 1).unwrap();
    let (state, _) = engine::apply_bid(&state, "p3", 1).unwrap();

    let err = engine::apply_bid(&state, "p1", 1).unwrap_err();
    assert_eq!(err.code, EngineErrorCode::HookViolation);

    // Any other total is fine.
    let (state, events) = engine::apply_bid(&state, "p1", 0).unwrap();
    assert_eq!(state.phase, GamePhase::Playing);
    assert!(events
        .iter()
        .any(|e| matches!(e, GameEvent::BiddingComplete { .. })));
}

#[test]
fn dealer_is_unconstrained_before_other_bids_land() {
    let state = bidding_state(3);
    // p1 is the dealer but bids first; the hook rule only binds the closing bid.
    let (state, _) = engine::apply_bid(&state, "p1", 1).unwrap();
    let (state, _) = engine::apply_bid(&state, "p2", 1).unwrap();
    // p3 is not the dealer, so a hooking total from them is allowed.
    let (state, _) = engine::apply_bid(&state, "p3", 1).unwrap();
    assert_eq!(state.phase, GamePhase::Playing);
}

#[test]
fn legal_bids_exclude_the_hook() {
    let state = bidding_state(3);
    let (state, _) = engine::apply_bid(&state, "p2", 1).unwrap();
    let (state, _) = engine::apply_bid(&state, "p3", 1).unwrap();

    let legal = engine::legal_bids(&state, "p1");
    assert!(!legal.contains(&1), "hooking bid offered: {legal:?}");
    assert!(legal.contains(&0));
    assert!(legal.contains(&2));
}

#[test]
fn bidding_completes_only_after_everyone() {
    let state = bidding_state(3);
    let (state, events) = engine::apply_bid(&state, "p2", 0).unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(state.phase, GamePhase::Bidding);
    assert!(!state.round.as_ref().unwrap().bidding_complete);

    let (state, _) = engine::apply_bid(&state, "p3", 0).unwrap();
    let (state, events) = engine::apply_bid(&state, "p1", 1).unwrap();
    assert!(state.round.as_ref().unwrap().bidding_complete);
    assert_eq!(state.phase, GamePhase::Playing);
    let GameEvent::BiddingComplete { bids } = &events[1] else {
        panic!("expected BIDDING_COMPLETE, got {events:?}");
    };
    assert_eq!(bids.len(), 3);
}

#[test]
fn errors_do_not_mutate_state() {
    let state = bidding_state(3);
    let snapshot = state.clone();
    let _ = engine::apply_bid(&state, "p2", 99).unwrap_err();
    assert_eq!(state, snapshot);
}
