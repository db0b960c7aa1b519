use crate::domain::cards::{Card, Rank, Suit};
use crate::domain::engine;
use crate::domain::errors::EngineErrorCode;
use crate::domain::events::GameEvent;
use crate::domain::test_helpers::{playing_state, trick_in_progress, with_led};

fn c(suit: Suit, rank: Rank) -> Card {
    Card::new(suit, rank, 0)
}

#[test]
fn turn_order_is_enforced() {
    let state = playing_state(
        vec![
            ("p1", vec![c(Suit::Hearts, Rank::Ace)]),
            ("p2", vec![c(Suit::Hearts, Rank::King)]),
        ],
        None,
    );
    // p1 leads; p2 moving first is out of turn.
    let err = engine::play_card(&state, "p2", "d0:H:K").unwrap_err();
    assert_eq!(err.code, EngineErrorCode::NotPlayersTurn);
}

#[test]
fn card_must_be_in_hand() {
    let state = playing_state(
        vec![
            ("p1", vec![c(Suit::Hearts, Rank::Ace)]),
            ("p2", vec![c(Suit::Hearts, Rank::King)]),
        ],
        None,
    );
    let err = engine::play_card(&state, "p1", "d0:C:2").unwrap_err();
    assert_eq!(err.code, EngineErrorCode::CardNotInHand);
}

#[test]
fn malformed_card_id_is_invalid_play() {
    let state = playing_state(
        vec![
            ("p1", vec![c(Suit::Hearts, Rank::Ace)]),
            ("p2", vec![c(Suit::Hearts, Rank::King)]),
        ],
        None,
    );
    let err = engine::play_card(&state, "p1", "hearts-ace").unwrap_err();
    assert_eq!(err.code, EngineErrorCode::InvalidPlay);
}

#[test]
fn must_follow_suit_when_able() {
    let state = playing_state(
        vec![
            ("p1", vec![c(Suit::Hearts, Rank::Ace), c(Suit::Clubs, Rank::Two)]),
            ("p2", vec![c(Suit::Hearts, Rank::King), c(Suit::Clubs, Rank::Three)]),
        ],
        Some(Suit::Spades),
    );
    let state = with_led(&state, "p1", "d0:H:A");

    let snapshot = state.clone();
    let err = engine::play_card(&state, "p2", "d0:C:3").unwrap_err();
    assert_eq!(err.code, EngineErrorCode::MustFollowSuit);
    assert_eq!(state, snapshot, "rejected plays must not mutate state");

    let (state, events) = engine::play_card(&state, "p2", "d0:H:K").unwrap();
    let trick = &state.round.as_ref().unwrap().completed_tricks[0];
    assert_eq!(trick.winning_player_id.as_deref(), Some("p1"));
    assert!(events
        .iter()
        .any(|e| matches!(e, GameEvent::TrickCompleted { winning_player_id, .. } if winning_player_id == "p1")));
}

#[test]
fn discard_allowed_when_void_in_led_suit() {
    let state = playing_state(
        vec![
            ("p1", vec![c(Suit::Hearts, Rank::Ace), c(Suit::Hearts, Rank::Two)]),
            ("p2", vec![c(Suit::Clubs, Rank::Three), c(Suit::Diamonds, Rank::Four)]),
        ],
        None,
    );
    let state = with_led(&state, "p1", "d0:H:A");
    // p2 has no hearts: any card goes, and an off-suit discard cannot win.
    let (state, _) = engine::play_card(&state, "p2", "d0:D:4").unwrap();
    let trick = &state.round.as_ref().unwrap().completed_tricks[0];
    assert_eq!(trick.winning_player_id.as_deref(), Some("p1"));
}

#[test]
fn cannot_lead_trump_until_broken() {
    let state = playing_state(
        vec![
            ("p1", vec![c(Suit::Spades, Rank::King), c(Suit::Hearts, Rank::Two)]),
            ("p2", vec![c(Suit::Spades, Rank::Four), c(Suit::Hearts, Rank::Ten)]),
        ],
        Some(Suit::Spades),
    );

    let err = engine::play_card(&state, "p1", "d0:S:K").unwrap_err();
    assert_eq!(err.code, EngineErrorCode::CannotLeadTrump);

    let (state, _) = engine::play_card(&state, "p1", "d0:H:2").unwrap();
    assert_eq!(trick_in_progress(&state).led_suit, Some(Suit::Hearts));
}

#[test]
fn all_trump_hand_may_lead_trump() {
    let state = playing_state(
        vec![
            ("p1", vec![c(Suit::Spades, Rank::King)]),
            ("p2", vec![c(Suit::Hearts, Rank::Two)]),
        ],
        Some(Suit::Spades),
    );
    let (state, events) = engine::play_card(&state, "p1", "d0:S:K").unwrap();
    // Leading trump from an all-trump hand is the exception and does not
    // count as breaking trump.
    assert!(!events
        .iter()
        .any(|e| matches!(e, GameEvent::TrumpBroken { .. })));
    let (state, _) = engine::play_card(&state, "p2", "d0:H:2").unwrap();
    let trick = &state.round.as_ref().unwrap().completed_tricks[0];
    assert_eq!(trick.winning_player_id.as_deref(), Some("p1"));
}

#[test]
fn ruffing_breaks_trump() {
    let state = playing_state(
        vec![
            (
                "p1",
                vec![
                    c(Suit::Hearts, Rank::Ten),
                    c(Suit::Hearts, Rank::Two),
                    c(Suit::Hearts, Rank::Three),
                ],
            ),
            (
                "p2",
                vec![
                    c(Suit::Spades, Rank::Four),
                    c(Suit::Spades, Rank::Two),
                    c(Suit::Clubs, Rank::Two),
                ],
            ),
        ],
        Some(Suit::Spades),
    );
    let state = with_led(&state, "p1", "d0:H:10");
    let (state, events) = engine::play_card(&state, "p2", "d0:S:4").unwrap();

    assert!(events
        .iter()
        .any(|e| matches!(e, GameEvent::TrumpBroken { player_id } if player_id == "p2")));
    let round = state.round.as_ref().unwrap();
    assert!(round.trump_broken);
    assert_eq!(
        round.completed_tricks[0].winning_player_id.as_deref(),
        Some("p2")
    );
    // Trump is open to lead now.
    assert!(engine::legal_plays(&state, "p2")
        .iter()
        .any(|card| card.suit == Suit::Spades));
}

#[test]
fn trick_winner_ties_go_to_the_later_play() {
    // Two merged decks: both aces of spades end up in one trick.
    let state = playing_state(
        vec![
            ("p1", vec![Card::new(Suit::Spades, Rank::Three, 0)]),
            ("p2", vec![Card::new(Suit::Spades, Rank::Ace, 0)]),
            ("p3", vec![Card::new(Suit::Spades, Rank::Ace, 1)]),
        ],
        Some(Suit::Spades),
    );
    let state = with_led(&state, "p1", "d0:S:3");
    let (state, _) = engine::play_card(&state, "p2", "d0:S:A").unwrap();
    let (state, _) = engine::play_card(&state, "p3", "d1:S:A").unwrap();

    let trick = &state.round.as_ref().unwrap().completed_tricks[0];
    assert_eq!(trick.winning_player_id.as_deref(), Some("p3"));
    assert_eq!(trick.winning_card_id.as_deref(), Some("d1:S:A"));
}

#[test]
fn trick_winner_leads_the_next_trick() {
    let state = playing_state(
        vec![
            ("p1", vec![c(Suit::Hearts, Rank::Two), c(Suit::Clubs, Rank::Five)]),
            ("p2", vec![c(Suit::Hearts, Rank::Ace), c(Suit::Clubs, Rank::Four)]),
        ],
        None,
    );
    let state = with_led(&state, "p1", "d0:H:2");
    let (state, _) = engine::play_card(&state, "p2", "d0:H:A").unwrap();

    // p2 took the trick and must lead the next one.
    assert_eq!(state.current_turn().as_deref(), Some("p2"));
    let err = engine::play_card(&state, "p1", "d0:C:5").unwrap_err();
    assert_eq!(err.code, EngineErrorCode::NotPlayersTurn);
    engine::play_card(&state, "p2", "d0:C:4").unwrap();
}

#[test]
fn legal_plays_follow_the_rules() {
    let state = playing_state(
        vec![
            ("p1", vec![c(Suit::Spades, Rank::King), c(Suit::Hearts, Rank::Two)]),
            ("p2", vec![c(Suit::Hearts, Rank::Ten), c(Suit::Spades, Rank::Two)]),
        ],
        Some(Suit::Spades),
    );

    // Leading with unbroken trump: spades are off the table.
    let leads = engine::legal_plays(&state, "p1");
    assert_eq!(leads, vec![c(Suit::Hearts, Rank::Two)]);

    // Following hearts while holding hearts: only hearts.
    let state = with_led(&state, "p1", "d0:H:2");
    let follows = engine::legal_plays(&state, "p2");
    assert_eq!(follows, vec![c(Suit::Hearts, Rank::Ten)]);
}
