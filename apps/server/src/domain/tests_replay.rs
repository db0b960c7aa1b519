use crate::domain::errors::ReplayError;
use crate::domain::events::{EventRecord, GameEvent};
use crate::domain::replay::replay_game;
use crate::domain::state::GamePhase;
use crate::domain::test_helpers::run_seeded_game;

#[test]
fn replay_matches_the_live_simulation() {
    let (live, records) = run_seeded_game("replay", 4, 3, "actions");
    let replayed = replay_game(&records).unwrap();
    assert_eq!(replayed, live);
}

#[test]
fn every_prefix_replays_cleanly() {
    let (_, records) = run_seeded_game("prefix", 3, 3, "actions");
    for k in 1..=records.len() {
        let state = replay_game(&records[..k])
            .unwrap_or_else(|e| panic!("prefix of {k} events failed: {e}"));
        state.verify_invariants().unwrap();
    }
}

#[test]
fn empty_log_is_corrupt() {
    assert!(matches!(
        replay_game(&[]),
        Err(ReplayError::CorruptLog { .. })
    ));
}

#[test]
fn index_gap_is_detected() {
    let (_, mut records) = run_seeded_game("gap", 2, 2, "actions");
    records.remove(4);
    let err = replay_game(&records).unwrap_err();
    assert!(matches!(err, ReplayError::CorruptLog { .. }), "{err}");
}

#[test]
fn duplicate_index_is_detected() {
    let (_, mut records) = run_seeded_game("dup", 2, 2, "actions");
    let copy = records[3].clone();
    records.insert(3, copy);
    let err = replay_game(&records).unwrap_err();
    assert!(matches!(err, ReplayError::CorruptLog { .. }), "{err}");
}

#[test]
fn foreign_game_id_is_detected() {
    let (_, mut records) = run_seeded_game("foreign", 2, 2, "actions");
    records[2].game_id = "g_other".to_string();
    let err = replay_game(&records).unwrap_err();
    assert!(matches!(err, ReplayError::CorruptLog { .. }), "{err}");
}

#[test]
fn log_not_opening_with_game_created_is_corrupt() {
    let (_, records) = run_seeded_game("open", 2, 2, "actions");
    let err = replay_game(&records[1..]).unwrap_err();
    assert!(matches!(err, ReplayError::CorruptLog { .. }), "{err}");
}

#[test]
fn tampered_play_is_detected() {
    let (_, mut records) = run_seeded_game("tamper", 2, 2, "actions");
    // Rewrite the first CARD_PLAYED to a card its player cannot hold.
    let target = records
        .iter()
        .position(|r| matches!(r.event, GameEvent::CardPlayed { .. }))
        .unwrap();
    let mut tampered = records[target].clone();
    if let GameEvent::CardPlayed { player_id, order, .. } = &records[target].event {
        // Deck 7 never exists, so this card can be in nobody's hand.
        tampered.event = GameEvent::CardPlayed {
            player_id: player_id.clone(),
            card: crate::domain::Card::new(crate::domain::Suit::Clubs, crate::domain::Rank::Two, 7),
            order: *order,
        };
    }
    records[target] = tampered;
    let err = replay_game(&records).unwrap_err();
    assert!(matches!(err, ReplayError::CorruptLog { .. }), "{err}");
}

#[test]
fn misplays_in_the_log_do_not_change_state() {
    let (_, mut records) = run_seeded_game("misplay", 2, 2, "actions");
    // Splice an INVALID_ACTION between two real events, reindexing the tail.
    let insert_at = 5;
    records.insert(
        insert_at,
        EventRecord {
            event: GameEvent::InvalidAction {
                player_id: "p1".to_string(),
                code: crate::domain::EngineErrorCode::MustFollowSuit,
                message: "must follow Hearts".to_string(),
            },
            event_index: insert_at as u64,
            timestamp: 0,
            game_id: records[0].game_id.clone(),
        },
    );
    for (i, record) in records.iter_mut().enumerate() {
        record.event_index = i as u64;
    }

    let state = replay_game(&records).unwrap();
    assert_eq!(state.phase, GamePhase::Completed);
    state.verify_invariants().unwrap();
}
