//! Shared builders and drivers for domain tests.

use std::collections::BTreeMap;

use crate::domain::engine::{self, SeatRequest};
use crate::domain::events::{EventRecord, GameEvent};
use crate::domain::rng::GameRng;
use crate::domain::state::{
    GameConfig, GamePhase, GameState, Player, PlayerProfile, PlayerState, PlayerStatus,
    RoundState, TrickState,
};
use crate::domain::Suit;

pub fn profile(name: &str) -> PlayerProfile {
    PlayerProfile {
        display_name: name.to_string(),
        avatar_seed: None,
        color: None,
    }
}

pub fn seat_request(player_id: &str) -> SeatRequest {
    SeatRequest {
        player_id: player_id.to_string(),
        user_id: Some(format!("u_{player_id}")),
        profile: profile(player_id),
        is_bot: false,
        spectator: false,
    }
}

/// Accumulates engine events into a stamped log the way a room commit would,
/// with a deterministic fake clock.
pub struct SimLog {
    pub records: Vec<EventRecord>,
    game_id: String,
}

impl SimLog {
    pub fn new(game_id: &str) -> Self {
        Self {
            records: Vec::new(),
            game_id: game_id.to_string(),
        }
    }

    /// Stamp and append events, updating the live state's clock fields the
    /// way a room commit does.
    pub fn commit(&mut self, state: &mut GameState, events: Vec<GameEvent>) {
        for event in events {
            let event_index = self.records.len() as u64;
            let timestamp = 1_000 * event_index as i64;
            if event_index == 0 {
                state.created_at = timestamp;
            }
            state.updated_at = timestamp;
            self.records.push(EventRecord {
                event,
                event_index,
                timestamp,
                game_id: self.game_id.clone(),
            });
        }
    }
}

pub fn config(seed: &str, round_count: u8, min_players: usize, max_players: usize) -> GameConfig {
    GameConfig {
        session_seed: seed.to_string(),
        round_count,
        min_players,
        max_players,
    }
}

/// Lobby with players p1..pN seated in order, log primed with the creation
/// and join events.
pub fn lobby(seed: &str, round_count: u8, n: usize) -> (GameState, SimLog) {
    let cfg = config(seed, round_count, 2, n.max(2));
    let (mut state, events) = engine::create_game("g_test", cfg);
    let mut log = SimLog::new("g_test");
    log.commit(&mut state, events);
    for i in 1..=n {
        let (next, events) = engine::add_player(&state, seat_request(&format!("p{i}")))
            .expect("seating in lobby");
        state = next;
        log.commit(&mut state, events);
    }
    (state, log)
}

/// Drive a whole game, choosing every bid and play with a seeded RNG over the
/// legal options. Mirrors what the room + bots do, minus all I/O.
pub fn run_seeded_game(
    session_seed: &str,
    round_count: u8,
    n: usize,
    action_seed: &str,
) -> (GameState, Vec<EventRecord>) {
    let (mut state, mut log) = lobby(session_seed, round_count, n);
    let mut rng = GameRng::from_seed_str(action_seed);

    loop {
        match state.phase {
            GamePhase::Lobby | GamePhase::Scoring => {
                let (next, events) = engine::start_round(&state).expect("start round");
                state = next;
                log.commit(&mut state, events);
            }
            GamePhase::Bidding => {
                let pid = state.current_turn().expect("a bidder");
                let options = engine::legal_bids(&state, &pid);
                let bid = options[rng.next_range(options.len())];
                let (next, events) = engine::apply_bid(&state, &pid, bid).expect("legal bid");
                state = next;
                log.commit(&mut state, events);
            }
            GamePhase::Playing => {
                let pid = state.current_turn().expect("a player to act");
                let options = engine::legal_plays(&state, &pid);
                let card = options[rng.next_range(options.len())];
                let (next, events) =
                    engine::play_card(&state, &pid, &card.id()).expect("legal play");
                state = next;
                log.commit(&mut state, events);
            }
            GamePhase::Completed => return (state, log.records),
        }
    }
}

/// Hand-built mid-round state in the playing phase, for targeted legality
/// tests. Hands are given in seat order as (player_id, cards); every bid is
/// set to 1 and the first player leads.
pub fn playing_state(
    hands: Vec<(&str, Vec<crate::domain::Card>)>,
    trump_suit: Option<Suit>,
) -> GameState {
    let n = hands.len();
    let cards_per_player = hands[0].1.len() as u8;
    let players: Vec<Player> = hands
        .iter()
        .enumerate()
        .map(|(i, (pid, _))| Player {
            player_id: pid.to_string(),
            user_id: None,
            seat_index: i as u8,
            profile: profile(pid),
            is_bot: false,
            spectator: false,
            status: PlayerStatus::Active,
        })
        .collect();

    let player_states: BTreeMap<String, PlayerState> = hands
        .iter()
        .map(|(pid, hand)| {
            (
                pid.to_string(),
                PlayerState {
                    hand: hand.clone(),
                    tricks_won: 0,
                    bid: Some(1),
                    round_score_delta: 0,
                },
            )
        })
        .collect();

    let dealer = hands[n - 1].0.to_string();
    let starting = hands[0].0.to_string();

    GameState {
        game_id: "g_fixture".to_string(),
        config: config("fixture", 1, 2, n),
        phase: GamePhase::Playing,
        players,
        player_states,
        cumulative_scores: hands.iter().map(|(pid, _)| (pid.to_string(), 0)).collect(),
        round: Some(RoundState {
            round_index: 0,
            cards_per_player,
            round_seed: "fixture:0".to_string(),
            trump_card: None,
            trump_suit,
            trump_broken: false,
            bids: hands.iter().map(|(pid, _)| (pid.to_string(), Some(1))).collect(),
            bidding_complete: true,
            trick_in_progress: None,
            completed_tricks: Vec::new(),
            dealer_player_id: dealer,
            starting_player_id: starting,
        }),
        round_summaries: Vec::new(),
        created_at: 0,
        updated_at: 0,
    }
}

/// Open a trick on a fixture state so a specific card has already been led.
pub fn with_led(state: &GameState, leader: &str, card_id: &str) -> GameState {
    let (next, _) = engine::play_card(state, leader, card_id).expect("lead is legal");
    next
}

pub fn trick_in_progress(state: &GameState) -> &TrickState {
    state
        .round
        .as_ref()
        .and_then(|r| r.trick_in_progress.as_ref())
        .expect("a trick in progress")
}
