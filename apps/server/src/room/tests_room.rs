//! Room worker tests: serialization, hand-hiding, misplay routing, bot
//! drive-through, and reaping. All driven through the command channel with
//! plain channel "connections"; no sockets involved.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::bots::{Baseline, BotManager};
use crate::domain::engine::SeatRequest;
use crate::domain::events::{EventRecord, GameEvent};
use crate::domain::replay::replay_game;
use crate::domain::state::{GameConfig, GamePhase, PlayerProfile};
use crate::domain::view::ClientGameView;
use crate::persistence::memory::InMemoryStore;
use crate::persistence::GameStore;
use crate::room::command::{ActionOrigin, RoomCommand};
use crate::room::registry::RoomRegistry;
use crate::room::worker::{spawn_room, RoomHandle, RoomTimings};
use crate::ws::protocol::ServerMsg;

fn fast_timings() -> RoomTimings {
    RoomTimings {
        turn_timeout: Duration::from_millis(40),
        grace: Duration::from_millis(60),
    }
}

fn test_config(seed: &str, round_count: u8, seats: usize) -> GameConfig {
    GameConfig {
        session_seed: seed.to_string(),
        round_count,
        min_players: 2,
        max_players: seats,
    }
}

fn human(player_id: &str) -> SeatRequest {
    SeatRequest {
        player_id: player_id.to_string(),
        user_id: Some(format!("u_{player_id}")),
        profile: PlayerProfile {
            display_name: player_id.to_string(),
            avatar_seed: None,
            color: None,
        },
        is_bot: false,
        spectator: false,
    }
}

fn baseline_bots() -> Arc<BotManager> {
    Arc::new(BotManager::new(Arc::new(Baseline), Duration::from_millis(1)))
}

struct TestConn {
    conn_id: Uuid,
    rx: mpsc::UnboundedReceiver<ServerMsg>,
}

impl TestConn {
    async fn attach(handle: &RoomHandle, player_id: &str) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let conn_id = Uuid::new_v4();
        handle
            .send(RoomCommand::Join {
                player_id: player_id.to_string(),
                conn_id,
                outbound: tx,
            })
            .await
            .expect("join");
        Self { conn_id, rx }
    }

    async fn recv(&mut self) -> ServerMsg {
        tokio::time::timeout(Duration::from_secs(2), self.rx.recv())
            .await
            .expect("timed out waiting for a server message")
            .expect("connection closed by room")
    }

    async fn expect_welcome_and_state(&mut self) -> ClientGameView {
        let ServerMsg::Welcome { .. } = self.recv().await else {
            panic!("expected WELCOME first");
        };
        let ServerMsg::StateFull { state } = self.recv().await else {
            panic!("expected STATE_FULL after WELCOME");
        };
        state
    }

    async fn next_event(&mut self) -> EventRecord {
        loop {
            if let ServerMsg::GameEvent { event } = self.recv().await {
                return event;
            }
        }
    }
}

async fn spawn_test_room(
    seed: &str,
    round_count: u8,
    seats: usize,
    store: Arc<dyn GameStore>,
) -> RoomHandle {
    spawn_room(
        format!("g_{seed}"),
        test_config(seed, round_count, seats),
        fast_timings(),
        store,
        baseline_bots(),
        Box::new(|| {}),
    )
}

#[tokio::test]
async fn full_table_starts_and_deals_hidden_hands() {
    let store: Arc<dyn GameStore> = Arc::new(InMemoryStore::new());
    let handle = spawn_test_room("start", 1, 2, store).await;

    let p1 = handle.reserve(human("p1")).await.unwrap();
    assert_eq!(p1.seat_index, Some(0));
    let p2 = handle.reserve(human("p2")).await.unwrap();
    assert_eq!(p2.seat_index, Some(1));

    let mut conn = TestConn::attach(&handle, "p1").await;
    let view = conn.expect_welcome_and_state().await;

    assert_eq!(view.phase, GamePhase::Bidding);
    let you = view.you.expect("viewer state");
    assert_eq!(you.hand.len(), 1);
    // The other player's hand is a count, never cards.
    let other = view.players.iter().find(|p| p.player_id == "p2").unwrap();
    assert_eq!(other.hand_count, 1);
}

#[tokio::test]
async fn reserve_rejects_overflow_and_late_seats() {
    let store: Arc<dyn GameStore> = Arc::new(InMemoryStore::new());
    let handle = spawn_test_room("overflow", 1, 2, store).await;

    handle.reserve(human("p1")).await.unwrap();
    handle.reserve(human("p2")).await.unwrap();

    // Table is full and the game already started.
    let err = handle.reserve(human("p3")).await.unwrap_err();
    assert!(matches!(
        err,
        crate::error::AppError::RoomFull { .. } | crate::error::AppError::Validation { .. }
    ));

    // Spectators are still welcome.
    let spectator = SeatRequest {
        spectator: true,
        ..human("watcher")
    };
    let seat = handle.reserve(spectator).await.unwrap();
    assert!(seat.is_spectator);
    assert_eq!(seat.seat_index, None);
}

#[tokio::test]
async fn a_full_game_over_the_command_channel_replays_from_the_store() {
    let store = Arc::new(InMemoryStore::new());
    let handle =
        spawn_test_room("channel", 1, 2, store.clone() as Arc<dyn GameStore>).await;

    handle.reserve(human("p1")).await.unwrap();
    handle.reserve(human("p2")).await.unwrap();

    let mut c1 = TestConn::attach(&handle, "p1").await;
    let mut c2 = TestConn::attach(&handle, "p2").await;
    let v1 = c1.expect_welcome_and_state().await;
    let v2 = c2.expect_welcome_and_state().await;

    // One card each; p1 is the dealer, p2 leads.
    let p1_card = v1.you.unwrap().hand[0].id();
    let p2_card = v2.you.unwrap().hand[0].id();

    // Dealer bids first (unconstrained), then p2 closes the auction.
    handle
        .send(RoomCommand::Bid {
            player_id: "p1".into(),
            value: 1,
            origin: ActionOrigin::Human { conn_id: c1.conn_id },
        })
        .await
        .unwrap();
    handle
        .send(RoomCommand::Bid {
            player_id: "p2".into(),
            value: 1,
            origin: ActionOrigin::Human { conn_id: c2.conn_id },
        })
        .await
        .unwrap();
    handle
        .send(RoomCommand::Play {
            player_id: "p2".into(),
            card_id: p2_card,
            origin: ActionOrigin::Human { conn_id: c2.conn_id },
        })
        .await
        .unwrap();
    handle
        .send(RoomCommand::Play {
            player_id: "p1".into(),
            card_id: p1_card,
            origin: ActionOrigin::Human { conn_id: c1.conn_id },
        })
        .await
        .unwrap();

    // p1 observes a dense, ordered event stream through GAME_COMPLETED.
    let mut last_index: Option<u64> = None;
    loop {
        let record = c1.next_event().await;
        if let Some(prev) = last_index {
            assert_eq!(record.event_index, prev + 1, "indices must stay dense");
        }
        last_index = Some(record.event_index);
        if matches!(record.event, GameEvent::GameCompleted { .. }) {
            break;
        }
    }

    // Persistence trails the room; wait for it to catch up, then replay.
    let expected = last_index.unwrap() + 1;
    let mut persisted = Vec::new();
    for _ in 0..100 {
        persisted = store.load_events("g_channel").await.unwrap();
        if persisted.len() as u64 == expected {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(persisted.len() as u64, expected);

    let replayed = replay_game(&persisted).unwrap();
    assert_eq!(replayed.phase, GamePhase::Completed);
    replayed.verify_invariants().unwrap();
}

#[tokio::test]
async fn misplays_reach_only_the_offender() {
    let store: Arc<dyn GameStore> = Arc::new(InMemoryStore::new());
    let handle = spawn_test_room("misplay", 2, 2, store).await;

    handle.reserve(human("p1")).await.unwrap();
    handle.reserve(human("p2")).await.unwrap();

    let mut c1 = TestConn::attach(&handle, "p1").await;
    let mut c2 = TestConn::attach(&handle, "p2").await;
    c1.expect_welcome_and_state().await;
    c2.expect_welcome_and_state().await;

    // Out-of-range bid from p2.
    handle
        .send(RoomCommand::Bid {
            player_id: "p2".into(),
            value: 99,
            origin: ActionOrigin::Human { conn_id: c2.conn_id },
        })
        .await
        .unwrap();

    // p2 sees the INVALID_ACTION record and an error reply.
    let record = c2.next_event().await;
    assert!(matches!(record.event, GameEvent::InvalidAction { .. }));
    let ServerMsg::Error { code, .. } = c2.recv().await else {
        panic!("expected an error reply for the offender");
    };
    assert_eq!(code, "INVALID_BID");

    // A valid bid follows; p1's next event is that bid, not the misplay.
    handle
        .send(RoomCommand::Bid {
            player_id: "p2".into(),
            value: 0,
            origin: ActionOrigin::Human { conn_id: c2.conn_id },
        })
        .await
        .unwrap();
    let record = c1.next_event().await;
    let GameEvent::PlayerBid { player_id, bid } = &record.event else {
        panic!("p1 should never see another player's INVALID_ACTION, got {record:?}");
    };
    assert_eq!(player_id, "p2");
    assert_eq!(*bid, 0);
}

#[tokio::test]
async fn stale_bot_decisions_are_dropped() {
    let store = Arc::new(InMemoryStore::new());
    let handle =
        spawn_test_room("stale", 1, 2, store.clone() as Arc<dyn GameStore>).await;

    handle.reserve(human("p1")).await.unwrap();
    handle.reserve(human("p2")).await.unwrap();

    let mut c2 = TestConn::attach(&handle, "p2").await;
    c2.expect_welcome_and_state().await;

    // A bot decision pinned to an old log position must be ignored: no
    // PLAYER_BID event, no INVALID_ACTION.
    handle
        .send(RoomCommand::Bid {
            player_id: "p2".into(),
            value: 0,
            origin: ActionOrigin::Bot { expected_index: 0 },
        })
        .await
        .unwrap();
    handle
        .send(RoomCommand::Bid {
            player_id: "p1".into(),
            value: 1,
            origin: ActionOrigin::Human {
                conn_id: Uuid::new_v4(),
            },
        })
        .await
        .unwrap();

    // The first event after the state snapshot is p1's bid.
    let record = c2.next_event().await;
    let GameEvent::PlayerBid { player_id, .. } = &record.event else {
        panic!("expected p1's bid, got {record:?}");
    };
    assert_eq!(player_id, "p1");
}

#[tokio::test]
async fn bots_finish_the_game_and_rooms_reap_themselves() {
    let store = Arc::new(InMemoryStore::new());
    let bots = baseline_bots();
    let registry = Arc::new(RoomRegistry::new(
        store.clone() as Arc<dyn GameStore>,
        bots,
        fast_timings(),
    ));

    let (handle, _code) = registry
        .create_room(test_config("botgame", 2, 3))
        .unwrap();
    let game_id = handle.game_id.clone();

    handle.reserve(human("p1")).await.unwrap();
    handle
        .reserve(BotManager::bot_seat_request(1))
        .await
        .unwrap();
    handle
        .reserve(BotManager::bot_seat_request(2))
        .await
        .unwrap();

    // The human connects, then walks away; the turn-timer fallback lets the
    // bots carry the table.
    let mut conn = TestConn::attach(&handle, "p1").await;
    conn.expect_welcome_and_state().await;
    handle
        .send(RoomCommand::Leave {
            conn_id: conn.conn_id,
        })
        .await
        .unwrap();

    // The game runs to completion and lifetime stats land for the human.
    let mut lifetime = None;
    for _ in 0..300 {
        lifetime = store.get_player_lifetime("u_p1").await.unwrap();
        if lifetime.is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    let lifetime = lifetime.expect("game never completed");
    assert_eq!(lifetime.games_played, 1);

    // After the grace period the room unregisters itself.
    for _ in 0..100 {
        if registry.room(&game_id).is_none() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(registry.room(&game_id).is_none(), "room should have reaped");
}
