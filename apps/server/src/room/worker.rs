//! The room: one worker task per game, consuming a bounded command channel.
//!
//! Exactly one command is in flight at a time; the whole
//! validate → engine → append → broadcast → schedule cycle runs inside the
//! worker with no locks held across I/O. Broadcasting only enqueues onto
//! per-connection queues; persistence trails on detached tasks with backoff.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};
use unicode_normalization::UnicodeNormalization;
use uuid::Uuid;

use crate::bots::{BotContext, BotManager};
use crate::domain::engine::{self, SeatRequest};
use crate::domain::errors::EngineError;
use crate::domain::events::{EventRecord, GameEvent};
use crate::domain::state::{GameConfig, GameId, GamePhase, GameState, PlayerId, PlayerStatus};
use crate::domain::stats::finalize_game;
use crate::domain::view::client_view;
use crate::error::AppError;
use crate::errors::ErrorCode;
use crate::persistence::GameStore;
use crate::room::command::{ActionOrigin, ReservedSeat, RoomCommand};
use crate::ws::protocol::ServerMsg;

const COMMAND_BUFFER: usize = 64;
const PERSIST_MAX_ATTEMPTS: u32 = 5;
const PERSIST_INITIAL_BACKOFF_MS: u64 = 50;
const PERSIST_MAX_BACKOFF_MS: u64 = 2_000;

/// How long a finished room lingers before it reaps itself.
pub const COMPLETED_GRACE: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct RoomTimings {
    pub turn_timeout: Duration,
    pub grace: Duration,
}

impl RoomTimings {
    pub fn new(turn_timeout: Duration) -> Self {
        Self {
            turn_timeout,
            grace: COMPLETED_GRACE,
        }
    }
}

/// Cheap cloneable address of a room.
#[derive(Clone)]
pub struct RoomHandle {
    pub game_id: GameId,
    tx: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    pub async fn send(&self, command: RoomCommand) -> Result<(), AppError> {
        self.tx
            .send(command)
            .await
            .map_err(|_| AppError::room_not_found("room is shutting down"))
    }

    pub fn sender(&self) -> mpsc::Sender<RoomCommand> {
        self.tx.clone()
    }

    /// Reserve a seat (or spectator slot) through the room's serialized path.
    pub async fn reserve(&self, request: SeatRequest) -> Result<ReservedSeat, AppError> {
        let (reply, answer) = oneshot::channel();
        self.send(RoomCommand::Reserve { request, reply }).await?;
        answer
            .await
            .map_err(|_| AppError::internal("room dropped the reservation"))?
    }
}

fn now_ms() -> i64 {
    (time::OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

struct Connection {
    player_id: PlayerId,
    tx: mpsc::UnboundedSender<ServerMsg>,
}

pub struct Room {
    state: GameState,
    log: Vec<EventRecord>,
    pending_initial: Vec<GameEvent>,
    connections: HashMap<Uuid, Connection>,
    rx: mpsc::Receiver<RoomCommand>,
    self_tx: mpsc::Sender<RoomCommand>,
    store: Arc<dyn GameStore>,
    /// Ordered queue into this room's persistence pump.
    persist_tx: mpsc::UnboundedSender<Vec<EventRecord>>,
    bots: Arc<BotManager>,
    timings: RoomTimings,
    deadline: Option<Instant>,
    finalized: bool,
    exit: bool,
    on_exit: Option<Box<dyn FnOnce() + Send>>,
}

/// Create the room and start its worker task plus its persistence pump. The
/// pump applies batches strictly in commit order and drains whatever is
/// queued before exiting, so shutdown flushes automatically.
pub fn spawn_room(
    game_id: impl Into<GameId>,
    config: GameConfig,
    timings: RoomTimings,
    store: Arc<dyn GameStore>,
    bots: Arc<BotManager>,
    on_exit: Box<dyn FnOnce() + Send>,
) -> RoomHandle {
    let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
    let (state, initial) = engine::create_game(game_id, config);
    let handle = RoomHandle {
        game_id: state.game_id.clone(),
        tx: tx.clone(),
    };

    let (persist_tx, mut persist_rx) = mpsc::unbounded_channel::<Vec<EventRecord>>();
    {
        let store = store.clone();
        let game_id = state.game_id.clone();
        tokio::spawn(async move {
            while let Some(records) = persist_rx.recv().await {
                append_with_retry(store.as_ref(), &game_id, records).await;
            }
        });
    }

    let room = Room {
        state,
        log: Vec::new(),
        pending_initial: initial,
        connections: HashMap::new(),
        rx,
        self_tx: tx,
        store,
        persist_tx,
        bots,
        timings,
        deadline: None,
        finalized: false,
        exit: false,
        on_exit: Some(on_exit),
    };
    tokio::spawn(room.run());
    handle
}

/// Retry transient store failures with exponential backoff. Clients were
/// already acknowledged from the in-memory log; durability trails.
async fn append_with_retry(store: &dyn GameStore, game_id: &str, records: Vec<EventRecord>) {
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match store.append_events(game_id, &records).await {
            Ok(()) => return,
            Err(err) if attempt >= PERSIST_MAX_ATTEMPTS => {
                error!(
                    game_id = %game_id,
                    error = %err,
                    attempts = attempt,
                    "giving up on persisting events"
                );
                return;
            }
            Err(err) => {
                let backoff = (PERSIST_INITIAL_BACKOFF_MS * 2u64.saturating_pow(attempt - 1))
                    .min(PERSIST_MAX_BACKOFF_MS);
                warn!(
                    game_id = %game_id,
                    error = %err,
                    attempt,
                    backoff_ms = backoff,
                    "event append failed, retrying"
                );
                tokio::time::sleep(Duration::from_millis(backoff)).await;
            }
        }
    }
}

impl Room {
    async fn run(mut self) {
        let initial = std::mem::take(&mut self.pending_initial);
        self.commit(initial);
        info!(game_id = %self.state.game_id, "room started");

        while !self.exit {
            let command = if let Some(deadline) = self.deadline {
                tokio::select! {
                    maybe = self.rx.recv() => match maybe {
                        Some(command) => command,
                        None => break,
                    },
                    _ = tokio::time::sleep_until(deadline) => {
                        self.deadline = None;
                        RoomCommand::Tick
                    }
                }
            } else {
                match self.rx.recv().await {
                    Some(command) => command,
                    None => break,
                }
            };

            if matches!(command, RoomCommand::Shutdown) {
                info!(game_id = %self.state.game_id, "room shutting down");
                break;
            }

            // The engine is pure and the handlers only enqueue I/O, so a
            // panic here means a bug, not a stuck await: halt the room.
            if catch_unwind(AssertUnwindSafe(|| self.handle(command))).is_err() {
                self.halt();
                break;
            }
        }

        self.shutdown();
    }

    fn handle(&mut self, command: RoomCommand) {
        match command {
            RoomCommand::Join {
                player_id,
                conn_id,
                outbound,
            } => self.handle_join(player_id, conn_id, outbound),
            RoomCommand::Leave { conn_id } => self.handle_leave(conn_id),
            RoomCommand::Bid {
                player_id,
                value,
                origin,
            } => {
                if self.bot_action_is_stale(&origin) {
                    return;
                }
                match engine::apply_bid(&self.state, &player_id, value) {
                    Ok((next, events)) => {
                        self.state = next;
                        self.commit(events);
                        self.advance();
                    }
                    Err(err) => self.reject(&player_id, &origin, err),
                }
            }
            RoomCommand::Play {
                player_id,
                card_id,
                origin,
            } => {
                if self.bot_action_is_stale(&origin) {
                    return;
                }
                match engine::play_card(&self.state, &player_id, &card_id) {
                    Ok((next, events)) => {
                        self.state = next;
                        self.commit(events);
                        self.advance();
                    }
                    Err(err) => self.reject(&player_id, &origin, err),
                }
            }
            RoomCommand::RequestState { conn_id } => {
                if let Some(conn) = self.connections.get(&conn_id) {
                    let view = client_view(&self.state, Some(&conn.player_id));
                    let _ = conn.tx.send(ServerMsg::StateFull { state: view });
                }
            }
            RoomCommand::UpdateProfile {
                conn_id,
                display_name,
                avatar_seed,
                color,
            } => self.handle_update_profile(conn_id, display_name, avatar_seed, color),
            RoomCommand::Reserve { request, reply } => {
                let result = self.handle_reserve(request);
                let _ = reply.send(result);
                self.maybe_start();
                self.advance();
            }
            RoomCommand::Tick => self.handle_tick(),
            RoomCommand::Shutdown => {}
        }
    }

    fn handle_join(
        &mut self,
        player_id: PlayerId,
        conn_id: Uuid,
        outbound: mpsc::UnboundedSender<ServerMsg>,
    ) {
        let Some(player) = self.state.player(&player_id) else {
            // Token was valid but the seat is gone (or never reserved).
            let _ = outbound.send(ServerMsg::Error {
                code: ErrorCode::PlayerNotFound.as_str().to_string(),
                message: "no seat reserved for this player".to_string(),
            });
            return;
        };

        let welcome = ServerMsg::Welcome {
            player_id: player.player_id.clone(),
            game_id: self.state.game_id.clone(),
            seat_index: (!player.spectator).then_some(player.seat_index),
            is_spectator: player.spectator,
        };
        let view = client_view(&self.state, Some(&player_id));
        let _ = outbound.send(welcome);
        let _ = outbound.send(ServerMsg::StateFull { state: view });

        self.connections.insert(
            conn_id,
            Connection {
                player_id: player_id.clone(),
                tx: outbound,
            },
        );
        if let Some(player) = self.state.player_mut(&player_id) {
            player.status = PlayerStatus::Active;
        }
        info!(
            game_id = %self.state.game_id,
            player_id = %player_id,
            conn_id = %conn_id,
            connections = self.connections.len(),
            "connection joined"
        );
    }

    fn handle_leave(&mut self, conn_id: Uuid) {
        let Some(connection) = self.connections.remove(&conn_id) else {
            return;
        };
        let still_connected = self
            .connections
            .values()
            .any(|c| c.player_id == connection.player_id);
        if !still_connected {
            if let Some(player) = self.state.player_mut(&connection.player_id) {
                player.status = PlayerStatus::Disconnected;
            }
        }
        info!(
            game_id = %self.state.game_id,
            player_id = %connection.player_id,
            conn_id = %conn_id,
            "connection left, seat kept"
        );
    }

    fn handle_update_profile(
        &mut self,
        conn_id: Uuid,
        display_name: Option<String>,
        avatar_seed: Option<String>,
        color: Option<String>,
    ) {
        let Some(player_id) = self
            .connections
            .get(&conn_id)
            .map(|c| c.player_id.clone())
        else {
            return;
        };
        if let Some(player) = self.state.player_mut(&player_id) {
            if let Some(name) = display_name {
                let name: String = name.trim().nfc().collect();
                if !name.is_empty() {
                    player.profile.display_name = name;
                }
            }
            if avatar_seed.is_some() {
                player.profile.avatar_seed = avatar_seed;
            }
            if color.is_some() {
                player.profile.color = color;
            }
        }
        self.broadcast_state();
    }

    fn handle_reserve(&mut self, request: SeatRequest) -> Result<ReservedSeat, AppError> {
        if !request.spectator {
            if self.state.phase != GamePhase::Lobby {
                return Err(AppError::validation("game already in progress"));
            }
            if self.state.active_player_count() >= self.state.config.max_players {
                return Err(AppError::room_full("every seat is taken"));
            }
        }
        let player_id = request.player_id.clone();
        let spectator = request.spectator;

        let (next, events) = engine::add_player(&self.state, request)
            .map_err(|err| AppError::validation(err.message))?;
        let seat_index = next.player(&player_id).map(|p| p.seat_index);
        self.state = next;
        self.commit(events);

        Ok(ReservedSeat {
            player_id,
            seat_index: if spectator { None } else { seat_index },
            is_spectator: spectator,
        })
    }

    /// Kick the game off once the table is full.
    fn maybe_start(&mut self) {
        if self.state.phase != GamePhase::Lobby
            || self.state.active_player_count() < self.state.config.max_players
        {
            return;
        }
        match engine::start_round(&self.state) {
            Ok((next, events)) => {
                self.state = next;
                self.commit(events);
            }
            Err(err) => warn!(game_id = %self.state.game_id, error = %err, "could not start round"),
        }
    }

    fn handle_tick(&mut self) {
        if self.state.phase == GamePhase::Completed {
            // Grace elapsed; reap the room.
            self.exit = true;
            return;
        }
        let Some(player_id) = self.state.current_turn() else {
            self.deadline = None;
            return;
        };
        let player = self.state.player(&player_id);
        let is_bot = player.map(|p| p.is_bot).unwrap_or(false);
        let disconnected = player
            .map(|p| p.status == PlayerStatus::Disconnected)
            .unwrap_or(false);

        if is_bot || disconnected {
            // Bots get (re)driven; disconnected humans fall back to the bot
            // strategy so the table is never held hostage.
            if let Some(ctx) = BotContext::for_player(&self.state, &player_id) {
                self.bots
                    .schedule_turn(ctx, self.log.len() as u64, self.self_tx.clone());
            }
        } else {
            debug!(
                game_id = %self.state.game_id,
                player_id = %player_id,
                "turn timer expired for a connected player, extending"
            );
        }
        self.deadline = Some(Instant::now() + self.timings.turn_timeout);
    }

    /// Drop bot decisions computed against a log position we've moved past.
    fn bot_action_is_stale(&self, origin: &ActionOrigin) -> bool {
        match origin {
            ActionOrigin::Bot { expected_index } => {
                if *expected_index != self.log.len() as u64 {
                    debug!(
                        game_id = %self.state.game_id,
                        expected_index,
                        log_len = self.log.len(),
                        "dropping stale bot decision"
                    );
                    true
                } else {
                    false
                }
            }
            _ => false,
        }
    }

    /// Stamp, append, persist, broadcast. The caller already swapped in the
    /// new state.
    fn commit(&mut self, events: Vec<GameEvent>) {
        if events.is_empty() {
            return;
        }
        let now = now_ms();
        let mut records = Vec::with_capacity(events.len());
        for event in events {
            let event_index = self.log.len() as u64;
            if event_index == 0 {
                self.state.created_at = now;
            }
            self.state.updated_at = now;
            let record = EventRecord {
                event,
                event_index,
                timestamp: now,
                game_id: self.state.game_id.clone(),
            };
            self.log.push(record.clone());
            records.push(record);
        }
        self.persist(records.clone());
        for record in &records {
            self.deliver(record);
        }
        self.prune_dead_connections();
    }

    /// Post-commit bookkeeping: chain rounds out of SCORING, finalize on
    /// COMPLETED, and arm the turn timer / bot wakeup.
    fn advance(&mut self) {
        while self.state.phase == GamePhase::Scoring {
            match engine::start_round(&self.state) {
                Ok((next, events)) => {
                    self.state = next;
                    self.commit(events);
                }
                Err(err) => {
                    warn!(game_id = %self.state.game_id, error = %err, "could not chain next round");
                    break;
                }
            }
        }

        if self.state.phase == GamePhase::Completed {
            self.finalize();
            self.deadline = Some(Instant::now() + self.timings.grace);
            return;
        }

        let Some(player_id) = self.state.current_turn() else {
            self.deadline = None;
            return;
        };
        let is_bot = self
            .state
            .player(&player_id)
            .map(|p| p.is_bot)
            .unwrap_or(false);
        if is_bot {
            if let Some(ctx) = BotContext::for_player(&self.state, &player_id) {
                self.bots
                    .schedule_turn(ctx, self.log.len() as u64, self.self_tx.clone());
            }
        }
        self.deadline = Some(Instant::now() + self.timings.turn_timeout);
    }

    /// An engine rejection: misplay goes to the log, the error goes to the
    /// offender only, state stays put.
    fn reject(&mut self, player_id: &str, origin: &ActionOrigin, err: EngineError) {
        info!(
            game_id = %self.state.game_id,
            player_id,
            code = err.code.as_str(),
            detail = %err.message,
            "action rejected"
        );
        self.commit(vec![GameEvent::InvalidAction {
            player_id: player_id.to_string(),
            code: err.code,
            message: err.message.clone(),
        }]);

        match origin {
            ActionOrigin::Human { conn_id } => {
                if let Some(conn) = self.connections.get(conn_id) {
                    let _ = conn.tx.send(ServerMsg::Error {
                        code: err.code.as_str().to_string(),
                        message: err.message,
                    });
                }
                // The misplay record moved the log index, which invalidates
                // any bot decision in flight; re-arm scheduling.
                self.advance();
            }
            ActionOrigin::Bot { .. } | ActionOrigin::System => {
                // A bot should never misplay; keep the game moving with the
                // first legal action rather than looping.
                warn!(
                    game_id = %self.state.game_id,
                    player_id,
                    "bot action rejected, auto-playing"
                );
                self.system_autoplay(player_id);
            }
        }
    }

    fn system_autoplay(&mut self, player_id: &str) {
        let result = match self.state.phase {
            GamePhase::Bidding => engine::legal_bids(&self.state, player_id)
                .first()
                .map(|bid| engine::apply_bid(&self.state, player_id, *bid)),
            GamePhase::Playing => engine::legal_plays(&self.state, player_id)
                .first()
                .map(|card| engine::play_card(&self.state, player_id, &card.id())),
            _ => None,
        };
        match result {
            Some(Ok((next, events))) => {
                self.state = next;
                self.commit(events);
                self.advance();
            }
            Some(Err(err)) => {
                error!(
                    game_id = %self.state.game_id,
                    player_id,
                    error = %err,
                    "auto-play failed; waiting for the turn timer"
                );
            }
            None => {}
        }
    }

    /// Send one committed record to its audience: INVALID_ACTION only to the
    /// offender, CARDS_DEALT redacted per viewer, everything else to all.
    fn deliver(&self, record: &EventRecord) {
        match &record.event {
            GameEvent::InvalidAction { player_id, .. } => {
                for conn in self.connections.values() {
                    if conn.player_id == *player_id {
                        let _ = conn.tx.send(ServerMsg::GameEvent {
                            event: record.clone(),
                        });
                    }
                }
            }
            _ => {
                for conn in self.connections.values() {
                    let redacted = EventRecord {
                        event: record.event.redacted_for(Some(&conn.player_id)),
                        event_index: record.event_index,
                        timestamp: record.timestamp,
                        game_id: record.game_id.clone(),
                    };
                    let _ = conn.tx.send(ServerMsg::GameEvent { event: redacted });
                }
            }
        }
    }

    fn broadcast_state(&self) {
        for conn in self.connections.values() {
            let view = client_view(&self.state, Some(&conn.player_id));
            let _ = conn.tx.send(ServerMsg::StateFull { state: view });
        }
    }

    fn prune_dead_connections(&mut self) {
        let dead: Vec<Uuid> = self
            .connections
            .iter()
            .filter(|(_, conn)| conn.tx.is_closed())
            .map(|(id, _)| *id)
            .collect();
        for conn_id in dead {
            self.handle_leave(conn_id);
        }
    }

    fn persist(&self, records: Vec<EventRecord>) {
        if self.persist_tx.send(records).is_err() {
            error!(game_id = %self.state.game_id, "persistence pump is gone");
        }
    }

    fn finalize(&mut self) {
        if self.finalized {
            return;
        }
        self.finalized = true;

        let outcome = finalize_game(&self.state, &self.log);
        info!(
            game_id = %self.state.game_id,
            winners = ?outcome
                .players
                .iter()
                .filter(|p| p.is_winner)
                .map(|p| p.player_id.as_str())
                .collect::<Vec<_>>(),
            "game completed"
        );

        let store = self.store.clone();
        tokio::spawn(async move {
            if let Err(err) = store.finalize_game(&outcome).await {
                error!(game_id = %outcome.game_id, error = %err, "failed to finalize game");
            }
            for player in &outcome.players {
                let Some(user_id) = player.user_id.as_deref() else {
                    continue;
                };
                if player.is_bot {
                    continue;
                }
                if let Err(err) = store.update_player_lifetime(user_id, player).await {
                    error!(
                        game_id = %outcome.game_id,
                        user_id,
                        error = %err,
                        "failed to roll up lifetime stats"
                    );
                }
            }
        });
    }

    fn halt(&mut self) {
        error!(game_id = %self.state.game_id, "room panicked, halting");
        for conn in self.connections.values() {
            let _ = conn.tx.send(ServerMsg::Error {
                code: ErrorCode::InternalError.as_str().to_string(),
                message: "room halted".to_string(),
            });
        }
        self.exit = true;
    }

    fn shutdown(&mut self) {
        // Dropping the outbound senders is the goodbye: sessions observe the
        // closed stream and shut the socket. Persistence tasks already in
        // flight keep running to completion on the runtime.
        self.connections.clear();
        if let Some(on_exit) = self.on_exit.take() {
            on_exit();
        }
        info!(game_id = %self.state.game_id, "room exited");
    }
}
