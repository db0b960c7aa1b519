//! Commands consumed by a room's worker task. Everything that can touch a
//! room's state arrives here and is processed one at a time.

use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use crate::domain::engine::SeatRequest;
use crate::domain::state::PlayerId;
use crate::error::AppError;
use crate::ws::protocol::ServerMsg;

/// Who asked for a mutation. Bot decisions carry the log length they were
/// computed against so stale wakeups can be dropped instead of misplaying.
#[derive(Debug, Clone)]
pub enum ActionOrigin {
    Human { conn_id: Uuid },
    Bot { expected_index: u64 },
    /// Issued by the room itself (timeout fallback).
    System,
}

/// Seat granted by the room to an HTTP join request.
#[derive(Debug, Clone)]
pub struct ReservedSeat {
    pub player_id: PlayerId,
    pub seat_index: Option<u8>,
    pub is_spectator: bool,
}

#[derive(Debug)]
pub enum RoomCommand {
    /// Attach a connection for an already-reserved player.
    Join {
        player_id: PlayerId,
        conn_id: Uuid,
        outbound: mpsc::UnboundedSender<ServerMsg>,
    },
    /// Drop a connection; the seat survives for reconnects.
    Leave { conn_id: Uuid },
    Bid {
        player_id: PlayerId,
        value: u8,
        origin: ActionOrigin,
    },
    Play {
        player_id: PlayerId,
        card_id: String,
        origin: ActionOrigin,
    },
    RequestState { conn_id: Uuid },
    UpdateProfile {
        conn_id: Uuid,
        display_name: Option<String>,
        avatar_seed: Option<String>,
        color: Option<String>,
    },
    /// HTTP-side seat reservation, answered over the oneshot.
    Reserve {
        request: SeatRequest,
        reply: oneshot::Sender<Result<ReservedSeat, AppError>>,
    },
    /// Turn timer fired.
    Tick,
    Shutdown,
}
