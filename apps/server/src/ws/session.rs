//! WebSocket gateway: authenticates the upgrade, attaches the connection to
//! its room, and pumps frames both ways. The session never touches game
//! state; it only forwards parsed commands to the room's channel and drains
//! the room's outbound queue.

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use actix::prelude::*;
use actix_web::{web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::tokens::{mint_player_token, verify_for_game};
use crate::auth::PlayerClaims;
use crate::error::AppError;
use crate::errors::ErrorCode;
use crate::room::command::{ActionOrigin, RoomCommand};
use crate::room::worker::RoomHandle;
use crate::state::app_state::AppState;
use crate::state::security_config::SecurityConfig;
use crate::ws::protocol::{ClientMsg, ServerMsg};

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);
/// Two missed heartbeats and the connection is considered gone.
const CLIENT_TIMEOUT: Duration = Duration::from_secs(30);
/// Rotate tokens that would expire within this window.
const TOKEN_REFRESH_WINDOW_SECS: i64 = 15 * 60;

#[derive(Deserialize)]
pub struct WsQuery {
    token: String,
}

/// GET /api/ws/{game_id}?token=…
pub async fn upgrade(
    req: HttpRequest,
    stream: web::Payload,
    path: web::Path<String>,
    query: web::Query<WsQuery>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let game_id = path.into_inner();
    let claims = verify_for_game(&app_state.security, &query.token, &game_id)?;
    let room = app_state
        .registry
        .room(&game_id)
        .ok_or_else(|| AppError::room_not_found(format!("no active room for {game_id}")))?;

    let session = WsSession::new(claims, room, app_state.security.clone());
    ws::start(session, &req, stream)
}

pub struct WsSession {
    conn_id: Uuid,
    claims: PlayerClaims,
    room: RoomHandle,
    security: SecurityConfig,
    last_heartbeat: Instant,
    token_refreshed: bool,
}

impl WsSession {
    fn new(claims: PlayerClaims, room: RoomHandle, security: SecurityConfig) -> Self {
        Self {
            conn_id: Uuid::new_v4(),
            claims,
            room,
            security,
            last_heartbeat: Instant::now(),
            token_refreshed: false,
        }
    }

    fn send_json(ctx: &mut ws::WebsocketContext<Self>, msg: &ServerMsg) {
        match serde_json::to_string(msg) {
            Ok(payload) => ctx.text(payload),
            Err(err) => warn!(error = %err, "failed to serialize outbound message"),
        }
    }

    fn send_error(ctx: &mut ws::WebsocketContext<Self>, code: ErrorCode, message: &str) {
        Self::send_json(
            ctx,
            &ServerMsg::Error {
                code: code.as_str().to_string(),
                message: message.to_string(),
            },
        );
    }

    /// Forward a command to the room without blocking the actor. A full
    /// channel is backpressure: the client hears about it and may retry.
    fn forward(&self, ctx: &mut ws::WebsocketContext<Self>, command: RoomCommand) {
        if self.room.sender().try_send(command).is_err() {
            Self::send_error(ctx, ErrorCode::InternalError, "room is busy or gone");
        }
    }

    fn start_heartbeat(&self, ctx: &mut ws::WebsocketContext<Self>) {
        ctx.run_interval(HEARTBEAT_INTERVAL, |actor, ctx| {
            if Instant::now().duration_since(actor.last_heartbeat) > CLIENT_TIMEOUT {
                warn!(
                    conn_id = %actor.conn_id,
                    player_id = %actor.claims.sub,
                    "heartbeat timed out"
                );
                ctx.close(Some(ws::CloseReason::from(ws::CloseCode::Normal)));
                ctx.stop();
                return;
            }
            ctx.ping(b"keepalive");
            actor.maybe_refresh_token(ctx);
        });
    }

    /// Push a rotated credential before the current one lapses.
    fn maybe_refresh_token(&mut self, ctx: &mut ws::WebsocketContext<Self>) {
        if self.token_refreshed {
            return;
        }
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);
        if self.claims.exp - now > TOKEN_REFRESH_WINDOW_SECS {
            return;
        }
        match mint_player_token(
            &self.security,
            &self.claims.sub,
            &self.claims.game_id,
            self.claims.seat_index,
            self.claims.is_spectator,
            SystemTime::now(),
        ) {
            Ok(token) => {
                self.token_refreshed = true;
                Self::send_json(
                    ctx,
                    &ServerMsg::TokenRefresh {
                        game_id: self.claims.game_id.clone(),
                        token,
                    },
                );
            }
            Err(err) => warn!(error = %err, "could not mint refreshed token"),
        }
    }

    fn handle_client_msg(&mut self, msg: ClientMsg, ctx: &mut ws::WebsocketContext<Self>) {
        match msg {
            ClientMsg::Ping { nonce } => {
                let ts = (time::OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000)
                    as i64;
                Self::send_json(ctx, &ServerMsg::Pong { nonce, ts });
            }
            ClientMsg::RequestState => {
                self.forward(
                    ctx,
                    RoomCommand::RequestState {
                        conn_id: self.conn_id,
                    },
                );
            }
            ClientMsg::Bid { value } => {
                self.forward(
                    ctx,
                    RoomCommand::Bid {
                        player_id: self.claims.sub.clone(),
                        value,
                        origin: ActionOrigin::Human {
                            conn_id: self.conn_id,
                        },
                    },
                );
            }
            ClientMsg::PlayCard { card_id } => {
                self.forward(
                    ctx,
                    RoomCommand::Play {
                        player_id: self.claims.sub.clone(),
                        card_id,
                        origin: ActionOrigin::Human {
                            conn_id: self.conn_id,
                        },
                    },
                );
            }
            ClientMsg::UpdateProfile {
                display_name,
                avatar_seed,
                color,
            } => {
                self.forward(
                    ctx,
                    RoomCommand::UpdateProfile {
                        conn_id: self.conn_id,
                        display_name,
                        avatar_seed,
                        color,
                    },
                );
            }
        }
    }
}

impl Actor for WsSession {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        info!(
            conn_id = %self.conn_id,
            game_id = %self.claims.game_id,
            player_id = %self.claims.sub,
            "session started"
        );

        // The room writes outbound frames into this queue; the session owns
        // the drain end as an actor stream.
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        ctx.add_stream(UnboundedReceiverStream::new(outbound_rx));

        let join = RoomCommand::Join {
            player_id: self.claims.sub.clone(),
            conn_id: self.conn_id,
            outbound: outbound_tx,
        };
        if self.room.sender().try_send(join).is_err() {
            Self::send_error(ctx, ErrorCode::RoomNotFound, "room is gone");
            ctx.close(Some(ws::CloseReason::from(ws::CloseCode::Away)));
            ctx.stop();
            return;
        }

        self.start_heartbeat(ctx);
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        let _ = self.room.sender().try_send(RoomCommand::Leave {
            conn_id: self.conn_id,
        });
        info!(
            conn_id = %self.conn_id,
            player_id = %self.claims.sub,
            "session stopped"
        );
    }
}

/// Outbound pump: frames the room enqueued for this connection.
impl StreamHandler<ServerMsg> for WsSession {
    fn handle(&mut self, msg: ServerMsg, ctx: &mut Self::Context) {
        Self::send_json(ctx, &msg);
    }

    fn finished(&mut self, ctx: &mut Self::Context) {
        // The room dropped our queue: goodbye frame, then close.
        ctx.close(Some(ws::CloseReason::from(ws::CloseCode::Away)));
        ctx.stop();
    }
}

/// Inbound frames from the client.
impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for WsSession {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(payload)) => {
                self.last_heartbeat = Instant::now();
                ctx.pong(&payload);
            }
            Ok(ws::Message::Pong(_)) => {
                self.last_heartbeat = Instant::now();
            }
            Ok(ws::Message::Text(text)) => {
                self.last_heartbeat = Instant::now();
                match serde_json::from_str::<ClientMsg>(&text) {
                    Ok(msg) => self.handle_client_msg(msg, ctx),
                    Err(err) => {
                        // One error reply per bad frame; the connection lives on.
                        Self::send_error(
                            ctx,
                            ErrorCode::InvalidJson,
                            &format!("unparseable frame: {err}"),
                        );
                    }
                }
            }
            Ok(ws::Message::Binary(_)) => {
                self.last_heartbeat = Instant::now();
                Self::send_error(ctx, ErrorCode::InvalidJson, "binary frames are not supported");
            }
            Ok(ws::Message::Close(reason)) => {
                ctx.close(reason);
                ctx.stop();
            }
            Ok(ws::Message::Continuation(_)) | Ok(ws::Message::Nop) => {
                self.last_heartbeat = Instant::now();
            }
            Err(err) => {
                warn!(
                    conn_id = %self.conn_id,
                    player_id = %self.claims.sub,
                    error = %err,
                    "websocket protocol error"
                );
                ctx.close(Some(ws::CloseReason::from(ws::CloseCode::Error)));
                ctx.stop();
            }
        }
    }
}
