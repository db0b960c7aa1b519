//! Bot manager: seats bots and schedules their turns. Decisions are computed
//! off the room task and posted back as ordinary commands, subject to the
//! same per-room serialization as everyone else.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::bots::baseline::Baseline;
use crate::bots::remote::RemoteStrategy;
use crate::bots::strategy::{BotContext, BotStrategy};
use crate::config::ServerConfig;
use crate::domain::engine::SeatRequest;
use crate::domain::state::{GamePhase, PlayerProfile};
use crate::room::command::{ActionOrigin, RoomCommand};

pub struct BotManager {
    strategy: Arc<dyn BotStrategy>,
    delay: Duration,
}

impl BotManager {
    pub fn new(strategy: Arc<dyn BotStrategy>, delay: Duration) -> Self {
        Self { strategy, delay }
    }

    /// Baseline-only manager, or remote-with-fallback when configured.
    pub fn from_config(config: &ServerConfig) -> Self {
        let strategy: Arc<dyn BotStrategy> = match &config.remote_bot {
            Some(remote) => Arc::new(RemoteStrategy::new(remote.clone())),
            None => Arc::new(Baseline),
        };
        Self::new(strategy, config.bot_delay)
    }

    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    /// Seat request for a fill-in bot.
    pub fn bot_seat_request(seat: usize) -> SeatRequest {
        SeatRequest {
            player_id: format!("bot_{seat}"),
            user_id: None,
            profile: PlayerProfile {
                display_name: format!("Bot {seat}"),
                avatar_seed: Some(format!("bot-{seat}")),
                color: None,
            },
            is_bot: true,
            spectator: false,
        }
    }

    /// Decide the given snapshot's turn after a short delay and post the
    /// result to the room. `expected_index` pins the decision to the log
    /// position it was computed against; the room drops stale ones.
    pub fn schedule_turn(
        &self,
        ctx: BotContext,
        expected_index: u64,
        room_tx: mpsc::Sender<RoomCommand>,
    ) {
        let strategy = self.strategy.clone();
        let delay = self.delay;

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            let command = match ctx.phase {
                GamePhase::Bidding => match strategy.bid(&ctx).await {
                    Ok(value) => RoomCommand::Bid {
                        player_id: ctx.player_id.clone(),
                        value,
                        origin: ActionOrigin::Bot { expected_index },
                    },
                    Err(err) => {
                        warn!(
                            game_id = %ctx.game_id,
                            player_id = %ctx.player_id,
                            error = %err,
                            "bot could not produce a bid"
                        );
                        return;
                    }
                },
                GamePhase::Playing => match strategy.play_card(&ctx).await {
                    Ok(card) => RoomCommand::Play {
                        player_id: ctx.player_id.clone(),
                        card_id: card.id(),
                        origin: ActionOrigin::Bot { expected_index },
                    },
                    Err(err) => {
                        warn!(
                            game_id = %ctx.game_id,
                            player_id = %ctx.player_id,
                            error = %err,
                            "bot could not produce a play"
                        );
                        return;
                    }
                },
                other => {
                    debug!(phase = ?other, "bot wakeup in a phase with nothing to decide");
                    return;
                }
            };

            if room_tx.send(command).await.is_err() {
                debug!(game_id = %ctx.game_id, "room went away before the bot decision landed");
            }
        });
    }
}
