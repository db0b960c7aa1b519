//! Remote strategy: POSTs decisions to an external service and degrades to
//! the baseline heuristic on any failure (timeout, transport error, non-2xx,
//! malformed body, illegal decision).

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::bots::baseline::Baseline;
use crate::bots::strategy::{BotContext, BotError, BotStrategy};
use crate::config::RemoteBotConfig;
use crate::domain::cards::Card;

pub const GAME_ID_HEADER: &str = "x-game-id";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DecisionRequest<'a> {
    phase: &'static str,
    hand: &'a [Card],
    context: &'a BotContext,
    #[serde(skip_serializing_if = "Option::is_none")]
    config: Option<&'a serde_json::Value>,
}

#[derive(Deserialize)]
struct BidResponse {
    bid: u8,
}

#[derive(Deserialize)]
struct PlayResponse {
    card: String,
}

pub struct RemoteStrategy {
    client: reqwest::Client,
    config: RemoteBotConfig,
    fallback: Baseline,
    fallback_count: AtomicU64,
}

impl RemoteStrategy {
    pub const NAME: &'static str = "remote";

    pub fn new(config: RemoteBotConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
            fallback: Baseline,
            fallback_count: AtomicU64::new(0),
        }
    }

    /// How many times this strategy has fallen back to the baseline.
    pub fn fallback_count(&self) -> u64 {
        self.fallback_count.load(Ordering::Relaxed)
    }

    fn note_fallback(&self, ctx: &BotContext, path: &str, err: &BotError) {
        let total = self.fallback_count.fetch_add(1, Ordering::Relaxed) + 1;
        warn!(
            game_id = %ctx.game_id,
            player_id = %ctx.player_id,
            path,
            error = %err,
            fallback_total = total,
            "remote strategy failed, using baseline"
        );
    }

    async fn post<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        phase: &'static str,
        ctx: &BotContext,
    ) -> Result<T, BotError> {
        let url = format!("{}{path}", self.config.endpoint.trim_end_matches('/'));
        let body = DecisionRequest {
            phase,
            hand: &ctx.hand,
            context: ctx,
            config: self.config.params.as_ref(),
        };

        let response = self
            .client
            .post(url)
            .header(GAME_ID_HEADER, ctx.game_id.as_str())
            .timeout(self.config.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    BotError::Timeout
                } else {
                    BotError::Remote(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            return Err(BotError::Remote(format!("status {}", response.status())));
        }
        response
            .json::<T>()
            .await
            .map_err(|e| BotError::Remote(format!("malformed body: {e}")))
    }
}

#[async_trait]
impl BotStrategy for RemoteStrategy {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn bid(&self, ctx: &BotContext) -> Result<u8, BotError> {
        let remote = self.post::<BidResponse>("/bid", "bid", ctx).await;
        match remote {
            Ok(BidResponse { bid }) if ctx.legal_bids.contains(&bid) => Ok(bid),
            Ok(BidResponse { bid }) => {
                let err = BotError::InvalidDecision(format!("illegal bid {bid}"));
                self.note_fallback(ctx, "/bid", &err);
                self.fallback.bid(ctx).await
            }
            Err(err) => {
                self.note_fallback(ctx, "/bid", &err);
                self.fallback.bid(ctx).await
            }
        }
    }

    async fn play_card(&self, ctx: &BotContext) -> Result<Card, BotError> {
        let remote = self.post::<PlayResponse>("/play", "play", ctx).await;
        match remote {
            Ok(PlayResponse { card }) => {
                match Card::parse_id(&card)
                    .filter(|parsed| ctx.legal_plays.contains(parsed))
                {
                    Some(parsed) => Ok(parsed),
                    None => {
                        let err =
                            BotError::InvalidDecision(format!("unknown or illegal card {card}"));
                        self.note_fallback(ctx, "/play", &err);
                        self.fallback.play_card(ctx).await
                    }
                }
            }
            Err(err) => {
                self.note_fallback(ctx, "/play", &err);
                self.fallback.play_card(ctx).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::domain::engine;
    use crate::domain::test_helpers::lobby;

    fn unreachable_remote() -> RemoteStrategy {
        RemoteStrategy::new(RemoteBotConfig {
            // A port nothing listens on: every request fails fast.
            endpoint: "http://127.0.0.1:9".to_string(),
            strategy_type: None,
            params: None,
            timeout: Duration::from_millis(200),
        })
    }

    #[tokio::test]
    async fn unreachable_endpoint_falls_back_to_baseline() {
        let (state, _) = lobby("remote-seed", 4, 3);
        let (state, _) = engine::start_round(&state).unwrap();
        let ctx = crate::bots::strategy::BotContext::for_player(&state, "p2").unwrap();

        let remote = unreachable_remote();
        let bid = remote.bid(&ctx).await.unwrap();
        assert!(ctx.legal_bids.contains(&bid));
        assert_eq!(remote.fallback_count(), 1);

        // And the fallback is the baseline's deterministic choice.
        let baseline = Baseline.bid(&ctx).await.unwrap();
        assert_eq!(bid, baseline);
    }
}
