//! Game finalization and lifetime stat rollups: pure computations over a
//! finished game's state and event log.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::events::{EventRecord, GameEvent};
use crate::domain::scoring::winners;
use crate::domain::state::{GameId, GameState, PlayerId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerOutcome {
    pub player_id: PlayerId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub is_bot: bool,
    pub final_score: i32,
    pub is_winner: bool,
    pub total_tricks: u32,
    pub highest_bid: Option<u8>,
    pub longest_win_streak: u32,
    pub longest_loss_streak: u32,
    pub misplays: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameOutcome {
    pub game_id: GameId,
    pub final_scores: BTreeMap<PlayerId, i32>,
    pub players: Vec<PlayerOutcome>,
}

/// Summarize a completed game. A round with positive delta counts as a win
/// for streak purposes; misplays are INVALID_ACTION events attributed to the
/// player.
pub fn finalize_game(state: &GameState, log: &[EventRecord]) -> GameOutcome {
    let winner_ids = winners(&state.cumulative_scores);

    let mut misplays: BTreeMap<&str, u32> = BTreeMap::new();
    for record in log {
        if let GameEvent::InvalidAction { player_id, .. } = &record.event {
            *misplays.entry(player_id.as_str()).or_default() += 1;
        }
    }

    let players = state
        .active_players()
        .iter()
        .map(|p| {
            let pid = p.player_id.as_str();
            let mut total_tricks = 0u32;
            let mut highest_bid: Option<u8> = None;
            let mut win_streak = 0u32;
            let mut loss_streak = 0u32;
            let mut longest_win_streak = 0u32;
            let mut longest_loss_streak = 0u32;

            for summary in &state.round_summaries {
                if let Some(tricks) = summary.tricks_won.get(pid) {
                    total_tricks += *tricks as u32;
                }
                if let Some(bid) = summary.bids.get(pid) {
                    highest_bid = Some(highest_bid.map_or(*bid, |hb| hb.max(*bid)));
                }
                match summary.deltas.get(pid) {
                    Some(delta) if *delta > 0 => {
                        win_streak += 1;
                        loss_streak = 0;
                        longest_win_streak = longest_win_streak.max(win_streak);
                    }
                    Some(_) => {
                        loss_streak += 1;
                        win_streak = 0;
                        longest_loss_streak = longest_loss_streak.max(loss_streak);
                    }
                    None => {}
                }
            }

            PlayerOutcome {
                player_id: p.player_id.clone(),
                user_id: p.user_id.clone(),
                is_bot: p.is_bot,
                final_score: state.cumulative_scores.get(pid).copied().unwrap_or(0),
                is_winner: winner_ids.contains(&p.player_id),
                total_tricks,
                highest_bid,
                longest_win_streak,
                longest_loss_streak,
                misplays: misplays.get(pid).copied().unwrap_or(0),
            }
        })
        .collect();

    GameOutcome {
        game_id: state.game_id.clone(),
        final_scores: state.cumulative_scores.clone(),
        players,
    }
}

/// Per-user stats accumulated across games.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LifetimeStats {
    pub games_played: u32,
    pub games_won: u32,
    pub max_score: Option<i32>,
    pub min_score: Option<i32>,
    pub current_win_streak: u32,
    pub current_loss_streak: u32,
    pub most_consecutive_wins: u32,
    pub most_consecutive_losses: u32,
}

/// Roll one finished game into a player's lifetime stats. The running streak
/// resets to zero on the opposite outcome and increments otherwise.
pub fn apply_outcome(stats: &mut LifetimeStats, outcome: &PlayerOutcome) {
    stats.games_played += 1;
    stats.max_score = Some(
        stats
            .max_score
            .map_or(outcome.final_score, |m| m.max(outcome.final_score)),
    );
    stats.min_score = Some(
        stats
            .min_score
            .map_or(outcome.final_score, |m| m.min(outcome.final_score)),
    );

    if outcome.is_winner {
        stats.games_won += 1;
        stats.current_win_streak += 1;
        stats.current_loss_streak = 0;
        stats.most_consecutive_wins = stats.most_consecutive_wins.max(stats.current_win_streak);
    } else {
        stats.current_loss_streak += 1;
        stats.current_win_streak = 0;
        stats.most_consecutive_losses = stats
            .most_consecutive_losses
            .max(stats.current_loss_streak);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::EngineErrorCode;
    use crate::domain::events::GameEvent;
    use crate::domain::test_helpers::run_seeded_game;

    #[test]
    fn finalize_computes_winners_totals_and_misplays() {
        let (state, mut records) = run_seeded_game("finalize", 3, 2, "actions");

        // Two misplays attributed to p1.
        for _ in 0..2 {
            records.push(EventRecord {
                event: GameEvent::InvalidAction {
                    player_id: "p1".to_string(),
                    code: EngineErrorCode::MustFollowSuit,
                    message: "must follow Hearts".to_string(),
                },
                event_index: records.len() as u64,
                timestamp: 0,
                game_id: state.game_id.clone(),
            });
        }

        let outcome = finalize_game(&state, &records);
        assert_eq!(outcome.final_scores, state.cumulative_scores);

        let top = *state.cumulative_scores.values().max().unwrap();
        for player in &outcome.players {
            assert_eq!(player.is_winner, player.final_score == top);

            let expected_tricks: u32 = state
                .round_summaries
                .iter()
                .filter_map(|s| s.tricks_won.get(&player.player_id))
                .map(|t| *t as u32)
                .sum();
            assert_eq!(player.total_tricks, expected_tricks);

            let expected_highest = state
                .round_summaries
                .iter()
                .filter_map(|s| s.bids.get(&player.player_id))
                .max()
                .copied();
            assert_eq!(player.highest_bid, expected_highest);

            let rounds = state.round_summaries.len() as u32;
            assert!(player.longest_win_streak <= rounds);
            assert!(player.longest_loss_streak <= rounds);
        }

        let p1 = outcome
            .players
            .iter()
            .find(|p| p.player_id == "p1")
            .unwrap();
        assert_eq!(p1.misplays, 2);
        let p2 = outcome
            .players
            .iter()
            .find(|p| p.player_id == "p2")
            .unwrap();
        assert_eq!(p2.misplays, 0);
    }

    #[test]
    fn streaks_follow_the_round_deltas() {
        let (state, records) = run_seeded_game("streaks", 4, 3, "actions");
        let outcome = finalize_game(&state, &records);

        for player in &outcome.players {
            // Recompute the longest runs directly from the deltas.
            let deltas: Vec<i32> = state
                .round_summaries
                .iter()
                .filter_map(|s| s.deltas.get(&player.player_id).copied())
                .collect();
            let mut best_win = 0u32;
            let mut best_loss = 0u32;
            let mut run_win = 0u32;
            let mut run_loss = 0u32;
            for delta in deltas {
                if delta > 0 {
                    run_win += 1;
                    run_loss = 0;
                } else {
                    run_loss += 1;
                    run_win = 0;
                }
                best_win = best_win.max(run_win);
                best_loss = best_loss.max(run_loss);
            }
            assert_eq!(player.longest_win_streak, best_win);
            assert_eq!(player.longest_loss_streak, best_loss);
        }
    }

    fn outcome(score: i32, winner: bool) -> PlayerOutcome {
        PlayerOutcome {
            player_id: "p1".into(),
            user_id: Some("u1".into()),
            is_bot: false,
            final_score: score,
            is_winner: winner,
            total_tricks: 0,
            highest_bid: None,
            longest_win_streak: 0,
            longest_loss_streak: 0,
            misplays: 0,
        }
    }

    #[test]
    fn lifetime_streaks_reset_on_opposite_outcome() {
        let mut stats = LifetimeStats::default();
        apply_outcome(&mut stats, &outcome(10, true));
        apply_outcome(&mut stats, &outcome(12, true));
        apply_outcome(&mut stats, &outcome(-3, false));
        apply_outcome(&mut stats, &outcome(20, true));

        assert_eq!(stats.games_played, 4);
        assert_eq!(stats.games_won, 3);
        assert_eq!(stats.current_win_streak, 1);
        assert_eq!(stats.current_loss_streak, 0);
        assert_eq!(stats.most_consecutive_wins, 2);
        assert_eq!(stats.most_consecutive_losses, 1);
    }

    #[test]
    fn lifetime_score_extremes_track_min_and_max() {
        let mut stats = LifetimeStats::default();
        apply_outcome(&mut stats, &outcome(10, true));
        apply_outcome(&mut stats, &outcome(-8, false));
        apply_outcome(&mut stats, &outcome(4, false));

        assert_eq!(stats.max_score, Some(10));
        assert_eq!(stats.min_score, Some(-8));
    }
}
