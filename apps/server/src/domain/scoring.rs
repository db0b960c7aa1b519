//! Round scoring law and final placement.

use std::collections::BTreeMap;

use crate::domain::state::PlayerId;

/// Score delta for one player in one round: `5 + bid` when the bid was hit
/// exactly, `-(5 + bid)` otherwise.
pub fn round_delta(bid: u8, tricks: u8) -> i32 {
    let stake = 5 + bid as i32;
    if tricks == bid {
        stake
    } else {
        -stake
    }
}

/// Winners of a finished game: everyone tied at the top score.
pub fn winners(final_scores: &BTreeMap<PlayerId, i32>) -> Vec<PlayerId> {
    let Some(top) = final_scores.values().max().copied() else {
        return Vec::new();
    };
    final_scores
        .iter()
        .filter(|(_, score)| **score == top)
        .map(|(pid, _)| pid.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_bid_pays_stake() {
        assert_eq!(round_delta(0, 0), 5);
        assert_eq!(round_delta(1, 1), 6);
        assert_eq!(round_delta(7, 7), 12);
    }

    #[test]
    fn missed_bid_costs_stake() {
        assert_eq!(round_delta(0, 1), -5);
        assert_eq!(round_delta(1, 0), -6);
        assert_eq!(round_delta(3, 5), -8);
    }

    #[test]
    fn winners_include_all_ties() {
        let mut scores = BTreeMap::new();
        scores.insert("p1".to_string(), 22);
        scores.insert("p2".to_string(), 22);
        scores.insert("p3".to_string(), -4);
        assert_eq!(winners(&scores), vec!["p1".to_string(), "p2".to_string()]);
    }

    #[test]
    fn winners_of_empty_game_is_empty() {
        assert!(winners(&BTreeMap::new()).is_empty());
    }
}
