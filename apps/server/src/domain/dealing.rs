//! Deterministic dealing: shoe construction, seeded shuffle, hands and trump.

use crate::domain::cards::{Card, Rank, Suit};
use crate::domain::rng::GameRng;

/// Cards dealt per player for a given round.
///
/// The published schedule is a descending ladder: `round_count - round_index`,
/// i.e. `10,9,…,1` for the default ten-round game. Changing this table changes
/// every logged game, so it stays explicit.
pub fn cards_per_player_for_round(round_count: u8, round_index: u8) -> u8 {
    debug_assert!(round_index < round_count);
    round_count - round_index
}

/// Result of dealing one round.
#[derive(Debug, Clone, PartialEq)]
pub struct Deal {
    /// One hand per active seat, in seat order. Hands are sorted for a stable
    /// wire representation.
    pub hands: Vec<Vec<Card>>,
    pub trump_card: Option<Card>,
    pub trump_suit: Option<Suit>,
}

/// Number of 52-card decks merged into the shoe. One deck, plus more while
/// hands and the trump reveal do not fit.
pub fn decks_needed(player_count: usize, cards_per_player: u8) -> u8 {
    let needed = player_count * cards_per_player as usize + 1;
    needed.div_ceil(52).max(1) as u8
}

fn build_shoe(decks: u8) -> Vec<Card> {
    let mut shoe = Vec::with_capacity(decks as usize * 52);
    for deck_index in 0..decks {
        for suit in Suit::ALL {
            for rank in Rank::ALL {
                shoe.push(Card::new(suit, rank, deck_index));
            }
        }
    }
    shoe
}

/// Seeded Fisher-Yates shuffle.
fn shuffle(shoe: &mut [Card], rng: &mut GameRng) {
    for i in (1..shoe.len()).rev() {
        let j = rng.next_range(i + 1);
        shoe.swap(i, j);
    }
}

/// Deal one round: shuffle the shoe with the round seed, give each seat its
/// hand in seat order, then reveal the next card as trump. An exhausted shoe
/// yields a no-trump round.
pub fn deal_round(round_seed: &str, player_count: usize, cards_per_player: u8) -> Deal {
    let decks = decks_needed(player_count, cards_per_player);
    let mut shoe = build_shoe(decks);
    let mut rng = GameRng::from_seed_str(round_seed);
    shuffle(&mut shoe, &mut rng);

    let per = cards_per_player as usize;
    let mut hands = Vec::with_capacity(player_count);
    for seat in 0..player_count {
        let start = seat * per;
        let mut hand = shoe[start..start + per].to_vec();
        hand.sort();
        hands.push(hand);
    }

    let trump_card = shoe.get(player_count * per).copied();
    let trump_suit = trump_card.map(|c| c.suit);

    Deal {
        hands,
        trump_card,
        trump_suit,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn schedule_is_descending_ladder() {
        let expected: [u8; 10] = [10, 9, 8, 7, 6, 5, 4, 3, 2, 1];
        for (round_index, &cards) in expected.iter().enumerate() {
            assert_eq!(cards_per_player_for_round(10, round_index as u8), cards);
        }
        assert_eq!(cards_per_player_for_round(1, 0), 1);
    }

    #[test]
    fn dealing_is_deterministic() {
        let a = deal_round("S:0", 4, 10);
        let b = deal_round("S:0", 4, 10);
        assert_eq!(a, b);
    }

    #[test]
    fn different_seeds_differ() {
        let a = deal_round("S:0", 4, 10);
        let b = deal_round("S:1", 4, 10);
        assert_ne!(a, b);
    }

    #[test]
    fn hands_have_no_duplicates_and_trump_is_free() {
        let deal = deal_round("uniq", 5, 10);
        let mut seen: HashSet<String> = HashSet::new();
        for hand in &deal.hands {
            assert_eq!(hand.len(), 10);
            for card in hand {
                assert!(seen.insert(card.id()), "duplicate card {}", card.id());
            }
        }
        let trump = deal.trump_card.expect("trump card expected");
        assert!(!seen.contains(&trump.id()));
        assert_eq!(deal.trump_suit, Some(trump.suit));
    }

    #[test]
    fn shoe_grows_when_hands_do_not_fit() {
        // 6 players x 9 cards + trump = 55 > 52: two decks.
        assert_eq!(decks_needed(6, 9), 2);
        assert_eq!(decks_needed(4, 10), 1);
        // 51 cards dealt + trump reveal exactly fills one deck.
        assert_eq!(decks_needed(3, 17), 1);
        // 52 cards dealt leaves no room for the trump reveal.
        assert_eq!(decks_needed(4, 13), 2);

        let deal = deal_round("big", 6, 9);
        let decks: HashSet<u8> = deal
            .hands
            .iter()
            .flatten()
            .map(|c| c.deck_index)
            .collect();
        assert!(decks.contains(&1), "second deck should be in play");
    }

    #[test]
    fn hands_are_sorted() {
        let deal = deal_round("sorted", 4, 8);
        for hand in &deal.hands {
            let mut copy = hand.clone();
            copy.sort();
            assert_eq!(hand, &copy);
        }
    }
}
