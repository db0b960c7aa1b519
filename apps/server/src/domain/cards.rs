//! Core card types: Suit, Rank, Card, and the canonical card id format.
//!
//! A card id is `"d{deckIndex}:{suit}:{rank}"`, e.g. `d0:S:A` for the ace of
//! spades from the first deck. Multiple decks may be merged into one shoe;
//! `deck_index` distinguishes the copies.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Suit {
    Clubs,
    Diamonds,
    Hearts,
    Spades,
}

impl Suit {
    pub const ALL: [Suit; 4] = [Suit::Clubs, Suit::Diamonds, Suit::Hearts, Suit::Spades];

    pub fn letter(self) -> char {
        match self {
            Suit::Clubs => 'C',
            Suit::Diamonds => 'D',
            Suit::Hearts => 'H',
            Suit::Spades => 'S',
        }
    }

    fn from_letter(c: char) -> Option<Suit> {
        match c {
            'C' => Some(Suit::Clubs),
            'D' => Some(Suit::Diamonds),
            'H' => Some(Suit::Hearts),
            'S' => Some(Suit::Spades),
            _ => None,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub enum Rank {
    #[serde(rename = "2")]
    Two,
    #[serde(rename = "3")]
    Three,
    #[serde(rename = "4")]
    Four,
    #[serde(rename = "5")]
    Five,
    #[serde(rename = "6")]
    Six,
    #[serde(rename = "7")]
    Seven,
    #[serde(rename = "8")]
    Eight,
    #[serde(rename = "9")]
    Nine,
    #[serde(rename = "10")]
    Ten,
    #[serde(rename = "J")]
    Jack,
    #[serde(rename = "Q")]
    Queen,
    #[serde(rename = "K")]
    King,
    #[serde(rename = "A")]
    Ace,
}

impl Rank {
    pub const ALL: [Rank; 13] = [
        Rank::Two,
        Rank::Three,
        Rank::Four,
        Rank::Five,
        Rank::Six,
        Rank::Seven,
        Rank::Eight,
        Rank::Nine,
        Rank::Ten,
        Rank::Jack,
        Rank::Queen,
        Rank::King,
        Rank::Ace,
    ];

    pub fn token(self) -> &'static str {
        match self {
            Rank::Two => "2",
            Rank::Three => "3",
            Rank::Four => "4",
            Rank::Five => "5",
            Rank::Six => "6",
            Rank::Seven => "7",
            Rank::Eight => "8",
            Rank::Nine => "9",
            Rank::Ten => "10",
            Rank::Jack => "J",
            Rank::Queen => "Q",
            Rank::King => "K",
            Rank::Ace => "A",
        }
    }

    fn from_token(s: &str) -> Option<Rank> {
        Rank::ALL.iter().copied().find(|r| r.token() == s)
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Card {
    pub suit: Suit,
    pub rank: Rank,
    pub deck_index: u8,
}

impl Card {
    pub fn new(suit: Suit, rank: Rank, deck_index: u8) -> Self {
        Self {
            suit,
            rank,
            deck_index,
        }
    }

    /// Canonical card id, e.g. `d0:H:10`.
    pub fn id(&self) -> String {
        format!("d{}:{}:{}", self.deck_index, self.suit.letter(), self.rank.token())
    }

    /// Parse a canonical card id back into a Card.
    pub fn parse_id(id: &str) -> Option<Card> {
        let mut parts = id.splitn(3, ':');
        let deck_part = parts.next()?;
        let suit_part = parts.next()?;
        let rank_part = parts.next()?;

        let deck_index: u8 = deck_part.strip_prefix('d')?.parse().ok()?;
        let mut suit_chars = suit_part.chars();
        let suit = Suit::from_letter(suit_chars.next()?)?;
        if suit_chars.next().is_some() {
            return None;
        }
        let rank = Rank::from_token(rank_part)?;

        Some(Card {
            suit,
            rank,
            deck_index,
        })
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.suit.letter(), self.rank.token())
    }
}

// Note: Ord on Card is only for stable sorting: suit order C<D<H<S, then rank,
// then deck index. Do not use for trick resolution, which depends on trump and
// the led suit.
impl Ord for Card {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.suit
            .cmp(&other.suit)
            .then(self.rank.cmp(&other.rank))
            .then(self.deck_index.cmp(&other.deck_index))
    }
}

impl PartialOrd for Card {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Wire form of a card. The id is carried redundantly so clients never have
/// to reassemble it.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CardWire {
    id: String,
    suit: Suit,
    rank: Rank,
    deck_index: u8,
}

impl Serialize for Card {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        CardWire {
            id: self.id(),
            suit: self.suit,
            rank: self.rank,
            deck_index: self.deck_index,
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Card {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let wire = CardWire::deserialize(deserializer)?;
        Ok(Card {
            suit: wire.suit,
            rank: wire.rank,
            deck_index: wire.deck_index,
        })
    }
}

pub fn hand_has_suit(hand: &[Card], suit: Suit) -> bool {
    hand.iter().any(|c| c.suit == suit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn card_id_round_trips() {
        for suit in Suit::ALL {
            for rank in Rank::ALL {
                for deck_index in [0u8, 1, 3] {
                    let card = Card::new(suit, rank, deck_index);
                    assert_eq!(Card::parse_id(&card.id()), Some(card));
                }
            }
        }
    }

    #[test]
    fn card_id_format() {
        let card = Card::new(Suit::Spades, Rank::Ace, 0);
        assert_eq!(card.id(), "d0:S:A");
        let card = Card::new(Suit::Hearts, Rank::Ten, 1);
        assert_eq!(card.id(), "d1:H:10");
    }

    #[test]
    fn bad_ids_rejected() {
        assert_eq!(Card::parse_id(""), None);
        assert_eq!(Card::parse_id("d0:X:A"), None);
        assert_eq!(Card::parse_id("d0:S:1"), None);
        assert_eq!(Card::parse_id("0:S:A"), None);
        assert_eq!(Card::parse_id("d0:SS:A"), None);
    }

    #[test]
    fn card_serde_is_stable() {
        let card = Card::new(Suit::Diamonds, Rank::Queen, 0);
        let json = serde_json::to_string(&card).unwrap();
        assert_eq!(
            json,
            r#"{"id":"d0:D:Q","suit":"diamonds","rank":"Q","deckIndex":0}"#
        );
        let back: Card = serde_json::from_str(&json).unwrap();
        assert_eq!(back, card);
    }

    #[test]
    fn hand_has_suit_checks_membership() {
        let hand = vec![
            Card::new(Suit::Clubs, Rank::Two, 0),
            Card::new(Suit::Diamonds, Rank::Ace, 0),
        ];
        assert!(hand_has_suit(&hand, Suit::Clubs));
        assert!(!hand_has_suit(&hand, Suit::Hearts));
    }
}
