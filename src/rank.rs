use std::fmt;

use serde_enum_str::{Deserialize_enum_str, Serialize_enum_str};
use strum_macros::EnumIter;

/// One of the thirteen card ranks. Suit is not modeled: the policy layer
/// and shoe are composition-independent above the rank (see Non-goals).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, Serialize_enum_str, Deserialize_enum_str,
)]
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
    #[serde(rename = "T")]
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

pub const RANK_ORDER: [Rank; 13] = [
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

impl Rank {
    /// Point value with the ace counted high; soft downgrade happens in `hand_value`.
    pub fn value(self) -> u8 {
        match self {
            Rank::Two => 2,
            Rank::Three => 3,
            Rank::Four => 4,
            Rank::Five => 5,
            Rank::Six => 6,
            Rank::Seven => 7,
            Rank::Eight => 8,
            Rank::Nine => 9,
            Rank::Ten | Rank::Jack | Rank::Queen | Rank::King => 10,
            Rank::Ace => 11,
        }
    }

    pub fn is_ace(self) -> bool {
        matches!(self, Rank::Ace)
    }

    pub fn is_ten_valued(self) -> bool {
        matches!(self, Rank::Ten | Rank::Jack | Rank::Queen | Rank::King)
    }

    /// Collapses T/J/Q/K to the canonical "T" upcard key (spec.md §3).
    pub fn upcard_key(self) -> UpcardKey {
        if self.is_ten_valued() {
            UpcardKey::Ten
        } else {
            UpcardKey::from_rank(self)
        }
    }

    pub fn symbol(self) -> char {
        match self {
            Rank::Two => '2',
            Rank::Three => '3',
            Rank::Four => '4',
            Rank::Five => '5',
            Rank::Six => '6',
            Rank::Seven => '7',
            Rank::Eight => '8',
            Rank::Nine => '9',
            Rank::Ten => 'T',
            Rank::Jack => 'J',
            Rank::Queen => 'Q',
            Rank::King => 'K',
            Rank::Ace => 'A',
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Dealer upcard after the T/J/Q/K collapse: one of {2..9, T, A}.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpcardKey {
    Two,
    Three,
    Four,
    Five,
    Six,
    Seven,
    Eight,
    Nine,
    Ten,
    Ace,
}

impl UpcardKey {
    fn from_rank(rank: Rank) -> UpcardKey {
        match rank {
            Rank::Two => UpcardKey::Two,
            Rank::Three => UpcardKey::Three,
            Rank::Four => UpcardKey::Four,
            Rank::Five => UpcardKey::Five,
            Rank::Six => UpcardKey::Six,
            Rank::Seven => UpcardKey::Seven,
            Rank::Eight => UpcardKey::Eight,
            Rank::Nine => UpcardKey::Nine,
            Rank::Ace => UpcardKey::Ace,
            _ => UpcardKey::Ten,
        }
    }

    pub fn symbol(self) -> char {
        match self {
            UpcardKey::Two => '2',
            UpcardKey::Three => '3',
            UpcardKey::Four => '4',
            UpcardKey::Five => '5',
            UpcardKey::Six => '6',
            UpcardKey::Seven => '7',
            UpcardKey::Eight => '8',
            UpcardKey::Nine => '9',
            UpcardKey::Ten => 'T',
            UpcardKey::Ace => 'A',
        }
    }
}

impl fmt::Display for UpcardKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ten_family_collapses_to_ten() {
        assert_eq!(Rank::Ten.upcard_key(), UpcardKey::Ten);
        assert_eq!(Rank::Jack.upcard_key(), UpcardKey::Ten);
        assert_eq!(Rank::Queen.upcard_key(), UpcardKey::Ten);
        assert_eq!(Rank::King.upcard_key(), UpcardKey::Ten);
    }

    #[test]
    fn non_ten_ranks_keep_their_own_key() {
        assert_eq!(Rank::Seven.upcard_key(), UpcardKey::Seven);
        assert_eq!(Rank::Ace.upcard_key(), UpcardKey::Ace);
    }

    #[test]
    fn values_match_blackjack_rules() {
        assert_eq!(Rank::Nine.value(), 9);
        assert_eq!(Rank::King.value(), 10);
        assert_eq!(Rank::Ace.value(), 11);
    }
}
