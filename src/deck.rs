//! Shoe and hand arithmetic for the Blackjack environment.
//! Ranks are stored as `u8`: 2-10 at face value, J/Q/K as 10, ace as 11.

use std::fmt;

use fastrand::Rng;
use tracing::trace;

/// Rank used for an ace before it is softened to 1.
pub const ACE: u8 = 11;

/// Decks in a default shoe.
pub const DEFAULT_DECKS: usize = 8;

/// A shoe holding fewer cards than this is rebuilt before the next draw.
pub const RESHUFFLE_THRESHOLD: usize = 20;

/// Card values in a single deck and how many of each it holds.
/// 10-value cards cover the 10, J, Q and K.
const CARD_VALUES: [u8; 10] = [2, 3, 4, 5, 6, 7, 8, 9, 10, ACE];
const CARD_COUNTS: [usize; 10] = [4, 4, 4, 4, 4, 4, 4, 4, 16, 4];

/// Multi-deck shoe consumed by popping from the back.
///
/// The shoe never runs dry: once fewer than [`RESHUFFLE_THRESHOLD`] cards are
/// left it is discarded and a fresh shuffled shoe is built. The remaining
/// composition is private, so no counting signal leaks to callers.
#[derive(Debug, Clone)]
pub struct Shoe {
    num_decks: usize,
    cards: Vec<u8>,
    rng: Rng,
    shuffles: u64,
}

impl Shoe {
    pub fn new(num_decks: usize) -> Self {
        Self::with_rng(num_decks, Rng::new())
    }

    pub fn with_seed(num_decks: usize, seed: u64) -> Self {
        Self::with_rng(num_decks, Rng::with_seed(seed))
    }

    /// Build a shoe shuffled by the given random source. At least one deck is used.
    pub fn with_rng(num_decks: usize, rng: Rng) -> Self {
        let num_decks = num_decks.max(1);
        let mut shoe = Shoe {
            num_decks,
            cards: Vec::with_capacity(num_decks * 52),
            rng,
            shuffles: 0,
        };
        shoe.reshuffle();
        shoe
    }

    /// Build a shoe whose next draws are `top`, in order, followed by a
    /// regular shuffled shoe. Used to replay fixed card sequences.
    pub fn stacked(num_decks: usize, rng: Rng, top: &[u8]) -> Self {
        let mut shoe = Self::with_rng(num_decks, rng);
        shoe.cards.extend(top.iter().rev());
        shoe
    }

    fn reshuffle(&mut self) {
        self.cards.clear();
        for _ in 0..self.num_decks {
            for (&value, &count) in CARD_VALUES.iter().zip(CARD_COUNTS.iter()) {
                self.cards.extend(std::iter::repeat(value).take(count));
            }
        }
        self.rng.shuffle(&mut self.cards);
        self.shuffles += 1;
        trace!(decks = self.num_decks, shuffles = self.shuffles, "shoe rebuilt");
    }

    /// Pop the next card, rebuilding the shoe first if it is running low.
    #[inline]
    pub fn draw(&mut self) -> u8 {
        if self.cards.len() < RESHUFFLE_THRESHOLD {
            self.reshuffle();
        }
        // A rebuilt shoe holds at least 52 cards, so this never falls back.
        self.cards.pop().unwrap_or(10)
    }

    pub fn num_decks(&self) -> usize {
        self.num_decks
    }

    /// Cards left before the next rebuild check.
    pub fn remaining(&self) -> usize {
        self.cards.len()
    }

    /// Number of times the shoe has been built, including the first.
    pub fn shuffles(&self) -> u64 {
        self.shuffles
    }
}

impl Default for Shoe {
    fn default() -> Self {
        Self::new(DEFAULT_DECKS)
    }
}

/// Result of hand value calculation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandValue {
    pub total: u8,
    pub is_soft: bool,
}

/// Calculate the value of a hand
#[inline]
pub fn hand_value(cards: &[u8]) -> HandValue {
    let mut total: u16 = cards.iter().map(|&c| c as u16).sum();
    let mut aces = cards.iter().filter(|&&c| c == ACE).count();

    // Convert aces from 11 to 1 as needed to avoid bust
    while total > 21 && aces > 0 {
        total -= 10;
        aces -= 1;
    }

    HandValue {
        total: total.min(u8::MAX as u16) as u8,
        is_soft: aces > 0 && total <= 21,
    }
}

/// Check if hand is busted (over 21)
#[inline]
pub fn is_bust(cards: &[u8]) -> bool {
    hand_value(cards).total > 21
}

/// An ordered, growing hand of card ranks.
///
/// Value and softness are derived from the cards on every call, since a new
/// card can change which aces still count as 11.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Hand {
    cards: Vec<u8>,
}

impl Hand {
    pub fn new() -> Self {
        Hand { cards: Vec::new() }
    }

    pub fn from_cards(cards: &[u8]) -> Self {
        Hand {
            cards: cards.to_vec(),
        }
    }

    #[inline]
    pub fn push(&mut self, card: u8) {
        self.cards.push(card);
    }

    pub fn cards(&self) -> &[u8] {
        &self.cards
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn first(&self) -> Option<u8> {
        self.cards.first().copied()
    }

    #[inline]
    pub fn value(&self) -> HandValue {
        hand_value(&self.cards)
    }

    #[inline]
    pub fn total(&self) -> u8 {
        self.value().total
    }

    #[inline]
    pub fn is_soft(&self) -> bool {
        self.value().is_soft
    }

    #[inline]
    pub fn is_bust(&self) -> bool {
        is_bust(&self.cards)
    }
}

impl fmt::Display for Hand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, card) in self.cards.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", card)?;
        }
        write!(f, "]")
    }
}

/// Generate cards that produce a given (total, softness) pair.
///
/// Soft totals range over 12-21 and hard totals over 4-21.
pub fn cards_for_total(total: u8, is_soft: bool) -> Hand {
    if is_soft {
        return match total {
            12 => Hand::from_cards(&[ACE, ACE]),
            _ => Hand::from_cards(&[ACE, total - 11]),
        };
    }

    match total {
        0..=3 => Hand::from_cards(&[total]),
        4..=11 => Hand::from_cards(&[2, total - 2]),
        12..=19 => Hand::from_cards(&[10, total - 10]),
        20 => Hand::from_cards(&[10, 10]),
        // Hard 21 needs 3 cards
        _ => Hand::from_cards(&[10, 9, 2]),
    }
}
