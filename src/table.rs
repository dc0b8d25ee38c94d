//! Sparse action-value table keyed by the abstracted Blackjack state.

use std::collections::HashMap;
use std::fmt;

use fastrand::Rng;

use crate::engine::{Action, EpisodeState};

/// Abstracted state: (player value, soft flag, dealer up-card).
///
/// Hand composition and card count are dropped; two hands with the same key
/// are treated as the same decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateKey {
    pub total: u8,
    pub is_soft: bool,
    pub dealer_upcard: u8,
}

impl StateKey {
    pub fn new(total: u8, is_soft: bool, dealer_upcard: u8) -> Self {
        StateKey {
            total,
            is_soft,
            dealer_upcard,
        }
    }

    #[inline]
    pub fn from_state(state: &EpisodeState) -> Self {
        let value = state.player_hand.value();
        StateKey::new(value.total, value.is_soft, state.dealer_showing)
    }

    /// Soft flag as 0/1.
    pub fn soft_flag(&self) -> u8 {
        self.is_soft as u8
    }
}

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dealer = if self.dealer_upcard == 11 {
            "A".to_string()
        } else {
            self.dealer_upcard.to_string()
        };
        let kind = if self.is_soft { "Soft" } else { "Hard" };
        write!(f, "{} {} vs {}", kind, self.total, dealer)
    }
}

/// Value estimates for stand (index 0) and draw (index 1).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ActionValues([f64; 2]);

impl ActionValues {
    pub fn new(stand: f64, draw: f64) -> Self {
        ActionValues([stand, draw])
    }

    #[inline(always)]
    pub fn get(&self, action: Action) -> f64 {
        self.0[action.index()]
    }

    #[inline(always)]
    pub fn set(&mut self, action: Action, value: f64) {
        self.0[action.index()] = value;
    }

    #[inline]
    pub fn max(&self) -> f64 {
        self.0[0].max(self.0[1])
    }

    /// The strictly better action, or `None` on an exact tie.
    #[inline]
    pub fn preferred(&self) -> Option<Action> {
        let stand = self.get(Action::Stand);
        let draw = self.get(Action::Draw);
        if stand > draw {
            Some(Action::Stand)
        } else if draw > stand {
            Some(Action::Draw)
        } else {
            None
        }
    }

    /// Absolute difference between the two estimates.
    pub fn gap(&self) -> f64 {
        (self.0[0] - self.0[1]).abs()
    }
}

/// Lazily populated table from [`StateKey`] to [`ActionValues`].
#[derive(Debug, Clone, Default)]
pub struct ValueTable {
    rows: HashMap<StateKey, ActionValues>,
}

impl ValueTable {
    pub fn new() -> Self {
        ValueTable {
            rows: HashMap::new(),
        }
    }

    pub fn get(&self, key: &StateKey) -> Option<&ActionValues> {
        self.rows.get(key)
    }

    /// Estimates for `key`, zero for unseen states.
    #[inline]
    pub fn values(&self, key: &StateKey) -> ActionValues {
        self.rows.get(key).copied().unwrap_or_default()
    }

    #[inline]
    pub fn value(&self, key: &StateKey, action: Action) -> f64 {
        self.values(key).get(action)
    }

    /// Best estimate for `key`, 0.0 for unseen states.
    #[inline]
    pub fn max_value(&self, key: &StateKey) -> f64 {
        self.rows.get(key).map_or(0.0, ActionValues::max)
    }

    /// Row for `key`, created with zero estimates on first access.
    #[inline]
    pub fn row_mut(&mut self, key: StateKey) -> &mut ActionValues {
        self.rows.entry(key).or_default()
    }

    /// Greedy action with uniform tie-breaking; unseen states pick at random.
    #[inline]
    pub fn greedy_action(&self, key: &StateKey, rng: &mut Rng) -> Action {
        match self.rows.get(key).and_then(ActionValues::preferred) {
            Some(action) => action,
            None => Action::random(rng),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&StateKey, &ActionValues)> {
        self.rows.iter()
    }
}
