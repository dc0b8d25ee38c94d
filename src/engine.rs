//! Blackjack environment: dealing, the fixed dealer policy and rewards.
//! The dealer hits soft 17 (H17) and the table pays even money.

use std::fmt;

use fastrand::Rng;

use crate::config::EnvConfig;
use crate::deck::{Hand, Shoe};
use crate::error::{Error, Result};

/// Possible player actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Stand = 0,
    Draw = 1,
}

impl Action {
    pub const ALL: [Action; 2] = [Action::Stand, Action::Draw];

    #[inline(always)]
    pub fn index(self) -> usize {
        self as usize
    }

    #[inline(always)]
    pub fn symbol(&self) -> &'static str {
        match self {
            Action::Stand => "S",
            Action::Draw => "H",
        }
    }

    /// Pick one of the two actions uniformly.
    #[inline]
    pub fn random(rng: &mut Rng) -> Action {
        if rng.bool() {
            Action::Draw
        } else {
            Action::Stand
        }
    }
}

impl TryFrom<u8> for Action {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Action::Stand),
            1 => Ok(Action::Draw),
            other => Err(Error::InvalidAction(other)),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Stand => write!(f, "STAND"),
            Action::Draw => write!(f, "HIT"),
        }
    }
}

/// How a finished episode ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    PlayerBust,
    DealerBust,
    PlayerWins,
    DealerWins,
    Push,
}

impl Outcome {
    pub fn tag(&self) -> &'static str {
        match self {
            Outcome::PlayerBust => "player_bust",
            Outcome::DealerBust => "dealer_bust",
            Outcome::PlayerWins => "player_wins",
            Outcome::DealerWins => "dealer_wins",
            Outcome::Push => "push",
        }
    }

    pub fn reward(&self) -> i8 {
        match self {
            Outcome::PlayerBust | Outcome::DealerWins => -1,
            Outcome::DealerBust | Outcome::PlayerWins => 1,
            Outcome::Push => 0,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Snapshot of one episode. Each step returns a new value; old snapshots stay valid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpisodeState {
    pub player_hand: Hand,
    /// Only the first card is visible to the agent.
    pub dealer_hand: Hand,
    pub dealer_showing: u8,
}

impl EpisodeState {
    pub fn new(player_hand: Hand, dealer_hand: Hand) -> Self {
        let dealer_showing = dealer_hand.first().unwrap_or(0);
        EpisodeState {
            player_hand,
            dealer_hand,
            dealer_showing,
        }
    }
}

/// Result of a single `step`.
#[derive(Debug, Clone)]
pub struct Transition {
    pub state: EpisodeState,
    pub reward: i8,
    pub done: bool,
    /// Set once the episode is over.
    pub outcome: Option<Outcome>,
}

/// Blackjack environment owning its shoe.
///
/// A shoe is mutable state; run concurrent episodes on separate environments.
#[derive(Debug, Clone)]
pub struct BlackjackEnv {
    shoe: Shoe,
}

impl BlackjackEnv {
    pub fn new(num_decks: usize) -> Self {
        BlackjackEnv { shoe: Shoe::new(num_decks) }
    }

    pub fn with_seed(num_decks: usize, seed: u64) -> Self {
        BlackjackEnv { shoe: Shoe::with_seed(num_decks, seed) }
    }

    pub fn with_shoe(shoe: Shoe) -> Self {
        BlackjackEnv { shoe }
    }

    /// Build an environment from validated settings.
    pub fn from_config(config: &EnvConfig) -> Result<Self> {
        config.validate()?;
        let rng = match config.seed {
            Some(seed) => Rng::with_seed(seed),
            None => Rng::new(),
        };
        Ok(BlackjackEnv { shoe: Shoe::with_rng(config.num_decks, rng) })
    }

    pub fn shoe(&self) -> &Shoe {
        &self.shoe
    }

    /// Deal a fresh episode: player, player, dealer, dealer.
    pub fn reset(&mut self) -> EpisodeState {
        let mut player_hand = Hand::new();
        player_hand.push(self.shoe.draw());
        player_hand.push(self.shoe.draw());
        let mut dealer_hand = Hand::new();
        dealer_hand.push(self.shoe.draw());
        dealer_hand.push(self.shoe.draw());
        EpisodeState::new(player_hand, dealer_hand)
    }

    /// Dealer draws to 17 and hits soft 17 (H17)
    #[inline]
    pub fn dealer_play(&mut self, hand: &mut Hand) {
        loop {
            let value = hand.value();
            if value.total > 21 {
                break;
            }
            if value.total >= 17 && !value.is_soft {
                break;
            }
            if value.total == 17 && value.is_soft {
                hand.push(self.shoe.draw());
            } else if value.total < 17 {
                hand.push(self.shoe.draw());
            } else {
                break;
            }
        }
    }

    /// Advance the episode by one player action.
    pub fn step(&mut self, state: &EpisodeState, action: Action) -> Transition {
        let mut next = state.clone();

        match action {
            Action::Draw => {
                next.player_hand.push(self.shoe.draw());
                if next.player_hand.is_bust() {
                    Self::finish(next, Outcome::PlayerBust)
                } else {
                    Transition {
                        state: next,
                        reward: 0,
                        done: false,
                        outcome: None,
                    }
                }
            }
            Action::Stand => {
                self.dealer_play(&mut next.dealer_hand);
                let outcome = Self::resolve(&next.player_hand, &next.dealer_hand);
                Self::finish(next, outcome)
            }
        }
    }

    /// Compare a standing player hand against the finished dealer hand.
    #[inline]
    fn resolve(player_hand: &Hand, dealer_hand: &Hand) -> Outcome {
        let player_total = player_hand.total();
        let dealer_total = dealer_hand.total();

        if dealer_hand.is_bust() {
            Outcome::DealerBust
        } else if player_total > dealer_total {
            Outcome::PlayerWins
        } else if player_total < dealer_total {
            Outcome::DealerWins
        } else {
            Outcome::Push
        }
    }

    fn finish(state: EpisodeState, outcome: Outcome) -> Transition {
        Transition {
            state,
            reward: outcome.reward(),
            done: true,
            outcome: Some(outcome),
        }
    }
}

impl Default for BlackjackEnv {
    fn default() -> Self {
        BlackjackEnv { shoe: Shoe::default() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deck::{ACE, DEFAULT_DECKS};

    fn stacked_env(top: &[u8]) -> BlackjackEnv {
        BlackjackEnv::with_shoe(Shoe::stacked(DEFAULT_DECKS, Rng::with_seed(99), top))
    }

    #[test]
    fn reset_deals_player_then_dealer() {
        let mut env = stacked_env(&[10, 7, 9, 5]);
        let state = env.reset();
        assert_eq!(state.player_hand.cards(), &[10, 7]);
        assert_eq!(state.dealer_hand.cards(), &[9, 5]);
        assert_eq!(state.dealer_showing, 9);
    }

    #[test]
    fn dealer_hits_soft_17() {
        let mut env = stacked_env(&[4]);
        let mut hand = Hand::from_cards(&[ACE, 6]);
        env.dealer_play(&mut hand);
        assert_eq!(hand.cards(), &[ACE, 6, 4]);
        assert_eq!(hand.total(), 21);
    }

    #[test]
    fn dealer_stands_on_hard_17_and_soft_18() {
        let mut env = stacked_env(&[]);
        let mut hard = Hand::from_cards(&[10, 7]);
        env.dealer_play(&mut hard);
        assert_eq!(hard.len(), 2);

        let mut soft = Hand::from_cards(&[ACE, 7]);
        env.dealer_play(&mut soft);
        assert_eq!(soft.len(), 2);
    }

    #[test]
    fn draw_without_bust_continues() {
        let mut env = stacked_env(&[10, 2, 9, 7, 5]);
        let state = env.reset();
        let tx = env.step(&state, Action::Draw);
        assert!(!tx.done);
        assert_eq!(tx.reward, 0);
        assert_eq!(tx.outcome, None);
        assert_eq!(tx.state.player_hand.cards(), &[10, 2, 5]);
        // The earlier snapshot is untouched.
        assert_eq!(state.player_hand.cards(), &[10, 2]);
    }

    #[test]
    fn draw_into_bust_ends_episode() {
        let mut env = stacked_env(&[10, 6, 9, 7, 8]);
        let state = env.reset();
        let tx = env.step(&state, Action::Draw);
        assert!(tx.done);
        assert_eq!(tx.reward, -1);
        assert_eq!(tx.outcome, Some(Outcome::PlayerBust));
    }

    #[test]
    fn stand_resolves_each_outcome() {
        // player 20 vs dealer 10,6 then 8 -> dealer bust
        let mut env = stacked_env(&[10, 10, 10, 6, 8]);
        let state = env.reset();
        let tx = env.step(&state, Action::Stand);
        assert_eq!(tx.outcome, Some(Outcome::DealerBust));
        assert_eq!(tx.reward, 1);

        // player 20 vs dealer 19
        let mut env = stacked_env(&[10, 10, 10, 9]);
        let state = env.reset();
        let tx = env.step(&state, Action::Stand);
        assert_eq!(tx.outcome, Some(Outcome::PlayerWins));

        // player 18 vs dealer 19
        let mut env = stacked_env(&[10, 8, 10, 9]);
        let state = env.reset();
        let tx = env.step(&state, Action::Stand);
        assert_eq!(tx.outcome, Some(Outcome::DealerWins));
        assert_eq!(tx.reward, -1);

        // player 18 vs dealer soft 17, dealer hits to hard 17
        let mut env = stacked_env(&[10, 8, ACE, 6, 10]);
        let state = env.reset();
        let tx = env.step(&state, Action::Stand);
        assert_eq!(tx.state.dealer_hand.cards(), &[ACE, 6, 10]);
        assert_eq!(tx.outcome, Some(Outcome::PlayerWins));

        // push on 19
        let mut env = stacked_env(&[10, 9, 10, 9]);
        let state = env.reset();
        let tx = env.step(&state, Action::Stand);
        assert_eq!(tx.outcome, Some(Outcome::Push));
        assert_eq!(tx.reward, 0);
        assert!(tx.done);
    }

    #[test]
    fn from_config_rejects_empty_shoe() {
        let err = BlackjackEnv::from_config(&EnvConfig::new(0)).unwrap_err();
        assert!(matches!(err, Error::InvalidConfiguration { .. }));

        let env = BlackjackEnv::from_config(&EnvConfig::new(2).with_seed(4)).unwrap();
        assert_eq!(env.shoe().num_decks(), 2);
        assert_eq!(env.shoe().remaining(), 104);
    }

    #[test]
    fn action_from_raw() {
        assert_eq!(Action::try_from(0u8), Ok(Action::Stand));
        assert_eq!(Action::try_from(1u8), Ok(Action::Draw));
        assert_eq!(Action::try_from(2u8), Err(Error::InvalidAction(2)));
    }
}
