//! Parallel evaluation of a learned table under greedy play.
//! Hands are split into chunks; each rayon worker owns its own shoe.

use fastrand::Rng;
use rayon::prelude::*;

use crate::agent::greedy_policy;
use crate::config::TrainingConfig;
use crate::deck::DEFAULT_DECKS;
use crate::engine::{Action, BlackjackEnv};
use crate::table::ValueTable;

const CHUNK_SIZE: usize = 10_000;

/// Reward statistics over a batch of hands
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RewardStats {
    pub n: u64,
    pub sum_x: f64,
    pub sum_x_squared: f64,
    pub wins: u64,
    pub pushes: u64,
    pub losses: u64,
}

impl RewardStats {
    #[inline(always)]
    pub fn new() -> Self {
        RewardStats::default()
    }

    #[inline(always)]
    pub fn update(&mut self, reward: i8) {
        let x = f64::from(reward);
        self.n += 1;
        self.sum_x += x;
        self.sum_x_squared += x * x;
        match reward {
            r if r > 0 => self.wins += 1,
            r if r < 0 => self.losses += 1,
            _ => self.pushes += 1,
        }
    }

    /// Mean reward per hand
    #[inline(always)]
    pub fn ev(&self) -> f64 {
        if self.n == 0 { f64::NEG_INFINITY } else { self.sum_x / self.n as f64 }
    }

    /// Standard error of the mean reward
    #[inline(always)]
    pub fn sem(&self) -> f64 {
        if self.n < 2 {
            f64::INFINITY
        } else {
            let mean = self.sum_x / self.n as f64;
            let var = (self.sum_x_squared / self.n as f64) - (mean * mean);
            (var.max(0.0) / self.n as f64).sqrt()
        }
    }

    pub fn win_rate(&self) -> f64 {
        self.rate(self.wins)
    }

    pub fn push_rate(&self) -> f64 {
        self.rate(self.pushes)
    }

    pub fn loss_rate(&self) -> f64 {
        self.rate(self.losses)
    }

    fn rate(&self, count: u64) -> f64 {
        if self.n == 0 { 0.0 } else { count as f64 / self.n as f64 }
    }

    #[inline(always)]
    pub fn merge(&mut self, other: &RewardStats) {
        self.n += other.n;
        self.sum_x += other.sum_x;
        self.sum_x_squared += other.sum_x_squared;
        self.wins += other.wins;
        self.pushes += other.pushes;
        self.losses += other.losses;
    }
}

/// Settings for [`evaluate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvalConfig {
    pub hands: usize,
    pub num_decks: usize,
    pub max_steps: usize,
    pub seed: Option<u64>,
}

impl EvalConfig {
    pub fn new(hands: usize) -> Self {
        EvalConfig {
            hands,
            num_decks: DEFAULT_DECKS,
            max_steps: TrainingConfig::default().max_steps,
            seed: None,
        }
    }

    pub fn with_decks(mut self, num_decks: usize) -> Self {
        self.num_decks = num_decks;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Play one greedy hand and return its reward. Past the step cap the hand stands.
pub fn play_greedy_hand(
    table: &ValueTable,
    env: &mut BlackjackEnv,
    rng: &mut Rng,
    max_steps: usize,
) -> i8 {
    let mut state = env.reset();
    let mut steps = 0;
    loop {
        let action = if steps >= max_steps {
            Action::Stand
        } else {
            greedy_policy(table, &state, rng)
        };
        let tx = env.step(&state, action);
        if tx.done {
            return tx.reward;
        }
        state = tx.state;
        steps += 1;
    }
}

/// Evaluate greedy play over `config.hands` hands across the rayon pool.
///
/// With a seed the result is reproducible: every chunk derives its shoe and
/// tie-break source from the seed and its index.
pub fn evaluate(table: &ValueTable, config: &EvalConfig) -> RewardStats {
    let base_seed = config.seed.unwrap_or_else(|| Rng::new().u64(..));
    let num_chunks = config.hands.div_ceil(CHUNK_SIZE);

    (0..num_chunks)
        .into_par_iter()
        .map(|chunk| {
            let chunk_seed = base_seed.wrapping_add((chunk as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15));
            let mut env = BlackjackEnv::with_seed(config.num_decks, chunk_seed);
            let mut rng = Rng::with_seed(chunk_seed ^ 0xA5A5_A5A5_A5A5_A5A5);
            let hands = CHUNK_SIZE.min(config.hands - chunk * CHUNK_SIZE);

            let mut stats = RewardStats::new();
            for _ in 0..hands {
                stats.update(play_greedy_hand(table, &mut env, &mut rng, config.max_steps));
            }
            stats
        })
        .reduce(RewardStats::new, |mut acc, stats| {
            acc.merge(&stats);
            acc
        })
}
