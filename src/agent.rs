//! Shared machinery for the tabular temporal-difference agents.
//!
//! Both agents use the same state abstraction, the same ε-greedy behaviour
//! policy and the same training driver. They differ only in how an episode is
//! walked and which next-state value the update bootstraps from; that part
//! lives in [`crate::q_learning`] and [`crate::sarsa`].

use std::fmt;
use std::str::FromStr;

use fastrand::Rng;
use tracing::{debug, info};

use crate::config::{AgentConfig, TrainingConfig};
use crate::engine::{Action, BlackjackEnv, EpisodeState, Outcome};
use crate::error::{Error, Result};
use crate::q_learning::QLearningAgent;
use crate::sarsa::SarsaAgent;
use crate::table::{ActionValues, StateKey, ValueTable};

/// Which temporal-difference rule an agent learns with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Algorithm {
    /// Off-policy: bootstraps from the best next action.
    QLearning,
    /// On-policy: bootstraps from the sampled next action.
    Sarsa,
}

impl Algorithm {
    pub fn name(&self) -> &'static str {
        match self {
            Algorithm::QLearning => "q-learning",
            Algorithm::Sarsa => "sarsa",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Algorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "q-learning" | "qlearning" | "q" => Ok(Algorithm::QLearning),
            "sarsa" => Ok(Algorithm::Sarsa),
            other => Err(Error::InvalidAlgorithm(other.to_string())),
        }
    }
}

/// Geometric ε decay toward a floor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExplorationSchedule {
    epsilon: f64,
    decay: f64,
    min: f64,
}

impl ExplorationSchedule {
    pub fn new(epsilon: f64, decay: f64, min: f64) -> Self {
        ExplorationSchedule {
            epsilon: epsilon.max(min),
            decay,
            min,
        }
    }

    #[inline(always)]
    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Apply one episode of decay and return the new ε.
    #[inline]
    pub fn decay(&mut self) -> f64 {
        self.epsilon = (self.epsilon * self.decay).max(self.min);
        self.epsilon
    }
}

/// Table, exploration state and random source owned by one agent.
#[derive(Debug, Clone)]
pub struct TabularCore {
    table: ValueTable,
    schedule: ExplorationSchedule,
    learning_rate: f64,
    discount: f64,
    rng: Rng,
}

impl TabularCore {
    pub fn new(config: &AgentConfig) -> Result<Self> {
        config.validate()?;
        let rng = match config.seed {
            Some(seed) => Rng::with_seed(seed),
            None => Rng::new(),
        };
        Ok(TabularCore {
            table: ValueTable::new(),
            schedule: ExplorationSchedule::new(
                config.epsilon,
                config.epsilon_decay,
                config.epsilon_min,
            ),
            learning_rate: config.learning_rate,
            discount: config.discount,
            rng,
        })
    }

    pub fn table(&self) -> &ValueTable {
        &self.table
    }

    /// Mutable access for seeding estimates, e.g. warm starts in tests.
    pub fn table_mut(&mut self) -> &mut ValueTable {
        &mut self.table
    }

    pub fn schedule(&self) -> &ExplorationSchedule {
        &self.schedule
    }

    pub fn discount(&self) -> f64 {
        self.discount
    }

    /// ε-greedy behaviour policy. A made or busted hand always stands.
    #[inline]
    pub fn choose_action(&mut self, state: &EpisodeState, explore: bool) -> Action {
        if explore
            && state.player_hand.total() < 21
            && self.rng.f64() < self.schedule.epsilon()
        {
            return Action::random(&mut self.rng);
        }
        greedy_policy(&self.table, state, &mut self.rng)
    }

    #[inline]
    pub fn greedy_action(&mut self, state: &EpisodeState) -> Action {
        self.table
            .greedy_action(&StateKey::from_state(state), &mut self.rng)
    }

    /// Move Q(key, action) a step of size α toward `target`.
    #[inline]
    pub fn apply(&mut self, key: StateKey, action: Action, target: f64) {
        let lr = self.learning_rate;
        let row = self.table.row_mut(key);
        let q = row.get(action);
        row.set(action, q + lr * (target - q));
    }

    pub(crate) fn end_episode(&mut self) -> f64 {
        self.schedule.decay()
    }
}

/// How a single training episode ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpisodeResult {
    pub steps: usize,
    /// `None` when the step cap cut the episode short.
    pub outcome: Option<Outcome>,
}

/// Tallies for a completed training run.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TrainingSummary {
    pub episodes: usize,
    pub wins: usize,
    pub pushes: usize,
    pub losses: usize,
    pub truncated: usize,
    pub final_epsilon: f64,
    pub states: usize,
}

impl TrainingSummary {
    fn record(&mut self, result: &EpisodeResult) {
        self.episodes += 1;
        match result.outcome.map(|o| o.reward()) {
            Some(r) if r > 0 => self.wins += 1,
            Some(r) if r < 0 => self.losses += 1,
            Some(_) => self.pushes += 1,
            None => self.truncated += 1,
        }
    }

    pub fn win_rate(&self) -> f64 {
        if self.episodes == 0 {
            0.0
        } else {
            self.wins as f64 / self.episodes as f64
        }
    }
}

/// Progress hook called with (completed, total) episodes.
pub type ProgressFn<'a> = &'a mut dyn FnMut(usize, usize);

/// A tabular Blackjack agent.
///
/// Implementors supply the episode walk and the update rule; decisions,
/// reasoning and the training driver are shared.
pub trait Agent {
    fn algorithm(&self) -> Algorithm;

    fn core(&self) -> &TabularCore;

    fn core_mut(&mut self) -> &mut TabularCore;

    /// Play one exploratory episode, updating the table after every step.
    fn run_episode(&mut self, env: &mut BlackjackEnv, max_steps: usize) -> EpisodeResult;

    fn table(&self) -> &ValueTable {
        self.core().table()
    }

    fn epsilon(&self) -> f64 {
        self.core().schedule().epsilon()
    }

    fn choose_action(&mut self, state: &EpisodeState, explore: bool) -> Action {
        self.core_mut().choose_action(state, explore)
    }

    /// Greedy action without exploration.
    fn get_best_action(&mut self, state: &EpisodeState) -> Action {
        self.core_mut().greedy_action(state)
    }

    fn get_q_values(&self, state: &EpisodeState) -> ActionValues {
        self.table().values(&StateKey::from_state(state))
    }

    fn get_reasoning(&self, state: &EpisodeState) -> String {
        reasoning(self.table(), state)
    }

    /// Run `config.episodes` episodes, decaying ε after each one.
    fn train(
        &mut self,
        env: &mut BlackjackEnv,
        config: &TrainingConfig,
        mut progress: Option<ProgressFn<'_>>,
    ) -> Result<TrainingSummary> {
        config.validate()?;
        let algorithm = self.algorithm();
        let mut summary = TrainingSummary::default();

        for episode in 0..config.episodes {
            let result = self.run_episode(env, config.max_steps);
            summary.record(&result);
            let epsilon = self.core_mut().end_episode();

            if result.outcome.is_none() {
                debug!(%algorithm, episode, steps = result.steps, "episode hit step cap");
            }

            let completed = episode + 1;
            if config.report_due(completed) {
                info!(
                    %algorithm,
                    episode = completed,
                    total = config.episodes,
                    epsilon,
                    states = self.table().len(),
                    "training progress"
                );
                if let Some(callback) = progress.as_deref_mut() {
                    callback(completed, config.episodes);
                }
            }
        }

        summary.final_epsilon = self.epsilon();
        summary.states = self.table().len();
        info!(
            %algorithm,
            episodes = summary.episodes,
            states = summary.states,
            win_rate = summary.win_rate(),
            "training complete"
        );
        Ok(summary)
    }
}

/// Greedy play policy over a finished table: stand on 21 or more, otherwise
/// take the better estimate, breaking ties at random.
#[inline]
pub fn greedy_policy(table: &ValueTable, state: &EpisodeState, rng: &mut Rng) -> Action {
    if state.player_hand.total() >= 21 {
        return Action::Stand;
    }
    table.greedy_action(&StateKey::from_state(state), rng)
}

/// Build a boxed agent for `algorithm`.
pub fn build_agent(algorithm: Algorithm, config: &AgentConfig) -> Result<Box<dyn Agent + Send>> {
    let agent: Box<dyn Agent + Send> = match algorithm {
        Algorithm::QLearning => Box::new(QLearningAgent::new(config)?),
        Algorithm::Sarsa => Box::new(SarsaAgent::new(config)?),
    };
    Ok(agent)
}

/// Human-readable account of the greedy decision for `state`.
///
/// Read-only: ties are reported as ties instead of being broken at random, so
/// the same table and state always give the same text.
pub fn reasoning(table: &ValueTable, state: &EpisodeState) -> String {
    let value = state.player_hand.value();
    let kind = if value.is_soft { "soft" } else { "hard" };

    let mut lines = Vec::with_capacity(16);
    lines.push("=".repeat(50));
    lines.push("SITUATION".to_string());
    lines.push("=".repeat(50));
    lines.push(format!("Player hand: {}", state.player_hand));
    lines.push(format!("Value: {} ({})", value.total, kind));
    lines.push(format!("Dealer shows: {}", state.dealer_showing));
    lines.push(String::new());

    if value.total >= 21 {
        lines.push("DECISION: STAND (value >= 21)".to_string());
        return lines.join("\n");
    }

    let key = StateKey::from_state(state);
    let values = table.values(&key);
    lines.push("Q-VALUES".to_string());
    lines.push(format!("Q(STAND) = {:.4}", values.get(Action::Stand)));
    lines.push(format!("Q(HIT)   = {:.4}", values.get(Action::Draw)));
    lines.push(String::new());

    lines.push("AI DECISION".to_string());
    match (table.get(&key), values.preferred()) {
        (None, _) => {
            lines.push("UNDECIDED - state not seen in training".to_string());
            lines.push("  The model picks stand or hit at random".to_string());
        }
        (Some(_), None) => {
            lines.push("UNDECIDED - both estimates are equal".to_string());
            lines.push("  The model picks stand or hit at random".to_string());
        }
        (Some(_), Some(Action::Stand)) => {
            lines.push("STAND - the model prefers to stop".to_string());
            lines.push(format!("  A value of {} is probably enough", value.total));
        }
        (Some(_), Some(Action::Draw)) => {
            lines.push("HIT - the model recommends drawing".to_string());
            lines.push(format!("  A value of {} is too low", value.total));
        }
    }

    lines.join("\n")
}
