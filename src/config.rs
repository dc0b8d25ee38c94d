//! Hyper-parameters for agents, training runs and environments.

use crate::deck::DEFAULT_DECKS;
use crate::error::{Error, Result};

/// Learning and exploration parameters for a tabular agent.
///
/// ```
/// use soft17::AgentConfig;
///
/// let config = AgentConfig::default()
///     .with_learning_rate(0.05)
///     .with_epsilon(0.5)
///     .with_seed(42);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct AgentConfig {
    /// Step size α
    pub learning_rate: f64,
    /// Discount factor γ
    pub discount: f64,
    /// Initial exploration rate ε
    pub epsilon: f64,
    /// Multiplicative decay applied to ε after every episode
    pub epsilon_decay: f64,
    /// Floor for ε
    pub epsilon_min: f64,
    /// Random seed for reproducibility
    pub seed: Option<u64>,
}

impl AgentConfig {
    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    pub fn with_discount(mut self, discount: f64) -> Self {
        self.discount = discount;
        self
    }

    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    pub fn with_epsilon_decay(mut self, epsilon_decay: f64) -> Self {
        self.epsilon_decay = epsilon_decay;
        self
    }

    pub fn with_epsilon_min(mut self, epsilon_min: f64) -> Self {
        self.epsilon_min = epsilon_min;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.learning_rate > 0.0 && self.learning_rate <= 1.0) {
            return Err(Error::config(format!(
                "learning rate must be in (0, 1], got {}",
                self.learning_rate
            )));
        }
        if !(0.0..=1.0).contains(&self.discount) {
            return Err(Error::config(format!(
                "discount must be in [0, 1], got {}",
                self.discount
            )));
        }
        if !(0.0..=1.0).contains(&self.epsilon) {
            return Err(Error::config(format!(
                "epsilon must be in [0, 1], got {}",
                self.epsilon
            )));
        }
        if !(0.0..=self.epsilon).contains(&self.epsilon_min) {
            return Err(Error::config(format!(
                "epsilon_min must be in [0, epsilon={}], got {}",
                self.epsilon, self.epsilon_min
            )));
        }
        if !(self.epsilon_decay > 0.0 && self.epsilon_decay <= 1.0) {
            return Err(Error::config(format!(
                "epsilon decay must be in (0, 1], got {}",
                self.epsilon_decay
            )));
        }
        Ok(())
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        AgentConfig {
            learning_rate: 0.01,
            discount: 0.95,
            epsilon: 1.0,
            epsilon_decay: 0.9999,
            epsilon_min: 0.01,
            seed: None,
        }
    }
}

/// Length and pacing of a training run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrainingConfig {
    pub episodes: usize,
    /// Safety bound on steps per episode
    pub max_steps: usize,
    /// Episodes between progress reports
    pub progress_interval: usize,
}

impl TrainingConfig {
    pub fn new(episodes: usize) -> Self {
        TrainingConfig {
            episodes,
            ..Self::default()
        }
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn with_progress_interval(mut self, progress_interval: usize) -> Self {
        self.progress_interval = progress_interval;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.episodes == 0 {
            return Err(Error::config("episodes must be positive"));
        }
        if self.max_steps == 0 {
            return Err(Error::config("max_steps must be positive"));
        }
        Ok(())
    }

    /// Whether a progress report is due after `completed` episodes.
    pub(crate) fn report_due(&self, completed: usize) -> bool {
        self.progress_interval > 0 && completed % self.progress_interval == 0
    }
}

impl Default for TrainingConfig {
    fn default() -> Self {
        TrainingConfig {
            episodes: 500_000,
            max_steps: 50,
            progress_interval: 10_000,
        }
    }
}

/// Shoe size and seeding for an environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvConfig {
    pub num_decks: usize,
    pub seed: Option<u64>,
}

impl EnvConfig {
    pub fn new(num_decks: usize) -> Self {
        EnvConfig { num_decks, seed: None }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_decks == 0 {
            return Err(Error::config("a shoe needs at least one deck"));
        }
        Ok(())
    }
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self::new(DEFAULT_DECKS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(AgentConfig::default().validate().is_ok());
        assert!(TrainingConfig::default().validate().is_ok());
        assert!(EnvConfig::default().validate().is_ok());
        assert_eq!(TrainingConfig::default().max_steps, 50);
    }

    #[test]
    fn rejects_out_of_range_parameters() {
        let base = AgentConfig::default();
        assert!(base.clone().with_learning_rate(0.0).validate().is_err());
        assert!(base.clone().with_discount(1.5).validate().is_err());
        assert!(base.clone().with_epsilon(0.1).with_epsilon_min(0.2).validate().is_err());
        assert!(base.clone().with_epsilon_decay(0.0).validate().is_err());
        assert!(base.with_epsilon(f64::NAN).validate().is_err());
        assert!(TrainingConfig::new(0).validate().is_err());
        assert!(TrainingConfig::new(10).with_max_steps(0).validate().is_err());
        assert!(EnvConfig::new(0).validate().is_err());
    }

    #[test]
    fn progress_cadence() {
        let config = TrainingConfig::new(100).with_progress_interval(25);
        assert!(config.report_due(50));
        assert!(!config.report_due(51));
        assert!(!TrainingConfig::new(100).with_progress_interval(0).report_due(10));
    }
}
