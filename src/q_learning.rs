//! Off-policy temporal-difference control (Q-learning).
//!
//! Q(s,a) ← Q(s,a) + α[r + γ max_a' Q(s',a') − Q(s,a)]
//!
//! The bootstrap uses the best next action regardless of what the ε-greedy
//! behaviour policy will actually do next.

use crate::agent::{Agent, Algorithm, EpisodeResult, TabularCore};
use crate::config::AgentConfig;
use crate::engine::{Action, BlackjackEnv};
use crate::error::Result;
use crate::table::StateKey;

#[derive(Debug, Clone)]
pub struct QLearningAgent {
    core: TabularCore,
}

impl QLearningAgent {
    pub fn new(config: &AgentConfig) -> Result<Self> {
        Ok(QLearningAgent {
            core: TabularCore::new(config)?,
        })
    }

    /// Apply one update. `next` is `None` when the step ended the episode.
    pub fn update(&mut self, key: StateKey, action: Action, reward: f64, next: Option<StateKey>) {
        let target = match next {
            None => reward,
            Some(next_key) => {
                reward + self.core.discount() * self.core.table().max_value(&next_key)
            }
        };
        self.core.apply(key, action, target);
    }
}

impl Agent for QLearningAgent {
    fn algorithm(&self) -> Algorithm {
        Algorithm::QLearning
    }

    fn core(&self) -> &TabularCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut TabularCore {
        &mut self.core
    }

    fn run_episode(&mut self, env: &mut BlackjackEnv, max_steps: usize) -> EpisodeResult {
        let mut state = env.reset();
        let mut steps = 0;

        while steps < max_steps {
            let action = self.core.choose_action(&state, true);
            let tx = env.step(&state, action);
            let key = StateKey::from_state(&state);
            let next = if tx.done {
                None
            } else {
                Some(StateKey::from_state(&tx.state))
            };
            self.update(key, action, f64::from(tx.reward), next);
            steps += 1;

            if tx.done {
                return EpisodeResult {
                    steps,
                    outcome: tx.outcome,
                };
            }
            state = tx.state;
        }

        EpisodeResult {
            steps,
            outcome: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::ActionValues;

    #[test]
    fn terminal_update_ignores_next_state() {
        let mut agent = QLearningAgent::new(&AgentConfig::default().with_learning_rate(0.1)).unwrap();
        let key = StateKey::new(19, false, 10);
        agent.update(key, Action::Stand, 1.0, None);
        assert!((agent.table().value(&key, Action::Stand) - 0.1).abs() < 1e-12);
    }

    #[test]
    fn bootstraps_from_best_next_value() {
        let config = AgentConfig::default().with_learning_rate(0.5).with_discount(0.9);
        let mut agent = QLearningAgent::new(&config).unwrap();
        let key = StateKey::new(12, false, 10);
        let next = StateKey::new(17, false, 10);
        *agent.core_mut().table_mut().row_mut(next) = ActionValues::new(0.4, -0.6);

        agent.update(key, Action::Draw, 0.0, Some(next));
        // 0 + 0.5 * (0 + 0.9 * 0.4 - 0)
        assert!((agent.table().value(&key, Action::Draw) - 0.18).abs() < 1e-12);
    }

    #[test]
    fn unseen_next_state_bootstraps_zero() {
        let mut agent = QLearningAgent::new(&AgentConfig::default().with_learning_rate(0.5)).unwrap();
        let key = StateKey::new(8, false, 5);
        agent.update(key, Action::Draw, 0.0, Some(StateKey::new(14, false, 5)));
        assert_eq!(agent.table().value(&key, Action::Draw), 0.0);
        assert_eq!(agent.table().len(), 1);
    }

    #[test]
    fn episodes_respect_step_cap() {
        let config = AgentConfig::default().with_seed(21);
        let mut agent = QLearningAgent::new(&config).unwrap();
        let mut env = BlackjackEnv::with_seed(8, 21);
        for _ in 0..500 {
            let result = agent.run_episode(&mut env, 1);
            assert_eq!(result.steps, 1);
        }
    }
}
