//! On-policy temporal-difference control (SARSA).
//!
//! Q(s,a) ← Q(s,a) + α[r + γ Q(s',a') − Q(s,a)]
//!
//! a' is drawn from the same ε-greedy policy that will be followed, so the
//! estimates include the cost of exploration.

use crate::agent::{Agent, Algorithm, EpisodeResult, TabularCore};
use crate::config::AgentConfig;
use crate::engine::{Action, BlackjackEnv};
use crate::error::Result;
use crate::table::StateKey;

#[derive(Debug, Clone)]
pub struct SarsaAgent {
    core: TabularCore,
}

impl SarsaAgent {
    pub fn new(config: &AgentConfig) -> Result<Self> {
        Ok(SarsaAgent {
            core: TabularCore::new(config)?,
        })
    }

    /// Apply one update. `next` holds the next state and the action already
    /// chosen for it, or `None` when the step ended the episode.
    pub fn update(
        &mut self,
        key: StateKey,
        action: Action,
        reward: f64,
        next: Option<(StateKey, Action)>,
    ) {
        let target = match next {
            None => reward,
            Some((next_key, next_action)) => {
                reward + self.core.discount() * self.core.table().value(&next_key, next_action)
            }
        };
        self.core.apply(key, action, target);
    }
}

impl Agent for SarsaAgent {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Sarsa
    }

    fn core(&self) -> &TabularCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut TabularCore {
        &mut self.core
    }

    fn run_episode(&mut self, env: &mut BlackjackEnv, max_steps: usize) -> EpisodeResult {
        let mut state = env.reset();
        let mut action = self.core.choose_action(&state, true);
        let mut steps = 0;

        while steps < max_steps {
            let tx = env.step(&state, action);
            let key = StateKey::from_state(&state);
            let reward = f64::from(tx.reward);
            steps += 1;

            if tx.done {
                self.update(key, action, reward, None);
                return EpisodeResult {
                    steps,
                    outcome: tx.outcome,
                };
            }

            let next_action = self.core.choose_action(&tx.state, true);
            self.update(
                key,
                action,
                reward,
                Some((StateKey::from_state(&tx.state), next_action)),
            );
            state = tx.state;
            action = next_action;
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
    use crate::deck::{Shoe, DEFAULT_DECKS};
    use crate::q_learning::QLearningAgent;
    use crate::table::ActionValues;
    use fastrand::Rng;

    // player 10,2 vs dealer 9,7; a draw makes hard 15
    fn hard_12_vs_9() -> BlackjackEnv {
        BlackjackEnv::with_shoe(Shoe::stacked(DEFAULT_DECKS, Rng::with_seed(1), &[10, 2, 9, 7, 3]))
    }

    #[test]
    fn bootstraps_from_chosen_next_action() {
        let config = AgentConfig::default().with_learning_rate(0.5).with_discount(0.9);
        let mut agent = SarsaAgent::new(&config).unwrap();
        let key = StateKey::new(12, false, 10);
        let next = StateKey::new(17, false, 10);
        *agent.core_mut().table_mut().row_mut(next) = ActionValues::new(0.4, -0.6);

        agent.update(key, Action::Draw, 0.0, Some((next, Action::Draw)));
        // 0 + 0.5 * (0 + 0.9 * -0.6 - 0)
        assert!((agent.table().value(&key, Action::Draw) + 0.27).abs() < 1e-12);
    }

    #[test]
    fn diverges_from_q_learning_on_non_greedy_next_action() {
        let config = AgentConfig::default()
            .with_learning_rate(0.1)
            .with_epsilon(1.0)
            .with_seed(5);
        let mut sarsa = SarsaAgent::new(&config).unwrap();
        let mut q = QLearningAgent::new(&config).unwrap();

        let key = StateKey::new(13, false, 7);
        let next = StateKey::new(16, false, 7);
        let seeded = ActionValues::new(-0.2, -0.7);
        *sarsa.core_mut().table_mut().row_mut(next) = seeded;
        *q.core_mut().table_mut().row_mut(next) = seeded;

        // Greedy next action: both rules agree.
        sarsa.update(key, Action::Draw, 0.0, Some((next, Action::Stand)));
        q.update(key, Action::Draw, 0.0, Some(next));
        assert_eq!(
            sarsa.table().value(&key, Action::Draw),
            q.table().value(&key, Action::Draw)
        );

        // Exploratory next action: SARSA bootstraps from the worse estimate.
        sarsa.update(key, Action::Draw, 0.0, Some((next, Action::Draw)));
        q.update(key, Action::Draw, 0.0, Some(next));
        assert!(sarsa.table().value(&key, Action::Draw) < q.table().value(&key, Action::Draw));
    }

    #[test]
    fn episode_bootstraps_from_sampled_next_action() {
        let start = StateKey::new(12, false, 9);
        let next = StateKey::new(15, false, 9);
        let seeded = ActionValues::new(0.8, -0.8);
        let mut sampled = Vec::new();

        for seed in 0..64 {
            let config = AgentConfig::default()
                .with_learning_rate(0.5)
                .with_discount(0.9)
                .with_epsilon(1.0)
                .with_epsilon_min(1.0)
                .with_seed(seed);
            let mut sarsa = SarsaAgent::new(&config).unwrap();
            let mut q = QLearningAgent::new(&config).unwrap();
            *sarsa.core_mut().table_mut().row_mut(next) = seeded;
            *q.core_mut().table_mut().row_mut(next) = seeded;

            sarsa.run_episode(&mut hard_12_vs_9(), 50);
            q.run_episode(&mut hard_12_vs_9(), 50);

            // Same seed, same cards: both agents open with the same action.
            if sarsa.table().value(&start, Action::Draw) == 0.0 {
                assert_eq!(q.table().value(&start, Action::Draw), 0.0);
                continue;
            }

            // The action played from hard 15 is the only one whose estimate moved.
            let played: Vec<Action> = Action::ALL
                .into_iter()
                .filter(|&a| sarsa.table().value(&next, a) != seeded.get(a))
                .collect();
            assert_eq!(played.len(), 1, "seed {}", seed);
            let next_action = played[0];

            let sarsa_value = sarsa.table().value(&start, Action::Draw);
            assert!((sarsa_value - 0.5 * 0.9 * seeded.get(next_action)).abs() < 1e-12);
            let q_value = q.table().value(&start, Action::Draw);
            assert!((q_value - 0.5 * 0.9 * 0.8).abs() < 1e-12);
            if next_action == Action::Draw {
                assert!(sarsa_value < q_value);
            }
            sampled.push(next_action);
        }

        // Exploration stays on for the next action, so both show up.
        assert!(sampled.contains(&Action::Stand));
        assert!(sampled.contains(&Action::Draw));
    }

    #[test]
    fn terminal_update_matches_q_learning() {
        let config = AgentConfig::default();
        let mut sarsa = SarsaAgent::new(&config).unwrap();
        let mut q = QLearningAgent::new(&config).unwrap();
        let key = StateKey::new(20, false, 6);
        sarsa.update(key, Action::Stand, 1.0, None);
        q.update(key, Action::Stand, 1.0, None);
        assert_eq!(sarsa.table().values(&key), q.table().values(&key));
    }
}
