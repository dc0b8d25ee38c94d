//! Soft17: a Blackjack environment where the dealer hits soft 17, and two
//! tabular temporal-difference agents (Q-learning and SARSA) that learn when
//! to stand and when to draw.

pub mod agent;
pub mod config;
pub mod deck;
pub mod engine;
pub mod error;
pub mod evaluate;
pub mod play;
pub mod q_learning;
pub mod sarsa;
pub mod strategy;
pub mod table;

pub use agent::{build_agent, Agent, Algorithm, TrainingSummary};
pub use config::{AgentConfig, EnvConfig, TrainingConfig};
pub use engine::{Action, BlackjackEnv, EpisodeState, Outcome, Transition};
pub use error::{Error, Result};
pub use q_learning::QLearningAgent;
pub use sarsa::SarsaAgent;
pub use table::{ActionValues, StateKey, ValueTable};
