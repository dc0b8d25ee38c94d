//! Automatic player: lets a trained agent play hands and records its reasoning.

use tracing::debug;

use crate::agent::Agent;
use crate::engine::{Action, BlackjackEnv, EpisodeState, Outcome};

/// One decision taken during a hand.
#[derive(Debug, Clone)]
pub struct Decision {
    pub state: EpisodeState,
    pub action: Action,
    pub reasoning: String,
}

/// Everything that happened in one auto-played hand.
#[derive(Debug, Clone)]
pub struct HandReport {
    pub decisions: Vec<Decision>,
    pub final_state: EpisodeState,
    pub reward: i8,
    pub outcome: Outcome,
}

impl HandReport {
    pub fn player_total(&self) -> u8 {
        self.final_state.player_hand.total()
    }

    pub fn dealer_total(&self) -> u8 {
        self.final_state.dealer_hand.total()
    }

    /// Closing summary in the style of the table console.
    pub fn summary(&self) -> String {
        let verdict = match self.reward {
            r if r > 0 => "VICTORY!",
            r if r < 0 => "DEFEAT",
            _ => "PUSH",
        };
        let mut lines = vec!["RESULT:".to_string()];
        if self.outcome == Outcome::PlayerBust {
            lines.push(format!("BUST! Value: {}", self.player_total()));
        }
        lines.push(format!(
            "Dealer: {} {}",
            self.dealer_total(),
            self.final_state.dealer_hand
        ));
        lines.push(format!(
            "Player: {} {}",
            self.player_total(),
            self.final_state.player_hand
        ));
        lines.push(verdict.to_string());
        lines.join("\n")
    }
}

/// Play one hand with exploration off, stopping after `max_steps` draws.
pub fn play_hand(env: &mut BlackjackEnv, agent: &mut dyn Agent, max_steps: usize) -> HandReport {
    let mut state = env.reset();
    let mut decisions = Vec::new();

    loop {
        let reasoning = agent.get_reasoning(&state);
        let action = if decisions.len() >= max_steps {
            Action::Stand
        } else {
            agent.choose_action(&state, false)
        };
        debug!(
            player = %state.player_hand,
            dealer_showing = state.dealer_showing,
            %action,
            "auto-play decision"
        );

        let tx = env.step(&state, action);
        decisions.push(Decision {
            state,
            action,
            reasoning,
        });

        if let Some(outcome) = tx.outcome {
            return HandReport {
                decisions,
                final_state: tx.state,
                reward: tx.reward,
                outcome,
            };
        }
        state = tx.state;
    }
}
