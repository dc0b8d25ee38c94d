//! Soft17 trainer
//! Trains Q-learning and SARSA agents against an H17 dealer and plays them back.

use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use soft17::evaluate::{evaluate, EvalConfig, RewardStats};
use soft17::play::play_hand;
use soft17::strategy::{close_decisions, disagreements, format_close_decisions, format_tables};
use soft17::{build_agent, Action, Agent, AgentConfig, Algorithm, BlackjackEnv, EnvConfig, TrainingConfig};

#[derive(Parser, Debug)]
#[command(name = "soft17", version, about = "Tabular TD agents for H17 Blackjack")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Train one agent and print its strategy tables
    Train {
        #[arg(long, default_value = "q-learning")]
        algorithm: Algorithm,
        #[command(flatten)]
        opts: RunOpts,
        /// Greedy hands to evaluate after training (0 to skip)
        #[arg(long, default_value_t = 100_000)]
        eval_hands: usize,
    },
    /// Train one agent, then let it play hands and explain each decision
    Play {
        #[arg(long, default_value = "q-learning")]
        algorithm: Algorithm,
        #[command(flatten)]
        opts: RunOpts,
        /// Hands to auto-play
        #[arg(long, default_value_t = 5)]
        hands: usize,
    },
    /// Train both agents concurrently and compare their policies
    Compare {
        #[command(flatten)]
        opts: RunOpts,
        #[arg(long, default_value_t = 100_000)]
        eval_hands: usize,
    },
}

#[derive(Args, Debug, Clone)]
struct RunOpts {
    #[arg(long, default_value_t = 500_000)]
    episodes: usize,
    #[arg(long, default_value_t = 8)]
    decks: usize,
    /// Per-episode step cap
    #[arg(long, default_value_t = 50)]
    max_steps: usize,
    #[arg(long, default_value_t = 0.01)]
    learning_rate: f64,
    #[arg(long, default_value_t = 0.95)]
    discount: f64,
    #[arg(long, default_value_t = 1.0)]
    epsilon: f64,
    #[arg(long, default_value_t = 0.9999)]
    epsilon_decay: f64,
    #[arg(long, default_value_t = 0.01)]
    epsilon_min: f64,
    #[arg(long)]
    seed: Option<u64>,
}

impl RunOpts {
    fn agent_config(&self) -> AgentConfig {
        let config = AgentConfig::default()
            .with_learning_rate(self.learning_rate)
            .with_discount(self.discount)
            .with_epsilon(self.epsilon)
            .with_epsilon_decay(self.epsilon_decay)
            .with_epsilon_min(self.epsilon_min);
        match self.seed {
            Some(seed) => config.with_seed(seed),
            None => config,
        }
    }

    fn env_config(&self) -> EnvConfig {
        let config = EnvConfig::new(self.decks);
        match self.seed {
            Some(seed) => config.with_seed(seed.wrapping_add(1)),
            None => config,
        }
    }

    fn training_config(&self) -> TrainingConfig {
        TrainingConfig::new(self.episodes).with_max_steps(self.max_steps)
    }

    fn eval_config(&self, hands: usize) -> EvalConfig {
        let config = EvalConfig::new(hands).with_decks(self.decks);
        let config = EvalConfig {
            max_steps: self.max_steps,
            ..config
        };
        match self.seed {
            Some(seed) => config.with_seed(seed.wrapping_add(2)),
            None => config,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Train { algorithm, opts, eval_hands } => run_train(algorithm, &opts, eval_hands),
        Command::Play { algorithm, opts, hands } => run_play(algorithm, &opts, hands),
        Command::Compare { opts, eval_hands } => run_compare(&opts, eval_hands),
    }
}

fn train_agent(algorithm: Algorithm, opts: &RunOpts) -> Result<Box<dyn Agent + Send>> {
    let mut agent = build_agent(algorithm, &opts.agent_config())
        .with_context(|| format!("failed to build {} agent", algorithm))?;
    let mut env =
        BlackjackEnv::from_config(&opts.env_config()).context("invalid environment settings")?;

    let start = Instant::now();
    info!(%algorithm, episodes = opts.episodes, decks = opts.decks, "training started");
    let summary = agent
        .train(&mut env, &opts.training_config(), None)
        .with_context(|| format!("failed to train {} agent", algorithm))?;
    info!(
        %algorithm,
        elapsed_secs = start.elapsed().as_secs_f64(),
        states = summary.states,
        truncated = summary.truncated,
        final_epsilon = summary.final_epsilon,
        "agent ready"
    );
    Ok(agent)
}

fn print_eval(label: &str, stats: &RewardStats) {
    println!(
        "{:<12} hands {:>8}  EV {:>+8.4} ± {:.4}  win {:>5.1}%  push {:>5.1}%  loss {:>5.1}%",
        label,
        stats.n,
        stats.ev(),
        stats.sem(),
        100.0 * stats.win_rate(),
        100.0 * stats.push_rate(),
        100.0 * stats.loss_rate()
    );
}

fn run_train(algorithm: Algorithm, opts: &RunOpts, eval_hands: usize) -> Result<()> {
    let agent = train_agent(algorithm, opts)?;

    println!("============================================================");
    println!("LEARNED STRATEGY ({})", algorithm);
    println!("============================================================");
    println!();
    println!("{}", format_tables(agent.table()));

    println!("CLOSE DECISIONS (gap < 0.02)");
    println!("{}", format_close_decisions(&close_decisions(agent.table(), 0.02), 30));

    if eval_hands > 0 {
        let stats = evaluate(agent.table(), &opts.eval_config(eval_hands));
        print_eval(algorithm.name(), &stats);
    }
    Ok(())
}

fn run_play(algorithm: Algorithm, opts: &RunOpts, hands: usize) -> Result<()> {
    let mut agent = train_agent(algorithm, opts)?;
    let env_config = EnvConfig {
        seed: opts.seed.map(|seed| seed.wrapping_add(3)),
        ..opts.env_config()
    };
    let mut env = BlackjackEnv::from_config(&env_config).context("invalid environment settings")?;
    println!("Rules: dealer stands on hard 17, hits soft 17");

    for hand in 1..=hands {
        println!();
        println!("{}", "=".repeat(50));
        println!("HAND {}", hand);
        println!("{}", "=".repeat(50));

        let report = play_hand(&mut env, agent.as_mut(), opts.max_steps);
        for decision in &report.decisions {
            println!("\n{}", decision.reasoning);
            println!("\n>>> PLAYER: {} <<<", decision.action);
        }
        println!("\n{}", report.summary());
    }
    Ok(())
}

fn run_compare(opts: &RunOpts, eval_hands: usize) -> Result<()> {
    let (q_learning, sarsa) = rayon::join(
        || train_agent(Algorithm::QLearning, opts),
        || train_agent(Algorithm::Sarsa, opts),
    );
    let (q_learning, sarsa) = (q_learning?, sarsa?);

    for agent in [&q_learning, &sarsa] {
        println!("============================================================");
        println!("LEARNED STRATEGY ({})", agent.algorithm());
        println!("============================================================");
        println!();
        println!("{}", format_tables(agent.table()));
    }

    let differing = disagreements(q_learning.table(), sarsa.table());
    println!("States where the greedy actions differ: {}", differing.len());
    for key in &differing {
        let q = q_learning.table().values(key);
        let s = sarsa.table().values(key);
        println!(
            "  {:<20} q-learning S {:>+8.4} H {:>+8.4} | sarsa S {:>+8.4} H {:>+8.4}",
            key.to_string(),
            q.get(Action::Stand),
            q.get(Action::Draw),
            s.get(Action::Stand),
            s.get(Action::Draw)
        );
    }

    if eval_hands > 0 {
        println!();
        let config = opts.eval_config(eval_hands);
        print_eval(Algorithm::QLearning.name(), &evaluate(q_learning.table(), &config));
        print_eval(Algorithm::Sarsa.name(), &evaluate(sarsa.table(), &config));
    }
    Ok(())
}
