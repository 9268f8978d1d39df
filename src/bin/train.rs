use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;

use boardgame_ml::ai::{BoardKey, Move, QLearningAgent};
use boardgame_ml::config::AppConfig;
use boardgame_ml::error::AgentError;
use boardgame_ml::training::{DemoEnvironment, Trainer};

/// Train a tabular Q-learning agent by self-play.
#[derive(Parser)]
#[command(name = "train", about = "Train a tabular Q-learning agent")]
struct Cli {
    /// Path to TOML configuration file
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// Override number of training episodes
    #[arg(long)]
    episodes: Option<usize>,

    /// Override learning rate
    #[arg(long)]
    lr: Option<f64>,

    /// Override exploration rate
    #[arg(long)]
    epsilon: Option<f64>,

    /// Seed the agent and environment for a reproducible run
    #[arg(long)]
    seed: Option<u64>,

    /// Continue from the saved value table
    #[arg(long)]
    resume: bool,

    /// Where the value table is read from and saved to
    #[arg(long)]
    table: Option<PathBuf>,

    /// Print statistics of the saved value table and exit
    #[arg(long)]
    stats_only: bool,

    /// Print a config file with every default value and exit
    #[arg(long)]
    print_default_config: bool,
}

type GomokuAgent = QLearningAgent<BoardKey, Move>;

fn main() -> Result<()> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    if cli.print_default_config {
        print!("{}", AppConfig::default_toml());
        return Ok(());
    }

    let mut app_config = AppConfig::load_or_default(&cli.config)
        .with_context(|| format!("loading config from {}", cli.config.display()))?;

    if let Some(episodes) = cli.episodes {
        app_config.training.num_episodes = episodes;
    }
    if let Some(lr) = cli.lr {
        app_config.qlearning.learning_rate = lr;
    }
    if let Some(epsilon) = cli.epsilon {
        app_config.qlearning.exploration_rate = epsilon;
    }
    if let Some(table) = cli.table {
        app_config.training.table_path = Some(table);
    }
    app_config
        .validate()
        .context("invalid configuration after command-line overrides")?;

    let mut agent: GomokuAgent = match cli.seed {
        Some(seed) => QLearningAgent::with_seed(app_config.qlearning, seed),
        None => QLearningAgent::new(app_config.qlearning),
    };

    if cli.stats_only {
        let Some(path) = &app_config.training.table_path else {
            bail!("--stats-only needs a table path (--table or training.table_path)");
        };
        agent
            .load(path)
            .with_context(|| format!("loading value table {}", path.display()))?;
        println!("{}", serde_json::to_string_pretty(&agent.stats())?);
        return Ok(());
    }

    if cli.resume {
        match &app_config.training.table_path {
            Some(path) => match agent.load(path) {
                Ok(n) => println!("Resumed from {} ({} entries)", path.display(), n),
                Err(AgentError::NotFound(_)) => {
                    println!("No value table at {}, starting fresh", path.display())
                }
                Err(e) => return Err(e).context("resuming from saved value table"),
            },
            None => bail!("--resume needs a table path (--table or training.table_path)"),
        }
    }

    let mut env = match cli.seed {
        Some(seed) => DemoEnvironment::with_seed(seed.wrapping_add(1)),
        None => DemoEnvironment::new(),
    };

    println!(
        "Training for {} episodes (lr {}, gamma {}, epsilon {})",
        app_config.training.num_episodes,
        app_config.qlearning.learning_rate,
        app_config.qlearning.discount_factor,
        app_config.qlearning.exploration_rate
    );
    println!("-------------------------------------------");

    let trainer = Trainer::new(app_config.training.clone());
    let summary = trainer
        .train(&mut agent, &mut env)
        .context("training failed")?;

    println!("-------------------------------------------");
    println!(
        "Training complete. Episodes: {} | win: {:.1}% | draw: {:.1}% | avg_len: {:.1}",
        summary.episodes,
        summary.win_rate * 100.0,
        summary.draw_rate * 100.0,
        summary.average_length
    );
    if let Some(path) = &summary.saved_to {
        println!("Value table saved to {}", path.display());
    }
    println!("{}", serde_json::to_string_pretty(&summary.table)?);

    Ok(())
}
