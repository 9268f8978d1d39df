use std::path::PathBuf;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::ai::{QLearningAgent, QTableStats};
use crate::error::AgentError;
use crate::training::episode::{run_episode, Environment};
use crate::training::metrics::TrainingMetrics;

/// Trainer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    pub num_episodes: usize,
    pub max_steps_per_episode: usize,
    /// Log progress every N episodes. 0 disables progress logging.
    pub log_interval: usize,
    /// Save the table every N episodes. 0 disables periodic saves.
    pub checkpoint_interval: usize,
    pub metrics_window: usize,
    pub table_path: Option<PathBuf>,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        TrainerConfig {
            num_episodes: 1_000,
            max_steps_per_episode: 225,
            log_interval: 100,
            checkpoint_interval: 500,
            metrics_window: 100,
            table_path: Some(PathBuf::from("data/q_table.mpk")),
        }
    }
}

/// What a finished training run looked like.
#[derive(Debug, Clone, Serialize)]
pub struct TrainingSummary {
    pub episodes: usize,
    pub win_rate: f64,
    pub draw_rate: f64,
    pub average_length: f64,
    pub average_reward: f64,
    pub table: QTableStats,
    pub saved_to: Option<PathBuf>,
}

/// Sequential self-play trainer for the tabular agent.
pub struct Trainer {
    config: TrainerConfig,
}

impl Trainer {
    pub fn new(config: TrainerConfig) -> Self {
        Trainer { config }
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    /// Run the full training loop.
    ///
    /// Failed periodic saves are logged and training continues; a failed
    /// final save is returned as an error.
    pub fn train<E, R>(
        &self,
        agent: &mut QLearningAgent<E::State, E::Action, R>,
        env: &mut E,
    ) -> Result<TrainingSummary, AgentError>
    where
        E: Environment,
        E::State: Serialize,
        E::Action: Serialize,
        R: Rng,
    {
        let mut metrics = TrainingMetrics::with_capacity(self.config.metrics_window);
        let window = self.config.metrics_window;

        log::info!(
            "starting Q-learning for {} episodes (α={}, γ={}, ε={})",
            self.config.num_episodes,
            agent.config().learning_rate,
            agent.config().discount_factor,
            agent.config().exploration_rate
        );

        for episode in 1..=self.config.num_episodes {
            let result = run_episode(agent, env, self.config.max_steps_per_episode);
            metrics.record_episode(result);

            if self.config.log_interval > 0 && episode % self.config.log_interval == 0 {
                log::info!(
                    "episode {}/{} | win: {:.1}% | loss: {:.1}% | draw: {:.1}% | avg_len: {:.1} | avg_reward: {:.3} | table: {}",
                    episode,
                    self.config.num_episodes,
                    metrics.win_rate(window) * 100.0,
                    metrics.loss_rate(window) * 100.0,
                    metrics.draw_rate(window) * 100.0,
                    metrics.average_length(window),
                    metrics.average_reward(window),
                    agent.size(),
                );
            }

            if self.config.checkpoint_interval > 0
                && episode % self.config.checkpoint_interval == 0
                && episode < self.config.num_episodes
            {
                if let Some(path) = &self.config.table_path {
                    match agent.save(path) {
                        Ok(()) => log::info!("checkpoint saved: {}", path.display()),
                        Err(e) => log::warn!("checkpoint failed: {e}"),
                    }
                }
            }
        }

        let saved_to = match &self.config.table_path {
            Some(path) => {
                agent.save(path)?;
                Some(path.clone())
            }
            None => None,
        };

        log::info!(
            "training complete: {} episodes, {} entries",
            metrics.total_episodes(),
            agent.size()
        );

        Ok(TrainingSummary {
            episodes: metrics.total_episodes(),
            win_rate: metrics.win_rate(window),
            draw_rate: metrics.draw_rate(window),
            average_length: metrics.average_length(window),
            average_reward: metrics.average_reward(window),
            table: agent.stats(),
            saved_to,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{BoardKey, Move, QLearningConfig};
    use crate::training::demo::DemoEnvironment;
    use crate::training::episode::tests::Corridor;

    fn config(num_episodes: usize, table_path: Option<PathBuf>) -> TrainerConfig {
        TrainerConfig {
            num_episodes,
            max_steps_per_episode: 50,
            log_interval: 10,
            checkpoint_interval: 0,
            metrics_window: 20,
            table_path,
        }
    }

    #[test]
    fn test_train_without_table_path() {
        let trainer = Trainer::new(config(30, None));
        let mut agent = QLearningAgent::with_seed(QLearningConfig::default(), 1);
        let mut env = DemoEnvironment::with_seed(1);

        let summary = trainer.train(&mut agent, &mut env).unwrap();
        assert_eq!(summary.episodes, 30);
        assert!(summary.saved_to.is_none());
        assert_eq!(summary.table.total_updates, agent.total_updates());
        assert!(summary.table.size > 0);
    }

    #[test]
    fn test_zero_log_interval_disables_progress_logging() {
        let trainer = Trainer::new(TrainerConfig {
            log_interval: 0,
            ..config(3, None)
        });
        let mut agent = QLearningAgent::with_seed(QLearningConfig::default(), 4);
        let mut env = DemoEnvironment::with_seed(4);

        let summary = trainer.train(&mut agent, &mut env).unwrap();
        assert_eq!(summary.episodes, 3);
    }

    #[test]
    fn test_train_saves_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tables").join("q_table.mpk");
        let trainer = Trainer::new(TrainerConfig {
            checkpoint_interval: 5,
            ..config(20, Some(path.clone()))
        });
        let mut agent = QLearningAgent::with_seed(QLearningConfig::default(), 2);
        let mut env = DemoEnvironment::with_seed(2);

        let summary = trainer.train(&mut agent, &mut env).unwrap();
        assert_eq!(summary.saved_to.as_deref(), Some(path.as_path()));

        let mut restored: QLearningAgent<BoardKey, Move> =
            QLearningAgent::with_seed(QLearningConfig::default(), 0);
        restored.load(&path).unwrap();
        assert_eq!(restored.stats(), agent.stats());
    }

    #[test]
    fn test_corridor_win_rate_improves() {
        let trainer = Trainer::new(TrainerConfig {
            metrics_window: 50,
            ..config(400, None)
        });
        let config = QLearningConfig {
            learning_rate: 0.5,
            discount_factor: 0.9,
            exploration_rate: 0.05,
        };
        let mut agent = QLearningAgent::with_seed(config, 4);
        let mut env = Corridor::new(3);

        let summary = trainer.train(&mut agent, &mut env).unwrap();
        assert!(summary.win_rate > 0.8, "win rate: {}", summary.win_rate);
    }

    #[test]
    fn test_final_save_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"file").unwrap();
        let trainer = Trainer::new(config(3, Some(blocker.join("q_table.mpk"))));
        let mut agent = QLearningAgent::with_seed(QLearningConfig::default(), 3);
        let mut env = DemoEnvironment::with_seed(3);

        let err = trainer.train(&mut agent, &mut env).unwrap_err();
        assert!(matches!(err, AgentError::Io { .. }), "got: {err}");
    }
}
