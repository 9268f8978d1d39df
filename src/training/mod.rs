//! Training infrastructure: the environment seam and episode runner, rolling
//! metrics, the sequential trainer and a synthetic demo environment.

pub mod demo;
pub mod episode;
pub mod metrics;
pub mod trainer;

pub use demo::DemoEnvironment;
pub use episode::{
    run_episode, Environment, EpisodeResult, Observation, Outcome, Transition, DRAW_REWARD,
    LOSS_REWARD, STEP_PENALTY, WIN_REWARD,
};
pub use metrics::TrainingMetrics;
pub use trainer::{Trainer, TrainerConfig, TrainingSummary};
