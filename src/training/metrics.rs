use std::collections::VecDeque;

use crate::training::episode::{EpisodeResult, Outcome};

/// Training metrics tracker with rolling window computations.
pub struct TrainingMetrics {
    episode_results: VecDeque<EpisodeResult>,
    capacity: usize,
    total_episodes: usize, // lifetime count, never capped
}

impl TrainingMetrics {
    pub fn with_capacity(capacity: usize) -> Self {
        TrainingMetrics {
            episode_results: VecDeque::with_capacity(capacity),
            capacity,
            total_episodes: 0,
        }
    }

    pub fn new() -> Self {
        Self::with_capacity(100)
    }

    pub fn record_episode(&mut self, result: EpisodeResult) {
        self.total_episodes += 1;
        self.episode_results.push_back(result);
        if self.episode_results.len() > self.capacity {
            self.episode_results.pop_front();
        }
    }

    fn recent(&self, last_n: usize) -> impl Iterator<Item = &EpisodeResult> {
        self.episode_results.iter().rev().take(last_n)
    }

    fn window(&self, last_n: usize) -> usize {
        self.episode_results.len().min(last_n)
    }

    fn outcome_rate(&self, last_n: usize, outcome: Option<Outcome>) -> f64 {
        let n = self.window(last_n);
        if n == 0 {
            return 0.0;
        }
        let hits = self.recent(n).filter(|r| r.outcome == outcome).count();
        hits as f64 / n as f64
    }

    /// Win rate in the last N episodes.
    pub fn win_rate(&self, last_n: usize) -> f64 {
        self.outcome_rate(last_n, Some(Outcome::Win))
    }

    pub fn loss_rate(&self, last_n: usize) -> f64 {
        self.outcome_rate(last_n, Some(Outcome::Loss))
    }

    /// Draw rate in the last N episodes.
    pub fn draw_rate(&self, last_n: usize) -> f64 {
        self.outcome_rate(last_n, Some(Outcome::Draw))
    }

    /// Share of the last N episodes cut off by the step limit.
    pub fn truncated_rate(&self, last_n: usize) -> f64 {
        self.outcome_rate(last_n, None)
    }

    /// Average episode length over the last N episodes.
    pub fn average_length(&self, last_n: usize) -> f64 {
        let n = self.window(last_n);
        if n == 0 {
            return 0.0;
        }
        let total: usize = self.recent(n).map(|r| r.steps).sum();
        total as f64 / n as f64
    }

    /// Average undiscounted episode reward over the last N episodes.
    pub fn average_reward(&self, last_n: usize) -> f64 {
        let n = self.window(last_n);
        if n == 0 {
            return 0.0;
        }
        let total: f64 = self.recent(n).map(|r| r.total_reward).sum();
        total / n as f64
    }

    pub fn total_episodes(&self) -> usize {
        self.total_episodes
    }
}

impl Default for TrainingMetrics {
    fn default() -> Self {
        Self::new()
    }
}
