use std::collections::HashMap;
use std::hash::Hash;
use std::path::Path;

use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::checkpoint::{QEntry, QTableSnapshot};
use crate::error::AgentError;

/// Q-learning hyperparameters, fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QLearningConfig {
    /// Step size α, in (0, 1].
    pub learning_rate: f64,
    /// Discount γ, in [0, 1].
    pub discount_factor: f64,
    /// Probability ε of a uniformly random move, in [0, 1].
    pub exploration_rate: f64,
}

impl Default for QLearningConfig {
    fn default() -> Self {
        QLearningConfig {
            learning_rate: 0.1,
            discount_factor: 0.95,
            exploration_rate: 0.1,
        }
    }
}

/// Summary of the value table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QTableStats {
    pub size: usize,
    pub total_updates: u64,
    pub avg_value: f64,
    pub max_value: f64,
    pub min_value: f64,
}

/// Tabular Q-learning agent with an epsilon-greedy policy.
///
/// Values live in a sparse table keyed by state, then action. Reads never
/// create entries: an untouched pair is worth 0.0 and only [`update`] adds
/// it to the table.
///
/// [`update`]: QLearningAgent::update
pub struct QLearningAgent<S, A, R = StdRng> {
    config: QLearningConfig,
    table: HashMap<S, HashMap<A, f64>>,
    entries: usize,
    total_updates: u64,
    rng: R,
}

impl<S, A> QLearningAgent<S, A, StdRng>
where
    S: Eq + Hash + Clone,
    A: Eq + Hash + Clone,
{
    /// Create an agent seeded from the operating system.
    pub fn new(config: QLearningConfig) -> Self {
        Self::with_rng(config, StdRng::from_os_rng())
    }

    /// Create an agent with a reproducible random stream.
    pub fn with_seed(config: QLearningConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }
}

impl<S, A, R> QLearningAgent<S, A, R>
where
    S: Eq + Hash + Clone,
    A: Eq + Hash + Clone,
    R: Rng,
{
    pub fn with_rng(config: QLearningConfig, rng: R) -> Self {
        debug_assert!(config.learning_rate > 0.0 && config.learning_rate <= 1.0);
        debug_assert!((0.0..=1.0).contains(&config.discount_factor));
        debug_assert!((0.0..=1.0).contains(&config.exploration_rate));
        QLearningAgent {
            config,
            table: HashMap::new(),
            entries: 0,
            total_updates: 0,
            rng,
        }
    }

    pub fn config(&self) -> &QLearningConfig {
        &self.config
    }

    /// Set ε directly (e.g. 0.0 for pure greedy play).
    pub fn set_exploration_rate(&mut self, epsilon: f64) {
        debug_assert!((0.0..=1.0).contains(&epsilon));
        self.config.exploration_rate = epsilon;
    }

    /// Current estimate for `(state, action)`; 0.0 when never updated.
    pub fn value(&self, state: &S, action: &A) -> f64 {
        self.table
            .get(state)
            .and_then(|row| row.get(action))
            .copied()
            .unwrap_or(0.0)
    }

    /// Highest estimate over `actions` in `state`, or `None` when `actions` is empty.
    pub fn max_value(&self, state: &S, actions: &[A]) -> Option<f64> {
        actions
            .iter()
            .map(|a| self.value(state, a))
            .fold(None, |best: Option<f64>, q| Some(best.map_or(q, |b| b.max(q))))
    }

    /// Apply one Q-learning step and return the new estimate.
    ///
    /// `Q(s,a) += α · (r + γ · max_a' Q(s',a') − Q(s,a))`, where the max term is
    /// 0 when `next_valid_actions` is empty (terminal transition).
    pub fn update(
        &mut self,
        state: &S,
        action: &A,
        reward: f64,
        next_state: &S,
        next_valid_actions: &[A],
    ) -> f64 {
        let current = self.value(state, action);
        let max_next = self.max_value(next_state, next_valid_actions).unwrap_or(0.0);
        let target = reward + self.config.discount_factor * max_next;
        let new_value = current + self.config.learning_rate * (target - current);

        if let Some(value) = self
            .table
            .get_mut(state)
            .and_then(|row| row.get_mut(action))
        {
            *value = new_value;
        } else {
            self.table
                .entry(state.clone())
                .or_default()
                .insert(action.clone(), new_value);
            self.entries += 1;
        }

        self.total_updates += 1;
        new_value
    }

    /// Epsilon-greedy action selection.
    ///
    /// With probability ε a uniformly random action is returned. Otherwise one
    /// of the actions sharing the highest value is picked uniformly, so ties
    /// carry no bias toward list order. Returns `None` for an empty slice.
    pub fn choose_action(&mut self, state: &S, valid_actions: &[A]) -> Option<A> {
        if valid_actions.is_empty() {
            return None;
        }

        if self.rng.random::<f64>() < self.config.exploration_rate {
            let idx = self.rng.random_range(0..valid_actions.len());
            return Some(valid_actions[idx].clone());
        }

        let best = self.greedy_actions(state, valid_actions);
        let idx = self.rng.random_range(0..best.len());
        Some(best[idx].clone())
    }

    /// All actions in `valid_actions` whose value equals the maximum.
    pub fn greedy_actions<'a>(&self, state: &S, valid_actions: &'a [A]) -> Vec<&'a A> {
        let Some(max_q) = self.max_value(state, valid_actions) else {
            return Vec::new();
        };
        valid_actions
            .iter()
            .filter(|a| self.value(state, a) == max_q)
            .collect()
    }

    /// Number of materialized `(state, action)` entries.
    pub fn size(&self) -> usize {
        self.entries
    }

    /// Number of distinct states with at least one entry.
    pub fn state_count(&self) -> usize {
        self.table.len()
    }

    pub fn total_updates(&self) -> u64 {
        self.total_updates
    }

    pub fn stats(&self) -> QTableStats {
        // Sorted so the mean does not depend on hash iteration order.
        let mut values: Vec<f64> = self
            .table
            .values()
            .flat_map(|row| row.values().copied())
            .collect();
        values.sort_by(f64::total_cmp);

        let (Some(&min_value), Some(&max_value)) = (values.first(), values.last()) else {
            return QTableStats {
                size: 0,
                total_updates: self.total_updates,
                avg_value: 0.0,
                max_value: 0.0,
                min_value: 0.0,
            };
        };

        QTableStats {
            size: self.entries,
            total_updates: self.total_updates,
            avg_value: values.iter().sum::<f64>() / values.len() as f64,
            max_value,
            min_value,
        }
    }

    /// Copy the table into its persisted form.
    pub fn snapshot(&self) -> QTableSnapshot<S, A> {
        let entries = self
            .table
            .iter()
            .flat_map(|(state, row)| {
                row.iter().map(move |(action, &value)| QEntry {
                    state: state.clone(),
                    action: action.clone(),
                    value,
                })
            })
            .collect();
        QTableSnapshot::new(self.config, self.total_updates, entries)
    }

    /// Replace the table and update counter with the snapshot's contents.
    pub fn restore(&mut self, snapshot: QTableSnapshot<S, A>) {
        let mut table: HashMap<S, HashMap<A, f64>> = HashMap::new();
        let mut entries = 0;
        for entry in snapshot.entries {
            if table
                .entry(entry.state)
                .or_default()
                .insert(entry.action, entry.value)
                .is_none()
            {
                entries += 1;
            }
        }
        self.table = table;
        self.entries = entries;
        self.total_updates = snapshot.total_updates;
    }
}

impl<S, A, R> QLearningAgent<S, A, R>
where
    S: Eq + Hash + Clone + Serialize,
    A: Eq + Hash + Clone + Serialize,
    R: Rng,
{
    /// Persist the whole table to `path`.
    pub fn save(&self, path: &Path) -> Result<(), AgentError> {
        self.snapshot().write(path)?;
        info!(
            "saved value table to {} ({} state-action pairs)",
            path.display(),
            self.entries
        );
        Ok(())
    }
}

impl<S, A, R> QLearningAgent<S, A, R>
where
    S: Eq + Hash + Clone + DeserializeOwned,
    A: Eq + Hash + Clone + DeserializeOwned,
    R: Rng,
{
    /// Replace the table with the one stored at `path` and return its size.
    ///
    /// On any error, including [`AgentError::NotFound`], the current table is
    /// left unchanged.
    pub fn load(&mut self, path: &Path) -> Result<usize, AgentError> {
        let snapshot = QTableSnapshot::read(path)?;
        self.restore(snapshot);
        info!(
            "loaded {} state-action pairs from {}",
            self.entries,
            path.display()
        );
        Ok(self.entries)
    }
}
