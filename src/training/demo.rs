use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::ai::state_encoding::{BoardKey, Move, GOMOKU_SIZE};
use crate::training::episode::{Environment, Observation, Outcome, Transition, STEP_PENALTY};

const WIN_PROBABILITY: f64 = 0.3;
const LOSS_PROBABILITY: f64 = 0.3;

/// A stand-in for a real game: an empty Gomoku board that never changes,
/// offering the four central moves. Each step wins or loses with fixed
/// probability and otherwise costs the step penalty.
pub struct DemoEnvironment<R = StdRng> {
    board: BoardKey,
    actions: Vec<Move>,
    rng: R,
}

impl DemoEnvironment<StdRng> {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_os_rng())
    }

    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }
}

impl Default for DemoEnvironment<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> DemoEnvironment<R> {
    pub fn with_rng(rng: R) -> Self {
        let mid = (GOMOKU_SIZE / 2) as u8;
        DemoEnvironment {
            board: BoardKey::empty(GOMOKU_SIZE * GOMOKU_SIZE),
            actions: vec![
                Move::new(mid, mid),
                Move::new(mid, mid + 1),
                Move::new(mid + 1, mid),
                Move::new(mid + 1, mid + 1),
            ],
            rng,
        }
    }

    fn observation(&self) -> Observation<BoardKey, Move> {
        Observation {
            state: self.board.clone(),
            valid_actions: self.actions.clone(),
        }
    }
}

impl<R: Rng> Environment for DemoEnvironment<R> {
    type State = BoardKey;
    type Action = Move;

    fn reset(&mut self) -> Observation<BoardKey, Move> {
        self.observation()
    }

    fn step(&mut self, _action: &Move) -> Transition<BoardKey, Move> {
        let roll: f64 = self.rng.random();
        let outcome = if roll < WIN_PROBABILITY {
            Some(Outcome::Win)
        } else if roll < WIN_PROBABILITY + LOSS_PROBABILITY {
            Some(Outcome::Loss)
        } else {
            None
        };
        Transition {
            reward: outcome.map_or(STEP_PENALTY, Outcome::reward),
            next: self.observation(),
            outcome,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{QLearningAgent, QLearningConfig};
    use crate::training::episode::run_episode;

    #[test]
    fn test_center_moves_on_empty_board() {
        let mut env = DemoEnvironment::with_seed(0);
        let obs = env.reset();
        assert_eq!(obs.state.len(), 225);
        assert!(obs.state.as_str().chars().all(|c| c == '.'));
        assert_eq!(
            obs.valid_actions,
            vec![
                Move::new(7, 7),
                Move::new(7, 8),
                Move::new(8, 7),
                Move::new(8, 8)
            ]
        );
    }

    #[test]
    fn test_outcome_frequencies() {
        let mut env = DemoEnvironment::with_seed(42);
        let action = Move::new(7, 7);
        let (mut wins, mut losses, mut steps) = (0, 0, 0);
        for _ in 0..10_000 {
            let t = env.step(&action);
            match t.outcome {
                Some(Outcome::Win) => {
                    assert_eq!(t.reward, 1.0);
                    wins += 1;
                }
                Some(Outcome::Loss) => {
                    assert_eq!(t.reward, -1.0);
                    losses += 1;
                }
                Some(Outcome::Draw) => panic!("demo never draws"),
                None => {
                    assert_eq!(t.reward, STEP_PENALTY);
                    steps += 1;
                }
            }
        }
        assert!((2_700..=3_300).contains(&wins), "wins: {wins}");
        assert!((2_700..=3_300).contains(&losses), "losses: {losses}");
        assert!((3_700..=4_300).contains(&steps), "steps: {steps}");
    }

    #[test]
    fn test_demo_training_touches_only_center_moves() {
        let mut agent = QLearningAgent::with_seed(QLearningConfig::default(), 9);
        let mut env = DemoEnvironment::with_seed(9);
        for _ in 0..100 {
            run_episode(&mut agent, &mut env, 50);
        }
        assert_eq!(agent.state_count(), 1);
        assert!(agent.size() <= 4);
        assert!(agent.total_updates() >= 100);
    }
}
