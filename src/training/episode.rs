use std::hash::Hash;

use rand::Rng;
use serde::Serialize;

use crate::ai::QLearningAgent;

pub const WIN_REWARD: f64 = 1.0;
pub const LOSS_REWARD: f64 = -1.0;
pub const DRAW_REWARD: f64 = 0.0;
/// Charged on every non-terminal step to discourage indefinite play.
pub const STEP_PENALTY: f64 = -0.01;

/// How a finished episode ended, from the learner's side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Outcome {
    Win,
    Loss,
    Draw,
}

impl Outcome {
    pub fn reward(self) -> f64 {
        match self {
            Outcome::Win => WIN_REWARD,
            Outcome::Loss => LOSS_REWARD,
            Outcome::Draw => DRAW_REWARD,
        }
    }
}

/// A state together with the moves that are legal in it.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation<S, A> {
    pub state: S,
    pub valid_actions: Vec<A>,
}

/// What the environment reports after executing an action.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition<S, A> {
    pub reward: f64,
    pub next: Observation<S, A>,
    /// `Some` when the episode is over.
    pub outcome: Option<Outcome>,
}

/// The game side of the training loop. It owns the rules and legality; the
/// agent only sees opaque states and the actions offered to it.
pub trait Environment {
    type State: Eq + Hash + Clone;
    type Action: Eq + Hash + Clone;

    fn reset(&mut self) -> Observation<Self::State, Self::Action>;
    fn step(&mut self, action: &Self::Action) -> Transition<Self::State, Self::Action>;
}

/// Result of a single episode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpisodeResult {
    /// `None` if the step limit was hit or no move was available.
    pub outcome: Option<Outcome>,
    pub steps: usize,
    pub total_reward: f64,
}

/// Play one episode, applying one value update per step.
///
/// Terminal transitions are learned without bootstrapping, whatever the
/// environment reports as the next state's moves.
pub fn run_episode<E, R>(
    agent: &mut QLearningAgent<E::State, E::Action, R>,
    env: &mut E,
    max_steps: usize,
) -> EpisodeResult
where
    E: Environment,
    R: Rng,
{
    let mut obs = env.reset();
    let mut steps = 0;
    let mut total_reward = 0.0;

    while steps < max_steps {
        let Some(action) = agent.choose_action(&obs.state, &obs.valid_actions) else {
            break;
        };
        let transition = env.step(&action);
        let next_actions: &[E::Action] = if transition.outcome.is_some() {
            &[]
        } else {
            &transition.next.valid_actions
        };
        agent.update(
            &obs.state,
            &action,
            transition.reward,
            &transition.next.state,
            next_actions,
        );
        steps += 1;
        total_reward += transition.reward;

        if let Some(outcome) = transition.outcome {
            return EpisodeResult {
                outcome: Some(outcome),
                steps,
                total_reward,
            };
        }
        obs = transition.next;
    }

    EpisodeResult {
        outcome: None,
        steps,
        total_reward,
    }
}
