//! # Board Game ML
//!
//! Learning and model tooling for Connect Four / Gomoku style agents: a tabular
//! Q-learning agent trained by self-play, and a converter that turns compiled
//! or wrapped model checkpoints into flat, hierarchically named parameter files.
//!
//! ## Modules
//!
//! - [`ai`] — Q-learning agent, board state and move keys
//! - [`training`] — Environment trait, episode runner, trainer, metrics, demo environment
//! - [`checkpoint`] — Value-table snapshots and atomic file writes
//! - [`convert`] — Checkpoint loading and parameter extraction, name translation,
//!   export and verification
//! - [`config`] — TOML configuration loading and validation
//! - [`error`] — Structured error types

pub mod ai;
pub mod checkpoint;
pub mod config;
pub mod convert;
pub mod error;
pub mod training;
