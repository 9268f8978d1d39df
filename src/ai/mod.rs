mod q_learning;
pub mod state_encoding;

pub use q_learning::{QLearningAgent, QLearningConfig, QTableStats};
pub use state_encoding::{BoardKey, CellSymbol, Move};
