use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Side length of the Gomoku board used by the demo environment.
pub const GOMOKU_SIZE: usize = 15;

/// Contents of a single board cell, relative to the player to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellSymbol {
    Empty,
    Own,
    Opponent,
}

impl CellSymbol {
    pub fn to_char(self) -> char {
        match self {
            CellSymbol::Empty => '.',
            CellSymbol::Own => 'X',
            CellSymbol::Opponent => 'O',
        }
    }

    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '.' => Some(CellSymbol::Empty),
            'X' => Some(CellSymbol::Own),
            'O' => Some(CellSymbol::Opponent),
            _ => None,
        }
    }
}

/// Player-relative board encoding used as a value-table key.
///
/// One character per cell in row-major order: `.` empty, `X` the player to
/// move, `O` the opponent. Positions that only differ by a rotation or
/// reflection are distinct keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BoardKey(String);

impl BoardKey {
    /// Encode a sequence of cells.
    pub fn from_cells(cells: &[CellSymbol]) -> Self {
        BoardKey(cells.iter().map(|c| c.to_char()).collect())
    }

    /// An empty board with `cells` positions.
    pub fn empty(cells: usize) -> Self {
        BoardKey(".".repeat(cells))
    }

    pub fn cells(&self) -> impl Iterator<Item = CellSymbol> + '_ {
        // Construction guarantees every character is a valid symbol.
        self.0.chars().filter_map(CellSymbol::from_char)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BoardKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Error returned when parsing a [`BoardKey`] from text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid board symbol '{symbol}' at cell {index}")]
pub struct ParseBoardKeyError {
    pub symbol: char,
    pub index: usize,
}

impl FromStr for BoardKey {
    type Err = ParseBoardKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        for (index, symbol) in s.chars().enumerate() {
            if CellSymbol::from_char(symbol).is_none() {
                return Err(ParseBoardKeyError { symbol, index });
            }
        }
        Ok(BoardKey(s.to_string()))
    }
}

/// A move targeting one board cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Move {
    pub row: u8,
    pub col: u8,
}

impl Move {
    pub fn new(row: u8, col: u8) -> Self {
        Move { row, col }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}
