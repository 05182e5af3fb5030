use std::fmt;

use serde::{Deserialize, Serialize};

pub const BOARD_SIZE: usize = 8;
pub const NUM_SQUARES: usize = BOARD_SIZE * BOARD_SIZE;

/// One of the two sides. Black always moves first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Black,
    White,
}

impl Color {
    pub fn opponent(self) -> Self {
        match self {
            Self::Black => Self::White,
            Self::White => Self::Black,
        }
    }

    /// Single-byte tag used in the mailbox layout.
    pub fn tag(self) -> u8 {
        match self {
            Self::Black => b'b',
            Self::White => b'w',
        }
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            b'b' => Some(Self::Black),
            b'w' => Some(Self::White),
            _ => None,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Black => f.write_str("black"),
            Self::White => f.write_str("white"),
        }
    }
}

/// Contents of a single board cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cell {
    #[default]
    Empty,
    Black,
    White,
}

impl Cell {
    pub fn color(self) -> Option<Color> {
        match self {
            Self::Empty => None,
            Self::Black => Some(Color::Black),
            Self::White => Some(Color::White),
        }
    }

    pub fn symbol(self) -> char {
        match self {
            Self::Empty => '.',
            Self::Black => 'B',
            Self::White => 'W',
        }
    }
}

impl From<Color> for Cell {
    fn from(color: Color) -> Self {
        match color {
            Color::Black => Self::Black,
            Color::White => Self::White,
        }
    }
}

/// A validated board coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Square {
    pub column: u8,
    pub row: u8,
}

impl Square {
    pub fn new(column: u8, row: u8) -> Option<Self> {
        if (column as usize) < BOARD_SIZE && (row as usize) < BOARD_SIZE {
            Some(Self { column, row })
        } else {
            None
        }
    }

    /// Returns `None` for anything outside `[0, 8) x [0, 8)`.
    pub fn from_coords(column: i32, row: i32) -> Option<Self> {
        let size = BOARD_SIZE as i32;
        if (0..size).contains(&column) && (0..size).contains(&row) {
            Some(Self {
                column: column as u8,
                row: row as u8,
            })
        } else {
            None
        }
    }

    pub(crate) fn from_index(pos: usize) -> Self {
        debug_assert!(pos < NUM_SQUARES);
        Self {
            column: (pos % BOARD_SIZE) as u8,
            row: (pos / BOARD_SIZE) as u8,
        }
    }

    /// Row-major index, `row * 8 + column`.
    pub fn index(self) -> usize {
        self.row as usize * BOARD_SIZE + self.column as usize
    }

    /// Every square in row-major order.
    pub fn all() -> impl Iterator<Item = Square> {
        (0..NUM_SQUARES).map(Self::from_index)
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.column, self.row)
    }
}

/// A requested placement as produced by a move source; not yet range-checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Proposal {
    pub column: i32,
    pub row: i32,
}

impl Proposal {
    pub fn new(column: i32, row: i32) -> Self {
        Self { column, row }
    }
}

impl From<Square> for Proposal {
    fn from(square: Square) -> Self {
        Self {
            column: square.column as i32,
            row: square.row as i32,
        }
    }
}

impl fmt::Display for Proposal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.column, self.row)
    }
}

/// Verdict of the legality engine for one placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveCheck {
    OutOfRange,
    Illegal,
    Legal,
}

/// Final result of a finished game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Winner(Color),
    Draw,
}

impl Outcome {
    /// Single-byte tag used in the mailbox layout.
    pub fn tag(self) -> u8 {
        match self {
            Self::Winner(color) => color.tag(),
            Self::Draw => b'd',
        }
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            b'd' => Some(Self::Draw),
            other => Color::from_tag(other).map(Self::Winner),
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Winner(color) => write!(f, "{color} wins"),
            Self::Draw => f.write_str("draw"),
        }
    }
}
