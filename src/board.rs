use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::error::MoveError;
use crate::types::{BOARD_SIZE, Cell, Color, MoveCheck, NUM_SQUARES, Proposal, Square};

/// (column, row) steps for the eight compass directions.
const DIRECTIONS: [(i32, i32); 8] = [
    (0, -1),
    (0, 1),
    (1, 0),
    (-1, 0),
    (1, -1),
    (-1, -1),
    (1, 1),
    (-1, 1),
];

/// For every square, the squares walked outward in each direction, nearest first.
static RAYS: Lazy<Vec<[Vec<usize>; 8]>> = Lazy::new(|| {
    (0..NUM_SQUARES)
        .map(|pos| {
            let origin = Square::from_index(pos);
            DIRECTIONS.map(|(dc, dr)| {
                let mut ray = Vec::with_capacity(BOARD_SIZE - 1);
                let mut column = origin.column as i32 + dc;
                let mut row = origin.row as i32 + dr;
                while let Some(square) = Square::from_coords(column, row) {
                    ray.push(square.index());
                    column += dc;
                    row += dr;
                }
                ray
            })
        })
        .collect()
});

/// Reversi board state represented by two bitboards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Board {
    black: u64,
    white: u64,
}

impl Board {
    /// Creates the initial board:
    /// black on (3,3) and (4,4), white on (3,4) and (4,3).
    pub fn new() -> Self {
        Self {
            black: bit(27) | bit(36),
            white: bit(35) | bit(28),
        }
    }

    /// Builds a board from raw bitboards indexed `row * 8 + column`.
    pub fn from_bitboards(black: u64, white: u64) -> Self {
        debug_assert_eq!(black & white, 0, "a square cannot hold both colors");
        Self { black, white }
    }

    pub fn cell(&self, square: Square) -> Cell {
        let square = bit(square.index());
        if (self.black & square) != 0 {
            Cell::Black
        } else if (self.white & square) != 0 {
            Cell::White
        } else {
            Cell::Empty
        }
    }

    /// Check-only evaluation of a placement. Never touches the board.
    pub fn check_move(&self, column: i32, row: i32, player: Color) -> MoveCheck {
        let Some(square) = Square::from_coords(column, row) else {
            return MoveCheck::OutOfRange;
        };
        if self.captures(square, player) == 0 {
            MoveCheck::Illegal
        } else {
            MoveCheck::Legal
        }
    }

    /// Evaluates a placement and, when `commit` is set and the placement is
    /// legal, places the piece and flips every captured line.
    pub fn evaluate_move(&mut self, column: i32, row: i32, player: Color, commit: bool) -> MoveCheck {
        if !commit {
            return self.check_move(column, row, player);
        }
        let Some(square) = Square::from_coords(column, row) else {
            return MoveCheck::OutOfRange;
        };
        if self.place(square, player) == 0 {
            MoveCheck::Illegal
        } else {
            MoveCheck::Legal
        }
    }

    /// Places one piece and flips captured pieces.
    /// Returns flipped bit mask. Returns 0 when move is illegal.
    pub fn place(&mut self, square: Square, player: Color) -> u64 {
        let flips = self.captures(square, player);
        if flips == 0 {
            return 0;
        }

        let (me, opp) = self.sides(player);
        let next_me = me | bit(square.index()) | flips;
        let next_opp = opp & !flips;

        match player {
            Color::Black => {
                self.black = next_me;
                self.white = next_opp;
            }
            Color::White => {
                self.white = next_me;
                self.black = next_opp;
            }
        }

        flips
    }

    /// Opponent pieces that placing `player` on `square` would flip.
    /// Zero when the square is occupied or no direction closes a line.
    pub fn captures(&self, square: Square, player: Color) -> u64 {
        let (me, opp) = self.sides(player);
        if ((me | opp) & bit(square.index())) != 0 {
            return 0;
        }

        let mut flips = 0u64;
        for ray in &RAYS[square.index()] {
            let mut line = 0u64;
            for &pos in ray {
                let square = bit(pos);
                if (opp & square) != 0 {
                    line |= square;
                    continue;
                }
                if (me & square) != 0 {
                    flips |= line;
                }
                break;
            }
        }

        flips
    }

    /// Returns legal move mask for the given side.
    pub fn legal_moves(&self, player: Color) -> u64 {
        Square::all()
            .filter(|&square| self.captures(square, player) != 0)
            .fold(0u64, |mask, square| mask | bit(square.index()))
    }

    /// True when `player` can place a piece anywhere, scanning with
    /// check-only evaluation.
    pub fn has_legal_move(&self, player: Color) -> bool {
        Square::all().any(|square| {
            self.check_move(square.column as i32, square.row as i32, player) == MoveCheck::Legal
        })
    }

    /// Returns `(black_count, white_count)`.
    pub fn count(&self) -> (u8, u8) {
        (self.black.count_ones() as u8, self.white.count_ones() as u8)
    }

    /// Returns the number of empty squares.
    pub fn empty_count(&self) -> u8 {
        let (black_count, white_count) = self.count();
        NUM_SQUARES as u8 - black_count - white_count
    }

    /// 64 symbols in row-major order, `B`, `W` or `.`.
    pub fn to_compact(&self) -> String {
        Square::all().map(|square| self.cell(square).symbol()).collect()
    }

    fn sides(&self, player: Color) -> (u64, u64) {
        match player {
            Color::Black => (self.black, self.white),
            Color::White => (self.white, self.black),
        }
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(" ")?;
        for column in 0..BOARD_SIZE {
            write!(f, " {column}")?;
        }
        for row in 0..BOARD_SIZE {
            write!(f, "\n{row}")?;
            for column in 0..BOARD_SIZE {
                let square = Square::from_index(row * BOARD_SIZE + column);
                write!(f, " {}", self.cell(square).symbol())?;
            }
        }
        Ok(())
    }
}

impl Serialize for Board {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_compact())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BoardParseError {
    #[error("unexpected symbol {0:?}")]
    Symbol(char),
    #[error("expected 64 squares, found {0}")]
    Length(usize),
}

/// Parses the compact form. Whitespace is ignored, so an 8-line grid works too.
impl FromStr for Board {
    type Err = BoardParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut black = 0u64;
        let mut white = 0u64;
        let mut pos = 0usize;

        for symbol in s.chars().filter(|c| !c.is_whitespace()) {
            if pos < NUM_SQUARES {
                match symbol {
                    'B' | 'b' => black |= bit(pos),
                    'W' | 'w' => white |= bit(pos),
                    '.' => {}
                    other => return Err(BoardParseError::Symbol(other)),
                }
            }
            pos += 1;
        }

        if pos != NUM_SQUARES {
            return Err(BoardParseError::Length(pos));
        }
        Ok(Self { black, white })
    }
}

impl MoveCheck {
    /// Maps the engine verdict onto the recoverable error taxonomy.
    pub fn into_result(self, proposal: Proposal) -> Result<(), MoveError> {
        let Proposal { column, row } = proposal;
        match self {
            Self::Legal => Ok(()),
            Self::Illegal => Err(MoveError::Illegal { column, row }),
            Self::OutOfRange => Err(MoveError::OutOfRange { column, row }),
        }
    }
}

/// Squares set in `mask`, in row-major order.
pub fn squares_in(mask: u64) -> Vec<Square> {
    let mut bits = mask;
    let mut out = Vec::new();

    while bits != 0 {
        out.push(Square::from_index(bits.trailing_zeros() as usize));
        bits &= bits - 1;
    }

    out
}

fn bit(pos: usize) -> u64 {
    if pos < NUM_SQUARES { 1u64 << pos } else { 0 }
}
