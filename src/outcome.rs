//! End-of-game detection.
//!
//! The game ends as soon as either side has no legal placement, and the
//! result is decided purely by piece count. Standard Othello would pass the
//! turn when only one side is blocked; this rule does not.

use serde::Serialize;

use crate::board::Board;
use crate::types::{Color, Outcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndState {
    Continue,
    Over(Outcome),
}

/// Piece counts and mobility gathered in one scan of the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Tally {
    pub black: u8,
    pub white: u8,
    pub empty: u8,
    pub mover_can_move: bool,
    pub opponent_can_move: bool,
}

pub fn tally(board: &Board, mover: Color) -> Tally {
    let (black, white) = board.count();
    Tally {
        black,
        white,
        empty: board.empty_count(),
        mover_can_move: board.has_legal_move(mover),
        opponent_can_move: board.has_legal_move(mover.opponent()),
    }
}

/// Decides whether the game continues with `mover` to play.
pub fn evaluate_end(board: &Board, mover: Color) -> EndState {
    let tally = tally(board, mover);
    if tally.mover_can_move && tally.opponent_can_move {
        EndState::Continue
    } else {
        EndState::Over(decide(tally.black, tally.white))
    }
}

/// More pieces wins; equal counts draw.
pub fn decide(black: u8, white: u8) -> Outcome {
    if black > white {
        Outcome::Winner(Color::Black)
    } else if white > black {
        Outcome::Winner(Color::White)
    } else {
        Outcome::Draw
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board(grid: &str) -> Board {
        grid.parse().unwrap()
    }

    #[test]
    fn opening_position_continues_for_both_movers() {
        let board = Board::new();

        assert_eq!(evaluate_end(&board, Color::Black), EndState::Continue);
        assert_eq!(evaluate_end(&board, Color::White), EndState::Continue);
    }

    #[test]
    fn blocked_board_with_equal_counts_is_a_draw() {
        let board = board(
            "
            BBBBBBBB
            BBBBBBBB
            BBBBBBBB
            BBBBBBBB
            WWWWWWWW
            WWWWWWWW
            WWWWWWWW
            WWWWWWWW",
        );

        for mover in [Color::Black, Color::White] {
            assert_eq!(evaluate_end(&board, mover), EndState::Over(Outcome::Draw));
        }
    }

    #[test]
    fn blocked_board_goes_to_the_larger_side() {
        let board = board(
            "
            W.......
            ........
            ........
            ........
            ........
            ........
            ........
            .......W",
        );

        assert_eq!(
            evaluate_end(&board, Color::Black),
            EndState::Over(Outcome::Winner(Color::White))
        );
        assert_eq!(
            evaluate_end(&board, Color::Black),
            evaluate_end(&board, Color::Black)
        );
    }

    #[test]
    fn one_blocked_side_ends_the_game() {
        // Only white can play: (2,0) captures (1,0) for white, black has nothing.
        let board = board(
            "
            WB......
            ........
            ........
            ........
            ........
            ........
            ........
            ........",
        );

        let tally = tally(&board, Color::White);
        assert!(tally.mover_can_move);
        assert!(!tally.opponent_can_move);
        assert_eq!(evaluate_end(&board, Color::White), EndState::Over(Outcome::Draw));
    }

    #[test]
    fn tally_counts_every_cell() {
        let tally = tally(&Board::new(), Color::Black);

        assert_eq!(
            tally,
            Tally {
                black: 2,
                white: 2,
                empty: 60,
                mover_can_move: true,
                opponent_can_move: true,
            }
        );
    }

    #[test]
    fn decide_compares_piece_counts() {
        assert_eq!(decide(33, 31), Outcome::Winner(Color::Black));
        assert_eq!(decide(0, 1), Outcome::Winner(Color::White));
        assert_eq!(decide(32, 32), Outcome::Draw);
    }
}
