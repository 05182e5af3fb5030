use std::io::{self, BufRead, BufReader, Cursor, Read, Stdin};

use clap::ValueEnum;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::board::{Board, squares_in};
use crate::error::SourceError;
use crate::types::{Color, Proposal};

/// Where a peer's next placement comes from.
///
/// Proposals are not trusted: the peer validates each one and asks again
/// until the legality engine accepts it.
pub trait MoveSource {
    fn propose(&mut self, board: &Board, color: Color) -> Result<Proposal, SourceError>;
}

impl<T: MoveSource + ?Sized> MoveSource for Box<T> {
    fn propose(&mut self, board: &Board, color: Color) -> Result<Proposal, SourceError> {
        (**self).propose(board, color)
    }
}

/// Picks the first legal square in row-major order.
#[derive(Debug, Default, Clone, Copy)]
pub struct FirstLegalSource;

impl MoveSource for FirstLegalSource {
    fn propose(&mut self, board: &Board, color: Color) -> Result<Proposal, SourceError> {
        let legal = board.legal_moves(color);
        if legal == 0 {
            return Err(SourceError::Exhausted { color });
        }
        Ok(squares_in(legal)[0].into())
    }
}

/// Picks uniformly among legal squares.
#[derive(Debug, Clone)]
pub struct RandomSource {
    rng: StdRng,
}

impl RandomSource {
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_os_rng() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }
}

impl MoveSource for RandomSource {
    fn propose(&mut self, board: &Board, color: Color) -> Result<Proposal, SourceError> {
        let legal = squares_in(board.legal_moves(color));
        legal
            .choose(&mut self.rng)
            .map(|&square| square.into())
            .ok_or(SourceError::Exhausted { color })
    }
}

/// Line-oriented input yielding one line at a time.
pub trait LineInput {
    /// `Ok(None)` at end of input.
    fn next_line(&mut self) -> io::Result<Option<String>>;
}

fn read_one(read_line: impl FnOnce(&mut String) -> io::Result<usize>) -> io::Result<Option<String>> {
    let mut line = String::new();
    match read_line(&mut line)? {
        0 => Ok(None),
        _ => Ok(Some(line)),
    }
}

/// Reads through the process-wide stdin buffer, so two sources never steal
/// each other's lines.
impl LineInput for Stdin {
    fn next_line(&mut self) -> io::Result<Option<String>> {
        read_one(|line| self.read_line(line))
    }
}

impl<R: Read> LineInput for BufReader<R> {
    fn next_line(&mut self) -> io::Result<Option<String>> {
        read_one(|line| self.read_line(line))
    }
}

impl<T: AsRef<[u8]>> LineInput for Cursor<T> {
    fn next_line(&mut self) -> io::Result<Option<String>> {
        read_one(|line| self.read_line(line))
    }
}

/// Reads `column,row` lines. Lines that do not parse are skipped; range and
/// legality are left to the peer.
#[derive(Debug)]
pub struct TextSource<I> {
    input: I,
}

impl<I: LineInput> TextSource<I> {
    pub fn new(input: I) -> Self {
        Self { input }
    }
}

impl TextSource<Stdin> {
    pub fn stdin() -> Self {
        Self::new(io::stdin())
    }
}

impl<I: LineInput> MoveSource for TextSource<I> {
    fn propose(&mut self, board: &Board, color: Color) -> Result<Proposal, SourceError> {
        info!("[INPUT] {} to move, enter column,row\n{}", color, board);
        loop {
            let Some(line) = self.input.next_line()? else {
                return Err(SourceError::Exhausted { color });
            };
            match parse_proposal(&line) {
                Some(proposal) => return Ok(proposal),
                None => warn!("[INPUT] Could not read {:?} as column,row", line.trim()),
            }
        }
    }
}

/// Parses `column,row`, tolerating surrounding whitespace.
pub fn parse_proposal(line: &str) -> Option<Proposal> {
    let (column, row) = line.trim().split_once(',')?;
    Some(Proposal::new(
        column.trim().parse().ok()?,
        row.trim().parse().ok()?,
    ))
}

/// Move source choice in configuration and on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    First,
    Random,
    Stdin,
}

impl SourceKind {
    /// Builds the source. A missing seed draws one from the OS.
    pub fn build(self, seed: Option<u64>) -> Box<dyn MoveSource + Send> {
        match self {
            Self::First => Box::new(FirstLegalSource),
            Self::Random => Box::new(match seed {
                Some(seed) => RandomSource::seeded(seed),
                None => RandomSource::from_os_rng(),
            }),
            Self::Stdin => Box::new(TextSource::stdin()),
        }
    }
}
