//! Peer role: the turn state machine run by each player.
//!
//! A peer owns its board copy and only ever writes to the mailbox while it
//! is in [`PeerState::MyTurn`]. The opponent's move is replayed through the
//! legality engine before the end condition is checked, so both copies stay
//! identical as long as both peers follow the protocol.

use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::board::Board;
use crate::error::{GameResult, ProtocolError};
use crate::mailbox::{Mailbox, Message};
use crate::outcome::{EndState, evaluate_end};
use crate::rendezvous::{Assignment, PeerId};
use crate::signal::WakeReceiver;
use crate::source::MoveSource;
use crate::types::{Color, Outcome, Proposal, Square};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerState {
    AwaitingStart,
    MyTurn,
    WaitingOnOpponent,
    GameOver(Outcome),
}

/// What a peer knows once its game is over.
#[derive(Debug, Clone, Serialize)]
pub struct PeerReport {
    pub peer: PeerId,
    pub color: Color,
    pub outcome: Outcome,
    pub moves_played: u32,
    pub rejected_proposals: u32,
    pub board: Board,
}

pub struct Peer<S> {
    id: PeerId,
    color: Color,
    board: Board,
    mailbox: Mailbox,
    wake: Option<WakeReceiver>,
    source: S,
    state: PeerState,
    turn_timeout: Option<Duration>,
    moves_played: u32,
    rejected_proposals: u32,
}

impl<S: MoveSource> Peer<S> {
    pub fn new(id: PeerId, assignment: Assignment, source: S, turn_timeout: Option<Duration>) -> Self {
        let Assignment {
            color,
            mailbox,
            wake,
        } = assignment;
        info!("[PEER] {} attached as {}", id, color);
        Self {
            id,
            color,
            board: Board::new(),
            mailbox,
            wake: Some(wake),
            source,
            state: PeerState::AwaitingStart,
            turn_timeout,
            moves_played: 0,
            rejected_proposals: 0,
        }
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn state(&self) -> PeerState {
        self.state
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Performs one state transition, blocking where the state requires it.
    pub fn step(&mut self) -> GameResult<PeerState> {
        let next = match self.state {
            PeerState::AwaitingStart => self.await_start()?,
            PeerState::WaitingOnOpponent => self.wait_for_opponent()?,
            PeerState::MyTurn => self.take_turn()?,
            PeerState::GameOver(outcome) => PeerState::GameOver(outcome),
        };
        if next != self.state {
            debug!("[PEER] {} {:?} -> {:?}", self.color, self.state, next);
        }
        self.state = next;
        Ok(next)
    }

    /// Runs until the game is over, then detaches from the mailbox.
    ///
    /// On failure the peer marks the mailbox abandoned so nobody keeps
    /// waiting for it.
    pub fn run(mut self) -> GameResult<PeerReport> {
        loop {
            match self.step() {
                Ok(PeerState::GameOver(outcome)) => {
                    info!(
                        "[PEER] {} finished ({}), detaching after {} moves",
                        self.color, outcome, self.moves_played
                    );
                    return Ok(PeerReport {
                        peer: self.id,
                        color: self.color,
                        outcome,
                        moves_played: self.moves_played,
                        rejected_proposals: self.rejected_proposals,
                        board: self.board,
                    });
                }
                Ok(_) => {}
                Err(err) => {
                    if !err.is_secondary() {
                        warn!("[PEER] {} leaving the game: {}", self.color, err);
                        self.mailbox.abandon(self.color);
                    }
                    return Err(err);
                }
            }
        }
    }

    fn await_start(&mut self) -> GameResult<PeerState> {
        if let Some(wake) = self.wake.take() {
            wake.wait(self.turn_timeout)?;
        }
        info!("[PEER] {} received start signal", self.color);
        Ok(match self.color {
            Color::Black => PeerState::MyTurn,
            Color::White => PeerState::WaitingOnOpponent,
        })
    }

    fn wait_for_opponent(&mut self) -> GameResult<PeerState> {
        let opponent = self.color.opponent();
        let message = self.mailbox.wait_until(
            "opponent move",
            |message| message.is_terminal() || message.last_mover == Some(opponent),
            self.turn_timeout,
        )?;
        Ok(match message.outcome {
            Some(outcome) => PeerState::GameOver(outcome),
            None => PeerState::MyTurn,
        })
    }

    fn take_turn(&mut self) -> GameResult<PeerState> {
        let message = self.mailbox.read()?;
        if let Some(outcome) = message.outcome {
            return Ok(PeerState::GameOver(outcome));
        }

        if message.last_mover == Some(self.color.opponent()) {
            self.replay_opponent(&message)?;
        }

        if let EndState::Over(outcome) = evaluate_end(&self.board, self.color) {
            let (black, white) = self.board.count();
            info!(
                "[PEER] {} detected end of game: {} ({} black, {} white)",
                self.color, outcome, black, white
            );
            self.mailbox.publish(&message.with_outcome(outcome));
            return Ok(PeerState::GameOver(outcome));
        }

        let square = self.choose_square()?;
        self.moves_played += 1;
        debug!("[PEER] {} played {}\n{}", self.color, square, self.board);
        self.mailbox.publish(&Message::moved(self.color, square));
        Ok(PeerState::WaitingOnOpponent)
    }

    fn replay_opponent(&mut self, message: &Message) -> GameResult<()> {
        let opponent = self.color.opponent();
        let Some(square) = message.last_move else {
            return Err(ProtocolError::Malformed { offset: 1, byte: 0 }.into());
        };
        let proposal = Proposal::from(square);
        self.board
            .evaluate_move(proposal.column, proposal.row, opponent, true)
            .into_result(proposal)
            .map_err(|source| ProtocolError::Desync {
                color: self.color,
                source,
            })?;
        debug!("[PEER] {} replayed {} move {}", self.color, opponent, square);
        Ok(())
    }

    /// Asks the source until it yields a legal square, committing it.
    fn choose_square(&mut self) -> GameResult<Square> {
        loop {
            let proposal = self.source.propose(&self.board, self.color)?;
            let verdict = self
                .board
                .evaluate_move(proposal.column, proposal.row, self.color, true);
            match (
                verdict.into_result(proposal),
                Square::from_coords(proposal.column, proposal.row),
            ) {
                (Ok(()), Some(square)) => return Ok(square),
                (result, _) => {
                    self.rejected_proposals += 1;
                    if let Err(err) = result {
                        warn!("[PEER] {} proposal rejected: {}", self.color, err);
                    }
                }
            }
        }
    }
}
