//! Error types for the game roles
//!
//! Move errors are recoverable and only ever cause the move source to be
//! asked again. Setup errors are fatal for the whole match. Protocol errors
//! are raised while a game is underway.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::rendezvous::PeerId;
use crate::types::Color;

/// Rejected placement from the legality engine
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveError {
    #[error("square ({column},{row}) is off the board")]
    OutOfRange { column: i32, row: i32 },

    #[error("square ({column},{row}) is occupied or captures nothing")]
    Illegal { column: i32, row: i32 },
}

/// Failures while bringing the coordinator and peers together
#[derive(Error, Debug)]
pub enum SetupError {
    /// Rendezvous channel closed before both peers registered
    #[error("rendezvous channel `{name}` closed after {registered} of 2 registrations")]
    RendezvousClosed { name: String, registered: usize },

    /// No second registration arrived in time
    #[error("rendezvous channel `{name}` timed out after {registered} of 2 registrations")]
    RendezvousTimeout { name: String, registered: usize },

    /// Coordinator went away before sending the color assignment
    #[error("color assignment for {peer} was never delivered")]
    AssignmentLost { peer: PeerId },

    /// Wake signal sender dropped without firing
    #[error("wake signal for {peer} was dropped before firing")]
    WakeLost { peer: PeerId },

    /// Attach after the coordinator marked the mailbox for removal
    #[error("mailbox has been removed")]
    MailboxRemoved,

    /// Peer received a color other than the one its move source was built for
    #[error("{peer} expected to play {expected} but was assigned {assigned}")]
    UnexpectedColor {
        peer: PeerId,
        expected: Color,
        assigned: Color,
    },

    /// Role thread could not be started
    #[error("failed to start {role}: {source}")]
    Spawn {
        role: String,
        #[source]
        source: io::Error,
    },
}

/// Failures while a game is in progress
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// A bounded wait expired
    #[error("timed out after {after:?} waiting for {waiting_for}")]
    Timeout {
        waiting_for: &'static str,
        after: Duration,
    },

    /// Mailbox bytes do not follow the fixed layout
    #[error("malformed mailbox byte {byte:#04x} at offset {offset}")]
    Malformed { offset: usize, byte: u8 },

    /// Opponent move rejected by the local board copy
    #[error("{color} could not replay opponent move: {source}")]
    Desync {
        color: Color,
        #[source]
        source: MoveError,
    },

    /// The other peer failed and left the game
    #[error("{by} abandoned the game")]
    Abandoned { by: Color },
}

/// Failures of a move source
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("move input for {color} ended")]
    Exhausted { color: Color },

    #[error("move input I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Failures loading a match configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Any error a role entry point can return
#[derive(Error, Debug)]
pub enum GameError {
    #[error(transparent)]
    Setup(#[from] SetupError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A role thread panicked
    #[error("{role} panicked")]
    RolePanicked { role: String },
}

impl GameError {
    /// True when this error only reports that some other role failed first.
    pub fn is_secondary(&self) -> bool {
        matches!(self, Self::Protocol(ProtocolError::Abandoned { .. }))
    }
}

/// Result type alias for game operations
pub type GameResult<T> = Result<T, GameError>;
