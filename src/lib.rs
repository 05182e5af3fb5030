//! Reversi played by two peers that share nothing but a small mailbox,
//! refereed by a coordinator that pairs them and reports the result.

pub mod board;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod mailbox;
pub mod outcome;
pub mod peer;
pub mod rendezvous;
pub mod session;
pub mod signal;
pub mod source;
pub mod types;

pub use board::Board;
pub use config::MatchConfig;
pub use error::{GameError, GameResult};
pub use session::{MatchReport, run_configured, run_match};
pub use types::{Color, MoveCheck, Outcome, Square};
