//! Runs a full match: one coordinator and two peers, each on its own thread,
//! sharing nothing but the rendezvous channel, the wake signals and the
//! mailbox.

use std::thread::{self, ScopedJoinHandle};

use serde::Serialize;
use tracing::info;

use crate::config::MatchConfig;
use crate::coordinator::Coordinator;
use crate::error::{GameError, GameResult, SetupError};
use crate::peer::{Peer, PeerReport};
use crate::rendezvous::{self, PeerId, PendingAssignment};
use crate::source::MoveSource;
use crate::types::{Color, Outcome};

/// Name of the bootstrap channel.
pub const RENDEZVOUS_NAME: &str = "reversi-rendezvous";

#[derive(Debug, Clone, Serialize)]
pub struct MatchReport {
    pub outcome: Outcome,
    pub black: PeerReport,
    pub white: PeerReport,
    pub moves: u32,
}

/// Plays one game with sources built from `config`.
pub fn run_configured(config: &MatchConfig) -> GameResult<MatchReport> {
    run_match(
        config,
        config.black.build(config.seed),
        config.white.build(config.seed_for_white()),
    )
}

/// Plays one game between `black` and `white`.
///
/// The black peer registers first, so the coordinator hands it black.
pub fn run_match<B, W>(config: &MatchConfig, black: B, white: W) -> GameResult<MatchReport>
where
    B: MoveSource + Send,
    W: MoveSource + Send,
{
    let (rendezvous, listener) = rendezvous::open(RENDEZVOUS_NAME);
    let black_pending = rendezvous.register(PeerId(1))?;
    let white_pending = rendezvous.register(PeerId(2))?;
    drop(rendezvous);

    let coordinator = Coordinator::new(config.clone());
    let turn_timeout = config.turn_timeout();

    let (arbiter, black_result, white_result) = thread::scope(|scope| -> GameResult<_> {
        let arbiter = spawn(scope, "arbiter", move || coordinator.run(listener))?;
        let black = spawn(scope, "peer-black", move || {
            play(black_pending, Color::Black, black, turn_timeout)
        })?;
        let white = spawn(scope, "peer-white", move || {
            play(white_pending, Color::White, white, turn_timeout)
        })?;
        Ok((
            join(arbiter, "arbiter"),
            join(black, "peer-black"),
            join(white, "peer-white"),
        ))
    })?;

    let (arbiter, black, white) = match (arbiter, black_result, white_result) {
        (Ok(arbiter), Ok(black), Ok(white)) => (arbiter, black, white),
        (arbiter, black, white) => {
            return Err(root_cause([black.err(), white.err(), arbiter.err()]));
        }
    };

    let moves = black.moves_played + white.moves_played;
    info!("[MATCH] {} after {} moves", arbiter.outcome, moves);
    Ok(MatchReport {
        outcome: arbiter.outcome,
        black,
        white,
        moves,
    })
}

fn play<S: MoveSource>(
    pending: PendingAssignment,
    expected: Color,
    source: S,
    turn_timeout: Option<std::time::Duration>,
) -> GameResult<PeerReport> {
    let peer = pending.peer();
    let assignment = pending.wait()?;
    if assignment.color != expected {
        return Err(SetupError::UnexpectedColor {
            peer,
            expected,
            assigned: assignment.color,
        }
        .into());
    }
    Peer::new(peer, assignment, source, turn_timeout).run()
}

fn spawn<'scope, 'env, T, F>(
    scope: &'scope thread::Scope<'scope, 'env>,
    role: &str,
    body: F,
) -> GameResult<ScopedJoinHandle<'scope, GameResult<T>>>
where
    T: Send + 'scope,
    F: FnOnce() -> GameResult<T> + Send + 'scope,
{
    thread::Builder::new()
        .name(role.to_string())
        .spawn_scoped(scope, body)
        .map_err(|source| {
            SetupError::Spawn {
                role: role.to_string(),
                source,
            }
            .into()
        })
}

fn join<T>(handle: ScopedJoinHandle<'_, GameResult<T>>, role: &str) -> GameResult<T> {
    handle.join().unwrap_or_else(|_| {
        Err(GameError::RolePanicked {
            role: role.to_string(),
        })
    })
}

/// Picks the error that caused the others, skipping reports of abandonment.
fn root_cause(errors: [Option<GameError>; 3]) -> GameError {
    let mut errors: Vec<GameError> = errors.into_iter().flatten().collect();
    let primary = errors.iter().position(|err| !err.is_secondary()).unwrap_or(0);
    errors.swap_remove(primary)
}
