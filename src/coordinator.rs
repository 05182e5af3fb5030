//! Coordinator role: creates the mailbox, pairs the peers, starts the game
//! and reports the result the peers wrote.

use serde::Serialize;
use tracing::info;

use crate::config::MatchConfig;
use crate::error::{GameResult, ProtocolError};
use crate::mailbox::{Mailbox, Message};
use crate::rendezvous::{Assignment, PeerId, RendezvousListener};
use crate::signal::wake_pair;
use crate::types::{Color, Outcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CoordinatorReport {
    pub outcome: Outcome,
    pub black: PeerId,
    pub white: PeerId,
}

pub struct Coordinator {
    config: MatchConfig,
}

impl Coordinator {
    pub fn new(config: MatchConfig) -> Self {
        Self { config }
    }

    /// Runs one game to completion.
    ///
    /// The first peer to register plays black, the second white.
    pub fn run(self, listener: RendezvousListener) -> GameResult<CoordinatorReport> {
        let mailbox = Mailbox::create(self.config.poll_interval());

        let [first, second] = listener.accept_pair(self.config.game_timeout())?;
        let (black, white) = (first.peer(), second.peer());
        info!("[ARBITER] Paired {} (black) with {} (white)", black, white);

        let (wake_black, black_wake_rx) = wake_pair(black);
        let (wake_white, white_wake_rx) = wake_pair(white);
        first.assign(Assignment {
            color: Color::Black,
            mailbox: mailbox.attach()?,
            wake: black_wake_rx,
        })?;
        second.assign(Assignment {
            color: Color::White,
            mailbox: mailbox.attach()?,
            wake: white_wake_rx,
        })?;

        wake_black.wake()?;
        wake_white.wake()?;
        info!("[ARBITER] Game started, {} handles attached", mailbox.attached());

        let message = mailbox.wait_until(
            "terminal flag",
            Message::is_terminal,
            self.config.game_timeout(),
        )?;
        let outcome = message.outcome.ok_or(ProtocolError::Malformed {
            offset: 7,
            byte: 0,
        })?;
        info!("[ARBITER] Game over: {}", outcome);

        mailbox.remove();
        Ok(CoordinatorReport {
            outcome,
            black,
            white,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::thread;
    use std::time::Duration;

    use super::*;
    use crate::error::{GameError, SetupError};
    use crate::rendezvous;

    fn config() -> MatchConfig {
        MatchConfig {
            poll_interval_ms: 5,
            game_timeout_ms: Some(2_000),
            ..MatchConfig::default()
        }
    }

    #[test]
    fn assigns_colors_in_registration_order_and_reports_the_terminal_byte() {
        let (rendezvous, listener) = rendezvous::open("coordinator-test");
        let first = rendezvous.register(PeerId(100)).unwrap();
        let second = rendezvous.register(PeerId(200)).unwrap();

        let coordinator = thread::spawn(move || Coordinator::new(config()).run(listener));

        let black = first.wait().unwrap();
        let white = second.wait().unwrap();
        assert_eq!(black.color, Color::Black);
        assert_eq!(white.color, Color::White);
        black.wake.wait(Some(Duration::from_secs(2))).unwrap();
        white.wake.wait(Some(Duration::from_secs(2))).unwrap();

        white
            .mailbox
            .publish(&Message::default().with_outcome(Outcome::Winner(Color::White)));

        let report = coordinator.join().unwrap().unwrap();
        assert_eq!(
            report,
            CoordinatorReport {
                outcome: Outcome::Winner(Color::White),
                black: PeerId(100),
                white: PeerId(200),
            }
        );
        assert!(matches!(
            black.mailbox.attach(),
            Err(SetupError::MailboxRemoved)
        ));
    }

    #[test]
    fn abandoned_game_is_reported_as_an_error() {
        let (rendezvous, listener) = rendezvous::open("coordinator-abandon");
        let first = rendezvous.register(PeerId(1)).unwrap();
        let _second = rendezvous.register(PeerId(2)).unwrap();

        let coordinator = thread::spawn(move || Coordinator::new(config()).run(listener));

        let black = first.wait().unwrap();
        black.mailbox.abandon(Color::Black);

        let err = coordinator.join().unwrap().unwrap_err();
        assert!(matches!(
            err,
            GameError::Protocol(ProtocolError::Abandoned { by: Color::Black })
        ));
    }

    #[test]
    fn missing_peer_is_a_setup_failure() {
        let (rendezvous, listener) = rendezvous::open("coordinator-lonely");
        let _first = rendezvous.register(PeerId(1)).unwrap();
        drop(rendezvous);

        let err = Coordinator::new(config()).run(listener).unwrap_err();

        assert!(matches!(
            err,
            GameError::Setup(SetupError::RendezvousClosed { registered: 1, .. })
        ));
    }
}
