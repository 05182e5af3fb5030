//! Bootstrap channel on which peers announce themselves to the coordinator.
//!
//! Each peer registers exactly once. The coordinator accepts exactly two
//! registrations, in arrival order, and then drops its end of the channel.
//! Colors are assigned by the coordinator and sent back as data.

use std::fmt;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use serde::Serialize;
use tracing::debug;

use crate::error::SetupError;
use crate::mailbox::Mailbox;
use crate::signal::WakeReceiver;
use crate::types::Color;

/// Identity a peer publishes on the rendezvous channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct PeerId(pub u64);

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "peer-{}", self.0)
    }
}

/// What the coordinator hands a registered peer.
pub struct Assignment {
    pub color: Color,
    pub mailbox: Mailbox,
    pub wake: WakeReceiver,
}

/// A peer's registration as seen by the coordinator.
pub struct Registration {
    peer: PeerId,
    reply: Sender<Assignment>,
}

impl Registration {
    pub fn peer(&self) -> PeerId {
        self.peer
    }

    /// Sends the assignment back to the registering peer.
    pub fn assign(self, assignment: Assignment) -> Result<(), SetupError> {
        self.reply
            .send(assignment)
            .map_err(|_| SetupError::AssignmentLost { peer: self.peer })
    }
}

/// Opens a named rendezvous channel.
pub fn open(name: &str) -> (Rendezvous, RendezvousListener) {
    let (tx, rx) = crossbeam_channel::unbounded();
    (
        Rendezvous {
            name: name.to_string(),
            tx,
        },
        RendezvousListener {
            name: name.to_string(),
            rx,
        },
    )
}

/// Peer side of the channel.
#[derive(Clone)]
pub struct Rendezvous {
    name: String,
    tx: Sender<Registration>,
}

impl Rendezvous {
    /// Publishes `peer` and returns a handle on which its assignment arrives.
    pub fn register(&self, peer: PeerId) -> Result<PendingAssignment, SetupError> {
        let (reply, rx) = crossbeam_channel::bounded(1);
        self.tx
            .send(Registration { peer, reply })
            .map_err(|_| SetupError::RendezvousClosed {
                name: self.name.clone(),
                registered: 0,
            })?;
        debug!("[RENDEZVOUS] {} registered on `{}`", peer, self.name);
        Ok(PendingAssignment { peer, rx })
    }
}

pub struct PendingAssignment {
    peer: PeerId,
    rx: Receiver<Assignment>,
}

impl PendingAssignment {
    pub fn peer(&self) -> PeerId {
        self.peer
    }

    /// Blocks until the coordinator replies.
    pub fn wait(self) -> Result<Assignment, SetupError> {
        self.rx
            .recv()
            .map_err(|_| SetupError::AssignmentLost { peer: self.peer })
    }
}

/// Coordinator side of the channel.
pub struct RendezvousListener {
    name: String,
    rx: Receiver<Registration>,
}

impl RendezvousListener {
    /// Reads exactly two registrations, then removes the channel.
    pub fn accept_pair(self, timeout: Option<Duration>) -> Result<[Registration; 2], SetupError> {
        let first = self.accept_one(0, timeout)?;
        let second = self.accept_one(1, timeout)?;
        debug!("[RENDEZVOUS] `{}` removed", self.name);
        Ok([first, second])
    }

    fn accept_one(
        &self,
        registered: usize,
        timeout: Option<Duration>,
    ) -> Result<Registration, SetupError> {
        let closed = || SetupError::RendezvousClosed {
            name: self.name.clone(),
            registered,
        };
        match timeout {
            None => self.rx.recv().map_err(|_| closed()),
            Some(after) => self.rx.recv_timeout(after).map_err(|err| match err {
                RecvTimeoutError::Timeout => SetupError::RendezvousTimeout {
                    name: self.name.clone(),
                    registered,
                },
                RecvTimeoutError::Disconnected => closed(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::wake_pair;

    #[test]
    fn registrations_are_accepted_in_arrival_order() {
        let (rendezvous, listener) = open("test");

        let first = rendezvous.register(PeerId(10)).unwrap();
        let second = rendezvous.register(PeerId(20)).unwrap();
        let [a, b] = listener.accept_pair(None).unwrap();

        assert_eq!(a.peer(), PeerId(10));
        assert_eq!(b.peer(), PeerId(20));
        assert_eq!(first.peer(), PeerId(10));
        assert_eq!(second.peer(), PeerId(20));
    }

    #[test]
    fn assignment_is_delivered_as_data() {
        let (rendezvous, listener) = open("test");
        let pending = rendezvous.register(PeerId(1)).unwrap();
        let _other = rendezvous.register(PeerId(2)).unwrap();
        let [registration, _] = listener.accept_pair(None).unwrap();
        let mailbox = Mailbox::create(Duration::from_millis(5));
        let (_tx, wake) = wake_pair(PeerId(1));

        registration
            .assign(Assignment {
                color: Color::White,
                mailbox: mailbox.attach().unwrap(),
                wake,
            })
            .unwrap();

        let assignment = pending.wait().unwrap();
        assert_eq!(assignment.color, Color::White);
        assert_eq!(mailbox.attached(), 2);
    }

    #[test]
    fn single_registration_then_close_is_reported() {
        let (rendezvous, listener) = open("lonely");
        let _pending = rendezvous.register(PeerId(1)).unwrap();
        drop(rendezvous);

        let err = listener.accept_pair(None).err().unwrap();

        assert!(matches!(
            err,
            SetupError::RendezvousClosed { registered: 1, .. }
        ));
    }

    #[test]
    fn missing_second_peer_times_out() {
        let (rendezvous, listener) = open("slow");
        let _pending = rendezvous.register(PeerId(1)).unwrap();

        let err = listener
            .accept_pair(Some(Duration::from_millis(10)))
            .err()
            .unwrap();

        assert!(matches!(
            err,
            SetupError::RendezvousTimeout { registered: 1, .. }
        ));
    }

    #[test]
    fn dropped_coordinator_loses_the_assignment() {
        let (rendezvous, listener) = open("gone");
        let pending = rendezvous.register(PeerId(7)).unwrap();
        drop(listener);

        assert!(matches!(
            pending.wait(),
            Err(SetupError::AssignmentLost { peer: PeerId(7) })
        ));
    }
}
