//! Single-shot wake signal from the coordinator to one peer.

use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

use crate::error::{GameResult, ProtocolError, SetupError};
use crate::rendezvous::PeerId;

/// Creates a connected sender/receiver pair for `peer`.
pub fn wake_pair(peer: PeerId) -> (WakeSender, WakeReceiver) {
    let (tx, rx) = crossbeam_channel::bounded(1);
    (WakeSender { peer, tx }, WakeReceiver { peer, rx })
}

#[derive(Debug)]
pub struct WakeSender {
    peer: PeerId,
    tx: Sender<()>,
}

impl WakeSender {
    /// Fires the signal. Consumes the sender, so it fires at most once.
    pub fn wake(self) -> Result<(), SetupError> {
        self.tx
            .send(())
            .map_err(|_| SetupError::WakeLost { peer: self.peer })
    }
}

#[derive(Debug)]
pub struct WakeReceiver {
    peer: PeerId,
    rx: Receiver<()>,
}

impl WakeReceiver {
    /// Blocks until the signal fires.
    pub fn wait(self, timeout: Option<Duration>) -> GameResult<()> {
        match timeout {
            None => self
                .rx
                .recv()
                .map_err(|_| SetupError::WakeLost { peer: self.peer }.into()),
            Some(after) => match self.rx.recv_timeout(after) {
                Ok(()) => Ok(()),
                Err(RecvTimeoutError::Timeout) => Err(ProtocolError::Timeout {
                    waiting_for: "start signal",
                    after,
                }
                .into()),
                Err(RecvTimeoutError::Disconnected) => {
                    Err(SetupError::WakeLost { peer: self.peer }.into())
                }
            },
        }
    }
}
