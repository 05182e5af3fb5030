//! Single-slot mailbox shared by the coordinator and both peers.
//!
//! # Layout
//!
//! | Offset | Field        | Encoding                                  |
//! |--------|--------------|-------------------------------------------|
//! | 0      | last mover   | `0` nobody yet, `b'b'` black, `b'w'` white |
//! | 1..=2  | last move    | ASCII digits, column then row             |
//! | 3..=5  | reserved     | zero                                      |
//! | 6      | terminal     | `b'e'` once the game has ended            |
//! | 7      | outcome      | `b'b'`, `b'w'` or `b'd'`                  |
//!
//! A publish replaces all eight bytes under one lock acquisition, so readers
//! never observe a half-written message. There is no locking discipline
//! between peers beyond that: only the peer whose turn it is writes.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use serde::Serialize;
use tracing::{debug, warn};
use web_time::Instant;

use crate::error::{ProtocolError, SetupError};
use crate::types::{Color, Outcome, Square};

pub const MAILBOX_LEN: usize = 8;

const MOVER_OFFSET: usize = 0;
const COLUMN_OFFSET: usize = 1;
const ROW_OFFSET: usize = 2;
const TERMINAL_OFFSET: usize = 6;
const OUTCOME_OFFSET: usize = 7;

const NOBODY: u8 = 0;
const TERMINAL_MARK: u8 = b'e';

/// Decoded mailbox contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Message {
    pub last_mover: Option<Color>,
    pub last_move: Option<Square>,
    pub outcome: Option<Outcome>,
}

impl Message {
    /// Message announcing that `mover` placed a piece on `square`.
    pub fn moved(mover: Color, square: Square) -> Self {
        Self {
            last_mover: Some(mover),
            last_move: Some(square),
            outcome: None,
        }
    }

    /// Same message with the terminal flag set.
    pub fn with_outcome(self, outcome: Outcome) -> Self {
        Self {
            outcome: Some(outcome),
            ..self
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.outcome.is_some()
    }

    pub fn encode(&self) -> [u8; MAILBOX_LEN] {
        let mut bytes = [0u8; MAILBOX_LEN];

        if let (Some(mover), Some(square)) = (self.last_mover, self.last_move) {
            bytes[MOVER_OFFSET] = mover.tag();
            bytes[COLUMN_OFFSET] = b'0' + square.column;
            bytes[ROW_OFFSET] = b'0' + square.row;
        }
        if let Some(outcome) = self.outcome {
            bytes[TERMINAL_OFFSET] = TERMINAL_MARK;
            bytes[OUTCOME_OFFSET] = outcome.tag();
        }

        bytes
    }

    pub fn decode(bytes: &[u8; MAILBOX_LEN]) -> Result<Self, ProtocolError> {
        let malformed = |offset: usize| ProtocolError::Malformed {
            offset,
            byte: bytes[offset],
        };

        let (last_mover, last_move) = match bytes[MOVER_OFFSET] {
            NOBODY => (None, None),
            tag => {
                let mover = Color::from_tag(tag).ok_or_else(|| malformed(MOVER_OFFSET))?;
                let column =
                    coordinate(bytes[COLUMN_OFFSET]).ok_or_else(|| malformed(COLUMN_OFFSET))?;
                let row = coordinate(bytes[ROW_OFFSET]).ok_or_else(|| malformed(ROW_OFFSET))?;
                (Some(mover), Square::new(column, row))
            }
        };

        let outcome = match bytes[TERMINAL_OFFSET] {
            NOBODY => None,
            TERMINAL_MARK => Some(
                Outcome::from_tag(bytes[OUTCOME_OFFSET]).ok_or_else(|| malformed(OUTCOME_OFFSET))?,
            ),
            _ => return Err(malformed(TERMINAL_OFFSET)),
        };

        Ok(Self {
            last_mover,
            last_move,
            outcome,
        })
    }
}

fn coordinate(byte: u8) -> Option<u8> {
    (b'0'..=b'7').contains(&byte).then(|| byte - b'0')
}

struct SlotState {
    bytes: [u8; MAILBOX_LEN],
    attached: usize,
    removed: bool,
    abandoned_by: Option<Color>,
}

struct Slot {
    state: Mutex<SlotState>,
    changed: Condvar,
    poll_interval: Duration,
}

/// Handle to the shared mailbox. Each handle counts as one attachment and
/// detaches when dropped.
pub struct Mailbox {
    slot: Arc<Slot>,
}

impl Mailbox {
    /// Creates an empty mailbox; the returned handle is the creator's attachment.
    pub fn create(poll_interval: Duration) -> Self {
        let slot = Arc::new(Slot {
            state: Mutex::new(SlotState {
                bytes: [0u8; MAILBOX_LEN],
                attached: 1,
                removed: false,
                abandoned_by: None,
            }),
            changed: Condvar::new(),
            poll_interval,
        });
        debug!("[MAILBOX] Created, poll interval {:?}", poll_interval);
        Self { slot }
    }

    /// Opens another handle on the same buffer.
    pub fn attach(&self) -> Result<Self, SetupError> {
        let mut state = self.slot.state.lock();
        if state.removed {
            return Err(SetupError::MailboxRemoved);
        }
        state.attached += 1;
        debug!("[MAILBOX] Attached, {} handles", state.attached);
        Ok(Self {
            slot: Arc::clone(&self.slot),
        })
    }

    pub fn attached(&self) -> usize {
        self.slot.state.lock().attached
    }

    pub fn read(&self) -> Result<Message, ProtocolError> {
        let state = self.slot.state.lock();
        Message::decode(&state.bytes)
    }

    /// Raw bytes as currently stored.
    pub fn snapshot(&self) -> [u8; MAILBOX_LEN] {
        self.slot.state.lock().bytes
    }

    /// Replaces the whole message at once and wakes every waiter.
    pub fn publish(&self, message: &Message) {
        let bytes = message.encode();
        self.slot.state.lock().bytes = bytes;
        self.slot.changed.notify_all();
    }

    /// Blocks until `ready` accepts the current message.
    ///
    /// Waiters are woken on every publish and re-check at least once per poll
    /// interval. Without a timeout the wait is unbounded.
    pub fn wait_until(
        &self,
        waiting_for: &'static str,
        mut ready: impl FnMut(&Message) -> bool,
        timeout: Option<Duration>,
    ) -> Result<Message, ProtocolError> {
        let deadline = timeout.map(|timeout| (Instant::now() + timeout, timeout));
        let mut state = self.slot.state.lock();

        loop {
            if let Some(by) = state.abandoned_by {
                return Err(ProtocolError::Abandoned { by });
            }

            let message = Message::decode(&state.bytes)?;
            if ready(&message) {
                return Ok(message);
            }

            let wait = match deadline {
                Some((deadline, after)) => {
                    let now = Instant::now();
                    if now >= deadline {
                        warn!("[MAILBOX] Gave up waiting for {}", waiting_for);
                        return Err(ProtocolError::Timeout { waiting_for, after });
                    }
                    (deadline - now).min(self.slot.poll_interval)
                }
                None => self.slot.poll_interval,
            };
            self.slot.changed.wait_for(&mut state, wait);
        }
    }

    /// Marks that `color` left the game after a failure; waiters stop waiting.
    pub fn abandon(&self, color: Color) {
        let mut state = self.slot.state.lock();
        state.abandoned_by.get_or_insert(color);
        drop(state);
        self.slot.changed.notify_all();
    }

    /// Marks the mailbox for removal. Existing handles keep working, new
    /// attaches fail, and the buffer is freed once the last handle detaches.
    pub fn remove(&self) {
        self.slot.state.lock().removed = true;
        debug!("[MAILBOX] Marked for removal");
    }
}

impl Drop for Mailbox {
    fn drop(&mut self) {
        let mut state = self.slot.state.lock();
        state.attached -= 1;
        debug!("[MAILBOX] Detached, {} handles", state.attached);
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    const POLL: Duration = Duration::from_millis(5);

    fn sq(column: u8, row: u8) -> Square {
        Square::new(column, row).unwrap()
    }

    #[test]
    fn empty_buffer_decodes_as_nobody_moved() {
        let message = Message::decode(&[0u8; MAILBOX_LEN]).unwrap();

        assert_eq!(message, Message::default());
        assert!(!message.is_terminal());
    }

    #[test]
    fn black_move_round_trips_through_the_buffer() {
        let mailbox = Mailbox::create(POLL);

        mailbox.publish(&Message::moved(Color::Black, sq(2, 5)));

        assert_eq!(mailbox.snapshot(), *b"b25\0\0\0\0\0");
        let message = mailbox.read().unwrap();
        assert_eq!(message.last_mover, Some(Color::Black));
        assert_eq!(message.last_move, Some(sq(2, 5)));
        assert_eq!(message.outcome, None);
    }

    #[test]
    fn terminal_flag_lives_at_offsets_six_and_seven() {
        let message = Message::moved(Color::White, sq(7, 0)).with_outcome(Outcome::Draw);

        let bytes = message.encode();

        assert_eq!(&bytes, b"w70\0\0\0ed");
        assert_eq!(Message::decode(&bytes).unwrap(), message);
    }

    #[test]
    fn hand_written_bytes_decode_by_offset() {
        let bytes = *b"b47\0\0\0eb";

        let message = Message::decode(&bytes).unwrap();

        assert_eq!(message.last_mover, Some(Color::Black));
        assert_eq!(message.last_move, Some(sq(4, 7)));
        assert_eq!(message.outcome, Some(Outcome::Winner(Color::Black)));
    }

    #[test]
    fn unknown_tags_are_reported_with_their_offset() {
        let cases: [(&[u8; MAILBOX_LEN], usize); 4] = [
            (b"x00\0\0\0\0\0", 0),
            (b"b9x\0\0\0\0\0", 1),
            (b"b08\0\0\0\0\0", 2),
            (b"b00\0\0\0eq", 7),
        ];

        for (bytes, offset) in cases {
            match Message::decode(bytes) {
                Err(ProtocolError::Malformed { offset: got, .. }) => assert_eq!(got, offset),
                other => panic!("expected malformed at {offset}, got {other:?}"),
            }
        }
    }

    #[test]
    fn attachments_are_counted_and_removal_blocks_new_ones() {
        let mailbox = Mailbox::create(POLL);
        let peer = mailbox.attach().unwrap();
        assert_eq!(mailbox.attached(), 2);

        mailbox.remove();
        assert!(matches!(mailbox.attach(), Err(SetupError::MailboxRemoved)));

        peer.publish(&Message::moved(Color::White, sq(1, 1)));
        assert_eq!(mailbox.read().unwrap().last_mover, Some(Color::White));

        drop(peer);
        assert_eq!(mailbox.attached(), 1);
    }

    #[test]
    fn waiter_wakes_on_publish_from_another_thread() {
        let mailbox = Mailbox::create(Duration::from_secs(5));
        let writer = mailbox.attach().unwrap();

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            writer.publish(&Message::moved(Color::Black, sq(3, 2)));
        });

        let message = mailbox
            .wait_until(
                "black",
                |m| m.last_mover == Some(Color::Black),
                Some(Duration::from_secs(5)),
            )
            .unwrap();

        assert_eq!(message.last_move, Some(sq(3, 2)));
        handle.join().unwrap();
    }

    #[test]
    fn bounded_wait_times_out() {
        let mailbox = Mailbox::create(POLL);

        let err = mailbox
            .wait_until("terminal", Message::is_terminal, Some(Duration::from_millis(30)))
            .unwrap_err();

        assert!(matches!(
            err,
            ProtocolError::Timeout {
                waiting_for: "terminal",
                ..
            }
        ));
    }

    #[test]
    fn abandonment_releases_waiters() {
        let mailbox = Mailbox::create(POLL);
        let peer = mailbox.attach().unwrap();

        peer.abandon(Color::White);
        peer.abandon(Color::Black);

        let err = mailbox
            .wait_until("terminal", Message::is_terminal, None)
            .unwrap_err();
        assert!(matches!(err, ProtocolError::Abandoned { by: Color::White }));
    }
}
