//! Buffer cells that arrive before their turn, and release them in order.
//!
//! Sequence numbers are assigned by the sender, one per cell, and
//! establish the order in which a circuit's cells must be processed.
//! The network is free to deliver them in any order; a
//! [`ReorderBuffer`] sits between the transport demultiplexer and the
//! dispatch path and repairs the order, holding at most a bounded
//! number of early arrivals.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use derive_more::Display;
use smallvec::{smallvec, SmallVec};
use tracing::trace;

use crate::cell::Cell;
use crate::Error;

/// Cells released by a single call to [`ReorderBuffer::submit`].
///
/// Usually one cell; more when an arrival closes a gap and unblocks
/// buffered entries behind it.
pub type Released = SmallVec<[Cell; 4]>;

/// A cell that has arrived before all cells with lower sequence numbers
/// on its circuit.
///
/// An `EarlyCell` exists only while its sequence number is above the
/// buffer's release cursor; once the gap below it closes, the wrapper
/// is discarded and the bare [`Cell`] moves on to dispatch.  Until
/// then, the buffer owns it exclusively.
#[derive(Debug)]
pub struct EarlyCell {
    /// The cell being held.
    cell: Cell,
    /// The position this cell occupies in the circuit's cell stream.
    seqno: u64,
    /// When this cell was accepted into the buffer.
    queued_at: Instant,
}

impl EarlyCell {
    /// Return the sequence number the held cell is waiting on.
    pub fn seqno(&self) -> u64 {
        self.seqno
    }
    /// Return the time at which the held cell entered the buffer.
    pub fn queued_at(&self) -> Instant {
        self.queued_at
    }
    /// Return a reference to the held cell.
    pub fn cell(&self) -> &Cell {
        &self.cell
    }
    /// Discard the wrapper and take ownership of the held cell.
    pub fn into_cell(self) -> Cell {
        self.cell
    }
}

/// A report that a circuit's cell stream has stopped making progress.
///
/// Not an error: the buffer takes no action on a stall beyond reporting
/// it.  Whether a stalled circuit gets torn down is caller policy.
#[derive(Debug, Clone, Display)]
#[display("no cell {missing} after {waited:?}; {pending} cells queued behind it")]
#[non_exhaustive]
pub struct Stalled {
    /// The sequence number the circuit is blocked on.
    pub missing: u64,
    /// How long the longest-waiting pending cell has been held.
    pub waited: Duration,
    /// How many cells are held pending behind the gap.
    pub pending: usize,
}

/// A bounded buffer that releases one circuit's cells in strict
/// sequence-number order.
///
/// The buffer tracks the lowest sequence number not yet released.  A
/// submitted cell at exactly that position is released at once, along
/// with any buffered cells that have become contiguous behind it; a
/// cell above it is held (up to `capacity` entries); a cell below it
/// has already been delivered and is refused.
///
/// Sequence numbers are a per-circuit `u64` counter and are treated as
/// never wrapping: the transport is expected to renegotiate the circuit
/// (and [`reset`](ReorderBuffer::reset) this buffer) long before the
/// space could be exhausted.
#[derive(Debug)]
pub struct ReorderBuffer {
    /// The lowest sequence number not yet released.
    next_expected: u64,
    /// The configured start of the sequence space, restored by `reset`.
    first_seqno: u64,
    /// Cells holding sequence numbers above `next_expected`, keyed by
    /// sequence number.
    pending: BTreeMap<u64, EarlyCell>,
    /// Maximum number of pending entries.
    ///
    /// Enforced before insertion, so a peer choosing adversarial
    /// sequence numbers cannot grow memory past this bound.
    capacity: usize,
    /// How long the oldest pending entry may wait before the buffer
    /// reports the circuit as stalled.
    stall_timeout: Duration,
}

impl ReorderBuffer {
    /// Create a new buffer whose sequence space starts at 0.
    pub fn new(capacity: usize, stall_timeout: Duration) -> Self {
        ReorderBuffer {
            next_expected: 0,
            first_seqno: 0,
            pending: BTreeMap::new(),
            capacity,
            stall_timeout,
        }
    }

    /// Configure this buffer to start its sequence space at `seqno`.
    pub fn with_first_seqno(mut self, seqno: u64) -> Self {
        self.first_seqno = seqno;
        self.next_expected = seqno;
        self
    }

    /// Accept a cell tagged with its sequence number, and return every
    /// cell that is now deliverable, in order.
    ///
    /// `now` is used to timestamp buffered entries for the stall check;
    /// this function never reads a clock and never waits.
    ///
    /// On error the buffer's state is unchanged: the submitted cell is
    /// dropped (stale, duplicate) or refused (full), never half-kept.
    pub fn submit(&mut self, cell: Cell, seqno: u64, now: Instant) -> crate::Result<Released> {
        use std::cmp::Ordering::*;
        match seqno.cmp(&self.next_expected) {
            Less => Err(Error::StaleSequence {
                seqno,
                next_expected: self.next_expected,
            }),
            Greater => {
                if self.pending.contains_key(&seqno) {
                    return Err(Error::DuplicateSequence(seqno));
                }
                if self.pending.len() >= self.capacity {
                    return Err(Error::BufferFull {
                        capacity: self.capacity,
                    });
                }
                trace!(
                    "buffering early cell {} while waiting for cell {}",
                    seqno,
                    self.next_expected
                );
                self.pending.insert(
                    seqno,
                    EarlyCell {
                        cell,
                        seqno,
                        queued_at: now,
                    },
                );
                Ok(SmallVec::new())
            }
            Equal => {
                let mut released: Released = smallvec![cell];
                self.next_expected += 1;
                // The gap has closed; drain everything contiguous.
                while let Some(early) = self.pending.remove(&self.next_expected) {
                    released.push(early.into_cell());
                    self.next_expected += 1;
                }
                Ok(released)
            }
        }
    }

    /// Report whether this circuit has stalled as of `now`.
    ///
    /// A circuit is stalled when its longest-waiting pending cell has
    /// been held for at least the configured timeout without the gap
    /// below it closing.  Purely observational: the pending cells stay
    /// where they are, and the caller decides whether to tear the
    /// circuit down.
    pub fn check_stalled(&self, now: Instant) -> Option<Stalled> {
        let oldest = self.pending.values().map(|e| e.queued_at).min()?;
        let waited = now.saturating_duration_since(oldest);
        (waited >= self.stall_timeout).then(|| Stalled {
            missing: self.next_expected,
            waited,
            pending: self.pending.len(),
        })
    }

    /// Clear all pending state, returning the release cursor to its
    /// configured initial value.
    ///
    /// Used when a circuit is torn down or its sequence space is
    /// renegotiated.  Ownership of any still-pending cells passes back
    /// to the caller (in ascending sequence order) for explicit
    /// disposal, so loss can be logged and accounted for rather than
    /// silent.
    pub fn reset(&mut self) -> Vec<EarlyCell> {
        self.next_expected = self.first_seqno;
        std::mem::take(&mut self.pending).into_values().collect()
    }

    /// Return the lowest sequence number not yet released.
    pub fn next_expected(&self) -> u64 {
        self.next_expected
    }
    /// Return the number of cells currently held pending.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
    /// Return true if no cells are held pending.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
    /// Return the maximum number of pending entries.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
