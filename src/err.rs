//! Define an error type for the onion-wire crate.
use thiserror::Error;

use crate::cell::CircId;

/// An error type for the onion-wire crate.
///
/// Every variant here is recoverable at the scope of a single circuit:
/// the caller may tear the offending circuit down, but nothing in this
/// crate is fatal to the process or to other circuits on the link.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum Error {
    /// Raw input for a cell did not carry the constant payload length
    /// required by the wire format.
    ///
    /// The frame must be rejected; it is never buffered.
    #[error("Malformed cell: payload was {actual} bytes, expected {expected}")]
    MalformedCell {
        /// The payload length the wire format requires.
        expected: usize,
        /// The payload length the input actually carried.
        actual: usize,
    },
    /// Protocol violation at the link level.
    #[error("Link protocol violation: {0}")]
    LinkProto(String),
    /// A cell arrived for a circuit ID with no live circuit.
    #[error("No such circuit: {0}")]
    UnknownCircuit(CircId),
    /// A second cell arrived carrying a sequence number that is already
    /// held pending.
    ///
    /// Two cells can never legitimately share a sequence number on one
    /// circuit, so this is a protocol violation (replay or resend); the
    /// caller decides the circuit's fate.
    #[error("Duplicate sequence number {0} on circuit")]
    DuplicateSequence(u64),
    /// A cell arrived with a sequence number below the release cursor.
    ///
    /// The position was already delivered; the cell is discarded, not
    /// buffered.  Non-fatal.
    #[error("Stale sequence number {seqno} (next expected is {next_expected})")]
    StaleSequence {
        /// The sequence number the late cell carried.
        seqno: u64,
        /// The lowest sequence number not yet released.
        next_expected: u64,
    },
    /// Buffering one more early cell would exceed the circuit's pending
    /// capacity.
    ///
    /// The buffer never evicts or overwrites; the caller must apply
    /// backpressure or abort the circuit.
    #[error("Reorder buffer full ({capacity} cells pending)")]
    BufferFull {
        /// The configured pending-entry limit.
        capacity: usize,
    },
}
