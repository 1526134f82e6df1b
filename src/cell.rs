//! Cells sent over an onion-routing link
//!
//! A link between two adjacent nodes carries a stream of fixed-size
//! cells, each belonging to a circuit multiplexed over that link.  This
//! module implements the [`Cell`] type itself and the constants that
//! fix its size; the [`codec`] submodule handles the wire framing.

pub mod codec;

use std::num::NonZeroU32;

use caret::caret_int;

use crate::Error;

/// The amount of data carried in every cell.
///
/// This constant is a protocol version parameter, identical for every
/// cell on the wire: the protocol has no variable-length cells, and a
/// cell body is never resized.
pub const CELL_PAYLOAD_LEN: usize = 509;

/// A cell payload considered as a raw array of bytes.
pub type RawCellPayload = [u8; CELL_PAYLOAD_LEN];

/// A [`RawCellPayload`] stored on the heap.
///
/// We use this to avoid copying cell bodies around.
pub type BoxedCellPayload = Box<RawCellPayload>;

/// Link-local identifier for a circuit.
///
/// A circuit ID is unique per link, not globally.  It cannot be zero:
/// on the wire, a zero circuit ID marks a cell that belongs to the link
/// as a whole rather than to any circuit, and no such cell reaches the
/// per-circuit machinery in this crate.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub struct CircId(NonZeroU32);

impl From<NonZeroU32> for CircId {
    fn from(item: NonZeroU32) -> Self {
        Self(item)
    }
}
impl From<CircId> for u32 {
    fn from(id: CircId) -> u32 {
        id.0.get()
    }
}
impl std::fmt::Display for CircId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        self.0.fmt(f)
    }
}
impl CircId {
    /// Creates a `CircId` for non-zero `val`.
    ///
    /// Returns `None` when `val` is zero.
    pub fn new(val: u32) -> Option<Self> {
        NonZeroU32::new(val).map(Self)
    }
}

caret_int! {
    /// A CellCmd is the type of a cell.  The value of the CellCmd
    /// selects how the payload is interpreted downstream; this crate
    /// itself never interprets it.
    pub struct CellCmd(u8) {
        /// A cell that will be dropped.
        PADDING = 0,
        /// Create a new circuit (obsolete format)
        CREATE = 1,
        /// Finish circuit-creation handshake (obsolete format)
        CREATED = 2,
        /// Relay cell, transmitted over a circuit.
        RELAY = 3,
        /// Destroy a circuit
        DESTROY = 4,
        /// Create a new circuit (no public-key)
        CREATE_FAST = 5,
        /// Finish a circuit-creation handshake (no public-key)
        CREATED_FAST = 6,
        /// Finish a link handshake with time and address information
        NETINFO = 8,
        /// Relay cell, transmitted over a circuit.  Limited.
        RELAY_EARLY = 9,
        /// Create a new circuit (current format)
        CREATE2 = 10,
        /// Finish a circuit-creation handshake (current format)
        CREATED2 = 11,
        /// Adjust link-padding settings
        PADDING_NEGOTIATE = 12,
    }
}

/// A parsed onion-routing cell.
///
/// Immutable once constructed: a cell is built on receipt from the wire
/// (or locally, before sending) and is then consumed exactly once by
/// whichever path owns it.
#[derive(Debug)]
pub struct Cell {
    /// Circuit this cell belongs to on the current link.
    circid: CircId,
    /// Command tag selecting how the payload is interpreted.
    cmd: CellCmd,
    /// Cell body; always exactly [`CELL_PAYLOAD_LEN`] bytes.
    payload: BoxedCellPayload,
}

impl Cell {
    /// Construct a new cell from an already-sized payload.
    pub fn new(circid: CircId, cmd: CellCmd, payload: BoxedCellPayload) -> Self {
        Cell {
            circid,
            cmd,
            payload,
        }
    }

    /// Construct a cell from a raw payload slice.
    ///
    /// Returns [`Error::MalformedCell`] unless `payload` is exactly
    /// [`CELL_PAYLOAD_LEN`] bytes long.
    pub fn from_slice(circid: CircId, cmd: CellCmd, payload: &[u8]) -> crate::Result<Self> {
        let payload: RawCellPayload =
            payload.try_into().map_err(|_| Error::MalformedCell {
                expected: CELL_PAYLOAD_LEN,
                actual: payload.len(),
            })?;
        Ok(Cell {
            circid,
            cmd,
            payload: Box::new(payload),
        })
    }

    /// Return the circuit ID for this cell.
    pub fn circid(&self) -> CircId {
        self.circid
    }
    /// Return the command for this cell.
    pub fn cmd(&self) -> CellCmd {
        self.cmd
    }
    /// Return a reference to the body of this cell.
    pub fn payload(&self) -> &RawCellPayload {
        &self.payload
    }
    /// Consume this cell and return its body.
    pub fn into_payload(self) -> BoxedCellPayload {
        self.payload
    }
}
