//! Implementation for encoding and decoding of cells.

use super::{BoxedCellPayload, Cell, CellCmd, CircId, RawCellPayload, CELL_PAYLOAD_LEN};
use crate::Error;

use bytes::{BufMut, BytesMut};

/// The length of a cell on the wire: circuit ID, command, payload.
pub const CELL_LEN: usize = 4 + 1 + CELL_PAYLOAD_LEN;

/// This object can be used to encode and decode cells.
///
/// The implemented format is:
/// ```ignore
///     u32 circid;
///     u8 command;
///     u8 body[509];
/// ```
///
/// Every frame is exactly [`CELL_LEN`] bytes; there are no
/// variable-length cells in this protocol.
#[derive(Debug, Default)]
#[non_exhaustive]
pub struct CellCodec {}

impl CellCodec {
    /// Create a new CellCodec.
    pub fn new() -> Self {
        CellCodec {}
    }

    /// Write the given cell into the provided BytesMut object.
    ///
    /// Always appends exactly [`CELL_LEN`] bytes: the cell's payload
    /// length is fixed by construction.
    pub fn write_cell(&mut self, item: Cell, dst: &mut BytesMut) {
        let Cell {
            circid,
            cmd,
            payload,
        } = item;
        dst.reserve(CELL_LEN);
        dst.put_u32(circid.into());
        dst.put_u8(cmd.into());
        dst.put_slice(&payload[..]);
    }

    /// Try to decode a cell from the provided BytesMut object.
    ///
    /// On a definite decoding error, return Err(_).  On input that is
    /// just too short to hold a cell yet, return Ok(None) and consume
    /// nothing.
    pub fn decode_cell(&mut self, src: &mut BytesMut) -> crate::Result<Option<Cell>> {
        if src.len() < CELL_LEN {
            return Ok(None);
        }
        let frame = src.split_to(CELL_LEN).freeze();
        let circid = u32::from_be_bytes(
            frame[0..4]
                .try_into()
                .expect("four-byte slice was not four bytes!?"),
        );
        let circid = CircId::new(circid).ok_or_else(|| {
            Error::LinkProto("Received a circuit-bound cell with circuit ID zero".into())
        })?;
        let cmd: CellCmd = frame[4].into();
        let payload: BoxedCellPayload = Box::new(
            <RawCellPayload>::try_from(&frame[5..])
                .expect("fixed-size frame held a mis-sized payload!?"),
        );
        Ok(Some(Cell {
            circid,
            cmd,
            payload,
        }))
    }
}

#[cfg(test)]
mod test {
    #![allow(clippy::bool_assert_comparison)]
    #![allow(clippy::clone_on_copy)]
    #![allow(clippy::dbg_macro)]
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::unchecked_duration_subtraction)]
    #![allow(clippy::useless_vec)]
    #![allow(clippy::needless_pass_by_value)]
    use super::*;
    use assert_matches::assert_matches;
    use hex_literal::hex;

    /// Build a cell with a payload filled with `fill`.
    fn fcell(circ: u32, cmd: CellCmd, fill: u8) -> Cell {
        Cell::new(
            CircId::new(circ).unwrap(),
            cmd,
            Box::new([fill; CELL_PAYLOAD_LEN]),
        )
    }

    #[test]
    fn roundtrip() {
        let mut codec = CellCodec::new();
        let mut buf = BytesMut::new();
        codec.write_cell(fcell(0x2000_0001, CellCmd::RELAY, 0x61), &mut buf);
        assert_eq!(buf.len(), CELL_LEN);
        assert_eq!(&buf[0..5], &hex!("20000001 03")[..]);

        let cell = codec.decode_cell(&mut buf).unwrap().unwrap();
        assert_eq!(u32::from(cell.circid()), 0x2000_0001);
        assert_eq!(cell.cmd(), CellCmd::RELAY);
        assert_eq!(cell.payload()[508], 0x61);
        assert!(buf.is_empty());
    }

    #[test]
    fn truncated_input() {
        let mut codec = CellCodec::new();
        let mut buf = BytesMut::from(&hex!("20000001 03 0000")[..]);
        // Not enough bytes for a whole cell: not an error, and nothing
        // is consumed.
        assert!(codec.decode_cell(&mut buf).unwrap().is_none());
        assert_eq!(buf.len(), 7);
    }

    #[test]
    fn zero_circid() {
        let mut codec = CellCodec::new();
        let mut buf = BytesMut::new();
        buf.put_u32(0);
        buf.put_u8(CellCmd::PADDING.into());
        buf.put_slice(&[0_u8; CELL_PAYLOAD_LEN]);
        assert_matches!(codec.decode_cell(&mut buf), Err(Error::LinkProto(_)));
    }

    #[test]
    fn two_cells_in_one_buffer() {
        let mut codec = CellCodec::new();
        let mut buf = BytesMut::new();
        codec.write_cell(fcell(1, CellCmd::CREATE2, 1), &mut buf);
        codec.write_cell(fcell(2, CellCmd::CREATED2, 2), &mut buf);

        let first = codec.decode_cell(&mut buf).unwrap().unwrap();
        let second = codec.decode_cell(&mut buf).unwrap().unwrap();
        assert_eq!(u32::from(first.circid()), 1);
        assert_eq!(second.cmd(), CellCmd::CREATED2);
        assert!(codec.decode_cell(&mut buf).unwrap().is_none());
    }
}
