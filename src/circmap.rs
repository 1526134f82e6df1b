//! Types and code to map circuit IDs to reorder buffers.

use std::collections::{hash_map::Entry, HashMap};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::cell::{Cell, CircId};
use crate::reorder::{EarlyCell, Released, ReorderBuffer, Stalled};
use crate::Error;

/// A map from circuit IDs to independent per-circuit reorder buffers.
///
/// Each live circuit on a link gets its own [`ReorderBuffer`]; nothing
/// is shared between them, so one circuit's protocol violations and
/// resource limits never touch its siblings.  Tearing a circuit down is
/// a plain remove-and-dispose, not a scan.
#[derive(Debug)]
pub struct CircMap {
    /// The buffers themselves, keyed by circuit ID.
    map: HashMap<CircId, ReorderBuffer>,
    /// Pending-entry limit handed to each new circuit's buffer.
    capacity: usize,
    /// Stall timeout handed to each new circuit's buffer.
    stall_timeout: Duration,
}

impl CircMap {
    /// Create a new (empty) CircMap.
    ///
    /// Every circuit added later gets a buffer bounded by `capacity`
    /// pending cells and a stall threshold of `stall_timeout`.
    pub fn new(capacity: usize, stall_timeout: Duration) -> Self {
        CircMap {
            map: HashMap::new(),
            capacity,
            stall_timeout,
        }
    }

    /// Start tracking a circuit, with its sequence space at 0.
    ///
    /// Returns [`Error::LinkProto`] if the ID is already in use: circuit
    /// ID reuse without a teardown is a link-level protocol violation.
    pub fn add_circuit(&mut self, id: CircId) -> crate::Result<()> {
        match self.map.entry(id) {
            Entry::Occupied(_) => Err(Error::LinkProto(format!(
                "Circuit ID {} is already in use",
                id
            ))),
            Entry::Vacant(ent) => {
                debug!("added circuit {}", id);
                ent.insert(ReorderBuffer::new(self.capacity, self.stall_timeout));
                Ok(())
            }
        }
    }

    /// Route a cell to its circuit's buffer, returning every cell of
    /// that circuit that is now deliverable, in order.
    ///
    /// The circuit is taken from the cell itself; a cell for an ID we
    /// are not tracking yields [`Error::UnknownCircuit`].
    pub fn submit(&mut self, cell: Cell, seqno: u64, now: Instant) -> crate::Result<Released> {
        let id = cell.circid();
        let buffer = self.map.get_mut(&id).ok_or(Error::UnknownCircuit(id))?;
        buffer.submit(cell, seqno, now)
    }

    /// Stop tracking a circuit, handing back any cells it still held.
    ///
    /// Returns `None` if the ID was not being tracked.  The returned
    /// cells (ascending sequence order) are the caller's to log and
    /// dispose of.
    pub fn remove_circuit(&mut self, id: CircId) -> Option<Vec<EarlyCell>> {
        let mut buffer = self.map.remove(&id)?;
        let orphans = buffer.reset();
        debug!(
            "removed circuit {}; {} early cells returned for disposal",
            id,
            orphans.len()
        );
        Some(orphans)
    }

    /// Return a reference to one circuit's buffer, if it is tracked.
    pub fn buffer(&self, id: CircId) -> Option<&ReorderBuffer> {
        self.map.get(&id)
    }

    /// Sweep every circuit for stalls as of `now`.
    ///
    /// Reports each circuit whose oldest pending cell has exceeded the
    /// stall timeout.  Caller policy decides what (if anything) to tear
    /// down; this map takes no action of its own.
    pub fn check_stalled(&self, now: Instant) -> Vec<(CircId, Stalled)> {
        self.map
            .iter()
            .filter_map(|(id, buffer)| buffer.check_stalled(now).map(|s| (*id, s)))
            .collect()
    }

    /// Return the number of circuits being tracked.
    pub fn len(&self) -> usize {
        self.map.len()
    }
    /// Return true if no circuits are being tracked.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
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
    use crate::cell::{CellCmd, CELL_PAYLOAD_LEN};
    use assert_matches::assert_matches;

    /// A test cell for circuit `circ` whose payload marks `seq`.
    fn cell(circ: u32, seq: u64) -> Cell {
        let mut body = [0_u8; CELL_PAYLOAD_LEN];
        body[0] = seq as u8;
        Cell::new(CircId::new(circ).unwrap(), CellCmd::RELAY, Box::new(body))
    }

    /// Shorthand: a CircId that is known to be valid.
    fn id(circ: u32) -> CircId {
        CircId::new(circ).unwrap()
    }

    #[test]
    fn add_remove() {
        let mut map = CircMap::new(4, Duration::from_secs(60));
        assert!(map.is_empty());
        map.add_circuit(id(1)).unwrap();
        map.add_circuit(id(2)).unwrap();
        assert_eq!(map.len(), 2);
        assert_matches!(map.add_circuit(id(1)), Err(Error::LinkProto(_)));

        assert_eq!(map.remove_circuit(id(1)).unwrap().len(), 0);
        assert!(map.remove_circuit(id(1)).is_none());
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn routes_by_cell_circid() {
        let now = Instant::now();
        let mut map = CircMap::new(4, Duration::from_secs(60));
        map.add_circuit(id(1)).unwrap();
        map.add_circuit(id(2)).unwrap();

        // Interleave two circuits; each keeps its own cursor.
        assert!(map.submit(cell(1, 1), 1, now).unwrap().is_empty());
        assert_eq!(map.submit(cell(2, 0), 0, now).unwrap().len(), 1);
        let out = map.submit(cell(1, 0), 0, now).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(map.buffer(id(1)).unwrap().next_expected(), 2);
        assert_eq!(map.buffer(id(2)).unwrap().next_expected(), 1);

        assert_matches!(
            map.submit(cell(9, 0), 0, now),
            Err(Error::UnknownCircuit(_))
        );
    }

    #[test]
    fn circuits_are_isolated() {
        let now = Instant::now();
        let mut map = CircMap::new(1, Duration::from_secs(60));
        map.add_circuit(id(1)).unwrap();
        map.add_circuit(id(2)).unwrap();

        map.submit(cell(1, 5), 5, now).unwrap();
        assert_matches!(
            map.submit(cell(1, 6), 6, now),
            Err(Error::BufferFull { capacity: 1 })
        );

        // Circuit 2 is untouched by circuit 1's misbehavior.
        assert_eq!(map.submit(cell(2, 0), 0, now).unwrap().len(), 1);
        assert_eq!(map.buffer(id(1)).unwrap().pending_len(), 1);
    }

    #[test]
    fn teardown_returns_orphans() {
        let now = Instant::now();
        let mut map = CircMap::new(4, Duration::from_secs(60));
        map.add_circuit(id(1)).unwrap();
        map.submit(cell(1, 2), 2, now).unwrap();
        map.submit(cell(1, 7), 7, now).unwrap();

        let orphans = map.remove_circuit(id(1)).unwrap();
        let seqnos: Vec<u64> = orphans.iter().map(EarlyCell::seqno).collect();
        assert_eq!(seqnos, vec![2, 7]);
        assert!(map.is_empty());
    }

    #[test]
    fn stall_sweep() {
        let t0 = Instant::now();
        let timeout = Duration::from_secs(10);
        let mut map = CircMap::new(4, timeout);
        map.add_circuit(id(1)).unwrap();
        map.add_circuit(id(2)).unwrap();

        map.submit(cell(1, 3), 3, t0).unwrap();
        map.submit(cell(2, 0), 0, t0).unwrap(); // in order, nothing pending

        assert!(map.check_stalled(t0).is_empty());
        let stalls = map.check_stalled(t0 + timeout);
        assert_eq!(stalls.len(), 1);
        assert_eq!(stalls[0].0, id(1));
        assert_eq!(stalls[0].1.missing, 0);
    }
}
