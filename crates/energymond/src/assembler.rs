//! Reassembly of fragmented port energy replies.
//!
//! A switch may split a port stats reply across several messages, all
//! but the last carrying the REPLY_MORE flag. Fragments are accumulated
//! per datapath and released as one batch when the final fragment lands.
//! Entries with malformed port numbers are dropped at absorption time.

use crate::wire::PortEnergyEntry;
use energymon_types::Dpid;
use std::collections::HashMap;
use tracing::warn;

/// Accumulates port reply fragments until a batch completes.
#[derive(Default)]
pub struct ReplyAssembler {
    pending: HashMap<Dpid, Vec<PortEnergyEntry>>,
}

impl ReplyAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Absorbs one fragment. Returns the complete batch when `more` is
    /// false, `None` while fragments are still outstanding.
    pub fn absorb(
        &mut self,
        dpid: Dpid,
        entries: Vec<PortEnergyEntry>,
        more: bool,
    ) -> Option<Vec<PortEnergyEntry>> {
        let pending = self.pending.entry(dpid).or_default();
        for entry in entries {
            if entry.port().is_none() {
                warn!(%dpid, port_no = entry.port_no, "dropping entry with invalid port number");
                continue;
            }
            pending.push(entry);
        }
        if more {
            None
        } else {
            self.pending.remove(&dpid)
        }
    }

    /// Discards any partial batch for a departed switch.
    pub fn discard(&mut self, dpid: Dpid) {
        self.pending.remove(&dpid);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn entry(port_no: i32) -> PortEnergyEntry {
        PortEnergyEntry {
            port_no,
            current_consumption: 1.0f64.to_bits(),
            power_drawn: 2.0f64.to_bits(),
        }
    }

    #[test]
    fn test_single_fragment_completes_immediately() {
        let mut assembler = ReplyAssembler::new();
        let batch = assembler.absorb(Dpid::new(1), vec![entry(1), entry(2)], false);
        assert_eq!(batch, Some(vec![entry(1), entry(2)]));
    }

    #[test]
    fn test_fragments_accumulate_until_final() {
        let mut assembler = ReplyAssembler::new();
        let dpid = Dpid::new(1);
        assert_eq!(assembler.absorb(dpid, vec![entry(1)], true), None);
        assert_eq!(assembler.absorb(dpid, vec![entry(2)], true), None);
        assert_eq!(
            assembler.absorb(dpid, vec![entry(3)], false),
            Some(vec![entry(1), entry(2), entry(3)])
        );
        // Completed batches leave no residue behind.
        assert_eq!(assembler.absorb(dpid, vec![entry(9)], false), Some(vec![entry(9)]));
    }

    #[test]
    fn test_switches_assemble_independently() {
        let mut assembler = ReplyAssembler::new();
        assert_eq!(assembler.absorb(Dpid::new(1), vec![entry(1)], true), None);
        assert_eq!(
            assembler.absorb(Dpid::new(2), vec![entry(7)], false),
            Some(vec![entry(7)])
        );
        assert_eq!(
            assembler.absorb(Dpid::new(1), vec![entry(2)], false),
            Some(vec![entry(1), entry(2)])
        );
    }

    #[test]
    fn test_invalid_ports_are_filtered() {
        let mut assembler = ReplyAssembler::new();
        let batch = assembler.absorb(Dpid::new(1), vec![entry(-1), entry(4)], false);
        assert_eq!(batch, Some(vec![entry(4)]));
    }

    #[test]
    fn test_discard_drops_partial_batch() {
        let mut assembler = ReplyAssembler::new();
        let dpid = Dpid::new(1);
        assert_eq!(assembler.absorb(dpid, vec![entry(1)], true), None);
        assembler.discard(dpid);
        assert_eq!(assembler.absorb(dpid, vec![entry(2)], false), Some(vec![entry(2)]));
    }

    #[test]
    fn test_empty_final_fragment_yields_empty_batch() {
        let mut assembler = ReplyAssembler::new();
        assert_eq!(assembler.absorb(Dpid::new(1), vec![], false), Some(vec![]));
    }
}
