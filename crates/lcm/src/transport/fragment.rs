// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Fragment reassembly for oversized messages.
//!
//! Fragments of one logical message share a (sender, sequence) key. Slots
//! are created lazily when the first fragment for a key arrives, evicted on
//! inconsistency, and removed when the last pending fragment lands. The
//! store is owned exclusively by the receiver thread.

use std::collections::HashMap;
use std::net::SocketAddr;

/// Reassembly state for one in-flight fragmented message.
struct Slot {
    total_size: u32,
    channel: Option<String>,
    data: Vec<u8>,
    pending: u16,
}

/// Per-(sender, sequence) reassembly table.
pub(crate) struct FragmentStore {
    slots: HashMap<(SocketAddr, u32), Slot>,
}

impl FragmentStore {
    pub fn new() -> Self {
        Self {
            slots: HashMap::new(),
        }
    }

    /// Apply one received fragment.
    ///
    /// Returns the fully reassembled `(channel, payload)` once every
    /// fragment of the message has arrived, `None` otherwise. Inconsistent
    /// fragments (declared-size change, chunk past the declared end) drop
    /// the affected slot.
    #[allow(clippy::too_many_arguments)]
    pub fn insert(
        &mut self,
        src: SocketAddr,
        seq: u32,
        total_size: u32,
        offset: u32,
        index: u16,
        count: u16,
        channel: Option<&str>,
        chunk: &[u8],
    ) -> Option<(String, Vec<u8>)> {
        let key = (src, seq);

        let needs_new_slot = match self.slots.get(&key) {
            Some(slot) => slot.total_size != total_size,
            None => true,
        };
        if needs_new_slot {
            if self.slots.remove(&key).is_some() {
                log::debug!(
                    "[RX] evicting reassembly slot src={} seq={} (declared size changed)",
                    src,
                    seq
                );
            }
            self.slots.insert(
                key,
                Slot {
                    total_size,
                    channel: None,
                    data: vec![0u8; total_size as usize],
                    pending: count,
                },
            );
        }

        // Slot inserted above when missing
        let slot = self.slots.get_mut(&key)?;

        if index == 0 {
            if let Some(channel) = channel {
                slot.channel = Some(channel.to_string());
            }
        }

        let end = (offset as usize).checked_add(chunk.len());
        match end {
            Some(end) if end <= slot.total_size as usize => {
                slot.data[offset as usize..end].copy_from_slice(chunk);
            }
            _ => {
                log::debug!(
                    "[RX] fragment out of bounds src={} seq={} offset={} len={} total={}",
                    src,
                    seq,
                    offset,
                    chunk.len(),
                    total_size
                );
                self.slots.remove(&key);
                return None;
            }
        }

        slot.pending = slot.pending.saturating_sub(1);
        if slot.pending > 0 {
            return None;
        }

        // Complete: the slot always exists here
        let slot = self.slots.remove(&key)?;
        match slot.channel {
            Some(channel) => Some((channel, slot.data)),
            None => {
                log::debug!(
                    "[RX] dropping completed message src={} seq={} with no channel fragment",
                    src,
                    seq
                );
                None
            }
        }
    }

    /// Number of in-flight reassembly slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }
}
