//! Render-scoped packet list bounded by a fixed byte budget.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use thiserror::Error;

use crate::event::RawMidiEvent;

/// Default byte budget for one render quantum's packet list.
pub const PACKET_LIST_SIZE: usize = 2048;

/// Wire bytes for the list header (packet count).
pub const LIST_HEADER_BYTES: usize = 4;
/// Wire bytes for per-packet framing (timestamp + length).
pub const PACKET_HEADER_BYTES: usize = 10;

/// Packets held inline before the list would spill to the heap. Sized so a
/// default-budget list can never spill; only budgets above the default can
/// make an append allocate.
const INLINE_PACKETS: usize = (PACKET_LIST_SIZE - LIST_HEADER_BYTES) / (PACKET_HEADER_BYTES + 2);

#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("target buffer holds {available} bytes, list needs {needed}")]
    BufferTooSmall { needed: usize, available: usize },
}

/// One serialized MIDI message with its delivery timestamp.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MidiPacket {
    pub timestamp: u64,
    pub data: [u8; 3],
    /// Valid bytes in `data` (2-3).
    pub len: u8,
}

impl MidiPacket {
    /// Stamps a queued event with its delivery time. The event's ingestion
    /// offset is discarded here; position in the list carries the ordering.
    #[inline]
    pub fn from_event(event: &RawMidiEvent, timestamp: u64) -> Self {
        Self {
            timestamp,
            data: event.data,
            len: event.len,
        }
    }

    #[inline]
    pub fn bytes(&self) -> &[u8] {
        &self.data[..self.len as usize]
    }

    #[inline]
    fn wire_size(&self) -> usize {
        PACKET_HEADER_BYTES + self.len as usize
    }
}

/// Ordered packet container for one render quantum.
///
/// Appends are refused once the byte budget is reached; the caller decides
/// what to do with events that did not fit.
#[derive(Clone, Debug)]
pub struct PacketList {
    packets: SmallVec<[MidiPacket; INLINE_PACKETS]>,
    budget: usize,
    used: usize,
}

impl PacketList {
    #[inline]
    pub fn new() -> Self {
        Self::with_budget(PACKET_LIST_SIZE)
    }

    #[inline]
    pub fn with_budget(budget: usize) -> Self {
        Self {
            packets: SmallVec::new(),
            budget,
            used: LIST_HEADER_BYTES,
        }
    }

    /// Whether a packet of `len` content bytes still fits the budget.
    #[inline]
    pub fn can_append(&self, len: u8) -> bool {
        self.used + PACKET_HEADER_BYTES + len as usize <= self.budget
    }

    /// Appends a packet, refusing (and leaving the list unchanged) when the
    /// budget has no room for it.
    pub fn push(&mut self, packet: MidiPacket) -> bool {
        if !self.can_append(packet.len) {
            return false;
        }
        self.used += packet.wire_size();
        self.packets.push(packet);
        true
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.packets.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }

    /// Wire size of the encoded list, header included.
    #[inline]
    pub fn byte_size(&self) -> usize {
        self.used
    }

    #[inline]
    pub fn budget(&self) -> usize {
        self.budget
    }

    #[inline]
    pub fn as_slice(&self) -> &[MidiPacket] {
        &self.packets
    }

    #[inline]
    pub fn iter(&self) -> core::slice::Iter<'_, MidiPacket> {
        self.packets.iter()
    }

    pub fn clear(&mut self) {
        self.packets.clear();
        self.used = LIST_HEADER_BYTES;
    }

    /// Encodes the list into `buf`: little-endian `u32` packet count, then
    /// per packet a little-endian `u64` timestamp, `u16` length, and the
    /// content bytes. Returns the number of bytes written.
    pub fn encode_into(&self, buf: &mut [u8]) -> Result<usize, EncodeError> {
        if buf.len() < self.used {
            return Err(EncodeError::BufferTooSmall {
                needed: self.used,
                available: buf.len(),
            });
        }
        buf[..4].copy_from_slice(&(self.packets.len() as u32).to_le_bytes());
        let mut at = LIST_HEADER_BYTES;
        for packet in &self.packets {
            buf[at..at + 8].copy_from_slice(&packet.timestamp.to_le_bytes());
            buf[at + 8..at + 10].copy_from_slice(&u16::from(packet.len).to_le_bytes());
            let end = at + PACKET_HEADER_BYTES + packet.len as usize;
            buf[at + PACKET_HEADER_BYTES..end].copy_from_slice(packet.bytes());
            at = end;
        }
        Ok(at)
    }
}

impl Default for PacketList {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> IntoIterator for &'a PacketList {
    type Item = &'a MidiPacket;
    type IntoIter = core::slice::Iter<'a, MidiPacket>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
