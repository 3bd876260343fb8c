//! MIDI pass-through data layer.
//!
//! Event records, the bounded packet list they are serialized into, and the
//! lock-free SPSC queue that carries them from ingestion to the render drain.

pub(crate) mod event;
pub use event::{message_len, MidiEvent, RawMidiEvent};

pub(crate) mod fifo;
pub use fifo::{EventFifo, ReadSlot, WriteSlot};

pub(crate) mod packet;
pub use packet::{
    EncodeError, MidiPacket, PacketList, LIST_HEADER_BYTES, PACKET_HEADER_BYTES, PACKET_LIST_SIZE,
};

pub use midi_msg::{Channel, ChannelVoiceMsg};
