//! Real-time MIDI pass-through engine.
//!
//! Accepts MIDI events from the host's delivery context, re-emits them
//! time-stamped during the next audio render quantum, and fans the packet
//! list out to a host output callback and a UI monitor callback. The two
//! paths meet only at a lock-free SPSC queue, so the render side never
//! blocks, allocates, or waits on the ingestion side.

pub mod error;
pub use error::{Error, Result};

pub(crate) mod config;
pub use config::{EngineConfig, DEFAULT_QUEUE_CAPACITY, MIN_PACKET_BUDGET};

pub(crate) mod engine;
pub use engine::{EngineBuilder, MidiThruEngine};

pub(crate) mod listener;
pub use listener::{ListenerSlot, PacketSink};

pub(crate) mod monitor;
pub use monitor::MidiMonitor;

pub(crate) mod properties;
pub use properties::{PropertyKey, PropertyValue, MIDI_OUTPUT_NAME};

pub(crate) mod unit;
pub use unit::{AudioUnit, RenderTimeStamp};

pub use midithru_midi::{
    message_len, Channel, ChannelVoiceMsg, EventFifo, MidiEvent, MidiPacket, PacketList,
    RawMidiEvent, PACKET_LIST_SIZE,
};
