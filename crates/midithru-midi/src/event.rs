//! MIDI event records and typed channel-voice constructors.

use midi_msg::{Channel, ChannelVoiceMsg, MidiMsg};
use serde::{Deserialize, Serialize};

/// Number of bytes a channel-voice message occupies on the wire: 2 for
/// program change and channel pressure, 3 for everything else.
#[inline]
pub fn message_len(status: u8) -> u8 {
    match status & 0xF0 {
        0xC0 | 0xD0 => 2,
        _ => 3,
    }
}

/// One MIDI message as it moves through the event queue.
///
/// `timestamp` holds the intra-block sample offset at ingestion; the render
/// drain replaces it with the quantum's host time before the event reaches
/// any listener.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawMidiEvent {
    pub timestamp: u64,
    pub data: [u8; 3],
    /// Valid bytes in `data` (2-3).
    pub len: u8,
}

impl RawMidiEvent {
    #[inline]
    pub fn new(timestamp: u64, data: [u8; 3], len: u8) -> Self {
        Self {
            timestamp,
            data,
            len,
        }
    }

    /// Builds a record from the host's discrete event arguments: status and
    /// channel are combined into one byte, length follows the message type,
    /// and the unused data byte of a 2-byte message stays zero.
    #[inline]
    pub fn from_parts(status: u8, channel: u8, data1: u8, data2: u8, offset: u32) -> Self {
        let len = message_len(status);
        let mut data = [0u8; 3];
        data[0] = status | channel;
        data[1] = data1;
        if len == 3 {
            data[2] = data2;
        }
        Self {
            timestamp: u64::from(offset),
            data,
            len,
        }
    }

    #[inline]
    pub fn status(&self) -> u8 {
        self.data[0] & 0xF0
    }

    #[inline]
    pub fn channel(&self) -> u8 {
        self.data[0] & 0x0F
    }

    #[inline]
    pub fn bytes(&self) -> &[u8] {
        &self.data[..self.len as usize]
    }
}

/// Parsed channel-voice event for callers that build messages by name
/// rather than by raw bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MidiEvent {
    pub channel: Channel,
    pub msg: ChannelVoiceMsg,
}

impl MidiEvent {
    #[inline]
    pub fn new(channel: Channel, msg: ChannelVoiceMsg) -> Self {
        Self { channel, msg }
    }

    #[inline]
    pub fn note_on(channel: u8, note: u8, velocity: u8) -> Self {
        Self {
            channel: Channel::from_u8(channel),
            msg: ChannelVoiceMsg::NoteOn { note, velocity },
        }
    }

    #[inline]
    pub fn note_off(channel: u8, note: u8, velocity: u8) -> Self {
        Self {
            channel: Channel::from_u8(channel),
            msg: ChannelVoiceMsg::NoteOff { note, velocity },
        }
    }

    #[inline]
    pub fn control_change(channel: u8, control: u8, value: u8) -> Self {
        Self {
            channel: Channel::from_u8(channel),
            msg: ChannelVoiceMsg::ControlChange {
                control: midi_msg::ControlChange::CC { control, value },
            },
        }
    }

    #[inline]
    pub fn program_change(channel: u8, program: u8) -> Self {
        Self {
            channel: Channel::from_u8(channel),
            msg: ChannelVoiceMsg::ProgramChange { program },
        }
    }

    #[inline]
    pub fn channel_pressure(channel: u8, pressure: u8) -> Self {
        Self {
            channel: Channel::from_u8(channel),
            msg: ChannelVoiceMsg::ChannelPressure { pressure },
        }
    }

    #[inline]
    pub fn pitch_bend(channel: u8, bend: u16) -> Self {
        Self {
            channel: Channel::from_u8(channel),
            msg: ChannelVoiceMsg::PitchBend { bend },
        }
    }

    #[inline]
    pub fn channel_num(&self) -> u8 {
        self.channel as u8
    }

    #[inline]
    pub fn to_midi_msg(&self) -> MidiMsg {
        MidiMsg::ChannelVoice {
            channel: self.channel,
            msg: self.msg,
        }
    }

    /// Serializes to a queue record with the given sample offset. Returns
    /// `None` for messages that do not fit the 3-byte record (high-res
    /// variants).
    pub fn to_raw(&self, offset: u32) -> Option<RawMidiEvent> {
        let bytes = self.to_midi_msg().to_midi();
        if !(2..=3).contains(&bytes.len()) {
            return None;
        }
        let mut data = [0u8; 3];
        data[..bytes.len()].copy_from_slice(&bytes);
        Some(RawMidiEvent::new(u64::from(offset), data, bytes.len() as u8))
    }
}
