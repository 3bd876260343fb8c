//! Engine-side half of the host's property protocol.

use crate::listener::PacketSink;

/// Name advertised for the engine's single MIDI output.
pub const MIDI_OUTPUT_NAME: &str = "MIDIThruOut";

/// Property keys the engine answers for, with the numeric ids the host
/// protocol uses for them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum PropertyKey {
    /// Names of the MIDI outputs the engine exposes. Read-only.
    MidiOutputCallbackInfo = 47,
    /// Host output listener registration. Write-only.
    MidiOutputCallback = 48,
    /// UI monitor listener registration. Write-only, custom id.
    UiMonitorCallback = 64056,
}

impl PropertyKey {
    pub fn from_id(id: u32) -> Option<Self> {
        match id {
            47 => Some(PropertyKey::MidiOutputCallbackInfo),
            48 => Some(PropertyKey::MidiOutputCallback),
            64056 => Some(PropertyKey::UiMonitorCallback),
            _ => None,
        }
    }

    #[inline]
    pub fn id(self) -> u32 {
        self as u32
    }
}

/// Values crossing the property surface.
#[derive(Debug)]
pub enum PropertyValue {
    /// Output name list, answered for [`PropertyKey::MidiOutputCallbackInfo`].
    Names(Vec<String>),
    /// A listener registration, accepted for the two callback keys.
    Callback(PacketSink),
}
