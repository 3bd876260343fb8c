//! The host-framework seam: hooks a plugin unit exposes to its host.

use crate::error::Result;
use crate::properties::{PropertyKey, PropertyValue};

/// Time reference for one render quantum, as supplied by the host.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RenderTimeStamp {
    /// Running sample position of the quantum's first frame.
    pub sample_time: f64,
    /// Opaque host clock reference for the quantum. Every packet drained in
    /// the quantum carries this value.
    pub host_time: u64,
}

impl RenderTimeStamp {
    #[inline]
    pub fn new(sample_time: f64, host_time: u64) -> Self {
        Self {
            sample_time,
            host_time,
        }
    }

    #[inline]
    pub fn with_host_time(host_time: u64) -> Self {
        Self {
            sample_time: 0.0,
            host_time,
        }
    }
}

/// Capability hooks the host framework drives on a plugin unit: property
/// traffic, rendering, and event ingestion. One concrete engine type
/// implements all three; the host's ABI glue talks to this trait.
pub trait AudioUnit {
    fn get_property(&self, key: PropertyKey) -> Result<PropertyValue>;

    fn set_property(&self, key: PropertyKey, value: PropertyValue) -> Result<()>;

    /// One render quantum. `output` channels are zero-filled; `action_flags`
    /// pass through opaquely from the host.
    fn render(
        &self,
        action_flags: u32,
        timestamp: &RenderTimeStamp,
        frame_count: u32,
        output: &mut [&mut [f32]],
    ) -> Result<()>;

    /// One discrete MIDI event from the host's delivery context.
    fn handle_midi_event(
        &self,
        status: u8,
        channel: u8,
        data1: u8,
        data2: u8,
        offset_sample_frame: u32,
    ) -> Result<()>;
}
