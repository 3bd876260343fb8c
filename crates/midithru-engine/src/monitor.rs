//! UI-side packet collection.

use std::sync::Arc;

use parking_lot::Mutex;

use midithru_midi::MidiPacket;

use crate::listener::PacketSink;

/// Collects dispatched packets for a UI thread to drain on its own schedule.
///
/// The render-side append never waits: if the UI holds the lock at dispatch
/// time, that quantum's packets are skipped. Built for the monitor role, not
/// the host output role, which must not lose events.
pub struct MidiMonitor {
    collected: Arc<Mutex<Vec<MidiPacket>>>,
}

impl MidiMonitor {
    pub fn new() -> Self {
        Self {
            collected: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// A sink feeding this monitor, suitable for the UI registration.
    pub fn sink(&self) -> PacketSink {
        let collected = Arc::clone(&self.collected);
        PacketSink::new(move |_timestamp, _bus, packets| {
            if let Some(mut buffer) = collected.try_lock() {
                buffer.extend(packets.iter().copied());
            }
        })
    }

    /// Returns and clears everything collected since the last call.
    pub fn take(&self) -> Vec<MidiPacket> {
        std::mem::take(&mut *self.collected.lock())
    }

    pub fn len(&self) -> usize {
        self.collected.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MidiMonitor {
    fn default() -> Self {
        Self::new()
    }
}
