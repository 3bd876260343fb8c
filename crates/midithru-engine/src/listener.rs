//! Listener registration slots, read lock-free on the render thread.

use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwapOption;

use midithru_midi::PacketList;

use crate::unit::RenderTimeStamp;

/// A registered packet consumer: the callback plus whatever context it
/// captured. The engine never manages the target's lifetime beyond holding
/// this handle.
pub struct PacketSink {
    handler: Box<dyn Fn(&RenderTimeStamp, u32, &PacketList) + Send + Sync>,
}

impl PacketSink {
    pub fn new(
        handler: impl Fn(&RenderTimeStamp, u32, &PacketList) + Send + Sync + 'static,
    ) -> Self {
        Self {
            handler: Box::new(handler),
        }
    }

    #[inline]
    pub fn call(&self, timestamp: &RenderTimeStamp, bus: u32, packets: &PacketList) {
        (self.handler)(timestamp, bus, packets)
    }
}

impl fmt::Debug for PacketSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PacketSink")
    }
}

/// One optionally-set listener registration.
///
/// Configuration calls swap the whole registration in or out; the render
/// thread loads it without waiting and sees either the old or the new sink,
/// never a torn one.
pub struct ListenerSlot {
    sink: ArcSwapOption<PacketSink>,
}

impl ListenerSlot {
    pub fn new() -> Self {
        Self {
            sink: ArcSwapOption::empty(),
        }
    }

    pub fn set(&self, sink: PacketSink) {
        self.sink.store(Some(Arc::new(sink)));
    }

    pub fn clear(&self) {
        self.sink.store(None);
    }

    pub fn is_set(&self) -> bool {
        self.sink.load().is_some()
    }

    /// Invokes the registered sink, if any. Render-thread safe: no lock, no
    /// allocation.
    #[inline]
    pub fn dispatch(&self, timestamp: &RenderTimeStamp, bus: u32, packets: &PacketList) {
        let guard = self.sink.load();
        if let Some(sink) = guard.as_ref() {
            sink.call(timestamp, bus, packets);
        }
    }
}

impl Default for ListenerSlot {
    fn default() -> Self {
        Self::new()
    }
}
