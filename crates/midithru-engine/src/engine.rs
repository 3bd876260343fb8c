//! The pass-through engine: event ingestion, render-time drain, dispatch.

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info};

use midithru_midi::{EventFifo, MidiEvent, MidiPacket, PacketList, RawMidiEvent};

use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::listener::{ListenerSlot, PacketSink};
use crate::properties::{PropertyKey, PropertyValue, MIDI_OUTPUT_NAME};
use crate::unit::{AudioUnit, RenderTimeStamp};

/// Builder for [`MidiThruEngine`].
pub struct EngineBuilder {
    config: EngineConfig,
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
        }
    }

    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.config.queue_capacity = capacity;
        self
    }

    pub fn packet_budget(mut self, budget: usize) -> Self {
        self.config.packet_budget = budget;
        self
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<MidiThruEngine> {
        self.config.validate()?;
        debug!(
            "Building MIDI pass-through engine: {} queue slots, {} byte packet budget",
            self.config.queue_capacity, self.config.packet_budget
        );
        Ok(MidiThruEngine {
            fifo: EventFifo::with_capacity(self.config.queue_capacity),
            output: ListenerSlot::new(),
            monitor: ListenerSlot::new(),
            initialized: AtomicBool::new(false),
            config: self.config,
        })
    }
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Real-time MIDI pass-through engine.
///
/// Events arrive through [`handle_midi_event`](Self::handle_midi_event) on
/// the host's delivery context and leave through
/// [`render`](Self::render) on the audio thread, stamped with the render
/// quantum's host time and fanned out to the registered listeners. The two
/// paths share nothing but the internal SPSC queue.
pub struct MidiThruEngine {
    fifo: EventFifo,
    output: ListenerSlot,
    monitor: ListenerSlot,
    initialized: AtomicBool,
    config: EngineConfig,
}

impl MidiThruEngine {
    /// Version reported to hosts.
    pub const VERSION: u32 = 0x0001_0002;

    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    pub fn with_config(config: EngineConfig) -> Result<Self> {
        Self::builder().config(config).build()
    }

    #[inline]
    pub fn version(&self) -> u32 {
        Self::VERSION
    }

    #[inline]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Marks setup complete; ingestion and render accept calls from here on.
    pub fn initialize(&self) {
        self.initialized.store(true, Ordering::Release);
        info!("MIDI pass-through engine initialized");
    }

    pub fn uninitialize(&self) {
        self.initialized.store(false, Ordering::Release);
        info!("MIDI pass-through engine uninitialized");
    }

    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Events currently waiting for the next render drain.
    #[inline]
    pub fn pending_events(&self) -> usize {
        self.fifo.len()
    }

    /// Accepts one discrete MIDI event from the host's delivery context.
    ///
    /// Status and channel are combined into one status byte, the record
    /// length follows the message type, and the block-relative sample offset
    /// becomes the provisional timestamp. When the queue is full the event
    /// is dropped and `QueueFull` returned; nothing is buffered or retried.
    pub fn handle_midi_event(
        &self,
        status: u8,
        channel: u8,
        data1: u8,
        data2: u8,
        offset_sample_frame: u32,
    ) -> Result<()> {
        self.enqueue(RawMidiEvent::from_parts(
            status,
            channel,
            data1,
            data2,
            offset_sample_frame,
        ))
    }

    /// Typed convenience over [`handle_midi_event`](Self::handle_midi_event).
    pub fn handle_midi_msg(&self, event: MidiEvent, offset_sample_frame: u32) -> Result<()> {
        let raw = event
            .to_raw(offset_sample_frame)
            .ok_or(Error::UnsupportedMessage)?;
        self.enqueue(raw)
    }

    fn enqueue(&self, event: RawMidiEvent) -> Result<()> {
        if !self.is_initialized() {
            return Err(Error::NotInitialized);
        }
        match self.fifo.try_write() {
            Some(mut slot) => {
                slot.write(event);
                slot.commit();
                Ok(())
            }
            None => {
                debug!("MIDI event queue full, dropping event");
                Err(Error::QueueFull)
            }
        }
    }

    /// Runs one render quantum: zero-fills `output`, drains queued events
    /// into a packet list stamped with the quantum's host time, and hands
    /// the list to the registered listeners.
    ///
    /// Reaching the packet list's byte budget is not an error: the drain
    /// stops, the call succeeds, and the remaining events stay queued for
    /// the next quantum.
    pub fn render(
        &self,
        _action_flags: u32,
        timestamp: &RenderTimeStamp,
        frame_count: u32,
        output: &mut [&mut [f32]],
    ) -> Result<()> {
        if !self.is_initialized() {
            return Err(Error::NotInitialized);
        }

        silence(output, frame_count as usize);

        let mut packets = PacketList::with_budget(self.config.packet_budget);
        while let Some(slot) = self.fifo.try_read() {
            if !packets.can_append(slot.len) {
                // Budget reached. The claimed event stays queued because the
                // slot is dropped uncommitted.
                break;
            }
            let appended = packets.push(MidiPacket::from_event(&slot, timestamp.host_time));
            debug_assert!(appended);
            slot.commit();
        }

        if !packets.is_empty() {
            self.dispatch(&packets, timestamp);
        }
        Ok(())
    }

    /// Host output first, UI monitor second; each only if registered.
    fn dispatch(&self, packets: &PacketList, timestamp: &RenderTimeStamp) {
        self.output.dispatch(timestamp, 0, packets);
        self.monitor.dispatch(timestamp, 0, packets);
    }

    pub fn set_output_listener(&self, sink: PacketSink) {
        self.output.set(sink);
    }

    pub fn clear_output_listener(&self) {
        self.output.clear();
    }

    pub fn set_monitor_listener(&self, sink: PacketSink) {
        self.monitor.set(sink);
    }

    pub fn clear_monitor_listener(&self) {
        self.monitor.clear();
    }

    pub fn get_property(&self, key: PropertyKey) -> Result<PropertyValue> {
        debug!("Get property: {:?}", key);
        match key {
            PropertyKey::MidiOutputCallbackInfo => {
                Ok(PropertyValue::Names(vec![MIDI_OUTPUT_NAME.to_string()]))
            }
            PropertyKey::MidiOutputCallback | PropertyKey::UiMonitorCallback => {
                Err(Error::PropertyNotReadable(key))
            }
        }
    }

    pub fn set_property(&self, key: PropertyKey, value: PropertyValue) -> Result<()> {
        debug!("Set property: {:?}", key);
        match (key, value) {
            (PropertyKey::MidiOutputCallback, PropertyValue::Callback(sink)) => {
                self.output.set(sink);
                Ok(())
            }
            (PropertyKey::UiMonitorCallback, PropertyValue::Callback(sink)) => {
                self.monitor.set(sink);
                Ok(())
            }
            (PropertyKey::MidiOutputCallbackInfo, _) => Err(Error::PropertyNotWritable(key)),
            (key, _) => Err(Error::InvalidPropertyValue(key)),
        }
    }

    /// Property access by raw host id, for protocol glue that has not
    /// resolved a [`PropertyKey`] yet.
    pub fn get_property_by_id(&self, id: u32) -> Result<PropertyValue> {
        let key = PropertyKey::from_id(id).ok_or(Error::InvalidProperty(id))?;
        self.get_property(key)
    }

    pub fn set_property_by_id(&self, id: u32, value: PropertyValue) -> Result<()> {
        let key = PropertyKey::from_id(id).ok_or(Error::InvalidProperty(id))?;
        self.set_property(key, value)
    }
}

impl AudioUnit for MidiThruEngine {
    fn get_property(&self, key: PropertyKey) -> Result<PropertyValue> {
        MidiThruEngine::get_property(self, key)
    }

    fn set_property(&self, key: PropertyKey, value: PropertyValue) -> Result<()> {
        MidiThruEngine::set_property(self, key, value)
    }

    fn render(
        &self,
        action_flags: u32,
        timestamp: &RenderTimeStamp,
        frame_count: u32,
        output: &mut [&mut [f32]],
    ) -> Result<()> {
        MidiThruEngine::render(self, action_flags, timestamp, frame_count, output)
    }

    fn handle_midi_event(
        &self,
        status: u8,
        channel: u8,
        data1: u8,
        data2: u8,
        offset_sample_frame: u32,
    ) -> Result<()> {
        MidiThruEngine::handle_midi_event(self, status, channel, data1, data2, offset_sample_frame)
    }
}

/// Zero-fills up to `frames` samples of every output channel. The engine
/// passes audio through as silence; buffers carry no musical content.
fn silence(output: &mut [&mut [f32]], frames: usize) {
    for channel in output.iter_mut() {
        let n = frames.min(channel.len());
        channel[..n].fill(0.0);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::*;

    fn engine() -> MidiThruEngine {
        let engine = MidiThruEngine::builder().build().unwrap();
        engine.initialize();
        engine
    }

    /// Registers a host-output sink that appends every dispatched packet to
    /// the returned buffer.
    fn capture_output(engine: &MidiThruEngine) -> Arc<Mutex<Vec<MidiPacket>>> {
        let captured = Arc::new(Mutex::new(Vec::new()));
        let target = Arc::clone(&captured);
        engine.set_output_listener(PacketSink::new(move |_, _, packets| {
            target.lock().extend(packets.iter().copied());
        }));
        captured
    }

    fn render_at(engine: &MidiThruEngine, host_time: u64) {
        engine
            .render(0, &RenderTimeStamp::with_host_time(host_time), 512, &mut [])
            .unwrap();
    }

    #[test]
    fn test_ingest_gated_on_initialization() {
        let engine = MidiThruEngine::builder().build().unwrap();
        assert!(matches!(
            engine.handle_midi_event(0x90, 0, 60, 100, 0),
            Err(Error::NotInitialized)
        ));

        engine.initialize();
        assert!(engine.handle_midi_event(0x90, 0, 60, 100, 0).is_ok());

        engine.uninitialize();
        assert!(matches!(
            engine.handle_midi_event(0x90, 0, 60, 100, 0),
            Err(Error::NotInitialized)
        ));
    }

    #[test]
    fn test_render_gated_on_initialization() {
        let engine = MidiThruEngine::builder().build().unwrap();
        let result = engine.render(0, &RenderTimeStamp::with_host_time(1), 512, &mut []);
        assert!(matches!(result, Err(Error::NotInitialized)));
    }

    #[test]
    fn test_fifo_preserved_end_to_end() {
        let engine = engine();
        let captured = capture_output(&engine);

        for note in 0..8 {
            engine.handle_midi_event(0x90, 0, note, 100, 0).unwrap();
        }
        render_at(&engine, 1);

        let notes: Vec<u8> = captured.lock().iter().map(|p| p.data[1]).collect();
        assert_eq!(notes, (0..8).collect::<Vec<_>>());
    }

    #[test]
    fn test_overflow_drops_exactly_the_excess() {
        let engine = engine();
        let captured = capture_output(&engine);
        let capacity = engine.config().queue_capacity;

        let mut failures = 0;
        for note in 0..capacity as u8 + 1 {
            match engine.handle_midi_event(0x90, 0, note, 100, 0) {
                Ok(()) => {}
                Err(Error::QueueFull) => failures += 1,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert_eq!(failures, 1);
        assert_eq!(engine.pending_events(), capacity);

        render_at(&engine, 1);
        let notes: Vec<u8> = captured.lock().iter().map(|p| p.data[1]).collect();
        assert_eq!(notes, (0..capacity as u8).collect::<Vec<_>>());
    }

    #[test]
    fn test_timestamps_rewritten_to_host_time() {
        let engine = engine();
        let captured = capture_output(&engine);

        engine.handle_midi_event(0x90, 0, 60, 100, 5).unwrap();
        engine.handle_midi_event(0x80, 0, 60, 0, 9).unwrap();
        render_at(&engine, 777);

        let captured = captured.lock();
        assert_eq!(captured.len(), 2);
        for packet in captured.iter() {
            assert_eq!(packet.timestamp, 777);
        }
    }

    #[test]
    fn test_note_on_end_to_end() {
        let engine = engine();
        let captured = capture_output(&engine);
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        engine.set_monitor_listener(PacketSink::new(move |_, _, packets| {
            assert_eq!(packets.len(), 1);
            seen.fetch_add(1, Ordering::SeqCst);
        }));

        engine.handle_midi_event(0x90, 2, 60, 100, 5).unwrap();
        render_at(&engine, 0xFEED);

        let captured = captured.lock();
        assert_eq!(captured.len(), 1);
        assert_eq!(captured[0].data, [0x92, 60, 100]);
        assert_eq!(captured[0].len, 3);
        assert_eq!(captured[0].timestamp, 0xFEED);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_byte_length_rule_end_to_end() {
        let engine = engine();
        let captured = capture_output(&engine);

        engine.handle_midi_event(0xC0, 3, 17, 0, 0).unwrap();
        engine.handle_midi_event(0xD0, 1, 42, 0, 0).unwrap();
        engine.handle_midi_event(0x90, 0, 60, 100, 0).unwrap();
        render_at(&engine, 1);

        let captured = captured.lock();
        assert_eq!(captured[0].len, 2);
        assert_eq!(captured[0].bytes(), &[0xC3, 17]);
        assert_eq!(captured[1].len, 2);
        assert_eq!(captured[1].bytes(), &[0xD1, 42]);
        assert_eq!(captured[2].len, 3);
        assert_eq!(captured[2].bytes(), &[0x90, 60, 100]);
    }

    #[test]
    fn test_partial_drain_defers_rest() {
        // Budget for exactly two 3-byte packets per quantum.
        let engine = MidiThruEngine::builder().packet_budget(30).build().unwrap();
        engine.initialize();
        let captured = capture_output(&engine);

        for note in 0..5 {
            engine.handle_midi_event(0x90, 0, note, 100, 0).unwrap();
        }

        render_at(&engine, 1);
        assert_eq!(captured.lock().len(), 2);
        assert_eq!(engine.pending_events(), 3);

        render_at(&engine, 2);
        assert_eq!(captured.lock().len(), 4);
        assert_eq!(engine.pending_events(), 1);

        render_at(&engine, 3);
        assert_eq!(engine.pending_events(), 0);

        let notes: Vec<u8> = captured.lock().iter().map(|p| p.data[1]).collect();
        assert_eq!(notes, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_listeners_are_independent() {
        let engine = engine();
        let monitor_calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&monitor_calls);
        engine.set_monitor_listener(PacketSink::new(move |_, _, _| {
            seen.fetch_add(1, Ordering::SeqCst);
        }));

        engine.handle_midi_event(0x90, 0, 60, 100, 0).unwrap();
        render_at(&engine, 1);
        assert_eq!(monitor_calls.load(Ordering::SeqCst), 1);

        // Neither listener set: render still succeeds.
        engine.clear_monitor_listener();
        engine.handle_midi_event(0x90, 0, 61, 100, 0).unwrap();
        render_at(&engine, 2);
        assert_eq!(monitor_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_dispatch_order_host_then_ui() {
        let engine = engine();
        let order = Arc::new(Mutex::new(Vec::new()));

        let log = Arc::clone(&order);
        engine.set_output_listener(PacketSink::new(move |_, _, _| {
            log.lock().push("host");
        }));
        let log = Arc::clone(&order);
        engine.set_monitor_listener(PacketSink::new(move |_, _, _| {
            log.lock().push("ui");
        }));

        engine.handle_midi_event(0x90, 0, 60, 100, 0).unwrap();
        render_at(&engine, 1);

        assert_eq!(*order.lock(), vec!["host", "ui"]);
    }

    #[test]
    fn test_no_dispatch_without_packets() {
        let engine = engine();
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        engine.set_output_listener(PacketSink::new(move |_, _, _| {
            seen.fetch_add(1, Ordering::SeqCst);
        }));

        render_at(&engine, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_render_zero_fills_output() {
        let engine = engine();
        let mut left = [1.0f32; 8];
        let mut right = [1.0f32; 8];
        {
            let mut output = [&mut left[..], &mut right[..]];
            engine
                .render(0, &RenderTimeStamp::with_host_time(1), 8, &mut output)
                .unwrap();
        }
        assert_eq!(left, [0.0; 8]);
        assert_eq!(right, [0.0; 8]);
    }

    #[test]
    fn test_render_zero_fills_only_frame_count() {
        let engine = engine();
        let mut channel = [1.0f32; 8];
        {
            let mut output = [&mut channel[..]];
            engine
                .render(0, &RenderTimeStamp::with_host_time(1), 4, &mut output)
                .unwrap();
        }
        assert_eq!(channel[..4], [0.0; 4]);
        assert_eq!(channel[4..], [1.0; 4]);
    }

    #[test]
    fn test_callback_info_names() {
        let engine = engine();
        match engine
            .get_property(PropertyKey::MidiOutputCallbackInfo)
            .unwrap()
        {
            PropertyValue::Names(names) => assert_eq!(names, vec!["MIDIThruOut"]),
            other => panic!("unexpected value: {other:?}"),
        }
    }

    #[test]
    fn test_write_only_property_not_readable() {
        let engine = engine();
        assert!(matches!(
            engine.get_property(PropertyKey::MidiOutputCallback),
            Err(Error::PropertyNotReadable(PropertyKey::MidiOutputCallback))
        ));
    }

    #[test]
    fn test_read_only_property_not_writable() {
        let engine = engine();
        let result = engine.set_property(
            PropertyKey::MidiOutputCallbackInfo,
            PropertyValue::Names(vec!["x".into()]),
        );
        assert!(matches!(
            result,
            Err(Error::PropertyNotWritable(
                PropertyKey::MidiOutputCallbackInfo
            ))
        ));
    }

    #[test]
    fn test_wrong_value_shape_rejected() {
        let engine = engine();
        let result = engine.set_property(
            PropertyKey::MidiOutputCallback,
            PropertyValue::Names(vec![]),
        );
        assert!(matches!(
            result,
            Err(Error::InvalidPropertyValue(PropertyKey::MidiOutputCallback))
        ));
    }

    #[test]
    fn test_unknown_property_id() {
        let engine = engine();
        assert!(matches!(
            engine.get_property_by_id(7),
            Err(Error::InvalidProperty(7))
        ));
    }

    #[test]
    fn test_listener_registered_through_property() {
        let engine = engine();
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        engine
            .set_property_by_id(
                64056,
                PropertyValue::Callback(PacketSink::new(move |_, _, _| {
                    seen.fetch_add(1, Ordering::SeqCst);
                })),
            )
            .unwrap();

        engine.handle_midi_event(0x90, 0, 60, 100, 0).unwrap();
        render_at(&engine, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_version() {
        let engine = engine();
        assert_eq!(engine.version(), 0x0001_0002);
        assert_eq!(MidiThruEngine::VERSION, 65538);
    }

    #[test]
    fn test_typed_ingestion() {
        let engine = engine();
        let captured = capture_output(&engine);

        engine
            .handle_midi_msg(MidiEvent::note_on(2, 60, 100), 5)
            .unwrap();
        render_at(&engine, 9);

        let captured = captured.lock();
        assert_eq!(captured[0].data, [0x92, 60, 100]);
        assert_eq!(captured[0].timestamp, 9);
    }

    #[test]
    fn test_unsupported_typed_message() {
        let engine = engine();
        let event = MidiEvent::new(
            midithru_midi::Channel::Ch1,
            midithru_midi::ChannelVoiceMsg::HighResNoteOn {
                note: 60,
                velocity: 8192,
            },
        );
        assert!(matches!(
            engine.handle_midi_msg(event, 0),
            Err(Error::UnsupportedMessage)
        ));
    }

    #[test]
    fn test_engine_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<MidiThruEngine>();
    }
}
