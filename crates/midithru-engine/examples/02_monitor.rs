//! # 02 - UI Monitor
//!
//! Register a monitor through the property surface and drain it from a UI
//! thread while renders keep running.
//!
//! **Concepts:** Property surface, monitor registration, lossy UI-side
//! collection
//!
//! ```bash
//! cargo run --example 02_monitor
//! ```

use std::sync::Arc;
use std::time::Duration;

use midithru_engine::{
    MidiMonitor, MidiThruEngine, PropertyKey, PropertyValue, RenderTimeStamp,
};

fn main() -> midithru_engine::Result<()> {
    tracing_subscriber::fmt().init();

    let engine = Arc::new(MidiThruEngine::builder().build()?);
    engine.initialize();

    // The engine advertises its output by name.
    match engine.get_property(PropertyKey::MidiOutputCallbackInfo)? {
        PropertyValue::Names(names) => println!("MIDI outputs: {names:?}"),
        other => println!("unexpected property value: {other:?}"),
    }

    // Register the monitor the way a host would: by property id.
    let monitor = Arc::new(MidiMonitor::new());
    engine.set_property_by_id(64056, PropertyValue::Callback(monitor.sink()))?;

    // Render loop standing in for the audio thread.
    let renders = {
        let engine = Arc::clone(&engine);
        std::thread::spawn(move || {
            for quantum in 0..8u64 {
                for note in 0..4 {
                    let _ = engine.handle_midi_event(0x90, 0, 60 + note, 100, 0);
                }
                engine
                    .render(0, &RenderTimeStamp::with_host_time(quantum), 256, &mut [])
                    .expect("render");
                std::thread::sleep(Duration::from_millis(5));
            }
        })
    };

    // UI thread: poll the monitor on its own schedule.
    for _ in 0..4 {
        std::thread::sleep(Duration::from_millis(12));
        let packets = monitor.take();
        println!("monitor drained {} packet(s)", packets.len());
        for packet in &packets {
            println!("  {:02X?} @ {}", packet.bytes(), packet.timestamp);
        }
    }

    renders.join().expect("render thread");
    println!("left in monitor at exit: {}", monitor.len());

    Ok(())
}
