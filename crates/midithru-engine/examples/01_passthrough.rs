//! # 01 - Pass-Through
//!
//! Ingest MIDI events and re-emit them, host-time-stamped, from a render
//! quantum.
//!
//! **Concepts:** Engine lifecycle, event ingestion, render drain, output
//! listener
//!
//! ```bash
//! cargo run --example 01_passthrough
//! ```

use midithru_engine::{MidiThruEngine, PacketSink, RenderTimeStamp};

fn main() -> midithru_engine::Result<()> {
    tracing_subscriber::fmt().init();

    let engine = MidiThruEngine::builder().build()?;
    engine.initialize();

    // The host output listener sees every packet list a render produces.
    engine.set_output_listener(PacketSink::new(|timestamp, bus, packets| {
        println!(
            "render at host time {} (bus {}): {} packet(s)",
            timestamp.host_time,
            bus,
            packets.len()
        );
        for packet in packets {
            println!("  {:02X?} @ {}", packet.bytes(), packet.timestamp);
        }
    }));

    // Events arrive between renders, carrying block-relative offsets.
    engine.handle_midi_event(0x90, 0, 60, 100, 0)?; // Note On C4
    engine.handle_midi_event(0x90, 0, 64, 100, 16)?; // Note On E4
    engine.handle_midi_event(0xC0, 0, 5, 0, 32)?; // Program Change

    // One render quantum: 512 frames at host time 123456.
    let mut left = [0.5f32; 512];
    let mut output = [&mut left[..]];
    engine.render(0, &RenderTimeStamp::new(0.0, 123_456), 512, &mut output)?;

    println!("audio is silenced: left[0] = {}", left[0]);
    println!("events left queued: {}", engine.pending_events());

    Ok(())
}
