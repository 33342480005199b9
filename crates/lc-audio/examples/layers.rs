//! Plays synthesized tones through the mixer's four states.
//!
//! Run with `cargo run -p lc-audio --example layers`.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use lc_audio::{AudioOutput, CpalOutput};
use lc_engine::{Mixer, PlayState, Sample};

fn sine(freq: f32, rate: f32, frames: usize) -> Vec<f32> {
    (0..frames)
        .map(|i| (i as f32 * freq * std::f32::consts::TAU / rate).sin() * 0.4)
        .collect()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (mut mixer, renderer) = Mixer::new(0.5, 0);
    let mut output = CpalOutput::new(renderer)?;
    output.build_stream()?;
    output.start()?;
    let rate = output.sample_rate() as f32;

    let pad = Arc::new(Sample::from_frames(1, &sine(220.0, rate, rate as usize))?);
    let blip = Arc::new(Sample::from_frames(1, &sine(880.0, rate, rate as usize / 8))?);

    // Quarter-second fades for everything started from here on.
    mixer.set_default_fade((rate / 4.0) as i32);

    println!("looping pad, left of center");
    mixer
        .play(&pad, PlayState::Loop, 0.6, -0.3)
        .ok_or("no free layer")?;
    thread::sleep(Duration::from_millis(800));

    println!("looping blip, right of center");
    let blip_handle = mixer
        .play(&blip, PlayState::Loop, 0.8, 0.3)
        .ok_or("no free layer")?;
    thread::sleep(Duration::from_millis(1200));

    println!("halting the blip (fade out, handle stays live)");
    mixer.set_state(blip_handle, PlayState::Halt);
    thread::sleep(Duration::from_millis(800));

    println!("resuming the blip (fade back in)");
    mixer.set_state(blip_handle, PlayState::Loop);
    thread::sleep(Duration::from_millis(1200));

    println!("stopping everything");
    mixer.stop_all();
    thread::sleep(Duration::from_millis(600));

    output.stop()?;
    Ok(())
}
