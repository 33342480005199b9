//! CPAL-based audio output backend.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Stream, StreamConfig};
use lc_engine::Renderer;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::traits::{AudioError, AudioOutput};

/// CPAL-based audio output pulling frames straight from a [`Renderer`].
///
/// The mixer's layer table is the transport between the control thread
/// and the stream callback, so no ring buffer sits in between: the
/// callback runs `Renderer::mix` directly into the device buffer.
pub struct CpalOutput {
    device: Device,
    config: StreamConfig,
    stream: Option<Stream>,
    renderer: Option<Renderer>,
    running: Arc<AtomicBool>,
}

impl CpalOutput {
    /// Create an output on the default device, consuming the renderer.
    pub fn new(renderer: Renderer) -> Result<Self, AudioError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(AudioError::NoDevice)?;

        let config = device
            .default_output_config()
            .map_err(|e| AudioError::DeviceInit(e.to_string()))?;

        let mut config: StreamConfig = config.into();
        // Force stereo output — the renderer produces 2-channel interleaving
        config.channels = 2;

        Ok(Self {
            device,
            config,
            stream: None,
            renderer: Some(renderer),
            running: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Build the audio stream and hand the renderer to its callback.
    ///
    /// The stream begins running but emits silence until [`start`] flips
    /// the gate.
    ///
    /// [`start`]: AudioOutput::start
    pub fn build_stream(&mut self) -> Result<(), AudioError> {
        let mut renderer = self
            .renderer
            .take()
            .ok_or_else(|| AudioError::StreamCreate("stream already built".into()))?;
        let running = self.running.clone();

        let stream = self
            .device
            .build_output_stream(
                &self.config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    if !running.load(Ordering::Relaxed) {
                        data.fill(0.0);
                        return;
                    }
                    renderer.mix(data);
                },
                |err| eprintln!("Audio stream error: {}", err),
                None,
            )
            .map_err(|e| AudioError::StreamCreate(e.to_string()))?;

        stream
            .play()
            .map_err(|e| AudioError::Playback(e.to_string()))?;
        self.stream = Some(stream);

        Ok(())
    }
}

impl AudioOutput for CpalOutput {
    fn sample_rate(&self) -> u32 {
        self.config.sample_rate.0
    }

    fn start(&mut self) -> Result<(), AudioError> {
        self.running.store(true, Ordering::Relaxed);
        if let Some(ref stream) = self.stream {
            stream
                .play()
                .map_err(|e| AudioError::Playback(e.to_string()))?;
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<(), AudioError> {
        self.running.store(false, Ordering::Relaxed);
        if let Some(ref stream) = self.stream {
            stream
                .pause()
                .map_err(|e| AudioError::Playback(e.to_string()))?;
        }
        Ok(())
    }
}
