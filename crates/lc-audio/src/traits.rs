//! Audio output trait and error types.

/// Error type for audio operations.
#[derive(Debug)]
pub enum AudioError {
    /// Failed to initialize audio device
    DeviceInit(String),
    /// Failed to create audio stream
    StreamCreate(String),
    /// Playback error
    Playback(String),
    /// No audio device available
    NoDevice,
}

impl std::fmt::Display for AudioError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AudioError::DeviceInit(msg) => write!(f, "Device init error: {}", msg),
            AudioError::StreamCreate(msg) => write!(f, "Stream create error: {}", msg),
            AudioError::Playback(msg) => write!(f, "Playback error: {}", msg),
            AudioError::NoDevice => write!(f, "No audio device available"),
        }
    }
}

impl std::error::Error for AudioError {}

/// Trait for audio output backends driving a mixer renderer.
pub trait AudioOutput {
    /// Sample rate the device consumes frames at. Fade lengths and
    /// cursors handed to the mixer are frame counts at this rate.
    fn sample_rate(&self) -> u32;

    /// Start pulling frames from the renderer.
    fn start(&mut self) -> Result<(), AudioError>;

    /// Stop pulling; the device receives silence while stopped.
    fn stop(&mut self) -> Result<(), AudioError>;
}
