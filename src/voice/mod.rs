//! Voice processing module
//!
//! Handles audio capture, speech recognition, synthesis, and playback.
//! Each stage sits behind a trait so the assistant loop can run against
//! real devices and HTTP services or against in-memory fakes.

mod capture;
mod playback;
mod stt;
mod tts;

use async_trait::async_trait;

use crate::Result;

pub use capture::{AudioCapture, SAMPLE_RATE, rms, samples_to_wav};
pub use playback::{AudioPlayback, DecodedAudio, decode_mp3};
pub use stt::SpeechToText;
pub use tts::{DEFAULT_ELEVENLABS_MODEL, TextToSpeech};

/// Source of captured speech
///
/// Device streams are not `Send` on every platform, so implementations
/// stay on the task that created them.
pub trait Microphone {
    /// Begin buffering samples, discarding anything buffered before
    ///
    /// # Errors
    ///
    /// Returns error if the input stream cannot be opened
    fn start(&mut self) -> Result<()>;

    /// Stop buffering and hand back the mono samples captured since `start`
    fn stop(&mut self) -> Vec<f32>;

    /// Rate of the samples returned by `stop`
    fn sample_rate(&self) -> u32;
}

/// Speech-to-text service
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe a WAV clip; silence yields an empty string
    async fn transcribe(&self, wav: &[u8]) -> Result<String>;
}

/// Text-to-speech service
#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// Render `text` as MP3 bytes
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>>;
}

/// Audio output
#[async_trait(?Send)]
pub trait Speaker {
    /// Play an MP3 clip to completion
    async fn play_mp3(&mut self, audio: &[u8]) -> Result<()>;
}
