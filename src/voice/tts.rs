//! Text-to-speech (TTS) processing

use async_trait::async_trait;

use super::Synthesizer;
use crate::{Error, Result};

/// Default ElevenLabs model
pub const DEFAULT_ELEVENLABS_MODEL: &str = "eleven_monolingual_v1";

/// ElevenLabs voice list entry
#[derive(serde::Deserialize)]
struct ElevenLabsVoice {
    voice_id: String,
    name: String,
}

#[derive(serde::Deserialize)]
struct ElevenLabsVoices {
    voices: Vec<ElevenLabsVoice>,
}

/// TTS provider backend
#[derive(Clone, Copy, Debug)]
enum TtsProvider {
    OpenAI,
    ElevenLabs,
}

/// Synthesizes speech from text
pub struct TextToSpeech {
    client: reqwest::Client,
    api_key: String,
    voice: String,
    speed: f32,
    model: String,
    provider: TtsProvider,
}

impl TextToSpeech {
    /// Create a new TTS instance using `OpenAI`
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing
    pub fn new_openai(api_key: String, voice: String, speed: f32, model: String) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::CriticalInit(
                "OPENAI_API_KEY required for TTS".to_string(),
            ));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            voice,
            speed,
            model,
            provider: TtsProvider::OpenAI,
        })
    }

    /// Create a new TTS instance using ElevenLabs
    ///
    /// `voice` may be a voice ID or a display name; names are resolved
    /// against the account's voice list.
    ///
    /// # Errors
    ///
    /// Returns error if the API key is missing or the voice cannot be resolved
    pub async fn new_elevenlabs(api_key: String, voice: &str, model: String) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::CriticalInit(
                "ELEVENLABS_API_KEY required for TTS".to_string(),
            ));
        }

        let client = reqwest::Client::new();
        let voice_id = resolve_elevenlabs_voice(&client, &api_key, voice).await?;

        Ok(Self {
            client,
            api_key,
            voice: voice_id,
            speed: 1.0,
            model,
            provider: TtsProvider::ElevenLabs,
        })
    }

    /// Synthesize using OpenAI TTS
    async fn synthesize_openai(&self, text: &str) -> Result<Vec<u8>> {
        #[derive(serde::Serialize)]
        struct TtsRequest<'a> {
            model: &'a str,
            input: &'a str,
            voice: &'a str,
            speed: f32,
        }

        let request = TtsRequest {
            model: &self.model,
            input: text,
            voice: &self.voice,
            speed: self.speed,
        };

        let response = self
            .client
            .post("https://api.openai.com/v1/audio/speech")
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Synthesis(format!("OpenAI TTS request failed: {e}")))?;

        read_audio(response, "OpenAI").await
    }

    /// Synthesize using ElevenLabs TTS
    async fn synthesize_elevenlabs(&self, text: &str) -> Result<Vec<u8>> {
        #[derive(serde::Serialize)]
        struct ElevenLabsRequest<'a> {
            text: &'a str,
            model_id: &'a str,
        }

        let url = format!("https://api.elevenlabs.io/v1/text-to-speech/{}", self.voice);

        let response = self
            .client
            .post(&url)
            .header("xi-api-key", &self.api_key)
            .header("Accept", "audio/mpeg")
            .json(&ElevenLabsRequest {
                text,
                model_id: &self.model,
            })
            .send()
            .await
            .map_err(|e| Error::Synthesis(format!("ElevenLabs request failed: {e}")))?;

        read_audio(response, "ElevenLabs").await
    }
}

#[async_trait]
impl Synthesizer for TextToSpeech {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        tracing::debug!(chars = text.len(), provider = ?self.provider, "synthesizing speech");
        match self.provider {
            TtsProvider::OpenAI => self.synthesize_openai(text).await,
            TtsProvider::ElevenLabs => self.synthesize_elevenlabs(text).await,
        }
    }
}

async fn read_audio(response: reqwest::Response, provider: &str) -> Result<Vec<u8>> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(Error::Synthesis(format!("{provider} TTS error {status}: {body}")));
    }

    let audio = response
        .bytes()
        .await
        .map_err(|e| Error::Synthesis(format!("{provider} audio download failed: {e}")))?;
    Ok(audio.to_vec())
}

/// Look up a voice ID by display name, or accept `voice` as an ID
async fn resolve_elevenlabs_voice(
    client: &reqwest::Client,
    api_key: &str,
    voice: &str,
) -> Result<String> {
    let response = client
        .get("https://api.elevenlabs.io/v1/voices")
        .header("xi-api-key", api_key)
        .send()
        .await
        .map_err(|e| Error::CriticalInit(format!("ElevenLabs unreachable: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(Error::CriticalInit(format!(
            "ElevenLabs voice list error {status}: {body}"
        )));
    }

    let list: ElevenLabsVoices = response
        .json()
        .await
        .map_err(|e| Error::CriticalInit(format!("unreadable ElevenLabs voice list: {e}")))?;

    let voice_id = pick_voice(&list.voices, voice)
        .ok_or_else(|| Error::CriticalInit(format!("ElevenLabs voice not found: {voice}")))?;

    tracing::info!(voice, voice_id, "resolved ElevenLabs voice");
    Ok(voice_id)
}

fn pick_voice(voices: &[ElevenLabsVoice], wanted: &str) -> Option<String> {
    voices
        .iter()
        .find(|v| v.voice_id == wanted)
        .or_else(|| voices.iter().find(|v| v.name.eq_ignore_ascii_case(wanted)))
        .map(|v| v.voice_id.clone())
}
