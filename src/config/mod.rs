//! Configuration management for beacon-stream
//!
//! Values are resolved in three layers: built-in defaults, then the TOML
//! file, then environment variables.

pub mod file;

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::conversation::{DEFAULT_BACKUP_FILE, DEFAULT_MAX_TOKENS};
use crate::persona::DEFAULT_PERSONA_FILE;
use crate::voice::DEFAULT_ELEVENLABS_MODEL;
use crate::{Error, Result};

use file::StreamConfigFile;

/// Default chat model
pub const DEFAULT_MODEL: &str = "gpt-4";

/// beacon-stream configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Chat completion settings
    pub chat: ChatConfig,

    /// Persona configuration file, re-read every cycle
    pub persona_path: PathBuf,

    /// Transcript backup file, rewritten after every reply
    pub backup_path: PathBuf,

    /// Longest single capture
    pub capture_max_duration: Duration,

    /// How long an in-flight cycle may run once shutdown is requested
    pub shutdown_grace: Duration,

    /// Speech recognition settings
    pub stt: SttConfig,

    /// Speech synthesis settings
    pub tts: TtsConfig,

    /// API keys
    pub api_keys: ApiKeys,
}

#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Model identifier; also selects the token accounting
    pub model: String,

    /// Override for the chat API base URL
    pub base_url: Option<String>,

    /// Context window budget in tokens
    pub max_tokens: usize,

    /// Per-request timeout
    pub request_timeout: Duration,
}

/// Speech recognition provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SttProvider {
    Whisper,
    Azure,
}

impl FromStr for SttProvider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "whisper" | "openai" => Ok(Self::Whisper),
            "azure" => Ok(Self::Azure),
            other => Err(Error::Config(format!("unknown STT provider: {other}"))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SttConfig {
    pub provider: SttProvider,

    /// Whisper model (e.g. "whisper-1")
    pub model: String,

    /// Azure recognition language (e.g. "en-US")
    pub language: String,
}

/// Speech synthesis provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtsProvider {
    ElevenLabs,
    OpenAi,
}

impl FromStr for TtsProvider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "elevenlabs" | "eleven_labs" => Ok(Self::ElevenLabs),
            "openai" => Ok(Self::OpenAi),
            other => Err(Error::Config(format!("unknown TTS provider: {other}"))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TtsConfig {
    pub provider: TtsProvider,

    /// Voice name or identifier
    pub voice: String,

    /// Provider model identifier
    pub model: String,

    /// Speed multiplier (`OpenAI` only, 0.25 to 4.0)
    pub speed: f32,
}

/// API keys for external services
#[derive(Clone, Default)]
pub struct ApiKeys {
    /// `OpenAI` key (chat, Whisper, TTS)
    pub openai: Option<String>,

    /// `ElevenLabs` key
    pub elevenlabs: Option<String>,

    /// Azure Speech subscription key
    pub azure_speech: Option<String>,

    /// Azure Speech region (e.g. "westus")
    pub azure_region: Option<String>,
}

impl std::fmt::Debug for ApiKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mask = |k: &Option<String>| k.as_ref().map(|_| "<set>");
        f.debug_struct("ApiKeys")
            .field("openai", &mask(&self.openai))
            .field("elevenlabs", &mask(&self.elevenlabs))
            .field("azure_speech", &mask(&self.azure_speech))
            .field("azure_region", &self.azure_region)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            chat: ChatConfig {
                model: DEFAULT_MODEL.to_string(),
                base_url: None,
                max_tokens: DEFAULT_MAX_TOKENS,
                request_timeout: Duration::from_secs(60),
            },
            persona_path: PathBuf::from(DEFAULT_PERSONA_FILE),
            backup_path: PathBuf::from(DEFAULT_BACKUP_FILE),
            capture_max_duration: Duration::from_secs(60),
            shutdown_grace: Duration::from_secs(5),
            stt: SttConfig {
                provider: SttProvider::Azure,
                model: "whisper-1".to_string(),
                language: "en-US".to_string(),
            },
            tts: TtsConfig {
                provider: TtsProvider::ElevenLabs,
                voice: "Rachel".to_string(),
                model: DEFAULT_ELEVENLABS_MODEL.to_string(),
                speed: 1.0,
            },
            api_keys: ApiKeys::default(),
        }
    }
}

impl Config {
    /// Load configuration from defaults, the TOML file, and the environment
    ///
    /// # Errors
    ///
    /// Returns error if an explicit config file is unreadable or any value
    /// is invalid
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = file::load_config_file(path)?;
        let mut config = Self::default();
        config.apply_file(file)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Overlay values present in the config file
    ///
    /// # Errors
    ///
    /// Returns error on an unknown provider name
    pub fn apply_file(&mut self, file: StreamConfigFile) -> Result<()> {
        let StreamConfigFile {
            chat,
            files,
            timing,
            stt,
            tts,
            api_keys,
        } = file;

        overlay(&mut self.chat.model, chat.model);
        if chat.base_url.is_some() {
            self.chat.base_url = chat.base_url;
        }
        overlay(&mut self.chat.max_tokens, chat.max_tokens);
        overlay(
            &mut self.chat.request_timeout,
            chat.request_timeout_secs.map(Duration::from_secs),
        );

        overlay(&mut self.persona_path, files.persona);
        overlay(&mut self.backup_path, files.backup);

        overlay(
            &mut self.capture_max_duration,
            timing.capture_max_secs.map(Duration::from_secs),
        );
        overlay(
            &mut self.shutdown_grace,
            timing.shutdown_grace_secs.map(Duration::from_secs),
        );

        if let Some(provider) = stt.provider {
            self.stt.provider = provider.parse()?;
        }
        overlay(&mut self.stt.model, stt.model);
        overlay(&mut self.stt.language, stt.language);

        if let Some(provider) = tts.provider {
            self.set_tts_provider(provider.parse()?);
        }
        overlay(&mut self.tts.voice, tts.voice);
        overlay(&mut self.tts.model, tts.model);
        overlay(&mut self.tts.speed, tts.speed);

        self.api_keys.openai = api_keys.openai.or(self.api_keys.openai.take());
        self.api_keys.elevenlabs = api_keys.elevenlabs.or(self.api_keys.elevenlabs.take());
        self.api_keys.azure_speech = api_keys.azure_speech.or(self.api_keys.azure_speech.take());
        self.api_keys.azure_region = api_keys.azure_region.or(self.api_keys.azure_region.take());

        Ok(())
    }

    /// Overlay values from environment variables
    ///
    /// `lookup` returns the variable's value, if set.
    ///
    /// # Errors
    ///
    /// Returns error on an unparsable number or unknown provider name
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = get("OPENAI_API_KEY") {
            self.api_keys.openai = Some(key);
        }
        if let Some(key) = get("ELEVENLABS_API_KEY") {
            self.api_keys.elevenlabs = Some(key);
        }
        if let Some(key) = get("AZURE_TTS_KEY") {
            self.api_keys.azure_speech = Some(key);
        }
        if let Some(region) = get("AZURE_TTS_REGION") {
            self.api_keys.azure_region = Some(region);
        }

        overlay(&mut self.chat.model, get("BEACON_STREAM_MODEL"));
        if let Some(url) = get("BEACON_STREAM_BASE_URL") {
            self.chat.base_url = Some(url);
        }
        if let Some(raw) = get("BEACON_STREAM_MAX_TOKENS") {
            self.chat.max_tokens = parse_env("BEACON_STREAM_MAX_TOKENS", &raw)?;
        }
        overlay(
            &mut self.persona_path,
            get("BEACON_STREAM_PERSONA_FILE").map(PathBuf::from),
        );
        overlay(
            &mut self.backup_path,
            get("BEACON_STREAM_BACKUP_FILE").map(PathBuf::from),
        );
        if let Some(raw) = get("BEACON_STREAM_STT") {
            self.stt.provider = raw.parse()?;
        }
        if let Some(raw) = get("BEACON_STREAM_TTS") {
            self.set_tts_provider(raw.parse()?);
        }
        overlay(&mut self.tts.voice, get("BEACON_STREAM_TTS_VOICE"));

        Ok(())
    }

    /// Switch TTS provider, moving a default model to the new provider's
    fn set_tts_provider(&mut self, provider: TtsProvider) {
        if provider == self.tts.provider {
            return;
        }
        let default_model = match self.tts.provider {
            TtsProvider::ElevenLabs => DEFAULT_ELEVENLABS_MODEL,
            TtsProvider::OpenAi => "tts-1",
        };
        if self.tts.model == default_model {
            self.tts.model = match provider {
                TtsProvider::ElevenLabs => DEFAULT_ELEVENLABS_MODEL,
                TtsProvider::OpenAi => "tts-1",
            }
            .to_string();
        }
        if provider == TtsProvider::OpenAi && self.tts.voice == "Rachel" {
            self.tts.voice = "alloy".to_string();
        }
        self.tts.provider = provider;
    }

    fn validate(&self) -> Result<()> {
        if self.chat.max_tokens == 0 {
            return Err(Error::Config("max_tokens must be positive".to_string()));
        }
        if self.capture_max_duration.is_zero() {
            return Err(Error::Config(
                "capture_max_secs must be positive".to_string(),
            ));
        }
        if !(0.25..=4.0).contains(&self.tts.speed) {
            return Err(Error::Config(format!(
                "tts speed {} outside 0.25..=4.0",
                self.tts.speed
            )));
        }
        Ok(())
    }
}

fn overlay<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}

fn parse_env<T: FromStr>(key: &str, raw: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| Error::Config(format!("{key}={raw}: {e}")))
}
