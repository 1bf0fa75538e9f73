//! TOML configuration file loading
//!
//! Supports `~/.config/omni/beacon-stream/config.toml` as a persistent config
//! source. All fields are optional; the file is a partial overlay on top of
//! defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::{Error, Result};

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StreamConfigFile {
    /// Chat completion configuration
    #[serde(default)]
    pub chat: ChatFileConfig,

    /// File locations
    #[serde(default)]
    pub files: FilesFileConfig,

    /// Capture and shutdown timing
    #[serde(default)]
    pub timing: TimingFileConfig,

    /// Speech recognition configuration
    #[serde(default)]
    pub stt: SttFileConfig,

    /// Speech synthesis configuration
    #[serde(default)]
    pub tts: TtsFileConfig,

    /// API keys for external services
    #[serde(default)]
    pub api_keys: ApiKeysFileConfig,
}

/// Chat-related configuration
#[derive(Debug, Default, Deserialize)]
pub struct ChatFileConfig {
    /// Model identifier (e.g. "gpt-4")
    pub model: Option<String>,

    /// Override for the chat API base URL
    pub base_url: Option<String>,

    /// Context window budget in tokens
    pub max_tokens: Option<usize>,

    /// Per-request timeout in seconds
    pub request_timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct FilesFileConfig {
    /// Persona configuration file
    pub persona: Option<PathBuf>,

    /// Transcript backup file
    pub backup: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TimingFileConfig {
    /// Longest single capture in seconds
    pub capture_max_secs: Option<u64>,

    /// Grace period for an in-flight cycle at shutdown, in seconds
    pub shutdown_grace_secs: Option<u64>,
}

/// Speech recognition configuration
#[derive(Debug, Default, Deserialize)]
pub struct SttFileConfig {
    /// "whisper" or "azure"
    pub provider: Option<String>,

    /// Whisper model (e.g. "whisper-1")
    pub model: Option<String>,

    /// Recognition language for Azure (e.g. "en-US")
    pub language: Option<String>,
}

/// Speech synthesis configuration
#[derive(Debug, Default, Deserialize)]
pub struct TtsFileConfig {
    /// "elevenlabs" or "openai"
    pub provider: Option<String>,

    /// Voice name or identifier
    pub voice: Option<String>,

    /// Provider model identifier
    pub model: Option<String>,

    /// Speed multiplier (`OpenAI` only)
    pub speed: Option<f32>,
}

/// API keys configuration
#[derive(Debug, Default, Deserialize)]
pub struct ApiKeysFileConfig {
    pub openai: Option<String>,
    pub elevenlabs: Option<String>,
    pub azure_speech: Option<String>,
    pub azure_region: Option<String>,
}

/// Load the TOML config file
///
/// An explicit path must exist and parse. The standard path is optional:
/// a missing file yields defaults and a malformed one is logged and ignored.
///
/// # Errors
///
/// Returns error if an explicit path cannot be read or parsed
pub fn load_config_file(explicit: Option<&Path>) -> Result<StreamConfigFile> {
    if let Some(path) = explicit {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read config file {}: {e}", path.display()))
        })?;
        let config = parse(&content)
            .map_err(|e| Error::Config(format!("invalid config file {}: {e}", path.display())))?;
        tracing::info!(path = %path.display(), "loaded config file");
        return Ok(config);
    }

    let Some(path) = config_file_path() else {
        return Ok(StreamConfigFile::default());
    };

    if !path.exists() {
        return Ok(StreamConfigFile::default());
    }

    match std::fs::read_to_string(&path) {
        Ok(content) => match parse(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                Ok(config)
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                Ok(StreamConfigFile::default())
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            Ok(StreamConfigFile::default())
        }
    }
}

fn parse(content: &str) -> std::result::Result<StreamConfigFile, toml::de::Error> {
    toml::from_str(content)
}

/// Return the config file path: `~/.config/omni/beacon-stream/config.toml`
#[must_use]
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| {
        d.config_dir()
            .join("omni")
            .join("beacon-stream")
            .join("config.toml")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_parses() {
        let file = parse(
            r#"
            [chat]
            model = "gpt-4o"

            [tts]
            provider = "openai"
            voice = "alloy"
            "#,
        )
        .unwrap();

        assert_eq!(file.chat.model.as_deref(), Some("gpt-4o"));
        assert!(file.chat.max_tokens.is_none());
        assert_eq!(file.tts.provider.as_deref(), Some("openai"));
        assert!(file.stt.provider.is_none());
    }

    #[test]
    fn unknown_section_is_rejected() {
        assert!(parse("[gateway]\nport = 1\n").is_err());
    }

    #[test]
    fn explicit_missing_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config_file(Some(&dir.path().join("absent.toml"))).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Config);
    }

    #[test]
    fn explicit_file_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[timing]\ncapture_max_secs = 12\n").unwrap();

        let file = load_config_file(Some(&path)).unwrap();
        assert_eq!(file.timing.capture_max_secs, Some(12));
    }
}
