//! Error types for beacon-stream

use thiserror::Error;

use crate::backend::{BackendError, BackendErrorKind};

/// Result type alias for beacon-stream operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in beacon-stream
#[derive(Debug, Error)]
pub enum Error {
    /// Missing or malformed configuration (persona file, credentials)
    #[error("configuration error: {0}")]
    Config(String),

    /// Caller supplied input the operation cannot accept
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Chat completion failed
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    /// A single turn does not fit in the context budget
    #[error("context budget exceeded: {tokens} tokens with a limit of {max_tokens}")]
    BudgetExceeded {
        /// Measured token count after all possible evictions
        tokens: usize,
        /// Configured ceiling
        max_tokens: usize,
    },

    /// No token accounting is registered for the model
    #[error("unsupported model for token accounting: {0}")]
    UnsupportedModel(String),

    /// Speech-to-text error
    #[error("transcription error: {0}")]
    Transcription(String),

    /// Text-to-speech error
    #[error("synthesis error: {0}")]
    Synthesis(String),

    /// Audio playback error
    #[error("playback error: {0}")]
    Playback(String),

    /// Audio device error (microphone or speaker unavailable)
    #[error("audio error: {0}")]
    Audio(String),

    /// Required collaborator could not be initialized at startup
    #[error("initialization failed: {0}")]
    CriticalInit(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Coarse classification used to decide how a failure is handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Config,
    InvalidInput,
    Backend(BackendErrorKind),
    BudgetExceeded,
    UnsupportedModel,
    Transcription,
    Synthesis,
    Playback,
    Audio,
    CriticalInit,
    Io,
}

impl Error {
    /// Classify this error
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) | Self::Toml(_) => ErrorKind::Config,
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::Backend(e) => ErrorKind::Backend(e.kind()),
            Self::BudgetExceeded { .. } => ErrorKind::BudgetExceeded,
            Self::UnsupportedModel(_) => ErrorKind::UnsupportedModel,
            Self::Transcription(_) => ErrorKind::Transcription,
            Self::Synthesis(_) => ErrorKind::Synthesis,
            Self::Playback(_) => ErrorKind::Playback,
            Self::Audio(_) => ErrorKind::Audio,
            Self::CriticalInit(_) => ErrorKind::CriticalInit,
            Self::Io(_) | Self::Http(_) | Self::Serialization(_) => ErrorKind::Io,
        }
    }

    /// Whether repeating the same request may succeed
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Backend(e) => e.is_retryable(),
            _ => false,
        }
    }
}
