//! Daemon - the assistant process
//!
//! Builds the collaborators from configuration, restores the conversation,
//! and runs the assistant loop with stdin as the control channel and
//! stdout as the event channel.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::assistant::{Assistant, AssistantSettings, Collaborators, read_controls};
use crate::backend::OpenAiBackend;
use crate::config::{SttProvider, TtsProvider};
use crate::conversation::{Conversation, TokenBudget, TranscriptBackup};
use crate::ipc::{self, EventSink, WireFormat};
use crate::tokenizer::TiktokenCounter;
use crate::voice::{AudioCapture, AudioPlayback, SpeechToText, Synthesizer, TextToSpeech, Transcriber};
use crate::{Config, Error, Result};

/// Control signals buffered between stdin and the loop
const CONTROL_BUFFER: usize = 16;

/// The beacon-stream assistant process
pub struct Daemon {
    config: Config,
    wire: WireFormat,
    resume: bool,
}

impl Daemon {
    /// Create a daemon; `resume` restores the transcript backup
    #[must_use]
    pub const fn new(config: Config, wire: WireFormat, resume: bool) -> Self {
        Self {
            config,
            wire,
            resume,
        }
    }

    /// Run until ctrl-c or end of stdin
    ///
    /// # Errors
    ///
    /// Returns `CriticalInit` if a required collaborator cannot be built
    #[allow(clippy::future_not_send)]
    pub async fn run(self) -> Result<()> {
        let conversation = self.conversation()?;
        let collaborators = build_collaborators(&self.config).await?;

        let (events, rx) = EventSink::channel();
        let writer = tokio::spawn(ipc::write_stdout(rx, self.wire));

        let (tx, controls) = mpsc::channel(CONTROL_BUFFER);
        std::thread::Builder::new()
            .name("control-input".to_string())
            .spawn(move || read_controls(std::io::stdin().lock(), &tx))?;

        tracing::info!(
            model = %self.config.chat.model,
            max_tokens = self.config.chat.max_tokens,
            persona = %self.config.persona_path.display(),
            wire = ?self.wire,
            "assistant running, send an empty line to listen"
        );

        let mut assistant = Assistant::new(
            AssistantSettings::from(&self.config),
            conversation,
            collaborators,
            events,
        );

        let shutdown = async {
            if tokio::signal::ctrl_c().await.is_err() {
                std::future::pending::<()>().await;
            }
            tracing::info!("interrupt received");
        };

        let result = assistant.run(controls, shutdown).await;

        drop(assistant);
        if let Err(e) = writer.await {
            tracing::warn!(error = %e, "event writer failed");
        }

        result
    }

    /// Fresh conversation, or the backed-up one when resuming
    ///
    /// # Errors
    ///
    /// Returns `CriticalInit` if the model has no token accounting, or an
    /// error if the backup exists but cannot be restored
    pub fn conversation(&self) -> Result<Conversation> {
        let budget = build_budget(&self.config)?;
        if !self.resume {
            return Ok(Conversation::new(budget));
        }

        let backup = TranscriptBackup::new(&self.config.backup_path);
        match backup.load()? {
            Some(turns) => {
                tracing::info!(turns = turns.len(), path = %backup.path().display(), "resuming transcript");
                Conversation::restore(budget, turns)
            }
            None => {
                tracing::info!(path = %backup.path().display(), "no backup to resume, starting fresh");
                Ok(Conversation::new(budget))
            }
        }
    }
}

/// Token budget for the configured model
///
/// # Errors
///
/// Returns `CriticalInit` if the model has no token accounting
pub fn build_budget(config: &Config) -> Result<TokenBudget> {
    let counter = TiktokenCounter::for_model(&config.chat.model)
        .map_err(|e| Error::CriticalInit(e.to_string()))?;
    Ok(TokenBudget::new(Arc::new(counter), config.chat.max_tokens))
}

/// Speech recognizer for the configured provider
///
/// # Errors
///
/// Returns `CriticalInit` if credentials are missing
pub fn build_transcriber(config: &Config) -> Result<Box<dyn Transcriber>> {
    let keys = &config.api_keys;
    let stt = match config.stt.provider {
        SttProvider::Whisper => SpeechToText::new_whisper(
            keys.openai.clone().unwrap_or_default(),
            config.stt.model.clone(),
        )?,
        SttProvider::Azure => SpeechToText::new_azure(
            keys.azure_speech.clone().unwrap_or_default(),
            keys.azure_region.clone().unwrap_or_default(),
            config.stt.language.clone(),
        )?,
    };
    Ok(Box::new(stt))
}

/// Speech synthesizer for the configured provider
///
/// # Errors
///
/// Returns `CriticalInit` if credentials are missing or the voice is unknown
pub async fn build_synthesizer(config: &Config) -> Result<Box<dyn Synthesizer>> {
    let keys = &config.api_keys;
    let tts = match config.tts.provider {
        TtsProvider::OpenAi => TextToSpeech::new_openai(
            keys.openai.clone().unwrap_or_default(),
            config.tts.voice.clone(),
            config.tts.speed,
            config.tts.model.clone(),
        )?,
        TtsProvider::ElevenLabs => {
            TextToSpeech::new_elevenlabs(
                keys.elevenlabs.clone().unwrap_or_default(),
                &config.tts.voice,
                config.tts.model.clone(),
            )
            .await?
        }
    };
    Ok(Box::new(tts))
}

/// Build every collaborator, failing fast on the first that cannot start
///
/// # Errors
///
/// Returns `CriticalInit` naming the collaborator that failed
pub async fn build_collaborators(config: &Config) -> Result<Collaborators> {
    let backend = OpenAiBackend::new(
        config.api_keys.openai.clone().unwrap_or_default(),
        config.chat.model.clone(),
        config.chat.base_url.clone(),
        config.chat.request_timeout,
    )?;

    let microphone =
        AudioCapture::new().map_err(|e| Error::CriticalInit(format!("microphone: {e}")))?;
    let speaker =
        AudioPlayback::new().map_err(|e| Error::CriticalInit(format!("speaker: {e}")))?;

    let transcriber = build_transcriber(config)?;
    let synthesizer = build_synthesizer(config).await?;

    Ok(Collaborators {
        backend: Box::new(backend),
        microphone: Box::new(microphone),
        transcriber,
        synthesizer,
        speaker: Box::new(speaker),
    })
}
