//! The assistant loop: listen, transcribe, reply, speak
//!
//! One cycle runs per `BeginListening` signal. Cycles are strictly
//! sequential and run on the caller's task, since audio streams are not
//! `Send`. A failed cycle is reported and the loop waits for the next
//! signal; only a critical initialization failure ends it.

use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::backend::ChatBackend;
use crate::config::Config;
use crate::conversation::{Conversation, TranscriptBackup};
use crate::error::ErrorKind;
use crate::ipc::{AssistantEvent, EventSink};
use crate::persona::{PersonaSource, PersonaStore};
use crate::voice::{Microphone, Speaker, Synthesizer, Transcriber, samples_to_wav};
use crate::Result;

/// Operator signal driving the loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    /// Start a cycle by opening the microphone
    BeginListening,
    /// End the current capture and process it
    StopListening,
}

/// External services and devices used by each cycle
pub struct Collaborators {
    pub backend: Box<dyn ChatBackend>,
    pub microphone: Box<dyn Microphone>,
    pub transcriber: Box<dyn Transcriber>,
    pub synthesizer: Box<dyn Synthesizer>,
    pub speaker: Box<dyn Speaker>,
}

/// File locations and timing for the loop
#[derive(Debug, Clone)]
pub struct AssistantSettings {
    pub persona_path: PathBuf,
    pub backup_path: PathBuf,
    pub capture_max_duration: Duration,
    pub shutdown_grace: Duration,
}

impl From<&Config> for AssistantSettings {
    fn from(config: &Config) -> Self {
        Self {
            persona_path: config.persona_path.clone(),
            backup_path: config.backup_path.clone(),
            capture_max_duration: config.capture_max_duration,
            shutdown_grace: config.shutdown_grace,
        }
    }
}

/// How a cycle ended without error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Reply produced and spoken
    Replied(String),
    /// Capture held no audio
    NoAudio,
    /// Audio held no recognizable speech
    NoSpeech,
}

/// Voice assistant bound to one conversation
pub struct Assistant {
    conversation: Conversation,
    personas: PersonaStore,
    backup: TranscriptBackup,
    collaborators: Collaborators,
    events: EventSink,
    capture_max_duration: Duration,
    shutdown_grace: Duration,
    installed_prompt: Option<String>,
}

impl Assistant {
    #[must_use]
    pub fn new(
        settings: AssistantSettings,
        conversation: Conversation,
        collaborators: Collaborators,
        events: EventSink,
    ) -> Self {
        Self {
            conversation,
            personas: PersonaStore::new(settings.persona_path),
            backup: TranscriptBackup::new(settings.backup_path),
            collaborators,
            events,
            capture_max_duration: settings.capture_max_duration,
            shutdown_grace: settings.shutdown_grace,
            installed_prompt: None,
        }
    }

    /// Conversation owned by this assistant
    #[must_use]
    pub const fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Serve control signals until `shutdown` resolves or the signal
    /// channel closes
    ///
    /// A cycle in flight at shutdown gets the configured grace period to
    /// finish before it is abandoned.
    ///
    /// # Errors
    ///
    /// Returns error only for `CriticalInit` failures
    pub async fn run<S>(&mut self, mut controls: mpsc::Receiver<Control>, shutdown: S) -> Result<()>
    where
        S: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let grace = self.shutdown_grace;
        self.events.diagnostic("assistant ready, waiting for a listen signal");

        loop {
            let control = tokio::select! {
                () = &mut shutdown => {
                    tracing::info!("shutdown requested while idle");
                    break;
                }
                control = controls.recv() => control,
            };

            match control {
                None => {
                    tracing::info!("control channel closed");
                    break;
                }
                Some(Control::StopListening) => {
                    tracing::debug!("stop signal outside a capture, ignoring");
                    continue;
                }
                Some(Control::BeginListening) => {}
            }

            let (result, interrupted) = {
                let cycle = self.cycle(&mut controls);
                tokio::pin!(cycle);

                tokio::select! {
                    result = &mut cycle => (Some(result), false),
                    () = &mut shutdown => {
                        tracing::info!(grace_ms = grace.as_millis(), "shutdown requested, finishing cycle");
                        (tokio::time::timeout(grace, &mut cycle).await.ok(), true)
                    }
                }
            };

            match result {
                Some(result) => self.report(result)?,
                None => {
                    tracing::warn!("cycle abandoned after grace period");
                    self.events.diagnostic("cycle abandoned at shutdown");
                }
            }

            if interrupted {
                break;
            }
        }

        tracing::info!(turns = self.conversation.len(), "assistant stopped");
        Ok(())
    }

    /// One listen, transcribe, reply, speak pass
    ///
    /// # Errors
    ///
    /// Returns the first failing step's error
    pub async fn cycle(&mut self, controls: &mut mpsc::Receiver<Control>) -> Result<CycleOutcome> {
        self.apply_persona();

        let samples = self.capture(controls).await?;
        if samples.is_empty() {
            self.events.diagnostic("no audio captured");
            return Ok(CycleOutcome::NoAudio);
        }

        let wav = samples_to_wav(&samples, self.collaborators.microphone.sample_rate())?;
        let heard = self.collaborators.transcriber.transcribe(&wav).await?;
        let heard = heard.trim();
        if heard.is_empty() {
            self.events.diagnostic("no speech recognized");
            return Ok(CycleOutcome::NoSpeech);
        }
        self.events.diagnostic(format!("heard: {heard}"));

        self.conversation.append_user_turn(heard)?;
        let reply = self
            .conversation
            .request_completion(self.collaborators.backend.as_ref())
            .await?;

        if let Err(e) = self.backup.write(&self.conversation.snapshot()) {
            tracing::warn!(error = %e, "transcript backup failed");
            self.events.diagnostic(format!("transcript backup failed: {e}"));
        }

        self.events.emit(AssistantEvent::Response {
            text: reply.clone(),
        });

        let audio = self.collaborators.synthesizer.synthesize(&reply).await?;
        self.collaborators.speaker.play_mp3(&audio).await?;

        self.events.diagnostic("finished processing dialogue, ready for next input");
        Ok(CycleOutcome::Replied(reply))
    }

    /// Re-read the persona file and install its prompt as the system turn
    fn apply_persona(&mut self) {
        let loaded = self.personas.load();
        if let Some(diagnostic) = &loaded.diagnostic {
            self.events.diagnostic(diagnostic.clone());
        }
        if loaded.source == PersonaSource::Default && self.installed_prompt.is_none() {
            tracing::info!("using default persona");
        }

        let prompt = loaded.config.system_prompt();
        if self.installed_prompt.as_deref() == Some(prompt.as_str()) {
            return;
        }

        self.conversation.install_system_turn(&prompt);
        tracing::info!(source = ?loaded.source, chars = prompt.len(), "persona installed");
        self.installed_prompt = Some(prompt);
        self.events.emit(AssistantEvent::ConfigApplied);
    }

    /// Record until a stop signal, channel close, or the duration cap
    async fn capture(&mut self, controls: &mut mpsc::Receiver<Control>) -> Result<Vec<f32>> {
        self.collaborators.microphone.start()?;
        self.events.diagnostic("listening");

        let deadline = tokio::time::sleep(self.capture_max_duration);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                control = controls.recv() => match control {
                    Some(Control::StopListening) | None => break,
                    Some(Control::BeginListening) => {
                        tracing::debug!("already listening");
                    }
                },
                () = &mut deadline => {
                    tracing::info!(
                        max_secs = self.capture_max_duration.as_secs(),
                        "capture limit reached"
                    );
                    self.events.diagnostic("capture limit reached");
                    break;
                }
            }
        }

        let samples = self.collaborators.microphone.stop();
        tracing::debug!(samples = samples.len(), "capture finished");
        Ok(samples)
    }

    /// Log and announce a finished cycle; pass critical failures up
    fn report(&self, result: Result<CycleOutcome>) -> Result<()> {
        match result {
            Ok(outcome) => {
                tracing::debug!(?outcome, "cycle complete");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::CriticalInit => Err(e),
            Err(e) => {
                tracing::error!(error = %e, kind = ?e.kind(), retryable = e.is_retryable(), "cycle failed");
                self.events.diagnostic(format!(
                    "an error occurred: {e}; the assistant will continue running"
                ));
                Ok(())
            }
        }
    }
}

/// Forward every decoded signal into `tx` until end of input
///
/// Lines: empty or `listen` begins a capture, `stop` ends it. Blocks the
/// calling thread; dropping `tx` at end of input closes the channel.
pub fn read_controls<R: std::io::BufRead>(reader: R, tx: &mpsc::Sender<Control>) {
    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!(error = %e, "control input failed");
                return;
            }
        };
        let Some(control) = parse_control(&line) else {
            tracing::warn!(line = %line, "unrecognized control line");
            continue;
        };
        if tx.blocking_send(control).is_err() {
            return;
        }
    }
    tracing::debug!("control input closed");
}

/// Map one control line to a signal
#[must_use]
pub fn parse_control(line: &str) -> Option<Control> {
    match line.trim().to_ascii_lowercase().as_str() {
        "" | "listen" | "start" => Some(Control::BeginListening),
        "stop" => Some(Control::StopListening),
        _ => None,
    }
}

impl std::fmt::Debug for Assistant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Assistant")
            .field("conversation", &self.conversation)
            .field("personas", &self.personas)
            .field("backup", &self.backup)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_lines_map_to_signals() {
        assert_eq!(parse_control(""), Some(Control::BeginListening));
        assert_eq!(parse_control("listen\n"), Some(Control::BeginListening));
        assert_eq!(parse_control(" STOP "), Some(Control::StopListening));
        assert_eq!(parse_control("dance"), None);
    }

    #[test]
    fn control_reader_skips_unknown_lines() {
        let input: &[u8] = b"listen\nbogus\nstop\n";
        let (tx, mut rx) = mpsc::channel(8);

        read_controls(input, &tx);
        drop(tx);

        assert_eq!(rx.blocking_recv(), Some(Control::BeginListening));
        assert_eq!(rx.blocking_recv(), Some(Control::StopListening));
        assert_eq!(rx.blocking_recv(), None);
    }
}
