//! Shared test utilities
#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use beacon_stream::assistant::{AssistantSettings, Collaborators};
use beacon_stream::backend::{BackendError, ChatBackend};
use beacon_stream::voice::{Microphone, Speaker, Synthesizer, Transcriber};
use beacon_stream::{Result, TokenBudget, Tokenizer, Turn};

/// One token per whitespace-separated word, plus one per turn
#[derive(Debug)]
pub struct WordCounter;

impl Tokenizer for WordCounter {
    fn model(&self) -> &str {
        "word-counter"
    }

    fn count(&self, turns: &[Turn]) -> Result<usize> {
        Ok(turns
            .iter()
            .map(|t| 1 + t.content.split_whitespace().count())
            .sum())
    }
}

/// Budget measured in words
#[must_use]
pub fn word_budget(max_tokens: usize) -> TokenBudget {
    TokenBudget::new(Arc::new(WordCounter), max_tokens)
}

/// Settings pointing at files inside `dir`, with short timings
#[must_use]
pub fn settings_in(dir: &Path) -> AssistantSettings {
    AssistantSettings {
        persona_path: dir.join("ai_assistant_config.json"),
        backup_path: dir.join("ChatHistoryBackup.txt"),
        capture_max_duration: Duration::from_secs(5),
        shutdown_grace: Duration::from_millis(200),
    }
}

/// Backend replying from a script and recording every transcript it saw
#[derive(Clone, Default)]
pub struct ScriptedBackend {
    replies: Arc<Mutex<VecDeque<std::result::Result<String, BackendError>>>>,
    pub seen: Arc<Mutex<Vec<Vec<Turn>>>>,
}

impl ScriptedBackend {
    pub fn new<I>(replies: I) -> Self
    where
        I: IntoIterator<Item = std::result::Result<String, BackendError>>,
    {
        Self {
            replies: Arc::new(Mutex::new(replies.into_iter().collect())),
            seen: Arc::default(),
        }
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}

#[async_trait]
impl ChatBackend for ScriptedBackend {
    async fn complete(&self, transcript: &[Turn]) -> std::result::Result<Turn, BackendError> {
        self.seen.lock().unwrap().push(transcript.to_vec());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok("out of script".to_string()))
            .map(Turn::assistant)
    }
}

/// Microphone yielding a fixed clip per capture
pub struct FakeMicrophone {
    clip: Vec<f32>,
    pub starts: Arc<Mutex<usize>>,
}

impl FakeMicrophone {
    pub fn new(clip: Vec<f32>) -> Self {
        Self {
            clip,
            starts: Arc::default(),
        }
    }
}

impl Microphone for FakeMicrophone {
    fn start(&mut self) -> Result<()> {
        *self.starts.lock().unwrap() += 1;
        Ok(())
    }

    fn stop(&mut self) -> Vec<f32> {
        self.clip.clone()
    }

    fn sample_rate(&self) -> u32 {
        16_000
    }
}

/// Transcriber returning scripted text, then silence
#[derive(Clone, Default)]
pub struct ScriptedTranscriber {
    results: Arc<Mutex<VecDeque<Result<String>>>>,
}

impl ScriptedTranscriber {
    pub fn new<I>(results: I) -> Self
    where
        I: IntoIterator<Item = Result<String>>,
    {
        Self {
            results: Arc::new(Mutex::new(results.into_iter().collect())),
        }
    }
}

#[async_trait]
impl Transcriber for ScriptedTranscriber {
    async fn transcribe(&self, wav: &[u8]) -> Result<String> {
        assert_eq!(&wav[0..4], b"RIFF");
        self.results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(String::new()))
    }
}

/// Synthesizer returning the text bytes as "audio"
pub struct EchoSynthesizer;

#[async_trait]
impl Synthesizer for EchoSynthesizer {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        Ok(text.as_bytes().to_vec())
    }
}

/// Speaker recording what it was asked to play
#[derive(Clone, Default)]
pub struct RecordingSpeaker {
    pub played: Arc<Mutex<Vec<Vec<u8>>>>,
}

#[async_trait(?Send)]
impl Speaker for RecordingSpeaker {
    async fn play_mp3(&mut self, audio: &[u8]) -> Result<()> {
        self.played.lock().unwrap().push(audio.to_vec());
        Ok(())
    }
}

/// Handles onto the fakes after they move into [`Collaborators`]
pub struct Probes {
    pub backend: ScriptedBackend,
    pub speaker: RecordingSpeaker,
    pub mic_starts: Arc<Mutex<usize>>,
}

/// Wire the fakes together with a half-second clip of noise
pub fn fake_collaborators(
    backend: ScriptedBackend,
    transcriber: ScriptedTranscriber,
) -> (Collaborators, Probes) {
    let microphone = FakeMicrophone::new(vec![0.1; 8_000]);
    let speaker = RecordingSpeaker::default();
    let probes = Probes {
        backend: backend.clone(),
        speaker: speaker.clone(),
        mic_starts: Arc::clone(&microphone.starts),
    };

    let collaborators = Collaborators {
        backend: Box::new(backend),
        microphone: Box::new(microphone),
        transcriber: Box::new(transcriber),
        synthesizer: Box::new(EchoSynthesizer),
        speaker: Box::new(speaker),
    };

    (collaborators, probes)
}
