//! beacon-stream - voice-driven AI co-host for live streams
//!
//! This library provides the pieces of the beacon-stream assistant:
//! - Conversation state with token-budget eviction
//! - Persona trait sliders compiled into a system prompt
//! - Chat completion, speech recognition, synthesis and playback adapters
//! - The listen/reply loop and the operator control surface
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                 Control surface                      │
//! │   Console  │  Supervisor  │  Status light            │
//! └────────────────────┬─────────────────────────────────┘
//!          stdin: listen/stop │ stdout: events
//! ┌────────────────────▼─────────────────────────────────┐
//! │                   Assistant                          │
//! │   Mic → STT → Conversation → Chat → TTS → Speaker    │
//! └────────────────────┬─────────────────────────────────┘
//!                      │
//! ┌────────────────────▼─────────────────────────────────┐
//! │   persona file (JSON)   │   transcript backup (JSON) │
//! └──────────────────────────────────────────────────────┘
//! ```

pub mod assistant;
pub mod backend;
pub mod config;
pub mod control;
pub mod conversation;
pub mod daemon;
pub mod error;
pub mod ipc;
pub mod persona;
pub mod tokenizer;
pub mod voice;

pub use assistant::{Assistant, AssistantSettings, Collaborators, Control, CycleOutcome};
pub use backend::{BackendError, BackendErrorKind, ChatBackend, OpenAiBackend};
pub use config::Config;
pub use conversation::{Conversation, Role, TokenBudget, Transcript, Turn};
pub use daemon::Daemon;
pub use error::{Error, ErrorKind, Result};
pub use ipc::{AssistantEvent, EventSink, WireFormat};
pub use persona::{PersonaConfig, PersonaStore, Trait, TraitSet};
pub use tokenizer::{TiktokenCounter, Tokenizer};
