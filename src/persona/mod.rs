//! Persona: trait sliders compiled into the assistant's system prompt
//!
//! Traits are edited by the operator, compiled into prompt text, and handed
//! to the assistant through a JSON file that is re-read every cycle.

mod compiler;
mod config;
mod traits;

pub use compiler::{Tier, compile, instruction};
pub use config::{
    DEFAULT_PERSONA_FILE, LoadedPersona, PersonaConfig, PersonaSource, PersonaStore,
};
pub use traits::{DEFAULT_INTENSITY, Intensity, MAX_INTENSITY, Trait, TraitSet};
