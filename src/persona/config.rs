//! Persona configuration file shared by the control surface and the assistant
//!
//! The control surface writes the file on commit; the assistant re-reads it
//! at the start of every cycle. Readers never fail on a missing or torn
//! file: they fall back to the last good persona, or the default one.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::Result;
use crate::conversation::write_json_atomic;

use super::compiler::compile;
use super::traits::TraitSet;

/// Default persona file name
pub const DEFAULT_PERSONA_FILE: &str = "ai_assistant_config.json";

/// Persisted persona: trait sliders plus the prompt text actually used
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonaConfig {
    #[serde(default)]
    pub traits: TraitSet,

    /// Compiled or operator-edited system prompt
    #[serde(default)]
    pub custom_text: String,
}

impl PersonaConfig {
    /// Build a config whose prompt is compiled from `traits`
    #[must_use]
    pub fn compiled(traits: TraitSet) -> Self {
        let custom_text = compile(&traits);
        Self {
            traits,
            custom_text,
        }
    }

    /// Text to install as the system turn
    #[must_use]
    pub fn system_prompt(&self) -> String {
        if self.custom_text.trim().is_empty() {
            compile(&self.traits)
        } else {
            self.custom_text.clone()
        }
    }
}

impl Default for PersonaConfig {
    fn default() -> Self {
        Self::compiled(TraitSet::default())
    }
}

/// Where a loaded persona came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersonaSource {
    /// Parsed from the file
    File,
    /// File absent or unreadable and nothing loaded before
    Default,
    /// File unreadable; reusing the last persona that parsed
    PreviousGood,
}

/// Result of reading the persona file
#[derive(Debug, Clone)]
pub struct LoadedPersona {
    pub config: PersonaConfig,
    pub source: PersonaSource,
    /// Operator-facing explanation when the file could not be used
    pub diagnostic: Option<String>,
}

/// Reads and writes the persona file, remembering the last good read
#[derive(Debug)]
pub struct PersonaStore {
    path: PathBuf,
    last_good: Option<PersonaConfig>,
}

impl PersonaStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            last_good: None,
        }
    }

    /// Location of the persona file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the persona file, falling back instead of failing
    pub fn load(&mut self) -> LoadedPersona {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "no persona file");
                return self.fallback(None);
            }
            Err(e) => {
                return self.fallback(Some(format!(
                    "could not read {}: {e}",
                    self.path.display()
                )));
            }
        };

        match serde_json::from_str::<PersonaConfig>(&raw) {
            Ok(config) => {
                self.last_good = Some(config.clone());
                LoadedPersona {
                    config,
                    source: PersonaSource::File,
                    diagnostic: None,
                }
            }
            Err(e) => self.fallback(Some(format!(
                "could not parse {}: {e}",
                self.path.display()
            ))),
        }
    }

    /// Atomically replace the persona file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be written
    pub fn save(&self, config: &PersonaConfig) -> Result<()> {
        write_json_atomic(&self.path, config)?;
        tracing::info!(path = %self.path.display(), "persona configuration saved");
        Ok(())
    }

    fn fallback(&self, diagnostic: Option<String>) -> LoadedPersona {
        if let Some(msg) = &diagnostic {
            tracing::warn!("{msg}");
        }

        match &self.last_good {
            Some(config) if diagnostic.is_some() => LoadedPersona {
                config: config.clone(),
                source: PersonaSource::PreviousGood,
                diagnostic,
            },
            _ => LoadedPersona {
                config: PersonaConfig::default(),
                source: PersonaSource::Default,
                diagnostic,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persona::{Intensity, Trait};

    #[test]
    fn missing_file_yields_default_persona() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = PersonaStore::new(dir.path().join("persona.json"));

        let loaded = store.load();

        assert_eq!(loaded.source, PersonaSource::Default);
        assert!(loaded.diagnostic.is_none());
        assert_eq!(loaded.config.traits, TraitSet::default());
        assert_eq!(loaded.config.system_prompt(), compile(&TraitSet::default()));
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = PersonaStore::new(dir.path().join("persona.json"));

        let mut traits = TraitSet::default();
        traits.set(Trait::Sarcasm, Intensity::new(90).unwrap());
        let config = PersonaConfig::compiled(traits);
        store.save(&config).unwrap();

        let loaded = store.load();
        assert_eq!(loaded.source, PersonaSource::File);
        assert_eq!(loaded.config, config);
    }

    #[test]
    fn malformed_file_falls_back_to_default_with_diagnostic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("persona.json");
        std::fs::write(&path, "{ not json").unwrap();
        let mut store = PersonaStore::new(&path);

        let loaded = store.load();

        assert_eq!(loaded.source, PersonaSource::Default);
        assert!(loaded.diagnostic.unwrap().contains("could not parse"));
    }

    #[test]
    fn torn_write_falls_back_to_previous_good() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("persona.json");
        let mut store = PersonaStore::new(&path);

        let good = PersonaConfig {
            traits: TraitSet::default(),
            custom_text: "be a pirate".to_string(),
        };
        store.save(&good).unwrap();
        assert_eq!(store.load().source, PersonaSource::File);

        std::fs::write(&path, "{\"traits\": {\"hum").unwrap();
        let loaded = store.load();

        assert_eq!(loaded.source, PersonaSource::PreviousGood);
        assert_eq!(loaded.config.system_prompt(), "be a pirate");
        assert!(loaded.diagnostic.is_some());
    }

    #[test]
    fn empty_custom_text_compiles_traits() {
        let config: PersonaConfig =
            serde_json::from_str(r#"{"traits": {"humor": 0}, "custom_text": ""}"#).unwrap();
        let prompt = config.system_prompt();
        assert!(prompt.contains("Incorporate low levels of wit"));
        assert!(!prompt.contains("openness"));
    }

    #[test]
    fn custom_text_overrides_traits() {
        let config = PersonaConfig {
            traits: TraitSet::default(),
            custom_text: "You are a grumpy wizard.".to_string(),
        };
        assert_eq!(config.system_prompt(), "You are a grumpy wizard.");
    }
}
