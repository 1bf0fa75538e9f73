//! Personality traits and their intensities

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Intensity every trait starts at
pub const DEFAULT_INTENSITY: u8 = 50;

/// Highest allowed intensity
pub const MAX_INTENSITY: u8 = 100;

/// One of the fixed personality sliders
///
/// Declaration order is the canonical order used for display and prompt
/// compilation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trait {
    Openness,
    Conscientiousness,
    Extraversion,
    Agreeableness,
    Neuroticism,
    Creativity,
    Curiosity,
    Assertiveness,
    Empathy,
    Confidence,
    Optimism,
    Patience,
    Ambition,
    Adaptability,
    AnalyticalThinking,
    DetailOrientation,
    RiskTaking,
    Decisiveness,
    Humor,
    Professionalism,
    Swearing,
    Outbursts,
    Frustration,
    VowelHeavyManner,
    Sarcasm,
    DramaticFlair,
    UnexpectedTangents,
    PopCultureReferences,
}

impl Trait {
    /// All traits in canonical order
    pub const ALL: [Self; 28] = [
        Self::Openness,
        Self::Conscientiousness,
        Self::Extraversion,
        Self::Agreeableness,
        Self::Neuroticism,
        Self::Creativity,
        Self::Curiosity,
        Self::Assertiveness,
        Self::Empathy,
        Self::Confidence,
        Self::Optimism,
        Self::Patience,
        Self::Ambition,
        Self::Adaptability,
        Self::AnalyticalThinking,
        Self::DetailOrientation,
        Self::RiskTaking,
        Self::Decisiveness,
        Self::Humor,
        Self::Professionalism,
        Self::Swearing,
        Self::Outbursts,
        Self::Frustration,
        Self::VowelHeavyManner,
        Self::Sarcasm,
        Self::DramaticFlair,
        Self::UnexpectedTangents,
        Self::PopCultureReferences,
    ];

    /// Key used in the persona file
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Openness => "openness",
            Self::Conscientiousness => "conscientiousness",
            Self::Extraversion => "extraversion",
            Self::Agreeableness => "agreeableness",
            Self::Neuroticism => "neuroticism",
            Self::Creativity => "creativity",
            Self::Curiosity => "curiosity",
            Self::Assertiveness => "assertiveness",
            Self::Empathy => "empathy",
            Self::Confidence => "confidence",
            Self::Optimism => "optimism",
            Self::Patience => "patience",
            Self::Ambition => "ambition",
            Self::Adaptability => "adaptability",
            Self::AnalyticalThinking => "analytical_thinking",
            Self::DetailOrientation => "detail_orientation",
            Self::RiskTaking => "risk_taking",
            Self::Decisiveness => "decisiveness",
            Self::Humor => "humor",
            Self::Professionalism => "professionalism",
            Self::Swearing => "swearing",
            Self::Outbursts => "outbursts",
            Self::Frustration => "frustration",
            Self::VowelHeavyManner => "vowel_heavy_manner",
            Self::Sarcasm => "sarcasm",
            Self::DramaticFlair => "dramatic_flair",
            Self::UnexpectedTangents => "unexpected_tangents",
            Self::PopCultureReferences => "pop_culture_references",
        }
    }

    /// Human-readable label, e.g. "Analytical Thinking"
    #[must_use]
    pub fn label(self) -> String {
        self.as_str()
            .split('_')
            .map(|word| {
                let mut chars = word.chars();
                chars.next().map_or_else(String::new, |first| {
                    first.to_uppercase().chain(chars).collect()
                })
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl std::fmt::Display for Trait {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Trait {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let key = s.trim().to_lowercase().replace([' ', '-'], "_");
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == key)
            .ok_or_else(|| Error::InvalidInput(format!("unknown trait: {s}")))
    }
}

/// Intensity of a trait, 0 to 100 inclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Intensity(u8);

impl Intensity {
    /// Validate an operator-supplied intensity
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if `value` is above 100
    pub fn new(value: u8) -> Result<Self> {
        if value > MAX_INTENSITY {
            return Err(Error::InvalidInput(format!(
                "intensity {value} is outside 0-{MAX_INTENSITY}"
            )));
        }
        Ok(Self(value))
    }

    /// Clamp an arbitrary integer into range
    #[must_use]
    pub fn saturating(value: i64) -> Self {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        Self(value.clamp(0, i64::from(MAX_INTENSITY)) as u8)
    }

    #[must_use]
    pub const fn value(self) -> u8 {
        self.0
    }
}

impl Default for Intensity {
    fn default() -> Self {
        Self(DEFAULT_INTENSITY)
    }
}

/// Trait intensities, keyed and iterated in canonical order
///
/// Deserializing ignores unknown trait names and clamps out-of-range values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, serde_json::Value>")]
pub struct TraitSet(BTreeMap<Trait, Intensity>);

impl TraitSet {
    /// A set with no traits
    #[must_use]
    pub const fn empty() -> Self {
        Self(BTreeMap::new())
    }

    /// Intensity of `name`, if present
    #[must_use]
    pub fn get(&self, name: Trait) -> Option<Intensity> {
        self.0.get(&name).copied()
    }

    /// Set the intensity of `name`
    pub fn set(&mut self, name: Trait, intensity: Intensity) {
        self.0.insert(name, intensity);
    }

    /// Present traits in canonical order
    pub fn iter(&self) -> impl Iterator<Item = (Trait, Intensity)> + '_ {
        self.0.iter().map(|(t, i)| (*t, *i))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for TraitSet {
    /// Every trait at the default intensity
    fn default() -> Self {
        Self(
            Trait::ALL
                .into_iter()
                .map(|t| (t, Intensity::default()))
                .collect(),
        )
    }
}

impl FromIterator<(Trait, Intensity)> for TraitSet {
    fn from_iter<I: IntoIterator<Item = (Trait, Intensity)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl From<BTreeMap<String, serde_json::Value>> for TraitSet {
    fn from(raw: BTreeMap<String, serde_json::Value>) -> Self {
        let mut set = Self::empty();
        for (key, value) in raw {
            let Ok(name) = key.parse::<Trait>() else {
                tracing::debug!(key, "ignoring unknown trait");
                continue;
            };
            let Some(number) = value.as_i64().or_else(|| {
                #[allow(clippy::cast_possible_truncation)]
                value.as_f64().map(|f| f.round() as i64)
            }) else {
                tracing::warn!(key, %value, "ignoring non-numeric trait intensity");
                continue;
            };
            if !(0..=i64::from(MAX_INTENSITY)).contains(&number) {
                tracing::warn!(key, number, "clamping out-of-range trait intensity");
            }
            set.set(name, Intensity::saturating(number));
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn there_are_28_distinct_traits() {
        let mut names: Vec<_> = Trait::ALL.iter().map(|t| t.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), 28);
    }

    #[test]
    fn serde_names_match_as_str() {
        for t in Trait::ALL {
            let json = serde_json::to_string(&t).unwrap();
            assert_eq!(json, format!("\"{}\"", t.as_str()));
        }
    }

    #[test]
    fn labels_are_title_case() {
        assert_eq!(Trait::AnalyticalThinking.label(), "Analytical Thinking");
        assert_eq!(Trait::Humor.label(), "Humor");
    }

    #[test]
    fn parse_accepts_labels_and_keys() {
        assert_eq!("pop_culture_references".parse::<Trait>().unwrap(), Trait::PopCultureReferences);
        assert_eq!("Risk Taking".parse::<Trait>().unwrap(), Trait::RiskTaking);
        assert!("charisma".parse::<Trait>().is_err());
    }

    #[test]
    fn intensity_validation() {
        assert!(Intensity::new(100).is_ok());
        assert!(Intensity::new(101).is_err());
        assert_eq!(Intensity::saturating(-5).value(), 0);
        assert_eq!(Intensity::saturating(250).value(), 100);
    }

    #[test]
    fn default_set_has_every_trait_at_fifty() {
        let set = TraitSet::default();
        assert_eq!(set.len(), 28);
        assert!(set.iter().all(|(_, i)| i.value() == 50));
    }

    #[test]
    fn deserialize_ignores_unknown_and_clamps() {
        let set: TraitSet =
            serde_json::from_str(r#"{"humor": 80, "charisma": 99, "sarcasm": 140, "empathy": "x"}"#)
                .unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.get(Trait::Humor).unwrap().value(), 80);
        assert_eq!(set.get(Trait::Sarcasm).unwrap().value(), 100);
        assert!(set.get(Trait::Empathy).is_none());
    }

    #[test]
    fn serializes_with_snake_case_keys() {
        let set: TraitSet = [(Trait::RiskTaking, Intensity::new(10).unwrap())]
            .into_iter()
            .collect();
        let json = serde_json::to_value(&set).unwrap();
        assert_eq!(json["risk_taking"], 10);
    }
}
