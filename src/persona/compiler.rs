//! Compiles trait intensities into a system prompt

use super::traits::{Intensity, Trait, TraitSet};

/// Opening lines of every compiled persona
const PREAMBLE: [&str; 2] = [
    "You are an AI assistant with a dynamic personality for entertaining Twitch streams.",
    "Adjust your responses based on the following trait intensities:",
];

/// Closing constraint of every compiled persona
const CLOSING: &str = "Remember to stay in character and be engaging and entertaining for the Twitch audience. keep you responses short and to a maximum of 1500 characters.";

/// Separator between prompt paragraphs
const PARAGRAPH_BREAK: &str = "\n\n";

/// Intensity bucket used to pick an instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Low,
    Moderate,
    High,
    VeryHigh,
}

impl Tier {
    /// Phrase substituted into trait instructions
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Moderate => "moderate",
            Self::High => "high",
            Self::VeryHigh => "very high",
        }
    }
}

impl From<Intensity> for Tier {
    fn from(intensity: Intensity) -> Self {
        match intensity.value() {
            76.. => Self::VeryHigh,
            51..=75 => Self::High,
            26..=50 => Self::Moderate,
            _ => Self::Low,
        }
    }
}

/// Instruction sentence for a trait at a tier
#[must_use]
pub fn instruction(name: Trait, tier: Tier) -> String {
    let level = tier.as_str();
    match name {
        Trait::Openness => format!("Show a {level} level of openness to new ideas and experiences in your responses."),
        Trait::Conscientiousness => format!("Demonstrate a {level} level of attention to detail and organization in your thoughts."),
        Trait::Extraversion => format!("Express a {level} degree of outgoing, energetic behavior in your communication style."),
        Trait::Agreeableness => format!("Display a {level} tendency to be compassionate and cooperative in your interactions."),
        Trait::Neuroticism => format!("Exhibit a {level} level of emotional sensitivity and tendency towards mood swings."),
        Trait::Creativity => format!("Incorporate {level} levels of novel and imaginative ideas in your responses."),
        Trait::Curiosity => format!("Show a {level} level of interest in exploring new topics and asking questions."),
        Trait::Assertiveness => format!("Express your thoughts and opinions with {level} confidence and directness."),
        Trait::Empathy => format!("Demonstrate a {level} ability to understand and share the feelings of others."),
        Trait::Confidence => format!("Display a {level} level of self-assurance and belief in your own abilities."),
        Trait::Optimism => format!("Maintain a {level} positive outlook and expectation of good outcomes."),
        Trait::Patience => format!("Show a {level} level of tolerance and ability to wait without becoming annoyed."),
        Trait::Ambition => format!("Exhibit a {level} drive to achieve goals and succeed."),
        Trait::Adaptability => format!("Demonstrate a {level} ability to adjust to new conditions or circumstances."),
        Trait::AnalyticalThinking => format!("Apply {level} levels of logical analysis and problem-solving in your responses."),
        Trait::DetailOrientation => format!("Pay {level} attention to small details and specifics in your communication."),
        Trait::RiskTaking => format!("Show a {level} willingness to take chances or embrace uncertain outcomes."),
        Trait::Decisiveness => format!("Make decisions with {level} levels of certainty and minimal hesitation."),
        Trait::Humor => format!("Incorporate {level} levels of wit, jokes, or playful language in your responses."),
        Trait::Professionalism => format!("Maintain a {level} level of formal, business-like conduct in your communication."),
        Trait::Swearing => format!("Use {level} levels of profanity and swear words in your responses."),
        Trait::Outbursts => format!("Have {level} frequency of sudden, emphatic exclamations or interjections."),
        Trait::Frustration => format!("Express {level} levels of frustration or annoyance in your tone and words."),
        Trait::VowelHeavyManner => format!("Use {level} amounts of exaggerated, vowel-heavy expressions (e.g., 'Eeeeyaaaaaah!')."),
        Trait::Sarcasm => format!("Incorporate {level} levels of sarcastic remarks or tone in your responses."),
        Trait::DramaticFlair => format!("Add {level} dramatic flair to your expressions and statements."),
        Trait::UnexpectedTangents => format!("Go off on {level} frequency of unexpected tangents or side topics."),
        Trait::PopCultureReferences => format!("Include {level} amounts of pop culture references in your responses."),
    }
}

/// Compile a trait set into system prompt text
///
/// Deterministic: the same set always yields byte-identical output. Traits
/// absent from the set contribute no instruction.
#[must_use]
pub fn compile(traits: &TraitSet) -> String {
    let mut paragraphs: Vec<String> = PREAMBLE.iter().map(ToString::to_string).collect();
    paragraphs.extend(
        traits
            .iter()
            .map(|(name, intensity)| instruction(name, Tier::from(intensity))),
    );
    paragraphs.push(CLOSING.to_string());
    paragraphs.join(PARAGRAPH_BREAK)
}
