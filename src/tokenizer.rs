//! Token accounting for chat transcripts
//!
//! Counting rules depend on the active chat model, so every tokenizer is
//! resolved by model name and reports which model it counts for.

use tiktoken_rs::CoreBPE;

use crate::conversation::Turn;
use crate::{Error, Result};

/// Framing tokens around every message (`<im_start>{role}\n{content}<im_end>\n`)
const TOKENS_PER_MESSAGE: usize = 4;

/// Every reply is primed with `<im_start>assistant`
const REPLY_PRIMING_TOKENS: usize = 2;

/// Maps a transcript to a token count under a model's accounting rules
pub trait Tokenizer: Send + Sync {
    /// Model whose accounting this tokenizer implements
    fn model(&self) -> &str;

    /// Count the tokens a request carrying `turns` would consume
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedModel` if the accounting rule is unavailable
    fn count(&self, turns: &[Turn]) -> Result<usize>;
}

/// BPE tokenizer backed by `tiktoken`
pub struct TiktokenCounter {
    model: String,
    bpe: CoreBPE,
}

impl TiktokenCounter {
    /// Resolve the encoding for a chat model
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedModel` if no encoding is registered for `model`
    pub fn for_model(model: &str) -> Result<Self> {
        let bpe = tiktoken_rs::get_bpe_from_model(model).map_err(|e| {
            tracing::debug!(model, error = %e, "no encoding for model");
            Error::UnsupportedModel(model.to_string())
        })?;

        tracing::debug!(model, "token accounting initialized");

        Ok(Self {
            model: model.to_string(),
            bpe,
        })
    }

    /// Special-token markup in user text is counted as plain text
    fn encoded_len(&self, text: &str) -> usize {
        self.bpe.encode_ordinary(text).len()
    }
}

impl Tokenizer for TiktokenCounter {
    fn model(&self) -> &str {
        &self.model
    }

    fn count(&self, turns: &[Turn]) -> Result<usize> {
        let framed: usize = turns
            .iter()
            .map(|turn| {
                TOKENS_PER_MESSAGE
                    + self.encoded_len(turn.role.as_str())
                    + self.encoded_len(&turn.content)
            })
            .sum();

        Ok(framed + REPLY_PRIMING_TOKENS)
    }
}

impl std::fmt::Debug for TiktokenCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TiktokenCounter")
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn unknown_model_is_rejected() {
        let err = TiktokenCounter::for_model("definitely-not-a-model").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedModel);
        assert!(err.to_string().contains("definitely-not-a-model"));
    }

    #[test]
    fn counts_framing_role_and_content() {
        let counter = TiktokenCounter::for_model("gpt-4").unwrap();
        assert_eq!(counter.model(), "gpt-4");

        // 4 framing + "user" + "hello" + 2 priming
        let count = counter.count(&[Turn::user("hello")]).unwrap();
        assert_eq!(count, 8);
    }

    #[test]
    fn empty_transcript_costs_only_priming() {
        let counter = TiktokenCounter::for_model("gpt-4").unwrap();
        assert_eq!(counter.count(&[]).unwrap(), REPLY_PRIMING_TOKENS);
    }

    #[test]
    fn special_token_text_counts_as_ordinary_text() {
        let counter = TiktokenCounter::for_model("gpt-4").unwrap();
        // 4 framing + "user" + 2 priming
        let overhead = counter.count(&[Turn::user("x")]).unwrap() - 1;
        let marked = counter.count(&[Turn::user("<|endoftext|>")]).unwrap();
        assert!(marked - overhead > 1);
    }

    #[test]
    fn longer_content_costs_more() {
        let counter = TiktokenCounter::for_model("gpt-4").unwrap();
        let short = counter.count(&[Turn::user("hi")]).unwrap();
        let long = counter
            .count(&[Turn::user("hi there, how is the stream going tonight?")])
            .unwrap();
        assert!(long > short);
    }
}
