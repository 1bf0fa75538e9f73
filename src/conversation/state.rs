//! Conversation state with token-budget enforcement
//!
//! The transcript keeps at most one system turn, always at index 0.
//! Eviction is FIFO over the non-system turns and never touches the system
//! turn or the newest turn.

use std::sync::Arc;

use crate::backend::ChatBackend;
use crate::tokenizer::Tokenizer;
use crate::{Error, Result};

use super::turn::{Role, Transcript, Turn};

/// Default maximum context size in tokens
pub const DEFAULT_MAX_TOKENS: usize = 8000;

/// Token ceiling applied before every completion
#[derive(Clone)]
pub struct TokenBudget {
    tokenizer: Arc<dyn Tokenizer>,
    max_tokens: usize,
}

impl TokenBudget {
    /// Create a budget measured by `tokenizer`
    #[must_use]
    pub fn new(tokenizer: Arc<dyn Tokenizer>, max_tokens: usize) -> Self {
        Self {
            tokenizer,
            max_tokens,
        }
    }

    /// Configured ceiling
    #[must_use]
    pub const fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    /// Tokenizer used for measurement
    #[must_use]
    pub fn tokenizer(&self) -> &dyn Tokenizer {
        self.tokenizer.as_ref()
    }
}

impl std::fmt::Debug for TokenBudget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenBudget")
            .field("model", &self.tokenizer.model())
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

/// Owns the transcript for one assistant run
#[derive(Debug)]
pub struct Conversation {
    turns: Vec<Turn>,
    budget: TokenBudget,
}

impl Conversation {
    /// Start an empty conversation
    #[must_use]
    pub const fn new(budget: TokenBudget) -> Self {
        Self {
            turns: Vec::new(),
            budget,
        }
    }

    /// Rebuild a conversation from previously persisted turns
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if a system turn appears anywhere but index 0
    pub fn restore(budget: TokenBudget, turns: Vec<Turn>) -> Result<Self> {
        if let Some(pos) = turns
            .iter()
            .skip(1)
            .position(|t| t.role == Role::System)
        {
            return Err(Error::InvalidInput(format!(
                "system turn at index {} in restored transcript",
                pos + 1
            )));
        }

        Ok(Self { turns, budget })
    }

    /// Current turns in conversational order
    #[must_use]
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Number of turns
    #[must_use]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Whether the transcript has no turns
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Budget applied before each completion
    #[must_use]
    pub const fn budget(&self) -> &TokenBudget {
        &self.budget
    }

    /// Append a user turn
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if `text` is empty
    pub fn append_user_turn(&mut self, text: &str) -> Result<()> {
        if text.trim().is_empty() {
            return Err(Error::InvalidInput("user turn is empty".to_string()));
        }

        self.turns.push(Turn::user(text));
        Ok(())
    }

    /// Install or replace the system turn at index 0
    pub fn install_system_turn(&mut self, text: &str) {
        match self.turns.first_mut() {
            Some(first) if first.role == Role::System => {
                if first.content != text {
                    text.clone_into(&mut first.content);
                    tracing::debug!("system turn replaced");
                }
            }
            _ => {
                self.turns.insert(0, Turn::system(text));
                tracing::debug!("system turn installed");
            }
        }
    }

    /// Evict the oldest non-system turns until the transcript fits
    ///
    /// Returns the number of evicted turns.
    ///
    /// # Errors
    ///
    /// Returns `BudgetExceeded` if the transcript is still too large once only
    /// the system turn and the newest turn remain, or any error from the
    /// tokenizer
    pub fn enforce_budget(&mut self, tokenizer: &dyn Tokenizer, max_tokens: usize) -> Result<usize> {
        let mut tokens = tokenizer.count(&self.turns)?;
        tracing::debug!(tokens, max_tokens, "transcript token count");

        let mut evicted = 0;
        while tokens > max_tokens {
            if self.evictable() == 0 {
                return Err(Error::BudgetExceeded { tokens, max_tokens });
            }

            let removed = self.turns.remove(self.first_evictable());
            evicted += 1;
            tokens = tokenizer.count(&self.turns)?;
            tracing::info!(role = %removed.role, tokens, "evicted oldest turn");
        }

        Ok(evicted)
    }

    /// Enforce the budget, ask `backend` for a reply and append it
    ///
    /// The reply itself is not measured until the next call, so the
    /// transcript may sit above budget between cycles.
    ///
    /// # Errors
    ///
    /// Returns `BudgetExceeded` or a tokenizer error before any request is made,
    /// or `Backend` if the completion fails. On backend failure the transcript
    /// is unchanged, so the call can be retried.
    pub async fn request_completion(&mut self, backend: &dyn ChatBackend) -> Result<String> {
        let budget = self.budget.clone();
        self.enforce_budget(budget.tokenizer(), budget.max_tokens())?;

        let reply = backend.complete(&self.turns).await?;
        if reply.role != Role::Assistant {
            return Err(crate::backend::BackendError::Transport(format!(
                "backend replied with role {}",
                reply.role
            ))
            .into());
        }

        let content = reply.content.clone();
        self.turns.push(reply);
        Ok(content)
    }

    /// Measure the transcript with the configured tokenizer
    ///
    /// # Errors
    ///
    /// Returns any error from the tokenizer
    pub fn token_count(&self) -> Result<usize> {
        self.budget.tokenizer().count(&self.turns)
    }

    /// Immutable copy of the transcript for persistence
    #[must_use]
    pub fn snapshot(&self) -> Transcript {
        Transcript::from(self.turns.clone())
    }

    /// Non-system turns other than the newest one
    fn evictable(&self) -> usize {
        self.turns
            .iter()
            .filter(|t| t.role != Role::System)
            .count()
            .saturating_sub(1)
    }

    /// Index of the oldest non-system turn
    fn first_evictable(&self) -> usize {
        usize::from(self.turns.first().is_some_and(|t| t.role == Role::System))
    }
}
