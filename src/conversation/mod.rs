//! Conversation transcript, token budget and backup
//!
//! Combines:
//! - Turns and immutable transcript snapshots
//! - The budget-enforcing conversation state
//! - Atomic JSON backup of the transcript

mod backup;
mod state;
mod turn;

pub use backup::{DEFAULT_BACKUP_FILE, TranscriptBackup, write_json_atomic};
pub use state::{Conversation, DEFAULT_MAX_TOKENS, TokenBudget};
pub use turn::{Role, Transcript, Turn};
