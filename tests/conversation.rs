//! Conversation integration tests
//!
//! Budget enforcement with real token accounting, persona installation,
//! and transcript persistence

use std::sync::Arc;

use beacon_stream::backend::BackendError;
use beacon_stream::conversation::TranscriptBackup;
use beacon_stream::persona::{Intensity, PersonaConfig, Trait, TraitSet, compile};
use beacon_stream::{
    BackendErrorKind, Conversation, ErrorKind, Role, TiktokenCounter, TokenBudget, Tokenizer, Turn,
};

mod common;
use common::{ScriptedBackend, word_budget};

fn gpt4_budget(max_tokens: usize) -> TokenBudget {
    TokenBudget::new(Arc::new(TiktokenCounter::for_model("gpt-4").unwrap()), max_tokens)
}

#[tokio::test]
async fn long_session_stays_within_budget_and_keeps_persona() {
    let max_tokens = 400;
    let mut conversation = Conversation::new(gpt4_budget(max_tokens));
    let persona = PersonaConfig::default().system_prompt();
    conversation.install_system_turn(&persona);

    let counter = TiktokenCounter::for_model("gpt-4").unwrap();
    let persona_tokens = counter.count(&[Turn::system(persona.clone())]).unwrap();
    // the default persona alone is larger than this budget
    assert!(persona_tokens > max_tokens);

    conversation.append_user_turn("hello chat").unwrap();
    let err = conversation
        .request_completion(&ScriptedBackend::new([]))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BudgetExceeded);
    assert_eq!(conversation.turns()[0].content, persona);
}

#[tokio::test]
async fn eviction_keeps_system_turn_and_newest_user_turn() {
    let mut conversation = Conversation::new(gpt4_budget(120));
    conversation.install_system_turn("You are a cheerful stream co-host.");

    let replies: Vec<_> = (0..12)
        .map(|i| Ok(format!("reply number {i} with a few extra words")))
        .collect();
    let backend = ScriptedBackend::new(replies);

    for i in 0..12 {
        conversation
            .append_user_turn(&format!("question number {i} from chat"))
            .unwrap();
        conversation.request_completion(&backend).await.unwrap();
    }

    let seen = backend.seen.lock().unwrap();
    let counter = TiktokenCounter::for_model("gpt-4").unwrap();
    for sent in seen.iter() {
        assert!(counter.count(sent).unwrap() <= 120);
        assert_eq!(sent[0].role, Role::System);
        assert_eq!(sent.last().unwrap().role, Role::User);
    }

    let last = seen.last().unwrap();
    assert_eq!(last.last().unwrap().content, "question number 11 from chat");
    assert!(last.len() < 24);
}

#[tokio::test]
async fn auth_failure_is_not_retryable_and_leaves_transcript() {
    let mut conversation = Conversation::new(word_budget(1_000));
    conversation.install_system_turn("persona");
    conversation.append_user_turn("hi").unwrap();
    let before = conversation.snapshot();

    let backend = ScriptedBackend::new([Err(BackendError::Auth("bad key".to_string()))]);
    let err = conversation.request_completion(&backend).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Backend(BackendErrorKind::Auth));
    assert!(!err.is_retryable());
    assert_eq!(conversation.snapshot(), before);
}

#[test]
fn persona_prompt_replaces_system_turn_in_place() {
    let mut conversation = Conversation::new(word_budget(1_000));
    conversation.install_system_turn(&compile(&TraitSet::default()));
    conversation.append_user_turn("hi").unwrap();

    let mut traits = TraitSet::default();
    traits.set(Trait::Sarcasm, Intensity::new(95).unwrap());
    let spicy = PersonaConfig::compiled(traits).system_prompt();
    conversation.install_system_turn(&spicy);

    assert_eq!(conversation.len(), 2);
    assert_eq!(conversation.turns()[0], Turn::system(spicy));
    assert_eq!(conversation.turns()[1], Turn::user("hi"));
}

#[test]
fn backup_restores_into_new_conversation() {
    let dir = tempfile::tempdir().unwrap();
    let backup = TranscriptBackup::new(dir.path().join("ChatHistoryBackup.txt"));

    let mut conversation = Conversation::new(word_budget(1_000));
    conversation.install_system_turn("persona");
    conversation.append_user_turn("what game is this").unwrap();
    backup.write(&conversation.snapshot()).unwrap();

    let raw = std::fs::read_to_string(backup.path()).unwrap();
    assert!(raw.contains("\"role\": \"system\""));

    let turns = backup.load().unwrap().unwrap();
    let restored = Conversation::restore(word_budget(1_000), turns).unwrap();
    assert_eq!(restored.turns(), conversation.turns());
}

#[test]
fn restore_rejects_misplaced_system_turn() {
    let turns = vec![Turn::user("hi"), Turn::system("late persona")];
    let err = Conversation::restore(word_budget(1_000), turns).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
}
