//! Turn handler — glues the recognizer, the dialogs and the store.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::dialogs::{DialogSettings, build_sequencer};
use crate::dialog::{ConversationState, OutgoingMessage, Sequencer, TurnStatus};
use crate::dispatch::EntityDispatcher;
use crate::error::{DialogError, Result};
use crate::profile::SavedProfile;
use crate::recognizer::{Recognizer, RecognizerResult};
use crate::store::ConversationStore;

/// The election-survey bot.
///
/// Turns for the same conversation run strictly one after another; turns for
/// different conversations run concurrently.
pub struct ElectionBot {
    sequencer: Sequencer,
    recognizer: Arc<dyn Recognizer>,
    store: Arc<dyn ConversationStore>,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ElectionBot {
    pub fn new(
        dispatcher: Arc<EntityDispatcher>,
        recognizer: Arc<dyn Recognizer>,
        store: Arc<dyn ConversationStore>,
        settings: DialogSettings,
    ) -> std::result::Result<Self, DialogError> {
        Ok(Self {
            sequencer: build_sequencer(dispatcher, settings)?,
            recognizer,
            store,
            locks: Mutex::new(HashMap::new()),
        })
    }

    /// Process one user input and return the bot's replies.
    pub async fn on_turn(&self, conversation_id: &str, text: &str) -> Result<Vec<OutgoingMessage>> {
        let lock = self.conversation_lock(conversation_id).await;
        let result = {
            let _guard = lock.lock().await;
            self.run_turn(conversation_id, text).await
        };
        self.release_lock(conversation_id, lock).await;
        result
    }

    /// Like [`on_turn`](Self::on_turn), but also waits out each message's
    /// delay and hands it to `deliver` while still holding the
    /// conversation's lock.
    pub async fn on_turn_deliver<F, Fut>(
        &self,
        conversation_id: &str,
        text: &str,
        mut deliver: F,
    ) -> Result<()>
    where
        F: FnMut(OutgoingMessage) -> Fut,
        Fut: Future<Output = ()>,
    {
        let lock = self.conversation_lock(conversation_id).await;
        let result = async {
            let _guard = lock.lock().await;
            let messages = self.run_turn(conversation_id, text).await?;
            for message in messages {
                if !message.delay.is_zero() {
                    tokio::time::sleep(message.delay).await;
                }
                deliver(message).await;
            }
            Ok(())
        }
        .await;
        self.release_lock(conversation_id, lock).await;
        result
    }

    /// Drop a conversation's state so the next input starts over.
    pub async fn reset(&self, conversation_id: &str) -> Result<bool> {
        let lock = self.conversation_lock(conversation_id).await;
        let result = {
            let _guard = lock.lock().await;
            self.store.clear_state(conversation_id).await
        };
        self.release_lock(conversation_id, lock).await;
        let removed = result?;
        info!(conversation_id, removed, "Conversation reset");
        Ok(removed)
    }

    async fn conversation_lock(&self, conversation_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        Arc::clone(locks.entry(conversation_id.to_string()).or_default())
    }

    /// Hand back a lock taken with `conversation_lock`, dropping the map
    /// entry once nobody else holds or waits on it.
    async fn release_lock(&self, conversation_id: &str, lock: Arc<Mutex<()>>) {
        let mut locks = self.locks.lock().await;
        drop(lock);
        if locks
            .get(conversation_id)
            .is_some_and(|held| Arc::strong_count(held) == 1)
        {
            locks.remove(conversation_id);
        }
    }

    async fn run_turn(&self, conversation_id: &str, text: &str) -> Result<Vec<OutgoingMessage>> {
        let mut state = self
            .store
            .load_state(conversation_id)
            .await?
            .unwrap_or_else(ConversationState::new);

        let recognized = match self.recognizer.recognize(text).await {
            Ok(result) => result,
            Err(e) => {
                warn!(
                    conversation_id,
                    recognizer = self.recognizer.name(),
                    error = %e,
                    "Recognizer failed, treating input as unrecognized"
                );
                RecognizerResult::empty(text)
            }
        };

        let outcome = match self.sequencer.resume(&mut state, &recognized) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(conversation_id, error = %e, "Dialog failed, discarding conversation");
                self.store.clear_state(conversation_id).await?;
                return Err(e.into());
            }
        };

        match outcome.status {
            TurnStatus::Waiting => {
                self.store.save_state(conversation_id, &state).await?;
                debug!(
                    conversation_id,
                    turn = state.turn_count,
                    depth = state.stack.depth(),
                    "Waiting for reply"
                );
            }
            TurnStatus::Complete => {
                if state.profile.save_consent == Some(true) {
                    let saved = SavedProfile::new(conversation_id, state.profile.clone());
                    self.store.save_profile(&saved).await?;
                }
                self.store.clear_state(conversation_id).await?;
                info!(
                    conversation_id,
                    turns = state.turn_count,
                    consent = ?state.profile.save_consent,
                    "Conversation complete"
                );
            }
        }

        Ok(outcome.messages)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::bot::dialogs::{
        APOLOGY, ASK_NAME, ASK_PARTY, ASK_USER_ID, CONFIRM_SAVE, GOODBYE, INTRO,
    };
    use crate::bot::summary::Pacing;
    use crate::error::{Error, RecognizerError};
    use crate::profile::ProfileField;
    use crate::recognizer::keyword::KeywordRecognizer;
    use crate::store::MemoryStore;

    struct FailingRecognizer;

    #[async_trait]
    impl Recognizer for FailingRecognizer {
        fn name(&self) -> &str {
            "failing"
        }

        async fn recognize(
            &self,
            _text: &str,
        ) -> std::result::Result<RecognizerResult, RecognizerError> {
            Err(RecognizerError::RequestFailed {
                recognizer: "failing".into(),
                reason: "offline".into(),
            })
        }
    }

    fn quiet() -> DialogSettings {
        DialogSettings {
            pacing: Pacing::none(),
            ..Default::default()
        }
    }

    fn bot_with(
        recognizer: Arc<dyn Recognizer>,
        settings: DialogSettings,
    ) -> (ElectionBot, Arc<MemoryStore>) {
        let dispatcher = Arc::new(EntityDispatcher::builtin());
        let store = Arc::new(MemoryStore::new());
        let bot = ElectionBot::new(dispatcher, recognizer, store.clone(), settings).unwrap();
        (bot, store)
    }

    fn keyword_bot() -> (ElectionBot, Arc<MemoryStore>) {
        let dispatcher = EntityDispatcher::builtin();
        let recognizer = Arc::new(KeywordRecognizer::from_dispatcher(&dispatcher));
        bot_with(recognizer, quiet())
    }

    fn last_prompt(messages: &[OutgoingMessage]) -> &str {
        messages
            .iter()
            .rev()
            .find(|m| m.expects_input)
            .map(|m| m.text.as_str())
            .unwrap_or("")
    }

    async fn run_survey(bot: &ElectionBot, id: &str) {
        for text in ["hello", "wake bot", "Jane", "123", "wexford", "did vote", "housing"] {
            bot.on_turn(id, text).await.unwrap();
        }
        let out = bot.on_turn(id, "labour").await.unwrap();
        assert_eq!(last_prompt(&out), CONFIRM_SAVE);
    }

    #[tokio::test]
    async fn first_turn_greets_and_persists_state() {
        let (bot, store) = keyword_bot();
        let out = bot.on_turn("c1", "hello").await.unwrap();
        assert_eq!(last_prompt(&out), INTRO);

        let state = store.load_state("c1").await.unwrap().unwrap();
        assert_eq!(state.turn_count, 1);
        assert!(state.is_active());
    }

    #[tokio::test]
    async fn state_carries_between_turns() {
        let (bot, store) = keyword_bot();
        bot.on_turn("c1", "hello").await.unwrap();
        let out = bot.on_turn("c1", "wake bot").await.unwrap();
        assert_eq!(last_prompt(&out), ASK_NAME);
        let out = bot.on_turn("c1", "my name is Jane").await.unwrap();
        assert_eq!(last_prompt(&out), ASK_USER_ID);

        let state = store.load_state("c1").await.unwrap().unwrap();
        assert_eq!(state.profile.first(ProfileField::Name), Some("Jane"));
    }

    #[tokio::test]
    async fn conversations_are_independent() {
        let (bot, _) = keyword_bot();
        bot.on_turn("a", "hello").await.unwrap();
        bot.on_turn("a", "wake bot").await.unwrap();
        let out = bot.on_turn("b", "wake bot").await.unwrap();
        // A new conversation starts at the intro regardless of the input.
        assert_eq!(last_prompt(&out), INTRO);
    }

    #[tokio::test]
    async fn consent_saves_profile_and_clears_state() {
        let (bot, store) = keyword_bot();
        run_survey(&bot, "c1").await;
        let out = bot.on_turn("c1", "yes").await.unwrap();
        assert_eq!(out.last().map(|m| m.text.as_str()), Some(GOODBYE));

        assert!(store.load_state("c1").await.unwrap().is_none());
        let saved = store.list_profiles(10).await.unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].conversation_id, "c1");
        assert_eq!(saved[0].profile.first(ProfileField::Party), Some("labour"));
        assert_eq!(saved[0].profile.save_consent, Some(true));
    }

    #[tokio::test]
    async fn refusal_saves_nothing() {
        let (bot, store) = keyword_bot();
        run_survey(&bot, "c1").await;
        bot.on_turn("c1", "no thanks").await.unwrap();
        assert!(store.list_profiles(10).await.unwrap().is_empty());
        assert!(store.load_state("c1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn completed_conversation_starts_over() {
        let (bot, _) = keyword_bot();
        run_survey(&bot, "c1").await;
        bot.on_turn("c1", "yes").await.unwrap();
        let out = bot.on_turn("c1", "anything").await.unwrap();
        assert_eq!(last_prompt(&out), INTRO);
    }

    #[tokio::test]
    async fn recognizer_failure_is_treated_as_no_intent() {
        let (bot, store) = bot_with(Arc::new(FailingRecognizer), quiet());
        bot.on_turn("c1", "hello").await.unwrap();
        let out = bot.on_turn("c1", "wake bot").await.unwrap();
        assert_eq!(last_prompt(&out), APOLOGY);
        assert!(store.load_state("c1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn dialog_error_discards_state() {
        let dispatcher = EntityDispatcher::builtin();
        let recognizer = Arc::new(KeywordRecognizer::from_dispatcher(&dispatcher));
        let (bot, store) = bot_with(
            recognizer,
            DialogSettings {
                max_steps_per_turn: 2,
                ..quiet()
            },
        );
        bot.on_turn("c1", "hello").await.unwrap();
        let err = bot.on_turn("c1", "wake bot").await.unwrap_err();
        assert!(matches!(err, Error::Dialog(DialogError::StepLimitExceeded { .. })));
        assert!(store.load_state("c1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn reset_clears_conversation() {
        let (bot, _) = keyword_bot();
        bot.on_turn("c1", "hello").await.unwrap();
        bot.on_turn("c1", "wake bot").await.unwrap();
        assert!(bot.reset("c1").await.unwrap());
        assert!(!bot.reset("c1").await.unwrap());
        let out = bot.on_turn("c1", "Jane").await.unwrap();
        assert_eq!(last_prompt(&out), INTRO);
    }

    #[tokio::test]
    async fn deliver_waits_out_delays_in_order() {
        let dispatcher = EntityDispatcher::builtin();
        let recognizer = Arc::new(KeywordRecognizer::from_dispatcher(&dispatcher));
        let (bot, _) = bot_with(
            recognizer,
            DialogSettings {
                pacing: Pacing::new(0.01),
                ..Default::default()
            },
        );
        for text in ["hello", "wake bot", "Jane", "123", "wexford", "did vote", "housing"] {
            bot.on_turn("c1", text).await.unwrap();
        }

        let started = tokio::time::Instant::now();
        let mut delivered = Vec::new();
        bot.on_turn_deliver("c1", "labour", |m| {
            delivered.push(m.text);
            async {}
        })
        .await
        .unwrap();

        // Summary pacing adds up to at least 9s, scaled to 90ms.
        assert!(started.elapsed() >= Duration::from_millis(90));
        assert_eq!(delivered.last().map(String::as_str), Some(CONFIRM_SAVE));
        assert!(delivered.len() > 2);
    }

    #[tokio::test]
    async fn concurrent_turns_on_one_conversation_serialize() {
        let (bot, store) = keyword_bot();
        let bot = Arc::new(bot);
        bot.on_turn("c1", "hello").await.unwrap();

        let a = tokio::spawn({
            let bot = Arc::clone(&bot);
            async move { bot.on_turn("c1", "wake bot").await.unwrap() }
        });
        let b = tokio::spawn({
            let bot = Arc::clone(&bot);
            async move { bot.on_turn("c1", "Jane").await.unwrap() }
        });
        a.await.unwrap();
        b.await.unwrap();

        // Both turns were applied one after the other.
        let state = store.load_state("c1").await.unwrap().unwrap();
        assert_eq!(state.turn_count, 3);
    }

    #[tokio::test]
    async fn finished_conversations_release_their_locks() {
        let (bot, _) = keyword_bot();
        for n in 0..1000 {
            let id = format!("c{n}");
            bot.on_turn(&id, "hello").await.unwrap();
            bot.reset(&id).await.unwrap();
        }
        assert!(bot.locks.lock().await.is_empty());

        run_survey(&bot, "done").await;
        bot.on_turn_deliver("done", "yes", |_| async {}).await.unwrap();
        assert!(bot.locks.lock().await.is_empty());
    }

    #[tokio::test]
    async fn concurrent_turns_leave_no_locks_behind() {
        let (bot, _) = keyword_bot();
        let bot = Arc::new(bot);
        let turns: Vec<_> = ["hello", "wake bot", "Jane", "123"]
            .into_iter()
            .map(|text| {
                let bot = Arc::clone(&bot);
                tokio::spawn(async move { bot.on_turn("c1", text).await.unwrap() })
            })
            .collect();
        for turn in turns {
            turn.await.unwrap();
        }
        assert!(bot.locks.lock().await.is_empty());
    }

    #[tokio::test]
    async fn party_prompt_precedes_summary() {
        let (bot, _) = keyword_bot();
        for text in ["hello", "wake bot", "Jane", "123", "wexford", "did vote"] {
            bot.on_turn("c1", text).await.unwrap();
        }
        let out = bot.on_turn("c1", "housing").await.unwrap();
        assert_eq!(last_prompt(&out), ASK_PARTY);
    }
}
