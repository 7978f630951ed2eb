//! Step functions and what they hand back to the sequencer.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::profile::CollectedProfile;
use crate::recognizer::RecognizerResult;

/// Payload carried into a dialog when it begins or restarts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogOptions {
    /// How many times this dialog has been restarted in a row.
    #[serde(default)]
    pub attempt: u32,
    /// Replaces the dialog's default opening prompt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
}

impl DialogOptions {
    pub fn with_prompt(prompt: impl Into<String>) -> Self {
        Self {
            attempt: 0,
            prompt: Some(prompt.into()),
        }
    }

    /// Options for the next attempt of the same dialog.
    pub fn retry(&self) -> Self {
        Self {
            attempt: self.attempt.saturating_add(1),
            prompt: self.prompt.clone(),
        }
    }
}

/// What a step asks the sequencer to do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepAction {
    /// Send a prompt and suspend; the reply becomes the next step's result.
    Prompt(String),
    /// Run the next step immediately with this result.
    Next(Option<String>),
    /// Suspend this frame and start a child dialog.
    Begin {
        dialog: String,
        options: DialogOptions,
    },
    /// Finish this dialog; the result goes to the parent's next step.
    End(Option<String>),
    /// Rewind this dialog to its first step with new options.
    Restart(DialogOptions),
}

impl StepAction {
    pub fn begin(dialog: impl Into<String>) -> Self {
        Self::Begin {
            dialog: dialog.into(),
            options: DialogOptions::default(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Prompt(_) => "prompt",
            Self::Next(_) => "next",
            Self::Begin { .. } => "begin",
            Self::End(_) => "end",
            Self::Restart(_) => "restart",
        }
    }
}

/// A message produced during a turn, in delivery order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub text: String,
    /// Pause before delivering this message.
    pub delay: Duration,
    /// Set on prompts that wait for the user's reply.
    pub expects_input: bool,
}

impl OutgoingMessage {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            delay: Duration::ZERO,
            expects_input: false,
        }
    }

    pub fn prompt(text: impl Into<String>) -> Self {
        Self {
            expects_input: true,
            ..Self::text(text)
        }
    }

    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// Everything a step may read or touch while it runs.
pub struct StepContext<'a> {
    pub dialog: &'a str,
    pub step: usize,
    pub options: &'a DialogOptions,
    /// The prior step's result, the user's reply after a prompt, or a
    /// finished child's end result.
    pub result: Option<String>,
    /// Recognition of this turn's input.
    pub recognized: &'a RecognizerResult,
    pub profile: &'a mut CollectedProfile,
    outbox: &'a mut Vec<OutgoingMessage>,
}

impl<'a> StepContext<'a> {
    pub(crate) fn new(
        dialog: &'a str,
        step: usize,
        options: &'a DialogOptions,
        result: Option<String>,
        recognized: &'a RecognizerResult,
        profile: &'a mut CollectedProfile,
        outbox: &'a mut Vec<OutgoingMessage>,
    ) -> Self {
        Self {
            dialog,
            step,
            options,
            result,
            recognized,
            profile,
            outbox,
        }
    }

    /// Queue a message without suspending the dialog.
    pub fn send(&mut self, message: OutgoingMessage) {
        self.outbox.push(message);
    }

    pub fn send_text(&mut self, text: impl Into<String>) {
        self.send(OutgoingMessage::text(text));
    }

    /// The result as trimmed text, if non-empty.
    pub fn reply(&self) -> Option<&str> {
        self.result
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// A boxed step function.
pub type Step = Box<dyn Fn(&mut StepContext<'_>) -> StepAction + Send + Sync>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_bumps_attempt_and_keeps_prompt() {
        let opts = DialogOptions::with_prompt("again?");
        let next = opts.retry().retry();
        assert_eq!(next.attempt, 2);
        assert_eq!(next.prompt.as_deref(), Some("again?"));
    }

    #[test]
    fn prompt_expects_input() {
        let msg = OutgoingMessage::prompt("Name?").after(Duration::from_secs(1));
        assert!(msg.expects_input);
        assert_eq!(msg.delay, Duration::from_secs(1));
        assert!(!OutgoingMessage::text("hi").expects_input);
    }

    #[test]
    fn reply_trims_and_drops_blank() {
        let recognized = RecognizerResult::empty("");
        let mut profile = CollectedProfile::default();
        let mut outbox = Vec::new();
        let options = DialogOptions::default();
        let mut ctx = StepContext::new(
            "d",
            0,
            &options,
            Some("  Jane ".into()),
            &recognized,
            &mut profile,
            &mut outbox,
        );
        assert_eq!(ctx.reply(), Some("Jane"));
        ctx.result = Some("   ".into());
        assert_eq!(ctx.reply(), None);
        ctx.send_text("ok");
        assert_eq!(outbox.len(), 1);
    }
}
