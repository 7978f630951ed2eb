//! Waterfall sequencer — runs steps until a prompt suspends the turn or
//! the root dialog ends.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::stack::{DialogFrame, DialogStack};
use super::step::{DialogOptions, OutgoingMessage, Step, StepAction, StepContext};
use crate::error::DialogError;
use crate::profile::CollectedProfile;
use crate::recognizer::RecognizerResult;

/// Default cap on step transitions per turn.
pub const DEFAULT_MAX_STEPS_PER_TURN: usize = 64;

/// A named, ordered list of steps.
pub struct Waterfall {
    id: String,
    steps: Vec<Step>,
}

impl Waterfall {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            steps: Vec::new(),
        }
    }

    /// Append a step.
    pub fn step<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut StepContext<'_>) -> StepAction + Send + Sync + 'static,
    {
        self.steps.push(Box::new(f));
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

impl std::fmt::Debug for Waterfall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Waterfall")
            .field("id", &self.id)
            .field("steps", &self.steps.len())
            .finish()
    }
}

/// Everything that survives between turns of one conversation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationState {
    pub stack: DialogStack,
    pub profile: CollectedProfile,
    pub turn_count: u64,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a dialog is waiting for the user.
    pub fn is_active(&self) -> bool {
        !self.stack.is_empty()
    }
}

/// Where a turn left the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnStatus {
    /// A prompt is waiting for the user's reply.
    Waiting,
    /// The root dialog ended.
    Complete,
}

/// Messages produced by one turn plus the resulting status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOutcome {
    pub messages: Vec<OutgoingMessage>,
    pub status: TurnStatus,
    /// End result of the root dialog when `status` is `Complete`.
    pub result: Option<String>,
}

/// Holds the registered dialogs and drives the stack through a turn.
pub struct Sequencer {
    dialogs: HashMap<String, Waterfall>,
    root: String,
    max_steps_per_turn: usize,
}

impl Sequencer {
    pub fn new(root: impl Into<String>) -> Self {
        Self {
            dialogs: HashMap::new(),
            root: root.into(),
            max_steps_per_turn: DEFAULT_MAX_STEPS_PER_TURN,
        }
    }

    pub fn with_max_steps_per_turn(mut self, limit: usize) -> Self {
        self.max_steps_per_turn = limit.max(1);
        self
    }

    /// Register a dialog. Ids must be unique.
    pub fn add(&mut self, dialog: Waterfall) -> Result<(), DialogError> {
        if self.dialogs.contains_key(dialog.id()) {
            return Err(DialogError::DuplicateDialog(dialog.id().to_string()));
        }
        self.dialogs.insert(dialog.id().to_string(), dialog);
        Ok(())
    }

    /// Feed one user input into the conversation.
    ///
    /// An empty stack starts the root dialog with a fresh profile and the
    /// input is not delivered to any step. Otherwise the suspended frame
    /// resumes with the input text as its step result.
    pub fn resume(
        &self,
        state: &mut ConversationState,
        recognized: &RecognizerResult,
    ) -> Result<TurnOutcome, DialogError> {
        if !self.dialogs.contains_key(&self.root) {
            return Err(DialogError::UnknownDialog(self.root.clone()));
        }

        state.turn_count += 1;
        let mut result = if state.stack.is_empty() {
            state.profile = CollectedProfile::default();
            state
                .stack
                .push(DialogFrame::new(self.root.clone(), DialogOptions::default()));
            tracing::debug!(dialog = %self.root, "Starting root dialog");
            None
        } else {
            Some(recognized.text.clone())
        };

        let mut messages = Vec::new();
        let mut transitions = 0usize;

        loop {
            let Some(frame) = state.stack.active() else {
                // Only reachable if a caller hands us a stack we just emptied.
                return Ok(TurnOutcome {
                    messages,
                    status: TurnStatus::Complete,
                    result,
                });
            };

            transitions += 1;
            if transitions > self.max_steps_per_turn {
                return Err(DialogError::StepLimitExceeded {
                    dialog: frame.dialog.clone(),
                    limit: self.max_steps_per_turn,
                });
            }

            let dialog = self
                .dialogs
                .get(&frame.dialog)
                .ok_or_else(|| DialogError::UnknownDialog(frame.dialog.clone()))?;
            let index = frame.step;
            let options = frame.options.clone();

            let action = match dialog.steps.get(index) {
                Some(step) => {
                    let mut ctx = StepContext::new(
                        dialog.id(),
                        index,
                        &options,
                        result.take(),
                        recognized,
                        &mut state.profile,
                        &mut messages,
                    );
                    step(&mut ctx)
                }
                // Falling off the last step ends the dialog with the last result.
                None => StepAction::End(result.take()),
            };

            tracing::trace!(dialog = %dialog.id(), step = index, action = action.kind(), "Step");

            match action {
                StepAction::Prompt(text) => {
                    advance(&mut state.stack, index);
                    messages.push(OutgoingMessage::prompt(text));
                    return Ok(TurnOutcome {
                        messages,
                        status: TurnStatus::Waiting,
                        result: None,
                    });
                }
                StepAction::Next(next) => {
                    advance(&mut state.stack, index);
                    result = next;
                }
                StepAction::Begin { dialog: child, options } => {
                    if !self.dialogs.contains_key(&child) {
                        return Err(DialogError::UnknownDialog(child));
                    }
                    advance(&mut state.stack, index);
                    tracing::debug!(parent = %dialog.id(), dialog = %child, "Begin dialog");
                    state.stack.push(DialogFrame::new(child, options));
                    result = None;
                }
                StepAction::End(end) => {
                    state.stack.pop();
                    tracing::debug!(dialog = %dialog.id(), depth = state.stack.depth(), "End dialog");
                    if state.stack.is_empty() {
                        return Ok(TurnOutcome {
                            messages,
                            status: TurnStatus::Complete,
                            result: end,
                        });
                    }
                    result = end;
                }
                StepAction::Restart(options) => {
                    tracing::debug!(dialog = %dialog.id(), attempt = options.attempt, "Restart dialog");
                    if let Some(frame) = state.stack.active_mut() {
                        frame.step = 0;
                        frame.options = options;
                    }
                    result = None;
                }
            }
        }
    }
}

fn advance(stack: &mut DialogStack, index: usize) {
    if let Some(frame) = stack.active_mut() {
        frame.step = index + 1;
    }
}
