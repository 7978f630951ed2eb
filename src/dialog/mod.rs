//! Waterfall dialog engine.
//!
//! Dialogs are named lists of step functions. The [`Sequencer`] keeps a
//! stack of frames per conversation and runs steps until one prompts the
//! user or the root dialog ends. State is plain data so stores can persist
//! it between turns.

pub mod sequencer;
pub mod stack;
pub mod step;

pub use sequencer::{
    ConversationState, DEFAULT_MAX_STEPS_PER_TURN, Sequencer, TurnOutcome, TurnStatus, Waterfall,
};
pub use stack::{DialogFrame, DialogStack};
pub use step::{DialogOptions, OutgoingMessage, Step, StepAction, StepContext};
