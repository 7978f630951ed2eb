//! The dialog stack: one frame per active (possibly suspended) dialog.

use serde::{Deserialize, Serialize};

use super::step::DialogOptions;

/// One entry of the stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogFrame {
    pub dialog: String,
    /// Index of the step to run when this frame resumes.
    pub step: usize,
    #[serde(default)]
    pub options: DialogOptions,
}

impl DialogFrame {
    pub fn new(dialog: impl Into<String>, options: DialogOptions) -> Self {
        Self {
            dialog: dialog.into(),
            step: 0,
            options,
        }
    }
}

/// Ordered frames, root first. Only the last frame is active.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DialogStack {
    frames: Vec<DialogFrame>,
}

impl DialogStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, frame: DialogFrame) {
        self.frames.push(frame);
    }

    pub fn pop(&mut self) -> Option<DialogFrame> {
        self.frames.pop()
    }

    pub fn active(&self) -> Option<&DialogFrame> {
        self.frames.last()
    }

    pub fn active_mut(&mut self) -> Option<&mut DialogFrame> {
        self.frames.last_mut()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }
}
