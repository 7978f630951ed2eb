//! The BotWise survey bot: dialogs, summary, turn handling and the run loop.

pub mod dialogs;
pub mod handler;
pub mod runner;
pub mod summary;

pub use dialogs::{DialogSettings, build_sequencer};
pub use handler::ElectionBot;
pub use runner::BotRunner;
pub use summary::{Pacing, summarize};
