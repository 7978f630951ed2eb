//! BotWise — an election-survey chatbot.
//!
//! A waterfall dialog engine walks the user through a short survey, an
//! entity dispatcher turns their answers into canned remarks, and a summary
//! plays the collected profile back before asking to save it.

pub mod bot;
pub mod channels;
pub mod config;
pub mod dialog;
pub mod dispatch;
pub mod error;
pub mod profile;
pub mod recognizer;
pub mod store;
