//! The survey's dialogs: intro, wake check, field collection, summary,
//! save confirmation and goodbye.

use std::sync::Arc;

use super::summary::{Pacing, summarize};
use crate::dialog::{DialogOptions, OutgoingMessage, Sequencer, StepAction, StepContext, Waterfall};
use crate::dispatch::EntityDispatcher;
use crate::error::DialogError;
use crate::profile::ProfileField;
use crate::recognizer::keyword::{voted_answer, yes_no};
use crate::recognizer::{Intent, entities};

pub const MAIN: &str = "main";
pub const COLLECT: &str = "collect";
pub const NAME: &str = "name";
pub const USER_ID: &str = "user_id";
pub const CONSTITUENCY: &str = "constituency";
pub const VOTED: &str = "voted";
pub const ISSUE: &str = "issue";
pub const PARTY: &str = "party";

pub const INTRO: &str = "Hi there, thanks for waking me up! 😴 My name is BotWise, hope you are well! So first of all, to begin then...";
pub const APOLOGY: &str =
    "Sorry, I didn't get that. Please use 'wake bot' to wake the bot. Refresh the page and restart";
pub const CONFIRM_SAVE: &str = "Is it ok if I save this information? Yes or No?";
pub const NEXT_STEP: &str = "Please use the 'Next Step' button to continue...";
pub const GOODBYE: &str = "Goodbye, have a nice day 👋🏼";

pub const ASK_NAME: &str = "What is your name kid?";
pub const ASK_USER_ID: &str = "What is your user ID?";
pub const ASK_LOCATION: &str = "My local voting constituency is in Wicklow. Where's yours then?";
pub const ASK_VOTED: &str = "Did you vote in the last general election?";
pub const ASK_ISSUE: &str = "What issue matters most to you at the moment?";
pub const ASK_PARTY: &str = "And which party would you say you support?";

pub const REGION_FALLBACK: &str = "I see, I see. Surprising result in general, wasn't it?";
pub const REGION_AGREE: &str = "Yeah I thought so too.";

/// Knobs that shape the dialogs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DialogSettings {
    /// Restarts allowed when an expected answer is missing. `None` keeps
    /// asking forever.
    pub max_entity_retries: Option<u32>,
    pub max_steps_per_turn: usize,
    pub pacing: Pacing,
}

impl Default for DialogSettings {
    fn default() -> Self {
        Self {
            max_entity_retries: Some(3),
            max_steps_per_turn: crate::dialog::DEFAULT_MAX_STEPS_PER_TURN,
            pacing: Pacing::default(),
        }
    }
}

type Extract = fn(&StepContext<'_>) -> Option<Vec<String>>;

/// Register every survey dialog with a sequencer rooted at [`MAIN`].
pub fn build_sequencer(
    dispatcher: Arc<EntityDispatcher>,
    settings: DialogSettings,
) -> Result<Sequencer, DialogError> {
    let mut seq = Sequencer::new(MAIN).with_max_steps_per_turn(settings.max_steps_per_turn);
    let retries = settings.max_entity_retries;

    seq.add(main_dialog(Arc::clone(&dispatcher), settings.pacing))?;
    seq.add(collect_dialog())?;
    seq.add(field_dialog(NAME, ProfileField::Name, ASK_NAME, extract_name, retries))?;
    seq.add(field_dialog(USER_ID, ProfileField::UserId, ASK_USER_ID, extract_user_id, retries))?;
    seq.add(constituency_dialog(dispatcher, settings.pacing, retries))?;
    seq.add(field_dialog(VOTED, ProfileField::Voted, ASK_VOTED, extract_voted, retries))?;
    seq.add(field_dialog(ISSUE, ProfileField::Issues, ASK_ISSUE, extract_issue, retries))?;
    seq.add(field_dialog(PARTY, ProfileField::Party, ASK_PARTY, extract_party, retries))?;

    Ok(seq)
}

fn main_dialog(dispatcher: Arc<EntityDispatcher>, pacing: Pacing) -> Waterfall {
    Waterfall::new(MAIN)
        // Intro
        .step(|ctx| {
            let text = ctx.options.prompt.clone().unwrap_or_else(|| INTRO.to_string());
            StepAction::Prompt(text)
        })
        // Act: only the wake phrase gets the survey going.
        .step(|ctx| {
            let (intent, score) = ctx.recognized.top_intent();
            if intent == Intent::WakeBot {
                tracing::debug!(score, "Wake intent recognized");
                return StepAction::begin(COLLECT);
            }
            tracing::debug!(intent = %intent, score, "Not woken");
            StepAction::Restart(DialogOptions {
                attempt: ctx.options.attempt.saturating_add(1),
                prompt: Some(APOLOGY.to_string()),
            })
        })
        // Summarize, then ask to save.
        .step(move |ctx| {
            for message in summarize(&*ctx.profile, &dispatcher, pacing) {
                ctx.send(message);
            }
            StepAction::Prompt(CONFIRM_SAVE.to_string())
        })
        // Record consent.
        .step(|ctx| {
            ctx.profile.save_consent = ctx.reply().and_then(yes_no);
            tracing::debug!(consent = ?ctx.profile.save_consent, "Save answer");
            StepAction::Next(None)
        })
        // Goodbye.
        .step(move |ctx| {
            ctx.send_text(NEXT_STEP);
            ctx.send(OutgoingMessage::text(GOODBYE).after(pacing.delay(1500)));
            StepAction::End(None)
        })
}

/// Runs the field dialogs one after another.
fn collect_dialog() -> Waterfall {
    let mut dialog = Waterfall::new(COLLECT);
    for child in [NAME, USER_ID, CONSTITUENCY, VOTED, ISSUE, PARTY] {
        dialog = dialog.step(move |_| StepAction::begin(child));
    }
    dialog.step(|_| StepAction::End(None))
}

/// Two steps: ask unless the field is already known, then capture.
///
/// A missing answer restarts the dialog until `retries` is spent, after
/// which the field is left undisclosed.
fn field_dialog(
    id: &'static str,
    field: ProfileField,
    prompt: &'static str,
    extract: Extract,
    retries: Option<u32>,
) -> Waterfall {
    Waterfall::new(id)
        .step(move |ctx| {
            if ctx.profile.is_set(field) {
                return StepAction::End(None);
            }
            StepAction::Prompt(ctx.options.prompt.clone().unwrap_or_else(|| prompt.to_string()))
        })
        .step(move |ctx| {
            if let Some(values) = extract(ctx) {
                ctx.profile.fill(field, values);
                tracing::debug!(dialog = ctx.dialog, field = %field, "Captured");
                return StepAction::Next(None);
            }
            if retries.is_some_and(|max| ctx.options.attempt >= max) {
                tracing::info!(dialog = ctx.dialog, field = %field, attempts = ctx.options.attempt + 1, "Leaving field undisclosed");
                return StepAction::End(None);
            }
            tracing::debug!(dialog = ctx.dialog, field = %field, attempt = ctx.options.attempt, "No answer recognized, asking again");
            StepAction::Restart(ctx.options.retry())
        })
}

/// The location dialog also remarks on the user's constituency.
fn constituency_dialog(
    dispatcher: Arc<EntityDispatcher>,
    pacing: Pacing,
    retries: Option<u32>,
) -> Waterfall {
    field_dialog(
        CONSTITUENCY,
        ProfileField::Location,
        ASK_LOCATION,
        extract_location,
        retries,
    )
    .step(move |ctx| {
        let remark = ctx
            .profile
            .first(ProfileField::Location)
            .map(|loc| dispatcher.region_remark(loc).unwrap_or(REGION_FALLBACK).to_string());
        if let Some(remark) = remark {
            ctx.send(OutgoingMessage::text(remark).after(pacing.delay(1000)));
            ctx.send(OutgoingMessage::text(REGION_AGREE).after(pacing.delay(1000)));
        }
        StepAction::End(None)
    })
}

fn entity_values(ctx: &StepContext<'_>, name: &str) -> Option<Vec<String>> {
    ctx.recognized.entity(name).map(<[String]>::to_vec)
}

fn extract_name(ctx: &StepContext<'_>) -> Option<Vec<String>> {
    entity_values(ctx, entities::NAME)
}

/// User IDs are free text; any non-blank reply counts.
fn extract_user_id(ctx: &StepContext<'_>) -> Option<Vec<String>> {
    ctx.reply().map(|id| vec![id.to_string()])
}

fn extract_location(ctx: &StepContext<'_>) -> Option<Vec<String>> {
    entity_values(ctx, entities::LOCATION)
}

fn extract_voted(ctx: &StepContext<'_>) -> Option<Vec<String>> {
    entity_values(ctx, entities::VOTED)
        .or_else(|| ctx.reply().and_then(voted_answer).map(|v| vec![v.to_string()]))
}

fn extract_issue(ctx: &StepContext<'_>) -> Option<Vec<String>> {
    entity_values(ctx, entities::ISSUE)
}

fn extract_party(ctx: &StepContext<'_>) -> Option<Vec<String>> {
    entity_values(ctx, entities::PARTY)
}
