//! The closing summary: what the bot "inferred" from a profile.

use std::time::Duration;

use crate::dialog::OutgoingMessage;
use crate::dispatch::{Category, EntityDispatcher};
use crate::profile::{CollectedProfile, ProfileField};

pub const SUMMARY_OPENING: &str = "Here's what I could gather from our conversation:";
pub const SUMMARY_CLOSING: &str = "Anyway that's everything from me!";

/// Scales the bot's conversational pauses. `0` disables them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pacing {
    scale: f64,
}

impl Pacing {
    pub fn new(scale: f64) -> Self {
        let scale = if scale.is_finite() && scale > 0.0 { scale } else { 0.0 };
        Self { scale }
    }

    pub fn none() -> Self {
        Self { scale: 0.0 }
    }

    /// A nominal pause in milliseconds, scaled.
    pub fn delay(&self, millis: u64) -> Duration {
        if self.scale == 0.0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(millis as f64 / 1000.0 * self.scale)
    }
}

impl Default for Pacing {
    fn default() -> Self {
        Self { scale: 1.0 }
    }
}

/// Collects messages, folding pauses for skipped lines into the next one.
struct PacedOutput {
    pacing: Pacing,
    pending: Duration,
    messages: Vec<OutgoingMessage>,
}

impl PacedOutput {
    fn new(pacing: Pacing) -> Self {
        Self {
            pacing,
            pending: Duration::ZERO,
            messages: Vec::new(),
        }
    }

    fn wait(&mut self, millis: u64) {
        self.pending += self.pacing.delay(millis);
    }

    fn say(&mut self, text: impl Into<String>) {
        let delay = std::mem::take(&mut self.pending);
        self.messages.push(OutgoingMessage::text(text).after(delay));
    }
}

/// Build the summary for a profile.
///
/// Walks name, voted, location, issue and party in that order, emitting at
/// most one dispatched line per field plus the issue follow-up and the
/// candidate guess. Unmapped values are skipped. Pure: the same profile
/// always yields the same messages.
pub fn summarize(
    profile: &CollectedProfile,
    dispatcher: &EntityDispatcher,
    pacing: Pacing,
) -> Vec<OutgoingMessage> {
    let mut out = PacedOutput::new(pacing);
    let location = profile.first(ProfileField::Location);
    let voted = profile.first(ProfileField::Voted);

    out.say(SUMMARY_OPENING);

    out.wait(1000);
    if let Some(name) = profile.first(ProfileField::Name) {
        out.say(format!("So first of all, your name is {name}"));
    }

    out.wait(1000);
    if let Some(line) = voted.and_then(|v| dispatcher.dispatch(Category::Voted, v)) {
        out.say(line);
    }

    out.wait(2000);
    if let Some(location) = location {
        out.say(format!("I found out that you're from {location}"));
    }

    out.wait(1000);
    if let Some(issue) = profile.first(ProfileField::Issues) {
        if let Some(line) = dispatcher.dispatch(Category::Issue, issue) {
            out.say(line);
            if dispatcher.has_issue_followups(issue) {
                out.wait(1000);
            }
            if let Some(extra) = location.and_then(|loc| dispatcher.issue_followup(issue, loc)) {
                out.say(extra);
            }
        }
    }

    out.wait(2000);
    if let Some(party) = profile.first(ProfileField::Party) {
        if let Some(line) = dispatcher.dispatch(Category::Party, party) {
            out.say(line);
            out.wait(2000);
        }
        if let (Some(loc), Some(voted)) = (location, voted) {
            if let Some(guess) = dispatcher.candidate(party, loc, voted) {
                out.say(guess);
            }
        }
    }

    out.wait(2000);
    out.say(SUMMARY_CLOSING);

    out.messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{DID_NOT_VOTE, DID_VOTE};

    fn profile(pairs: &[(ProfileField, &str)]) -> CollectedProfile {
        let mut p = CollectedProfile::new();
        for (field, value) in pairs {
            p.fill(*field, vec![value.to_string()]);
        }
        p
    }

    fn texts(messages: &[OutgoingMessage]) -> Vec<&str> {
        messages.iter().map(|m| m.text.as_str()).collect()
    }

    #[test]
    fn empty_profile_yields_only_framing() {
        let d = EntityDispatcher::builtin();
        let out = summarize(&CollectedProfile::new(), &d, Pacing::none());
        assert_eq!(texts(&out), vec![SUMMARY_OPENING, SUMMARY_CLOSING]);
    }

    #[test]
    fn skipped_pauses_fold_into_closing() {
        let d = EntityDispatcher::builtin();
        let out = summarize(&CollectedProfile::new(), &d, Pacing::default());
        assert_eq!(out[0].delay, Duration::ZERO);
        assert_eq!(out[1].delay, Duration::from_secs(9));
    }

    #[test]
    fn full_profile_in_fixed_order() {
        let d = EntityDispatcher::builtin();
        let p = profile(&[
            (ProfileField::Party, "labour"),
            (ProfileField::Name, "Jane"),
            (ProfileField::Location, "louth"),
            (ProfileField::Voted, DID_VOTE),
            (ProfileField::Issues, "housing"),
        ]);
        let out = summarize(&p, &d, Pacing::none());
        let t = texts(&out);
        assert_eq!(t.len(), 8);
        assert_eq!(t[0], SUMMARY_OPENING);
        assert_eq!(t[1], "So first of all, your name is Jane");
        assert_eq!(Some(t[2]), d.dispatch(Category::Voted, DID_VOTE));
        assert_eq!(t[3], "I found out that you're from louth");
        assert_eq!(Some(t[4]), d.dispatch(Category::Issue, "housing"));
        assert_eq!(Some(t[5]), d.dispatch(Category::Party, "labour"));
        assert!(t[6].contains("Ged Nash"));
        assert_eq!(t[7], SUMMARY_CLOSING);
    }

    #[test]
    fn no_candidate_guess_without_voting() {
        let d = EntityDispatcher::builtin();
        let p = profile(&[
            (ProfileField::Party, "labour"),
            (ProfileField::Location, "louth"),
            (ProfileField::Voted, DID_NOT_VOTE),
        ]);
        let out = summarize(&p, &d, Pacing::none());
        assert!(out.iter().all(|m| !m.text.contains("Ged Nash")));
    }

    #[test]
    fn wexford_health_gets_followup() {
        let d = EntityDispatcher::builtin();
        let p = profile(&[
            (ProfileField::Location, "wexford"),
            (ProfileField::Issues, "health service"),
        ]);
        let out = summarize(&p, &d, Pacing::default());
        let followup = out.iter().find(|m| m.text.contains("cardiac")).unwrap();
        assert_eq!(followup.delay, Duration::from_secs(1));
    }

    #[test]
    fn candidate_guess_waits_after_party_line() {
        let d = EntityDispatcher::builtin();
        let p = profile(&[
            (ProfileField::Party, "labour"),
            (ProfileField::Location, "louth"),
            (ProfileField::Voted, DID_VOTE),
        ]);
        let out = summarize(&p, &d, Pacing::default());
        let party = d.dispatch(Category::Party, "labour").unwrap();
        let party_line = out.iter().find(|m| m.text == party).unwrap();
        assert_eq!(party_line.delay, Duration::from_secs(3));
        let guess = out.iter().find(|m| m.text.contains("Ged Nash")).unwrap();
        assert_eq!(guess.delay, Duration::from_secs(2));
        assert_eq!(out.last().unwrap().delay, Duration::from_secs(2));
    }

    #[test]
    fn health_issue_pauses_without_followup() {
        let d = EntityDispatcher::builtin();
        let p = profile(&[
            (ProfileField::Location, "galway"),
            (ProfileField::Issues, "health service"),
        ]);
        let out = summarize(&p, &d, Pacing::default());
        assert_eq!(out.len(), 4);
        // 1s after the issue line plus the 4s before the closing.
        assert_eq!(out[3].text, SUMMARY_CLOSING);
        assert_eq!(out[3].delay, Duration::from_secs(5));

        let p = profile(&[(ProfileField::Issues, "housing")]);
        let out = summarize(&p, &d, Pacing::default());
        assert_eq!(out.last().unwrap().delay, Duration::from_secs(4));
    }

    #[test]
    fn unmapped_values_are_omitted() {
        let d = EntityDispatcher::builtin();
        let p = profile(&[
            (ProfileField::Party, "pirates"),
            (ProfileField::Issues, "taxes"),
            (ProfileField::Voted, "maybe"),
        ]);
        let out = summarize(&p, &d, Pacing::none());
        assert_eq!(texts(&out), vec![SUMMARY_OPENING, SUMMARY_CLOSING]);
    }

    #[test]
    fn summarize_is_idempotent() {
        let d = EntityDispatcher::builtin();
        let p = profile(&[
            (ProfileField::Name, "Jane"),
            (ProfileField::Party, "SF"),
            (ProfileField::Location, "donegal"),
            (ProfileField::Voted, DID_VOTE),
        ]);
        let before = p.clone();
        let first = summarize(&p, &d, Pacing::default());
        let second = summarize(&p, &d, Pacing::default());
        assert_eq!(first, second);
        assert_eq!(p, before);
    }

    #[test]
    fn pacing_scales_and_disables() {
        assert_eq!(Pacing::new(0.5).delay(2000), Duration::from_secs(1));
        assert_eq!(Pacing::new(0.0).delay(2000), Duration::ZERO);
        assert_eq!(Pacing::new(-1.0).delay(2000), Duration::ZERO);
        assert_eq!(Pacing::new(f64::NAN).delay(2000), Duration::ZERO);
    }
}
