//! Keyword recognizer — offline regex matching against the reply vocabulary.
//!
//! Stands in for the hosted language model when running locally. Intents
//! come from a handful of fixed phrases; `location`, `party_name` and
//! `topical_issue` entities come from the longest known term found in the
//! utterance, returned in the dispatcher's own spelling so lookups hit.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;

use super::{Intent, Recognizer, RecognizerResult, entities};
use crate::dispatch::{DID_NOT_VOTE, DID_VOTE, EntityDispatcher};
use crate::error::RecognizerError;

static WAKE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bwake\s*(?:up\s+)?(?:the\s+)?bot\b").expect("static regex"));
static GOODBYE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:bye|goodbye|see you|that's all|end conversation)\b").expect("static regex")
});
static GREETING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*(?:hi|hello|hey|howdy|hiya)\b").expect("static regex"));
static NAME_PHRASE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:my name is|my name's|call me|i'm|i am|im)\s+([\p{L}'-]+)")
        .expect("static regex")
});
static BARE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\p{L}[\p{L}'-]*(?:\s+\p{L}[\p{L}'-]*)?)\s*[.!]?\s*$").expect("static regex"));
static NEGATIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:no|nope|nah|didn't|didnt|did not|never|not really)\b").expect("static regex")
});
static AFFIRMATIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:yes|yeah|yep|yup|i did|did vote|voted|of course|sure)\b").expect("static regex")
});

/// Words that follow "I'm"/"I am" without being a name, or that are
/// never names when given as a bare answer.
const STOP_WORDS: &[&str] = &[
    "a", "an", "the", "from", "in", "at", "not", "no", "yes", "yeah", "yep", "nope", "ok", "okay",
    "sure", "fine", "good", "great", "well", "hi", "hello", "hey", "bye", "goodbye", "thanks",
    "living", "based", "voting", "worried", "interested", "into", "for", "with", "very", "so",
];

/// A term the recognizer can spot, with its compiled matcher.
#[derive(Debug, Clone)]
struct Term {
    value: String,
    regex: Regex,
}

/// Offline recognizer driven by regexes and the dispatcher's vocabulary.
pub struct KeywordRecognizer {
    locations: Vec<Term>,
    parties: Vec<Term>,
    issues: Vec<Term>,
}

impl KeywordRecognizer {
    /// Build a recognizer from explicit vocabularies.
    pub fn new<L, P, I>(locations: L, parties: P, issues: I) -> Self
    where
        L: IntoIterator<Item = String>,
        P: IntoIterator<Item = String>,
        I: IntoIterator<Item = String>,
    {
        Self {
            locations: compile_terms(locations),
            parties: compile_terms(parties),
            issues: compile_terms(issues),
        }
    }

    /// Build a recognizer that knows every key the dispatcher can answer.
    pub fn from_dispatcher(dispatcher: &EntityDispatcher) -> Self {
        Self::new(
            dispatcher.known_regions(),
            dispatcher.known_parties(),
            dispatcher.known_issues(),
        )
    }

    /// Synchronous recognition; never fails.
    pub fn recognize_text(&self, text: &str) -> RecognizerResult {
        let mut result = RecognizerResult::empty(text);

        let location = longest_match(&self.locations, text);
        let party = longest_match(&self.parties, text);
        let issue = longest_match(&self.issues, text);

        if let Some(ref v) = location {
            result = result.with_entity(entities::LOCATION, v.clone());
        }
        if let Some(ref v) = party {
            result = result.with_entity(entities::PARTY, v.clone());
        }
        if let Some(ref v) = issue {
            result = result.with_entity(entities::ISSUE, v.clone());
        }

        if let Some(voted) = voted_answer(text) {
            result = result.with_entity(entities::VOTED, voted);
        }

        let any_vocab = location.is_some() || party.is_some() || issue.is_some();
        if let Some(name) = extract_name(text, any_vocab) {
            result = result.with_entity(entities::NAME, name);
        }

        if WAKE.is_match(text) {
            result = result.with_intent(Intent::WakeBot, 1.0);
        }
        if GOODBYE.is_match(text) {
            result = result.with_intent(Intent::EndConversation, 0.9);
        }
        if GREETING.is_match(text) {
            result = result.with_intent(Intent::Greeting, 0.8);
        }
        if party.is_some() {
            result = result.with_intent(Intent::DiscussParty, 0.6);
        }
        if location.is_some() {
            result = result.with_intent(Intent::DiscussLocation, 0.6);
        }
        if issue.is_some() {
            result = result.with_intent(Intent::DiscussIssues, 0.6);
        }
        if result.entity(entities::NAME).is_some() {
            result = result.with_intent(Intent::DiscussPersonal, 0.5);
        }

        result
    }
}

#[async_trait]
impl Recognizer for KeywordRecognizer {
    fn name(&self) -> &str {
        "keyword"
    }

    async fn recognize(&self, text: &str) -> Result<RecognizerResult, RecognizerError> {
        Ok(self.recognize_text(text))
    }
}

/// Read a yes/no answer. Negative phrasing wins when both appear.
pub fn yes_no(text: &str) -> Option<bool> {
    if NEGATIVE.is_match(text) {
        Some(false)
    } else if AFFIRMATIVE.is_match(text) {
        Some(true)
    } else {
        None
    }
}

/// Map a yes/no answer onto the `voted` entity values.
pub fn voted_answer(text: &str) -> Option<&'static str> {
    yes_no(text).map(|yes| if yes { DID_VOTE } else { DID_NOT_VOTE })
}

fn compile_terms<T: IntoIterator<Item = String>>(values: T) -> Vec<Term> {
    let mut values: Vec<String> = values.into_iter().collect();
    values.sort();
    values.dedup();
    // Longest first so "dublin central" beats "dublin".
    values.sort_by_key(|v| std::cmp::Reverse(v.chars().count()));
    values
        .into_iter()
        .filter_map(|value| {
            let pattern = format!(r"(?i)\b{}\b", regex::escape(&value));
            match Regex::new(&pattern) {
                Ok(regex) => Some(Term { value, regex }),
                Err(e) => {
                    tracing::warn!(term = %value, error = %e, "Skipping unmatchable term");
                    None
                }
            }
        })
        .collect()
}

fn longest_match(terms: &[Term], text: &str) -> Option<String> {
    terms
        .iter()
        .find(|t| t.regex.is_match(text))
        .map(|t| t.value.clone())
}

fn is_stop_word(word: &str) -> bool {
    let lower = word.to_lowercase();
    STOP_WORDS.contains(&lower.as_str())
}

/// Pull a name from "my name is X" style phrases, or accept a short bare
/// answer when nothing else in the utterance was recognized.
fn extract_name(text: &str, any_vocab: bool) -> Option<String> {
    if let Some(caps) = NAME_PHRASE.captures(text) {
        let word = caps.get(1)?.as_str();
        if !is_stop_word(word) {
            return Some(word.to_string());
        }
    }
    if any_vocab || WAKE.is_match(text) || GREETING.is_match(text) {
        return None;
    }
    let caps = BARE_NAME.captures(text)?;
    let candidate = caps.get(1)?.as_str().trim();
    if candidate.split_whitespace().any(is_stop_word) {
        return None;
    }
    Some(candidate.to_string())
}
