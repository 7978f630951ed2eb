//! Natural-language recognition boundary.
//!
//! The dialogs never call a recognizer themselves. The bot recognizes each
//! inbound utterance once per turn and hands the [`RecognizerResult`] to the
//! sequencer. Two implementations ship with the crate:
//! - **LUIS**: the hosted prediction endpoint the survey model was trained on
//! - **Keyword**: an offline regex recognizer for local runs and tests

pub mod keyword;
pub mod luis;

pub use keyword::KeywordRecognizer;
pub use luis::{LuisConfig, LuisRecognizer};

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::RecognizerError;

/// Entity names produced by the survey language model.
pub mod entities {
    pub const LOCATION: &str = "location";
    pub const NAME: &str = "name";
    pub const PARTY: &str = "party_name";
    pub const ISSUE: &str = "topical_issue";
    pub const VOTED: &str = "voted";
}

/// Intents known to the survey language model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Intent {
    #[serde(rename = "discussCandidate")]
    DiscussCandidate,
    #[serde(rename = "discussLocation")]
    DiscussLocation,
    #[serde(rename = "discussParty")]
    DiscussParty,
    #[serde(rename = "discussPersonal")]
    DiscussPersonal,
    #[serde(rename = "discussPolitics")]
    DiscussPolitics,
    // The published model spells this label with a double "s".
    #[serde(rename = "disscussIssues", alias = "discussIssues")]
    DiscussIssues,
    #[serde(rename = "endConversation")]
    EndConversation,
    #[serde(rename = "Greeting")]
    Greeting,
    #[serde(rename = "wakeBot")]
    WakeBot,
    #[serde(rename = "None")]
    None,
}

impl Intent {
    /// Map a model label to an intent. Unknown labels yield `None`.
    pub fn from_label(label: &str) -> Option<Intent> {
        let intent = match label {
            "discussCandidate" => Self::DiscussCandidate,
            "discussLocation" => Self::DiscussLocation,
            "discussParty" => Self::DiscussParty,
            "discussPersonal" => Self::DiscussPersonal,
            "discussPolitics" => Self::DiscussPolitics,
            "disscussIssues" | "discussIssues" => Self::DiscussIssues,
            "endConversation" => Self::EndConversation,
            "Greeting" => Self::Greeting,
            "wakeBot" => Self::WakeBot,
            "None" => Self::None,
            _ => return None,
        };
        Some(intent)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::DiscussCandidate => "discussCandidate",
            Self::DiscussLocation => "discussLocation",
            Self::DiscussParty => "discussParty",
            Self::DiscussPersonal => "discussPersonal",
            Self::DiscussPolitics => "discussPolitics",
            Self::DiscussIssues => "disscussIssues",
            Self::EndConversation => "endConversation",
            Self::Greeting => "Greeting",
            Self::WakeBot => "wakeBot",
            Self::None => "None",
        }
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// One scored intent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntentScore {
    pub intent: Intent,
    pub score: f64,
}

/// Pick the intent with strictly the highest score.
///
/// Ties keep the first one encountered; an empty list, or one where every
/// score is zero, yields `(Intent::None, 0.0)`.
pub fn top_intent(intents: &[IntentScore]) -> (Intent, f64) {
    let mut best = Intent::None;
    let mut max = 0.0;
    for entry in intents {
        if entry.score > max {
            best = entry.intent;
            max = entry.score;
        }
    }
    (best, max)
}

/// What the recognizer understood from one utterance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecognizerResult {
    /// The raw utterance.
    pub text: String,
    /// Scored intents, in the order the recognizer reported them.
    pub intents: Vec<IntentScore>,
    /// Entity name → extracted values.
    pub entities: BTreeMap<String, Vec<String>>,
}

impl RecognizerResult {
    /// A result with no intents and no entities.
    pub fn empty(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn with_intent(mut self, intent: Intent, score: f64) -> Self {
        self.intents.push(IntentScore { intent, score });
        self
    }

    pub fn with_entity(mut self, name: &str, value: impl Into<String>) -> Self {
        self.entities
            .entry(name.to_string())
            .or_default()
            .push(value.into());
        self
    }

    pub fn top_intent(&self) -> (Intent, f64) {
        top_intent(&self.intents)
    }

    /// Values for an entity, `None` when absent or empty.
    pub fn entity(&self, name: &str) -> Option<&[String]> {
        self.entities
            .get(name)
            .filter(|values| !values.is_empty())
            .map(Vec::as_slice)
    }
}

/// A natural-language recognizer.
#[async_trait]
pub trait Recognizer: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &str;

    /// Recognize intents and entities in an utterance.
    async fn recognize(&self, text: &str) -> Result<RecognizerResult, RecognizerError>;
}
