//! Entity dispatcher — recognized values to canned reply text.
//!
//! Every lookup is a literal, case-sensitive match against the reply
//! tables. Unmapped values yield `None` and the caller simply says nothing.

pub mod tables;

pub use tables::{DID_NOT_VOTE, DID_VOTE, ReplyTables};

use std::path::Path;

use crate::error::ConfigError;

/// Which table a value is looked up in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Party,
    Issue,
    Region,
    Voted,
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Party => "party",
            Self::Issue => "issue",
            Self::Region => "region",
            Self::Voted => "voted",
        };
        write!(f, "{s}")
    }
}

/// Read-only lookup over a set of [`ReplyTables`].
#[derive(Debug, Clone)]
pub struct EntityDispatcher {
    tables: ReplyTables,
}

impl EntityDispatcher {
    /// Wrap a table set after checking it is internally consistent.
    pub fn new(tables: ReplyTables) -> Result<Self, ConfigError> {
        tables.validate()?;
        Ok(Self { tables })
    }

    /// The tables the bot ships with.
    pub fn builtin() -> Self {
        Self {
            tables: tables::builtin(),
        }
    }

    /// Load a replacement table set from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let tables: ReplyTables = serde_json::from_str(&raw)
            .map_err(|e| ConfigError::ParseError(format!("{}: {e}", path.display())))?;
        let dispatcher = Self::new(tables)?;
        tracing::info!(
            path = %path.display(),
            parties = dispatcher.tables.parties.len(),
            regions = dispatcher.tables.region_aliases.len(),
            "Loaded reply tables"
        );
        Ok(dispatcher)
    }

    /// The message for a value in one category, if any.
    pub fn dispatch(&self, category: Category, value: &str) -> Option<&str> {
        let line = match category {
            Category::Party => self
                .canonical_party(value)
                .and_then(|party| self.tables.parties.get(party)),
            Category::Issue => self.tables.issues.get(value),
            Category::Region => return self.region_remark(value),
            Category::Voted => self.tables.voted.get(value),
        };
        line.map(String::as_str)
    }

    /// The remark made about a named region.
    pub fn region_remark(&self, region: &str) -> Option<&str> {
        let region = self.canonical_region(region)?;
        self.tables.region_remarks.get(region).map(String::as_str)
    }

    /// The likely-candidate line. Only produced when the user voted.
    pub fn candidate(&self, party: &str, region: &str, voted: &str) -> Option<&str> {
        if voted != DID_VOTE {
            return None;
        }
        let party = self.canonical_party(party)?;
        let region = self.canonical_region(region)?;
        self.tables
            .candidates
            .get(party)?
            .get(region)
            .map(String::as_str)
    }

    /// An extra issue line that depends on where the user lives.
    pub fn issue_followup(&self, issue: &str, region: &str) -> Option<&str> {
        let region = self.canonical_region(region)?;
        self.tables
            .issue_followups
            .get(issue)?
            .get(region)
            .map(String::as_str)
    }

    /// Whether an issue has location-specific follow-ups at all.
    pub fn has_issue_followups(&self, issue: &str) -> bool {
        self.tables.issue_followups.contains_key(issue)
    }

    pub fn canonical_party(&self, value: &str) -> Option<&str> {
        self.tables.party_aliases.get(value).map(String::as_str)
    }

    pub fn canonical_region(&self, value: &str) -> Option<&str> {
        self.tables.region_aliases.get(value).map(String::as_str)
    }

    /// Every location spelling the tables recognize.
    pub fn known_regions(&self) -> Vec<String> {
        self.tables.region_aliases.keys().cloned().collect()
    }

    /// Every party spelling the tables recognize.
    pub fn known_parties(&self) -> Vec<String> {
        self.tables.party_aliases.keys().cloned().collect()
    }

    pub fn known_issues(&self) -> Vec<String> {
        self.tables.issues.keys().cloned().collect()
    }
}

impl Default for EntityDispatcher {
    fn default() -> Self {
        Self::builtin()
    }
}
