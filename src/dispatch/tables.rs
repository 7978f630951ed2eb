//! Built-in reply tables for the 2020 Irish general election survey.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Every canned reply the bot can give, keyed by recognized value.
///
/// Lookups are literal and case-sensitive. Alias maps fold the spellings
/// the language model emits onto one canonical key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyTables {
    /// Party spelling → canonical party.
    pub party_aliases: BTreeMap<String, String>,
    /// Canonical party → summary line.
    pub parties: BTreeMap<String, String>,
    /// Issue → summary line.
    pub issues: BTreeMap<String, String>,
    /// Voted flag → summary line.
    pub voted: BTreeMap<String, String>,
    /// Location spelling → canonical region.
    pub region_aliases: BTreeMap<String, String>,
    /// Canonical region → remark made when the user names it.
    pub region_remarks: BTreeMap<String, String>,
    /// Issue → canonical region → extra summary line.
    pub issue_followups: BTreeMap<String, BTreeMap<String, String>>,
    /// Canonical party → canonical region → likely candidate line.
    pub candidates: BTreeMap<String, BTreeMap<String, String>>,
}

impl ReplyTables {
    /// Check that every alias and nested key points at a known canonical key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let regions: Vec<&String> = self.region_aliases.values().collect();

        for (alias, party) in &self.party_aliases {
            if !self.parties.contains_key(party) {
                return Err(ConfigError::InvalidValue {
                    key: format!("party_aliases.{alias}"),
                    message: format!("unknown party {party:?}"),
                });
            }
        }
        for region in self.region_remarks.keys() {
            if !regions.contains(&region) {
                return Err(ConfigError::InvalidValue {
                    key: format!("region_remarks.{region}"),
                    message: "region has no alias".into(),
                });
            }
        }
        for (party, by_region) in &self.candidates {
            if !self.parties.contains_key(party) {
                return Err(ConfigError::InvalidValue {
                    key: format!("candidates.{party}"),
                    message: "unknown party".into(),
                });
            }
            for region in by_region.keys() {
                if !regions.contains(&region) {
                    return Err(ConfigError::InvalidValue {
                        key: format!("candidates.{party}.{region}"),
                        message: "region has no alias".into(),
                    });
                }
            }
        }
        for (issue, by_region) in &self.issue_followups {
            if !self.issues.contains_key(issue) {
                return Err(ConfigError::InvalidValue {
                    key: format!("issue_followups.{issue}"),
                    message: "unknown issue".into(),
                });
            }
            for region in by_region.keys() {
                if !regions.contains(&region) {
                    return Err(ConfigError::InvalidValue {
                        key: format!("issue_followups.{issue}.{region}"),
                        message: "region has no alias".into(),
                    });
                }
            }
        }
        Ok(())
    }
}

// ── Parties ─────────────────────────────────────────────────────────

const GREEN: &str = "green party";
const SINN_FEIN: &str = "sinn fein";
const FIANNA_FAIL: &str = "fianna fail";
const FINE_GAEL: &str = "fine gael";
const LABOUR: &str = "labour";
const INDEPENDENT: &str = "independent";

const PARTY_ALIASES: &[(&str, &str)] = &[
    ("green party", GREEN),
    ("greens", GREEN),
    ("sinn fein", SINN_FEIN),
    ("sinn féin", SINN_FEIN),
    ("SF", SINN_FEIN),
    ("fianna fail", FIANNA_FAIL),
    ("fianna fáil", FIANNA_FAIL),
    ("FF", FIANNA_FAIL),
    ("fine gael", FINE_GAEL),
    ("labour", LABOUR),
    ("independent", INDEPENDENT),
    ("independents", INDEPENDENT),
];

const PARTY_LINES: &[(&str, &str)] = &[
    (
        GREEN,
        "You support the Green Party so I can tell that you care deeply about stopping climate change. It is a number one priority for you.",
    ),
    (
        SINN_FEIN,
        "You support Sinn Féin, so I can tell that you're interested in a fairer, equal society for everyone. Establishing a united Ireland may also be important to you.",
    ),
    (
        FIANNA_FAIL,
        "You support Fianna Fáil. You are in favour of realistic government policies that are more in touch with the people. You'd never vote for a Fine Gael candidate.",
    ),
    (
        FINE_GAEL,
        "You support Fine Gael. You think an 'economy driven' Ireland is the best approach for government. You'd rather Ireland remains part of Europe in the future.",
    ),
    (
        LABOUR,
        "You support the Labour party. You believe in an equal society for everyone in society.",
    ),
    (
        INDEPENDENT,
        "You see yourself as an independent which possibly means you have no interest in mainstream politics and don't necessarily align to a political party.",
    ),
];

// ── Issues and voting ───────────────────────────────────────────────

const ISSUE_LINES: &[(&str, &str)] = &[
    (
        "education",
        "I can infer that you are either a teacher or a student, who cares about improving education in Ireland.",
    ),
    (
        "housing",
        "Improving housing is important to you, I can infer that you are paying expensive rent in Dublin as a student or finding it difficult to find affordable housing.",
    ),
    (
        "teacher's pay",
        "I can guess that you're probably a teacher because you care about getting equal pay.",
    ),
    (
        "health service",
        "Improving health infrastructure is important to you so you or someone you know have probably experienced long waiting times in hospitals recently.",
    ),
    (
        "coronavirus",
        "You're worried about the coronavirus and the implications it may cause for society. There's a chance you could be part of an 'at risk' health group.",
    ),
    (
        "mortgage",
        "You're worried about the mortgage situation, I can assume that you might be building a house in the future.",
    ),
    (
        "climate change",
        "You're worried about the environment and think it's important that we act together to stop climate change.",
    ),
    (
        "public transport",
        "Improving Ireland's public transport infrastructure is important to you... You probably don't drive a car and you're a student.",
    ),
    (
        "unemployment",
        "Improving Ireland's employment rates is important to you which may mean that you might be unemployed at the minute.",
    ),
    (
        "mental health",
        "Improving mental health infrastructure in Ireland is important to you.",
    ),
];

const ISSUE_FOLLOWUPS: &[(&str, &str, &str)] = &[
    (
        "health service",
        "wexford",
        "Plus the fact that you're from Wexford may mean that you feel that a 24/7 cardiac care unit is needed in the county.",
    ),
    (
        "mental health",
        "wexford",
        "Plus the fact that you're from Wexford may mean that you are in favour of St. Senan's reopening as a psychiatric unit.",
    ),
];

/// The only voted flag that unlocks candidate guesses.
pub const DID_VOTE: &str = "did vote";
pub const DID_NOT_VOTE: &str = "did not vote";

const VOTED_LINES: &[(&str, &str)] = &[
    (
        DID_VOTE,
        "You voted in the last general election, which probably means that you have an interest in politics and care about your right to vote.",
    ),
    (
        DID_NOT_VOTE,
        "You did not vote in the last general election, which means you probably feel indifferent about politics, or don't have the right to vote in Ireland.",
    ),
];

// ── Regions ─────────────────────────────────────────────────────────

const REGION_ALIASES: &[(&str, &str)] = &[
    ("wexford", "wexford"),
    ("dublin", "dublin"),
    ("dun laoghaire", "dun laoghaire"),
    ("dun - laoghaire", "dun laoghaire"),
    ("dun laoighre", "dun laoghaire"),
    ("dun - laoighre", "dun laoghaire"),
    ("dún - laoghaire", "dun laoghaire"),
    ("dún laoighre", "dun laoghaire"),
    ("Dun Laoighre", "dun laoghaire"),
    ("dublin central", "dublin central"),
    ("dublin - central", "dublin central"),
    ("dublin south west", "dublin south west"),
    ("dublin south-west", "dublin south west"),
    ("dublin south - west", "dublin south west"),
    ("galway", "galway"),
    ("kildare", "kildare"),
    ("cork", "cork"),
    ("leitrim", "leitrim"),
    ("carlow", "carlow-kilkenny"),
    ("kilkenny", "carlow-kilkenny"),
    ("carlow-kilkenny", "carlow-kilkenny"),
    ("carlow - kilkenny", "carlow-kilkenny"),
    ("cavan", "cavan"),
    ("mayo", "mayo"),
    ("louth", "louth"),
    ("donegal", "donegal"),
];

const REGION_REMARKS: &[(&str, &str)] = &[
    (
        "wexford",
        "The Sunny South East! A big win for Johnny Mythen down there, a surprising result don't you think?",
    ),
    (
        "dublin",
        "Interesting. Dublin's poll was dominated by Sinn Féin with 24% of the preference. Surprising result don't you think?",
    ),
    (
        "dun laoghaire",
        "Interesting. Dublin's poll was dominated by Sinn Féin with 24% of the preference. Surprising result don't you think?",
    ),
    (
        "carlow-kilkenny",
        "Interesting. A big win for Kathleen Funchion in the Carlow-Kilkenny constituency. An unsurprising result don't you think?",
    ),
    (
        "donegal",
        "Very good. A big win for Sinn Féin's Pearse Doherty in the Donegal area. An unsurprising result don't you think?",
    ),
    (
        "galway",
        "Very good. A big result for the independent Seán Canney in Galway. A surprising result don't you think?",
    ),
];

// ── Candidates ──────────────────────────────────────────────────────

const CANDIDATES: &[(&str, &str, &str)] = &[
    (GREEN, "dun laoghaire", "Ossian Smyth"),
    (GREEN, "dublin central", "Neasa Hourigan"),
    (GREEN, "galway", "Seán Canney"),
    (GREEN, "kildare", "Ronan Maher"),
    (GREEN, "cork", "Liam Quaide"),
    (GREEN, "leitrim", "Martin Kenny"),
    (GREEN, "carlow-kilkenny", "Malcolm Noonan"),
    (GREEN, "cavan", "Róisín Garvey"),
    (GREEN, "mayo", "Saoirse McHugh"),
    (GREEN, "louth", "Mark Dearey"),
    (GREEN, "dublin south west", "Neasa Hourigan"),
    (SINN_FEIN, "wexford", "Johnny Mythen"),
    (SINN_FEIN, "dun laoghaire", "Shane O'Brien"),
    (SINN_FEIN, "galway", "Louis O'Hara or Seán Canney"),
    (SINN_FEIN, "kildare", "Patricia Ryan"),
    (SINN_FEIN, "donegal", "Pearse Doherty"),
    (SINN_FEIN, "leitrim", "Martin Kenny"),
    (SINN_FEIN, "cork", "Pat Buckley"),
    (SINN_FEIN, "cavan", "Violet-Anne Wynne"),
    (SINN_FEIN, "mayo", "Rose Conway-Walsh"),
    (SINN_FEIN, "carlow-kilkenny", "Kathleen Funchion"),
    (SINN_FEIN, "louth", "Imelda Munster"),
    (SINN_FEIN, "dublin central", "Mary Lou McDonald"),
    (FIANNA_FAIL, "wexford", "James Browne"),
    (FIANNA_FAIL, "dun laoghaire", "Cormac Devlin"),
    (FIANNA_FAIL, "galway", "Anne Rabbitte"),
    (FIANNA_FAIL, "kildare", "Fiona O'Loughlin"),
    (FIANNA_FAIL, "donegal", "Charlie McConalogue"),
    (FIANNA_FAIL, "leitrim", "Marc MacSharry"),
    (FIANNA_FAIL, "cork", "James O'Connor"),
    (FIANNA_FAIL, "cavan", "Cathal Crowe"),
    (FIANNA_FAIL, "mayo", "Dara Calleary"),
    (FIANNA_FAIL, "louth", "Declan Breathnach"),
    (FIANNA_FAIL, "carlow-kilkenny", "John McGuinness"),
    (FIANNA_FAIL, "dublin central", "Mary Fitzpatrick"),
    (FINE_GAEL, "wexford", "Paul Kehoe or Michael D'Arcy"),
    (
        FINE_GAEL,
        "dun laoghaire",
        "Jennifer Carroll MacNeill or Mary Mitchell O'Connor",
    ),
    (FINE_GAEL, "galway", "Ciarán Cannon"),
    (FINE_GAEL, "kildare", "Martin Heydon"),
    (FINE_GAEL, "donegal", "Joe McHugh"),
    (FINE_GAEL, "leitrim", "Frank Feighan"),
    (FINE_GAEL, "cork", "David Stanton"),
    (FINE_GAEL, "cavan", "Joe Carey"),
    (FINE_GAEL, "mayo", "Michael Ring"),
    (FINE_GAEL, "carlow-kilkenny", "John Paul Phelan"),
    (FINE_GAEL, "louth", "Fergus O'Dowd"),
    (LABOUR, "cavan", "Brendan Howlin"),
    (LABOUR, "cork", "Seán Sherlock"),
    (LABOUR, "carlow-kilkenny", "Denis Hynes"),
    (LABOUR, "louth", "Ged Nash"),
    (INDEPENDENT, "wexford", "Verona Murphy"),
    (INDEPENDENT, "galway", "Seán Canney"),
    (INDEPENDENT, "kildare", "Cathal Berry"),
    (INDEPENDENT, "donegal", "John O'Donnell"),
    (INDEPENDENT, "leitrim", "Marian Harkin"),
    (INDEPENDENT, "cork", "Mary Linehan-Foley"),
    (INDEPENDENT, "mayo", "Gráinne De Barra"),
    (INDEPENDENT, "cavan", "Michael McNamara"),
    (INDEPENDENT, "carlow-kilkenny", "Alan Hynes"),
    (INDEPENDENT, "louth", "Peter Fitzpatrick"),
    (INDEPENDENT, "dublin central", "Mary Lou McDonald or Gary Gannon"),
];

/// Lines that do not follow their party's usual wording.
const CANDIDATE_OVERRIDES: &[(&str, &str, &str)] = &[
    (
        GREEN,
        "wexford",
        "I can guess that you voted left in the last election and probably gave Paula Roseingrave or Verona Murphy your top votes.",
    ),
    (
        INDEPENDENT,
        "dun laoghaire",
        "I can guess that you voted left in the last election and probably gave Richard Boyd Barrett and Ossian Smyth a number 1 or 2 vote in the last election.",
    ),
];

fn candidate_line(party: &str, names: &str) -> String {
    match party {
        GREEN => format!(
            "I can guess that you voted left in the last election and probably gave {names} your top vote."
        ),
        SINN_FEIN => format!(
            "I can guess that you voted left in the last election and probably gave {names} your number one vote."
        ),
        INDEPENDENT => format!(
            "I can guess that you voted left in the last election and probably gave {names} your number 1 vote in the last election."
        ),
        _ => format!("I can guess that you may have given {names} your number one vote in the last election."),
    }
}

fn to_map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// The reply tables the bot ships with.
pub fn builtin() -> ReplyTables {
    let mut tables = ReplyTables {
        party_aliases: to_map(PARTY_ALIASES),
        parties: to_map(PARTY_LINES),
        issues: to_map(ISSUE_LINES),
        voted: to_map(VOTED_LINES),
        region_aliases: to_map(REGION_ALIASES),
        region_remarks: to_map(REGION_REMARKS),
        ..Default::default()
    };

    for (issue, region, line) in ISSUE_FOLLOWUPS {
        tables
            .issue_followups
            .entry(issue.to_string())
            .or_default()
            .insert(region.to_string(), line.to_string());
    }

    for (party, region, names) in CANDIDATES {
        tables
            .candidates
            .entry(party.to_string())
            .or_default()
            .insert(region.to_string(), candidate_line(party, names));
    }
    for (party, region, line) in CANDIDATE_OVERRIDES {
        tables
            .candidates
            .entry(party.to_string())
            .or_default()
            .insert(region.to_string(), line.to_string());
    }

    tables
}
