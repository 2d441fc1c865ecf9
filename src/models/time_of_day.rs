//! Time-of-day tags: four canonical dosing slots plus free-form custom tags.
//!
//! French and English spellings of the canonical slots are collapsed into
//! one token before storage or comparison. Everything else is a custom tag
//! and is kept exactly as typed.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A dosing slot within a day.
///
/// Ordering follows the day: morning, noon, evening, night, then custom
/// tags alphabetically.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TimeOfDay {
    Morning,
    Noon,
    Evening,
    Night,
    Custom(String),
}

impl TimeOfDay {
    /// Map a raw tag onto a slot, folding known synonyms.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "morning" | "matin" => TimeOfDay::Morning,
            "noon" | "midi" => TimeOfDay::Noon,
            "evening" | "soir" => TimeOfDay::Evening,
            "night" | "nuit" => TimeOfDay::Night,
            _ => TimeOfDay::Custom(raw.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            TimeOfDay::Morning => "morning",
            TimeOfDay::Noon => "noon",
            TimeOfDay::Evening => "evening",
            TimeOfDay::Night => "night",
            TimeOfDay::Custom(tag) => tag,
        }
    }
}

impl From<String> for TimeOfDay {
    fn from(raw: String) -> Self {
        TimeOfDay::parse(&raw)
    }
}

impl From<&str> for TimeOfDay {
    fn from(raw: &str) -> Self {
        TimeOfDay::parse(raw)
    }
}

impl From<TimeOfDay> for String {
    fn from(slot: TimeOfDay) -> Self {
        match slot {
            TimeOfDay::Custom(tag) => tag,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonicalize a list of tags, then deduplicate keeping first-seen order.
///
/// Blank tags are dropped. Pure and idempotent.
pub fn normalize_times<S: AsRef<str>>(tags: &[S]) -> Vec<TimeOfDay> {
    let mut out: Vec<TimeOfDay> = Vec::with_capacity(tags.len());
    for raw in tags {
        let raw = raw.as_ref();
        if raw.trim().is_empty() {
            continue;
        }
        let slot = TimeOfDay::parse(raw);
        if !out.contains(&slot) {
            out.push(slot);
        }
    }
    out
}

/// String form of `normalize_times`, for callers that store plain tags.
pub fn normalize_time_tags<S: AsRef<str>>(tags: &[S]) -> Vec<String> {
    normalize_times(tags).into_iter().map(String::from).collect()
}
