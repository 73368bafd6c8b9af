use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::Error;

/// Position of a candidate in the hiring pipeline.
///
/// Every stage can move to every other stage. `Hired` and `Rejected` are not
/// terminal; whether they should be is still awaiting product sign-off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Applied,
    Screen,
    Tech,
    Offer,
    Hired,
    Rejected,
}

impl Stage {
    pub const ALL: [Stage; 6] = [
        Stage::Applied,
        Stage::Screen,
        Stage::Tech,
        Stage::Offer,
        Stage::Hired,
        Stage::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Applied => "applied",
            Stage::Screen => "screen",
            Stage::Tech => "tech",
            Stage::Offer => "offer",
            Stage::Hired => "hired",
            Stage::Rejected => "rejected",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Stage::ALL
            .into_iter()
            .find(|stage| stage.as_str() == s)
            .ok_or_else(|| Error::BadRequest(format!("Unknown pipeline stage: {}", s)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: Uuid,
    pub job_id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub experience: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    pub resume: Option<String>,
    pub cover_letter: Option<String>,
    pub stage: Stage,
    #[serde(default)]
    pub notes: Vec<Note>,
    pub applied_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: Uuid,
    pub author: String,
    pub content: String,
    #[serde(default)]
    pub mentions: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimelineEventKind {
    StageChange,
    Note,
}

impl TimelineEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimelineEventKind::StageChange => "stage_change",
            TimelineEventKind::Note => "note",
        }
    }
}

impl FromStr for TimelineEventKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stage_change" => Ok(TimelineEventKind::StageChange),
            "note" => Ok(TimelineEventKind::Note),
            other => Err(Error::Internal(format!("Unknown timeline event kind: {}", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEvent {
    pub kind: TimelineEventKind,
    pub stage: Option<Stage>,
    pub description: String,
    pub author: Option<String>,
    pub at: DateTime<Utc>,
}

/// Pulls `@handle` mentions out of a note body, in order of appearance and
/// without duplicates.
pub fn extract_mentions(content: &str) -> Vec<String> {
    let mut mentions: Vec<String> = Vec::new();
    for token in content.split_whitespace() {
        let Some(handle) = token.strip_prefix('@') else {
            continue;
        };
        let handle: String = handle
            .chars()
            .take_while(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
            .collect();
        let handle = handle.trim_end_matches('.').to_string();
        if !handle.is_empty() && !mentions.contains(&handle) {
            mentions.push(handle);
        }
    }
    mentions
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_parses_only_known_values() {
        for stage in Stage::ALL {
            assert_eq!(stage.as_str().parse::<Stage>().unwrap(), stage);
        }
        assert!("interview".parse::<Stage>().is_err());
        assert!("Applied".parse::<Stage>().is_err());
    }

    #[test]
    fn stage_serializes_lowercase() {
        let json = serde_json::to_string(&Stage::Tech).unwrap();
        assert_eq!(json, "\"tech\"");
        assert!(serde_json::from_str::<Stage>("\"onsite\"").is_err());
    }

    #[test]
    fn mentions_are_deduplicated_and_trimmed() {
        let mentions = extract_mentions("ping @alice and @bob.smith, then @alice again. cc @carol.");
        assert_eq!(mentions, vec!["alice", "bob.smith", "carol"]);
        assert!(extract_mentions("no handles here @").is_empty());
    }
}
