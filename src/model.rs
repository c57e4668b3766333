use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One recorded meeting's structured content. Created by ingestion,
/// read-only afterwards; the store owns persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    pub id: String,
    pub title: String,
    pub date: NaiveDateTime,
    pub department: String,
    pub participants: Vec<Participant>,
    pub dialogue: Vec<DialogueEntry>,
    pub decisions: Vec<DecisionPoint>,
    pub action_items: Vec<ActionItem>,
    pub tags: Vec<String>,
    pub metadata: BTreeMap<String, String>,
}

/// Meeting participant. Ids are assigned sequentially (P1, P2, ...) in
/// first-appearance order at ingestion and never renumbered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    pub id: String,
    pub name: String,
    pub role: String,
    pub department: String,
}

/// A single utterance. `participant_id` is None when the speaker could not
/// be resolved against the roster; such entries are retained.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialogueEntry {
    pub participant_id: Option<String>,
    pub text: String,
    pub timestamp: NaiveDateTime,
    #[serde(rename = "type")]
    pub kind: DialogueType,
    pub mentions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionPoint {
    pub topic: String,
    pub decision: String,
    /// Participant ids; not required to resolve against the roster.
    pub stakeholders: Vec<String>,
    pub timestamp: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionItem {
    pub description: String,
    pub assignee: String,
    pub due_date: NaiveDateTime,
    /// Free-form label, e.g. NEW / IN_PROGRESS / BLOCKED / COMPLETED.
    pub status: String,
}

/// Discourse category assigned to one utterance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DialogueType {
    Statement,
    Question,
    Response,
    ActionItem,
    Decision,
    Clarification,
    Suggestion,
    Concern,
    Agreement,
    Disagreement,
    Summary,
    Followup,
}

impl DialogueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DialogueType::Statement => "STATEMENT",
            DialogueType::Question => "QUESTION",
            DialogueType::Response => "RESPONSE",
            DialogueType::ActionItem => "ACTION_ITEM",
            DialogueType::Decision => "DECISION",
            DialogueType::Clarification => "CLARIFICATION",
            DialogueType::Suggestion => "SUGGESTION",
            DialogueType::Concern => "CONCERN",
            DialogueType::Agreement => "AGREEMENT",
            DialogueType::Disagreement => "DISAGREEMENT",
            DialogueType::Summary => "SUMMARY",
            DialogueType::Followup => "FOLLOWUP",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "STATEMENT" => Some(DialogueType::Statement),
            "QUESTION" => Some(DialogueType::Question),
            "RESPONSE" => Some(DialogueType::Response),
            "ACTION_ITEM" => Some(DialogueType::ActionItem),
            "DECISION" => Some(DialogueType::Decision),
            "CLARIFICATION" => Some(DialogueType::Clarification),
            "SUGGESTION" => Some(DialogueType::Suggestion),
            "CONCERN" => Some(DialogueType::Concern),
            "AGREEMENT" => Some(DialogueType::Agreement),
            "DISAGREEMENT" => Some(DialogueType::Disagreement),
            "SUMMARY" => Some(DialogueType::Summary),
            "FOLLOWUP" => Some(DialogueType::Followup),
            _ => None,
        }
    }
}

impl Transcript {
    /// Resolve a participant id to the roster entry, if any.
    pub fn participant(&self, id: &str) -> Option<&Participant> {
        self.participants.iter().find(|p| p.id == id)
    }

    /// Speaker name for a dialogue entry, falling back to "Unknown" for
    /// unresolved references.
    pub fn speaker_name(&self, entry: &DialogueEntry) -> &str {
        entry
            .participant_id
            .as_deref()
            .and_then(|id| self.participant(id))
            .map(|p| p.name.as_str())
            .unwrap_or("Unknown")
    }
}
