use std::collections::{BTreeSet, HashMap};
use std::sync::OnceLock;

use chrono::{Duration, NaiveDateTime};
use regex::Regex;
use serde::Deserialize;
use uuid::Uuid;

use crate::classify;
use crate::error::{Error, Result};
use crate::model::{DialogueEntry, Participant, Transcript};

/// Marker opening every speaker-turn line in the custom export format.
const SPEAKER_TURN_MARKER: &str = "User: ";

/// One record of the custom meeting export: a JSON array of these is the
/// ingestion payload.
#[derive(Debug, Deserialize)]
pub struct MeetingRecord {
    pub title: String,
    /// ISO-8601 local datetime, e.g. "2024-03-26T10:00:00".
    pub date: String,
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub organizers: Vec<String>,
    #[serde(default)]
    pub participants: Vec<String>,
    #[serde(default)]
    pub content: String,
}

/// Converts custom meeting records into canonical transcripts. Carries the
/// ingestion-time base used for dialogue timestamps so a batch is
/// reproducible under test.
pub struct Ingestor {
    locality_tag: String,
    base_time: NaiveDateTime,
}

impl Ingestor {
    pub fn new(locality_tag: impl Into<String>) -> Self {
        Self::at(locality_tag, chrono::Local::now().naive_local())
    }

    /// Pin the timestamp base, used by tests.
    pub fn at(locality_tag: impl Into<String>, base_time: NaiveDateTime) -> Self {
        Self {
            locality_tag: locality_tag.into(),
            base_time,
        }
    }

    /// Parse a whole payload. Malformed JSON or an unparsable date fails the
    /// entire batch; no partial results are returned.
    pub fn convert_batch(&self, json: &str) -> Result<Vec<Transcript>> {
        let records: Vec<MeetingRecord> = serde_json::from_str(json)
            .map_err(|e| Error::Format(format!("invalid meeting payload: {e}")))?;

        records.iter().map(|r| self.convert(r)).collect()
    }

    /// Convert one record. Fresh unique id; decisions and action items are
    /// never inferred at ingestion.
    pub fn convert(&self, record: &MeetingRecord) -> Result<Transcript> {
        let date = NaiveDateTime::parse_from_str(&record.date, "%Y-%m-%dT%H:%M:%S")
            .map_err(|e| Error::Format(format!("unparsable date '{}': {e}", record.date)))?;

        // Ids in participant-list order, not speaking order.
        let mut id_by_name: HashMap<&str, String> = HashMap::new();
        let participants: Vec<Participant> = record
            .participants
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let id = format!("P{}", i + 1);
                id_by_name.insert(name.as_str(), id.clone());
                Participant {
                    id,
                    name: name.clone(),
                    role: if record.organizers.contains(name) {
                        "Organizer".to_string()
                    } else {
                        "Participant".to_string()
                    },
                    department: "Unknown".to_string(),
                }
            })
            .collect();

        let dialogue = self.parse_dialogue(&record.content, &id_by_name);

        let mut metadata = std::collections::BTreeMap::new();
        metadata.insert("source".to_string(), record.source.clone());
        metadata.insert("duration".to_string(), record.duration.clone());
        metadata.insert("originalFormat".to_string(), "custom".to_string());

        Ok(Transcript {
            id: Uuid::new_v4().to_string(),
            department: department_from_title(&record.title),
            tags: self.extract_tags(&record.title),
            title: record.title.clone(),
            date,
            participants,
            dialogue,
            decisions: Vec::new(),
            action_items: Vec::new(),
            metadata,
        })
    }

    fn parse_dialogue(
        &self,
        content: &str,
        id_by_name: &HashMap<&str, String>,
    ) -> Vec<DialogueEntry> {
        let mut dialogue = Vec::new();

        for (line_index, raw) in content.lines().enumerate() {
            let line = raw.trim();
            let Some(rest) = line.strip_prefix(SPEAKER_TURN_MARKER) else {
                continue;
            };
            let Some((speaker, text)) = rest.split_once(": ") else {
                continue;
            };

            // Offset by the physical line index, so timestamps stay strictly
            // increasing even when lines in between are skipped.
            dialogue.push(DialogueEntry {
                participant_id: id_by_name.get(speaker).cloned(),
                text: text.to_string(),
                timestamp: self.base_time + Duration::minutes(line_index as i64),
                kind: classify::classify(text),
                mentions: extract_mentions(text),
            });
        }

        dialogue
    }

    fn extract_tags(&self, title: &str) -> Vec<String> {
        let mut tags: BTreeSet<String> = title
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric() && c != '_')
            .filter(|w| w.len() > 3)
            .map(str::to_string)
            .collect();
        tags.insert(self.locality_tag.clone());
        tags.into_iter().collect()
    }
}

/// Title-based department rules, first match wins.
fn department_from_title(title: &str) -> String {
    let lower = title.to_lowercase();
    if lower.contains("market") || lower.contains("client") {
        "Market Research".to_string()
    } else if lower.contains("construction") || lower.contains("building") {
        "Construction".to_string()
    } else {
        "General".to_string()
    }
}

/// @-prefixed tokens in an utterance.
fn extract_mentions(text: &str) -> Vec<String> {
    static MENTION: OnceLock<Regex> = OnceLock::new();
    let re = MENTION.get_or_init(|| Regex::new(r"@(\w+)").unwrap());
    re.captures_iter(text)
        .map(|c| c[1].to_string())
        .collect()
}
