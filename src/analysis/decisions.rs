use std::collections::HashSet;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::model::{ActionItem, DecisionPoint, DialogueType, Transcript};

use super::scoring::{recency_score, round2, ScoringTables};

/// Minutes an action item's due date may sit from the decision timestamp
/// and still count as related.
const RELATED_WINDOW_MINUTES: i64 = 30;
/// Minutes of dialogue kept around a decision as discussion context.
const CONTEXT_WINDOW_MINUTES: i64 = 5;
/// Token-overlap ratio above which two texts count as similar.
const SIMILARITY_THRESHOLD: f64 = 0.3;

/// Implementation state derived from a decision's related action items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionStatus {
    Implemented,
    InProgress,
    Pending,
    Blocked,
    Superseded,
}

impl DecisionStatus {
    pub fn implementation_score(self) -> f64 {
        match self {
            DecisionStatus::Implemented => 100.0,
            DecisionStatus::InProgress => 75.0,
            DecisionStatus::Pending => 50.0,
            DecisionStatus::Blocked => 25.0,
            DecisionStatus::Superseded => 0.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DecisionStatus::Implemented => "IMPLEMENTED",
            DecisionStatus::InProgress => "IN_PROGRESS",
            DecisionStatus::Pending => "PENDING",
            DecisionStatus::Blocked => "BLOCKED",
            DecisionStatus::Superseded => "SUPERSEDED",
        }
    }
}

/// One utterance from the dialogue around a decision.
#[derive(Debug, Clone, Serialize)]
pub struct DialogueContext {
    pub speaker_name: String,
    pub speaker_role: String,
    pub text: String,
    pub timestamp: NaiveDateTime,
    #[serde(rename = "type")]
    pub kind: DialogueType,
}

/// A scored, cross-referenced decision surfaced to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct DecisionReference {
    pub decision_id: String,
    pub topic: String,
    pub decision: String,
    pub timestamp: NaiveDateTime,
    pub relevance_score: f64,
    pub meeting_id: String,
    pub meeting_title: String,
    pub status: DecisionStatus,
    pub stakeholders: Vec<String>,
    pub impacted_areas: Vec<String>,
    pub discussion_context: Vec<DialogueContext>,
    pub related_action_items: Vec<ActionItem>,
    /// Ids of decisions sharing this one's normalized topic.
    pub related_decisions: Vec<String>,
}

/// Extract every decision across the transcripts, score it, then
/// consolidate by topic. Output is ranked by relevance descending with
/// input order breaking ties.
pub fn extract_relevant_decisions(
    tables: &ScoringTables,
    transcripts: &[Transcript],
    now: NaiveDateTime,
) -> Vec<DecisionReference> {
    let mut all: Vec<DecisionReference> = transcripts
        .iter()
        .flat_map(|t| extract_from_transcript(tables, t, now))
        .collect();

    all.sort_by(|a, b| b.relevance_score.total_cmp(&a.relevance_score));
    consolidate(all)
}

fn extract_from_transcript(
    tables: &ScoringTables,
    transcript: &Transcript,
    now: NaiveDateTime,
) -> Vec<DecisionReference> {
    transcript
        .decisions
        .iter()
        .enumerate()
        .map(|(index, decision)| {
            let related = related_action_items(transcript, decision);
            let status = derive_status(&related);
            let impacted_areas = impacted_areas(tables, transcript, decision);
            DecisionReference {
                decision_id: format!("{}-D{index}", transcript.id),
                topic: decision.topic.clone(),
                decision: decision.decision.clone(),
                timestamp: decision.timestamp,
                relevance_score: decision_relevance(
                    decision,
                    impacted_areas.len(),
                    status,
                    now,
                ),
                meeting_id: transcript.id.clone(),
                meeting_title: transcript.title.clone(),
                status,
                stakeholders: decision.stakeholders.clone(),
                impacted_areas,
                discussion_context: discussion_context(transcript, decision),
                related_action_items: related,
                related_decisions: Vec::new(),
            }
        })
        .collect()
}

/// Action items tied to a decision: due within the 30-minute window AND
/// either textually similar to the decision or assigned to a stakeholder.
pub fn related_action_items(transcript: &Transcript, decision: &DecisionPoint) -> Vec<ActionItem> {
    transcript
        .action_items
        .iter()
        .filter(|item| is_related(item, decision))
        .cloned()
        .collect()
}

fn is_related(item: &ActionItem, decision: &DecisionPoint) -> bool {
    let time_related = within_minutes(item.due_date, decision.timestamp, RELATED_WINDOW_MINUTES);
    let content_related = token_overlap(&item.description, &decision.decision) > SIMILARITY_THRESHOLD;
    let stakeholder_overlap = decision.stakeholders.contains(&item.assignee);

    time_related && (content_related || stakeholder_overlap)
}

/// Status from related action items: BLOCKED dominates, then IN_PROGRESS,
/// then all-COMPLETED; anything else (including no related items) is
/// PENDING.
pub fn derive_status(related: &[ActionItem]) -> DecisionStatus {
    if related.is_empty() {
        return DecisionStatus::Pending;
    }
    if related.iter().any(|i| i.status == "BLOCKED") {
        return DecisionStatus::Blocked;
    }
    if related.iter().any(|i| i.status == "IN_PROGRESS") {
        return DecisionStatus::InProgress;
    }
    if related.iter().all(|i| i.status == "COMPLETED") {
        return DecisionStatus::Implemented;
    }
    DecisionStatus::Pending
}

/// Departments touched by a decision: the meeting's own, each stakeholder's,
/// and any whose trigger keywords appear in the decision text. Sorted for
/// reproducible output.
pub fn impacted_areas(
    tables: &ScoringTables,
    transcript: &Transcript,
    decision: &DecisionPoint,
) -> Vec<String> {
    let mut areas: HashSet<String> = HashSet::new();
    areas.insert(transcript.department.clone());

    for stakeholder_id in &decision.stakeholders {
        if let Some(p) = transcript.participant(stakeholder_id) {
            areas.insert(p.department.clone());
        }
    }

    for dept in tables.departments_for(&decision.decision) {
        areas.insert(dept.to_string());
    }

    let mut sorted: Vec<String> = areas.into_iter().collect();
    sorted.sort();
    sorted
}

/// Dialogue entries within five minutes either side of the decision.
pub fn discussion_context(
    transcript: &Transcript,
    decision: &DecisionPoint,
) -> Vec<DialogueContext> {
    transcript
        .dialogue
        .iter()
        .filter(|e| within_minutes(e.timestamp, decision.timestamp, CONTEXT_WINDOW_MINUTES))
        .map(|e| {
            let speaker = e
                .participant_id
                .as_deref()
                .and_then(|id| transcript.participant(id));
            DialogueContext {
                speaker_name: speaker.map_or("Unknown".to_string(), |p| p.name.clone()),
                speaker_role: speaker.map_or("Unknown".to_string(), |p| p.role.clone()),
                text: e.text.clone(),
                timestamp: e.timestamp,
                kind: e.kind,
            }
        })
        .collect()
}

/// Weighted decision relevance: recency, impact scope, stakeholder
/// involvement, and implementation progress.
pub fn decision_relevance(
    decision: &DecisionPoint,
    impacted_area_count: usize,
    status: DecisionStatus,
    now: NaiveDateTime,
) -> f64 {
    let impact = (impacted_area_count as f64 * 20.0).min(100.0);
    let stakeholders = (decision.stakeholders.len() as f64 * 15.0).min(100.0);

    let score = recency_score(decision.timestamp, now) * 0.3
        + impact * 0.25
        + stakeholders * 0.25
        + status.implementation_score() * 0.20;
    round2(score.min(100.0))
}

/// Group decisions by normalized topic; in multi-member groups each member
/// links the others and the most recent decision represents the group (ties
/// fall back to ranking order).
fn consolidate(decisions: Vec<DecisionReference>) -> Vec<DecisionReference> {
    let mut groups: Vec<(String, Vec<DecisionReference>)> = Vec::new();
    for decision in decisions {
        let key = normalize_text(&decision.topic);
        match groups.iter_mut().find(|(k, _)| *k == key) {
            Some((_, members)) => members.push(decision),
            None => groups.push((key, vec![decision])),
        }
    }

    let mut result = Vec::with_capacity(groups.len());
    for (_, mut members) in groups {
        if members.len() > 1 {
            let ids: Vec<String> = members.iter().map(|d| d.decision_id.clone()).collect();
            for member in &mut members {
                member.related_decisions = ids
                    .iter()
                    .filter(|id| **id != member.decision_id)
                    .cloned()
                    .collect();
            }
        }
        let representative = members
            .into_iter()
            .reduce(|best, candidate| {
                if candidate.timestamp > best.timestamp {
                    candidate
                } else {
                    best
                }
            })
            .expect("group is non-empty");
        result.push(representative);
    }

    result.sort_by(|a, b| b.relevance_score.total_cmp(&a.relevance_score));
    result
}

fn within_minutes(a: NaiveDateTime, b: NaiveDateTime, window: i64) -> bool {
    (a - b).num_minutes().abs() <= window
}

/// Ratio of shared tokens to the smaller token set; 0 when either side is
/// empty.
pub fn token_overlap(a: &str, b: &str) -> f64 {
    let set_a: HashSet<String> = normalize_text(a).split_whitespace().map(str::to_string).collect();
    let set_b: HashSet<String> = normalize_text(b).split_whitespace().map(str::to_string).collect();

    let min_len = set_a.len().min(set_b.len());
    if min_len == 0 {
        return 0.0;
    }

    let shared = set_a.intersection(&set_b).count();
    shared as f64 / min_len as f64
}

/// Lowercase, strip punctuation, collapse whitespace.
pub fn normalize_text(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
