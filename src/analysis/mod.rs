pub mod decisions;
pub mod scoring;
pub mod snippets;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::error::Result;
use crate::model::Transcript;

pub use decisions::{DecisionReference, DecisionStatus, DialogueContext};
pub use scoring::ScoringTables;
pub use snippets::DialogueSnippet;

const TOPIC_LIMIT: usize = 5;

/// A retrieved meeting with its relevance score and supporting evidence.
#[derive(Debug, Clone, Serialize)]
pub struct MeetingReference {
    pub meeting_id: String,
    pub title: String,
    pub date: NaiveDateTime,
    pub relevance_score: f64,
    pub key_topics: Vec<String>,
    pub participants: Vec<ParticipantSummary>,
    pub snippets: Vec<DialogueSnippet>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ParticipantSummary {
    pub name: String,
    pub role: String,
    pub contribution_count: usize,
}

/// Relevance scorer over already-retrieved transcripts. Stateless apart
/// from the constant tables and the pinned clock, so it can run per query
/// on any worker.
pub struct Analyzer {
    tables: ScoringTables,
    now: NaiveDateTime,
}

impl Analyzer {
    pub fn new(tables: ScoringTables) -> Self {
        Self::at(tables, chrono::Local::now().naive_local())
    }

    /// Pin "now" for recency scoring; tests use this for fixed expectations.
    pub fn at(tables: ScoringTables, now: NaiveDateTime) -> Self {
        Self { tables, now }
    }

    pub fn tables(&self) -> &ScoringTables {
        &self.tables
    }

    /// Score and rank meetings, highest relevance first; equal scores keep
    /// input order.
    pub fn meeting_references(&self, transcripts: &[Transcript]) -> Result<Vec<MeetingReference>> {
        let mut refs = transcripts
            .iter()
            .map(|t| self.meeting_reference(t))
            .collect::<Result<Vec<_>>>()?;

        refs.sort_by(|a, b| b.relevance_score.total_cmp(&a.relevance_score));
        Ok(refs)
    }

    pub fn meeting_reference(&self, transcript: &Transcript) -> Result<MeetingReference> {
        Ok(MeetingReference {
            meeting_id: transcript.id.clone(),
            title: transcript.title.clone(),
            date: transcript.date,
            relevance_score: scoring::meeting_relevance(&self.tables, transcript, self.now)?,
            key_topics: scoring::key_topics(&self.tables, transcript, TOPIC_LIMIT),
            participants: participant_summaries(transcript),
            snippets: snippets::significant_snippets(&self.tables, transcript),
        })
    }

    /// Score, cross-reference, and consolidate decisions across meetings.
    pub fn decision_references(&self, transcripts: &[Transcript]) -> Vec<DecisionReference> {
        decisions::extract_relevant_decisions(&self.tables, transcripts, self.now)
    }
}

/// Per-participant contribution counts, most active first; roster order
/// breaks ties.
fn participant_summaries(transcript: &Transcript) -> Vec<ParticipantSummary> {
    let mut summaries: Vec<ParticipantSummary> = transcript
        .participants
        .iter()
        .map(|p| ParticipantSummary {
            name: p.name.clone(),
            role: p.role.clone(),
            contribution_count: transcript
                .dialogue
                .iter()
                .filter(|e| e.participant_id.as_deref() == Some(p.id.as_str()))
                .count(),
        })
        .collect();

    summaries.sort_by(|a, b| b.contribution_count.cmp(&a.contribution_count));
    summaries
}
