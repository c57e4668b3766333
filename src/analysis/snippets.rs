use chrono::NaiveDateTime;
use serde::Serialize;

use crate::model::{DialogueEntry, DialogueType, Transcript};

use super::scoring::ScoringTables;

/// A dialogue entry selected as representative evidence for a transcript.
#[derive(Debug, Clone, Serialize)]
pub struct DialogueSnippet {
    pub speaker_name: String,
    pub text: String,
    pub timestamp: NaiveDateTime,
    pub relevance_score: f64,
}

const SNIPPET_LIMIT: usize = 5;

/// An entry is significant if it carries a decision or action item, mentions
/// someone, or contains a key phrase.
pub fn is_significant(tables: &ScoringTables, entry: &DialogueEntry) -> bool {
    entry.kind == DialogueType::Decision
        || entry.kind == DialogueType::ActionItem
        || !entry.mentions.is_empty()
        || tables.contains_key_phrase(&entry.text)
}

/// Type weight plus mention and key-phrase bonuses, capped at 100.
pub fn snippet_score(tables: &ScoringTables, entry: &DialogueEntry) -> f64 {
    let type_weight = match entry.kind {
        DialogueType::Decision => 30.0,
        DialogueType::ActionItem => 25.0,
        DialogueType::Question => 15.0,
        _ => 10.0,
    };

    let score = type_weight
        + entry.mentions.len() as f64 * 5.0
        + tables.key_phrase_count(&entry.text) as f64 * 5.0;
    score.min(100.0)
}

/// The top significant entries by score, ties kept in dialogue order.
pub fn significant_snippets(tables: &ScoringTables, transcript: &Transcript) -> Vec<DialogueSnippet> {
    let mut scored: Vec<DialogueSnippet> = transcript
        .dialogue
        .iter()
        .filter(|e| is_significant(tables, e))
        .map(|e| DialogueSnippet {
            speaker_name: transcript.speaker_name(e).to_string(),
            text: e.text.clone(),
            timestamp: e.timestamp,
            relevance_score: snippet_score(tables, e),
        })
        .collect();

    scored.sort_by(|a, b| b.relevance_score.total_cmp(&a.relevance_score));
    scored.truncate(SNIPPET_LIMIT);
    scored
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Participant;
    use chrono::NaiveDate;

    fn entry(text: &str, kind: DialogueType, mentions: &[&str]) -> DialogueEntry {
        DialogueEntry {
            participant_id: Some("P1".into()),
            text: text.to_string(),
            timestamp: NaiveDate::from_ymd_opt(2024, 4, 1)
                .unwrap()
                .and_hms_opt(10, 0, 0)
                .unwrap(),
            kind,
            mentions: mentions.iter().map(|m| m.to_string()).collect(),
        }
    }

    fn transcript(dialogue: Vec<DialogueEntry>) -> Transcript {
        Transcript {
            id: "T".into(),
            title: "Test".into(),
            date: NaiveDate::from_ymd_opt(2024, 4, 1)
                .unwrap()
                .and_hms_opt(10, 0, 0)
                .unwrap(),
            department: "General".into(),
            participants: vec![Participant {
                id: "P1".into(),
                name: "Ana Pop".into(),
                role: "Organizer".into(),
                department: "General".into(),
            }],
            dialogue,
            decisions: vec![],
            action_items: vec![],
            tags: vec![],
            metadata: Default::default(),
        }
    }

    #[test]
    fn plain_statements_are_not_significant() {
        let tables = ScoringTables::default();
        assert!(!is_significant(
            &tables,
            &entry("The weather held up", DialogueType::Statement, &[])
        ));
        assert!(is_significant(
            &tables,
            &entry("This is critical", DialogueType::Statement, &[])
        ));
        assert!(is_significant(
            &tables,
            &entry("ping", DialogueType::Statement, &["ops"])
        ));
    }

    #[test]
    fn scores_weight_type_mentions_and_phrases() {
        let tables = ScoringTables::default();
        // DECISION 30 + one mention 5 + "decision" key phrase 5 = 40.
        let e = entry("Final decision made", DialogueType::Decision, &["lead"]);
        assert_eq!(snippet_score(&tables, &e), 40.0);
        // QUESTION 15, no bonuses.
        let q = entry("Why though?", DialogueType::Question, &[]);
        assert_eq!(snippet_score(&tables, &q), 15.0);
    }

    #[test]
    fn top_five_retained_in_score_then_dialogue_order() {
        let tables = ScoringTables::default();
        let mut dialogue = vec![entry("Big decision here", DialogueType::Decision, &[])];
        for i in 0..6 {
            dialogue.push(entry(
                &format!("priority item {i}"),
                DialogueType::Statement,
                &[],
            ));
        }
        let snippets = significant_snippets(&tables, &transcript(dialogue));
        assert_eq!(snippets.len(), 5);
        // Highest score first, then equal-score statements in dialogue order.
        assert_eq!(snippets[0].text, "Big decision here");
        assert_eq!(snippets[1].text, "priority item 0");
        assert_eq!(snippets[4].text, "priority item 3");
    }
}
