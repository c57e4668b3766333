use std::collections::HashSet;

use chrono::NaiveDateTime;

use crate::error::{Error, Result};
use crate::model::{DialogueType, Transcript};

/// Immutable constant tables the scorer reads. Passed in rather than global
/// so alternate vocabularies can be tested; `Default` is the production set.
#[derive(Debug, Clone)]
pub struct ScoringTables {
    pub stop_words: Vec<String>,
    pub key_phrases: Vec<String>,
    /// (department, trigger keywords) pairs, checked against decision text.
    pub department_keywords: Vec<(String, Vec<String>)>,
}

impl Default for ScoringTables {
    fn default() -> Self {
        let owned = |words: &[&str]| words.iter().map(|w| w.to_string()).collect::<Vec<_>>();
        ScoringTables {
            stop_words: owned(&[
                "the", "is", "at", "which", "on", "a", "an", "and", "or", "but",
            ]),
            key_phrases: owned(&[
                "we need to",
                "important",
                "critical",
                "decision",
                "agree",
                "disagree",
                "propose",
                "implement",
                "deadline",
                "priority",
            ]),
            department_keywords: vec![
                ("IT".into(), owned(&["system", "software", "technology", "infrastructure"])),
                ("Finance".into(), owned(&["budget", "cost", "funding", "expense"])),
                ("Healthcare".into(), owned(&["patient", "clinical", "medical", "treatment"])),
                ("Operations".into(), owned(&["process", "workflow", "operation", "logistics"])),
            ],
        }
    }
}

impl ScoringTables {
    pub fn is_stop_word(&self, term: &str) -> bool {
        self.stop_words.iter().any(|w| w == term)
    }

    pub fn key_phrase_count(&self, text: &str) -> usize {
        let lower = text.to_lowercase();
        self.key_phrases.iter().filter(|p| lower.contains(p.as_str())).count()
    }

    pub fn contains_key_phrase(&self, text: &str) -> bool {
        self.key_phrase_count(text) > 0
    }

    /// Departments whose trigger keywords appear in the text, in table order.
    pub fn departments_for(&self, text: &str) -> Vec<&str> {
        let lower = text.to_lowercase();
        self.department_keywords
            .iter()
            .filter(|(_, keywords)| keywords.iter().any(|k| lower.contains(k.as_str())))
            .map(|(dept, _)| dept.as_str())
            .collect()
    }
}

/// Recency sub-score: 100 for today or the future, decaying
/// logarithmically with age.
pub fn recency_score(date: NaiveDateTime, now: NaiveDateTime) -> f64 {
    let days = (now - date).num_days();
    if days <= 0 {
        return 100.0;
    }
    (100.0 - ((days as f64 + 1.0).ln() * 20.0)).max(0.0)
}

/// Content sub-score: entry-type and mention markers plus distinct key
/// terms, capped at 100.
pub fn content_score(tables: &ScoringTables, transcript: &Transcript) -> f64 {
    let mut key_terms: HashSet<String> = HashSet::new();
    let mut total = 0.0;

    for entry in &transcript.dialogue {
        key_terms.extend(extract_key_terms(tables, &entry.text));

        match entry.kind {
            DialogueType::Decision => total += 10.0,
            DialogueType::ActionItem => total += 8.0,
            _ => {}
        }
        if !entry.mentions.is_empty() {
            total += 5.0;
        }
    }

    total += key_terms.len() as f64 * 2.0;
    total.min(100.0)
}

/// Engagement sub-score: average contributions per contributor plus the
/// share of the roster that spoke at all.
pub fn engagement_score(transcript: &Transcript) -> Result<f64> {
    if transcript.participants.is_empty() {
        return Err(Error::Analysis(format!(
            "transcript {} has no participants",
            transcript.id
        )));
    }

    // Unresolved speakers pool into one contributor bucket.
    let mut contributions: Vec<(Option<&str>, usize)> = Vec::new();
    for entry in &transcript.dialogue {
        let key = entry.participant_id.as_deref();
        match contributions.iter_mut().find(|(k, _)| *k == key) {
            Some((_, n)) => *n += 1,
            None => contributions.push((key, 1)),
        }
    }

    let avg_contributions = if contributions.is_empty() {
        0.0
    } else {
        contributions.iter().map(|(_, n)| n).sum::<usize>() as f64 / contributions.len() as f64
    };

    let participation_rate = contributions.len() as f64 / transcript.participants.len() as f64;

    Ok(avg_contributions * 0.5 + participation_rate * 50.0)
}

/// Decision/action-item weight, capped at 100.
pub fn decision_weight(transcript: &Transcript) -> f64 {
    let score =
        transcript.decisions.len() as f64 * 15.0 + transcript.action_items.len() as f64 * 10.0;
    score.min(100.0)
}

/// Weighted meeting relevance, as a 0-100 percentage with two decimals.
pub fn meeting_relevance(
    tables: &ScoringTables,
    transcript: &Transcript,
    now: NaiveDateTime,
) -> Result<f64> {
    let score = recency_score(transcript.date, now) * 0.3
        + content_score(tables, transcript) * 0.4
        + engagement_score(transcript)? * 0.15
        + decision_weight(transcript) * 0.15;
    Ok(round2(score))
}

pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Lowercased alphanumeric tokens longer than 3 chars, stop words removed.
pub fn extract_key_terms(tables: &ScoringTables, text: &str) -> Vec<String> {
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
        .filter(|t| t.len() > 3 && !tables.is_stop_word(t))
        .map(str::to_string)
        .collect()
}

/// Top key terms across the whole dialogue, ranked by frequency descending
/// with first-appearance order breaking ties.
pub fn key_topics(tables: &ScoringTables, transcript: &Transcript, limit: usize) -> Vec<String> {
    let mut counts: Vec<(String, usize)> = Vec::new();
    for entry in &transcript.dialogue {
        for term in extract_key_terms(tables, &entry.text) {
            match counts.iter_mut().find(|(t, _)| *t == term) {
                Some((_, n)) => *n += 1,
                None => counts.push((term, 1)),
            }
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts.into_iter().take(limit).map(|(t, _)| t).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DialogueEntry, Participant};
    use chrono::NaiveDate;

    fn at(day: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 4, day)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn entry(pid: Option<&str>, text: &str, kind: DialogueType) -> DialogueEntry {
        DialogueEntry {
            participant_id: pid.map(str::to_string),
            text: text.to_string(),
            timestamp: at(1, 10, 0),
            kind,
            mentions: vec![],
        }
    }

    fn roster(n: usize) -> Vec<Participant> {
        (1..=n)
            .map(|i| Participant {
                id: format!("P{i}"),
                name: format!("Person {i}"),
                role: "Participant".into(),
                department: "General".into(),
            })
            .collect()
    }

    fn transcript(participants: usize, dialogue: Vec<DialogueEntry>) -> Transcript {
        Transcript {
            id: "T".into(),
            title: "Test".into(),
            date: at(1, 10, 0),
            department: "General".into(),
            participants: roster(participants),
            dialogue,
            decisions: vec![],
            action_items: vec![],
            tags: vec![],
            metadata: Default::default(),
        }
    }

    #[test]
    fn recency_is_100_for_today_and_future() {
        let now = at(10, 12, 0);
        assert_eq!(recency_score(now, now), 100.0);
        assert_eq!(recency_score(at(20, 12, 0), now), 100.0);
    }

    #[test]
    fn recency_decays_logarithmically() {
        let now = at(11, 10, 0);
        let ten_days_ago = at(1, 10, 0);
        let expected = 100.0 - 11.0_f64.ln() * 20.0;
        assert!((recency_score(ten_days_ago, now) - expected).abs() < 1e-9);
    }

    #[test]
    fn recency_floors_at_zero() {
        let now = NaiveDate::from_ymd_opt(2034, 4, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(recency_score(at(1, 0, 0), now), 0.0);
    }

    #[test]
    fn key_terms_drop_short_and_stop_words() {
        let tables = ScoringTables::default();
        let terms = extract_key_terms(&tables, "The budget is on track, and rising!");
        assert_eq!(terms, vec!["budget", "track", "rising"]);
    }

    #[test]
    fn content_score_counts_markers_and_terms() {
        let tables = ScoringTables::default();
        let mut t = transcript(
            1,
            vec![
                entry(Some("P1"), "Decision: approve vendor", DialogueType::Decision),
                entry(Some("P1"), "xx yy", DialogueType::Statement),
            ],
        );
        t.dialogue[1].mentions.push("ops".into());
        // 10 (decision) + 5 (mentions) + 2 per distinct key term
        // ("decision", "approve", "vendor") = 21.
        assert_eq!(content_score(&tables, &t), 21.0);
    }

    #[test]
    fn engagement_requires_a_roster() {
        let t = transcript(0, vec![]);
        assert!(matches!(engagement_score(&t), Err(Error::Analysis(_))));
    }

    #[test]
    fn engagement_combines_mean_and_rate() {
        let t = transcript(
            3,
            vec![
                entry(Some("P1"), "a", DialogueType::Statement),
                entry(Some("P1"), "b", DialogueType::Statement),
                entry(Some("P2"), "c", DialogueType::Statement),
            ],
        );
        // mean = 3/2 contributors = 1.5; rate = 2/3.
        let expected = 1.5 * 0.5 + (2.0 / 3.0) * 50.0;
        assert!((engagement_score(&t).unwrap() - expected).abs() < 1e-9);
    }

    #[test]
    fn decision_weight_caps_at_100() {
        let mut t = transcript(1, vec![]);
        for _ in 0..10 {
            t.decisions.push(crate::model::DecisionPoint {
                topic: "t".into(),
                decision: "d".into(),
                stakeholders: vec![],
                timestamp: at(1, 10, 0),
            });
        }
        assert_eq!(decision_weight(&t), 100.0);
    }

    #[test]
    fn key_topics_rank_by_frequency_then_first_seen() {
        let tables = ScoringTables::default();
        let t = transcript(
            1,
            vec![
                entry(Some("P1"), "vendor contract vendor", DialogueType::Statement),
                entry(Some("P1"), "contract budget vendor", DialogueType::Statement),
            ],
        );
        let topics = key_topics(&tables, &t, 5);
        assert_eq!(topics, vec!["vendor", "contract", "budget"]);
    }
}
