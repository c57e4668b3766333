use std::sync::OnceLock;

use regex::Regex;

use crate::model::DialogueType;

/// One cascade step: predicate over normalized text, type on match.
type Rule = (fn(&str) -> bool, DialogueType);

/// Base cascade, applied in order; first match wins.
const BASE_CASCADE: &[Rule] = &[
    (is_action_item, DialogueType::ActionItem),
    (is_decision, DialogueType::Decision),
    (is_question, DialogueType::Question),
    (is_response, DialogueType::Response),
];

/// Extra steps the detailed cascade checks after RESPONSE.
const DETAILED_TAIL: &[Rule] = &[
    (is_clarification, DialogueType::Clarification),
    (is_suggestion, DialogueType::Suggestion),
    (is_concern, DialogueType::Concern),
];

/// Classify one utterance. Deterministic and total: case-insensitive,
/// never fails, empty or unmatched input falls through to STATEMENT.
pub fn classify(text: &str) -> DialogueType {
    let normalized = normalize(text);
    run_cascade(&normalized, BASE_CASCADE).unwrap_or(DialogueType::Statement)
}

/// Classify with the extended cascade, which additionally distinguishes
/// CLARIFICATION, SUGGESTION and CONCERN before defaulting to STATEMENT.
pub fn classify_detailed(text: &str) -> DialogueType {
    let normalized = normalize(text);
    run_cascade(&normalized, BASE_CASCADE)
        .or_else(|| run_cascade(&normalized, DETAILED_TAIL))
        .unwrap_or(DialogueType::Statement)
}

fn normalize(text: &str) -> String {
    text.to_lowercase().trim().to_string()
}

fn run_cascade(normalized: &str, rules: &[Rule]) -> Option<DialogueType> {
    rules
        .iter()
        .find(|(test, _)| test(normalized))
        .map(|(_, kind)| *kind)
}

const ACTION_ITEM_PHRASES: &[&str] = &[
    "action item:",
    "todo:",
    "task:",
    "needs to be done",
    "must complete",
    "will handle",
    "should implement",
    "assign",
    "let's create",
    "we need to",
    "please ensure",
    "make sure to",
    "required action",
    "follow up on",
    "take care of",
    "responsible for",
    "deadline",
    "by next",
    "by tomorrow",
    "by monday",
    "will be responsible",
];

const DECISION_PHRASES: &[&str] = &[
    "decision:",
    "decided:",
    "agreed:",
    "approved:",
    "consensus:",
    "we have decided",
    "we agree",
    "let's proceed with",
    "we will go with",
    "final decision",
    "moving forward with",
    "it's decided",
    "we've chosen",
    "the team has selected",
    "we're going to",
    "we have selected",
    "will implement",
    "approved approach",
];

const QUESTION_LEADS: &[&str] = &[
    "what",
    "when",
    "where",
    "who",
    "why",
    "how",
    "could you",
    "can we",
    "should we",
    "shall we",
    "do you think",
    "are we",
    "will this",
    "anyone know",
];

const RESPONSE_LEADS: &[&str] = &[
    "yes",
    "no",
    "agree",
    "disagree",
    "correct",
    "incorrect",
    "that's right",
    "that's wrong",
    "exactly",
    "definitely",
    "absolutely",
    "makes sense",
    "i think so",
    "not really",
    "good point",
];

const EXPLANATION_PHRASES: &[&str] = &[
    "because",
    "the reason is",
    "this is due to",
    "that's because",
    "let me explain",
    "to answer your question",
];

const CLARIFICATION_PHRASES: &[&str] = &[
    "to clarify",
    "let me explain",
    "in other words",
    "to be clear",
    "meaning",
    "specifically",
    "for example",
];

const SUGGESTION_PHRASES: &[&str] = &[
    "maybe we could",
    "how about",
    "we might",
    "suggest",
    "consider",
    "what if",
    "could we",
    "one option",
];

const CONCERN_PHRASES: &[&str] = &[
    "worried about",
    "concern",
    "risk",
    "issue",
    "problem",
    "challenge",
    "careful",
    "warning",
];

// Compile-once deadline patterns: weekday/ordinal/relative "by ..." forms,
// "due ..." forms, a literal deadline marker, and numeric date tokens.
fn deadline_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            r"by \w+day",
            r"by \d{1,2}(st|nd|rd|th)",
            r"by (tomorrow|next week|month end)",
            r"due (on|by|before|until)",
            r"deadline[: ]",
            r"\d{1,2}/\d{1,2}(/\d{2,4})?",
            r"\d{1,2}[-.]\d{1,2}([-.]\d{2,4})?",
        ]
        .iter()
        .map(|p| Regex::new(p).unwrap())
        .collect()
    })
}

fn is_action_item(text: &str) -> bool {
    contains_any(text, ACTION_ITEM_PHRASES)
        || deadline_patterns().iter().any(|re| re.is_match(text))
}

fn is_decision(text: &str) -> bool {
    contains_any(text, DECISION_PHRASES)
}

fn is_question(text: &str) -> bool {
    text.contains('?') || starts_with_any(text, QUESTION_LEADS)
}

fn is_response(text: &str) -> bool {
    starts_with_any(text, RESPONSE_LEADS) || contains_any(text, EXPLANATION_PHRASES)
}

fn is_clarification(text: &str) -> bool {
    contains_any(text, CLARIFICATION_PHRASES)
}

fn is_suggestion(text: &str) -> bool {
    contains_any(text, SUGGESTION_PHRASES)
}

fn is_concern(text: &str) -> bool {
    contains_any(text, CONCERN_PHRASES)
}

fn contains_any(text: &str, phrases: &[&str]) -> bool {
    phrases.iter().any(|p| text.contains(p))
}

/// Prefix match tolerating leading whitespace and light punctuation,
/// e.g. "...so, what do we do" still leads with "what".
fn starts_with_any(text: &str, leads: &[&str]) -> bool {
    let stripped =
        text.trim_start_matches(|c: char| c.is_whitespace() || matches!(c, ',' | '.' | ';' | ':'));
    leads.iter().any(|lead| stripped.starts_with(lead))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn question_mark_always_wins_over_leads() {
        assert_eq!(classify("Is this ready?"), DialogueType::Question);
        // No WH lead, but "?" alone is enough.
        assert_eq!(classify("Ready?"), DialogueType::Question);
    }

    #[test]
    fn action_item_beats_question_mark() {
        // Cascade order is fixed: ACTION_ITEM is checked before QUESTION.
        assert_eq!(
            classify("Can you follow up on the vendor quote?"),
            DialogueType::ActionItem
        );
    }

    #[test]
    fn deadline_marker_beats_decision_phrase() {
        assert_eq!(
            classify("Final decision pending, deadline: Friday"),
            DialogueType::ActionItem
        );
    }

    #[test]
    fn decision_phrases() {
        assert_eq!(
            classify("We have decided to extend the contract"),
            DialogueType::Decision
        );
        assert_eq!(
            classify("Moving forward with option B"),
            DialogueType::Decision
        );
    }

    #[test]
    fn question_leads_tolerate_leading_punctuation() {
        assert_eq!(classify("...what about the budget"), DialogueType::Question);
        assert_eq!(classify(", how does this scale"), DialogueType::Question);
    }

    #[test]
    fn response_by_lead_and_by_connective() {
        assert_eq!(classify("Yes, that works for me"), DialogueType::Response);
        assert_eq!(
            classify("We slipped because the vendor was late"),
            DialogueType::Response
        );
    }

    #[test]
    fn classification_is_case_insensitive() {
        assert_eq!(classify("TODO: update the runbook"), DialogueType::ActionItem);
        assert_eq!(classify("WE AGREE on the rollout"), DialogueType::Decision);
    }

    #[test]
    fn deadline_date_tokens() {
        assert_eq!(classify("target is 12/5/24"), DialogueType::ActionItem);
        assert_eq!(classify("shipping on 3-14-2026"), DialogueType::ActionItem);
        assert_eq!(classify("due before the review"), DialogueType::ActionItem);
        assert_eq!(classify("get it done by Friday"), DialogueType::ActionItem);
        assert_eq!(classify("ready by 1st"), DialogueType::ActionItem);
    }

    #[test]
    fn empty_and_unmatched_default_to_statement() {
        assert_eq!(classify(""), DialogueType::Statement);
        assert_eq!(classify("   "), DialogueType::Statement);
        assert_eq!(
            classify("The report covers last quarter"),
            DialogueType::Statement
        );
    }

    #[test]
    fn detailed_cascade_extends_base() {
        assert_eq!(
            classify_detailed("To be clear, the rollout starts in staging"),
            DialogueType::Clarification
        );
        assert_eq!(
            classify_detailed("Maybe we could stage it region by region"),
            DialogueType::Suggestion
        );
        assert_eq!(
            classify_detailed("I'm worried about the migration window"),
            DialogueType::Concern
        );
        // Base types still win before the tail runs.
        assert_eq!(
            classify_detailed("What if we delay a week"),
            DialogueType::Question
        );
    }

    #[test]
    fn detailed_tail_not_applied_by_base_classify() {
        assert_eq!(
            classify("To be clear, the rollout starts in staging"),
            DialogueType::Statement
        );
    }

    #[test]
    fn response_connective_beats_clarification_phrase() {
        // "let me explain" sits in both tables; RESPONSE is earlier.
        assert_eq!(
            classify_detailed("Let me explain the constraint"),
            DialogueType::Response
        );
    }
}
