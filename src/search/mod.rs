use std::collections::HashSet;

use chrono::NaiveDateTime;
use serde::Deserialize;

use crate::db::TranscriptStore;
use crate::error::{Error, Result};
use crate::model::Transcript;

/// Multi-criteria retrieval query. Every field is optional; absent fields
/// contribute nothing to the result.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Query {
    pub meeting_id: Option<String>,
    pub department: Option<String>,
    pub date_range: Option<DateRange>,
    pub tags: Option<Vec<String>>,
}

/// Inclusive on both ends.
#[derive(Debug, Clone, Deserialize)]
pub struct DateRange {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl Query {
    pub fn is_empty(&self) -> bool {
        self.meeting_id.is_none()
            && self.department.is_none()
            && self.date_range.is_none()
            && self.tags.as_ref().map_or(true, |t| t.is_empty())
    }
}

/// Resolve a query against the store.
///
/// An explicit meeting id short-circuits everything else; a miss there is
/// `Error::NotFound`, never a fallback search. Otherwise each present field
/// is evaluated independently and the union taken, deduplicated by
/// transcript id in first-seen order (department, date range, then tags).
/// A query with no criteria resolves to the empty set, not to the whole
/// store.
pub fn resolve(store: &dyn TranscriptStore, query: &Query) -> Result<Vec<Transcript>> {
    if let Some(id) = &query.meeting_id {
        return match store.find_by_id(id)? {
            Some(t) => Ok(vec![t]),
            None => Err(Error::NotFound(id.clone())),
        };
    }

    let mut seen: HashSet<String> = HashSet::new();
    let mut results: Vec<Transcript> = Vec::new();
    let mut add_all = |found: Vec<Transcript>| {
        for t in found {
            if seen.insert(t.id.clone()) {
                results.push(t);
            }
        }
    };

    if let Some(department) = &query.department {
        add_all(store.find_by_department(department)?);
    }

    if let Some(range) = &query.date_range {
        add_all(store.find_by_date_range(range.start, range.end)?);
    }

    if let Some(tags) = &query.tags {
        // OR-combined: one matching tag is enough.
        for tag in tags {
            add_all(store.find_by_tag(tag)?);
        }
    }

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::model::Transcript;
    use chrono::NaiveDate;

    fn transcript(id: &str, department: &str, day: u32, tags: &[&str]) -> Transcript {
        Transcript {
            id: id.to_string(),
            title: format!("Meeting {id}"),
            date: NaiveDate::from_ymd_opt(2024, 4, day)
                .unwrap()
                .and_hms_opt(10, 0, 0)
                .unwrap(),
            department: department.to_string(),
            participants: vec![],
            dialogue: vec![],
            decisions: vec![],
            action_items: vec![],
            tags: tags.iter().map(|t| t.to_string()).collect(),
            metadata: Default::default(),
        }
    }

    fn seeded() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.save(&transcript("A", "IT", 1, &["rollout"])).unwrap();
        db.save(&transcript("B", "Finance", 10, &["budget"])).unwrap();
        db.save(&transcript("C", "IT", 20, &["budget", "rollout"]))
            .unwrap();
        db
    }

    fn ids(transcripts: &[Transcript]) -> Vec<&str> {
        transcripts.iter().map(|t| t.id.as_str()).collect()
    }

    #[test]
    fn meeting_id_ignores_other_fields() {
        let db = seeded();
        let q = Query {
            meeting_id: Some("B".into()),
            department: Some("IT".into()),
            ..Default::default()
        };
        assert_eq!(ids(&resolve(&db, &q).unwrap()), ["B"]);
    }

    #[test]
    fn missing_meeting_id_is_not_found() {
        let db = seeded();
        let q = Query {
            meeting_id: Some("Z".into()),
            ..Default::default()
        };
        assert!(matches!(resolve(&db, &q), Err(Error::NotFound(_))));
    }

    #[test]
    fn department_is_case_insensitive() {
        let db = seeded();
        let lower = resolve(
            &db,
            &Query {
                department: Some("it".into()),
                ..Default::default()
            },
        )
        .unwrap();
        let upper = resolve(
            &db,
            &Query {
                department: Some("IT".into()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(ids(&lower), ids(&upper));
        assert_eq!(ids(&lower), ["A", "C"]);
    }

    #[test]
    fn tags_are_union_not_intersection() {
        let db = seeded();
        let q = Query {
            tags: Some(vec!["rollout".into(), "budget".into()]),
            ..Default::default()
        };
        // B matches only "budget" and is still included.
        let found = resolve(&db, &q).unwrap();
        assert_eq!(found.len(), 3);
    }

    #[test]
    fn fields_union_across_criteria_without_duplicates() {
        let db = seeded();
        let q = Query {
            department: Some("IT".into()),
            tags: Some(vec!["budget".into()]),
            ..Default::default()
        };
        // C matches both criteria but appears once, in department-first order.
        assert_eq!(ids(&resolve(&db, &q).unwrap()), ["A", "C", "B"]);
    }

    #[test]
    fn empty_query_resolves_to_empty_set() {
        let db = seeded();
        assert!(resolve(&db, &Query::default()).unwrap().is_empty());
    }

    #[test]
    fn date_range_inclusive_both_ends() {
        let db = seeded();
        let q = Query {
            date_range: Some(DateRange {
                start: NaiveDate::from_ymd_opt(2024, 4, 1)
                    .unwrap()
                    .and_hms_opt(10, 0, 0)
                    .unwrap(),
                end: NaiveDate::from_ymd_opt(2024, 4, 10)
                    .unwrap()
                    .and_hms_opt(10, 0, 0)
                    .unwrap(),
            }),
            ..Default::default()
        };
        assert_eq!(ids(&resolve(&db, &q).unwrap()), ["A", "B"]);
    }
}
