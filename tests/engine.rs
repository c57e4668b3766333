//! End-to-end flow: ingest a custom payload, persist it, retrieve it with
//! filters, render context, and score it.

use chrono::{Duration, NaiveDate, NaiveDateTime};

use tqa::analysis::{Analyzer, DecisionStatus, ScoringTables};
use tqa::context;
use tqa::db::{Database, TranscriptStore};
use tqa::ingest::Ingestor;
use tqa::model::{ActionItem, DecisionPoint, DialogueType, Transcript};
use tqa::search::{self, DateRange, Query};
use tqa::Error;

fn dt(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, mo, d)
        .unwrap()
        .and_hms_opt(h, mi, 0)
        .unwrap()
}

const PAYLOAD: &str = r#"[
  {
    "title": "Patient Monitoring System Implementation Planning",
    "date": "2024-03-26T10:00:00",
    "duration": "60m",
    "source": "upload",
    "organizers": ["Dr. Sarah Chen"],
    "participants": ["Dr. Sarah Chen", "Mike Rodriguez", "Lisa Park", "James Wilson"],
    "content": "Agenda attached below.\nUser: Dr. Sarah Chen: What is the current status of vendor evaluation?\nUser: Mike Rodriguez: Yes, we narrowed it down to two vendors after the pilot.\nUser: Lisa Park: Decision: we will proceed with the MedTech platform for all wards.\nUser: James Wilson: I will prepare the integration plan by Friday.\nUser: Mike Rodriguez: Because of the network upgrade, deployment can start next month."
  },
  {
    "title": "Market Entry Strategy Session",
    "date": "2024-03-20T14:00:00",
    "duration": "45m",
    "source": "upload",
    "organizers": ["Maria Ionescu"],
    "participants": ["Maria Ionescu", "Dan Baciu"],
    "content": "User: Maria Ionescu: Should we prioritize the regional segment?\nUser: Dan Baciu: I suggest we start with two cities only."
  }
]"#;

fn ingest_payload(db: &Database) -> Vec<String> {
    let ingestor = Ingestor::at("oradea", dt(2024, 3, 26, 10, 0));
    let transcripts = ingestor.convert_batch(PAYLOAD).unwrap();
    transcripts
        .iter()
        .map(|t| db.save(t).unwrap())
        .collect()
}

#[test]
fn ingest_then_retrieve_by_department() {
    let db = Database::open_in_memory().unwrap();
    ingest_payload(&db);

    let query = Query {
        department: Some("market research".into()),
        ..Default::default()
    };
    let hits = search::resolve(&db, &query).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].title, "Market Entry Strategy Session");
    // Title rules put the planning meeting in General.
    let query = Query {
        department: Some("General".into()),
        ..Default::default()
    };
    assert_eq!(search::resolve(&db, &query).unwrap().len(), 1);
}

#[test]
fn ingest_then_retrieve_by_tag_and_range() {
    let db = Database::open_in_memory().unwrap();
    ingest_payload(&db);

    // Locality tag is stamped on everything.
    let query = Query {
        tags: Some(vec!["ORADEA".into()]),
        ..Default::default()
    };
    assert_eq!(search::resolve(&db, &query).unwrap().len(), 2);

    let query = Query {
        date_range: Some(DateRange {
            start: dt(2024, 3, 25, 0, 0),
            end: dt(2024, 3, 27, 0, 0),
        }),
        ..Default::default()
    };
    let hits = search::resolve(&db, &query).unwrap();
    assert_eq!(hits.len(), 1);
    assert!(hits[0].title.starts_with("Patient Monitoring"));
}

#[test]
fn meeting_id_fast_path_and_miss() {
    let db = Database::open_in_memory().unwrap();
    let ids = ingest_payload(&db);

    let query = Query {
        meeting_id: Some(ids[0].clone()),
        department: Some("does-not-matter".into()),
        ..Default::default()
    };
    let hits = search::resolve(&db, &query).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, ids[0]);

    let query = Query {
        meeting_id: Some("MT-missing".into()),
        ..Default::default()
    };
    assert!(matches!(
        search::resolve(&db, &query),
        Err(Error::NotFound(_))
    ));
}

#[test]
fn classification_survives_the_store() {
    let db = Database::open_in_memory().unwrap();
    let ids = ingest_payload(&db);

    let t = db.find_by_id(&ids[0]).unwrap().unwrap();
    let kinds: Vec<DialogueType> = t.dialogue.iter().map(|e| e.kind).collect();
    assert_eq!(
        kinds,
        vec![
            DialogueType::Question,
            DialogueType::Response,
            DialogueType::Decision,
            DialogueType::ActionItem,
            DialogueType::Response,
        ]
    );
    // Speaker turns start on line 1, so the offsets are 1..=5 minutes.
    assert_eq!(t.dialogue[0].timestamp, dt(2024, 3, 26, 10, 1));
    assert_eq!(t.dialogue[4].timestamp, dt(2024, 3, 26, 10, 5));
}

#[test]
fn context_renders_retrieved_meetings() {
    let db = Database::open_in_memory().unwrap();
    ingest_payload(&db);

    let query = Query {
        tags: Some(vec!["oradea".into()]),
        ..Default::default()
    };
    let hits = search::resolve(&db, &query).unwrap();
    let rendered = context::render(&hits);

    assert!(rendered.contains("Meeting: Patient Monitoring System Implementation Planning"));
    assert!(rendered.contains("Meeting: Market Entry Strategy Session"));
    assert!(rendered.contains("- Dr. Sarah Chen (Organizer)"));
    assert!(rendered.contains("Dr. Sarah Chen: What is the current status"));
    assert!(rendered.contains("\n---\n"));
}

#[test]
fn analysis_ranks_ingested_meetings() {
    let db = Database::open_in_memory().unwrap();
    ingest_payload(&db);

    let query = Query {
        tags: Some(vec!["oradea".into()]),
        ..Default::default()
    };
    let hits = search::resolve(&db, &query).unwrap();

    let analyzer = Analyzer::at(ScoringTables::default(), dt(2024, 3, 27, 10, 0));
    let refs = analyzer.meeting_references(&hits).unwrap();

    assert_eq!(refs.len(), 2);
    // The planning meeting is newer and carries a decision and an action
    // item, so it outranks the strategy session.
    assert!(refs[0].title.starts_with("Patient Monitoring"));
    assert!(refs[0].relevance_score > refs[1].relevance_score);
    // Scores are rounded to two decimals.
    for r in &refs {
        assert_eq!(r.relevance_score, (r.relevance_score * 100.0).round() / 100.0);
    }
    // Every roster member appears, speakers first.
    assert_eq!(refs[0].participants.len(), 4);
    assert!(refs[0].participants[0].contribution_count >= refs[0].participants[3].contribution_count);
    assert!(refs[0].snippets.len() <= 5);
    assert!(!refs[0].snippets.is_empty());
}

#[test]
fn decision_extraction_consolidates_and_links() {
    let base = dt(2024, 3, 26, 10, 0);
    let older = Transcript {
        id: "MT-1".into(),
        title: "Vendor Selection".into(),
        date: base - Duration::days(7),
        department: "IT".into(),
        participants: vec![],
        dialogue: vec![],
        decisions: vec![DecisionPoint {
            topic: "Monitoring Platform".into(),
            decision: "Evaluate MedTech and one alternative vendor".into(),
            stakeholders: vec!["Mike Rodriguez".into()],
            timestamp: base - Duration::days(7),
        }],
        action_items: vec![],
        tags: vec![],
        metadata: Default::default(),
    };
    let newer = Transcript {
        id: "MT-2".into(),
        title: "Final Vendor Call".into(),
        date: base,
        department: "IT".into(),
        participants: vec![],
        dialogue: vec![],
        decisions: vec![DecisionPoint {
            topic: "monitoring platform".into(),
            decision: "Proceed with the MedTech vendor platform rollout".into(),
            stakeholders: vec!["Mike Rodriguez".into(), "Lisa Park".into()],
            timestamp: base,
        }],
        action_items: vec![ActionItem {
            description: "Draft MedTech vendor rollout schedule".into(),
            assignee: "Lisa Park".into(),
            due_date: base + Duration::minutes(10),
            status: "IN_PROGRESS".into(),
        }],
        tags: vec![],
        metadata: Default::default(),
    };

    let analyzer = Analyzer::at(ScoringTables::default(), base + Duration::days(1));
    let refs = analyzer.decision_references(&[older, newer]);

    // Same normalized topic: one consolidated entry, most recent wins.
    assert_eq!(refs.len(), 1);
    let r = &refs[0];
    assert_eq!(r.meeting_id, "MT-2");
    assert_eq!(r.decision_id, "MT-2-D0");
    assert_eq!(r.status, DecisionStatus::InProgress);
    assert_eq!(r.related_action_items.len(), 1);
    assert!(r.related_decisions.contains(&"MT-1-D0".to_string()));
    assert!(r.impacted_areas.contains(&"IT".to_string()));
    assert!(r.relevance_score > 0.0);
    assert_eq!(r.relevance_score, (r.relevance_score * 100.0).round() / 100.0);
}

#[test]
fn empty_query_matches_nothing() {
    let db = Database::open_in_memory().unwrap();
    ingest_payload(&db);
    let hits = search::resolve(&db, &Query::default()).unwrap();
    assert!(hits.is_empty());
}
