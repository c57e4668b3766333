pub mod migrations;
pub mod schema;

use chrono::NaiveDateTime;
use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::{Error, Result};
use crate::model::{ActionItem, DecisionPoint, DialogueEntry, DialogueType, Participant, Transcript};

/// Timestamp format used in every date column.
const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// The store collaborator: the five operations the retriever and ingestor
/// depend on. Department and tag matching are case-insensitive here, not in
/// the callers.
pub trait TranscriptStore {
    fn save(&self, transcript: &Transcript) -> Result<String>;
    fn find_by_id(&self, id: &str) -> Result<Option<Transcript>>;
    fn find_by_department(&self, department: &str) -> Result<Vec<Transcript>>;
    fn find_by_date_range(&self, start: NaiveDateTime, end: NaiveDateTime)
        -> Result<Vec<Transcript>>;
    fn find_by_tag(&self, tag: &str) -> Result<Vec<Transcript>>;
}

pub struct Database {
    pub conn: Connection,
    pub path: Option<PathBuf>,
}

impl Database {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // Performance pragmas
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys = ON;
             PRAGMA cache_size = -64000;",
        )?;

        schema::create_schema(&conn)?;
        migrations::run_migrations(&conn)?;

        info!("Opened database: {}", path.display());

        Ok(Database {
            conn,
            path: Some(path.to_path_buf()),
        })
    }

    /// In-memory database, used by tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        schema::create_schema(&conn)?;
        migrations::run_migrations(&conn)?;
        Ok(Database { conn, path: None })
    }

    /// Default database path: ~/.tqa/tqa.db
    pub fn default_db_path() -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or_else(|| {
            Error::Store(rusqlite::Error::InvalidPath(PathBuf::from(
                "could not determine home directory",
            )))
        })?;
        Ok(home.join(".tqa").join("tqa.db"))
    }

    /// Delete a transcript and all related data (cascading).
    pub fn delete_transcript(&self, id: &str) -> Result<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM transcripts WHERE id = ?1", [id])?;
        Ok(deleted > 0)
    }

    /// Check if a transcript exists.
    pub fn transcript_exists(&self, id: &str) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM transcripts WHERE id = ?1",
            [id],
            |r| r.get(0),
        )?;
        Ok(count > 0)
    }

    /// List all transcripts in date order, newest first.
    pub fn list_all(&self, limit: usize) -> Result<Vec<Transcript>> {
        let ids = self.query_ids(
            "SELECT id FROM transcripts ORDER BY date DESC, id LIMIT ?1",
            rusqlite::params![limit as i64],
        )?;
        self.load_many(&ids)
    }

    /// Get database statistics.
    pub fn stats(&self) -> Result<DbStats> {
        let count = |sql: &str| -> Result<i64> {
            Ok(self.conn.query_row(sql, [], |r| r.get(0))?)
        };

        let transcripts = count("SELECT COUNT(*) FROM transcripts")?;
        let participants = count("SELECT COUNT(*) FROM participants")?;
        let dialogue_entries = count("SELECT COUNT(*) FROM dialogue_entries")?;
        let decisions = count("SELECT COUNT(*) FROM decisions")?;
        let action_items = count("SELECT COUNT(*) FROM action_items")?;
        let tags = count("SELECT COUNT(DISTINCT LOWER(tag)) FROM tags")?;

        let mut stmt = self.conn.prepare(
            "SELECT department, COUNT(*) FROM transcripts GROUP BY department ORDER BY department",
        )?;
        let dept_rows = stmt.query_map([], |row| {
            Ok(DepartmentCount {
                department: row.get(0)?,
                count: row.get(1)?,
            })
        })?;
        let mut departments = Vec::new();
        for row in dept_rows {
            departments.push(row?);
        }

        let db_size_bytes = self
            .path
            .as_ref()
            .and_then(|p| std::fs::metadata(p).ok())
            .map(|m| m.len())
            .unwrap_or(0);

        Ok(DbStats {
            transcripts,
            participants,
            dialogue_entries,
            decisions,
            action_items,
            tags,
            departments,
            db_size_bytes,
        })
    }

    fn query_ids(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, |row| row.get::<_, String>(0))?;
        let mut ids = Vec::new();
        for row in rows {
            ids.push(row?);
        }
        Ok(ids)
    }

    fn load_many(&self, ids: &[String]) -> Result<Vec<Transcript>> {
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(t) = self.find_by_id(id)? {
                out.push(t);
            }
        }
        Ok(out)
    }
}

impl TranscriptStore for Database {
    /// Insert a fully-formed transcript with all related data. Saving an
    /// existing id replaces it wholesale.
    fn save(&self, t: &Transcript) -> Result<String> {
        let tx = self.conn.unchecked_transaction()?;

        // Replace semantics: children cascade off the old row.
        tx.execute("DELETE FROM transcripts WHERE id = ?1", [&t.id])?;

        let metadata_json = if t.metadata.is_empty() {
            None
        } else {
            Some(serde_json::to_string(&t.metadata).map_err(|e| Error::Format(e.to_string()))?)
        };

        tx.execute(
            "INSERT INTO transcripts (id, title, date, department, metadata)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![
                t.id,
                t.title,
                format_date(t.date),
                t.department,
                metadata_json,
            ],
        )?;

        for (i, p) in t.participants.iter().enumerate() {
            tx.execute(
                "INSERT INTO participants (transcript_id, participant_id, name, role, department, position)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![t.id, p.id, p.name, p.role, p.department, i as i64],
            )?;
        }

        for (i, e) in t.dialogue.iter().enumerate() {
            let mentions_json = if e.mentions.is_empty() {
                None
            } else {
                Some(serde_json::to_string(&e.mentions).map_err(|err| Error::Format(err.to_string()))?)
            };
            tx.execute(
                "INSERT INTO dialogue_entries (transcript_id, participant_id, text, timestamp, kind, mentions, position)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    t.id,
                    e.participant_id,
                    e.text,
                    format_date(e.timestamp),
                    e.kind.as_str(),
                    mentions_json,
                    i as i64,
                ],
            )?;
        }

        for (i, d) in t.decisions.iter().enumerate() {
            let stakeholders_json =
                serde_json::to_string(&d.stakeholders).map_err(|e| Error::Format(e.to_string()))?;
            tx.execute(
                "INSERT INTO decisions (transcript_id, topic, decision, stakeholders, timestamp, position)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    t.id,
                    d.topic,
                    d.decision,
                    stakeholders_json,
                    format_date(d.timestamp),
                    i as i64,
                ],
            )?;
        }

        for (i, a) in t.action_items.iter().enumerate() {
            tx.execute(
                "INSERT INTO action_items (transcript_id, description, assignee, due_date, status, position)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    t.id,
                    a.description,
                    a.assignee,
                    format_date(a.due_date),
                    a.status,
                    i as i64,
                ],
            )?;
        }

        for tag in &t.tags {
            tx.execute(
                "INSERT OR IGNORE INTO tags (transcript_id, tag) VALUES (?1, ?2)",
                rusqlite::params![t.id, tag],
            )?;
        }

        tx.commit()?;
        Ok(t.id.clone())
    }

    fn find_by_id(&self, id: &str) -> Result<Option<Transcript>> {
        let header = self
            .conn
            .prepare("SELECT id, title, date, department, metadata FROM transcripts WHERE id = ?1")?
            .query_row([id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, Option<String>>(4)?,
                ))
            })
            .optional()?;

        let Some((id, title, date, department, metadata_json)) = header else {
            return Ok(None);
        };

        let metadata = match metadata_json {
            Some(s) => serde_json::from_str(&s).map_err(|e| Error::Format(e.to_string()))?,
            None => Default::default(),
        };

        Ok(Some(Transcript {
            title,
            date: parse_date(&date)?,
            department,
            participants: self.load_participants(&id)?,
            dialogue: self.load_dialogue(&id)?,
            decisions: self.load_decisions(&id)?,
            action_items: self.load_action_items(&id)?,
            tags: self.load_tags(&id)?,
            metadata,
            id,
        }))
    }

    fn find_by_department(&self, department: &str) -> Result<Vec<Transcript>> {
        let ids = self.query_ids(
            "SELECT id FROM transcripts WHERE LOWER(department) = LOWER(?1) ORDER BY date, id",
            [department],
        )?;
        self.load_many(&ids)
    }

    fn find_by_date_range(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<Transcript>> {
        // Inclusive on both ends; the fixed text format sorts lexically.
        let ids = self.query_ids(
            "SELECT id FROM transcripts WHERE date >= ?1 AND date <= ?2 ORDER BY date, id",
            rusqlite::params![format_date(start), format_date(end)],
        )?;
        self.load_many(&ids)
    }

    fn find_by_tag(&self, tag: &str) -> Result<Vec<Transcript>> {
        let ids = self.query_ids(
            "SELECT t.id FROM transcripts t
             JOIN tags g ON g.transcript_id = t.id
             WHERE LOWER(g.tag) = LOWER(?1)
             ORDER BY t.date, t.id",
            [tag],
        )?;
        self.load_many(&ids)
    }
}

impl Database {
    fn load_participants(&self, id: &str) -> Result<Vec<Participant>> {
        let mut stmt = self.conn.prepare(
            "SELECT participant_id, name, role, department
             FROM participants WHERE transcript_id = ?1 ORDER BY position",
        )?;
        let rows = stmt.query_map([id], |row| {
            Ok(Participant {
                id: row.get(0)?,
                name: row.get(1)?,
                role: row.get(2)?,
                department: row.get(3)?,
            })
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    fn load_dialogue(&self, id: &str) -> Result<Vec<DialogueEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT participant_id, text, timestamp, kind, mentions
             FROM dialogue_entries WHERE transcript_id = ?1 ORDER BY position",
        )?;
        let rows = stmt.query_map([id], |row| {
            Ok((
                row.get::<_, Option<String>>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, Option<String>>(4)?,
            ))
        })?;
        let mut out = Vec::new();
        for row in rows {
            let (participant_id, text, timestamp, kind, mentions_json) = row?;
            let mentions = match mentions_json {
                Some(s) => serde_json::from_str(&s).map_err(|e| Error::Format(e.to_string()))?,
                None => Vec::new(),
            };
            out.push(DialogueEntry {
                participant_id,
                text,
                timestamp: parse_date(&timestamp)?,
                kind: DialogueType::from_str(&kind).unwrap_or(DialogueType::Statement),
                mentions,
            });
        }
        Ok(out)
    }

    fn load_decisions(&self, id: &str) -> Result<Vec<DecisionPoint>> {
        let mut stmt = self.conn.prepare(
            "SELECT topic, decision, stakeholders, timestamp
             FROM decisions WHERE transcript_id = ?1 ORDER BY position",
        )?;
        let rows = stmt.query_map([id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;
        let mut out = Vec::new();
        for row in rows {
            let (topic, decision, stakeholders_json, timestamp) = row?;
            let stakeholders = match stakeholders_json {
                Some(s) => serde_json::from_str(&s).map_err(|e| Error::Format(e.to_string()))?,
                None => Vec::new(),
            };
            out.push(DecisionPoint {
                topic,
                decision,
                stakeholders,
                timestamp: parse_date(&timestamp)?,
            });
        }
        Ok(out)
    }

    fn load_action_items(&self, id: &str) -> Result<Vec<ActionItem>> {
        let mut stmt = self.conn.prepare(
            "SELECT description, assignee, due_date, status
             FROM action_items WHERE transcript_id = ?1 ORDER BY position",
        )?;
        let rows = stmt.query_map([id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;
        let mut out = Vec::new();
        for row in rows {
            let (description, assignee, due_date, status) = row?;
            out.push(ActionItem {
                description,
                assignee,
                due_date: parse_date(&due_date)?,
                status,
            });
        }
        Ok(out)
    }

    fn load_tags(&self, id: &str) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT tag FROM tags WHERE transcript_id = ?1 ORDER BY tag")?;
        let rows = stmt.query_map([id], |row| row.get(0))?;
        let mut tags = Vec::new();
        for row in rows {
            tags.push(row?);
        }
        Ok(tags)
    }
}

pub fn format_date(dt: NaiveDateTime) -> String {
    dt.format(DATE_FORMAT).to_string()
}

pub fn parse_date(s: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, DATE_FORMAT)
        .map_err(|e| Error::Format(format!("bad date '{s}': {e}")))
}

/// Stats returned by `tqa stats`.
#[derive(Debug, Clone, Serialize)]
pub struct DbStats {
    pub transcripts: i64,
    pub participants: i64,
    pub dialogue_entries: i64,
    pub decisions: i64,
    pub action_items: i64,
    pub tags: i64,
    pub departments: Vec<DepartmentCount>,
    pub db_size_bytes: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DepartmentCount {
    pub department: String,
    pub count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample() -> Transcript {
        let date = NaiveDate::from_ymd_opt(2024, 3, 26)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        Transcript {
            id: "MT-1".into(),
            title: "Quarterly Planning".into(),
            date,
            department: "General".into(),
            participants: vec![Participant {
                id: "P1".into(),
                name: "Ana Pop".into(),
                role: "Organizer".into(),
                department: "Unknown".into(),
            }],
            dialogue: vec![DialogueEntry {
                participant_id: Some("P1".into()),
                text: "Decision: ship in May".into(),
                timestamp: date,
                kind: DialogueType::Decision,
                mentions: vec!["@ops".into()],
            }],
            decisions: vec![],
            action_items: vec![],
            tags: vec!["planning".into(), "quarterly".into()],
            metadata: [("source".to_string(), "upload".to_string())].into(),
        }
    }

    #[test]
    fn save_and_find_round_trip() {
        let db = Database::open_in_memory().unwrap();
        let t = sample();
        db.save(&t).unwrap();

        let loaded = db.find_by_id("MT-1").unwrap().unwrap();
        assert_eq!(loaded.title, t.title);
        assert_eq!(loaded.date, t.date);
        assert_eq!(loaded.participants.len(), 1);
        assert_eq!(loaded.dialogue[0].kind, DialogueType::Decision);
        assert_eq!(loaded.dialogue[0].mentions, vec!["@ops".to_string()]);
        assert_eq!(loaded.metadata.get("source").unwrap(), "upload");
    }

    #[test]
    fn department_lookup_is_case_insensitive() {
        let db = Database::open_in_memory().unwrap();
        db.save(&sample()).unwrap();
        assert_eq!(db.find_by_department("GENERAL").unwrap().len(), 1);
        assert_eq!(db.find_by_department("general").unwrap().len(), 1);
        assert_eq!(db.find_by_department("Finance").unwrap().len(), 0);
    }

    #[test]
    fn tag_lookup_is_case_insensitive() {
        let db = Database::open_in_memory().unwrap();
        db.save(&sample()).unwrap();
        assert_eq!(db.find_by_tag("PLANNING").unwrap().len(), 1);
        assert_eq!(db.find_by_tag("missing").unwrap().len(), 0);
    }

    #[test]
    fn date_range_is_inclusive() {
        let db = Database::open_in_memory().unwrap();
        let t = sample();
        db.save(&t).unwrap();
        let hit = db.find_by_date_range(t.date, t.date).unwrap();
        assert_eq!(hit.len(), 1);
    }

    #[test]
    fn save_replaces_existing() {
        let db = Database::open_in_memory().unwrap();
        let mut t = sample();
        db.save(&t).unwrap();
        t.title = "Revised".into();
        db.save(&t).unwrap();
        let loaded = db.find_by_id("MT-1").unwrap().unwrap();
        assert_eq!(loaded.title, "Revised");
        assert_eq!(db.stats().unwrap().transcripts, 1);
    }
}
