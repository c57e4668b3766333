use rusqlite::Connection;

use crate::error::Result;

pub fn create_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        -- Version tracking
        CREATE TABLE IF NOT EXISTS tqa_meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        -- Core tables
        CREATE TABLE IF NOT EXISTS transcripts (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            date TEXT NOT NULL,
            department TEXT NOT NULL DEFAULT 'General',
            metadata TEXT,
            created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
        );

        CREATE TABLE IF NOT EXISTS participants (
            transcript_id TEXT NOT NULL REFERENCES transcripts(id) ON DELETE CASCADE,
            participant_id TEXT NOT NULL,
            name TEXT NOT NULL,
            role TEXT NOT NULL DEFAULT 'Participant',
            department TEXT NOT NULL DEFAULT 'Unknown',
            position INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (transcript_id, participant_id)
        );

        CREATE TABLE IF NOT EXISTS dialogue_entries (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            transcript_id TEXT NOT NULL REFERENCES transcripts(id) ON DELETE CASCADE,
            participant_id TEXT,
            text TEXT NOT NULL DEFAULT '',
            timestamp TEXT NOT NULL,
            kind TEXT NOT NULL DEFAULT 'STATEMENT',
            mentions TEXT,
            position INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS decisions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            transcript_id TEXT NOT NULL REFERENCES transcripts(id) ON DELETE CASCADE,
            topic TEXT NOT NULL,
            decision TEXT NOT NULL,
            stakeholders TEXT,
            timestamp TEXT NOT NULL,
            position INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS action_items (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            transcript_id TEXT NOT NULL REFERENCES transcripts(id) ON DELETE CASCADE,
            description TEXT NOT NULL DEFAULT '',
            assignee TEXT NOT NULL DEFAULT '',
            due_date TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'NEW',
            position INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS tags (
            transcript_id TEXT NOT NULL REFERENCES transcripts(id) ON DELETE CASCADE,
            tag TEXT NOT NULL,
            PRIMARY KEY (transcript_id, tag)
        );

        -- Indexes for the retriever's filters
        CREATE INDEX IF NOT EXISTS idx_transcripts_date ON transcripts(date);
        CREATE INDEX IF NOT EXISTS idx_transcripts_department ON transcripts(LOWER(department));
        CREATE INDEX IF NOT EXISTS idx_dialogue_transcript ON dialogue_entries(transcript_id);
        CREATE INDEX IF NOT EXISTS idx_tags_tag ON tags(LOWER(tag));
        ",
    )?;

    // Set schema version
    conn.execute(
        "INSERT OR REPLACE INTO tqa_meta (key, value) VALUES ('schema_version', '1')",
        [],
    )?;

    Ok(())
}
