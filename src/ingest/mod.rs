pub mod convert;

use anyhow::{bail, Context, Result};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::db::{Database, TranscriptStore};
use crate::model::Transcript;

pub use convert::{Ingestor, MeetingRecord};

/// Ingest one or more paths (files, directories, or glob patterns), each a
/// JSON array of custom meeting records. All payloads are converted before
/// anything is persisted, so a malformed file aborts the whole batch.
pub fn ingest_paths(
    db: &Database,
    ingestor: &Ingestor,
    paths: &[String],
    dry_run: bool,
) -> Result<usize> {
    let mut files = Vec::new();
    for path_str in paths {
        let path = Path::new(path_str);
        if path.is_dir() {
            collect_directory(path, &mut files)?;
        } else if path.is_file() {
            files.push(path.to_path_buf());
        } else {
            // Try glob pattern
            let matches: Vec<_> = glob::glob(path_str)
                .with_context(|| format!("Invalid path or glob pattern: {path_str}"))?
                .filter_map(|r| r.ok())
                .filter(|p| p.is_file())
                .collect();

            if matches.is_empty() {
                bail!("No files found matching: {path_str}");
            }
            files.extend(matches);
        }
    }

    // Convert everything first; nothing is saved if any file fails.
    let mut batch = Vec::new();
    for file in &files {
        let content = std::fs::read_to_string(file)
            .with_context(|| format!("Failed to read: {}", file.display()))?;
        let transcripts = ingestor
            .convert_batch(&content)
            .with_context(|| format!("Failed to convert: {}", file.display()))?;
        batch.extend(transcripts);
    }

    persist(db, batch, dry_run)
}

/// Ingest a payload from stdin.
pub fn ingest_stdin(db: &Database, ingestor: &Ingestor, dry_run: bool) -> Result<usize> {
    let mut content = String::new();
    std::io::stdin()
        .read_to_string(&mut content)
        .context("Failed to read from stdin")?;

    if content.trim().is_empty() {
        bail!("Empty input from stdin");
    }

    let batch = ingestor.convert_batch(&content)?;
    persist(db, batch, dry_run)
}

fn collect_directory(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    let mut entries: Vec<_> = std::fs::read_dir(dir)?.filter_map(|e| e.ok()).collect();
    entries.sort_by_key(|e| e.path());

    for entry in entries {
        let path = entry.path();
        if path.is_dir() {
            collect_directory(&path, files)?;
        } else if path.extension().and_then(|e| e.to_str()) == Some("json") {
            files.push(path);
        }
    }
    Ok(())
}

fn persist(db: &Database, batch: Vec<Transcript>, dry_run: bool) -> Result<usize> {
    if dry_run {
        for t in &batch {
            println!(
                "  [dry-run] Would ingest: {} ({}, {} dialogue entries)",
                t.title,
                t.department,
                t.dialogue.len()
            );
        }
        return Ok(batch.len());
    }

    let count = batch.len();
    for t in batch {
        db.save(&t)?;
        info!("Ingested: {} ({})", t.title, t.id);
    }
    Ok(count)
}
