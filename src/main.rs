use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;

use tqa::analysis::{Analyzer, ScoringTables};
use tqa::config::{self, TqaConfig};
use tqa::context as context_block;
use tqa::db::{Database, TranscriptStore};
use tqa::generate::OpenAiGenerator;
use tqa::ingest::{self, Ingestor};
use tqa::output::{json as json_out, table};
use tqa::qa;
use tqa::search::{self, DateRange, Query};

#[derive(Parser)]
#[command(name = "tqa", version, about = "Transcript Q&A — deterministic analysis, retrieval and scoring of meeting transcripts")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Path to database file (default: ~/.tqa/tqa.db)
    #[arg(long, global = true, env = "TQA_DB")]
    db: Option<PathBuf>,
}

#[derive(clap::Args, Debug, Default)]
struct QueryArgs {
    /// Exact meeting id (ignores every other filter)
    #[arg(long)]
    meeting_id: Option<String>,

    /// Filter by department (case-insensitive)
    #[arg(long)]
    department: Option<String>,

    /// Date range start (YYYY-MM-DD), inclusive
    #[arg(long)]
    from: Option<String>,

    /// Date range end (YYYY-MM-DD), inclusive
    #[arg(long)]
    to: Option<String>,

    /// Filter by tag; repeatable, tags are OR-combined
    #[arg(long = "tag")]
    tags: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest meeting records (JSON arrays) from files or stdin
    Ingest {
        /// File, directory, or glob paths to ingest
        paths: Vec<String>,

        /// Read a payload from stdin
        #[arg(long)]
        stdin: bool,

        /// Preview without importing
        #[arg(long)]
        dry_run: bool,
    },

    /// List transcripts, optionally filtered
    List {
        #[command(flatten)]
        query: QueryArgs,

        /// Maximum results when no filter is given
        #[arg(long, default_value = "50")]
        limit: usize,
    },

    /// Show one transcript's details
    Show {
        /// Transcript ID
        id: String,
    },

    /// Render matching transcripts as a flat context block
    Context {
        #[command(flatten)]
        query: QueryArgs,
    },

    /// Score and rank matching meetings
    Analyze {
        #[command(flatten)]
        query: QueryArgs,
    },

    /// Extract, score, and consolidate decisions across matching meetings
    Decisions {
        #[command(flatten)]
        query: QueryArgs,
    },

    /// Ask a question about matching meetings
    Ask {
        /// The question
        question: String,

        #[command(flatten)]
        query: QueryArgs,

        /// Generator API key (overrides env and config)
        #[arg(long)]
        api_key: Option<String>,

        /// Generator model name
        #[arg(long)]
        model: Option<String>,

        /// Stream the answer as it is generated
        #[arg(long)]
        stream: bool,
    },

    /// Show database statistics
    Stats,

    /// Delete a transcript
    Delete {
        /// Transcript ID
        id: String,

        /// Skip confirmation prompt
        #[arg(long)]
        force: bool,
    },

    /// Write a config file template to ~/.tqa/config.toml
    Init,

    /// Show database and config info
    Info,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let json_output = cli.json;

    let db_path = match cli.db {
        Some(path) => path,
        None => Database::default_db_path()?,
    };

    let db = Database::open(&db_path)?;
    let cfg = TqaConfig::load()?;

    match cli.command {
        Commands::Ingest { paths, stdin, dry_run } => {
            let ingestor = Ingestor::new(cfg.locality_tag());

            let count = if stdin {
                ingest::ingest_stdin(&db, &ingestor, dry_run)?
            } else if paths.is_empty() {
                bail!("No paths provided. Use --stdin to read from stdin.");
            } else {
                ingest::ingest_paths(&db, &ingestor, &paths, dry_run)?
            };

            let action = if dry_run { "Would ingest" } else { "Ingested" };
            println!("{action} {count} transcript{}", if count == 1 { "" } else { "s" });
        }

        Commands::List { query, limit } => {
            let q = build_query(&query)?;
            let results = if q.is_empty() {
                db.list_all(limit)?
            } else {
                search::resolve(&db, &q)?
            };
            if json_output {
                json_out::print_json(&results)?;
            } else {
                table::print_transcript_list(&results);
            }
        }

        Commands::Show { id } => {
            let t = db
                .find_by_id(&id)?
                .with_context(|| format!("Transcript not found: {id}"))?;
            if json_output {
                json_out::print_json(&t)?;
            } else {
                table::print_transcript_detail(&t);
            }
        }

        Commands::Context { query } => {
            let q = build_query(&query)?;
            let transcripts = search::resolve(&db, &q)?;
            let rendered = context_block::render(&transcripts);
            if json_output {
                json_out::print_json(&serde_json::json!({
                    "transcripts": transcripts.len(),
                    "context": rendered,
                }))?;
            } else {
                print!("{rendered}");
            }
        }

        Commands::Analyze { query } => {
            let q = build_query(&query)?;
            let transcripts = search::resolve(&db, &q)?;
            let analyzer = Analyzer::new(ScoringTables::default());
            let refs = analyzer.meeting_references(&transcripts)?;
            if json_output {
                json_out::print_json(&refs)?;
            } else {
                table::print_meeting_references(&refs);
            }
        }

        Commands::Decisions { query } => {
            let q = build_query(&query)?;
            let transcripts = search::resolve(&db, &q)?;
            let analyzer = Analyzer::new(ScoringTables::default());
            let refs = analyzer.decision_references(&transcripts);
            if json_output {
                json_out::print_json(&refs)?;
            } else {
                table::print_decision_references(&refs);
            }
        }

        Commands::Ask {
            question,
            query,
            api_key,
            model,
            stream,
        } => {
            let q = build_query(&query)?;
            let generator_cfg = cfg.generator.as_ref();
            let key = config::resolve_credential(api_key.as_deref(), "TQA_API_KEY", generator_cfg)?;
            let generator = OpenAiGenerator::new(
                key,
                model.or_else(|| generator_cfg.and_then(|g| g.model.clone())),
                generator_cfg.and_then(|g| g.base_url.clone()),
            );

            if stream {
                let chunks = qa::stream_answer(&db, &generator, &q, &question)?;
                let mut stdout = std::io::stdout();
                for chunk in chunks {
                    write!(stdout, "{}", chunk?)?;
                    stdout.flush()?;
                }
                println!();
            } else {
                let answer = qa::answer_question(&db, &generator, &q, &question)?;
                if json_output {
                    json_out::print_json(&answer)?;
                } else {
                    println!("{}", answer.answer);
                }
            }
        }

        Commands::Stats => {
            let stats = db.stats()?;
            if json_output {
                json_out::print_json(&stats)?;
            } else {
                table::print_stats(&stats);
            }
        }

        Commands::Delete { id, force } => {
            let t = db
                .find_by_id(&id)?
                .with_context(|| format!("Transcript not found: {id}"))?;

            if !force {
                eprint!("Delete \"{}\" ({})? [y/N] ", t.title, id);
                let mut answer = String::new();
                std::io::stdin().read_line(&mut answer)?;
                if !answer.trim().eq_ignore_ascii_case("y") {
                    println!("Cancelled.");
                    return Ok(());
                }
            }

            db.delete_transcript(&id)?;
            println!("Deleted: {} ({})", t.title, id);
        }

        Commands::Init => {
            let created = config::init_config()?;
            let path = config::config_path()?;
            if created {
                println!("Wrote config template: {}", path.display());
            } else {
                println!("Config already exists: {}", path.display());
            }
        }

        Commands::Info => {
            let stats = db.stats()?;
            let schema_ver: String = db
                .conn
                .query_row(
                    "SELECT value FROM tqa_meta WHERE key = 'schema_version'",
                    [],
                    |r| r.get(0),
                )
                .unwrap_or_else(|_| "unknown".to_string());

            if json_output {
                json_out::print_json(&serde_json::json!({
                    "version": env!("CARGO_PKG_VERSION"),
                    "schema_version": schema_ver,
                    "db_path": db_path.display().to_string(),
                    "db_size_bytes": stats.db_size_bytes,
                    "transcripts": stats.transcripts,
                    "dialogue_entries": stats.dialogue_entries,
                }))?;
            } else {
                println!("tqa v{}", env!("CARGO_PKG_VERSION"));
                println!("  Schema:      v{schema_ver}");
                println!("  Database:    {}", db_path.display());
                println!("  Size:        {}", table::format_bytes(stats.db_size_bytes));
                println!("  Transcripts: {}", stats.transcripts);
                println!("  Dialogue:    {} entries", stats.dialogue_entries);
                println!("\nConfig:\n{}", cfg.display_redacted());
            }
        }
    }

    Ok(())
}

fn build_query(args: &QueryArgs) -> Result<Query> {
    let date_range = match (&args.from, &args.to) {
        (Some(from), Some(to)) => Some(DateRange {
            start: parse_query_date(from, false)?,
            end: parse_query_date(to, true)?,
        }),
        (None, None) => None,
        _ => bail!("Date filtering needs both --from and --to."),
    };

    Ok(Query {
        meeting_id: args.meeting_id.clone(),
        department: args.department.clone(),
        date_range,
        tags: if args.tags.is_empty() {
            None
        } else {
            Some(args.tags.clone())
        },
    })
}

/// Accept a bare date or a full datetime; bare dates expand to the start or
/// end of the day so both range ends stay inclusive.
fn parse_query_date(s: &str, end_of_day: bool) -> Result<NaiveDateTime> {
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Ok(dt);
    }
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .with_context(|| format!("Invalid date: {s} (expected YYYY-MM-DD)"))?;
    let time = if end_of_day {
        date.and_hms_opt(23, 59, 59)
    } else {
        date.and_hms_opt(0, 0, 0)
    };
    Ok(time.expect("valid time of day"))
}
