use thiserror::Error;

/// Typed errors for the analysis engine. IO-heavy boundaries (CLI, HTTP)
/// wrap these in `anyhow` with extra context.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed ingestion payload or unparsable date. Aborts the whole
    /// batch; nothing is persisted.
    #[error("malformed transcript payload: {0}")]
    Format(String),

    /// Lookup by explicit meeting id matched nothing.
    #[error("transcript not found: {0}")]
    NotFound(String),

    /// Input the analyzer cannot score, e.g. a zero-participant roster.
    #[error("analysis error: {0}")]
    Analysis(String),

    #[error("store error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("generator error: {0}")]
    Generator(String),
}

pub type Result<T> = std::result::Result<T, Error>;
