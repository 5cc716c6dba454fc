use std::path::PathBuf;

/// Errors raised by the isolation and sync engine.
///
/// CLI commands wrap these in `anyhow` with extra context; library callers can
/// match on the variant to decide whether to retry (`AlreadyInProgress`) or ask
/// the user to fix their configuration (`ConfigurationMissing`).
#[derive(Debug, thiserror::Error)]
pub enum JugglerError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("a sync is already in progress for {project}; try again once it finishes")]
    AlreadyInProgress { project: String },

    #[error("{what} is not configured or does not exist (run `juggler config {hint}`)")]
    ConfigurationMissing { what: &'static str, hint: &'static str },

    #[error("instance for {project} did not shut down within {timeout_secs}s; nothing was synced")]
    ShutdownTimeout { project: String, timeout_secs: u64 },

    #[error("failed to copy {} to {}: {source}", from.display(), to.display())]
    CopyFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0} is the main project and runs against the base configuration")]
    NotIsolated(String),

    #[error("no free debug port left in {min}..{max}")]
    PortsExhausted { min: u16, max: u16 },

    #[error("failed to launch {}: {source}", executable.display())]
    Launch {
        executable: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T, E = JugglerError> = std::result::Result<T, E>;
