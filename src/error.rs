//! Error types for the autopress daemon.

/// Top-level error type for the publishing daemon.
///
/// Collaborator-specific failures ([`crate::publish::PublishError`],
/// [`crate::session::RefreshError`], [`crate::content::GenerateError`]) are
/// mapped into one of these variants before crossing the pipeline boundary,
/// so callers above the pipeline only ever see this type.
#[derive(Debug, thiserror::Error)]
pub enum PosterError {
    /// Configuration error (missing file, invalid field, bad time zone).
    #[error("config error: {0}")]
    Config(String),

    /// Session credential storage error.
    #[error("credential error: {0}")]
    Credentials(String),

    /// Work queue load or persistence error.
    #[error("queue error: {0}")]
    Queue(String),

    /// Post counter persistence error.
    #[error("counter error: {0}")]
    Counter(String),

    /// Scheduler error (window computation, state persistence).
    #[error("schedule error: {0}")]
    Schedule(String),

    /// Review generation or rendering error.
    #[error("content error: {0}")]
    Content(String),

    /// Publish surface error (submission, category lookup).
    #[error("publish error: {0}")]
    Publish(String),

    /// Browser-driven session refresh error.
    #[error("session refresh error: {0}")]
    Refresh(String),

    /// State store serialization error.
    #[error("store error: {0}")]
    Store(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, PosterError>;
