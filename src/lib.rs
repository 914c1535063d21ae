//! Autopress: unattended daily blog publishing daemon.
//!
//! Once per day, at a randomized instant inside a configured evening window,
//! the daemon takes the next paper from an ordered backlog, generates a
//! review with a remote LLM, renders it to HTML, and submits it to a Tistory
//! blog using a browser-derived session cookie.
//!
//! # Architecture
//!
//! The hard part is three pieces that must act as one consistent unit:
//! - **Credential lifecycle** (`credentials` + `session`): cookie freshness
//!   tracking, and browser-driven refresh when the material goes stale or
//!   the site rejects it mid-cycle.
//! - **Scheduler** (`schedule` + `daemon`): a randomized daily trigger with
//!   crash recovery and a cancellable wait.
//! - **Work queue state machine** (`queue` + `counter` + `pipeline`): an
//!   ordered, persisted backlog whose progress commits only after the remote
//!   surface confirms acceptance.
//!
//! Everything else (review generation in `content::generator`, markdown
//! rendering in `content::render`, the HTTP surface in `publish`) is a
//! replaceable adapter at a trait or config boundary.

pub mod app_dirs;
pub mod config;
pub mod content;
pub mod counter;
pub mod credentials;
pub mod daemon;
pub mod error;
pub mod pipeline;
pub mod publish;
pub mod queue;
pub mod schedule;
pub mod session;
pub mod storage;

pub use config::AppConfig;
pub use daemon::Daemon;
pub use error::{PosterError, Result};
pub use pipeline::{CycleOutcome, PipelineSettings, PublishPipeline};
