//! Ordered, persisted work queue of papers awaiting publication.
//!
//! The queue file is produced by an external collection step and read fully
//! at daemon start; nothing in-memory survives a restart. The daemon is its
//! only writer: completion marks are the single mutation, applied through an
//! atomic rewrite of the whole file. Items are never deleted; history is
//! retained for idempotence and audit.

use crate::error::{PosterError, Result};
use crate::storage;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;

/// Paper descriptor carried by a queue item.
///
/// Opaque to the queue itself; consumed by the review generator and the
/// post composition step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaperMeta {
    /// Paper title.
    pub title: String,
    /// Author list.
    pub authors: Vec<String>,
    /// Publication year.
    pub year: Option<i32>,
    /// Canonical paper URL.
    pub url: Option<String>,
    /// arXiv identifier, when known.
    pub arxiv_id: Option<String>,
    /// Citation count at collection time.
    pub citations: Option<u64>,
}

/// Per-item completion status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    /// Not yet published.
    Pending,
    /// Published and confirmed. Never reverts.
    Completed,
}

/// One unit of content work in the backlog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueItem {
    /// Stable identifier from the collection step.
    pub id: String,
    /// Publication order; lower ranks publish earlier.
    pub rank: u64,
    /// Paper descriptor.
    pub paper: PaperMeta,
    /// Completion status.
    pub status: ItemStatus,
}

/// Persisted queue file schema.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct QueueState {
    #[serde(default = "default_state_version")]
    version: u8,
    #[serde(default)]
    items: Vec<QueueItem>,
}

fn default_state_version() -> u8 {
    1
}

/// The ordered work queue, backed by a single JSON file.
pub struct WorkQueue {
    items: Vec<QueueItem>,
    path: PathBuf,
}

impl WorkQueue {
    /// Load the queue from disk.
    ///
    /// A missing queue file is an error: it means the collection step has
    /// never run, which the daemon treats as fatal at startup. Duplicate
    /// ranks are tolerated (storage order breaks the tie) but logged as a
    /// data-integrity warning.
    pub fn load(path: PathBuf) -> Result<Self> {
        let state: QueueState = storage::load_json(&path)?.ok_or_else(|| {
            PosterError::Queue(format!(
                "queue store not found at {}; run the collection step first",
                path.display()
            ))
        })?;

        let queue = Self {
            items: state.items,
            path,
        };
        queue.warn_on_duplicate_ranks();
        Ok(queue)
    }

    fn warn_on_duplicate_ranks(&self) {
        let mut ranks: Vec<u64> = self.items.iter().map(|item| item.rank).collect();
        ranks.sort_unstable();
        for pair in ranks.windows(2) {
            if pair[0] == pair[1] {
                warn!(
                    rank = pair[0],
                    "duplicate ordering rank in queue store; storage order will break the tie"
                );
            }
        }
    }

    /// Next item to publish: the lowest-rank pending item. Ties are broken by
    /// storage order. `None` means the backlog is exhausted.
    #[must_use]
    pub fn next_pending(&self) -> Option<&QueueItem> {
        self.items
            .iter()
            .filter(|item| item.status == ItemStatus::Pending)
            .min_by_key(|item| item.rank)
    }

    /// Mark an item completed and persist the queue.
    ///
    /// Idempotent: marking an already-completed item is a no-op returning
    /// `Ok(false)`. An unknown identifier is an error.
    pub fn mark_completed(&mut self, id: &str) -> Result<bool> {
        let item = self
            .items
            .iter_mut()
            .find(|item| item.id == id)
            .ok_or_else(|| PosterError::Queue(format!("unknown queue item: {id}")))?;

        if item.status == ItemStatus::Completed {
            return Ok(false);
        }
        item.status = ItemStatus::Completed;
        self.persist()?;
        Ok(true)
    }

    /// All items, in storage order.
    #[must_use]
    pub fn items(&self) -> &[QueueItem] {
        &self.items
    }

    /// Count of items still pending.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.items
            .iter()
            .filter(|item| item.status == ItemStatus::Pending)
            .count()
    }

    /// Reset every item to pending and persist.
    ///
    /// Operator-initiated (the `reset` subcommand); the daemon itself never
    /// reverts a completion mark.
    pub fn reset_all(&mut self) -> Result<()> {
        for item in &mut self.items {
            item.status = ItemStatus::Pending;
        }
        self.persist()
    }

    fn persist(&self) -> Result<()> {
        let state = QueueState {
            version: default_state_version(),
            items: self.items.clone(),
        };
        storage::save_json(&self.path, &state)
    }
}
