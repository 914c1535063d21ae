//! Persisted post ordinal counter.
//!
//! Each published review carries a monotonically increasing ordinal. The
//! counter separates *peeking* (computing the candidate ordinal for a cycle)
//! from *committing* (persisting the increment), so a failed publish attempt
//! never consumes a value. Gaps after failed attempts are acceptable;
//! duplicate ordinals are not.

use crate::error::{PosterError, Result};
use crate::storage;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CounterState {
    next_value: u64,
}

/// Monotonic post ordinal, backed by a single JSON file.
pub struct PostCounter {
    state: CounterState,
    path: PathBuf,
}

impl PostCounter {
    /// Load the counter, initializing to 1 on first run.
    pub fn load(path: PathBuf) -> Result<Self> {
        let state: CounterState = storage::load_json(&path)
            .map_err(|e| PosterError::Counter(e.to_string()))?
            .unwrap_or(CounterState { next_value: 1 });
        Ok(Self { state, path })
    }

    /// The ordinal the next successful publish will consume.
    #[must_use]
    pub fn peek_next(&self) -> u64 {
        self.state.next_value
    }

    /// Consume the current ordinal: persist the increment and return the
    /// value just consumed.
    ///
    /// Call only after the publish surface has confirmed acceptance.
    pub fn commit(&mut self) -> Result<u64> {
        let consumed = self.state.next_value;
        let next = CounterState {
            next_value: consumed + 1,
        };
        storage::save_json(&self.path, &next)
            .map_err(|e| PosterError::Counter(e.to_string()))?;
        self.state = next;
        Ok(consumed)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[test]
    fn first_run_starts_at_one() {
        let dir = tempfile::tempdir().unwrap();
        let counter = PostCounter::load(dir.path().join("counter.json")).unwrap();
        assert_eq!(counter.peek_next(), 1);
    }

    #[test]
    fn commit_returns_consumed_value_and_advances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("counter.json");
        storage::save_json(&path, &CounterState { next_value: 5 }).unwrap();

        let mut counter = PostCounter::load(path).unwrap();
        assert_eq!(counter.commit().unwrap(), 5);
        assert_eq!(counter.peek_next(), 6);
    }

    #[test]
    fn peek_does_not_persist() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("counter.json");

        let counter = PostCounter::load(path.clone()).unwrap();
        let _ = counter.peek_next();
        let _ = counter.peek_next();
        drop(counter);

        let reloaded = PostCounter::load(path).unwrap();
        assert_eq!(reloaded.peek_next(), 1, "peeking must not consume values");
    }

    #[test]
    fn committed_value_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("counter.json");

        let mut counter = PostCounter::load(path.clone()).unwrap();
        counter.commit().unwrap();
        counter.commit().unwrap();

        let reloaded = PostCounter::load(path).unwrap();
        assert_eq!(reloaded.peek_next(), 3);
    }
}
