//! Long-running daemon loop around the publish pipeline.
//!
//! The loop moves through four states: `Idle` (decide the next trigger),
//! `Waiting` (cancellable sleep until the trigger), `Publishing` (one
//! pipeline cycle), and `Cooldown` (persist tomorrow's trigger). A cycle
//! runs at most once per trigger, and the trigger is recomputed after every
//! cycle regardless of outcome, so a permanently failing cycle retries once
//! per day instead of spinning.
//!
//! Shutdown is observed *during* the wait, not just between cycles: the
//! sleep races a [`CancellationToken`], and a cancelled wait exits without
//! running a cycle, leaving the persisted trigger as-is. On restart a
//! still-future trigger is honored; an elapsed one fires immediately.

use crate::error::Result;
use crate::pipeline::{CycleOutcome, PublishPipeline};
use crate::schedule::{PostingWindow, ScheduleStore};
use chrono::{DateTime, FixedOffset, Utc};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Upper bound on a single sleep chunk. Waking at least this often keeps
/// the wait honest across suspend/resume and wall-clock adjustments.
const MAX_SLEEP_CHUNK: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DaemonState {
    Idle,
    Waiting,
    Publishing,
    Cooldown,
}

/// The scheduling daemon.
pub struct Daemon {
    pipeline: PublishPipeline,
    window: PostingWindow,
    store: ScheduleStore,
    cancel: CancellationToken,
}

impl Daemon {
    /// Assemble the daemon.
    #[must_use]
    pub fn new(
        pipeline: PublishPipeline,
        window: PostingWindow,
        store: ScheduleStore,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            pipeline,
            window,
            store,
            cancel,
        }
    }

    /// Run until cancelled.
    pub async fn run(mut self) -> Result<()> {
        let mut state = DaemonState::Idle;
        loop {
            debug!(?state, "daemon state");
            let trigger = self.next_trigger()?;
            info!(trigger = %trigger, "next publish trigger");

            state = DaemonState::Waiting;
            debug!(?state, "daemon state");
            if !wait_until(&self.cancel, trigger).await {
                info!("shutdown requested during wait; schedule state left untouched");
                return Ok(());
            }

            state = DaemonState::Publishing;
            debug!(?state, "daemon state");
            match self.pipeline.run_cycle().await {
                Ok(CycleOutcome::Published { item_id, ordinal, .. }) => {
                    info!(item = %item_id, ordinal, "cycle published");
                }
                Ok(CycleOutcome::NothingPending) => {
                    info!("cycle was a no-op; queue exhausted");
                }
                Err(e) => {
                    error!(error = %e, "cycle failed; will retry on the next trigger");
                }
            }

            state = DaemonState::Cooldown;
            debug!(?state, "daemon state");
            let next = self.window.next_after(Utc::now())?;
            self.store.set(next)?;

            state = DaemonState::Idle;
            if self.cancel.is_cancelled() {
                return Ok(());
            }
        }
    }

    /// Decide the trigger for this pass: honor a persisted future trigger,
    /// fire immediately on a persisted elapsed one, compute fresh otherwise.
    fn next_trigger(&mut self) -> Result<DateTime<FixedOffset>> {
        let now = Utc::now();
        match self.store.next_trigger_at() {
            Some(t) if t.with_timezone(&Utc) > now => {
                debug!(trigger = %t, "resuming persisted trigger");
                Ok(t)
            }
            Some(t) => {
                info!(trigger = %t, "persisted trigger already elapsed; firing immediately");
                Ok(t)
            }
            None => {
                let t = self.window.next_trigger(now)?;
                self.store.set(t)?;
                Ok(t)
            }
        }
    }
}

/// Sleep until `trigger` or cancellation. Returns `false` when cancelled.
async fn wait_until(cancel: &CancellationToken, trigger: DateTime<FixedOffset>) -> bool {
    let trigger = trigger.with_timezone(&Utc);
    loop {
        let now = Utc::now();
        if trigger <= now {
            return true;
        }
        let remaining = (trigger - now)
            .to_std()
            .unwrap_or(Duration::ZERO)
            .min(MAX_SLEEP_CHUNK);

        tokio::select! {
            () = tokio::time::sleep(remaining) => {}
            () = cancel.cancelled() => return false,
        }
    }
}
