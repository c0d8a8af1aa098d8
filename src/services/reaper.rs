use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::error::Result;
use crate::models::session::{SessionPatch, SessionStatus};
use crate::repositories::session::SessionStore;

/// Outcome of one reaper pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReapSummary {
    /// Active sessions examined.
    pub scanned: usize,
    /// Sessions demoted to Idle.
    pub demoted: usize,
    /// Sessions whose demotion failed (retried implicitly next pass).
    pub failures: usize,
}

/// Periodically demotes stale `Active` sessions to `Idle`.
///
/// The scan reads raw records - idle age comes from the plaintext
/// last-access timestamp, so no decryption happens here. The reaper only
/// ever writes `Idle`; terminal states are invisible to it because the
/// scan is filtered to `Active`.
pub struct IdleReaper {
    store: Arc<dyn SessionStore>,
    idle_threshold_secs: u64,
    interval: Duration,
}

impl IdleReaper {
    /// Creates a new `IdleReaper`.
    ///
    /// # Arguments
    ///
    /// * `store` - The session store to scan.
    /// * `idle_threshold_secs` - Seconds of inactivity before demotion.
    /// * `interval` - Time between passes.
    pub fn new(store: Arc<dyn SessionStore>, idle_threshold_secs: u64, interval: Duration) -> Self {
        Self {
            store,
            idle_threshold_secs,
            interval,
        }
    }

    /// Runs a single pass. Each record is handled independently: a store
    /// failure on one is logged and counted, and the rest of the pass
    /// continues.
    pub async fn run_once(&self) -> Result<ReapSummary> {
        let records = self.store.list(Some(SessionStatus::Active)).await?;
        let now = Utc::now();

        let mut summary = ReapSummary {
            scanned: records.len(),
            demoted: 0,
            failures: 0,
        };

        for record in records {
            let idle_secs = (now - record.last_accessed).num_seconds();
            if idle_secs <= self.idle_threshold_secs as i64 {
                continue;
            }

            // Status only - demotion is not an access, so the idle clock
            // keeps running from the real last access.
            match self
                .store
                .update(&record.id, SessionPatch::status(SessionStatus::Idle))
                .await
            {
                Ok(Some(_)) => {
                    summary.demoted += 1;
                    tracing::info!("Session {} marked Idle after {}s of inactivity", record.id, idle_secs);
                }
                Ok(None) => {
                    // Deleted between scan and update; nothing to demote.
                }
                Err(e) => {
                    summary.failures += 1;
                    tracing::error!("❌ Failed to demote session {}: {}", record.id, e);
                }
            }
        }

        Ok(summary)
    }

    /// Spawns the recurring reaper task.
    ///
    /// The task runs a pass per interval tick until `shutdown` fires (or
    /// its sender is dropped). An interrupted pass leaves already-processed
    /// records transitioned and the rest untouched; the next tick picks
    /// them up again.
    pub fn spawn(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        match self.run_once().await {
                            Ok(summary) if summary.demoted > 0 || summary.failures > 0 => {
                                tracing::info!(
                                    "🧹 Reaper pass: {} scanned, {} demoted, {} failures",
                                    summary.scanned,
                                    summary.demoted,
                                    summary.failures
                                );
                            }
                            Ok(_) => {}
                            Err(e) => {
                                tracing::error!("❌ Reaper pass failed: {}", e);
                            }
                        }
                    }
                    _ = shutdown.changed() => {
                        tracing::info!("Idle reaper stopping");
                        break;
                    }
                }
            }
        })
    }
}
