//! Fixed-interval trigger for the sweep.
//!
//! The first tick fires immediately, then every `interval`. Missed ticks are
//! skipped rather than bunched up. A failed run is logged and left for the
//! next tick; there is no immediate retry.

use std::future::Future;
use std::time::Duration;

use chrono::Utc;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use crate::store::OrderStore;
use crate::sweeper::Sweeper;

/// Totals across all runs of one [`Scheduler::run_until`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScheduleSummary {
    pub runs: u64,
    pub failures: u64,
    pub shipped: u64,
}

pub struct Scheduler<S> {
    sweeper: Sweeper,
    store: S,
    interval: Duration,
}

impl<S: OrderStore> Scheduler<S> {
    pub fn new(sweeper: Sweeper, store: S, interval: Duration) -> Self {
        Self {
            sweeper,
            store,
            interval,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Sweep on every tick until `shutdown` resolves.
    ///
    /// Runs execute one after another on the current task, so two sweeps from
    /// the same scheduler never overlap. `shutdown` is also watched while a
    /// sweep is in flight: the sweep future is dropped at its next await
    /// point and the call returns without waiting for the store. A batch that
    /// had already reached the store is applied in full or not at all.
    pub async fn run_until<F: Future<Output = ()>>(&self, shutdown: F) -> ScheduleSummary {
        let mut summary = ScheduleSummary::default();
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        info!(interval_secs = self.interval.as_secs(), "Scheduler started");

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Scheduler received shutdown signal");
                    break;
                }
                _ = ticker.tick() => {}
            }

            summary.runs += 1;
            tokio::select! {
                _ = &mut shutdown => {
                    warn!("Scheduler received shutdown signal during a sweep; abandoning it");
                    break;
                }
                result = self.sweeper.run(Utc::now(), &self.store) => match result {
                    Ok(report) => {
                        summary.shipped += report.processed() as u64;
                    }
                    Err(e) => {
                        summary.failures += 1;
                        error!(error = %e, "Sweep failed; next attempt on the following tick");
                    }
                },
            }
        }

        info!(
            runs = summary.runs,
            failures = summary.failures,
            shipped = summary.shipped,
            "Scheduler stopped"
        );
        summary
    }
}
