//! The order lifecycle sweep.
//!
//! A sweep fetches every `Delivered` order, keeps the ones whose
//! `deliveredAt` lies strictly before `now - grace_period`, and moves them to
//! `Shipped` in one atomic batch. It is a function of `now` and the store, so
//! it knows nothing about how it gets triggered; see [`crate::scheduler`].

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{Instrument, debug, info, info_span};
use uuid::Uuid;

use crate::error::{Result, SweeperError};
use crate::order::{Order, OrderStatus};
use crate::store::{BatchUpdate, OrderQuery, OrderStore};

/// Days an order stays `Delivered` before it may be shipped.
pub const GRACE_PERIOD_DAYS: i64 = 3;

/// Tunables for a single sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepSettings {
    pub grace_period: Duration,
    /// Ask the store to apply the cutoff too. The in-process check still runs.
    pub query_cutoff: bool,
    /// Select orders but skip the batch write.
    pub dry_run: bool,
}

impl Default for SweepSettings {
    fn default() -> Self {
        Self {
            grace_period: Duration::days(GRACE_PERIOD_DAYS),
            query_cutoff: false,
            dry_run: false,
        }
    }
}

/// Why an order was left alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    NotDelivered,
    MissingDeliveredAt,
    MalformedDeliveredAt,
    WithinGracePeriod,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eligibility {
    Ship,
    Skip(SkipReason),
}

/// Decide whether `order` should move to `Shipped` given `cutoff`.
///
/// Only a `Delivered` order whose `deliveredAt` resolves to an instant
/// strictly before `cutoff` qualifies.
pub fn assess(order: &Order, cutoff: DateTime<Utc>) -> Eligibility {
    if order.status != OrderStatus::Delivered {
        return Eligibility::Skip(SkipReason::NotDelivered);
    }
    let Some(delivered_at) = &order.delivered_at else {
        return Eligibility::Skip(SkipReason::MissingDeliveredAt);
    };
    match delivered_at.resolve() {
        None => Eligibility::Skip(SkipReason::MalformedDeliveredAt),
        Some(ts) if ts < cutoff => Eligibility::Ship,
        Some(_) => Eligibility::Skip(SkipReason::WithinGracePeriod),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedOrder {
    pub order_id: String,
    pub reason: SkipReason,
}

/// How a sweep ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SweepOutcome {
    /// The query returned no `Delivered` orders.
    NothingDelivered,
    /// Orders were fetched but none passed the grace period check.
    NoneEligible,
    /// The batch was committed.
    Shipped,
    /// Eligible orders were found but nothing was written.
    DryRun,
}

/// Structured record of one sweep, produced on success.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepReport {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub cutoff: DateTime<Utc>,
    pub grace_period_days: i64,
    pub fetched: usize,
    /// Ids moved to `Shipped`, or that would have been in a dry run.
    pub shipped: Vec<String>,
    pub skipped: Vec<SkippedOrder>,
    pub outcome: SweepOutcome,
    /// Store time of the batch commit; also the `updatedAt` it assigned.
    pub commit_time: Option<DateTime<Utc>>,
}

impl SweepReport {
    /// Number of orders actually written.
    pub fn processed(&self) -> usize {
        match self.outcome {
            SweepOutcome::Shipped => self.shipped.len(),
            _ => 0,
        }
    }
}

/// Runs sweeps with a fixed set of [`SweepSettings`].
#[derive(Debug, Clone, Default)]
pub struct Sweeper {
    settings: SweepSettings,
}

impl Sweeper {
    pub fn new(settings: SweepSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &SweepSettings {
        &self.settings
    }

    /// Run one sweep as of `now`.
    ///
    /// A query or commit failure fails the whole run. When the commit fails
    /// the store has applied none of the batch.
    pub async fn run<S: OrderStore>(&self, now: DateTime<Utc>, store: &S) -> Result<SweepReport> {
        let run_id = Uuid::new_v4().to_string();
        let span = info_span!("sweep", run_id = %run_id);
        self.sweep(run_id, now, store).instrument(span).await
    }

    async fn sweep<S: OrderStore>(
        &self,
        run_id: String,
        now: DateTime<Utc>,
        store: &S,
    ) -> Result<SweepReport> {
        let cutoff = now.checked_sub_signed(self.settings.grace_period).ok_or_else(|| {
            SweeperError::Config(format!(
                "grace period of {} days reaches past the earliest representable time",
                self.settings.grace_period.num_days()
            ))
        })?;
        let days = self.settings.grace_period.num_days();

        let mut query = OrderQuery::with_status(OrderStatus::Delivered);
        if self.settings.query_cutoff {
            query = query.delivered_before(cutoff);
        }
        debug!(%cutoff, pushdown = self.settings.query_cutoff, "querying delivered orders");
        let orders = store.query(&query).await?;

        let mut report = SweepReport {
            run_id,
            started_at: now,
            cutoff,
            grace_period_days: days,
            fetched: orders.len(),
            shipped: Vec::new(),
            skipped: Vec::new(),
            outcome: SweepOutcome::NothingDelivered,
            commit_time: None,
        };

        if orders.is_empty() {
            info!("No delivered orders to process.");
            return Ok(report);
        }

        let mut batch = BatchUpdate::new();
        for order in &orders {
            match assess(order, cutoff) {
                Eligibility::Ship => {
                    info!(order_id = %order.id, "Order {} will be marked as Shipped.", order.id);
                    batch.set_status(order.id.clone(), OrderStatus::Shipped);
                    report.shipped.push(order.id.clone());
                }
                Eligibility::Skip(reason) => {
                    debug!(order_id = %order.id, ?reason, "order skipped");
                    report.skipped.push(SkippedOrder {
                        order_id: order.id.clone(),
                        reason,
                    });
                }
            }
        }

        if batch.is_empty() {
            info!("No orders met the {days}-day criteria.");
            report.outcome = SweepOutcome::NoneEligible;
            return Ok(report);
        }

        if self.settings.dry_run {
            info!("Dry run: {} orders would be marked as Shipped.", batch.len());
            report.outcome = SweepOutcome::DryRun;
            return Ok(report);
        }

        let committed = store.commit(&batch).await?;
        info!(
            commit_time = %committed.commit_time,
            "Successfully processed and marked {} orders as Shipped.",
            batch.len()
        );
        report.outcome = SweepOutcome::Shipped;
        report.commit_time = Some(committed.commit_time);
        Ok(report)
    }
}

/// Run a sweep with the default three-day grace period.
pub async fn run<S: OrderStore>(now: DateTime<Utc>, store: &S) -> Result<SweepReport> {
    Sweeper::default().run(now, store).await
}
