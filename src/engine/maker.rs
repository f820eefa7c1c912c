//! Control loop.
//!
//! One cycle: snapshot → ladder → sequential submission. Errors never leave
//! a cycle; each one ends as a `CycleReport` and the loop sleeps until the
//! next interval or the stop signal.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

use super::snapshot::SnapshotProvider;
use super::submitter::{OrderSubmitter, SubmissionReport};
use crate::status::StatusState;
use crate::strategy::ladder::LadderCalculator;
use crate::types::MakerError;

// ---------------------------------------------------------------------------
// Cycle report
// ---------------------------------------------------------------------------

/// How a cycle ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum CycleOutcome {
    /// Every order of the plan was placed or skipped as dust.
    Completed,
    /// Nothing was submitted: the snapshot failed or the ladder was invalid.
    Skipped { kind: String, reason: String },
    /// A submission failed; the remaining orders were abandoned.
    Aborted { kind: String, reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub cycle: u64,
    pub timestamp: DateTime<Utc>,
    pub mid: Option<Decimal>,
    pub submitted: usize,
    pub skipped: usize,
    pub failed: usize,
    pub abandoned: usize,
    pub outcome: CycleOutcome,
}

impl CycleReport {
    fn skipped(cycle: u64, error: &MakerError) -> Self {
        Self {
            cycle,
            timestamp: Utc::now(),
            mid: None,
            submitted: 0,
            skipped: 0,
            failed: 0,
            abandoned: 0,
            outcome: CycleOutcome::Skipped {
                kind: error.kind().to_string(),
                reason: error.to_string(),
            },
        }
    }

    fn from_submission(cycle: u64, mid: Decimal, report: &SubmissionReport) -> Self {
        let outcome = match &report.failed {
            None => CycleOutcome::Completed,
            Some(f) => CycleOutcome::Aborted {
                kind: f.error.kind().to_string(),
                reason: f.error.to_string(),
            },
        };
        Self {
            cycle,
            timestamp: Utc::now(),
            mid: Some(mid),
            submitted: report.placed.len(),
            skipped: report.skipped,
            failed: usize::from(report.failed.is_some()),
            abandoned: report.abandoned,
            outcome,
        }
    }
}

// ---------------------------------------------------------------------------
// Maker
// ---------------------------------------------------------------------------

pub struct MarketMaker {
    snapshots: SnapshotProvider,
    calculator: LadderCalculator,
    submitter: OrderSubmitter,
    interval: Duration,
    status: Option<Arc<StatusState>>,
    cycle: u64,
}

impl MarketMaker {
    pub fn new(
        snapshots: SnapshotProvider,
        calculator: LadderCalculator,
        submitter: OrderSubmitter,
        interval: Duration,
    ) -> Self {
        Self {
            snapshots,
            calculator,
            submitter,
            interval,
            status: None,
            cycle: 0,
        }
    }

    /// Publish every cycle report to the status server.
    pub fn with_status(mut self, status: Arc<StatusState>) -> Self {
        self.status = Some(status);
        self
    }

    /// Run one snapshot → ladder → submit pass.
    pub async fn run_cycle(&mut self) -> CycleReport {
        self.cycle += 1;
        let cycle = self.cycle;
        info!(cycle, market = %self.snapshots.layout().name, "Cycle starting");

        let report = match self.snapshots.fetch().await {
            Err(e) => CycleReport::skipped(cycle, &e),
            Ok(snapshot) => {
                let plan = self.calculator.compute(
                    snapshot.book.best_bid,
                    snapshot.book.best_ask,
                    snapshot.balances.base,
                    snapshot.balances.quote,
                );
                match plan {
                    Err(e) => CycleReport::skipped(cycle, &MakerError::from(e)),
                    Ok(plan) => {
                        for order in &plan.orders {
                            info!(%order, "Ladder order");
                        }
                        let submission = self
                            .submitter
                            .submit_plan(&plan, snapshot.book.queue_depth)
                            .await;
                        CycleReport::from_submission(cycle, plan.mid, &submission)
                    }
                }
            }
        };

        match &report.outcome {
            CycleOutcome::Completed => info!(
                cycle,
                mid = ?report.mid,
                submitted = report.submitted,
                skipped = report.skipped,
                "Cycle complete"
            ),
            CycleOutcome::Skipped { kind, reason } => {
                warn!(cycle, kind = %kind, reason = %reason, "Cycle skipped, retrying next interval")
            }
            CycleOutcome::Aborted { kind, reason } => warn!(
                cycle,
                kind = %kind,
                reason = %reason,
                submitted = report.submitted,
                abandoned = report.abandoned,
                "Cycle aborted, continuing"
            ),
        }

        if let Some(status) = &self.status {
            status.record(report.clone()).await;
        }

        report
    }

    /// Cycle until `shutdown` flips to `true`. The stop signal is honoured
    /// between cycles and during the sleep.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!(
            interval_ms = self.interval.as_millis() as u64,
            market = %self.snapshots.layout().name,
            "Market maker running"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            self.run_cycle().await;

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!(cycles = self.cycle, "Market maker stopped");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
