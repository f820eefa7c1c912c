//! Status API route handlers.
//!
//! All endpoints return JSON except `/health`. State is shared via
//! `Arc<StatusState>`, written by the control loop after every cycle.

use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::engine::blockhash::BlockhashCell;
use crate::engine::maker::{CycleOutcome, CycleReport};

/// Reports kept for `/api/cycles`.
const RECENT_CYCLES: usize = 100;

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// Running totals across all cycles.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Totals {
    pub cycles: u64,
    pub cycles_completed: u64,
    pub cycles_skipped: u64,
    pub cycles_aborted: u64,
    pub orders_submitted: u64,
    pub orders_failed: u64,
}

pub struct StatusState {
    market: String,
    started: DateTime<Utc>,
    blockhash: Arc<BlockhashCell>,
    totals: RwLock<Totals>,
    recent: RwLock<VecDeque<CycleReport>>,
}

impl StatusState {
    pub fn new(market: impl Into<String>, blockhash: Arc<BlockhashCell>) -> Self {
        Self {
            market: market.into(),
            started: Utc::now(),
            blockhash,
            totals: RwLock::new(Totals::default()),
            recent: RwLock::new(VecDeque::with_capacity(RECENT_CYCLES)),
        }
    }

    /// Fold one cycle report into the totals and the recent list.
    pub async fn record(&self, report: CycleReport) {
        {
            let mut totals = self.totals.write().await;
            totals.cycles += 1;
            match report.outcome {
                CycleOutcome::Completed => totals.cycles_completed += 1,
                CycleOutcome::Skipped { .. } => totals.cycles_skipped += 1,
                CycleOutcome::Aborted { .. } => totals.cycles_aborted += 1,
            }
            totals.orders_submitted += report.submitted as u64;
            totals.orders_failed += report.failed as u64;
        }

        let mut recent = self.recent.write().await;
        if recent.len() == RECENT_CYCLES {
            recent.pop_front();
        }
        recent.push_back(report);
    }

    pub async fn totals(&self) -> Totals {
        self.totals.read().await.clone()
    }

    /// Recent cycle reports, newest first.
    pub async fn recent_cycles(&self) -> Vec<CycleReport> {
        self.recent.read().await.iter().rev().cloned().collect()
    }
}

pub type AppState = Arc<StatusState>;

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    pub market: String,
    pub uptime_secs: i64,
    #[serde(flatten)]
    pub totals: Totals,
    /// `None` until the first blockhash has been fetched.
    pub blockhash_age_ms: Option<u64>,
    pub last_cycle: Option<CycleReport>,
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

/// GET /api/status
pub async fn get_status(State(state): State<AppState>) -> Json<StatusResponse> {
    let totals = state.totals().await;
    let last_cycle = state.recent.read().await.back().cloned();
    let blockhash_age_ms = state
        .blockhash
        .current()
        .map(|h| h.age().as_millis() as u64);

    Json(StatusResponse {
        market: state.market.clone(),
        uptime_secs: (Utc::now() - state.started).num_seconds(),
        totals,
        blockhash_age_ms,
        last_cycle,
    })
}

/// GET /api/cycles
pub async fn get_cycles(State(state): State<AppState>) -> Json<Vec<CycleReport>> {
    Json(state.recent_cycles().await)
}

/// GET /health
pub async fn health() -> (StatusCode, &'static str) {
    (StatusCode::OK, "ok")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
