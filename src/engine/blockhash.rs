//! Blockhash refresher.
//!
//! Keeps one process-wide blockhash current on a short tick. The handle lives
//! in a `watch` channel owned by `BlockhashCell`: the refresher replaces the
//! whole value, readers take a copy of whatever was published last. A failed
//! fetch leaves the previous handle in place.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use crate::chain::ChainRpc;
use crate::types::BlockhashHandle;

// ---------------------------------------------------------------------------
// Cell
// ---------------------------------------------------------------------------

/// Single-value cell holding the latest blockhash. Empty until the first
/// successful fetch.
#[derive(Debug)]
pub struct BlockhashCell {
    tx: watch::Sender<Option<BlockhashHandle>>,
}

impl Default for BlockhashCell {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockhashCell {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx }
    }

    /// Replace the current handle.
    pub fn publish(&self, handle: BlockhashHandle) {
        self.tx.send_replace(Some(handle));
    }

    /// Copy of the latest handle, if any.
    pub fn current(&self) -> Option<BlockhashHandle> {
        *self.tx.borrow()
    }

    /// Receiver notified on every publish.
    pub fn subscribe(&self) -> watch::Receiver<Option<BlockhashHandle>> {
        self.tx.subscribe()
    }
}

// ---------------------------------------------------------------------------
// Refresher
// ---------------------------------------------------------------------------

pub struct BlockhashRefresher {
    rpc: Arc<dyn ChainRpc>,
    cell: Arc<BlockhashCell>,
    tick: Duration,
}

impl BlockhashRefresher {
    pub fn new(rpc: Arc<dyn ChainRpc>, cell: Arc<BlockhashCell>, tick: Duration) -> Self {
        Self { rpc, cell, tick }
    }

    /// Fetch once and publish on success. Returns whether the cell was updated.
    pub async fn refresh_once(&self) -> bool {
        match self.rpc.latest_blockhash().await {
            Ok((hash, last_valid_block_height)) => {
                self.cell
                    .publish(BlockhashHandle::new(hash, last_valid_block_height));
                debug!(%hash, last_valid_block_height, "Blockhash refreshed");
                true
            }
            Err(e) => {
                error!(error = %e, "Couldn't get blockhash, keeping previous");
                false
            }
        }
    }

    /// Refresh on every tick until `shutdown` flips to `true`. The first tick
    /// fires immediately.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(self.tick);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(tick_ms = self.tick.as_millis() as u64, "Blockhash refresher started");

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.refresh_once().await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Blockhash refresher stopped");
    }

    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
