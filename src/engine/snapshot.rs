//! Market snapshot provider.
//!
//! Reads both book sides, the event queue and the maker's two token accounts
//! in a single `getMultipleAccounts` call, so the snapshot reflects one slot.

use std::sync::Arc;
use tracing::debug;

use crate::chain::ChainRpc;
use crate::exchange::layout::event_queue_depth;
use crate::exchange::market::{token_amount, undecodable};
use crate::exchange::slab::best_price_lots;
use crate::exchange::MarketLayout;
use crate::types::{
    BalanceSnapshot, MakerError, MarketSnapshot, OrderBookSnapshot, Side, ValidationError,
};

/// Index of the first token account in the batched read.
const WALLETS: usize = 3;

pub struct SnapshotProvider {
    rpc: Arc<dyn ChainRpc>,
    layout: Arc<MarketLayout>,
}

impl SnapshotProvider {
    pub fn new(rpc: Arc<dyn ChainRpc>, layout: Arc<MarketLayout>) -> Self {
        Self { rpc, layout }
    }

    pub fn layout(&self) -> &MarketLayout {
        &self.layout
    }

    /// Top of book, event-queue depth and balances.
    ///
    /// A missing market account is a `Network` error (the read is retried
    /// next cycle). A missing token account, bytes that don't decode and
    /// prices out of range are `Validation` errors.
    pub async fn fetch(&self) -> Result<MarketSnapshot, MakerError> {
        let layout = &self.layout;
        let keys = [
            layout.bids,
            layout.asks,
            layout.event_queue,
            layout.base_wallet,
            layout.quote_wallet,
        ];
        let accounts = self.rpc.multiple_accounts(&keys).await?;
        if accounts.len() != keys.len() {
            return Err(MakerError::Network(format!(
                "asked for {} accounts, got {}",
                keys.len(),
                accounts.len()
            )));
        }

        let mut data = Vec::with_capacity(keys.len());
        for (i, (key, account)) in keys.iter().zip(accounts).enumerate() {
            let bytes = match account {
                Some(bytes) => bytes,
                // the maker's token accounts won't appear on their own
                None if i >= WALLETS => {
                    return Err(ValidationError::MissingTokenAccount(key.to_string()).into())
                }
                None => return Err(MakerError::Network(format!("account {key} not returned"))),
            };
            data.push(bytes);
        }

        let best_bid = best_price_lots(&data[0], Side::Bid)
            .map_err(|e| undecodable(&layout.bids, e))?
            .map(|lots| layout.price_from_lots(lots))
            .transpose()?;
        let best_ask = best_price_lots(&data[1], Side::Ask)
            .map_err(|e| undecodable(&layout.asks, e))?
            .map(|lots| layout.price_from_lots(lots))
            .transpose()?;
        let queue_depth =
            event_queue_depth(&data[2]).map_err(|e| undecodable(&layout.event_queue, e))?;
        let base = token_amount(&layout.base_wallet, &data[3])?;
        let quote = token_amount(&layout.quote_wallet, &data[4])?;

        debug!(
            best_bid = ?best_bid,
            best_ask = ?best_ask,
            queue_depth,
            base,
            quote,
            "Snapshot fetched"
        );

        Ok(MarketSnapshot {
            book: OrderBookSnapshot {
                best_bid,
                best_ask,
                queue_depth,
            },
            balances: BalanceSnapshot { base, quote },
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
