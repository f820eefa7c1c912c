//! Order submission engine.
//!
//! Turns each ladder entry into a `NewOrderV3` limit order, wraps it with
//! compute-budget instructions and sends it as its own signed transaction.
//! Submissions are strictly sequential: each one is awaited to confirmation
//! before the next is built. The first failure abandons the rest of the plan.

use std::sync::Arc;
use std::time::Duration;

use solana_sdk::compute_budget::ComputeBudgetInstruction;
use solana_sdk::instruction::Instruction;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature, Signer};
use solana_sdk::transaction::Transaction;
use tracing::{debug, info, warn};

use super::blockhash::BlockhashCell;
use crate::chain::ChainRpc;
use crate::exchange::instruction::{
    new_order_v3, NewOrderAccounts, NewOrderArgs, OrderType, SelfTradeBehavior,
    DEFAULT_MATCH_LIMIT,
};
use crate::exchange::MarketLayout;
use crate::types::{LadderOrder, LadderPlan, MakerError, Side, SubmissionError};

// ---------------------------------------------------------------------------
// Fees
// ---------------------------------------------------------------------------

/// Compute-budget policy applied to every order transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeePolicy {
    /// Compute unit limit, always set.
    pub cu_limit: u32,
    /// Micro-lamports per unit when the market is quiet. `0` omits the
    /// instruction.
    pub cu_price: u64,
    /// Micro-lamports per unit when the market is congested or listed as a
    /// priority market.
    pub priority_cu_price: u64,
    /// Event-queue depth at which the market counts as congested.
    pub priority_queue_limit: u64,
    /// The traded market is in the configured priority list.
    pub priority_market: bool,
}

impl FeePolicy {
    pub fn unit_price(&self, queue_depth: u64) -> u64 {
        if self.priority_market || queue_depth >= self.priority_queue_limit {
            self.priority_cu_price
        } else {
            self.cu_price
        }
    }

    fn instructions(&self, queue_depth: u64) -> Vec<Instruction> {
        let mut ixs = vec![ComputeBudgetInstruction::set_compute_unit_limit(self.cu_limit)];
        let price = self.unit_price(queue_depth);
        if price > 0 {
            ixs.push(ComputeBudgetInstruction::set_compute_unit_price(price));
        }
        ixs
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// An order that was sent (or would have been, in dry-run mode).
#[derive(Debug, Clone)]
pub struct PlacedOrder {
    pub order: LadderOrder,
    /// `None` in dry-run mode.
    pub signature: Option<Signature>,
}

/// The order whose submission failed and why.
#[derive(Debug)]
pub struct FailedOrder {
    pub order: LadderOrder,
    pub error: MakerError,
}

/// Outcome of submitting one ladder plan.
#[derive(Debug, Default)]
pub struct SubmissionReport {
    pub placed: Vec<PlacedOrder>,
    /// Entries that rounded to zero lots and were not sent.
    pub skipped: usize,
    pub failed: Option<FailedOrder>,
    /// Entries never attempted because an earlier one failed.
    pub abandoned: usize,
}

// ---------------------------------------------------------------------------
// Submitter
// ---------------------------------------------------------------------------

pub struct OrderSubmitter {
    rpc: Arc<dyn ChainRpc>,
    keypair: Arc<Keypair>,
    layout: Arc<MarketLayout>,
    open_orders: Pubkey,
    blockhash: Arc<BlockhashCell>,
    fees: FeePolicy,
    blockhash_max_age: Duration,
    dry_run: bool,
}

impl OrderSubmitter {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        rpc: Arc<dyn ChainRpc>,
        keypair: Arc<Keypair>,
        layout: Arc<MarketLayout>,
        open_orders: Pubkey,
        blockhash: Arc<BlockhashCell>,
        fees: FeePolicy,
        blockhash_max_age: Duration,
        dry_run: bool,
    ) -> Self {
        Self {
            rpc,
            keypair,
            layout,
            open_orders,
            blockhash,
            fees,
            blockhash_max_age,
            dry_run,
        }
    }

    /// Submit every entry of `plan` in order, stopping at the first failure.
    ///
    /// `queue_depth` is the event-queue depth from the same snapshot and
    /// drives the priority-fee decision.
    pub async fn submit_plan(&self, plan: &LadderPlan, queue_depth: u64) -> SubmissionReport {
        let mut report = SubmissionReport::default();
        let unit_price = self.fees.unit_price(queue_depth);

        info!(
            orders = plan.orders.len(),
            queue_depth,
            unit_price,
            dry_run = self.dry_run,
            "Submitting ladder"
        );

        for (i, order) in plan.orders.iter().enumerate() {
            let Some(order_ix) = self.order_instruction(order) else {
                warn!(%order, "Order rounds to zero lots, skipping");
                report.skipped += 1;
                continue;
            };

            match self.submit_one(order, order_ix, queue_depth).await {
                Ok(signature) => {
                    report.placed.push(PlacedOrder {
                        order: *order,
                        signature,
                    });
                }
                Err(error) => {
                    warn!(%order, error = %error, "Order submission failed, abandoning the rest");
                    report.abandoned = plan.orders.len() - i - 1;
                    report.failed = Some(FailedOrder {
                        order: *order,
                        error,
                    });
                    break;
                }
            }
        }

        report
    }

    /// The `NewOrderV3` instruction for one ladder entry, or `None` when its
    /// limit price or quantity rounds to zero.
    pub fn order_instruction(&self, order: &LadderOrder) -> Option<Instruction> {
        let layout = &self.layout;
        let limit_price = layout.price_to_lots(order.price);
        if limit_price == 0 {
            return None;
        }

        let (max_base_qty, max_native_quote_qty, order_payer) = match order.side {
            Side::Bid => {
                let lots = layout.base_lots_for_quote(order.size, limit_price);
                (lots, order.size, &layout.quote_wallet)
            }
            Side::Ask => {
                let lots = layout.base_lots(order.size);
                (lots, layout.quote_with_fees(lots, limit_price), &layout.base_wallet)
            }
        };
        if max_base_qty == 0 {
            return None;
        }

        let args = NewOrderArgs {
            side: order.side,
            limit_price,
            max_base_qty,
            max_native_quote_qty,
            self_trade_behavior: SelfTradeBehavior::DecrementTake,
            order_type: OrderType::Limit,
            client_order_id: uuid::Uuid::new_v4().as_u64_pair().0,
            limit: DEFAULT_MATCH_LIMIT,
        };
        debug!(?args, "Built order");

        let owner = self.keypair.pubkey();
        Some(new_order_v3(
            &layout.program_id,
            NewOrderAccounts {
                market: &layout.address,
                open_orders: &self.open_orders,
                request_queue: &layout.request_queue,
                event_queue: &layout.event_queue,
                bids: &layout.bids,
                asks: &layout.asks,
                order_payer,
                owner: &owner,
                base_vault: &layout.base_vault,
                quote_vault: &layout.quote_vault,
            },
            &args,
        ))
    }

    async fn submit_one(
        &self,
        order: &LadderOrder,
        order_ix: Instruction,
        queue_depth: u64,
    ) -> Result<Option<Signature>, MakerError> {
        let mut ixs = self.fees.instructions(queue_depth);
        ixs.push(order_ix);

        if self.dry_run {
            info!(
                %order,
                instructions = ixs.len(),
                market = %self.layout.name,
                "[DRY RUN] Would place order"
            );
            return Ok(None);
        }

        let handle = self.blockhash.current().ok_or(SubmissionError::NoBlockhash)?;
        let age = handle.age();
        if age > self.blockhash_max_age {
            warn!(
                age_ms = age.as_millis() as u64,
                hash = %handle.hash,
                "Blockhash is stale, using it anyway"
            );
        }

        let payer = self.keypair.pubkey();
        let mut tx = Transaction::new_with_payer(&ixs, Some(&payer));
        tx.try_sign(&[self.keypair.as_ref()], handle.hash)
            .map_err(|e| SubmissionError::Signing(e.to_string()))?;

        let signature = self.rpc.send_and_confirm(&tx).await?;
        info!(%order, %signature, "Order placed");
        Ok(Some(signature))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
