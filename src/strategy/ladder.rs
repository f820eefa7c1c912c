//! Tiered ladder pricing and sizing.
//!
//! Turns top of book and maker balances into three bids and three asks
//! around the mid-price. Tiers closest to the mid carry the smallest size,
//! the farthest tiers the largest.

use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::debug;

use crate::types::{LadderOrder, LadderPlan, Side, Tier, ValidationError};

/// Basis points in one whole.
const BPS: u32 = 10_000;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// One rung of the ladder, in basis points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct TierConfig {
    /// Share of the side's balance committed to this tier.
    pub size_bps: u32,
    /// Distance from the mid-price.
    pub offset_bps: u32,
}

impl TierConfig {
    pub const fn new(size_bps: u32, offset_bps: u32) -> Self {
        Self { size_bps, offset_bps }
    }
}

/// Ladder shape, closest tier first on each side.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LadderConfig {
    pub bids: [TierConfig; 3],
    pub asks: [TierConfig; 3],
}

impl Default for LadderConfig {
    fn default() -> Self {
        let tiers = [
            TierConfig::new(1_000, 30), // 10% at 0.3%
            TierConfig::new(2_500, 60), // 25% at 0.6%
            TierConfig::new(6_500, 90), // 65% at 0.9%
        ];
        Self { bids: tiers, asks: tiers }
    }
}

impl LadderConfig {
    /// Check that the ladder can never over-allocate a balance or produce
    /// out-of-order prices.
    pub fn validate(&self) -> Result<(), String> {
        for (side, tiers) in [(Side::Bid, &self.bids), (Side::Ask, &self.asks)] {
            let total: u32 = tiers.iter().map(|t| t.size_bps).sum();
            if total > BPS {
                return Err(format!("{side} tier sizes sum to {total} bps, above {BPS}"));
            }
            if tiers[0].offset_bps == 0 {
                return Err(format!("{side} closest tier offset must be positive"));
            }
            if !tiers.windows(2).all(|w| w[0].offset_bps < w[1].offset_bps) {
                return Err(format!("{side} tier offsets must be strictly increasing"));
            }
        }
        if self.bids[2].offset_bps >= BPS {
            return Err("bid offsets must stay below 10000 bps".to_string());
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Calculator
// ---------------------------------------------------------------------------

pub struct LadderCalculator {
    config: LadderConfig,
}

impl LadderCalculator {
    pub fn new(config: LadderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LadderConfig {
        &self.config
    }

    /// Compute the six-order ladder.
    ///
    /// Bid sizes are shares of `quote_balance`, ask sizes shares of
    /// `base_balance`, both floored to whole native units.
    pub fn compute(
        &self,
        best_bid: Option<Decimal>,
        best_ask: Option<Decimal>,
        base_balance: u64,
        quote_balance: u64,
    ) -> Result<LadderPlan, ValidationError> {
        let bid = best_bid.ok_or(ValidationError::EmptyBookSide(Side::Bid))?;
        let ask = best_ask.ok_or(ValidationError::EmptyBookSide(Side::Ask))?;

        for price in [bid, ask] {
            if price <= Decimal::ZERO {
                return Err(ValidationError::NonPositivePrice(price));
            }
        }
        if bid >= ask {
            return Err(ValidationError::CrossedBook { bid, ask });
        }
        if base_balance == 0 && quote_balance == 0 {
            return Err(ValidationError::ZeroBalances);
        }

        let mid = match bid.checked_add(ask) {
            Some(sum) => sum / Decimal::TWO,
            None => bid / Decimal::TWO + ask / Decimal::TWO,
        };
        let quote_at = |factor: Decimal| {
            mid.checked_mul(factor)
                .ok_or_else(|| ValidationError::PriceOutOfRange(format!("{mid} x {factor}")))
        };

        let mut orders = Vec::with_capacity(6);
        for (tier, cfg) in Tier::ALL.into_iter().zip(&self.config.bids) {
            orders.push(LadderOrder {
                side: Side::Bid,
                tier,
                price: quote_at(Decimal::ONE - bps(cfg.offset_bps))?,
                size: share(quote_balance, cfg.size_bps),
            });
        }
        for (tier, cfg) in Tier::ALL.into_iter().zip(&self.config.asks) {
            orders.push(LadderOrder {
                side: Side::Ask,
                tier,
                price: quote_at(Decimal::ONE + bps(cfg.offset_bps))?,
                size: share(base_balance, cfg.size_bps),
            });
        }

        debug!(%mid, %bid, %ask, base_balance, quote_balance, "Ladder computed");

        Ok(LadderPlan { mid, orders })
    }
}

fn bps(value: u32) -> Decimal {
    Decimal::new(value as i64, 4)
}

/// `balance * size_bps / 10000`, floored.
fn share(balance: u64, size_bps: u32) -> u64 {
    (balance as u128 * size_bps as u128 / BPS as u128) as u64
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
