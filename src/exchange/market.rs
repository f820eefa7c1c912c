//! Resolved market layout and lot conversions.

use rust_decimal::prelude::*;
use solana_sdk::pubkey::Pubkey;
use spl_associated_token_account::get_associated_token_address;
use spl_token::solana_program::program_pack::Pack;
use spl_token::state::{Account as TokenAccount, Mint};
use tracing::info;

use super::layout::MarketState;
use super::DecodeError;
use crate::chain::ChainRpc;
use crate::types::{MakerError, MarketDescriptor, ValidationError};

/// Largest mint precision whose scale factor fits in a `u64`.
const MAX_DECIMALS: u8 = 19;

/// Everything about the traded market that stays fixed for the process
/// lifetime: program accounts, lot sizes, decimals and the maker's token
/// accounts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketLayout {
    pub name: String,
    pub program_id: Pubkey,
    pub address: Pubkey,
    pub bids: Pubkey,
    pub asks: Pubkey,
    pub event_queue: Pubkey,
    pub request_queue: Pubkey,
    pub base_vault: Pubkey,
    pub quote_vault: Pubkey,
    pub base_mint: Pubkey,
    pub quote_mint: Pubkey,
    pub base_lot_size: u64,
    pub quote_lot_size: u64,
    pub base_decimals: u8,
    pub quote_decimals: u8,
    pub fee_rate_bps: u64,
    /// Maker's associated token account for the base mint.
    pub base_wallet: Pubkey,
    /// Maker's associated token account for the quote mint.
    pub quote_wallet: Pubkey,
}

impl MarketLayout {
    /// Read the market and its mints from chain.
    pub async fn load(
        rpc: &dyn ChainRpc,
        descriptor: &MarketDescriptor,
        program_id: Pubkey,
        owner: &Pubkey,
    ) -> Result<Self, MakerError> {
        let market_data = rpc
            .multiple_accounts(&[descriptor.address])
            .await?
            .into_iter()
            .next()
            .flatten()
            .ok_or_else(|| {
                MakerError::Config(format!("market account {} not found", descriptor.address))
            })?;
        let state = MarketState::decode(&market_data)
            .map_err(|e| undecodable(&descriptor.address, e))?;

        if state.own_address != descriptor.address {
            return Err(MakerError::Config(format!(
                "market account {} reports own address {}",
                descriptor.address, state.own_address
            )));
        }
        for (label, expected, actual) in [
            ("base", descriptor.base_mint, state.base_mint),
            ("quote", descriptor.quote_mint, state.quote_mint),
        ] {
            if let Some(expected) = expected {
                if expected != actual {
                    return Err(MakerError::Config(format!(
                        "{} {label} mint is {actual}, markets list says {expected}",
                        descriptor.name
                    )));
                }
            }
        }

        let mints = rpc
            .multiple_accounts(&[state.base_mint, state.quote_mint])
            .await?;
        let mut decimals = [0u8; 2];
        for (i, (mint, data)) in [state.base_mint, state.quote_mint]
            .iter()
            .zip(mints)
            .enumerate()
        {
            let data = data.ok_or_else(|| MakerError::Config(format!("mint {mint} not found")))?;
            decimals[i] = Mint::unpack(&data)
                .map_err(|e| undecodable(mint, DecodeError::Invalid(e.to_string())))?
                .decimals;
            if pow10(decimals[i]).is_none() {
                return Err(MakerError::Config(format!(
                    "mint {mint} has {} decimals, at most {MAX_DECIMALS} are supported",
                    decimals[i]
                )));
            }
        }

        let layout = Self {
            name: descriptor.name.clone(),
            program_id,
            address: descriptor.address,
            bids: state.bids,
            asks: state.asks,
            event_queue: state.event_queue,
            request_queue: state.request_queue,
            base_vault: state.base_vault,
            quote_vault: state.quote_vault,
            base_mint: state.base_mint,
            quote_mint: state.quote_mint,
            base_lot_size: state.base_lot_size,
            quote_lot_size: state.quote_lot_size,
            base_decimals: decimals[0],
            quote_decimals: decimals[1],
            fee_rate_bps: state.fee_rate_bps,
            base_wallet: get_associated_token_address(owner, &state.base_mint),
            quote_wallet: get_associated_token_address(owner, &state.quote_mint),
        };

        info!(
            market = %layout.name,
            address = %layout.address,
            base_lot = layout.base_lot_size,
            quote_lot = layout.quote_lot_size,
            base_decimals = layout.base_decimals,
            quote_decimals = layout.quote_decimals,
            "Market loaded"
        );

        Ok(layout)
    }

    /// Lot price → UI price (quote per base). Fails when a resting price is
    /// too large to represent.
    pub fn price_from_lots(&self, lots: u64) -> Result<Decimal, ValidationError> {
        let out_of_range = || ValidationError::PriceOutOfRange(format!("{lots} lots"));
        let numerator = Decimal::from(lots)
            .checked_mul(Decimal::from(self.quote_lot_size))
            .and_then(|n| n.checked_mul(pow10(self.base_decimals)?))
            .ok_or_else(out_of_range)?;
        Decimal::from(self.base_lot_size)
            .checked_mul(pow10(self.quote_decimals).ok_or_else(out_of_range)?)
            .and_then(|d| numerator.checked_div(d))
            .ok_or_else(out_of_range)
    }

    /// UI price → lot price, rounded to nearest. Zero when the price is below
    /// half a tick or does not fit in a `u64` lot price.
    pub fn price_to_lots(&self, price: Decimal) -> u64 {
        let lots = pow10(self.quote_decimals)
            .and_then(|q| price.checked_mul(q))
            .and_then(|n| n.checked_mul(Decimal::from(self.base_lot_size)))
            .zip(
                pow10(self.base_decimals)
                    .and_then(|b| b.checked_mul(Decimal::from(self.quote_lot_size))),
            )
            .and_then(|(n, d)| n.checked_div(d));
        lots.and_then(|l| l.round().to_u64()).unwrap_or(0)
    }

    /// Native base amount → whole base lots.
    pub fn base_lots(&self, native: u64) -> u64 {
        native / self.base_lot_size
    }

    /// Base lots a native quote budget buys at `price_lots`.
    pub fn base_lots_for_quote(&self, quote_native: u64, price_lots: u64) -> u64 {
        let lot_cost = price_lots as u128 * self.quote_lot_size as u128;
        if lot_cost == 0 {
            return 0;
        }
        (quote_native as u128 / lot_cost).min(u64::MAX as u128) as u64
    }

    /// Quote needed for `base_lots` at `price_lots`, fees included, rounded up.
    pub fn quote_with_fees(&self, base_lots: u64, price_lots: u64) -> u64 {
        let gross = base_lots as u128 * price_lots as u128 * self.quote_lot_size as u128;
        let with_fees = (gross * (10_000 + self.fee_rate_bps as u128)).div_ceil(10_000);
        with_fees.min(u64::MAX as u128) as u64
    }
}

/// Native amount held by an SPL token account.
pub fn token_amount(account: &Pubkey, data: &[u8]) -> Result<u64, MakerError> {
    TokenAccount::unpack(data)
        .map(|a| a.amount)
        .map_err(|e| undecodable(account, DecodeError::Invalid(e.to_string())))
}

pub(crate) fn undecodable(account: &Pubkey, err: DecodeError) -> MakerError {
    ValidationError::UndecodableAccount {
        account: account.to_string(),
        reason: err.to_string(),
    }
    .into()
}

fn pow10(exp: u8) -> Option<Decimal> {
    10u64.checked_pow(exp as u32).map(Decimal::from)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
