//! Dex program integration.
//!
//! Decodes the order-book program's accounts (market state, critbit slabs,
//! event queue) and encodes the instructions the maker sends. The on-chain
//! program is the Serum v3 / OpenBook v1 central limit order book.

pub mod instruction;
pub mod layout;
pub mod market;
pub mod slab;

use solana_sdk::pubkey;
use solana_sdk::pubkey::Pubkey;

pub use market::MarketLayout;

/// Order-book program on mainnet.
pub const MAINNET_PROGRAM_ID: Pubkey = pubkey!("srmqPvymJeFKQ4zGQed1GFppgkRHL9kaELCbyksJtPX");
/// Order-book program on devnet and other test clusters.
pub const DEVNET_PROGRAM_ID: Pubkey = pubkey!("EoTcMgcDRTJVZDMZWBoU6rhYHZfkNTVEAfz3uUJRcYGj");

/// Default program for a cluster name.
pub fn default_program_id(cluster: &str) -> Pubkey {
    if cluster == "mainnet" {
        MAINNET_PROGRAM_ID
    } else {
        DEVNET_PROGRAM_ID
    }
}

/// Why an account's bytes could not be interpreted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("account data too short: need {needed} bytes, have {actual}")]
    TooShort { needed: usize, actual: usize },

    #[error("missing account head padding")]
    BadPadding,

    #[error("unexpected account flags {actual:#x}, expected {expected:#x} set")]
    UnexpectedFlags { expected: u64, actual: u64 },

    #[error("{0}")]
    Invalid(String),
}
