//! Shared types for the ladder maker.
//!
//! These types form the data model used across all modules. Snapshot and
//! plan types are recreated every cycle; the market descriptor and the
//! blockhash handle live for the whole process.

use rust_decimal::Decimal;
use serde::Serialize;
use solana_sdk::hash::Hash;
use solana_sdk::pubkey::Pubkey;
use std::fmt;
use std::time::{Duration, Instant};

// ---------------------------------------------------------------------------
// Market
// ---------------------------------------------------------------------------

/// A tradeable market from the static markets list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketDescriptor {
    pub name: String,
    /// Order-book (market state) account.
    pub address: Pubkey,
    /// Dex program owning the market. `None` means "use the configured default".
    pub program_id: Option<Pubkey>,
    /// Expected base mint, checked against the on-chain market when present.
    pub base_mint: Option<Pubkey>,
    /// Expected quote mint, checked against the on-chain market when present.
    pub quote_mint: Option<Pubkey>,
}

impl fmt::Display for MarketDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.address)
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Order side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Bid,
    Ask,
}

impl Side {
    /// Wire value used by the dex program (`0` = bid, `1` = ask).
    pub fn as_u32(&self) -> u32 {
        match self {
            Side::Bid => 0,
            Side::Ask => 1,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Bid => write!(f, "bid"),
            Side::Ask => write!(f, "ask"),
        }
    }
}

/// Position of an order within its side of the ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Closest,
    Middle,
    Farthest,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::Closest, Tier::Middle, Tier::Farthest];
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::Closest => write!(f, "closest"),
            Tier::Middle => write!(f, "middle"),
            Tier::Farthest => write!(f, "farthest"),
        }
    }
}

// ---------------------------------------------------------------------------
// Snapshots
// ---------------------------------------------------------------------------

/// Top of book. Either side may be empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderBookSnapshot {
    pub best_bid: Option<Decimal>,
    pub best_ask: Option<Decimal>,
    /// Number of unconsumed events in the market's event queue.
    pub queue_depth: u64,
}

/// Maker token balances in native units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BalanceSnapshot {
    pub base: u64,
    pub quote: u64,
}

/// Everything one cycle needs, read at a single slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarketSnapshot {
    pub book: OrderBookSnapshot,
    pub balances: BalanceSnapshot,
}

// ---------------------------------------------------------------------------
// Ladder
// ---------------------------------------------------------------------------

/// One limit order of the ladder.
///
/// `size` is a native quote amount (the budget to spend) for bids and a
/// native base amount for asks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LadderOrder {
    pub side: Side,
    pub tier: Tier,
    pub price: Decimal,
    pub size: u64,
}

impl fmt::Display for LadderOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} @ {}", self.tier, self.side, self.size, self.price)
    }
}

/// The six orders of one cycle, in submission order: bids closest to
/// farthest, then asks closest to farthest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LadderPlan {
    pub mid: Decimal,
    pub orders: Vec<LadderOrder>,
}

impl LadderPlan {
    pub fn bids(&self) -> impl Iterator<Item = &LadderOrder> {
        self.orders.iter().filter(|o| o.side == Side::Bid)
    }

    pub fn asks(&self) -> impl Iterator<Item = &LadderOrder> {
        self.orders.iter().filter(|o| o.side == Side::Ask)
    }
}

// ---------------------------------------------------------------------------
// Blockhash
// ---------------------------------------------------------------------------

/// A finalized blockhash and the last block height at which it is valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockhashHandle {
    pub hash: Hash,
    pub last_valid_block_height: u64,
    pub fetched_at: Instant,
}

impl BlockhashHandle {
    pub fn new(hash: Hash, last_valid_block_height: u64) -> Self {
        Self {
            hash,
            last_valid_block_height,
            fetched_at: Instant::now(),
        }
    }

    pub fn age(&self) -> Duration {
        self.fetched_at.elapsed()
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors surfaced by the maker's core operations.
#[derive(Debug, thiserror::Error)]
pub enum MakerError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Submission error: {0}")]
    Submission(#[from] SubmissionError),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl MakerError {
    /// Short label for structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            MakerError::Network(_) => "network",
            MakerError::Validation(_) => "validation",
            MakerError::Submission(_) => "submission",
            MakerError::Config(_) => "config",
        }
    }
}

/// Inputs that make pricing or sizing meaningless.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{0} side of the order book is empty")]
    EmptyBookSide(Side),

    #[error("order book is crossed: best bid {bid} >= best ask {ask}")]
    CrossedBook { bid: Decimal, ask: Decimal },

    #[error("non-positive price {0}")]
    NonPositivePrice(Decimal),

    #[error("base and quote balances are both zero")]
    ZeroBalances,

    #[error("account {account} could not be decoded: {reason}")]
    UndecodableAccount { account: String, reason: String },

    #[error("price out of range: {0}")]
    PriceOutOfRange(String),

    #[error("token account {0} does not exist")]
    MissingTokenAccount(String),
}

/// Why a single order transaction did not land.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmissionError {
    #[error("no blockhash has been fetched yet")]
    NoBlockhash,

    #[error("blockhash expired before inclusion: {0}")]
    BlockhashExpired(String),

    #[error("insufficient funds: {0}")]
    InsufficientFunds(String),

    #[error("transaction rejected: {0}")]
    Rejected(String),

    #[error("failed to sign transaction: {0}")]
    Signing(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
