//! In-memory chain for integration testing.
//!
//! Serves one market's accounts as real dex/SPL byte layouts, accepts
//! transactions, and records everything sent. Book levels, balances, and
//! failures are controllable from test code.

use async_trait::async_trait;
use solana_sdk::hash::Hash;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::Transaction;
use spl_associated_token_account::get_associated_token_address;
use spl_token::solana_program::program_pack::Pack;
use spl_token::state::{Account as TokenAccount, AccountState, Mint};
use std::sync::Mutex;

use ladder_maker::chain::ChainRpc;
use ladder_maker::exchange::layout::{flags, HEAD_PADDING, MARKET_STATE_LEN, TAIL_PADDING_LEN};
use ladder_maker::exchange::slab::NODE_LEN;
use ladder_maker::types::{MakerError, MarketDescriptor, SubmissionError};

const LEAF: u32 = 2;

/// On-chain addresses of the mock market.
#[derive(Debug, Clone)]
pub struct MarketKeys {
    pub program_id: Pubkey,
    pub market: Pubkey,
    pub bids: Pubkey,
    pub asks: Pubkey,
    pub event_queue: Pubkey,
    pub request_queue: Pubkey,
    pub base_vault: Pubkey,
    pub quote_vault: Pubkey,
    pub base_mint: Pubkey,
    pub quote_mint: Pubkey,
}

impl MarketKeys {
    fn new() -> Self {
        Self {
            program_id: Pubkey::new_unique(),
            market: Pubkey::new_unique(),
            bids: Pubkey::new_unique(),
            asks: Pubkey::new_unique(),
            event_queue: Pubkey::new_unique(),
            request_queue: Pubkey::new_unique(),
            base_vault: Pubkey::new_unique(),
            quote_vault: Pubkey::new_unique(),
            base_mint: Pubkey::new_unique(),
            quote_mint: Pubkey::new_unique(),
        }
    }
}

#[derive(Debug, Default)]
struct Book {
    bids: Vec<u64>,
    asks: Vec<u64>,
    queue_depth: u64,
    base_balance: u64,
    quote_balance: u64,
}

/// A deterministic `ChainRpc` for one SOL/USDC-like market: base lot 1e6,
/// quote lot 100, 9/6 decimals, so one price lot is 0.1.
pub struct MockChain {
    pub keys: MarketKeys,
    owner: Pubkey,
    book: Mutex<Book>,
    blockhashes: Mutex<Vec<Result<Hash, String>>>,
    sent: Mutex<Vec<Transaction>>,
    /// Index (0-based, over all sends) of the transaction to reject.
    reject_send: Mutex<Option<usize>>,
    fail_reads: Mutex<bool>,
    existing_open_orders: Mutex<Vec<Pubkey>>,
}

impl MockChain {
    pub fn new(owner: Pubkey) -> Self {
        Self {
            keys: MarketKeys::new(),
            owner,
            book: Mutex::new(Book::default()),
            blockhashes: Mutex::new(Vec::new()),
            sent: Mutex::new(Vec::new()),
            reject_send: Mutex::new(None),
            fail_reads: Mutex::new(false),
            existing_open_orders: Mutex::new(Vec::new()),
        }
    }

    pub fn descriptor(&self) -> MarketDescriptor {
        MarketDescriptor {
            name: "SOL/USDC".to_string(),
            address: self.keys.market,
            program_id: Some(self.keys.program_id),
            base_mint: Some(self.keys.base_mint),
            quote_mint: Some(self.keys.quote_mint),
        }
    }

    /// Resting prices in lots per side.
    pub fn set_book(&self, bids: &[u64], asks: &[u64]) {
        let mut book = self.book.lock().unwrap();
        book.bids = bids.to_vec();
        book.asks = asks.to_vec();
    }

    pub fn set_balances(&self, base: u64, quote: u64) {
        let mut book = self.book.lock().unwrap();
        book.base_balance = base;
        book.quote_balance = quote;
    }

    pub fn set_queue_depth(&self, depth: u64) {
        self.book.lock().unwrap().queue_depth = depth;
    }

    /// Queue blockhash responses; once drained the last one repeats.
    pub fn push_blockhash(&self, response: Result<Hash, String>) {
        self.blockhashes.lock().unwrap().push(response);
    }

    pub fn reject_send_at(&self, index: usize) {
        *self.reject_send.lock().unwrap() = Some(index);
    }

    pub fn set_fail_reads(&self, fail: bool) {
        *self.fail_reads.lock().unwrap() = fail;
    }

    pub fn add_open_orders(&self, key: Pubkey) {
        self.existing_open_orders.lock().unwrap().push(key);
    }

    pub fn sent(&self) -> Vec<Transaction> {
        self.sent.lock().unwrap().clone()
    }

    // -- account bytes --------------------------------------------------

    fn account(&self, key: &Pubkey) -> Option<Vec<u8>> {
        let k = &self.keys;
        let book = self.book.lock().unwrap();
        if *key == k.market {
            Some(self.market_state())
        } else if *key == k.bids {
            Some(slab(flags::BIDS, &book.bids))
        } else if *key == k.asks {
            Some(slab(flags::ASKS, &book.asks))
        } else if *key == k.event_queue {
            Some(event_queue(book.queue_depth))
        } else if *key == k.base_mint {
            Some(mint(9))
        } else if *key == k.quote_mint {
            Some(mint(6))
        } else if *key == get_associated_token_address(&self.owner, &k.base_mint) {
            Some(token_account(k.base_mint, self.owner, book.base_balance))
        } else if *key == get_associated_token_address(&self.owner, &k.quote_mint) {
            Some(token_account(k.quote_mint, self.owner, book.quote_balance))
        } else {
            None
        }
    }

    fn market_state(&self) -> Vec<u8> {
        let k = &self.keys;
        let mut data = vec![0u8; MARKET_STATE_LEN];
        data[..5].copy_from_slice(HEAD_PADDING);
        data[5..13].copy_from_slice(&(flags::INITIALIZED | flags::MARKET).to_le_bytes());
        for (offset, key) in [
            (13, &k.market),
            (53, &k.base_mint),
            (85, &k.quote_mint),
            (117, &k.base_vault),
            (165, &k.quote_vault),
            (221, &k.request_queue),
            (253, &k.event_queue),
            (285, &k.bids),
            (317, &k.asks),
        ] {
            data[offset..offset + 32].copy_from_slice(key.as_ref());
        }
        data[349..357].copy_from_slice(&1_000_000u64.to_le_bytes());
        data[357..365].copy_from_slice(&100u64.to_le_bytes());
        data[365..373].copy_from_slice(&22u64.to_le_bytes());
        data[MARKET_STATE_LEN - TAIL_PADDING_LEN..].copy_from_slice(b"padding");
        data
    }
}

fn slab(side_flag: u64, prices: &[u64]) -> Vec<u8> {
    let nodes = 45;
    let mut data = vec![0u8; nodes + NODE_LEN * (prices.len() + 1) + TAIL_PADDING_LEN];
    data[..5].copy_from_slice(HEAD_PADDING);
    data[5..13].copy_from_slice(&(flags::INITIALIZED | side_flag).to_le_bytes());
    data[13..21].copy_from_slice(&(prices.len() as u64).to_le_bytes());
    data[37..45].copy_from_slice(&(prices.len() as u64).to_le_bytes());
    for (i, price) in prices.iter().enumerate() {
        let node = nodes + i * NODE_LEN;
        data[node..node + 4].copy_from_slice(&LEAF.to_le_bytes());
        let key = ((*price as u128) << 64) | i as u128;
        data[node + 8..node + 24].copy_from_slice(&key.to_le_bytes());
    }
    data
}

fn event_queue(depth: u64) -> Vec<u8> {
    let mut data = vec![0u8; 37 + 88 * 8 + TAIL_PADDING_LEN];
    data[..5].copy_from_slice(HEAD_PADDING);
    data[5..13].copy_from_slice(&(flags::INITIALIZED | flags::EVENT_QUEUE).to_le_bytes());
    data[21..29].copy_from_slice(&depth.to_le_bytes());
    data
}

fn mint(decimals: u8) -> Vec<u8> {
    let mut data = vec![0u8; Mint::LEN];
    Mint::pack(
        Mint {
            supply: 1_000_000_000,
            decimals,
            is_initialized: true,
            ..Mint::default()
        },
        &mut data,
    )
    .unwrap();
    data
}

fn token_account(mint: Pubkey, owner: Pubkey, amount: u64) -> Vec<u8> {
    let mut data = vec![0u8; TokenAccount::LEN];
    TokenAccount::pack(
        TokenAccount {
            mint,
            owner,
            amount,
            state: AccountState::Initialized,
            ..TokenAccount::default()
        },
        &mut data,
    )
    .unwrap();
    data
}

#[async_trait]
impl ChainRpc for MockChain {
    async fn latest_blockhash(&self) -> Result<(Hash, u64), MakerError> {
        let mut queue = self.blockhashes.lock().unwrap();
        let response = if queue.len() > 1 {
            queue.remove(0)
        } else {
            queue.first().cloned().unwrap_or_else(|| Ok(Hash::new_unique()))
        };
        response
            .map(|hash| (hash, 1_000))
            .map_err(MakerError::Network)
    }

    async fn multiple_accounts(&self, keys: &[Pubkey]) -> Result<Vec<Option<Vec<u8>>>, MakerError> {
        if *self.fail_reads.lock().unwrap() {
            return Err(MakerError::Network("connection reset".to_string()));
        }
        Ok(keys.iter().map(|k| self.account(k)).collect())
    }

    async fn open_orders_accounts(
        &self,
        program_id: &Pubkey,
        market: &Pubkey,
        owner: &Pubkey,
    ) -> Result<Vec<Pubkey>, MakerError> {
        assert_eq!(*program_id, self.keys.program_id);
        assert_eq!(*market, self.keys.market);
        assert_eq!(*owner, self.owner);
        Ok(self.existing_open_orders.lock().unwrap().clone())
    }

    async fn rent_exempt_minimum(&self, data_len: usize) -> Result<u64, MakerError> {
        Ok((data_len as u64 + 128) * 6_960)
    }

    async fn send_and_confirm(&self, transaction: &Transaction) -> Result<Signature, MakerError> {
        let mut sent = self.sent.lock().unwrap();
        let index = sent.len();
        sent.push(transaction.clone());
        if *self.reject_send.lock().unwrap() == Some(index) {
            return Err(SubmissionError::Rejected("custom program error: 0x10041".to_string()).into());
        }
        Ok(transaction.signatures[0])
    }
}
