//! Dex program instruction encoding.
//!
//! Instruction data is a version byte (`0`), a little-endian `u32` tag, then
//! the packed fields of the instruction.

use solana_sdk::instruction::{AccountMeta, Instruction};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::sysvar;

use crate::types::Side;

const VERSION: u8 = 0;
const TAG_NEW_ORDER_V3: u32 = 10;
const TAG_INIT_OPEN_ORDERS: u32 = 15;

/// Default cap on the number of resting orders matched per instruction.
pub const DEFAULT_MATCH_LIMIT: u16 = 65_535;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum SelfTradeBehavior {
    DecrementTake = 0,
    CancelProvide = 1,
    AbortTransaction = 2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum OrderType {
    Limit = 0,
    ImmediateOrCancel = 1,
    PostOnly = 2,
}

/// Arguments of a `NewOrderV3` instruction, all in lots / native units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewOrderArgs {
    pub side: Side,
    pub limit_price: u64,
    pub max_base_qty: u64,
    pub max_native_quote_qty: u64,
    pub self_trade_behavior: SelfTradeBehavior,
    pub order_type: OrderType,
    pub client_order_id: u64,
    pub limit: u16,
}

impl NewOrderArgs {
    pub fn pack(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(51);
        data.push(VERSION);
        data.extend_from_slice(&TAG_NEW_ORDER_V3.to_le_bytes());
        data.extend_from_slice(&self.side.as_u32().to_le_bytes());
        data.extend_from_slice(&self.limit_price.to_le_bytes());
        data.extend_from_slice(&self.max_base_qty.to_le_bytes());
        data.extend_from_slice(&self.max_native_quote_qty.to_le_bytes());
        data.extend_from_slice(&(self.self_trade_behavior as u32).to_le_bytes());
        data.extend_from_slice(&(self.order_type as u32).to_le_bytes());
        data.extend_from_slice(&self.client_order_id.to_le_bytes());
        data.extend_from_slice(&self.limit.to_le_bytes());
        data
    }
}

/// Accounts touched by `NewOrderV3`.
#[derive(Debug, Clone, Copy)]
pub struct NewOrderAccounts<'a> {
    pub market: &'a Pubkey,
    pub open_orders: &'a Pubkey,
    pub request_queue: &'a Pubkey,
    pub event_queue: &'a Pubkey,
    pub bids: &'a Pubkey,
    pub asks: &'a Pubkey,
    /// Token account funding the order: quote for bids, base for asks.
    pub order_payer: &'a Pubkey,
    pub owner: &'a Pubkey,
    pub base_vault: &'a Pubkey,
    pub quote_vault: &'a Pubkey,
}

pub fn new_order_v3(
    program_id: &Pubkey,
    accounts: NewOrderAccounts<'_>,
    args: &NewOrderArgs,
) -> Instruction {
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*accounts.market, false),
            AccountMeta::new(*accounts.open_orders, false),
            AccountMeta::new(*accounts.request_queue, false),
            AccountMeta::new(*accounts.event_queue, false),
            AccountMeta::new(*accounts.bids, false),
            AccountMeta::new(*accounts.asks, false),
            AccountMeta::new(*accounts.order_payer, false),
            AccountMeta::new_readonly(*accounts.owner, true),
            AccountMeta::new(*accounts.base_vault, false),
            AccountMeta::new(*accounts.quote_vault, false),
            AccountMeta::new_readonly(spl_token::id(), false),
            AccountMeta::new_readonly(sysvar::rent::id(), false),
        ],
        data: args.pack(),
    }
}

pub fn init_open_orders(
    program_id: &Pubkey,
    open_orders: &Pubkey,
    owner: &Pubkey,
    market: &Pubkey,
) -> Instruction {
    let mut data = Vec::with_capacity(5);
    data.push(VERSION);
    data.extend_from_slice(&TAG_INIT_OPEN_ORDERS.to_le_bytes());
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*open_orders, false),
            AccountMeta::new_readonly(*owner, true),
            AccountMeta::new_readonly(*market, false),
            AccountMeta::new_readonly(sysvar::rent::id(), false),
        ],
        data,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
