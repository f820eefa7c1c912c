//! Chain access.
//!
//! Defines the `ChainRpc` trait, the only seam between the maker and the
//! network, and its JSON-RPC implementation.

pub mod rpc;

use async_trait::async_trait;
use solana_sdk::hash::Hash;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::Transaction;

use crate::types::MakerError;

/// Request/response calls the maker makes against the cluster.
///
/// Read failures are `MakerError::Network`; a rejected transaction is
/// `MakerError::Submission`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChainRpc: Send + Sync {
    /// Latest finalized blockhash and its last valid block height.
    async fn latest_blockhash(&self) -> Result<(Hash, u64), MakerError>;

    /// Raw data of several accounts read at one slot. Missing accounts are `None`.
    async fn multiple_accounts(&self, keys: &[Pubkey]) -> Result<Vec<Option<Vec<u8>>>, MakerError>;

    /// Open-orders accounts of `owner` on `market`.
    async fn open_orders_accounts(
        &self,
        program_id: &Pubkey,
        market: &Pubkey,
        owner: &Pubkey,
    ) -> Result<Vec<Pubkey>, MakerError>;

    /// Lamports needed for an account of `data_len` bytes to be rent exempt.
    async fn rent_exempt_minimum(&self, data_len: usize) -> Result<u64, MakerError>;

    /// Send a signed transaction and wait for confirmation.
    async fn send_and_confirm(&self, transaction: &Transaction) -> Result<Signature, MakerError>;
}
