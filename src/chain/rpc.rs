//! JSON-RPC implementation of `ChainRpc`.
//!
//! Wraps the non-blocking Solana RPC client. Timeouts are the client's own;
//! nothing here retries.

use async_trait::async_trait;
use solana_account_decoder::UiAccountEncoding;
use solana_client::client_error::{ClientError, ClientErrorKind};
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_config::{RpcAccountInfoConfig, RpcProgramAccountsConfig};
use solana_client::rpc_filter::{Memcmp, RpcFilterType};
use solana_client::rpc_request::RpcError;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::hash::Hash;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::{Transaction, TransactionError};
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

use super::ChainRpc;
use crate::exchange::layout::{OPEN_ORDERS_LEN, OPEN_ORDERS_MARKET_OFFSET, OPEN_ORDERS_OWNER_OFFSET};
use crate::types::{MakerError, SubmissionError};

const UNCONFIRMED: &str = "unable to confirm transaction";

pub struct SolanaRpc {
    client: RpcClient,
}

impl SolanaRpc {
    /// Connect to `endpoint` with the given commitment (`processed`,
    /// `confirmed` or `finalized`).
    pub fn new(endpoint: &str, commitment: &str, timeout: Duration) -> Result<Self, MakerError> {
        let commitment = CommitmentConfig::from_str(commitment)
            .map_err(|e| MakerError::Config(format!("invalid commitment {commitment:?}: {e}")))?;
        let client =
            RpcClient::new_with_timeout_and_commitment(endpoint.to_string(), timeout, commitment);
        Ok(Self { client })
    }
}

#[async_trait]
impl ChainRpc for SolanaRpc {
    async fn latest_blockhash(&self) -> Result<(Hash, u64), MakerError> {
        self.client
            .get_latest_blockhash_with_commitment(CommitmentConfig::finalized())
            .await
            .map_err(|e| network("getLatestBlockhash", e))
    }

    async fn multiple_accounts(&self, keys: &[Pubkey]) -> Result<Vec<Option<Vec<u8>>>, MakerError> {
        let accounts = self
            .client
            .get_multiple_accounts(keys)
            .await
            .map_err(|e| network("getMultipleAccounts", e))?;
        Ok(accounts.into_iter().map(|a| a.map(|a| a.data)).collect())
    }

    async fn open_orders_accounts(
        &self,
        program_id: &Pubkey,
        market: &Pubkey,
        owner: &Pubkey,
    ) -> Result<Vec<Pubkey>, MakerError> {
        let config = RpcProgramAccountsConfig {
            filters: Some(vec![
                RpcFilterType::DataSize(OPEN_ORDERS_LEN as u64),
                RpcFilterType::Memcmp(Memcmp::new_base58_encoded(
                    OPEN_ORDERS_MARKET_OFFSET,
                    market.as_ref(),
                )),
                RpcFilterType::Memcmp(Memcmp::new_base58_encoded(
                    OPEN_ORDERS_OWNER_OFFSET,
                    owner.as_ref(),
                )),
            ]),
            account_config: RpcAccountInfoConfig {
                encoding: Some(UiAccountEncoding::Base64),
                ..RpcAccountInfoConfig::default()
            },
            ..RpcProgramAccountsConfig::default()
        };
        let accounts = self
            .client
            .get_program_accounts_with_config(program_id, config)
            .await
            .map_err(|e| network("getProgramAccounts", e))?;
        Ok(accounts.into_iter().map(|(key, _)| key).collect())
    }

    async fn rent_exempt_minimum(&self, data_len: usize) -> Result<u64, MakerError> {
        self.client
            .get_minimum_balance_for_rent_exemption(data_len)
            .await
            .map_err(|e| network("getMinimumBalanceForRentExemption", e))
    }

    async fn send_and_confirm(&self, transaction: &Transaction) -> Result<Signature, MakerError> {
        match self.client.send_and_confirm_transaction(transaction).await {
            Ok(signature) => {
                debug!(%signature, "Transaction confirmed");
                Ok(signature)
            }
            Err(e) => Err(classify_send_error(e)),
        }
    }
}

/// Map a `send_and_confirm_transaction` failure. The client gives up with
/// `ForUser("unable to confirm transaction…")` once the blockhash is no
/// longer valid, so the transaction expired in flight.
pub fn classify_send_error(err: ClientError) -> MakerError {
    if let Some(tx_err) = err.get_transaction_error() {
        return classify_rejection(tx_err).into();
    }
    match err.kind() {
        ClientErrorKind::RpcError(RpcError::ForUser(msg)) if msg.starts_with(UNCONFIRMED) => {
            SubmissionError::BlockhashExpired(msg.clone()).into()
        }
        _ => network("sendTransaction", err),
    }
}

fn network(call: &str, err: ClientError) -> MakerError {
    MakerError::Network(format!("{call} failed: {err}"))
}

/// Map a cluster-side transaction error onto the submission taxonomy.
pub fn classify_rejection(err: TransactionError) -> SubmissionError {
    match err {
        TransactionError::BlockhashNotFound => SubmissionError::BlockhashExpired(err.to_string()),
        TransactionError::InsufficientFundsForFee
        | TransactionError::InsufficientFundsForRent { .. } => {
            SubmissionError::InsufficientFunds(err.to_string())
        }
        other => SubmissionError::Rejected(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
