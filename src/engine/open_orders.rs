//! Open-orders account discovery.
//!
//! Every order on the dex is booked against an open-orders account owned by
//! the maker. Reuse the first existing one for the market, otherwise create
//! and initialise a new one before the first cycle.

use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signer};
use solana_sdk::system_instruction;
use solana_sdk::transaction::Transaction;
use tracing::{info, warn};

use crate::chain::ChainRpc;
use crate::exchange::instruction::init_open_orders;
use crate::exchange::layout::OPEN_ORDERS_LEN;
use crate::exchange::MarketLayout;
use crate::types::{MakerError, SubmissionError};

/// Find or create the maker's open-orders account for `layout`'s market.
///
/// In dry-run mode a missing account is not created; a throwaway address is
/// returned so orders can still be built and logged.
pub async fn ensure_open_orders(
    rpc: &dyn ChainRpc,
    layout: &MarketLayout,
    owner: &Keypair,
    dry_run: bool,
) -> Result<Pubkey, MakerError> {
    let existing = rpc
        .open_orders_accounts(&layout.program_id, &layout.address, &owner.pubkey())
        .await?;

    if let Some(first) = existing.first() {
        if existing.len() > 1 {
            warn!(count = existing.len(), using = %first, "Several open-orders accounts found");
        }
        info!(open_orders = %first, market = %layout.name, "Using existing open-orders account");
        return Ok(*first);
    }

    let account = Keypair::new();
    if dry_run {
        info!(
            open_orders = %account.pubkey(),
            "[DRY RUN] Would create open-orders account"
        );
        return Ok(account.pubkey());
    }

    let lamports = rpc.rent_exempt_minimum(OPEN_ORDERS_LEN).await?;
    let create = system_instruction::create_account(
        &owner.pubkey(),
        &account.pubkey(),
        lamports,
        OPEN_ORDERS_LEN as u64,
        &layout.program_id,
    );
    let init = init_open_orders(
        &layout.program_id,
        &account.pubkey(),
        &owner.pubkey(),
        &layout.address,
    );

    let (hash, _) = rpc.latest_blockhash().await?;
    let mut tx = Transaction::new_with_payer(&[create, init], Some(&owner.pubkey()));
    tx.try_sign(&[owner, &account], hash)
        .map_err(|e| SubmissionError::Signing(e.to_string()))?;
    let signature = rpc.send_and_confirm(&tx).await?;

    info!(
        open_orders = %account.pubkey(),
        %signature,
        lamports,
        "Created open-orders account"
    );
    Ok(account.pubkey())
}
