//! End-to-end cycles against the in-memory chain: market loading,
//! open-orders bootstrap, refresher, snapshot, ladder and submission.

use std::sync::Arc;
use std::time::Duration;

use rust_decimal_macros::dec;
use solana_sdk::hash::Hash;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signer};
use solana_sdk::transaction::Transaction;

use ladder_maker::engine::blockhash::{BlockhashCell, BlockhashRefresher};
use ladder_maker::engine::maker::{CycleOutcome, MarketMaker};
use ladder_maker::engine::open_orders::ensure_open_orders;
use ladder_maker::engine::snapshot::SnapshotProvider;
use ladder_maker::engine::submitter::{FeePolicy, OrderSubmitter};
use ladder_maker::exchange::MarketLayout;
use ladder_maker::strategy::ladder::{LadderCalculator, LadderConfig};

use crate::mock_chain::MockChain;

/// 500 SOL and 1000 USDC in native units.
const BASE_BALANCE: u64 = 500_000_000_000;
const QUOTE_BALANCE: u64 = 1_000_000_000;

struct Harness {
    chain: Arc<MockChain>,
    cell: Arc<BlockhashCell>,
    refresher: BlockhashRefresher,
    maker: MarketMaker,
}

async fn harness(chain: MockChain, keypair: Keypair) -> Harness {
    let chain = Arc::new(chain);
    let keypair = Arc::new(keypair);
    let program_id = chain.keys.program_id;

    let layout = Arc::new(
        MarketLayout::load(chain.as_ref(), &chain.descriptor(), program_id, &keypair.pubkey())
            .await
            .unwrap(),
    );
    let open_orders = ensure_open_orders(chain.as_ref(), &layout, &keypair, false)
        .await
        .unwrap();

    let cell = Arc::new(BlockhashCell::new());
    let refresher = BlockhashRefresher::new(chain.clone(), cell.clone(), Duration::from_millis(100));

    let fees = FeePolicy {
        cu_limit: 50_000,
        cu_price: 1_000,
        priority_cu_price: 100_000,
        priority_queue_limit: 100,
        priority_market: false,
    };
    let submitter = OrderSubmitter::new(
        chain.clone(),
        keypair,
        layout.clone(),
        open_orders,
        cell.clone(),
        fees,
        Duration::from_secs(60),
        false,
    );
    let maker = MarketMaker::new(
        SnapshotProvider::new(chain.clone(), layout),
        LadderCalculator::new(LadderConfig::default()),
        submitter,
        Duration::from_millis(10),
    );

    Harness {
        chain,
        cell,
        refresher,
        maker,
    }
}

fn chain_with_book(owner: &Keypair) -> MockChain {
    let chain = MockChain::new(owner.pubkey());
    chain.set_book(&[980, 990], &[1_010, 1_020]);
    chain.set_balances(BASE_BALANCE, QUOTE_BALANCE);
    chain.add_open_orders(Pubkey::new_unique());
    chain
}

/// (side, limit price lots, max base lots, max native quote) of the order
/// instruction, which is always last in the transaction.
fn order_of(tx: &Transaction) -> (u32, u64, u64, u64) {
    let ix = tx.message.instructions.last().unwrap();
    let d = &ix.data;
    let u64_at = |o: usize| u64::from_le_bytes(d[o..o + 8].try_into().unwrap());
    (
        u32::from_le_bytes(d[5..9].try_into().unwrap()),
        u64_at(9),
        u64_at(17),
        u64_at(25),
    )
}

#[tokio::test]
async fn test_startup_creates_open_orders_then_places_ladder() {
    let owner = Keypair::new();
    let chain = MockChain::new(owner.pubkey());
    chain.set_book(&[990], &[1_010]);
    chain.set_balances(BASE_BALANCE, QUOTE_BALANCE);

    let mut h = harness(chain, owner).await;
    // open-orders creation: maker plus the new account sign
    assert_eq!(h.chain.sent().len(), 1);
    assert_eq!(h.chain.sent()[0].signatures.len(), 2);

    assert!(h.refresher.refresh_once().await);
    let report = h.maker.run_cycle().await;

    assert_eq!(report.outcome, CycleOutcome::Completed);
    assert_eq!(report.submitted, 6);
    assert_eq!(report.mid, Some(dec!(100)));

    let orders: Vec<_> = h.chain.sent()[1..].iter().map(order_of).collect();
    assert_eq!(
        orders,
        vec![
            // bids: 10/25/65% of 1000 USDC
            (0, 997, 1_003, 100_000_000),
            (0, 994, 2_515, 250_000_000),
            (0, 991, 6_559, 650_000_000),
            // asks: 10/25/65% of 500 SOL, one lot = 0.001 SOL
            (1, 1_003, 50_000, 5_026_033_000),
            (1, 1_006, 125_000, 12_602_665_000),
            (1, 1_009, 325_000, 32_864_643_500),
        ]
    );
}

#[tokio::test]
async fn test_empty_ask_side_submits_nothing() {
    let owner = Keypair::new();
    let chain = chain_with_book(&owner);
    chain.set_book(&[990], &[]);

    let mut h = harness(chain, owner).await;
    h.refresher.refresh_once().await;
    let report = h.maker.run_cycle().await;

    assert!(matches!(
        report.outcome,
        CycleOutcome::Skipped { ref kind, .. } if kind == "validation"
    ));
    assert!(h.chain.sent().is_empty());
}

#[tokio::test]
async fn test_rejection_abandons_rest_then_next_cycle_runs() {
    let owner = Keypair::new();
    let chain = chain_with_book(&owner);
    chain.reject_send_at(2);

    let mut h = harness(chain, owner).await;
    h.refresher.refresh_once().await;

    let first = h.maker.run_cycle().await;
    assert!(matches!(
        first.outcome,
        CycleOutcome::Aborted { ref kind, .. } if kind == "submission"
    ));
    assert_eq!(first.submitted, 2);
    assert_eq!(first.failed, 1);
    assert_eq!(first.abandoned, 3);
    assert_eq!(h.chain.sent().len(), 3);

    let second = h.maker.run_cycle().await;
    assert_eq!(second.outcome, CycleOutcome::Completed);
    assert_eq!(second.submitted, 6);
    assert_eq!(h.chain.sent().len(), 9);

    // the retried ladder starts again from the closest bid
    assert_eq!(order_of(&h.chain.sent()[3]).0, 0);
    assert_eq!(order_of(&h.chain.sent()[3]).1, 997);
}

#[tokio::test]
async fn test_stale_blockhash_still_used_after_refresh_failures() {
    let owner = Keypair::new();
    let chain = chain_with_book(&owner);
    let good = Hash::new_unique();
    chain.push_blockhash(Ok(good));
    chain.push_blockhash(Err("node is behind".to_string()));

    let mut h = harness(chain, owner).await;
    assert!(h.refresher.refresh_once().await);
    for _ in 0..4 {
        assert!(!h.refresher.refresh_once().await);
    }
    assert_eq!(h.cell.current().unwrap().hash, good);

    let report = h.maker.run_cycle().await;
    assert_eq!(report.submitted, 6);
    assert!(h
        .chain
        .sent()
        .iter()
        .all(|tx| tx.message.recent_blockhash == good));
}

#[tokio::test]
async fn test_no_blockhash_yet_aborts_without_sending() {
    let owner = Keypair::new();
    let mut h = harness(chain_with_book(&owner), owner).await;

    let report = h.maker.run_cycle().await;
    assert!(matches!(
        report.outcome,
        CycleOutcome::Aborted { ref kind, .. } if kind == "submission"
    ));
    assert_eq!(report.abandoned, 5);
    assert!(h.chain.sent().is_empty());
}

#[tokio::test]
async fn test_congested_queue_pays_priority_price() {
    let owner = Keypair::new();
    let chain = chain_with_book(&owner);
    chain.set_queue_depth(150);

    let mut h = harness(chain, owner).await;
    h.refresher.refresh_once().await;
    h.maker.run_cycle().await;

    let sent = h.chain.sent();
    assert_eq!(sent.len(), 6);
    for tx in &sent {
        // unit limit, unit price, order
        assert_eq!(tx.message.instructions.len(), 3);
        let price_ix = &tx.message.instructions[1];
        // SetComputeUnitPrice: tag 3 then u64 micro-lamports
        assert_eq!(price_ix.data[0], 3);
        assert_eq!(
            u64::from_le_bytes(price_ix.data[1..9].try_into().unwrap()),
            100_000
        );
    }
}

#[tokio::test]
async fn test_network_failure_skips_cycle_then_recovers() {
    let owner = Keypair::new();
    let chain = chain_with_book(&owner);

    let mut h = harness(chain, owner).await;
    h.refresher.refresh_once().await;

    h.chain.set_fail_reads(true);
    let first = h.maker.run_cycle().await;
    assert!(matches!(
        first.outcome,
        CycleOutcome::Skipped { ref kind, .. } if kind == "network"
    ));
    assert!(h.chain.sent().is_empty());

    h.chain.set_fail_reads(false);
    let second = h.maker.run_cycle().await;
    assert_eq!(second.outcome, CycleOutcome::Completed);
    assert_eq!(h.chain.sent().len(), 6);
}

#[tokio::test]
async fn test_zero_base_balance_places_bids_only() {
    let owner = Keypair::new();
    let chain = chain_with_book(&owner);
    chain.set_balances(0, QUOTE_BALANCE);

    let mut h = harness(chain, owner).await;
    h.refresher.refresh_once().await;
    let report = h.maker.run_cycle().await;

    assert_eq!(report.outcome, CycleOutcome::Completed);
    assert_eq!(report.submitted, 3);
    assert_eq!(report.skipped, 3);
    assert!(h.chain.sent().iter().all(|tx| order_of(tx).0 == 0));
}
