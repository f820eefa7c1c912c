//! Ladder maker entry point.
//!
//! Loads configuration, initialises structured logging, resolves the market
//! and the maker's accounts, then runs the blockhash refresher and the
//! market-making loop until Ctrl+C.

use anyhow::{Context, Result};
use secrecy::SecretString;
use solana_sdk::signature::Signer;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, warn};

use ladder_maker::chain::rpc::SolanaRpc;
use ladder_maker::chain::ChainRpc;
use ladder_maker::config::{self, AppConfig};
use ladder_maker::engine::blockhash::{BlockhashCell, BlockhashRefresher};
use ladder_maker::engine::maker::MarketMaker;
use ladder_maker::engine::open_orders::ensure_open_orders;
use ladder_maker::engine::snapshot::SnapshotProvider;
use ladder_maker::engine::submitter::{FeePolicy, OrderSubmitter};
use ladder_maker::exchange::MarketLayout;
use ladder_maker::markets;
use ladder_maker::status::{spawn_status_server, StatusState};
use ladder_maker::strategy::ladder::LadderCalculator;
use ladder_maker::wallet;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    init_logging();

    let config_path =
        std::env::var("MAKER_CONFIG").unwrap_or_else(|_| config::DEFAULT_CONFIG_PATH.to_string());
    let mut cfg = AppConfig::load(&config_path)?;
    cfg.apply_env_overrides(|key| std::env::var(key).ok())?;
    cfg.validate()?;

    if cfg.fees.max_tx_instructions > 1 {
        info!(
            max_tx_instructions = cfg.fees.max_tx_instructions,
            "Orders are sent one per transaction"
        );
    }

    // -- Wallet and market ----------------------------------------------

    let keypair = Arc::new(
        wallet::load_keypair(
            std::env::var("KEYPAIR").ok().map(SecretString::new),
            &cfg.wallet_path(),
        )
        .context("Failed to load maker keypair")?,
    );
    info!(maker = %keypair.pubkey(), cluster = %cfg.maker.cluster, "Ladder maker starting up");

    let listed = markets::load_markets(Path::new(&cfg.maker.markets_file), &cfg.maker.cluster)?;
    let descriptor = markets::select_market(&listed, cfg.maker.market.as_deref())?;
    let program_id = cfg.program_id(descriptor.program_id)?;
    info!(market = %descriptor, %program_id, "Making the following market");

    let rpc: Arc<dyn ChainRpc> = Arc::new(SolanaRpc::new(
        &cfg.rpc.endpoint,
        &cfg.rpc.commitment,
        cfg.rpc_timeout(),
    )?);

    let layout = Arc::new(
        MarketLayout::load(rpc.as_ref(), &descriptor, program_id, &keypair.pubkey())
            .await
            .context("Failed to load market")?,
    );
    let open_orders = ensure_open_orders(rpc.as_ref(), &layout, &keypair, cfg.maker.dry_run)
        .await
        .context("Failed to resolve open-orders account")?;

    // -- Background tasks -----------------------------------------------

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let blockhash = Arc::new(BlockhashCell::new());

    let refresher = BlockhashRefresher::new(rpc.clone(), blockhash.clone(), cfg.blockhash_refresh())
        .spawn(shutdown_rx.clone());

    let status = Arc::new(StatusState::new(layout.name.clone(), blockhash.clone()));
    let status_server = if cfg.status.enabled {
        Some(spawn_status_server(status.clone(), cfg.status_addr()?, shutdown_rx.clone()).await?)
    } else {
        None
    };

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Shutdown signal received."),
            Err(e) => error!(error = %e, "Failed to listen for Ctrl+C, stopping"),
        }
        let _ = shutdown_tx.send(true);
    });

    // -- Main loop -------------------------------------------------------

    let fees = FeePolicy {
        cu_limit: cfg.fees.cu_limit,
        cu_price: cfg.fees.cu_price,
        priority_cu_price: cfg.fees.priority_cu_price,
        priority_queue_limit: cfg.fees.priority_queue_limit,
        priority_market: cfg.is_priority_market(&layout.name, &layout.address),
    };
    let submitter = OrderSubmitter::new(
        rpc.clone(),
        keypair.clone(),
        layout.clone(),
        open_orders,
        blockhash,
        fees,
        cfg.blockhash_max_age(),
        cfg.maker.dry_run,
    );
    let maker = MarketMaker::new(
        SnapshotProvider::new(rpc, layout),
        LadderCalculator::new(cfg.ladder.clone()),
        submitter,
        cfg.interval(),
    )
    .with_status(status.clone());

    info!(
        interval_ms = cfg.maker.interval_ms,
        dry_run = cfg.maker.dry_run,
        "Entering main loop. Press Ctrl+C to stop."
    );
    maker.run(shutdown_rx).await;

    if let Err(e) = refresher.await {
        warn!(error = %e, "Blockhash refresher ended abnormally");
    }
    if let Some(server) = status_server {
        if let Err(e) = server.await {
            warn!(error = %e, "Status server ended abnormally");
        }
    }

    let totals = status.totals().await;
    info!(
        cycles = totals.cycles,
        orders_submitted = totals.orders_submitted,
        orders_failed = totals.orders_failed,
        "Ladder maker shut down cleanly."
    );

    Ok(())
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("ladder_maker=info"));

    let json_logging = std::env::var("MAKER_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
