use std::sync::Arc;
use anyhow::Context;
use tokio::sync::{watch, Mutex};
use tokio::time::{interval, Duration};
use cipher_perp::config::loader::AppConfig;
use cipher_perp::coprocessor::local::LocalCoprocessor;
use cipher_perp::core::engine::Engine;
use cipher_perp::event_log::snapshot_manager::SnapshotManager;
use cipher_perp::interfaces::clock::{Clock, SystemClock};
use cipher_perp::keeper::ticker::KeeperTicker;
use cipher_perp::observability::metrics::register_metrics;
use cipher_perp::observability::tracing::init_tracing;
use cipher_perp::price::manual::ManualOracle;
use cipher_perp::settlement::balance_manager::BalanceManager;
use cipher_perp::types::ids::UserId;
use cipher_perp::types::position::Side;
use cipher_perp::types::price::Price;
use cipher_perp::SIZE_PRECISION;

type LocalEngine = Engine<LocalCoprocessor, BalanceManager>;

const DEMO_PRICE_UNITS: u64 = 2_000;
const DEMO_LIQUIDITY: u64 = 1_000_000 * SIZE_PRECISION;
const DEMO_DEPOSIT: u64 = 10_000 * SIZE_PRECISION;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = std::env::var("CIPHERPERP_ENV").unwrap_or_else(|_| "development".to_string());
    let config = AppConfig::load(&env).context("loading configuration")?;

    init_tracing(config.keeper.json_logs);
    register_metrics().context("registering metrics")?;
    tracing::info!("Starting cipher-perp keeper ({})", env);

    let clock: Arc<dyn Clock + Send + Sync> = Arc::new(SystemClock);
    let oracle = ManualOracle::new(Price::from_units(DEMO_PRICE_UNITS), clock.now());

    let mut engine = Engine::new(
        config.engine_config(),
        LocalCoprocessor::new(),
        BalanceManager::new(),
        Box::new(oracle.clone()),
        clock.clone(),
    )?;
    engine.add_liquidity(DEMO_LIQUIDITY)?;
    seed_demo_positions(&mut engine)?;

    let engine = Arc::new(Mutex::new(engine));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let keeper = KeeperTicker::new(
        Duration::from_millis(config.keeper.interval_ms),
        config.funding.rate_update_interval_secs,
    );
    let keeper_handle = tokio::spawn(keeper.run(engine.clone(), shutdown_rx.clone()));

    let gateway_handle = tokio::spawn(run_gateway(
        engine.clone(),
        Duration::from_millis(config.keeper.reveal_delay_ms),
        shutdown_rx.clone(),
    ));

    let feed_handle = tokio::spawn(run_price_feed(
        oracle,
        clock.clone(),
        Duration::from_secs((config.market.oracle_max_age_secs / 2).max(1)),
        shutdown_rx,
    ));

    tokio::signal::ctrl_c().await.context("waiting for ctrl-c")?;
    tracing::info!("Shutdown requested");
    shutdown_tx.send(true).context("broadcasting shutdown")?;

    keeper_handle.await?;
    gateway_handle.await?;
    feed_handle.await?;

    let (snapshot, journal) = {
        let engine = engine.lock().await;
        (engine.snapshot(), engine.events().to_json_lines(0)?)
    };
    let journal_path = std::path::Path::new(&config.snapshot.dir).join("events.jsonl");
    tokio::fs::create_dir_all(&config.snapshot.dir).await?;
    tokio::fs::write(&journal_path, journal).await?;
    tracing::info!("Event journal written to {:?}", journal_path);

    let manager = SnapshotManager::new(&config.snapshot.dir, config.snapshot.max_snapshots);
    let path = manager.save_snapshot(&snapshot).await?;
    tracing::info!("Final snapshot written to {:?}", path);

    Ok(())
}

fn seed_demo_positions(engine: &mut LocalEngine) -> anyhow::Result<()> {
    let demo = [
        (Side::Long, 5_000 * SIZE_PRECISION, 500 * SIZE_PRECISION),
        (Side::Short, 3_000 * SIZE_PRECISION, 300 * SIZE_PRECISION),
        (Side::Long, 40_000 * SIZE_PRECISION, 200 * SIZE_PRECISION),
    ];

    for (side, size, collateral) in demo {
        let trader = UserId::new();
        engine.bank_mut().deposit(trader, DEMO_DEPOSIT)?;
        let size_input = engine.coprocessor_mut().encrypt_input(size as u128, trader);
        let id = engine.open_position_request(trader, side, size_input, collateral, None, None)?;
        tracing::info!("Seeded {:?} request {} for {}", side, id, trader);
    }
    Ok(())
}

/// Stands in for the decryption network: lands outstanding reveals after
/// the configured delay.
async fn run_gateway(engine: Arc<Mutex<LocalEngine>>, delay: Duration, mut shutdown: watch::Receiver<bool>) {
    let mut ticker = interval(delay);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let landed = engine.lock().await.coprocessor_mut().fulfill_reveals();
                if landed > 0 {
                    tracing::debug!("Gateway fulfilled {} reveals", landed);
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }
}

/// Republishes the demo price so rounds never go stale.
async fn run_price_feed(
    oracle: ManualOracle,
    clock: Arc<dyn Clock + Send + Sync>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = interval(period);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = oracle.set_price(Price::from_units(DEMO_PRICE_UNITS), clock.now()) {
                    tracing::error!("Price feed update failed: {}", e);
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }
}
