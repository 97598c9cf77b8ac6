use std::sync::Arc;

use sqlx::SqlitePool;
use tokio::sync::{broadcast, mpsc, RwLock};
use tracing::info;
use tracing_subscriber::EnvFilter;

use common::{Config, DataSource, EngineCommand, EngineState, RunMode, SignalRecord};
use engine::{BinanceSource, ChannelSink, DuneClient, Engine, PollContext, SignalWriter};
use replay::ReplaySource;
use signal::{SignalEngine, SignalEngineConfig, SignalFileConfig};

#[tokio::main]
async fn main() {
    // ── Logging ──────────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .init();

    // ── Config ────────────────────────────────────────────────────────────────
    let cfg = Config::from_env();
    info!(mode = %cfg.run_mode, "Tidebot starting");

    let signal_file = SignalFileConfig::load(&cfg.signal_config_path);
    let symbols: Vec<String> = {
        let mut seen = std::collections::HashSet::new();
        signal_file
            .strategies
            .iter()
            .flat_map(|s| s.symbols.iter())
            .filter_map(|s| {
                if seen.insert(s.clone()) {
                    Some(s.clone())
                } else {
                    None
                }
            })
            .collect()
    };

    // ── Database ──────────────────────────────────────────────────────────────
    let db = SqlitePool::connect(&cfg.database_url)
        .await
        .unwrap_or_else(|e| panic!("Failed to connect to database: {e}"));
    sqlx::migrate!("../../migrations")
        .run(&db)
        .await
        .unwrap_or_else(|e| panic!("Database migration failed: {e}"));
    info!("Database ready");

    // ── Shared state ──────────────────────────────────────────────────────────
    let engine_state = Arc::new(RwLock::new(EngineState::Stopped));
    let signal_engine = Arc::new(SignalEngine::new(SignalEngineConfig::default()));

    // ── Channels ──────────────────────────────────────────────────────────────
    let (record_tx, record_rx) = mpsc::channel::<SignalRecord>(256);
    let (signal_tx, _) = broadcast::channel::<SignalRecord>(1024);

    // ── Data source (injected based on RUN_MODE) ──────────────────────────────
    let source: Arc<dyn DataSource> = match cfg.run_mode {
        RunMode::Live => {
            info!("Live mode — polling Binance");
            Arc::new(BinanceSource::new())
        }
        RunMode::Replay => {
            info!("Replay mode — using scripted data source");
            Arc::new(ReplaySource::demo(&symbols).await)
        }
    };

    let dune = cfg
        .dune_api_key
        .as_ref()
        .map(|key| Arc::new(DuneClient::new(key)));

    // ── Engine + pollers ──────────────────────────────────────────────────────
    let ctx = PollContext {
        engine: signal_engine.clone(),
        source,
        sink: Arc::new(ChannelSink::new(record_tx)),
        state: engine_state.clone(),
    };
    let (poll_engine, engine_handle) = Engine::new(signal_file.strategies.clone(), ctx, dune);

    // ── Signal writer ─────────────────────────────────────────────────────────
    let writer = SignalWriter::new(record_rx, db.clone(), signal_tx.clone());

    // ── Dashboard API ─────────────────────────────────────────────────────────
    let api_state = api::AppState {
        db: db.clone(),
        engine_state: engine_state.clone(),
        run_mode: cfg.run_mode,
        dashboard_token: cfg.dashboard_token.clone(),
        signal_tx: signal_tx.clone(),
        signal_engine: signal_engine.clone(),
    };

    // ── Spawn all tasks ───────────────────────────────────────────────────────
    let port = cfg.dashboard_port;
    tokio::spawn(poll_engine.run());
    tokio::spawn(writer.run());
    tokio::spawn(api::serve(api_state, port));

    engine_handle.send(EngineCommand::Start).await;

    info!("All subsystems started. Waiting for shutdown signal.");
    tokio::signal::ctrl_c().await.unwrap();
    engine_handle.send(EngineCommand::Stop).await;
    info!("Shutdown signal received. Exiting.");
}
