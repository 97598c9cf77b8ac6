use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};
use tracing::{info, warn};

use common::{EngineCommand, EngineState};
use signal::config::{StrategyConfig, StrategyKind};

use crate::dune::DuneClient;
use crate::poller::{self, PollContext};

/// Cloneable handle passed to other crates (dashboard API, ops hooks).
#[derive(Clone)]
pub struct EngineHandle {
    command_tx: mpsc::Sender<EngineCommand>,
    state: Arc<RwLock<EngineState>>,
}

impl EngineHandle {
    pub async fn send(&self, cmd: EngineCommand) {
        let _ = self.command_tx.send(cmd).await;
    }

    pub async fn state(&self) -> EngineState {
        *self.state.read().await
    }
}

/// The polling engine: spawns one interval task per configured
/// strategy instance and processes lifecycle commands.
pub struct Engine {
    strategies: Vec<StrategyConfig>,
    ctx: PollContext,
    dune: Option<Arc<DuneClient>>,
    command_rx: mpsc::Receiver<EngineCommand>,
    #[allow(dead_code)] // kept to prevent channel close
    command_tx: mpsc::Sender<EngineCommand>,
}

impl Engine {
    pub fn new(
        strategies: Vec<StrategyConfig>,
        ctx: PollContext,
        dune: Option<Arc<DuneClient>>,
    ) -> (Self, EngineHandle) {
        let (command_tx, command_rx) = mpsc::channel(32);

        let handle = EngineHandle {
            command_tx: command_tx.clone(),
            state: ctx.state.clone(),
        };

        let engine = Engine {
            strategies,
            ctx,
            dune,
            command_rx,
            command_tx,
        };

        (engine, handle)
    }

    /// Run the engine. This task drives poller spawning and command
    /// processing. Call from `tokio::spawn`.
    pub async fn run(mut self) {
        info!("Engine initialized in Stopped state. Waiting for Start command.");

        let mut poller_handles: Vec<tokio::task::JoinHandle<()>> = Vec::new();

        loop {
            match self.command_rx.recv().await {
                Some(EngineCommand::Start) => {
                    let current = *self.ctx.state.read().await;
                    if current == EngineState::Running {
                        info!("Engine already running");
                        continue;
                    }

                    info!(strategies = self.strategies.len(), "Starting pollers");
                    *self.ctx.state.write().await = EngineState::Running;

                    for cfg in &self.strategies {
                        match cfg.kind {
                            StrategyKind::OpenInterest => {
                                poller_handles.push(tokio::spawn(poller::run_open_interest(
                                    self.ctx.clone(),
                                    cfg.clone(),
                                )));
                            }
                            StrategyKind::HotZone => {
                                poller_handles.push(tokio::spawn(poller::run_hot_zone(
                                    self.ctx.clone(),
                                    cfg.clone(),
                                )));
                            }
                            StrategyKind::Lunar => {
                                poller_handles.push(tokio::spawn(poller::run_lunar(
                                    self.ctx.clone(),
                                    cfg.clone(),
                                )));
                            }
                            StrategyKind::SmartMoney => match &self.dune {
                                Some(dune) => {
                                    poller_handles.push(tokio::spawn(poller::run_smart_money(
                                        self.ctx.clone(),
                                        cfg.clone(),
                                        dune.clone(),
                                    )));
                                }
                                None => {
                                    warn!(
                                        name = %cfg.name,
                                        "smart-money strategy configured but DUNE_API_KEY is missing — skipping"
                                    );
                                }
                            },
                        }
                    }
                }

                Some(EngineCommand::Stop) => {
                    info!("Engine stopping — aborting poller tasks");
                    *self.ctx.state.write().await = EngineState::Stopped;
                    for h in poller_handles.drain(..) {
                        h.abort();
                    }
                }

                Some(EngineCommand::Pause) => {
                    let current = *self.ctx.state.read().await;
                    if current == EngineState::Running {
                        info!("Engine paused — pollers keep observing, signals suppressed");
                        *self.ctx.state.write().await = EngineState::Paused;
                    }
                }

                Some(EngineCommand::Resume) => {
                    let current = *self.ctx.state.read().await;
                    if current == EngineState::Paused {
                        info!("Engine resumed");
                        *self.ctx.state.write().await = EngineState::Running;
                    }
                }

                None => {
                    warn!("Engine command channel closed — shutting down");
                    break;
                }
            }
        }
    }
}
