use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::analysis::{request_analysis, SignalSource};
use crate::engine::generator::generate_next_sample;
use crate::engine::state::{DashboardEvent, DashboardState};
use crate::errors::AppError;
use crate::models::config::{find_pair, AppConfig};
use crate::models::signal::TradeSignal;

const COMMAND_BUFFER: usize = 32;

enum DashboardCommand {
    SelectPair {
        pair: String,
        reply: oneshot::Sender<Result<(), AppError>>,
    },
    Analyze {
        reply: oneshot::Sender<Result<TradeSignal, AppError>>,
    },
    Shutdown,
}

/// Outcome of a finished analysis, reported back to the actor.
/// `None` means the request never went out.
struct AnalysisDone {
    signal: Option<TradeSignal>,
}

/// Cloneable front-end handle to a running dashboard.
#[derive(Clone)]
pub struct DashboardHandle {
    commands: mpsc::Sender<DashboardCommand>,
    snapshots: watch::Receiver<DashboardState>,
}

impl DashboardHandle {
    /// The most recently published state.
    pub fn snapshot(&self) -> DashboardState {
        self.snapshots.borrow().clone()
    }

    /// A receiver notified on every published state.
    pub fn subscribe(&self) -> watch::Receiver<DashboardState> {
        self.snapshots.clone()
    }

    pub async fn select_pair(&self, pair: &str) -> Result<(), AppError> {
        let (reply, rx) = oneshot::channel();
        self.send(DashboardCommand::SelectPair {
            pair: pair.to_string(),
            reply,
        })
        .await?;
        rx.await.map_err(|_| AppError::DashboardClosed)?
    }

    /// Request a signal for the current pair and history.
    ///
    /// Resolves once the engine answers (or the fallback is produced). Fails
    /// with `AnalysisInProgress` if another request is still outstanding.
    pub async fn analyze(&self) -> Result<TradeSignal, AppError> {
        let (reply, rx) = oneshot::channel();
        self.send(DashboardCommand::Analyze { reply }).await?;
        rx.await.map_err(|_| AppError::DashboardClosed)?
    }

    /// Stop the tick timer. An in-flight analysis still completes.
    pub async fn shutdown(&self) {
        if self.commands.send(DashboardCommand::Shutdown).await.is_err() {
            warn!("Dashboard already stopped");
        }
    }

    async fn send(&self, command: DashboardCommand) -> Result<(), AppError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| AppError::DashboardClosed)
    }
}

/// Seed the market and start the dashboard actor.
pub fn spawn<S>(config: AppConfig, source: Arc<S>) -> (DashboardHandle, JoinHandle<()>)
where
    S: SignalSource + 'static,
{
    let mut rng = match config.simulation.rng_seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let state = DashboardState::initial(&config, &mut rng);
    info!(
        "Dashboard seeded: {} samples, price={:.5}, pair={}",
        state.market.history.len(),
        state.market.current_price,
        state.pair
    );

    let (commands_tx, commands_rx) = mpsc::channel(COMMAND_BUFFER);
    let (publisher, snapshots) = watch::channel(state.clone());

    let task = tokio::spawn(run_actor(config, source, rng, state, publisher, commands_rx));

    (
        DashboardHandle {
            commands: commands_tx,
            snapshots,
        },
        task,
    )
}

/// Owns the state. Timer ticks and user commands are the only inputs.
async fn run_actor<S>(
    config: AppConfig,
    source: Arc<S>,
    mut rng: StdRng,
    mut state: DashboardState,
    publisher: watch::Sender<DashboardState>,
    mut commands: mpsc::Receiver<DashboardCommand>,
) where
    S: SignalSource + 'static,
{
    let period = config.simulation.tick_interval();
    let mut ticker = time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let (done_tx, mut done_rx) = mpsc::unbounded_channel::<AnalysisDone>();

    loop {
        tokio::select! {
            // Completions first, so a queued Analyze never sees a stale `analyzing`.
            biased;

            Some(done) = done_rx.recv() => {
                state = match done.signal {
                    Some(signal) => state.apply(DashboardEvent::SignalReady(signal)),
                    None => state.apply(DashboardEvent::AnalysisAborted),
                };
            }
            _ = ticker.tick() => {
                let sample = generate_next_sample(
                    state.market.current_price,
                    &config.simulation,
                    &mut rng,
                );
                state = state.apply(DashboardEvent::Tick(sample));
            }
            command = commands.recv() => match command {
                Some(DashboardCommand::SelectPair { pair, reply }) => {
                    let result = match find_pair(&pair) {
                        Some(spec) => {
                            info!("Pair selected: {}", spec.symbol);
                            let symbol = spec.symbol.to_string();
                            state = state.apply(DashboardEvent::PairSelected(symbol));
                            Ok(())
                        }
                        None => Err(AppError::UnknownPair(pair)),
                    };
                    let _ = reply.send(result);
                }
                Some(DashboardCommand::Analyze { reply }) => {
                    if state.analyzing {
                        let _ = reply.send(Err(AppError::AnalysisInProgress));
                    } else {
                        state = state.apply(DashboardEvent::AnalysisStarted);

                        let history = state.market.history.clone();
                        let pair = state.pair.clone();
                        let window = config.analysis.window;
                        let source = Arc::clone(&source);
                        let done_tx = done_tx.clone();
                        tokio::spawn(async move {
                            let result =
                                request_analysis(source.as_ref(), &history, &pair, window).await;
                            let done = AnalysisDone {
                                signal: result.as_ref().ok().cloned(),
                            };
                            if done_tx.send(done).is_err() {
                                debug!("Dashboard stopped before the analysis finished");
                            }
                            // Answered directly; the actor may already have stopped.
                            if reply.send(result).is_err() {
                                warn!("Analysis finished but nobody is waiting for it");
                            }
                        });
                    }
                }
                Some(DashboardCommand::Shutdown) | None => {
                    info!("Dashboard stopping");
                    break;
                }
            },
        }

        publisher.send_replace(state.clone());
    }
}
