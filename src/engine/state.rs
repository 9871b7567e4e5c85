use rand::Rng;
use serde::Serialize;
use tracing::debug;

use crate::models::config::AppConfig;
use crate::models::market::MarketState;
use crate::models::sample::PriceSample;
use crate::models::signal::TradeSignal;
use crate::utils::time::display_time;

use super::history::{seed, HistoryBuffer};
use super::indicators::IndicatorReadings;

/// Inputs to the dashboard state machine.
#[derive(Debug, Clone)]
pub enum DashboardEvent {
    Tick(PriceSample),
    PairSelected(String),
    AnalysisStarted,
    /// The request never went out (e.g. empty history).
    AnalysisAborted,
    SignalReady(TradeSignal),
}

/// Everything a front-end needs to render one frame.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardState {
    pub market: MarketState,
    pub active_signal: Option<TradeSignal>,
    pub pair: String,
    pub analyzing: bool,
    #[serde(skip)]
    baseline: f64,
}

impl DashboardState {
    /// Seed the history from the configured baseline.
    pub fn initial<R: Rng + ?Sized>(config: &AppConfig, rng: &mut R) -> Self {
        let sim = &config.simulation;
        let (samples, last) = seed(sim.seed_length, sim, rng);
        let history = HistoryBuffer::from_samples(sim.history_capacity, samples);

        Self {
            market: MarketState {
                current_price: last,
                change_percent: change_percent(sim.baseline_price, last),
                last_update: display_time(),
                history,
            },
            active_signal: None,
            pair: config.default_pair.clone(),
            analyzing: false,
            baseline: sim.baseline_price,
        }
    }

    /// Produce the next state. The previous snapshot is consumed, never patched in place.
    pub fn apply(self, event: DashboardEvent) -> Self {
        match event {
            DashboardEvent::Tick(sample) => {
                let close = sample.close;
                debug!("Tick: close={:.5}", close);
                let history = self.market.history.append(sample);
                Self {
                    market: MarketState {
                        current_price: close,
                        change_percent: change_percent(self.baseline, close),
                        last_update: display_time(),
                        history,
                    },
                    ..self
                }
            }
            DashboardEvent::PairSelected(pair) => Self { pair, ..self },
            DashboardEvent::AnalysisStarted => Self {
                analyzing: true,
                ..self
            },
            DashboardEvent::AnalysisAborted => Self {
                analyzing: false,
                ..self
            },
            DashboardEvent::SignalReady(signal) => Self {
                active_signal: Some(signal),
                analyzing: false,
                ..self
            },
        }
    }

    pub fn readings(&self) -> Option<IndicatorReadings> {
        IndicatorReadings::from_history(&self.market.history)
    }
}

fn change_percent(baseline: f64, price: f64) -> f64 {
    if baseline == 0.0 {
        0.0
    } else {
        (price - baseline) / baseline * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::generator::generate_next_sample;
    use crate::models::signal::SignalType;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn initial() -> (DashboardState, AppConfig, StdRng) {
        let config = AppConfig::default();
        let mut rng = StdRng::seed_from_u64(5);
        let state = DashboardState::initial(&config, &mut rng);
        (state, config, rng)
    }

    #[test]
    fn test_initial_state() {
        let (state, _, _) = initial();
        assert_eq!(state.market.history.len(), 40);
        assert_eq!(state.market.history.iter().next().unwrap().open, 1.0850);
        assert_eq!(
            state.market.current_price,
            state.market.history.latest().unwrap().close
        );
        assert_eq!(state.pair, "EUR/USD");
        assert!(state.active_signal.is_none());
        assert!(!state.analyzing);
    }

    #[test]
    fn test_ticks_keep_price_in_sync_and_bounded() {
        let (mut state, config, mut rng) = initial();
        for _ in 0..30 {
            let sample =
                generate_next_sample(state.market.current_price, &config.simulation, &mut rng);
            state = state.apply(DashboardEvent::Tick(sample));
            assert_eq!(
                state.market.current_price,
                state.market.history.latest().unwrap().close
            );
            assert!(state.market.history.len() <= 50);
        }
        assert_eq!(state.market.history.len(), 50);

        let expected = (state.market.current_price - 1.0850) / 1.0850 * 100.0;
        assert!((state.market.change_percent - expected).abs() < 1e-12);
    }

    #[test]
    fn test_signal_lifecycle() {
        let (state, _, _) = initial();
        let state = state.apply(DashboardEvent::AnalysisStarted);
        assert!(state.analyzing);

        let signal = TradeSignal {
            kind: SignalType::Buy,
            entry: 1.0850,
            take_profit: 1.0900,
            stop_loss: 1.0800,
            confidence: 75.0,
            reasoning: "test".into(),
            timestamp: "12:00:00".into(),
        };
        let state = state.apply(DashboardEvent::SignalReady(signal.clone()));
        assert!(!state.analyzing);
        assert_eq!(state.active_signal, Some(signal));

        let state = state
            .apply(DashboardEvent::AnalysisStarted)
            .apply(DashboardEvent::AnalysisAborted);
        assert!(!state.analyzing);
        assert!(state.active_signal.is_some());
    }

    #[test]
    fn test_pair_selection() {
        let (state, _, _) = initial();
        let state = state.apply(DashboardEvent::PairSelected("GBP/USD".into()));
        assert_eq!(state.pair, "GBP/USD");
    }
}
