use rand::Rng;

use crate::models::config::SimulationConfig;
use crate::models::sample::PriceSample;
use crate::utils::time::display_time;

/// Generate the next simulated sample from the previous close.
///
/// The close moves by a uniform perturbation in `[-volatility/2, volatility/2)`.
/// High and low extend the open/close range by a non-negative random wick, so
/// `high >= max(open, close)` and `low <= min(open, close)` always hold.
/// RSI and EMA20 are placeholders: RSI is drawn from
/// `[rsi_floor, rsi_floor + rsi_span)` and EMA20 is `close * ema_factor`.
pub fn generate_next_sample<R: Rng + ?Sized>(
    prev_close: f64,
    config: &SimulationConfig,
    rng: &mut R,
) -> PriceSample {
    let change = (rng.gen::<f64>() - 0.5) * config.volatility;
    let close = prev_close + change;

    let high = prev_close.max(close) + rng.gen::<f64>() * config.wick_range;
    let low = prev_close.min(close) - rng.gen::<f64>() * config.wick_range;

    let rsi = config.rsi_floor + rng.gen::<f64>() * config.rsi_span;
    let ema20 = close * config.ema_factor;

    let volume = if config.max_volume == 0 {
        0
    } else {
        rng.gen_range(0..config.max_volume)
    };

    PriceSample {
        timestamp: display_time(),
        open: prev_close,
        high,
        low,
        close,
        volume,
        rsi,
        ema20,
    }
}
