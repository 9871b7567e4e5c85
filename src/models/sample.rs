use serde::{Deserialize, Serialize};

/// A single simulated OHLCV sample with its placeholder indicators.
///
/// `rsi` and `ema20` are cosmetic: RSI is drawn from a mid-range band and
/// EMA20 is the close scaled by a constant factor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSample {
    pub timestamp: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
    pub rsi: f64,
    pub ema20: f64,
}
