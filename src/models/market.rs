use serde::Serialize;

use crate::engine::history::HistoryBuffer;

/// Snapshot of the simulated market. Replaced wholesale on every tick.
#[derive(Debug, Clone, Serialize)]
pub struct MarketState {
    /// Always the close of the newest sample in `history`.
    pub current_price: f64,
    /// Change relative to the session baseline, in percent.
    pub change_percent: f64,
    pub last_update: String,
    pub history: HistoryBuffer,
}
