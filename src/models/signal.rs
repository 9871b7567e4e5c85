use std::fmt;

use serde::{Deserialize, Serialize};

/// Recommended trade action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SignalType {
    Buy,
    Sell,
    Neutral,
}

impl SignalType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalType::Buy => "BUY",
            SignalType::Sell => "SELL",
            SignalType::Neutral => "NEUTRAL",
        }
    }
}

impl fmt::Display for SignalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A trade recommendation produced by an analysis request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeSignal {
    #[serde(rename = "type")]
    pub kind: SignalType,
    pub entry: f64,
    pub take_profit: f64,
    pub stop_loss: f64,
    /// Percentage between 0 and 100.
    pub confidence: f64,
    pub reasoning: String,
    pub timestamp: String,
}
