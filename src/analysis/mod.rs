//! AI signal analysis: request shaping, the signal-source seam and its Gemini implementation.

pub mod gemini;
pub mod requester;
#[cfg(test)]
pub(crate) mod testing;

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::signal::{SignalType, TradeSignal};

pub use requester::{request_analysis, FALLBACK_REASONING};

/// Compact projection of one sample sent to the signal engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompactSample {
    /// Close
    pub c: f64,
    /// High
    pub h: f64,
    /// Low
    pub l: f64,
    /// RSI, rounded to 2 decimals
    pub r: f64,
    /// EMA20, rounded to 2 decimals
    pub e: f64,
}

/// Everything the signal engine gets to see for one analysis.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisRequest {
    pub pair: String,
    pub recent: Vec<CompactSample>,
    pub latest_close: f64,
}

/// Structured payload returned by a signal source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResponse {
    #[serde(rename = "type")]
    pub kind: SignalType,
    pub entry: f64,
    pub take_profit: f64,
    pub stop_loss: f64,
    pub confidence: f64,
    pub reasoning: String,
}

impl AnalysisResponse {
    pub fn into_signal(self, timestamp: String) -> TradeSignal {
        TradeSignal {
            kind: self.kind,
            entry: self.entry,
            take_profit: self.take_profit,
            stop_loss: self.stop_loss,
            confidence: self.confidence,
            reasoning: self.reasoning,
            timestamp,
        }
    }
}

/// External capability that turns an analysis request into a signal.
///
/// Implementations make a single attempt and report any failure as an error;
/// the requester decides what the caller sees.
pub trait SignalSource: Send + Sync {
    fn generate(
        &self,
        request: &AnalysisRequest,
    ) -> impl Future<Output = Result<AnalysisResponse, AppError>> + Send;
}
