use tracing::{error, info};

use crate::engine::history::HistoryBuffer;
use crate::errors::AppError;
use crate::models::signal::{SignalType, TradeSignal};
use crate::utils::time::display_time;

use super::{AnalysisRequest, AnalysisResponse, CompactSample, SignalSource};

/// Reasoning attached to the signal returned when the engine cannot be used.
pub const FALLBACK_REASONING: &str = "Failed to connect to AI engine. Check API configuration.";

const INDICATOR_DECIMALS: i32 = 2;

/// Shape the request from the last `window` samples.
pub fn build_request(
    history: &HistoryBuffer,
    pair: &str,
    window: usize,
) -> Result<AnalysisRequest, AppError> {
    let latest = history.latest().ok_or(AppError::EmptyHistory)?;

    let recent = history
        .recent(window)
        .map(|s| CompactSample {
            c: s.close,
            h: s.high,
            l: s.low,
            r: round_to(s.rsi, INDICATOR_DECIMALS),
            e: round_to(s.ema20, INDICATOR_DECIMALS),
        })
        .collect();

    Ok(AnalysisRequest {
        pair: pair.to_string(),
        recent,
        latest_close: latest.close,
    })
}

/// Ask `source` for a signal on the current history.
///
/// Only an empty history is reported as an error, and in that case the
/// source is never called. Every engine failure (network, malformed payload,
/// out-of-range values) resolves to a NEUTRAL fallback signal instead.
pub async fn request_analysis<S: SignalSource>(
    source: &S,
    history: &HistoryBuffer,
    pair: &str,
    window: usize,
) -> Result<TradeSignal, AppError> {
    let request = build_request(history, pair, window)?;
    let latest_close = request.latest_close;

    info!(
        "Requesting analysis: pair={}, samples={}, price={}",
        pair,
        request.recent.len(),
        latest_close
    );

    let outcome = source
        .generate(&request)
        .await
        .and_then(validate_response);

    match outcome {
        Ok(response) => {
            info!(
                "Signal received: {} entry={} confidence={}",
                response.kind, response.entry, response.confidence
            );
            Ok(response.into_signal(display_time()))
        }
        Err(e) => {
            error!("Signal engine error: {}", e);
            Ok(fallback_signal(latest_close))
        }
    }
}

/// The NEUTRAL signal shown when the engine is unreachable or misbehaves.
pub fn fallback_signal(latest_close: f64) -> TradeSignal {
    TradeSignal {
        kind: SignalType::Neutral,
        entry: latest_close,
        take_profit: 0.0,
        stop_loss: 0.0,
        confidence: 0.0,
        reasoning: FALLBACK_REASONING.to_string(),
        timestamp: display_time(),
    }
}

fn validate_response(response: AnalysisResponse) -> Result<AnalysisResponse, AppError> {
    let prices = [
        ("entry", response.entry),
        ("takeProfit", response.take_profit),
        ("stopLoss", response.stop_loss),
    ];
    if let Some((name, value)) = prices.iter().find(|(_, v)| !v.is_finite()) {
        return Err(AppError::InvalidSignal(format!("{} is not finite: {}", name, value)));
    }
    if !(0.0..=100.0).contains(&response.confidence) {
        return Err(AppError::InvalidSignal(format!(
            "confidence out of range: {}",
            response.confidence
        )));
    }
    Ok(response)
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::testing::{buy_response, StubSource};
    use crate::models::sample::PriceSample;

    fn history(n: usize) -> HistoryBuffer {
        let samples = (0..n)
            .map(|i| {
                let close = 1.0850 + i as f64 * 0.0001;
                PriceSample {
                    timestamp: format!("10:00:{:02}", i % 60),
                    open: close - 0.00005,
                    high: close + 0.0001,
                    low: close - 0.0001,
                    close,
                    volume: 100 * i as u64,
                    rsi: 45.123 + i as f64 * 0.5,
                    ema20: close * 0.9998,
                }
            })
            .collect();
        HistoryBuffer::from_samples(50, samples)
    }

    #[tokio::test]
    async fn test_successful_signal_is_passed_through() {
        let source = StubSource::returning(buy_response());
        let signal = request_analysis(&source, &history(40), "EUR/USD", 15)
            .await
            .unwrap();

        assert_eq!(signal.kind, SignalType::Buy);
        assert_eq!(signal.entry, 1.0850);
        assert_eq!(signal.take_profit, 1.0900);
        assert_eq!(signal.stop_loss, 1.0800);
        assert_eq!(signal.confidence, 75.0);
        assert_eq!(signal.reasoning, "test");
        assert!(!signal.timestamp.is_empty());
    }

    #[tokio::test]
    async fn test_failure_falls_back_to_neutral() {
        let source = StubSource::failing();
        let hist = history(40);
        let signal = request_analysis(&source, &hist, "EUR/USD", 15).await.unwrap();

        assert_eq!(signal.kind, SignalType::Neutral);
        assert_eq!(signal.entry, hist.latest().unwrap().close);
        assert_eq!(signal.take_profit, 0.0);
        assert_eq!(signal.stop_loss, 0.0);
        assert_eq!(signal.confidence, 0.0);
        assert_eq!(signal.reasoning, FALLBACK_REASONING);
        assert!(!signal.timestamp.is_empty());
    }

    #[tokio::test]
    async fn test_out_of_range_confidence_falls_back() {
        let source = StubSource::returning(AnalysisResponse {
            confidence: 140.0,
            ..buy_response()
        });
        let signal = request_analysis(&source, &history(5), "GBP/USD", 15).await.unwrap();
        assert_eq!(signal.kind, SignalType::Neutral);
        assert_eq!(signal.confidence, 0.0);
    }

    #[tokio::test]
    async fn test_non_finite_price_falls_back() {
        let source = StubSource::returning(AnalysisResponse {
            stop_loss: f64::NAN,
            ..buy_response()
        });
        let signal = request_analysis(&source, &history(5), "EUR/USD", 15).await.unwrap();
        assert_eq!(signal.kind, SignalType::Neutral);
        assert_eq!(signal.stop_loss, 0.0);
    }

    #[tokio::test]
    async fn test_empty_history_never_calls_source() {
        let source = StubSource::returning(buy_response());
        let result = request_analysis(&source, &HistoryBuffer::new(50), "EUR/USD", 15).await;

        assert!(matches!(result, Err(AppError::EmptyHistory)));
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test]
    async fn test_request_carries_latest_window() {
        let source = StubSource::returning(buy_response());
        let hist = history(40);
        request_analysis(&source, &hist, "USD/JPY", 15).await.unwrap();

        assert_eq!(source.calls(), 1);
        let request = source.last_request().unwrap();
        assert_eq!(request.pair, "USD/JPY");
        assert_eq!(request.recent.len(), 15);
        assert_eq!(request.latest_close, hist.latest().unwrap().close);

        let expected: Vec<f64> = hist.recent(15).map(|s| s.close).collect();
        let sent: Vec<f64> = request.recent.iter().map(|s| s.c).collect();
        assert_eq!(sent, expected);
    }

    #[test]
    fn test_indicators_are_rounded() {
        let request = build_request(&history(1), "EUR/USD", 15).unwrap();
        let only = &request.recent[0];
        assert_eq!(only.r, 45.12);
        assert_eq!(only.e, 1.08);
    }

    #[test]
    fn test_short_history_sends_everything() {
        let request = build_request(&history(4), "EUR/USD", 15).unwrap();
        assert_eq!(request.recent.len(), 4);
    }
}
