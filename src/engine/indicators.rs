use serde::Serialize;

use crate::models::sample::PriceSample;

use super::history::HistoryBuffer;

pub const RSI_OVERBOUGHT: f64 = 70.0;
pub const RSI_OVERSOLD: f64 = 30.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RsiZone {
    Overbought,
    Oversold,
    Neutral,
}

impl RsiZone {
    pub fn classify(rsi: f64) -> Self {
        if rsi > RSI_OVERBOUGHT {
            RsiZone::Overbought
        } else if rsi < RSI_OVERSOLD {
            RsiZone::Oversold
        } else {
            RsiZone::Neutral
        }
    }
}

/// Close relative to EMA20.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EmaPosition {
    Above,
    Below,
}

/// Display classification of the newest sample's indicators.
#[derive(Debug, Clone, Serialize)]
pub struct IndicatorReadings {
    pub rsi: f64,
    pub rsi_zone: RsiZone,
    pub ema20: f64,
    pub ema_position: EmaPosition,
}

impl IndicatorReadings {
    pub fn from_sample(sample: &PriceSample) -> Self {
        let ema_position = if sample.close > sample.ema20 {
            EmaPosition::Above
        } else {
            EmaPosition::Below
        };
        Self {
            rsi: sample.rsi,
            rsi_zone: RsiZone::classify(sample.rsi),
            ema20: sample.ema20,
            ema_position,
        }
    }

    pub fn from_history(history: &HistoryBuffer) -> Option<Self> {
        history.latest().map(Self::from_sample)
    }
}
