//! Canned signal sources for tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;

use crate::errors::AppError;
use crate::models::signal::SignalType;

use super::{AnalysisRequest, AnalysisResponse, SignalSource};

/// Replays a fixed outcome and records what it was asked.
pub struct StubSource {
    response: Option<AnalysisResponse>,
    gate: Option<Arc<Notify>>,
    calls: AtomicUsize,
    last_request: Mutex<Option<AnalysisRequest>>,
}

impl StubSource {
    pub fn returning(response: AnalysisResponse) -> Self {
        Self {
            response: Some(response),
            gate: None,
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    pub fn failing() -> Self {
        Self {
            response: None,
            ..Self::returning(buy_response())
        }
    }

    /// Hold every call until `gate` is notified.
    pub fn gated(self, gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..self
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<AnalysisRequest> {
        self.last_request.lock().unwrap().clone()
    }
}

impl SignalSource for StubSource {
    async fn generate(&self, request: &AnalysisRequest) -> Result<AnalysisResponse, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        {
            let mut last = self.last_request.lock().unwrap();
            *last = Some(request.clone());
        }
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        match &self.response {
            Some(response) => Ok(response.clone()),
            None => Err(AppError::SignalRequest("stub engine unreachable".into())),
        }
    }
}

pub fn buy_response() -> AnalysisResponse {
    AnalysisResponse {
        kind: SignalType::Buy,
        entry: 1.0850,
        take_profit: 1.0900,
        stop_loss: 1.0800,
        confidence: 75.0,
        reasoning: "test".into(),
    }
}
