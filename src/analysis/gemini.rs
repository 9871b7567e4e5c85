use std::time::Duration;

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, error};

use crate::errors::AppError;
use crate::models::config::AnalysisConfig;

use super::{AnalysisRequest, AnalysisResponse, SignalSource};

/// Signal source backed by the Gemini `generateContent` endpoint.
#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
    timeout: Option<Duration>,
}

impl GeminiClient {
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            timeout: config.timeout(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    async fn call(&self, request: &AnalysisRequest) -> Result<AnalysisResponse, AppError> {
        if self.api_key.is_empty() {
            return Err(AppError::MissingApiKey);
        }

        let body = request_body(&build_prompt(request)?);
        debug!("POST {}", self.endpoint());

        let mut builder = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body);
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }

        let resp = builder.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            error!("Gemini API returned status {}: {}", status, detail);
            return Err(AppError::SignalRequest(format!("HTTP {}", status)));
        }

        let payload: GenerateContentResponse = resp.json().await?;
        parse_signal_text(&extract_text(payload)?)
    }
}

impl SignalSource for GeminiClient {
    async fn generate(&self, request: &AnalysisRequest) -> Result<AnalysisResponse, AppError> {
        self.call(request).await
    }
}

/// Build the analysis prompt for the engine.
pub fn build_prompt(request: &AnalysisRequest) -> Result<String, AppError> {
    let recent = serde_json::to_string(&request.recent)?;
    Ok(format!(
        "Analyze the following technical data for {pair} Forex pair.\n\
         Recent OHLC & Indicators: {recent}.\n\
         Current Price: {price}.\n\n\
         Provide a professional trading signal including Buy/Sell/Neutral recommendation, \
         Entry, Take Profit (TP), Stop Loss (SL), and detailed technical reasoning.\n\
         TP and SL should be realistic based on average true range (ATR) concepts for this pair.",
        pair = request.pair,
        recent = recent,
        price = request.latest_close,
    ))
}

/// Request body asking for JSON constrained to the signal schema.
pub fn request_body(prompt: &str) -> Value {
    json!({
        "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
        "generationConfig": {
            "responseMimeType": "application/json",
            "responseSchema": response_schema(),
        }
    })
}

fn response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "type": { "type": "STRING", "enum": ["BUY", "SELL", "NEUTRAL"] },
            "entry": { "type": "NUMBER" },
            "takeProfit": { "type": "NUMBER" },
            "stopLoss": { "type": "NUMBER" },
            "confidence": { "type": "NUMBER", "description": "Percentage between 0-100" },
            "reasoning": { "type": "STRING" }
        },
        "required": ["type", "entry", "takeProfit", "stopLoss", "confidence", "reasoning"]
    })
}

// ── Wire types ──

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

fn extract_text(payload: GenerateContentResponse) -> Result<String, AppError> {
    payload
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| {
            c.parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<String>()
        })
        .filter(|text| !text.trim().is_empty())
        .ok_or_else(|| AppError::MalformedResponse("response has no text candidate".into()))
}

fn parse_signal_text(text: &str) -> Result<AnalysisResponse, AppError> {
    serde_json::from_str(text).map_err(|e| AppError::MalformedResponse(e.to_string()))
}
