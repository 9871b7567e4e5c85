use serde::Serialize;

/// All application errors, categorized by domain.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // ── Configuration ──
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to read file: {0}")]
    FileRead(String),

    // ── Market ──
    #[error("Unknown currency pair: {0}")]
    UnknownPair(String),

    #[error("No price history available for analysis")]
    EmptyHistory,

    // ── Analysis ──
    #[error("Missing API key for the signal engine")]
    MissingApiKey,

    #[error("Signal request failed: {0}")]
    SignalRequest(String),

    #[error("Signal request timed out")]
    SignalTimeout,

    #[error("Malformed signal response: {0}")]
    MalformedResponse(String),

    #[error("Invalid signal: {0}")]
    InvalidSignal(String),

    #[error("Analysis already in progress")]
    AnalysisInProgress,

    // ── Dashboard ──
    #[error("Dashboard is not running")]
    DashboardClosed,

    // ── Export ──
    #[error("Failed to write file: {0}")]
    FileWrite(String),

    // ── Commands ──
    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    // ── General ──
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Serializable error response for front-ends.
#[derive(Debug, Serialize, Clone)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl From<&AppError> for ErrorResponse {
    fn from(err: &AppError) -> Self {
        let code = match err {
            AppError::InvalidConfig(_) => "INVALID_CONFIG",
            AppError::FileRead(_) => "FILE_READ",
            AppError::UnknownPair(_) => "UNKNOWN_PAIR",
            AppError::EmptyHistory => "EMPTY_HISTORY",
            AppError::MissingApiKey => "MISSING_API_KEY",
            AppError::SignalRequest(_) => "SIGNAL_REQUEST",
            AppError::SignalTimeout => "SIGNAL_TIMEOUT",
            AppError::MalformedResponse(_) => "MALFORMED_RESPONSE",
            AppError::InvalidSignal(_) => "INVALID_SIGNAL",
            AppError::AnalysisInProgress => "ANALYSIS_IN_PROGRESS",
            AppError::DashboardClosed => "DASHBOARD_CLOSED",
            AppError::FileWrite(_) => "FILE_WRITE",
            AppError::InvalidCommand(_) => "INVALID_COMMAND",
            AppError::Serialization(_) => "SERIALIZATION",
        };
        ErrorResponse {
            code: code.to_string(),
            message: err.to_string(),
        }
    }
}

impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let response = ErrorResponse::from(self);
        response.serialize(serializer)
    }
}

// ── Conversions from external errors ──

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AppError::SignalTimeout
        } else if err.is_decode() {
            AppError::MalformedResponse(err.to_string())
        } else {
            AppError::SignalRequest(err.to_string())
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::FileRead(err.to_string())
    }
}

impl From<csv::Error> for AppError {
    fn from(err: csv::Error) -> Self {
        AppError::FileWrite(err.to_string())
    }
}
