use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::AppError;

/// Instrument metadata for a tradable pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PairSpec {
    pub symbol: &'static str,
    pub label: &'static str,
    /// Number of decimal places
    pub digits: usize,
}

/// Pairs offered by the dashboard.
pub const SUPPORTED_PAIRS: [PairSpec; 4] = [
    PairSpec { symbol: "EUR/USD", label: "EUR/USD", digits: 5 },
    PairSpec { symbol: "GBP/USD", label: "GBP/USD", digits: 5 },
    PairSpec { symbol: "USD/JPY", label: "USD/JPY", digits: 3 },
    PairSpec { symbol: "XAU/USD", label: "GOLD (XAU/USD)", digits: 2 },
];

/// Look up a supported pair by symbol (case-insensitive).
pub fn find_pair(symbol: &str) -> Option<&'static PairSpec> {
    let symbol = symbol.trim();
    SUPPORTED_PAIRS
        .iter()
        .find(|p| p.symbol.eq_ignore_ascii_case(symbol))
}

/// Parameters of the synthetic price feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Starting price of the session (EUR/USD baseline).
    pub baseline_price: f64,
    /// Full width of the per-tick close perturbation; closes move by at most half of it.
    pub volatility: f64,
    /// Upper bound of the random wick added above the high / below the low.
    pub wick_range: f64,
    /// Volume is drawn from `0..max_volume`.
    pub max_volume: u64,
    pub rsi_floor: f64,
    pub rsi_span: f64,
    /// EMA20 placeholder = close * ema_factor.
    pub ema_factor: f64,
    pub history_capacity: usize,
    /// Samples generated at startup.
    pub seed_length: usize,
    pub tick_interval_ms: u64,
    /// Fixed RNG seed for a reproducible feed. `None` draws from OS entropy.
    pub rng_seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            baseline_price: 1.0850,
            volatility: 0.0004,
            wick_range: 0.0001,
            max_volume: 5000,
            rsi_floor: 40.0,
            rsi_span: 20.0,
            ema_factor: 0.9998,
            history_capacity: 50,
            seed_length: 40,
            tick_interval_ms: 3000,
            rng_seed: None,
        }
    }
}

impl SimulationConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

/// Settings for the AI signal engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub base_url: String,
    pub model: String,
    /// Never serialized; supplied through the environment or a config file.
    #[serde(skip_serializing)]
    pub api_key: String,
    /// Number of most recent samples sent with each request.
    pub window: usize,
    /// 0 disables the timeout and waits for the engine indefinitely.
    pub timeout_secs: u64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-3-pro-preview".to_string(),
            api_key: String::new(),
            window: 15,
            timeout_secs: 60,
        }
    }
}

impl AnalysisConfig {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub simulation: SimulationConfig,
    pub analysis: AnalysisConfig,
    pub default_pair: String,
    pub export_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            simulation: SimulationConfig::default(),
            analysis: AnalysisConfig::default(),
            default_pair: "EUR/USD".to_string(),
            export_dir: PathBuf::from("./export"),
        }
    }
}

impl AppConfig {
    /// Load configuration: JSON file (if given), then environment overrides, then validation.
    pub fn load(path: Option<&Path>) -> Result<Self, AppError> {
        let mut config = match path {
            Some(path) => {
                let content = std::fs::read_to_string(path).map_err(|e| {
                    AppError::FileRead(format!("{}: {}", path.display(), e))
                })?;
                let config: AppConfig = serde_json::from_str(&content)
                    .map_err(|e| AppError::InvalidConfig(format!("{}: {}", path.display(), e)))?;
                info!("Loaded configuration from {}", path.display());
                config
            }
            None => AppConfig::default(),
        };
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Override fields from environment variables.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|name| env::var(name).ok());
    }

    /// Apply overrides from `lookup`. Blank values and values that fail to
    /// parse are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        };

        if let Some(key) = get("GEMINI_API_KEY").or_else(|| get("API_KEY")) {
            self.analysis.api_key = key;
        }
        if let Some(model) = get("SIGNAL_DESK_MODEL") {
            self.analysis.model = model;
        }
        if let Some(ms) = parse(get("SIGNAL_DESK_TICK_MS")) {
            self.simulation.tick_interval_ms = ms;
        }
        if let Some(secs) = parse(get("SIGNAL_DESK_TIMEOUT_SECS")) {
            self.analysis.timeout_secs = secs;
        }
        if let Some(seed) = parse(get("SIGNAL_DESK_SEED")) {
            self.simulation.rng_seed = Some(seed);
        }
        if let Some(pair) = get("SIGNAL_DESK_PAIR") {
            self.default_pair = pair;
        }
        if let Some(dir) = get("SIGNAL_DESK_EXPORT_DIR") {
            self.export_dir = PathBuf::from(dir);
        }
    }

    pub fn validate(&self) -> Result<(), AppError> {
        let sim = &self.simulation;
        if !(sim.baseline_price.is_finite() && sim.baseline_price > 0.0) {
            return Err(AppError::InvalidConfig(format!(
                "baseline_price must be positive, got {}",
                sim.baseline_price
            )));
        }
        if !(sim.volatility >= 0.0 && sim.wick_range >= 0.0 && sim.rsi_span >= 0.0) {
            return Err(AppError::InvalidConfig(
                "volatility, wick_range and rsi_span must be non-negative".into(),
            ));
        }
        if sim.history_capacity == 0 {
            return Err(AppError::InvalidConfig("history_capacity must be at least 1".into()));
        }
        if sim.seed_length == 0 || sim.seed_length > sim.history_capacity {
            return Err(AppError::InvalidConfig(format!(
                "seed_length must be in 1..={}, got {}",
                sim.history_capacity, sim.seed_length
            )));
        }
        if sim.tick_interval_ms == 0 {
            return Err(AppError::InvalidConfig("tick_interval_ms must be positive".into()));
        }
        if self.analysis.window == 0 {
            return Err(AppError::InvalidConfig("analysis window must be at least 1".into()));
        }
        if find_pair(&self.default_pair).is_none() {
            return Err(AppError::UnknownPair(self.default_pair.clone()));
        }
        Ok(())
    }
}

fn parse<T: std::str::FromStr>(value: Option<String>) -> Option<T> {
    value.and_then(|s| s.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.simulation.history_capacity, 50);
        assert_eq!(config.simulation.seed_length, 40);
        assert_eq!(config.analysis.window, 15);
        assert_eq!(config.simulation.tick_interval(), Duration::from_secs(3));
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.simulation.history_capacity = 0;
        assert!(matches!(config.validate(), Err(AppError::InvalidConfig(_))));

        let mut config = AppConfig::default();
        config.simulation.seed_length = 51;
        assert!(matches!(config.validate(), Err(AppError::InvalidConfig(_))));

        let mut config = AppConfig::default();
        config.analysis.window = 0;
        assert!(matches!(config.validate(), Err(AppError::InvalidConfig(_))));

        let mut config = AppConfig::default();
        config.simulation.baseline_price = 0.0;
        assert!(matches!(config.validate(), Err(AppError::InvalidConfig(_))));

        let mut config = AppConfig::default();
        config.default_pair = "EUR/CHF".into();
        assert!(matches!(config.validate(), Err(AppError::UnknownPair(_))));
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{ "simulation": { "tick_interval_ms": 500 }, "default_pair": "USD/JPY" }"#,
        )
        .unwrap();

        let config = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(config.simulation.tick_interval_ms, 500);
        assert_eq!(config.simulation.history_capacity, 50);
        assert_eq!(config.analysis.model, "gemini-3-pro-preview");
    }

    #[test]
    fn test_api_key_is_not_serialized() {
        let mut config = AppConfig::default();
        config.analysis.api_key = "secret".into();
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("secret"));
    }

    #[test]
    fn test_timeout_zero_disables() {
        let mut analysis = AnalysisConfig::default();
        assert_eq!(analysis.timeout(), Some(Duration::from_secs(60)));
        analysis.timeout_secs = 0;
        assert_eq!(analysis.timeout(), None);
    }

    #[test]
    fn test_find_pair() {
        assert_eq!(find_pair("usd/jpy").map(|p| p.digits), Some(3));
        assert!(find_pair("BTC/USD").is_none());
    }

    fn vars(pairs: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        move |name| {
            pairs
                .iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn test_overrides_apply() {
        let mut config = AppConfig::default();
        config.apply_overrides(vars(&[
            ("API_KEY", "fallback-key"),
            ("SIGNAL_DESK_MODEL", "gemini-flash"),
            ("SIGNAL_DESK_TICK_MS", "250"),
            ("SIGNAL_DESK_TIMEOUT_SECS", "0"),
            ("SIGNAL_DESK_SEED", "42"),
            ("SIGNAL_DESK_PAIR", " XAU/USD "),
            ("SIGNAL_DESK_EXPORT_DIR", "/tmp/out"),
        ]));

        assert_eq!(config.analysis.api_key, "fallback-key");
        assert_eq!(config.analysis.model, "gemini-flash");
        assert_eq!(config.simulation.tick_interval_ms, 250);
        assert_eq!(config.analysis.timeout(), None);
        assert_eq!(config.simulation.rng_seed, Some(42));
        assert_eq!(config.default_pair, "XAU/USD");
        assert_eq!(config.export_dir, PathBuf::from("/tmp/out"));
    }

    #[test]
    fn test_gemini_key_wins_over_api_key() {
        let mut config = AppConfig::default();
        config.apply_overrides(vars(&[("GEMINI_API_KEY", "primary"), ("API_KEY", "secondary")]));
        assert_eq!(config.analysis.api_key, "primary");
    }

    #[test]
    fn test_unparsable_and_blank_overrides_are_ignored() {
        let mut config = AppConfig::default();
        config.apply_overrides(vars(&[
            ("SIGNAL_DESK_TICK_MS", "fast"),
            ("SIGNAL_DESK_SEED", "-1"),
            ("SIGNAL_DESK_MODEL", "   "),
        ]));

        assert_eq!(config.simulation.tick_interval_ms, 3000);
        assert_eq!(config.simulation.rng_seed, None);
        assert_eq!(config.analysis.model, "gemini-3-pro-preview");
    }
}
