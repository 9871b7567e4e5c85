use std::fmt::Write as FmtWrite;
use std::path::PathBuf;
use std::str::FromStr;

use tokio::task::JoinSet;
use tracing::info;

use crate::dashboard::DashboardHandle;
use crate::engine::indicators::{EmaPosition, RsiZone};
use crate::engine::state::DashboardState;
use crate::errors::{AppError, ErrorResponse};
use crate::models::config::{AppConfig, SUPPORTED_PAIRS};
use crate::models::signal::TradeSignal;
use crate::utils::{codegen, export};

pub const HELP: &str = "\
Commands:
  status                 market snapshot, indicators and active signal
  history [n]            last n samples (default 10)
  analyze                ask the AI engine for a signal
  signal                 show the active signal
  pair <PAIR>            switch currency pair
  pairs                  list supported pairs
  export mql5 [dir]      write the MQL5 EA for the active signal
  export csv [path]      write the price history as CSV
  help                   this text
  quit                   exit";

const DEFAULT_HISTORY_ROWS: usize = 10;

/// A parsed console command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Status,
    History(usize),
    Analyze,
    Signal,
    Pair(String),
    Pairs,
    ExportMql5(Option<PathBuf>),
    ExportCsv(Option<PathBuf>),
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split_whitespace();
        let name = parts
            .next()
            .ok_or_else(|| AppError::InvalidCommand("empty input".into()))?
            .to_lowercase();
        let arg = parts.next();

        let command = match (name.as_str(), arg) {
            ("status", None) => Command::Status,
            ("history", None) => Command::History(DEFAULT_HISTORY_ROWS),
            ("history", Some(n)) => Command::History(n.parse().map_err(|_| {
                AppError::InvalidCommand(format!("history expects a number, got '{}'", n))
            })?),
            ("analyze", None) => Command::Analyze,
            ("signal", None) => Command::Signal,
            ("pair", Some(pair)) => Command::Pair(pair.to_string()),
            ("pair", None) => return Err(AppError::InvalidCommand("usage: pair <PAIR>".into())),
            ("pairs", None) => Command::Pairs,
            ("export", Some(kind)) => {
                let target = parts.next().map(PathBuf::from);
                match kind.to_lowercase().as_str() {
                    "mql5" => Command::ExportMql5(target),
                    "csv" => Command::ExportCsv(target),
                    other => {
                        return Err(AppError::InvalidCommand(format!(
                            "unknown export '{}', expected mql5 or csv",
                            other
                        )))
                    }
                }
            }
            ("help", None) => Command::Help,
            ("quit" | "exit", None) => Command::Quit,
            _ => return Err(AppError::InvalidCommand(s.trim().to_string())),
        };

        if parts.next().is_some() {
            return Err(AppError::InvalidCommand(format!(
                "too many arguments: {}",
                s.trim()
            )));
        }
        Ok(command)
    }
}

/// Whether the console loop should keep reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Continue,
    Quit,
}

/// Run one command against the dashboard.
///
/// Background analyses are added to `pending` so the caller can wait for
/// them before exiting.
pub async fn execute(
    command: Command,
    handle: &DashboardHandle,
    config: &AppConfig,
    pending: &mut JoinSet<()>,
) -> Result<Outcome, AppError> {
    match command {
        Command::Status => println!("{}", render_status(&handle.snapshot())),
        Command::History(n) => println!("{}", render_history(&handle.snapshot(), n)),
        Command::Analyze => {
            // Runs in the background so ticks and input keep flowing.
            println!("Analyzing {}...", handle.snapshot().pair);
            while pending.try_join_next().is_some() {}
            let handle = handle.clone();
            pending.spawn(async move {
                match handle.analyze().await {
                    Ok(signal) => println!("{}", render_signal(&signal)),
                    Err(e) => report_error(&e),
                }
            });
        }
        Command::Signal => match handle.snapshot().active_signal {
            Some(signal) => println!("{}", render_signal(&signal)),
            None => println!("No signal yet. Run 'analyze' to generate one."),
        },
        Command::Pair(pair) => {
            handle.select_pair(&pair).await?;
            println!("Pair set to {}", handle.snapshot().pair);
        }
        Command::Pairs => println!("{}", render_pairs()),
        Command::ExportMql5(dir) => {
            let state = handle.snapshot();
            let result = codegen::generate_mql5(state.active_signal.as_ref(), &state.pair);
            let dir = dir.unwrap_or_else(|| config.export_dir.clone());
            for file in &result.files {
                let path = export::write_code_file(file, &dir)?;
                println!("Wrote {}", path.display());
            }
        }
        Command::ExportCsv(path) => {
            let state = handle.snapshot();
            let path = path.unwrap_or_else(|| config.export_dir.join("history.csv"));
            export::write_history_csv(&state.market.history, &path)?;
            println!("Wrote {} samples to {}", state.market.history.len(), path.display());
        }
        Command::Help => println!("{}", HELP),
        Command::Quit => {
            info!("Quit requested");
            return Ok(Outcome::Quit);
        }
    }
    Ok(Outcome::Continue)
}

/// Print an error with its stable code.
pub fn report_error(err: &AppError) {
    let resp = ErrorResponse::from(err);
    eprintln!("error[{}]: {}", resp.code, resp.message);
}

// ── Rendering ──

pub fn render_status(state: &DashboardState) -> String {
    let mut out = String::new();
    let m = &state.market;

    writeln!(
        out,
        "{}  {:.4}  ({:+.3}%)  updated {}",
        state.pair, m.current_price, m.change_percent, m.last_update
    )
    .ok();

    if let Some(r) = state.readings() {
        let zone = match r.rsi_zone {
            RsiZone::Overbought => "Overbought",
            RsiZone::Oversold => "Oversold",
            RsiZone::Neutral => "Neutral",
        };
        let position = match r.ema_position {
            EmaPosition::Above => "Above",
            EmaPosition::Below => "Below",
        };
        writeln!(out, "RSI (14)  {:.2}  {}", r.rsi, zone).ok();
        writeln!(out, "EMA (20)  {:.5}  {}", r.ema20, position).ok();
    }

    match (&state.active_signal, state.analyzing) {
        (_, true) => write!(out, "Signal    analyzing...").ok(),
        (Some(s), false) => write!(
            out,
            "Signal    {} @ {:.5} ({}% confidence, {})",
            s.kind, s.entry, s.confidence, s.timestamp
        )
        .ok(),
        (None, false) => write!(out, "Signal    none").ok(),
    };
    out
}

pub fn render_history(state: &DashboardState, n: usize) -> String {
    let mut out = String::new();
    writeln!(
        out,
        "{:<10}{:>10}{:>10}{:>10}{:>10}{:>8}{:>8}",
        "Time", "Open", "High", "Low", "Close", "Volume", "RSI"
    )
    .ok();
    for s in state.market.history.recent(n) {
        writeln!(
            out,
            "{:<10}{:>10.5}{:>10.5}{:>10.5}{:>10.5}{:>8}{:>8.2}",
            s.timestamp, s.open, s.high, s.low, s.close, s.volume, s.rsi
        )
        .ok();
    }
    out.trim_end().to_string()
}

pub fn render_signal(signal: &TradeSignal) -> String {
    let mut out = String::new();
    writeln!(out, "{} RECOMMENDATION  ({})", signal.kind, signal.timestamp).ok();
    writeln!(out, "  Confidence   {}%", signal.confidence).ok();
    writeln!(out, "  Entry Price  {:.5}", signal.entry).ok();
    writeln!(out, "  Take Profit  {:.5}", signal.take_profit).ok();
    writeln!(out, "  Stop Loss    {:.5}", signal.stop_loss).ok();
    write!(out, "  \"{}\"", signal.reasoning).ok();
    out
}

pub fn render_pairs() -> String {
    SUPPORTED_PAIRS
        .iter()
        .map(|p| format!("  {:<8} {}", p.symbol, p.label))
        .collect::<Vec<_>>()
        .join("\n")
}
