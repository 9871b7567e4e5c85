pub mod analysis;
pub mod commands;
pub mod dashboard;
pub mod engine;
pub mod errors;
pub mod models;
pub mod utils;

use std::path::PathBuf;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinSet;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::analysis::gemini::GeminiClient;
use crate::commands::{Command, Outcome};
use crate::models::config::AppConfig;

/// Start the dashboard and drive it from stdin until `quit`, EOF or Ctrl-C.
pub async fn run() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("Starting SignalDesk");

    let config_path = std::env::var_os("SIGNAL_DESK_CONFIG").map(PathBuf::from);
    let config = AppConfig::load(config_path.as_deref())?;
    if config.analysis.api_key.is_empty() {
        warn!("No GEMINI_API_KEY set; analysis will return the fallback signal");
    }

    let source = Arc::new(GeminiClient::new(&config.analysis));
    info!("Signal engine: {}", source.model());
    let (handle, task) = dashboard::spawn(config.clone(), source);

    println!("{}", commands::HELP);

    let mut pending = JoinSet::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    info!("Input closed");
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                let outcome = match line.parse::<Command>() {
                    Ok(command) => {
                        commands::execute(command, &handle, &config, &mut pending).await
                    }
                    Err(e) => Err(e),
                };
                match outcome {
                    Ok(Outcome::Quit) => break,
                    Ok(Outcome::Continue) => {}
                    Err(e) => commands::report_error(&e),
                }
            }
            _ = &mut ctrl_c => {
                info!("Interrupted");
                break;
            }
        }
    }

    handle.shutdown().await;
    task.await?;

    if !pending.is_empty() {
        println!("Waiting for the running analysis to finish...");
    }
    while pending.join_next().await.is_some() {}

    info!("SignalDesk stopped");
    Ok(())
}
