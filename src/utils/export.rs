use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::engine::history::HistoryBuffer;
use crate::errors::AppError;

use super::codegen::CodeFile;

/// Write a generated code file into `dir`, creating it if needed. Returns the written path.
pub fn write_code_file(file: &CodeFile, dir: &Path) -> Result<PathBuf, AppError> {
    std::fs::create_dir_all(dir)
        .map_err(|e| AppError::FileWrite(format!("Cannot create {}: {}", dir.display(), e)))?;

    let path = dir.join(&file.filename);
    let mut out = std::fs::File::create(&path)
        .map_err(|e| AppError::FileWrite(format!("Cannot create {}: {}", path.display(), e)))?;
    out.write_all(file.code.as_bytes())
        .map_err(|e| AppError::FileWrite(e.to_string()))?;

    info!("Wrote {}", path.display());
    Ok(path)
}

/// Write the price history to a CSV file, oldest sample first.
pub fn write_history_csv(history: &HistoryBuffer, path: &Path) -> Result<(), AppError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| {
            AppError::FileWrite(format!("Cannot create {}: {}", parent.display(), e))
        })?;
    }

    let mut wtr = csv::Writer::from_path(path)
        .map_err(|e| AppError::FileWrite(format!("Cannot create CSV: {}", e)))?;

    wtr.write_record(["Time", "Open", "High", "Low", "Close", "Volume", "RSI", "EMA20"])?;

    for s in history.iter() {
        wtr.write_record([
            &s.timestamp,
            &format!("{:.5}", s.open),
            &format!("{:.5}", s.high),
            &format!("{:.5}", s.low),
            &format!("{:.5}", s.close),
            &s.volume.to_string(),
            &format!("{:.2}", s.rsi),
            &format!("{:.5}", s.ema20),
        ])?;
    }

    wtr.flush().map_err(|e| AppError::FileWrite(e.to_string()))?;
    info!("Exported {} samples to {}", history.len(), path.display());
    Ok(())
}
