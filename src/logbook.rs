//! Plain-text session logs written by `cow-manager --save-log`.
//!
//! File layout, one block per entry:
//!
//! ```text
//! [User]
//! hello
//!
//! ========================================
//!
//! ```

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use thiserror::Error;

use crate::history::HistoryEntry;

const SEPARATOR: &str = "========================================";

#[derive(Debug, Error)]
pub enum LogbookError {
    #[error("invalid json: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("empty chat history")]
    Empty,

    #[error("failed to create log dir: {0}")]
    CreateDir(std::io::Error),

    #[error("failed to write log file: {0}")]
    Write(std::io::Error),
}

/// Decode the JSON array the cockpit sends on stdin.
pub fn parse_entries(input: &str) -> Result<Vec<HistoryEntry>, LogbookError> {
    Ok(serde_json::from_str(input)?)
}

/// `chat_<YYYYMMDD-HHMMSS>.txt` inside `dir`.
pub fn log_file_name(dir: &Path, now: &DateTime<Local>) -> PathBuf {
    dir.join(format!("chat_{}.txt", now.format("%Y%m%d-%H%M%S")))
}

/// Render every entry in log format.
pub fn format_entries(entries: &[HistoryEntry]) -> String {
    entries
        .iter()
        .map(|e| format!("[{}]\n{}\n\n{SEPARATOR}\n\n", e.role(), e.text()))
        .collect()
}

/// Write `entries` to a new file under `dir` and return its path.
pub fn write_session_log(
    dir: &Path,
    entries: &[HistoryEntry],
    now: &DateTime<Local>,
) -> Result<PathBuf, LogbookError> {
    if entries.is_empty() {
        return Err(LogbookError::Empty);
    }

    std::fs::create_dir_all(dir).map_err(LogbookError::CreateDir)?;

    let path = log_file_name(dir, now);
    let mut file = std::fs::File::create(&path).map_err(LogbookError::Write)?;
    file.write_all(format_entries(entries).as_bytes())
        .map_err(LogbookError::Write)?;

    Ok(path)
}
