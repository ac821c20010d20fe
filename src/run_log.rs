//! Run logging for blueprint commands.
//!
//! Every non-dry invocation appends one JSONL entry to a log file inside
//! the blueprint directory, recording the command, its arguments, outcome,
//! and timing. Read-only commands log too.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

const LOG_FILE: &str = ".bp-log.jsonl";

/// A single run log entry.
#[derive(Debug, Serialize, Deserialize)]
pub struct RunLog {
    /// ISO 8601 timestamp when the command ran
    pub timestamp: DateTime<Utc>,

    /// Blueprint directory the command operated on
    pub dir: String,

    /// Command name (e.g., "generate", "append")
    pub command: String,

    /// Arguments the command was invoked with
    #[serde(default)]
    pub args: serde_json::Value,

    /// Merge status, when the command produced a report
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    /// Whether the command succeeded
    pub success: bool,

    /// Error message if the command failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Command execution duration in milliseconds
    pub duration_ms: u64,
}

/// Append a run log entry inside `dir`.
///
/// This function never fails - logging issues are reported to stderr and
/// swallowed so they cannot break the command itself.
pub fn log_run(
    dir: &Path,
    command: &str,
    args: serde_json::Value,
    status: Option<&str>,
    success: bool,
    error: Option<String>,
    duration_ms: u64,
) {
    let entry = RunLog {
        timestamp: Utc::now(),
        dir: dir.to_string_lossy().to_string(),
        command: command.to_string(),
        args,
        status: status.map(|s| s.to_string()),
        success,
        error,
        duration_ms,
    };
    if let Err(e) = write_entry(dir, &entry) {
        eprintln!("Warning: failed to write run log: {}", e);
    }
}

fn write_entry(dir: &Path, entry: &RunLog) -> std::io::Result<()> {
    if !dir.is_dir() {
        // Nothing was written for this run; keep the log next to real output.
        return Ok(());
    }
    let line = serde_json::to_string(entry).map_err(std::io::Error::other)?;
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join(LOG_FILE))?;
    writeln!(file, "{}", line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_run_appends_jsonl() {
        let tmp = tempfile::tempdir().unwrap();
        log_run(
            tmp.path(),
            "generate",
            serde_json::json!({"input": "model.yaml", "dry_run": false}),
            Some("ok"),
            true,
            None,
            12,
        );
        log_run(
            tmp.path(),
            "append",
            serde_json::json!({"input": "patch.yaml"}),
            Some("needs_resolution"),
            true,
            None,
            3,
        );
        let text = std::fs::read_to_string(tmp.path().join(LOG_FILE)).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: RunLog = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first.command, "generate");
        assert_eq!(first.status.as_deref(), Some("ok"));
        assert_eq!(first.args["input"], "model.yaml");
    }

    #[test]
    fn test_log_run_missing_dir_is_silent() {
        log_run(
            Path::new("/definitely/not/a/dir"),
            "generate",
            serde_json::Value::Null,
            None,
            false,
            Some("boom".to_string()),
            1,
        );
    }
}
