//! Error types for the probe exporter.

use std::time::Duration;

use thiserror::Error;

/// Errors in the scrape query that prevent probing altogether.
///
/// These are the caller's fault and are answered with HTTP 400, unlike a
/// failed probe which is a regular `probe_success 0` response.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TargetError {
    /// No `target` parameter in the query.
    #[error("invalid or missing target: at least one target=host:/path is required")]
    Missing,

    /// A target value is not of the form `host:path`.
    #[error("malformed target {0:?}: expected host:path")]
    Malformed(String),
}

/// Errors from a single external tool invocation.
///
/// Never surfaced to the scraper; the probe folds them into a failure.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// The tool could not be started (usually: not installed).
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The tool did not finish in time.
    #[error("{program} timed out after {timeout:?}")]
    Timeout { program: String, timeout: Duration },

    /// The tool exited unsuccessfully.
    #[error("{program} exited with {}", describe_status(.status))]
    ExitStatus { program: String, status: Option<i32> },
}

fn describe_status(status: &Option<i32>) -> String {
    match status {
        Some(code) => format!("status {code}"),
        None => "no status (killed by signal)".to_string(),
    }
}
