use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

const TARGET_PREVIEW_CHARS: usize = 80;

/// One line per `/api/generate` call, written to the log stream.
#[derive(Debug, Serialize)]
pub struct UsageRecord {
    pub timestamp: DateTime<Utc>,
    pub status: u16,
    pub mode: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub duration_ms: u128,
    pub bytes: usize,
    pub target: String,
    pub error: Option<String>,
}

impl UsageRecord {
    pub fn new(mode: &str, kind: &str, target: &str) -> Self {
        Self {
            timestamp: Utc::now(),
            status: 0,
            mode: mode.to_string(),
            kind: kind.to_string(),
            duration_ms: 0,
            bytes: 0,
            target: preview(target),
            error: None,
        }
    }

    pub fn finish(mut self, status: u16, elapsed: Duration, bytes: usize, error: Option<String>) -> Self {
        self.status = status;
        self.duration_ms = elapsed.as_millis();
        self.bytes = bytes;
        self.error = error;
        self
    }

    pub fn emit(&self) {
        let record = serde_json::to_string(self).unwrap_or_default();
        if self.error.is_some() {
            warn!(target: "usage", "{}", record);
        } else {
            info!(target: "usage", "{}", record);
        }
    }
}

/// First characters of `target` on one line, with an ellipsis when cut.
pub fn preview(target: &str) -> String {
    let flat: String = target
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();
    let trimmed = flat.trim();

    match trimmed.char_indices().nth(TARGET_PREVIEW_CHARS) {
        Some((cut, _)) => format!("{}…", &trimmed[..cut]),
        None => trimmed.to_string(),
    }
}
