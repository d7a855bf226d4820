//! Captured traffic records and their JSON output.

use crate::error::{Result, SnifferError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use url::Url;

/// Longest response body kept, in characters.
pub const MAX_BODY_CHARS: usize = 2000;

/// Resources that carry no API traffic.
const STATIC_EXTENSIONS: [&str; 8] = [
    ".js", ".css", ".png", ".jpg", ".woff", ".svg", ".woff2", ".ttf",
];

/// One outgoing request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapturedRequest {
    pub url: String,
    pub method: String,
    pub headers: serde_json::Value,
    /// Request body, only for POST requests
    pub post_data: Option<String>,
}

/// One response whose body could be read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapturedResponse {
    pub url: String,
    pub status: i64,
    pub headers: serde_json::Value,
    /// Body truncated to [`MAX_BODY_CHARS`]
    pub body: String,
}

/// Whether `url` points at a script, stylesheet, image or font.
///
/// Only the path is checked, so `/api/data.json` or `?file=x.js` is kept.
pub fn is_static_resource(url: &str) -> bool {
    let path = Url::parse(url).map_or_else(|_| url.to_string(), |u| u.path().to_string());
    let path = path.to_lowercase();
    STATIC_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

/// First [`MAX_BODY_CHARS`] characters of `body`.
pub fn truncate_body(body: &str) -> String {
    body.chars().take(MAX_BODY_CHARS).collect()
}

/// Requests and responses recorded so far, shared with the listener task.
#[derive(Debug, Clone, Default)]
pub struct TrafficLog {
    requests: Arc<Mutex<Vec<CapturedRequest>>>,
    responses: Arc<Mutex<Vec<CapturedResponse>>>,
}

impl TrafficLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_request(&self, request: CapturedRequest) {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request);
    }

    pub fn record_response(&self, response: CapturedResponse) {
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(response);
    }

    pub fn requests(&self) -> Vec<CapturedRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn responses(&self) -> Vec<CapturedResponse> {
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Write `captured_requests.json` and `captured_responses.json` into `dir`.
    pub fn save(&self, dir: &Path) -> Result<()> {
        write_json(&dir.join("captured_requests.json"), &self.requests())?;
        write_json(&dir.join("captured_responses.json"), &self.responses())?;
        Ok(())
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json).map_err(|source| SnifferError::Output {
        path: path.display().to_string(),
        source,
    })
}
