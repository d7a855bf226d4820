//! Query result types and outcomes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How the portal answered a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// The lookup went through; the text describes the documents
    Success,

    /// The portal rejected the CAPTCHA answer; worth retrying with a new one
    CaptchaError,

    /// The portal rejected the query itself (e.g. malformed EGN); not retryable
    QueryError,

    /// Nothing recognisable in the response
    Unparsed,
}

impl Outcome {
    /// Check if the outcome is successful
    #[must_use]
    pub fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }

    /// Check if the outcome is a rejected CAPTCHA
    #[must_use]
    pub fn is_captcha_error(self) -> bool {
        matches!(self, Self::CaptchaError)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Success => "success",
            Self::CaptchaError => "captcha error",
            Self::QueryError => "query error",
            Self::Unparsed => "unparsed response",
        };
        f.write_str(label)
    }
}

/// The parsed answer to one submitted query.
///
/// `raw_html` is always the body the result text was extracted from.
#[derive(Debug, Clone, Serialize)]
pub struct QueryResult {
    outcome: Outcome,
    egn: String,
    surname: String,
    result_text: String,
    #[serde(skip)]
    raw_html: String,
    queried_at: DateTime<Utc>,
}

impl QueryResult {
    /// Build a result for the given query and response body.
    #[must_use]
    pub fn new(
        outcome: Outcome,
        egn: impl Into<String>,
        surname: impl Into<String>,
        result_text: impl Into<String>,
        raw_html: impl Into<String>,
    ) -> Self {
        Self {
            outcome,
            egn: egn.into(),
            surname: surname.into(),
            result_text: result_text.into(),
            raw_html: raw_html.into(),
            queried_at: Utc::now(),
        }
    }

    /// Classified outcome.
    #[must_use]
    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    /// Whether the lookup succeeded.
    #[must_use]
    pub fn success(&self) -> bool {
        self.outcome.is_success()
    }

    /// Whether the portal rejected the CAPTCHA. Implies `!success()`.
    #[must_use]
    pub fn is_captcha_error(&self) -> bool {
        self.outcome.is_captcha_error()
    }

    /// EGN the query was made for.
    #[must_use]
    pub fn egn(&self) -> &str {
        &self.egn
    }

    /// Surname the query was made for.
    #[must_use]
    pub fn surname(&self) -> &str {
        &self.surname
    }

    /// Human-readable message extracted from the response.
    #[must_use]
    pub fn result_text(&self) -> &str {
        &self.result_text
    }

    /// Exact response body.
    #[must_use]
    pub fn raw_html(&self) -> &str {
        &self.raw_html
    }

    /// When the result was produced.
    #[must_use]
    pub fn queried_at(&self) -> DateTime<Utc> {
        self.queried_at
    }
}
