use mvr_captcha::CaptchaError;
use mvr_core::ConfigError;
use thiserror::Error;

/// Errors that abort a query.
///
/// A CAPTCHA rejected by the portal or a failed lookup is *not* an error: it
/// is reported through [`crate::QueryResult`]. Everything here is fatal for
/// the current query and is never retried.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{url} returned HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),

    #[error("CAPTCHA error: {0}")]
    Captcha(#[from] CaptchaError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("form page has a CAPTCHA but no solver is configured")]
    NoSolver,
}

pub type Result<T> = std::result::Result<T, ClientError>;
