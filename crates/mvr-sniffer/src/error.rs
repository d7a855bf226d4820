use thiserror::Error;

pub type Result<T> = std::result::Result<T, SnifferError>;

#[derive(Debug, Error)]
pub enum SnifferError {
    #[error("chromium error: {0}")]
    Chromium(String),

    #[error("navigation failed: {0}")]
    Navigation(String),

    #[error("form inspection failed: {0}")]
    Inspection(String),

    #[error("screenshot failed: {0}")]
    Screenshot(String),

    #[error("failed to write {path}: {source}")]
    Output {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<chromiumoxide::error::CdpError> for SnifferError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        Self::Chromium(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SnifferError::Navigation("net::ERR_NAME_NOT_RESOLVED".to_string());
        assert_eq!(
            err.to_string(),
            "navigation failed: net::ERR_NAME_NOT_RESOLVED"
        );
    }

    #[test]
    fn test_output_error_names_path() {
        let err = SnifferError::Output {
            path: "captured_data/captured_requests.json".to_string(),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        };
        assert!(err.to_string().contains("captured_requests.json"));
    }
}
