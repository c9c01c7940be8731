use thiserror::Error;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum SweeperError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Order store error: {0}")]
    Store(#[from] StoreError),

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type Result<T, E = SweeperError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_convert() {
        let err: SweeperError = StoreError::Unavailable("connection refused".into()).into();
        assert_eq!(
            err.to_string(),
            "Order store error: store unavailable: connection refused"
        );
    }

    #[test]
    fn config_error_display() {
        let err = SweeperError::Config("project_id must be set".into());
        assert_eq!(err.to_string(), "Config error: project_id must be set");
    }
}
