//! Error types for fleet-kv

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("KV error: {0}")]
    Kv(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Corrupt entry under {0}")]
    Corrupt(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kv_error_display() {
        let err = Error::Kv("bucket not found".to_string());
        assert_eq!(err.to_string(), "KV error: bucket not found");
    }

    #[test]
    fn test_connection_error_display() {
        let err = Error::Connection("refused".to_string());
        assert_eq!(err.to_string(), "Connection error: refused");
    }

    #[test]
    fn test_corrupt_error_display() {
        let err = Error::Corrupt("ban.1".to_string());
        assert_eq!(err.to_string(), "Corrupt entry under ban.1");
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<i32>("not_a_number").unwrap_err();
        let err: Error = json_err.into();
        assert!(err.to_string().starts_with("Serialization error:"));
    }
}
