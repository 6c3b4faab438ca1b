//! Per-server failure reported by a remote call.
//!
//! Failures are data: the aggregator groups them by `message`, so two
//! failures with identical text collapse into one output field.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct RemoteFailure {
    pub message: String,
    /// HTTP status of the failed call, when there was one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl RemoteFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
        }
    }

    pub fn with_status(message: impl Into<String>, status: u16) -> Self {
        Self {
            message: message.into(),
            status: Some(status),
        }
    }

    pub fn is_rate_limit(&self) -> bool {
        self.status == Some(429)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_is_the_message() {
        let err = RemoteFailure::with_status("rate limited", 429);
        assert_eq!(err.to_string(), "rate limited");
        assert!(err.is_rate_limit());
        assert!(!RemoteFailure::new("boom").is_rate_limit());
    }
}
