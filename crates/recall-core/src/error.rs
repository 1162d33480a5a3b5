// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Recall memory assistant.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

/// The primary error type used across all Recall adapter traits and core operations.
#[derive(Debug, Error)]
pub enum RecallError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Reasoning provider errors (API failure, malformed response).
    #[error("provider error: {message}")]
    Provider {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Embedding provider errors.
    #[error("embedding error: {message}")]
    Embedding {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Malformed tool arguments or user input.
    #[error("validation error: {0}")]
    Validation(String),

    /// A referenced entity does not exist for the owner.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Optimistic check-and-set lost against a concurrent writer.
    #[error("concurrent modification of {entity} {id}")]
    Conflict { entity: &'static str, id: String },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl RecallError {
    /// Shorthand for a provider error without an underlying source.
    pub fn provider(message: impl Into<String>) -> Self {
        Self::Provider {
            message: message.into(),
            source: None,
        }
    }

    /// Shorthand for an embedding error without an underlying source.
    pub fn embedding(message: impl Into<String>) -> Self {
        Self::Embedding {
            message: message.into(),
            source: None,
        }
    }

    /// Returns true for failures of an external collaborator (reasoning,
    /// embedding, or a timeout talking to either). Callers degrade instead
    /// of aborting on these.
    pub fn is_external(&self) -> bool {
        matches!(
            self,
            Self::Provider { .. } | Self::Embedding { .. } | Self::Timeout { .. }
        )
    }
}

/// Runs `fut` under a deadline, mapping expiry to [`RecallError::Timeout`].
///
/// Every call to the reasoning or embedding collaborator goes through here.
pub async fn with_timeout<T, F>(duration: Duration, fut: F) -> Result<T, RecallError>
where
    F: Future<Output = Result<T, RecallError>>,
{
    tokio::time::timeout(duration, fut)
        .await
        .map_err(|_| RecallError::Timeout { duration })?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn slow_futures_time_out() {
        let result: Result<(), RecallError> = with_timeout(Duration::from_millis(5), async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(RecallError::Timeout { .. })));
    }

    #[tokio::test]
    async fn inner_errors_pass_through() {
        let result: Result<(), RecallError> = with_timeout(Duration::from_secs(1), async {
            Err(RecallError::Validation("bad".into()))
        })
        .await;
        assert!(matches!(result, Err(RecallError::Validation(_))));
    }
}
