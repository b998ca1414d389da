//! Core error types for Kickoff HQ timed resources.
//!
//! Every error here is recoverable from the app's point of view: the worst
//! outcome is a stale display that the next reload corrects.

use std::path::PathBuf;

use thiserror::Error;

/// Core error type shared by the timing, poller and backend crates.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    // Stale reads: the client's countdown disagreed with the backend
    #[error("resource '{resource_id}' is not ready yet{}", remaining_note(*.remaining_ms))]
    NotReady {
        resource_id: String,
        /// `None` when the backend did not say how long is left.
        remaining_ms: Option<u64>,
    },

    #[error("resource '{resource_id}' was already collected")]
    AlreadyCollected { resource_id: String },

    #[error("resource '{resource_id}' expired before it was collected")]
    Expired { resource_id: String },

    #[error("resource '{resource_id}' not found")]
    ResourceNotFound { resource_id: String },

    // Funds
    #[error("insufficient {resource}: need {required}, have {available}")]
    InsufficientFunds {
        resource: String,
        required: u64,
        available: u64,
    },

    // Transport
    #[error("network error during '{operation}': {reason}")]
    Network { operation: String, reason: String },

    #[error("'{operation}' timed out after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    // Model validation
    #[error("invalid time window: {reason}")]
    InvalidWindow { reason: String },

    #[error("invalid record: {reason}")]
    InvalidRecord { reason: String },

    // Configuration
    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("failed to read config '{path}': {reason}")]
    ConfigRead { path: PathBuf, reason: String },

    #[error("TOML parse error: {reason}")]
    ConfigParse { reason: String },

    #[error("countdown poller stopped")]
    PollerStopped,
}

impl Error {
    /// Create a not-ready error with the time left.
    pub fn not_ready(resource_id: impl ToString, remaining_ms: u64) -> Self {
        Self::NotReady {
            resource_id: resource_id.to_string(),
            remaining_ms: Some(remaining_ms),
        }
    }

    /// Create a not-ready error when the time left is unknown.
    pub fn not_ready_unknown(resource_id: impl ToString) -> Self {
        Self::NotReady {
            resource_id: resource_id.to_string(),
            remaining_ms: None,
        }
    }

    /// Create an already-collected error.
    pub fn already_collected(resource_id: impl ToString) -> Self {
        Self::AlreadyCollected {
            resource_id: resource_id.to_string(),
        }
    }

    /// Create an expired error.
    pub fn expired(resource_id: impl ToString) -> Self {
        Self::Expired {
            resource_id: resource_id.to_string(),
        }
    }

    /// Create a resource-not-found error.
    pub fn resource_not_found(resource_id: impl ToString) -> Self {
        Self::ResourceNotFound {
            resource_id: resource_id.to_string(),
        }
    }

    /// Create an insufficient-funds error.
    pub fn insufficient_funds(resource: impl Into<String>, required: u64, available: u64) -> Self {
        Self::InsufficientFunds {
            resource: resource.into(),
            required,
            available,
        }
    }

    /// Create a network error.
    pub fn network(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Network {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    /// Create a timeout error.
    pub fn timeout(operation: impl Into<String>, timeout_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_ms,
        }
    }

    /// Create an invalid window error.
    pub fn invalid_window(reason: impl Into<String>) -> Self {
        Self::InvalidWindow {
            reason: reason.into(),
        }
    }

    /// Create an invalid record error.
    pub fn invalid_record(reason: impl Into<String>) -> Self {
        Self::InvalidRecord {
            reason: reason.into(),
        }
    }

    /// Create an invalid config error.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Create a config read error.
    pub fn config_read(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::ConfigRead {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a config parse error.
    pub fn config_parse(reason: impl Into<String>) -> Self {
        Self::ConfigParse {
            reason: reason.into(),
        }
    }

    /// Whether retrying the same request may succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Network { .. } | Self::Timeout { .. })
    }

    /// Whether the client's view of the resource was out of date.
    #[must_use]
    pub const fn is_stale_read(&self) -> bool {
        matches!(
            self,
            Self::NotReady { .. }
                | Self::AlreadyCollected { .. }
                | Self::Expired { .. }
                | Self::ResourceNotFound { .. }
        )
    }

    /// Short, dismissable message suitable for showing to the player.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::NotReady { .. } => "Not ready yet. Check back soon!".to_string(),
            Self::AlreadyCollected { .. } => "Already collected.".to_string(),
            Self::Expired { .. } => "This one expired.".to_string(),
            Self::ResourceNotFound { .. } => "That item is no longer available.".to_string(),
            Self::InsufficientFunds { resource, .. } => format!("Not enough {resource}."),
            Self::Network { .. } | Self::Timeout { .. } => {
                "Connection problem. Please try again.".to_string()
            }
            Self::InvalidWindow { .. }
            | Self::InvalidRecord { .. }
            | Self::InvalidConfig { .. }
            | Self::ConfigRead { .. }
            | Self::ConfigParse { .. }
            | Self::PollerStopped => "Something went wrong.".to_string(),
        }
    }
}

fn remaining_note(remaining_ms: Option<u64>) -> String {
    remaining_ms.map_or_else(String::new, |ms| format!(" ({ms}ms remaining)"))
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Self::config_parse(err.to_string())
    }
}
