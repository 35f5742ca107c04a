// Profiler error taxonomy
//
// Lookups that are expected to miss under normal use (unknown artifact ids,
// collected heap objects) return Option instead of an error.

use thiserror::Error;

/// Convenience alias used across the profiling components.
pub type Result<T> = std::result::Result<T, ProfilerError>;

/// Errors surfaced synchronously by the profiling session manager.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProfilerError {
    /// Operation attempted while the owning state machine is not in the
    /// required state. No partial state change occurs.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// The hosting engine lacks the requested instrumentation feature.
    #[error("{feature} is not supported by this engine; requires {minimum_version} or newer")]
    CapabilityUnsupported {
        /// The instrumentation feature that was requested
        feature: String,
        /// Minimum engine version that carries the feature
        minimum_version: String,
    },

    /// The serializer failed to produce a well-formed document.
    #[error("serialization failed: {0}")]
    Serialization(String),
}

impl ProfilerError {
    /// Create an invalid-state error
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState(message.into())
    }

    /// Create a capability error naming the minimum supported engine version
    pub fn capability_unsupported(
        feature: impl Into<String>,
        minimum_version: impl Into<String>,
    ) -> Self {
        Self::CapabilityUnsupported {
            feature: feature.into(),
            minimum_version: minimum_version.into(),
        }
    }

    /// Create a serialization-failure error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization(message.into())
    }
}

impl From<serde_json::Error> for ProfilerError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
