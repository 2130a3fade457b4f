//! Error types for sliding window operations.
//!
//! Every variant names the window it was raised for, and variants that come
//! from the OS also carry the derived key, so that misuse across processes
//! (two workers racing to initialize the same name, a segment removed by an
//! operator) can be diagnosed from the message alone.

use thiserror::Error;

/// Result type for sliding window operations.
pub type Result<T> = std::result::Result<T, WindowError>;

/// Errors that can occur while creating or operating a sliding window.
#[derive(Debug, Error)]
pub enum WindowError {
    /// Malformed or out-of-range argument. Not retryable.
    #[error("Invalid argument for window '{name}': {reason}")]
    InvalidArgument {
        /// Window name
        name: String,
        /// What was wrong with the argument
        reason: String,
    },

    /// The OS could not create or attach the segment or the semaphore.
    #[error("Could not {operation} for window '{name}' (key {key:#018x}): {source}")]
    Resource {
        /// Window name
        name: String,
        /// Derived resource key
        key: u64,
        /// Operation that failed, e.g. "create shared memory"
        operation: &'static str,
        /// Underlying OS error
        #[source]
        source: std::io::Error,
    },

    /// `reject_matching` selected samples that are not a prefix of the window.
    ///
    /// Removals before the violation have already been applied and are not
    /// rolled back.
    #[error(
        "reject_matching must delete monotonically in window '{name}': \
         sample at logical index {index} matched after {removed} removal(s)"
    )]
    NonMonotonicRemoval {
        /// Window name
        name: String,
        /// Logical index of the offending sample
        index: usize,
        /// Samples removed before the violation was detected
        removed: usize,
    },

    /// `last()` was called on a window without samples.
    #[error("Window '{name}' is empty")]
    EmptyWindow {
        /// Window name
        name: String,
    },

    /// The segment exists but no process has initialized it yet.
    #[error("Window '{name}' (key {key:#018x}) has not been initialized")]
    Uninitialized {
        /// Window name
        name: String,
        /// Derived resource key
        key: u64,
    },

    /// The shared record violates its bounds and cannot be used safely.
    #[error("Window '{name}' (key {key:#018x}) is corrupted: {reason}")]
    Corrupted {
        /// Window name
        name: String,
        /// Derived resource key
        key: u64,
        /// Which bound was violated
        reason: String,
    },
}

impl WindowError {
    /// Build an `InvalidArgument` error.
    pub fn invalid_argument(name: &str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            name: name.to_string(),
            reason: reason.into(),
        }
    }

    /// Whether the operation may succeed if retried after the environment
    /// changes (permissions fixed, IPC limits raised, segment recreated).
    pub const fn is_resource(&self) -> bool {
        matches!(self, Self::Resource { .. } | Self::Uninitialized { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_argument_message() {
        let err = WindowError::invalid_argument("errors", "max_size must be greater than zero");
        assert_eq!(
            err.to_string(),
            "Invalid argument for window 'errors': max_size must be greater than zero"
        );
        assert!(!err.is_resource());
    }

    #[test]
    fn test_resource_error_carries_key_and_source() {
        let err = WindowError::Resource {
            name: "latency".to_string(),
            key: 0xdead_beef,
            operation: "attach shared memory",
            source: std::io::Error::from_raw_os_error(libc::EACCES),
        };
        let message = err.to_string();
        assert!(message.contains("attach shared memory"));
        assert!(message.contains("'latency'"));
        assert!(message.contains("0x00000000deadbeef"));
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.is_resource());
    }

    #[test]
    fn test_non_monotonic_message() {
        let err = WindowError::NonMonotonicRemoval {
            name: "w".to_string(),
            index: 2,
            removed: 1,
        };
        assert!(err.to_string().contains("logical index 2 matched after 1 removal(s)"));
    }
}
