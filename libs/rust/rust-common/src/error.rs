//! Centralized error type for the shared platform library.
//!
//! Background jobs, tracing setup and other cross-cutting helpers report
//! failures through [`PlatformError`], classified as retryable or not.

use thiserror::Error;

/// Common error type for platform operations.
#[derive(Error, Debug)]
pub enum PlatformError {
    /// A downstream collaborator is temporarily unavailable
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// The bounded queue rejected a job
    #[error("Queue full: {queue}")]
    QueueFull {
        /// Name of the queue that rejected the job
        queue: String,
    },

    /// The worker has shut down and no longer accepts jobs
    #[error("Worker closed: {0}")]
    Closed(String),

    /// Operation timed out
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Invalid input provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PlatformError {
    /// Check if this error is retryable.
    ///
    /// # Examples
    ///
    /// ```
    /// use rust_common::PlatformError;
    ///
    /// let err = PlatformError::Timeout("smtp".to_string());
    /// assert!(err.is_retryable());
    ///
    /// let err = PlatformError::InvalidInput("recipient".to_string());
    /// assert!(!err.is_retryable());
    /// ```
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Unavailable(_) | Self::QueueFull { .. } | Self::Timeout(_)
        )
    }

    /// Create an unavailable error with the given message.
    #[must_use]
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    /// Create a queue full error for the named queue.
    #[must_use]
    pub fn queue_full(queue: impl Into<String>) -> Self {
        Self::QueueFull {
            queue: queue.into(),
        }
    }

    /// Create an internal error with the given message.
    #[must_use]
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
