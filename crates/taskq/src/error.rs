//! Queue errors.

use thiserror::Error;

/// Errors raised while building or configuring a queue.
///
/// Task failures never surface here; they travel through the per-task
/// callback and the `on_error` hook.
#[derive(Debug, Error)]
pub enum QueueError {
    /// Concurrency must allow at least one in-flight task.
    #[error("Invalid concurrency: {0} (must be at least 1)")]
    InvalidConcurrency(usize),

    /// Configuration could not be parsed.
    #[error("Config parse error: {0}")]
    Config(#[from] toml::de::Error),

    /// Configuration file could not be read.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// No tokio runtime was current and the background runtime failed to start.
    #[error("Runtime unavailable: {0}")]
    Runtime(#[source] std::io::Error),
}

/// Result type for queue construction and configuration.
pub type QueueResult<T> = Result<T, QueueError>;
