/// Error types shared by the volume, container and pipeline layers

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum VaultError {
    /// The container runtime rejected or failed an operation
    #[error("container runtime error: {0}")]
    Runtime(#[from] bollard::errors::Error),

    #[error("volume '{0}' already exists")]
    VolumeExists(String),

    /// The runtime reported an error frame while pulling
    #[error("pull of {image} failed: {message}")]
    PullRejected { image: String, message: String },

    /// An operation needing a container was attempted before one was created
    #[error("cannot {0}: the container is not running")]
    NotRunning(&'static str),

    #[error("container {0} was already created for this run")]
    ContainerExists(String),

    #[error("malformed pull progress frame: {0}")]
    Decode(#[from] serde_json::Error),

    /// The runtime client could not decode a progress message it received
    #[error("undecodable pull progress from the runtime: {0}")]
    MalformedProgress(String),

    #[error("{step} timed out after {}", format_limit(.limit))]
    Timeout { step: &'static str, limit: Duration },

    #[error("command in container {container} exited with status {exit_code}")]
    CommandFailed { container: String, exit_code: i64 },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn format_limit(limit: &Duration) -> humantime::FormattedDuration {
    humantime::format_duration(*limit)
}

impl VaultError {
    /// True for failures reported by the container runtime itself
    pub fn is_runtime(&self) -> bool {
        matches!(
            self,
            VaultError::Runtime(_)
                | VaultError::VolumeExists(_)
                | VaultError::PullRejected { .. }
                | VaultError::CommandFailed { .. }
        )
    }

    /// True when an operation was attempted in the wrong lifecycle state
    pub fn is_precondition(&self) -> bool {
        matches!(self, VaultError::NotRunning(_) | VaultError::ContainerExists(_))
    }
}
