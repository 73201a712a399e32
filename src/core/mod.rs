pub mod backup;
pub mod config;
pub mod container;
pub mod docker;
pub mod error;
pub mod image_ref;
pub mod pipeline;
pub mod progress;
pub mod runtime;
pub mod volume;

#[cfg(test)]
pub(crate) mod testing;

pub use backup::BackupManager;
pub use config::VaultConfig;
pub use container::{ContainerController, LifecycleState, PullPolicy};
pub use docker::DockerRuntime;
pub use error::VaultError;
pub use pipeline::{Pipeline, PipelineError, Step};
pub use progress::{stream_pull_progress, DecodePolicy, PullProgressEvent, PullSummary};
pub use runtime::{ContainerRuntime, ContainerSpec};
pub use volume::VolumeManager;
