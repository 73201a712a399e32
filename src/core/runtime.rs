/// Container runtime seam
///
/// The backup and restore pipelines only need a handful of volume, image
/// and container primitives. `DockerRuntime` provides them over the Docker
/// API; tests drive the same code through fakes and mocks.

use async_trait::async_trait;
use futures::stream::BoxStream;

use super::error::VaultError;

/// Raw pull progress output, one or more NDJSON frames per chunk
pub type FrameStream = BoxStream<'static, Result<Vec<u8>, VaultError>>;

/// Combined stdout/stderr output of a container
pub type LogStream = BoxStream<'static, Result<LogChunk, VaultError>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogChunk {
    Stdout(Vec<u8>),
    Stderr(Vec<u8>),
}

impl LogChunk {
    pub fn len(&self) -> usize {
        match self {
            LogChunk::Stdout(bytes) | LogChunk::Stderr(bytes) => bytes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Named volume attached to a container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeMount {
    pub source: String,
    pub target: String,
}

/// What to run in an ephemeral container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSpec {
    pub image: String,
    pub cmd: Vec<String>,
    pub mounts: Vec<VolumeMount>,
}

impl ContainerSpec {
    /// Container running `cmd` in `image` with a single volume mounted
    pub fn with_volume(
        image: impl Into<String>,
        cmd: Vec<String>,
        volume: impl Into<String>,
        mount_path: impl Into<String>,
    ) -> Self {
        Self {
            image: image.into(),
            cmd,
            mounts: vec![VolumeMount {
                source: volume.into(),
                target: mount_path.into(),
            }],
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Create a named volume; fails if the name is already taken
    async fn create_volume(&self, name: &str) -> Result<(), VaultError>;

    /// Remove a named volume; fails if it is in use or missing
    async fn remove_volume(&self, name: &str, force: bool) -> Result<(), VaultError>;

    /// Start pulling an image, streaming progress frames
    fn pull_image(&self, image: &str) -> FrameStream;

    /// Create a container and return its id
    async fn create_container(&self, spec: &ContainerSpec) -> Result<String, VaultError>;

    async fn start_container(&self, id: &str) -> Result<(), VaultError>;

    /// Follow container output until the process exits
    fn container_logs(&self, id: &str) -> LogStream;

    /// Snapshot the container filesystem into `image`
    async fn commit_container(&self, id: &str, image: &str) -> Result<(), VaultError>;

    /// Delete a container (its volumes are left alone); `force` also kills a running one
    async fn remove_container(&self, id: &str, force: bool) -> Result<(), VaultError>;

    /// Wait for the container to stop and return its exit code
    async fn wait_container(&self, id: &str) -> Result<i64, VaultError>;
}
