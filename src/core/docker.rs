/// Docker integration
///
/// Implements the container runtime seam on top of the Docker Engine API.

use anyhow::{Context, Result};
use async_trait::async_trait;
use bollard::container::{
    Config, CreateContainerOptions, LogOutput, LogsOptions, RemoveContainerOptions,
    StartContainerOptions, WaitContainerOptions,
};
use bollard::image::{CommitContainerOptions, CreateImageOptions};
use bollard::models::{CreateImageInfo, HostConfig, Mount, MountTypeEnum};
use bollard::volume::{CreateVolumeOptions, RemoveVolumeOptions};
use bollard::Docker;
use futures::StreamExt;

use super::error::VaultError;
use super::image_ref::split_reference;
use super::runtime::{ContainerRuntime, ContainerSpec, FrameStream, LogChunk, LogStream};
use crate::utils::COMMIT_AUTHOR;

#[derive(Clone)]
pub struct DockerRuntime {
    docker: Docker,
}

impl DockerRuntime {
    /// Connect using DOCKER_HOST or the platform's default socket
    pub fn connect() -> Result<Self> {
        let docker = Docker::connect_with_local_defaults()
            .context("Failed to connect to Docker daemon. Is Docker running?")?;
        Ok(Self { docker })
    }

    /// Check if Docker daemon is accessible
    pub async fn check_docker(&self) -> bool {
        self.docker.ping().await.is_ok()
    }
}

/// Docker API container configuration for an ephemeral container
fn container_config(spec: &ContainerSpec) -> Config<String> {
    let mounts = spec
        .mounts
        .iter()
        .map(|m| Mount {
            typ: Some(MountTypeEnum::VOLUME),
            source: Some(m.source.clone()),
            target: Some(m.target.clone()),
            ..Default::default()
        })
        .collect();

    Config {
        image: Some(spec.image.clone()),
        cmd: Some(spec.cmd.clone()),
        host_config: Some(HostConfig {
            mounts: Some(mounts),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Re-encode a pull progress message as one NDJSON frame
fn progress_frame(info: &CreateImageInfo) -> Result<Vec<u8>, VaultError> {
    let mut frame = serde_json::to_vec(info)?;
    frame.push(b'\n');
    Ok(frame)
}

/// Pull stream errors; messages bollard could not decode stay subject to the decode policy
fn pull_error(err: bollard::errors::Error) -> VaultError {
    match err {
        bollard::errors::Error::JsonDataError { .. }
        | bollard::errors::Error::JsonSerdeError { .. } => {
            VaultError::MalformedProgress(err.to_string())
        }
        other => VaultError::Runtime(other),
    }
}

fn log_chunk(output: LogOutput) -> LogChunk {
    match output {
        LogOutput::StdErr { message } => LogChunk::Stderr(message.to_vec()),
        LogOutput::StdOut { message }
        | LogOutput::Console { message }
        | LogOutput::StdIn { message } => LogChunk::Stdout(message.to_vec()),
    }
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn create_volume(&self, name: &str) -> Result<(), VaultError> {
        // The engine returns an existing volume instead of failing
        if self.docker.inspect_volume(name).await.is_ok() {
            return Err(VaultError::VolumeExists(name.to_string()));
        }

        self.docker
            .create_volume(CreateVolumeOptions {
                name: name.to_string(),
                ..Default::default()
            })
            .await?;
        Ok(())
    }

    async fn remove_volume(&self, name: &str, force: bool) -> Result<(), VaultError> {
        self.docker
            .remove_volume(name, Some(RemoveVolumeOptions { force }))
            .await?;
        Ok(())
    }

    fn pull_image(&self, image: &str) -> FrameStream {
        let (repository, tag) = split_reference(image);
        let options = CreateImageOptions {
            from_image: repository.to_string(),
            tag: tag.to_string(),
            ..Default::default()
        };

        self.docker
            .create_image(Some(options), None, None)
            .map(|info| progress_frame(&info.map_err(pull_error)?))
            .boxed()
    }

    async fn create_container(&self, spec: &ContainerSpec) -> Result<String, VaultError> {
        let response = self
            .docker
            .create_container(None::<CreateContainerOptions<String>>, container_config(spec))
            .await?;

        for warning in &response.warnings {
            tracing::warn!(container = %response.id, "{}", warning);
        }
        Ok(response.id)
    }

    async fn start_container(&self, id: &str) -> Result<(), VaultError> {
        self.docker
            .start_container(id, None::<StartContainerOptions<String>>)
            .await?;
        Ok(())
    }

    fn container_logs(&self, id: &str) -> LogStream {
        let options = LogsOptions::<String> {
            follow: true,
            stdout: true,
            stderr: true,
            ..Default::default()
        };

        self.docker
            .logs(id, Some(options))
            .map(|output| Ok(log_chunk(output?)))
            .boxed()
    }

    async fn commit_container(&self, id: &str, image: &str) -> Result<(), VaultError> {
        let (repository, tag) = split_reference(image);
        let options = CommitContainerOptions {
            container: id.to_string(),
            repo: repository.to_string(),
            tag: tag.to_string(),
            comment: format!("volume backup taken {}", chrono::Utc::now().to_rfc3339()),
            author: COMMIT_AUTHOR.to_string(),
            pause: true,
            changes: None,
        };

        self.docker
            .commit_container(options, Config::<String>::default())
            .await?;
        Ok(())
    }

    async fn remove_container(&self, id: &str, force: bool) -> Result<(), VaultError> {
        self.docker
            .remove_container(
                id,
                Some(RemoveContainerOptions {
                    force,
                    ..Default::default()
                }),
            )
            .await?;
        Ok(())
    }

    async fn wait_container(&self, id: &str) -> Result<i64, VaultError> {
        let options = WaitContainerOptions {
            condition: "not-running".to_string(),
        };
        let mut waits = self.docker.wait_container(id, Some(options));

        match waits.next().await {
            Some(Ok(response)) => Ok(response.status_code),
            // Non-zero exits arrive as an error carrying the code
            Some(Err(bollard::errors::Error::DockerContainerWaitError { code, .. })) => Ok(code),
            Some(Err(e)) => Err(e.into()),
            None => Ok(0),
        }
    }
}
