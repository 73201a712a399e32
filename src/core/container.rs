/// Ephemeral container lifecycle
///
/// Drives one container per run through pull -> create -> start ->
/// attach-logs -> commit -> remove. The attached log stream ending is the
/// signal that the in-container command has finished; an explicit exit
/// status check can be enabled on top of that.

use std::future::Future;
use std::io::Write;

use futures::StreamExt;

use super::config::VaultConfig;
use super::error::VaultError;
use super::progress::stream_pull_progress;
use super::runtime::{ContainerRuntime, ContainerSpec, LogChunk};

/// When the controller pulls images before running them
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PullPolicy {
    /// Pull explicit images and namespaced images; local names are assumed present
    #[default]
    Auto,
    /// Never pull
    Never,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleState {
    Absent,
    Created(String),
    Running(String),
    Removed(String),
}

pub struct ContainerController<'a, R: ContainerRuntime + ?Sized> {
    runtime: &'a R,
    config: &'a VaultConfig,
    state: LifecycleState,
    committed: Option<String>,
}

impl<'a, R: ContainerRuntime + ?Sized> ContainerController<'a, R> {
    pub fn new(runtime: &'a R, config: &'a VaultConfig) -> Self {
        Self {
            runtime,
            config,
            state: LifecycleState::Absent,
            committed: None,
        }
    }

    pub fn state(&self) -> &LifecycleState {
        &self.state
    }

    /// Id of the container this run owns, until it is removed
    pub fn container_id(&self) -> Option<&str> {
        match &self.state {
            LifecycleState::Created(id) | LifecycleState::Running(id) => Some(id),
            LifecycleState::Absent | LifecycleState::Removed(_) => None,
        }
    }

    /// Image produced by the last successful commit
    pub fn committed_image(&self) -> Option<&str> {
        self.committed.as_deref()
    }

    pub fn should_pull(&self, image_override: Option<&str>) -> bool {
        match self.config.pull_policy {
            PullPolicy::Never => false,
            PullPolicy::Auto => {
                image_override.is_some_and(|image| !image.is_empty())
                    || !self.config.namespace.is_empty()
            }
        }
    }

    /// Pull the target image, printing progress as it arrives
    pub async fn pull(&self, image_override: Option<&str>) -> Result<(), VaultError> {
        let image = self.config.resolve_image(image_override);
        if !self.should_pull(image_override) {
            tracing::debug!(image = %image, "skipping pull, image expected locally");
            return Ok(());
        }

        tracing::info!(image = %image, "pulling image");
        let frames = self.runtime.pull_image(&image);
        let summary = self
            .bounded(
                "pull",
                stream_pull_progress(&image, frames, self.config.decode_policy, |event| {
                    println!("{}", event)
                }),
            )
            .await?;

        if summary.skipped > 0 {
            tracing::warn!(image = %image, skipped = summary.skipped, "some progress frames could not be decoded");
        }
        Ok(())
    }

    /// Create and start a container running `cmd`, then relay its output until it exits
    pub async fn run(&mut self, image_override: Option<&str>, cmd: Vec<String>) -> Result<(), VaultError> {
        if let LifecycleState::Created(id) | LifecycleState::Running(id) | LifecycleState::Removed(id) =
            &self.state
        {
            return Err(VaultError::ContainerExists(id.clone()));
        }

        let spec = ContainerSpec::with_volume(
            self.config.resolve_image(image_override),
            cmd,
            self.config.volume.as_str(),
            self.config.mount_path.as_str(),
        );

        let id = self.runtime.create_container(&spec).await?;
        tracing::info!(container = %short_id(&id), image = %spec.image, "created container");
        self.state = LifecycleState::Created(id.clone());

        self.runtime.start_container(&id).await?;
        self.state = LifecycleState::Running(id.clone());
        tracing::debug!(container = %short_id(&id), cmd = ?spec.cmd, "started container");

        let relayed = self.bounded("run", self.relay_logs(&id)).await?;
        tracing::debug!(container = %short_id(&id), bytes = relayed, "container output finished");

        if self.config.check_exit_status {
            let exit_code = self.bounded("wait", self.runtime.wait_container(&id)).await?;
            if exit_code != 0 {
                return Err(VaultError::CommandFailed {
                    container: short_id(&id).to_string(),
                    exit_code,
                });
            }
        }
        Ok(())
    }

    /// Snapshot the container filesystem into the volume's image
    pub async fn commit(&mut self) -> Result<String, VaultError> {
        let id = self.container_id().ok_or(VaultError::NotRunning("commit"))?;

        let image = self.config.image_reference();
        self.runtime.commit_container(id, &image).await?;
        tracing::info!(container = %short_id(id), image = %image, "committed container");

        self.committed = Some(image.clone());
        Ok(image)
    }

    /// Delete the container; the mounted volume is kept
    pub async fn remove(&mut self) -> Result<(), VaultError> {
        self.delete(false).await
    }

    /// Force-delete the container, killing it if it is still running
    pub async fn discard(&mut self) -> Result<(), VaultError> {
        self.delete(true).await
    }

    async fn delete(&mut self, force: bool) -> Result<(), VaultError> {
        let id = self
            .container_id()
            .ok_or(VaultError::NotRunning("remove"))?
            .to_string();

        self.runtime.remove_container(&id, force).await?;
        tracing::info!(container = %short_id(&id), force, "removed container");

        self.state = LifecycleState::Removed(id);
        Ok(())
    }

    async fn relay_logs(&self, id: &str) -> Result<usize, VaultError> {
        let mut logs = self.runtime.container_logs(id);
        let mut relayed = 0;

        while let Some(chunk) = logs.next().await {
            let chunk = chunk?;
            relayed += chunk.len();
            match chunk {
                LogChunk::Stdout(bytes) => std::io::stdout().write_all(&bytes)?,
                LogChunk::Stderr(bytes) => std::io::stderr().write_all(&bytes)?,
            }
        }

        std::io::stdout().flush()?;
        Ok(relayed)
    }

    async fn bounded<T, F>(&self, step: &'static str, operation: F) -> Result<T, VaultError>
    where
        F: Future<Output = Result<T, VaultError>>,
    {
        match self.config.step_timeout {
            Some(limit) => tokio::time::timeout(limit, operation)
                .await
                .map_err(|_| VaultError::Timeout { step, limit })?,
            None => operation.await,
        }
    }
}

fn short_id(id: &str) -> &str {
    &id[..id.len().min(12)]
}
