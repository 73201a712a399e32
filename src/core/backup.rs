/// Backup and restore management
///
/// A backup runs the archive command in a throwaway container that has the
/// volume mounted, commits that container as `<volume>:<tag>` and removes
/// it. A restore recreates the volume and runs the extract command inside
/// the backup image.
///
/// Steps run strictly in order and the first failure stops the pipeline.
/// Nothing is rolled back unless `cleanup_on_failure` is set, in which case
/// an orphaned container is removed; a restore that failed after removing
/// the volume still leaves it absent.

use super::config::VaultConfig;
use super::container::ContainerController;
use super::error::VaultError;
use super::pipeline::{Pipeline, PipelineError, Step};
use super::runtime::ContainerRuntime;
use super::volume::VolumeManager;

pub struct BackupManager<'a, R: ContainerRuntime + ?Sized> {
    runtime: &'a R,
    config: &'a VaultConfig,
}

impl<'a, R: ContainerRuntime + ?Sized> BackupManager<'a, R> {
    pub fn new(runtime: &'a R, config: &'a VaultConfig) -> Self {
        Self { runtime, config }
    }

    /// Snapshot the volume into an image; returns the image reference
    pub async fn backup(&self) -> Result<String, PipelineError> {
        self.run(&Pipeline::backup(self.config)).await
    }

    /// Rebuild the volume from its image; returns the image reference
    pub async fn restore(&self) -> Result<String, PipelineError> {
        self.run(&Pipeline::restore(self.config)).await
    }

    pub async fn run(&self, pipeline: &Pipeline) -> Result<String, PipelineError> {
        let volumes = VolumeManager::new(self.runtime);
        let mut container = ContainerController::new(self.runtime, self.config);
        let total = pipeline.steps.len();

        tracing::info!(pipeline = pipeline.name, volume = %self.config.volume, "starting {} process", pipeline.name);

        for (index, step) in pipeline.steps.iter().enumerate() {
            tracing::debug!(pipeline = pipeline.name, step = step.name(), "step {}/{}", index + 1, total);

            if let Err(source) = self.execute(step, &volumes, &mut container).await {
                tracing::error!(
                    pipeline = pipeline.name,
                    step = step.name(),
                    error = %source,
                    "step failed, skipping the remaining {} step(s)",
                    total - index - 1
                );

                if self.config.cleanup_on_failure {
                    cleanup(&mut container).await;
                }

                return Err(PipelineError {
                    pipeline: pipeline.name,
                    step: step.name(),
                    source,
                });
            }
        }

        let image = self.config.image_reference();
        tracing::info!(pipeline = pipeline.name, image = %image, "{} finished", pipeline.name);
        Ok(image)
    }

    async fn execute(
        &self,
        step: &Step,
        volumes: &VolumeManager<'a, R>,
        container: &mut ContainerController<'a, R>,
    ) -> Result<(), VaultError> {
        match step {
            Step::RemoveVolume => volumes.remove(&self.config.volume, false).await,
            Step::CreateVolume => volumes.create(&self.config.volume).await,
            Step::Pull { image } => container.pull(image.as_deref()).await,
            Step::Run { image, cmd } => container.run(image.as_deref(), cmd.clone()).await,
            Step::Commit => container.commit().await.map(|_| ()),
            Step::RemoveContainer => container.remove().await,
        }
    }
}

/// Remove a container left behind by a failed step
async fn cleanup<R: ContainerRuntime + ?Sized>(container: &mut ContainerController<'_, R>) {
    let Some(id) = container.container_id().map(str::to_string) else {
        return;
    };

    match container.discard().await {
        Ok(()) => tracing::info!(container = %id, "removed orphaned container"),
        Err(e) => tracing::warn!(
            container = %id,
            error = %e,
            "failed to remove orphaned container (may require manual cleanup)"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::runtime::MockContainerRuntime;
    use crate::core::testing::FakeRuntime;
    use crate::core::PullPolicy;
    use futures::StreamExt;
    use std::time::Duration;

    #[tokio::test]
    async fn test_backup_end_to_end() {
        let runtime = FakeRuntime::new();
        let config = VaultConfig::new("myvol");

        let image = BackupManager::new(&runtime, &config).backup().await.unwrap();

        assert_eq!(image, "myvol:latest");
        assert_eq!(
            runtime.calls(),
            vec![
                "pull(alpine)",
                "create(image=alpine)",
                "start",
                "logs",
                "commit(image=myvol:latest)",
                "remove",
            ]
        );
    }

    #[tokio::test]
    async fn test_backup_without_pull() {
        let runtime = FakeRuntime::new();
        let mut config = VaultConfig::new("myvol");
        config.pull_policy = PullPolicy::Never;

        let image = BackupManager::new(&runtime, &config).backup().await.unwrap();

        assert_eq!(image, "myvol:latest");
        assert_eq!(
            runtime.calls(),
            vec![
                "create(image=alpine)",
                "start",
                "logs",
                "commit(image=myvol:latest)",
                "remove",
            ]
        );
    }

    #[tokio::test]
    async fn test_restore_end_to_end() {
        let runtime = FakeRuntime::new().with_volume("myvol");
        let config = VaultConfig::new("myvol").with_tag("v2").with_namespace("alice");

        let image = BackupManager::new(&runtime, &config).restore().await.unwrap();

        assert_eq!(image, "alice/myvol:v2");
        assert_eq!(
            runtime.calls(),
            vec![
                "remove_volume(myvol)",
                "create_volume(myvol)",
                "pull(alice/myvol:v2)",
                "create(image=alice/myvol:v2)",
                "start",
                "logs",
                "remove",
            ]
        );
    }

    #[tokio::test]
    async fn test_restore_local_image_skips_pull() {
        let runtime = FakeRuntime::new().with_volume("myvol");
        let config = VaultConfig::new("myvol");

        BackupManager::new(&runtime, &config).restore().await.unwrap();

        assert_eq!(runtime.count("pull"), 0);
        assert_eq!(runtime.count("create"), 1);
    }

    #[tokio::test]
    async fn test_backup_fails_fast_at_every_step() {
        let expected = [
            ("pull", "pull", 1),
            ("create", "run", 2),
            ("start", "run", 3),
            ("logs", "run", 4),
            ("commit", "commit", 5),
            ("remove", "remove container", 6),
        ];

        for (operation, step, calls) in expected {
            let runtime = FakeRuntime::new().failing_on(operation);
            let config = VaultConfig::new("myvol");

            let err = BackupManager::new(&runtime, &config).backup().await.unwrap_err();

            assert_eq!(err.pipeline, "backup");
            assert_eq!(err.step, step, "failing on {}", operation);
            assert!(err.source.is_runtime());
            assert_eq!(runtime.calls().len(), calls, "calls after failing {}: {:?}", operation, runtime.calls());
        }
    }

    #[tokio::test]
    async fn test_restore_fails_fast_on_missing_volume() {
        let runtime = FakeRuntime::new();
        let config = VaultConfig::new("myvol");

        let err = BackupManager::new(&runtime, &config).restore().await.unwrap_err();

        assert_eq!(err.step, "remove volume");
        assert_eq!(runtime.calls(), vec!["remove_volume(myvol)"]);
    }

    #[tokio::test]
    async fn test_failure_leaves_container_by_default() {
        let runtime = FakeRuntime::new().failing_on("commit");
        let config = VaultConfig::new("myvol");

        BackupManager::new(&runtime, &config).backup().await.unwrap_err();

        assert_eq!(runtime.count("remove"), 0);
    }

    #[tokio::test]
    async fn test_cleanup_on_failure_removes_orphan() {
        let runtime = FakeRuntime::new().failing_on("commit");
        let mut config = VaultConfig::new("myvol");
        config.cleanup_on_failure = true;

        let err = BackupManager::new(&runtime, &config).backup().await.unwrap_err();

        assert_eq!(err.step, "commit");
        assert_eq!(runtime.calls().last().map(String::as_str), Some("remove(force)"));
        assert_eq!(runtime.count("remove"), 1);
    }

    #[tokio::test]
    async fn test_cleanup_force_removes_container_left_running_by_timeout() {
        let mut runtime = MockContainerRuntime::new();
        runtime
            .expect_create_container()
            .times(1)
            .returning(|_| Ok("0123456789abcdef".to_string()));
        runtime.expect_start_container().times(1).returning(|_| Ok(()));
        runtime
            .expect_container_logs()
            .times(1)
            .returning(|_| futures::stream::pending().boxed());
        runtime
            .expect_remove_container()
            .withf(|id: &str, force: &bool| id == "0123456789abcdef" && *force)
            .times(1)
            .returning(|_, _| Ok(()));

        let mut config = VaultConfig::new("myvol");
        config.pull_policy = PullPolicy::Never;
        config.step_timeout = Some(Duration::from_millis(50));
        config.cleanup_on_failure = true;

        let err = BackupManager::new(&runtime, &config).backup().await.unwrap_err();

        assert_eq!(err.step, "run");
        assert!(matches!(err.source, VaultError::Timeout { step: "run", .. }));
    }

    #[tokio::test]
    async fn test_cleanup_skipped_when_no_container_exists() {
        let runtime = FakeRuntime::new().failing_on("pull");
        let mut config = VaultConfig::new("myvol");
        config.cleanup_on_failure = true;

        BackupManager::new(&runtime, &config).backup().await.unwrap_err();

        assert_eq!(runtime.calls(), vec!["pull(alpine)"]);
    }
}
