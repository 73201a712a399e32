/// Named volume management
///
/// Thin pass-through to the runtime: no local state, no retries.

use super::error::VaultError;
use super::runtime::ContainerRuntime;

pub struct VolumeManager<'a, R: ContainerRuntime + ?Sized> {
    runtime: &'a R,
}

impl<'a, R: ContainerRuntime + ?Sized> VolumeManager<'a, R> {
    pub fn new(runtime: &'a R) -> Self {
        Self { runtime }
    }

    pub async fn create(&self, name: &str) -> Result<(), VaultError> {
        tracing::info!(volume = name, "creating volume");
        self.runtime.create_volume(name).await
    }

    pub async fn remove(&self, name: &str, force: bool) -> Result<(), VaultError> {
        tracing::info!(volume = name, force, "removing volume");
        self.runtime.remove_volume(name, force).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::testing::FakeRuntime;

    #[tokio::test]
    async fn test_create_twice_collides() {
        let runtime = FakeRuntime::new();
        let volumes = VolumeManager::new(&runtime);

        volumes.create("myvol").await.unwrap();
        let err = volumes.create("myvol").await.unwrap_err();

        assert!(matches!(err, VaultError::VolumeExists(ref name) if name == "myvol"));
        assert!(err.is_runtime());
    }

    #[tokio::test]
    async fn test_remove_then_create() {
        let runtime = FakeRuntime::new().with_volume("myvol");
        let volumes = VolumeManager::new(&runtime);

        volumes.remove("myvol", false).await.unwrap();
        volumes.create("myvol").await.unwrap();

        assert_eq!(
            runtime.calls(),
            vec!["remove_volume(myvol)", "create_volume(myvol)"]
        );
    }

    #[tokio::test]
    async fn test_remove_missing_volume_fails() {
        let runtime = FakeRuntime::new();
        let err = VolumeManager::new(&runtime)
            .remove("ghost", false)
            .await
            .unwrap_err();
        assert!(err.is_runtime());
    }
}
