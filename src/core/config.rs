/// Run configuration for a backup or restore
///
/// Built once from CLI arguments and the user's config file, then passed
/// by reference to the pipeline. Nothing here changes during a run.

use std::path::Path;
use std::time::Duration;

use super::container::PullPolicy;
use super::error::VaultError;
use super::image_ref;
use super::progress::DecodePolicy;
use crate::utils::{
    is_valid_namespace, is_valid_repository_name, is_valid_tag, is_valid_volume_name, AppConfig,
    DEFAULT_ARCHIVE_PATH, DEFAULT_BASE_IMAGE, DEFAULT_MOUNT_PATH, DEFAULT_TAG,
};

#[derive(Debug, Clone, PartialEq)]
pub struct VaultConfig {
    /// Volume being backed up or restored
    pub volume: String,
    pub tag: String,
    /// Registry account prefix; empty means local naming
    pub namespace: String,
    pub mount_path: String,
    pub archive_path: String,
    /// Image that runs the archive command during a backup
    pub base_image: String,
    pub pull_policy: PullPolicy,
    pub decode_policy: DecodePolicy,
    /// Upper bound for a pull or an in-container command
    pub step_timeout: Option<Duration>,
    /// Wait for the container exit code before continuing
    pub check_exit_status: bool,
    /// Remove the ephemeral container if a later step fails
    pub cleanup_on_failure: bool,
}

impl VaultConfig {
    pub fn new(volume: impl Into<String>) -> Self {
        Self {
            volume: volume.into(),
            tag: DEFAULT_TAG.to_string(),
            namespace: String::new(),
            mount_path: DEFAULT_MOUNT_PATH.to_string(),
            archive_path: DEFAULT_ARCHIVE_PATH.to_string(),
            base_image: DEFAULT_BASE_IMAGE.to_string(),
            pull_policy: PullPolicy::Auto,
            decode_policy: DecodePolicy::Skip,
            step_timeout: None,
            check_exit_status: false,
            cleanup_on_failure: false,
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        let tag = tag.into();
        self.tag = if tag.is_empty() { DEFAULT_TAG.to_string() } else { tag };
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Fill unset values from the user's config file
    pub fn with_app_config(mut self, app: &AppConfig) -> anyhow::Result<Self> {
        if let Some(image) = &app.base_image {
            self.base_image = image.clone();
        }
        if let Some(path) = &app.mount_path {
            self.mount_path = path.clone();
        }
        if let Some(path) = &app.archive_path {
            self.archive_path = path.clone();
        }
        if let Some(timeout) = app.step_timeout()? {
            self.step_timeout = Some(timeout);
        }
        Ok(self)
    }

    /// Check names against Docker's rules before touching the runtime
    pub fn validate(&self) -> Result<(), VaultError> {
        if self.volume.is_empty() {
            return Err(VaultError::InvalidConfig("volume name must not be empty".into()));
        }
        if !is_valid_volume_name(&self.volume) {
            return Err(VaultError::InvalidConfig(format!(
                "'{}' is not a valid volume name",
                self.volume
            )));
        }
        // The volume name doubles as the backup image's repository
        if !is_valid_repository_name(&self.volume) {
            return Err(VaultError::InvalidConfig(format!(
                "'{}' cannot name a backup image: image names must be lowercase",
                self.volume
            )));
        }
        if !is_valid_tag(&self.tag) {
            return Err(VaultError::InvalidConfig(format!("'{}' is not a valid tag", self.tag)));
        }
        if !self.namespace.is_empty() && !is_valid_namespace(&self.namespace) {
            return Err(VaultError::InvalidConfig(format!(
                "'{}' is not a valid namespace",
                self.namespace
            )));
        }
        for (name, path) in [("mount path", &self.mount_path), ("archive path", &self.archive_path)] {
            if !path.starts_with('/') {
                return Err(VaultError::InvalidConfig(format!(
                    "{} '{}' must be absolute",
                    name, path
                )));
            }
        }
        if Path::new(&self.archive_path).starts_with(&self.mount_path) {
            return Err(VaultError::InvalidConfig(format!(
                "archive path '{}' must not be inside the mount path '{}'",
                self.archive_path, self.mount_path
            )));
        }
        Ok(())
    }

    /// Image reference, honouring an explicit override
    pub fn resolve_image(&self, explicit: Option<&str>) -> String {
        image_ref::resolve(explicit, &self.volume, &self.tag, &self.namespace)
    }

    /// Image holding the volume snapshot
    pub fn image_reference(&self) -> String {
        self.resolve_image(None)
    }

    /// Serializes the mounted volume into the archive
    pub fn archive_command(&self) -> Vec<String> {
        vec![
            "tar".to_string(),
            "-cvf".to_string(),
            self.archive_path.clone(),
            self.mount_path.clone(),
        ]
    }

    /// Writes the archive back into the mounted volume
    pub fn extract_command(&self) -> Vec<String> {
        vec![
            "tar".to_string(),
            "-xvf".to_string(),
            self.archive_path.clone(),
            "-C".to_string(),
            "/".to_string(),
        ]
    }
}
