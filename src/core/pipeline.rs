/// Backup and restore step sequences

use thiserror::Error;

use super::config::VaultConfig;
use super::error::VaultError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    RemoveVolume,
    CreateVolume,
    /// Pull `image`, or the volume's own image when `None`
    Pull { image: Option<String> },
    /// Run `cmd` in `image`, or in the volume's own image when `None`
    Run { image: Option<String>, cmd: Vec<String> },
    Commit,
    RemoveContainer,
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Step::RemoveVolume => "remove volume",
            Step::CreateVolume => "create volume",
            Step::Pull { .. } => "pull",
            Step::Run { .. } => "run",
            Step::Commit => "commit",
            Step::RemoveContainer => "remove container",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    pub name: &'static str,
    pub steps: Vec<Step>,
}

impl Pipeline {
    /// Archive the volume inside the base image and commit the result
    pub fn backup(config: &VaultConfig) -> Self {
        let base = Some(config.base_image.clone());
        Self {
            name: "backup",
            steps: vec![
                Step::Pull { image: base.clone() },
                Step::Run {
                    image: base,
                    cmd: config.archive_command(),
                },
                Step::Commit,
                Step::RemoveContainer,
            ],
        }
    }

    /// Recreate the volume and extract the backup image's archive into it
    pub fn restore(config: &VaultConfig) -> Self {
        Self {
            name: "restore",
            steps: vec![
                Step::RemoveVolume,
                Step::CreateVolume,
                Step::Pull { image: None },
                Step::Run {
                    image: None,
                    cmd: config.extract_command(),
                },
                Step::RemoveContainer,
            ],
        }
    }
}

/// First failure of a pipeline, tagged with the step that produced it
#[derive(Debug, Error)]
#[error("{pipeline} failed at step '{step}'")]
pub struct PipelineError {
    pub pipeline: &'static str,
    pub step: &'static str,
    #[source]
    pub source: VaultError,
}
