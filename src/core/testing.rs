/// In-memory runtime that records every call, for pipeline tests

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use futures::{stream, StreamExt};

use super::error::VaultError;
use super::runtime::{ContainerRuntime, ContainerSpec, FrameStream, LogChunk, LogStream};

pub const FAKE_CONTAINER_ID: &str = "c0ffee0123456789";

#[derive(Default)]
pub struct FakeRuntime {
    calls: Mutex<Vec<String>>,
    volumes: Mutex<HashSet<String>>,
    fail_on: Option<&'static str>,
    hang_logs: bool,
    exit_code: i64,
}

impl FakeRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_volume(self, name: &str) -> Self {
        self.volumes.lock().unwrap().insert(name.to_string());
        self
    }

    /// Make the named operation (e.g. "start", "commit") fail
    pub fn failing_on(mut self, operation: &'static str) -> Self {
        self.fail_on = Some(operation);
        self
    }

    pub fn with_hanging_logs(mut self) -> Self {
        self.hang_logs = true;
        self
    }

    pub fn with_exit_code(mut self, code: i64) -> Self {
        self.exit_code = code;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of calls to `operation`
    pub fn count(&self, operation: &str) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.split('(').next() == Some(operation))
            .count()
    }

    fn record(&self, operation: &'static str, call: String) -> Result<(), VaultError> {
        self.calls.lock().unwrap().push(call);
        if self.fail_on == Some(operation) {
            return Err(server_error(500, format!("{} rejected by fake runtime", operation)));
        }
        Ok(())
    }
}

fn server_error(status_code: u16, message: String) -> VaultError {
    VaultError::Runtime(bollard::errors::Error::DockerResponseServerError {
        status_code,
        message,
    })
}

#[async_trait]
impl ContainerRuntime for FakeRuntime {
    async fn create_volume(&self, name: &str) -> Result<(), VaultError> {
        self.record("create_volume", format!("create_volume({})", name))?;
        if !self.volumes.lock().unwrap().insert(name.to_string()) {
            return Err(VaultError::VolumeExists(name.to_string()));
        }
        Ok(())
    }

    async fn remove_volume(&self, name: &str, _force: bool) -> Result<(), VaultError> {
        self.record("remove_volume", format!("remove_volume({})", name))?;
        if !self.volumes.lock().unwrap().remove(name) {
            return Err(server_error(404, format!("get {}: no such volume", name)));
        }
        Ok(())
    }

    fn pull_image(&self, image: &str) -> FrameStream {
        if let Err(e) = self.record("pull", format!("pull({})", image)) {
            return stream::iter(vec![Err(e)]).boxed();
        }
        let frames = vec![
            Ok(format!("{{\"status\":\"Pulling from {}\"}}\n", image).into_bytes()),
            Ok(b"{\"status\":\"Download complete\",\"progress\":\"\"}\n".to_vec()),
        ];
        stream::iter(frames).boxed()
    }

    async fn create_container(&self, spec: &ContainerSpec) -> Result<String, VaultError> {
        self.record("create", format!("create(image={})", spec.image))?;
        Ok(FAKE_CONTAINER_ID.to_string())
    }

    async fn start_container(&self, _id: &str) -> Result<(), VaultError> {
        self.record("start", "start".to_string())
    }

    fn container_logs(&self, _id: &str) -> LogStream {
        if let Err(e) = self.record("logs", "logs".to_string()) {
            return stream::iter(vec![Err(e)]).boxed();
        }
        if self.hang_logs {
            return stream::pending().boxed();
        }
        stream::iter(vec![
            Ok(LogChunk::Stdout(b"volume/\n".to_vec())),
            Ok(LogChunk::Stderr(b"tar: removing leading '/'\n".to_vec())),
        ])
        .boxed()
    }

    async fn commit_container(&self, _id: &str, image: &str) -> Result<(), VaultError> {
        self.record("commit", format!("commit(image={})", image))
    }

    async fn remove_container(&self, _id: &str, force: bool) -> Result<(), VaultError> {
        let call = if force { "remove(force)" } else { "remove" };
        self.record("remove", call.to_string())
    }

    async fn wait_container(&self, _id: &str) -> Result<i64, VaultError> {
        self.record("wait", "wait".to_string())?;
        Ok(self.exit_code)
    }
}
