/// Pull progress decoding
///
/// Image pulls report progress as newline-delimited JSON objects that
/// arrive in arbitrary network-sized chunks. Each complete line is decoded
/// into a `PullProgressEvent` and reported as soon as it is available.

use std::fmt;

use futures::{Stream, StreamExt};
use serde::Deserialize;

use super::error::VaultError;
use crate::utils::format_bytes;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ProgressDetail {
    pub current: i64,
    pub total: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PullProgressEvent {
    /// Layer id, empty for image-level messages
    pub id: String,
    pub status: String,
    pub error: String,
    pub progress: String,
    pub progress_detail: ProgressDetail,
}

impl fmt::Display for PullProgressEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.id.is_empty() {
            write!(f, "{}: ", self.id)?;
        }
        write!(f, "{}", self.status)?;

        if !self.progress.is_empty() {
            write!(f, " {}", self.progress)?;
        } else if self.progress_detail.total > 0 {
            write!(
                f,
                " {}/{}",
                format_bytes(self.progress_detail.current.max(0) as u64),
                format_bytes(self.progress_detail.total as u64)
            )?;
        }
        Ok(())
    }
}

/// What to do with a frame that is not valid JSON
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DecodePolicy {
    /// Log a warning and continue with the next frame
    #[default]
    Skip,
    /// Fail the pull with a decode error
    Abort,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PullSummary {
    pub events: usize,
    pub skipped: usize,
}

/// Decode a pull progress stream, reporting every event in arrival order.
///
/// The stream is consumed and dropped on every return path. A frame with a
/// non-empty `error` field ends the pull with `PullRejected`.
pub async fn stream_pull_progress<S, F>(
    image: &str,
    frames: S,
    policy: DecodePolicy,
    mut report: F,
) -> Result<PullSummary, VaultError>
where
    S: Stream<Item = Result<Vec<u8>, VaultError>> + Unpin,
    F: FnMut(&PullProgressEvent),
{
    let mut frames = frames;
    let mut pending: Vec<u8> = Vec::new();
    let mut summary = PullSummary::default();

    while let Some(chunk) = frames.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            // Decoded upstream by the runtime client; the same policy applies
            Err(VaultError::MalformedProgress(message)) if policy == DecodePolicy::Skip => {
                summary.skipped += 1;
                tracing::warn!(image, error = %message, "skipping undecodable pull progress");
                continue;
            }
            Err(e) => return Err(e),
        };
        pending.extend_from_slice(&chunk);

        while let Some(pos) = pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = pending.drain(..=pos).collect();
            decode_line(image, &line, policy, &mut summary, &mut report)?;
        }
    }

    // Final frame without a trailing newline
    decode_line(image, &pending, policy, &mut summary, &mut report)?;

    tracing::debug!(
        image,
        events = summary.events,
        skipped = summary.skipped,
        "pull progress stream finished"
    );
    Ok(summary)
}

fn decode_line<F>(
    image: &str,
    line: &[u8],
    policy: DecodePolicy,
    summary: &mut PullSummary,
    report: &mut F,
) -> Result<(), VaultError>
where
    F: FnMut(&PullProgressEvent),
{
    let line = line.trim_ascii();
    if line.is_empty() {
        return Ok(());
    }

    let event: PullProgressEvent = match serde_json::from_slice(line) {
        Ok(event) => event,
        Err(e) => match policy {
            DecodePolicy::Skip => {
                summary.skipped += 1;
                tracing::warn!(image, error = %e, "skipping malformed pull progress frame");
                return Ok(());
            }
            DecodePolicy::Abort => return Err(VaultError::Decode(e)),
        },
    };

    summary.events += 1;
    report(&event);

    if !event.error.is_empty() {
        return Err(VaultError::PullRejected {
            image: image.to_string(),
            message: event.error,
        });
    }
    Ok(())
}
