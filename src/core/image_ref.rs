/// Image reference resolution
///
/// Backup images are named after the volume they snapshot:
/// `<volume>:<tag>`, or `<namespace>/<volume>:<tag>` when a registry
/// account is configured. An explicit image (such as the base image used
/// to run the archive command) always wins.

use crate::utils::DEFAULT_TAG;

/// Compute the image reference for a volume snapshot
pub fn resolve(explicit: Option<&str>, volume: &str, tag: &str, namespace: &str) -> String {
    if let Some(image) = explicit.filter(|image| !image.is_empty()) {
        return image.to_string();
    }

    let tag = if tag.is_empty() { DEFAULT_TAG } else { tag };
    if namespace.is_empty() {
        format!("{}:{}", volume, tag)
    } else {
        format!("{}/{}:{}", namespace, volume, tag)
    }
}

/// Split an image reference into repository and tag for the pull API.
///
/// A reference without a tag resolves to `latest`; digests are kept whole
/// and returned as the tag part (`repo`, `sha256:...`).
pub fn split_reference(image: &str) -> (&str, &str) {
    if let Some((repo, digest)) = image.split_once('@') {
        return (repo, digest);
    }

    // A colon before the last slash belongs to a registry port
    let name_start = image.rfind('/').map(|i| i + 1).unwrap_or(0);
    match image[name_start..].rfind(':') {
        Some(i) => (&image[..name_start + i], &image[name_start + i + 1..]),
        None => (image, DEFAULT_TAG),
    }
}
