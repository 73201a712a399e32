/// Helper utilities for the dvm CLI

use regex::Regex;
use std::sync::OnceLock;

/// Format bytes to human-readable size
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.2} {}", size, UNITS[unit_index])
    }
}

/// Docker volume names: `[a-zA-Z0-9][a-zA-Z0-9_.-]+`
pub fn is_valid_volume_name(name: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-zA-Z0-9][a-zA-Z0-9_.-]+$").unwrap())
        .is_match(name)
}

/// Image repository path components: lowercase, separated by `.`, `_`, `__` or dashes
pub fn is_valid_repository_name(name: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z0-9]+((\.|_|__|-+)[a-z0-9]+)*$").unwrap())
        .is_match(name)
}

/// Image tags: up to 128 word characters, dots and dashes, not starting with either
pub fn is_valid_tag(tag: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9_][A-Za-z0-9_.-]{0,127}$").unwrap())
        .is_match(tag)
}

/// Registry namespace, optionally prefixed by a registry host (`host:port/account`)
pub fn is_valid_namespace(namespace: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^([a-zA-Z0-9.-]+(:[0-9]+)?/)?[a-z0-9]+([._-][a-z0-9]+)*(/[a-z0-9]+([._-][a-z0-9]+)*)*$")
            .unwrap()
    })
    .is_match(namespace)
}
