//! Back up Docker volumes into container images and restore them again.

pub mod core;
pub mod utils;
