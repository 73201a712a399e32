/// Defaults shared by the CLI and the backup/restore pipelines

/// Tag applied to backup images when none is given
pub const DEFAULT_TAG: &str = "latest";

/// Image used to run the archive command during a backup
pub const DEFAULT_BASE_IMAGE: &str = "alpine";

/// Where the volume is mounted inside the ephemeral container
pub const DEFAULT_MOUNT_PATH: &str = "/volume";

/// Archive written into the container root by a backup
pub const DEFAULT_ARCHIVE_PATH: &str = "/backup.tar";

/// Name used for the config directory under the user's config dir
pub const APP_NAME: &str = "dvm-cli";

/// Author recorded on committed backup images
pub const COMMIT_AUTHOR: &str = "dvm-cli";

/// Default log filter when RUST_LOG is not set
pub const DEFAULT_LOG_FILTER: &str = "dvm_cli=info";
