use std::{path::PathBuf, time::Duration};

pub const PROGRAM_NAME: &str = "logship";
pub const PROGRAM_LOG_LEVEL: &str = "LOGSHIP_LOG_LEVEL";

/// Records per batch before a size-triggered flush.
pub const DEFAULT_FLUSH_SIZE: usize = 10_000;

/// Time between time-triggered flushes of a non-empty batch.
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Shortest flush interval accepted at startup.
pub const MIN_FLUSH_INTERVAL: Duration = Duration::from_secs(5);

/// How long the batcher waits for a record before re-checking its deadline.
pub const POLL_TIMEOUT: Duration = Duration::from_secs(5);

/// Upper bound on waiting for in-flight uploads during shutdown.
pub const DRAIN_TIMEOUT: Duration = Duration::from_secs(60);

/// Idle time after which a non-core upload worker exits.
pub const WORKER_KEEP_ALIVE: Duration = Duration::from_secs(5 * 60);

pub const DEFAULT_UPLOAD_THREADS: usize = 1;

pub const DEFAULT_KEY_PATTERN: &str = "logs/%d{%Y-%m-%d}/%d{%H%M%S%.3f}-%seq";

/// Object metadata name carrying the time span covered by a batch.
pub const DURATION_METADATA_KEY: &str = "x-logship-duration";

/// Target prefix of this workspace's own diagnostics.
pub const INTERNAL_TARGET_PREFIX: &str = "logship_";

pub const THREAD_NAME_BATCHER: &str = "logship-batcher";
pub const THREAD_NAME_UPLOADER: &str = "logship-uploader";

pub fn xdg_or_home(xdg_var: &str, home_suffix: &str) -> PathBuf {
    if let Some(dir) = std::env::var_os(xdg_var) {
        PathBuf::from(dir)
    } else {
        std::env::var_os("HOME")
            .map(PathBuf::from)
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join(home_suffix)
    }
}

/// Default directory under which the filesystem object store keeps buckets.
pub fn default_store_root() -> PathBuf {
    xdg_or_home("XDG_DATA_HOME", ".local/share").join(PROGRAM_NAME)
}
