mod config;
pub mod logging;

pub use config::{
    DEFAULT_FLUSH_INTERVAL, DEFAULT_FLUSH_SIZE, DEFAULT_KEY_PATTERN, DEFAULT_UPLOAD_THREADS,
    DRAIN_TIMEOUT, DURATION_METADATA_KEY, INTERNAL_TARGET_PREFIX, MIN_FLUSH_INTERVAL,
    POLL_TIMEOUT, PROGRAM_LOG_LEVEL, PROGRAM_NAME, THREAD_NAME_BATCHER, THREAD_NAME_UPLOADER,
    WORKER_KEEP_ALIVE, default_store_root, xdg_or_home,
};

pub use logging::init;
