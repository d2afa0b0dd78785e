use std::{io, path::PathBuf, time::Duration};

use logship_protocol::{EncodingError, PatternError};

/// Invalid startup parameters. The pipeline does not start.
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("<bucket> is required")]
    MissingBucket,
    #[error("<keyPattern> may not be empty")]
    EmptyKeyPattern,
    #[error("invalid <keyPattern>: {0}")]
    KeyPattern(#[source] PatternError),
    #[error("invalid <renderPattern>: {0}")]
    RenderPattern(#[source] PatternError),
    #[error("<flushSize> must be at least 1")]
    ZeroFlushSize,
    #[error("<flushInterval> must be at least {min:?}, got {got:?}")]
    FlushIntervalTooShort { min: Duration, got: Duration },
    #[error("<uploadThreads> must be positive")]
    ZeroUploadThreads,
    #[error("poll timeout must be non-zero")]
    ZeroPollTimeout,
    #[error("invalid duration '{0}'")]
    InvalidDuration(String),
    #[error("unknown payload format '{0}'")]
    UnknownFormat(String),
    #[error("unknown console target '{0}' (expected stdout or stderr)")]
    UnknownConsoleTarget(String),
}

/// Why `Appender::start` failed.
#[derive(Debug, thiserror::Error)]
pub enum StartError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error("failed to spawn pipeline thread: {0}")]
    Spawn(#[from] io::Error),
}

/// The store client rejected or failed an upload.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("invalid bucket name '{0}'")]
    InvalidBucket(String),
    #[error("invalid object key '{0}'")]
    InvalidKey(String),
    #[error("failed to write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("store rejected upload: {0}")]
    Rejected(String),
}

/// One batch could not be delivered. Logged and dropped, never retried.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error(transparent)]
    Encoding(#[from] EncodingError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A blocking hand-off was abandoned because the other side has shut down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("operation cancelled: pipeline is shutting down")]
pub struct Cancelled;
