//! Batching log shipper.
//!
//! Producers hand records to a single batcher thread over a rendezvous
//! channel; the batcher cuts batches by size or age and hands each one to a
//! bounded pool of upload workers, which encode it and write it to an
//! [`ObjectStore`]. Both hand-offs block instead of buffering, so a slow store
//! slows the batcher, and a stalled batcher slows producers.

/// `debug!` that only fires when the appender was configured with `debug`.
macro_rules! trace_if {
    ($enabled:expr, $($arg:tt)+) => {
        if $enabled {
            log::debug!($($arg)+);
        }
    };
}

mod adapter;
mod appender;
mod batch;
mod batcher;
mod channel;
mod config;
mod error;
mod store;
mod uploader;

#[cfg(test)]
mod test_support;

pub use adapter::{ConsoleTarget, JsonConsoleLogger, RecordBuilder, ShippingLogger};
pub use appender::Appender;
pub use batch::{Batch, iso8601_duration};
pub use batcher::{BatchSink, Batcher, BatcherReport, BatcherState};
pub use channel::{Received, RecordReceiver, RecordSender, record_channel};
pub use config::{AppenderConfig, FlushPolicy, PayloadFormat, ValidatedConfig, parse_duration};
pub use error::{Cancelled, ConfigurationError, StartError, StoreError, UploadError};
pub use store::{FsObjectStore, ObjectMetadata, ObjectStore};
pub use uploader::{UploadContext, UploaderPool};
