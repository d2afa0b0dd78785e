use std::{
    sync::{Arc, Mutex, PoisonError, TryLockError},
    thread::{self, JoinHandle},
};

use log::{error, info};
use logship_protocol::{Codec, LogRecord};
use logship_runtime::THREAD_NAME_BATCHER;

use crate::{
    batcher::{Batcher, BatcherReport},
    channel::{RecordSender, record_channel},
    config::{AppenderConfig, ValidatedConfig},
    error::{Cancelled, StartError},
    store::ObjectStore,
    uploader::{UploadContext, UploaderPool},
};

/// A running pipeline: one batcher thread feeding an upload pool.
///
/// `append` may be called from any number of threads. [`stop`](Self::stop)
/// pushes the sentinel through the record channel, then waits for the tail
/// batch to be handed over and the pool to drain (bounded by the drain
/// timeout). Dropping the appender stops it.
pub struct Appender {
    sender: RecordSender,
    batcher: Mutex<Option<JoinHandle<BatcherReport>>>,
    config: ValidatedConfig,
}

impl Appender {
    /// Validate `config` and launch the pipeline, encoding with the configured format.
    pub fn start(config: &AppenderConfig, store: Arc<dyn ObjectStore>) -> Result<Self, StartError> {
        let codec = config.format.codec();
        Self::start_with_codec(config, store, codec)
    }

    pub fn start_with_codec(
        config: &AppenderConfig,
        store: Arc<dyn ObjectStore>,
        codec: Arc<dyn Codec>,
    ) -> Result<Self, StartError> {
        let config = config.validate()?;

        let ctx = UploadContext {
            bucket: config.bucket.clone(),
            key_pattern: config.key_pattern.clone(),
            codec,
            store,
            gzip: config.gzip,
            debug: config.debug,
        };
        let pool = UploaderPool::new(ctx, config.upload_threads, config.worker_keep_alive)?;

        let (sender, receiver) = record_channel();
        let batcher = Batcher::new(pool, config.policy, config.drain_timeout, config.debug);

        let handle = thread::Builder::new()
            .name(THREAD_NAME_BATCHER.to_string())
            .spawn(move || batcher.run(receiver))?;

        info!(
            "shipping to bucket {} (flush every {} logs or {:?}, {} upload threads)",
            config.bucket,
            config.policy.flush_size,
            config.policy.flush_interval,
            config.upload_threads
        );

        Ok(Self {
            sender,
            batcher: Mutex::new(Some(handle)),
            config,
        })
    }

    pub fn config(&self) -> &ValidatedConfig {
        &self.config
    }

    /// Hand `record` to the batcher. Pipeline failures never reach the caller.
    pub fn append(&self, record: LogRecord) {
        if self.submit(record).is_err() {
            trace_if!(self.config.debug, "appender is stopped; record discarded");
        }
    }

    /// Like [`append`](Self::append), but reports whether the batcher took the record.
    pub fn submit(&self, record: LogRecord) -> Result<(), Cancelled> {
        self.sender.submit(record)
    }

    pub fn is_running(&self) -> bool {
        match self.batcher.try_lock() {
            Ok(handle) => handle.as_ref().is_some_and(|h| !h.is_finished()),
            Err(TryLockError::Poisoned(p)) => {
                p.into_inner().as_ref().is_some_and(|h| !h.is_finished())
            }
            // Held by a stop in progress.
            Err(TryLockError::WouldBlock) => false,
        }
    }

    /// Stop the pipeline and wait for it to drain.
    ///
    /// Returns what the batcher did, or `None` if the appender was already
    /// stopped (or its batcher thread died). A caller that races an ongoing
    /// stop waits for it to finish before getting `None`.
    pub fn stop(&self) -> Option<BatcherReport> {
        // Held until the batcher is joined so concurrent stoppers also wait.
        let mut slot = self.batcher.lock().unwrap_or_else(PoisonError::into_inner);
        let handle = slot.take()?;

        trace_if!(self.config.debug, "stopping appender");
        // Fails only if the batcher already exited on its own.
        let _ = self.sender.terminate();

        match handle.join() {
            Ok(report) => {
                trace_if!(self.config.debug, "appender stopped: {report:?}");
                Some(report)
            }
            Err(_) => {
                error!("batcher thread panicked; pending records are lost");
                None
            }
        }
    }
}

impl Drop for Appender {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
#[path = "appender_tests.rs"]
mod tests;
