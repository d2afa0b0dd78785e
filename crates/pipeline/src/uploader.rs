use std::{
    io,
    panic::{self, AssertUnwindSafe},
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    thread,
    time::Duration,
};

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender, TrySendError};
use log::{error, warn};
use logship_protocol::{
    Codec, EncodingError, Pattern,
    compress::{self, GZIP_ENCODING},
};
use logship_runtime::THREAD_NAME_UPLOADER;

use crate::{
    batch::Batch,
    batcher::BatchSink,
    error::{Cancelled, UploadError},
    store::{ObjectMetadata, ObjectStore},
};

/// Workers that never retire on idleness.
const CORE_WORKERS: usize = 1;

/// Everything a worker needs to turn a batch into one stored object.
#[derive(Clone)]
pub struct UploadContext {
    pub bucket: String,
    pub key_pattern: Pattern,
    pub codec: Arc<dyn Codec>,
    pub store: Arc<dyn ObjectStore>,
    pub gzip: bool,
    pub debug: bool,
}

impl UploadContext {
    /// Encode, optionally compress, and store `batch`. Returns the object key.
    pub fn upload(&self, batch: &Batch) -> Result<String, UploadError> {
        let mut payload = self.codec.encode(batch.records())?;
        let mut meta = ObjectMetadata::new(self.codec.content_type(), batch.duration());

        if self.gzip {
            payload = compress::gzip(&payload).map_err(EncodingError::Io)?;
            meta.content_encoding = Some(GZIP_ENCODING.to_string());
        }
        meta.content_length = Some(payload.len() as u64);

        let key = self.key_pattern.render(batch.first(), Some(batch.seq()));
        self.store.put_object(&self.bucket, &key, &payload, &meta)?;
        Ok(key)
    }

    /// Upload `batch` and swallow the outcome. A failed batch is logged and
    /// dropped; nothing is retried.
    fn process(&self, batch: Batch) {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.upload(&batch)));

        match outcome {
            Ok(Ok(key)) => {
                trace_if!(
                    self.debug,
                    "wrote batch {} ({} logs) to {}/{}",
                    batch.seq(),
                    batch.len(),
                    self.bucket,
                    key
                );
            }
            Ok(Err(e)) => {
                error!(
                    "dropping batch {} ({} logs): {e}",
                    batch.seq(),
                    batch.len()
                );
            }
            Err(_) => {
                error!(
                    "upload of batch {} ({} logs) panicked; dropping it",
                    batch.seq(),
                    batch.len()
                );
            }
        }
    }
}

struct Shared {
    ctx: UploadContext,
    live: AtomicUsize,
    spawned: AtomicUsize,
    max_workers: usize,
    keep_alive: Duration,
}

/// Bounded set of upload workers fed through a zero-capacity queue.
///
/// One worker starts with the pool; more are spawned on demand up to
/// `max_workers`. When every worker is busy, [`submit`](BatchSink::submit)
/// blocks the caller until one frees up rather than queueing the batch.
pub struct UploaderPool {
    job_tx: Option<Sender<Batch>>,
    job_rx: Receiver<Batch>,
    // Every worker holds a clone; disconnection means all of them have exited.
    done_tx: Option<Sender<()>>,
    done_rx: Receiver<()>,
    shared: Arc<Shared>,
}

impl UploaderPool {
    pub fn new(ctx: UploadContext, max_workers: usize, keep_alive: Duration) -> io::Result<Self> {
        let (job_tx, job_rx) = channel::bounded(0);
        let (done_tx, done_rx) = channel::bounded(0);

        let pool = Self {
            job_tx: Some(job_tx),
            job_rx,
            done_tx: Some(done_tx),
            done_rx,
            shared: Arc::new(Shared {
                ctx,
                live: AtomicUsize::new(CORE_WORKERS),
                spawned: AtomicUsize::new(0),
                max_workers: max_workers.max(CORE_WORKERS),
                keep_alive,
            }),
        };

        pool.spawn_worker()?;
        Ok(pool)
    }

    /// Workers currently alive, busy or idle.
    pub fn worker_count(&self) -> usize {
        self.shared.live.load(Ordering::Acquire)
    }

    fn try_reserve_worker(&self) -> bool {
        let max = self.shared.max_workers;
        self.shared
            .live
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < max).then_some(n + 1)
            })
            .is_ok()
    }

    /// Start one worker; the caller has already counted it in `live`.
    fn spawn_worker(&self) -> io::Result<()> {
        let Some(done) = self.done_tx.clone() else {
            self.shared.live.fetch_sub(1, Ordering::AcqRel);
            return Err(io::Error::other("uploader pool is shut down"));
        };
        let jobs = self.job_rx.clone();
        let shared = Arc::clone(&self.shared);
        let id = shared.spawned.fetch_add(1, Ordering::AcqRel) + 1;

        let spawned = thread::Builder::new()
            .name(format!("{THREAD_NAME_UPLOADER}-{id}"))
            .spawn(move || {
                let _done = done;
                worker_loop(&shared, jobs);
            });

        match spawned {
            Ok(_) => {
                trace_if!(self.shared.ctx.debug, "started {THREAD_NAME_UPLOADER}-{id}");
                Ok(())
            }
            Err(e) => {
                self.shared.live.fetch_sub(1, Ordering::AcqRel);
                Err(e)
            }
        }
    }
}

fn worker_loop(shared: &Shared, jobs: Receiver<Batch>) {
    loop {
        match jobs.recv_timeout(shared.keep_alive) {
            Ok(batch) => shared.ctx.process(batch),
            Err(RecvTimeoutError::Timeout) => {
                let retired = shared
                    .live
                    .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                        (n > CORE_WORKERS).then(|| n - 1)
                    })
                    .is_ok();
                if retired {
                    trace_if!(shared.ctx.debug, "idle upload worker exiting");
                    return;
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    shared.live.fetch_sub(1, Ordering::AcqRel);
}

impl BatchSink for UploaderPool {
    fn submit(&self, batch: Batch) -> Result<(), Cancelled> {
        let tx = self.job_tx.as_ref().ok_or(Cancelled)?;

        // An idle worker takes the batch straight away.
        let batch = match tx.try_send(batch) {
            Ok(()) => return Ok(()),
            Err(TrySendError::Disconnected(_)) => return Err(Cancelled),
            Err(TrySendError::Full(batch)) => batch,
        };

        if self.try_reserve_worker() {
            if let Err(e) = self.spawn_worker() {
                warn!("could not start another upload worker: {e}");
            }
        }

        // Either the new worker or the next one to finish picks it up.
        tx.send(batch).map_err(|_| Cancelled)
    }

    fn shutdown(&mut self) {
        self.job_tx.take();
        self.done_tx.take();
    }

    fn await_termination(&self, timeout: Duration) -> bool {
        if self.done_tx.is_some() {
            warn!("await_termination called before shutdown");
        }
        matches!(
            self.done_rx.recv_timeout(timeout),
            Err(RecvTimeoutError::Disconnected)
        )
    }
}

#[cfg(test)]
#[path = "uploader_tests.rs"]
mod tests;
