//! Doubles shared by the unit tests.

use std::{
    collections::HashSet,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    thread,
    time::Duration,
};

use chrono::{TimeZone, Utc};
use logship_protocol::{Codec, JsonLinesCodec, LogLevel, LogRecord, Pattern};

use crate::{
    batch::Batch,
    batcher::BatchSink,
    error::{Cancelled, StoreError},
    store::{ObjectMetadata, ObjectStore},
    uploader::UploadContext,
};

/// Record whose message is `r{n}`, stamped `n` seconds after a fixed origin.
pub fn record(n: u64) -> LogRecord {
    record_at(n, n as i64 * 1_000)
}

pub fn record_at(n: u64, millis: i64) -> LogRecord {
    let origin = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    LogRecord::new(
        "test::producer",
        LogLevel::Info,
        origin + chrono::TimeDelta::milliseconds(millis),
        format!("r{n}"),
    )
}

pub fn messages(records: &[LogRecord]) -> Vec<String> {
    records.iter().map(|r| r.format.clone()).collect()
}

#[derive(Debug, Clone)]
pub struct PutCall {
    pub bucket: String,
    pub key: String,
    pub payload: Vec<u8>,
    pub meta: ObjectMetadata,
}

impl PutCall {
    pub fn records(&self) -> Vec<LogRecord> {
        JsonLinesCodec.decode(&self.payload).expect("json payload")
    }
}

/// Store that keeps every successful put, in completion order.
///
/// Calls are numbered from 0 in arrival order and can be made to fail or
/// panic; uploads to chosen keys can be slowed down.
#[derive(Default)]
pub struct RecordingStore {
    calls: AtomicUsize,
    puts: Mutex<Vec<PutCall>>,
    delays: Mutex<Vec<(String, Duration)>>,
    failures: Mutex<HashSet<usize>>,
    panics: Mutex<HashSet<usize>>,
}

impl RecordingStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn delay_key(&self, key: &str, delay: Duration) {
        self.delays.lock().unwrap().push((key.to_string(), delay));
    }

    pub fn fail_call(&self, call: usize) {
        self.failures.lock().unwrap().insert(call);
    }

    pub fn panic_on_call(&self, call: usize) {
        self.panics.lock().unwrap().insert(call);
    }

    pub fn puts(&self) -> Vec<PutCall> {
        self.puts.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ObjectStore for RecordingStore {
    fn put_object(
        &self,
        bucket: &str,
        key: &str,
        payload: &[u8],
        meta: &ObjectMetadata,
    ) -> Result<(), StoreError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);

        let delay = self
            .delays
            .lock()
            .unwrap()
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, d)| *d);
        if let Some(delay) = delay {
            thread::sleep(delay);
        }

        if self.panics.lock().unwrap().contains(&call) {
            panic!("store exploded on call {call}");
        }
        if self.failures.lock().unwrap().contains(&call) {
            return Err(StoreError::Rejected(format!("call {call} refused")));
        }

        self.puts.lock().unwrap().push(PutCall {
            bucket: bucket.to_string(),
            key: key.to_string(),
            payload: payload.to_vec(),
            meta: meta.clone(),
        });
        Ok(())
    }
}

pub fn upload_context(store: Arc<RecordingStore>, gzip: bool) -> UploadContext {
    UploadContext {
        bucket: "test-bucket".to_string(),
        key_pattern: Pattern::parse("batches/%seq").unwrap(),
        codec: Arc::new(JsonLinesCodec),
        store,
        gzip,
        debug: true,
    }
}

/// In-memory sink for driving the batcher without threads.
#[derive(Clone, Default)]
pub struct CollectingSink {
    pub batches: Arc<Mutex<Vec<Batch>>>,
    pub shut_down: Arc<Mutex<bool>>,
    pub drains_in_time: bool,
    pub closed: bool,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self {
            drains_in_time: true,
            ..Self::default()
        }
    }

    pub fn sizes(&self) -> Vec<usize> {
        self.batches.lock().unwrap().iter().map(Batch::len).collect()
    }

    pub fn contents(&self) -> Vec<Vec<String>> {
        self.batches
            .lock()
            .unwrap()
            .iter()
            .map(|b| messages(b.records()))
            .collect()
    }
}

impl BatchSink for CollectingSink {
    fn submit(&self, batch: Batch) -> Result<(), Cancelled> {
        if self.closed {
            return Err(Cancelled);
        }
        self.batches.lock().unwrap().push(batch);
        Ok(())
    }

    fn shutdown(&mut self) {
        *self.shut_down.lock().unwrap() = true;
    }

    fn await_termination(&self, _timeout: Duration) -> bool {
        self.drains_in_time
    }
}
