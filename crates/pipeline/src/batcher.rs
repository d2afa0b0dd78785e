use std::time::{Duration, Instant};

use log::{error, info, warn};
use logship_protocol::LogRecord;

use crate::{
    batch::Batch,
    channel::{Received, RecordReceiver},
    config::FlushPolicy,
    error::Cancelled,
};

/// Where the batcher sends completed batches.
pub trait BatchSink: Send {
    /// Hand over one batch, blocking while the sink is saturated.
    fn submit(&self, batch: Batch) -> Result<(), Cancelled>;

    /// Stop accepting batches; work already handed over still completes.
    fn shutdown(&mut self);

    /// Wait up to `timeout` for handed-over work to finish. `true` if it did.
    fn await_termination(&self, timeout: Duration) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatcherState {
    Accumulating,
    Flushing,
    Draining,
    Stopped,
}

/// What the batcher did over its lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatcherReport {
    pub batches: u64,
    pub records: u64,
    /// Batches the sink refused; their records are lost.
    pub rejected: u64,
    /// `false` when the drain timeout elapsed with uploads still running.
    pub drained: bool,
}

/// Sole owner of the batch being accumulated and sole judge of when it is done.
pub struct Batcher<S: BatchSink> {
    sink: S,
    policy: FlushPolicy,
    drain_timeout: Duration,
    debug: bool,
    state: BatcherState,
    batch: Vec<LogRecord>,
    next_seq: u64,
    next_flush: Instant,
    report: BatcherReport,
}

impl<S: BatchSink> Batcher<S> {
    pub fn new(sink: S, policy: FlushPolicy, drain_timeout: Duration, debug: bool) -> Self {
        Self {
            sink,
            policy,
            drain_timeout,
            debug,
            state: BatcherState::Accumulating,
            batch: Vec::with_capacity(initial_capacity(&policy)),
            next_seq: 0,
            next_flush: Instant::now() + policy.flush_interval,
            report: BatcherReport::default(),
        }
    }

    pub fn state(&self) -> BatcherState {
        self.state
    }

    pub fn pending(&self) -> usize {
        self.batch.len()
    }

    /// Drive the batcher until the sentinel arrives or every producer is gone,
    /// then flush the tail and wait for the sink to drain.
    pub fn run(mut self, receiver: RecordReceiver) -> BatcherReport {
        while self.state == BatcherState::Accumulating {
            let received = receiver.receive(self.policy.poll_timeout);
            self.on_receive(received, Instant::now());
        }

        // Producers still waiting on the hand-off are released with `Cancelled`
        // instead of sitting out the drain.
        drop(receiver);

        self.drain()
    }

    /// Apply one receive outcome observed at `now`.
    pub fn on_receive(&mut self, received: Received, now: Instant) -> BatcherState {
        match received {
            Received::Record(record) => self.batch.push(record),
            Received::Sentinel => {
                trace_if!(self.debug, "stop requested with {} pending records", self.batch.len());
                self.state = BatcherState::Draining;
                return self.state;
            }
            Received::Disconnected => {
                warn!(
                    "all producers disconnected; draining {} pending records",
                    self.batch.len()
                );
                self.state = BatcherState::Draining;
                return self.state;
            }
            Received::Timeout => {
                if self.batch.is_empty() {
                    // An idle, empty batch never flushes on the timer; push the deadline out.
                    self.next_flush = now + self.policy.flush_interval;
                    return self.state;
                }
            }
        }

        if self.should_flush(now) {
            self.state = BatcherState::Flushing;
            trace_if!(self.debug, "passing batch to uploader with {} logs", self.batch.len());
            self.flush();
            self.next_flush = now + self.policy.flush_interval;
            self.state = BatcherState::Accumulating;
        }

        self.state
    }

    fn should_flush(&self, now: Instant) -> bool {
        let size_reached = self.batch.len() >= self.policy.flush_size;
        let interval_elapsed = now > self.next_flush;
        size_reached || (interval_elapsed && !self.batch.is_empty())
    }

    fn flush(&mut self) {
        let records = std::mem::replace(
            &mut self.batch,
            Vec::with_capacity(initial_capacity(&self.policy)),
        );
        let count = records.len() as u64;

        let Some(batch) = Batch::seal(self.next_seq, records) else {
            return;
        };
        self.next_seq += 1;

        match self.sink.submit(batch) {
            Ok(()) => {
                self.report.batches += 1;
                self.report.records += count;
            }
            Err(Cancelled) => {
                self.report.rejected += 1;
                error!("uploader refused a batch of {count} records; dropping it");
            }
        }
    }

    fn drain(mut self) -> BatcherReport {
        self.state = BatcherState::Draining;

        if !self.batch.is_empty() {
            trace_if!(self.debug, "flushing final batch with {} logs", self.batch.len());
            self.flush();
        }

        self.sink.shutdown();
        trace_if!(self.debug, "waiting up to {:?} for uploads to finish", self.drain_timeout);

        self.report.drained = self.sink.await_termination(self.drain_timeout);
        if self.report.drained {
            trace_if!(self.debug, "uploader has shut down");
        } else {
            warn!(
                "uploads still running after {:?}; abandoning them",
                self.drain_timeout
            );
        }

        self.state = BatcherState::Stopped;
        info!(
            "batcher stopped: {} batches, {} records",
            self.report.batches, self.report.records
        );
        self.report
    }
}

fn initial_capacity(policy: &FlushPolicy) -> usize {
    // flush_size may be huge; do not reserve more than a sane amount up front
    policy.flush_size.min(1024)
}

#[cfg(test)]
#[path = "batcher_tests.rs"]
mod tests;
