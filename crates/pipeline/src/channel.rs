use std::time::Duration;

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use logship_protocol::LogRecord;

use crate::error::Cancelled;

enum Envelope {
    Record(LogRecord),
    Terminate,
}

/// Outcome of one timed receive on the batcher side.
#[derive(Debug)]
pub enum Received {
    Record(LogRecord),
    /// Shutdown was requested through [`RecordSender::terminate`].
    Sentinel,
    /// Nothing arrived within the timeout.
    Timeout,
    /// Every sender is gone; treated like an unsolicited sentinel.
    Disconnected,
}

/// Producer half of the record channel. Cheap to clone, one per producer if needed.
#[derive(Clone)]
pub struct RecordSender {
    tx: Sender<Envelope>,
}

/// Batcher half of the record channel. Dropping it releases every blocked producer.
pub struct RecordReceiver {
    rx: Receiver<Envelope>,
}

/// Create a rendezvous channel: a send completes only when the batcher takes
/// the record, so at most one record is ever in flight between the two sides.
pub fn record_channel() -> (RecordSender, RecordReceiver) {
    let (tx, rx) = channel::bounded(0);
    (RecordSender { tx }, RecordReceiver { rx })
}

impl RecordSender {
    /// Block until the batcher takes `record`.
    ///
    /// Fails with [`Cancelled`] once the batcher has stopped receiving, including
    /// when it stops while this call is waiting.
    pub fn submit(&self, record: LogRecord) -> Result<(), Cancelled> {
        self.tx.send(Envelope::Record(record)).map_err(|_| Cancelled)
    }

    /// Hand the shutdown sentinel to the batcher. Blocks like [`submit`](Self::submit).
    pub fn terminate(&self) -> Result<(), Cancelled> {
        self.tx.send(Envelope::Terminate).map_err(|_| Cancelled)
    }
}

impl RecordReceiver {
    pub fn receive(&self, timeout: Duration) -> Received {
        match self.rx.recv_timeout(timeout) {
            Ok(Envelope::Record(record)) => Received::Record(record),
            Ok(Envelope::Terminate) => Received::Sentinel,
            Err(RecvTimeoutError::Timeout) => Received::Timeout,
            Err(RecvTimeoutError::Disconnected) => Received::Disconnected,
        }
    }
}

#[cfg(test)]
#[path = "channel_tests.rs"]
mod tests;
