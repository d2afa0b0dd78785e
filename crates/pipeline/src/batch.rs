use chrono::TimeDelta;
use logship_protocol::LogRecord;

/// A frozen, non-empty run of records in the order the batcher received them.
///
/// Only the batcher creates batches, and there is no way to append to one
/// afterwards.
#[derive(Debug)]
pub struct Batch {
    seq: u64,
    records: Vec<LogRecord>,
}

impl Batch {
    /// `None` when `records` is empty: an empty batch is never shipped.
    pub fn seal(seq: u64, records: Vec<LogRecord>) -> Option<Self> {
        if records.is_empty() {
            None
        } else {
            Some(Self { seq, records })
        }
    }

    /// Position of this batch in the batcher's output, starting at 0.
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn records(&self) -> &[LogRecord] {
        &self.records
    }

    /// The record that names the batch's destination.
    pub fn first(&self) -> &LogRecord {
        &self.records[0]
    }

    pub fn last(&self) -> &LogRecord {
        &self.records[self.records.len() - 1]
    }

    /// Time between the first and the last record. Negative when producers'
    /// clocks interleaved out of order.
    pub fn duration(&self) -> TimeDelta {
        self.last().timestamp - self.first().timestamp
    }
}

/// Render a duration as ISO-8601 seconds, e.g. `PT12.345S`.
pub fn iso8601_duration(d: TimeDelta) -> String {
    let millis = d.num_milliseconds();
    let sign = if millis < 0 { "-" } else { "" };
    let abs = millis.unsigned_abs();
    let (secs, frac) = (abs / 1000, abs % 1000);

    if frac == 0 {
        format!("PT{sign}{secs}S")
    } else {
        format!("PT{sign}{secs}.{frac:03}S")
    }
}
