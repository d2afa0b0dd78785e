use bincode::config;
use serde::{Serialize, de::DeserializeOwned};
use std::io::{self, BufRead, Read, Write};

use crate::LogRecord;

#[derive(Debug, thiserror::Error)]
pub enum EncodingError {
    #[error("json encoding failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("binary encoding failed: {0}")]
    BinaryEncode(#[from] bincode::error::EncodeError),
    #[error("binary decoding failed: {0}")]
    BinaryDecode(#[from] bincode::error::DecodeError),
    #[error("frame of {0} bytes does not fit a u32 length prefix")]
    FrameTooLarge(usize),
    #[error("i/o during encoding: {0}")]
    Io(#[from] io::Error),
}

/// Turns a batch of records into an upload payload and back.
///
/// Implementations hold no mutable state: every upload worker shares one
/// instance and calls it concurrently.
pub trait Codec: Send + Sync {
    fn content_type(&self) -> &'static str;

    fn encode(&self, records: &[LogRecord]) -> Result<Vec<u8>, EncodingError>;

    fn decode(&self, bytes: &[u8]) -> Result<Vec<LogRecord>, EncodingError>;
}

/// One JSON object per line.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonLinesCodec;

impl Codec for JsonLinesCodec {
    fn content_type(&self) -> &'static str {
        "application/x-ndjson; charset=UTF-8"
    }

    fn encode(&self, records: &[LogRecord]) -> Result<Vec<u8>, EncodingError> {
        let mut buf = Vec::new();
        for record in records {
            serde_json::to_writer(&mut buf, record)?;
            buf.push(b'\n');
        }
        Ok(buf)
    }

    fn decode(&self, bytes: &[u8]) -> Result<Vec<LogRecord>, EncodingError> {
        let mut records = Vec::new();
        for line in BufRead::lines(bytes) {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            records.push(serde_json::from_str(&line)?);
        }
        Ok(records)
    }
}

/// Length-prefixed bincode frames, one per record.
#[derive(Debug, Default, Clone, Copy)]
pub struct BincodeCodec;

impl Codec for BincodeCodec {
    fn content_type(&self) -> &'static str {
        "application/octet-stream"
    }

    fn encode(&self, records: &[LogRecord]) -> Result<Vec<u8>, EncodingError> {
        let mut buf = Vec::new();
        for record in records {
            write_message(&mut buf, record)?;
        }
        Ok(buf)
    }

    fn decode(&self, bytes: &[u8]) -> Result<Vec<LogRecord>, EncodingError> {
        let mut reader = bytes;
        let mut records = Vec::new();
        while !reader.is_empty() {
            records.push(read_message(&mut reader)?);
        }
        Ok(records)
    }
}

/// Read a single length-prefixed bincode message from `reader`.
///
/// Wire format:
///   - 4-byte big-endian length (u32)
///   - that many bytes of bincode payload
pub fn read_message<R, T>(reader: &mut R) -> Result<T, EncodingError>
where
    R: Read,
    T: DeserializeOwned,
{
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf)?;
    let len = u32::from_be_bytes(len_buf) as usize;

    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf)?;

    let (msg, _bytes_read): (T, usize) =
        bincode::serde::decode_from_slice(&buf, config::standard())?;
    Ok(msg)
}

/// Write a single length-prefixed bincode message to `writer`.
pub fn write_message<W, T>(writer: &mut W, msg: &T) -> Result<(), EncodingError>
where
    W: Write,
    T: Serialize,
{
    let bytes = bincode::serde::encode_to_vec(msg, config::standard())?;
    let len: u32 = bytes
        .len()
        .try_into()
        .map_err(|_| EncodingError::FrameTooLarge(bytes.len()))?;

    writer.write_all(&len.to_be_bytes())?;
    writer.write_all(&bytes)?;
    Ok(())
}

#[cfg(test)]
#[path = "codec_tests.rs"]
mod tests;
