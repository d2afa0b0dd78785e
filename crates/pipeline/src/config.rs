use std::{str::FromStr, sync::Arc, time::Duration};

use logship_protocol::{BincodeCodec, Codec, JsonLinesCodec, Pattern};
use logship_runtime::{
    DEFAULT_FLUSH_INTERVAL, DEFAULT_FLUSH_SIZE, DEFAULT_KEY_PATTERN, DEFAULT_UPLOAD_THREADS,
    DRAIN_TIMEOUT, MIN_FLUSH_INTERVAL, POLL_TIMEOUT, WORKER_KEEP_ALIVE,
};

use crate::error::ConfigurationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PayloadFormat {
    #[default]
    Json,
    Binary,
}

impl PayloadFormat {
    pub fn codec(&self) -> Arc<dyn Codec> {
        match self {
            PayloadFormat::Json => Arc::new(JsonLinesCodec),
            PayloadFormat::Binary => Arc::new(BincodeCodec),
        }
    }
}

impl FromStr for PayloadFormat {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" | "ndjson" => Ok(PayloadFormat::Json),
            "binary" | "bincode" => Ok(PayloadFormat::Binary),
            _ => Err(ConfigurationError::UnknownFormat(s.to_string())),
        }
    }
}

/// Startup options, unvalidated.
#[derive(Debug, Clone)]
pub struct AppenderConfig {
    /// Destination bucket; required
    pub bucket: Option<String>,
    /// Pattern naming each batch's object, rendered against its first record
    pub key_pattern: String,
    /// Optional pattern stored as each record's human-readable rendering
    pub render_pattern: Option<String>,
    pub flush_size: usize,
    pub flush_interval: Duration,
    pub line_numbers: bool,
    pub gzip: bool,
    pub upload_threads: usize,
    pub format: PayloadFormat,
    pub debug: bool,
    /// How long the batcher blocks on the record channel before re-checking its deadline
    pub poll_timeout: Duration,
    /// Upper bound on waiting for uploads to finish during stop
    pub drain_timeout: Duration,
    /// Idle time before an extra upload worker exits
    pub worker_keep_alive: Duration,
}

impl Default for AppenderConfig {
    fn default() -> Self {
        Self {
            bucket: None,
            key_pattern: DEFAULT_KEY_PATTERN.to_string(),
            render_pattern: None,
            flush_size: DEFAULT_FLUSH_SIZE,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            line_numbers: false,
            gzip: false,
            upload_threads: DEFAULT_UPLOAD_THREADS,
            format: PayloadFormat::default(),
            debug: false,
            poll_timeout: POLL_TIMEOUT,
            drain_timeout: DRAIN_TIMEOUT,
            worker_keep_alive: WORKER_KEEP_ALIVE,
        }
    }
}

/// When the batcher cuts a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlushPolicy {
    pub flush_size: usize,
    pub flush_interval: Duration,
    pub poll_timeout: Duration,
}

/// Configuration that passed [`AppenderConfig::validate`].
#[derive(Debug, Clone)]
pub struct ValidatedConfig {
    pub bucket: String,
    pub key_pattern: Pattern,
    pub render_pattern: Option<Pattern>,
    pub policy: FlushPolicy,
    pub line_numbers: bool,
    pub gzip: bool,
    pub upload_threads: usize,
    pub format: PayloadFormat,
    pub debug: bool,
    pub drain_timeout: Duration,
    pub worker_keep_alive: Duration,
}

impl AppenderConfig {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: Some(bucket.into()),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<ValidatedConfig, ConfigurationError> {
        let bucket = match self.bucket.as_deref().map(str::trim) {
            Some(b) if !b.is_empty() => b.to_string(),
            _ => return Err(ConfigurationError::MissingBucket),
        };

        if self.key_pattern.is_empty() {
            return Err(ConfigurationError::EmptyKeyPattern);
        }
        let key_pattern =
            Pattern::parse(&self.key_pattern).map_err(ConfigurationError::KeyPattern)?;

        let render_pattern = self
            .render_pattern
            .as_deref()
            .map(Pattern::parse)
            .transpose()
            .map_err(ConfigurationError::RenderPattern)?;

        if self.flush_size == 0 {
            return Err(ConfigurationError::ZeroFlushSize);
        }
        if self.flush_interval < MIN_FLUSH_INTERVAL {
            return Err(ConfigurationError::FlushIntervalTooShort {
                min: MIN_FLUSH_INTERVAL,
                got: self.flush_interval,
            });
        }
        if self.upload_threads == 0 {
            return Err(ConfigurationError::ZeroUploadThreads);
        }
        if self.poll_timeout.is_zero() {
            return Err(ConfigurationError::ZeroPollTimeout);
        }

        Ok(ValidatedConfig {
            bucket,
            key_pattern,
            render_pattern,
            policy: FlushPolicy {
                flush_size: self.flush_size,
                flush_interval: self.flush_interval,
                poll_timeout: self.poll_timeout,
            },
            line_numbers: self.line_numbers,
            gzip: self.gzip,
            upload_threads: self.upload_threads,
            format: self.format,
            debug: self.debug,
            drain_timeout: self.drain_timeout,
            worker_keep_alive: self.worker_keep_alive,
        })
    }
}

/// Parse a duration written either as ISO-8601 (`PT5M`, `P1DT2H`, `PT0.5S`)
/// or with a short suffix (`250ms`, `30s`, `5m`, `1h`). Bare digits are seconds.
pub fn parse_duration(raw: &str) -> Result<Duration, ConfigurationError> {
    let invalid = || ConfigurationError::InvalidDuration(raw.to_string());
    let s = raw.trim();

    if let Some(rest) = s.strip_prefix(['P', 'p']) {
        return parse_iso8601(rest).ok_or_else(invalid);
    }

    let split = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    let (digits, unit) = s.split_at(split);
    let n: u64 = digits.parse().map_err(|_| invalid())?;

    match unit {
        "ms" => Ok(Duration::from_millis(n)),
        "" | "s" => Ok(Duration::from_secs(n)),
        "m" => Ok(Duration::from_secs(n.saturating_mul(60))),
        "h" => Ok(Duration::from_secs(n.saturating_mul(3600))),
        _ => Err(invalid()),
    }
}

fn parse_iso8601(rest: &str) -> Option<Duration> {
    let upper = rest.to_ascii_uppercase();
    let (date, time) = upper.split_once('T').unwrap_or((upper.as_str(), ""));

    let mut secs = 0f64;
    let mut seen = false;

    for (part, units) in [(date, "D"), (time, "HMS")] {
        let mut num = String::new();
        for c in part.chars() {
            if c.is_ascii_digit() || c == '.' {
                num.push(c);
                continue;
            }
            if num.is_empty() || !units.contains(c) {
                return None;
            }
            let value: f64 = num.parse().ok()?;
            let factor = match c {
                'D' => 86_400.0,
                'H' => 3_600.0,
                'M' => 60.0,
                _ => 1.0,
            };
            secs += value * factor;
            seen = true;
            num.clear();
        }
        if !num.is_empty() {
            return None;
        }
    }

    if !seen {
        return None;
    }
    Duration::try_from_secs_f64(secs).ok()
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
