pub mod codec;
pub mod compress;
pub mod pattern;

use std::{collections::BTreeMap, fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use codec::{BincodeCodec, Codec, EncodingError, JsonLinesCodec};
pub use pattern::{Pattern, PatternError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(format!("unknown log level '{other}'")),
        }
    }
}

impl From<log::Level> for LogLevel {
    fn from(level: log::Level) -> Self {
        match level {
            log::Level::Trace => LogLevel::Trace,
            log::Level::Debug => LogLevel::Debug,
            log::Level::Info => LogLevel::Info,
            log::Level::Warn => LogLevel::Warn,
            log::Level::Error => LogLevel::Error,
        }
    }
}

/// One log call, frozen.
///
/// Built once by an adapter at the call site and never mutated afterwards. The
/// pipeline only looks at `timestamp` (batch duration and destination key);
/// everything else is carried through to the codec untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    /// Name of the emitting logger, e.g. a module path
    pub logger_name: String,
    pub level: LogLevel,
    /// When the originating event happened
    pub timestamp: DateTime<Utc>,
    /// Message template with `{}` placeholders
    pub format: String,
    /// Stringified template arguments; `None` for a null argument
    pub args: Vec<Option<String>>,
    /// Contextual key/value pairs attached by the caller
    pub context: BTreeMap<String, String>,
    /// Human-readable rendering, present when a render pattern is configured
    pub rendered: Option<String>,
    /// Call-site line number, present when line numbers are enabled
    pub line_number: Option<u32>,
}

impl LogRecord {
    pub fn new(
        logger_name: impl Into<String>,
        level: LogLevel,
        timestamp: DateTime<Utc>,
        format: impl Into<String>,
    ) -> Self {
        Self {
            logger_name: logger_name.into(),
            level,
            timestamp,
            format: format.into(),
            args: Vec::new(),
            context: BTreeMap::new(),
            rendered: None,
            line_number: None,
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = Option<S>>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(|a| a.map(Into::into)).collect();
        self
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    pub fn with_line_number(mut self, line: u32) -> Self {
        self.line_number = Some(line);
        self
    }

    /// The template with each `{}` replaced by the next argument.
    ///
    /// Placeholders without a matching argument are kept verbatim; a `None`
    /// argument renders as `null`.
    pub fn message(&self) -> String {
        let mut out = String::with_capacity(self.format.len());
        let mut args = self.args.iter();
        let mut rest = self.format.as_str();

        while let Some(pos) = rest.find("{}") {
            out.push_str(&rest[..pos]);
            match args.next() {
                Some(Some(arg)) => out.push_str(arg),
                Some(None) => out.push_str("null"),
                None => out.push_str("{}"),
            }
            rest = &rest[pos + 2..];
        }
        out.push_str(rest);
        out
    }
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
