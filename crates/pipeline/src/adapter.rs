//! Bridges from the `log` facade into [`LogRecord`]s.

use std::{
    collections::BTreeMap,
    io::{self, Write},
    str::FromStr,
    sync::Arc,
};

use chrono::Utc;
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use logship_protocol::{LogRecord, Pattern};
use logship_runtime::{INTERNAL_TARGET_PREFIX, logging::Logger};

use crate::{appender::Appender, config::ValidatedConfig, error::ConfigurationError};

/// Turns a `log::Record` into a [`LogRecord`].
#[derive(Debug, Clone, Default)]
pub struct RecordBuilder {
    line_numbers: bool,
    render_pattern: Option<Pattern>,
    context: BTreeMap<String, String>,
}

impl RecordBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &ValidatedConfig) -> Self {
        Self {
            line_numbers: config.line_numbers,
            render_pattern: config.render_pattern.clone(),
            context: BTreeMap::new(),
        }
    }

    pub fn line_numbers(mut self, enabled: bool) -> Self {
        self.line_numbers = enabled;
        self
    }

    pub fn render_pattern(mut self, pattern: Option<Pattern>) -> Self {
        self.render_pattern = pattern;
        self
    }

    /// Attach `key = value` to every record built from now on.
    pub fn context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    pub fn build(&self, record: &Record<'_>) -> LogRecord {
        let mut built = LogRecord::new(
            record.target(),
            record.level().into(),
            Utc::now(),
            record.args().to_string(),
        );
        built.context = self.context.clone();

        if self.line_numbers {
            built.line_number = record.line();
        }
        if let Some(pattern) = &self.render_pattern {
            built.rendered = Some(pattern.render(&built, None));
        }

        built
    }
}

fn is_internal(target: &str) -> bool {
    target.starts_with(INTERNAL_TARGET_PREFIX)
}

/// `log::Log` that ships every record through an [`Appender`].
///
/// Records from this workspace's own crates go to a stderr logger instead, so
/// the pipeline never feeds its diagnostics back into itself.
pub struct ShippingLogger {
    appender: Arc<Appender>,
    builder: RecordBuilder,
    level: LevelFilter,
    diagnostics: Logger,
}

impl ShippingLogger {
    pub fn new(appender: Arc<Appender>, level: LevelFilter) -> Self {
        let builder = RecordBuilder::from_config(appender.config());
        let diagnostics_level = if appender.config().debug {
            Level::Debug
        } else {
            Level::Warn
        };

        Self {
            appender,
            builder,
            level,
            diagnostics: Logger::stderr(diagnostics_level),
        }
    }

    pub fn with_builder(mut self, builder: RecordBuilder) -> Self {
        self.builder = builder;
        self
    }

    /// Install as the global logger. The max level covers both shipped records
    /// and the pipeline's own diagnostics.
    pub fn install(self) -> Result<(), SetLoggerError> {
        let max = self.level.max(self.diagnostics.level().to_level_filter());
        log::set_boxed_logger(Box::new(self))?;
        log::set_max_level(max);
        Ok(())
    }
}

impl Log for ShippingLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        if is_internal(metadata.target()) {
            self.diagnostics.enabled(metadata)
        } else {
            metadata.level() <= self.level
        }
    }

    fn log(&self, record: &Record<'_>) {
        if is_internal(record.target()) {
            self.diagnostics.log(record);
            return;
        }
        if self.enabled(record.metadata()) {
            self.appender.append(self.builder.build(record));
        }
    }

    fn flush(&self) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConsoleTarget {
    #[default]
    Stdout,
    Stderr,
}

impl FromStr for ConsoleTarget {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "stdout" | "system.out" => Ok(ConsoleTarget::Stdout),
            "stderr" | "system.err" => Ok(ConsoleTarget::Stderr),
            _ => Err(ConfigurationError::UnknownConsoleTarget(s.to_string())),
        }
    }
}

/// `log::Log` printing each record as one JSON line.
pub struct JsonConsoleLogger {
    builder: RecordBuilder,
    target: ConsoleTarget,
    level: LevelFilter,
}

impl JsonConsoleLogger {
    pub fn new(builder: RecordBuilder, target: ConsoleTarget, level: LevelFilter) -> Self {
        Self {
            builder,
            target,
            level,
        }
    }

    pub fn render_line(&self, record: &Record<'_>) -> Option<String> {
        serde_json::to_string(&self.builder.build(record)).ok()
    }

    pub fn install(self) -> Result<(), SetLoggerError> {
        let level = self.level;
        log::set_boxed_logger(Box::new(self))?;
        log::set_max_level(level);
        Ok(())
    }
}

impl Log for JsonConsoleLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let Some(line) = self.render_line(record) else {
            return;
        };

        // A closed console is not worth failing the caller over.
        let _ = match self.target {
            ConsoleTarget::Stdout => writeln!(io::stdout().lock(), "{line}"),
            ConsoleTarget::Stderr => writeln!(io::stderr().lock(), "{line}"),
        };
    }

    fn flush(&self) {
        let _ = match self.target {
            ConsoleTarget::Stdout => io::stdout().flush(),
            ConsoleTarget::Stderr => io::stderr().flush(),
        };
    }
}

#[cfg(test)]
#[path = "adapter_tests.rs"]
mod tests;
