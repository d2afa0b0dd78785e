use std::{
    io::{self, BufRead},
    path::PathBuf,
    process::ExitCode,
    sync::Arc,
    thread,
    time::Duration,
};

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Args;
use crossbeam::{channel, select};
use log::{error, info, warn};
use logship_pipeline::{
    Appender, AppenderConfig, FsObjectStore, ObjectStore, PayloadFormat, parse_duration,
};
use logship_protocol::{LogLevel, LogRecord};
use logship_runtime::{
    DEFAULT_FLUSH_SIZE, DEFAULT_KEY_PATTERN, DEFAULT_UPLOAD_THREADS, default_store_root,
};
use signal_hook::{
    consts::{SIGINT, SIGTERM},
    iterator::Signals,
};

#[derive(Debug, Args)]
pub struct ShipArgs {
    /// Destination bucket
    #[arg(long, short = 'b')]
    pub bucket: String,

    /// Directory holding the buckets [default: $XDG_DATA_HOME/logship]
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Pattern naming each batch's object
    #[arg(long, default_value = DEFAULT_KEY_PATTERN)]
    pub key_pattern: String,

    /// Pattern stored as each record's human-readable rendering
    #[arg(long)]
    pub render_pattern: Option<String>,

    /// Records per batch before it is flushed
    #[arg(long, default_value_t = DEFAULT_FLUSH_SIZE)]
    pub flush_size: usize,

    /// Age of a non-empty batch before it is flushed (e.g. PT5M, 30s)
    #[arg(long, value_parser = parse_duration, default_value = "PT5M")]
    pub flush_interval: Duration,

    /// Stamp each record with its input line number
    #[arg(long)]
    pub line_numbers: bool,

    /// Gzip payloads before upload
    #[arg(long)]
    pub gzip: bool,

    /// Maximum concurrent uploads
    #[arg(long, default_value_t = DEFAULT_UPLOAD_THREADS)]
    pub upload_threads: usize,

    /// Payload encoding: json or binary
    #[arg(long, default_value = "json")]
    pub format: PayloadFormat,

    /// Logger name stamped on every record
    #[arg(long, default_value = "stdin")]
    pub logger: String,

    /// Level stamped on every record
    #[arg(long, default_value = "info")]
    pub level: LogLevel,

    /// Verbose pipeline diagnostics on stderr
    #[arg(long)]
    pub debug: bool,
}

impl ShipArgs {
    fn to_config(&self) -> AppenderConfig {
        AppenderConfig {
            bucket: Some(self.bucket.clone()),
            key_pattern: self.key_pattern.clone(),
            render_pattern: self.render_pattern.clone(),
            flush_size: self.flush_size,
            flush_interval: self.flush_interval,
            line_numbers: self.line_numbers,
            gzip: self.gzip,
            upload_threads: self.upload_threads,
            format: self.format,
            debug: self.debug,
            ..AppenderConfig::default()
        }
    }
}

pub fn run(args: ShipArgs) -> ExitCode {
    match ship(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            eprintln!("logship: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn ship(args: ShipArgs) -> Result<()> {
    let root = args.root.clone().unwrap_or_else(default_store_root);
    let store: Arc<dyn ObjectStore> = Arc::new(FsObjectStore::new(&root));

    let config = args.to_config();
    let appender = Arc::new(Appender::start(&config, store).context("Failed to start pipeline")?);
    let renderer = appender.config().render_pattern.clone();

    info!(
        "shipping stdin to {}/{} (flush {} / {:?})",
        root.display(),
        args.bucket,
        args.flush_size,
        args.flush_interval
    );

    let (stop_tx, stop_rx) = channel::bounded::<&'static str>(2);

    let mut signals = Signals::new([SIGINT, SIGTERM])
        .context("Failed to register signal handlers for SIGINT/SIGTERM")?;
    {
        let stop_tx = stop_tx.clone();
        thread::spawn(move || {
            if signals.forever().next().is_some() {
                let _ = stop_tx.send("signal");
            }
        });
    }

    // stdin reads are not interruptible, so the reader runs on its own thread
    // and is simply abandoned if a signal arrives first.
    let (lines_tx, lines_rx) = channel::bounded::<Result<u64>>(1);
    {
        let appender = Arc::clone(&appender);
        let logger = args.logger.clone();
        let level = args.level;
        let line_numbers = args.line_numbers;
        thread::spawn(move || {
            let read = read_lines(io::stdin().lock(), |n, line| {
                let mut record = LogRecord::new(logger.as_str(), level, Utc::now(), line);
                if line_numbers {
                    record.line_number = u32::try_from(n).ok();
                }
                if let Some(pattern) = &renderer {
                    record.rendered = Some(pattern.render(&record, None));
                }
                appender.append(record);
            });
            let _ = lines_tx.send(read);
        });
    }

    let mut read_error = None;
    select! {
        recv(lines_rx) -> read => match read {
            Ok(Ok(n)) => info!("end of input after {n} lines"),
            Ok(Err(e)) => read_error = Some(e),
            Err(_) => warn!("stdin reader exited unexpectedly"),
        },
        recv(stop_rx) -> _ => info!("shutdown signal received; draining"),
    }

    match appender.stop() {
        Some(report) => {
            info!(
                "shipped {} records in {} batches",
                report.records, report.batches
            );
            if !report.drained {
                warn!("some uploads did not finish before the drain timeout");
            }
        }
        None => warn!("pipeline had already stopped"),
    }

    match read_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Feed each line of `input` to `sink` with its 1-based line number. Returns the line count.
fn read_lines<R, F>(input: R, mut sink: F) -> Result<u64>
where
    R: BufRead,
    F: FnMut(u64, String),
{
    let mut count = 0;
    for line in input.lines() {
        let line = line.context("Failed to read from stdin")?;
        count += 1;
        sink(count, line);
    }
    Ok(count)
}
