use std::{
    fs,
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
    process::ExitCode,
};

use anyhow::{Context, Result};
use clap::Args;
use log::error;
use logship_pipeline::PayloadFormat;
use logship_protocol::{Codec, LogRecord, Pattern, compress};

const DEFAULT_CAT_PATTERN: &str = "%d %p [%c] %m";

#[derive(Debug, Args)]
pub struct CatArgs {
    /// Object file written by `logship ship`
    pub file: PathBuf,

    /// Payload encoding: json or binary
    #[arg(long, default_value = "json")]
    pub format: PayloadFormat,

    /// Pattern each record is printed with [default: the record's own
    /// rendering, else "%d %p [%c] %m"]
    #[arg(long)]
    pub pattern: Option<Pattern>,
}

pub fn run(args: CatArgs) -> ExitCode {
    let out = io::stdout();
    let mut out = BufWriter::new(out.lock());

    match cat(&args, &mut out).and_then(|()| out.flush().map_err(Into::into)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            eprintln!("logship: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn cat<W: Write>(args: &CatArgs, out: &mut W) -> Result<()> {
    let records = read_object(&args.file, args.format)?;
    let fallback = Pattern::parse(DEFAULT_CAT_PATTERN)?;

    for record in &records {
        writeln!(out, "{}", render(record, args.pattern.as_ref(), &fallback))?;
    }
    Ok(())
}

fn read_object(path: &Path, format: PayloadFormat) -> Result<Vec<LogRecord>> {
    let raw = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;

    let payload = if compress::is_gzip(&raw) {
        compress::gunzip(&raw)
            .with_context(|| format!("Failed to decompress {}", path.display()))?
    } else {
        raw
    };

    format
        .codec()
        .decode(&payload)
        .with_context(|| format!("Failed to decode {} as {format:?}", path.display()))
}

fn render(record: &LogRecord, pattern: Option<&Pattern>, fallback: &Pattern) -> String {
    match (pattern, &record.rendered) {
        (Some(p), _) => p.render(record, None),
        (None, Some(rendered)) => rendered.clone(),
        (None, None) => fallback.render(record, None),
    }
}
