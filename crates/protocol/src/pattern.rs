//! A small conversion-pattern language, used both to name the object a batch
//! is written to and to render individual records for humans.
//!
//! | word                  | expands to                                  |
//! |-----------------------|---------------------------------------------|
//! | `%d`, `%date`         | timestamp, RFC3339 with millis, UTC         |
//! | `%d{fmt}`             | timestamp through a strftime format         |
//! | `%p`, `%level`        | level                                       |
//! | `%c`, `%logger`       | logger name                                 |
//! | `%m`, `%msg`          | message with arguments substituted          |
//! | `%L`, `%line`         | call-site line, empty when unknown          |
//! | `%X{key}`             | context value, empty when absent            |
//! | `%seq`                | batch sequence number, empty for records    |
//! | `%n`                  | newline                                     |
//! | `%%`                  | a literal `%`                               |

use std::{fmt::Write, str::FromStr};

use chrono::{
    SecondsFormat,
    format::{Item, StrftimeItems},
};

use crate::LogRecord;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatternError {
    #[error("'%' at offset {0} is not followed by a conversion word")]
    DanglingPercent(usize),
    #[error("unknown conversion word '%{0}'")]
    UnknownConversion(String),
    #[error("unterminated '{{' after '%{0}'")]
    UnterminatedOption(String),
    #[error("'%{0}' requires an option in braces")]
    MissingOption(String),
    #[error("invalid date format '{0}'")]
    InvalidDateFormat(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Date(Option<String>),
    Level,
    Logger,
    Message,
    Line,
    Context(String),
    Seq,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    source: String,
    segments: Vec<Segment>,
}

impl Pattern {
    pub fn parse(source: &str) -> Result<Self, PatternError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = source.char_indices().peekable();

        while let Some((offset, c)) = chars.next() {
            if c != '%' {
                literal.push(c);
                continue;
            }

            if let Some((_, '%')) = chars.peek() {
                chars.next();
                literal.push('%');
                continue;
            }

            let mut word = String::new();
            while let Some(&(_, w)) = chars.peek() {
                if !w.is_ascii_alphabetic() {
                    break;
                }
                word.push(w);
                chars.next();
            }
            if word.is_empty() {
                return Err(PatternError::DanglingPercent(offset));
            }

            let mut option = None;
            if let Some((_, '{')) = chars.peek() {
                chars.next();
                let mut opt = String::new();
                let mut closed = false;
                for (_, o) in chars.by_ref() {
                    if o == '}' {
                        closed = true;
                        break;
                    }
                    opt.push(o);
                }
                if !closed {
                    return Err(PatternError::UnterminatedOption(word));
                }
                option = Some(opt);
            }

            let segment = match word.as_str() {
                "n" => {
                    literal.push('\n');
                    continue;
                }
                "d" | "date" => {
                    if let Some(fmt) = &option {
                        if StrftimeItems::new(fmt).any(|item| matches!(item, Item::Error)) {
                            return Err(PatternError::InvalidDateFormat(fmt.clone()));
                        }
                    }
                    Segment::Date(option)
                }
                "p" | "level" => Segment::Level,
                "c" | "logger" => Segment::Logger,
                "m" | "msg" | "message" => Segment::Message,
                "L" | "line" => Segment::Line,
                "X" => match option {
                    Some(key) => Segment::Context(key),
                    None => return Err(PatternError::MissingOption(word)),
                },
                "seq" => Segment::Seq,
                _ => return Err(PatternError::UnknownConversion(word)),
            };

            if !literal.is_empty() {
                segments.push(Segment::Literal(std::mem::take(&mut literal)));
            }
            segments.push(segment);
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self {
            source: source.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Expand the pattern against `record`. `seq` fills `%seq` and is only
    /// meaningful when naming a batch.
    pub fn render(&self, record: &LogRecord, seq: Option<u64>) -> String {
        let mut out = String::new();

        for segment in &self.segments {
            match segment {
                Segment::Literal(s) => out.push_str(s),
                Segment::Date(None) => {
                    out.push_str(&record.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true))
                }
                Segment::Date(Some(fmt)) => {
                    let _ = write!(out, "{}", record.timestamp.format(fmt));
                }
                Segment::Level => out.push_str(record.level.as_str()),
                Segment::Logger => out.push_str(&record.logger_name),
                Segment::Message => out.push_str(&record.message()),
                Segment::Line => {
                    if let Some(line) = record.line_number {
                        let _ = write!(out, "{line}");
                    }
                }
                Segment::Context(key) => {
                    if let Some(value) = record.context.get(key) {
                        out.push_str(value);
                    }
                }
                Segment::Seq => {
                    if let Some(seq) = seq {
                        let _ = write!(out, "{seq}");
                    }
                }
            }
        }

        out
    }
}

impl FromStr for Pattern {
    type Err = PatternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Pattern::parse(s)
    }
}

#[cfg(test)]
#[path = "pattern_tests.rs"]
mod tests;
