use super::*;
use crate::{LogLevel, LogRecord};
use chrono::{TimeZone, Utc};

fn sample() -> LogRecord {
    LogRecord::new(
        "app::orders",
        LogLevel::Warn,
        Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap(),
        "order {} rejected: {}",
    )
    .with_args([Some("42"), Some("no stock")])
    .with_context("tenant", "acme")
    .with_line_number(118)
}

#[test]
fn renders_each_conversion_word() {
    let record = sample();

    let cases: &[(&str, &str)] = &[
        ("%level", "WARN"),
        ("%p", "WARN"),
        ("%logger", "app::orders"),
        ("%c", "app::orders"),
        ("%msg", "order 42 rejected: no stock"),
        ("%m", "order 42 rejected: no stock"),
        ("%line", "118"),
        ("%L", "118"),
        ("%X{tenant}", "acme"),
        ("%X{missing}", ""),
        ("%d", "2024-03-09T14:05:07.000Z"),
        ("%d{%Y/%m/%d}", "2024/03/09"),
        ("%date{%H%M%S}", "140507"),
        ("100%% done", "100% done"),
        ("a%n b", "a\n b"),
        ("a%n/b", "a\n/b"),
        ("plain", "plain"),
    ];

    for (src, expected) in cases {
        let pattern = Pattern::parse(src).expect("valid pattern");
        assert_eq!(
            pattern.render(&record, None),
            *expected,
            "pattern {:?}",
            src
        );
    }
}

#[test]
fn seq_only_renders_when_given() {
    let pattern = Pattern::parse("logs/%d{%Y-%m-%d}/%seq").unwrap();
    let record = sample();

    assert_eq!(pattern.render(&record, Some(7)), "logs/2024-03-09/7");
    assert_eq!(pattern.render(&record, None), "logs/2024-03-09/");
}

#[test]
fn line_is_empty_when_unknown() {
    let mut record = sample();
    record.line_number = None;

    let pattern = Pattern::parse("[%line]").unwrap();
    assert_eq!(pattern.render(&record, None), "[]");
}

#[test]
fn parse_rejects_malformed_patterns() {
    let cases: &[(&str, PatternError)] = &[
        ("abc%", PatternError::DanglingPercent(3)),
        ("%{x}", PatternError::DanglingPercent(0)),
        ("%bogus", PatternError::UnknownConversion("bogus".into())),
        ("%d{%Y", PatternError::UnterminatedOption("d".into())),
        ("%X", PatternError::MissingOption("X".into())),
        ("%d{%Q}", PatternError::InvalidDateFormat("%Q".into())),
    ];

    for (src, expected) in cases {
        assert_eq!(
            Pattern::parse(src).unwrap_err(),
            *expected,
            "pattern {:?}",
            src
        );
    }
}

#[test]
fn from_str_keeps_source() {
    let pattern: Pattern = "%level %msg%n".parse().unwrap();
    assert_eq!(pattern.as_str(), "%level %msg%n");
}

#[test]
fn conversion_words_are_read_greedily() {
    // Letters right after `%n` extend the word instead of ending it.
    assert_eq!(
        Pattern::parse("a%nb"),
        Err(PatternError::UnknownConversion("nb".into()))
    );
    assert_eq!(
        Pattern::parse("%msgs"),
        Err(PatternError::UnknownConversion("msgs".into()))
    );

    let record = sample();
    assert_eq!(Pattern::parse("a%n{}b").unwrap().render(&record, None), "a\nb");
}
