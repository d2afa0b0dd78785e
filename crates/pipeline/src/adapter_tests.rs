use super::*;
use crate::{config::AppenderConfig, test_support::RecordingStore};
use logship_protocol::LogLevel;
use std::time::Duration;

fn log_record<'a>(target: &'a str, args: std::fmt::Arguments<'a>) -> Record<'a> {
    Record::builder()
        .args(args)
        .level(Level::Warn)
        .target(target)
        .line(Some(42))
        .build()
}

#[test]
fn builder_copies_event_fields() {
    let builder = RecordBuilder::new().context("service", "billing");

    let built = builder.build(&log_record("app::orders", format_args!("order {} failed", 7)));

    assert_eq!(built.logger_name, "app::orders");
    assert_eq!(built.level, LogLevel::Warn);
    assert_eq!(built.format, "order 7 failed");
    assert_eq!(built.message(), "order 7 failed");
    assert_eq!(built.context.get("service").map(String::as_str), Some("billing"));
    assert_eq!(built.line_number, None, "line numbers are off by default");
    assert_eq!(built.rendered, None);
}

#[test]
fn builder_adds_line_numbers_and_rendering_when_enabled() {
    let builder = RecordBuilder::new()
        .line_numbers(true)
        .render_pattern(Some(Pattern::parse("%p %c:%L %m").unwrap()));

    let built = builder.build(&log_record("app", format_args!("hello")));

    assert_eq!(built.line_number, Some(42));
    assert_eq!(built.rendered.as_deref(), Some("WARN app:42 hello"));
}

#[test]
fn builder_from_config_follows_options() {
    let config = AppenderConfig {
        line_numbers: true,
        render_pattern: Some("%m".to_string()),
        ..AppenderConfig::new("b")
    }
    .validate()
    .unwrap();

    let built = RecordBuilder::from_config(&config).build(&log_record("app", format_args!("x")));
    assert_eq!(built.line_number, Some(42));
    assert_eq!(built.rendered.as_deref(), Some("x"));
}

#[test]
fn shipping_logger_ships_application_records_only() {
    let store = RecordingStore::new();
    let config = AppenderConfig {
        key_pattern: "batches/%seq".to_string(),
        flush_size: 100,
        drain_timeout: Duration::from_secs(10),
        ..AppenderConfig::new("test-bucket")
    };
    let appender = Arc::new(Appender::start(&config, store.clone()).unwrap());
    let logger = ShippingLogger::new(Arc::clone(&appender), LevelFilter::Info);

    logger.log(&log_record("app::orders", format_args!("shipped")));
    logger.log(&log_record("logship_pipeline::batcher", format_args!("internal")));
    logger.log(
        &Record::builder()
            .args(format_args!("too verbose"))
            .level(Level::Debug)
            .target("app")
            .build(),
    );
    appender.stop();

    let puts = store.puts();
    assert_eq!(puts.len(), 1);
    let formats: Vec<String> = puts[0].records().into_iter().map(|r| r.format).collect();
    assert_eq!(formats, vec!["shipped"]);
}

#[test]
fn internal_targets_use_the_diagnostics_level() {
    let store = RecordingStore::new();
    let appender = Arc::new(Appender::start(&AppenderConfig::new("b"), store).unwrap());
    let logger = ShippingLogger::new(Arc::clone(&appender), LevelFilter::Trace);

    let internal_debug = Metadata::builder()
        .level(Level::Debug)
        .target("logship_pipeline::uploader")
        .build();
    let app_debug = Metadata::builder().level(Level::Debug).target("app").build();

    assert!(!logger.enabled(&internal_debug));
    assert!(logger.enabled(&app_debug));
    appender.stop();
}

#[test]
fn json_console_logger_renders_one_json_object() {
    let logger = JsonConsoleLogger::new(
        RecordBuilder::new().context("host", "web-1"),
        ConsoleTarget::Stderr,
        LevelFilter::Info,
    );

    let line = logger
        .render_line(&log_record("app", format_args!("disk {}% full", 93)))
        .unwrap();
    assert!(!line.contains('\n'));

    let decoded: LogRecord = serde_json::from_str(&line).unwrap();
    assert_eq!(decoded.format, "disk 93% full");
    assert_eq!(decoded.level, LogLevel::Warn);
    assert_eq!(decoded.context.get("host").map(String::as_str), Some("web-1"));
}

#[test]
fn console_target_parses_names() {
    assert_eq!("stdout".parse::<ConsoleTarget>().unwrap(), ConsoleTarget::Stdout);
    assert_eq!("System.err".parse::<ConsoleTarget>().unwrap(), ConsoleTarget::Stderr);
    assert!(matches!(
        "syslog".parse::<ConsoleTarget>(),
        Err(ConfigurationError::UnknownConsoleTarget(_))
    ));
}
