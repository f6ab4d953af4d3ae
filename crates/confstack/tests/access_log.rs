//! File access logging end-to-end: a reader wired to a `FileAccessLogger`
//! leaves an auditable trail of what the process read.

use std::sync::Arc;

use confstack::provider::InMemoryProvider;
use confstack::{
    ACCESS_LOG_FILE_ENV, BroadcastingAccessReporter, ConfigReader, ConfigValue, FileAccessLogger,
    LoggingAccessReporter, secret,
};

fn reader_logging_to(logger: Arc<FileAccessLogger>) -> ConfigReader {
    ConfigReader::builder()
        .with_provider(
            InMemoryProvider::new("mem")
                .with_value("db.host", "localhost")
                .with_value("db.password", ConfigValue::from("hunter2").marked_secret()),
        )
        .with_reporter(logger)
        .build()
        .unwrap()
}

#[test]
fn log_file_records_reads_with_status_glyphs() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("access.log");
    let logger = Arc::new(FileAccessLogger::create(&path).unwrap());

    let reader = reader_logging_to(logger.clone());

    assert_eq!(reader.get::<String>("db.host").as_deref(), Some("localhost"));
    assert_eq!(reader.get::<String>("db.absent"), None);
    assert!(reader.get_required::<String>("db.missing").is_err());
    drop(reader);
    drop(logger);

    let contents = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = contents.lines().collect();

    assert!(lines[0].starts_with("# config access log"));
    assert!(lines[1].starts_with('✅'), "hit line: {}", lines[1]);
    assert!(lines[1].contains("db.host=localhost"));
    assert!(lines[1].contains("from mem"));
    assert!(lines[2].starts_with('🟡'), "absent line: {}", lines[2]);
    assert!(lines[3].starts_with('❌'), "error line: {}", lines[3]);
}

#[test]
fn secrets_never_reach_the_log_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("access.log");
    let logger = Arc::new(FileAccessLogger::create(&path).unwrap());

    let reader = reader_logging_to(logger.clone());

    assert_eq!(
        reader.get::<String>("db.password").as_deref(),
        Some("hunter2")
    );
    let _: Option<String> = reader.get(secret("db.host"));
    drop(reader);
    drop(logger);

    let contents = std::fs::read_to_string(&path).unwrap();
    assert!(!contents.contains("hunter2"));
    assert!(!contents.contains("localhost"));
    assert!(contents.contains("<REDACTED>"));
}

#[test]
fn broadcasting_reporter_feeds_every_sink() {
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("first.log");
    let second = dir.path().join("second.log");

    let broadcaster = BroadcastingAccessReporter::new(vec![
        Arc::new(FileAccessLogger::create(&first).unwrap()),
        Arc::new(FileAccessLogger::create(&second).unwrap()),
        Arc::new(LoggingAccessReporter::new()),
    ])
    .unwrap();

    let reader = ConfigReader::builder()
        .with_provider(InMemoryProvider::new("mem").with_value("a", "1"))
        .with_reporter(Arc::new(broadcaster))
        .build()
        .unwrap();

    let _ = reader.get::<String>("a");
    drop(reader);

    for path in [&first, &second] {
        let contents = std::fs::read_to_string(path).unwrap();
        assert!(contents.lines().any(|l| l.starts_with('✅')), "{path:?}");
    }
}

#[test]
#[serial_test::serial]
fn environment_variable_activates_singleton_logger() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("env-activated.log");

    // SAFETY: serialized test; no concurrent env access.
    unsafe { std::env::set_var(ACCESS_LOG_FILE_ENV, &path) };

    let logger = FileAccessLogger::try_from_environment().expect("logger from environment");
    assert_eq!(logger.path(), path);

    // Memoized: the same instance comes back.
    let again = FileAccessLogger::try_from_environment().unwrap();
    assert!(Arc::ptr_eq(&logger, &again));

    assert!(std::fs::read_to_string(&path)
        .unwrap()
        .starts_with("# config access log"));

    unsafe { std::env::remove_var(ACCESS_LOG_FILE_ENV) };
}
