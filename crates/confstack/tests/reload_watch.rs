//! Live reload scenarios: a reader over a reloading file provider, watch
//! streams reacting to file changes, and a multi-provider stack mixing live
//! and static layers.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use confstack::fs::InMemoryFileSystem;
use confstack::parser::EnvFileParser;
use confstack::provider::{
    InMemoryProvider, MutableInMemoryProvider, ReloadingFileProvider, ReloadingOptions,
};
use confstack::{ConfigError, ConfigReader};

fn at(secs: u64) -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
}

async fn reloading(fs: &Arc<InMemoryFileSystem>) -> ReloadingFileProvider {
    ReloadingFileProvider::load(
        fs.clone(),
        "/etc/app.env",
        Arc::new(EnvFileParser::new()),
        ReloadingOptions::default(),
    )
    .await
    .unwrap()
}

#[tokio::test]
async fn reader_sees_reloaded_values() {
    let fs = Arc::new(InMemoryFileSystem::new());
    fs.write_file("/etc/app.env", b"key1=value1\nkey2=value2\n".to_vec(), at(1));

    let provider = reloading(&fs).await;
    let reader = ConfigReader::new(Arc::new(provider.clone()));

    assert_eq!(reader.get::<String>("key1").as_deref(), Some("value1"));

    fs.write_file(
        "/etc/app.env",
        b"key1=newValue1\nkey2=value2\n".to_vec(),
        at(2),
    );
    provider.reload_if_needed().await.unwrap();

    assert_eq!(reader.get::<String>("key1").as_deref(), Some("newValue1"));
}

#[tokio::test]
async fn watch_delivers_initial_then_changed_value() {
    let fs = Arc::new(InMemoryFileSystem::new());
    fs.write_file("/etc/app.env", b"key1=value1\nkey2=value2\n".to_vec(), at(1));

    let provider = reloading(&fs).await;
    let reader = ConfigReader::new(Arc::new(provider.clone()));

    let mut updates = reader.watch::<String>("key1");
    assert_eq!(updates.next().await.unwrap().as_deref(), Some("value1"));

    fs.write_file(
        "/etc/app.env",
        b"key1=newValue1\nkey2=value2\n".to_vec(),
        at(2),
    );
    provider.reload_if_needed().await.unwrap();

    assert_eq!(updates.next().await.unwrap().as_deref(), Some("newValue1"));
}

#[tokio::test]
async fn watch_required_emits_error_elements_when_key_disappears() {
    let fs = Arc::new(InMemoryFileSystem::new());
    fs.write_file("/etc/app.env", b"key1=v\n".to_vec(), at(1));

    let provider = reloading(&fs).await;
    let reader = ConfigReader::new(Arc::new(provider.clone()));

    let mut updates = reader.watch_required::<String>("key1");
    assert_eq!(updates.next().await.unwrap().unwrap(), "v");

    fs.write_file("/etc/app.env", b"other=v\n".to_vec(), at(2));
    provider.reload_if_needed().await.unwrap();

    let element = updates.next().await.unwrap();
    assert!(matches!(
        element,
        Err(ConfigError::MissingRequiredValue { .. })
    ));
}

#[tokio::test]
async fn stack_of_live_and_static_providers_watches_through() {
    let live = MutableInMemoryProvider::new("live");
    let reader = ConfigReader::builder()
        .with_provider(live.clone())
        .with_provider(InMemoryProvider::new("defaults").with_value("mode", "default-mode"))
        .build()
        .unwrap();

    let mut updates = reader.watch::<String>("mode");

    // The static layer answers until the live layer overrides it.
    assert_eq!(updates.next().await.unwrap().as_deref(), Some("default-mode"));

    live.set_value("mode", "live-mode");
    assert_eq!(updates.next().await.unwrap().as_deref(), Some("live-mode"));
}

#[tokio::test]
async fn poll_loop_drives_watches_without_manual_reloads() {
    let fs = Arc::new(InMemoryFileSystem::new());
    fs.write_file("/etc/app.env", b"n=1\n".to_vec(), at(1));

    let provider = ReloadingFileProvider::load(
        fs.clone(),
        "/etc/app.env",
        Arc::new(EnvFileParser::new()),
        ReloadingOptions {
            poll_interval: Duration::from_millis(5),
            ..ReloadingOptions::default()
        },
    )
    .await
    .unwrap();

    let looper = provider.clone();
    let poll = tokio::spawn(async move { looper.run_poll_loop().await });

    let reader = ConfigReader::new(Arc::new(provider.clone()));
    let mut updates = reader.watch::<i64>("n");
    assert_eq!(updates.next().await.unwrap(), Some(1));

    fs.write_file("/etc/app.env", b"n=2\n".to_vec(), at(2));

    let second = tokio::time::timeout(Duration::from_secs(2), updates.next())
        .await
        .expect("poll loop must pick up the change");
    assert_eq!(second.unwrap(), Some(2));

    provider.shutdown();
    let _ = tokio::time::timeout(Duration::from_millis(200), poll).await;
}

#[tokio::test]
async fn dropped_watch_deregisters_cleanly() {
    let fs = Arc::new(InMemoryFileSystem::new());
    fs.write_file("/etc/app.env", b"a=1\n".to_vec(), at(1));

    let provider = reloading(&fs).await;
    let reader = ConfigReader::new(Arc::new(provider.clone()));

    let mut updates = reader.watch::<String>("a");
    let _ = updates.next().await;
    drop(updates);

    // Reloading after the watcher is gone must not panic or leak sends.
    fs.write_file("/etc/app.env", b"a=2\n".to_vec(), at(2));
    provider.reload_if_needed().await.unwrap();
    assert_eq!(reader.get::<String>("a").as_deref(), Some("2"));
}
