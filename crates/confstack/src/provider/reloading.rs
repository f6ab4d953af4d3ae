//! Reloading file provider.
//!
//! Watches a parsed configuration file for changes by polling its
//! last-modified timestamp and resolved symlink target - the detection that
//! works for bind-mounted config maps, where the "file" is a symlink whose
//! target flips atomically without the mtime of the visible path changing.
//!
//! # Reload protocol
//!
//! `reload_if_needed` runs a two-phase locking protocol: probe and compare
//! under the lock, read and parse *outside* the lock, then re-acquire and
//! swap only if no concurrent reload won in between (the loser discards its
//! parsed snapshot). The state lock is never held across a suspension
//! point.
//!
//! # Failure semantics
//!
//! Inside the poll loop, a probe, read, or parse failure is logged and
//! counted; the previous snapshot stays active and the next tick retries.
//! Through [`fetch_value`](ReloadingFileProvider::fetch_value) the same
//! failure propagates to the caller.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, SystemTime};

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::file::ParsedSnapshot;
use super::{BoxFuture, ConfigProvider, ConfigSnapshot, SnapshotUpdates, ValueUpdates};
use crate::error::ConfigError;
use crate::fs::FileSystem;
use crate::key::AbsoluteConfigKey;
use crate::key::encoding::KeyEncoder;
use crate::metrics::{ConfigMetrics, NoopMetrics};
use crate::parser::{ParseOptions, ParsedTable, SnapshotParser};
use crate::stream::{LatestSink, Updates, latest_only};
use crate::value::{ConfigType, LookupResult};

const RELOAD_COUNT: &str = "config_reload_count";
const RELOAD_ERROR_COUNT: &str = "config_reload_error_count";
const POLL_TICK_COUNT: &str = "config_poll_tick_count";
const FILE_SIZE_BYTES: &str = "config_file_size_bytes";
const WATCHER_COUNT: &str = "config_watcher_count";

/// Construction options for [`ReloadingFileProvider`].
#[derive(Clone)]
pub struct ReloadingOptions {
    /// How often the poll service checks for changes.
    pub poll_interval: Duration,

    /// Whether a missing file yields an empty snapshot instead of an error.
    pub allow_missing: bool,

    /// Parser options applied on every (re)load.
    pub parse_options: ParseOptions,

    /// Metrics sink.
    pub metrics: Arc<dyn ConfigMetrics>,
}

impl Default for ReloadingOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(15),
            allow_missing: false,
            parse_options: ParseOptions::default(),
            metrics: Arc::new(NoopMetrics),
        }
    }
}

struct ValueWatcher {
    ty: ConfigType,
    sink: LatestSink<Result<LookupResult, ConfigError>>,
}

struct ReloadingState {
    table: Arc<ParsedTable>,
    last_modified: SystemTime,
    real_path: PathBuf,
    value_watchers: HashMap<AbsoluteConfigKey, HashMap<u64, ValueWatcher>>,
    snapshot_watchers: HashMap<u64, LatestSink<Arc<dyn ConfigSnapshot>>>,
    next_watcher_id: u64,
}

impl ReloadingState {
    fn watcher_total(&self) -> u64 {
        let values: usize = self.value_watchers.values().map(HashMap::len).sum();
        (values + self.snapshot_watchers.len()) as u64
    }
}

struct ReloadingInner {
    name: String,
    file_path: PathBuf,
    fs: Arc<dyn FileSystem>,
    parser: Arc<dyn SnapshotParser>,
    options: ReloadingOptions,
    shutdown: AtomicBool,
    poll_errors: AtomicU64,
    state: Mutex<ReloadingState>,
}

impl ReloadingInner {
    fn record_watcher_count(&self, state: &ReloadingState) {
        self.options
            .metrics
            .record_gauge(WATCHER_COUNT, state.watcher_total());
    }
}

/// A file-backed provider that re-parses its file when it changes on disk.
#[derive(Clone)]
pub struct ReloadingFileProvider {
    inner: Arc<ReloadingInner>,
}

impl std::fmt::Debug for ReloadingFileProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReloadingFileProvider").finish_non_exhaustive()
    }
}

impl ReloadingFileProvider {
    /// Loads the initial snapshot and builds the provider.
    ///
    /// Run [`run_poll_loop`](Self::run_poll_loop) on a task to keep the
    /// snapshot fresh; without it the file is only re-checked on `fetch`.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read or parsed, unless
    /// `allow_missing` is set and the file is absent.
    pub async fn load(
        fs: Arc<dyn FileSystem>,
        path: impl AsRef<Path>,
        parser: Arc<dyn SnapshotParser>,
        options: ReloadingOptions,
    ) -> Result<Self, ConfigError> {
        let file_path = path.as_ref().to_path_buf();
        let name = format!("reloading-file[{}]", file_path.display());

        let probed = probe(fs.as_ref(), &file_path, options.allow_missing).await?;
        let (real_path, last_modified) = match &probed {
            Some(pair) => pair.clone(),
            None => (file_path.clone(), SystemTime::UNIX_EPOCH),
        };

        let (table, byte_len) = match &probed {
            Some((real, _)) => match fs.file_contents(real).await {
                Ok(bytes) => {
                    let table = parser.parse(&bytes, &options.parse_options)?;
                    (Arc::new(table), bytes.len() as u64)
                }
                Err(ConfigError::FileNotFound { .. }) if options.allow_missing => {
                    (Arc::new(ParsedTable::empty()), 0)
                }
                Err(e) => return Err(e),
            },
            None => (Arc::new(ParsedTable::empty()), 0),
        };

        options.metrics.record_gauge(FILE_SIZE_BYTES, byte_len);

        Ok(Self {
            inner: Arc::new(ReloadingInner {
                name,
                file_path,
                fs,
                parser,
                options,
                shutdown: AtomicBool::new(false),
                poll_errors: AtomicU64::new(0),
                state: Mutex::new(ReloadingState {
                    table,
                    last_modified,
                    real_path,
                    value_watchers: HashMap::new(),
                    snapshot_watchers: HashMap::new(),
                    next_watcher_id: 0,
                }),
            }),
        })
    }

    /// Polls for changes until [`shutdown`](Self::shutdown) or task
    /// cancellation.
    ///
    /// Errors are counted and logged, never terminal: the next tick retries
    /// with the previous snapshot still serving reads.
    pub async fn run_poll_loop(&self) {
        let mut interval = tokio::time::interval(self.inner.options.poll_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            interval.tick().await;

            if self.inner.shutdown.load(Ordering::Acquire) {
                break;
            }

            self.inner.options.metrics.increment_counter(POLL_TICK_COUNT, 1);

            if let Err(e) = self.reload_if_needed().await {
                self.inner.poll_errors.fetch_add(1, Ordering::Relaxed);
                self.inner
                    .options
                    .metrics
                    .increment_counter(RELOAD_ERROR_COUNT, 1);
                warn!(
                    path = %self.inner.file_path.display(),
                    error = %e,
                    "config reload failed; previous snapshot stays active"
                );
            }
        }

        debug!(path = %self.inner.file_path.display(), "poll loop stopped");
    }

    /// Asks the poll loop to stop at its next tick.
    pub fn shutdown(&self) {
        self.inner.shutdown.store(true, Ordering::Release);
    }

    /// Number of reload errors observed by the poll loop.
    #[must_use]
    pub fn poll_error_count(&self) -> u64 {
        self.inner.poll_errors.load(Ordering::Relaxed)
    }

    /// Checks the file and swaps in a fresh snapshot if it changed.
    ///
    /// # Errors
    ///
    /// Propagates probe, read, and parse failures (subject to
    /// `allow_missing`).
    pub async fn reload_if_needed(&self) -> Result<(), ConfigError> {
        let inner = &self.inner;

        // Phase 1: probe outside the lock.
        let probed = probe(
            inner.fs.as_ref(),
            &inner.file_path,
            inner.options.allow_missing,
        )
        .await?;
        let (cand_real, cand_ts) = match &probed {
            Some(pair) => pair.clone(),
            None => (inner.file_path.clone(), SystemTime::UNIX_EPOCH),
        };

        // Unchanged fast path; otherwise remember what we are replacing.
        let (orig_real, orig_ts) = {
            let state = inner.state.lock();
            if state.real_path == cand_real && state.last_modified == cand_ts {
                return Ok(());
            }
            (state.real_path.clone(), state.last_modified)
        };

        // Phase 2: read and parse outside the lock.
        let (new_table, byte_len) = match &probed {
            Some((real, _)) => match inner.fs.file_contents(real).await {
                Ok(bytes) => {
                    let table = inner.parser.parse(&bytes, &inner.options.parse_options)?;
                    (Arc::new(table), bytes.len() as u64)
                }
                Err(ConfigError::FileNotFound { .. }) if inner.options.allow_missing => {
                    (Arc::new(ParsedTable::empty()), 0)
                }
                Err(e) => return Err(e),
            },
            None => (Arc::new(ParsedTable::empty()), 0),
        };

        // Phase 3: re-acquire and swap, unless a concurrent reload won.
        let fanout = {
            let mut state = inner.state.lock();

            if state.real_path != orig_real || state.last_modified != orig_ts {
                debug!(
                    path = %inner.file_path.display(),
                    "concurrent reload won the race; discarding parsed snapshot"
                );
                return Ok(());
            }

            let old_table = std::mem::replace(&mut state.table, new_table.clone());
            state.real_path = cand_real;
            state.last_modified = cand_ts;

            let watchers: Vec<(AbsoluteConfigKey, Vec<(ConfigType, LatestSink<Result<LookupResult, ConfigError>>)>)> = state
                .value_watchers
                .iter()
                .map(|(key, sinks)| {
                    (
                        key.clone(),
                        sinks.values().map(|w| (w.ty, w.sink.clone())).collect(),
                    )
                })
                .collect();

            let snapshot_sinks: Vec<LatestSink<Arc<dyn ConfigSnapshot>>> =
                state.snapshot_watchers.values().cloned().collect();

            let watcher_total = state.watcher_total();
            (old_table, watchers, snapshot_sinks, watcher_total)
        };
        let (old_table, watchers, snapshot_sinks, watcher_total) = fanout;

        info!(
            path = %inner.file_path.display(),
            entries = new_table.len(),
            "config file reloaded"
        );

        // Phase 4: notify watchers outside the lock. Change detection
        // compares the stored entries structurally, independent of the type
        // each watcher requested.
        for (key, sinks) in watchers {
            let encoded = KeyEncoder::dot_separated().encode(&key);
            let changed = old_table.raw_entry(&encoded) != new_table.raw_entry(&encoded);
            if !changed {
                continue;
            }

            for (ty, sink) in sinks {
                sink.send(lookup_in(&new_table, &key, ty));
            }
        }

        let snapshot: Arc<dyn ConfigSnapshot> = Arc::new(ParsedSnapshot::new(
            inner.name.clone(),
            new_table.clone(),
        ));
        for sink in snapshot_sinks {
            sink.send(snapshot.clone());
        }

        let metrics = &inner.options.metrics;
        metrics.increment_counter(RELOAD_COUNT, 1);
        metrics.record_gauge(FILE_SIZE_BYTES, byte_len);
        metrics.record_gauge(WATCHER_COUNT, watcher_total);

        Ok(())
    }
}

/// Resolves the watched path and reads its timestamp.
///
/// `Ok(None)` encodes "missing but tolerated".
async fn probe(
    fs: &dyn FileSystem,
    path: &Path,
    allow_missing: bool,
) -> Result<Option<(PathBuf, SystemTime)>, ConfigError> {
    let resolved = match fs.resolve_symlinks(path).await {
        Ok(p) => p,
        Err(ConfigError::FileNotFound { .. }) if allow_missing => return Ok(None),
        Err(e) => return Err(e),
    };

    match fs.last_modified(&resolved).await {
        Ok(ts) => Ok(Some((resolved, ts))),
        Err(ConfigError::FileNotFound { .. }) if allow_missing => Ok(None),
        Err(e) => Err(e),
    }
}

fn lookup_in(
    table: &ParsedTable,
    key: &AbsoluteConfigKey,
    ty: ConfigType,
) -> Result<LookupResult, ConfigError> {
    let encoded = KeyEncoder::dot_separated().encode(key);
    let value = table.lookup(&encoded, ty)?;
    Ok(LookupResult {
        encoded_key: encoded,
        value,
    })
}

impl ConfigProvider for ReloadingFileProvider {
    fn name(&self) -> &str {
        &self.inner.name
    }

    fn value(
        &self,
        key: &AbsoluteConfigKey,
        ty: ConfigType,
    ) -> Result<LookupResult, ConfigError> {
        let table = self.inner.state.lock().table.clone();
        lookup_in(&table, key, ty)
    }

    fn fetch_value<'a>(
        &'a self,
        key: &'a AbsoluteConfigKey,
        ty: ConfigType,
    ) -> BoxFuture<'a, Result<LookupResult, ConfigError>> {
        Box::pin(async move {
            self.reload_if_needed().await?;
            self.value(key, ty)
        })
    }

    fn snapshot(&self) -> Arc<dyn ConfigSnapshot> {
        let table = self.inner.state.lock().table.clone();
        Arc::new(ParsedSnapshot::new(self.inner.name.clone(), table))
    }

    fn watch_value(&self, key: &AbsoluteConfigKey, ty: ConfigType) -> ValueUpdates {
        let (sink, stream) = latest_only();

        let (id, initial) = {
            let mut state = self.inner.state.lock();
            let id = state.next_watcher_id;
            state.next_watcher_id += 1;

            state
                .value_watchers
                .entry(key.clone())
                .or_default()
                .insert(id, ValueWatcher {
                    ty,
                    sink: sink.clone(),
                });

            self.inner.record_watcher_count(&state);
            (id, lookup_in(&state.table, key, ty))
        };

        sink.send(initial);

        let inner = self.inner.clone();
        let watched_key = key.clone();
        Updates::from_slot(stream, move || {
            let mut state = inner.state.lock();
            if let Some(sinks) = state.value_watchers.get_mut(&watched_key) {
                sinks.remove(&id);
                if sinks.is_empty() {
                    state.value_watchers.remove(&watched_key);
                }
            }
            inner.record_watcher_count(&state);
        })
    }

    fn watch_snapshot(&self) -> SnapshotUpdates {
        let (sink, stream) = latest_only();

        let id = {
            let mut state = self.inner.state.lock();
            let id = state.next_watcher_id;
            state.next_watcher_id += 1;
            state.snapshot_watchers.insert(id, sink.clone());
            self.inner.record_watcher_count(&state);
            id
        };

        sink.send(self.snapshot());

        let inner = self.inner.clone();
        Updates::from_slot(stream, move || {
            let mut state = inner.state.lock();
            state.snapshot_watchers.remove(&id);
            inner.record_watcher_count(&state);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::InMemoryFileSystem;
    use crate::parser::EnvFileParser;

    fn key(s: &str) -> AbsoluteConfigKey {
        AbsoluteConfigKey::from(s)
    }

    fn at(secs: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
    }

    async fn provider_over(fs: Arc<InMemoryFileSystem>) -> ReloadingFileProvider {
        ReloadingFileProvider::load(
            fs,
            "/etc/app.env",
            Arc::new(EnvFileParser::new()),
            ReloadingOptions::default(),
        )
        .await
        .unwrap()
    }

    fn string_at(provider: &ReloadingFileProvider, name: &str) -> Option<String> {
        provider
            .value(&key(name), ConfigType::String)
            .unwrap()
            .value
            .map(|v| v.content().as_str().unwrap().to_string())
    }

    #[tokio::test]
    async fn test_initial_load_and_reload() {
        let fs = Arc::new(InMemoryFileSystem::new());
        fs.write_file("/etc/app.env", b"key1=value1\nkey2=value2\n".to_vec(), at(1));

        let provider = provider_over(fs.clone()).await;
        assert_eq!(string_at(&provider, "key1").as_deref(), Some("value1"));

        fs.write_file(
            "/etc/app.env",
            b"key1=newValue1\nkey2=value2\n".to_vec(),
            at(2),
        );
        provider.reload_if_needed().await.unwrap();

        assert_eq!(string_at(&provider, "key1").as_deref(), Some("newValue1"));
    }

    #[tokio::test]
    async fn test_unchanged_timestamp_skips_reload() {
        let fs = Arc::new(InMemoryFileSystem::new());
        fs.write_file("/etc/app.env", b"key1=value1\n".to_vec(), at(1));

        let provider = provider_over(fs.clone()).await;

        // Same mtime: the new content must not be picked up.
        fs.write_file("/etc/app.env", b"key1=sneaky\n".to_vec(), at(1));
        provider.reload_if_needed().await.unwrap();

        assert_eq!(string_at(&provider, "key1").as_deref(), Some("value1"));
    }

    #[tokio::test]
    async fn test_symlink_swap_triggers_reload() {
        let fs = Arc::new(InMemoryFileSystem::new());
        fs.write_file("/data/v1.env", b"key1=one\n".to_vec(), at(1));
        fs.write_file("/data/v2.env", b"key1=two\n".to_vec(), at(1));
        fs.write_symlink("/etc/app.env", "/data/v1.env");

        let provider = provider_over(fs.clone()).await;
        assert_eq!(string_at(&provider, "key1").as_deref(), Some("one"));

        // Same mtime on both targets; only the resolved path differs.
        fs.write_symlink("/etc/app.env", "/data/v2.env");
        provider.reload_if_needed().await.unwrap();

        assert_eq!(string_at(&provider, "key1").as_deref(), Some("two"));
    }

    #[tokio::test]
    async fn test_watch_initial_and_update() {
        let fs = Arc::new(InMemoryFileSystem::new());
        fs.write_file("/etc/app.env", b"key1=value1\nkey2=value2\n".to_vec(), at(1));

        let provider = provider_over(fs.clone()).await;
        let mut updates = provider.watch_value(&key("key1"), ConfigType::String);

        let first = updates.next().await.unwrap().unwrap();
        assert_eq!(
            first.value.unwrap().content().as_str().unwrap(),
            "value1"
        );

        fs.write_file(
            "/etc/app.env",
            b"key1=newValue1\nkey2=value2\n".to_vec(),
            at(2),
        );
        provider.reload_if_needed().await.unwrap();

        let second = updates.next().await.unwrap().unwrap();
        assert_eq!(
            second.value.unwrap().content().as_str().unwrap(),
            "newValue1"
        );
    }

    #[tokio::test]
    async fn test_unchanged_key_not_notified() {
        let fs = Arc::new(InMemoryFileSystem::new());
        fs.write_file("/etc/app.env", b"stable=s\nmoving=1\n".to_vec(), at(1));

        let provider = provider_over(fs.clone()).await;
        let mut updates = provider.watch_value(&key("stable"), ConfigType::String);
        let _ = updates.next().await.unwrap();

        fs.write_file("/etc/app.env", b"stable=s\nmoving=2\n".to_vec(), at(2));
        provider.reload_if_needed().await.unwrap();

        let quiet =
            tokio::time::timeout(Duration::from_millis(20), updates.next()).await;
        assert!(quiet.is_err(), "unchanged key must not be renotified");
    }

    #[tokio::test]
    async fn test_snapshot_watch_sees_reload() {
        let fs = Arc::new(InMemoryFileSystem::new());
        fs.write_file("/etc/app.env", b"a=1\n".to_vec(), at(1));

        let provider = provider_over(fs.clone()).await;
        let mut snapshots = provider.watch_snapshot();
        let _ = snapshots.next().await.unwrap();

        fs.write_file("/etc/app.env", b"a=2\n".to_vec(), at(2));
        provider.reload_if_needed().await.unwrap();

        let fresh = snapshots.next().await.unwrap();
        let lookup = fresh.value(&key("a"), ConfigType::String).unwrap();
        assert_eq!(lookup.value.unwrap().content().as_str().unwrap(), "2");
    }

    #[tokio::test]
    async fn test_missing_file_rejected_by_default() {
        let fs = Arc::new(InMemoryFileSystem::new());
        let err = ReloadingFileProvider::load(
            fs,
            "/etc/app.env",
            Arc::new(EnvFileParser::new()),
            ReloadingOptions::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn test_allow_missing_yields_empty_then_recovers() {
        let fs = Arc::new(InMemoryFileSystem::new());

        let provider = ReloadingFileProvider::load(
            fs.clone(),
            "/etc/app.env",
            Arc::new(EnvFileParser::new()),
            ReloadingOptions {
                allow_missing: true,
                ..ReloadingOptions::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(string_at(&provider, "a"), None);

        fs.write_file("/etc/app.env", b"a=appeared\n".to_vec(), at(5));
        provider.reload_if_needed().await.unwrap();
        assert_eq!(string_at(&provider, "a").as_deref(), Some("appeared"));

        // And back to missing: empty snapshot again.
        fs.remove(Path::new("/etc/app.env"));
        provider.reload_if_needed().await.unwrap();
        assert_eq!(string_at(&provider, "a"), None);
    }

    #[tokio::test]
    async fn test_parse_error_keeps_previous_snapshot_via_poll_semantics() {
        let fs = Arc::new(InMemoryFileSystem::new());
        fs.write_file("/etc/app.json", br#"{"a": 1}"#.to_vec(), at(1));

        let provider = ReloadingFileProvider::load(
            fs.clone(),
            "/etc/app.json",
            Arc::new(crate::parser::JsonParser::new()),
            ReloadingOptions::default(),
        )
        .await
        .unwrap();

        fs.write_file("/etc/app.json", b"{broken".to_vec(), at(2));
        let err = provider.reload_if_needed().await.unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));

        // Old snapshot still serves reads.
        let lookup = provider.value(&key("a"), ConfigType::Int).unwrap();
        assert_eq!(*lookup.value.unwrap().content().as_int().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_fetch_value_reloads_first() {
        let fs = Arc::new(InMemoryFileSystem::new());
        fs.write_file("/etc/app.env", b"a=1\n".to_vec(), at(1));

        let provider = provider_over(fs.clone()).await;
        fs.write_file("/etc/app.env", b"a=2\n".to_vec(), at(2));

        let fetched = provider
            .fetch_value(&key("a"), ConfigType::String)
            .await
            .unwrap();
        assert_eq!(fetched.value.unwrap().content().as_str().unwrap(), "2");
    }

    #[tokio::test]
    async fn test_concurrent_reload_single_winner() {
        let fs = Arc::new(InMemoryFileSystem::new());
        fs.write_file("/etc/app.env", b"a=1\n".to_vec(), at(1));

        let provider = provider_over(fs.clone()).await;
        fs.write_file("/etc/app.env", b"a=2\n".to_vec(), at(2));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let p = provider.clone();
            handles.push(tokio::spawn(async move { p.reload_if_needed().await }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(string_at(&provider, "a").as_deref(), Some("2"));
    }

    #[tokio::test]
    async fn test_poll_loop_shutdown() {
        let fs = Arc::new(InMemoryFileSystem::new());
        fs.write_file("/etc/app.env", b"a=1\n".to_vec(), at(1));

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
        let handle = tokio::spawn(async move { looper.run_poll_loop().await });

        fs.write_file("/etc/app.env", b"a=2\n".to_vec(), at(2));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(string_at(&provider, "a").as_deref(), Some("2"));

        provider.shutdown();
        tokio::time::timeout(Duration::from_millis(200), handle)
            .await
            .expect("loop exits after shutdown")
            .unwrap();
    }
}
