//! In-memory providers.
//!
//! [`InMemoryProvider`] is an immutable table from absolute keys (context
//! included) to values - the workhorse for tests and for layering explicit
//! overrides into a provider stack. [`MutableInMemoryProvider`] adds
//! `set_value` with per-key and per-snapshot watcher fan-out.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use super::{ConfigProvider, ConfigSnapshot, SnapshotUpdates, ValueUpdates};
use crate::error::ConfigError;
use crate::key::AbsoluteConfigKey;
use crate::key::encoding::KeyEncoder;
use crate::stream::{LatestSink, Updates, latest_only};
use crate::value::{ConfigType, ConfigValue, LookupResult};

/// Shared table lookup: dot-encoded key, tag-exact type check.
fn lookup_in(
    entries: &HashMap<AbsoluteConfigKey, ConfigValue>,
    key: &AbsoluteConfigKey,
    ty: ConfigType,
) -> Result<LookupResult, ConfigError> {
    let encoded = KeyEncoder::dot_separated().encode(key);

    match entries.get(key) {
        None => Ok(LookupResult::miss(encoded)),

        Some(value) if value.ty() == ty => Ok(LookupResult::hit(encoded, value.clone())),

        Some(_) => Err(ConfigError::NotConvertible {
            name: encoded,
            requested: ty,
        }),
    }
}

// ============================================================================
// Immutable provider
// ============================================================================

/// An immutable in-memory provider.
///
/// # Example
///
/// ```rust
/// use confstack::provider::InMemoryProvider;
/// use confstack::ConfigValue;
///
/// let provider = InMemoryProvider::new("defaults")
///     .with_value("db.host", "localhost")
///     .with_value("db.pool.size", 8i64)
///     .with_value("api.token", ConfigValue::from("t0ken").marked_secret());
/// ```
#[derive(Clone, Debug)]
pub struct InMemoryProvider {
    name: String,
    entries: Arc<HashMap<AbsoluteConfigKey, ConfigValue>>,
}

struct InMemorySnapshot {
    name: String,
    entries: Arc<HashMap<AbsoluteConfigKey, ConfigValue>>,
}

impl ConfigSnapshot for InMemorySnapshot {
    fn name(&self) -> &str {
        &self.name
    }

    fn value(
        &self,
        key: &AbsoluteConfigKey,
        ty: ConfigType,
    ) -> Result<LookupResult, ConfigError> {
        lookup_in(&self.entries, key, ty)
    }
}

impl InMemoryProvider {
    /// Creates an empty provider with the given name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Arc::new(HashMap::new()),
        }
    }

    /// Builder-style insertion of a single value.
    #[must_use]
    pub fn with_value(
        mut self,
        key: impl Into<AbsoluteConfigKey>,
        value: impl Into<ConfigValue>,
    ) -> Self {
        Arc::make_mut(&mut self.entries).insert(key.into(), value.into());
        self
    }

    /// Builder-style insertion of many values.
    #[must_use]
    pub fn with_values<I, K, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<AbsoluteConfigKey>,
        V: Into<ConfigValue>,
    {
        let entries = Arc::make_mut(&mut self.entries);
        for (key, value) in values {
            entries.insert(key.into(), value.into());
        }
        self
    }

    /// Number of stored entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the provider holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ConfigProvider for InMemoryProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn value(
        &self,
        key: &AbsoluteConfigKey,
        ty: ConfigType,
    ) -> Result<LookupResult, ConfigError> {
        lookup_in(&self.entries, key, ty)
    }

    fn snapshot(&self) -> Arc<dyn ConfigSnapshot> {
        Arc::new(InMemorySnapshot {
            name: self.name.clone(),
            entries: self.entries.clone(),
        })
    }
}

// ============================================================================
// Mutable provider
// ============================================================================

struct ValueWatcher {
    ty: ConfigType,
    sink: LatestSink<Result<LookupResult, ConfigError>>,
}

#[derive(Default)]
struct MutableState {
    entries: HashMap<AbsoluteConfigKey, ConfigValue>,
    value_watchers: HashMap<AbsoluteConfigKey, HashMap<u64, ValueWatcher>>,
    snapshot_watchers: HashMap<u64, LatestSink<Arc<dyn ConfigSnapshot>>>,
    next_watcher_id: u64,
}

struct MutableInner {
    name: String,
    state: Mutex<MutableState>,
}

/// A mutable in-memory provider with live watch support.
///
/// `set_value` replaces a value and broadcasts the new lookup result to
/// every active watcher of that key, and a fresh snapshot to every snapshot
/// watcher. The state lock is held only to mutate and to copy watcher
/// handles out; emission happens outside it.
#[derive(Clone)]
pub struct MutableInMemoryProvider {
    inner: Arc<MutableInner>,
}

impl MutableInMemoryProvider {
    /// Creates an empty provider with the given name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(MutableInner {
                name: name.into(),
                state: Mutex::new(MutableState::default()),
            }),
        }
    }

    /// Builder-style insertion without watcher notification, for initial
    /// population.
    #[must_use]
    pub fn with_value(
        self,
        key: impl Into<AbsoluteConfigKey>,
        value: impl Into<ConfigValue>,
    ) -> Self {
        self.inner
            .state
            .lock()
            .entries
            .insert(key.into(), value.into());
        self
    }

    /// Replaces the value at `key` and notifies watchers.
    pub fn set_value(&self, key: impl Into<AbsoluteConfigKey>, value: impl Into<ConfigValue>) {
        let key = key.into();
        let value = value.into();

        let (watchers, snapshot_sinks, snapshot) = {
            let mut state = self.inner.state.lock();
            state.entries.insert(key.clone(), value);

            let watchers: Vec<(ConfigType, LatestSink<Result<LookupResult, ConfigError>>)> = state
                .value_watchers
                .get(&key)
                .map(|sinks| {
                    sinks
                        .values()
                        .map(|w| (w.ty, w.sink.clone()))
                        .collect()
                })
                .unwrap_or_default();

            let snapshot_sinks: Vec<LatestSink<Arc<dyn ConfigSnapshot>>> =
                state.snapshot_watchers.values().cloned().collect();

            let snapshot: Arc<dyn ConfigSnapshot> = Arc::new(InMemorySnapshot {
                name: self.inner.name.clone(),
                entries: Arc::new(state.entries.clone()),
            });

            (watchers, snapshot_sinks, snapshot)
        };

        for (ty, sink) in watchers {
            let lookup = {
                let state = self.inner.state.lock();
                lookup_in(&state.entries, &key, ty)
            };
            sink.send(lookup);
        }

        for sink in snapshot_sinks {
            sink.send(snapshot.clone());
        }
    }
}

impl ConfigProvider for MutableInMemoryProvider {
    fn name(&self) -> &str {
        &self.inner.name
    }

    fn value(
        &self,
        key: &AbsoluteConfigKey,
        ty: ConfigType,
    ) -> Result<LookupResult, ConfigError> {
        let state = self.inner.state.lock();
        lookup_in(&state.entries, key, ty)
    }

    fn snapshot(&self) -> Arc<dyn ConfigSnapshot> {
        let state = self.inner.state.lock();
        Arc::new(InMemorySnapshot {
            name: self.inner.name.clone(),
            entries: Arc::new(state.entries.clone()),
        })
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

            (id, lookup_in(&state.entries, key, ty))
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
        })
    }

    fn watch_snapshot(&self) -> SnapshotUpdates {
        let (sink, stream) = latest_only();

        let id = {
            let mut state = self.inner.state.lock();
            let id = state.next_watcher_id;
            state.next_watcher_id += 1;
            state.snapshot_watchers.insert(id, sink.clone());
            id
        };

        sink.send(self.snapshot());

        let inner = self.inner.clone();
        Updates::from_slot(stream, move || {
            inner.state.lock().snapshot_watchers.remove(&id);
        })
    }
}
