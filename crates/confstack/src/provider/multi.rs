//! Precedence resolution across an ordered provider stack.
//!
//! [`MultiProvider`] walks its children in order and stops at the first
//! provider that returns a value - or the first that returns an error. An
//! error is never masked by a lower-precedence success: configuration
//! integrity beats availability.
//!
//! Watching goes through the combine-latest fan-in: every child's watch
//! stream feeds one slot, and each merged element is mapped through the same
//! precedence rule.

use std::sync::Arc;

use super::{
    BoxFuture, ConfigProvider, ConfigSnapshot, ProviderOutcome, Resolution, ResolutionUpdates,
    SnapshotUpdates, ValueUpdates,
};
use crate::combine::combine_latest;
use crate::error::ConfigError;
use crate::key::AbsoluteConfigKey;
use crate::key::encoding::KeyEncoder;
use crate::value::{ConfigType, ConfigValue, LookupResult};

/// An ordered, non-empty stack of providers resolved by precedence.
#[derive(Clone)]
pub struct MultiProvider {
    providers: Arc<Vec<Arc<dyn ConfigProvider>>>,
}

impl std::fmt::Debug for MultiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MultiProvider")
            .field("providers", &self.providers.len())
            .finish()
    }
}

impl MultiProvider {
    /// Builds a stack from highest to lowest precedence.
    ///
    /// # Errors
    ///
    /// Rejects an empty provider list.
    pub fn new(providers: Vec<Arc<dyn ConfigProvider>>) -> Result<Self, ConfigError> {
        if providers.is_empty() {
            return Err(ConfigError::EmptyProviderList);
        }

        Ok(Self {
            providers: Arc::new(providers),
        })
    }

    /// The child providers, highest precedence first.
    #[must_use]
    pub fn providers(&self) -> &[Arc<dyn ConfigProvider>] {
        &self.providers
    }
}

/// Incremental state of one precedence walk.
///
/// Every resolve flavor (sync, fetch, watch, snapshot) funnels its child
/// outcomes through here so the rule lives in exactly one place: stop at
/// the first error (a failing provider must not be shadowed by a
/// lower-precedence hit), stop at the first value, otherwise keep walking.
struct PrecedenceWalk {
    provider_results: Vec<ProviderOutcome>,
    decided: Option<Result<Option<ConfigValue>, ConfigError>>,
}

impl PrecedenceWalk {
    fn new() -> Self {
        Self {
            provider_results: Vec::new(),
            decided: None,
        }
    }

    /// Records one child outcome; returns `true` once the walk is decided
    /// and later children must not be consulted.
    fn observe(&mut self, name: &str, result: Result<LookupResult, ConfigError>) -> bool {
        match result {
            Err(e) => {
                self.provider_results
                    .push(ProviderOutcome::new(name, Err(e.clone())));
                self.decided = Some(Err(e));
            }

            Ok(lookup) => {
                let value = lookup.value.clone();
                self.provider_results.push(ProviderOutcome::new(name, Ok(lookup)));
                if let Some(v) = value {
                    self.decided = Some(Ok(Some(v)));
                }
            }
        }

        self.decided.is_some()
    }

    fn into_resolution(self) -> Resolution {
        Resolution {
            provider_results: self.provider_results,
            value: self.decided.unwrap_or(Ok(None)),
        }
    }
}

/// Runs the precedence walk over ordered `(name, outcome)` pairs.
///
/// The iterator is consumed lazily, so a source feeding live lookups stops
/// querying children as soon as the walk decides.
fn resolve_ordered<'a, I>(outcomes: I) -> Resolution
where
    I: IntoIterator<Item = (&'a str, Result<LookupResult, ConfigError>)>,
{
    let mut walk = PrecedenceWalk::new();

    for (name, result) in outcomes {
        if walk.observe(name, result) {
            break;
        }
    }

    walk.into_resolution()
}

/// Derives the plain lookup view from a resolution.
fn lookup_from_resolution(
    resolution: Resolution,
    key: &AbsoluteConfigKey,
) -> Result<LookupResult, ConfigError> {
    match resolution.value {
        Err(e) => Err(e),

        Ok(value) => {
            let encoded_key = resolution
                .provider_results
                .last()
                .and_then(|outcome| outcome.result.as_ref().ok())
                .map_or_else(
                    || KeyEncoder::dot_separated().encode(key),
                    |lookup| lookup.encoded_key.clone(),
                );

            Ok(LookupResult { encoded_key, value })
        }
    }
}

impl ConfigProvider for MultiProvider {
    fn name(&self) -> &str {
        "multi"
    }

    fn value(
        &self,
        key: &AbsoluteConfigKey,
        ty: ConfigType,
    ) -> Result<LookupResult, ConfigError> {
        lookup_from_resolution(self.resolve(key, ty), key)
    }

    fn fetch_value<'a>(
        &'a self,
        key: &'a AbsoluteConfigKey,
        ty: ConfigType,
    ) -> BoxFuture<'a, Result<LookupResult, ConfigError>> {
        Box::pin(async move { lookup_from_resolution(self.fetch_resolve(key, ty).await, key) })
    }

    fn snapshot(&self) -> Arc<dyn ConfigSnapshot> {
        let children: Vec<Arc<dyn ConfigSnapshot>> =
            self.providers.iter().map(|p| p.snapshot()).collect();
        Arc::new(MultiSnapshot { children })
    }

    fn watch_value(&self, key: &AbsoluteConfigKey, ty: ConfigType) -> ValueUpdates {
        let owned = key.clone();
        self.watch_resolve(key, ty)
            .map(move |resolution| lookup_from_resolution(resolution, &owned))
    }

    fn watch_snapshot(&self) -> SnapshotUpdates {
        let inputs: Vec<SnapshotUpdates> =
            self.providers.iter().map(|p| p.watch_snapshot()).collect();

        combine_latest(inputs).map(|children| {
            let snapshot: Arc<dyn ConfigSnapshot> = Arc::new(MultiSnapshot { children });
            snapshot
        })
    }

    fn resolve(&self, key: &AbsoluteConfigKey, ty: ConfigType) -> Resolution {
        resolve_ordered(
            self.providers
                .iter()
                .map(|p| (p.name(), p.value(key, ty))),
        )
    }

    fn fetch_resolve<'a>(
        &'a self,
        key: &'a AbsoluteConfigKey,
        ty: ConfigType,
    ) -> BoxFuture<'a, Resolution> {
        Box::pin(async move {
            let mut walk = PrecedenceWalk::new();

            for provider in self.providers.iter() {
                if walk.observe(provider.name(), provider.fetch_value(key, ty).await) {
                    break;
                }
            }

            walk.into_resolution()
        })
    }

    fn watch_resolve(&self, key: &AbsoluteConfigKey, ty: ConfigType) -> ResolutionUpdates {
        let names: Vec<String> = self.providers.iter().map(|p| p.name().to_string()).collect();
        let inputs: Vec<ValueUpdates> = self
            .providers
            .iter()
            .map(|p| p.watch_value(key, ty))
            .collect();

        combine_latest(inputs).map(move |results| {
            resolve_ordered(names.iter().map(String::as_str).zip(results))
        })
    }
}

// ============================================================================
// MultiSnapshot
// ============================================================================

/// Point-in-time view over an ordered stack of child snapshots.
pub struct MultiSnapshot {
    children: Vec<Arc<dyn ConfigSnapshot>>,
}

impl MultiSnapshot {
    /// The child snapshots, highest precedence first.
    #[must_use]
    pub fn children(&self) -> &[Arc<dyn ConfigSnapshot>] {
        &self.children
    }

    /// Precedence walk with per-child attribution.
    pub(crate) fn resolve(&self, key: &AbsoluteConfigKey, ty: ConfigType) -> Resolution {
        resolve_ordered(
            self.children
                .iter()
                .map(|child| (child.name(), child.value(key, ty))),
        )
    }
}

impl ConfigSnapshot for MultiSnapshot {
    fn name(&self) -> &str {
        "multi"
    }

    fn value(
        &self,
        key: &AbsoluteConfigKey,
        ty: ConfigType,
    ) -> Result<LookupResult, ConfigError> {
        lookup_from_resolution(self.resolve(key, ty), key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::InMemoryProvider;
    use crate::value::ConfigContent;

    fn key(s: &str) -> AbsoluteConfigKey {
        AbsoluteConfigKey::from(s)
    }

    fn stack(providers: Vec<Arc<dyn ConfigProvider>>) -> MultiProvider {
        MultiProvider::new(providers).unwrap()
    }

    struct FailingProvider;

    impl ConfigProvider for FailingProvider {
        fn name(&self) -> &str {
            "failing"
        }

        fn value(
            &self,
            key: &AbsoluteConfigKey,
            _ty: ConfigType,
        ) -> Result<LookupResult, ConfigError> {
            Err(ConfigError::Io {
                path: std::path::PathBuf::from("/backing/store"),
                cause: format!("lookup of {key} failed"),
            })
        }

        fn snapshot(&self) -> Arc<dyn ConfigSnapshot> {
            unimplemented!("not needed in these tests")
        }
    }

    #[test]
    fn test_empty_stack_rejected() {
        let err = MultiProvider::new(Vec::new()).unwrap_err();
        assert!(matches!(err, ConfigError::EmptyProviderList));
    }

    #[test]
    fn test_first_hit_wins() {
        let multi = stack(vec![
            Arc::new(InMemoryProvider::new("A").with_value("foo", "a")),
            Arc::new(InMemoryProvider::new("B").with_value("foo", "b")),
        ]);

        let resolution = multi.resolve(&key("foo"), ConfigType::String);
        assert_eq!(resolution.provider_results.len(), 1);
        assert_eq!(resolution.provider_results[0].provider_name, "A");
        assert_eq!(
            resolution.value.unwrap().unwrap().content(),
            &ConfigContent::String("a".into())
        );
    }

    #[test]
    fn test_fallthrough_on_miss() {
        let multi = stack(vec![
            Arc::new(InMemoryProvider::new("A").with_value("foo", "a")),
            Arc::new(InMemoryProvider::new("B").with_value("bar", "B")),
        ]);

        let resolution = multi.resolve(&key("bar"), ConfigType::String);
        assert_eq!(resolution.provider_results.len(), 2);
        assert!(resolution.provider_results[0].result.as_ref().unwrap().value.is_none());
        assert_eq!(
            resolution.value.unwrap().unwrap().content(),
            &ConfigContent::String("B".into())
        );
    }

    #[test]
    fn test_all_miss_resolves_to_none() {
        let multi = stack(vec![
            Arc::new(InMemoryProvider::new("A")),
            Arc::new(InMemoryProvider::new("B")),
        ]);

        let resolution = multi.resolve(&key("baz"), ConfigType::String);
        assert_eq!(resolution.provider_results.len(), 2);
        assert!(resolution.value.unwrap().is_none());
    }

    #[test]
    fn test_error_short_circuits() {
        let multi = stack(vec![
            Arc::new(FailingProvider),
            Arc::new(InMemoryProvider::new("B").with_value("x", "b")),
        ]);

        let resolution = multi.resolve(&key("x"), ConfigType::String);
        assert_eq!(resolution.provider_results.len(), 1);
        assert!(resolution.value.is_err());
    }

    #[test]
    fn test_error_not_masked_even_after_misses() {
        let multi = stack(vec![
            Arc::new(InMemoryProvider::new("A")),
            Arc::new(FailingProvider),
            Arc::new(InMemoryProvider::new("C").with_value("x", "c")),
        ]);

        let resolution = multi.resolve(&key("x"), ConfigType::String);
        assert_eq!(resolution.provider_results.len(), 2);
        assert!(resolution.value.is_err());
    }

    #[test]
    fn test_snapshot_follows_precedence() {
        let multi = stack(vec![
            Arc::new(InMemoryProvider::new("A").with_value("foo", "a")),
            Arc::new(InMemoryProvider::new("B").with_value("foo", "b").with_value("bar", "B")),
        ]);

        let snapshot = multi.snapshot();
        let foo = snapshot.value(&key("foo"), ConfigType::String).unwrap();
        assert_eq!(foo.value.unwrap().content().as_str().unwrap(), "a");

        let bar = snapshot.value(&key("bar"), ConfigType::String).unwrap();
        assert_eq!(bar.value.unwrap().content().as_str().unwrap(), "B");
    }

    #[tokio::test]
    async fn test_watch_value_first_element() {
        let multi = stack(vec![
            Arc::new(InMemoryProvider::new("A").with_value("foo", "a")),
            Arc::new(InMemoryProvider::new("B").with_value("foo", "b")),
        ]);

        let mut updates = multi.watch_value(&key("foo"), ConfigType::String);
        let first = updates.next().await.unwrap().unwrap();
        assert_eq!(first.value.unwrap().content().as_str().unwrap(), "a");
    }

    #[tokio::test]
    async fn test_watch_resolve_reacts_to_mutable_child() {
        use crate::provider::MutableInMemoryProvider;

        let mutable = MutableInMemoryProvider::new("live").with_value("foo", "one");
        let multi = stack(vec![
            Arc::new(mutable.clone()),
            Arc::new(InMemoryProvider::new("static").with_value("foo", "fallback")),
        ]);

        let mut updates = multi.watch_resolve(&key("foo"), ConfigType::String);

        let first = updates.next().await.unwrap();
        assert_eq!(
            first.value.unwrap().unwrap().content().as_str().unwrap(),
            "one"
        );

        mutable.set_value("foo", "two");
        let second = updates.next().await.unwrap();
        assert_eq!(
            second.value.unwrap().unwrap().content().as_str().unwrap(),
            "two"
        );
    }
}
