//! Operator providers: key-prefixing, key-mapping, secret-marking.
//!
//! Each wrapper is a newtype over an upstream provider implementing the same
//! trait - no hierarchy, just delegation with one transformation applied.

use std::sync::Arc;

use super::{
    BoxFuture, ConfigProvider, ConfigSnapshot, Resolution, ResolutionUpdates, SnapshotUpdates,
    ValueUpdates,
};
use crate::error::ConfigError;
use crate::key::{AbsoluteConfigKey, ConfigKey};
use crate::value::{ConfigType, LookupResult};

type KeyMapFn = Arc<dyn Fn(&AbsoluteConfigKey) -> AbsoluteConfigKey + Send + Sync>;
type SecretPredicate = Arc<dyn Fn(&AbsoluteConfigKey) -> bool + Send + Sync>;

// ============================================================================
// Prefix
// ============================================================================

/// Prepends a fixed relative key to every lookup before dispatching
/// upstream.
///
/// Wrapping a provider whose table holds `internal.db.host` with prefix
/// `internal` lets callers read it as `db.host`.
#[derive(Clone)]
pub struct PrefixProvider {
    upstream: Arc<dyn ConfigProvider>,
    prefix: ConfigKey,
}

impl PrefixProvider {
    /// Wraps `upstream`, prefixing every key with `prefix`.
    pub fn new(upstream: Arc<dyn ConfigProvider>, prefix: impl Into<ConfigKey>) -> Self {
        Self {
            upstream,
            prefix: prefix.into(),
        }
    }

    fn rewrite(&self, key: &AbsoluteConfigKey) -> AbsoluteConfigKey {
        key.prepend(&self.prefix)
    }
}

struct PrefixSnapshot {
    upstream: Arc<dyn ConfigSnapshot>,
    prefix: ConfigKey,
}

impl ConfigSnapshot for PrefixSnapshot {
    fn name(&self) -> &str {
        self.upstream.name()
    }

    fn value(
        &self,
        key: &AbsoluteConfigKey,
        ty: ConfigType,
    ) -> Result<LookupResult, ConfigError> {
        self.upstream.value(&key.prepend(&self.prefix), ty)
    }
}

impl ConfigProvider for PrefixProvider {
    fn name(&self) -> &str {
        self.upstream.name()
    }

    fn value(
        &self,
        key: &AbsoluteConfigKey,
        ty: ConfigType,
    ) -> Result<LookupResult, ConfigError> {
        self.upstream.value(&self.rewrite(key), ty)
    }

    fn fetch_value<'a>(
        &'a self,
        key: &'a AbsoluteConfigKey,
        ty: ConfigType,
    ) -> BoxFuture<'a, Result<LookupResult, ConfigError>> {
        let rewritten = self.rewrite(key);
        Box::pin(async move { self.upstream.fetch_value(&rewritten, ty).await })
    }

    fn snapshot(&self) -> Arc<dyn ConfigSnapshot> {
        Arc::new(PrefixSnapshot {
            upstream: self.upstream.snapshot(),
            prefix: self.prefix.clone(),
        })
    }

    fn watch_value(&self, key: &AbsoluteConfigKey, ty: ConfigType) -> ValueUpdates {
        self.upstream.watch_value(&self.rewrite(key), ty)
    }

    fn watch_snapshot(&self) -> SnapshotUpdates {
        let prefix = self.prefix.clone();
        self.upstream.watch_snapshot().map(move |upstream| {
            let snapshot: Arc<dyn ConfigSnapshot> = Arc::new(PrefixSnapshot {
                upstream,
                prefix: prefix.clone(),
            });
            snapshot
        })
    }

    fn resolve(&self, key: &AbsoluteConfigKey, ty: ConfigType) -> Resolution {
        self.upstream.resolve(&self.rewrite(key), ty)
    }

    fn fetch_resolve<'a>(
        &'a self,
        key: &'a AbsoluteConfigKey,
        ty: ConfigType,
    ) -> BoxFuture<'a, Resolution> {
        let rewritten = self.rewrite(key);
        Box::pin(async move { self.upstream.fetch_resolve(&rewritten, ty).await })
    }

    fn watch_resolve(&self, key: &AbsoluteConfigKey, ty: ConfigType) -> ResolutionUpdates {
        self.upstream.watch_resolve(&self.rewrite(key), ty)
    }
}

// ============================================================================
// Key mapping
// ============================================================================

/// Rewrites every key with a pure function before dispatching upstream.
#[derive(Clone)]
pub struct KeyMappingProvider {
    upstream: Arc<dyn ConfigProvider>,
    map: KeyMapFn,
}

impl KeyMappingProvider {
    /// Wraps `upstream` with a key transformation.
    pub fn new(
        upstream: Arc<dyn ConfigProvider>,
        map: impl Fn(&AbsoluteConfigKey) -> AbsoluteConfigKey + Send + Sync + 'static,
    ) -> Self {
        Self {
            upstream,
            map: Arc::new(map),
        }
    }
}

struct KeyMappingSnapshot {
    upstream: Arc<dyn ConfigSnapshot>,
    map: KeyMapFn,
}

impl ConfigSnapshot for KeyMappingSnapshot {
    fn name(&self) -> &str {
        self.upstream.name()
    }

    fn value(
        &self,
        key: &AbsoluteConfigKey,
        ty: ConfigType,
    ) -> Result<LookupResult, ConfigError> {
        self.upstream.value(&(self.map)(key), ty)
    }
}

impl ConfigProvider for KeyMappingProvider {
    fn name(&self) -> &str {
        self.upstream.name()
    }

    fn value(
        &self,
        key: &AbsoluteConfigKey,
        ty: ConfigType,
    ) -> Result<LookupResult, ConfigError> {
        self.upstream.value(&(self.map)(key), ty)
    }

    fn fetch_value<'a>(
        &'a self,
        key: &'a AbsoluteConfigKey,
        ty: ConfigType,
    ) -> BoxFuture<'a, Result<LookupResult, ConfigError>> {
        let mapped = (self.map)(key);
        Box::pin(async move { self.upstream.fetch_value(&mapped, ty).await })
    }

    fn snapshot(&self) -> Arc<dyn ConfigSnapshot> {
        Arc::new(KeyMappingSnapshot {
            upstream: self.upstream.snapshot(),
            map: self.map.clone(),
        })
    }

    fn watch_value(&self, key: &AbsoluteConfigKey, ty: ConfigType) -> ValueUpdates {
        self.upstream.watch_value(&(self.map)(key), ty)
    }

    fn watch_snapshot(&self) -> SnapshotUpdates {
        let map = self.map.clone();
        self.upstream.watch_snapshot().map(move |upstream| {
            let snapshot: Arc<dyn ConfigSnapshot> = Arc::new(KeyMappingSnapshot {
                upstream,
                map: map.clone(),
            });
            snapshot
        })
    }

    fn resolve(&self, key: &AbsoluteConfigKey, ty: ConfigType) -> Resolution {
        self.upstream.resolve(&(self.map)(key), ty)
    }

    fn fetch_resolve<'a>(
        &'a self,
        key: &'a AbsoluteConfigKey,
        ty: ConfigType,
    ) -> BoxFuture<'a, Resolution> {
        let mapped = (self.map)(key);
        Box::pin(async move { self.upstream.fetch_resolve(&mapped, ty).await })
    }

    fn watch_resolve(&self, key: &AbsoluteConfigKey, ty: ConfigType) -> ResolutionUpdates {
        self.upstream.watch_resolve(&(self.map)(key), ty)
    }
}

// ============================================================================
// Secret marking
// ============================================================================

/// Tags values secret when a key predicate matches.
///
/// Already-secret values stay secret; the flag is true-sticky.
#[derive(Clone)]
pub struct SecretMarkingProvider {
    upstream: Arc<dyn ConfigProvider>,
    predicate: SecretPredicate,
}

impl SecretMarkingProvider {
    /// Wraps `upstream` with a secret predicate over absolute keys.
    pub fn new(
        upstream: Arc<dyn ConfigProvider>,
        predicate: impl Fn(&AbsoluteConfigKey) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            upstream,
            predicate: Arc::new(predicate),
        }
    }
}

fn mark_lookup(lookup: LookupResult) -> LookupResult {
    LookupResult {
        encoded_key: lookup.encoded_key,
        value: lookup.value.map(|v| v.marked_secret()),
    }
}

fn mark_resolution(mut resolution: Resolution) -> Resolution {
    for outcome in &mut resolution.provider_results {
        if let Ok(lookup) = &mut outcome.result {
            lookup.value = lookup.value.take().map(|v| v.marked_secret());
        }
    }
    resolution.value = resolution.value.map(|v| v.map(|v| v.marked_secret()));
    resolution
}

struct SecretMarkingSnapshot {
    upstream: Arc<dyn ConfigSnapshot>,
    predicate: SecretPredicate,
}

impl ConfigSnapshot for SecretMarkingSnapshot {
    fn name(&self) -> &str {
        self.upstream.name()
    }

    fn value(
        &self,
        key: &AbsoluteConfigKey,
        ty: ConfigType,
    ) -> Result<LookupResult, ConfigError> {
        let lookup = self.upstream.value(key, ty)?;
        Ok(if (self.predicate)(key) {
            mark_lookup(lookup)
        } else {
            lookup
        })
    }
}

impl ConfigProvider for SecretMarkingProvider {
    fn name(&self) -> &str {
        self.upstream.name()
    }

    fn value(
        &self,
        key: &AbsoluteConfigKey,
        ty: ConfigType,
    ) -> Result<LookupResult, ConfigError> {
        let lookup = self.upstream.value(key, ty)?;
        Ok(if (self.predicate)(key) {
            mark_lookup(lookup)
        } else {
            lookup
        })
    }

    fn fetch_value<'a>(
        &'a self,
        key: &'a AbsoluteConfigKey,
        ty: ConfigType,
    ) -> BoxFuture<'a, Result<LookupResult, ConfigError>> {
        Box::pin(async move {
            let lookup = self.upstream.fetch_value(key, ty).await?;
            Ok(if (self.predicate)(key) {
                mark_lookup(lookup)
            } else {
                lookup
            })
        })
    }

    fn snapshot(&self) -> Arc<dyn ConfigSnapshot> {
        Arc::new(SecretMarkingSnapshot {
            upstream: self.upstream.snapshot(),
            predicate: self.predicate.clone(),
        })
    }

    fn watch_value(&self, key: &AbsoluteConfigKey, ty: ConfigType) -> ValueUpdates {
        let is_secret = (self.predicate)(key);
        self.upstream.watch_value(key, ty).map(move |result| {
            if is_secret {
                result.map(mark_lookup)
            } else {
                result
            }
        })
    }

    fn watch_snapshot(&self) -> SnapshotUpdates {
        let predicate = self.predicate.clone();
        self.upstream.watch_snapshot().map(move |upstream| {
            let snapshot: Arc<dyn ConfigSnapshot> = Arc::new(SecretMarkingSnapshot {
                upstream,
                predicate: predicate.clone(),
            });
            snapshot
        })
    }

    fn resolve(&self, key: &AbsoluteConfigKey, ty: ConfigType) -> Resolution {
        let resolution = self.upstream.resolve(key, ty);
        if (self.predicate)(key) {
            mark_resolution(resolution)
        } else {
            resolution
        }
    }

    fn fetch_resolve<'a>(
        &'a self,
        key: &'a AbsoluteConfigKey,
        ty: ConfigType,
    ) -> BoxFuture<'a, Resolution> {
        Box::pin(async move {
            let resolution = self.upstream.fetch_resolve(key, ty).await;
            if (self.predicate)(key) {
                mark_resolution(resolution)
            } else {
                resolution
            }
        })
    }

    fn watch_resolve(&self, key: &AbsoluteConfigKey, ty: ConfigType) -> ResolutionUpdates {
        let is_secret = (self.predicate)(key);
        self.upstream.watch_resolve(key, ty).map(move |resolution| {
            if is_secret {
                mark_resolution(resolution)
            } else {
                resolution
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::InMemoryProvider;

    fn key(s: &str) -> AbsoluteConfigKey {
        AbsoluteConfigKey::from(s)
    }

    fn upstream() -> Arc<dyn ConfigProvider> {
        Arc::new(
            InMemoryProvider::new("mem")
                .with_value("internal.db.host", "h")
                .with_value("password", "p")
                .with_value("host", "example.org"),
        )
    }

    #[test]
    fn test_prefix_rewrites_lookups() {
        let provider = PrefixProvider::new(upstream(), "internal");

        let result = provider
            .value(&key("db.host"), ConfigType::String)
            .unwrap();
        assert_eq!(result.encoded_key, "internal.db.host");
        assert_eq!(result.value.unwrap().content().as_str().unwrap(), "h");
    }

    #[test]
    fn test_prefix_snapshot_rewrites() {
        let provider = PrefixProvider::new(upstream(), "internal");
        let snapshot = provider.snapshot();

        let result = snapshot.value(&key("db.host"), ConfigType::String).unwrap();
        assert!(result.value.is_some());
    }

    #[test]
    fn test_key_mapping_applies_function() {
        let provider = KeyMappingProvider::new(upstream(), |key| {
            key.prepend(&ConfigKey::from("internal"))
        });

        let result = provider
            .value(&key("db.host"), ConfigType::String)
            .unwrap();
        assert_eq!(result.value.unwrap().content().as_str().unwrap(), "h");
    }

    #[test]
    fn test_secret_marking_by_predicate() {
        let provider = SecretMarkingProvider::new(upstream(), |key| {
            key.components().iter().any(|c| c.contains("password"))
        });

        let secret = provider
            .value(&key("password"), ConfigType::String)
            .unwrap();
        assert!(secret.value.unwrap().is_secret());

        let open = provider.value(&key("host"), ConfigType::String).unwrap();
        assert!(!open.value.unwrap().is_secret());
    }

    #[test]
    fn test_secret_marking_is_sticky() {
        use crate::value::ConfigValue;

        let upstream: Arc<dyn ConfigProvider> = Arc::new(
            InMemoryProvider::new("mem")
                .with_value("token", ConfigValue::from("t").marked_secret()),
        );
        // Predicate says no, but the upstream value is already secret.
        let provider = SecretMarkingProvider::new(upstream, |_| false);

        let result = provider.value(&key("token"), ConfigType::String).unwrap();
        assert!(result.value.unwrap().is_secret());
    }

    #[test]
    fn test_secret_marking_resolution() {
        let provider = SecretMarkingProvider::new(upstream(), |key| {
            key.components().iter().any(|c| c.contains("password"))
        });

        let resolution = provider.resolve(&key("password"), ConfigType::String);
        assert!(resolution.value.unwrap().unwrap().is_secret());
        for outcome in &resolution.provider_results {
            if let Ok(lookup) = &outcome.result {
                assert!(lookup.value.as_ref().is_none_or(|v| v.is_secret()));
            }
        }
    }
}
