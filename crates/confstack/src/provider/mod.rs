//! Provider abstraction for configuration sources.
//!
//! This module defines the [`ConfigProvider`] trait implemented by every
//! configuration source - the built-in tables, environment variables, CLI
//! arguments, directory mounts, and parsed files, as well as custom sources
//! an application brings along.
//!
//! # Access modes
//!
//! A provider supports three ways of reading a key:
//!
//! - [`value`](ConfigProvider::value) - synchronous snapshot read; cheap,
//!   non-blocking, idempotent while the provider state is unchanged;
//! - [`fetch_value`](ConfigProvider::fetch_value) - async read that may
//!   refresh from a backing source first;
//! - [`watch_value`](ConfigProvider::watch_value) - a stream whose first
//!   element is the current value, followed by every change.
//!
//! [`snapshot`](ConfigProvider::snapshot) exposes an immutable point-in-time
//! view, and [`watch_snapshot`](ConfigProvider::watch_snapshot) streams such
//! views. Static providers use the default watch implementations, which
//! yield one element and then idle until the subscriber goes away.
//!
//! # Custom Providers
//!
//! ```rust,ignore
//! use confstack::provider::{ConfigProvider, ConfigSnapshot};
//! use confstack::{AbsoluteConfigKey, ConfigType, ConfigError, LookupResult};
//!
//! struct VaultProvider { /* ... */ }
//!
//! impl ConfigProvider for VaultProvider {
//!     fn name(&self) -> &str { "vault" }
//!
//!     fn value(&self, key: &AbsoluteConfigKey, ty: ConfigType)
//!         -> Result<LookupResult, ConfigError>
//!     {
//!         // Look up in the locally cached secrets...
//!         # unimplemented!()
//!     }
//!
//!     fn snapshot(&self) -> std::sync::Arc<dyn ConfigSnapshot> {
//!         # unimplemented!()
//!     }
//! }
//! ```

mod cli;
mod dir;
mod env;
mod file;
mod in_memory;
mod multi;
mod reloading;
mod wrappers;

pub use cli::CliArgsProvider;
pub use dir::{DirectoryFilesProvider, DirectoryOptions};
pub use env::EnvVarsProvider;
pub use file::{FileBackedProvider, ParsedSnapshot};
pub use in_memory::{InMemoryProvider, MutableInMemoryProvider};
pub use multi::{MultiProvider, MultiSnapshot};
pub use reloading::{ReloadingFileProvider, ReloadingOptions};
pub use wrappers::{KeyMappingProvider, PrefixProvider, SecretMarkingProvider};

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::ConfigError;
use crate::key::AbsoluteConfigKey;
use crate::stream::Updates;
use crate::value::{ConfigType, ConfigValue, LookupResult};

/// Boxed future type for async provider methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Stream of lookup results delivered by a value watch.
pub type ValueUpdates = Updates<Result<LookupResult, ConfigError>>;

/// Stream of snapshots delivered by a snapshot watch.
pub type SnapshotUpdates = Updates<Arc<dyn ConfigSnapshot>>;

/// Stream of resolutions delivered by a resolved value watch.
pub type ResolutionUpdates = Updates<Resolution>;

// ============================================================================
// Resolution
// ============================================================================

/// One provider's contribution to a resolved read.
#[derive(Clone, Debug)]
pub struct ProviderOutcome {
    /// The provider's [`name`](ConfigProvider::name).
    pub provider_name: String,

    /// What the provider returned.
    pub result: Result<LookupResult, ConfigError>,
}

impl ProviderOutcome {
    /// Creates an outcome.
    #[must_use]
    pub fn new(provider_name: impl Into<String>, result: Result<LookupResult, ConfigError>) -> Self {
        Self {
            provider_name: provider_name.into(),
            result,
        }
    }
}

/// A resolved read: the per-provider outcomes plus the final value.
///
/// For a single provider this is a one-entry wrapper around its lookup; a
/// [`MultiProvider`] fills it with the precedence walk instead.
#[derive(Clone, Debug)]
pub struct Resolution {
    /// Outcomes of the providers consulted, in consultation order.
    pub provider_results: Vec<ProviderOutcome>,

    /// The winning value, absence, or the error that stopped resolution.
    pub value: Result<Option<ConfigValue>, ConfigError>,
}

impl Resolution {
    /// Wraps a single provider's lookup result.
    #[must_use]
    pub fn single(provider_name: &str, result: Result<LookupResult, ConfigError>) -> Self {
        let value = match &result {
            Ok(lookup) => Ok(lookup.value.clone()),
            Err(e) => Err(e.clone()),
        };

        Self {
            provider_results: vec![ProviderOutcome::new(provider_name, result)],
            value,
        }
    }
}

// ============================================================================
// Snapshot trait
// ============================================================================

/// An immutable point-in-time view of a provider.
///
/// Repeated lookups with equal inputs on one snapshot return equal outputs
/// for the snapshot's whole lifetime.
pub trait ConfigSnapshot: Send + Sync {
    /// The owning provider's name.
    fn name(&self) -> &str;

    /// Looks up a key in this snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored value cannot satisfy the requested
    /// type.
    fn value(
        &self,
        key: &AbsoluteConfigKey,
        ty: ConfigType,
    ) -> Result<LookupResult, ConfigError>;
}

// ============================================================================
// Provider trait
// ============================================================================

/// Trait for configuration sources.
///
/// Providers must be safely shareable across tasks; synchronous reads must
/// not block.
pub trait ConfigProvider: Send + Sync {
    /// The provider's name, used in error messages and access reports.
    fn name(&self) -> &str;

    /// Synchronously looks up the current value for a key.
    ///
    /// # Errors
    ///
    /// Returns an error when the provider holds a value that cannot satisfy
    /// the requested type, or when its backing state is broken.
    fn value(&self, key: &AbsoluteConfigKey, ty: ConfigType)
    -> Result<LookupResult, ConfigError>;

    /// Looks up a key, refreshing from the backing source first if the
    /// provider has one. The default delegates to [`value`](Self::value).
    fn fetch_value<'a>(
        &'a self,
        key: &'a AbsoluteConfigKey,
        ty: ConfigType,
    ) -> BoxFuture<'a, Result<LookupResult, ConfigError>> {
        Box::pin(async move { self.value(key, ty) })
    }

    /// An immutable point-in-time view of this provider.
    fn snapshot(&self) -> Arc<dyn ConfigSnapshot>;

    /// Watches a key. The first element equals [`value`](Self::value) at
    /// subscription time; later elements are changes. The default (for
    /// static providers) yields once and then idles until dropped.
    fn watch_value(&self, key: &AbsoluteConfigKey, ty: ConfigType) -> ValueUpdates {
        Updates::once_then_idle(self.value(key, ty))
    }

    /// Watches snapshots. First element is the current snapshot.
    fn watch_snapshot(&self) -> SnapshotUpdates {
        Updates::once_then_idle(self.snapshot())
    }

    /// Resolves a read with per-provider attribution.
    ///
    /// Single providers use this default; [`MultiProvider`] overrides it
    /// with the precedence walk.
    fn resolve(&self, key: &AbsoluteConfigKey, ty: ConfigType) -> Resolution {
        Resolution::single(self.name(), self.value(key, ty))
    }

    /// Async variant of [`resolve`](Self::resolve).
    fn fetch_resolve<'a>(
        &'a self,
        key: &'a AbsoluteConfigKey,
        ty: ConfigType,
    ) -> BoxFuture<'a, Resolution> {
        Box::pin(async move { Resolution::single(self.name(), self.fetch_value(key, ty).await) })
    }

    /// Watching variant of [`resolve`](Self::resolve): one resolution per
    /// delivered update.
    fn watch_resolve(&self, key: &AbsoluteConfigKey, ty: ConfigType) -> ResolutionUpdates {
        let name = self.name().to_string();
        self.watch_value(key, ty)
            .map(move |result| Resolution::single(&name, result))
    }
}
