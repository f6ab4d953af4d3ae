//! The typed configuration reader.
//!
//! [`ConfigReader`] is the application-facing façade over a provider stack:
//! it scopes relative keys under an optional prefix, drives the provider
//! chain in any of the three access modes, converts resolved content to the
//! caller's Rust type, applies default/required policy, and synthesizes one
//! access event per logical read.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use confstack::{ConfigReader, provider::InMemoryProvider};
//!
//! let reader = ConfigReader::builder()
//!     .with_provider(InMemoryProvider::new("defaults").with_value("db.port", 5432i64))
//!     .build()
//!     .unwrap();
//!
//! let port: i64 = reader.get_or("db.port", 5432);
//! let host: Option<String> = reader.get("db.host");
//! assert_eq!(port, 5432);
//! assert_eq!(host, None);
//!
//! // Scoped readers prefix every key they are asked for.
//! let db = reader.scoped("db");
//! assert_eq!(db.get::<i64>("port"), Some(5432));
//! ```
//!
//! # Non-throwing vs throwing reads
//!
//! The `get*` family never fails: provider errors and conversion failures
//! collapse to `None` (or the supplied default), while the emitted access
//! event preserves the full story for observability. The `*_required` and
//! `fetch*` families surface errors to the caller instead.

use std::future::Future;
use std::panic::Location;
use std::str::FromStr;
use std::sync::Arc;
use std::time::SystemTime;

use crate::access::{AccessEvent, AccessEventMetadata, AccessKind, AccessReporter};
use crate::error::ConfigError;
use crate::key::encoding::KeyDecoder;
use crate::key::{AbsoluteConfigKey, ConfigKey, KeyContext};
use crate::provider::{ConfigProvider, ConfigSnapshot, MultiProvider, Resolution};
use crate::stream::Updates;
use crate::value::{ConfigContent, ConfigType, ConfigValue};

// ============================================================================
// Conversion traits
// ============================================================================

/// Rust types that map onto a [`ConfigType`].
///
/// Implemented for the ten primitive shapes. Custom types usually go
/// through [`FromConfigString`] / [`FromConfigInt`] and the `*_as`
/// accessors instead of implementing this directly.
pub trait ConfigConvertible: Sized + Send + 'static {
    /// The provider-level type requested for this Rust type.
    const TYPE: ConfigType;

    /// Converts resolved content into this type.
    ///
    /// # Errors
    ///
    /// Returns a type-mismatch error when the content tag differs.
    fn from_content(content: &ConfigContent) -> Result<Self, ConfigError>;

    /// Renders this value back into content (used to report defaults).
    fn into_content(self) -> ConfigContent;
}

macro_rules! impl_config_convertible {
    ($ty:ty, $variant:ident, $accessor:ident, owned) => {
        impl ConfigConvertible for $ty {
            const TYPE: ConfigType = ConfigType::$variant;

            fn from_content(content: &ConfigContent) -> Result<Self, ConfigError> {
                content.$accessor().map(ToOwned::to_owned)
            }

            fn into_content(self) -> ConfigContent {
                ConfigContent::$variant(self)
            }
        }
    };
    ($ty:ty, $variant:ident, $accessor:ident, copied) => {
        impl ConfigConvertible for $ty {
            const TYPE: ConfigType = ConfigType::$variant;

            fn from_content(content: &ConfigContent) -> Result<Self, ConfigError> {
                content.$accessor().copied()
            }

            fn into_content(self) -> ConfigContent {
                ConfigContent::$variant(self)
            }
        }
    };
}

impl_config_convertible!(String, String, as_str, owned);
impl_config_convertible!(i64, Int, as_int, copied);
impl_config_convertible!(f64, Double, as_double, copied);
impl_config_convertible!(bool, Bool, as_bool, copied);
impl_config_convertible!(Vec<u8>, Bytes, as_bytes, owned);
impl_config_convertible!(Vec<String>, StringArray, as_string_array, owned);
impl_config_convertible!(Vec<i64>, IntArray, as_int_array, owned);
impl_config_convertible!(Vec<f64>, DoubleArray, as_double_array, owned);
impl_config_convertible!(Vec<bool>, BoolArray, as_bool_array, owned);
impl_config_convertible!(Vec<Vec<u8>>, ByteChunkArray, as_byte_chunk_array, owned);

/// Types constructible from a configuration string.
///
/// Blanket-implemented for everything with [`FromStr`], so enums deriving
/// it (or hand-implementing it) work with the `*_as` accessors directly.
pub trait FromConfigString: Sized {
    /// Parses the value; `None` rejects it.
    fn from_config_string(s: &str) -> Option<Self>;
}

impl<T: FromStr> FromConfigString for T {
    fn from_config_string(s: &str) -> Option<Self> {
        s.parse().ok()
    }
}

/// Types constructible from a configuration integer.
pub trait FromConfigInt: Sized {
    /// Converts the value; `None` rejects it.
    fn from_config_int(value: i64) -> Option<Self>;
}

impl<T: TryFrom<i64>> FromConfigInt for T {
    fn from_config_int(value: i64) -> Option<Self> {
        Self::try_from(value).ok()
    }
}

// ============================================================================
// Key specification
// ============================================================================

/// A key argument to a reader operation, with an optional secret request.
///
/// Built implicitly from string literals and [`ConfigKey`] values; wrap
/// with [`secret`] to force the resolved value (and everything reported
/// about it) to be treated as secret.
pub struct KeySpec {
    input: KeyInput,
    secret: bool,
}

enum KeyInput {
    Literal(String),
    Key(ConfigKey),
}

impl From<&str> for KeySpec {
    fn from(s: &str) -> Self {
        Self {
            input: KeyInput::Literal(s.to_string()),
            secret: false,
        }
    }
}

impl From<String> for KeySpec {
    fn from(s: String) -> Self {
        Self {
            input: KeyInput::Literal(s),
            secret: false,
        }
    }
}

impl From<ConfigKey> for KeySpec {
    fn from(key: ConfigKey) -> Self {
        Self {
            input: KeyInput::Key(key),
            secret: false,
        }
    }
}

/// Marks a read as secret: every provider result and the returned value are
/// tagged secret before conversion and reporting.
pub fn secret(key: impl Into<KeySpec>) -> KeySpec {
    let mut spec = key.into();
    spec.secret = true;
    spec
}

// ============================================================================
// Shared resolution plumbing
// ============================================================================

fn mark_resolution_secret(resolution: &mut Resolution) {
    for outcome in &mut resolution.provider_results {
        if let Ok(lookup) = &mut outcome.result {
            lookup.value = lookup.value.take().map(ConfigValue::marked_secret);
        }
    }
    resolution.value = resolution
        .value
        .clone()
        .map(|v| v.map(ConfigValue::marked_secret));
}

struct Resolved<T> {
    resolution: Resolution,
    raw: Option<ConfigValue>,
    provider_error: Option<ConfigError>,
    typed: Option<T>,
    conversion_error: Option<ConfigError>,
}

fn resolve_typed<T>(
    mut resolution: Resolution,
    secret: bool,
    convert: impl Fn(&ConfigContent) -> Result<T, ConfigError>,
) -> Resolved<T> {
    if secret {
        mark_resolution_secret(&mut resolution);
    }

    let (raw, provider_error) = match &resolution.value {
        Ok(value) => (value.clone(), None),
        Err(e) => (None, Some(e.clone())),
    };

    let (typed, conversion_error) = match &raw {
        Some(value) => match convert(value.content()) {
            Ok(t) => (Some(t), None),
            Err(e) => (None, Some(e)),
        },
        None => (None, None),
    };

    Resolved {
        resolution,
        raw,
        provider_error,
        typed,
        conversion_error,
    }
}

struct EventContext {
    reporter: Option<Arc<dyn AccessReporter>>,
    kind: AccessKind,
    key: AbsoluteConfigKey,
    value_type: ConfigType,
    location: &'static Location<'static>,
}

impl EventContext {
    fn emit(
        &self,
        resolution: Resolution,
        conversion_error: Option<ConfigError>,
        result: Result<Option<ConfigValue>, ConfigError>,
    ) {
        let Some(reporter) = &self.reporter else {
            return;
        };

        let event = AccessEvent {
            metadata: AccessEventMetadata {
                kind: self.kind,
                key: self.key.clone(),
                value_type: self.value_type,
                source_location: self.location,
                timestamp: SystemTime::now(),
            },
            provider_results: resolution.provider_results,
            conversion_error,
            result,
        };

        reporter.report(&event);
    }
}

/// Renders a caller-supplied default for reporting purposes.
fn default_as_value<T: ConfigConvertible + Clone>(default: &T, secret: bool) -> ConfigValue {
    let value = ConfigValue::new(default.clone().into_content());
    if secret { value.marked_secret() } else { value }
}

// Policy finishers. Each consumes a typed resolution, emits the event that
// matches what the caller will observe, and produces the caller's value.

fn finish_optional<T>(ctx: &EventContext, resolved: Resolved<T>) -> Option<T> {
    let event_result = match &resolved.provider_error {
        Some(e) => Err(e.clone()),
        None if resolved.typed.is_some() => Ok(resolved.raw.clone()),
        None => Ok(None),
    };

    ctx.emit(resolved.resolution, resolved.conversion_error, event_result);
    resolved.typed
}

fn finish_default<T: ConfigConvertible + Clone>(
    ctx: &EventContext,
    resolved: Resolved<T>,
    secret: bool,
    default: T,
) -> T {
    let event_result = match &resolved.provider_error {
        Some(e) => Err(e.clone()),
        None if resolved.typed.is_some() => Ok(resolved.raw.clone()),
        None => Ok(Some(default_as_value(&default, secret))),
    };

    ctx.emit(resolved.resolution, resolved.conversion_error, event_result);
    resolved.typed.unwrap_or(default)
}

fn finish_required<T>(ctx: &EventContext, resolved: Resolved<T>) -> Result<T, ConfigError> {
    let Resolved {
        resolution,
        raw,
        provider_error,
        typed,
        conversion_error,
    } = resolved;

    let outcome = if let Some(e) = provider_error {
        Err(e)
    } else if let Some(e) = conversion_error.clone() {
        Err(e)
    } else if let Some(t) = typed {
        Ok(t)
    } else {
        Err(ConfigError::missing_required(&ctx.key))
    };

    let event_result = match &outcome {
        Ok(_) => Ok(raw),
        Err(e) => Err(e.clone()),
    };
    ctx.emit(resolution, conversion_error, event_result);

    outcome
}

fn finish_fetch_optional<T>(
    ctx: &EventContext,
    resolved: Resolved<T>,
) -> Result<Option<T>, ConfigError> {
    let outcome: Result<Option<ConfigValue>, ConfigError> =
        if let Some(e) = &resolved.provider_error {
            Err(e.clone())
        } else if let Some(e) = &resolved.conversion_error {
            Err(e.clone())
        } else if resolved.typed.is_some() {
            Ok(resolved.raw.clone())
        } else {
            Ok(None)
        };

    ctx.emit(
        resolved.resolution,
        resolved.conversion_error,
        outcome.clone(),
    );

    match outcome {
        Ok(Some(_)) => Ok(resolved.typed),
        Ok(None) => Ok(None),
        Err(e) => Err(e),
    }
}

fn finish_fetch_default<T: ConfigConvertible + Clone>(
    ctx: &EventContext,
    resolved: Resolved<T>,
    secret: bool,
    default: T,
) -> Result<T, ConfigError> {
    // Provider-layer failures propagate even with a default in hand; only
    // absence and conversion failures fall back.
    if let Some(e) = &resolved.provider_error {
        ctx.emit(
            resolved.resolution,
            resolved.conversion_error,
            Err(e.clone()),
        );
        return Err(e.clone());
    }

    let event_result = if resolved.typed.is_some() {
        Ok(resolved.raw.clone())
    } else {
        Ok(Some(default_as_value(&default, secret)))
    };
    ctx.emit(resolved.resolution, resolved.conversion_error, event_result);

    Ok(resolved.typed.unwrap_or(default))
}

// ============================================================================
// ConfigReader
// ============================================================================

/// Typed façade over a provider stack.
///
/// Cloning a reader is cheap; clones share the provider and reporter.
#[derive(Clone)]
pub struct ConfigReader {
    provider: Arc<dyn ConfigProvider>,
    key_prefix: Option<AbsoluteConfigKey>,
    reporter: Option<Arc<dyn AccessReporter>>,
    key_decoder: KeyDecoder,
}

impl std::fmt::Debug for ConfigReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigReader")
            .field("key_prefix", &self.key_prefix)
            .field("key_decoder", &self.key_decoder)
            .field("has_reporter", &self.reporter.is_some())
            .finish_non_exhaustive()
    }
}

impl ConfigReader {
    /// A reader over a single provider, with no prefix or reporter.
    #[must_use]
    pub fn new(provider: Arc<dyn ConfigProvider>) -> Self {
        Self {
            provider,
            key_prefix: None,
            reporter: None,
            key_decoder: KeyDecoder::dot_separated(),
        }
    }

    /// Starts a builder for stacking several providers.
    #[must_use]
    pub fn builder() -> ConfigReaderBuilder {
        ConfigReaderBuilder::new()
    }

    /// Attaches an access reporter.
    #[must_use]
    pub fn with_reporter(mut self, reporter: Arc<dyn AccessReporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    /// Replaces the decoder used for string key literals.
    #[must_use]
    pub fn with_key_decoder(mut self, decoder: KeyDecoder) -> Self {
        self.key_decoder = decoder;
        self
    }

    /// A reader whose keys are prefixed with `prefix`, sharing this
    /// reader's provider and reporter.
    #[must_use]
    pub fn scoped(&self, prefix: impl Into<ConfigKey>) -> Self {
        let prefix = prefix.into();
        Self {
            provider: self.provider.clone(),
            key_prefix: Some(AbsoluteConfigKey::scoped(self.key_prefix.as_ref(), prefix)),
            reporter: self.reporter.clone(),
            key_decoder: self.key_decoder,
        }
    }

    /// [`scoped`](Self::scoped) with a different key-literal decoder for
    /// the returned reader.
    #[must_use]
    pub fn scoped_with_decoder(&self, prefix: impl Into<ConfigKey>, decoder: KeyDecoder) -> Self {
        let mut scoped = self.scoped(prefix);
        scoped.key_decoder = decoder;
        scoped
    }

    /// The underlying provider.
    #[must_use]
    pub fn provider(&self) -> &Arc<dyn ConfigProvider> {
        &self.provider
    }

    /// A reader over a frozen snapshot of the provider stack.
    #[must_use]
    pub fn snapshot(&self) -> SnapshotReader {
        SnapshotReader {
            snapshot: self.provider.snapshot(),
            key_prefix: self.key_prefix.clone(),
            reporter: self.reporter.clone(),
            key_decoder: self.key_decoder,
        }
    }

    fn absolute(&self, spec: &KeySpec) -> AbsoluteConfigKey {
        let relative = match &spec.input {
            KeyInput::Literal(s) => self.key_decoder.decode(s, KeyContext::new()),
            KeyInput::Key(k) => k.clone(),
        };
        AbsoluteConfigKey::scoped(self.key_prefix.as_ref(), relative)
    }

    fn context(
        &self,
        kind: AccessKind,
        key: AbsoluteConfigKey,
        value_type: ConfigType,
        location: &'static Location<'static>,
    ) -> EventContext {
        EventContext {
            reporter: self.reporter.clone(),
            kind,
            key,
            value_type,
            location,
        }
    }

    // ------------------------------------------------------------------
    // Synchronous reads
    // ------------------------------------------------------------------

    /// Reads a value; absence, provider failure, and conversion failure all
    /// yield `None`.
    #[track_caller]
    pub fn get<T: ConfigConvertible>(&self, key: impl Into<KeySpec>) -> Option<T> {
        let location = Location::caller();
        let spec = key.into();
        let abs = self.absolute(&spec);

        let resolution = self.provider.resolve(&abs, T::TYPE);
        let resolved = resolve_typed(resolution, spec.secret, T::from_content);
        let ctx = self.context(AccessKind::Get, abs, T::TYPE, location);
        finish_optional(&ctx, resolved)
    }

    /// Reads a value, falling back to `default` on absence or any failure.
    #[track_caller]
    pub fn get_or<T: ConfigConvertible + Clone>(&self, key: impl Into<KeySpec>, default: T) -> T {
        let location = Location::caller();
        let spec = key.into();
        let abs = self.absolute(&spec);

        let resolution = self.provider.resolve(&abs, T::TYPE);
        let resolved = resolve_typed(resolution, spec.secret, T::from_content);
        let ctx = self.context(AccessKind::Get, abs, T::TYPE, location);
        finish_default(&ctx, resolved, spec.secret, default)
    }

    /// Reads a value that must be present and convertible.
    ///
    /// # Errors
    ///
    /// Absence yields [`ConfigError::MissingRequiredValue`]; provider and
    /// conversion failures propagate.
    #[track_caller]
    pub fn get_required<T: ConfigConvertible>(
        &self,
        key: impl Into<KeySpec>,
    ) -> Result<T, ConfigError> {
        let location = Location::caller();
        let spec = key.into();
        let abs = self.absolute(&spec);

        let resolution = self.provider.resolve(&abs, T::TYPE);
        let resolved = resolve_typed(resolution, spec.secret, T::from_content);
        let ctx = self.context(AccessKind::Get, abs, T::TYPE, location);
        finish_required(&ctx, resolved)
    }

    /// Reads a string-backed value through its [`FromConfigString`]
    /// constructor.
    #[track_caller]
    pub fn get_as<T: FromConfigString + Send + 'static>(
        &self,
        key: impl Into<KeySpec>,
    ) -> Option<T> {
        let location = Location::caller();
        let spec = key.into();
        let abs = self.absolute(&spec);

        let resolution = self.provider.resolve(&abs, ConfigType::String);
        let convert = string_cast::<T>(abs.to_string());
        let resolved = resolve_typed(resolution, spec.secret, convert);
        let ctx = self.context(AccessKind::Get, abs, ConfigType::String, location);
        finish_optional(&ctx, resolved)
    }

    /// Required variant of [`get_as`](Self::get_as).
    ///
    /// # Errors
    ///
    /// Absence, provider failures, and cast failures propagate.
    #[track_caller]
    pub fn get_as_required<T: FromConfigString + Send + 'static>(
        &self,
        key: impl Into<KeySpec>,
    ) -> Result<T, ConfigError> {
        let location = Location::caller();
        let spec = key.into();
        let abs = self.absolute(&spec);

        let resolution = self.provider.resolve(&abs, ConfigType::String);
        let convert = string_cast::<T>(abs.to_string());
        let resolved = resolve_typed(resolution, spec.secret, convert);
        let ctx = self.context(AccessKind::Get, abs, ConfigType::String, location);
        finish_required(&ctx, resolved)
    }

    /// Reads a string array, casting every element; the first failing
    /// element rejects the whole read.
    #[track_caller]
    pub fn get_array_as<T: FromConfigString + Send + 'static>(
        &self,
        key: impl Into<KeySpec>,
    ) -> Option<Vec<T>> {
        let location = Location::caller();
        let spec = key.into();
        let abs = self.absolute(&spec);

        let resolution = self.provider.resolve(&abs, ConfigType::StringArray);
        let convert = string_array_cast::<T>(abs.to_string());
        let resolved = resolve_typed(resolution, spec.secret, convert);
        let ctx = self.context(AccessKind::Get, abs, ConfigType::StringArray, location);
        finish_optional(&ctx, resolved)
    }

    /// Reads an int-backed value through its [`FromConfigInt`] constructor.
    #[track_caller]
    pub fn get_int_as<T: FromConfigInt + Send + 'static>(
        &self,
        key: impl Into<KeySpec>,
    ) -> Option<T> {
        let location = Location::caller();
        let spec = key.into();
        let abs = self.absolute(&spec);

        let resolution = self.provider.resolve(&abs, ConfigType::Int);
        let convert = int_cast::<T>(abs.to_string());
        let resolved = resolve_typed(resolution, spec.secret, convert);
        let ctx = self.context(AccessKind::Get, abs, ConfigType::Int, location);
        finish_optional(&ctx, resolved)
    }

    // ------------------------------------------------------------------
    // One-shot fetches
    // ------------------------------------------------------------------

    /// Fetches a value, refreshing providers that support it.
    ///
    /// # Errors
    ///
    /// Provider and conversion failures propagate; absence is `Ok(None)`.
    #[track_caller]
    pub fn fetch<T: ConfigConvertible>(
        &self,
        key: impl Into<KeySpec>,
    ) -> impl Future<Output = Result<Option<T>, ConfigError>> + Send + '_ {
        let location = Location::caller();
        let spec = key.into();
        let abs = self.absolute(&spec);

        async move {
            let resolution = self.provider.fetch_resolve(&abs, T::TYPE).await;
            let resolved = resolve_typed(resolution, spec.secret, T::from_content);
            let ctx = self.context(AccessKind::Fetch, abs, T::TYPE, location);
            finish_fetch_optional(&ctx, resolved)
        }
    }

    /// Fetches a value with a fallback for absence and conversion failure.
    ///
    /// # Errors
    ///
    /// Provider-layer failures still propagate; the default does not mask
    /// them.
    #[track_caller]
    pub fn fetch_or<T: ConfigConvertible + Clone>(
        &self,
        key: impl Into<KeySpec>,
        default: T,
    ) -> impl Future<Output = Result<T, ConfigError>> + Send + '_ {
        let location = Location::caller();
        let spec = key.into();
        let abs = self.absolute(&spec);

        async move {
            let resolution = self.provider.fetch_resolve(&abs, T::TYPE).await;
            let resolved = resolve_typed(resolution, spec.secret, T::from_content);
            let ctx = self.context(AccessKind::Fetch, abs, T::TYPE, location);
            finish_fetch_default(&ctx, resolved, spec.secret, default)
        }
    }

    /// Fetches a value that must be present and convertible.
    ///
    /// # Errors
    ///
    /// Absence yields [`ConfigError::MissingRequiredValue`]; provider and
    /// conversion failures propagate.
    #[track_caller]
    pub fn fetch_required<T: ConfigConvertible>(
        &self,
        key: impl Into<KeySpec>,
    ) -> impl Future<Output = Result<T, ConfigError>> + Send + '_ {
        let location = Location::caller();
        let spec = key.into();
        let abs = self.absolute(&spec);

        async move {
            let resolution = self.provider.fetch_resolve(&abs, T::TYPE).await;
            let resolved = resolve_typed(resolution, spec.secret, T::from_content);
            let ctx = self.context(AccessKind::Fetch, abs, T::TYPE, location);
            finish_required(&ctx, resolved)
        }
    }

    /// String-cast variant of [`fetch`](Self::fetch).
    ///
    /// # Errors
    ///
    /// Provider and cast failures propagate; absence is `Ok(None)`.
    #[track_caller]
    pub fn fetch_as<T: FromConfigString + Send + 'static>(
        &self,
        key: impl Into<KeySpec>,
    ) -> impl Future<Output = Result<Option<T>, ConfigError>> + Send + '_ {
        let location = Location::caller();
        let spec = key.into();
        let abs = self.absolute(&spec);

        async move {
            let resolution = self.provider.fetch_resolve(&abs, ConfigType::String).await;
            let convert = string_cast::<T>(abs.to_string());
            let resolved = resolve_typed(resolution, spec.secret, convert);
            let ctx = self.context(AccessKind::Fetch, abs, ConfigType::String, location);
            finish_fetch_optional(&ctx, resolved)
        }
    }

    // ------------------------------------------------------------------
    // Watches
    // ------------------------------------------------------------------

    /// Watches a value: the first element reflects the current state, later
    /// elements reflect changes. Absence and failures yield `None`
    /// elements; one access event is emitted per delivered element.
    #[track_caller]
    pub fn watch<T: ConfigConvertible>(&self, key: impl Into<KeySpec>) -> Updates<Option<T>> {
        let location = Location::caller();
        let spec = key.into();
        let abs = self.absolute(&spec);
        let secret = spec.secret;
        let ctx = self.context(AccessKind::Watch, abs.clone(), T::TYPE, location);

        self.provider.watch_resolve(&abs, T::TYPE).map(move |resolution| {
            let resolved = resolve_typed(resolution, secret, T::from_content);
            finish_optional(&ctx, resolved)
        })
    }

    /// Watches a value with a fallback for absence and failures.
    #[track_caller]
    pub fn watch_or<T: ConfigConvertible + Clone>(
        &self,
        key: impl Into<KeySpec>,
        default: T,
    ) -> Updates<T> {
        let location = Location::caller();
        let spec = key.into();
        let abs = self.absolute(&spec);
        let secret = spec.secret;
        let ctx = self.context(AccessKind::Watch, abs.clone(), T::TYPE, location);

        self.provider.watch_resolve(&abs, T::TYPE).map(move |resolution| {
            let resolved = resolve_typed(resolution, secret, T::from_content);
            finish_default(&ctx, resolved, secret, default.clone())
        })
    }

    /// Watches a required value; elements are `Err` while the value is
    /// missing, unconvertible, or the provider chain fails.
    #[track_caller]
    pub fn watch_required<T: ConfigConvertible>(
        &self,
        key: impl Into<KeySpec>,
    ) -> Updates<Result<T, ConfigError>> {
        let location = Location::caller();
        let spec = key.into();
        let abs = self.absolute(&spec);
        let secret = spec.secret;
        let ctx = self.context(AccessKind::Watch, abs.clone(), T::TYPE, location);

        self.provider.watch_resolve(&abs, T::TYPE).map(move |resolution| {
            let resolved = resolve_typed(resolution, secret, T::from_content);
            finish_required(&ctx, resolved)
        })
    }
}

fn string_cast<T: FromConfigString>(
    key_name: String,
) -> impl Fn(&ConfigContent) -> Result<T, ConfigError> {
    move |content| {
        let s = content.as_str()?;
        T::from_config_string(s).ok_or_else(|| ConfigError::FailedToCast {
            name: key_name.clone(),
            type_name: std::any::type_name::<T>(),
        })
    }
}

fn string_array_cast<T: FromConfigString>(
    key_name: String,
) -> impl Fn(&ConfigContent) -> Result<Vec<T>, ConfigError> {
    move |content| {
        let elements = content.as_string_array()?;
        elements
            .iter()
            .map(|e| T::from_config_string(e))
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| ConfigError::FailedToCast {
                name: key_name.clone(),
                type_name: std::any::type_name::<T>(),
            })
    }
}

fn int_cast<T: FromConfigInt>(
    key_name: String,
) -> impl Fn(&ConfigContent) -> Result<T, ConfigError> {
    move |content| {
        let i = *content.as_int()?;
        T::from_config_int(i).ok_or_else(|| ConfigError::FailedToCast {
            name: key_name.clone(),
            type_name: std::any::type_name::<T>(),
        })
    }
}

// ============================================================================
// SnapshotReader
// ============================================================================

/// Typed reads over a frozen point-in-time view of the provider stack.
///
/// Useful when a batch of related values must come from one consistent
/// state rather than racing a live reload.
pub struct SnapshotReader {
    snapshot: Arc<dyn ConfigSnapshot>,
    key_prefix: Option<AbsoluteConfigKey>,
    reporter: Option<Arc<dyn AccessReporter>>,
    key_decoder: KeyDecoder,
}

impl SnapshotReader {
    fn absolute(&self, spec: &KeySpec) -> AbsoluteConfigKey {
        let relative = match &spec.input {
            KeyInput::Literal(s) => self.key_decoder.decode(s, KeyContext::new()),
            KeyInput::Key(k) => k.clone(),
        };
        AbsoluteConfigKey::scoped(self.key_prefix.as_ref(), relative)
    }

    fn resolve(&self, key: &AbsoluteConfigKey, ty: ConfigType) -> Resolution {
        Resolution::single(self.snapshot.name(), self.snapshot.value(key, ty))
    }

    fn context(
        &self,
        key: AbsoluteConfigKey,
        value_type: ConfigType,
        location: &'static Location<'static>,
    ) -> EventContext {
        EventContext {
            reporter: self.reporter.clone(),
            kind: AccessKind::Get,
            key,
            value_type,
            location,
        }
    }

    /// Reads a value from the snapshot; absence and failures yield `None`.
    #[track_caller]
    pub fn get<T: ConfigConvertible>(&self, key: impl Into<KeySpec>) -> Option<T> {
        let location = Location::caller();
        let spec = key.into();
        let abs = self.absolute(&spec);

        let resolved = resolve_typed(self.resolve(&abs, T::TYPE), spec.secret, T::from_content);
        let ctx = self.context(abs, T::TYPE, location);
        finish_optional(&ctx, resolved)
    }

    /// Reads a value with a fallback.
    #[track_caller]
    pub fn get_or<T: ConfigConvertible + Clone>(&self, key: impl Into<KeySpec>, default: T) -> T {
        let location = Location::caller();
        let spec = key.into();
        let abs = self.absolute(&spec);

        let resolved = resolve_typed(self.resolve(&abs, T::TYPE), spec.secret, T::from_content);
        let ctx = self.context(abs, T::TYPE, location);
        finish_default(&ctx, resolved, spec.secret, default)
    }

    /// Reads a required value.
    ///
    /// # Errors
    ///
    /// Absence yields [`ConfigError::MissingRequiredValue`]; lookup and
    /// conversion failures propagate.
    #[track_caller]
    pub fn get_required<T: ConfigConvertible>(
        &self,
        key: impl Into<KeySpec>,
    ) -> Result<T, ConfigError> {
        let location = Location::caller();
        let spec = key.into();
        let abs = self.absolute(&spec);

        let resolved = resolve_typed(self.resolve(&abs, T::TYPE), spec.secret, T::from_content);
        let ctx = self.context(abs, T::TYPE, location);
        finish_required(&ctx, resolved)
    }

    /// The raw lookup, bypassing conversion.
    ///
    /// # Errors
    ///
    /// Propagates snapshot lookup failures.
    pub fn raw(
        &self,
        key: impl Into<KeySpec>,
        ty: ConfigType,
    ) -> Result<Option<ConfigValue>, ConfigError> {
        let spec = key.into();
        let abs = self.absolute(&spec);
        let lookup = self.snapshot.value(&abs, ty)?;
        Ok(if spec.secret {
            lookup.value.map(ConfigValue::marked_secret)
        } else {
            lookup.value
        })
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Fluent construction of a [`ConfigReader`] over a provider stack.
#[derive(Default)]
pub struct ConfigReaderBuilder {
    providers: Vec<Arc<dyn ConfigProvider>>,
    reporter: Option<Arc<dyn AccessReporter>>,
    key_prefix: Option<ConfigKey>,
    key_decoder: KeyDecoder,
}

impl ConfigReaderBuilder {
    /// An empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
            reporter: None,
            key_prefix: None,
            key_decoder: KeyDecoder::dot_separated(),
        }
    }

    /// Appends a provider (earlier providers take precedence).
    #[must_use]
    pub fn with_provider(mut self, provider: impl ConfigProvider + 'static) -> Self {
        self.providers.push(Arc::new(provider));
        self
    }

    /// Appends an already-shared provider.
    #[must_use]
    pub fn with_shared_provider(mut self, provider: Arc<dyn ConfigProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    /// Attaches an access reporter.
    #[must_use]
    pub fn with_reporter(mut self, reporter: Arc<dyn AccessReporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    /// Scopes the reader under a key prefix.
    #[must_use]
    pub fn with_key_prefix(mut self, prefix: impl Into<ConfigKey>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }

    /// Replaces the key-literal decoder.
    #[must_use]
    pub fn with_key_decoder(mut self, decoder: KeyDecoder) -> Self {
        self.key_decoder = decoder;
        self
    }

    /// Builds the reader.
    ///
    /// # Errors
    ///
    /// Rejects an empty provider list.
    pub fn build(self) -> Result<ConfigReader, ConfigError> {
        let mut providers = self.providers;
        let provider: Arc<dyn ConfigProvider> = if providers.is_empty() {
            return Err(ConfigError::EmptyProviderList);
        } else if providers.len() == 1 {
            providers.remove(0)
        } else {
            Arc::new(MultiProvider::new(providers)?)
        };

        Ok(ConfigReader {
            provider,
            key_prefix: self
                .key_prefix
                .map(|prefix| AbsoluteConfigKey::scoped(None, prefix)),
            reporter: self.reporter,
            key_decoder: self.key_decoder,
        })
    }
}
