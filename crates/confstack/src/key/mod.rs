//! Hierarchical configuration keys.
//!
//! A configuration key is an ordered sequence of non-empty string
//! *components* plus a *context* map used by providers that support
//! dimensional overrides (for example per-environment values).
//!
//! Two key types exist:
//!
//! - [`ConfigKey`] - a *relative* key as supplied by callers,
//! - [`AbsoluteConfigKey`] - a key fully qualified by any reader scoping
//!   prefix, ready for provider lookup.
//!
//! # Ordering
//!
//! Keys are totally ordered: lexicographically over components, then by the
//! deterministic context signature (`k=v;...` with keys sorted), then by
//! component count. When contexts are empty this agrees with comparing the
//! canonical dot-separated encodings.
//!
//! # Example
//!
//! ```rust
//! use confstack::ConfigKey;
//!
//! let key: ConfigKey = "database.host".into();
//! assert_eq!(key.components(), ["database", "host"]);
//!
//! let scoped = ConfigKey::from("database").append(&ConfigKey::from("host"));
//! assert_eq!(scoped, key);
//! ```

pub mod encoding;

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};
use std::hash::{Hash, Hasher};

/// A single context value attached to a key.
///
/// Contexts carry auxiliary dimensions with a key (deployment environment,
/// region, tenant). Values are limited to the four scalar shapes providers
/// can match on.
#[derive(Clone, Debug)]
pub enum ContextValue {
    /// A string dimension value.
    String(String),
    /// An integer dimension value.
    Int(i64),
    /// A floating-point dimension value.
    Double(f64),
    /// A boolean dimension value.
    Bool(bool),
}

impl Display for ContextValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ContextValue::String(s) => write!(f, "{s}"),

            ContextValue::Int(i) => write!(f, "{i}"),

            ContextValue::Double(d) => write!(f, "{d}"),

            ContextValue::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl From<&str> for ContextValue {
    fn from(s: &str) -> Self {
        ContextValue::String(s.to_string())
    }
}

impl From<String> for ContextValue {
    fn from(s: String) -> Self {
        ContextValue::String(s)
    }
}

impl From<i64> for ContextValue {
    fn from(i: i64) -> Self {
        ContextValue::Int(i)
    }
}

impl From<f64> for ContextValue {
    fn from(d: f64) -> Self {
        ContextValue::Double(d)
    }
}

impl From<bool> for ContextValue {
    fn from(b: bool) -> Self {
        ContextValue::Bool(b)
    }
}

/// The context map attached to a key: unique string keys to scalar values.
pub type KeyContext = BTreeMap<String, ContextValue>;

/// A relative configuration key.
///
/// Relative keys are what callers hand to a [`ConfigReader`](crate::ConfigReader);
/// the reader combines them with its scoping prefix to form an
/// [`AbsoluteConfigKey`] before dispatching to providers.
#[derive(Clone, Debug, Default)]
pub struct ConfigKey {
    components: Vec<String>,
    context: KeyContext,
}

impl ConfigKey {
    /// Creates a key from components, with an empty context.
    ///
    /// Empty components are dropped; component strings must already be
    /// non-empty in well-formed input.
    pub fn new<I, S>(components: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_context(components, KeyContext::new())
    }

    /// Creates a key from components and a context map.
    pub fn with_context<I, S>(components: I, context: KeyContext) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let components = components
            .into_iter()
            .map(Into::into)
            .filter(|c: &String| !c.is_empty())
            .collect();

        Self {
            components,
            context,
        }
    }

    /// The ordered key components.
    #[must_use]
    pub fn components(&self) -> &[String] {
        &self.components
    }

    /// The context map.
    #[must_use]
    pub fn context(&self) -> &KeyContext {
        &self.context
    }

    /// Returns a copy of this key with one context entry added.
    #[must_use]
    pub fn with_context_value(mut self, key: impl Into<String>, value: impl Into<ContextValue>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Appends another relative key to this one.
    ///
    /// Components concatenate; contexts merge with the *right* (appended)
    /// key winning on collisions.
    #[must_use]
    pub fn append(&self, other: &ConfigKey) -> ConfigKey {
        let mut components = self.components.clone();
        components.extend(other.components.iter().cloned());

        let mut context = self.context.clone();
        for (k, v) in &other.context {
            context.insert(k.clone(), v.clone());
        }

        ConfigKey {
            components,
            context,
        }
    }

    /// Prepends another relative key to this one.
    ///
    /// Components of `prefix` come first; contexts merge with the *left*
    /// (prepended) key winning on collisions.
    #[must_use]
    pub fn prepend(&self, prefix: &ConfigKey) -> ConfigKey {
        let mut components = prefix.components.clone();
        components.extend(self.components.iter().cloned());

        let mut context = self.context.clone();
        for (k, v) in &prefix.context {
            context.insert(k.clone(), v.clone());
        }

        ConfigKey {
            components,
            context,
        }
    }

    /// Promotes this relative key to an absolute key unchanged.
    #[must_use]
    pub fn into_absolute(self) -> AbsoluteConfigKey {
        AbsoluteConfigKey { key: self }
    }

    /// The deterministic context signature: `k=v;...` with keys sorted.
    ///
    /// Equality and ordering of keys go through this signature, which makes
    /// double-valued contexts comparable without exposing float equality.
    #[must_use]
    pub fn context_signature(&self) -> String {
        let mut out = String::new();
        for (i, (k, v)) in self.context.iter().enumerate() {
            if i > 0 {
                out.push(';');
            }
            out.push_str(k);
            out.push('=');
            out.push_str(&v.to_string());
        }
        out
    }

    fn order_key(&self) -> (&[String], String, usize) {
        (
            &self.components,
            self.context_signature(),
            self.components.len(),
        )
    }
}

impl PartialEq for ConfigKey {
    fn eq(&self, other: &Self) -> bool {
        self.components == other.components
            && self.context_signature() == other.context_signature()
    }
}

impl Eq for ConfigKey {}

impl Hash for ConfigKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.components.hash(state);
        self.context_signature().hash(state);
    }
}

impl Ord for ConfigKey {
    fn cmp(&self, other: &Self) -> Ordering {
        // Lexicographic over shared component positions first; a key that is
        // a strict prefix of another ties here and falls through to the
        // signature and component-count tiebreakers.
        for (a, b) in self.components.iter().zip(other.components.iter()) {
            match a.cmp(b) {
                Ordering::Equal => {}
                non_eq => return non_eq,
            }
        }

        let (_, sig_a, len_a) = self.order_key();
        let (_, sig_b, len_b) = other.order_key();

        sig_a.cmp(&sig_b).then(len_a.cmp(&len_b))
    }
}

impl PartialOrd for ConfigKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Display for ConfigKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.components.join("."))?;

        if !self.context.is_empty() {
            write!(f, "[{}]", self.context_signature())?;
        }

        Ok(())
    }
}

impl From<&str> for ConfigKey {
    /// Parses a dot-separated key literal (`"a.b.c"`).
    fn from(s: &str) -> Self {
        ConfigKey::new(s.split('.'))
    }
}

impl From<String> for ConfigKey {
    fn from(s: String) -> Self {
        ConfigKey::from(s.as_str())
    }
}

impl<const N: usize> From<[&str; N]> for ConfigKey {
    fn from(components: [&str; N]) -> Self {
        ConfigKey::new(components)
    }
}

impl From<&[&str]> for ConfigKey {
    fn from(components: &[&str]) -> Self {
        ConfigKey::new(components.iter().copied())
    }
}

impl From<Vec<String>> for ConfigKey {
    fn from(components: Vec<String>) -> Self {
        ConfigKey::new(components)
    }
}

/// An absolute configuration key, ready for provider lookup.
///
/// An absolute key is structurally identical to a relative key; the type
/// distinction records that reader scoping has already been applied.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AbsoluteConfigKey {
    key: ConfigKey,
}

impl AbsoluteConfigKey {
    /// Creates an absolute key from components, with an empty context.
    pub fn new<I, S>(components: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ConfigKey::new(components).into_absolute()
    }

    /// The ordered key components.
    #[must_use]
    pub fn components(&self) -> &[String] {
        self.key.components()
    }

    /// The context map.
    #[must_use]
    pub fn context(&self) -> &KeyContext {
        self.key.context()
    }

    /// The underlying relative key.
    #[must_use]
    pub fn as_relative(&self) -> &ConfigKey {
        &self.key
    }

    /// Appends a relative key; components concatenate, the appended key's
    /// context wins on collisions.
    #[must_use]
    pub fn append(&self, other: &ConfigKey) -> AbsoluteConfigKey {
        self.key.append(other).into_absolute()
    }

    /// Prepends a relative key; the prepended prefix's context wins on
    /// collisions.
    #[must_use]
    pub fn prepend(&self, prefix: &ConfigKey) -> AbsoluteConfigKey {
        self.key.prepend(prefix).into_absolute()
    }

    /// The deterministic context signature.
    #[must_use]
    pub fn context_signature(&self) -> String {
        self.key.context_signature()
    }

    /// Combines an optional absolute prefix with a relative key.
    ///
    /// With a prefix present the relative key is appended to it; an absent
    /// prefix promotes the relative key unchanged.
    #[must_use]
    pub fn scoped(prefix: Option<&AbsoluteConfigKey>, key: ConfigKey) -> AbsoluteConfigKey {
        match prefix {
            Some(p) => p.append(&key),
            None => key.into_absolute(),
        }
    }
}

impl Display for AbsoluteConfigKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.key, f)
    }
}

impl From<&str> for AbsoluteConfigKey {
    fn from(s: &str) -> Self {
        ConfigKey::from(s).into_absolute()
    }
}

impl From<String> for AbsoluteConfigKey {
    fn from(s: String) -> Self {
        ConfigKey::from(s).into_absolute()
    }
}

impl From<ConfigKey> for AbsoluteConfigKey {
    fn from(key: ConfigKey) -> Self {
        key.into_absolute()
    }
}
