//! The configuration value model.
//!
//! Values travel through the provider chain as [`ConfigValue`]: a tagged
//! [`ConfigContent`] payload plus a sticky secret flag. Accessors on
//! [`ConfigContent`] are tag-exact; asking for the wrong tag yields a
//! [`ConfigError::TypeMismatch`] rather than a coercion, so "value absent"
//! and "value present with the wrong type" stay distinguishable.
//!
//! # Secret redaction
//!
//! A secret value renders as `[<type>: <REDACTED>]` in `Display` output.
//! The secret flag is true-sticky: once set it cannot be cleared by a later
//! pipeline stage.
//!
//! # Example
//!
//! ```rust
//! use confstack::{ConfigContent, ConfigValue};
//!
//! let value = ConfigValue::from("sw0rdfish").marked_secret();
//! assert_eq!(value.to_string(), "[string: <REDACTED>]");
//! assert_eq!(value.content().as_str().unwrap(), "sw0rdfish");
//! ```

use std::collections::HashSet;
use std::fmt::{self, Display, Formatter};
use std::hash::Hash;
use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;

use crate::error::ConfigError;

// ============================================================================
// ConfigType
// ============================================================================

/// The type tag of a configuration value.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ConfigType {
    /// A UTF-8 string.
    String,
    /// A signed 64-bit integer.
    Int,
    /// A 64-bit float.
    Double,
    /// A boolean.
    Bool,
    /// An opaque byte array.
    Bytes,
    /// An array of strings.
    StringArray,
    /// An array of integers.
    IntArray,
    /// An array of doubles.
    DoubleArray,
    /// An array of booleans.
    BoolArray,
    /// An array of byte arrays.
    ByteChunkArray,
}

impl Display for ConfigType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConfigType::String => "string",
            ConfigType::Int => "int",
            ConfigType::Double => "double",
            ConfigType::Bool => "bool",
            ConfigType::Bytes => "bytes",
            ConfigType::StringArray => "string-array",
            ConfigType::IntArray => "int-array",
            ConfigType::DoubleArray => "double-array",
            ConfigType::BoolArray => "bool-array",
            ConfigType::ByteChunkArray => "byte-chunk-array",
        };
        write!(f, "{name}")
    }
}

// ============================================================================
// ConfigContent
// ============================================================================

/// The payload of a configuration value, tagged by [`ConfigType`].
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigContent {
    /// A UTF-8 string.
    String(String),
    /// A signed 64-bit integer.
    Int(i64),
    /// A 64-bit float.
    Double(f64),
    /// A boolean.
    Bool(bool),
    /// An opaque byte array.
    Bytes(Vec<u8>),
    /// An array of strings.
    StringArray(Vec<String>),
    /// An array of integers.
    IntArray(Vec<i64>),
    /// An array of doubles.
    DoubleArray(Vec<f64>),
    /// An array of booleans.
    BoolArray(Vec<bool>),
    /// An array of byte arrays.
    ByteChunkArray(Vec<Vec<u8>>),
}

macro_rules! content_accessor {
    ($(#[$doc:meta])* $method:ident, $variant:ident, $ty:ty, $requested:expr) => {
        $(#[$doc])*
        pub fn $method(&self) -> Result<&$ty, ConfigError> {
            match self {
                ConfigContent::$variant(v) => Ok(v),
                other => Err(ConfigError::TypeMismatch {
                    actual: other.ty(),
                    requested: $requested,
                }),
            }
        }
    };
}

impl ConfigContent {
    /// The type tag of this content.
    #[must_use]
    pub fn ty(&self) -> ConfigType {
        match self {
            ConfigContent::String(_) => ConfigType::String,
            ConfigContent::Int(_) => ConfigType::Int,
            ConfigContent::Double(_) => ConfigType::Double,
            ConfigContent::Bool(_) => ConfigType::Bool,
            ConfigContent::Bytes(_) => ConfigType::Bytes,
            ConfigContent::StringArray(_) => ConfigType::StringArray,
            ConfigContent::IntArray(_) => ConfigType::IntArray,
            ConfigContent::DoubleArray(_) => ConfigType::DoubleArray,
            ConfigContent::BoolArray(_) => ConfigType::BoolArray,
            ConfigContent::ByteChunkArray(_) => ConfigType::ByteChunkArray,
        }
    }

    content_accessor!(
        /// Returns the string payload, or a type-mismatch error.
        as_str, String, str, ConfigType::String
    );
    content_accessor!(
        /// Returns the integer payload, or a type-mismatch error.
        as_int, Int, i64, ConfigType::Int
    );
    content_accessor!(
        /// Returns the double payload, or a type-mismatch error.
        as_double, Double, f64, ConfigType::Double
    );
    content_accessor!(
        /// Returns the boolean payload, or a type-mismatch error.
        as_bool, Bool, bool, ConfigType::Bool
    );
    content_accessor!(
        /// Returns the byte payload, or a type-mismatch error.
        as_bytes, Bytes, [u8], ConfigType::Bytes
    );
    content_accessor!(
        /// Returns the string-array payload, or a type-mismatch error.
        as_string_array, StringArray, [String], ConfigType::StringArray
    );
    content_accessor!(
        /// Returns the int-array payload, or a type-mismatch error.
        as_int_array, IntArray, [i64], ConfigType::IntArray
    );
    content_accessor!(
        /// Returns the double-array payload, or a type-mismatch error.
        as_double_array, DoubleArray, [f64], ConfigType::DoubleArray
    );
    content_accessor!(
        /// Returns the bool-array payload, or a type-mismatch error.
        as_bool_array, BoolArray, [bool], ConfigType::BoolArray
    );
    content_accessor!(
        /// Returns the byte-chunk-array payload, or a type-mismatch error.
        as_byte_chunk_array, ByteChunkArray, [Vec<u8>], ConfigType::ByteChunkArray
    );

    /// Parses a raw provider string into content of the requested type.
    ///
    /// This is the shared grammar for string-native providers (environment
    /// variables, CLI arguments, directory files):
    ///
    /// - `int`: standard base-10 integer grammar
    /// - `double`: standard float grammar
    /// - `bool`: `true|false|1|0|yes|no`, case-insensitive
    /// - `bytes`: decoded with `parsing.bytes_decoder`
    /// - arrays: split on `parsing.separator`, elements trimmed
    ///
    /// Returns `None` when the raw string does not fit the requested type.
    #[must_use]
    pub fn parse(raw: &str, ty: ConfigType, parsing: &StringParsing) -> Option<ConfigContent> {
        fn parse_bool(s: &str) -> Option<bool> {
            match s.to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => Some(true),
                "false" | "0" | "no" => Some(false),
                _ => None,
            }
        }

        let elements = |raw: &str| -> Vec<String> {
            if raw.is_empty() {
                return Vec::new();
            }
            raw.split(parsing.separator.as_str())
                .map(|e| e.trim().to_string())
                .collect()
        };

        match ty {
            ConfigType::String => Some(ConfigContent::String(raw.to_string())),

            ConfigType::Int => raw.parse::<i64>().ok().map(ConfigContent::Int),

            ConfigType::Double => raw.parse::<f64>().ok().map(ConfigContent::Double),

            ConfigType::Bool => parse_bool(raw).map(ConfigContent::Bool),

            ConfigType::Bytes => parsing.bytes_decoder.decode(raw).map(ConfigContent::Bytes),

            ConfigType::StringArray => Some(ConfigContent::StringArray(elements(raw))),

            ConfigType::IntArray => elements(raw)
                .iter()
                .map(|e| e.parse::<i64>().ok())
                .collect::<Option<Vec<_>>>()
                .map(ConfigContent::IntArray),

            ConfigType::DoubleArray => elements(raw)
                .iter()
                .map(|e| e.parse::<f64>().ok())
                .collect::<Option<Vec<_>>>()
                .map(ConfigContent::DoubleArray),

            ConfigType::BoolArray => elements(raw)
                .iter()
                .map(|e| parse_bool(e))
                .collect::<Option<Vec<_>>>()
                .map(ConfigContent::BoolArray),

            ConfigType::ByteChunkArray => elements(raw)
                .iter()
                .map(|e| parsing.bytes_decoder.decode(e))
                .collect::<Option<Vec<_>>>()
                .map(ConfigContent::ByteChunkArray),
        }
    }
}

impl Display for ConfigContent {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        fn join<T: Display>(f: &mut Formatter<'_>, items: &[T]) -> fmt::Result {
            write!(f, "[")?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{item}")?;
            }
            write!(f, "]")
        }

        match self {
            ConfigContent::String(s) => write!(f, "{s}"),

            ConfigContent::Int(i) => write!(f, "{i}"),

            ConfigContent::Double(d) => write!(f, "{d}"),

            ConfigContent::Bool(b) => write!(f, "{b}"),

            ConfigContent::Bytes(b) => write!(f, "{}", BASE64.encode(b)),

            ConfigContent::StringArray(a) => join(f, a),

            ConfigContent::IntArray(a) => join(f, a),

            ConfigContent::DoubleArray(a) => join(f, a),

            ConfigContent::BoolArray(a) => join(f, a),

            ConfigContent::ByteChunkArray(a) => {
                let encoded: Vec<String> = a.iter().map(|c| BASE64.encode(c)).collect();
                join(f, &encoded)
            }
        }
    }
}

// ============================================================================
// ConfigValue
// ============================================================================

/// A configuration value: tagged content plus a sticky secret flag.
#[derive(Clone, Debug, PartialEq)]
pub struct ConfigValue {
    content: ConfigContent,
    is_secret: bool,
}

impl ConfigValue {
    /// Creates a non-secret value.
    #[must_use]
    pub fn new(content: ConfigContent) -> Self {
        Self {
            content,
            is_secret: false,
        }
    }

    /// Creates a secret value.
    #[must_use]
    pub fn secret(content: ConfigContent) -> Self {
        Self {
            content,
            is_secret: true,
        }
    }

    /// The tagged payload.
    #[must_use]
    pub fn content(&self) -> &ConfigContent {
        &self.content
    }

    /// Consumes the value and returns its payload.
    #[must_use]
    pub fn into_content(self) -> ConfigContent {
        self.content
    }

    /// Whether this value is secret.
    #[must_use]
    pub fn is_secret(&self) -> bool {
        self.is_secret
    }

    /// The type tag of the payload.
    #[must_use]
    pub fn ty(&self) -> ConfigType {
        self.content.ty()
    }

    /// Returns this value marked secret.
    ///
    /// The flag is true-sticky; there is deliberately no inverse operation.
    #[must_use]
    pub fn marked_secret(mut self) -> Self {
        self.is_secret = true;
        self
    }
}

impl Display for ConfigValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.is_secret {
            write!(f, "[{}: <REDACTED>]", self.content.ty())
        } else {
            write!(f, "{}", self.content)
        }
    }
}

impl From<ConfigContent> for ConfigValue {
    fn from(content: ConfigContent) -> Self {
        ConfigValue::new(content)
    }
}

impl From<&str> for ConfigValue {
    fn from(s: &str) -> Self {
        ConfigValue::new(ConfigContent::String(s.to_string()))
    }
}

impl From<String> for ConfigValue {
    fn from(s: String) -> Self {
        ConfigValue::new(ConfigContent::String(s))
    }
}

impl From<i64> for ConfigValue {
    fn from(i: i64) -> Self {
        ConfigValue::new(ConfigContent::Int(i))
    }
}

impl From<f64> for ConfigValue {
    fn from(d: f64) -> Self {
        ConfigValue::new(ConfigContent::Double(d))
    }
}

impl From<bool> for ConfigValue {
    fn from(b: bool) -> Self {
        ConfigValue::new(ConfigContent::Bool(b))
    }
}

impl From<Vec<String>> for ConfigValue {
    fn from(a: Vec<String>) -> Self {
        ConfigValue::new(ConfigContent::StringArray(a))
    }
}

impl From<Vec<i64>> for ConfigValue {
    fn from(a: Vec<i64>) -> Self {
        ConfigValue::new(ConfigContent::IntArray(a))
    }
}

// ============================================================================
// LookupResult
// ============================================================================

/// The outcome of one provider lookup.
///
/// `encoded_key` records how the provider serialized the key (for example
/// `DATABASE_HOST`, `--db-host`, or `database.host`), independent of whether
/// a value was found.
#[derive(Clone, Debug, PartialEq)]
pub struct LookupResult {
    /// The provider-native rendering of the looked-up key.
    pub encoded_key: String,

    /// The value, if the provider had one.
    pub value: Option<ConfigValue>,
}

impl LookupResult {
    /// A hit: the provider found a value.
    #[must_use]
    pub fn hit(encoded_key: impl Into<String>, value: ConfigValue) -> Self {
        Self {
            encoded_key: encoded_key.into(),
            value: Some(value),
        }
    }

    /// A miss: the provider knows nothing about the key.
    #[must_use]
    pub fn miss(encoded_key: impl Into<String>) -> Self {
        Self {
            encoded_key: encoded_key.into(),
            value: None,
        }
    }
}

// ============================================================================
// Bytes decoding
// ============================================================================

/// How string-native providers and file parsers decode byte values.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum BytesDecoder {
    /// Standard base64 (the default).
    #[default]
    Base64,
    /// Lowercase or uppercase hex.
    Hex,
}

impl BytesDecoder {
    /// Decodes an encoded byte string; `None` if it is not valid in this
    /// encoding.
    #[must_use]
    pub fn decode(&self, raw: &str) -> Option<Vec<u8>> {
        match self {
            BytesDecoder::Base64 => BASE64.decode(raw).ok(),
            BytesDecoder::Hex => hex::decode(raw).ok(),
        }
    }
}

/// Options for parsing string-native provider values.
#[derive(Clone, Debug)]
pub struct StringParsing {
    /// Separator for array values.
    pub separator: String,

    /// Decoder for `bytes` / `byte-chunk-array` values.
    pub bytes_decoder: BytesDecoder,
}

impl Default for StringParsing {
    fn default() -> Self {
        Self {
            separator: ",".to_string(),
            bytes_decoder: BytesDecoder::Base64,
        }
    }
}

// ============================================================================
// SecretsSpecifier
// ============================================================================

/// Selects which provider-native keys hold secret values.
///
/// Evaluated against provider-native (encoded) keys and raw values, before
/// any type conversion.
#[derive(Clone, Default)]
pub enum SecretsSpecifier<K = String>
where
    K: Eq + Hash,
{
    /// Every value is secret.
    All,
    /// No value is secret (the default for most providers).
    #[default]
    None,
    /// The listed keys are secret.
    Specific(HashSet<K>),
    /// A predicate over key and raw value decides.
    Dynamic(Arc<dyn Fn(&K, &str) -> bool + Send + Sync>),
}

impl<K: Eq + Hash> SecretsSpecifier<K> {
    /// Whether the value at `key` should be tagged secret.
    #[must_use]
    pub fn is_secret(&self, key: &K, raw_value: &str) -> bool {
        match self {
            SecretsSpecifier::All => true,
            SecretsSpecifier::None => false,
            SecretsSpecifier::Specific(keys) => keys.contains(key),
            SecretsSpecifier::Dynamic(predicate) => predicate(key, raw_value),
        }
    }

    /// Builds a [`SecretsSpecifier::Specific`] from an iterator of keys.
    pub fn specific<I: IntoIterator<Item = K>>(keys: I) -> Self {
        SecretsSpecifier::Specific(keys.into_iter().collect())
    }

    /// Builds a [`SecretsSpecifier::Dynamic`] from a predicate.
    pub fn dynamic(predicate: impl Fn(&K, &str) -> bool + Send + Sync + 'static) -> Self {
        SecretsSpecifier::Dynamic(Arc::new(predicate))
    }
}

impl<K: Eq + Hash + std::fmt::Debug> std::fmt::Debug for SecretsSpecifier<K> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            SecretsSpecifier::All => write!(f, "SecretsSpecifier::All"),
            SecretsSpecifier::None => write!(f, "SecretsSpecifier::None"),
            SecretsSpecifier::Specific(keys) => {
                write!(f, "SecretsSpecifier::Specific({keys:?})")
            }
            SecretsSpecifier::Dynamic(_) => write!(f, "SecretsSpecifier::Dynamic(..)"),
        }
    }
}
