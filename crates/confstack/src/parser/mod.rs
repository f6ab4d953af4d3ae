//! Snapshot parsers for file-backed providers.
//!
//! A [`SnapshotParser`] turns raw file bytes into a [`ParsedTable`]: a flat
//! map from dot-separated keys to tagged values. Nested mappings flatten
//! into the dot key space (`{"db": {"host": ...}}` becomes `db.host`),
//! arrays are preserved as typed array content, and scalars become
//! `string`/`int`/`double`/`bool` per their native type.
//!
//! Three parsers ship with the crate:
//!
//! - [`JsonParser`] over `serde_json`
//! - [`YamlParser`] over `serde_yaml`
//! - [`EnvFileParser`] for `KEY=VALUE` line files
//!
//! Other formats plug in by implementing the trait.

mod envfile;
mod json;
mod yaml;

pub use envfile::EnvFileParser;
pub(crate) use envfile::parse_env_file_content;
pub use json::JsonParser;
pub use yaml::YamlParser;

use std::collections::BTreeMap;

use crate::error::ConfigError;
use crate::value::{
    BytesDecoder, ConfigContent, ConfigType, ConfigValue, SecretsSpecifier, StringParsing,
};

/// Options applied while parsing a snapshot.
#[derive(Clone, Debug, Default)]
pub struct ParseOptions {
    /// Decoder used when a string value is later read as bytes.
    pub bytes_decoder: BytesDecoder,

    /// Which provider-native keys hold secret values.
    pub secrets: SecretsSpecifier<String>,

    /// Array separator for string-native formats (env files).
    pub string_parsing: StringParsing,
}

/// Parses raw file bytes into a flattened key/value table.
pub trait SnapshotParser: Send + Sync {
    /// Format name used in error messages ("JSON", "YAML", "env file").
    fn format_name(&self) -> &'static str;

    /// Parses `bytes` under `options`.
    fn parse(&self, bytes: &[u8], options: &ParseOptions) -> Result<ParsedTable, ConfigError>;
}

/// How stored entries adapt to the requested type at lookup time.
#[derive(Clone, Debug)]
pub(crate) enum Adaptation {
    /// Entries carry their parsed native type; lookups are tag-exact, with
    /// two sanctioned bridges: string content read as bytes decodes through
    /// the configured decoder, and an empty array satisfies any array type.
    Typed { bytes_decoder: BytesDecoder },

    /// Entries are raw strings (env files); lookups parse on demand with
    /// the shared string grammar.
    StringNative(StringParsing),
}

/// An immutable flattened key/value table produced by a parser.
#[derive(Clone, Debug)]
pub struct ParsedTable {
    entries: BTreeMap<String, ConfigValue>,
    adaptation: Adaptation,
}

impl ParsedTable {
    pub(crate) fn new(entries: BTreeMap<String, ConfigValue>, adaptation: Adaptation) -> Self {
        Self {
            entries,
            adaptation,
        }
    }

    /// An empty table (used for optional missing files).
    #[must_use]
    pub fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
            adaptation: Adaptation::Typed {
                bytes_decoder: BytesDecoder::Base64,
            },
        }
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates the flattened (encoded) keys.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// The stored entry for an encoded key, untouched by type adaptation.
    ///
    /// Change detection compares these structurally so that equality never
    /// depends on whether a requested conversion would succeed.
    pub(crate) fn raw_entry(&self, encoded_key: &str) -> Option<&ConfigValue> {
        self.entries.get(encoded_key)
    }

    /// Looks up an encoded key, adapting the stored entry to `ty`.
    ///
    /// `Ok(None)` means the key is absent; a present entry that cannot
    /// satisfy `ty` is a [`ConfigError::NotConvertible`].
    pub fn lookup(
        &self,
        encoded_key: &str,
        ty: ConfigType,
    ) -> Result<Option<ConfigValue>, ConfigError> {
        let Some(stored) = self.entries.get(encoded_key) else {
            return Ok(None);
        };

        let not_convertible = || ConfigError::NotConvertible {
            name: encoded_key.to_string(),
            requested: ty,
        };

        let content = match &self.adaptation {
            Adaptation::Typed { bytes_decoder } => {
                adapt_typed(stored.content(), ty, *bytes_decoder).ok_or_else(not_convertible)?
            }

            Adaptation::StringNative(parsing) => {
                let raw = stored.content().as_str().map_err(|_| not_convertible())?;
                ConfigContent::parse(raw, ty, parsing).ok_or_else(not_convertible)?
            }
        };

        let value = ConfigValue::new(content);
        Ok(Some(if stored.is_secret() {
            value.marked_secret()
        } else {
            value
        }))
    }
}

/// Tag-exact adaptation with the string-to-bytes and empty-array bridges.
fn adapt_typed(
    stored: &ConfigContent,
    requested: ConfigType,
    bytes_decoder: BytesDecoder,
) -> Option<ConfigContent> {
    if stored.ty() == requested {
        return Some(stored.clone());
    }

    match (stored, requested) {
        (ConfigContent::String(s), ConfigType::Bytes) => {
            bytes_decoder.decode(s).map(ConfigContent::Bytes)
        }

        (ConfigContent::StringArray(a), ConfigType::ByteChunkArray) => a
            .iter()
            .map(|s| bytes_decoder.decode(s))
            .collect::<Option<Vec<_>>>()
            .map(ConfigContent::ByteChunkArray),

        _ => {
            if is_empty_array(stored) {
                empty_array_of(requested)
            } else {
                None
            }
        }
    }
}

fn is_empty_array(content: &ConfigContent) -> bool {
    match content {
        ConfigContent::StringArray(a) => a.is_empty(),
        ConfigContent::IntArray(a) => a.is_empty(),
        ConfigContent::DoubleArray(a) => a.is_empty(),
        ConfigContent::BoolArray(a) => a.is_empty(),
        ConfigContent::ByteChunkArray(a) => a.is_empty(),
        _ => false,
    }
}

fn empty_array_of(ty: ConfigType) -> Option<ConfigContent> {
    match ty {
        ConfigType::StringArray => Some(ConfigContent::StringArray(Vec::new())),
        ConfigType::IntArray => Some(ConfigContent::IntArray(Vec::new())),
        ConfigType::DoubleArray => Some(ConfigContent::DoubleArray(Vec::new())),
        ConfigType::BoolArray => Some(ConfigContent::BoolArray(Vec::new())),
        ConfigType::ByteChunkArray => Some(ConfigContent::ByteChunkArray(Vec::new())),
        _ => None,
    }
}

/// Applies the secrets specifier and inserts a flattened entry.
pub(crate) fn insert_entry(
    entries: &mut BTreeMap<String, ConfigValue>,
    key: String,
    content: ConfigContent,
    secrets: &SecretsSpecifier<String>,
) {
    let raw_witness = content.to_string();
    let value = if secrets.is_secret(&key, &raw_witness) {
        ConfigValue::secret(content)
    } else {
        ConfigValue::new(content)
    };
    entries.insert(key, value);
}

/// Joins a parent path and a child key into a flattened dot key.
pub(crate) fn join_key(parent: &str, child: &str) -> String {
    if parent.is_empty() {
        child.to_string()
    } else {
        format!("{parent}.{child}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_table() {
        let table = ParsedTable::empty();
        assert!(table.is_empty());
        assert_eq!(table.lookup("anything", ConfigType::String).unwrap(), None);
    }

    #[test]
    fn test_typed_lookup_tag_exact() {
        let mut entries = BTreeMap::new();
        entries.insert("port".to_string(), ConfigValue::from(8080i64));
        let table = ParsedTable::new(
            entries,
            Adaptation::Typed {
                bytes_decoder: BytesDecoder::Base64,
            },
        );

        let value = table.lookup("port", ConfigType::Int).unwrap().unwrap();
        assert_eq!(*value.content().as_int().unwrap(), 8080);

        let err = table.lookup("port", ConfigType::String).unwrap_err();
        assert!(matches!(err, ConfigError::NotConvertible { .. }));
    }

    #[test]
    fn test_typed_string_reads_as_bytes() {
        let mut entries = BTreeMap::new();
        entries.insert("cert".to_string(), ConfigValue::from("AQID"));
        let table = ParsedTable::new(
            entries,
            Adaptation::Typed {
                bytes_decoder: BytesDecoder::Base64,
            },
        );

        let value = table.lookup("cert", ConfigType::Bytes).unwrap().unwrap();
        assert_eq!(value.content().as_bytes().unwrap(), [1, 2, 3]);
    }

    #[test]
    fn test_empty_array_satisfies_any_array_type() {
        let mut entries = BTreeMap::new();
        entries.insert(
            "tags".to_string(),
            ConfigValue::new(ConfigContent::StringArray(Vec::new())),
        );
        let table = ParsedTable::new(
            entries,
            Adaptation::Typed {
                bytes_decoder: BytesDecoder::Base64,
            },
        );

        let value = table.lookup("tags", ConfigType::IntArray).unwrap().unwrap();
        assert_eq!(value.content().as_int_array().unwrap().len(), 0);
    }

    #[test]
    fn test_string_native_parses_on_demand() {
        let mut entries = BTreeMap::new();
        entries.insert("retries".to_string(), ConfigValue::from("3"));
        let table = ParsedTable::new(
            entries,
            Adaptation::StringNative(StringParsing::default()),
        );

        let value = table.lookup("retries", ConfigType::Int).unwrap().unwrap();
        assert_eq!(*value.content().as_int().unwrap(), 3);

        let err = table.lookup("retries", ConfigType::Bool).unwrap_err();
        assert!(matches!(err, ConfigError::NotConvertible { .. }));
    }

    #[test]
    fn test_secret_flag_survives_lookup() {
        let mut entries = BTreeMap::new();
        entries.insert(
            "token".to_string(),
            ConfigValue::secret(ConfigContent::String("t".into())),
        );
        let table = ParsedTable::new(
            entries,
            Adaptation::Typed {
                bytes_decoder: BytesDecoder::Base64,
            },
        );

        let value = table.lookup("token", ConfigType::String).unwrap().unwrap();
        assert!(value.is_secret());
    }
}
