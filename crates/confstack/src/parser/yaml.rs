//! YAML snapshot parser.

use std::collections::BTreeMap;

use serde_yaml::{Mapping, Value};

use super::{Adaptation, ParseOptions, ParsedTable, SnapshotParser, insert_entry, join_key};
use crate::error::ConfigError;
use crate::value::{ConfigContent, ConfigValue};

/// Parses YAML documents into flattened snapshots.
///
/// Same flattening rules as [`JsonParser`](super::JsonParser); mapping keys
/// must be strings, and tagged or null values are rejected.
#[derive(Clone, Copy, Debug, Default)]
pub struct YamlParser;

impl YamlParser {
    /// Creates the parser.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl SnapshotParser for YamlParser {
    fn format_name(&self) -> &'static str {
        "YAML"
    }

    fn parse(&self, bytes: &[u8], options: &ParseOptions) -> Result<ParsedTable, ConfigError> {
        let root: Value = serde_yaml::from_slice(bytes).map_err(|e| ConfigError::Parse {
            format: self.format_name(),
            message: e.to_string(),
        })?;

        let Value::Mapping(map) = root else {
            return Err(ConfigError::TopLevelNotMapping {
                format: self.format_name(),
            });
        };

        let mut entries = BTreeMap::new();
        flatten_mapping(&map, "", &mut entries, options)?;

        Ok(ParsedTable::new(
            entries,
            Adaptation::Typed {
                bytes_decoder: options.bytes_decoder,
            },
        ))
    }
}

fn flatten_mapping(
    map: &Mapping,
    parent: &str,
    entries: &mut BTreeMap<String, ConfigValue>,
    options: &ParseOptions,
) -> Result<(), ConfigError> {
    for (raw_key, value) in map {
        let Value::String(child) = raw_key else {
            return Err(ConfigError::KeyNotString {
                parent: parent.to_string(),
            });
        };

        let key = join_key(parent, child);

        match value {
            Value::Mapping(nested) => flatten_mapping(nested, &key, entries, options)?,

            Value::Sequence(items) => {
                let content = sequence_content(items, &key)?;
                insert_entry(entries, key, content, &options.secrets);
            }

            other => {
                let content = scalar_content(other, &key)?;
                insert_entry(entries, key, content, &options.secrets);
            }
        }
    }

    Ok(())
}

fn scalar_content(value: &Value, key: &str) -> Result<ConfigContent, ConfigError> {
    match value {
        Value::String(s) => Ok(ConfigContent::String(s.clone())),

        Value::Bool(b) => Ok(ConfigContent::Bool(*b)),

        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(ConfigContent::Int(i))
            } else if let Some(d) = n.as_f64() {
                Ok(ConfigContent::Double(d))
            } else {
                Err(ConfigError::UnsupportedPrimitive {
                    key: key.to_string(),
                    detail: format!("number {n:?} does not fit int or double"),
                })
            }
        }

        Value::Null => Err(ConfigError::UnsupportedPrimitive {
            key: key.to_string(),
            detail: "null".to_string(),
        }),

        Value::Tagged(tagged) => Err(ConfigError::UnsupportedPrimitive {
            key: key.to_string(),
            detail: format!("tagged value {}", tagged.tag),
        }),

        Value::Sequence(_) | Value::Mapping(_) => Err(ConfigError::UnsupportedPrimitive {
            key: key.to_string(),
            detail: "nested container where a scalar was expected".to_string(),
        }),
    }
}

enum SequenceShape {
    Strings(Vec<String>),
    Ints(Vec<i64>),
    Doubles(Vec<f64>),
    Bools(Vec<bool>),
}

fn sequence_content(items: &[Value], key: &str) -> Result<ConfigContent, ConfigError> {
    if items.is_empty() {
        return Ok(ConfigContent::StringArray(Vec::new()));
    }

    let heterogeneous = || ConfigError::HeterogeneousArray {
        key: key.to_string(),
    };

    let mut shape: Option<SequenceShape> = None;

    for item in items {
        match item {
            Value::String(s) => match &mut shape {
                None => shape = Some(SequenceShape::Strings(vec![s.clone()])),
                Some(SequenceShape::Strings(acc)) => acc.push(s.clone()),
                Some(_) => return Err(heterogeneous()),
            },

            Value::Bool(b) => match &mut shape {
                None => shape = Some(SequenceShape::Bools(vec![*b])),
                Some(SequenceShape::Bools(acc)) => acc.push(*b),
                Some(_) => return Err(heterogeneous()),
            },

            Value::Number(n) => {
                let as_int = n.as_i64();
                let as_double = n.as_f64();

                match (&mut shape, as_int, as_double) {
                    (None, Some(i), _) => shape = Some(SequenceShape::Ints(vec![i])),
                    (None, None, Some(d)) => shape = Some(SequenceShape::Doubles(vec![d])),

                    (Some(SequenceShape::Ints(acc)), Some(i), _) => acc.push(i),
                    (Some(SequenceShape::Ints(acc)), None, Some(d)) => {
                        let mut widened: Vec<f64> = acc.iter().map(|i| *i as f64).collect();
                        widened.push(d);
                        shape = Some(SequenceShape::Doubles(widened));
                    }
                    (Some(SequenceShape::Doubles(acc)), _, Some(d)) => acc.push(d),

                    (Some(_), _, _) => return Err(heterogeneous()),

                    (None, None, None) => {
                        return Err(ConfigError::UnsupportedPrimitive {
                            key: key.to_string(),
                            detail: format!("number {n:?} does not fit int or double"),
                        });
                    }
                }
            }

            _ => {
                return Err(ConfigError::UnsupportedPrimitive {
                    key: key.to_string(),
                    detail: "sequence elements must be scalars".to_string(),
                });
            }
        }
    }

    Ok(match shape {
        Some(SequenceShape::Strings(a)) => ConfigContent::StringArray(a),
        Some(SequenceShape::Ints(a)) => ConfigContent::IntArray(a),
        Some(SequenceShape::Doubles(a)) => ConfigContent::DoubleArray(a),
        Some(SequenceShape::Bools(a)) => ConfigContent::BoolArray(a),
        None => ConfigContent::StringArray(Vec::new()),
    })
}
