//! JSON snapshot parser.

use std::collections::BTreeMap;

use serde_json::Value;

use super::{Adaptation, ParseOptions, ParsedTable, SnapshotParser, insert_entry, join_key};
use crate::error::ConfigError;
use crate::value::{ConfigContent, ConfigValue};

/// Parses JSON documents into flattened snapshots.
///
/// The document root must be an object. Nested objects flatten into
/// dot-separated keys; arrays must be homogeneous over a single scalar
/// shape. An array mixing integers and floats is read as a double array.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonParser;

impl JsonParser {
    /// Creates the parser.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl SnapshotParser for JsonParser {
    fn format_name(&self) -> &'static str {
        "JSON"
    }

    fn parse(&self, bytes: &[u8], options: &ParseOptions) -> Result<ParsedTable, ConfigError> {
        let root: Value = serde_json::from_slice(bytes).map_err(|e| ConfigError::Parse {
            format: self.format_name(),
            message: e.to_string(),
        })?;

        let Value::Object(map) = root else {
            return Err(ConfigError::TopLevelNotMapping {
                format: self.format_name(),
            });
        };

        let mut entries = BTreeMap::new();
        flatten_object(&map, "", &mut entries, options)?;

        Ok(ParsedTable::new(
            entries,
            Adaptation::Typed {
                bytes_decoder: options.bytes_decoder,
            },
        ))
    }
}

fn flatten_object(
    map: &serde_json::Map<String, Value>,
    parent: &str,
    entries: &mut BTreeMap<String, ConfigValue>,
    options: &ParseOptions,
) -> Result<(), ConfigError> {
    for (child, value) in map {
        let key = join_key(parent, child);

        match value {
            Value::Object(nested) => flatten_object(nested, &key, entries, options)?,

            Value::Array(items) => {
                let content = array_content(items, &key)?;
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
                    detail: format!("number {n} does not fit int or double"),
                })
            }
        }

        Value::Null => Err(ConfigError::UnsupportedPrimitive {
            key: key.to_string(),
            detail: "null".to_string(),
        }),

        Value::Array(_) | Value::Object(_) => Err(ConfigError::UnsupportedPrimitive {
            key: key.to_string(),
            detail: "nested container where a scalar was expected".to_string(),
        }),
    }
}

/// Element shapes an array can settle into while scanning.
enum ArrayShape {
    Strings(Vec<String>),
    Ints(Vec<i64>),
    Doubles(Vec<f64>),
    Bools(Vec<bool>),
}

fn array_content(items: &[Value], key: &str) -> Result<ConfigContent, ConfigError> {
    // Typed empty-array state: an empty array is accepted and satisfies any
    // requested array type at lookup time.
    if items.is_empty() {
        return Ok(ConfigContent::StringArray(Vec::new()));
    }

    let heterogeneous = || ConfigError::HeterogeneousArray {
        key: key.to_string(),
    };

    let mut shape: Option<ArrayShape> = None;

    for item in items {
        match item {
            Value::String(s) => match &mut shape {
                None => shape = Some(ArrayShape::Strings(vec![s.clone()])),
                Some(ArrayShape::Strings(acc)) => acc.push(s.clone()),
                Some(_) => return Err(heterogeneous()),
            },

            Value::Bool(b) => match &mut shape {
                None => shape = Some(ArrayShape::Bools(vec![*b])),
                Some(ArrayShape::Bools(acc)) => acc.push(*b),
                Some(_) => return Err(heterogeneous()),
            },

            Value::Number(n) => {
                let as_int = n.as_i64();
                let as_double = n.as_f64();

                match (&mut shape, as_int, as_double) {
                    (None, Some(i), _) => shape = Some(ArrayShape::Ints(vec![i])),
                    (None, None, Some(d)) => shape = Some(ArrayShape::Doubles(vec![d])),

                    (Some(ArrayShape::Ints(acc)), Some(i), _) => acc.push(i),
                    // An int array widens to doubles when a float shows up.
                    (Some(ArrayShape::Ints(acc)), None, Some(d)) => {
                        let mut widened: Vec<f64> = acc.iter().map(|i| *i as f64).collect();
                        widened.push(d);
                        shape = Some(ArrayShape::Doubles(widened));
                    }
                    (Some(ArrayShape::Doubles(acc)), _, Some(d)) => acc.push(d),

                    (Some(_), _, _) => return Err(heterogeneous()),

                    (None, None, None) => {
                        return Err(ConfigError::UnsupportedPrimitive {
                            key: key.to_string(),
                            detail: format!("number {n} does not fit int or double"),
                        });
                    }
                }
            }

            Value::Null | Value::Array(_) | Value::Object(_) => {
                return Err(ConfigError::UnsupportedPrimitive {
                    key: key.to_string(),
                    detail: "array elements must be scalars".to_string(),
                });
            }
        }
    }

    Ok(match shape {
        Some(ArrayShape::Strings(a)) => ConfigContent::StringArray(a),
        Some(ArrayShape::Ints(a)) => ConfigContent::IntArray(a),
        Some(ArrayShape::Doubles(a)) => ConfigContent::DoubleArray(a),
        Some(ArrayShape::Bools(a)) => ConfigContent::BoolArray(a),
        None => ConfigContent::StringArray(Vec::new()),
    })
}
