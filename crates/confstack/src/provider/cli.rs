//! Command-line argument provider.
//!
//! Tokenizes an argument vector into `--flag` / value groups at
//! construction. Flag naming conventions, help output, and validation stay
//! with the application's CLI layer; this provider only answers key lookups
//! against what was actually passed.
//!
//! # Tokenizer rules
//!
//! - the first argument (program name) is discarded;
//! - `--flag=value` attaches `value` to `--flag`;
//! - a bare `--flag` attaches every following non-`--` token as a value
//!   (zero tokens means "present, no argument");
//! - repeated occurrences of the same flag concatenate their values;
//! - any value containing the separator (default `,`) is further split,
//!   elements trimmed;
//! - tokens before the first `--flag` are ignored;
//! - a lone `-` is an ordinary value.

use std::collections::HashMap;
use std::sync::Arc;

use super::{ConfigProvider, ConfigSnapshot};
use crate::error::ConfigError;
use crate::key::AbsoluteConfigKey;
use crate::key::encoding::KeyEncoder;
use crate::value::{
    BytesDecoder, ConfigContent, ConfigType, ConfigValue, LookupResult, SecretsSpecifier,
    StringParsing,
};

/// Provider over tokenized command-line arguments.
#[derive(Clone)]
pub struct CliArgsProvider {
    flags: Arc<HashMap<String, Vec<String>>>,
    parsing: StringParsing,
    secrets: SecretsSpecifier<String>,
}

struct CliSnapshot {
    flags: Arc<HashMap<String, Vec<String>>>,
    parsing: StringParsing,
    secrets: SecretsSpecifier<String>,
}

impl CliArgsProvider {
    /// Tokenizes `std::env::args()`.
    #[must_use]
    pub fn from_process_args() -> Self {
        Self::with_args(std::env::args())
    }

    /// Tokenizes a supplied argument vector (program name first).
    pub fn with_args<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_args_and_separator(args, ",")
    }

    /// Tokenizes with a custom value separator.
    pub fn with_args_and_separator<I, S>(args: I, separator: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let separator = separator.into();
        let flags = tokenize(args.into_iter().map(Into::into), &separator);

        Self {
            flags: Arc::new(flags),
            parsing: StringParsing {
                separator,
                ..StringParsing::default()
            },
            secrets: SecretsSpecifier::None,
        }
    }

    /// Sets the bytes decoder (default base64).
    #[must_use]
    pub fn with_bytes_decoder(mut self, decoder: BytesDecoder) -> Self {
        self.parsing.bytes_decoder = decoder;
        self
    }

    /// Sets the secrets specifier, evaluated against `--flag` names.
    #[must_use]
    pub fn with_secrets(mut self, secrets: SecretsSpecifier<String>) -> Self {
        self.secrets = secrets;
        self
    }
}

fn tokenize(args: impl Iterator<Item = String>, separator: &str) -> HashMap<String, Vec<String>> {
    let mut flags: HashMap<String, Vec<String>> = HashMap::new();
    let mut current: Option<String> = None;

    // Skip the program name.
    for token in args.skip(1) {
        if let Some(rest) = token.strip_prefix("--") {
            if let Some((flag, value)) = rest.split_once('=') {
                let entry = flags.entry(format!("--{flag}")).or_default();
                entry.extend(split_value(value, separator));
                current = None;
            } else {
                let flag = format!("--{rest}");
                flags.entry(flag.clone()).or_default();
                current = Some(flag);
            }
        } else if let Some(flag) = &current
            && let Some(values) = flags.get_mut(flag)
        {
            values.extend(split_value(&token, separator));
        }
        // Tokens before the first flag fall through and are ignored.
    }

    flags
}

fn split_value(value: &str, separator: &str) -> Vec<String> {
    if value.contains(separator) {
        value
            .split(separator)
            .map(|e| e.trim().to_string())
            .collect()
    } else {
        vec![value.to_string()]
    }
}

fn lookup_in(
    flags: &HashMap<String, Vec<String>>,
    parsing: &StringParsing,
    secrets: &SecretsSpecifier<String>,
    key: &AbsoluteConfigKey,
    ty: ConfigType,
) -> Result<LookupResult, ConfigError> {
    let encoded = KeyEncoder::cli_flag().encode(key);

    let Some(values) = flags.get(&encoded) else {
        return Ok(LookupResult::miss(encoded));
    };

    let not_convertible = || ConfigError::NotConvertible {
        name: encoded.clone(),
        requested: ty,
    };

    let content = match ty {
        ConfigType::String
        | ConfigType::Int
        | ConfigType::Double
        | ConfigType::Bool
        | ConfigType::Bytes => {
            // A flag without argument answers scalar reads as a miss.
            match values.as_slice() {
                [] => return Ok(LookupResult::miss(encoded)),
                [single] => {
                    ConfigContent::parse(single, ty, parsing).ok_or_else(not_convertible)?
                }
                _ => return Err(not_convertible()),
            }
        }

        ConfigType::StringArray => ConfigContent::StringArray(values.clone()),

        ConfigType::IntArray => values
            .iter()
            .map(|v| v.parse::<i64>().ok())
            .collect::<Option<Vec<_>>>()
            .map(ConfigContent::IntArray)
            .ok_or_else(not_convertible)?,

        ConfigType::DoubleArray => values
            .iter()
            .map(|v| v.parse::<f64>().ok())
            .collect::<Option<Vec<_>>>()
            .map(ConfigContent::DoubleArray)
            .ok_or_else(not_convertible)?,

        ConfigType::BoolArray => values
            .iter()
            .map(|v| {
                ConfigContent::parse(v, ConfigType::Bool, parsing).and_then(|c| match c {
                    ConfigContent::Bool(b) => Some(b),
                    _ => None,
                })
            })
            .collect::<Option<Vec<_>>>()
            .map(ConfigContent::BoolArray)
            .ok_or_else(not_convertible)?,

        ConfigType::ByteChunkArray => values
            .iter()
            .map(|v| parsing.bytes_decoder.decode(v))
            .collect::<Option<Vec<_>>>()
            .map(ConfigContent::ByteChunkArray)
            .ok_or_else(not_convertible)?,
    };

    let raw_witness = values.join(&parsing.separator);
    let value = if secrets.is_secret(&encoded, &raw_witness) {
        ConfigValue::secret(content)
    } else {
        ConfigValue::new(content)
    };

    Ok(LookupResult::hit(encoded, value))
}

impl ConfigSnapshot for CliSnapshot {
    fn name(&self) -> &str {
        "cli-arguments"
    }

    fn value(
        &self,
        key: &AbsoluteConfigKey,
        ty: ConfigType,
    ) -> Result<LookupResult, ConfigError> {
        lookup_in(&self.flags, &self.parsing, &self.secrets, key, ty)
    }
}

impl ConfigProvider for CliArgsProvider {
    fn name(&self) -> &str {
        "cli-arguments"
    }

    fn value(
        &self,
        key: &AbsoluteConfigKey,
        ty: ConfigType,
    ) -> Result<LookupResult, ConfigError> {
        lookup_in(&self.flags, &self.parsing, &self.secrets, key, ty)
    }

    fn snapshot(&self) -> Arc<dyn ConfigSnapshot> {
        Arc::new(CliSnapshot {
            flags: self.flags.clone(),
            parsing: self.parsing.clone(),
            secrets: self.secrets.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(args: &[&str]) -> CliArgsProvider {
        let mut full = vec!["prog"];
        full.extend(args);
        CliArgsProvider::with_args(full)
    }

    fn key(s: &str) -> AbsoluteConfigKey {
        AbsoluteConfigKey::from(s)
    }

    #[test]
    fn test_equals_form() {
        let provider = provider(&["--db-host=localhost"]);
        let result = provider
            .value(&key("db.host"), ConfigType::String)
            .unwrap();
        assert_eq!(result.encoded_key, "--db-host");
        assert_eq!(
            result.value.unwrap().content().as_str().unwrap(),
            "localhost"
        );
    }

    #[test]
    fn test_space_separated_values() {
        let provider = provider(&["--hosts", "a", "b", "c"]);
        let result = provider
            .value(&key("hosts"), ConfigType::StringArray)
            .unwrap();
        assert_eq!(
            result.value.unwrap().content().as_string_array().unwrap(),
            ["a", "b", "c"]
        );
    }

    #[test]
    fn test_separator_splits_values() {
        let provider = provider(&["--ports=80,443"]);
        let result = provider.value(&key("ports"), ConfigType::IntArray).unwrap();
        assert_eq!(
            result.value.unwrap().content().as_int_array().unwrap(),
            [80, 443]
        );
    }

    #[test]
    fn test_repeated_flags_concatenate() {
        let provider = provider(&["--tag", "a", "--tag", "b,c"]);
        let result = provider
            .value(&key("tag"), ConfigType::StringArray)
            .unwrap();
        assert_eq!(
            result.value.unwrap().content().as_string_array().unwrap(),
            ["a", "b", "c"]
        );
    }

    #[test]
    fn test_flag_equals_empty_is_one_empty_value() {
        let provider = provider(&["--opt="]);
        let result = provider
            .value(&key("opt"), ConfigType::StringArray)
            .unwrap();
        assert_eq!(
            result.value.unwrap().content().as_string_array().unwrap(),
            [""]
        );
    }

    #[test]
    fn test_bare_flag_is_present_with_empty_list() {
        let provider = provider(&["--verbose"]);

        let arr = provider
            .value(&key("verbose"), ConfigType::StringArray)
            .unwrap();
        assert_eq!(
            arr.value.unwrap().content().as_string_array().unwrap().len(),
            0
        );

        // Scalar reads see no argument.
        let scalar = provider.value(&key("verbose"), ConfigType::String).unwrap();
        assert!(scalar.value.is_none());
    }

    #[test]
    fn test_leading_positionals_ignored() {
        let provider = provider(&["stray", "value", "--real=1"]);
        assert!(
            provider
                .value(&key("real"), ConfigType::Int)
                .unwrap()
                .value
                .is_some()
        );
        assert!(
            provider
                .value(&key("stray"), ConfigType::String)
                .unwrap()
                .value
                .is_none()
        );
    }

    #[test]
    fn test_lone_dash_is_a_value() {
        let provider = provider(&["--input", "-"]);
        let result = provider.value(&key("input"), ConfigType::String).unwrap();
        assert_eq!(result.value.unwrap().content().as_str().unwrap(), "-");
    }

    #[test]
    fn test_camel_case_lookup() {
        let provider = provider(&["--pool-size=4"]);
        let result = provider.value(&key("poolSize"), ConfigType::Int).unwrap();
        assert_eq!(*result.value.unwrap().content().as_int().unwrap(), 4);
    }

    #[test]
    fn test_multi_value_scalar_read_errors() {
        let provider = provider(&["--x", "1", "2"]);
        let err = provider.value(&key("x"), ConfigType::Int).unwrap_err();
        assert!(matches!(err, ConfigError::NotConvertible { .. }));
    }
}
