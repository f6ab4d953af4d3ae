//! Environment variable provider.
//!
//! Reads a snapshot of the process environment (or a supplied map) at
//! construction, with optional `.env` file loading. Values are strings;
//! typed reads parse on demand with the shared string grammar. Keys encode
//! as `SCREAMING_SNAKE` with camelCase boundaries split.
//!
//! # Example
//!
//! ```rust,no_run
//! use confstack::provider::EnvVarsProvider;
//!
//! // Snapshot of the process environment, .env filling the gaps.
//! let provider = EnvVarsProvider::from_process()
//!     .load_env_file_optional(".env")
//!     .expect("readable .env");
//! ```

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use super::{ConfigProvider, ConfigSnapshot};
use crate::error::ConfigError;
use crate::key::AbsoluteConfigKey;
use crate::key::encoding::KeyEncoder;
use crate::parser::parse_env_file_content;
use crate::value::{
    BytesDecoder, ConfigContent, ConfigType, ConfigValue, LookupResult, SecretsSpecifier,
    StringParsing,
};

/// Provider over environment-style `NAME=value` tables.
#[derive(Clone, Debug)]
pub struct EnvVarsProvider {
    entries: Arc<HashMap<String, String>>,
    parsing: StringParsing,
    secrets: SecretsSpecifier<String>,
}

struct EnvSnapshot {
    entries: Arc<HashMap<String, String>>,
    parsing: StringParsing,
    secrets: SecretsSpecifier<String>,
}

fn lookup_in(
    entries: &HashMap<String, String>,
    parsing: &StringParsing,
    secrets: &SecretsSpecifier<String>,
    key: &AbsoluteConfigKey,
    ty: ConfigType,
) -> Result<LookupResult, ConfigError> {
    let encoded = KeyEncoder::screaming_snake().encode(key);

    let Some(raw) = entries.get(&encoded) else {
        return Ok(LookupResult::miss(encoded));
    };

    let content = ConfigContent::parse(raw, ty, parsing).ok_or(ConfigError::NotConvertible {
        name: encoded.clone(),
        requested: ty,
    })?;

    let value = if secrets.is_secret(&encoded, raw) {
        ConfigValue::secret(content)
    } else {
        ConfigValue::new(content)
    };

    Ok(LookupResult::hit(encoded, value))
}

impl EnvVarsProvider {
    /// Snapshots the process environment.
    #[must_use]
    pub fn from_process() -> Self {
        Self::with_values(std::env::vars())
    }

    /// Builds the provider over a supplied variable map.
    pub fn with_values<I, K, V>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: Arc::new(
                values
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
            parsing: StringParsing::default(),
            secrets: SecretsSpecifier::None,
        }
    }

    /// Loads a `.env` file; file entries do not override variables already
    /// present.
    ///
    /// # Errors
    ///
    /// Returns an error if the file does not exist or cannot be read.
    pub fn load_env_file(mut self, path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound {
                    path: path.to_path_buf(),
                }
            } else {
                ConfigError::io(path, &e)
            }
        })?;

        let entries = Arc::make_mut(&mut self.entries);
        for (key, value) in parse_env_file_content(&content) {
            entries.entry(key).or_insert(value);
        }

        Ok(self)
    }

    /// Like [`load_env_file`](Self::load_env_file), but a missing file is
    /// not an error.
    pub fn load_env_file_optional(self, path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        if !path.as_ref().exists() {
            return Ok(self);
        }
        self.load_env_file(path)
    }

    /// Sets the array separator (default `,`).
    #[must_use]
    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.parsing.separator = separator.into();
        self
    }

    /// Sets the bytes decoder (default base64).
    #[must_use]
    pub fn with_bytes_decoder(mut self, decoder: BytesDecoder) -> Self {
        self.parsing.bytes_decoder = decoder;
        self
    }

    /// Sets the secrets specifier, evaluated against encoded variable names.
    #[must_use]
    pub fn with_secrets(mut self, secrets: SecretsSpecifier<String>) -> Self {
        self.secrets = secrets;
        self
    }
}

impl ConfigSnapshot for EnvSnapshot {
    fn name(&self) -> &str {
        "environment"
    }

    fn value(
        &self,
        key: &AbsoluteConfigKey,
        ty: ConfigType,
    ) -> Result<LookupResult, ConfigError> {
        lookup_in(&self.entries, &self.parsing, &self.secrets, key, ty)
    }
}

impl ConfigProvider for EnvVarsProvider {
    fn name(&self) -> &str {
        "environment"
    }

    fn value(
        &self,
        key: &AbsoluteConfigKey,
        ty: ConfigType,
    ) -> Result<LookupResult, ConfigError> {
        lookup_in(&self.entries, &self.parsing, &self.secrets, key, ty)
    }

    fn snapshot(&self) -> Arc<dyn ConfigSnapshot> {
        Arc::new(EnvSnapshot {
            entries: self.entries.clone(),
            parsing: self.parsing.clone(),
            secrets: self.secrets.clone(),
        })
    }
}
