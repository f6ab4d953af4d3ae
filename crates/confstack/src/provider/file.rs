//! File-backed provider.
//!
//! Loads and parses a configuration file once at construction into an
//! immutable snapshot. For live reloads use
//! [`ReloadingFileProvider`](super::ReloadingFileProvider).

use std::path::Path;
use std::sync::Arc;

use super::{ConfigProvider, ConfigSnapshot};
use crate::error::ConfigError;
use crate::fs::FileSystem;
use crate::key::AbsoluteConfigKey;
use crate::key::encoding::KeyEncoder;
use crate::parser::{ParseOptions, ParsedTable, SnapshotParser};
use crate::value::{ConfigType, LookupResult};

/// A snapshot over a parsed, flattened key table.
///
/// Shared by [`FileBackedProvider`] and the reloading provider; lookups
/// encode keys dot-separated.
pub struct ParsedSnapshot {
    name: String,
    table: Arc<ParsedTable>,
}

impl ParsedSnapshot {
    pub(crate) fn new(name: impl Into<String>, table: Arc<ParsedTable>) -> Self {
        Self {
            name: name.into(),
            table,
        }
    }
}

impl ConfigSnapshot for ParsedSnapshot {
    fn name(&self) -> &str {
        &self.name
    }

    fn value(
        &self,
        key: &AbsoluteConfigKey,
        ty: ConfigType,
    ) -> Result<LookupResult, ConfigError> {
        let encoded = KeyEncoder::dot_separated().encode(key);
        let value = self.table.lookup(&encoded, ty)?;
        Ok(LookupResult {
            encoded_key: encoded,
            value,
        })
    }
}

/// Provider over a configuration file parsed once.
pub struct FileBackedProvider {
    snapshot: Arc<ParsedSnapshot>,
}

impl std::fmt::Debug for FileBackedProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileBackedProvider").finish_non_exhaustive()
    }
}

impl FileBackedProvider {
    /// Reads and parses the file through `fs`.
    ///
    /// # Errors
    ///
    /// Fails when the file is missing, unreadable, or does not parse.
    pub async fn load(
        fs: &dyn FileSystem,
        path: impl AsRef<Path>,
        parser: &dyn SnapshotParser,
        options: &ParseOptions,
    ) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let bytes = fs.file_contents(path).await?;
        let table = parser.parse(&bytes, options)?;

        Ok(Self::from_table(path, table))
    }

    /// Like [`load`](Self::load), but a missing file produces an empty
    /// snapshot.
    pub async fn load_optional(
        fs: &dyn FileSystem,
        path: impl AsRef<Path>,
        parser: &dyn SnapshotParser,
        options: &ParseOptions,
    ) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        match fs.file_contents(path).await {
            Ok(bytes) => {
                let table = parser.parse(&bytes, options)?;
                Ok(Self::from_table(path, table))
            }

            Err(ConfigError::FileNotFound { .. }) => {
                Ok(Self::from_table(path, ParsedTable::empty()))
            }

            Err(e) => Err(e),
        }
    }

    fn from_table(path: &Path, table: ParsedTable) -> Self {
        Self {
            snapshot: Arc::new(ParsedSnapshot::new(
                format!("file[{}]", path.display()),
                Arc::new(table),
            )),
        }
    }
}

impl ConfigProvider for FileBackedProvider {
    fn name(&self) -> &str {
        self.snapshot.name()
    }

    fn value(
        &self,
        key: &AbsoluteConfigKey,
        ty: ConfigType,
    ) -> Result<LookupResult, ConfigError> {
        self.snapshot.value(key, ty)
    }

    fn snapshot(&self) -> Arc<dyn ConfigSnapshot> {
        self.snapshot.clone()
    }
}
