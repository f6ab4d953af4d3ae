//! Directory-of-files provider.
//!
//! Reads a non-recursive directory listing where each regular file is one
//! configuration value - the layout used by mounted secret volumes. File
//! names are the encoded keys; hidden files are skipped. Contents are
//! UTF-8 (trimmed) for non-byte types and raw bytes for `bytes`. Every
//! value defaults to secret, matching what such mounts usually hold.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use super::{ConfigProvider, ConfigSnapshot};
use crate::error::ConfigError;
use crate::fs::FileSystem;
use crate::key::AbsoluteConfigKey;
use crate::key::encoding::KeyEncoder;
use crate::value::{
    BytesDecoder, ConfigContent, ConfigType, ConfigValue, LookupResult, SecretsSpecifier,
    StringParsing,
};

/// Provider over a directory of single-value files.
#[derive(Clone)]
pub struct DirectoryFilesProvider {
    name: String,
    files: Arc<BTreeMap<String, Vec<u8>>>,
    parsing: StringParsing,
    secrets: SecretsSpecifier<String>,
}

struct DirectorySnapshot {
    name: String,
    files: Arc<BTreeMap<String, Vec<u8>>>,
    parsing: StringParsing,
    secrets: SecretsSpecifier<String>,
}

/// Construction options for [`DirectoryFilesProvider`].
#[derive(Clone, Debug)]
pub struct DirectoryOptions {
    /// Array separator (default `,`).
    pub separator: String,

    /// Bytes decoder for `byte-chunk-array` elements (default base64).
    pub bytes_decoder: BytesDecoder,

    /// Secrets specifier over file names (default `All`).
    pub secrets: SecretsSpecifier<String>,
}

impl Default for DirectoryOptions {
    fn default() -> Self {
        Self {
            separator: ",".to_string(),
            bytes_decoder: BytesDecoder::Base64,
            secrets: SecretsSpecifier::All,
        }
    }
}

impl DirectoryFilesProvider {
    /// Reads the directory through `fs` and snapshots its files.
    ///
    /// # Errors
    ///
    /// Fails when the path is not a directory or a listed file cannot be
    /// read.
    pub async fn load(
        fs: &dyn FileSystem,
        path: impl AsRef<Path>,
        options: DirectoryOptions,
    ) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let names = fs.list_file_names(path).await?;

        let mut files = BTreeMap::new();
        for name in names {
            let contents = fs.file_contents(&path.join(&name)).await?;
            files.insert(name, contents);
        }

        Ok(Self {
            name: format!("directory[{}]", path.display()),
            files: Arc::new(files),
            parsing: StringParsing {
                separator: options.separator,
                bytes_decoder: options.bytes_decoder,
            },
            secrets: options.secrets,
        })
    }

    /// Number of files snapshotted.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether the directory snapshot is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

fn lookup_in(
    files: &BTreeMap<String, Vec<u8>>,
    parsing: &StringParsing,
    secrets: &SecretsSpecifier<String>,
    key: &AbsoluteConfigKey,
    ty: ConfigType,
) -> Result<LookupResult, ConfigError> {
    let encoded = KeyEncoder::directory_file().encode(key);

    let Some(raw) = files.get(&encoded) else {
        return Ok(LookupResult::miss(encoded));
    };

    let not_convertible = || ConfigError::NotConvertible {
        name: encoded.clone(),
        requested: ty,
    };

    let content = if ty == ConfigType::Bytes {
        ConfigContent::Bytes(raw.clone())
    } else {
        let text = std::str::from_utf8(raw).map_err(|_| not_convertible())?;
        ConfigContent::parse(text.trim(), ty, parsing).ok_or_else(not_convertible)?
    };

    let witness = String::from_utf8_lossy(raw);
    let value = if secrets.is_secret(&encoded, &witness) {
        ConfigValue::secret(content)
    } else {
        ConfigValue::new(content)
    };

    Ok(LookupResult::hit(encoded, value))
}

impl ConfigSnapshot for DirectorySnapshot {
    fn name(&self) -> &str {
        &self.name
    }

    fn value(
        &self,
        key: &AbsoluteConfigKey,
        ty: ConfigType,
    ) -> Result<LookupResult, ConfigError> {
        lookup_in(&self.files, &self.parsing, &self.secrets, key, ty)
    }
}

impl ConfigProvider for DirectoryFilesProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn value(
        &self,
        key: &AbsoluteConfigKey,
        ty: ConfigType,
    ) -> Result<LookupResult, ConfigError> {
        lookup_in(&self.files, &self.parsing, &self.secrets, key, ty)
    }

    fn snapshot(&self) -> Arc<dyn ConfigSnapshot> {
        Arc::new(DirectorySnapshot {
            name: self.name.clone(),
            files: self.files.clone(),
            parsing: self.parsing.clone(),
            secrets: self.secrets.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::InMemoryFileSystem;
    use std::time::SystemTime;

    fn key(s: &str) -> AbsoluteConfigKey {
        AbsoluteConfigKey::from(s)
    }

    async fn provider_with(files: &[(&str, &[u8])]) -> DirectoryFilesProvider {
        let fs = InMemoryFileSystem::new();
        for (name, contents) in files {
            fs.write_file(
                format!("/secrets/{name}"),
                contents.to_vec(),
                SystemTime::UNIX_EPOCH,
            );
        }
        DirectoryFilesProvider::load(&fs, "/secrets", DirectoryOptions::default())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_file_contents_trimmed_for_strings() {
        let provider = provider_with(&[("db-password", b"hunter2\n")]).await;

        let result = provider
            .value(&key("db.password"), ConfigType::String)
            .unwrap();
        assert_eq!(result.encoded_key, "db-password");

        let value = result.value.unwrap();
        assert!(value.is_secret());
        assert_eq!(value.content().as_str().unwrap(), "hunter2");
    }

    #[tokio::test]
    async fn test_bytes_returned_raw() {
        let provider = provider_with(&[("blob", &[0u8, 159, 146, 150])]).await;

        let result = provider.value(&key("blob"), ConfigType::Bytes).unwrap();
        assert_eq!(
            result.value.unwrap().content().as_bytes().unwrap(),
            [0u8, 159, 146, 150]
        );
    }

    #[tokio::test]
    async fn test_special_characters_encode_to_underscore() {
        let provider = provider_with(&[("tls-ca_crt", b"pem")]).await;

        let ca_key = key("tls").append(&crate::key::ConfigKey::new(["ca.crt"]));
        let result = provider.value(&ca_key, ConfigType::String).unwrap();
        assert_eq!(result.encoded_key, "tls-ca_crt");
        assert!(result.value.is_some());
    }

    #[tokio::test]
    async fn test_empty_directory_is_empty_snapshot() {
        let fs = InMemoryFileSystem::new();
        fs.write_file("/other/file", b"x".to_vec(), SystemTime::UNIX_EPOCH);

        let provider =
            DirectoryFilesProvider::load(&fs, "/secrets", DirectoryOptions::default())
                .await
                .unwrap();
        assert!(provider.is_empty());

        let result = provider.value(&key("anything"), ConfigType::String).unwrap();
        assert!(result.value.is_none());
    }

    #[tokio::test]
    async fn test_non_secret_option() {
        let fs = InMemoryFileSystem::new();
        fs.write_file("/conf/mode", b"fast".to_vec(), SystemTime::UNIX_EPOCH);

        let provider = DirectoryFilesProvider::load(
            &fs,
            "/conf",
            DirectoryOptions {
                secrets: SecretsSpecifier::None,
                ..DirectoryOptions::default()
            },
        )
        .await
        .unwrap();

        let result = provider.value(&key("mode"), ConfigType::String).unwrap();
        assert!(!result.value.unwrap().is_secret());
    }
}
