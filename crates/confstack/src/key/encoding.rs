//! Deterministic key encoding and decoding.
//!
//! Every provider serializes an [`AbsoluteConfigKey`] into its native string
//! form (the `encoded_key` reported in lookup results). The canonical
//! encoders are:
//!
//! | Syntax | Example for `["database", "poolSize"]` |
//! |--------|----------------------------------------|
//! | [`KeySyntax::DotSeparated`] | `database.poolSize` |
//! | [`KeySyntax::CliFlag`] | `--database-pool-size` |
//! | [`KeySyntax::ScreamingSnake`] | `DATABASE_POOL_SIZE` |
//! | [`KeySyntax::DirectoryFile`] | `database-poolSize` |
//!
//! Encoders are paired with decoders: for any string an encoder can produce,
//! decoding and re-encoding yields the same string.

use super::{AbsoluteConfigKey, ConfigKey, KeyContext};

/// The key serialization syntaxes understood by the built-in providers.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum KeySyntax {
    /// `a.b.c` - used by JSON/YAML files and the in-memory providers.
    DotSeparated,
    /// `--a-b-c` - CLI flag style, camelCase split to kebab-case.
    CliFlag,
    /// `A_B_C` - environment variable style, camelCase split on boundaries.
    ScreamingSnake,
    /// `a-b-c` - one file per key; non-alphanumerics become `_` inside a
    /// component, components join with `-`.
    DirectoryFile,
}

/// Encodes absolute keys into a provider's native string form.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct KeyEncoder {
    syntax: KeySyntax,
}

impl KeyEncoder {
    /// An encoder for the given syntax.
    #[must_use]
    pub const fn new(syntax: KeySyntax) -> Self {
        Self { syntax }
    }

    /// The `a.b.c` encoder.
    #[must_use]
    pub const fn dot_separated() -> Self {
        Self::new(KeySyntax::DotSeparated)
    }

    /// The `--a-b-c` encoder.
    #[must_use]
    pub const fn cli_flag() -> Self {
        Self::new(KeySyntax::CliFlag)
    }

    /// The `A_B_C` encoder.
    #[must_use]
    pub const fn screaming_snake() -> Self {
        Self::new(KeySyntax::ScreamingSnake)
    }

    /// The directory-file encoder.
    #[must_use]
    pub const fn directory_file() -> Self {
        Self::new(KeySyntax::DirectoryFile)
    }

    /// The syntax this encoder produces.
    #[must_use]
    pub const fn syntax(&self) -> KeySyntax {
        self.syntax
    }

    /// Encodes an absolute key.
    #[must_use]
    pub fn encode(&self, key: &AbsoluteConfigKey) -> String {
        let components = key.components();

        match self.syntax {
            KeySyntax::DotSeparated => components.join("."),

            KeySyntax::CliFlag => {
                let flag = components
                    .iter()
                    .map(|c| split_camel(c, '-').to_lowercase())
                    .collect::<Vec<_>>()
                    .join("-");
                format!("--{flag}")
            }

            KeySyntax::ScreamingSnake => components
                .iter()
                .map(|c| split_camel(c, '_').to_uppercase())
                .collect::<Vec<_>>()
                .join("_"),

            KeySyntax::DirectoryFile => components
                .iter()
                .map(|c| sanitize_file_component(c))
                .collect::<Vec<_>>()
                .join("-"),
        }
    }
}

/// Decodes provider-native key strings back into relative keys.
///
/// The reader uses a decoder (dot-separated by default) to turn `&str` key
/// literals into [`ConfigKey`] values; providers use the matching decoder
/// when enumerating their native key space.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct KeyDecoder {
    syntax: KeySyntax,
}

impl KeyDecoder {
    /// A decoder for the given syntax.
    #[must_use]
    pub const fn new(syntax: KeySyntax) -> Self {
        Self { syntax }
    }

    /// The `a.b.c` decoder (the reader default).
    #[must_use]
    pub const fn dot_separated() -> Self {
        Self::new(KeySyntax::DotSeparated)
    }

    /// The syntax this decoder understands.
    #[must_use]
    pub const fn syntax(&self) -> KeySyntax {
        self.syntax
    }

    /// Decodes an encoded key string, attaching the given context.
    #[must_use]
    pub fn decode(&self, encoded: &str, context: KeyContext) -> ConfigKey {
        let components: Vec<String> = match self.syntax {
            KeySyntax::DotSeparated => encoded.split('.').map(str::to_string).collect(),

            KeySyntax::CliFlag => encoded
                .strip_prefix("--")
                .unwrap_or(encoded)
                .split('-')
                .map(str::to_string)
                .collect(),

            KeySyntax::ScreamingSnake => encoded
                .split('_')
                .map(|c| c.to_lowercase())
                .collect(),

            KeySyntax::DirectoryFile => encoded.split('-').map(str::to_string).collect(),
        };

        ConfigKey::with_context(components, context)
    }
}

impl Default for KeyDecoder {
    fn default() -> Self {
        Self::dot_separated()
    }
}

/// Splits camelCase boundaries with `sep`: a separator is inserted before an
/// uppercase letter that is preceded by a lowercase letter. All other
/// characters pass through unchanged.
fn split_camel(component: &str, sep: char) -> String {
    let mut out = String::with_capacity(component.len() + 2);
    let mut prev_lowercase = false;

    for ch in component.chars() {
        if ch.is_uppercase() && prev_lowercase {
            out.push(sep);
        }
        prev_lowercase = ch.is_lowercase();
        out.push(ch);
    }

    out
}

/// Directory-file component sanitizer: alphanumerics and `-` pass through,
/// everything else becomes `_`.
fn sanitize_file_component(component: &str) -> String {
    component
        .chars()
        .map(|ch| {
            if ch.is_alphanumeric() || ch == '-' {
                ch
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn abs(components: &[&str]) -> AbsoluteConfigKey {
        AbsoluteConfigKey::new(components.iter().copied())
    }

    #[test]
    fn test_dot_encoding() {
        let enc = KeyEncoder::dot_separated();
        assert_eq!(enc.encode(&abs(&["database", "host"])), "database.host");
    }

    #[test]
    fn test_cli_flag_encoding_kebab_cases_camel() {
        let enc = KeyEncoder::cli_flag();
        assert_eq!(enc.encode(&abs(&["db", "host"])), "--db-host");
        assert_eq!(enc.encode(&abs(&["poolSize"])), "--pool-size");
    }

    #[test]
    fn test_cli_flag_passes_non_alphanumerics() {
        let enc = KeyEncoder::cli_flag();
        assert_eq!(enc.encode(&abs(&["a.b"])), "--a.b");
    }

    #[test]
    fn test_screaming_snake_encoding() {
        let enc = KeyEncoder::screaming_snake();
        assert_eq!(enc.encode(&abs(&["database", "host"])), "DATABASE_HOST");
        assert_eq!(enc.encode(&abs(&["poolSize"])), "POOL_SIZE");
    }

    #[test]
    fn test_consecutive_uppercase_not_split() {
        let enc = KeyEncoder::screaming_snake();
        assert_eq!(enc.encode(&abs(&["httpAPIKey"])), "HTTP_APIKEY");
    }

    #[test]
    fn test_directory_file_encoding() {
        let enc = KeyEncoder::directory_file();
        assert_eq!(enc.encode(&abs(&["tls", "ca.crt"])), "tls-ca_crt");
        assert_eq!(enc.encode(&abs(&["api-key"])), "api-key");
    }

    #[test]
    fn test_dot_decoder_round_trip() {
        let dec = KeyDecoder::dot_separated();
        let enc = KeyEncoder::dot_separated();

        let key = dec.decode("a.b.c", KeyContext::new()).into_absolute();
        assert_eq!(enc.encode(&key), "a.b.c");
    }

    #[test]
    fn test_cli_decoder_round_trip() {
        let dec = KeyDecoder::new(KeySyntax::CliFlag);
        let enc = KeyEncoder::cli_flag();

        let key = dec.decode("--db-host", KeyContext::new()).into_absolute();
        assert_eq!(key.components(), ["db", "host"]);
        assert_eq!(enc.encode(&key), "--db-host");
    }

    #[test]
    fn test_screaming_snake_decoder_round_trip() {
        let dec = KeyDecoder::new(KeySyntax::ScreamingSnake);
        let enc = KeyEncoder::screaming_snake();

        let key = dec.decode("DATABASE_HOST", KeyContext::new()).into_absolute();
        assert_eq!(key.components(), ["database", "host"]);
        assert_eq!(enc.encode(&key), "DATABASE_HOST");
    }
}
