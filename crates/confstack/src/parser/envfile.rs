//! `KEY=VALUE` env-file snapshot parser.
//!
//! The grammar matches common dotenv files: one `KEY=VALUE` pair per line,
//! `#` starts a comment line, blank lines are skipped, and malformed lines
//! (no `=`, empty key) are silently dropped. Values keep their raw string
//! form; typed reads parse on demand with the shared string grammar.

use std::collections::BTreeMap;

use super::{Adaptation, ParseOptions, ParsedTable, SnapshotParser, insert_entry};
use crate::error::ConfigError;
use crate::value::ConfigContent;

/// Parses env-file content into a string-native snapshot.
#[derive(Clone, Copy, Debug, Default)]
pub struct EnvFileParser;

impl EnvFileParser {
    /// Creates the parser.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl SnapshotParser for EnvFileParser {
    fn format_name(&self) -> &'static str {
        "env file"
    }

    fn parse(&self, bytes: &[u8], options: &ParseOptions) -> Result<ParsedTable, ConfigError> {
        let content = std::str::from_utf8(bytes).map_err(|e| ConfigError::Parse {
            format: self.format_name(),
            message: e.to_string(),
        })?;

        let mut entries = BTreeMap::new();
        for (key, value) in parse_env_file_content(content) {
            insert_entry(
                &mut entries,
                key,
                ConfigContent::String(value),
                &options.secrets,
            );
        }

        Ok(ParsedTable::new(
            entries,
            Adaptation::StringNative(options.string_parsing.clone()),
        ))
    }
}

/// Parses env-file lines into key/value pairs.
///
/// Later occurrences of a key override earlier ones, consistent with how
/// shells source such files.
pub(crate) fn parse_env_file_content(content: &str) -> Vec<(String, String)> {
    let mut pairs: Vec<(String, String)> = Vec::new();

    for line in content.lines() {
        let line = line.trim();

        // Skip empty lines and comments
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some(eq_pos) = line.find('=') else {
            continue;
        };

        let key = line[..eq_pos].trim();
        if key.is_empty() {
            continue;
        }

        let mut value = line[eq_pos + 1..].trim();

        // Strip surrounding quotes
        if (value.starts_with('"') && value.ends_with('"') && value.len() >= 2)
            || (value.starts_with('\'') && value.ends_with('\'') && value.len() >= 2)
        {
            value = &value[1..value.len() - 1];
        }

        if let Some(existing) = pairs.iter_mut().find(|(k, _)| k == key) {
            existing.1 = value.to_string();
        } else {
            pairs.push((key.to_string(), value.to_string()));
        }
    }

    pairs
}
