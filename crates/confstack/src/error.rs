//! Error types for configuration access.
//!
//! This module contains the [`ConfigError`] enum used across the whole
//! crate, with rich diagnostics via [`miette`].
//!
//! # Error Variants
//!
//! | Variant | When It Occurs |
//! |---------|----------------|
//! | [`ConfigError::MissingRequiredValue`] | A `*_required` accessor produced nothing |
//! | [`ConfigError::NotConvertible`] | Provider has a value of the wrong content tag |
//! | [`ConfigError::FailedToCast`] | A custom `from_config_string` constructor rejected the value |
//! | [`ConfigError::TypeMismatch`] | A [`ConfigContent`](crate::ConfigContent) accessor was called with the wrong tag |
//! | [`ConfigError::FileNotFound`] | A configuration file does not exist |
//! | [`ConfigError::Io`] | Filesystem access failed |
//! | [`ConfigError::MissingLastModifiedTimestamp`] | The filesystem returned no mtime for a watched file |
//! | [`ConfigError::NotADirectory`] | The directory provider was pointed at a non-directory |
//! | [`ConfigError::Parse`] | A file could not be parsed in its declared format |
//! | [`ConfigError::EmptyProviderList`] | A `MultiProvider` was built with no children |
//!
//! # Cloneability
//!
//! Watch streams deliver `Result<_, ConfigError>` elements where errors are
//! ordinary values that may be observed by several subscribers, so every
//! variant is `Clone`. Underlying I/O causes are captured as rendered
//! strings rather than live `std::io::Error` values.

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

use crate::value::ConfigType;

/// Errors produced by configuration providers, readers, and parsers.
#[derive(Clone, Debug, Error, Diagnostic)]
#[non_exhaustive]
pub enum ConfigError {
    /// A required configuration value was not present in any provider.
    #[error("missing required configuration value for key '{key}'")]
    #[diagnostic(
        code(confstack::missing_required),
        help("set the value in one of the configured providers, or use an accessor with a default")
    )]
    MissingRequiredValue {
        /// Canonical (dot-separated) rendering of the absolute key.
        key: String,
    },

    /// A provider holds a value for the key, but with a different content tag
    /// than the one requested.
    #[error("configuration value '{name}' is not convertible to {requested}")]
    #[diagnostic(
        code(confstack::not_convertible),
        help("check the type stored by the provider against the type requested by the caller")
    )]
    NotConvertible {
        /// Provider-encoded key name.
        name: String,
        /// The type the caller asked for.
        requested: ConfigType,
    },

    /// A custom conversion constructor returned no value.
    #[error("configuration value '{name}' failed to cast to {type_name}")]
    #[diagnostic(code(confstack::failed_to_cast))]
    FailedToCast {
        /// Provider-encoded key name.
        name: String,
        /// Target Rust type name.
        type_name: &'static str,
    },

    /// A [`ConfigContent`](crate::ConfigContent) accessor was invoked with a
    /// tag other than the stored one.
    #[error("type mismatch: content is {actual}, requested {requested}")]
    #[diagnostic(code(confstack::type_mismatch))]
    TypeMismatch {
        /// The tag actually stored.
        actual: ConfigType,
        /// The tag the accessor asked for.
        requested: ConfigType,
    },

    /// A configuration file does not exist.
    #[error("configuration file not found: {path}")]
    #[diagnostic(
        code(confstack::file_not_found),
        help("ensure the file exists at the specified path")
    )]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// Filesystem access failed.
    #[error("i/o error on {path}: {cause}")]
    #[diagnostic(code(confstack::io_error))]
    Io {
        /// Path of the failed operation.
        path: PathBuf,
        /// Rendered cause of the underlying I/O error.
        cause: String,
    },

    /// The filesystem did not report a modification timestamp.
    #[error("no last-modified timestamp available for {path}")]
    #[diagnostic(code(confstack::missing_timestamp))]
    MissingLastModifiedTimestamp {
        /// Path of the watched file.
        path: PathBuf,
    },

    /// The directory provider was pointed at something that is not a directory.
    #[error("not a directory: {path}")]
    #[diagnostic(code(confstack::not_a_directory))]
    NotADirectory {
        /// The offending path.
        path: PathBuf,
    },

    /// A file's content could not be parsed in its declared format.
    #[error("{format} parse error: {message}")]
    #[diagnostic(code(confstack::parse_error))]
    Parse {
        /// Format name (JSON, YAML, env file).
        format: &'static str,
        /// Rendered parser error.
        message: String,
    },

    /// A parsed document's top level is not a mapping.
    #[error("{format} document root must be a mapping")]
    #[diagnostic(
        code(confstack::top_level_not_mapping),
        help("configuration files must have an object/mapping at the top level")
    )]
    TopLevelNotMapping {
        /// Format name.
        format: &'static str,
    },

    /// A parsed document contains a scalar no [`ConfigContent`](crate::ConfigContent)
    /// variant can represent.
    #[error("unsupported primitive at key '{key}': {detail}")]
    #[diagnostic(code(confstack::unsupported_primitive))]
    UnsupportedPrimitive {
        /// Flattened (dot-separated) key of the offending value.
        key: String,
        /// What was found.
        detail: String,
    },

    /// A parsed array mixes element types.
    #[error("heterogeneous array at key '{key}'")]
    #[diagnostic(
        code(confstack::heterogeneous_array),
        help("array elements must all share a single primitive type")
    )]
    HeterogeneousArray {
        /// Flattened key of the offending array.
        key: String,
    },

    /// A parsed mapping uses a non-string key.
    #[error("non-string mapping key under '{parent}'")]
    #[diagnostic(code(confstack::key_not_string))]
    KeyNotString {
        /// Flattened key of the enclosing mapping (empty string at the root).
        parent: String,
    },

    /// A `MultiProvider` was constructed with an empty child list.
    #[error("multi-provider requires at least one child provider")]
    #[diagnostic(code(confstack::empty_provider_list))]
    EmptyProviderList,

    /// A broadcasting reporter was constructed with no upstreams.
    #[error("broadcasting reporter requires at least one upstream")]
    #[diagnostic(code(confstack::empty_reporter_list))]
    EmptyReporterList,
}

impl ConfigError {
    /// Creates an [`ConfigError::Io`] from a path and a source error.
    pub fn io(path: impl Into<PathBuf>, cause: &std::io::Error) -> Self {
        ConfigError::Io {
            path: path.into(),
            cause: cause.to_string(),
        }
    }

    /// Creates a [`ConfigError::MissingRequiredValue`] from an absolute key.
    pub(crate) fn missing_required(key: &crate::key::AbsoluteConfigKey) -> Self {
        ConfigError::MissingRequiredValue {
            key: key.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = ConfigError::MissingRequiredValue {
            key: "db.host".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "missing required configuration value for key 'db.host'"
        );

        let err = ConfigError::TypeMismatch {
            actual: ConfigType::String,
            requested: ConfigType::Int,
        };
        assert_eq!(err.to_string(), "type mismatch: content is string, requested int");
    }

    #[test]
    fn test_errors_are_cloneable() {
        let err = ConfigError::Io {
            path: PathBuf::from("/etc/app.json"),
            cause: "permission denied".to_string(),
        };
        let cloned = err.clone();
        assert_eq!(err.to_string(), cloned.to_string());
    }

    #[test]
    fn test_io_constructor_renders_cause() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = ConfigError::io("/tmp/x", &io);
        assert!(err.to_string().contains("gone"));
    }
}
