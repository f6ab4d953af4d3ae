//! Hierarchical, multi-source configuration.
//!
//! `confstack` resolves typed configuration values - strings, integers,
//! doubles, booleans, byte arrays, and arrays of each - from a
//! precedence-ordered stack of providers: in-memory tables, environment
//! variables, command-line arguments, directory-of-files secret mounts, and
//! parsed JSON/YAML/env files, any of which may be watched for live
//! updates.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   get / fetch / watch    ┌────────────────┐
//! │ ConfigReader │─────────────────────────▶│ MultiProvider  │
//! │ (prefix,     │                          │ (precedence)   │
//! │  conversion, │   AccessEvent            ├────────────────┤
//! │  defaults)   │──────────▶ reporters     │ env  cli  file │
//! └──────────────┘                          │ dir  mem  ...  │
//!                                           └────────────────┘
//! ```
//!
//! A read builds an absolute key from the reader's prefix, walks the
//! provider chain (first non-null value wins; an error is never masked by a
//! lower-precedence success), converts the resolved content to the
//! requested Rust type, reports an access event, and returns the typed
//! value, the caller's default, or an error, depending on the accessor
//! family.
//!
//! # Quick start
//!
//! ```rust
//! use confstack::{ConfigReader, provider::{EnvVarsProvider, InMemoryProvider}};
//!
//! let reader = ConfigReader::builder()
//!     .with_provider(EnvVarsProvider::with_values([("HTTP_PORT", "9090")]))
//!     .with_provider(InMemoryProvider::new("defaults").with_value("http.port", 8080i64))
//!     .build()
//!     .unwrap();
//!
//! // The environment wins over the in-memory defaults.
//! assert_eq!(reader.get_or::<i64>("http.port", 80), 9090);
//! ```
//!
//! # Watching
//!
//! `watch*` accessors return a [`stream::Updates`] whose first element is
//! the current value, followed by one element per change. Dropping the
//! stream cancels the subscription. The
//! [`ReloadingFileProvider`](provider::ReloadingFileProvider) feeds such
//! streams by polling a file's timestamp and resolved symlink target.
//!
//! # Secrets
//!
//! Values carry a true-sticky secret flag. Secret values render as
//! `[<type>: <REDACTED>]` everywhere the crate formats them - access logs
//! included. Mark values at the source
//! ([`SecretsSpecifier`]), by wrapper
//! ([`SecretMarkingProvider`](provider::SecretMarkingProvider)), or per
//! read ([`secret`]).

pub mod access;
pub mod combine;
pub mod error;
pub mod fs;
pub mod key;
pub mod metrics;
pub mod parser;
pub mod provider;
pub mod reader;
pub mod stream;
mod value;

pub use access::{
    ACCESS_LOG_FILE_ENV, AccessEvent, AccessEventMetadata, AccessKind, AccessReporter,
    BroadcastingAccessReporter, FileAccessLogger, LoggingAccessReporter,
};
pub use error::ConfigError;
pub use key::encoding::{KeyDecoder, KeyEncoder, KeySyntax};
pub use key::{AbsoluteConfigKey, ConfigKey, ContextValue, KeyContext};
pub use reader::{
    ConfigConvertible, ConfigReader, ConfigReaderBuilder, FromConfigInt, FromConfigString,
    KeySpec, SnapshotReader, secret,
};
pub use value::{
    BytesDecoder, ConfigContent, ConfigType, ConfigValue, LookupResult, SecretsSpecifier,
    StringParsing,
};
