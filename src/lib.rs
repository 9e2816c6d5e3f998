//! Datasource Core
//!
//! A pluggable datasource resolution and caching layer for template rendering.
//! Named, URI-addressed sources (local files, HTTP(S) endpoints, Vault secrets)
//! are resolved to a media type, fetched on demand through a scheme-specific
//! reader, cached per (alias, arguments) and handed back either decoded or as
//! raw text.
//!
//! # Overview
//!
//! A template asks for `ds("config")` or `ds("secrets", "db")`. The
//! [`DataRegistry`] looks the alias up, checks its cache, and on a miss
//! dispatches to the [`SourceReader`] registered for the source's URL scheme.
//! Readers lazily create their transport (an HTTP client, an authenticated
//! Vault session) on the source itself, so repeated reads reuse it.
//!
//! # Features
//!
//! - **Uniform readers**: `file`, `http`, `https` and `vault` behind one trait,
//!   open for new schemes through [`ReaderRegistry::register`]
//! - **Media types end to end**: inferred from the extension, refined by the
//!   transport (`Content-Type`), used to pick the JSON/YAML/CSV decoder
//! - **At-most-once fetches**: results cached per (alias, arguments)
//! - **Credential lifecycle**: Vault tokens are revoked in an explicit
//!   [`DataRegistry::shutdown`] phase
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use datasource_core::{DataRegistry, ReaderOptions};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = DataRegistry::from_args(
//!     &["config.yaml", "api=https://api.example.com/items.json"],
//!     &["api=Accept: application/json"],
//!     &ReaderOptions::default(),
//! )?;
//!
//! let config = registry.datasource::<&str>("config", &[]).await?;
//! println!("{}", config["name"]);
//!
//! let raw = registry.include::<&str>("api", &[]).await?;
//! println!("{}", raw);
//!
//! registry.shutdown().await;
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration
//!
//! Configuration can also be loaded from a YAML file, see [`DataConfig`]:
//!
//! ```yaml
//! datasources:
//!   - config.yaml
//!   - secrets=vault:///secret/app
//! http_timeout_secs: 5
//! ```
//!
//! # Error Handling
//!
//! Nothing in this crate exits the process. Every failure is a [`DataError`],
//! and the caller decides what is fatal:
//!
//! ```rust,no_run
//! use datasource_core::Source;
//!
//! match Source::parse("sub/x.yaml") {
//!     Ok(source) => println!("{}", source),
//!     Err(e) if e.is_config_error() => eprintln!("bad datasource: {}", e),
//!     Err(e) => eprintln!("other error: {}", e),
//! }
//! ```

pub mod cleanup;
pub mod config;
pub mod decode;
pub mod error;
pub mod headers;
pub mod media_type;
pub mod metrics;
pub mod reader;
pub mod registry;
pub mod source;
pub mod vault;

// Re-export commonly used types
pub use cleanup::{Cleanup, CleanupHook};
pub use config::DataConfig;
pub use decode::Format;
pub use error::{DataError, Result};
pub use headers::{parse_header_args, Headers};
pub use media_type::MediaType;
pub use metrics::{ReadStats, StatsSnapshot};
pub use reader::{
    Credential, FileReader, FileSystem, HttpReader, MemoryFileSystem, OsFileSystem, ReaderOptions,
    ReaderRegistry, SecretReader, SecretStore, SecretStoreConnector, SourceReader,
};
pub use registry::{CacheKey, DataRegistry};
pub use source::Source;
pub use vault::{AuthMethod, VaultClient, VaultConfig, VaultConnector};
