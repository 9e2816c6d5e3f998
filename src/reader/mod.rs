//! Scheme-specific datasource readers and the registry that dispatches to them

pub mod file;
pub mod http;
pub mod secret;

use crate::cleanup::Cleanup;
use crate::error::{DataError, Result};
use crate::source::Source;
use crate::vault::{VaultConfig, VaultConnector};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

pub use self::file::{FileReader, FileStat, FileSystem, MemoryFileSystem, OsFileSystem};
pub use self::http::HttpReader;
pub use self::secret::{Credential, SecretReader, SecretSession, SecretStore, SecretStoreConnector};

/// Fetches the raw bytes of a datasource
///
/// Readers may cache a transport handle on the source and may refine its
/// media type when the transport reports one.
#[async_trait]
pub trait SourceReader: Send + Sync {
    async fn read(&self, source: &Source, args: &[String]) -> Result<Bytes>;
}

/// Transport state bound to a source on its first read
///
/// A source only ever holds one kind, matching its URL scheme.
pub enum Transport {
    File(Arc<dyn FileSystem>),
    Http(reqwest::Client),
    Secret(SecretSession),
}

impl Transport {
    pub fn kind(&self) -> &'static str {
        match self {
            Transport::File(_) => "file",
            Transport::Http(_) => "http",
            Transport::Secret(_) => "secret",
        }
    }
}

pub(crate) fn transport_mismatch(source: &Source, found: &Transport, wanted: &str) -> DataError {
    DataError::Config(format!(
        "datasource '{}' already holds a {} transport, cannot read it as {}",
        source.alias(),
        found.kind(),
        wanted
    ))
}

/// Settings for the standard set of readers
#[derive(Debug, Clone)]
pub struct ReaderOptions {
    pub http_timeout: Duration,
    pub vault: VaultConfig,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        ReaderOptions {
            http_timeout: self::http::DEFAULT_TIMEOUT,
            vault: VaultConfig::default(),
        }
    }
}

/// Mapping from URL scheme to reader
///
/// Built once at startup and handed to the data registry; it is never changed
/// after that.
#[derive(Clone, Default)]
pub struct ReaderRegistry {
    readers: HashMap<String, Arc<dyn SourceReader>>,
}

impl ReaderRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the `file`, `http`, `https` and `vault` readers
    ///
    /// The secret-store reader registers credential revocation with `cleanup`.
    pub fn standard(options: &ReaderOptions, cleanup: Arc<Cleanup>) -> Self {
        let http: Arc<dyn SourceReader> = Arc::new(HttpReader::with_timeout(options.http_timeout));
        let vault = VaultConnector::new(options.vault.clone());

        let mut registry = ReaderRegistry::new();
        registry
            .register("file", FileReader::default())
            .register_shared("http", http.clone())
            .register_shared("https", http)
            .register("vault", SecretReader::new(Arc::new(vault), cleanup));
        registry
    }

    /// Register a reader for a scheme, replacing any previous one
    pub fn register(&mut self, scheme: &str, reader: impl SourceReader + 'static) -> &mut Self {
        self.register_shared(scheme, Arc::new(reader))
    }

    /// Register a reader that is shared with other schemes
    pub fn register_shared(&mut self, scheme: &str, reader: Arc<dyn SourceReader>) -> &mut Self {
        self.readers.insert(scheme.to_ascii_lowercase(), reader);
        self
    }

    /// Look up the reader for a scheme
    pub fn get(&self, scheme: &str) -> Result<Arc<dyn SourceReader>> {
        self.readers
            .get(&scheme.to_ascii_lowercase())
            .cloned()
            .ok_or_else(|| DataError::UnsupportedScheme(scheme.to_string()))
    }

    pub fn contains(&self, scheme: &str) -> bool {
        self.readers.contains_key(&scheme.to_ascii_lowercase())
    }

    /// Registered schemes, sorted
    pub fn schemes(&self) -> Vec<&str> {
        let mut schemes: Vec<_> = self.readers.keys().map(String::as_str).collect();
        schemes.sort_unstable();
        schemes
    }
}

impl fmt::Debug for ReaderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReaderRegistry")
            .field("schemes", &self.schemes())
            .finish()
    }
}
