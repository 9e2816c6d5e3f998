//! The datasource registry: configured sources plus a read-through cache
//!
//! Every read goes through [`DataRegistry::read_source`]. The first read of an
//! (alias, arguments) pair dispatches to the reader registered for the source's
//! URL scheme; the bytes are cached and every later read of the same pair is
//! served from memory. Entries are never invalidated for the registry's lifetime.

use crate::cleanup::Cleanup;
use crate::decode;
use crate::error::{DataError, Result};
use crate::headers::parse_header_args;
use crate::metrics::{ReadStats, StatsSnapshot};
use crate::reader::{ReaderOptions, ReaderRegistry};
use crate::source::{working_dir_url, Source};
use bytes::Bytes;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, warn};

/// Cache key for one read: the alias and the arguments, in order
///
/// Arguments are kept as separate elements, so `("a", ["b", "c"])` and
/// `("a", ["bc"])` are different keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    alias: String,
    args: Vec<String>,
}

impl CacheKey {
    pub fn new<S: AsRef<str>>(alias: &str, args: &[S]) -> Self {
        CacheKey {
            alias: alias.to_string(),
            args: args.iter().map(|a| a.as_ref().to_string()).collect(),
        }
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

/// Configured datasources and the cache of their contents
pub struct DataRegistry {
    sources: HashMap<String, Arc<Source>>,
    readers: ReaderRegistry,
    cache: Mutex<HashMap<CacheKey, Bytes>>,
    cleanup: Arc<Cleanup>,
    stats: ReadStats,
}

impl DataRegistry {
    /// Create a registry over `sources`
    ///
    /// `cleanup` should be the same collection the readers register their
    /// release hooks with, so [`DataRegistry::shutdown`] can run them.
    pub fn new(
        sources: impl IntoIterator<Item = Source>,
        readers: ReaderRegistry,
        cleanup: Arc<Cleanup>,
    ) -> Result<Self> {
        let mut by_alias = HashMap::new();
        for source in sources {
            let alias = source.alias().to_string();
            if by_alias.contains_key(&alias) {
                return Err(DataError::DuplicateAlias(alias));
            }
            debug!("Registered datasource {}", source);
            by_alias.insert(alias, Arc::new(source));
        }

        Ok(DataRegistry {
            sources: by_alias,
            readers,
            cache: Mutex::new(HashMap::new()),
            cleanup,
            stats: ReadStats::new(),
        })
    }

    /// Build a registry with the standard readers from datasource and header
    /// arguments (`alias=uri` and `alias=Name: value`)
    pub fn from_args<S: AsRef<str>>(
        datasource_args: &[S],
        header_args: &[S],
        options: &ReaderOptions,
    ) -> Result<Self> {
        let mut headers = parse_header_args(header_args)?;
        let base = working_dir_url()?;

        let mut sources = Vec::with_capacity(datasource_args.len());
        for arg in datasource_args {
            let mut source = Source::parse_with_base(arg.as_ref(), &base)?;
            if let Some(h) = headers.remove(source.alias()) {
                source = source.with_headers(h);
            }
            sources.push(source);
        }
        for alias in headers.keys() {
            warn!("Ignoring headers for undefined datasource '{}'", alias);
        }

        let cleanup = Arc::new(Cleanup::new());
        let readers = ReaderRegistry::standard(options, cleanup.clone());
        Self::new(sources, readers, cleanup)
    }

    pub fn exists(&self, alias: &str) -> bool {
        self.sources.contains_key(alias)
    }

    pub fn source(&self, alias: &str) -> Option<&Arc<Source>> {
        self.sources.get(alias)
    }

    /// Aliases of all configured sources, sorted
    pub fn aliases(&self) -> Vec<&str> {
        let mut aliases: Vec<_> = self.sources.keys().map(String::as_str).collect();
        aliases.sort_unstable();
        aliases
    }

    /// Raw bytes of a datasource, read at most once per (alias, args)
    ///
    /// Reader failures are wrapped in `DataError::Read` and are not cached, so
    /// a later call tries again.
    pub async fn read_source<S: AsRef<str>>(&self, alias: &str, args: &[S]) -> Result<Bytes> {
        let source = self
            .sources
            .get(alias)
            .ok_or_else(|| DataError::UndefinedAlias(alias.to_string()))?;
        let key = CacheKey::new(alias, args);

        let cached = self.lock_cache().get(&key).cloned();
        if let Some(cached) = cached {
            debug!("Cache hit for datasource alias={} args={:?}", alias, key.args());
            self.stats.record_cache_hit();
            return Ok(cached);
        }
        self.stats.record_cache_miss();

        let reader = self.readers.get(source.scheme())?;
        let data = reader.read(source, key.args()).await.map_err(|e| {
            self.stats.record_read_failure();
            DataError::read(alias, e)
        })?;
        self.stats.record_bytes_read(data.len() as u64);

        // if a concurrent read of the same key finished first, keep its bytes
        let stored = self.lock_cache().entry(key).or_insert(data).clone();
        Ok(stored)
    }

    /// A datasource decoded by its resolved media type
    pub async fn datasource<S: AsRef<str>>(&self, alias: &str, args: &[S]) -> Result<Value> {
        let data = self.read_source(alias, args).await?;
        let source = self
            .sources
            .get(alias)
            .ok_or_else(|| DataError::UndefinedAlias(alias.to_string()))?;
        decode::decode(&data, &source.media_type())
    }

    /// A datasource's contents as text, without structured decoding
    ///
    /// Invalid UTF-8 sequences are replaced rather than rejected.
    pub async fn include<S: AsRef<str>>(&self, alias: &str, args: &[S]) -> Result<String> {
        let data = self.read_source(alias, args).await?;
        Ok(String::from_utf8_lossy(&data).into_owned())
    }

    /// Number of cached (alias, args) entries
    pub fn cached_entries(&self) -> usize {
        self.lock_cache().len()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.get_stats()
    }

    pub fn readers(&self) -> &ReaderRegistry {
        &self.readers
    }

    /// Release everything the readers acquired (secret-store tokens and such)
    ///
    /// Hooks run once; failures are logged and returned.
    pub async fn shutdown(&self) -> Vec<DataError> {
        self.cleanup.run().await
    }

    fn lock_cache(&self) -> std::sync::MutexGuard<'_, HashMap<CacheKey, Bytes>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for DataRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataRegistry")
            .field("sources", &self.aliases())
            .field("readers", &self.readers)
            .field("cached_entries", &self.cached_entries())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media_type::JSON;
    use crate::reader::{FileReader, MemoryFileSystem, SourceReader};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use url::Url;

    /// Returns the arguments it was called with and counts calls
    #[derive(Default)]
    struct Counting {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl SourceReader for Counting {
        async fn read(&self, _source: &Source, args: &[String]) -> Result<Bytes> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Bytes::from(format!("{:?}", args)))
        }
    }

    fn base() -> Url {
        Url::parse("file:///data/").unwrap()
    }

    fn counting_registry(specs: &[&str]) -> (DataRegistry, Arc<AtomicUsize>) {
        let counting = Counting::default();
        let calls = counting.calls.clone();
        let mut readers = ReaderRegistry::new();
        readers.register("stub", counting);
        let sources = specs
            .iter()
            .map(|s| Source::parse_with_base(s, &base()).unwrap());
        let registry = DataRegistry::new(sources, readers, Arc::new(Cleanup::new())).unwrap();
        (registry, calls)
    }

    #[tokio::test]
    async fn test_second_read_hits_cache() {
        let (registry, calls) = counting_registry(&["a=stub:///a"]);

        let first = registry.read_source("a", &["x"]).await.unwrap();
        let second = registry.read_source("a", &["x"]).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let stats = registry.stats();
        assert_eq!(stats.cache_hits, 1);
        assert_eq!(stats.cache_misses, 1);
    }

    #[tokio::test]
    async fn test_argument_boundaries_are_distinct_keys() {
        let (registry, calls) = counting_registry(&["a=stub:///a"]);

        let split = registry.read_source("a", &["b", "c"]).await.unwrap();
        let joined = registry.read_source("a", &["bc"]).await.unwrap();

        assert_ne!(split, joined);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(registry.cached_entries(), 2);
    }

    #[tokio::test]
    async fn test_argument_order_matters() {
        let (registry, calls) = counting_registry(&["a=stub:///a"]);
        registry.read_source("a", &["1", "2"]).await.unwrap();
        registry.read_source("a", &["2", "1"]).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_undefined_alias() {
        let (registry, _) = counting_registry(&["a=stub:///a"]);
        let err = registry.read_source::<&str>("nope", &[]).await.unwrap_err();
        assert!(matches!(err, DataError::UndefinedAlias(ref a) if a == "nope"));
        assert!(err.is_config_error());
    }

    #[tokio::test]
    async fn test_unsupported_scheme() {
        let (registry, _) = counting_registry(&["f=ftp://example.com/x.json"]);
        let err = registry.read_source::<&str>("f", &[]).await.unwrap_err();
        assert!(matches!(err, DataError::UnsupportedScheme(ref s) if s == "ftp"));
    }

    #[test]
    fn test_duplicate_alias() {
        let sources = ["a=x.json", "a=y.json"]
            .iter()
            .map(|s| Source::parse_with_base(s, &base()).unwrap());
        let err = DataRegistry::new(sources, ReaderRegistry::new(), Arc::new(Cleanup::new()))
            .unwrap_err();
        assert!(matches!(err, DataError::DuplicateAlias(ref a) if a == "a"));
    }

    #[tokio::test]
    async fn test_datasource_and_include() {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.insert("/data/in.yaml", "value: hello world\n");
        fs.insert("/data/people.json", r#"[{"name":"ada"}]"#);
        fs.insert("/data/notes.txt", "plain text");
        let mut readers = ReaderRegistry::new();
        readers.register("file", FileReader::new(fs));

        let sources = ["data=in.yaml", "people.json", "notes=notes.txt"]
            .iter()
            .map(|s| Source::parse_with_base(s, &base()).unwrap());
        let registry = DataRegistry::new(sources, readers, Arc::new(Cleanup::new())).unwrap();

        let value = registry.datasource::<&str>("data", &[]).await.unwrap();
        assert_eq!(value["value"], "hello world");

        let people = registry.datasource::<&str>("people", &[]).await.unwrap();
        assert_eq!(people[0]["name"], "ada");
        assert_eq!(registry.source("people").unwrap().media_type().essence(), JSON);

        let text = registry.include::<&str>("notes", &[]).await.unwrap();
        assert_eq!(text, "plain text");

        let err = registry.datasource::<&str>("notes", &[]).await.unwrap_err();
        assert!(matches!(err, DataError::UnsupportedType(ref t) if t == "text/plain"));
    }

    #[tokio::test]
    async fn test_reader_failure_is_wrapped_and_not_cached() {
        let mut readers = ReaderRegistry::new();
        readers.register("file", FileReader::new(Arc::new(MemoryFileSystem::new())));
        let sources = [Source::parse_with_base("missing.json", &base()).unwrap()];
        let registry = DataRegistry::new(sources, readers, Arc::new(Cleanup::new())).unwrap();

        let err = registry.read_source::<&str>("missing", &[]).await.unwrap_err();
        assert!(matches!(err, DataError::Read { ref alias, .. } if alias == "missing"));
        assert!(err.is_not_found());
        assert_eq!(registry.cached_entries(), 0);
        assert_eq!(registry.stats().read_failures, 1);
    }

    #[test]
    fn test_aliases_sorted() {
        let (registry, _) = counting_registry(&["b=stub:///b", "a=stub:///a"]);
        assert_eq!(registry.aliases(), vec!["a", "b"]);
        assert!(registry.exists("a"));
        assert!(!registry.exists("c"));
    }
}
