//! Reader for `file:` datasources

use super::{transport_mismatch, SourceReader, Transport};
use crate::error::{DataError, Result};
use crate::source::Source;
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::io::{self, Cursor};
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::debug;

/// Result of a successful stat
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    pub len: u64,
    pub is_dir: bool,
}

/// Minimal filesystem capabilities needed to read a datasource
#[async_trait]
pub trait FileSystem: Send + Sync {
    async fn stat(&self, path: &Path) -> io::Result<FileStat>;

    /// Open a file read-only
    async fn open(&self, path: &Path) -> io::Result<Box<dyn AsyncRead + Send + Unpin>>;
}

/// The host operating system's filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFileSystem;

#[async_trait]
impl FileSystem for OsFileSystem {
    async fn stat(&self, path: &Path) -> io::Result<FileStat> {
        let metadata = tokio::fs::metadata(path).await?;
        Ok(FileStat {
            len: metadata.len(),
            is_dir: metadata.is_dir(),
        })
    }

    async fn open(&self, path: &Path) -> io::Result<Box<dyn AsyncRead + Send + Unpin>> {
        let file = tokio::fs::File::open(path).await?;
        Ok(Box::new(file))
    }
}

/// In-memory filesystem, mostly useful in tests
#[derive(Debug, Default)]
pub struct MemoryFileSystem {
    files: RwLock<HashMap<PathBuf, Bytes>>,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or replace a file
    pub fn insert(&self, path: impl Into<PathBuf>, contents: impl Into<Bytes>) {
        self.files
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.into(), contents.into());
    }

    fn get(&self, path: &Path) -> io::Result<Bytes> {
        self.files
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
            .cloned()
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("{} does not exist", path.display()),
                )
            })
    }
}

#[async_trait]
impl FileSystem for MemoryFileSystem {
    async fn stat(&self, path: &Path) -> io::Result<FileStat> {
        let contents = self.get(path)?;
        Ok(FileStat {
            len: contents.len() as u64,
            is_dir: false,
        })
    }

    async fn open(&self, path: &Path) -> io::Result<Box<dyn AsyncRead + Send + Unpin>> {
        Ok(Box::new(Cursor::new(self.get(path)?)))
    }
}

/// Reads a local file in full
///
/// The filesystem is bound to each source on its first read and reused after.
#[derive(Clone)]
pub struct FileReader {
    fs: Arc<dyn FileSystem>,
}

impl FileReader {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        FileReader { fs }
    }
}

impl Default for FileReader {
    fn default() -> Self {
        FileReader::new(Arc::new(OsFileSystem))
    }
}

#[async_trait]
impl SourceReader for FileReader {
    async fn read(&self, source: &Source, _args: &[String]) -> Result<Bytes> {
        let transport = source
            .transport()
            .get_or_init(|| async { Transport::File(self.fs.clone()) })
            .await;
        let fs = match transport {
            Transport::File(fs) => fs,
            other => return Err(transport_mismatch(source, other, "file")),
        };

        let path = source.url().to_file_path().map_err(|_| {
            DataError::invalid_spec(source.url().as_str(), "not a local file path")
        })?;

        let stat = fs
            .stat(&path)
            .await
            .map_err(|e| DataError::io("stat", &path, &e))?;
        debug!(
            "Reading file datasource alias={} path={} size={}",
            source.alias(),
            path.display(),
            stat.len
        );

        let mut file = fs
            .open(&path)
            .await
            .map_err(|e| DataError::io("open", &path, &e))?;
        let mut buf = Vec::with_capacity(stat.len as usize);
        file.read_to_end(&mut buf)
            .await
            .map_err(|e| DataError::io("read", &path, &e))?;

        Ok(Bytes::from(buf))
    }
}
