//! Datasource descriptors and the parser for `alias=uri` specifications

use crate::error::{DataError, Result};
use crate::headers::Headers;
use crate::media_type::MediaType;
use crate::reader::Transport;
use std::fmt;
use std::sync::{PoisonError, RwLock};
use tokio::sync::OnceCell;
use url::Url;

/// A named datasource
///
/// Everything but the media type and the transport handle is fixed once the
/// source is built. The media type may be refined by a reader (an HTTP
/// `Content-Type`, for instance) and the transport is created on first read.
pub struct Source {
    alias: String,
    url: Url,
    ext: String,
    media_type: RwLock<MediaType>,
    headers: Headers,
    transport: OnceCell<Transport>,
}

impl Source {
    /// Build a source for an absolute URL, inferring its media type from the
    /// extension of the URL path
    pub fn new(alias: impl Into<String>, url: Url) -> Result<Self> {
        let ext = path_extension(url.path()).to_string();
        let media_type = MediaType::from_extension(&ext)?.unwrap_or_default();

        Ok(Source {
            alias: alias.into(),
            url,
            ext,
            media_type: RwLock::new(media_type),
            headers: Headers::default(),
            transport: OnceCell::new(),
        })
    }

    /// Parse a datasource specification, resolving relative paths against the
    /// current working directory
    ///
    /// Accepted forms:
    /// - `alias=uri` where `uri` is absolute (`https://...`) or a relative path
    /// - a bare filename such as `data.json`, whose alias is the part before
    ///   the first `.`
    pub fn parse(spec: &str) -> Result<Self> {
        let base = working_dir_url()?;
        Self::parse_with_base(spec, &base)
    }

    /// Parse a datasource specification, resolving relative paths against `base`
    pub fn parse_with_base(spec: &str, base: &Url) -> Result<Self> {
        let (alias, url) = match spec.split_once('=') {
            None => {
                if spec.contains('/') || spec.contains(std::path::MAIN_SEPARATOR) {
                    return Err(DataError::invalid_spec(
                        spec,
                        "an alias is required for files not in the working directory",
                    ));
                }
                let alias = spec.split_once('.').map_or(spec, |(alias, _)| alias);
                (alias, resolve(base, spec)?)
            }
            Some((alias, target)) => {
                let url = match Url::parse(target) {
                    Ok(url) => url,
                    Err(url::ParseError::RelativeUrlWithoutBase) => resolve(base, target)?,
                    Err(e) => return Err(DataError::invalid_spec(spec, e.to_string())),
                };
                (alias, url)
            }
        };

        if alias.is_empty() {
            return Err(DataError::invalid_spec(spec, "alias must not be empty"));
        }

        Source::new(alias, url)
    }

    /// Attach the request headers sent by HTTP readers
    pub fn with_headers(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn scheme(&self) -> &str {
        self.url.scheme()
    }

    /// Extension of the URL path including the leading dot, or empty
    pub fn ext(&self) -> &str {
        &self.ext
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// The currently resolved media type
    pub fn media_type(&self) -> MediaType {
        self.media_type
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the resolved media type
    pub fn set_media_type(&self, media_type: MediaType) {
        *self
            .media_type
            .write()
            .unwrap_or_else(PoisonError::into_inner) = media_type;
    }

    pub(crate) fn transport(&self) -> &OnceCell<Transport> {
        &self.transport
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={} ({})", self.alias, self.url, self.media_type().essence())
    }
}

impl fmt::Debug for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Source")
            .field("alias", &self.alias)
            .field("url", &self.url.as_str())
            .field("ext", &self.ext)
            .field("media_type", &self.media_type())
            .field("headers", &self.headers)
            .field("transport", &self.transport.get().map(Transport::kind))
            .finish()
    }
}

/// `file:` URL of the current working directory, with a trailing slash
pub fn working_dir_url() -> Result<Url> {
    let cwd = std::env::current_dir().map_err(|e| DataError::WorkingDirectory(e.to_string()))?;
    Url::from_directory_path(&cwd).map_err(|_| {
        DataError::WorkingDirectory(format!("{} is not an absolute path", cwd.display()))
    })
}

/// Resolve a relative filesystem path against `base`
///
/// The text is a literal path, so `?` and `#` stay part of the file name.
fn resolve(base: &Url, relative: &str) -> Result<Url> {
    base.join(&escape_path(relative))
        .map_err(|e| DataError::invalid_spec(relative, e.to_string()))
}

/// Percent-encode the characters a URL reference would otherwise read as
/// escapes, a query or a fragment
pub(crate) fn escape_path(path: &str) -> String {
    let mut escaped = String::with_capacity(path.len());
    for c in path.chars() {
        match c {
            '%' => escaped.push_str("%25"),
            '?' => escaped.push_str("%3F"),
            '#' => escaped.push_str("%23"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Extension of the last path segment, dot included
fn path_extension(path: &str) -> &str {
    let name = path.rsplit('/').next().unwrap_or(path);
    name.rfind('.').map_or("", |i| &name[i..])
}
