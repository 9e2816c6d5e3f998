//! Error types for the datasource layer

use std::io;
use std::path::Path;
use thiserror::Error;

/// Result type alias for datasource operations
pub type Result<T> = std::result::Result<T, DataError>;

/// Error types that can occur while resolving, reading or decoding datasources
#[derive(Error, Debug, Clone)]
pub enum DataError {
    #[error("Invalid datasource ({spec}): {reason}")]
    InvalidSpec { spec: String, reason: String },

    #[error("Invalid datasource-header option '{0}'")]
    InvalidHeader(String),

    #[error("Duplicate datasource alias '{0}'")]
    DuplicateAlias(String),

    #[error("Undefined datasource '{0}'")]
    UndefinedAlias(String),

    #[error("Datasources with scheme {0} not yet supported")]
    UnsupportedScheme(String),

    #[error("Datasources of type {0} not yet supported")]
    UnsupportedType(String),

    #[error("Invalid media type '{value}': {reason}")]
    MediaType { value: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Can't get working directory: {0}")]
    WorkingDirectory(String),

    #[error("Can't {op} {path}: {message}")]
    Io {
        op: &'static str,
        path: String,
        kind: io::ErrorKind,
        message: String,
    },

    #[error("Unexpected HTTP status {status} on GET from {url}: {body}")]
    HttpStatus { status: u16, url: String, body: String },

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Secret store error: {0}")]
    SecretStore(String),

    #[error("Couldn't decode {media_type} data: {message}")]
    Decode { media_type: String, message: String },

    #[error("Couldn't read datasource '{alias}': {cause}")]
    Read {
        alias: String,
        cause: Box<DataError>,
    },
}

impl From<serde_json::Error> for DataError {
    fn from(err: serde_json::Error) -> Self {
        DataError::decode(crate::media_type::JSON, err)
    }
}

impl From<serde_yaml::Error> for DataError {
    fn from(err: serde_yaml::Error) -> Self {
        DataError::decode(crate::media_type::YAML, err)
    }
}

impl From<csv::Error> for DataError {
    fn from(err: csv::Error) -> Self {
        DataError::decode(crate::media_type::CSV, err)
    }
}

impl DataError {
    /// Whether this error is an operator mistake discoverable before any data flows
    ///
    /// These are the conditions a command-line front end aborts on: bad source or
    /// header syntax, alias collisions, unknown aliases, schemes and media types.
    pub fn is_config_error(&self) -> bool {
        match self {
            DataError::InvalidSpec { .. }
            | DataError::InvalidHeader(_)
            | DataError::DuplicateAlias(_)
            | DataError::UndefinedAlias(_)
            | DataError::UnsupportedScheme(_)
            | DataError::UnsupportedType(_)
            | DataError::MediaType { .. }
            | DataError::Config(_)
            | DataError::WorkingDirectory(_) => true,

            DataError::Read { cause, .. } => cause.is_config_error(),

            DataError::Io { .. }
            | DataError::HttpStatus { .. }
            | DataError::Http(_)
            | DataError::SecretStore(_)
            | DataError::Decode { .. } => false,
        }
    }

    /// Whether this error came from a remote transport and may be worth handling
    pub fn is_transport_error(&self) -> bool {
        match self {
            DataError::HttpStatus { .. } | DataError::Http(_) | DataError::SecretStore(_) => true,
            DataError::Read { cause, .. } => cause.is_transport_error(),
            _ => false,
        }
    }

    /// Whether the underlying file simply does not exist
    pub fn is_not_found(&self) -> bool {
        match self {
            DataError::Io { kind, .. } => *kind == io::ErrorKind::NotFound,
            DataError::HttpStatus { status, .. } => *status == 404,
            DataError::Read { cause, .. } => cause.is_not_found(),
            _ => false,
        }
    }

    /// HTTP status carried by this error, if any
    pub fn http_status(&self) -> Option<u16> {
        match self {
            DataError::HttpStatus { status, .. } => Some(*status),
            DataError::Read { cause, .. } => cause.http_status(),
            _ => None,
        }
    }

    /// Create an InvalidSpec error
    pub fn invalid_spec(spec: impl Into<String>, reason: impl Into<String>) -> Self {
        DataError::InvalidSpec {
            spec: spec.into(),
            reason: reason.into(),
        }
    }

    /// Create an Io error for an operation on a path
    pub fn io(op: &'static str, path: &Path, err: &io::Error) -> Self {
        DataError::Io {
            op,
            path: path.display().to_string(),
            kind: err.kind(),
            message: err.to_string(),
        }
    }

    /// Create a Decode error for the given media type
    pub fn decode(media_type: impl Into<String>, err: impl std::fmt::Display) -> Self {
        DataError::Decode {
            media_type: media_type.into(),
            message: err.to_string(),
        }
    }

    /// Wrap a reader failure with the alias it was reading
    pub fn read(alias: impl Into<String>, err: DataError) -> Self {
        DataError::Read {
            alias: alias.into(),
            cause: Box::new(err),
        }
    }
}
