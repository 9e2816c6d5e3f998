//! Media type inference and parsing
//!
//! Sources carry a media type so their raw bytes can be handed to the right
//! decoder. The type is first inferred from the file extension and may later be
//! replaced by whatever the transport reports (an HTTP `Content-Type`, say).

use crate::error::{DataError, Result};
use mime_guess::mime::Mime;
use std::collections::BTreeMap;
use std::fmt;

pub const JSON: &str = "application/json";
pub const YAML: &str = "application/yaml";
pub const CSV: &str = "text/csv";

/// Extensions resolved before falling back to the platform table
const EXTENSION_TYPES: &[(&str, &str)] = &[
    (".json", JSON),
    (".yml", YAML),
    (".yaml", YAML),
    (".csv", CSV),
];

/// A parsed media type: `type/subtype` plus its parameters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaType {
    essence: String,
    params: BTreeMap<String, String>,
}

impl MediaType {
    /// Create a media type without parameters
    pub fn new(essence: impl Into<String>) -> Self {
        MediaType {
            essence: essence.into(),
            params: BTreeMap::new(),
        }
    }

    /// Parse a media type string such as `application/json; charset=utf-8`
    ///
    /// The type and parameter names are lowercased; quoted parameter values
    /// are unquoted.
    pub fn parse(value: &str) -> Result<Self> {
        let mime: Mime = value.trim().parse().map_err(|e| DataError::MediaType {
            value: value.to_string(),
            reason: format!("{}", e),
        })?;

        let params = mime
            .params()
            .map(|(name, val)| {
                (
                    name.as_str().to_ascii_lowercase(),
                    val.as_str().trim_matches('"').to_string(),
                )
            })
            .collect();

        Ok(MediaType {
            essence: mime.essence_str().to_ascii_lowercase(),
            params,
        })
    }

    /// Infer the media type for a file extension (including the leading dot)
    ///
    /// Returns `Ok(None)` for an empty or unknown extension, and an error when
    /// the table yields something that isn't a valid media type.
    pub fn from_extension(ext: &str) -> Result<Option<Self>> {
        match type_by_extension(ext) {
            Some(t) => MediaType::parse(&t).map(Some),
            None => Ok(None),
        }
    }

    /// `type/subtype` without parameters, empty when unresolved
    pub fn essence(&self) -> &str {
        &self.essence
    }

    pub fn params(&self) -> &BTreeMap<String, String> {
        &self.params
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.essence.is_empty()
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.essence)?;
        for (name, value) in &self.params {
            write!(f, "; {}={}", name, value)?;
        }
        Ok(())
    }
}

/// Look up the media type string registered for an extension such as `.yaml`
pub fn type_by_extension(ext: &str) -> Option<String> {
    let ext = ext.to_ascii_lowercase();
    if let Some((_, t)) = EXTENSION_TYPES.iter().find(|(e, _)| *e == ext) {
        return Some((*t).to_string());
    }

    let bare = ext.strip_prefix('.').unwrap_or(&ext);
    if bare.is_empty() {
        return None;
    }
    mime_guess::from_ext(bare).first_raw().map(str::to_string)
}
