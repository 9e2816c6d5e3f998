//! Per-datasource HTTP request headers
//!
//! Headers are given on the command line as `alias=Name: value`. Repeating an
//! alias and name adds another value, so multi-valued headers keep their order.

use crate::error::{DataError, Result};
use http::{HeaderMap, HeaderName, HeaderValue};
use std::collections::{BTreeMap, HashMap};

/// Ordered header values keyed by canonical header name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: BTreeMap<String, Vec<String>>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value, canonicalizing the header name
    pub fn append(&mut self, name: &str, value: impl Into<String>) {
        self.entries
            .entry(canonical_header_key(name))
            .or_default()
            .push(value.into());
    }

    /// All values recorded for `name`, in insertion order
    pub fn get_all(&self, name: &str) -> &[String] {
        self.entries
            .get(&canonical_header_key(name))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(name, values)| (name.as_str(), values.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Convert into a map suitable for an outgoing request
    pub fn to_header_map(&self) -> Result<HeaderMap> {
        let mut map = HeaderMap::new();
        for (name, values) in &self.entries {
            let header = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| DataError::InvalidHeader(format!("{}: {}", name, e)))?;
            for value in values {
                let value = HeaderValue::from_str(value)
                    .map_err(|e| DataError::InvalidHeader(format!("{}: {}", name, e)))?;
                map.append(header.clone(), value);
            }
        }
        Ok(map)
    }
}

/// Parse `alias=Name: value` arguments into headers per alias
pub fn parse_header_args<S: AsRef<str>>(header_args: &[S]) -> Result<HashMap<String, Headers>> {
    let mut headers: HashMap<String, Headers> = HashMap::new();
    for arg in header_args {
        let (alias, name, value) = split_header_arg(arg.as_ref())?;
        headers
            .entry(alias.to_string())
            .or_default()
            .append(name, value.trim());
    }
    Ok(headers)
}

fn split_header_arg(arg: &str) -> Result<(&str, &str, &str)> {
    let (alias, header) = arg
        .split_once('=')
        .ok_or_else(|| DataError::InvalidHeader(arg.to_string()))?;
    let (name, value) = header
        .split_once(':')
        .ok_or_else(|| DataError::InvalidHeader(arg.to_string()))?;
    Ok((alias, name, value))
}

/// Canonical MIME header form: the first letter and any letter after a hyphen
/// are uppercased, the rest lowercased (`content-type` becomes `Content-Type`)
///
/// A name containing a space or other non-token byte is returned unchanged.
pub fn canonical_header_key(name: &str) -> String {
    if !name.bytes().all(is_token_byte) {
        return name.to_string();
    }

    let mut upper = true;
    name.chars()
        .map(|c| {
            let out = if upper {
                c.to_ascii_uppercase()
            } else {
                c.to_ascii_lowercase()
            };
            upper = c == '-';
            out
        })
        .collect()
}

fn is_token_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_header_key() {
        assert_eq!(canonical_header_key("content-type"), "Content-Type");
        assert_eq!(canonical_header_key("X-API-KEY"), "X-Api-Key");
        assert_eq!(canonical_header_key("accept"), "Accept");
        assert_eq!(canonical_header_key("bad header"), "bad header");
    }

    #[test]
    fn test_parse_header_args() {
        let headers = parse_header_args(&[
            "foo=Accept: application/json",
            "foo=x-token:  abc ",
            "bar=Authorization: Basic xyz",
        ])
        .unwrap();

        assert_eq!(headers.len(), 2);
        let foo = &headers["foo"];
        assert_eq!(foo.get_all("Accept"), ["application/json"]);
        assert_eq!(foo.get_all("X-Token"), ["abc"]);
        assert_eq!(headers["bar"].get_all("authorization"), ["Basic xyz"]);
    }

    #[test]
    fn test_multi_valued_headers_keep_order() {
        let headers =
            parse_header_args(&["foo=Accept: text/csv", "foo=accept: application/json"]).unwrap();
        assert_eq!(
            headers["foo"].get_all("Accept"),
            ["text/csv", "application/json"]
        );
    }

    #[test]
    fn test_value_may_contain_colons() {
        let headers = parse_header_args(&["foo=Referer: http://example.com:8080/"]).unwrap();
        assert_eq!(
            headers["foo"].get_all("Referer"),
            ["http://example.com:8080/"]
        );
    }

    #[test]
    fn test_malformed_entries() {
        assert!(matches!(
            parse_header_args(&["Accept: application/json"]),
            Err(DataError::InvalidHeader(_))
        ));
        assert!(matches!(
            parse_header_args(&["foo=Accept application/json"]),
            Err(DataError::InvalidHeader(_))
        ));
    }

    #[test]
    fn test_to_header_map() {
        let mut headers = Headers::new();
        headers.append("accept", "text/csv");
        headers.append("Accept", "application/json");
        let map = headers.to_header_map().unwrap();
        let values: Vec<_> = map.get_all("accept").iter().collect();
        assert_eq!(values.len(), 2);
        assert_eq!(values[0], "text/csv");
    }
}
