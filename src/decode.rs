//! Selection of the structured decoder for a datasource's media type

use crate::error::{DataError, Result};
use crate::media_type::{MediaType, CSV, JSON, YAML};
use serde_json::Value;

/// Structured formats a datasource can be decoded from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Yaml,
    Csv,
}

impl Format {
    /// Format for a media type essence, if supported
    ///
    /// Besides the canonical types, the common YAML aliases sent by web servers
    /// are accepted.
    pub fn from_media_type(essence: &str) -> Option<Self> {
        match essence {
            JSON => Some(Format::Json),
            YAML | "application/x-yaml" | "text/yaml" | "text/x-yaml" => Some(Format::Yaml),
            CSV => Some(Format::Csv),
            _ => None,
        }
    }
}

/// Decode `data` according to `media_type`
pub fn decode(data: &[u8], media_type: &MediaType) -> Result<Value> {
    match Format::from_media_type(media_type.essence()) {
        Some(Format::Json) => decode_json(data),
        Some(Format::Yaml) => decode_yaml(data),
        Some(Format::Csv) => decode_csv(data),
        None => Err(DataError::UnsupportedType(media_type.essence().to_string())),
    }
}

pub fn decode_json(data: &[u8]) -> Result<Value> {
    Ok(serde_json::from_slice(data)?)
}

pub fn decode_yaml(data: &[u8]) -> Result<Value> {
    Ok(serde_yaml::from_slice(data)?)
}

/// Decode CSV into an array of rows, each an array of strings
///
/// The first line is returned as an ordinary row; every row must have the same
/// number of fields.
pub fn decode_csv(data: &[u8]) -> Result<Value> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_reader(data);

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(Value::Array(
            record.iter().map(|field| Value::String(field.to_string())).collect(),
        ));
    }
    Ok(Value::Array(rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_yaml() {
        let value = decode(b"value: hello world\n", &MediaType::new(YAML)).unwrap();
        assert_eq!(value["value"], "hello world");
    }

    #[test]
    fn test_decode_json() {
        let value = decode(br#"{"a":[1,2]}"#, &MediaType::new(JSON)).unwrap();
        assert_eq!(value, json!({"a": [1, 2]}));
    }

    #[test]
    fn test_decode_csv() {
        let value = decode(b"first,last\nada,lovelace\n", &MediaType::new(CSV)).unwrap();
        assert_eq!(value, json!([["first", "last"], ["ada", "lovelace"]]));
    }

    #[test]
    fn test_ragged_csv_fails() {
        let err = decode(b"a,b\nc\n", &MediaType::new(CSV)).unwrap_err();
        assert!(matches!(err, DataError::Decode { .. }));
    }

    #[test]
    fn test_yaml_aliases() {
        assert_eq!(Format::from_media_type("text/yaml"), Some(Format::Yaml));
        assert_eq!(Format::from_media_type("application/x-yaml"), Some(Format::Yaml));
    }

    #[test]
    fn test_unsupported_type() {
        match decode(b"<html/>", &MediaType::new("text/html")) {
            Err(DataError::UnsupportedType(t)) => assert_eq!(t, "text/html"),
            other => panic!("expected UnsupportedType, got {:?}", other),
        }
        assert!(matches!(
            decode(b"", &MediaType::default()),
            Err(DataError::UnsupportedType(_))
        ));
    }

    #[test]
    fn test_invalid_json() {
        let err = decode(b"{not json", &MediaType::new(JSON)).unwrap_err();
        assert!(err.to_string().starts_with("Couldn't decode application/json data"));
    }
}
