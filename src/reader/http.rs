//! Reader for `http:` and `https:` datasources

use super::{transport_mismatch, SourceReader, Transport};
use crate::error::{DataError, Result};
use crate::media_type::MediaType;
use crate::source::Source;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Timeout applied to each datasource's HTTP client
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// HttpReader fetches datasources with GET requests
///
/// Each source gets its own client, built on first read and reused for every
/// later read of that source.
#[derive(Debug, Clone)]
pub struct HttpReader {
    timeout: Duration,
}

impl HttpReader {
    /// Create a new HttpReader with the default 5 second timeout
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    /// Create a new HttpReader with a custom timeout
    pub fn with_timeout(timeout: Duration) -> Self {
        HttpReader { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn build_client(&self) -> Result<Client> {
        Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| DataError::Http(format!("Failed to create HTTP client: {}", e)))
    }
}

impl Default for HttpReader {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SourceReader for HttpReader {
    /// Fetch the source's URL with the source's request headers
    ///
    /// Only a 200 response counts as success; anything else is returned as
    /// `DataError::HttpStatus` with the response body. When the response has a
    /// `Content-Type`, it replaces the media type inferred from the extension.
    async fn read(&self, source: &Source, _args: &[String]) -> Result<Bytes> {
        let transport = source
            .transport()
            .get_or_try_init(|| async { self.build_client().map(Transport::Http) })
            .await?;
        let client = match transport {
            Transport::Http(client) => client,
            other => return Err(transport_mismatch(source, other, "http")),
        };

        let url = source.url();
        debug!("Fetching datasource alias={} url={}", source.alias(), url);

        let response = client
            .get(url.clone())
            .headers(source.headers().to_header_map()?)
            .send()
            .await
            .map_err(|e| {
                warn!("GET request failed for url={}: {}", url, e);
                DataError::Http(format!("GET {} failed: {}", url, e))
            })?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned());
        debug!("Received response for url={}, status={}", url, status);

        let body = response.bytes().await.map_err(|e| {
            warn!("Failed to read response body for url={}: {}", url, e);
            DataError::Http(format!("Failed to read response body from {}: {}", url, e))
        })?;

        if status != StatusCode::OK {
            warn!("Unexpected status for url={}: status={}", url, status);
            return Err(DataError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        if let Some(content_type) = content_type.filter(|ct| !ct.trim().is_empty()) {
            source.set_media_type(MediaType::parse(&content_type)?);
        }

        info!(
            "Fetched datasource alias={} url={}: size={}, media_type={}",
            source.alias(),
            url,
            body.len(),
            source.media_type()
        );
        Ok(body)
    }
}
