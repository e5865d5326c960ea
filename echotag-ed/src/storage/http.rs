//! S3-compatible object store source
//!
//! Objects are fetched with a plain `GET {endpoint}/{bucket}/{key}` (path-style
//! addressing), each key segment percent-encoded. Private buckets are reached through a presigning proxy or a
//! gateway accepting a bearer token.

use async_trait::async_trait;
use std::time::Duration;

use super::{AudioSource, FetchError};

const USER_AGENT: &str = concat!("echotag-ed/", env!("CARGO_PKG_VERSION"));

/// Object store source over HTTP(S)
pub struct HttpObjectSource {
    http_client: reqwest::Client,
    endpoint: String,
    bucket: String,
    token: Option<String>,
}

impl HttpObjectSource {
    pub fn new(
        endpoint: &str,
        bucket: &str,
        token: Option<String>,
    ) -> Result<Self, FetchError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| FetchError::Io(e.to_string()))?;

        Ok(Self {
            http_client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            bucket: bucket.trim_matches('/').to_string(),
            token: token.filter(|t| !t.trim().is_empty()),
        })
    }

    fn object_url(&self, key: &str) -> Result<reqwest::Url, FetchError> {
        let key = key.trim_start_matches('/');
        if key.trim().is_empty() {
            return Err(FetchError::InvalidPath("empty object key".to_string()));
        }
        if key.split('/').any(|segment| segment == "..") {
            return Err(FetchError::InvalidPath(format!(
                "parent directory references are not allowed: {}",
                key
            )));
        }

        let mut url = reqwest::Url::parse(&self.endpoint).map_err(|e| {
            FetchError::InvalidPath(format!("invalid endpoint {}: {}", self.endpoint, e))
        })?;
        url.path_segments_mut()
            .map_err(|_| {
                FetchError::InvalidPath(format!("endpoint cannot take a path: {}", self.endpoint))
            })?
            .pop_if_empty()
            .push(&self.bucket)
            .extend(key.split('/'));
        Ok(url)
    }
}

#[async_trait]
impl AudioSource for HttpObjectSource {
    fn describe(&self) -> String {
        format!("{}/{}", self.endpoint, self.bucket)
    }

    fn is_available(&self) -> bool {
        !self.endpoint.is_empty() && !self.bucket.is_empty()
    }

    async fn fetch(&self, path: &str) -> Result<Vec<u8>, FetchError> {
        let url = self.object_url(path)?;
        tracing::debug!(file_path = %path, url = %url, "Downloading object");

        let mut request = self.http_client.get(url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| FetchError::Io(e.to_string()))?;

        let status = response.status();
        if status == 404 {
            return Err(FetchError::NotFound(path.to_string()));
        }
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(FetchError::Io(format!(
                "object store returned {}: {}",
                status.as_u16(),
                error_text
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| FetchError::Io(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}
