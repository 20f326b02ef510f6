//! HTTP object storage provider.
//!
//! Talks to a storage API exposing `{base_url}/object/{bucket}/{path}` for
//! reads, uploads and deletes, authenticated with a bearer service key.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, StatusCode};
use tracing::debug;

use docroute_core::config::HttpStorageConfig;
use docroute_core::error::{AppError, ErrorKind};
use docroute_core::result::AppResult;
use docroute_core::traits::StorageProvider;

/// Object storage reached over HTTP.
#[derive(Debug, Clone)]
pub struct HttpStorageProvider {
    client: Client,
    base_url: String,
    bucket: String,
    api_key: String,
}

impl HttpStorageProvider {
    /// Build the provider from configuration.
    pub fn new(config: &HttpStorageConfig, timeout: Duration) -> AppResult<Self> {
        if config.base_url.trim().is_empty() {
            return Err(AppError::configuration(
                "storage.http.base_url is required for the http provider",
            ));
        }
        let client = Client::builder().timeout(timeout).build().map_err(|e| {
            AppError::with_source(ErrorKind::Configuration, "Failed to build HTTP client", e)
        })?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            bucket: config.bucket.clone(),
            api_key: config.api_key.clone(),
        })
    }

    fn object_url(&self, path: &str) -> String {
        format!(
            "{}/object/{}/{}",
            self.base_url,
            self.bucket,
            path.trim_start_matches('/')
        )
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        let builder = self.client.request(method, url);
        if self.api_key.is_empty() {
            builder
        } else {
            builder.bearer_auth(&self.api_key)
        }
    }
}

fn transport_error(path: &str, e: reqwest::Error) -> AppError {
    let kind = if e.is_timeout() {
        ErrorKind::Timeout
    } else {
        ErrorKind::Storage
    };
    AppError::with_source(kind, format!("Storage request failed for {path}"), e)
}

fn status_error(path: &str, status: StatusCode) -> AppError {
    match status {
        StatusCode::NOT_FOUND => AppError::not_found(format!("Object not found: {path}")),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            AppError::configuration(format!("Storage rejected credentials ({status}) for {path}"))
        }
        s if s.is_server_error() || s == StatusCode::TOO_MANY_REQUESTS => {
            AppError::external(format!("Storage returned {status} for {path}"))
        }
        _ => AppError::storage(format!("Storage returned {status} for {path}")),
    }
}

#[async_trait]
impl StorageProvider for HttpStorageProvider {
    fn provider_type(&self) -> &str {
        "http"
    }

    async fn health_check(&self) -> AppResult<bool> {
        let url = format!("{}/bucket/{}", self.base_url, self.bucket);
        let response = self
            .request(reqwest::Method::GET, &url)
            .send()
            .await
            .map_err(|e| transport_error(&self.bucket, e))?;
        Ok(response.status().is_success())
    }

    async fn read_bytes(&self, path: &str) -> AppResult<Bytes> {
        let response = self
            .request(reqwest::Method::GET, &self.object_url(path))
            .send()
            .await
            .map_err(|e| transport_error(path, e))?;
        if !response.status().is_success() {
            return Err(status_error(path, response.status()));
        }
        response.bytes().await.map_err(|e| transport_error(path, e))
    }

    async fn write(&self, path: &str, data: Bytes) -> AppResult<()> {
        let len = data.len();
        let response = self
            .request(reqwest::Method::POST, &self.object_url(path))
            .header("x-upsert", "true")
            .body(data)
            .send()
            .await
            .map_err(|e| transport_error(path, e))?;
        if !response.status().is_success() {
            return Err(status_error(path, response.status()));
        }
        debug!(path, bytes = len, "Uploaded object");
        Ok(())
    }

    async fn delete(&self, path: &str) -> AppResult<()> {
        let response = self
            .request(reqwest::Method::DELETE, &self.object_url(path))
            .send()
            .await
            .map_err(|e| transport_error(path, e))?;
        match response.status() {
            s if s.is_success() || s == StatusCode::NOT_FOUND => Ok(()),
            s => Err(status_error(path, s)),
        }
    }

    async fn exists(&self, path: &str) -> AppResult<bool> {
        let response = self
            .request(reqwest::Method::HEAD, &self.object_url(path))
            .send()
            .await
            .map_err(|e| transport_error(path, e))?;
        match response.status() {
            s if s.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            s => Err(status_error(path, s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> HttpStorageConfig {
        HttpStorageConfig {
            base_url: "https://proj.example.co/storage/v1/".into(),
            bucket: "inbox-files".into(),
            api_key: "service-key".into(),
        }
    }

    #[test]
    fn test_object_url() {
        let provider = HttpStorageProvider::new(&config(), Duration::from_secs(5)).unwrap();
        assert_eq!(
            provider.object_url("/u1/job/a.pdf"),
            "https://proj.example.co/storage/v1/object/inbox-files/u1/job/a.pdf"
        );
    }

    #[test]
    fn test_missing_base_url_is_rejected() {
        let mut cfg = config();
        cfg.base_url = " ".into();
        let err = HttpStorageProvider::new(&cfg, Duration::from_secs(5)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Configuration);
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_error("p", StatusCode::NOT_FOUND).kind, ErrorKind::NotFound);
        assert!(status_error("p", StatusCode::BAD_GATEWAY).is_transient());
        assert_eq!(
            status_error("p", StatusCode::TOO_MANY_REQUESTS).kind,
            ErrorKind::ExternalService
        );
        assert!(!status_error("p", StatusCode::FORBIDDEN).is_transient());
    }
}
