//! Turning a file locator into bytes.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use reqwest::{Client, StatusCode};
use thiserror::Error;
use tracing::debug;

use docroute_core::error::{AppError, ErrorKind};
use docroute_core::traits::StorageProvider;
use docroute_entity::job::FileLocator;

/// Why the bytes of a file could not be obtained.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// The descriptor carries no usable reference.
    #[error("no file source")]
    NoSource,
    /// The object does not exist.
    #[error("file not found: {0}")]
    NotFound(String),
    /// The fetch did not finish in time.
    #[error("fetch timed out")]
    Timeout,
    /// A direct URL answered with an error status.
    #[error("HTTP {status} fetching {url}")]
    Http {
        /// Response status code.
        status: u16,
        /// URL requested.
        url: String,
    },
    /// The request never produced a response.
    #[error("transport error: {0}")]
    Transport(String),
    /// The storage provider failed.
    #[error("storage error: {0}")]
    Storage(AppError),
}

impl FetchError {
    /// Whether another attempt may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout | Self::Transport(_) => true,
            Self::Http { status, .. } => *status == 408 || *status == 429 || *status >= 500,
            Self::Storage(e) => e.is_transient(),
            Self::NoSource | Self::NotFound(_) => false,
        }
    }
}

impl From<AppError> for FetchError {
    fn from(err: AppError) -> Self {
        match err.kind {
            ErrorKind::NotFound => Self::NotFound(err.message),
            ErrorKind::Timeout => Self::Timeout,
            _ => Self::Storage(err),
        }
    }
}

/// Reads file bytes from wherever a locator points.
#[derive(Debug, Clone)]
pub struct ByteFetcher {
    storage: Arc<dyn StorageProvider>,
    client: Client,
    timeout: Duration,
}

impl ByteFetcher {
    /// Create a fetcher with a per-fetch timeout.
    pub fn new(storage: Arc<dyn StorageProvider>, timeout: Duration) -> Result<Self, AppError> {
        let client = Client::builder().timeout(timeout).build().map_err(|e| {
            AppError::with_source(ErrorKind::Configuration, "Failed to build HTTP client", e)
        })?;
        Ok(Self {
            storage,
            client,
            timeout,
        })
    }

    /// The storage provider behind stored paths.
    pub fn storage(&self) -> &Arc<dyn StorageProvider> {
        &self.storage
    }

    /// Fetch the bytes of one file, bounded by the configured timeout.
    pub async fn fetch(&self, locator: &FileLocator) -> Result<Bytes, FetchError> {
        match locator {
            FileLocator::Inline(bytes) => Ok(bytes.clone()),
            FileLocator::StoragePath(path) if path.trim().is_empty() => Err(FetchError::NoSource),
            FileLocator::Url(url) if url.trim().is_empty() => Err(FetchError::NoSource),
            FileLocator::StoragePath(path) => {
                debug!(path = %path, "Reading file from storage");
                tokio::time::timeout(self.timeout, self.storage.read_bytes(path))
                    .await
                    .map_err(|_| FetchError::Timeout)?
                    .map_err(FetchError::from)
            }
            FileLocator::Url(url) => {
                debug!(url = %url, "Downloading file");
                tokio::time::timeout(self.timeout, self.download(url))
                    .await
                    .map_err(|_| FetchError::Timeout)?
            }
        }
    }

    async fn download(&self, url: &str) -> Result<Bytes, FetchError> {
        let response = self.client.get(url).send().await.map_err(map_reqwest)?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound(url.to_string()));
        }
        if !status.is_success() {
            return Err(FetchError::Http {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        response.bytes().await.map_err(map_reqwest)
    }
}

fn map_reqwest(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Transport(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::LocalStorageProvider;

    async fn fetcher() -> (tempfile::TempDir, ByteFetcher) {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorageProvider::new(dir.path().to_str().unwrap())
            .await
            .unwrap();
        storage
            .write("u1/note.txt", Bytes::from_static(b"pay by friday"))
            .await
            .unwrap();
        let fetcher = ByteFetcher::new(Arc::new(storage), Duration::from_secs(5)).unwrap();
        (dir, fetcher)
    }

    #[tokio::test]
    async fn test_inline_and_stored() {
        let (_dir, fetcher) = fetcher().await;
        let inline = FileLocator::Inline(Bytes::from_static(b"abc"));
        assert_eq!(fetcher.fetch(&inline).await.unwrap(), Bytes::from_static(b"abc"));

        let stored = FileLocator::StoragePath("u1/note.txt".into());
        assert_eq!(
            fetcher.fetch(&stored).await.unwrap(),
            Bytes::from_static(b"pay by friday")
        );
    }

    #[tokio::test]
    async fn test_missing_and_empty_sources_are_permanent() {
        let (_dir, fetcher) = fetcher().await;

        let err = fetcher
            .fetch(&FileLocator::StoragePath("u1/absent.txt".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::NotFound(_)));
        assert!(!err.is_transient());

        let err = fetcher
            .fetch(&FileLocator::StoragePath(String::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::NoSource));
    }

    #[test]
    fn test_http_status_transience() {
        let http = |status| FetchError::Http {
            status,
            url: "https://h/x".into(),
        };
        assert!(http(503).is_transient());
        assert!(http(429).is_transient());
        assert!(!http(403).is_transient());
    }
}
