//! HTTP and file fetching for tile sources.

use std::io::SeekFrom;
use std::path::PathBuf;
use std::time::Duration;

use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tracing::trace;

use super::{BoxFuture, SourceError};

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Trait for async fetch operations.
///
/// This abstraction allows for dependency injection and easier testing by
/// enabling mock clients in tests.
pub trait AsyncHttpClient: Send + Sync {
    /// Fetches a whole resource.
    fn get<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Bytes, SourceError>>;

    /// Fetches `length` bytes starting at `offset`.
    ///
    /// # Arguments
    ///
    /// * `url` - The resource location
    /// * `offset` - First byte to read
    /// * `length` - Number of bytes to read
    fn get_range<'a>(
        &'a self,
        url: &'a str,
        offset: u64,
        length: u64,
    ) -> BoxFuture<'a, Result<Bytes, SourceError>>;
}

/// Client backed by reqwest for `http(s)://` locations and the local
/// filesystem for everything else.
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    /// Creates a client with the default timeout.
    pub fn new() -> Result<Self, SourceError> {
        Self::with_timeout(DEFAULT_TIMEOUT_SECS)
    }

    /// Creates a client with a custom timeout.
    pub fn with_timeout(timeout_secs: u64) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| SourceError::Fetch(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    async fn fetch(&self, url: &str, range: Option<(u64, u64)>) -> Result<Bytes, SourceError> {
        let mut request = self.client.get(url);
        if let Some((offset, length)) = range {
            request = request.header(
                reqwest::header::RANGE,
                format!("bytes={}-{}", offset, offset + length.saturating_sub(1)),
            );
        }

        let response = request
            .send()
            .await
            .map_err(|e| SourceError::Fetch(format!("Request failed: {}", e)))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(SourceError::NotFound(url.to_string()));
        }
        if !status.is_success() {
            return Err(SourceError::Http {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let partial = status == reqwest::StatusCode::PARTIAL_CONTENT;
        let body = response
            .bytes()
            .await
            .map_err(|e| SourceError::Fetch(format!("Failed to read response: {}", e)))?;

        // Servers that ignore Range send the whole resource.
        match range {
            Some((offset, length)) if !partial => slice_range(body, offset, length),
            _ => Ok(body),
        }
    }
}

impl AsyncHttpClient for ReqwestClient {
    fn get<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Bytes, SourceError>> {
        Box::pin(async move {
            trace!(url, "GET");
            match local_path(url) {
                Some(path) => Ok(Bytes::from(read_file(&path).await?)),
                None => self.fetch(url, None).await,
            }
        })
    }

    fn get_range<'a>(
        &'a self,
        url: &'a str,
        offset: u64,
        length: u64,
    ) -> BoxFuture<'a, Result<Bytes, SourceError>> {
        Box::pin(async move {
            trace!(url, offset, length, "GET range");
            match local_path(url) {
                Some(path) => read_file_range(&path, offset, length).await,
                None => self.fetch(url, Some((offset, length))).await,
            }
        })
    }
}

/// Returns the filesystem path for non-HTTP locations.
fn local_path(url: &str) -> Option<PathBuf> {
    if url.starts_with("http://") || url.starts_with("https://") {
        return None;
    }
    Some(PathBuf::from(url.strip_prefix("file://").unwrap_or(url)))
}

async fn read_file(path: &PathBuf) -> Result<Vec<u8>, SourceError> {
    tokio::fs::read(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => SourceError::NotFound(path.display().to_string()),
        _ => SourceError::Io(format!("{}: {}", path.display(), e)),
    })
}

async fn read_file_range(path: &PathBuf, offset: u64, length: u64) -> Result<Bytes, SourceError> {
    let mut file = tokio::fs::File::open(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => SourceError::NotFound(path.display().to_string()),
        _ => SourceError::Io(format!("{}: {}", path.display(), e)),
    })?;

    let file_len = file.metadata().await?.len();
    if offset >= file_len {
        return Ok(Bytes::new());
    }
    let length = length.min(file_len - offset);

    file.seek(SeekFrom::Start(offset)).await?;
    let mut buf = vec![0u8; length as usize];
    file.read_exact(&mut buf).await?;
    Ok(Bytes::from(buf))
}

fn slice_range(body: Bytes, offset: u64, length: u64) -> Result<Bytes, SourceError> {
    let len = body.len() as u64;
    if offset > len {
        return Err(SourceError::Fetch(format!(
            "Range {}+{} beyond resource of {} bytes",
            offset, length, len
        )));
    }
    let end = offset.saturating_add(length).min(len);
    Ok(body.slice(offset as usize..end as usize))
}
