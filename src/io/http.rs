use async_trait::async_trait;
use log::{debug, warn};
use reqwest::{Client, StatusCode, header};
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use super::{ReadAt, check_range};
use crate::error::{ZipError, ZipResult};

/// Transport settings for [`HttpRangeReader`].
#[derive(Debug, Clone)]
pub struct HttpOptions {
    /// Per-request timeout
    pub timeout: Duration,
    /// Attempts per range before giving up on timeouts and connection errors
    pub max_retry: u32,
    /// Delay before the first retry; later retries wait proportionally longer
    pub retry_backoff: Duration,
    /// Skip TLS certificate verification
    pub accept_invalid_certs: bool,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_retry: 10,
            retry_backoff: Duration::from_millis(500),
            accept_invalid_certs: false,
        }
    }
}

impl HttpOptions {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn max_retry(mut self, max_retry: u32) -> Self {
        self.max_retry = max_retry;
        self
    }

    pub fn retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    pub fn accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }
}

/// HTTP Range reader for remote ZIP files
pub struct HttpRangeReader {
    client: Client,
    url: String,
    size: u64,
    transferred_bytes: AtomicU64,
    options: HttpOptions,
}

impl HttpRangeReader {
    /// Create a new HTTP Range reader with default [`HttpOptions`].
    pub async fn new(url: String) -> ZipResult<Self> {
        Self::with_options(url, HttpOptions::default()).await
    }

    /// Create a new HTTP Range reader
    ///
    /// This will send a HEAD request to verify Range support and get file size.
    /// Any failure here is reported as [`ZipError::Unavailable`].
    pub async fn with_options(url: String, options: HttpOptions) -> ZipResult<Self> {
        let unavailable = |reason: String| ZipError::Unavailable(format!("{url}: {reason}"));

        let client = Client::builder()
            .timeout(options.timeout)
            .danger_accept_invalid_certs(options.accept_invalid_certs)
            .build()
            .map_err(|e| unavailable(e.to_string()))?;

        let resp = client
            .head(&url)
            .send()
            .await
            .map_err(|e| unavailable(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(unavailable(format!("HEAD returned {}", resp.status())));
        }

        let accept_ranges = resp
            .headers()
            .get(header::ACCEPT_RANGES)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("none");
        if !accept_ranges.contains("bytes") {
            return Err(unavailable("server does not support Range requests".into()));
        }

        let size = resp
            .headers()
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| unavailable("server did not return Content-Length".into()))?;

        debug!("{url}: {size} bytes, range requests supported");

        Ok(Self {
            client,
            url,
            size,
            transferred_bytes: AtomicU64::new(0),
            options,
        })
    }

    /// Get total bytes transferred from network
    pub fn transferred_bytes(&self) -> u64 {
        self.transferred_bytes.load(Ordering::Relaxed)
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

fn transport_error(err: impl std::error::Error + Send + Sync + 'static) -> ZipError {
    ZipError::Io(io::Error::other(err))
}

#[async_trait]
impl ReadAt for HttpRangeReader {
    async fn read_at(&self, offset: u64, buf: &mut [u8]) -> ZipResult<()> {
        check_range(offset, buf.len() as u64, self.size)?;
        if buf.is_empty() {
            return Ok(());
        }

        let end = offset + buf.len() as u64 - 1;
        let mut received = 0;
        let mut retry_count = 0;

        // Servers may answer with less than the requested range; keep asking for the rest.
        while received < buf.len() {
            let range = format!("bytes={}-{}", offset + received as u64, end);
            let result = self
                .client
                .get(&self.url)
                .header(header::RANGE, &range)
                .send()
                .await;

            match result {
                Ok(resp) => {
                    if resp.status() != StatusCode::PARTIAL_CONTENT {
                        return Err(ZipError::Io(io::Error::other(format!(
                            "range {range} answered with {}",
                            resp.status()
                        ))));
                    }

                    let bytes = resp.bytes().await.map_err(transport_error)?;
                    if bytes.is_empty() {
                        return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into());
                    }
                    let chunk_len = bytes.len().min(buf.len() - received);
                    buf[received..received + chunk_len].copy_from_slice(&bytes[..chunk_len]);
                    received += chunk_len;

                    self.transferred_bytes
                        .fetch_add(chunk_len as u64, Ordering::Relaxed);
                }
                Err(e) if e.is_timeout() || e.is_connect() => {
                    retry_count += 1;
                    if retry_count >= self.options.max_retry {
                        return Err(transport_error(e));
                    }
                    warn!(
                        "connection error, retry {}/{}: {}",
                        retry_count, self.options.max_retry, e
                    );
                    tokio::time::sleep(self.options.retry_backoff * retry_count).await;
                }
                Err(e) => return Err(transport_error(e)),
            }
        }

        Ok(())
    }

    fn size(&self) -> u64 {
        self.size
    }
}
