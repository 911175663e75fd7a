//! HTTP transport abstraction.
//!
//! All network I/O of a run goes through [`HttpTransport`]. The production
//! implementation is [`ReqwestTransport`]; [`memory::MemoryTransport`] serves
//! canned responses for tests and offline tooling.

pub mod memory;

use std::fmt;
use std::io::Read;
use std::time::Duration;

use thiserror::Error;

/// User agent sent with every request.
pub const USER_AGENT: &str = concat!("patchsync/", env!("CARGO_PKG_VERSION"));

/// Streaming response body.
pub type BodyReader = Box<dyn Read + Send>;

/// Errors raised by a transport before a response is available.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The request did not complete within its timeout.
    #[error("request timed out")]
    Timeout,

    /// The request could not be sent or the connection failed.
    #[error("request failed: {0}")]
    Request(String),

    /// The HTTP client could not be constructed.
    #[error("failed to create HTTP client: {0}")]
    Client(String),
}

/// An HTTP response whose body has not been consumed yet.
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Value of the `Content-Length` header, when present.
    pub content_length: Option<u64>,
    /// Response body, read incrementally.
    pub body: BodyReader,
}

impl HttpResponse {
    /// Create a response from its parts.
    pub fn new(status: u16, content_length: Option<u64>, body: BodyReader) -> Self {
        Self {
            status,
            content_length,
            body,
        }
    }

    /// Whether the status is in the 2xx range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

impl fmt::Debug for HttpResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpResponse")
            .field("status", &self.status)
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

/// Trait for HTTP GET operations.
///
/// This abstraction allows for dependency injection and easier testing by
/// enabling in-memory transports in tests.
pub trait HttpTransport: Send + Sync {
    /// Issue a GET request.
    ///
    /// `timeout` bounds the whole request including body reads. `None` means
    /// no explicit bound beyond what the underlying transport imposes.
    fn get(&self, url: &str, timeout: Option<Duration>) -> Result<HttpResponse, TransportError>;
}

/// Real HTTP transport implementation using reqwest.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::blocking::Client,
}

impl ReqwestTransport {
    /// Create a transport with no default timeout.
    pub fn new() -> Result<Self, TransportError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(None::<Duration>)
            .build()
            .map_err(|e| TransportError::Client(e.to_string()))?;

        Ok(Self { client })
    }
}

impl HttpTransport for ReqwestTransport {
    fn get(&self, url: &str, timeout: Option<Duration>) -> Result<HttpResponse, TransportError> {
        let mut request = self.client.get(url);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout
            } else {
                TransportError::Request(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        let content_length = response.content_length();
        Ok(HttpResponse::new(status, content_length, Box::new(response)))
    }
}
