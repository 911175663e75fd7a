//! In-memory HTTP transport.
//!
//! Serves canned responses keyed by URL and records every request, so a run
//! can be exercised end to end without a network:
//!
//! ```
//! use patchsync::transport::memory::MemoryTransport;
//! use patchsync::transport::HttpTransport;
//!
//! let transport = MemoryTransport::new();
//! transport.serve("http://x/a.bin", vec![1, 2, 3]);
//!
//! let response = transport.get("http://x/a.bin", None).unwrap();
//! assert_eq!(response.status, 200);
//! assert_eq!(transport.requests(), vec!["http://x/a.bin".to_string()]);
//! ```

use std::collections::HashMap;
use std::io::Cursor;
use std::time::Duration;

use parking_lot::Mutex;

use super::{HttpResponse, HttpTransport, TransportError};

#[derive(Debug, Clone)]
enum Route {
    Body { status: u16, body: Vec<u8> },
    Timeout,
    Fail(String),
}

/// A single request observed by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    /// Requested URL.
    pub url: String,
    /// Timeout the caller asked for.
    pub timeout: Option<Duration>,
}

/// Transport serving canned responses from memory.
///
/// Unknown URLs answer `404`.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    routes: Mutex<HashMap<String, Route>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl MemoryTransport {
    /// Create an empty transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` with status 200 at `url`.
    pub fn serve(&self, url: impl Into<String>, body: impl Into<Vec<u8>>) {
        self.serve_status(url, 200, body);
    }

    /// Serve `body` with the given status at `url`.
    pub fn serve_status(&self, url: impl Into<String>, status: u16, body: impl Into<Vec<u8>>) {
        self.routes.lock().insert(
            url.into(),
            Route::Body {
                status,
                body: body.into(),
            },
        );
    }

    /// Make requests to `url` time out.
    pub fn timeout(&self, url: impl Into<String>) {
        self.routes.lock().insert(url.into(), Route::Timeout);
    }

    /// Make requests to `url` fail at the connection level.
    pub fn fail(&self, url: impl Into<String>, reason: impl Into<String>) {
        self.routes
            .lock()
            .insert(url.into(), Route::Fail(reason.into()));
    }

    /// URLs requested so far, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().iter().map(|r| r.url.clone()).collect()
    }

    /// Requests observed so far, including the timeout each asked for.
    pub fn recorded(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }

    /// Number of requests made to `url`.
    pub fn request_count(&self, url: &str) -> usize {
        self.requests.lock().iter().filter(|r| r.url == url).count()
    }
}

impl HttpTransport for MemoryTransport {
    fn get(&self, url: &str, timeout: Option<Duration>) -> Result<HttpResponse, TransportError> {
        self.requests.lock().push(RecordedRequest {
            url: url.to_string(),
            timeout,
        });

        let route = self.routes.lock().get(url).cloned();
        match route {
            Some(Route::Body { status, body }) => {
                let len = body.len() as u64;
                Ok(HttpResponse::new(status, Some(len), Box::new(Cursor::new(body))))
            }
            Some(Route::Timeout) => Err(TransportError::Timeout),
            Some(Route::Fail(reason)) => Err(TransportError::Request(reason)),
            None => Ok(HttpResponse::new(
                404,
                Some(0),
                Box::new(Cursor::new(Vec::new())),
            )),
        }
    }
}
