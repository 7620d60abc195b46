//! Network boundary for the verification probe.
//!
//! This module defines what one HTTP exchange looks like to the rest of the
//! crate: the request that goes out, and everything observed when it
//! finished (status, transport failure, headers, body).
//! Currently supports:
//! - `HttpTransport` (reqwest, redirects not followed)

mod http;
mod transport;

pub use http::{HttpTransport, TransportSetupError};
pub use transport::{ErrorKind, Transport, TransportError};

use reqwest::Url;

/// `Accept` header sent with every probe request.
pub const DEFAULT_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// `User-Agent` header sent with every probe request.
///
/// The BCL server rejects unknown agents with a 4xx "unknown content" error,
/// so this string must stay exactly as is.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 6.1; WOW64) AppleWebKit/537.17 (KHTML, like Gecko) Chrome/24.0.1312.56 Safari/537.17";

/// An outgoing GET request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeRequest {
    pub url: Url,
    pub headers: Vec<(String, String)>,
}

impl ProbeRequest {
    /// Create a request with no headers.
    pub fn new(url: Url) -> Self {
        Self {
            url,
            headers: Vec::new(),
        }
    }

    /// Add a request header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// Everything observed about a finished exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedExchange {
    /// URL the request was sent to.
    pub request_url: Url,
    /// HTTP status, if a response line was received.
    pub status: Option<u16>,
    /// Failure below the HTTP layer (DNS, TCP, TLS, body read).
    pub transport_error: Option<TransportError>,
    /// Raw response headers in received order.
    pub headers: Vec<(String, String)>,
    /// Raw response body.
    pub body: Vec<u8>,
}

impl CompletedExchange {
    /// A response with a status line and body.
    pub fn response(request_url: Url, status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            request_url,
            status: Some(status),
            transport_error: None,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    /// An exchange that failed before any HTTP response arrived.
    pub fn failed(request_url: Url, error: TransportError) -> Self {
        Self {
            request_url,
            status: None,
            transport_error: Some(error),
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    /// Add a response header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Look up a header value, ignoring name case.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Body decoded as UTF-8, replacing invalid sequences.
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}
