//! Transport trait and the failure taxonomy shared by every transport.

use std::error::Error as StdError;
use std::fmt;

use async_trait::async_trait;

use super::{CompletedExchange, ProbeRequest};

/// Trait for anything that can run one probe request.
///
/// Implementations never fail outright: every problem is reported inside the
/// returned [`CompletedExchange`] so it can be classified and shown to the
/// user along with whatever part of the response did arrive.
///
/// # Example
///
/// ```ignore
/// use bcl_diag::probe::{HttpTransport, ProbeRequest, Transport};
///
/// async fn fetch(transport: &dyn Transport, request: ProbeRequest) {
///     let exchange = transport.get(&request).await;
///     println!("status: {:?}", exchange.status);
/// }
/// ```
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a GET request and collect the response.
    async fn get(&self, request: &ProbeRequest) -> CompletedExchange;
}

/// Kind of failure behind an unsuccessful exchange.
///
/// The first group comes from the network stack; the second is derived from
/// HTTP error statuses (see [`ErrorKind::from_status`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    ConnectionRefused,
    HostNotFound,
    Timeout,
    /// TLS failures and anything else the network stack could not complete.
    UnknownNetwork,
    Other,

    AuthenticationRequired,
    ProxyAuthenticationRequired,
    ContentAccessDenied,
    ContentNotFound,
    /// A 4xx status with no more specific kind.
    UnknownContent,
    ServerError,
}

impl ErrorKind {
    /// Error kind for an HTTP status, or `None` for non-error statuses.
    pub fn from_status(status: u16) -> Option<Self> {
        match status {
            401 => Some(Self::AuthenticationRequired),
            403 => Some(Self::ContentAccessDenied),
            404 => Some(Self::ContentNotFound),
            407 => Some(Self::ProxyAuthenticationRequired),
            400..=499 => Some(Self::UnknownContent),
            500..=599 => Some(Self::ServerError),
            _ => None,
        }
    }

    /// Short identifier used in detail reports and logs.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::ConnectionRefused => "connection_refused",
            Self::HostNotFound => "host_not_found",
            Self::Timeout => "timeout",
            Self::UnknownNetwork => "unknown_network",
            Self::Other => "other",
            Self::AuthenticationRequired => "authentication_required",
            Self::ProxyAuthenticationRequired => "proxy_authentication_required",
            Self::ContentAccessDenied => "content_access_denied",
            Self::ContentNotFound => "content_not_found",
            Self::UnknownContent => "unknown_content",
            Self::ServerError => "server_error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A failure below the HTTP layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportError {
    pub kind: ErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// Render an error with its full source chain.
///
/// reqwest's top-level message is generic ("error sending request"); the
/// useful part (dns, refused, tls) lives in the sources.
fn chain_message(err: &(dyn StdError + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}

fn io_error_kind(err: &(dyn StdError + 'static)) -> Option<std::io::ErrorKind> {
    let mut source = Some(err);
    while let Some(cause) = source {
        if let Some(io) = cause.downcast_ref::<std::io::Error>() {
            return Some(io.kind());
        }
        source = cause.source();
    }
    None
}

impl From<&reqwest::Error> for TransportError {
    fn from(err: &reqwest::Error) -> Self {
        let message = chain_message(err);
        let lowered = message.to_ascii_lowercase();

        let kind = if err.is_timeout() {
            ErrorKind::Timeout
        } else if io_error_kind(err) == Some(std::io::ErrorKind::ConnectionRefused)
            || lowered.contains("connection refused")
        {
            ErrorKind::ConnectionRefused
        } else if lowered.contains("dns error") || lowered.contains("failed to lookup address") {
            ErrorKind::HostNotFound
        } else if err.is_connect() || err.is_request() || err.is_body() || err.is_builder() {
            ErrorKind::UnknownNetwork
        } else {
            ErrorKind::Other
        };

        Self { kind, message }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        Self::from(&err)
    }
}
