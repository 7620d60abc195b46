//! Classification of finished probe exchanges.
//!
//! Everything here is a pure function of its inputs: the session decides
//! what to do with the [`Outcome`], and the presenter shows the status text
//! and detail report.

use std::fmt::Write as _;

use reqwest::{StatusCode, Url};

use crate::key::Credential;
use crate::probe::{CompletedExchange, ErrorKind};

/// The exact body the search endpoint returns for a valid key and an empty
/// query.
pub const SUCCESS_BODY: &str = "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<results><keywords> </keywords><show_rows>0</show_rows><filters></filters><result/></results>\n";

/// Error text reported by TLS backends that could not be initialized.
const TLS_CONTEXT_MARKERS: &[&str] = &[
    "error creating ssl context",
    "error creating tls context",
    "error building tls connector",
];

/// Classified result of one exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Body matched [`SUCCESS_BODY`].
    Success,
    /// No usable HTTP response.
    TransportError { kind: ErrorKind, message: String },
    /// 4xx/5xx response; `message` is the canonical reason phrase.
    HttpError { status: u16, message: String },
    /// 3xx with a resolvable `Location`, already made absolute.
    Redirect(Url),
    /// Well-formed response with an unexpected body.
    UnrecognizedBody,
}

impl Outcome {
    /// Error kind for failed exchanges.
    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            Self::TransportError { kind, .. } => Some(*kind),
            Self::HttpError { status, .. } => ErrorKind::from_status(*status),
            _ => None,
        }
    }

    /// Whether the exchange failed at the transport or HTTP level.
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::TransportError { .. } | Self::HttpError { .. })
    }
}

fn reason_phrase(status: u16) -> String {
    StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("Unknown Status")
        .to_string()
}

fn redirect_target(exchange: &CompletedExchange) -> Option<Url> {
    let status = exchange.status?;
    if !(300..400).contains(&status) {
        return None;
    }
    let location = exchange.header("location")?;
    exchange.request_url.join(location.trim()).ok()
}

/// Classify a finished exchange.
pub fn classify(exchange: &CompletedExchange) -> Outcome {
    if let Some(error) = &exchange.transport_error {
        return Outcome::TransportError {
            kind: error.kind,
            message: error.message.clone(),
        };
    }

    if let Some(status) = exchange.status {
        if ErrorKind::from_status(status).is_some() {
            return Outcome::HttpError {
                status,
                message: reason_phrase(status),
            };
        }
    }

    if let Some(target) = redirect_target(exchange) {
        return Outcome::Redirect(target);
    }

    if exchange.body == SUCCESS_BODY.as_bytes() {
        Outcome::Success
    } else {
        Outcome::UnrecognizedBody
    }
}

fn is_tls_context_failure(message: &str) -> bool {
    let lowered = message.to_ascii_lowercase();
    TLS_CONTEXT_MARKERS.iter().any(|m| lowered.contains(m))
}

/// Short status line for an outcome.
///
/// `resolved_ip` is the address found by the IP check, if any. A lookup
/// failure with no known IP usually means the machine is offline.
pub fn status_text(outcome: &Outcome, resolved_ip: Option<&str>) -> String {
    let (kind, status, message) = match outcome {
        Outcome::Success => return "Success!".to_string(),
        Outcome::UnrecognizedBody => return "Unrecognized Response.".to_string(),
        Outcome::Redirect(_) => return "Redirecting...".to_string(),
        Outcome::TransportError { kind, message } => (Some(*kind), None, message.as_str()),
        Outcome::HttpError { status, message } => {
            (ErrorKind::from_status(*status), Some(*status), message.as_str())
        }
    };

    match kind {
        Some(ErrorKind::AuthenticationRequired) => "Invalid Auth Key".to_string(),
        Some(ErrorKind::ConnectionRefused) => "Network Error: Connection Refused".to_string(),
        Some(ErrorKind::UnknownContent) => {
            "Network Error: Unknown Content. Verify the User-Agent header".to_string()
        }
        Some(ErrorKind::HostNotFound) => {
            if resolved_ip.map_or(true, str::is_empty) {
                "Network Error: Offline.  Check your internet connection".to_string()
            } else {
                "Network Error: Host Not Found".to_string()
            }
        }
        Some(ErrorKind::UnknownNetwork) => {
            if is_tls_context_failure(message) {
                "TLS Error: SSL unavailable".to_string()
            } else {
                "Network Error: Unknown Network Error".to_string()
            }
        }
        _ => match status {
            Some(code) => format!("Network Error: {} - {}", code, message),
            None => format!("Network Error: {}", message),
        },
    }
}

/// Diagnostic block shown behind "details" in warning dialogs.
pub fn render_detail(
    exchange: &CompletedExchange,
    credential: &Credential,
    resolved_ip: Option<&str>,
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "BCL Key: \"{}\"", credential);
    if let Some(ip) = resolved_ip.filter(|ip| !ip.is_empty()) {
        let _ = writeln!(out, "IP Address: {}", ip);
    }

    if let Some(error) = &exchange.transport_error {
        let _ = writeln!(out, "Network Error {}: {}", error.kind, error.message);
    } else if let Some(status) = exchange.status {
        if let Some(kind) = ErrorKind::from_status(status) {
            let _ = writeln!(out, "Network Error {}: {}", kind, reason_phrase(status));
        }
    }

    match exchange.status {
        Some(status) => {
            let _ = writeln!(out, "HTTP Status: {}\n", status);
        }
        None => out.push_str("HTTP Status: N/A\n\n"),
    }

    if exchange.headers.is_empty() {
        out.push_str("Response Headers: N/A\n");
    } else {
        out.push_str("Response Headers:\n");
        for (name, value) in &exchange.headers {
            let _ = writeln!(out, "{}: {}", name, value);
        }
    }

    if exchange.body.is_empty() {
        out.push_str("\nResponse Body: N/A");
    } else {
        out.push_str("\nResponse Body:\n");
        out.push_str(&exchange.body_text());
    }
    out
}

/// The body as a dotted-quad IPv4 address, returned verbatim.
///
/// Each of the four octets is one to three digits with a value of at most
/// 255; leading zeros are allowed. Anything else, including surrounding
/// whitespace, is rejected.
pub fn parse_ipv4(body: &[u8]) -> Option<&str> {
    let text = std::str::from_utf8(body).ok()?;
    let mut octets = 0;
    for part in text.split('.') {
        let valid = (1..=3).contains(&part.len())
            && part.bytes().all(|b| b.is_ascii_digit())
            && part.parse::<u16>().map_or(false, |n| n <= 255);
        if !valid {
            return None;
        }
        octets += 1;
    }
    (octets == 4).then_some(text)
}
