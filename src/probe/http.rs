//! reqwest-backed transport.

use async_trait::async_trait;
use reqwest::{redirect, Client};
use thiserror::Error;
use tracing::{debug, warn};

use super::{CompletedExchange, ProbeRequest, Transport, TransportError};

/// The HTTP client could not be built (usually the TLS backend).
#[derive(Debug, Error)]
#[error("failed to build HTTP client: {0}")]
pub struct TransportSetupError(#[from] reqwest::Error);

/// Transport that performs real HTTP requests.
///
/// Redirects are not followed: a 3xx comes back as-is so the user can be
/// asked whether to go to the new location.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Create a transport with redirect following disabled.
    pub fn new() -> Result<Self, TransportSetupError> {
        let client = Client::builder()
            .redirect(redirect::Policy::none())
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, request: &ProbeRequest) -> CompletedExchange {
        let url = request.url.clone();
        debug!(url = %url, "sending probe request");

        let mut builder = self.client.get(url.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(err) => {
                let error = TransportError::from(&err);
                warn!(url = %url, kind = %error.kind, "probe request failed: {}", error.message);
                return CompletedExchange::failed(url, error);
            }
        };

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();

        let mut exchange = CompletedExchange {
            request_url: url,
            status: Some(status),
            transport_error: None,
            headers,
            body: Vec::new(),
        };

        match response.bytes().await {
            Ok(body) => exchange.body = body.to_vec(),
            Err(err) => {
                let error = TransportError::from(&err);
                warn!(url = %exchange.request_url, "failed to read response body: {}", error.message);
                exchange.transport_error = Some(error);
            }
        }

        debug!(
            url = %exchange.request_url,
            status,
            bytes = exchange.body.len(),
            "probe request finished"
        );
        exchange
    }
}
