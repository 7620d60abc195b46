//! Tests for `HttpTransport` against a local canned HTTP responder.

use bcl_diag::config::ProbeConfig;
use bcl_diag::probe::{ErrorKind, HttpTransport, Transport, DEFAULT_USER_AGENT};
use reqwest::Url;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Serve one connection with `response`; resolves to the raw request head.
async fn serve_once(response: &'static str) -> (Url, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = stream.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
        }
        stream.write_all(response.as_bytes()).await.unwrap();
        stream.shutdown().await.unwrap();
        String::from_utf8_lossy(&request).into_owned()
    });
    let url = Url::parse(&format!("http://{}/api/search/?show_rows=0", addr)).unwrap();
    (url, handle)
}

fn probe_config(url: &Url) -> ProbeConfig {
    ProbeConfig::new(url.clone(), url.clone())
}

#[tokio::test]
async fn sends_probe_headers_and_reads_body() {
    let (url, server) = serve_once(
        "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 11\r\nConnection: close\r\n\r\n203.0.113.5",
    )
    .await;
    let transport = HttpTransport::new().unwrap();

    let exchange = transport.get(&probe_config(&url).request(url.clone())).await;
    let request = server.await.unwrap().to_ascii_lowercase();

    assert_eq!(exchange.status, Some(200));
    assert!(exchange.transport_error.is_none());
    assert_eq!(exchange.body, b"203.0.113.5");
    assert_eq!(exchange.header("content-type"), Some("text/plain"));
    assert_eq!(exchange.request_url, url);

    assert!(request.starts_with("get /api/search/?show_rows=0 http/1.1"));
    assert!(request.contains(&format!("user-agent: {}", DEFAULT_USER_AGENT.to_ascii_lowercase())));
    assert!(request.contains("accept: text/html,application/xhtml+xml"));
}

#[tokio::test]
async fn redirect_is_not_followed() {
    let (url, server) = serve_once(
        "HTTP/1.1 302 Found\r\nLocation: https://bcl.example/next\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
    )
    .await;
    let transport = HttpTransport::new().unwrap();

    let exchange = transport.get(&probe_config(&url).request(url.clone())).await;
    server.await.unwrap();

    assert_eq!(exchange.status, Some(302));
    assert_eq!(exchange.header("location"), Some("https://bcl.example/next"));
    assert!(exchange.body.is_empty());
}

#[tokio::test]
async fn error_status_keeps_headers_and_body() {
    let (url, server) = serve_once(
        "HTTP/1.1 401 Unauthorized\r\nWWW-Authenticate: OAuth\r\nContent-Length: 12\r\nConnection: close\r\n\r\nbad auth key",
    )
    .await;
    let transport = HttpTransport::new().unwrap();

    let exchange = transport.get(&probe_config(&url).request(url.clone())).await;
    server.await.unwrap();

    assert_eq!(exchange.status, Some(401));
    assert!(exchange.transport_error.is_none());
    assert_eq!(exchange.header("www-authenticate"), Some("OAuth"));
    assert_eq!(exchange.body_text(), "bad auth key");
}

#[tokio::test]
async fn refused_connection_is_classified() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let url = Url::parse(&format!("http://{}/ip.php", addr)).unwrap();
    let transport = HttpTransport::new().unwrap();
    let exchange = transport.get(&probe_config(&url).request(url.clone())).await;

    assert_eq!(exchange.status, None);
    let error = exchange.transport_error.unwrap();
    assert_eq!(error.kind, ErrorKind::ConnectionRefused);
    assert!(!error.message.is_empty());
}
