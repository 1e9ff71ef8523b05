//! Raw-socket transport: hand-rolled HTTP/1.0 over TCP.
//!
//! Last rung of the fallback ladder, for the rare case where both reqwest
//! strategies fail on client-side grounds (TLS stack trouble, proxy
//! interference) but the endpoint is reachable over plain http. Speaking
//! HTTP/1.0 with `Connection: close` keeps the response unframed - no
//! chunked encoding, body ends at EOF - so the parser stays trivial.
//!
//! Refuses https URLs outright; this transport has no TLS.

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use async_trait::async_trait;
use tracing::warn;

use super::{Method, RequestSpec, Transport, TransportError, TransportOutcome};

const NAME: &str = "raw-socket";

/// Headers this transport owns; spec-supplied values for them are logged
/// and skipped rather than silently merged.
const RESERVED_HEADERS: [&str; 3] = ["host", "connection", "content-length"];

/// Plain-TCP HTTP/1.0 transport.
#[derive(Debug, Clone, Default)]
pub struct RawTransport;

impl RawTransport {
    /// Creates the transport.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Transport for RawTransport {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn send(&self, spec: &RequestSpec) -> Result<TransportOutcome, TransportError> {
        if spec.url.scheme() != "http" {
            return Err(TransportError::Unsupported {
                transport: NAME,
                reason: format!("scheme '{}' requires TLS", spec.url.scheme()),
            });
        }

        let host = spec.url.host_str().ok_or_else(|| TransportError::Unsupported {
            transport: NAME,
            reason: "URL has no host".to_string(),
        })?;
        let port = spec.url.port_or_known_default().unwrap_or(80);

        let request_text = build_request_text(spec, host);

        let exchange = async {
            let mut stream = TcpStream::connect((host, port)).await.map_err(|source| {
                TransportError::Io {
                    url: spec.url.to_string(),
                    transport: NAME,
                    source,
                }
            })?;
            stream
                .write_all(request_text.as_bytes())
                .await
                .map_err(|source| TransportError::Io {
                    url: spec.url.to_string(),
                    transport: NAME,
                    source,
                })?;

            let mut raw = Vec::new();
            stream
                .read_to_end(&mut raw)
                .await
                .map_err(|source| TransportError::Io {
                    url: spec.url.to_string(),
                    transport: NAME,
                    source,
                })?;
            Ok(raw)
        };

        let raw = tokio::time::timeout(spec.timeout, exchange)
            .await
            .map_err(|_| TransportError::Timeout {
                url: spec.url.to_string(),
                transport: NAME,
            })??;

        let (status, body) = parse_response(&raw).map_err(|reason| {
            TransportError::MalformedResponse {
                url: spec.url.to_string(),
                transport: NAME,
                reason,
            }
        })?;

        if body.is_empty() {
            return Err(TransportError::EmptyBody {
                url: spec.url.to_string(),
                transport: NAME,
                status,
            });
        }

        Ok(TransportOutcome {
            status,
            body,
            transport: NAME,
        })
    }
}

/// Serializes the request line, headers, and optional form body.
fn build_request_text(spec: &RequestSpec, host: &str) -> String {
    let path = match spec.url.query() {
        Some(q) => format!("{}?{}", spec.url.path(), q),
        None => spec.url.path().to_string(),
    };

    let mut text = format!("{} {} HTTP/1.0\r\n", spec.method.as_str(), path);
    text.push_str(&format!("Host: {host}\r\n"));
    text.push_str("Connection: close\r\n");

    let mut has_content_type = false;
    for (name, value) in &spec.headers {
        let lower = name.to_lowercase();
        if RESERVED_HEADERS.contains(&lower.as_str()) {
            warn!(
                transport = NAME,
                header = %name,
                "Header is managed by the raw transport; skipping spec value"
            );
            continue;
        }
        if lower == "content-type" {
            has_content_type = true;
        }
        text.push_str(&format!("{name}: {value}\r\n"));
    }

    let body = spec.encoded_form();
    if let Some(body) = &body {
        if matches!(spec.method, Method::Post) {
            if !has_content_type {
                text.push_str("Content-Type: application/x-www-form-urlencoded\r\n");
            }
            text.push_str(&format!("Content-Length: {}\r\n", body.len()));
        }
    }

    text.push_str("\r\n");
    if matches!(spec.method, Method::Post) {
        if let Some(body) = body {
            text.push_str(&body);
        }
    }
    text
}

/// Splits raw response bytes into a status code and body text.
///
/// Returns a human-readable reason when the bytes are not an HTTP response.
fn parse_response(raw: &[u8]) -> Result<(u16, String), String> {
    let text = String::from_utf8_lossy(raw);

    let header_end = text
        .find("\r\n\r\n")
        .ok_or_else(|| "no header/body separator".to_string())?;
    let head = &text[..header_end];
    let body = text[header_end + 4..].to_string();

    let status_line = head.lines().next().ok_or_else(|| "empty response".to_string())?;
    let mut parts = status_line.split_whitespace();
    let version = parts.next().unwrap_or_default();
    if !version.starts_with("HTTP/") {
        return Err(format!("not an HTTP status line: {status_line}"));
    }
    let status: u16 = parts
        .next()
        .and_then(|code| code.parse().ok())
        .ok_or_else(|| format!("unparseable status code in: {status_line}"))?;

    Ok((status, body))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use url::Url;

    use super::*;

    // ==================== Request Serialization Tests ====================

    #[test]
    fn test_build_request_text_get() {
        let spec = RequestSpec::get(
            Url::parse("http://example.com/v1/cpf/11144477735?full=1").unwrap(),
            Duration::from_secs(5),
        )
        .with_header("User-Agent", "ua-test");

        let text = build_request_text(&spec, "example.com");
        assert!(text.starts_with("GET /v1/cpf/11144477735?full=1 HTTP/1.0\r\n"));
        assert!(text.contains("Host: example.com\r\n"));
        assert!(text.contains("Connection: close\r\n"));
        assert!(text.contains("User-Agent: ua-test\r\n"));
        assert!(text.ends_with("\r\n\r\n"));
    }

    #[test]
    fn test_build_request_text_post_has_length_and_body() {
        let spec = RequestSpec::post_form(
            Url::parse("http://example.com/consulta").unwrap(),
            vec![("cpf".to_string(), "11144477735".to_string())],
            Duration::from_secs(5),
        );

        let text = build_request_text(&spec, "example.com");
        assert!(text.starts_with("POST /consulta HTTP/1.0\r\n"));
        assert!(text.contains("Content-Type: application/x-www-form-urlencoded\r\n"));
        assert!(text.contains("Content-Length: 15\r\n"));
        assert!(text.ends_with("\r\n\r\ncpf=11144477735"));
    }

    #[test]
    fn test_build_request_text_skips_reserved_headers() {
        let spec = RequestSpec::get(
            Url::parse("http://example.com/").unwrap(),
            Duration::from_secs(5),
        )
        .with_header("Host", "spoofed.example")
        .with_header("Referer", "http://example.com/");

        let text = build_request_text(&spec, "example.com");
        assert!(!text.contains("spoofed.example"));
        assert!(text.contains("Host: example.com\r\n"));
        assert!(text.contains("Referer: http://example.com/\r\n"));
    }

    // ==================== Response Parsing Tests ====================

    #[test]
    fn test_parse_response_valid() {
        let raw = b"HTTP/1.0 200 OK\r\nContent-Type: text/html\r\n\r\n<html>hi</html>";
        let (status, body) = parse_response(raw).unwrap();
        assert_eq!(status, 200);
        assert_eq!(body, "<html>hi</html>");
    }

    #[test]
    fn test_parse_response_non_200_is_still_parsed() {
        let raw = b"HTTP/1.1 403 Forbidden\r\n\r\nblocked";
        let (status, body) = parse_response(raw).unwrap();
        assert_eq!(status, 403);
        assert_eq!(body, "blocked");
    }

    #[test]
    fn test_parse_response_rejects_non_http() {
        let raw = b"SSH-2.0-OpenSSH_9.6\r\n\r\nnope";
        assert!(parse_response(raw).is_err());
    }

    #[test]
    fn test_parse_response_rejects_missing_separator() {
        let raw = b"HTTP/1.0 200 OK\r\nContent-Type: text/html";
        assert!(parse_response(raw).is_err());
    }

    // ==================== Scheme Guard Tests ====================

    #[tokio::test]
    async fn test_https_is_refused() {
        let transport = RawTransport::new();
        let spec = RequestSpec::get(
            Url::parse("https://example.com/").unwrap(),
            Duration::from_secs(1),
        );
        let err = transport.send(&spec).await.unwrap_err();
        assert!(matches!(err, TransportError::Unsupported { .. }));
    }
}
