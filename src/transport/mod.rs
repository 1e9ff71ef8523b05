//! Transport strategies and the fallback executor.
//!
//! One logical request may travel over any of several HTTP mechanisms. The
//! strategies form a closed, priority-ordered set behind the [`Transport`]
//! trait:
//!
//! 1. [`PooledTransport`] - shared `reqwest` client with connection pooling
//!    and a cookie jar.
//! 2. [`OneShotTransport`] - a fresh `reqwest` client per request, no pool,
//!    no cookies.
//! 3. [`RawTransport`] - hand-rolled HTTP/1.0 over a TCP socket, plain-http
//!    endpoints only.
//!
//! [`TransportExecutor::execute`] walks the chain: a connection-level
//! failure (connect, timeout, TLS, malformed bytes) falls through to the
//! next strategy; the first syntactically valid response - any status code,
//! non-empty body - is accepted and normalized into a [`TransportOutcome`].
//! A non-2xx status is an endpoint-level outcome, not a transport miss, and
//! never causes fall-through.
//!
//! The target is best-effort and not a trust boundary: certificate
//! verification is disabled on every strategy that speaks TLS.

mod error;
mod oneshot;
mod pooled;
mod raw;

pub use error::TransportError;
pub use oneshot::OneShotTransport;
pub use pooled::PooledTransport;
pub use raw::RawTransport;

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};
use url::Url;

/// HTTP method of a [`RequestSpec`]. Only the two verbs the lookup flow
/// actually issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// Idempotent page/data fetch.
    Get,
    /// Form-encoded data query.
    Post,
}

impl Method {
    /// Wire name of the verb.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

/// Everything needed to issue one HTTP request.
///
/// Built fresh for every attempt (fresh token, fresh User-Agent) and never
/// mutated afterwards; retries construct a new spec rather than reusing one.
#[derive(Debug, Clone)]
pub struct RequestSpec {
    /// Target URL.
    pub url: Url,
    /// HTTP verb.
    pub method: Method,
    /// Header name/value pairs, applied in order.
    pub headers: Vec<(String, String)>,
    /// Form-encoded body for POST requests.
    pub form: Option<Vec<(String, String)>>,
    /// Timeout covering the whole exchange.
    pub timeout: Duration,
}

impl RequestSpec {
    /// Creates a GET spec with no headers.
    #[must_use]
    pub fn get(url: Url, timeout: Duration) -> Self {
        Self {
            url,
            method: Method::Get,
            headers: Vec::new(),
            form: None,
            timeout,
        }
    }

    /// Creates a form-encoded POST spec.
    #[must_use]
    pub fn post_form(url: Url, form: Vec<(String, String)>, timeout: Duration) -> Self {
        Self {
            url,
            method: Method::Post,
            headers: Vec::new(),
            form: Some(form),
            timeout,
        }
    }

    /// Appends a header pair.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Serializes the form body as `application/x-www-form-urlencoded`.
    ///
    /// Used by transports that build the body by hand.
    #[must_use]
    pub fn encoded_form(&self) -> Option<String> {
        self.form.as_ref().map(|pairs| {
            url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
                .finish()
        })
    }
}

/// Normalized result of one successful transport attempt.
///
/// Upstream code never branches on which strategy produced the response;
/// `transport` exists for diagnostics only.
#[derive(Debug, Clone)]
pub struct TransportOutcome {
    /// HTTP status code, whatever it was.
    pub status: u16,
    /// Response body as text. Never empty.
    pub body: String,
    /// Name of the strategy that carried the exchange.
    pub transport: &'static str,
}

/// One concrete mechanism capable of performing an HTTP exchange.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Short strategy name for logs and diagnostics.
    fn name(&self) -> &'static str;

    /// Performs the exchange described by `spec`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] on any connection-level failure or when
    /// the response cannot be read as HTTP with a non-empty body. A non-2xx
    /// status is NOT an error at this layer.
    async fn send(&self, spec: &RequestSpec) -> Result<TransportOutcome, TransportError>;
}

/// Priority-ordered transport chain.
pub struct TransportExecutor {
    transports: Vec<Box<dyn Transport>>,
}

impl TransportExecutor {
    /// Builds the default chain: pooled, one-shot, raw socket.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Build`] when the pooled client cannot be
    /// constructed.
    pub fn new() -> Result<Self, TransportError> {
        Ok(Self {
            transports: vec![
                Box::new(PooledTransport::new()?),
                Box::new(OneShotTransport::new()),
                Box::new(RawTransport::new()),
            ],
        })
    }

    /// Builds an executor over an explicit strategy list. Used by tests to
    /// inject stub transports.
    #[must_use]
    pub fn with_transports(transports: Vec<Box<dyn Transport>>) -> Self {
        Self { transports }
    }

    /// Executes `spec` through the chain, first valid response wins.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::AllFailed`] when every strategy fails at
    /// the connection level.
    pub async fn execute(&self, spec: &RequestSpec) -> Result<TransportOutcome, TransportError> {
        let mut last_error: Option<TransportError> = None;
        let mut tried = 0usize;

        for transport in &self.transports {
            tried += 1;
            debug!(
                transport = transport.name(),
                url = %spec.url,
                method = spec.method.as_str(),
                "Attempting transport"
            );

            match transport.send(spec).await {
                Ok(outcome) => {
                    debug!(
                        transport = outcome.transport,
                        status = outcome.status,
                        body_len = outcome.body.len(),
                        "Transport produced a response"
                    );
                    return Ok(outcome);
                }
                Err(error) => {
                    warn!(
                        transport = transport.name(),
                        url = %spec.url,
                        error = %error,
                        "Transport failed, falling through"
                    );
                    last_error = Some(error);
                }
            }
        }

        match last_error {
            Some(last) => Err(TransportError::AllFailed {
                url: spec.url.to_string(),
                tried,
                last: Box::new(last),
            }),
            // Unreachable with the default chain; guards an empty custom list.
            None => Err(TransportError::Unsupported {
                transport: "executor",
                reason: "no transports configured".to_string(),
            }),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    struct StubTransport {
        name: &'static str,
        result: fn() -> Result<TransportOutcome, TransportError>,
    }

    #[async_trait]
    impl Transport for StubTransport {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn send(&self, _spec: &RequestSpec) -> Result<TransportOutcome, TransportError> {
            (self.result)()
        }
    }

    fn spec() -> RequestSpec {
        RequestSpec::get(
            Url::parse("http://example.com/q").unwrap(),
            Duration::from_secs(1),
        )
    }

    fn ok_outcome() -> Result<TransportOutcome, TransportError> {
        Ok(TransportOutcome {
            status: 200,
            body: "<html></html>".to_string(),
            transport: "stub",
        })
    }

    fn not_found_outcome() -> Result<TransportOutcome, TransportError> {
        Ok(TransportOutcome {
            status: 404,
            body: "missing".to_string(),
            transport: "stub",
        })
    }

    fn timeout_error() -> Result<TransportOutcome, TransportError> {
        Err(TransportError::Timeout {
            url: "http://example.com/q".to_string(),
            transport: "stub",
        })
    }

    // ==================== Executor Chain Tests ====================

    #[tokio::test]
    async fn test_first_transport_success_short_circuits() {
        let executor = TransportExecutor::with_transports(vec![
            Box::new(StubTransport {
                name: "first",
                result: ok_outcome,
            }),
            Box::new(StubTransport {
                name: "second",
                result: timeout_error,
            }),
        ]);

        let outcome = executor.execute(&spec()).await.unwrap();
        assert_eq!(outcome.status, 200);
    }

    #[tokio::test]
    async fn test_connection_failure_falls_through_to_next() {
        let executor = TransportExecutor::with_transports(vec![
            Box::new(StubTransport {
                name: "first",
                result: timeout_error,
            }),
            Box::new(StubTransport {
                name: "second",
                result: ok_outcome,
            }),
        ]);

        let outcome = executor.execute(&spec()).await.unwrap();
        assert_eq!(outcome.status, 200);
    }

    #[tokio::test]
    async fn test_non_2xx_status_is_accepted_not_fallthrough() {
        // A 404 with a body is an endpoint-level outcome; the second
        // transport must never be consulted.
        let executor = TransportExecutor::with_transports(vec![
            Box::new(StubTransport {
                name: "first",
                result: not_found_outcome,
            }),
            Box::new(StubTransport {
                name: "second",
                result: ok_outcome,
            }),
        ]);

        let outcome = executor.execute(&spec()).await.unwrap();
        assert_eq!(outcome.status, 404);
        assert_eq!(outcome.body, "missing");
    }

    #[tokio::test]
    async fn test_all_failed_carries_count_and_last_error() {
        let executor = TransportExecutor::with_transports(vec![
            Box::new(StubTransport {
                name: "first",
                result: timeout_error,
            }),
            Box::new(StubTransport {
                name: "second",
                result: timeout_error,
            }),
        ]);

        let err = executor.execute(&spec()).await.unwrap_err();
        match err {
            TransportError::AllFailed { tried, .. } => assert_eq!(tried, 2),
            other => panic!("expected AllFailed, got {other:?}"),
        }
    }

    // ==================== RequestSpec Tests ====================

    #[test]
    fn test_encoded_form_urlencodes_pairs() {
        let spec = RequestSpec::post_form(
            Url::parse("http://example.com/q").unwrap(),
            vec![
                ("cpf".to_string(), "11144477735".to_string()),
                ("token".to_string(), "a+b=c".to_string()),
            ],
            Duration::from_secs(1),
        );
        let body = spec.encoded_form().unwrap();
        assert_eq!(body, "cpf=11144477735&token=a%2Bb%3Dc");
    }

    #[test]
    fn test_get_spec_has_no_form() {
        assert!(spec().encoded_form().is_none());
    }

    #[test]
    fn test_with_header_appends_in_order() {
        let spec = spec()
            .with_header("User-Agent", "ua-1")
            .with_header("Referer", "http://example.com/");
        assert_eq!(spec.headers[0].0, "User-Agent");
        assert_eq!(spec.headers[1].0, "Referer");
    }
}
