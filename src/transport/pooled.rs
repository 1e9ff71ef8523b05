//! Pooled-connection transport backed by a shared `reqwest` client.
//!
//! First rung of the fallback ladder. The client is built once and reused so
//! repeated attempts against the same endpoint benefit from connection
//! pooling, and a cookie jar keeps any session cookies the target sets on
//! the token page available for the data query that follows.

use async_trait::async_trait;
use reqwest::Client;

use super::{Method, RequestSpec, Transport, TransportError, TransportOutcome};

const NAME: &str = "pooled";

/// Connect timeout for the shared client; the full-exchange timeout comes
/// from each [`RequestSpec`].
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Shared pooled `reqwest` client with cookie support.
#[derive(Debug, Clone)]
pub struct PooledTransport {
    client: Client,
}

impl PooledTransport {
    /// Builds the shared client.
    ///
    /// Certificate verification is disabled: the targets are best-effort
    /// scrape sources, not a trust boundary, and several of them serve
    /// mismatched or expired certificates.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Build`] when client construction fails.
    pub fn new() -> Result<Self, TransportError> {
        let client = Client::builder()
            .cookie_store(true)
            .gzip(true)
            .danger_accept_invalid_certs(true)
            .connect_timeout(std::time::Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|source| TransportError::Build {
                transport: NAME,
                source,
            })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for PooledTransport {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn send(&self, spec: &RequestSpec) -> Result<TransportOutcome, TransportError> {
        let mut request = match spec.method {
            Method::Get => self.client.get(spec.url.clone()),
            Method::Post => self.client.post(spec.url.clone()),
        }
        .timeout(spec.timeout);

        for (name, value) in &spec.headers {
            request = request.header(name, value);
        }
        if let Some(form) = &spec.form {
            request = request.form(form);
        }

        let response = request
            .send()
            .await
            .map_err(|e| TransportError::from_reqwest(spec.url.as_str(), NAME, e))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::from_reqwest(spec.url.as_str(), NAME, e))?;

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
