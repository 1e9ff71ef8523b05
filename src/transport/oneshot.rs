//! One-shot transport: a fresh `reqwest` client per request.
//!
//! Second rung of the fallback ladder. Building a new client per exchange
//! sidesteps a poisoned connection pool or a cookie jar the target has
//! started punishing; it carries no cookies and keeps no connections alive.

use async_trait::async_trait;
use reqwest::Client;

use super::{Method, RequestSpec, Transport, TransportError, TransportOutcome};

const NAME: &str = "one-shot";

/// Transport that constructs a disposable client for every send.
#[derive(Debug, Clone, Default)]
pub struct OneShotTransport;

impl OneShotTransport {
    /// Creates the transport. Construction is infallible; the per-request
    /// client build happens inside [`Transport::send`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Transport for OneShotTransport {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn send(&self, spec: &RequestSpec) -> Result<TransportOutcome, TransportError> {
        let client = Client::builder()
            .gzip(true)
            .danger_accept_invalid_certs(true)
            .pool_max_idle_per_host(0)
            .timeout(spec.timeout)
            .build()
            .map_err(|source| TransportError::Build {
                transport: NAME,
                source,
            })?;

        let mut request = match spec.method {
            Method::Get => client.get(spec.url.clone()),
            Method::Post => client.post(spec.url.clone()),
        };

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
