//! Error types for transport attempts.

use thiserror::Error;

/// Errors surfaced by a single transport strategy or by the executor chain.
///
/// Every variant names the transport that produced it so diagnostics can
/// report which rung of the fallback ladder failed.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The transport's HTTP client could not be constructed.
    #[error("{transport}: client construction failed: {source}")]
    Build {
        /// Transport that failed to initialize.
        transport: &'static str,
        /// The underlying builder error.
        #[source]
        source: reqwest::Error,
    },

    /// Network-level failure (DNS, connect refused, TLS) from reqwest.
    #[error("{transport}: network error requesting {url}: {source}")]
    Network {
        /// The URL that failed.
        url: String,
        /// Transport that produced the failure.
        transport: &'static str,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Socket-level failure from the raw transport.
    #[error("{transport}: socket error requesting {url}: {source}")]
    Io {
        /// The URL that failed.
        url: String,
        /// Transport that produced the failure.
        transport: &'static str,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The request did not complete within the configured timeout.
    #[error("{transport}: timeout requesting {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
        /// Transport that timed out.
        transport: &'static str,
    },

    /// The transport cannot carry this request at all (e.g. the raw socket
    /// transport refusing an https URL).
    #[error("{transport}: unsupported request: {reason}")]
    Unsupported {
        /// Transport that refused the request.
        transport: &'static str,
        /// Why the request cannot be carried.
        reason: String,
    },

    /// Bytes came back but could not be read as an HTTP response.
    #[error("{transport}: malformed response from {url}: {reason}")]
    MalformedResponse {
        /// The URL that answered.
        url: String,
        /// Transport that received the bytes.
        transport: &'static str,
        /// What was wrong with them.
        reason: String,
    },

    /// A syntactically valid response arrived with a zero-length body.
    ///
    /// Treated as a transport miss so the next strategy gets a chance; the
    /// retry orchestrator classifies it as transient if every strategy
    /// agrees.
    #[error("{transport}: empty body from {url} (HTTP {status})")]
    EmptyBody {
        /// The URL that answered.
        url: String,
        /// Transport that received the response.
        transport: &'static str,
        /// Status code of the empty response.
        status: u16,
    },

    /// Every strategy in the executor chain failed for this request.
    #[error("all {tried} transports failed for {url}; last: {last}")]
    AllFailed {
        /// The URL no transport could fetch.
        url: String,
        /// Number of strategies attempted.
        tried: usize,
        /// The final strategy's error.
        #[source]
        last: Box<TransportError>,
    },
}

impl TransportError {
    /// Maps a reqwest error into the timeout or network variant.
    pub(crate) fn from_reqwest(
        url: impl Into<String>,
        transport: &'static str,
        source: reqwest::Error,
    ) -> Self {
        let url = url.into();
        if source.is_timeout() {
            Self::Timeout { url, transport }
        } else {
            Self::Network {
                url,
                transport,
                source,
            }
        }
    }
}
