//! Immutable lookup configuration.
//!
//! The original service kept its endpoint and proxy lists as process-wide
//! mutable globals; here the whole set of knobs is a value constructed once
//! and injected into the orchestrator. Nothing in this module is mutated
//! after construction.

use std::time::Duration;

use url::Url;

/// Default attempts per endpoint before moving to the next one.
pub const DEFAULT_MAX_ATTEMPTS_PER_ENDPOINT: u32 = 3;

/// Default per-request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Default base delay between attempts (grows linearly with the attempt
/// number, see [`crate::fetch::BackoffPolicy`]).
const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(2);

/// Default cap on the backoff delay.
const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(10);

/// Substrings whose presence in a response body marks it as an anti-bot
/// interstitial rather than real data, even on HTTP 200.
///
/// This is a deliberately blunt heuristic inherited from the original
/// service: a fixed vendor/phrase list, matched case-insensitively. It will
/// both over- and under-trigger on markup changes.
const DEFAULT_BLOCKING_SIGNATURES: [&str; 5] = [
    "cloudflare",
    "captcha",
    "just a moment",
    "access denied",
    "attention required",
];

/// How the identifier is embedded in the data query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStyle {
    /// POST a form body (`cpf=...&token=...`) to the query URL.
    Form,
    /// GET with the 11 digits appended to the query URL path.
    Path,
}

/// One candidate lookup endpoint.
#[derive(Debug, Clone)]
pub struct Endpoint {
    /// URL the data query is issued against.
    pub query_url: Url,
    /// Page to fetch first to harvest the anti-forgery token, when the
    /// endpoint requires one echoed back on the data query.
    pub token_url: Option<Url>,
    /// How the identifier travels in the data query.
    pub style: QueryStyle,
}

impl Endpoint {
    /// Form-posting endpoint that requires a token from `token_url`.
    #[must_use]
    pub fn form_with_token(query_url: Url, token_url: Url) -> Self {
        Self {
            query_url,
            token_url: Some(token_url),
            style: QueryStyle::Form,
        }
    }

    /// Form-posting endpoint with no token page.
    #[must_use]
    pub fn form(query_url: Url) -> Self {
        Self {
            query_url,
            token_url: None,
            style: QueryStyle::Form,
        }
    }

    /// Path-style GET endpoint (identifier appended to the URL path).
    #[must_use]
    pub fn path(query_url: Url) -> Self {
        Self {
            query_url,
            token_url: None,
            style: QueryStyle::Path,
        }
    }
}

/// Configuration for a [`crate::lookup::LookupClient`].
///
/// Immutable after construction. The `Default` value carries the production
/// endpoint chain: the primary consultation site (token-gated form POST),
/// its API mirror, and a JSON fallback service queried by path.
#[derive(Debug, Clone)]
pub struct LookupConfig {
    /// Candidate endpoints, tried in order.
    pub endpoints: Vec<Endpoint>,
    /// Retry budget per endpoint (Blocked and Transient both consume it).
    pub max_attempts_per_endpoint: u32,
    /// Timeout applied to every individual request.
    pub timeout: Duration,
    /// Base delay for the linear backoff between attempts.
    pub base_delay: Duration,
    /// Upper bound on the backoff delay.
    pub max_delay: Duration,
    /// Case-insensitive substrings that reclassify a response as Blocked.
    pub blocking_signatures: Vec<String>,
}

impl Default for LookupConfig {
    #[allow(clippy::unwrap_used)] // static URLs, known-valid
    fn default() -> Self {
        Self {
            endpoints: vec![
                Endpoint::form_with_token(
                    Url::parse("https://pesquisacpf.com.br/consulta").unwrap(),
                    Url::parse("https://pesquisacpf.com.br/").unwrap(),
                ),
                Endpoint::form(Url::parse("https://api.pesquisacpf.com.br/v1/query").unwrap()),
                Endpoint::path(Url::parse("https://www.receitaws.com.br/v1/cpf/").unwrap()),
            ],
            max_attempts_per_endpoint: DEFAULT_MAX_ATTEMPTS_PER_ENDPOINT,
            timeout: DEFAULT_TIMEOUT,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            blocking_signatures: DEFAULT_BLOCKING_SIGNATURES
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }
}

impl LookupConfig {
    /// Replaces the endpoint chain, keeping all other defaults.
    #[must_use]
    pub fn with_endpoints(mut self, endpoints: Vec<Endpoint>) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// Overrides the per-endpoint retry budget (clamped to at least 1).
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts_per_endpoint = max_attempts.max(1);
        self
    }

    /// Overrides the per-request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Overrides the backoff delays. Mostly useful in tests, where waiting
    /// seconds between simulated attempts is wasted time.
    #[must_use]
    pub fn with_backoff(mut self, base_delay: Duration, max_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self.max_delay = max_delay;
        self
    }
}
