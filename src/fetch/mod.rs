//! Endpoint fallback and retry orchestration.
//!
//! [`FetchOrchestrator::fetch`] drives the transport executor across the
//! configured endpoint chain. Each endpoint runs an explicit state machine:
//!
//! ```text
//! Idle -> Attempting -> Succeeded
//!                    -> Retrying -> Attempting   (budget remaining)
//!                    -> Exhausted                (budget spent; next endpoint)
//! ```
//!
//! Every attempt builds a fresh [`RequestSpec`] through the injected
//! [`SpecBuilder`] (fresh anti-forgery token, fresh User-Agent), executes it,
//! and classifies the result. Blocked and Transient both consume the
//! per-endpoint budget; the pause between attempts goes through the injected
//! [`Sleeper`], so tests can run the whole policy against a fake clock. With
//! `N` attempts per endpoint and `E` endpoints, at most `N * E` transport
//! attempts are ever made.
//!
//! Everything here is sequential: one attempt at a time, one endpoint at a
//! time, a blocking pause between attempts. There is no concurrency and no
//! shared state across calls.

mod backoff;
mod classify;

pub use backoff::BackoffPolicy;
pub use classify::{Classification, classify};

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::Endpoint;
use crate::transport::{RequestSpec, TransportExecutor, TransportOutcome};

/// Pause mechanism between attempts. The production implementation is
/// [`TokioSleeper`]; tests inject a recorder so retry timing is observable
/// without real waiting.
#[async_trait]
pub trait Sleeper: Send + Sync {
    /// Blocks the (single-threaded, sequential) flow for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// Real sleeper backed by `tokio::time::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Errors a [`SpecBuilder`] can raise while preparing an attempt.
///
/// Both variants abandon the current endpoint without consuming its retry
/// budget; the orchestrator moves straight to the next endpoint.
#[derive(Debug, Error)]
pub enum SpecBuildError {
    /// The endpoint's token page was fetched but no query in the token rule
    /// chain located an anti-forgery token.
    #[error("no anti-forgery token found on {token_url}")]
    TokenNotFound {
        /// The token page that was searched.
        token_url: String,
    },

    /// The endpoint's token page could not be fetched at all.
    #[error("token page {token_url} unreachable: {reason}")]
    TokenPageUnreachable {
        /// The token page that was requested.
        token_url: String,
        /// Why the fetch failed.
        reason: String,
    },
}

/// Builds the per-attempt request. Implemented by the lookup orchestrator,
/// which embeds the identifier and a freshly harvested token.
#[async_trait]
pub trait SpecBuilder: Send + Sync {
    /// Builds a fresh spec for the given endpoint and attempt number
    /// (1-indexed).
    ///
    /// # Errors
    ///
    /// Returns [`SpecBuildError`] when the attempt cannot be prepared; the
    /// endpoint is then skipped without retries.
    async fn build(&self, endpoint: &Endpoint, attempt: u32) -> Result<RequestSpec, SpecBuildError>;
}

/// Successful fetch with the diagnostics the caller reports.
#[derive(Debug, Clone)]
pub struct FetchSuccess {
    /// The accepted response.
    pub outcome: TransportOutcome,
    /// Index of the endpoint that answered (0-based).
    pub endpoint_index: usize,
    /// Total transport attempts made across all endpoints, this one
    /// included.
    pub attempts: u32,
}

/// The last classified failure before exhaustion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LastFailure {
    /// Target rejected the request (status or body signature).
    Blocked {
        /// Observed HTTP status.
        status: u16,
        /// Matched signature substring, if the block was body-detected.
        signature: Option<String>,
    },
    /// Transport-level failure or an unclassifiable response.
    Transient {
        /// Human-readable description.
        reason: String,
    },
    /// Spec preparation failed (token missing or token page unreachable).
    SpecBuild {
        /// Human-readable description.
        reason: String,
    },
}

impl std::fmt::Display for LastFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Blocked { status, signature } => match signature {
                Some(sig) => write!(f, "blocked (HTTP {status}, signature '{sig}')"),
                None => write!(f, "blocked (HTTP {status})"),
            },
            Self::Transient { reason } => write!(f, "transient failure: {reason}"),
            Self::SpecBuild { reason } => write!(f, "request preparation failed: {reason}"),
        }
    }
}

/// Aggregate failure after every endpoint is exhausted.
#[derive(Debug, Error)]
#[error("all {endpoints_tried} endpoints exhausted after {attempts} attempts; last: {last}")]
pub struct Exhausted {
    /// Endpoints that were tried.
    pub endpoints_tried: usize,
    /// Total transport attempts made.
    pub attempts: u32,
    /// The final classified failure.
    pub last: LastFailure,
}

/// Per-endpoint retry state machine.
#[derive(Debug)]
enum EndpointState {
    Idle,
    Attempting { attempt: u32 },
    Retrying { next_attempt: u32 },
    Exhausted,
}

/// Drives endpoints, transports, and the retry budget.
pub struct FetchOrchestrator {
    executor: TransportExecutor,
    policy: BackoffPolicy,
    max_attempts_per_endpoint: u32,
    blocking_signatures: Vec<String>,
    sleeper: Box<dyn Sleeper>,
}

impl FetchOrchestrator {
    /// Creates an orchestrator over the given executor and policy knobs.
    #[must_use]
    pub fn new(
        executor: TransportExecutor,
        policy: BackoffPolicy,
        max_attempts_per_endpoint: u32,
        blocking_signatures: Vec<String>,
        sleeper: Box<dyn Sleeper>,
    ) -> Self {
        Self {
            executor,
            policy,
            max_attempts_per_endpoint: max_attempts_per_endpoint.max(1),
            blocking_signatures,
            sleeper,
        }
    }

    /// The transport executor, for callers that need one-off requests
    /// outside the retry loop (token page harvesting).
    #[must_use]
    pub fn executor(&self) -> &TransportExecutor {
        &self.executor
    }

    /// Fetches through the endpoint chain until one attempt classifies as
    /// Success or everything is exhausted.
    ///
    /// # Errors
    ///
    /// Returns [`Exhausted`] carrying the last classified failure and the
    /// attempt count.
    pub async fn fetch(
        &self,
        endpoints: &[Endpoint],
        builder: &dyn SpecBuilder,
    ) -> Result<FetchSuccess, Exhausted> {
        let mut total_attempts = 0u32;
        let mut last: Option<LastFailure> = None;

        for (endpoint_index, endpoint) in endpoints.iter().enumerate() {
            debug!(endpoint_index, url = %endpoint.query_url, "Trying endpoint");
            let mut state = EndpointState::Idle;

            loop {
                state = match state {
                    EndpointState::Idle => EndpointState::Attempting { attempt: 1 },

                    EndpointState::Attempting { attempt } => {
                        let spec = match builder.build(endpoint, attempt).await {
                            Ok(spec) => spec,
                            Err(error) => {
                                // Token problems are endpoint-level: no
                                // amount of retrying this endpoint helps.
                                warn!(
                                    endpoint_index,
                                    error = %error,
                                    "Spec build failed; abandoning endpoint"
                                );
                                last = Some(LastFailure::SpecBuild {
                                    reason: error.to_string(),
                                });
                                break;
                            }
                        };

                        total_attempts += 1;
                        match self.executor.execute(&spec).await {
                            Ok(outcome) => {
                                match classify(&outcome, &self.blocking_signatures) {
                                    Classification::Success => {
                                        info!(
                                            endpoint_index,
                                            attempt,
                                            transport = outcome.transport,
                                            "Fetch succeeded"
                                        );
                                        return Ok(FetchSuccess {
                                            outcome,
                                            endpoint_index,
                                            attempts: total_attempts,
                                        });
                                    }
                                    Classification::Blocked { status, signature } => {
                                        warn!(
                                            endpoint_index,
                                            attempt,
                                            status,
                                            signature = signature.as_deref().unwrap_or(""),
                                            "Attempt blocked"
                                        );
                                        last = Some(LastFailure::Blocked { status, signature });
                                        self.next_state(attempt)
                                    }
                                    Classification::Transient { status } => {
                                        debug!(
                                            endpoint_index,
                                            attempt, status, "Transient response"
                                        );
                                        last = Some(LastFailure::Transient {
                                            reason: format!("HTTP {status}"),
                                        });
                                        self.next_state(attempt)
                                    }
                                }
                            }
                            Err(error) => {
                                debug!(endpoint_index, attempt, error = %error, "Transport failure");
                                last = Some(LastFailure::Transient {
                                    reason: error.to_string(),
                                });
                                self.next_state(attempt)
                            }
                        }
                    }

                    EndpointState::Retrying { next_attempt } => {
                        let delay = self.policy.delay_for(next_attempt - 1);
                        debug!(
                            endpoint_index,
                            next_attempt,
                            delay_ms = delay.as_millis(),
                            "Backing off before retry"
                        );
                        self.sleeper.sleep(delay).await;
                        EndpointState::Attempting {
                            attempt: next_attempt,
                        }
                    }

                    EndpointState::Exhausted => {
                        debug!(endpoint_index, "Endpoint budget spent; moving on");
                        break;
                    }
                };
            }
        }

        Err(Exhausted {
            endpoints_tried: endpoints.len(),
            attempts: total_attempts,
            last: last.unwrap_or(LastFailure::Transient {
                reason: "no endpoints configured".to_string(),
            }),
        })
    }

    /// Retry if budget remains on this endpoint, otherwise exhaust it.
    fn next_state(&self, attempt: u32) -> EndpointState {
        if attempt >= self.max_attempts_per_endpoint {
            EndpointState::Exhausted
        } else {
            EndpointState::Retrying {
                next_attempt: attempt + 1,
            }
        }
    }
}
