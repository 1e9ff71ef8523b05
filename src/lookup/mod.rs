//! Top-level lookup orchestration and the external result contract.
//!
//! [`LookupClient::lookup`] is the single entry point and the single place
//! where internal failures become the external answer: whatever happens
//! underneath - invalid identifier, exhausted endpoints, missing fields -
//! the caller always receives a well-formed [`LookupResult`], never a panic
//! or a stray error type.
//!
//! Flow per call: validate the CPF (fail fast, zero network on bad input);
//! for each endpoint attempt, harvest the endpoint's anti-forgery token when
//! it has a token page, build a fresh data-query spec with a rotated
//! User-Agent, and hand the endpoint chain to the retry orchestrator; on
//! success run the data rules over the body and require the name field (the
//! primary one) to be present.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::{Endpoint, LookupConfig, QueryStyle};
use crate::cpf::Cpf;
use crate::extract::{self, ExtractionRule, Field, rules};
use crate::fetch::{
    BackoffPolicy, FetchOrchestrator, LastFailure, SpecBuildError, SpecBuilder, Sleeper,
    TokioSleeper,
};
use crate::transport::{RequestSpec, TransportError, TransportExecutor};
use crate::user_agent::random_user_agent;

/// The extracted record returned on success.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Record {
    /// The validated identifier, as bare digits.
    pub identifier: String,
    /// Extracted full name.
    pub name: String,
    /// Extracted birth date, when the document carried one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<String>,
}

/// Diagnostic details accompanying a result.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct Diagnostics {
    /// Transport strategy that carried the final exchange.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transport: Option<String>,
    /// HTTP status observed on the final exchange.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
    /// Index of the endpoint that answered (0-based).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint_index: Option<usize>,
    /// Total transport attempts made.
    pub attempts: u32,
}

/// Terminal answer of one lookup. Never retried once produced.
#[derive(Debug, Clone, Serialize)]
pub struct LookupResult {
    /// Whether a record was extracted.
    pub success: bool,
    /// The record, on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Record>,
    /// Human-readable failure description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Diagnostics for both outcomes.
    pub diagnostics: Diagnostics,
}

impl LookupResult {
    fn found(record: Record, diagnostics: Diagnostics) -> Self {
        Self {
            success: true,
            data: Some(record),
            message: None,
            diagnostics,
        }
    }

    fn failed(message: impl Into<String>, diagnostics: Diagnostics) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.into()),
            diagnostics,
        }
    }
}

/// Builds the per-attempt data query, harvesting the endpoint's token first
/// when one is required.
struct QuerySpecBuilder<'a> {
    executor: &'a TransportExecutor,
    cpf: &'a Cpf,
    timeout: Duration,
    token_rule: &'a ExtractionRule,
}

impl QuerySpecBuilder<'_> {
    /// Fetches the endpoint's token page and runs the token rule chain.
    async fn harvest_token(&self, token_url: &url::Url) -> Result<String, SpecBuildError> {
        let spec = RequestSpec::get(token_url.clone(), self.timeout)
            .with_header("User-Agent", random_user_agent());

        let outcome = self.executor.execute(&spec).await.map_err(|error| {
            SpecBuildError::TokenPageUnreachable {
                token_url: token_url.to_string(),
                reason: error.to_string(),
            }
        })?;

        extract::extract_one(&outcome.body, Field::Token, self.token_rule).ok_or_else(|| {
            SpecBuildError::TokenNotFound {
                token_url: token_url.to_string(),
            }
        })
    }
}

#[async_trait]
impl SpecBuilder for QuerySpecBuilder<'_> {
    async fn build(
        &self,
        endpoint: &Endpoint,
        attempt: u32,
    ) -> Result<RequestSpec, SpecBuildError> {
        // Fresh token and fresh User-Agent on every attempt; the spec of a
        // failed attempt is never reused.
        let token = match &endpoint.token_url {
            Some(token_url) => {
                debug!(attempt, token_url = %token_url, "Harvesting anti-forgery token");
                Some(self.harvest_token(token_url).await?)
            }
            None => None,
        };

        let referer = endpoint
            .token_url
            .as_ref()
            .map_or_else(|| endpoint.query_url.to_string(), ToString::to_string);

        let spec = match endpoint.style {
            QueryStyle::Form => {
                let mut form = vec![("cpf".to_string(), self.cpf.as_digits().to_string())];
                if let Some(token) = token {
                    form.push(("_token".to_string(), token));
                }
                RequestSpec::post_form(endpoint.query_url.clone(), form, self.timeout)
            }
            QueryStyle::Path => {
                let mut url = endpoint.query_url.clone();
                if let Ok(mut segments) = url.path_segments_mut() {
                    segments.pop_if_empty().push(self.cpf.as_digits());
                }
                RequestSpec::get(url, self.timeout)
            }
        };

        Ok(spec
            .with_header("User-Agent", random_user_agent())
            .with_header("Referer", referer)
            .with_header("Accept", "text/html,application/json;q=0.9,*/*;q=0.8"))
    }
}

/// The lookup pipeline: validator, transports, retry policy, and extraction
/// rules wired together behind one call.
///
/// One client serves many sequential lookups; nothing is shared across
/// concurrent calls because there are none (the whole pipeline is
/// sequential by design).
pub struct LookupClient {
    config: LookupConfig,
    orchestrator: FetchOrchestrator,
    data_rules: Vec<(Field, ExtractionRule)>,
    token_rule: ExtractionRule,
}

impl LookupClient {
    /// Builds a client with the real transport chain and sleeper.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the pooled HTTP client cannot be
    /// constructed.
    pub fn new(config: LookupConfig) -> Result<Self, TransportError> {
        Self::with_sleeper(config, Box::new(TokioSleeper))
    }

    /// Builds a client with an injected sleeper (fake-clock tests).
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the pooled HTTP client cannot be
    /// constructed.
    pub fn with_sleeper(
        config: LookupConfig,
        sleeper: Box<dyn Sleeper>,
    ) -> Result<Self, TransportError> {
        let executor = TransportExecutor::new()?;
        let orchestrator = FetchOrchestrator::new(
            executor,
            BackoffPolicy::new(config.base_delay, config.max_delay),
            config.max_attempts_per_endpoint,
            config.blocking_signatures.clone(),
            sleeper,
        );
        Ok(Self {
            config,
            orchestrator,
            data_rules: rules::data_rules(),
            token_rule: rules::token_rule(),
        })
    }

    /// Looks up a raw identifier and always returns a well-formed result.
    pub async fn lookup(&self, raw: &str) -> LookupResult {
        let cpf = match Cpf::parse(raw) {
            Ok(cpf) => cpf,
            Err(error) => {
                // Never retried, and no network activity happens for it.
                info!(error = %error, "Rejected identifier before any request");
                return LookupResult::failed(
                    format!("invalid CPF: {error}"),
                    Diagnostics::default(),
                );
            }
        };

        info!(cpf = %cpf, "Starting lookup");

        let builder = QuerySpecBuilder {
            executor: self.orchestrator.executor(),
            cpf: &cpf,
            timeout: self.config.timeout,
            token_rule: &self.token_rule,
        };

        let success = match self.orchestrator.fetch(&self.config.endpoints, &builder).await {
            Ok(success) => success,
            Err(exhausted) => {
                warn!(
                    attempts = exhausted.attempts,
                    endpoints = exhausted.endpoints_tried,
                    last = %exhausted.last,
                    "Lookup exhausted all endpoints"
                );
                let http_status = match exhausted.last {
                    LastFailure::Blocked { status, .. } => Some(status),
                    _ => None,
                };
                return LookupResult::failed(
                    format!("site unreachable: {exhausted}"),
                    Diagnostics {
                        transport: None,
                        http_status,
                        endpoint_index: None,
                        attempts: exhausted.attempts,
                    },
                );
            }
        };

        let diagnostics = Diagnostics {
            transport: Some(success.outcome.transport.to_string()),
            http_status: Some(success.outcome.status),
            endpoint_index: Some(success.endpoint_index),
            attempts: success.attempts,
        };

        let mut values = extract::extract(&success.outcome.body, &self.data_rules);
        let name = values.remove(&Field::Name).flatten();
        let birth_date = values.remove(&Field::BirthDate).flatten();

        match name {
            Some(name) => {
                info!(cpf = %cpf, "Lookup succeeded");
                LookupResult::found(
                    Record {
                        identifier: cpf.as_digits().to_string(),
                        name,
                        birth_date,
                    },
                    diagnostics,
                )
            }
            None => {
                // Distinguish "site answered but had no record" from the
                // unreachable case above.
                info!(cpf = %cpf, "Site reachable but record data not found");
                LookupResult::failed(
                    "site reachable, record data not found in response",
                    diagnostics,
                )
            }
        }
    }
}
