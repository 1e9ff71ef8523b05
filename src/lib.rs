//! CPF Lookup Core Library
//!
//! This library looks up a Brazilian CPF (11-digit national identification
//! number) against a chain of third-party endpoints and returns a normalized
//! record (name, birth date) extracted from whatever HTML or JSON the target
//! answers with.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`cpf`] - identifier validation (format + two-pass mod-11 checksum)
//! - [`transport`] - prioritized transport strategies behind one executor
//! - [`fetch`] - endpoint fallback, retry budget, backoff, classification
//! - [`extract`] - selector-chain field extraction with normalization
//! - [`lookup`] - the top-level orchestrator and the external contract
//! - [`config`] - immutable configuration injected into the pipeline
//!
//! The pipeline is fully sequential: retries and endpoint fallbacks happen
//! one at a time with a blocking pause between them. Callers needing an
//! overall deadline wrap [`lookup::LookupClient::lookup`] in their own
//! timeout.

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod cpf;
pub mod extract;
pub mod fetch;
pub mod lookup;
pub mod transport;
pub mod user_agent;

// Re-export commonly used types
pub use config::{Endpoint, LookupConfig, QueryStyle};
pub use cpf::{Cpf, InvalidCpf};
pub use extract::{ExtractionRule, Field, Query, extract, normalize};
pub use fetch::{BackoffPolicy, Classification, FetchOrchestrator, Sleeper, classify};
pub use lookup::{Diagnostics, LookupClient, LookupResult, Record};
pub use transport::{
    Method, RequestSpec, Transport, TransportError, TransportExecutor, TransportOutcome,
};
