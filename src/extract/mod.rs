//! Field extraction from loosely-structured response documents.
//!
//! The target endpoints answer with HTML whose markup drifts over time, and
//! one fallback endpoint answers JSON. Extraction is therefore data-driven:
//! each [`Field`] carries an [`ExtractionRule`], an ordered chain of
//! [`Query`] fallbacks evaluated strictly first-match-wins - once a query
//! yields a non-empty value, later queries are never consulted, even if they
//! would disagree.
//!
//! HTML parsing uses `scraper`, which never fails on malformed input; parser
//! recoveries are logged and otherwise ignored. An invalid selector or
//! pattern in a chain is logged and skipped, not fatal. A field no query can
//! satisfy is reported as `None` - whether that constitutes an overall
//! failure is the lookup orchestrator's call, not this module's.

mod normalize;
pub mod rules;

pub use normalize::normalize;

use std::collections::HashMap;
use std::fmt;

use regex::Regex;
use scraper::{Html, Selector};
use serde_json::Value;
use tracing::{debug, warn};

/// Logical fields the pipeline extracts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    /// Person's full name (the primary field).
    Name,
    /// Birth date as rendered by the target.
    BirthDate,
    /// Anti-forgery token harvested from an initial page.
    Token,
}

impl Field {
    /// Stable lowercase name for logs and the external contract.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::BirthDate => "birth_date",
            Self::Token => "token",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One structural query against a response document.
///
/// Selector and pattern sources are kept as strings and compiled at
/// evaluation time; a string that fails to compile is logged and skipped so
/// a typo in one chain entry cannot poison the rest of the chain.
#[derive(Debug, Clone)]
pub enum Query {
    /// CSS selector over the parsed HTML tree. With `attr` set the value is
    /// read from that attribute; otherwise from the element's text.
    Css {
        /// CSS selector expression.
        selector: String,
        /// Attribute to read instead of text content.
        attr: Option<String>,
    },
    /// JSON pointer (RFC 6901) for endpoints answering JSON.
    Json {
        /// Pointer expression, e.g. `/nome`.
        pointer: String,
    },
    /// Regex over the raw document; capture group 1 (or the whole match)
    /// is the value. Used for tokens buried in inline scripts.
    Pattern {
        /// Regex source.
        regex: String,
    },
}

impl Query {
    /// Text-content CSS query.
    #[must_use]
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css {
            selector: selector.into(),
            attr: None,
        }
    }

    /// Attribute-value CSS query.
    #[must_use]
    pub fn css_attr(selector: impl Into<String>, attr: impl Into<String>) -> Self {
        Self::Css {
            selector: selector.into(),
            attr: Some(attr.into()),
        }
    }

    /// JSON-pointer query.
    #[must_use]
    pub fn json(pointer: impl Into<String>) -> Self {
        Self::Json {
            pointer: pointer.into(),
        }
    }

    /// Regex query.
    #[must_use]
    pub fn pattern(regex: impl Into<String>) -> Self {
        Self::Pattern {
            regex: regex.into(),
        }
    }
}

/// Ordered fallback chain for one field. Static configuration; never
/// mutated at runtime.
#[derive(Debug, Clone)]
pub struct ExtractionRule {
    queries: Vec<Query>,
}

impl ExtractionRule {
    /// Creates a rule from its ordered query chain.
    #[must_use]
    pub fn new(queries: Vec<Query>) -> Self {
        Self { queries }
    }
}

/// Evaluates every rule against the document.
///
/// Each field maps to the first query's normalized non-empty value, or
/// `None` when the whole chain comes up empty.
#[must_use]
pub fn extract(
    document: &str,
    rules: &[(Field, ExtractionRule)],
) -> HashMap<Field, Option<String>> {
    let html = Html::parse_document(document);
    if !html.errors.is_empty() {
        // Malformed markup is the norm for these targets; recoveries are
        // non-fatal by contract.
        debug!(
            recoveries = html.errors.len(),
            "HTML parser recovered from malformed markup"
        );
    }

    let json: Option<Value> = serde_json::from_str(document.trim()).ok();

    rules
        .iter()
        .map(|(field, rule)| (*field, first_match(document, &html, json.as_ref(), rule)))
        .collect()
}

/// Convenience wrapper for single-field rules (token harvesting).
#[must_use]
pub fn extract_one(document: &str, field: Field, rule: &ExtractionRule) -> Option<String> {
    let rules = [(field, rule.clone())];
    extract(document, &rules).remove(&field).flatten()
}

fn first_match(
    raw: &str,
    html: &Html,
    json: Option<&Value>,
    rule: &ExtractionRule,
) -> Option<String> {
    for query in &rule.queries {
        let value = match query {
            Query::Css { selector, attr } => eval_css(html, selector, attr.as_deref()),
            Query::Json { pointer } => json
                .and_then(|v| v.pointer(pointer))
                .and_then(json_to_string),
            Query::Pattern { regex } => eval_pattern(raw, regex),
        };

        if let Some(value) = value {
            let normalized = normalize(&value);
            if !normalized.is_empty() {
                return Some(normalized);
            }
        }
    }
    None
}

fn eval_css(html: &Html, selector: &str, attr: Option<&str>) -> Option<String> {
    let parsed = match Selector::parse(selector) {
        Ok(parsed) => parsed,
        Err(error) => {
            warn!(selector, error = %error, "Invalid CSS selector in rule chain; skipping");
            return None;
        }
    };

    for element in html.select(&parsed) {
        let value = match attr {
            Some(attr) => element.value().attr(attr).map(ToString::to_string),
            None => Some(element.text().collect::<String>()),
        };
        if let Some(value) = value {
            if !value.trim().is_empty() {
                return Some(value);
            }
        }
    }
    None
}

fn eval_pattern(raw: &str, pattern: &str) -> Option<String> {
    let regex = match Regex::new(pattern) {
        Ok(regex) => regex,
        Err(error) => {
            warn!(pattern, error = %error, "Invalid regex in rule chain; skipping");
            return None;
        }
    };

    regex.captures(raw).map(|captures| {
        captures
            .get(1)
            .map_or_else(|| captures[0].to_string(), |m| m.as_str().to_string())
    })
}

fn json_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
