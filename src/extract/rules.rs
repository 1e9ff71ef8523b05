//! Default selector fallback chains.
//!
//! The target sites reshuffle their markup often; each field therefore
//! carries an ordered list of queries from most-specific to most-generous,
//! plus JSON pointers for the fallback endpoint that answers JSON instead of
//! HTML. The chains are data: adding a layout variant means appending a
//! query here, not touching the extractor.

use super::{ExtractionRule, Field, Query};

/// Rules for the data-record fields (name and birth date).
#[must_use]
pub fn data_rules() -> Vec<(Field, ExtractionRule)> {
    vec![
        (
            Field::Name,
            ExtractionRule::new(vec![
                Query::css("div.nome"),
                Query::css("div[class*='nome']"),
                Query::css("span[class*='nome']"),
                Query::json("/nome"),
                Query::json("/name"),
            ]),
        ),
        (
            Field::BirthDate,
            ExtractionRule::new(vec![
                Query::css("span.data-nascimento"),
                Query::css("span[class*='nascimento']"),
                Query::css("div[class*='nascimento']"),
                Query::json("/nascimento"),
                Query::json("/data_nascimento"),
            ]),
        ),
    ]
}

/// Rule for harvesting the anti-forgery token from an endpoint's initial
/// page: hidden input first, then meta tag, then inline script pattern.
#[must_use]
pub fn token_rule() -> ExtractionRule {
    ExtractionRule::new(vec![
        Query::css_attr("input[name='_token']", "value"),
        Query::css_attr("input[name='csrf_token']", "value"),
        Query::css_attr("meta[name='csrf-token']", "content"),
        Query::pattern(r#"(?:csrf|_?token)["']?\s*[:=]\s*["']([A-Za-z0-9+/=_-]{8,})["']"#),
    ])
}
