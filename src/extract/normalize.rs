//! Extracted-value normalization.

/// Glyphs the target sites use to mask redacted spans of a value
/// (e.g. `***.444.777-**` or `Maria ● Silva`).
const MASK_CHARS: [char; 4] = ['*', '\u{25CF}', '\u{2022}', '\u{25AA}'];

/// Normalizes an extracted value: drops mask glyphs, collapses internal
/// whitespace runs to a single space, trims the ends.
///
/// Idempotent: `normalize(normalize(x)) == normalize(x)`.
#[must_use]
pub fn normalize(value: &str) -> String {
    let unmasked: String = value.chars().filter(|c| !MASK_CHARS.contains(c)).collect();
    unmasked.split_whitespace().collect::<Vec<_>>().join(" ")
}
