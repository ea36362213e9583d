//! Identifier normalization for cross-source comparison.
//!
//! Registry prefixes and knowledge-base short names disagree on casing and
//! surrounding whitespace. Every comparison between the two goes through
//! [`normalize`]; raw identifiers are never compared directly.

use crate::error::IdentError;

/// Normalize an identifier: trim surrounding whitespace, then lowercase.
///
/// Idempotent: `normalize(normalize(x)) == normalize(x)`. Fails only on
/// empty or whitespace-only input.
pub fn normalize(id: &str) -> Result<String, IdentError> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        return Err(IdentError::Empty);
    }
    Ok(trimmed.to_lowercase())
}

/// Whether two identifiers refer to the same entity under normalization.
pub fn same_entity(a: &str, b: &str) -> bool {
    match (normalize(a), normalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
