//! Repository identifier → namespace (collection) name.
//!
//! Every character that is not ASCII alphanumeric, `-` or `_` becomes
//! [`SUBSTITUTE`]. Two identifiers that differ only in replaced characters
//! (`acme/api` and `acme.api`) resolve to the same namespace; this narrow
//! collision is accepted.
//!
//! ```rust
//! use repo_vectorizer_core::namespace::resolve_namespace;
//!
//! assert_eq!(resolve_namespace("acme/billing.api").unwrap(), "acme_billing_api");
//! ```

use crate::error::{Result, RetrievalError};

pub const SUBSTITUTE: char = '_';

/// Map a repository identifier to its canonical namespace name.
///
/// Pure and deterministic. Leading and trailing whitespace is ignored.
///
/// # Errors
///
/// [`RetrievalError::Validation`] for an empty or whitespace-only identifier.
pub fn resolve_namespace(repo_identifier: &str) -> Result<String> {
    let trimmed = repo_identifier.trim();
    if trimmed.is_empty() {
        return Err(RetrievalError::validation(
            "repository identifier must not be empty",
        ));
    }

    Ok(trimmed
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                SUBSTITUTE
            }
        })
        .collect())
}
