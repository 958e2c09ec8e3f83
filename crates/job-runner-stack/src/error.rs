//! Resolution errors
//!
//! Every error here is a pre-provisioning validation failure. None of them
//! are retryable, and none leave declarations behind in the stack.

use thiserror::Error;

/// Errors raised while resolving a job runner
#[derive(Debug, Error)]
pub enum ResolveError {
    /// auth token absent or empty
    #[error("runner auth token is missing or empty")]
    MissingCredential,

    /// A caller-supplied reference (role, image, instance type) is malformed
    #[error("invalid {field} '{value}': {reason}")]
    InvalidReference {
        field: &'static str,
        value: String,
        reason: String,
    },

    /// Field-level validation failed
    #[error("invalid runner configuration: {0}")]
    InvalidConfiguration(#[from] garde::Report),

    /// Dynamic image lookup did not produce exactly one latest image
    #[error(transparent)]
    LookupAmbiguity(#[from] LookupFailure),

    /// The provisioning context itself is malformed
    #[error("invalid stack: {0}")]
    InvalidStack(String),
}

impl ResolveError {
    pub(crate) fn invalid_reference(
        field: &'static str,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        ResolveError::InvalidReference {
            field,
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Check if this is a missing credential error
    pub fn is_missing_credential(&self) -> bool {
        matches!(self, ResolveError::MissingCredential)
    }

    /// Check if this is a malformed reference error
    pub fn is_invalid_reference(&self) -> bool {
        matches!(self, ResolveError::InvalidReference { .. })
    }

    /// Check if this is a lookup error
    pub fn is_lookup_ambiguity(&self) -> bool {
        matches!(self, ResolveError::LookupAmbiguity(_))
    }
}

/// Why an image lookup could not pick a single image
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupFailure {
    /// Nothing in the catalog matched the query
    #[error("no image in {region} matches {query}")]
    NoMatch { region: String, query: String },

    /// Several distinct images tie for newest
    #[error(
        "{} images in {region} tie for newest match of {query}: {}",
        candidates.len(),
        candidates.join(", ")
    )]
    Ambiguous {
        region: String,
        query: String,
        candidates: Vec<String>,
    },
}

pub type ResolveResult<T> = Result<T, ResolveError>;
