// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]

//! Error catalog for the Shadow Atlas pipeline.
//!
//! Every error class carries a stable code `ATL-X###` where `X` is the
//! category letter:
//!
//! - **A** — Argument errors (caller-side)
//! - **D** — Data errors (payload-side)
//! - **T** — Transport errors (network-side)
//! - **V** — Validation errors (quality gates)
//! - **S** — System errors (cancellation, internal faults)
//!
//! Retry eligibility is a property of the class, never of call sites:
//! transport-class errors retry per the provider backoff policy, everything
//! else fails fast.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// ErrorClass
// ---------------------------------------------------------------------------

/// The closed set of failure classes the pipeline distinguishes.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// Caller-side mistake; never retried.
    InvalidArgument,
    /// Required fields missing or the payload shape is wrong; never retried.
    SchemaError,
    /// The payload could not be parsed at all; never retried.
    FormatError,
    /// Transient transport failure; retried with backoff.
    NetworkError,
    /// A deadline expired; retried with backoff.
    TimeoutError,
    /// Upstream asked us to slow down (HTTP 429); retried with backoff.
    RateLimited,
    /// Upstream indicated a permanent failure (4xx other than 429); never retried.
    UpstreamError,
    /// Well-formed output that fails a quality gate; surfaced, not retried.
    ValidationFailed,
    /// Cooperative cancellation; partial results are discarded.
    Cancelled,
    /// Programmer error; crashes the job.
    Internal,
}

/// All classes, in catalog order.
const ALL_CLASSES: &[ErrorClass] = &[
    ErrorClass::InvalidArgument,
    ErrorClass::SchemaError,
    ErrorClass::FormatError,
    ErrorClass::NetworkError,
    ErrorClass::TimeoutError,
    ErrorClass::RateLimited,
    ErrorClass::UpstreamError,
    ErrorClass::ValidationFailed,
    ErrorClass::Cancelled,
    ErrorClass::Internal,
];

impl ErrorClass {
    /// Machine-readable code string (e.g. `"ATL-T001"`).
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidArgument => "ATL-A001",
            Self::SchemaError => "ATL-D001",
            Self::FormatError => "ATL-D002",
            Self::NetworkError => "ATL-T001",
            Self::TimeoutError => "ATL-T002",
            Self::RateLimited => "ATL-T003",
            Self::UpstreamError => "ATL-T004",
            Self::ValidationFailed => "ATL-V001",
            Self::Cancelled => "ATL-S001",
            Self::Internal => "ATL-S002",
        }
    }

    /// Human-readable category label.
    #[must_use]
    pub fn category(&self) -> &'static str {
        match self {
            Self::InvalidArgument => "argument",
            Self::SchemaError | Self::FormatError => "data",
            Self::NetworkError | Self::TimeoutError | Self::RateLimited | Self::UpstreamError => {
                "transport"
            }
            Self::ValidationFailed => "validation",
            Self::Cancelled | Self::Internal => "system",
        }
    }

    /// `true` when the provider retry policy may re-attempt the operation.
    ///
    /// Only transient transport failures qualify; `UpstreamError` is a
    /// permanent upstream verdict and is deliberately excluded.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::NetworkError | Self::TimeoutError | Self::RateLimited
        )
    }

    /// Look up a class by its code string.
    #[must_use]
    pub fn lookup(code: &str) -> Option<ErrorClass> {
        ALL_CLASSES.iter().find(|c| c.code() == code).copied()
    }

    /// Every class in the catalog.
    #[must_use]
    pub fn all() -> Vec<ErrorClass> {
        ALL_CLASSES.to_vec()
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

// ---------------------------------------------------------------------------
// AtlasError
// ---------------------------------------------------------------------------

/// Typed error for pipeline operations.
///
/// Each variant maps to exactly one [`ErrorClass`]; the class decides retry
/// eligibility and the CLI exit code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AtlasError {
    /// Caller-side mistake (unknown layer, malformed FIPS, bad threshold).
    #[error("invalid argument: {reason}")]
    InvalidArgument {
        /// What was wrong with the request.
        reason: String,
    },

    /// Required fields are missing from an otherwise parseable payload.
    #[error("schema error in {provider}: {reason}")]
    Schema {
        /// Provider that produced the payload.
        provider: String,
        /// The missing or malformed field.
        reason: String,
    },

    /// The payload could not be parsed.
    #[error("format error in {provider}: {reason}")]
    Format {
        /// Provider that produced the payload.
        provider: String,
        /// Parse failure detail.
        reason: String,
    },

    /// Transient transport failure.
    #[error("network error fetching {url}: {reason}")]
    Network {
        /// Request URL.
        url: String,
        /// Transport failure detail.
        reason: String,
    },

    /// A per-request or per-job deadline expired.
    #[error("timed out after {elapsed_secs}s: {operation}")]
    Timeout {
        /// The operation that timed out.
        operation: String,
        /// Seconds elapsed before expiry.
        elapsed_secs: u64,
    },

    /// Upstream returned HTTP 429.
    #[error("rate limited by {host}")]
    RateLimited {
        /// The throttling host.
        host: String,
    },

    /// Upstream indicated a permanent failure.
    #[error("upstream error from {url}: status {status}")]
    Upstream {
        /// Request URL.
        url: String,
        /// HTTP status upstream returned.
        status: u16,
    },

    /// A quality gate rejected well-formed output.
    #[error("validation failed for {layer} in {scope}: {reason}")]
    ValidationFailed {
        /// Layer that failed.
        layer: String,
        /// State FIPS or jurisdiction identifier.
        scope: String,
        /// Which gate failed and why.
        reason: String,
    },

    /// Cooperative cancellation was observed.
    #[error("cancelled: {operation}")]
    Cancelled {
        /// The operation that observed the token.
        operation: String,
    },

    /// Programmer error.
    #[error("internal error: {reason}")]
    Internal {
        /// What went wrong.
        reason: String,
    },
}

impl AtlasError {
    /// The [`ErrorClass`] this error belongs to.
    #[must_use]
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::InvalidArgument { .. } => ErrorClass::InvalidArgument,
            Self::Schema { .. } => ErrorClass::SchemaError,
            Self::Format { .. } => ErrorClass::FormatError,
            Self::Network { .. } => ErrorClass::NetworkError,
            Self::Timeout { .. } => ErrorClass::TimeoutError,
            Self::RateLimited { .. } => ErrorClass::RateLimited,
            Self::Upstream { .. } => ErrorClass::UpstreamError,
            Self::ValidationFailed { .. } => ErrorClass::ValidationFailed,
            Self::Cancelled { .. } => ErrorClass::Cancelled,
            Self::Internal { .. } => ErrorClass::Internal,
        }
    }

    /// `true` when the retry policy may re-attempt.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.class().is_retryable()
    }

    /// Classify an HTTP status code into the transport error taxonomy.
    #[must_use]
    pub fn from_http_status(url: &str, status: u16) -> AtlasError {
        match status {
            429 => AtlasError::RateLimited {
                host: host_of(url),
            },
            s if s >= 500 => AtlasError::Network {
                url: url.to_owned(),
                reason: format!("server error {s}"),
            },
            s => AtlasError::Upstream {
                url: url.to_owned(),
                status: s,
            },
        }
    }
}

fn host_of(url: &str) -> String {
    url.split("://")
        .nth(1)
        .unwrap_or(url)
        .split('/')
        .next()
        .unwrap_or(url)
        .to_owned()
}

/// Convenience result alias for pipeline operations.
pub type AtlasResult<T> = Result<T, AtlasError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_unique() {
        let mut codes: Vec<&str> = ErrorClass::all().iter().map(|c| c.code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), ErrorClass::all().len());
    }

    #[test]
    fn lookup_round_trips() {
        for class in ErrorClass::all() {
            assert_eq!(ErrorClass::lookup(class.code()), Some(class));
        }
        assert_eq!(ErrorClass::lookup("ATL-X999"), None);
    }

    #[test]
    fn only_transient_transport_is_retryable() {
        assert!(ErrorClass::NetworkError.is_retryable());
        assert!(ErrorClass::TimeoutError.is_retryable());
        assert!(ErrorClass::RateLimited.is_retryable());
        assert!(!ErrorClass::UpstreamError.is_retryable());
        assert!(!ErrorClass::SchemaError.is_retryable());
        assert!(!ErrorClass::InvalidArgument.is_retryable());
        assert!(!ErrorClass::Cancelled.is_retryable());
    }

    #[test]
    fn http_status_classification() {
        assert_eq!(
            AtlasError::from_http_status("https://example.gov/a.zip", 429).class(),
            ErrorClass::RateLimited
        );
        assert_eq!(
            AtlasError::from_http_status("https://example.gov/a.zip", 503).class(),
            ErrorClass::NetworkError
        );
        assert_eq!(
            AtlasError::from_http_status("https://example.gov/a.zip", 404).class(),
            ErrorClass::UpstreamError
        );
    }

    #[test]
    fn host_extraction() {
        assert_eq!(host_of("https://www2.census.gov/geo/tiger/x.zip"), "www2.census.gov");
        assert_eq!(host_of("not a url"), "not a url");
    }

    #[test]
    fn serde_round_trip() {
        let err = AtlasError::ValidationFailed {
            layer: "congressional-district".into(),
            scope: "06".into(),
            reason: "cardinality mismatch".into(),
        };
        let json = serde_json::to_string(&err).unwrap();
        let back: AtlasError = serde_json::from_str(&json).unwrap();
        assert_eq!(back, err);
    }
}
