//! Data-quality failures
//!
//! Pipelines raise a [`DQFailure`] when a file breaks its data contract.
//! Orchestration code catches it and decides whether to notify; the
//! notifier never raises one itself.

use std::{borrow::Cow, fmt, str::FromStr};

use thiserror::Error;

/// The fixed set of data-quality failures.
///
/// [`FailureKind::SchemaMismatchAndEmptyFile`] is its own variant, not a
/// combination of the other two, so callers must match on it explicitly.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Any data-quality failure without a more specific kind
    Generic,

    /// The file did not match the expected schema
    SchemaMismatch,

    /// The file contained no rows
    EmptyFile,

    /// The file both mismatched the schema and contained no rows
    SchemaMismatchAndEmptyFile,
}

impl FailureKind {
    /// Every kind, in declaration order
    pub const ALL: [FailureKind; 4] = [
        FailureKind::Generic,
        FailureKind::SchemaMismatch,
        FailureKind::EmptyFile,
        FailureKind::SchemaMismatchAndEmptyFile,
    ];

    /// The message used when the caller does not supply one
    pub const fn default_message(self) -> &'static str {
        match self {
            Self::Generic => "DQ FAIL",
            Self::SchemaMismatch => "DQ FAIL: SCHEMA MISMATCH",
            Self::EmptyFile => "DQ FAIL: EMPTY FILE",
            Self::SchemaMismatchAndEmptyFile => "DQ FAIL: SCHEMA MISMATCH AND EMPTY FILE",
        }
    }

    /// Stable kebab-case name, accepted back by [`FromStr`]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Generic => "generic",
            Self::SchemaMismatch => "schema-mismatch",
            Self::EmptyFile => "empty-file",
            Self::SchemaMismatchAndEmptyFile => "schema-mismatch-and-empty-file",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when parsing an unrecognised failure kind
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown failure kind \"{0}\"")]
pub struct UnknownFailureKind(pub String);

impl FromStr for FailureKind {
    type Err = UnknownFailureKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownFailureKind(s.to_string()))
    }
}

/// A data-quality failure signal
///
/// Immutable once built. The message is either the kind's default or the
/// caller's override.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct DQFailure {
    kind: FailureKind,
    message: Cow<'static, str>,
}

impl DQFailure {
    /// Create a failure carrying the kind's default message
    pub fn new(kind: FailureKind) -> Self {
        Self {
            kind,
            message: Cow::Borrowed(kind.default_message()),
        }
    }

    /// Create a failure with a caller-supplied message
    pub fn with_message(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: Cow::Owned(message.into()),
        }
    }

    /// Generic failure with the default message
    pub fn generic() -> Self {
        Self::new(FailureKind::Generic)
    }

    /// Schema mismatch with the default message
    pub fn schema_mismatch() -> Self {
        Self::new(FailureKind::SchemaMismatch)
    }

    /// Empty file with the default message
    pub fn empty_file() -> Self {
        Self::new(FailureKind::EmptyFile)
    }

    /// Schema mismatch and empty file with the default message
    pub fn schema_mismatch_and_empty_file() -> Self {
        Self::new(FailureKind::SchemaMismatchAndEmptyFile)
    }

    /// Which failure this is
    pub fn kind(&self) -> FailureKind {
        self.kind
    }

    /// The human-readable description
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Subject line for an alert about this failure
    pub fn alert_subject(&self) -> String {
        format!("Data quality alert: {}", self.message)
    }
}

impl From<FailureKind> for DQFailure {
    fn from(kind: FailureKind) -> Self {
        Self::new(kind)
    }
}
