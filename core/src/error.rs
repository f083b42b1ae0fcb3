use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::models::VesselId;

/// Error type for curve expression parsing and evaluation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CurveError {
    #[error("parse error at position {position}: {message}")]
    ParseError { position: usize, message: String },

    #[error("unknown variable: {0}")]
    UnknownVariable(String),

    #[error("unknown function: {0}")]
    UnknownFunction(String),

    #[error("division by zero")]
    DivisionByZero,

    #[error("arithmetic overflow in {0}")]
    Overflow(String),

    #[error("argument outside the domain of {0}")]
    Domain(String),

    #[error("invalid argument count for {function}: expected {expected}, got {got}")]
    InvalidArgCount {
        function: String,
        expected: usize,
        got: usize,
    },

    #[error("empty expression")]
    EmptyExpression,
}

/// Errors raised by the baseline computation itself.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// The calculator was handed an empty row set. Callers check the
    /// repository result first, so this is a caller bug.
    #[error("no matching reference curve")]
    NoMatchingCurve,

    #[error("reference row {row_id} could not be evaluated: {source}")]
    CurveEvaluation { row_id: i64, source: CurveError },

    #[error("deadweight must be positive, got {0}")]
    InvalidDeadweight(Decimal),
}

/// Why a single inbound record was rejected at the ingestion boundary.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("missing field: {0}")]
    MissingField(&'static str),

    #[error("invalid {field}: {value}")]
    InvalidValue { field: &'static str, value: String },

    #[error("invalid timestamp for {field}: {value}")]
    InvalidTimestamp { field: &'static str, value: String },

    #[error("interval end {to} is not after start {from}")]
    EmptyInterval {
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    },

    #[error("{field} must be a non-negative finite number, got {value}")]
    InvalidQuantity { field: &'static str, value: f64 },

    #[error("deadweight must be positive, got {0}")]
    NegativeDeadweight(Decimal),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("unknown vessel: {0}")]
    UnknownVessel(VesselId),
}

/// The kind of record an ingestion event refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Vessel,
    ReferenceRow,
    Emission,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RecordKind::Vessel => "vessel",
            RecordKind::ReferenceRow => "reference row",
            RecordKind::Emission => "emission",
        };
        f.write_str(label)
    }
}

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid JSON in {context}: {source}")]
    Json {
        context: String,
        source: serde_json::Error,
    },

    #[error("{context}: expected a JSON array")]
    NotAnArray { context: String },

    #[error("malformed {kind} record {key}: {reason}")]
    MalformedRecord {
        kind: RecordKind,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid TOML configuration: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid JSON configuration: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid curve expression: {0}")]
    Curve(#[from] CurveError),

    #[error("default deadweight must be positive, got {0}")]
    InvalidDefaultDeadweight(Decimal),

    #[error("reference category must not be empty")]
    EmptyCategory,
}
