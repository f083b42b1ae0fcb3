//! Host-facing entry points.
//!
//! Hosts pass the snapshot document as JSON and receive flat records back.
//! Skipped vessels and records are reported through `tracing`.

use thiserror::Error;

use crate::config::EngineConfig;
use crate::curve::ExpressionCurve;
use crate::engine::Engine;
use crate::error::{ConfigError, CurveError, IngestError};
use crate::expression::{supported_functions, FunctionInfo};
use crate::models::{iso_timestamp, QuarterlyDeviation, VesselSummary};

#[derive(Debug, Clone, PartialEq, uniffi::Record)]
pub struct DeviationRecord {
    pub vessel_id: String,
    pub vessel_name: String,
    /// `Q1` through `Q4`
    pub quarter: String,
    pub year: i32,
    pub actual_emissions: f64,
    pub baseline: f64,
    pub deviation: f64,
    /// ISO-8601, millisecond precision, UTC
    pub date: String,
}

impl From<QuarterlyDeviation> for DeviationRecord {
    fn from(deviation: QuarterlyDeviation) -> Self {
        Self {
            vessel_id: deviation.vessel_id.0,
            vessel_name: deviation.vessel_name,
            quarter: format!("Q{}", deviation.quarter),
            year: deviation.year,
            actual_emissions: deviation.actual_emissions,
            baseline: deviation.baseline,
            deviation: deviation.deviation,
            date: iso_timestamp(&deviation.date),
        }
    }
}

#[derive(Debug, Clone, PartialEq, uniffi::Record)]
pub struct VesselSummaryRecord {
    pub imo_no: String,
    pub name: String,
    pub vessel_type_code: i32,
    /// Decimal string of the deadweight baselines are evaluated at
    pub dwt: String,
    pub emission_record_count: u64,
}

impl From<VesselSummary> for VesselSummaryRecord {
    fn from(summary: VesselSummary) -> Self {
        Self {
            imo_no: summary.imo_no.0,
            name: summary.name,
            vessel_type_code: summary.vessel_type_code,
            dwt: summary.dwt.normalize().to_string(),
            emission_record_count: summary.emission_record_count as u64,
        }
    }
}

#[derive(Debug, Error, uniffi::Error)]
#[uniffi(flat_error)]
pub enum ComputeError {
    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("invalid curve expression: {0}")]
    InvalidCurve(String),
    #[error("serialization failed: {0}")]
    Serialization(String),
}

impl From<IngestError> for ComputeError {
    fn from(err: IngestError) -> Self {
        ComputeError::InvalidSnapshot(err.to_string())
    }
}

impl From<ConfigError> for ComputeError {
    fn from(err: ConfigError) -> Self {
        ComputeError::InvalidConfig(err.to_string())
    }
}

impl From<CurveError> for ComputeError {
    fn from(err: CurveError) -> Self {
        ComputeError::InvalidCurve(err.to_string())
    }
}

impl From<serde_json::Error> for ComputeError {
    fn from(err: serde_json::Error) -> Self {
        ComputeError::Serialization(err.to_string())
    }
}

fn run(snapshot_json: &str, config: EngineConfig) -> Result<Vec<QuarterlyDeviation>, ComputeError> {
    let engine = Engine::from_config(config)?;
    let snapshot = engine.parse_snapshot(snapshot_json)?;
    Ok(engine.quarterly_deviations(&snapshot))
}

/// Quarterly deviations for every vessel in the snapshot, default configuration.
#[uniffi::export]
pub fn quarterly_deviations(snapshot_json: String) -> Result<Vec<DeviationRecord>, ComputeError> {
    let deviations = run(&snapshot_json, EngineConfig::default())?;
    Ok(deviations.into_iter().map(DeviationRecord::from).collect())
}

#[uniffi::export]
pub fn quarterly_deviations_with_config(
    snapshot_json: String,
    config_toml: String,
) -> Result<Vec<DeviationRecord>, ComputeError> {
    let config = EngineConfig::from_toml_str(&config_toml)?;
    let deviations = run(&snapshot_json, config)?;
    Ok(deviations.into_iter().map(DeviationRecord::from).collect())
}

/// Same as [`quarterly_deviations`], rendered as the JSON report document.
#[uniffi::export]
pub fn quarterly_deviations_json(snapshot_json: String) -> Result<String, ComputeError> {
    let deviations = run(&snapshot_json, EngineConfig::default())?;
    Ok(serde_json::to_string(&deviations)?)
}

#[uniffi::export]
pub fn vessel_summaries(snapshot_json: String) -> Result<Vec<VesselSummaryRecord>, ComputeError> {
    let engine = Engine::from_config(EngineConfig::default())?;
    let snapshot = engine.parse_snapshot(&snapshot_json)?;
    Ok(engine
        .vessel_summaries(&snapshot)
        .into_iter()
        .map(VesselSummaryRecord::from)
        .collect())
}

/// Check that `expression` is a usable baseline curve.
#[uniffi::export]
pub fn validate_curve_expression(expression: String) -> Result<(), ComputeError> {
    ExpressionCurve::parse(&expression)?;
    Ok(())
}

#[uniffi::export]
pub fn supported_curve_functions() -> Vec<FunctionInfo> {
    supported_functions()
}
