pub mod baseline;
pub mod config;
pub mod curve;
pub mod deviation;
pub mod engine;
pub mod error;
pub mod expression;
pub mod ffi;
pub mod ingest;
pub mod models;
pub mod observer;
pub mod quarter;
pub mod reference;
pub mod storage;

uniffi::setup_scaffolding!();

pub use baseline::{BaselineBound, BaselineCalculator, BaselineRange};
pub use config::{CurveSpec, EngineConfig};
pub use curve::{BaselineCurve, ConfiguredCurve, ExpressionCurve, PowerLawCurve};
pub use deviation::{list_vessels_summary, percentage_deviation, DeviationReporter};
pub use engine::Engine;
pub use error::{ConfigError, CurveError, EngineError, IngestError, StoreError, ValidationError};
pub use ingest::{import_from_dir, snapshot_from_json, ImportCount, ImportSummary};
pub use models::{
    EmissionKey, EmissionQuantities, EmissionRecord, FleetSnapshot, QuarterlyDeviation,
    ReferenceCoefficientRow, Vessel, VesselEmissions, VesselId, VesselSummary,
};
pub use observer::{CollectingObserver, EngineEvent, EngineObserver, NoopObserver, TracingObserver};
pub use quarter::{group_by_quarter, QuarterKey};
pub use reference::{CurveQuery, ReferenceCurveRepository};
pub use storage::{EmissionStore, InMemoryStore};
