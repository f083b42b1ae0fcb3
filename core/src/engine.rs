use crate::baseline::BaselineCalculator;
use crate::config::EngineConfig;
use crate::curve::ConfiguredCurve;
use crate::deviation::{list_vessels_summary, DeviationReporter};
use crate::error::{ConfigError, IngestError};
use crate::ingest::snapshot_from_json;
use crate::models::{FleetSnapshot, QuarterlyDeviation, VesselSummary};
use crate::observer::{EngineObserver, TracingObserver};
use crate::reference::ReferenceCurveRepository;

/// A configured deviation engine.
///
/// Holds no state between calls: every query works on the snapshot it is
/// given and re-derives its results.
pub struct Engine<O = TracingObserver> {
    config: EngineConfig,
    reporter: DeviationReporter<ConfiguredCurve, O>,
}

impl Engine<TracingObserver> {
    pub fn from_config(config: EngineConfig) -> Result<Self, ConfigError> {
        Self::with_observer(config, TracingObserver)
    }
}

impl<O: EngineObserver> Engine<O> {
    pub fn with_observer(config: EngineConfig, observer: O) -> Result<Self, ConfigError> {
        config.validate()?;
        let calculator = BaselineCalculator::new(config.build_curve()?);
        let reporter = DeviationReporter::new(calculator, observer)
            .with_category(config.reference_category.clone())
            .with_default_deadweight(config.default_deadweight)
            .with_bound(config.baseline_bound);

        Ok(Self { config, reporter })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn observer(&self) -> &O {
        self.reporter.observer()
    }

    pub fn quarterly_deviations(&self, snapshot: &FleetSnapshot) -> Vec<QuarterlyDeviation> {
        let repo = ReferenceCurveRepository::new(snapshot.reference_rows.iter().cloned());
        self.reporter.compute_all(&snapshot.vessels, &repo)
    }

    pub fn vessel_summaries(&self, snapshot: &FleetSnapshot) -> Vec<VesselSummary> {
        list_vessels_summary(&snapshot.vessels, self.config.default_deadweight)
    }

    /// Parse a snapshot document, reporting skipped records to this engine's observer.
    pub fn parse_snapshot(&self, json: &str) -> Result<FleetSnapshot, IngestError> {
        snapshot_from_json(json, self.observer())
    }
}
