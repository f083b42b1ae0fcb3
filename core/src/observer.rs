//! Injected event sink for the engine.
//!
//! Components never log directly; they report [`EngineEvent`]s to the
//! observer they were built with. [`TracingObserver`] forwards events to
//! `tracing`, [`CollectingObserver`] keeps them for inspection.

use std::sync::{Arc, Mutex};

use crate::error::RecordKind;
use crate::models::VesselId;
use crate::quarter::QuarterKey;

#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// A vessel had no reference rows and was left out of the report.
    MissingReferenceData {
        vessel_id: VesselId,
        vessel_name: String,
        vessel_type_code: i32,
        category: String,
    },
    /// The baseline for one vessel quarter could not be evaluated.
    BaselineFailed {
        vessel_id: VesselId,
        quarter: QuarterKey,
        reason: String,
    },
    /// An inbound record was rejected during ingestion.
    MalformedRecord {
        kind: RecordKind,
        key: String,
        reason: String,
    },
    ImportCompleted {
        kind: RecordKind,
        imported: usize,
        skipped: usize,
    },
    RunCompleted {
        deviations: usize,
    },
}

pub trait EngineObserver {
    fn observe(&self, event: EngineEvent);
}

impl<O: EngineObserver + ?Sized> EngineObserver for &O {
    fn observe(&self, event: EngineEvent) {
        (**self).observe(event)
    }
}

impl<O: EngineObserver + ?Sized> EngineObserver for Arc<O> {
    fn observe(&self, event: EngineEvent) {
        (**self).observe(event)
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl EngineObserver for NoopObserver {
    fn observe(&self, _event: EngineEvent) {}
}

/// Emits events as `tracing` records.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl EngineObserver for TracingObserver {
    fn observe(&self, event: EngineEvent) {
        match event {
            EngineEvent::MissingReferenceData {
                vessel_id,
                vessel_name,
                vessel_type_code,
                category,
            } => tracing::warn!(
                vessel = %vessel_id,
                vessel_type_code,
                "no {} reference rows for vessel {}, skipping",
                category,
                vessel_name
            ),
            EngineEvent::BaselineFailed {
                vessel_id,
                quarter,
                reason,
            } => tracing::warn!(
                vessel = %vessel_id,
                quarter = %quarter,
                "baseline evaluation failed: {}",
                reason
            ),
            EngineEvent::MalformedRecord { kind, key, reason } => {
                tracing::warn!("failed to import {} record {}: {}", kind, key, reason)
            }
            EngineEvent::ImportCompleted {
                kind,
                imported,
                skipped,
            } => tracing::info!(imported, skipped, "imported {} records", kind),
            EngineEvent::RunCompleted { deviations } => {
                tracing::info!("calculated {} quarterly deviations", deviations)
            }
        }
    }
}

/// Records every event in memory.
#[derive(Debug, Default)]
pub struct CollectingObserver {
    events: Mutex<Vec<EngineEvent>>,
}

impl CollectingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<EngineEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Vessels reported as lacking reference data, in report order.
    pub fn skipped_vessels(&self) -> Vec<VesselId> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                EngineEvent::MissingReferenceData { vessel_id, .. } => Some(vessel_id),
                _ => None,
            })
            .collect()
    }

    pub fn malformed_records(&self) -> Vec<(RecordKind, String)> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                EngineEvent::MalformedRecord { kind, key, .. } => Some((kind, key)),
                _ => None,
            })
            .collect()
    }
}

impl EngineObserver for CollectingObserver {
    fn observe(&self, event: EngineEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
