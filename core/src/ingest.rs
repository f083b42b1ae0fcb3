//! Conversion of external JSON documents into typed records.
//!
//! Two document families are accepted: the operator's source files
//! (`vessels.json`, `pp-reference.json`, `daily-log-emissions.json`, with
//! their PascalCase column names) and the canonical camelCase snapshot
//! document. Every element is converted on its own; a malformed element is
//! reported to the observer and skipped. Only an unreadable or non-array
//! document aborts an import.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::error::{IngestError, RecordKind, StoreError, ValidationError};
use crate::models::{
    EmissionKey, EmissionQuantities, EmissionRecord, FleetSnapshot, ReferenceCoefficientRow,
    Vessel, VesselId,
};
use crate::observer::{EngineEvent, EngineObserver};
use crate::storage::{EmissionStore, InMemoryStore};

pub const VESSELS_FILE: &str = "vessels.json";
pub const REFERENCE_FILE: &str = "pp-reference.json";
pub const EMISSIONS_FILE: &str = "daily-log-emissions.json";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportCount {
    pub imported: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub vessels: ImportCount,
    pub reference_rows: ImportCount,
    pub emissions: ImportCount,
}

/// Why one element could not be imported.
#[derive(Debug, Error)]
enum RecordError {
    #[error(transparent)]
    Shape(#[from] serde_json::Error),
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// An identifier that upstream systems emit as either a number or a string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Identifier {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl Identifier {
    fn into_text(self) -> String {
        match self {
            Identifier::Integer(value) => value.to_string(),
            Identifier::Float(value) if value.fract() == 0.0 && value.abs() < 1e15 => {
                (value as i64).to_string()
            }
            Identifier::Float(value) => value.to_string(),
            Identifier::Text(value) => value.trim().to_string(),
        }
    }

    fn to_integer(&self, field: &'static str) -> Result<i64, ValidationError> {
        let invalid = |value: String| ValidationError::InvalidValue { field, value };
        match self {
            Identifier::Integer(value) => Ok(*value),
            Identifier::Float(value) if value.fract() == 0.0 && value.abs() < 1e15 => {
                Ok(*value as i64)
            }
            Identifier::Float(value) => Err(invalid(value.to_string())),
            Identifier::Text(value) => value.trim().parse().map_err(|_| invalid(value.clone())),
        }
    }

    fn to_i32(&self, field: &'static str) -> Result<i32, ValidationError> {
        let value = self.to_integer(field)?;
        i32::try_from(value).map_err(|_| ValidationError::InvalidValue {
            field,
            value: value.to_string(),
        })
    }
}

fn required<T>(value: Option<T>, field: &'static str) -> Result<T, ValidationError> {
    value.ok_or(ValidationError::MissingField(field))
}

#[derive(Debug, Deserialize)]
struct RawVessel {
    #[serde(rename = "IMONo", alias = "imoNo")]
    imo_no: Option<Identifier>,
    #[serde(rename = "Name", alias = "name")]
    name: Option<String>,
    #[serde(rename = "VesselType", alias = "vesselTypeCode")]
    vessel_type: Option<Identifier>,
    #[serde(rename = "DWT", alias = "dwt")]
    dwt: Option<Decimal>,
}

impl RawVessel {
    fn into_vessel(self) -> Result<Vessel, ValidationError> {
        let imo_no = required(self.imo_no, "IMONo")?.into_text();
        if imo_no.is_empty() {
            return Err(ValidationError::InvalidValue {
                field: "IMONo",
                value: imo_no,
            });
        }
        let name = required(self.name, "Name")?;
        let vessel_type = required(self.vessel_type, "VesselType")?.to_i32("VesselType")?;
        // Zero is how the source marks an unknown tonnage
        let dwt = match self.dwt {
            Some(dwt) if dwt < Decimal::ZERO => return Err(ValidationError::NegativeDeadweight(dwt)),
            Some(dwt) if dwt.is_zero() => None,
            dwt => dwt,
        };

        Ok(Vessel::new(imo_no, name, vessel_type, dwt))
    }
}

#[derive(Debug, Deserialize)]
struct RawReferenceRow {
    #[serde(rename = "RowID", alias = "rowId")]
    row_id: Option<Identifier>,
    #[serde(rename = "Category", alias = "category")]
    category: Option<String>,
    #[serde(rename = "VesselTypeID", alias = "vesselTypeId")]
    vessel_type_id: Option<Identifier>,
    #[serde(rename = "Size", alias = "size")]
    size: Option<Identifier>,
    #[serde(rename = "Traj", alias = "traj")]
    trajectory: Option<Identifier>,
    a: Option<Decimal>,
    b: Option<Decimal>,
    c: Option<Decimal>,
    d: Option<Decimal>,
    e: Option<Decimal>,
}

impl RawReferenceRow {
    fn into_row(self) -> Result<ReferenceCoefficientRow, ValidationError> {
        Ok(ReferenceCoefficientRow {
            row_id: required(self.row_id, "RowID")?.to_integer("RowID")?,
            category: required(self.category, "Category")?.trim().to_string(),
            vessel_type_id: required(self.vessel_type_id, "VesselTypeID")?.to_i32("VesselTypeID")?,
            size: self.size.map(Identifier::into_text).unwrap_or_default(),
            trajectory: self.trajectory.map(Identifier::into_text).unwrap_or_default(),
            a: self.a.unwrap_or_default(),
            b: self.b.unwrap_or_default(),
            c: self.c.unwrap_or_default(),
            d: self.d.unwrap_or_default(),
            e: self.e.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawQuantities {
    #[serde(rename = "MET2WCO2", alias = "metCO2")]
    met_co2: Option<f64>,
    #[serde(rename = "AET2WCO2", alias = "aetCO2")]
    aet_co2: Option<f64>,
    #[serde(rename = "BOT2WCO2", alias = "botCO2")]
    bot_co2: Option<f64>,
    #[serde(rename = "VRT2WCO2", alias = "vrtCO2")]
    vrt_co2: Option<f64>,
    #[serde(rename = "TotT2WCO2", alias = "totCO2")]
    tot_co2: Option<f64>,
    #[serde(rename = "MEW2WCO2e", alias = "mewCO2e")]
    mew_co2e: Option<f64>,
    #[serde(rename = "AEW2WCO2e", alias = "aewCO2e")]
    aew_co2e: Option<f64>,
    #[serde(rename = "BOW2WCO2e", alias = "bowCO2e")]
    bow_co2e: Option<f64>,
    #[serde(rename = "VRW2WCO2e", alias = "vrwCO2e")]
    vrw_co2e: Option<f64>,
    #[serde(rename = "ToTW2WCO2", alias = "totWCO2e")]
    tot_wco2e: Option<f64>,
    #[serde(rename = "MESox", alias = "mesOx")]
    me_sox: Option<f64>,
    #[serde(rename = "AESox", alias = "aesOx")]
    ae_sox: Option<f64>,
    #[serde(rename = "BOSox", alias = "bosOx")]
    bo_sox: Option<f64>,
    #[serde(rename = "VRSox", alias = "vrsOx")]
    vr_sox: Option<f64>,
    #[serde(rename = "TotSOx", alias = "totSOx")]
    tot_sox: Option<f64>,
    #[serde(rename = "MENOx", alias = "menOx")]
    me_nox: Option<f64>,
    #[serde(rename = "AENOx", alias = "aenOx")]
    ae_nox: Option<f64>,
    #[serde(rename = "TotNOx", alias = "totNOx")]
    tot_nox: Option<f64>,
    #[serde(rename = "MEPM10", alias = "mepm10")]
    me_pm10: Option<f64>,
    #[serde(rename = "AEPM10", alias = "aepm10")]
    ae_pm10: Option<f64>,
    #[serde(rename = "TotPM10", alias = "totPM10")]
    tot_pm10: Option<f64>,
    #[serde(rename = "AERCO2T2W", alias = "aerCO2T2W")]
    aer_co2_t2w: Option<f64>,
    #[serde(rename = "AERCO2eW2W", alias = "aerCO2eW2W")]
    aer_co2e_w2w: Option<f64>,
    #[serde(rename = "EEOICO2eW2W", alias = "eeOICO2eW2W")]
    eeoi_co2e_w2w: Option<f64>,
}

impl From<RawQuantities> for EmissionQuantities {
    fn from(raw: RawQuantities) -> Self {
        Self {
            met_co2: raw.met_co2.unwrap_or_default(),
            aet_co2: raw.aet_co2.unwrap_or_default(),
            bot_co2: raw.bot_co2.unwrap_or_default(),
            vrt_co2: raw.vrt_co2.unwrap_or_default(),
            tot_co2: raw.tot_co2.unwrap_or_default(),
            mew_co2e: raw.mew_co2e.unwrap_or_default(),
            aew_co2e: raw.aew_co2e.unwrap_or_default(),
            bow_co2e: raw.bow_co2e.unwrap_or_default(),
            vrw_co2e: raw.vrw_co2e.unwrap_or_default(),
            tot_wco2e: raw.tot_wco2e.unwrap_or_default(),
            me_sox: raw.me_sox.unwrap_or_default(),
            ae_sox: raw.ae_sox.unwrap_or_default(),
            bo_sox: raw.bo_sox.unwrap_or_default(),
            vr_sox: raw.vr_sox.unwrap_or_default(),
            tot_sox: raw.tot_sox.unwrap_or_default(),
            me_nox: raw.me_nox.unwrap_or_default(),
            ae_nox: raw.ae_nox.unwrap_or_default(),
            tot_nox: raw.tot_nox.unwrap_or_default(),
            me_pm10: raw.me_pm10.unwrap_or_default(),
            ae_pm10: raw.ae_pm10.unwrap_or_default(),
            tot_pm10: raw.tot_pm10.unwrap_or_default(),
            aer_co2_t2w: raw.aer_co2_t2w.unwrap_or_default(),
            aer_co2e_w2w: raw.aer_co2e_w2w.unwrap_or_default(),
            eeoi_co2e_w2w: raw.eeoi_co2e_w2w.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawEmission {
    #[serde(rename = "EID", alias = "eid")]
    eid: Option<Identifier>,
    #[serde(rename = "LOGID", alias = "logId")]
    log_id: Option<Identifier>,
    #[serde(rename = "VesselID", alias = "vesselId")]
    vessel_id: Option<Identifier>,
    #[serde(rename = "FromUTC", alias = "fromUTC")]
    from_utc: Option<String>,
    #[serde(rename = "TOUTC", alias = "toUTC")]
    to_utc: Option<String>,
    #[serde(flatten)]
    quantities: RawQuantities,
}

impl RawEmission {
    fn into_record(self) -> Result<(Option<VesselId>, EmissionRecord), ValidationError> {
        let key = EmissionKey::new(
            required(self.eid, "EID")?.into_text(),
            required(self.log_id, "LOGID")?.into_text(),
        );
        let from_utc = parse_timestamp("FromUTC", &required(self.from_utc, "FromUTC")?)?;
        let to_utc = parse_timestamp("TOUTC", &required(self.to_utc, "TOUTC")?)?;
        let record = EmissionRecord::new(key, from_utc, to_utc, self.quantities.into())?;

        let vessel_id = self.vessel_id.map(|id| VesselId(id.into_text()));
        Ok((vessel_id, record))
    }
}

/// Parse an upstream timestamp as UTC.
///
/// Accepts RFC 3339 with any offset, and the naive forms
/// `YYYY-MM-DDTHH:MM:SS[.fff]`, `YYYY-MM-DD HH:MM:SS[.fff]` and `YYYY-MM-DD`,
/// which are taken to be UTC already.
pub fn parse_timestamp(field: &'static str, value: &str) -> Result<DateTime<Utc>, ValidationError> {
    let value = value.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(naive.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Ok(date.and_time(NaiveTime::MIN).and_utc());
    }
    Err(ValidationError::InvalidTimestamp {
        field,
        value: value.to_string(),
    })
}

const VESSEL_KEY: &[&[&str]] = &[&["IMONo", "imoNo"]];
const REFERENCE_KEY: &[&[&str]] = &[&["RowID", "rowId"]];
const EMISSION_KEY: &[&[&str]] = &[&["EID", "eid"], &["LOGID", "logId"]];

/// Best-effort label for an element, used when reporting it as malformed.
fn describe(kind: RecordKind, element: &Value, index: usize) -> String {
    let fields = match kind {
        RecordKind::Vessel => VESSEL_KEY,
        RecordKind::ReferenceRow => REFERENCE_KEY,
        RecordKind::Emission => EMISSION_KEY,
    };
    let parts: Vec<String> = fields
        .iter()
        .filter_map(|names| {
            names
                .iter()
                .find_map(|name| element.get(*name))
                .and_then(|value| match value {
                    Value::String(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
                    Value::Number(number) => Some(number.to_string()),
                    _ => None,
                })
        })
        .collect();

    if parts.len() == fields.len() {
        parts.join("/")
    } else {
        format!("#{index}")
    }
}

/// Tallies one kind of record and reports rejected elements.
struct Batch<'o, O: EngineObserver> {
    kind: RecordKind,
    observer: &'o O,
    count: ImportCount,
}

impl<'o, O: EngineObserver> Batch<'o, O> {
    fn new(kind: RecordKind, observer: &'o O) -> Self {
        Self {
            kind,
            observer,
            count: ImportCount::default(),
        }
    }

    fn accept<F>(&mut self, index: usize, element: Value, apply: F)
    where
        F: FnOnce(Value) -> Result<(), RecordError>,
    {
        let key = describe(self.kind, &element, index);
        match apply(element) {
            Ok(()) => self.count.imported += 1,
            Err(err) => {
                self.count.skipped += 1;
                self.observer.observe(EngineEvent::MalformedRecord {
                    kind: self.kind,
                    key,
                    reason: err.to_string(),
                });
            }
        }
    }

    fn finish(self) -> ImportCount {
        self.observer.observe(EngineEvent::ImportCompleted {
            kind: self.kind,
            imported: self.count.imported,
            skipped: self.count.skipped,
        });
        self.count
    }
}

fn parse_array(json: &str, context: &str) -> Result<Vec<Value>, IngestError> {
    let document: Value = serde_json::from_str(json).map_err(|source| IngestError::Json {
        context: context.to_string(),
        source,
    })?;
    match document {
        Value::Array(elements) => Ok(elements),
        _ => Err(IngestError::NotAnArray {
            context: context.to_string(),
        }),
    }
}

fn vessel_from_value(element: Value) -> Result<Vessel, RecordError> {
    let raw: RawVessel = serde_json::from_value(element)?;
    Ok(raw.into_vessel()?)
}

fn reference_row_from_value(element: Value) -> Result<ReferenceCoefficientRow, RecordError> {
    let raw: RawReferenceRow = serde_json::from_value(element)?;
    Ok(raw.into_row()?)
}

fn emission_from_value(element: Value) -> Result<(Option<VesselId>, EmissionRecord), RecordError> {
    let raw: RawEmission = serde_json::from_value(element)?;
    Ok(raw.into_record()?)
}

fn upsert_vessels<S, O>(store: &mut S, elements: Vec<Value>, observer: &O) -> ImportCount
where
    S: EmissionStore,
    O: EngineObserver,
{
    let mut batch = Batch::new(RecordKind::Vessel, observer);
    for (index, element) in elements.into_iter().enumerate() {
        batch.accept(index, element, |element| {
            store.upsert_vessel(vessel_from_value(element)?)?;
            Ok(())
        });
    }
    batch.finish()
}

fn replace_reference_rows<S, O>(
    store: &mut S,
    elements: Vec<Value>,
    observer: &O,
) -> Result<ImportCount, IngestError>
where
    S: EmissionStore,
    O: EngineObserver,
{
    let mut rows = Vec::with_capacity(elements.len());
    let mut batch = Batch::new(RecordKind::ReferenceRow, observer);
    for (index, element) in elements.into_iter().enumerate() {
        batch.accept(index, element, |element| {
            rows.push(reference_row_from_value(element)?);
            Ok(())
        });
    }
    store.replace_reference_rows(rows)?;
    Ok(batch.finish())
}

/// Import vessel rows. Existing vessels with the same IMO number are replaced.
pub fn import_vessels<S, O>(store: &mut S, json: &str, observer: &O) -> Result<ImportCount, IngestError>
where
    S: EmissionStore,
    O: EngineObserver,
{
    let elements = parse_array(json, VESSELS_FILE)?;
    Ok(upsert_vessels(store, elements, observer))
}

/// Import the reference dataset, replacing whatever the store held before.
pub fn import_reference_rows<S, O>(
    store: &mut S,
    json: &str,
    observer: &O,
) -> Result<ImportCount, IngestError>
where
    S: EmissionStore,
    O: EngineObserver,
{
    let elements = parse_array(json, REFERENCE_FILE)?;
    replace_reference_rows(store, elements, observer)
}

/// Import emission rows; each must name a vessel already in the store.
pub fn import_emissions<S, O>(store: &mut S, json: &str, observer: &O) -> Result<ImportCount, IngestError>
where
    S: EmissionStore,
    O: EngineObserver,
{
    let elements = parse_array(json, EMISSIONS_FILE)?;
    let mut batch = Batch::new(RecordKind::Emission, observer);
    for (index, element) in elements.into_iter().enumerate() {
        batch.accept(index, element, |element| {
            let (vessel_id, record) = emission_from_value(element)?;
            let vessel_id = vessel_id.ok_or(ValidationError::MissingField("VesselID"))?;
            store.upsert_emission(&vessel_id, record)?;
            Ok(())
        });
    }
    Ok(batch.finish())
}

/// Import the three source files from `dir` in dependency order.
pub fn import_from_dir<S, O>(
    store: &mut S,
    dir: impl AsRef<Path>,
    observer: &O,
) -> Result<ImportSummary, IngestError>
where
    S: EmissionStore,
    O: EngineObserver,
{
    let dir = dir.as_ref();
    let read = |name: &str| {
        let path = dir.join(name);
        fs::read_to_string(&path).map_err(|source| IngestError::Io { path, source })
    };

    let vessels = import_vessels(store, &read(VESSELS_FILE)?, observer)?;
    let reference_rows = import_reference_rows(store, &read(REFERENCE_FILE)?, observer)?;
    let emissions = import_emissions(store, &read(EMISSIONS_FILE)?, observer)?;

    Ok(ImportSummary {
        vessels,
        reference_rows,
        emissions,
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotDocument {
    #[serde(default)]
    vessels: Vec<Value>,
    #[serde(default)]
    emissions_by_vessel: BTreeMap<String, Vec<Value>>,
    #[serde(default)]
    reference_rows: Vec<Value>,
}

/// Build a snapshot from the canonical snapshot document.
///
/// Emissions are keyed by the IMO number they are listed under; emissions
/// listed under a vessel that is absent from `vessels` are skipped.
///
/// The snapshot is rebuilt through an [`InMemoryStore`], so vessels come back
/// ordered by IMO number rather than in document order. Deviations that share
/// a date are reported in that order.
pub fn snapshot_from_json<O: EngineObserver>(json: &str, observer: &O) -> Result<FleetSnapshot, IngestError> {
    let document: SnapshotDocument =
        serde_json::from_str(json).map_err(|source| IngestError::Json {
            context: "snapshot".to_string(),
            source,
        })?;

    let mut store = InMemoryStore::new();
    upsert_vessels(&mut store, document.vessels, observer);
    replace_reference_rows(&mut store, document.reference_rows, observer)?;

    let mut batch = Batch::new(RecordKind::Emission, observer);
    for (imo_no, elements) in document.emissions_by_vessel {
        let vessel_id = VesselId(imo_no);
        for (index, element) in elements.into_iter().enumerate() {
            batch.accept(index, element, |element| {
                let (_, record) = emission_from_value(element)?;
                store.upsert_emission(&vessel_id, record)?;
                Ok(())
            });
        }
    }
    batch.finish();

    Ok(store.snapshot()?)
}
