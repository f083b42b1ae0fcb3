use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use serde::{Serialize, Serializer};

use crate::error::ValidationError;

/// Deadweight assumed for vessels whose tonnage is unknown.
pub const DEFAULT_DEADWEIGHT: Decimal = Decimal::from_parts(50_000, 0, 0, false, 0);

/// Reference category of the Poseidon Principles trajectories.
pub const POSEIDON_PRINCIPLES_CATEGORY: &str = "PP";

/// IMO number of a vessel.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct VesselId(pub String);

impl fmt::Display for VesselId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VesselId {
    fn from(value: &str) -> Self {
        VesselId(value.to_string())
    }
}

/// Natural key of an emission record: (emission id, log id).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EmissionKey {
    pub eid: String,
    pub log_id: String,
}

impl EmissionKey {
    pub fn new(eid: impl Into<String>, log_id: impl Into<String>) -> Self {
        Self {
            eid: eid.into(),
            log_id: log_id.into(),
        }
    }
}

impl fmt::Display for EmissionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.eid, self.log_id)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Vessel {
    pub imo_no: VesselId,
    pub name: String,
    pub vessel_type_code: i32,
    /// Deadweight tonnage; `None` when the source did not report one.
    pub dwt: Option<Decimal>,
}

impl Vessel {
    pub fn new(
        imo_no: impl Into<String>,
        name: impl Into<String>,
        vessel_type_code: i32,
        dwt: Option<Decimal>,
    ) -> Self {
        Self {
            imo_no: VesselId(imo_no.into()),
            name: name.into(),
            vessel_type_code,
            dwt,
        }
    }

    /// Deadweight to evaluate curves with, falling back to `default` when
    /// the vessel has none on record.
    pub fn deadweight_or(&self, default: Decimal) -> Decimal {
        self.dwt
            .filter(|dwt| *dwt > Decimal::ZERO)
            .unwrap_or(default)
    }
}

/// Emission quantities reported for one voyage leg.
///
/// Every field is already normalized: quantities missing upstream are zero.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EmissionQuantities {
    /// Main engine tank-to-wake CO2
    pub met_co2: f64,
    /// Auxiliary engine tank-to-wake CO2
    pub aet_co2: f64,
    /// Boiler tank-to-wake CO2
    pub bot_co2: f64,
    /// Other consumers tank-to-wake CO2
    pub vrt_co2: f64,
    /// Total tank-to-wake CO2 (mass based)
    pub tot_co2: f64,
    pub mew_co2e: f64,
    pub aew_co2e: f64,
    pub bow_co2e: f64,
    pub vrw_co2e: f64,
    /// Total well-to-wake CO2 equivalent
    pub tot_wco2e: f64,
    pub me_sox: f64,
    pub ae_sox: f64,
    pub bo_sox: f64,
    pub vr_sox: f64,
    pub tot_sox: f64,
    pub me_nox: f64,
    pub ae_nox: f64,
    pub tot_nox: f64,
    pub me_pm10: f64,
    pub ae_pm10: f64,
    pub tot_pm10: f64,
    /// Annual efficiency ratio, tank-to-wake CO2
    pub aer_co2_t2w: f64,
    /// Annual efficiency ratio, well-to-wake CO2e
    pub aer_co2e_w2w: f64,
    /// Energy efficiency operational indicator, well-to-wake CO2e
    pub eeoi_co2e_w2w: f64,
}

impl EmissionQuantities {
    pub fn with_total_co2(tot_co2: f64) -> Self {
        Self {
            tot_co2,
            ..Self::default()
        }
    }

    fn named(&self) -> [(&'static str, f64); 24] {
        [
            ("metCO2", self.met_co2),
            ("aetCO2", self.aet_co2),
            ("botCO2", self.bot_co2),
            ("vrtCO2", self.vrt_co2),
            ("totCO2", self.tot_co2),
            ("mewCO2e", self.mew_co2e),
            ("aewCO2e", self.aew_co2e),
            ("bowCO2e", self.bow_co2e),
            ("vrwCO2e", self.vrw_co2e),
            ("totWCO2e", self.tot_wco2e),
            ("mesOx", self.me_sox),
            ("aesOx", self.ae_sox),
            ("bosOx", self.bo_sox),
            ("vrsOx", self.vr_sox),
            ("totSOx", self.tot_sox),
            ("menOx", self.me_nox),
            ("aenOx", self.ae_nox),
            ("totNOx", self.tot_nox),
            ("mepm10", self.me_pm10),
            ("aepm10", self.ae_pm10),
            ("totPM10", self.tot_pm10),
            ("aerCO2T2W", self.aer_co2_t2w),
            ("aerCO2eW2W", self.aer_co2e_w2w),
            ("eeOICO2eW2W", self.eeoi_co2e_w2w),
        ]
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        match self
            .named()
            .into_iter()
            .find(|(_, value)| !value.is_finite() || *value < 0.0)
        {
            Some((field, value)) => Err(ValidationError::InvalidQuantity { field, value }),
            None => Ok(()),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct EmissionRecord {
    pub key: EmissionKey,
    pub from_utc: DateTime<Utc>,
    pub to_utc: DateTime<Utc>,
    pub quantities: EmissionQuantities,
}

impl EmissionRecord {
    /// Build a record, rejecting empty intervals and invalid quantities.
    pub fn new(
        key: EmissionKey,
        from_utc: DateTime<Utc>,
        to_utc: DateTime<Utc>,
        quantities: EmissionQuantities,
    ) -> Result<Self, ValidationError> {
        if to_utc <= from_utc {
            return Err(ValidationError::EmptyInterval {
                from: from_utc,
                to: to_utc,
            });
        }
        quantities.validate()?;
        Ok(Self {
            key,
            from_utc,
            to_utc,
            quantities,
        })
    }
}

/// One row of the regulatory reference dataset.
///
/// `a`..`e` parametrize the baseline curve; see [`crate::curve`] for how
/// each curve family interprets them.
#[derive(Clone, Debug, PartialEq)]
pub struct ReferenceCoefficientRow {
    pub row_id: i64,
    pub category: String,
    pub vessel_type_id: i32,
    pub size: String,
    pub trajectory: String,
    pub a: Decimal,
    pub b: Decimal,
    pub c: Decimal,
    pub d: Decimal,
    pub e: Decimal,
}

/// A vessel together with the emission records it owns.
#[derive(Clone, Debug, PartialEq)]
pub struct VesselEmissions {
    pub vessel: Vessel,
    pub records: Vec<EmissionRecord>,
}

/// Consistent, immutable view the engine computes over.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FleetSnapshot {
    pub vessels: Vec<VesselEmissions>,
    pub reference_rows: Vec<ReferenceCoefficientRow>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuarterlyDeviation {
    pub vessel_id: VesselId,
    pub vessel_name: String,
    #[serde(serialize_with = "serialize_quarter")]
    pub quarter: u8,
    pub year: i32,
    pub actual_emissions: f64,
    pub baseline: f64,
    /// Signed percentage deviation of actual from baseline.
    pub deviation: f64,
    #[serde(serialize_with = "serialize_timestamp")]
    pub date: DateTime<Utc>,
}

/// A vessel as listed to operators, with the deadweight its baselines use.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VesselSummary {
    pub imo_no: VesselId,
    pub name: String,
    pub vessel_type_code: i32,
    #[serde(with = "rust_decimal::serde::float")]
    pub dwt: Decimal,
    pub emission_record_count: usize,
}

impl VesselSummary {
    pub fn new(vessel: &Vessel, default_deadweight: Decimal, emission_record_count: usize) -> Self {
        Self {
            imo_no: vessel.imo_no.clone(),
            name: vessel.name.clone(),
            vessel_type_code: vessel.vessel_type_code,
            dwt: vessel.deadweight_or(default_deadweight),
            emission_record_count,
        }
    }
}

/// ISO-8601 rendering with millisecond precision and a `Z` suffix.
pub fn iso_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn serialize_timestamp<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&iso_timestamp(ts))
}

fn serialize_quarter<S: Serializer>(quarter: &u8, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format!("Q{quarter}"))
}
