use std::fs;
use std::sync::Arc;

use emissions_compute::{
    import_from_dir, CollectingObserver, EmissionStore, Engine, EngineConfig, InMemoryStore,
    VesselId,
};

const VESSELS: &str = r#"[
    {"IMONo": 9321483, "Name": "Nordic Star", "VesselType": 7, "DWT": 80000},
    {"IMONo": 9456123, "Name": "Baltic Dawn", "VesselType": 7, "DWT": 0},
    {"IMONo": 9000001, "Name": "Aurora", "VesselType": 5}
]"#;

const REFERENCE: &str = r#"[
    {"RowID": 1, "Category": "PP", "VesselTypeID": 7, "Size": "60000-99999", "Traj": "min",
     "a": 100, "b": 0, "c": 0, "d": 0, "e": 2023},
    {"RowID": 2, "Category": "PP", "VesselTypeID": 7, "Size": "60000-99999", "Traj": "max",
     "a": 110, "b": 0, "c": 0, "d": 0, "e": 2023},
    {"RowID": 3, "Category": "EEDI", "VesselTypeID": 5, "Size": "all", "Traj": "min",
     "a": 50, "b": 0, "c": 0, "d": 0, "e": 2023}
]"#;

const EMISSIONS: &str = r#"[
    {"EID": 1, "LOGID": 1, "VesselID": 9321483, "FromUTC": "2023-03-04T00:00:00Z",
     "TOUTC": "2023-03-05T00:00:00Z", "TotT2WCO2": 95},
    {"EID": 2, "LOGID": 1, "VesselID": 9321483, "FromUTC": "2023-03-27T00:00:00Z",
     "TOUTC": "2023-03-28T00:00:00Z", "TotT2WCO2": 120},
    {"EID": 3, "LOGID": 1, "VesselID": 9456123, "FromUTC": "2023-02-01 00:00:00",
     "TOUTC": "2023-02-02 00:00:00", "TotT2WCO2": 90},
    {"EID": 4, "LOGID": 1, "VesselID": 9456123, "FromUTC": "2023-07-09",
     "TOUTC": "2023-07-10", "TotT2WCO2": 105},
    {"EID": 5, "LOGID": 1, "VesselID": 9000001, "FromUTC": "2023-07-09",
     "TOUTC": "2023-07-10", "TotT2WCO2": 40},
    {"EID": 6, "LOGID": 1, "VesselID": 9321483, "FromUTC": "not a date",
     "TOUTC": "2023-07-10", "TotT2WCO2": 40}
]"#;

fn load_store(observer: &CollectingObserver) -> InMemoryStore {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("vessels.json"), VESSELS).unwrap();
    fs::write(dir.path().join("pp-reference.json"), REFERENCE).unwrap();
    fs::write(dir.path().join("daily-log-emissions.json"), EMISSIONS).unwrap();

    let mut store = InMemoryStore::new();
    let summary = import_from_dir(&mut store, dir.path(), observer).unwrap();
    assert_eq!(summary.vessels.imported, 3);
    assert_eq!(summary.reference_rows.imported, 3);
    assert_eq!(summary.emissions.imported, 5);
    assert_eq!(summary.emissions.skipped, 1);
    store
}

#[test]
fn test_quarterly_report_from_source_files() {
    let observer = Arc::new(CollectingObserver::new());
    let store = load_store(&observer);
    let snapshot = store.snapshot().unwrap();

    let engine = Engine::with_observer(EngineConfig::default(), Arc::clone(&observer)).unwrap();
    let deviations = engine.quarterly_deviations(&snapshot);

    let rows: Vec<(&str, String, f64)> = deviations
        .iter()
        .map(|d| (d.vessel_id.0.as_str(), format!("{}-Q{}", d.year, d.quarter), d.deviation))
        .collect();
    assert_eq!(
        rows,
        vec![
            ("9456123", "2023-Q1".to_string(), -10.0),
            ("9321483", "2023-Q1".to_string(), 20.0),
            ("9456123", "2023-Q3".to_string(), 5.0),
        ]
    );
    assert_eq!(observer.skipped_vessels(), vec![VesselId::from("9000001")]);

    let report = serde_json::to_value(&deviations).unwrap();
    assert_eq!(report[1]["vesselName"], "Nordic Star");
    assert_eq!(report[1]["quarter"], "Q1");
    assert_eq!(report[1]["actualEmissions"], 120.0);
    assert_eq!(report[1]["baseline"], 100.0);
    assert_eq!(report[1]["date"], "2023-03-28T00:00:00.000Z");
}

#[test]
fn test_vessel_summary_from_source_files() {
    let observer = CollectingObserver::new();
    let store = load_store(&observer);
    let snapshot = store.snapshot().unwrap();

    let engine = Engine::from_config(EngineConfig::default()).unwrap();
    let summary = serde_json::to_value(engine.vessel_summaries(&snapshot)).unwrap();

    assert_eq!(summary[0]["imoNo"], "9000001");
    assert_eq!(summary[0]["emissionRecordCount"], 1);
    assert_eq!(summary[2]["imoNo"], "9456123");
    assert_eq!(summary[2]["dwt"], 50000.0);
    assert_eq!(summary[2]["emissionRecordCount"], 2);
}

#[test]
fn test_configured_report() {
    let observer = CollectingObserver::new();
    let store = load_store(&observer);
    let snapshot = store.snapshot().unwrap();

    let config = EngineConfig::from_toml_str(
        r#"
        reference_category = "EEDI"

        [curve]
        kind = "expression"
        expression = "a * 2"
        "#,
    )
    .unwrap();
    let engine = Engine::from_config(config).unwrap();
    let deviations = engine.quarterly_deviations(&snapshot);

    assert_eq!(deviations.len(), 1);
    assert_eq!(deviations[0].vessel_id, VesselId::from("9000001"));
    assert_eq!(deviations[0].baseline, 100.0);
    assert_eq!(deviations[0].deviation, -60.0);
}
