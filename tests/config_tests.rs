use chart_sync::config::{MinBarsTable, SyncConfig};
use chart_sync::data_types::SamplingPeriod;
use std::time::Duration;

#[test]
fn test_defaults() {
    let config = SyncConfig::default();
    assert_eq!(config.range_request_timeout(), Duration::from_secs(1));
    assert_eq!(config.pan_threshold_px, 6.0);
    assert_eq!(config.default_visible_bars, 200);
    assert_eq!(config.min_bars_for(SamplingPeriod::M1), 30);
    assert_eq!(config.min_bars_for(SamplingPeriod::H1), 15);
    assert_eq!(config.min_bars_for(SamplingPeriod::W1), 8);
    assert!(config.validate().is_ok());
}

#[test]
fn test_partial_json_keeps_defaults() {
    let config = SyncConfig::from_json_str(r#"{ "pan_threshold_px": 10.0 }"#).unwrap();
    assert_eq!(config.pan_threshold_px, 10.0);
    assert_eq!(config.range_request_timeout_ms, 1000);
    assert_eq!(config.min_bars, MinBarsTable::default());
}

#[test]
fn test_min_bars_table_from_json() {
    let json = r#"{ "min_bars": { "1m": 50, "1d": 0 } }"#;
    let config = SyncConfig::from_json_str(json).unwrap();
    assert_eq!(config.min_bars_for(SamplingPeriod::M1), 50);
    // Zero is raised to one bar.
    assert_eq!(config.min_bars_for(SamplingPeriod::D1), 1);
    // Periods left out of a custom table use the fallback.
    assert_eq!(config.min_bars_for(SamplingPeriod::H4), MinBarsTable::FALLBACK);
}

#[test]
fn test_invalid_config_is_rejected() {
    assert!(SyncConfig::from_json_str(r#"{ "wheel_sensitivity": 0.0 }"#).is_err());
    assert!(SyncConfig::from_json_str(r#"{ "default_visible_bars": 0 }"#).is_err());
    assert!(SyncConfig::from_json_str(r#"{ "min_bars": { "7m": 3 } }"#).is_err());
    assert!(SyncConfig::from_json_str("not json").is_err());
}

#[test]
fn test_load_from_file() {
    let path = std::env::temp_dir().join(format!("chart_sync_config_{}.json", std::process::id()));
    std::fs::write(&path, r#"{ "range_request_timeout_ms": 250 }"#).unwrap();
    let config = SyncConfig::load(&path).unwrap();
    std::fs::remove_file(&path).unwrap();
    assert_eq!(config.range_request_timeout(), Duration::from_millis(250));

    let missing = SyncConfig::load(path.with_extension("missing"));
    assert!(missing.is_err());
}

#[test]
fn test_period_parsing() {
    assert_eq!("15m".parse::<SamplingPeriod>().unwrap(), SamplingPeriod::M15);
    assert_eq!(SamplingPeriod::D1.to_string(), "1d");
    assert!("2d".parse::<SamplingPeriod>().is_err());
    assert_eq!(SamplingPeriod::H4.as_secs(), 4 * 3600);
}
