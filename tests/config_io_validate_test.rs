use naiad::config::Config;
use std::fs;

fn configured() -> Config {
    let mut cfg = Config::default();
    cfg.portal.district = "Moulton Niguel Water District".to_string();
    cfg.portal.username = "resident@example.com".to_string();
    cfg.portal.password = "hunter2".to_string();
    cfg
}

#[test]
fn save_and_load_yaml_roundtrip() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let path = tmp_dir.path().join("config.yaml");

    let mut cfg = configured();
    cfg.timezone = "America/Denver".to_string();

    cfg.save_to_file(&path).unwrap();
    let loaded = Config::from_file(&path).unwrap();

    assert_eq!(loaded.portal.district, cfg.portal.district);
    assert_eq!(loaded.timezone, "America/Denver");
    assert_eq!(loaded.update.interval_hours, 6);
}

#[test]
fn config_validation_errors() {
    let mut cfg = configured();

    // Missing district
    cfg.portal.district.clear();
    assert!(cfg.validate().is_err());

    // Missing username
    cfg = configured();
    cfg.portal.username.clear();
    assert!(cfg.validate().is_err());

    // Invalid timezone
    cfg = configured();
    cfg.timezone = "Not/AZone".to_string();
    assert!(cfg.validate().is_err());

    // Zero interval
    cfg = configured();
    cfg.update.interval_hours = 0;
    assert!(cfg.validate().is_err());

    // Zero attempts
    cfg = configured();
    cfg.update.max_attempts = 0;
    assert!(cfg.validate().is_err());

    // Empty store path
    cfg = configured();
    cfg.store.path.clear();
    assert!(cfg.validate().is_err());
}

#[test]
fn from_file_with_invalid_yaml_fails() {
    let tmp = tempfile::NamedTempFile::new().unwrap();
    fs::write(tmp.path(), "portal: [not, a, mapping").unwrap();
    assert!(Config::from_file(tmp.path()).is_err());
}
