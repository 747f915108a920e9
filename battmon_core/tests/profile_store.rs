use battmon_core::{LearnedProfile, ProfileStore};
use rstest::rstest;

#[test]
fn missing_file_loads_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let store = ProfileStore::in_dir(dir.path());
    assert!(store.try_load(3400.0).unwrap().is_none());
    assert_eq!(store.load(3400.0), LearnedProfile::with_nominal(3400.0));
}

#[rstest]
#[case::garbage(b"not json at all".as_slice())]
#[case::truncated(br#"{"cycle_count": 3, "effective_"#.as_slice())]
#[case::wrong_type(br#"{"cycle_count": "three"}"#.as_slice())]
fn corrupt_file_loads_defaults(#[case] contents: &[u8]) {
    let dir = tempfile::tempdir().unwrap();
    let store = ProfileStore::in_dir(dir.path());
    std::fs::write(store.path(), contents).unwrap();
    assert!(store.try_load(3400.0).is_err());
    assert_eq!(store.load(3400.0), LearnedProfile::with_nominal(3400.0));
}

#[test]
fn save_then_load_keeps_every_field() {
    let dir = tempfile::tempdir().unwrap();
    let store = ProfileStore::in_dir(dir.path().join("nested"));
    let profile = LearnedProfile {
        effective_capacity_mah: 3187.123456789,
        cycle_count: 12,
        total_discharge_mah: 40211.5,
        avg_power_mw: 8123.25,
        typical_draw_ma: 910.0,
        last_full_charge_time: Some(1_760_000_000.25),
        capacity_samples: vec![3300.1, 3250.7, 3190.0],
        last_soc: Some(57.3),
        last_soc_time: Some(1_760_000_123.5),
    };
    store.save(&profile).unwrap();
    assert_eq!(store.load(3400.0), profile);
}

#[test]
fn saved_file_is_plain_json_object() {
    let dir = tempfile::tempdir().unwrap();
    let store = ProfileStore::in_dir(dir.path());
    store.save(&LearnedProfile::with_nominal(3400.0)).unwrap();
    let v: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(store.path()).unwrap()).unwrap();
    assert_eq!(v["effective_capacity_mah"], 3400.0);
    assert_eq!(v["cycle_count"], 0);
    assert!(v["last_soc"].is_null());
    assert!(v["capacity_samples"].as_array().unwrap().is_empty());
}
