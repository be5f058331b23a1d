use super::*;

#[test]
fn defaults() {
    let o = PipelineOpts::default();
    assert_eq!(o.max_cache_entries, 100);
    assert_eq!(o.max_data_entries, 100);
    assert_eq!(o.max_snapshots, 50);
    assert_eq!(o.max_patches, 100);
    assert_eq!(o.diff_max_depth, 256);
    assert_eq!(o.efficiency.max_size_ratio, 0.3);
    assert_eq!(o.efficiency.max_operations, 20);
    assert_eq!(o.efficiency.max_complexity, 0.7);
    assert!(o.templates.allow_overwrite);
}

#[test]
fn partial_json_keeps_other_defaults() {
    let o = PipelineOpts::from_reader(
        br#"{ "max_snapshots": 3, "efficiency": { "max_operations": 5 } }"#.as_slice(),
    )
    .unwrap();
    assert_eq!(o.max_snapshots, 3);
    assert_eq!(o.efficiency.max_operations, 5);
    assert_eq!(o.efficiency.max_size_ratio, 0.3);
    assert_eq!(o.max_cache_entries, 100);
}

#[test]
fn unknown_fields_are_rejected() {
    let err = PipelineOpts::from_reader(br#"{ "max_snapshot": 3 }"#.as_slice()).unwrap_err();
    assert!(matches!(err, ChartkitError::Serde(_)));
}

#[test]
fn impossible_thresholds_are_rejected() {
    let err = PipelineOpts::from_reader(br#"{ "efficiency": { "max_size_ratio": -1 } }"#.as_slice())
        .unwrap_err();
    assert!(matches!(err, ChartkitError::Validation(_)));
    let err = PipelineOpts::from_reader(br#"{ "diff_max_depth": 0 }"#.as_slice()).unwrap_err();
    assert!(matches!(err, ChartkitError::Validation(_)));
}

#[test]
fn missing_file_is_a_validation_error() {
    let err = PipelineOpts::from_path("/definitely/not/here.json").unwrap_err();
    assert!(matches!(err, ChartkitError::Validation(_)));
}
