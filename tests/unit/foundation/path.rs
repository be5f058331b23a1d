use super::*;
use serde_json::json;

fn p(s: &str) -> DataPath {
    DataPath::parse(s).unwrap()
}

#[test]
fn parse_and_display_round_trip_common_forms() {
    for src in ["", "width", "theme.colors.primary", "sections[0].items[2].name", "[1].x"] {
        assert_eq!(p(src).to_string(), src);
    }
    assert_eq!(
        p("items[3]").segments(),
        &[PathSeg::Key("items".into()), PathSeg::Index(3)]
    );
}

#[test]
fn parse_rejects_malformed_paths() {
    assert!(DataPath::parse("a..b").is_err());
    assert!(DataPath::parse("a.").is_err());
    assert!(DataPath::parse("a[x]").is_err());
    assert!(DataPath::parse("a[1").is_err());
    assert!(DataPath::parse("a]").is_err());
    assert!(DataPath::parse("a[0]b").is_err());
}

#[test]
fn prefix_tests_are_segment_aware() {
    assert!(p("width.unit").starts_with(&p("width")));
    assert!(!p("widthUnit").starts_with(&p("width")));
    assert!(p("items[1].name").starts_with(&p("items[1]")));
    assert!(p("anything").starts_with(&DataPath::root()));
    assert!(p("items").is_related(&p("items[0].name")));
    assert!(!p("items[0]").is_related(&p("items[1]")));
}

#[test]
fn index_splitting() {
    assert_eq!(p("items[4]").split_index(), Some((p("items"), 4)));
    assert_eq!(p("items[4].name").split_index(), None);
    assert_eq!(
        p("sections[0].items[2].name").deepest_index(),
        Some((p("sections[0].items"), 2))
    );
    assert_eq!(p("width").deepest_index(), None);
}

#[test]
fn lookup_walks_objects_and_arrays() {
    let data = json!({"sections": [{"items": [{"name": "A"}, {"name": "B"}]}], "w": 3});
    assert_eq!(p("sections[0].items[1].name").lookup(&data), Some(&json!("B")));
    assert_eq!(p("w").lookup(&data), Some(&json!(3)));
    assert_eq!(p("w.x").lookup(&data), None);
    assert_eq!(p("sections[4]").lookup(&data), None);
    assert_eq!(DataPath::root().lookup(&data), Some(&data));
}

#[test]
fn serializes_as_string() {
    let v = serde_json::to_value(p("a.b[2]")).unwrap();
    assert_eq!(v, json!("a.b[2]"));
    let back: DataPath = serde_json::from_value(v).unwrap();
    assert_eq!(back, p("a.b[2]"));
}
