use super::*;
use crate::foundation::path::DataPath;
use crate::patch::plan::{AttributeChange, Target};
use serde_json::json;

fn p(s: &str) -> DataPath {
    DataPath::parse(s).unwrap()
}

fn width_update() -> Operation {
    Operation::UpdateAttribute {
        target: Target::Root {
            attribute: "width".into(),
        },
        path: p("width"),
        value: json!(800),
    }
}

fn add_item() -> Operation {
    Operation::AddElement {
        collection: p("items"),
        index: 1,
        value: json!({ "name": "B" }),
    }
}

fn rebuild() -> Operation {
    Operation::RebuildSection {
        target: Target::Path { path: p("a") },
        path: p("a"),
    }
}

#[test]
fn single_attribute_update_against_a_kilobyte() {
    let eff = EfficiencyPolicy::default().evaluate(&[width_update()], 1000);
    assert_eq!(eff.estimated_size, 60);
    assert_eq!(eff.operation_count, 1);
    assert!((eff.size_ratio - 0.06).abs() < 1e-12);
    assert!((eff.complexity - 0.1).abs() < 1e-12);
    assert_eq!(eff.decision, PatchDecision::Incremental);
}

#[test]
fn size_ratio_bound_is_exclusive() {
    let policy = EfficiencyPolicy::default();
    // 240 / 800 == 0.3
    assert_eq!(
        policy.evaluate(&[add_item()], 800).decision,
        PatchDecision::FullRebuild
    );
    assert_eq!(
        policy.evaluate(&[add_item()], 801).decision,
        PatchDecision::Incremental
    );
}

#[test]
fn operation_count_bound() {
    let ops = vec![width_update(); 20];
    let eff = EfficiencyPolicy::default().evaluate(&ops, 1_000_000);
    assert_eq!(eff.decision, PatchDecision::FullRebuild);
    let eff = EfficiencyPolicy::default().evaluate(&ops[..19], 1_000_000);
    assert_eq!(eff.decision, PatchDecision::Incremental);
}

#[test]
fn rebuilds_push_complexity_over_the_limit() {
    let eff = EfficiencyPolicy::default().evaluate(&[rebuild()], 1_000_000);
    assert_eq!(eff.complexity, 1.0);
    assert_eq!(eff.decision, PatchDecision::FullRebuild);

    // (1.0 + 0.1 + 0.1 + 0.1) / 4 = 0.325
    let ops = vec![rebuild(), width_update(), width_update(), width_update()];
    let eff = EfficiencyPolicy::default().evaluate(&ops, 1_000_000);
    assert!((eff.complexity - 0.325).abs() < 1e-12);
    assert_eq!(eff.decision, PatchDecision::Incremental);
}

#[test]
fn merged_updates_are_sized_per_attribute() {
    let merged = Operation::UpdateAttributes {
        target: Target::Item {
            collection: p("items"),
            index: 0,
        },
        changes: vec![
            AttributeChange {
                path: p("items[0].a"),
                value: json!(1),
            },
            AttributeChange {
                path: p("items[0].b"),
                value: json!(2),
            },
        ],
    };
    assert_eq!(estimate_size(&[merged]), 100);
}

#[test]
fn empty_output_always_rebuilds() {
    let eff = EfficiencyPolicy::default().evaluate(&[width_update()], 0);
    assert!(eff.size_ratio.is_infinite());
    assert_eq!(eff.decision, PatchDecision::FullRebuild);
}

#[test]
fn empty_patch_scores_zero() {
    assert_eq!(complexity_score(&[]), 0.0);
    assert_eq!(estimate_size(&[]), 0);
}

#[test]
fn custom_policy() {
    let strict = EfficiencyPolicy {
        max_size_ratio: 0.01,
        ..EfficiencyPolicy::default()
    };
    assert_eq!(
        strict.evaluate(&[width_update()], 1000).decision,
        PatchDecision::FullRebuild
    );
}
