use super::*;
use serde_json::json;

fn contract(decls: &[&str]) -> Vec<VarDecl> {
    decls.iter().map(|d| VarDecl::parse(d).unwrap()).collect()
}

#[test]
fn all_present_is_valid() {
    let res = validate_data(
        &contract(&["width", "theme.colors.primary", "sections[0].name"]),
        &json!({
            "width": 400,
            "theme": { "colors": { "primary": "#000" } },
            "sections": [{ "name": "a" }]
        }),
    );
    assert_eq!(
        res,
        ValidationResult {
            valid: true,
            missing: vec![],
        }
    );
}

#[test]
fn missing_paths_are_listed_in_declaration_order() {
    let res = validate_data(
        &contract(&["height", "width", "title.text"]),
        &json!({ "width": null, "title": "x" }),
    );
    assert!(!res.valid);
    assert_eq!(res.missing, vec!["height", "title.text"]);
}

#[test]
fn wildcard_needs_a_container_prefix() {
    let decls = contract(&["sections.*"]);
    assert!(validate_data(&decls, &json!({ "sections": [] })).valid);
    assert!(validate_data(&decls, &json!({ "sections": {} })).valid);

    let res = validate_data(&decls, &json!({ "sections": 3 }));
    assert_eq!(res.missing, vec!["sections.*"]);
    assert!(!validate_data(&decls, &json!({})).valid);
}
