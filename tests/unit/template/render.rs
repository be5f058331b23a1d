use super::*;
use crate::template::compile::compile_template;
use crate::template::model::{Template, TemplateConfig};
use serde_json::json;
use std::collections::BTreeMap;

fn compiled(body: &str) -> CompiledTemplate {
    let t = Template {
        id: "t".into(),
        config: TemplateConfig::new(body),
    };
    compile_template(&t, &BTreeMap::new()).unwrap()
}

fn path(s: &str) -> DataPath {
    DataPath::parse(s).unwrap()
}

#[test]
fn each_over_object_items() {
    let t = compiled("<g>{{#each items}}<r>{{name}}</r>{{/each}}</g>");
    assert_eq!(render(&t, &json!({ "items": [{ "name": "A" }] })), "<g><r>A</r></g>");
}

#[test]
fn lookup_falls_back_through_enclosing_items_to_root() {
    let t = compiled("{{#each sections}}{{#each items}}[{{name}}/{{title}}]{{/each}}{{/each}}");
    let data = json!({
        "title": "T",
        "sections": [{ "name": "S", "items": [{ "name": "i1" }, { "label": "x" }] }]
    });
    assert_eq!(render(&t, &data), "[i1/T][S/T]");
}

#[test]
fn this_and_index() {
    let t = compiled("{{#each tags}}{{@index}}={{this}};{{/each}}");
    assert_eq!(render(&t, &json!({ "tags": ["a", "b"] })), "0=a;1=b;");

    let t = compiled("{{#each rows}}{{this.v}}{{/each}}|{{@index}}");
    assert_eq!(
        render(&t, &json!({ "rows": [{ "v": 1 }, { "v": 2 }] })),
        "12|{{@index}}"
    );
}

#[test]
fn truthiness() {
    let t = compiled("{{#each v}}{{#if this}}T{{else}}F{{/if}}{{/each}}");
    let data = json!({ "v": [0, 1, "", "x", [], [0], {}, null, false, true] });
    assert_eq!(render(&t, &data), "FTFTFTTFFT");

    let t = compiled("{{#each v}}{{#if @index}},{{/if}}{{this}}{{/each}}");
    assert_eq!(render(&t, &json!({ "v": [1, 2, 3] })), "1,2,3");
}

#[test]
fn unresolved_placeholders_stay_verbatim() {
    let t = compiled("<t>{{missing.path}}</t>{{#if nope}}x{{/if}}{{#each none}}y{{/each}}");
    assert_eq!(render(&t, &json!({})), "<t>{{missing.path}}</t>");
}

#[test]
fn value_formatting() {
    let t = compiled("{{s}}|{{n}}|{{f}}|{{b}}|{{z}}|{{o}}");
    let data = json!({
        "s": "<b>&\"",
        "n": 42,
        "f": 1.5,
        "b": true,
        "z": null,
        "o": { "a": [1] }
    });
    assert_eq!(
        render(&t, &data),
        "&lt;b&gt;&amp;&quot;|42|1.5|true||{&quot;a&quot;:[1]}"
    );
}

#[test]
fn non_array_collections_render_nothing() {
    let t = compiled("[{{#each o}}x{{/each}}]");
    let tree = RenderTree::build(&t, &json!({ "o": { "a": 1 } }));
    assert_eq!(tree.to_markup(), "[]");
    let Rendered::Loop(l) = &tree.nodes[1] else {
        panic!("expected loop region");
    };
    assert_eq!(l.resolved, None);
    assert_eq!(l.deps, vec![path("o")]);
}

#[test]
fn regions_record_the_paths_they_read() {
    let t = compiled("{{#each items}}{{name}}{{/each}}");
    let tree = RenderTree::build(&t, &json!({ "items": [{ "name": "A" }, {}], "name": "R" }));
    assert_eq!(tree.to_markup(), "AR");
    assert_eq!(tree.region_count(), 3);

    let Rendered::Loop(l) = &tree.nodes[0] else {
        panic!("expected loop region");
    };
    assert_eq!(l.resolved, Some(path("items")));
    let Rendered::Slot(first) = &l.items[0][0] else {
        panic!("expected slot");
    };
    assert_eq!(first.deps, vec![path("items[0].name")]);
    let Rendered::Slot(second) = &l.items[1][0] else {
        panic!("expected slot");
    };
    assert_eq!(second.deps, vec![path("items[1].name"), path("name")]);
    assert_eq!(second.scope[0].index, 1);
}

#[test]
fn branch_records_taken_arm() {
    let t = compiled("{{#if show}}<a/>{{else}}<b/>{{/if}}");
    let tree = RenderTree::build(&t, &json!({ "show": 0 }));
    let Rendered::Branch(b) = &tree.nodes[0] else {
        panic!("expected branch");
    };
    assert!(!b.truthy);
    assert_eq!(tree.to_markup(), "<b/>");
}

#[test]
fn escape_markup_passes_plain_text() {
    assert_eq!(escape_markup("plain text"), "plain text");
    assert_eq!(escape_markup("a<b"), "a&lt;b");
}
