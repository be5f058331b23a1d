use super::*;
use serde_json::json;

fn padded_list() -> TemplateConfig {
    let pad = "<!-- frame -->".repeat(80);
    TemplateConfig::new(format!(
        "<svg width=\"{{{{width}}}}\">{pad}{{{{#each items}}}}<text>{{{{name}}}}</text>{{{{/each}}}}</svg>"
    ))
    .with_variables(["width", "items"])
}

fn pipeline() -> ChartPipeline {
    let p = ChartPipeline::default();
    p.register_template("list", padded_list()).unwrap();
    p
}

#[test]
fn first_call_renders_in_full() {
    let p = pipeline();
    let out = p
        .generate_chart(&json!({ "width": 400, "items": [{ "name": "A" }] }), &GenerateOpts::new("list"))
        .unwrap();
    assert_eq!(out.metadata.render_path, RenderPath::Full);
    assert!(!out.metadata.cache_hit);
    assert!(out.output.starts_with("<svg width=\"400\">"));
    assert!(out.output.ends_with("<text>A</text></svg>"));
    assert!(out.metadata.missing_variables.is_empty());
}

#[test]
fn identical_call_hits_generation_cache() {
    let p = pipeline();
    let data = json!({ "width": 400, "items": [] });
    let first = p.generate_chart(&data, &GenerateOpts::new("list")).unwrap();
    let second = p.generate_chart(&data, &GenerateOpts::new("list")).unwrap();
    assert_eq!(second.metadata.render_path, RenderPath::CacheHit);
    assert!(second.metadata.cache_hit);
    assert_eq!(first.output, second.output);
    assert_eq!(first.metadata.cache_key, second.metadata.cache_key);

    let stats = p.get_stats();
    assert_eq!(stats.total_generations, 2);
    assert_eq!(stats.cache_hits, 1);
    assert_eq!(stats.full_rebuilds, 1);
}

#[test]
fn caching_disabled_reuses_unchanged_snapshot() {
    let p = pipeline();
    let data = json!({ "width": 400, "items": [] });
    let mut opts = GenerateOpts::new("list");
    opts.enable_caching = false;
    p.generate_chart(&data, &opts).unwrap();
    let out = p.generate_chart(&data, &opts).unwrap();
    assert_eq!(out.metadata.render_path, RenderPath::Unchanged);
    assert!(out.metadata.cache_hit);
}

#[test]
fn appended_item_is_patched() {
    let p = pipeline();
    let opts = GenerateOpts::new("list");
    p.generate_chart(&json!({ "width": 400, "items": [{ "name": "A" }] }), &opts)
        .unwrap();
    let next = json!({ "width": 400, "items": [{ "name": "A" }, { "name": "B" }] });
    let out = p.generate_chart(&next, &opts).unwrap();

    assert_eq!(out.metadata.render_path, RenderPath::Incremental);
    assert!(out.metadata.was_incremental);
    assert_eq!(out.metadata.operations, 1);
    assert!(out.metadata.patch_id.is_some());
    assert_eq!(&*out.output, p.render("list", &apply_theme_default(&next)).unwrap());
    assert_eq!(p.patch_history().len(), 1);
    assert_eq!(p.get_stats().incremental_updates, 1);
}

fn apply_theme_default(data: &Value) -> Value {
    ChartPipeline::default()
        .apply_to_data(data, None)
        .unwrap()
}

#[test]
fn incremental_disabled_always_renders_in_full() {
    let p = pipeline();
    let mut opts = GenerateOpts::new("list");
    opts.enable_incremental = false;
    p.generate_chart(&json!({ "width": 1, "items": [] }), &opts).unwrap();
    let out = p
        .generate_chart(&json!({ "width": 2, "items": [] }), &opts)
        .unwrap();
    assert_eq!(out.metadata.render_path, RenderPath::Full);
    assert_eq!(out.metadata.patch_id, None);
    assert!(p.patch_history().is_empty());
}

#[test]
fn small_prior_output_forces_full_rebuild() {
    let p = ChartPipeline::default();
    p.register_template("tiny", TemplateConfig::new("<b>{{width}}</b>"))
        .unwrap();
    let opts = GenerateOpts::new("tiny");
    p.generate_chart(&json!({ "width": 1 }), &opts).unwrap();
    let out = p.generate_chart(&json!({ "width": 2 }), &opts).unwrap();
    assert_eq!(out.metadata.render_path, RenderPath::Full);
    assert_eq!(&*out.output, "<b>2</b>");
    assert_eq!(out.metadata.operations, 1);
    assert_eq!(p.patch_history().len(), 1);
    assert_eq!(
        p.patch_history()[0].efficiency.decision,
        PatchDecision::FullRebuild
    );
}

#[test]
fn size_overrides_replace_data_fields() {
    let p = pipeline();
    let out = p
        .generate_chart(
            &json!({ "width": 10, "items": [] }),
            &GenerateOpts::new("list").with_size(640, 480),
        )
        .unwrap();
    assert!(out.output.starts_with("<svg width=\"640\">"));
}

#[test]
fn non_object_data_is_rejected() {
    let p = pipeline();
    let err = p
        .generate_chart(&json!([1, 2]), &GenerateOpts::new("list"))
        .unwrap_err();
    assert!(matches!(err, ChartkitError::Validation(_)));
}

#[test]
fn unknown_template_or_theme_is_not_found() {
    let p = pipeline();
    assert!(matches!(
        p.generate_chart(&json!({}), &GenerateOpts::new("nope")),
        Err(ChartkitError::NotFound(_))
    ));
    assert!(matches!(
        p.generate_chart(&json!({}), &GenerateOpts::new("list").with_theme("nope")),
        Err(ChartkitError::NotFound(_))
    ));
}

#[test]
fn missing_variables_are_reported_not_fatal() {
    let p = pipeline();
    let out = p
        .generate_chart(&json!({}), &GenerateOpts::new("list"))
        .unwrap();
    assert_eq!(out.metadata.missing_variables, vec!["width", "items"]);
    assert!(out.output.contains("{{width}}"));
}

#[test]
fn themes_key_separately() {
    let p = pipeline();
    let data = json!({ "width": 1, "items": [] });
    let light = p.generate_chart(&data, &GenerateOpts::new("list")).unwrap();
    let dark = p
        .generate_chart(&data, &GenerateOpts::new("list").with_theme("dark"))
        .unwrap();
    assert_ne!(light.metadata.cache_key, dark.metadata.cache_key);
    assert_eq!(dark.metadata.cache_key.theme_id, "dark");
    assert_eq!(dark.metadata.render_path, RenderPath::Full);
    assert_eq!(p.snapshots().len(), 2);
}

#[test]
fn custom_theme_gets_content_derived_id() {
    let p = pipeline();
    assert!(p.theme_ids().contains(&"dark".to_owned()));
    let theme = Theme {
        id: "ignored".into(),
        ..crate::theme::builtin::dark_theme()
    };
    let data = json!({ "width": 1, "items": [] });
    let a = p
        .generate_chart(&data, &GenerateOpts::new("list").with_custom_theme(theme.clone()))
        .unwrap();
    let b = p
        .generate_chart(
            &data,
            &GenerateOpts::new("list").with_custom_theme(Theme {
                id: "other".into(),
                ..theme
            }),
        )
        .unwrap();
    assert!(a.metadata.cache_key.theme_id.starts_with("custom-"));
    assert_eq!(a.metadata.cache_key, b.metadata.cache_key);
    assert_eq!(b.metadata.render_path, RenderPath::CacheHit);
}

#[test]
fn invalid_custom_theme_is_rejected() {
    let p = pipeline();
    let mut theme = crate::theme::builtin::default_theme();
    theme.colors.insert("primary".into(), json!("not-a-color"));
    let err = p
        .generate_chart(
            &json!({ "items": [] }),
            &GenerateOpts::new("list").with_custom_theme(theme),
        )
        .unwrap_err();
    assert!(matches!(err, ChartkitError::InvalidTheme { .. }));
}

#[test]
fn clear_cache_drops_outputs_and_history() {
    let p = pipeline();
    let data = json!({ "width": 1, "items": [] });
    p.generate_chart(&data, &GenerateOpts::new("list")).unwrap();
    p.clear_cache();
    assert!(p.snapshots().is_empty());
    let out = p.generate_chart(&data, &GenerateOpts::new("list")).unwrap();
    assert_eq!(out.metadata.render_path, RenderPath::Full);
    assert_eq!(p.get_stats().total_generations, 2);
}

#[test]
fn quality_hint_is_passed_through() {
    let p = pipeline();
    let mut opts = GenerateOpts::new("list");
    opts.quality = Some("high".into());
    let out = p
        .generate_chart(&json!({ "items": [] }), &opts)
        .unwrap();
    assert_eq!(out.metadata.quality.as_deref(), Some("high"));
}

#[test]
fn batch_results_follow_request_order() {
    let p = pipeline();
    let requests: Vec<(Value, GenerateOpts)> = (0..8)
        .map(|i| (json!({ "width": i, "items": [] }), GenerateOpts::new("list")))
        .collect();
    let results = p.generate_batch(&requests);
    assert_eq!(results.len(), 8);
    for (i, r) in results.into_iter().enumerate() {
        let out = r.unwrap();
        assert!(out.output.starts_with(&format!("<svg width=\"{i}\">")));
    }
    assert_eq!(p.get_stats().total_generations, 8);
}

#[test]
fn stats_accumulator_counts_paths() {
    let mut acc = StatsAccumulator::default();
    let meta = |path, coalesced, elapsed_ms| ChartMetadata {
        cache_key: CacheKey::new("t", "default", &json!({})),
        cache_hit: false,
        was_incremental: false,
        coalesced,
        render_path: path,
        changes: 0,
        operations: 0,
        patch_id: None,
        apply_failures: Vec::new(),
        missing_variables: Vec::new(),
        quality: None,
        elapsed_ms,
    };
    acc.record(&meta(RenderPath::Full, false, 4.0));
    acc.record(&meta(RenderPath::Incremental, false, 1.0));
    acc.record(&meta(RenderPath::Unchanged, false, 1.0));
    acc.record(&meta(RenderPath::Full, true, 2.0));
    let s = acc.stats;
    assert_eq!(s.total_generations, 4);
    assert_eq!(s.full_rebuilds, 1);
    assert_eq!(s.incremental_updates, 1);
    assert_eq!(s.cache_hits, 1);
    assert_eq!(s.coalesced, 1);
    assert!((s.average_time_ms - 2.0).abs() < 1e-9);
}

#[test]
fn registered_theme_is_selectable_and_activatable() {
    let p = pipeline();
    let mut theme = crate::theme::builtin::default_theme();
    theme.name = "Brand".into();
    theme.colors.insert("primary".into(), json!("#ff8800"));
    p.register_theme("brand", theme).unwrap();
    assert_eq!(
        p.theme_variables("brand").unwrap()["colors.primary"],
        json!("#ff8800")
    );

    let data = json!({ "width": 1, "items": [] });
    let named = p
        .generate_chart(&data, &GenerateOpts::new("list").with_theme("brand"))
        .unwrap();
    p.set_active_theme("brand").unwrap();
    assert_eq!(p.active_theme().as_deref(), Some("brand"));
    let active = p.generate_chart(&data, &GenerateOpts::new("list")).unwrap();
    assert_eq!(named.metadata.cache_key, active.metadata.cache_key);
    assert_eq!(active.metadata.render_path, RenderPath::CacheHit);
}

#[test]
fn overwritten_template_is_never_served_from_cache_or_patched() {
    let p = pipeline();
    let opts = GenerateOpts::new("list");
    let data = json!({ "width": 1, "items": [{ "name": "A" }] });
    let before = p.generate_chart(&data, &opts).unwrap();

    p.register_template(
        "list",
        TemplateConfig::new("<ul>{{#each items}}<li>{{name}}</li>{{/each}}</ul>"),
    )
    .unwrap();
    let same = p.generate_chart(&data, &opts).unwrap();
    assert_eq!(same.metadata.render_path, RenderPath::Full);
    assert_ne!(same.metadata.cache_key, before.metadata.cache_key);
    assert_eq!(&*same.output, "<ul><li>A</li></ul>");

    let next = json!({ "width": 1, "items": [{ "name": "A" }, { "name": "B" }] });
    let changed = p.generate_chart(&next, &opts).unwrap();
    assert_eq!(&*changed.output, p.render("list", &apply_theme_default(&next)).unwrap());
    assert!(changed.output.starts_with("<ul>"));
}

#[test]
fn shared_partial_change_invalidates_dependent_outputs() {
    let p = ChartPipeline::default();
    p.register_partial("row", "<r>{{name}}</r>").unwrap();
    p.register_template("rows", TemplateConfig::new("<g>{{#each items}}{{> row}}{{/each}}</g>"))
        .unwrap();
    let opts = GenerateOpts::new("rows");
    let data = json!({ "items": [{ "name": "1" }] });
    assert_eq!(&*p.generate_chart(&data, &opts).unwrap().output, "<g><r>1</r></g>");

    p.register_partial("row", "<q>{{name}}</q>").unwrap();
    let out = p.generate_chart(&data, &opts).unwrap();
    assert_eq!(out.metadata.render_path, RenderPath::Full);
    assert_eq!(&*out.output, "<g><q>1</q></g>");
}

#[test]
fn integers_beyond_f64_precision_key_apart() {
    let p = ChartPipeline::default();
    p.register_template("id", TemplateConfig::new("<a>{{id}}</a>")).unwrap();
    let opts = GenerateOpts::new("id");
    let a = p
        .generate_chart(&json!({ "id": 9_007_199_254_740_992_u64 }), &opts)
        .unwrap();
    let b = p
        .generate_chart(&json!({ "id": 9_007_199_254_740_993_u64 }), &opts)
        .unwrap();
    assert_ne!(a.metadata.cache_key, b.metadata.cache_key);
    assert_ne!(b.metadata.render_path, RenderPath::CacheHit);
    assert_eq!(&*b.output, "<a>9007199254740993</a>");
}

#[test]
fn opts_are_kept_as_given() {
    let opts = PipelineOpts {
        max_snapshots: 2,
        ..PipelineOpts::default()
    };
    let p = ChartPipeline::new(opts.clone());
    assert_eq!(p.opts(), &opts);
}
