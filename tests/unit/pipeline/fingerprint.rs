use super::*;
use serde_json::json;

#[test]
fn object_key_order_does_not_matter() {
    let a: Value = serde_json::from_str(r#"{"a":1,"b":{"x":[1,2],"y":null}}"#).unwrap();
    let b: Value = serde_json::from_str(r#"{"b":{"y":null,"x":[1,2]},"a":1}"#).unwrap();
    assert_eq!(fingerprint_value(&a), fingerprint_value(&b));
}

#[test]
fn distinguishes_structure() {
    let base = fingerprint_value(&json!({ "a": [1, 2] }));
    assert_ne!(base, fingerprint_value(&json!({ "a": [2, 1] })));
    assert_ne!(base, fingerprint_value(&json!({ "a": [[1, 2]] })));
    assert_ne!(base, fingerprint_value(&json!({ "b": [1, 2] })));
    assert_ne!(
        fingerprint_value(&json!("1")),
        fingerprint_value(&json!(1))
    );
    assert_ne!(
        fingerprint_value(&json!(["ab", "c"])),
        fingerprint_value(&json!(["a", "bc"]))
    );
}

#[test]
fn integer_and_float_spellings_hash_apart() {
    // They render as `400` and `400.0`.
    assert_ne!(
        fingerprint_value(&json!({ "w": 400 })),
        fingerprint_value(&json!({ "w": 400.0 }))
    );
    assert_eq!(
        fingerprint_value(&json!({ "w": 400.0 })),
        fingerprint_value(&serde_json::from_str::<Value>(r#"{"w":4e2}"#).unwrap())
    );
}

#[test]
fn large_integers_hash_exactly() {
    let a = fingerprint_value(&json!({ "id": 9_007_199_254_740_992_u64 }));
    let b = fingerprint_value(&json!({ "id": 9_007_199_254_740_993_u64 }));
    assert_ne!(a, b);
    assert_ne!(
        fingerprint_value(&json!(u64::MAX)),
        fingerprint_value(&json!(u64::MAX - 1))
    );
    assert_ne!(
        fingerprint_value(&json!(i64::MIN)),
        fingerprint_value(&json!(i64::MIN + 1))
    );
    assert_ne!(fingerprint_value(&json!(-1)), fingerprint_value(&json!(u64::MAX)));
}

#[test]
fn cache_keys_are_deterministic() {
    let data = json!({ "items": [{ "name": "A" }] });
    let k1 = CacheKey::new("list", "default", &data);
    let k2 = CacheKey::new("list", "default", &data.clone());
    assert_eq!(k1, k2);
    assert_ne!(k1, CacheKey::new("list", "dark", &data));
    assert_eq!(k1.snapshot_key(), CacheKey::new("list", "default", &json!({})).snapshot_key());
}

#[test]
fn template_revision_separates_keys_and_baselines() {
    let data = json!({ "x": 1 });
    let old = CacheKey::new("t", "default", &data).with_template_rev(1);
    let new = CacheKey::new("t", "default", &data).with_template_rev(2);
    assert_ne!(old, new);
    assert_ne!(old.snapshot_key(), new.snapshot_key());
    assert_eq!(
        new.snapshot_key(),
        CacheKey::new("t", "default", &json!({})).with_template_rev(2).snapshot_key()
    );
}

#[test]
fn display_forms() {
    let fp = Fingerprint { hi: 1, lo: 0xff };
    assert_eq!(fp.to_string(), "000000000000000100000000000000ff");
    let key = CacheKey {
        template_id: "t".into(),
        template_rev: 3,
        theme_id: "dark".into(),
        data_hash: fp,
    };
    assert_eq!(key.to_string(), format!("t@3:dark:{fp}"));
    assert_eq!(
        serde_json::to_value(&key).unwrap()["data_hash"],
        json!("000000000000000100000000000000ff")
    );
}
