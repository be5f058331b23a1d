use serde::{Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use xxhash_rust::xxh3::Xxh3;

const XXH3_SEED: u64 = 0x63_68_61_72_74_6b_69_74;

/// 128-bit stable content hash.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint {
    /// High 64 bits.
    pub hi: u64,
    /// Low 64 bits.
    pub lo: u64,
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}{:016x}", self.hi, self.lo)
    }
}

impl Serialize for Fingerprint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Generation cache key: identical `(template, theme, data)` inputs always produce equal keys.
///
/// The template revision changes whenever the registry recompiles the id, so outputs rendered
/// from a replaced body are never served again.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct CacheKey {
    /// Template id.
    pub template_id: String,
    /// Registry revision of the compiled template.
    pub template_rev: u64,
    /// Theme id (`custom-<hash>` for per-call themes).
    pub theme_id: String,
    /// Hash of the themed data tree.
    pub data_hash: Fingerprint,
}

impl CacheKey {
    /// Key for `data` rendered with `template_id` and `theme_id`, at template revision `0`.
    pub fn new(template_id: &str, theme_id: &str, data: &Value) -> Self {
        Self {
            template_id: template_id.to_owned(),
            template_rev: 0,
            theme_id: theme_id.to_owned(),
            data_hash: fingerprint_value(data),
        }
    }

    /// Same key at template revision `rev`.
    pub fn with_template_rev(mut self, rev: u64) -> Self {
        self.template_rev = rev;
        self
    }

    /// Key under which the diff baseline for this key's template/theme pair is kept.
    pub(crate) fn snapshot_key(&self) -> SnapshotKey {
        SnapshotKey {
            template_id: self.template_id.clone(),
            template_rev: self.template_rev,
            theme_id: self.theme_id.clone(),
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}@{}:{}:{}",
            self.template_id, self.template_rev, self.theme_id, self.data_hash
        )
    }
}

/// Template/theme pair a snapshot belongs to; data changes between renders of the same pair are
/// what incremental updates diff. A recompiled template starts without a baseline.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct SnapshotKey {
    pub(crate) template_id: String,
    pub(crate) template_rev: u64,
    pub(crate) theme_id: String,
}

/// Hash a JSON tree. Object keys are visited in sorted order, so key order never matters.
pub fn fingerprint_value(v: &Value) -> Fingerprint {
    let mut h = StableHasher::new();
    write_json_value(&mut h, v);
    h.finish()
}

fn write_json_value(h: &mut StableHasher, v: &Value) {
    match v {
        Value::Null => h.write_u8(0),
        Value::Bool(x) => {
            h.write_u8(1);
            h.write_u8(u8::from(*x));
        }
        // Integers hash exactly and apart from floats: `1` and `1.0` render differently.
        Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                h.write_u8(2);
                h.write_u64(u);
            } else if let Some(i) = n.as_i64() {
                h.write_u8(6);
                h.write_bytes(&i.to_le_bytes());
            } else if let Some(f) = n.as_f64() {
                h.write_u8(7);
                h.write_u64(f.to_bits());
            } else {
                h.write_u8(8);
                h.write_str(&n.to_string());
            }
        }
        Value::String(s) => {
            h.write_u8(3);
            h.write_str(s);
        }
        Value::Array(items) => {
            h.write_u8(4);
            h.write_u64(items.len() as u64);
            for item in items {
                write_json_value(h, item);
            }
        }
        Value::Object(map) => {
            h.write_u8(5);
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            h.write_u64(keys.len() as u64);
            for k in keys {
                h.write_str(k);
                write_json_value(h, &map[k]);
            }
        }
    }
}

struct StableHasher {
    inner: Xxh3,
}

impl StableHasher {
    fn new() -> Self {
        Self {
            inner: Xxh3::with_seed(XXH3_SEED),
        }
    }

    fn write_bytes(&mut self, b: &[u8]) {
        self.inner.update(b);
    }

    fn write_u8(&mut self, v: u8) {
        self.write_bytes(&[v]);
    }

    fn write_u64(&mut self, v: u64) {
        self.write_bytes(&v.to_le_bytes());
    }

    fn write_str(&mut self, s: &str) {
        self.write_u64(s.len() as u64);
        self.write_bytes(s.as_bytes());
    }

    fn finish(self) -> Fingerprint {
        let v = self.inner.digest128();
        Fingerprint {
            hi: (v >> 64) as u64,
            lo: v as u64,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/fingerprint.rs"]
mod tests;
