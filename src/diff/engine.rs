use crate::diff::change::{ChangeKind, ChangeRecord};
use crate::diff::impact::ImpactClassifier;
use crate::foundation::path::DataPath;
use serde_json::{Number, Value};
use std::collections::BTreeSet;

/// Default nesting limit for [`DiffEngine`].
pub const DEFAULT_DIFF_MAX_DEPTH: usize = 256;

/// Structural differ over JSON data trees.
///
/// Arrays are compared positionally: an insertion at the head shows up as a change at every
/// following index plus one added item at the tail. Subtrees nested deeper than `max_depth` are
/// not walked; if they differ they are reported as a single `StructureChange`.
#[derive(Debug, Clone)]
pub struct DiffEngine {
    classifier: ImpactClassifier,
    max_depth: usize,
}

impl Default for DiffEngine {
    fn default() -> Self {
        Self::new(ImpactClassifier::default(), DEFAULT_DIFF_MAX_DEPTH)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Category {
    Str,
    Num,
    Bool,
    /// `null`, arrays and objects.
    Object,
}

fn category(v: &Value) -> Category {
    match v {
        Value::String(_) => Category::Str,
        Value::Number(_) => Category::Num,
        Value::Bool(_) => Category::Bool,
        Value::Null | Value::Array(_) | Value::Object(_) => Category::Object,
    }
}

/// Integers compare exactly; an integer never equals a float, since `1` and `1.0` render apart.
fn numbers_equal(a: &Number, b: &Number) -> bool {
    match (a.is_f64(), b.is_f64()) {
        (false, false) => a == b,
        (true, true) => a.as_f64().map(f64::to_bits) == b.as_f64().map(f64::to_bits),
        _ => false,
    }
}

impl DiffEngine {
    /// Engine with an explicit classifier and depth limit.
    pub fn new(classifier: ImpactClassifier, max_depth: usize) -> Self {
        Self {
            classifier,
            max_depth,
        }
    }

    /// Change-set turning `old` into `new`. Empty when the trees are equal.
    pub fn diff(&self, old: &Value, new: &Value) -> Vec<ChangeRecord> {
        let mut out = Vec::new();
        self.walk(&DataPath::root(), old, new, 0, &mut out);
        tracing::trace!(changes = out.len(), "diff complete");
        out
    }

    fn record(
        &self,
        out: &mut Vec<ChangeRecord>,
        path: &DataPath,
        kind: ChangeKind,
        old_value: Option<Value>,
        new_value: Option<Value>,
    ) {
        out.push(ChangeRecord {
            path: path.clone(),
            kind,
            old_value,
            new_value,
            impact: self.classifier.classify(path),
        });
    }

    fn walk(
        &self,
        path: &DataPath,
        old: &Value,
        new: &Value,
        depth: usize,
        out: &mut Vec<ChangeRecord>,
    ) {
        if category(old) != category(new) {
            self.record(
                out,
                path,
                ChangeKind::TypeChange,
                Some(old.clone()),
                Some(new.clone()),
            );
            return;
        }

        match (old, new) {
            (Value::String(a), Value::String(b)) if a == b => {}
            (Value::Bool(a), Value::Bool(b)) if a == b => {}
            (Value::Number(a), Value::Number(b)) if numbers_equal(a, b) => {}
            (Value::String(_), _) | (Value::Bool(_), _) | (Value::Number(_), _) => {
                self.record(
                    out,
                    path,
                    ChangeKind::ValueChange,
                    Some(old.clone()),
                    Some(new.clone()),
                );
            }
            (Value::Null, Value::Null) => {}
            _ if depth >= self.max_depth => {
                if old != new {
                    tracing::warn!(path = %path, depth, "diff depth limit reached");
                    self.record(
                        out,
                        path,
                        ChangeKind::StructureChange,
                        Some(old.clone()),
                        Some(new.clone()),
                    );
                }
            }
            (Value::Array(a), Value::Array(b)) => self.walk_array(path, a, b, depth, out),
            (Value::Object(a), Value::Object(b)) => {
                let keys: BTreeSet<&String> = a.keys().chain(b.keys()).collect();
                for key in keys {
                    let child = path.key(key.as_str());
                    match (a.get(key), b.get(key)) {
                        (Some(o), Some(n)) => self.walk(&child, o, n, depth + 1, out),
                        (Some(o), None) => self.record(
                            out,
                            &child,
                            ChangeKind::PropertyRemoved,
                            Some(o.clone()),
                            None,
                        ),
                        (None, Some(n)) => self.record(
                            out,
                            &child,
                            ChangeKind::PropertyAdded,
                            None,
                            Some(n.clone()),
                        ),
                        (None, None) => {}
                    }
                }
            }
            _ => self.record(
                out,
                path,
                ChangeKind::StructureChange,
                Some(old.clone()),
                Some(new.clone()),
            ),
        }
    }

    fn walk_array(
        &self,
        path: &DataPath,
        old: &[Value],
        new: &[Value],
        depth: usize,
        out: &mut Vec<ChangeRecord>,
    ) {
        for i in 0..old.len().max(new.len()) {
            let child = path.index(i);
            match (old.get(i), new.get(i)) {
                (Some(o), Some(n)) => self.walk(&child, o, n, depth + 1, out),
                (Some(o), None) => self.record(
                    out,
                    &child,
                    ChangeKind::ArrayItemRemoved,
                    Some(o.clone()),
                    None,
                ),
                (None, Some(n)) => self.record(
                    out,
                    &child,
                    ChangeKind::ArrayItemAdded,
                    None,
                    Some(n.clone()),
                ),
                (None, None) => {}
            }
        }
        if old.len() != new.len() {
            self.record(
                out,
                path,
                ChangeKind::ArrayLengthChange,
                Some(Value::from(old.len())),
                Some(Value::from(new.len())),
            );
        }
    }
}

/// Diff with the default engine.
pub fn diff(old: &Value, new: &Value) -> Vec<ChangeRecord> {
    DiffEngine::default().diff(old, new)
}

#[cfg(test)]
#[path = "../../tests/unit/diff/engine.rs"]
mod tests;
