use crate::diff::change::{ChangeKind, ChangeRecord};
use crate::patch::efficiency::EfficiencyPolicy;
use crate::patch::plan::{AttributeChange, Operation, Patch, Target};
use crate::patch::target::TargetResolver;
use crate::pipeline::fingerprint::CacheKey;
use crate::pipeline::history::Snapshot;
use serde_json::Value;

/// Turns change-sets into optimized, scored patches.
#[derive(Debug, Clone, Default)]
pub(crate) struct PatchBuilder {
    resolver: TargetResolver,
    policy: EfficiencyPolicy,
}

fn is_scalar(v: Option<&Value>) -> bool {
    matches!(
        v,
        Some(Value::String(_) | Value::Number(_) | Value::Bool(_))
    )
}

impl PatchBuilder {
    pub(crate) fn new(policy: EfficiencyPolicy) -> Self {
        Self {
            resolver: TargetResolver::default(),
            policy,
        }
    }

    /// Build the patch that turns `prior`'s output into the render of the changed data.
    pub(crate) fn build_patch(
        &self,
        id: u64,
        cache_key: CacheKey,
        changes: Vec<ChangeRecord>,
        prior: &Snapshot,
    ) -> Patch {
        let mut ops: Vec<(u8, Operation)> = changes
            .iter()
            .filter_map(|c| self.operation(c).map(|op| (c.impact.priority(), op)))
            .collect();
        ops.sort_by_key(|(priority, _)| *priority);

        let operations = optimize(ops.into_iter().map(|(_, op)| op).collect());
        let efficiency = self.policy.evaluate(&operations, prior.output.len());
        tracing::debug!(
            patch = id,
            changes = changes.len(),
            operations = operations.len(),
            estimated_size = efficiency.estimated_size,
            decision = ?efficiency.decision,
            "built patch"
        );
        Patch {
            id,
            cache_key,
            changes,
            operations,
            efficiency,
        }
    }

    fn operation(&self, change: &ChangeRecord) -> Option<Operation> {
        let path = change.path.clone();
        let rebuild = || Operation::RebuildSection {
            target: self.resolver.resolve(&change.path),
            path: change.path.clone(),
        };
        let op = match change.kind {
            ChangeKind::ValueChange => Operation::UpdateAttribute {
                target: self.resolver.resolve(&path),
                value: change.new_value.clone().unwrap_or(Value::Null),
                path,
            },
            ChangeKind::PropertyAdded => Operation::AddAttribute {
                target: self.resolver.resolve(&path),
                value: change.new_value.clone().unwrap_or(Value::Null),
                path,
            },
            ChangeKind::PropertyRemoved => Operation::RemoveAttribute {
                target: self.resolver.resolve(&path),
                path,
            },
            ChangeKind::TypeChange
                if is_scalar(change.old_value.as_ref()) && is_scalar(change.new_value.as_ref()) =>
            {
                Operation::UpdateAttribute {
                    target: self.resolver.resolve(&path),
                    value: change.new_value.clone().unwrap_or(Value::Null),
                    path,
                }
            }
            ChangeKind::TypeChange | ChangeKind::StructureChange => rebuild(),
            ChangeKind::ArrayItemAdded => match path.split_index() {
                Some((collection, index)) => Operation::AddElement {
                    collection,
                    index,
                    value: change.new_value.clone().unwrap_or(Value::Null),
                },
                None => rebuild(),
            },
            ChangeKind::ArrayItemRemoved => match path.split_index() {
                Some((collection, index)) => Operation::RemoveElement { collection, index },
                None => rebuild(),
            },
            // Covered by the per-item records.
            ChangeKind::ArrayLengthChange => return None,
        };
        Some(op)
    }
}

/// Merge same-target updates, drop exact duplicates and anything inside a rebuilt subtree.
/// Input order (priority order) is preserved.
pub(crate) fn optimize(ops: Vec<Operation>) -> Vec<Operation> {
    let merged = merge_updates(ops);

    let mut unique: Vec<Operation> = Vec::with_capacity(merged.len());
    for op in merged {
        if !unique.contains(&op) {
            unique.push(op);
        }
    }

    let rebuilt: Vec<_> = unique
        .iter()
        .filter_map(|op| match op {
            Operation::RebuildSection { path, .. } => Some(path.clone()),
            _ => None,
        })
        .collect();
    unique
        .into_iter()
        .filter(|op| {
            let paths = op.paths();
            let own_rebuild = match op {
                Operation::RebuildSection { path, .. } => Some(path),
                _ => None,
            };
            !paths.iter().all(|p| {
                rebuilt
                    .iter()
                    .any(|r| Some(r) != own_rebuild && p.starts_with(r))
            })
        })
        .collect()
}

fn merge_updates(ops: Vec<Operation>) -> Vec<Operation> {
    let mut out: Vec<Operation> = Vec::with_capacity(ops.len());
    for op in ops {
        let Operation::UpdateAttribute {
            target,
            path,
            value,
        } = op
        else {
            out.push(op);
            continue;
        };
        let existing = out.iter_mut().find(|o| match o {
            Operation::UpdateAttribute { target: t, .. }
            | Operation::UpdateAttributes { target: t, .. } => *t == target,
            _ => false,
        });
        match existing {
            Some(slot) => fold_into(slot, AttributeChange { path, value }),
            None => out.push(Operation::UpdateAttribute {
                target,
                path,
                value,
            }),
        }
    }
    out
}

fn fold_into(slot: &mut Operation, change: AttributeChange) {
    let placeholder = Operation::UpdateAttributes {
        target: Target::Path {
            path: change.path.clone(),
        },
        changes: Vec::new(),
    };
    *slot = match std::mem::replace(slot, placeholder) {
        Operation::UpdateAttribute {
            target,
            path,
            value,
        } => {
            if path == change.path && value == change.value {
                Operation::UpdateAttribute {
                    target,
                    path,
                    value,
                }
            } else {
                Operation::UpdateAttributes {
                    target,
                    changes: vec![AttributeChange { path, value }, change],
                }
            }
        }
        Operation::UpdateAttributes {
            target,
            mut changes,
        } => {
            if !changes.contains(&change) {
                changes.push(change);
            }
            Operation::UpdateAttributes { target, changes }
        }
        other => other,
    };
}

#[cfg(test)]
#[path = "../../tests/unit/patch/builder.rs"]
mod tests;
