use crate::foundation::path::{DataPath, PathSeg};
use crate::patch::plan::Operation;
use crate::template::render::{
    BranchRegion, LoopRegion, RenderCtx, RenderTree, Rendered, Scope, SlotRegion,
};
use serde::Serialize;
use serde_json::Value;

/// A patch operation that could not be applied to the prior render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplyFailure {
    /// Position of the operation in the patch.
    pub operation: usize,
    /// [`Operation::describe`] of the failed operation.
    pub target: String,
    /// Why it failed.
    pub reason: String,
}

/// Result of applying a patch. Failed operations are skipped; the rest still apply.
#[derive(Debug, Clone)]
pub(crate) struct ApplyOutcome {
    pub(crate) tree: RenderTree,
    pub(crate) applied: usize,
    pub(crate) failures: Vec<ApplyFailure>,
}

#[derive(Debug, Clone, Copy)]
enum Action<'p> {
    /// Re-resolve whatever reads `path`; blocks are re-rendered only when their outcome flips.
    Refresh(&'p DataPath),
    /// Re-render whatever reads `path` in full.
    Rebuild(&'p DataPath),
    Add {
        collection: &'p DataPath,
        index: usize,
    },
    Remove {
        collection: &'p DataPath,
        index: usize,
    },
}

/// Rebuilds top-down, then tail removals from the back, then refreshes, then appends in order.
fn phase(op: &Operation) -> (u8, i64) {
    match op {
        Operation::RebuildSection { path, .. } => (0, path.len() as i64),
        Operation::RemoveElement { index, .. } => (1, -(*index as i64)),
        Operation::UpdateAttribute { .. }
        | Operation::AddAttribute { .. }
        | Operation::RemoveAttribute { .. }
        | Operation::UpdateAttributes { .. } => (2, 0),
        Operation::AddElement { index, .. } => (3, *index as i64),
    }
}

/// Apply `operations` to a copy of `tree`, re-rendering only the regions that read a changed
/// path. `data` is the new data tree.
#[tracing::instrument(skip(tree, data, operations), fields(ops = operations.len()))]
pub(crate) fn apply_patch(tree: &RenderTree, data: &Value, operations: &[Operation]) -> ApplyOutcome {
    let mut out = tree.clone();
    out.epoch = tree.epoch + 1;
    let applier = Applier {
        ctx: RenderCtx {
            data,
            epoch: out.epoch,
        },
    };

    let mut order: Vec<usize> = (0..operations.len()).collect();
    order.sort_by_key(|&i| phase(&operations[i]));

    let mut applied = 0usize;
    let mut failures = Vec::new();
    for i in order {
        let op = &operations[i];
        let paths = op.paths();
        let actions: Vec<Action<'_>> = match op {
            Operation::RebuildSection { path, .. } => vec![Action::Rebuild(path)],
            Operation::AddElement {
                collection, index, ..
            } => vec![Action::Add {
                collection,
                index: *index,
            }],
            Operation::RemoveElement { collection, index } => vec![Action::Remove {
                collection,
                index: *index,
            }],
            _ => paths.iter().map(Action::Refresh).collect(),
        };

        let mut errors = Vec::new();
        for action in actions {
            applier.visit(&mut out.nodes, action, &mut errors);
        }
        if errors.is_empty() {
            applied += 1;
        } else {
            tracing::debug!(op = %op.describe(), errors = ?errors, "operation not applied");
            failures.push(ApplyFailure {
                operation: i,
                target: op.describe(),
                reason: errors.join("; "),
            });
        }
    }

    ApplyOutcome {
        tree: out,
        applied,
        failures,
    }
}

struct Applier<'a> {
    ctx: RenderCtx<'a>,
}

impl Action<'_> {
    /// The data path this action changes.
    fn path(&self) -> DataPath {
        match self {
            Self::Refresh(p) | Self::Rebuild(p) => (*p).clone(),
            Self::Add { collection, index } | Self::Remove { collection, index } => {
                collection.index(*index)
            }
        }
    }
}

fn touches(deps: &[DataPath], path: &DataPath) -> bool {
    deps.iter().any(|d| d.is_related(path))
}

/// Index of the item of `collection` that `path` lies inside, when `path` is strictly below it.
fn item_below(collection: &DataPath, path: &DataPath) -> Option<usize> {
    if !path.starts_with(collection) {
        return None;
    }
    match path.segments().get(collection.len()) {
        Some(PathSeg::Index(i)) => Some(*i),
        _ => None,
    }
}

impl Applier<'_> {
    fn fresh(&self, epoch: u64) -> bool {
        epoch == self.ctx.epoch
    }

    fn check_scope(&self, scope: &Scope, errors: &mut Vec<String>) -> bool {
        match scope.iter().find(|f| f.path.lookup(self.ctx.data).is_none()) {
            Some(frame) => {
                errors.push(format!("stale scope: {} no longer exists", frame.path));
                false
            }
            None => true,
        }
    }

    fn visit(&self, nodes: &mut [Rendered], action: Action<'_>, errors: &mut Vec<String>) {
        let path = action.path();
        for node in nodes.iter_mut() {
            match node {
                Rendered::Text(_) => {}
                Rendered::Slot(slot) => self.slot(slot, &path, errors),
                Rendered::Branch(branch) => self.branch(branch, action, &path, errors),
                Rendered::Loop(region) => self.each(region, action, &path, errors),
            }
        }
    }

    fn slot(&self, slot: &mut SlotRegion, path: &DataPath, errors: &mut Vec<String>) {
        if self.fresh(slot.epoch) || !touches(&slot.deps, path) {
            return;
        }
        if self.check_scope(&slot.scope, errors) {
            *slot = self.ctx.slot(&slot.expr, &slot.raw, &slot.scope);
        }
    }

    fn branch(
        &self,
        branch: &mut BranchRegion,
        action: Action<'_>,
        path: &DataPath,
        errors: &mut Vec<String>,
    ) {
        if self.fresh(branch.epoch) {
            return;
        }
        if touches(&branch.deps, path) {
            if !self.check_scope(&branch.scope, errors) {
                return;
            }
            let (truthy, _) = self.ctx.truthy(&branch.cond, &branch.scope);
            if matches!(action, Action::Rebuild(_)) || truthy != branch.truthy {
                tracing::trace!(block = branch.tag.id, key = %branch.tag.key, "re-rendered branch");
                *branch = self.ctx.branch(
                    &branch.tag,
                    &branch.cond,
                    &branch.then,
                    &branch.otherwise,
                    &branch.scope,
                );
                return;
            }
        }
        self.visit(&mut branch.children, action, errors);
    }

    fn each(
        &self,
        region: &mut LoopRegion,
        action: Action<'_>,
        path: &DataPath,
        errors: &mut Vec<String>,
    ) {
        if self.fresh(region.epoch) {
            return;
        }

        if let Some(coll) = region.resolved.clone()
            && let Some(i) = item_below(&coll, path)
        {
            self.each_item(region, &coll, i, action, path, errors);
            return;
        }

        if touches(&region.deps, path) {
            if self.check_scope(&region.scope, errors) {
                tracing::trace!(block = region.tag.id, key = %region.tag.key, "re-rendered loop");
                *region = self.ctx.each(&region.tag, &region.collection, &region.body, &region.scope);
            }
            return;
        }

        for item in &mut region.items {
            self.visit(item, action, errors);
        }
    }

    /// `path` lies inside item `i` of the loop's collection `coll`.
    fn each_item(
        &self,
        region: &mut LoopRegion,
        coll: &DataPath,
        i: usize,
        action: Action<'_>,
        path: &DataPath,
        errors: &mut Vec<String>,
    ) {
        let len = region.items.len();
        match action {
            Action::Add { collection, index } if collection == coll => {
                if len != index {
                    errors.push(format!(
                        "cannot add {coll}[{index}]: rendered loop has {len} items"
                    ));
                    return;
                }
                if self.check_scope(&region.scope, errors) {
                    let item = self.ctx.item(&region.body, &region.scope, coll, index);
                    region.items.push(item);
                }
            }
            Action::Remove { collection, index } if collection == coll => {
                if index + 1 != len {
                    errors.push(format!(
                        "cannot remove {coll}[{index}]: rendered loop has {len} items"
                    ));
                    return;
                }
                region.items.pop();
            }
            Action::Rebuild(_) if path.len() == coll.len() + 1 => {
                if i >= len {
                    errors.push(format!("cannot rebuild {path}: rendered loop has {len} items"));
                    return;
                }
                if self.check_scope(&region.scope, errors) {
                    region.items[i] = self.ctx.item(&region.body, &region.scope, coll, i);
                }
            }
            _ => {
                if let Some(item) = region.items.get_mut(i) {
                    self.visit(item, action, errors);
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/patch/apply.rs"]
mod tests;
