use crate::foundation::path::DataPath;
use crate::template::compile::CompiledTemplate;
use crate::template::parse::{BlockTag, Expr, Node};
use serde_json::Value;
use smallvec::SmallVec;
use std::sync::Arc;

/// One enclosing `#each` iteration: absolute path of the item and its position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ScopeFrame {
    pub(crate) path: DataPath,
    pub(crate) index: usize,
}

pub(crate) type Scope = SmallVec<[ScopeFrame; 4]>;

/// A rendered `{{expr}}` placeholder.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SlotRegion {
    pub(crate) expr: Expr,
    pub(crate) raw: Arc<str>,
    pub(crate) scope: Scope,
    pub(crate) deps: Vec<DataPath>,
    pub(crate) epoch: u64,
    pub(crate) text: String,
}

/// A rendered `#if` block; `children` is whichever arm was taken.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct BranchRegion {
    pub(crate) tag: BlockTag,
    pub(crate) cond: Expr,
    pub(crate) then: Arc<[Node]>,
    pub(crate) otherwise: Arc<[Node]>,
    pub(crate) scope: Scope,
    pub(crate) deps: Vec<DataPath>,
    pub(crate) epoch: u64,
    pub(crate) truthy: bool,
    pub(crate) children: Vec<Rendered>,
}

/// A rendered `#each` block with one child list per array item.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct LoopRegion {
    pub(crate) tag: BlockTag,
    pub(crate) collection: Expr,
    pub(crate) body: Arc<[Node]>,
    pub(crate) scope: Scope,
    pub(crate) deps: Vec<DataPath>,
    pub(crate) epoch: u64,
    /// Absolute path of the iterated array; `None` when the collection did not resolve to one.
    pub(crate) resolved: Option<DataPath>,
    pub(crate) items: Vec<Vec<Rendered>>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Rendered {
    Text(Arc<str>),
    Slot(SlotRegion),
    Branch(BranchRegion),
    Loop(LoopRegion),
}

/// Structural summary of a full render: literal text plus every data-bound region and the data
/// paths it read.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct RenderTree {
    pub(crate) nodes: Vec<Rendered>,
    pub(crate) epoch: u64,
}

impl RenderTree {
    pub(crate) fn build(compiled: &CompiledTemplate, data: &Value) -> Self {
        let ctx = RenderCtx { data, epoch: 0 };
        let mut nodes = Vec::new();
        ctx.nodes(&compiled.nodes, &Scope::new(), &mut nodes);
        Self { nodes, epoch: 0 }
    }

    pub(crate) fn to_markup(&self) -> String {
        let mut out = String::new();
        write_nodes(&self.nodes, &mut out);
        out
    }

    /// Number of data-bound regions, nested ones included.
    pub(crate) fn region_count(&self) -> usize {
        fn count(nodes: &[Rendered]) -> usize {
            nodes
                .iter()
                .map(|n| match n {
                    Rendered::Text(_) => 0,
                    Rendered::Slot(_) => 1,
                    Rendered::Branch(b) => 1 + count(&b.children),
                    Rendered::Loop(l) => 1 + l.items.iter().map(|i| count(i)).sum::<usize>(),
                })
                .sum()
        }
        count(&self.nodes)
    }
}

fn write_nodes(nodes: &[Rendered], out: &mut String) {
    for node in nodes {
        match node {
            Rendered::Text(t) => out.push_str(t),
            Rendered::Slot(s) => out.push_str(&s.text),
            Rendered::Branch(b) => write_nodes(&b.children, out),
            Rendered::Loop(l) => {
                for item in &l.items {
                    write_nodes(item, out);
                }
            }
        }
    }
}

/// Render a compiled template straight to markup.
pub(crate) fn render(compiled: &CompiledTemplate, data: &Value) -> String {
    RenderTree::build(compiled, data).to_markup()
}

pub(crate) enum Lookup<'a> {
    Value { value: &'a Value, path: DataPath },
    Index(usize),
    Missing,
}

/// Rendering state shared by full renders and region re-renders during patch application.
pub(crate) struct RenderCtx<'a> {
    pub(crate) data: &'a Value,
    pub(crate) epoch: u64,
}

impl<'a> RenderCtx<'a> {
    /// Resolve `expr` in `scope`. The returned deps are every path consulted, up to and including
    /// the one that resolved.
    pub(crate) fn resolve(&self, expr: &Expr, scope: &Scope) -> (Lookup<'a>, Vec<DataPath>) {
        match expr {
            Expr::Index => match scope.last() {
                Some(frame) => (Lookup::Index(frame.index), Vec::new()),
                None => (Lookup::Missing, Vec::new()),
            },
            Expr::This(rest) => {
                let path = match scope.last() {
                    Some(frame) => frame.path.join(rest),
                    None => rest.clone(),
                };
                let lookup = match path.lookup(self.data) {
                    Some(value) => Lookup::Value {
                        value,
                        path: path.clone(),
                    },
                    None => Lookup::Missing,
                };
                (lookup, vec![path])
            }
            Expr::Path(rel) => {
                let candidates = scope
                    .iter()
                    .rev()
                    .map(|frame| frame.path.join(rel))
                    .chain(std::iter::once(rel.clone()));
                let mut deps = Vec::new();
                for path in candidates {
                    deps.push(path.clone());
                    if let Some(value) = path.lookup(self.data) {
                        return (Lookup::Value { value, path }, deps);
                    }
                }
                (Lookup::Missing, deps)
            }
        }
    }

    pub(crate) fn nodes(&self, nodes: &[Node], scope: &Scope, out: &mut Vec<Rendered>) {
        for node in nodes {
            match node {
                Node::Text(t) => out.push(Rendered::Text(Arc::clone(t))),
                Node::Var { expr, raw } => out.push(Rendered::Slot(self.slot(expr, raw, scope))),
                Node::If {
                    tag,
                    cond,
                    then,
                    otherwise,
                } => out.push(Rendered::Branch(
                    self.branch(tag, cond, then, otherwise, scope),
                )),
                Node::Each {
                    tag,
                    collection,
                    body,
                } => out.push(Rendered::Loop(self.each(tag, collection, body, scope))),
                // Inlined at compile time.
                Node::Partial { .. } => {}
            }
        }
    }

    pub(crate) fn slot(&self, expr: &Expr, raw: &Arc<str>, scope: &Scope) -> SlotRegion {
        let (lookup, deps) = self.resolve(expr, scope);
        let text = match lookup {
            Lookup::Value { value, .. } => value_text(value),
            Lookup::Index(i) => i.to_string(),
            Lookup::Missing => raw.to_string(),
        };
        SlotRegion {
            expr: expr.clone(),
            raw: Arc::clone(raw),
            scope: scope.clone(),
            deps,
            epoch: self.epoch,
            text,
        }
    }

    pub(crate) fn truthy(&self, cond: &Expr, scope: &Scope) -> (bool, Vec<DataPath>) {
        let (lookup, deps) = self.resolve(cond, scope);
        let truthy = match lookup {
            Lookup::Value { value, .. } => is_truthy(value),
            Lookup::Index(i) => i != 0,
            Lookup::Missing => false,
        };
        (truthy, deps)
    }

    pub(crate) fn branch(
        &self,
        tag: &BlockTag,
        cond: &Expr,
        then: &Arc<[Node]>,
        otherwise: &Arc<[Node]>,
        scope: &Scope,
    ) -> BranchRegion {
        let (truthy, deps) = self.truthy(cond, scope);
        let mut children = Vec::new();
        self.nodes(if truthy { then } else { otherwise }, scope, &mut children);
        BranchRegion {
            tag: tag.clone(),
            cond: cond.clone(),
            then: Arc::clone(then),
            otherwise: Arc::clone(otherwise),
            scope: scope.clone(),
            deps,
            epoch: self.epoch,
            truthy,
            children,
        }
    }

    pub(crate) fn each(
        &self,
        tag: &BlockTag,
        collection: &Expr,
        body: &Arc<[Node]>,
        scope: &Scope,
    ) -> LoopRegion {
        let (lookup, deps) = self.resolve(collection, scope);
        let (resolved, items) = match lookup {
            Lookup::Value {
                value: Value::Array(values),
                path,
            } => {
                let items = (0..values.len())
                    .map(|i| self.item(body, scope, &path, i))
                    .collect();
                (Some(path), items)
            }
            _ => (None, Vec::new()),
        };
        LoopRegion {
            tag: tag.clone(),
            collection: collection.clone(),
            body: Arc::clone(body),
            scope: scope.clone(),
            deps,
            epoch: self.epoch,
            resolved,
            items,
        }
    }

    /// Render one iteration of a loop body over `collection[index]`.
    pub(crate) fn item(
        &self,
        body: &[Node],
        scope: &Scope,
        collection: &DataPath,
        index: usize,
    ) -> Vec<Rendered> {
        let mut inner = scope.clone();
        inner.push(ScopeFrame {
            path: collection.index(index),
            index,
        });
        let mut out = Vec::new();
        self.nodes(body, &inner, &mut out);
        out
    }
}

/// Text form of a resolved value. Strings are markup-escaped, `null` is empty, containers are
/// compact JSON.
pub(crate) fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => escape_markup(s),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => escape_markup(&value.to_string()),
    }
}

pub(crate) fn escape_markup(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
    out
}

/// `null`, `false`, `0`, `""` and `[]` are falsy; objects are always truthy.
pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(_) => true,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/template/render.rs"]
mod tests;
