use crate::foundation::error::{ChartkitError, ChartkitResult};
use crate::foundation::path::DataPath;
use crate::template::model::Template;
use crate::template::parse::{BlockTag, Node, normalize_whitespace, parse_template};
use std::collections::BTreeMap;
use std::sync::Arc;

/// One entry of a template's declared variable contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct VarDecl {
    pub(crate) path: DataPath,
    /// Declared as `prefix.*`: only the prefix has to exist.
    pub(crate) wildcard: bool,
}

impl VarDecl {
    pub(crate) fn parse(src: &str) -> ChartkitResult<Self> {
        let src = src.trim();
        let (path, wildcard) = match src.strip_suffix(".*") {
            Some(prefix) => (prefix, true),
            None => (src, false),
        };
        if path.is_empty() {
            return Err(ChartkitError::registration(format!(
                "declared variable '{src}' has an empty path"
            )));
        }
        let path = DataPath::parse(path).map_err(|e| {
            ChartkitError::registration(format!("declared variable '{src}': {e}"))
        })?;
        Ok(Self { path, wildcard })
    }
}

/// A template with all partials inlined, ready to render.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct CompiledTemplate {
    pub(crate) id: String,
    pub(crate) nodes: Arc<[Node]>,
    pub(crate) contract: Vec<VarDecl>,
    /// Registry compile stamp; `0` outside a registry.
    pub(crate) revision: u64,
}

struct PartialSource<'a> {
    local: &'a BTreeMap<String, String>,
    shared: &'a BTreeMap<String, String>,
}

impl PartialSource<'_> {
    fn body(&self, name: &str) -> Option<&str> {
        self.local
            .get(name)
            .or_else(|| self.shared.get(name))
            .map(String::as_str)
    }
}

/// Normalize, parse and inline partials. Unknown partials and partial cycles are registration
/// errors; malformed markup is a template error.
pub(crate) fn compile_template(
    template: &Template,
    shared_partials: &BTreeMap<String, String>,
) -> ChartkitResult<CompiledTemplate> {
    let contract = template
        .config
        .variables
        .iter()
        .map(|v| VarDecl::parse(v))
        .collect::<ChartkitResult<Vec<_>>>()?;

    let src = PartialSource {
        local: &template.config.partials,
        shared: shared_partials,
    };
    let parsed = parse_template(&normalize_whitespace(&template.config.body)).map_err(|e| {
        ChartkitError::template(format!("template '{}': {}", template.id, strip_kind(&e)))
    })?;
    let mut stack = Vec::new();
    let inlined = inline(&parsed, &src, &mut stack)?;

    let mut next = 0u32;
    let nodes = number_blocks(&inlined, &mut next);
    tracing::debug!(template = %template.id, blocks = next, "compiled template");

    Ok(CompiledTemplate {
        id: template.id.clone(),
        nodes: Arc::from(nodes),
        contract,
        revision: 0,
    })
}

fn strip_kind(e: &ChartkitError) -> String {
    match e {
        ChartkitError::Template(msg) => msg.clone(),
        other => other.to_string(),
    }
}

fn inline(
    nodes: &[Node],
    src: &PartialSource<'_>,
    stack: &mut Vec<String>,
) -> ChartkitResult<Vec<Node>> {
    let mut out = Vec::with_capacity(nodes.len());
    for node in nodes {
        match node {
            Node::Partial { name } => {
                if stack.iter().any(|n| n == name) {
                    return Err(ChartkitError::registration(format!(
                        "partial cycle: {} -> {name}",
                        stack.join(" -> ")
                    )));
                }
                let body = src.body(name).ok_or_else(|| {
                    ChartkitError::registration(format!("unknown partial reference '{name}'"))
                })?;
                let parsed = parse_template(&normalize_whitespace(body)).map_err(|e| {
                    ChartkitError::template(format!("partial '{name}': {}", strip_kind(&e)))
                })?;
                stack.push(name.clone());
                let expanded = inline(&parsed, src, stack)?;
                stack.pop();
                out.extend(expanded);
            }
            Node::If {
                tag,
                cond,
                then,
                otherwise,
            } => out.push(Node::If {
                tag: tag.clone(),
                cond: cond.clone(),
                then: Arc::from(inline(then, src, stack)?),
                otherwise: Arc::from(inline(otherwise, src, stack)?),
            }),
            Node::Each {
                tag,
                collection,
                body,
            } => out.push(Node::Each {
                tag: tag.clone(),
                collection: collection.clone(),
                body: Arc::from(inline(body, src, stack)?),
            }),
            other => out.push(other.clone()),
        }
    }
    Ok(out)
}

/// Block ids restart in every parsed partial; renumber once everything is inlined.
fn number_blocks(nodes: &[Node], next: &mut u32) -> Vec<Node> {
    fn retag(tag: &BlockTag, next: &mut u32) -> BlockTag {
        let id = *next;
        *next += 1;
        BlockTag {
            id,
            key: Arc::clone(&tag.key),
        }
    }

    nodes
        .iter()
        .map(|node| match node {
            Node::If {
                tag,
                cond,
                then,
                otherwise,
            } => {
                let tag = retag(tag, next);
                Node::If {
                    tag,
                    cond: cond.clone(),
                    then: Arc::from(number_blocks(then, next)),
                    otherwise: Arc::from(number_blocks(otherwise, next)),
                }
            }
            Node::Each {
                tag,
                collection,
                body,
            } => {
                let tag = retag(tag, next);
                Node::Each {
                    tag,
                    collection: collection.clone(),
                    body: Arc::from(number_blocks(body, next)),
                }
            }
            other => other.clone(),
        })
        .collect()
}

#[cfg(test)]
#[path = "../../tests/unit/template/compile.rs"]
mod tests;
