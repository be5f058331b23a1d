use crate::foundation::error::{ChartkitError, ChartkitResult};
use crate::foundation::path::DataPath;
use std::sync::Arc;

/// What a placeholder or block header refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Expr {
    /// `this` or `this.rest`: relative to the innermost loop item (the root outside loops).
    This(DataPath),
    /// `@index` of the innermost loop.
    Index,
    /// Plain path, looked up in the loop items from innermost out, then in the root.
    Path(DataPath),
}

impl Expr {
    pub(crate) fn parse(src: &str) -> Option<Self> {
        let src = src.trim();
        let allowed = |c: char| c.is_alphanumeric() || matches!(c, '_' | '-' | '$' | '@' | '.' | '[' | ']');
        if src.is_empty() || !src.chars().all(allowed) {
            return None;
        }
        if src == "@index" {
            return Some(Self::Index);
        }
        if src == "this" {
            return Some(Self::This(DataPath::root()));
        }
        if let Some(rest) = src.strip_prefix("this.") {
            return DataPath::parse(rest).ok().map(Self::This);
        }
        if src.starts_with("this[") {
            return DataPath::parse(&src[4..]).ok().map(Self::This);
        }
        if src.starts_with('@') {
            return None;
        }
        DataPath::parse(src).ok().map(Self::Path)
    }
}

/// Block header tag, keyed by its expression text so nested and sibling blocks over the same
/// name stay distinguishable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct BlockTag {
    pub(crate) id: u32,
    pub(crate) key: Arc<str>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Node {
    Text(Arc<str>),
    Var {
        expr: Expr,
        /// Original placeholder text, emitted verbatim when the expression does not resolve.
        raw: Arc<str>,
    },
    If {
        tag: BlockTag,
        cond: Expr,
        then: Arc<[Node]>,
        otherwise: Arc<[Node]>,
    },
    Each {
        tag: BlockTag,
        collection: Expr,
        body: Arc<[Node]>,
    },
    Partial {
        name: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
enum Tag {
    Var(Expr),
    IfOpen(Expr, String),
    EachOpen(Expr, String),
    Else,
    CloseIf,
    CloseEach,
    Partial(String),
}

fn classify(inner: &str, offset: usize) -> ChartkitResult<Option<Tag>> {
    let t = inner.trim();
    if let Some(rest) = t.strip_prefix("#if") {
        if !rest.starts_with(char::is_whitespace) {
            return Ok(None);
        }
        let expr = Expr::parse(rest).ok_or_else(|| {
            ChartkitError::template(format!("invalid #if condition '{}' at byte {offset}", rest.trim()))
        })?;
        return Ok(Some(Tag::IfOpen(expr, rest.trim().to_owned())));
    }
    if let Some(rest) = t.strip_prefix("#each") {
        if !rest.starts_with(char::is_whitespace) {
            return Ok(None);
        }
        let expr = Expr::parse(rest).ok_or_else(|| {
            ChartkitError::template(format!(
                "invalid #each collection '{}' at byte {offset}",
                rest.trim()
            ))
        })?;
        return Ok(Some(Tag::EachOpen(expr, rest.trim().to_owned())));
    }
    match t {
        "else" => return Ok(Some(Tag::Else)),
        "/if" => return Ok(Some(Tag::CloseIf)),
        "/each" => return Ok(Some(Tag::CloseEach)),
        _ => {}
    }
    if let Some(name) = t.strip_prefix('>') {
        let name = name.trim();
        if name.is_empty() {
            return Err(ChartkitError::template(format!(
                "partial reference without a name at byte {offset}"
            )));
        }
        return Ok(Some(Tag::Partial(name.to_owned())));
    }
    Ok(Expr::parse(t).map(Tag::Var))
}

enum Frame {
    If {
        tag: BlockTag,
        cond: Expr,
        then: Option<Vec<Node>>,
        open_at: usize,
    },
    Each {
        tag: BlockTag,
        collection: Expr,
        open_at: usize,
    },
}

impl Frame {
    fn describe(&self) -> String {
        match self {
            Self::If { tag, .. } => format!("#if {}", tag.key),
            Self::Each { tag, .. } => format!("#each {}", tag.key),
        }
    }
}

/// Collapse whitespace: runs containing a newline between markup boundaries (`>`/`}}` then
/// `<`/`{{`) are removed, every other run becomes a single space; ends are trimmed.
pub(crate) fn normalize_whitespace(src: &str) -> String {
    let src = src.trim();
    let mut out = String::with_capacity(src.len());
    let mut chars = src.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if !c.is_whitespace() {
            out.push(c);
            continue;
        }
        let mut end = i + c.len_utf8();
        let mut has_newline = c == '\n';
        while let Some(&(j, n)) = chars.peek() {
            if !n.is_whitespace() {
                break;
            }
            has_newline |= n == '\n';
            end = j + n.len_utf8();
            chars.next();
        }
        let left_boundary = out.ends_with('>') || out.ends_with('}');
        let right = &src[end..];
        let right_boundary = right.starts_with('<') || right.starts_with('{');
        if !(has_newline && left_boundary && right_boundary) {
            out.push(' ');
        }
    }
    out
}

fn top<'a>(root: &'a mut Vec<Node>, open: &'a mut [(Frame, Vec<Node>)]) -> &'a mut Vec<Node> {
    match open.last_mut() {
        Some((_, nodes)) => nodes,
        None => root,
    }
}

fn push_text(nodes: &mut Vec<Node>, text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(Node::Text(prev)) = nodes.last_mut() {
        let mut merged = String::with_capacity(prev.len() + text.len());
        merged.push_str(prev);
        merged.push_str(text);
        *prev = Arc::from(merged);
        return;
    }
    nodes.push(Node::Text(Arc::from(text)));
}

fn unexpected_close(closing: &str, frame: Option<&Frame>, at: usize) -> ChartkitError {
    let open = frame.map_or_else(|| "none".to_owned(), Frame::describe);
    ChartkitError::template(format!(
        "unexpected {{{{/{closing}}}}} at byte {at} (open block: {open})"
    ))
}

/// Parse (already normalized) markup into a node tree, tagging every block.
///
/// Tags that are not a recognized form, and a trailing `{{` without `}}`, stay literal text.
pub(crate) fn parse_template(src: &str) -> ChartkitResult<Vec<Node>> {
    let mut next_block = 0u32;
    let mut root = Vec::new();
    let mut open: Vec<(Frame, Vec<Node>)> = Vec::new();
    let mut text_start = 0usize;
    let mut i = 0usize;

    while let Some(off) = src[i..].find("{{") {
        let at = i + off;
        let Some(close_off) = src[at + 2..].find("}}") else {
            break;
        };
        let after = at + 2 + close_off + 2;
        let Some(tag) = classify(&src[at + 2..after - 2], at)? else {
            i = after;
            continue;
        };

        push_text(top(&mut root, &mut open), &src[text_start..at]);
        text_start = after;
        i = after;

        match tag {
            Tag::Var(expr) => top(&mut root, &mut open).push(Node::Var {
                expr,
                raw: Arc::from(&src[at..after]),
            }),
            Tag::Partial(name) => top(&mut root, &mut open).push(Node::Partial { name }),
            Tag::IfOpen(cond, key) => {
                let tag = BlockTag {
                    id: next_block,
                    key: Arc::from(key),
                };
                next_block += 1;
                let frame = Frame::If {
                    tag,
                    cond,
                    then: None,
                    open_at: at,
                };
                open.push((frame, Vec::new()));
            }
            Tag::EachOpen(collection, key) => {
                let tag = BlockTag {
                    id: next_block,
                    key: Arc::from(key),
                };
                next_block += 1;
                let frame = Frame::Each {
                    tag,
                    collection,
                    open_at: at,
                };
                open.push((frame, Vec::new()));
            }
            Tag::Else => match open.last_mut() {
                Some((Frame::If { then, .. }, nodes)) if then.is_none() => {
                    *then = Some(std::mem::take(nodes));
                }
                Some((Frame::If { .. }, _)) => {
                    return Err(ChartkitError::template(format!(
                        "duplicate {{{{else}}}} at byte {at}"
                    )));
                }
                _ => {
                    return Err(ChartkitError::template(format!(
                        "{{{{else}}}} outside of an #if block at byte {at}"
                    )));
                }
            },
            Tag::CloseIf => {
                let Some((Frame::If { tag, cond, then, .. }, nodes)) =
                    open.pop_if(|(f, _)| matches!(f, Frame::If { .. }))
                else {
                    return Err(unexpected_close("if", open.last().map(|(f, _)| f), at));
                };
                let (then, otherwise) = match then {
                    Some(then) => (then, nodes),
                    None => (nodes, Vec::new()),
                };
                top(&mut root, &mut open).push(Node::If {
                    tag,
                    cond,
                    then: Arc::from(then),
                    otherwise: Arc::from(otherwise),
                });
            }
            Tag::CloseEach => {
                let Some((Frame::Each { tag, collection, .. }, nodes)) =
                    open.pop_if(|(f, _)| matches!(f, Frame::Each { .. }))
                else {
                    return Err(unexpected_close("each", open.last().map(|(f, _)| f), at));
                };
                top(&mut root, &mut open).push(Node::Each {
                    tag,
                    collection,
                    body: Arc::from(nodes),
                });
            }
        }
    }

    if let Some((frame, _)) = open.last() {
        let open_at = match frame {
            Frame::If { open_at, .. } | Frame::Each { open_at, .. } => *open_at,
        };
        return Err(ChartkitError::template(format!(
            "unclosed block '{}' opened at byte {open_at}",
            frame.describe()
        )));
    }
    push_text(&mut root, &src[text_start..]);
    Ok(root)
}

#[cfg(test)]
#[path = "../../tests/unit/template/parse.rs"]
mod tests;
