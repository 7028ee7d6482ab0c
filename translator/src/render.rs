use std::path::Path;
use std::rc::Rc;

use lazy_static::lazy_static;
use regex::Regex;

use pug::parser::Parser;
use pug::tree::{NodeId, Tree};

use crate::context::{BlockRef, Context};
use crate::element;
use crate::error::RenderError;
use crate::eval;
use crate::loader::SourceLoader;

lazy_static! {
    static ref COMMENT_RE: Regex = Regex::new(r"^//-[ \t]?(.*)$").unwrap();
    static ref INCLUDE_RE: Regex = Regex::new(r"^include[ \t]+([^ ]+)$").unwrap();
    static ref EXTENDS_RE: Regex = Regex::new(r"^extends[ \t]+([^ ]+)$").unwrap();
    static ref BLOCK_RE: Regex = Regex::new(r"^block[ \t]+([^ ]+)$").unwrap();
    static ref IF_RE: Regex = Regex::new(r"^if[ \t]+(.*)$").unwrap();
    static ref ELIF_RE: Regex = Regex::new(r"^else[ \t]+if[ \t]+(.*)$").unwrap();
    static ref ELSE_RE: Regex = Regex::new(r"^else[ \t]*$").unwrap();
    static ref CASE_RE: Regex = Regex::new(r"^case[ \t]+([A-Za-z_-][A-Za-z0-9_-]*)$").unwrap();
    static ref WHEN_RE: Regex =
        Regex::new(r#"^when[ \t]+(["'])([A-Za-z_-][A-Za-z0-9_-]*)(["'])$"#).unwrap();
    static ref BREAK_RE: Regex = Regex::new(r"^-[ \t]+break$").unwrap();
    static ref EACH_RE: Regex =
        Regex::new(r"^each[ \t]+([A-Za-z_-][A-Za-z0-9_-]*)[ \t]*in[ \t]*\[([^\]]*)\]$").unwrap();
    static ref FOR_RE: Regex = Regex::new(
        r"^-[ \t]+for[ \t]*\([ \t]*var[ \t]+([A-Za-z_-][A-Za-z0-9_-]*)[ \t]*=[ \t]*([^;]+);[ \t]*([ \tA-Za-z0-9_+*/%=<>!-]*);[ \t]*([ \tA-Za-z0-9_+*/%=<>!-]*)\)$"
    )
    .unwrap();
    static ref VAR_RE: Regex =
        Regex::new(r"^-[ \t]+var[ \t]+([A-Za-z_-][A-Za-z0-9_-]*)[ \t]*=[ \t]*([^;]+)$").unwrap();
    static ref CONST_RE: Regex =
        Regex::new(r"^-[ \t]+const[ \t]+([A-Za-z_-][A-Za-z0-9_-]*)[ \t]*=[ \t]*([^;]+)$").unwrap();
    static ref INTERP_RE: Regex = Regex::new(r"#\{([A-Za-z_-][A-Za-z0-9_-]*)\}").unwrap();
}

/// Include/extends chains deeper than this fail instead of recursing
/// forever; cycles are not otherwise detected.
const MAX_INCLUDE_DEPTH: usize = 64;

/// Render a parsed tree to HTML.
pub fn render(tree: Rc<Tree>, path: &Path, loader: &dyn SourceLoader) -> Result<String, RenderError> {
    let root = tree.root();
    let (out, _context) = render_line(&Context::new(), &tree, root, path, loader, 0)?;
    Ok(out)
}

/// Replace every `#{name}` with the variable's value.
///
/// A single left-to-right pass; replacements are not rescanned, and
/// unknown names are left untouched.
pub(crate) fn replace_variables(context: &Context, text: &str) -> String {
    if !text.contains("#{") {
        return text.to_string();
    }
    INTERP_RE
        .replace_all(text, |caps: &regex::Captures<'_>| {
            match context.variable(&caps[1]) {
                Some(value) => value.to_string(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Render the given nodes in order, threading the context from each
/// line to the next.
fn render_children(
    mut context: Context,
    tree: &Rc<Tree>,
    ids: &[NodeId],
    path: &Path,
    loader: &dyn SourceLoader,
    depth: usize,
) -> Result<(String, Context), RenderError> {
    let mut out = String::new();
    for &id in ids {
        let (fragment, ctx) = render_line(&context, tree, id, path, loader, depth)?;
        context = ctx;
        out.push_str(&fragment);
    }
    Ok((out, context))
}

/// Dispatch a single line on its head directive.
fn render_line(
    context: &Context,
    tree: &Rc<Tree>,
    id: NodeId,
    path: &Path,
    loader: &dyn SourceLoader,
    depth: usize,
) -> Result<(String, Context), RenderError> {
    let body = tree.body(id);

    if let Some(text) = body.strip_prefix("| ") {
        return Ok((replace_variables(context, text), context.clone()));
    }
    if let Some(m) = COMMENT_RE.captures(body) {
        let out = format!(
            "{}<!-- {} -->\n",
            tree.tabs(id),
            replace_variables(context, &m[1])
        );
        return Ok((out, context.clone()));
    }
    if let Some(m) = INCLUDE_RE
        .captures(body)
        .or_else(|| EXTENDS_RE.captures(body))
    {
        return render_subfile(context, tree, id, &m[1], path, loader, depth);
    }
    if let Some(m) = BLOCK_RE.captures(body) {
        let name = &m[1];
        if let Some(block) = context.block(name) {
            let block = block.clone();
            return render_children(
                context.clone(),
                &block.tree,
                block.tree.children(block.node),
                path,
                loader,
                depth,
            );
        }
        let mut ctx = context.clone();
        ctx.set_block(
            name,
            BlockRef {
                tree: tree.clone(),
                node: id,
            },
        )?;
        return Ok((String::new(), ctx));
    }
    if let Some(m) = IF_RE.captures(body) {
        return render_if(context, tree, id, &m[1], path, loader, depth);
    }
    if ELIF_RE.is_match(body) || ELSE_RE.is_match(body) {
        // Consumed by the preceding if directive.
        return Ok((String::new(), context.clone()));
    }
    if let Some(m) = CASE_RE.captures(body) {
        return render_case(context, tree, id, &m[1], path, loader, depth);
    }
    if let Some(m) = FOR_RE.captures(body) {
        return render_for(context, tree, id, &m, path, loader, depth);
    }
    if let Some(m) = EACH_RE.captures(body) {
        return render_each(context, tree, id, &m[1], &m[2], path, loader, depth);
    }
    if let Some(m) = VAR_RE.captures(body).or_else(|| CONST_RE.captures(body)) {
        let mut ctx = context.clone();
        ctx.set_variable(&m[1], unquote(&m[2]))?;
        return Ok((String::new(), ctx));
    }
    if body == "." {
        // Raw HTML: direct children are emitted verbatim, never dispatched.
        let mut out = String::new();
        for &child in tree.children(id) {
            out.push_str(&tree.tabs(child));
            out.push_str(tree.body(child));
            out.push('\n');
        }
        return Ok((replace_variables(context, &out), context.clone()));
    }
    if body.is_empty() {
        // The root (or an included subroot): only children render.
        return render_children(context.clone(), tree, tree.children(id), path, loader, depth);
    }
    render_element_line(context, tree, id, path, loader, depth)
}

/// Render an element line: the `": "` chain of heads, the children, and
/// the closing tags.
///
/// Childless elements and inline chains close on the same line; an
/// element with block children closes on its own indented line. Folding
/// suppresses indentation and newlines throughout, with one final
/// newline terminating a folding parent.
fn render_element_line(
    context: &Context,
    tree: &Rc<Tree>,
    id: NodeId,
    path: &Path,
    loader: &dyn SourceLoader,
    depth: usize,
) -> Result<(String, Context), RenderError> {
    let mut out = String::new();
    if !tree.is_folding(id, true) {
        out.push_str(&tree.tabs(id));
    }

    let mut closes: Vec<&str> = Vec::new();
    let mut rest = tree.body(id);
    while !rest.is_empty() {
        let (next, html, close) = element::render_element(context, rest)?;
        if let Some(tag) = close {
            closes.push(tag);
        }
        out.push_str(&replace_variables(context, &html));
        rest = next;
    }

    let children = tree.children(id);
    let folding = tree.is_folding(id, false);
    let (children_out, ctx) =
        render_children(context.clone(), tree, children, path, loader, depth)?;

    if !children.is_empty() && !folding {
        out.push('\n');
        out.push_str(&children_out);
        for tag in closes.iter().rev() {
            out.push_str(&tree.tabs(id));
            out.push_str("</");
            out.push_str(tag);
            out.push_str(">\n");
        }
    } else {
        out.push_str(&children_out);
        for tag in closes.iter().rev() {
            out.push_str("</");
            out.push_str(tag);
            out.push('>');
        }
        if !folding {
            out.push('\n');
        }
        if tree.node(id).folding {
            out.push('\n');
        }
    }
    Ok((out, ctx))
}

/// Load and render an included (or extended) sibling file at this
/// line's depth. The path stays the root template's path, so nested
/// includes keep resolving as its siblings.
fn render_subfile(
    context: &Context,
    tree: &Rc<Tree>,
    id: NodeId,
    name: &str,
    path: &Path,
    loader: &dyn SourceLoader,
    depth: usize,
) -> Result<(String, Context), RenderError> {
    if depth >= MAX_INCLUDE_DEPTH {
        return Err(RenderError::syntax(format!(
            "include depth limit ({}) exceeded at '{}'",
            MAX_INCLUDE_DEPTH, name
        )));
    }
    let target = loader.resolve_sibling(path, name);
    log::debug!("including {}", target.display());
    let source = loader.load(&target)?;
    let sub = Parser::new(source, 0)
        .parse_at(tree.depth(id))
        .map_err(|e| RenderError::syntax(format!("in '{}': {}", target.display(), e.message)))?;
    let sub = Rc::new(sub);
    let root = sub.root();
    render_line(context, &sub, root, path, loader, depth + 1)
}

fn render_if(
    context: &Context,
    tree: &Rc<Tree>,
    id: NodeId,
    condition: &str,
    path: &Path,
    loader: &dyn SourceLoader,
    depth: usize,
) -> Result<(String, Context), RenderError> {
    if eval::evaluate(context, condition)?.0 {
        return render_children(context.clone(), tree, tree.children(id), path, loader, depth);
    }

    // Collect the else-if / else chain from the following siblings.
    let parent = tree.parent(id).expect("if line always has a parent");
    let siblings = tree.children(parent);
    let position = siblings
        .iter()
        .position(|&s| s == id)
        .expect("node listed under its parent");
    let mut elifs: Vec<(String, NodeId)> = Vec::new();
    let mut else_branch: Option<NodeId> = None;
    for &sibling in &siblings[position + 1..] {
        let line = tree.body(sibling);
        if let Some(m) = ELIF_RE.captures(line) {
            if else_branch.is_some() {
                return Err(RenderError::syntax("'else if' appears after 'else'"));
            }
            elifs.push((m[1].to_string(), sibling));
        } else if ELSE_RE.is_match(line) {
            if else_branch.is_some() {
                return Err(RenderError::syntax("'else' appears more than once"));
            }
            else_branch = Some(sibling);
        } else {
            break;
        }
    }

    for (cond, node) in &elifs {
        if eval::evaluate(context, cond)?.0 {
            return render_children(
                context.clone(),
                tree,
                tree.children(*node),
                path,
                loader,
                depth,
            );
        }
    }
    if let Some(node) = else_branch {
        return render_children(context.clone(), tree, tree.children(node), path, loader, depth);
    }
    Ok((String::new(), context.clone()))
}

fn render_case(
    context: &Context,
    tree: &Rc<Tree>,
    id: NodeId,
    name: &str,
    path: &Path,
    loader: &dyn SourceLoader,
    depth: usize,
) -> Result<(String, Context), RenderError> {
    let scrutinee = context.variable(name).unwrap_or(name).to_string();

    let mut arms: Vec<(Option<String>, NodeId)> = Vec::new();
    for &child in tree.children(id) {
        let line = tree.body(child);
        if line == "default" {
            if arms.iter().any(|(label, _)| label.is_none()) {
                return Err(RenderError::syntax("duplicate 'default' in case"));
            }
            arms.push((None, child));
        } else if let Some(m) = WHEN_RE.captures(line) {
            if m[1] != m[3] {
                return Err(RenderError::syntax(format!(
                    "mismatched quotes in '{}'",
                    line
                )));
            }
            let label = m[2].to_string();
            if arms
                .iter()
                .any(|(l, _)| l.as_deref() == Some(label.as_str()))
            {
                return Err(RenderError::syntax(format!(
                    "duplicate 'when' label '{}'",
                    label
                )));
            }
            arms.push((Some(label), child));
        } else {
            return Err(RenderError::syntax(format!(
                "unexpected line '{}' in case",
                line
            )));
        }
    }

    let start = arms
        .iter()
        .position(|(label, _)| label.as_deref() == Some(scrutinee.as_str()))
        .or_else(|| arms.iter().position(|(label, _)| label.is_none()));
    let Some(start) = start else {
        return Ok((String::new(), context.clone()));
    };

    // Empty arms fall through; `- break` ends the case with no output.
    for (_, node) in &arms[start..] {
        let children = tree.children(*node);
        if children.is_empty() {
            continue;
        }
        if BREAK_RE.is_match(tree.body(children[0])) {
            break;
        }
        return render_children(context.clone(), tree, children, path, loader, depth);
    }
    Ok((String::new(), context.clone()))
}

fn render_for(
    context: &Context,
    tree: &Rc<Tree>,
    id: NodeId,
    m: &regex::Captures<'_>,
    path: &Path,
    loader: &dyn SourceLoader,
    depth: usize,
) -> Result<(String, Context), RenderError> {
    let variable = &m[1];
    let condition = &m[3];
    let advance = &m[4];

    let mut out = String::new();
    let mut ctx = context.clone();
    let value = eval::to_operand(&ctx, &m[2])?;
    ctx.set_variable(variable, &value.to_string())?;
    loop {
        let (truthy, next) = eval::evaluate(&ctx, condition)?;
        ctx = next;
        if !truthy {
            break;
        }
        let (fragment, next) =
            render_children(ctx, tree, tree.children(id), path, loader, depth)?;
        out.push_str(&fragment);
        let (_, next) = eval::evaluate(&next, advance)?;
        ctx = next;
    }
    // The loop context does not leak.
    Ok((out, context.clone()))
}

fn render_each(
    context: &Context,
    tree: &Rc<Tree>,
    id: NodeId,
    name: &str,
    csv: &str,
    path: &Path,
    loader: &dyn SourceLoader,
    depth: usize,
) -> Result<(String, Context), RenderError> {
    let items = split_each_items(csv)?;
    if items.is_empty() {
        return Ok((String::new(), context.clone()));
    }

    let mut ctx = context.clone();
    let mut out = String::new();
    for item in &items {
        ctx.set_variable(name, item)?;
        let (fragment, next) =
            render_children(ctx, tree, tree.children(id), path, loader, depth)?;
        out.push_str(&fragment);
        ctx = next;
    }
    // Unlike for, the final loop context is retained.
    Ok((out, ctx))
}

/// Split the bracket content of an each directive into items: comma
/// separated, whitespace trimmed, matched surrounding quotes stripped.
fn split_each_items(csv: &str) -> Result<Vec<String>, RenderError> {
    if csv.is_empty() {
        return Ok(Vec::new());
    }
    let csv = csv.strip_suffix(',').unwrap_or(csv);
    let mut items = Vec::new();
    for raw in csv.split(',') {
        let item = raw.trim_start_matches(&[' ', '\t'][..]);
        if item.is_empty() {
            return Err(RenderError::syntax("empty item in each list"));
        }
        let item = item.trim_end_matches(&[' ', '\t', ','][..]);
        let bytes = item.as_bytes();
        if bytes[0] == b'\'' || bytes[0] == b'"' {
            if item.len() < 2 || bytes[0] != bytes[item.len() - 1] {
                return Err(RenderError::syntax(format!(
                    "mismatched quotes in each item '{}'",
                    item
                )));
            }
            items.push(item[1..item.len() - 1].to_string());
        } else {
            items.push(item.to_string());
        }
    }
    Ok(items)
}

fn unquote(value: &str) -> &str {
    let bytes = value.as_bytes();
    if bytes.len() >= 2
        && (bytes[0] == b'\'' || bytes[0] == b'"')
        && bytes[bytes.len() - 1] == bytes[0]
    {
        &value[1..value.len() - 1]
    } else {
        value
    }
}
