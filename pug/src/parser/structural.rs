use crate::parser::error::ParseError;
use crate::parser::lines::{self, SourceLine};
use crate::tree::{NodeId, Tree};

const FOLDING: &str = "| ";
const COMMENT: &str = "//-";
const RAW_COMMENT: &str = "//";

/// Fold a stream of raw lines into a rooted line tree.
///
/// `base_depth` is added to every line's tab depth; it is nonzero when
/// the lines belong to an included subfile.
pub(crate) fn build_tree(
    raw_lines: &[SourceLine<'_>],
    base_depth: usize,
    file_id: usize,
) -> Result<Tree, ParseError> {
    let mut tree = Tree::new(base_depth);
    let mut previous = tree.root();

    for line in raw_lines {
        let (tabs, body) = lines::indent(line.text);
        previous = place(
            &mut tree,
            previous,
            tabs + base_depth,
            body,
            line.span.clone(),
            file_id,
        )?;
    }
    Ok(tree)
}

/// Insert one line into the tree and return the new `previous` node.
fn place(
    tree: &mut Tree,
    previous: NodeId,
    depth: usize,
    body: &str,
    span: std::ops::Range<usize>,
    file_id: usize,
) -> Result<NodeId, ParseError> {
    let parent = tree.parent(previous).unwrap_or(previous);

    if body.starts_with(COMMENT) {
        // Comments are always re-leveled to the current sibling depth.
        return Ok(tree.push_child(parent, tree.depth(previous), body, span));
    }
    if body.starts_with(RAW_COMMENT) {
        return Ok(previous); // Drops pug comment.
    }
    if lines::is_blank(body) {
        return Ok(previous); // Drops empty line.
    }

    let id = if depth == tree.depth(previous) {
        // Sister of the previous line.
        tree.push_child(parent, depth, body, span.clone())
    } else if tree.depth(parent) < depth {
        if depth <= tree.depth(previous) {
            // Grandchild-like: back under the previous line's parent.
            tree.push_child(parent, depth, body, span.clone())
        } else {
            // Child of the previous line.
            tree.push_child(previous, depth, body, span.clone())
        }
    } else {
        // Walk ancestors to the nearest level at or above this depth.
        let ancestor = tree.pop_nest(previous, depth);
        if tree.depth(ancestor) < depth {
            // Cousin of the previous line.
            tree.push_child(ancestor, depth, body, span.clone())
        } else {
            // Aunt of the previous line.
            let parent = tree.parent(ancestor).unwrap_or(ancestor);
            tree.push_child(parent, depth, body, span.clone())
        }
    };

    if body.starts_with(FOLDING) {
        let parent = tree
            .parent(id)
            .expect("placed node always has a parent");
        if parent == tree.root() {
            return Err(ParseError::error(
                "folding line cannot appear at the top level",
                span,
                file_id,
            )
            .with_note("\"| \" text must sit beneath an element".to_string()));
        }
        tree.set_folding(parent);
    }
    Ok(id)
}
