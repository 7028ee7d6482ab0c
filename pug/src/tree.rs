use std::ops::Range;

/// Index of a node in a [`Tree`] arena.
pub type NodeId = usize;

/// One physical (or synthesized) source line.
///
/// Nodes are owned by the arena; `parent` is an index back-reference,
/// never ownership. Nodes are only mutated while the tree is built.
#[derive(Debug, Clone)]
pub struct LineNode {
    /// Nesting depth: leading tab count plus the base depth of the file.
    pub depth: usize,
    /// The line with its leading tabs removed. Empty for the root.
    pub body: String,
    /// Byte range of the line in the original source.
    pub span: Range<usize>,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    /// Set when this node's children carry `"| "` folded content.
    pub folding: bool,
}

/// The rooted N-ary tree of source lines.
#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<LineNode>,
    root: NodeId,
}

impl Tree {
    /// Create a tree holding only a root node at `base_depth`.
    ///
    /// The base depth is nonzero when the tree belongs to an included
    /// subfile, so its lines align under the including line.
    pub fn new(base_depth: usize) -> Self {
        let root = LineNode {
            depth: base_depth,
            body: String::new(),
            span: 0..0,
            parent: None,
            children: Vec::new(),
            folding: false,
        };
        Tree {
            nodes: vec![root],
            root: 0,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &LineNode {
        &self.nodes[id]
    }

    pub fn depth(&self, id: NodeId) -> usize {
        self.nodes[id].depth
    }

    pub fn body(&self, id: NodeId) -> &str {
        &self.nodes[id].body
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id].children
    }

    pub fn span(&self, id: NodeId) -> Range<usize> {
        self.nodes[id].span.clone()
    }

    /// The tabs that indent this line.
    pub fn tabs(&self, id: NodeId) -> String {
        "\t".repeat(self.depth(id))
    }

    pub(crate) fn push_child(
        &mut self,
        parent: NodeId,
        depth: usize,
        body: &str,
        span: Range<usize>,
    ) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(LineNode {
            depth,
            body: body.to_string(),
            span,
            parent: Some(parent),
            children: Vec::new(),
            folding: false,
        });
        self.nodes[parent].children.push(id);
        id
    }

    pub(crate) fn set_folding(&mut self, id: NodeId) {
        self.nodes[id].folding = true;
    }

    /// The nearest ancestor of `id` (or `id` itself) with depth <= `depth`.
    pub fn pop_nest(&self, mut id: NodeId, depth: usize) -> NodeId {
        while self.depth(id) > depth {
            match self.parent(id) {
                Some(p) => id = p,
                None => return id,
            }
        }
        id
    }

    /// Whether output at this line must suppress indentation and newlines.
    ///
    /// With `parent_only` set, only the parent's folding flag counts;
    /// otherwise the line's own flag counts as well.
    pub fn is_folding(&self, id: NodeId, parent_only: bool) -> bool {
        if let Some(parent) = self.parent(id) {
            if self.nodes[parent].folding {
                return true;
            }
        }
        !parent_only && self.nodes[id].folding
    }
}
