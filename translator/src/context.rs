use std::collections::HashMap;
use std::rc::Rc;

use pug::tree::{NodeId, Tree};

use crate::error::RenderError;

/// A stored block definition: the line node that declared it.
///
/// The tree is reference-counted so a block captured from an included
/// file stays alive after that file's render finishes.
#[derive(Debug, Clone)]
pub struct BlockRef {
    pub tree: Rc<Tree>,
    pub node: NodeId,
}

/// The rendering context: named blocks and named variables.
///
/// Contexts are value-semantic. Every directive evaluation receives a
/// context and returns an updated one; a child's changes reach later
/// siblings but scoped directives decide whether their inner context
/// escapes (`for` drops it, `each` keeps it).
#[derive(Debug, Clone, Default)]
pub struct Context {
    blocks: HashMap<String, BlockRef>,
    variables: HashMap<String, String>,
}

impl Context {
    pub fn new() -> Self {
        Context::default()
    }

    pub fn block(&self, name: &str) -> Option<&BlockRef> {
        self.blocks.get(name)
    }

    pub fn has_block(&self, name: &str) -> bool {
        self.blocks.contains_key(name)
    }

    /// Store a block under `name`; a later call replaces the earlier one.
    pub fn set_block(&mut self, name: &str, block: BlockRef) -> Result<(), RenderError> {
        if name.is_empty() {
            return Err(RenderError::InvalidArgument("empty block name"));
        }
        self.blocks.insert(name.to_string(), block);
        Ok(())
    }

    pub fn variable(&self, name: &str) -> Option<&str> {
        self.variables.get(name).map(String::as_str)
    }

    pub fn has_variable(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    /// Set a variable. Values are stored already stringified; typing is
    /// re-inferred on each read by operand recognition.
    pub fn set_variable(&mut self, name: &str, value: &str) -> Result<(), RenderError> {
        if name.is_empty() {
            return Err(RenderError::InvalidArgument("empty variable name"));
        }
        self.variables.insert(name.to_string(), value.to_string());
        Ok(())
    }
}
