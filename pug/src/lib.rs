pub mod parser;
pub mod tree;

pub use parser::ParseError;
pub use tree::{NodeId, Tree};
