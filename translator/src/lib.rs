pub mod context;
pub mod error;
pub mod eval;
pub mod loader;
pub mod operand;

mod element;
mod render;

pub use context::Context;
pub use error::RenderError;
pub use loader::{FsLoader, SourceLoader};
pub use operand::Operand;
pub use render::render;

use std::path::Path;
use std::rc::Rc;

use pug::parser::Parser;

/// Translate pug source text to HTML.
///
/// `base_path` is the path includes and extends resolve against.
pub fn translate_string(source: &str, base_path: &Path) -> Result<String, RenderError> {
    translate_string_with(source, base_path, &FsLoader)
}

/// Translate the pug file at `path` to HTML.
pub fn translate_file(path: &Path) -> Result<String, RenderError> {
    let loader = FsLoader;
    let source = loader.load(path)?;
    translate_string_with(&source, path, &loader)
}

/// Translate with a caller-supplied loader for include/extends.
pub fn translate_string_with(
    source: &str,
    base_path: &Path,
    loader: &dyn SourceLoader,
) -> Result<String, RenderError> {
    let tree = Parser::new(source.to_string(), 0).parse()?;
    render(Rc::new(tree), base_path, loader)
}
