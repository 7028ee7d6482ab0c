use std::fmt;
use std::path::PathBuf;

/// An error raised while rendering a template.
#[derive(Debug)]
pub enum RenderError {
    /// Malformed template input: element heads, expressions, directives.
    Syntax(String),
    /// A file could not be loaded or written.
    Io {
        path: PathBuf,
        cause: std::io::Error,
    },
    /// Programmer error, such as an empty block or variable name.
    InvalidArgument(&'static str),
}

impl RenderError {
    pub fn syntax(message: impl Into<String>) -> Self {
        RenderError::Syntax(message.into())
    }
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::Syntax(message) => write!(f, "syntax error: {}", message),
            RenderError::Io { path, cause } => {
                write!(f, "I/O error: {}: {}", path.display(), cause)
            }
            RenderError::InvalidArgument(what) => write!(f, "invalid argument: {}", what),
        }
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RenderError::Io { cause, .. } => Some(cause),
            _ => None,
        }
    }
}

impl From<pug::ParseError> for RenderError {
    fn from(error: pug::ParseError) -> Self {
        RenderError::Syntax(error.message)
    }
}
