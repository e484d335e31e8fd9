// ABOUTME: Error types for the macro/expression processor

use thiserror::Error;

/// One error kind per §7 of the design document.
#[derive(Error, Debug, Clone)]
pub enum XacroError {
    #[error("malformed XML: {0}")]
    ParseFailure(String),

    #[error("unknown symbol: {0}")]
    UnknownSymbol(String),

    #[error("circular definition: {0}")]
    CircularDefinition(String),

    #[error("unknown macro: {0}")]
    UnknownMacro(String),

    #[error("{0}")]
    BadArity(String),

    #[error("bad conditional value: {0}")]
    BadConditional(String),

    #[error("unrecognized attribute `{attribute}` on <xacro:{directive}>")]
    BadAttribute { directive: String, attribute: String },

    #[error("invalid identifier: {0}")]
    BadName(String),

    #[error("cannot include {0}")]
    IncludeFailure(String),

    #[error("substitution failed: {0}")]
    ExtensionFailure(String),

    #[error("evaluation failed: {0}")]
    EvaluationFailure(String),

    #[error("{0}")]
    Fatal(String),

    #[error("recursion limit ({0}) exceeded")]
    RecursionLimit(usize),
}

/// A fully-contextualized failure: the underlying kind plus an optional
/// offending-expression suffix and the macro-activation trail (innermost
/// first), per §7's propagation rules.
#[derive(Debug, Clone)]
pub struct ContextError {
    pub kind: XacroError,
    pub suffix: Option<String>,
    pub trail: Vec<String>,
}

impl ContextError {
    pub fn new(kind: XacroError) -> Self {
        ContextError {
            kind,
            suffix: None,
            trail: Vec::new(),
        }
    }

    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = Some(suffix.into());
        self
    }

    pub fn push_frame(mut self, frame: impl Into<String>) -> Self {
        self.trail.push(frame.into());
        self
    }
}

impl From<XacroError> for ContextError {
    fn from(kind: XacroError) -> Self {
        ContextError::new(kind)
    }
}

impl std::fmt::Display for ContextError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(suffix) = &self.suffix {
            write!(f, " ({suffix})")?;
        }
        Ok(())
    }
}

impl std::error::Error for ContextError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}

pub type XacroResult<T> = Result<T, ContextError>;

/// A non-fatal diagnostic: root-scope shadowing, macro redefinition, and
/// similar recoveries named in §7. Collected on the processing context
/// rather than printed directly, so library callers can inspect them.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub message: String,
    pub file_stack: Vec<String>,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "warning: {}", self.message)?;
        if let Some(file) = self.file_stack.last() {
            write!(f, " (in {file})")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_error_renders_suffix() {
        let err =
            ContextError::new(XacroError::UnknownSymbol("w".into())).with_suffix("${w*2}");
        assert_eq!(err.to_string(), "unknown symbol: w (${w*2})");
    }

    #[test]
    fn trail_accumulates_innermost_first() {
        let err = ContextError::new(XacroError::BadArity("m: too few args".into()))
            .push_frame("m (macro.xacro:4)")
            .push_frame("wrap (macro.xacro:10)");
        assert_eq!(
            err.trail,
            vec!["m (macro.xacro:4)", "wrap (macro.xacro:10)"]
        );
    }
}
