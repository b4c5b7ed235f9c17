// File: src/error.rs
//
// The three outcomes named at the core boundary: `Ok`, `CompileError`,
// `RuntimeError`. Diagnostics are colorized (bold header + location
// line) and the outer error type is a `thiserror` enum so it composes
// with `?` normally.

use colored::Colorize;
use std::fmt;

/// A single reported problem: a message tied to a source line.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub line: u32,
    pub message: String,
}

impl Diagnostic {
    pub fn new(line: u32, message: impl Into<String>) -> Self {
        Self { line, message: message.into() }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[line {}] {}", self.line, self.message)
    }
}

/// Errors raised by the compiler, one per syntactic construct that
/// `panicMode` let through before `synchronize` found a safe boundary.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("compilation failed with {} error(s)", .0.len())]
pub struct CompileError(pub Vec<Diagnostic>);

/// A single runtime trap. The VM stops at the first one -- unlike
/// compile errors, there is never more than one per `interpret()` call.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{0}")]
pub struct RuntimeError(pub Diagnostic);

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OriError {
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

pub type InterpretResult = Result<(), OriError>;

/// Renders a compile error as `[line N] Error[ at '<lexeme>' | at end]:
/// <message>`, one line per diagnostic, bold red when writing to a
/// color-capable stream.
pub fn format_compile_error(err: &CompileError) -> String {
    err.0
        .iter()
        .map(|d| format!("{}", d).red().bold().to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Renders a runtime error as `<message>\n[line N] in script`.
pub fn format_runtime_error(err: &RuntimeError) -> String {
    format!("{}\n{}", err.0.message, format!("[line {}] in script", err.0.line).bright_blue())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runtime_error_trailer_matches_contract() {
        let err = RuntimeError(Diagnostic::new(3, "Undefined variable 'x'.".to_string()));
        let rendered = format_runtime_error(&err);
        assert!(rendered.contains("Undefined variable 'x'."));
        assert!(rendered.contains("[line 3] in script"));
    }
}
