// File: src/lib.rs
//
// Public surface: a `Vm` that owns its heap/globals/interning table and
// an `interpret` convenience function for one-shot callers (the `run`
// subcommand), mirroring the original's `initVM`/`interpret`/`freeVM`
// trio without the explicit teardown step -- `Vm` frees everything on
// drop.

pub mod chunk;
pub mod compiler;
pub mod debug;
pub mod error;
pub mod object;
pub mod repl;
pub mod scanner;
pub mod table;
pub mod value;
pub mod vm;

pub use error::{CompileError, Diagnostic, InterpretResult, OriError, RuntimeError};
pub use vm::Vm;

/// Compiles and runs `source` in a fresh `Vm`. Convenience wrapper for
/// callers that don't need state to persist across calls (everything
/// the REPL needs, it gets from `Vm` directly instead).
pub fn interpret(source: &[u8]) -> InterpretResult {
    Vm::new().interpret(source)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interpret_runs_a_complete_program() {
        assert!(interpret(b"let a = 1; let b = 2; print a + b;").is_ok());
    }

    #[test]
    fn interpret_surfaces_compile_errors() {
        assert!(matches!(interpret(b"1 +;"), Err(OriError::Compile(_))));
    }

    #[test]
    fn interpret_surfaces_runtime_errors() {
        assert!(matches!(interpret(b"print x;"), Err(OriError::Runtime(_))));
    }
}
