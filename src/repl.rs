// File: src/repl.rs
//
// Line-at-a-time REPL: one `Vm` persists for the whole session so
// globals defined on one line are visible on the next. Ori has no
// braces or blocks to balance across lines, so every `Enter` submits
// -- no multi-line buffering needed.

use crate::error::{format_compile_error, format_runtime_error, OriError};
use crate::vm::Vm;
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

pub struct Repl {
    vm: Vm,
    editor: DefaultEditor,
}

impl Repl {
    pub fn new() -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Self { vm: Vm::new(), editor: DefaultEditor::new()? })
    }

    pub fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        println!("{}", "ori -- a small bytecode-compiled scripting language".bright_cyan());
        println!("Ctrl+D to exit.\n");

        loop {
            match self.editor.readline("ori> ") {
                Ok(line) => {
                    let _ = self.editor.add_history_entry(line.as_str());
                    if line.trim().is_empty() {
                        continue;
                    }
                    self.eval_line(&line);
                }
                Err(ReadlineError::Interrupted) => continue,
                Err(ReadlineError::Eof) => {
                    println!("{}", "Goodbye!".bright_cyan());
                    break;
                }
                Err(err) => {
                    eprintln!("{} {}", "Error:".bright_red(), err);
                    break;
                }
            }
        }

        Ok(())
    }

    fn eval_line(&mut self, line: &str) {
        if let Err(err) = self.vm.interpret(line.as_bytes()) {
            match err {
                OriError::Compile(e) => eprintln!("{}", format_compile_error(&e)),
                OriError::Runtime(e) => eprintln!("{}", format_runtime_error(&e)),
            }
        }
    }
}
