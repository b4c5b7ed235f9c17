// File: src/main.rs
//
// Entry point: command-line argument parsing and dispatch to `run` or
// `repl`. Exit codes on `run` follow the sysexits.h convention (65 for
// a usage/compile error, 70 for an internal/runtime error) -- see
// DESIGN.md for why that convention was chosen over plain 1.

mod chunk;
mod compiler;
mod debug;
mod error;
mod object;
mod repl;
mod scanner;
mod table;
mod value;
mod vm;

use clap::{Parser as ClapParser, Subcommand};
use error::OriError;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

const EX_DATAERR: u8 = 65;
const EX_SOFTWARE: u8 = 70;

#[derive(ClapParser)]
#[command(
    name = "ori",
    about = "Ori: a small bytecode-compiled scripting language",
    version = env!("CARGO_PKG_VERSION")
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an Ori script file
    Run {
        /// Path to the source file
        file: PathBuf,

        /// Disassemble the compiled chunk before executing it
        #[arg(long)]
        trace: bool,
    },

    /// Launch the interactive REPL
    Repl,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { file, trace } => run(&file, trace),
        Commands::Repl => match repl::Repl::new() {
            Ok(mut session) => match session.run() {
                Ok(()) => ExitCode::SUCCESS,
                Err(err) => {
                    eprintln!("REPL error: {}", err);
                    ExitCode::from(EX_SOFTWARE)
                }
            },
            Err(err) => {
                eprintln!("Failed to start REPL: {}", err);
                ExitCode::from(EX_SOFTWARE)
            }
        },
    }
}

fn run(file: &PathBuf, trace: bool) -> ExitCode {
    let source = match fs::read(file) {
        Ok(bytes) => bytes,
        Err(err) => {
            eprintln!("Could not read '{}': {}", file.display(), err);
            return ExitCode::from(EX_DATAERR);
        }
    };

    let mut session = vm::Vm::new();
    let name = file.display().to_string();

    let result = session.interpret_with(&source, |chunk, heap| {
        if trace {
            eprintln!("{}", debug::disassemble_chunk(chunk, heap, &name));
        }
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(OriError::Compile(err)) => {
            eprintln!("{}", error::format_compile_error(&err));
            ExitCode::from(EX_DATAERR)
        }
        Err(OriError::Runtime(err)) => {
            eprintln!("{}", error::format_runtime_error(&err));
            ExitCode::from(EX_SOFTWARE)
        }
    }
}
