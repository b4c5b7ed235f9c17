// Integration tests for the Ori CLI.
//
// Exercises the whole pipeline -- `ori run <file>` end to end -- since
// `print` writes straight to stdout and the only externally observable
// surface is the process's own output and exit code: one helper plus
// many focused `#[test]` functions, one per scenario.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::{Builder, NamedTempFile};

fn script(source: &str) -> NamedTempFile {
    let mut file = Builder::new().suffix(".ori").tempfile().expect("failed to create temp script");
    std::io::Write::write_all(&mut file, source.as_bytes()).expect("failed to write temp script");
    file
}

fn ori() -> Command {
    Command::cargo_bin("ori").expect("ori binary should build")
}

#[test]
fn arithmetic_precedence() {
    let file = script("print 1 + 2 * 3;");
    ori().arg("run").arg(file.path()).assert().success().stdout("7\n");
}

#[test]
fn boolean_and_comparison_chain() {
    let file = script("print !(5 - 4 > 3 * 2 == !null);");
    ori().arg("run").arg(file.path()).assert().success().stdout("true\n");
}

#[test]
fn string_concatenation() {
    let file = script("print \"foo\" + \"bar\";");
    ori().arg("run").arg(file.path()).assert().success().stdout("foobar\n");
}

#[test]
fn right_associative_assignment() {
    let file = script("let a = 1; let b = 2; a = b = 3; print a + b;");
    ori().arg("run").arg(file.path()).assert().success().stdout("6\n");
}

#[test]
fn uninitialized_let_is_null() {
    let file = script("let x; print x;");
    ori().arg("run").arg(file.path()).assert().success().stdout("null\n");
}

#[test]
fn assigning_an_undefined_global_is_a_runtime_error() {
    let file = script("x = 1;");
    ori()
        .arg("run")
        .arg(file.path())
        .assert()
        .code(70)
        .stderr(predicate::str::contains("Undefined variable 'x'."))
        .stderr(predicate::str::contains("[line 1] in script"));
}

#[test]
fn negating_a_string_is_a_runtime_error() {
    let file = script("print -\"hi\";");
    ori()
        .arg("run")
        .arg(file.path())
        .assert()
        .code(70)
        .stderr(predicate::str::contains("Operand must be a number."));
}

#[test]
fn adding_a_number_and_a_string_is_a_runtime_error() {
    let file = script("print 1 + \"x\";");
    ori()
        .arg("run")
        .arg(file.path())
        .assert()
        .code(70)
        .stderr(predicate::str::contains("Operands must be two numbers or two strings."));
}

#[test]
fn nan_is_not_equal_to_itself() {
    let file = script("print 0/0 == 0/0;");
    ori().arg("run").arg(file.path()).assert().success().stdout("false\n");
}

#[test]
fn unterminated_string_is_a_compile_error() {
    let file = script("\"abc");
    ori().arg("run").arg(file.path()).assert().code(65).stderr(predicate::str::contains("Unterminated string."));
}

#[test]
fn trace_flag_prints_disassembly_without_changing_exit_status() {
    let file = script("print 1 + 2;");
    ori()
        .arg("run")
        .arg(file.path())
        .arg("--trace")
        .assert()
        .success()
        .stdout("3\n")
        .stderr(predicate::str::contains("OP_CONSTANT"));
}

#[test]
fn multiple_statements_share_one_global_scope() {
    let file = script("let total = 0;\ntotal = total + 1;\ntotal = total + 1;\nprint total;\n");
    ori().arg("run").arg(file.path()).assert().success().stdout("2\n");
}

#[test]
fn missing_file_is_a_usage_error() {
    ori().arg("run").arg("/nonexistent/path/does/not/exist.ori").assert().code(65);
}
