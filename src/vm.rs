// File: src/vm.rs
//
// The stack machine. `run` is a single dispatch loop over one `Chunk`;
// `Vm` itself is the process-wide context (globals, interned strings,
// the object heap) that persists across calls to `interpret`, so a
// REPL session can build on variables defined by earlier lines.

use crate::chunk::{Chunk, OpCode};
use crate::compiler;
use crate::error::{Diagnostic, OriError, RuntimeError};
use crate::object::{self, Heap, StringHandle};
use crate::table::Table;
use crate::value::Value;

const STACK_MAX: usize = 256;

pub struct Vm {
    heap: Heap,
    globals: Table,
    strings: Table,
    stack: Vec<Value>,
}

impl Vm {
    pub fn new() -> Self {
        Self { heap: Heap::new(), globals: Table::new(), strings: Table::new(), stack: Vec::with_capacity(STACK_MAX) }
    }

    /// Compiles and runs `source`. On a compile error, nothing executes.
    /// On a runtime error, the stack is reset but globals/heap survive,
    /// so the `Vm` stays usable for a later `interpret` call.
    pub fn interpret(&mut self, source: &[u8]) -> Result<(), OriError> {
        let chunk = compiler::compile(source, &mut self.heap, &mut self.strings)?;
        self.run(&chunk).map_err(OriError::from)
    }

    /// Like `interpret`, but first hands the compiled chunk (and the
    /// heap it was interned into) to `sink` -- used by the `--trace`
    /// CLI flag to disassemble before running.
    pub fn interpret_with(
        &mut self,
        source: &[u8],
        sink: impl FnOnce(&Chunk, &Heap),
    ) -> Result<(), OriError> {
        let chunk = compiler::compile(source, &mut self.heap, &mut self.strings)?;
        sink(&chunk, &self.heap);
        self.run(&chunk).map_err(OriError::from)
    }

    /// Renders a value as `print` would: strings resolve through the
    /// heap, everything else uses `Value`'s own `Display`.
    pub fn render(&self, value: &Value) -> String {
        match value {
            Value::Obj(handle) => String::from_utf8_lossy(self.heap.get(*handle).as_bytes()).into_owned(),
            other => format!("{}", other),
        }
    }

    fn push(&mut self, chunk: &Chunk, fault_ip: usize, value: Value) -> Result<(), RuntimeError> {
        if self.stack.len() >= STACK_MAX {
            return Err(self.runtime_error(chunk, fault_ip, "Stack overflow."));
        }
        self.stack.push(value);
        Ok(())
    }

    fn pop(&mut self) -> Value {
        self.stack.pop().expect("compiler guarantees balanced push/pop per statement")
    }

    fn peek(&self, distance: usize) -> Value {
        self.stack[self.stack.len() - 1 - distance]
    }

    fn runtime_error(&self, chunk: &Chunk, fault_ip: usize, message: impl Into<String>) -> RuntimeError {
        let line = chunk.line_at(fault_ip);
        RuntimeError(Diagnostic::new(line, message.into()))
    }

    fn run(&mut self, chunk: &Chunk) -> Result<(), RuntimeError> {
        self.stack.clear();
        let mut ip: usize = 0;

        loop {
            let op = OpCode::from_u8(chunk.code[ip])
                .expect("vm only ever executes chunks it compiled itself");
            ip += 1;
            let fault_ip = ip; // "the byte after the opcode that trapped"

            macro_rules! read_byte {
                () => {{
                    let b = chunk.code[ip];
                    ip += 1;
                    b
                }};
            }

            match op {
                OpCode::Constant => {
                    let index = read_byte!() as usize;
                    let value = chunk.constants[index];
                    self.push(chunk, fault_ip, value)?;
                }
                OpCode::Null => self.push(chunk, fault_ip, Value::Null)?,
                OpCode::True => self.push(chunk, fault_ip, Value::Bool(true))?,
                OpCode::False => self.push(chunk, fault_ip, Value::Bool(false))?,
                OpCode::Pop => {
                    self.pop();
                }
                OpCode::GetGlobal => {
                    let index = read_byte!() as usize;
                    let name = self.name_constant(chunk, index);
                    match self.globals.get(&self.heap, name).copied() {
                        Some(value) => self.push(chunk, fault_ip, value)?,
                        None => {
                            return Err(self.runtime_error(
                                chunk,
                                fault_ip,
                                format!("Undefined variable '{}'.", self.render_name(name)),
                            ));
                        }
                    }
                }
                OpCode::DefineGlobal => {
                    let index = read_byte!() as usize;
                    let name = self.name_constant(chunk, index);
                    let value = self.pop();
                    self.globals.set(&self.heap, name, value);
                }
                OpCode::SetGlobal => {
                    let index = read_byte!() as usize;
                    let name = self.name_constant(chunk, index);
                    let value = self.peek(0);
                    if self.globals.set(&self.heap, name, value) {
                        // `set` returns true for a key that wasn't
                        // already present: assignment to an undefined
                        // global must fail without creating it.
                        self.globals.delete(&self.heap, name);
                        return Err(self.runtime_error(
                            chunk,
                            fault_ip,
                            format!("Undefined variable '{}'.", self.render_name(name)),
                        ));
                    }
                    // OP_SET_GLOBAL intentionally does not pop: assignment
                    // is an expression, and the surrounding exprStmt pops.
                }
                OpCode::Equal => {
                    let b = self.pop();
                    let a = self.pop();
                    self.push(chunk, fault_ip, Value::Bool(a == b))?;
                }
                OpCode::Greater => self.binary_compare(chunk, fault_ip, |a, b| a > b)?,
                OpCode::Less => self.binary_compare(chunk, fault_ip, |a, b| a < b)?,
                OpCode::Add => self.add(chunk, fault_ip)?,
                OpCode::Subtract => self.binary_arith(chunk, fault_ip, |a, b| a - b)?,
                OpCode::Multiply => self.binary_arith(chunk, fault_ip, |a, b| a * b)?,
                OpCode::Divide => self.binary_arith(chunk, fault_ip, |a, b| a / b)?,
                OpCode::Not => {
                    let value = self.pop();
                    self.push(chunk, fault_ip, Value::Bool(value.is_falsy()))?;
                }
                OpCode::Negate => {
                    let value = self.peek(0);
                    match value.as_number() {
                        Some(n) => {
                            self.pop();
                            self.push(chunk, fault_ip, Value::Number(-n))?;
                        }
                        None => return Err(self.runtime_error(chunk, fault_ip, "Operand must be a number.")),
                    }
                }
                OpCode::Print => {
                    let value = self.pop();
                    println!("{}", self.render(&value));
                }
                OpCode::Return => return Ok(()),
            }
        }
    }

    fn name_constant(&self, chunk: &Chunk, index: usize) -> StringHandle {
        chunk.constants[index].as_obj().expect("name operands are always interned string constants")
    }

    fn render_name(&self, handle: StringHandle) -> String {
        String::from_utf8_lossy(self.heap.get(handle).as_bytes()).into_owned()
    }

    fn binary_arith(
        &mut self,
        chunk: &Chunk,
        fault_ip: usize,
        op: impl Fn(f64, f64) -> f64,
    ) -> Result<(), RuntimeError> {
        let (a, b) = self.pop_numeric_pair(chunk, fault_ip)?;
        self.push(chunk, fault_ip, Value::Number(op(a, b)))
    }

    fn binary_compare(
        &mut self,
        chunk: &Chunk,
        fault_ip: usize,
        op: impl Fn(f64, f64) -> bool,
    ) -> Result<(), RuntimeError> {
        let (a, b) = self.pop_numeric_pair(chunk, fault_ip)?;
        self.push(chunk, fault_ip, Value::Bool(op(a, b)))
    }

    fn pop_numeric_pair(&mut self, chunk: &Chunk, fault_ip: usize) -> Result<(f64, f64), RuntimeError> {
        if !self.peek(0).is_number() || !self.peek(1).is_number() {
            return Err(self.runtime_error(chunk, fault_ip, "Operands must be numbers."));
        }
        let b = self.pop().as_number().unwrap();
        let a = self.pop().as_number().unwrap();
        Ok((a, b))
    }

    fn add(&mut self, chunk: &Chunk, fault_ip: usize) -> Result<(), RuntimeError> {
        let b = self.peek(0);
        let a = self.peek(1);

        if let (Some(a), Some(b)) = (a.as_number(), b.as_number()) {
            self.pop();
            self.pop();
            return self.push(chunk, fault_ip, Value::Number(a + b));
        }

        if let (Some(a), Some(b)) = (a.as_obj(), b.as_obj()) {
            self.pop();
            self.pop();
            let mut bytes = Vec::with_capacity(self.heap.get(a).as_bytes().len() + self.heap.get(b).as_bytes().len());
            bytes.extend_from_slice(self.heap.get(a).as_bytes());
            bytes.extend_from_slice(self.heap.get(b).as_bytes());
            let handle = object::intern(&mut self.heap, &mut self.strings, &bytes);
            return self.push(chunk, fault_ip, Value::Obj(handle));
        }

        Err(self.runtime_error(chunk, fault_ip, "Operands must be two numbers or two strings."))
    }
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(src: &str) -> Result<(), OriError> {
        let mut vm = Vm::new();
        vm.interpret(src.as_bytes())
    }

    #[test]
    fn arithmetic_precedence() {
        assert!(run("print 1 + 2 * 3;").is_ok());
    }

    #[test]
    fn undefined_variable_get_is_a_runtime_error() {
        let err = run("print x;").unwrap_err();
        match err {
            OriError::Runtime(RuntimeError(d)) => assert!(d.message.contains("Undefined variable 'x'.")),
            other => panic!("expected runtime error, got {other:?}"),
        }
    }

    #[test]
    fn assignment_to_undefined_global_does_not_create_it() {
        let mut vm = Vm::new();
        assert!(vm.interpret(b"x = 1;").is_err());
        assert!(vm.interpret(b"print x;").is_err());
    }

    #[test]
    fn negating_a_string_is_a_runtime_error() {
        let err = run("print -\"hi\";").unwrap_err();
        match err {
            OriError::Runtime(RuntimeError(d)) => assert_eq!(d.message, "Operand must be a number."),
            other => panic!("expected runtime error, got {other:?}"),
        }
    }

    #[test]
    fn adding_number_and_string_is_a_runtime_error() {
        let err = run("print 1 + \"x\";").unwrap_err();
        match err {
            OriError::Runtime(RuntimeError(d)) => {
                assert_eq!(d.message, "Operands must be two numbers or two strings.")
            }
            other => panic!("expected runtime error, got {other:?}"),
        }
    }

    #[test]
    fn nan_is_not_equal_to_nan() {
        assert!(run("print 0/0 == 0/0;").is_ok());
    }

    #[test]
    fn repl_style_session_reuses_globals_across_interpret_calls() {
        let mut vm = Vm::new();
        vm.interpret(b"let a = 1;").unwrap();
        vm.interpret(b"let b = 2;").unwrap();
        assert!(vm.interpret(b"print a + b;").is_ok());
    }
}
