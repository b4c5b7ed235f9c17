// File: src/chunk.rs
//
// The compiler's output unit: a flat byte stream of opcodes and inline
// operands, a parallel line-number array, and an append-only constant
// pool. `len(code) == len(lines)` is the chunk's core invariant and
// holds after every `write`.

use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OpCode {
    Constant = 0,
    Null,
    True,
    False,
    Pop,
    GetGlobal,
    DefineGlobal,
    SetGlobal,
    Equal,
    Greater,
    Less,
    Add,
    Subtract,
    Multiply,
    Divide,
    Not,
    Negate,
    Print,
    Return,
}

impl OpCode {
    /// Decode a raw opcode byte. Only ever fails if the VM is handed a
    /// chunk it didn't compile itself.
    pub fn from_u8(byte: u8) -> Option<Self> {
        use OpCode::*;
        const TABLE: &[OpCode] = &[
            Constant, Null, True, False, Pop, GetGlobal, DefineGlobal, SetGlobal, Equal, Greater,
            Less, Add, Subtract, Multiply, Divide, Not, Negate, Print, Return,
        ];
        TABLE.get(byte as usize).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            OpCode::Constant => "OP_CONSTANT",
            OpCode::Null => "OP_NULL",
            OpCode::True => "OP_TRUE",
            OpCode::False => "OP_FALSE",
            OpCode::Pop => "OP_POP",
            OpCode::GetGlobal => "OP_GET_GLOBAL",
            OpCode::DefineGlobal => "OP_DEFINE_GLOBAL",
            OpCode::SetGlobal => "OP_SET_GLOBAL",
            OpCode::Equal => "OP_EQUAL",
            OpCode::Greater => "OP_GREATER",
            OpCode::Less => "OP_LESS",
            OpCode::Add => "OP_ADD",
            OpCode::Subtract => "OP_SUBTRACT",
            OpCode::Multiply => "OP_MULTIPLY",
            OpCode::Divide => "OP_DIVIDE",
            OpCode::Not => "OP_NOT",
            OpCode::Negate => "OP_NEGATE",
            OpCode::Print => "OP_PRINT",
            OpCode::Return => "OP_RETURN",
        }
    }

    /// Number of operand bytes this opcode is followed by in the stream.
    pub fn operand_len(self) -> usize {
        match self {
            OpCode::Constant | OpCode::GetGlobal | OpCode::DefineGlobal | OpCode::SetGlobal => 1,
            _ => 0,
        }
    }
}

/// Maximum number of distinct constants a single chunk can hold: the
/// index is encoded as one operand byte.
pub const MAX_CONSTANTS: usize = 256;

#[derive(Debug, Default)]
pub struct Chunk {
    pub code: Vec<u8>,
    pub lines: Vec<u32>,
    pub constants: Vec<Value>,
}

impl Chunk {
    pub fn new() -> Self {
        Self { code: Vec::new(), lines: Vec::new(), constants: Vec::new() }
    }

    pub fn write_byte(&mut self, byte: u8, line: u32) {
        self.code.push(byte);
        self.lines.push(line);
    }

    pub fn write_op(&mut self, op: OpCode, line: u32) {
        self.write_byte(op as u8, line);
    }

    /// Appends `value`; returns its index, or `None` if the pool is
    /// already at `MAX_CONSTANTS` (a one-byte index can't address more).
    pub fn add_constant(&mut self, value: Value) -> Option<u8> {
        if self.constants.len() >= MAX_CONSTANTS {
            return None;
        }
        self.constants.push(value);
        Some((self.constants.len() - 1) as u8)
    }

    pub fn code_len(&self) -> usize {
        self.code.len()
    }

    /// The source line that produced `code[offset]`, used only for
    /// runtime-error reporting.
    pub fn line_at(&self, offset: usize) -> u32 {
        self.lines[offset]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_and_lines_stay_parallel() {
        let mut chunk = Chunk::new();
        chunk.write_op(OpCode::Null, 1);
        chunk.write_op(OpCode::Return, 2);
        assert_eq!(chunk.code.len(), chunk.lines.len());
    }

    #[test]
    fn constant_pool_rejects_257th_entry() {
        let mut chunk = Chunk::new();
        for i in 0..MAX_CONSTANTS {
            assert_eq!(chunk.add_constant(Value::Number(i as f64)), Some(i as u8));
        }
        assert_eq!(chunk.add_constant(Value::Number(0.0)), None);
    }

    #[test]
    fn opcode_roundtrips_through_a_byte() {
        for op in [OpCode::Constant, OpCode::Add, OpCode::Return] {
            assert_eq!(OpCode::from_u8(op as u8), Some(op));
        }
    }
}
