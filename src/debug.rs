// File: src/debug.rs
//
// Disassembler: a read-only consumer of a `Chunk` (plus the heap, to
// render string constants), wired to the CLI's `--trace` flag. Never
// touches VM state; it only ever borrows what it's given.

use crate::chunk::{Chunk, OpCode};
use crate::object::Heap;
use crate::value::Value;

/// Formats every instruction in `chunk` under a `name` header, one line
/// per instruction, in clox's column layout: `offset  line  OP_NAME  operand`.
pub fn disassemble_chunk(chunk: &Chunk, heap: &Heap, name: &str) -> String {
    let mut out = format!("== {} ==\n", name);
    let mut offset = 0;
    while offset < chunk.code_len() {
        offset = disassemble_instruction(chunk, heap, offset, &mut out);
    }
    out
}

/// Formats the single instruction at `offset`, appending it to `out`,
/// and returns the offset of the next instruction.
fn disassemble_instruction(chunk: &Chunk, heap: &Heap, offset: usize, out: &mut String) -> usize {
    let line = chunk.line_at(offset);
    let same_line_as_previous = offset > 0 && chunk.line_at(offset - 1) == line;

    out.push_str(&format!("{:04} ", offset));
    if same_line_as_previous {
        out.push_str("   | ");
    } else {
        out.push_str(&format!("{:4} ", line));
    }

    let op = match OpCode::from_u8(chunk.code[offset]) {
        Some(op) => op,
        None => {
            out.push_str(&format!("Unknown opcode {}\n", chunk.code[offset]));
            return offset + 1;
        }
    };

    match op.operand_len() {
        0 => {
            out.push_str(op.name());
            out.push('\n');
            offset + 1
        }
        1 => {
            let operand = chunk.code[offset + 1];
            match op {
                OpCode::Constant | OpCode::GetGlobal | OpCode::DefineGlobal | OpCode::SetGlobal => {
                    out.push_str(&format!(
                        "{:-16} {:4} '{}'\n",
                        op.name(),
                        operand,
                        render_constant(&chunk.constants[operand as usize], heap)
                    ));
                }
                _ => out.push_str(&format!("{:-16} {:4}\n", op.name(), operand)),
            }
            offset + 2
        }
        n => unreachable!("opcode {:?} declares an unsupported operand length {}", op, n),
    }
}

fn render_constant(value: &Value, heap: &Heap) -> String {
    match value {
        Value::Obj(handle) => String::from_utf8_lossy(heap.get(*handle).as_bytes()).into_owned(),
        other => format!("{}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler;
    use crate::table::Table;

    #[test]
    fn disassembles_a_simple_chunk() {
        let mut heap = Heap::new();
        let mut strings = Table::new();
        let chunk = compiler::compile(b"print 1 + 2;", &mut heap, &mut strings).unwrap();
        let text = disassemble_chunk(&chunk, &heap, "test");
        assert!(text.contains("== test =="));
        assert!(text.contains("OP_CONSTANT"));
        assert!(text.contains("OP_ADD"));
        assert!(text.contains("OP_RETURN"));
    }

    #[test]
    fn repeated_line_numbers_collapse_to_a_pipe() {
        let mut heap = Heap::new();
        let mut strings = Table::new();
        let chunk = compiler::compile(b"print 1 + 2;", &mut heap, &mut strings).unwrap();
        let text = disassemble_chunk(&chunk, &heap, "test");
        assert!(text.contains("   | "));
    }

    #[test]
    fn string_constants_render_their_content_not_a_placeholder() {
        let mut heap = Heap::new();
        let mut strings = Table::new();
        let chunk = compiler::compile(b"print \"hi\";", &mut heap, &mut strings).unwrap();
        let text = disassemble_chunk(&chunk, &heap, "test");
        assert!(text.contains("'hi'"));
    }
}
