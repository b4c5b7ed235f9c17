// File: src/compiler.rs
//
// Single-pass Pratt compiler: tokens in, bytecode out, no intervening
// AST. `parse_precedence` is the whole expression parser; statements
// are a thin dispatcher on top of it. `canAssign` threads through the
// recursion so `a = b = c` parses (right-associative) while
// `a + b = c` is rejected.

use crate::chunk::{Chunk, OpCode};
use crate::error::{CompileError, Diagnostic};
use crate::object::{self, Heap};
use crate::scanner::{Scanner, Token, TokenType};
use crate::table::Table;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Precedence {
    None,
    Assignment, // =
    Or,         // ||
    And,        // &&
    Equality,   // == !=
    Comparison, // < > <= >=
    Term,       // + -
    Factor,     // * /
    Unary,      // ! -
    Call,       // ( )
    Primary,
}

impl Precedence {
    fn next(self) -> Self {
        use Precedence::*;
        match self {
            None => Assignment,
            Assignment => Or,
            Or => And,
            And => Equality,
            Equality => Comparison,
            Comparison => Term,
            Term => Factor,
            Factor => Unary,
            Unary => Call,
            Call => Primary,
            Primary => Primary,
        }
    }
}

/// Binding power of `kind` used as an infix operator; `Precedence::None`
/// for tokens with no infix role (the "everything else: None" row).
fn infix_precedence(kind: TokenType) -> Precedence {
    use TokenType::*;
    match kind {
        Minus | Plus => Precedence::Term,
        Slash | Star => Precedence::Factor,
        BangEqual | EqualEqual => Precedence::Equality,
        Less | LessEqual | Greater | GreaterEqual => Precedence::Comparison,
        _ => Precedence::None,
    }
}

fn has_prefix_rule(kind: TokenType) -> bool {
    use TokenType::*;
    matches!(
        kind,
        LeftParen | Minus | Bang | Identifier | String | Number | False | Null | True
    )
}

fn has_infix_rule(kind: TokenType) -> bool {
    infix_precedence(kind) != Precedence::None
}

pub struct Compiler<'src, 'heap> {
    scanner: Scanner<'src>,
    previous: Token<'src>,
    current: Token<'src>,
    had_error: bool,
    panic_mode: bool,
    diagnostics: Vec<Diagnostic>,
    chunk: Chunk,
    heap: &'heap mut Heap,
    strings: &'heap mut Table,
}

/// Compiles `source` into a `Chunk`, interning any string/identifier
/// constants into `heap`/`strings` as it goes (shared with the VM that
/// will later run the chunk, so constants are ready to use immediately).
pub fn compile<'src, 'heap>(
    source: &'src [u8],
    heap: &'heap mut Heap,
    strings: &'heap mut Table,
) -> Result<Chunk, CompileError> {
    let dummy = Token { kind: TokenType::Eof, lexeme: &[], line: 0 };
    let mut compiler = Compiler {
        scanner: Scanner::new(source),
        previous: dummy,
        current: dummy,
        had_error: false,
        panic_mode: false,
        diagnostics: Vec::new(),
        chunk: Chunk::new(),
        heap,
        strings,
    };

    compiler.advance();
    while !compiler.check(TokenType::Eof) {
        compiler.declaration();
    }
    compiler.emit_op(OpCode::Return);

    if compiler.had_error {
        Err(CompileError(compiler.diagnostics))
    } else {
        Ok(compiler.chunk)
    }
}

impl<'src, 'heap> Compiler<'src, 'heap> {
    // --- token stream plumbing -------------------------------------

    fn advance(&mut self) {
        self.previous = self.current;
        loop {
            self.current = self.scanner.next_token();
            if self.current.kind != TokenType::Error {
                break;
            }
            let message = String::from_utf8_lossy(self.current.lexeme).into_owned();
            self.error_at_current(&message);
        }
    }

    fn check(&self, kind: TokenType) -> bool {
        self.current.kind == kind
    }

    fn match_token(&mut self, kind: TokenType) -> bool {
        if !self.check(kind) {
            return false;
        }
        self.advance();
        true
    }

    fn consume(&mut self, kind: TokenType, message: &str) {
        if self.current.kind == kind {
            self.advance();
        } else {
            self.error_at_current(message);
        }
    }

    // --- error reporting ---------------------------------------------

    fn error_at_current(&mut self, message: &str) {
        let token = self.current;
        self.error_at(token, message);
    }

    fn error(&mut self, message: &str) {
        let token = self.previous;
        self.error_at(token, message);
    }

    fn error_at(&mut self, token: Token<'src>, message: &str) {
        if self.panic_mode {
            return;
        }
        self.panic_mode = true;
        self.had_error = true;

        let location = match token.kind {
            TokenType::Eof => " at end".to_string(),
            TokenType::Error => String::new(),
            _ => format!(" at '{}'", String::from_utf8_lossy(token.lexeme)),
        };
        self.diagnostics.push(Diagnostic::new(token.line, format!("Error{}: {}", location, message)));
    }

    fn synchronize(&mut self) {
        self.panic_mode = false;
        while self.current.kind != TokenType::Eof {
            if self.previous.kind == TokenType::Semicolon {
                return;
            }
            use TokenType::*;
            if matches!(self.current.kind, Class | Function | Let | For | If | While | Print | Return) {
                return;
            }
            self.advance();
        }
    }

    // --- bytecode emission --------------------------------------------

    fn emit_byte(&mut self, byte: u8) {
        let line = self.previous.line;
        self.chunk.write_byte(byte, line);
    }

    fn emit_op(&mut self, op: OpCode) {
        self.emit_byte(op as u8);
    }

    fn emit_bytes(&mut self, a: u8, b: u8) {
        self.emit_byte(a);
        self.emit_byte(b);
    }

    fn make_constant(&mut self, value: Value) -> u8 {
        match self.chunk.add_constant(value) {
            Some(index) => index,
            None => {
                self.error("Too many constants in one chunk.");
                0
            }
        }
    }

    fn emit_constant(&mut self, value: Value) {
        let index = self.make_constant(value);
        self.emit_bytes(OpCode::Constant as u8, index);
    }

    fn identifier_constant(&mut self, name: &[u8]) -> u8 {
        let handle = object::intern(self.heap, self.strings, name);
        self.make_constant(Value::Obj(handle))
    }

    // --- declarations and statements -----------------------------------

    fn declaration(&mut self) {
        if self.match_token(TokenType::Let) {
            self.let_declaration();
        } else {
            self.statement();
        }
        if self.panic_mode {
            self.synchronize();
        }
    }

    fn let_declaration(&mut self) {
        self.consume(TokenType::Identifier, "Expect variable name.");
        let name = self.previous.lexeme.to_vec();
        let global = self.identifier_constant(&name);

        if self.match_token(TokenType::Equal) {
            self.expression();
        } else {
            self.emit_op(OpCode::Null);
        }
        self.consume(TokenType::Semicolon, "Expect ';' after variable declaration.");
        self.emit_bytes(OpCode::DefineGlobal as u8, global);
    }

    fn statement(&mut self) {
        if self.match_token(TokenType::Print) {
            self.print_statement();
        } else {
            self.expression_statement();
        }
    }

    fn print_statement(&mut self) {
        self.expression();
        self.consume(TokenType::Semicolon, "Expect ';' after value.");
        self.emit_op(OpCode::Print);
    }

    fn expression_statement(&mut self) {
        self.expression();
        self.consume(TokenType::Semicolon, "Expect ';' after expression.");
        self.emit_op(OpCode::Pop);
    }

    // --- expressions -----------------------------------------------------

    fn expression(&mut self) {
        self.parse_precedence(Precedence::Assignment);
    }

    fn parse_precedence(&mut self, precedence: Precedence) {
        self.advance();
        if !has_prefix_rule(self.previous.kind) {
            self.error("Expect expression.");
            return;
        }
        let can_assign = precedence <= Precedence::Assignment;
        self.prefix(self.previous.kind, can_assign);

        while precedence <= infix_precedence(self.current.kind) && has_infix_rule(self.current.kind) {
            self.advance();
            self.infix(self.previous.kind, can_assign);
        }

        if can_assign && self.match_token(TokenType::Equal) {
            self.error("Invalid assignment target.");
        }
    }

    fn prefix(&mut self, kind: TokenType, can_assign: bool) {
        use TokenType::*;
        match kind {
            LeftParen => self.grouping(),
            Minus | Bang => self.unary(kind),
            Identifier => self.variable(can_assign),
            String => self.string(),
            Number => self.number(),
            False | Null | True => self.literal(kind),
            _ => unreachable!("prefix() called for a token with no prefix rule"),
        }
    }

    fn infix(&mut self, kind: TokenType, _can_assign: bool) {
        self.binary(kind);
    }

    fn grouping(&mut self) {
        self.expression();
        self.consume(TokenType::RightParen, "Expect ')' after expression.");
    }

    fn unary(&mut self, operator: TokenType) {
        self.parse_precedence(Precedence::Unary);
        match operator {
            TokenType::Minus => self.emit_op(OpCode::Negate),
            TokenType::Bang => self.emit_op(OpCode::Not),
            _ => unreachable!(),
        }
    }

    fn binary(&mut self, operator: TokenType) {
        let precedence = infix_precedence(operator);
        self.parse_precedence(precedence.next());
        match operator {
            TokenType::Plus => self.emit_op(OpCode::Add),
            TokenType::Minus => self.emit_op(OpCode::Subtract),
            TokenType::Star => self.emit_op(OpCode::Multiply),
            TokenType::Slash => self.emit_op(OpCode::Divide),
            TokenType::BangEqual => {
                self.emit_op(OpCode::Equal);
                self.emit_op(OpCode::Not);
            }
            TokenType::EqualEqual => self.emit_op(OpCode::Equal),
            TokenType::Greater => self.emit_op(OpCode::Greater),
            TokenType::GreaterEqual => {
                self.emit_op(OpCode::Less);
                self.emit_op(OpCode::Not);
            }
            TokenType::Less => self.emit_op(OpCode::Less),
            TokenType::LessEqual => {
                self.emit_op(OpCode::Greater);
                self.emit_op(OpCode::Not);
            }
            _ => unreachable!(),
        }
    }

    fn number(&mut self) {
        let text = std::str::from_utf8(self.previous.lexeme).expect("scanner only emits ASCII digits");
        let value: f64 = text.parse().expect("scanner only emits well-formed numeric lexemes");
        self.emit_constant(Value::Number(value));
    }

    fn string(&mut self) {
        let lexeme = self.previous.lexeme;
        let trimmed = &lexeme[1..lexeme.len() - 1];
        let handle = object::intern(self.heap, self.strings, trimmed);
        self.emit_constant(Value::Obj(handle));
    }

    fn literal(&mut self, kind: TokenType) {
        match kind {
            TokenType::False => self.emit_op(OpCode::False),
            TokenType::Null => self.emit_op(OpCode::Null),
            TokenType::True => self.emit_op(OpCode::True),
            _ => unreachable!(),
        }
    }

    fn variable(&mut self, can_assign: bool) {
        let name = self.previous.lexeme.to_vec();
        let arg = self.identifier_constant(&name);

        if can_assign && self.match_token(TokenType::Equal) {
            self.expression();
            self.emit_bytes(OpCode::SetGlobal as u8, arg);
        } else {
            self.emit_bytes(OpCode::GetGlobal as u8, arg);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::MAX_CONSTANTS;

    fn compile_ok(src: &str) -> Chunk {
        let mut heap = Heap::new();
        let mut strings = Table::new();
        compile(src.as_bytes(), &mut heap, &mut strings).expect("should compile")
    }

    fn compile_err(src: &str) -> CompileError {
        let mut heap = Heap::new();
        let mut strings = Table::new();
        compile(src.as_bytes(), &mut heap, &mut strings).expect_err("should fail to compile")
    }

    #[test]
    fn emits_trailing_return() {
        let chunk = compile_ok("1;");
        assert_eq!(*chunk.code.last().unwrap(), OpCode::Return as u8);
    }

    #[test]
    fn code_and_lines_stay_parallel_after_compiling() {
        let chunk = compile_ok("let a = 1;\nlet b = 2;\nprint a + b;\n");
        assert_eq!(chunk.code.len(), chunk.lines.len());
    }

    #[test]
    fn unexpected_character_is_a_compile_error() {
        let err = compile_err("print 1 & 2;");
        assert!(err.0[0].message.contains("Unexpected character."));
    }

    #[test]
    fn invalid_assignment_target_is_rejected() {
        let err = compile_err("print a + b = 3;");
        assert!(err.0.iter().any(|d| d.message.contains("Invalid assignment target.")));
    }

    #[test]
    fn too_many_constants_is_reported() {
        let mut src = String::new();
        for i in 0..=MAX_CONSTANTS {
            src.push_str(&format!("print {};\n", i));
        }
        let err = compile_err(&src);
        assert!(err.0.iter().any(|d| d.message.contains("Too many constants in one chunk.")));
    }

    #[test]
    fn panic_mode_suppresses_cascading_errors_until_semicolon() {
        // Two malformed statements; panic mode should report the first
        // construct's problem and then resynchronize at `;`, reporting
        // only one more error for the second, not several for the same
        // construct.
        let err = compile_err("print ;\nlet ; print 1;");
        assert!(err.0.len() <= 3);
    }
}
