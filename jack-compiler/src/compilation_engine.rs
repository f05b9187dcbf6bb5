//! Recursive-descent parser that compiles a single Jack class directly to
//! VM commands (no intermediate parse tree).

use crate::symbol_table::{Kind, SymbolTable};
use crate::tokenizer::{Keyword, LexError, Token, Tokenizer};
use crate::vm_writer::{ArithmeticCommand, Segment, VmWriter};
use std::io::Write;

#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("unexpected end of input")]
    UnexpectedEof,
    #[error("expected symbol '{expected}', found {found}")]
    ExpectedSymbol { expected: char, found: String },
    #[error("expected an identifier, found {0}")]
    ExpectedIdentifier(String),
    #[error("expected a type, found {0}")]
    ExpectedType(String),
    #[error("unexpected token {0}")]
    UnexpectedToken(String),
    #[error("reference to undeclared identifier `{0}`")]
    UnknownIdentifier(String),
}

fn segment_for(kind: Kind) -> Segment {
    match kind {
        Kind::Static => Segment::Static,
        Kind::Field => Segment::This,
        Kind::Arg => Segment::Argument,
        Kind::Var => Segment::Local,
    }
}

pub struct CompilationEngine<W: Write> {
    tokenizer: Tokenizer,
    symbol_table: SymbolTable,
    vm: VmWriter<W>,
    class_name: String,
    label_counter: u64,
}

impl<W: Write> CompilationEngine<W> {
    pub fn new(tokenizer: Tokenizer, out: W) -> Self {
        CompilationEngine {
            tokenizer,
            symbol_table: SymbolTable::new(),
            vm: VmWriter::new(out),
            class_name: String::new(),
            label_counter: 0,
        }
    }

    #[must_use]
    pub fn into_inner(self) -> W {
        self.vm.into_inner()
    }

    fn current(&self) -> Result<&Token, CompileError> {
        self.tokenizer.current().ok_or(CompileError::UnexpectedEof)
    }

    fn current_is_symbol(&self, c: char) -> bool {
        matches!(self.tokenizer.current(), Some(Token::Symbol(s)) if *s == c)
    }

    fn current_is_keyword(&self, k: Keyword) -> bool {
        matches!(self.tokenizer.current(), Some(Token::Keyword(kw)) if *kw == k)
    }

    fn current_is_subroutine_keyword(&self) -> bool {
        matches!(
            self.tokenizer.current(),
            Some(Token::Keyword(Keyword::Constructor | Keyword::Function | Keyword::Method))
        )
    }

    fn process_symbol(&mut self, expected: char) -> Result<(), CompileError> {
        match self.current()?.clone() {
            Token::Symbol(c) if c == expected => {
                self.tokenizer.advance();
                Ok(())
            }
            other => Err(CompileError::ExpectedSymbol {
                expected,
                found: format!("{other:?}"),
            }),
        }
    }

    fn process_keyword_in(&mut self, allowed: &[Keyword]) -> Result<Keyword, CompileError> {
        match self.current()?.clone() {
            Token::Keyword(kw) if allowed.contains(&kw) => {
                self.tokenizer.advance();
                Ok(kw)
            }
            other => Err(CompileError::UnexpectedToken(format!("{other:?}"))),
        }
    }

    fn process_keyword(&mut self, kw: Keyword) -> Result<(), CompileError> {
        self.process_keyword_in(&[kw]).map(|_| ())
    }

    fn process_identifier(&mut self) -> Result<String, CompileError> {
        match self.current()?.clone() {
            Token::Identifier(name) => {
                self.tokenizer.advance();
                Ok(name)
            }
            other => Err(CompileError::ExpectedIdentifier(format!("{other:?}"))),
        }
    }

    fn parse_type(&mut self) -> Result<String, CompileError> {
        match self.current()?.clone() {
            Token::Keyword(Keyword::Int) => {
                self.tokenizer.advance();
                Ok("int".to_string())
            }
            Token::Keyword(Keyword::Char) => {
                self.tokenizer.advance();
                Ok("char".to_string())
            }
            Token::Keyword(Keyword::Boolean) => {
                self.tokenizer.advance();
                Ok("boolean".to_string())
            }
            Token::Identifier(name) => {
                self.tokenizer.advance();
                Ok(name)
            }
            other => Err(CompileError::ExpectedType(format!("{other:?}"))),
        }
    }

    fn parse_return_type(&mut self) -> Result<String, CompileError> {
        if self.current_is_keyword(Keyword::Void) {
            self.tokenizer.advance();
            return Ok("void".to_string());
        }
        self.parse_type()
    }

    fn next_label(&mut self, base: &str) -> String {
        let n = self.label_counter;
        self.label_counter += 1;
        format!("{base}_{n}")
    }

    fn push_variable(&mut self, kind: Kind, index: u16) -> Result<(), CompileError> {
        self.vm.write_push(segment_for(kind), index)?;
        Ok(())
    }

    fn pop_variable(&mut self, kind: Kind, index: u16) -> Result<(), CompileError> {
        self.vm.write_pop(segment_for(kind), index)?;
        Ok(())
    }

    /// Loads the first token and compiles the whole class.
    pub fn compile_class(&mut self) -> Result<(), CompileError> {
        self.tokenizer.advance();
        self.process_keyword(Keyword::Class)?;
        self.class_name = self.process_identifier()?;
        self.process_symbol('{')?;
        while self.current_is_keyword(Keyword::Static) || self.current_is_keyword(Keyword::Field) {
            self.compile_class_var_dec()?;
        }
        while self.current_is_subroutine_keyword() {
            self.compile_subroutine()?;
        }
        self.process_symbol('}')?;
        self.vm.flush()?;
        Ok(())
    }

    fn compile_class_var_dec(&mut self) -> Result<(), CompileError> {
        let kw = self.process_keyword_in(&[Keyword::Static, Keyword::Field])?;
        let kind = if kw == Keyword::Static {
            Kind::Static
        } else {
            Kind::Field
        };
        let ty = self.parse_type()?;
        loop {
            let name = self.process_identifier()?;
            self.symbol_table.define(&name, &ty, kind);
            if self.current_is_symbol(',') {
                self.process_symbol(',')?;
            } else {
                break;
            }
        }
        self.process_symbol(';')?;
        Ok(())
    }

    fn compile_subroutine(&mut self) -> Result<(), CompileError> {
        let kind_kw = self.process_keyword_in(&[Keyword::Constructor, Keyword::Function, Keyword::Method])?;
        self.symbol_table.start_subroutine();
        if kind_kw == Keyword::Method {
            let class_name = self.class_name.clone();
            self.symbol_table.define("this", &class_name, Kind::Arg);
        }
        let _return_type = self.parse_return_type()?;
        let name = self.process_identifier()?;
        self.process_symbol('(')?;
        self.compile_parameter_list()?;
        self.process_symbol(')')?;
        self.process_symbol('{')?;
        while self.current_is_keyword(Keyword::Var) {
            self.compile_var_dec()?;
        }
        let n_locals = self.symbol_table.var_count(Kind::Var);
        self.vm
            .write_function(&format!("{}.{name}", self.class_name), n_locals)?;
        match kind_kw {
            Keyword::Constructor => {
                let n_fields = self.symbol_table.var_count(Kind::Field);
                self.vm.write_push(Segment::Constant, n_fields)?;
                self.vm.write_call("Memory.alloc", 1)?;
                self.vm.write_pop(Segment::Pointer, 0)?;
            }
            Keyword::Method => {
                self.vm.write_push(Segment::Argument, 0)?;
                self.vm.write_pop(Segment::Pointer, 0)?;
            }
            _ => {}
        }
        self.compile_statements()?;
        self.process_symbol('}')?;
        Ok(())
    }

    fn compile_parameter_list(&mut self) -> Result<(), CompileError> {
        if self.current_is_symbol(')') {
            return Ok(());
        }
        loop {
            let ty = self.parse_type()?;
            let name = self.process_identifier()?;
            self.symbol_table.define(&name, &ty, Kind::Arg);
            if self.current_is_symbol(',') {
                self.process_symbol(',')?;
            } else {
                break;
            }
        }
        Ok(())
    }

    fn compile_var_dec(&mut self) -> Result<(), CompileError> {
        self.process_keyword(Keyword::Var)?;
        let ty = self.parse_type()?;
        loop {
            let name = self.process_identifier()?;
            self.symbol_table.define(&name, &ty, Kind::Var);
            if self.current_is_symbol(',') {
                self.process_symbol(',')?;
            } else {
                break;
            }
        }
        self.process_symbol(';')?;
        Ok(())
    }

    fn compile_statements(&mut self) -> Result<(), CompileError> {
        loop {
            match self.tokenizer.current() {
                Some(Token::Keyword(Keyword::Let)) => self.compile_let()?,
                Some(Token::Keyword(Keyword::If)) => self.compile_if()?,
                Some(Token::Keyword(Keyword::While)) => self.compile_while()?,
                Some(Token::Keyword(Keyword::Do)) => self.compile_do()?,
                Some(Token::Keyword(Keyword::Return)) => self.compile_return()?,
                _ => break,
            }
        }
        Ok(())
    }

    fn compile_do(&mut self) -> Result<(), CompileError> {
        self.process_keyword(Keyword::Do)?;
        let name = self.process_identifier()?;
        self.compile_subroutine_call_tail(name)?;
        self.process_symbol(';')?;
        self.vm.write_pop(Segment::Temp, 0)?;
        Ok(())
    }

    /// Compiles the `(args)` / `.name(args)` tail of a subroutine call whose
    /// leading identifier has already been consumed. Resolves the call to
    /// one of three forms: an implicit call on `this`, a call through an
    /// object variable, or a direct call on a class/module name.
    fn compile_subroutine_call_tail(&mut self, name: String) -> Result<(), CompileError> {
        if self.current_is_symbol('.') {
            self.process_symbol('.')?;
            let method_name = self.process_identifier()?;
            self.process_symbol('(')?;
            let n_args = if let Some(kind) = self.symbol_table.kind_of(&name) {
                let index = self.symbol_table.index_of(&name).unwrap();
                self.push_variable(kind, index)?;
                1 + self.compile_expression_list()?
            } else {
                self.compile_expression_list()?
            };
            self.process_symbol(')')?;
            let callee_type = self
                .symbol_table
                .type_of(&name)
                .map_or_else(|| name.clone(), ToString::to_string);
            self.vm.write_call(&format!("{callee_type}.{method_name}"), n_args)?;
        } else {
            self.process_symbol('(')?;
            self.vm.write_push(Segment::Pointer, 0)?;
            let n_args = 1 + self.compile_expression_list()?;
            self.process_symbol(')')?;
            self.vm
                .write_call(&format!("{}.{name}", self.class_name), n_args)?;
        }
        Ok(())
    }

    fn compile_let(&mut self) -> Result<(), CompileError> {
        self.process_keyword(Keyword::Let)?;
        let name = self.process_identifier()?;
        let kind = self
            .symbol_table
            .kind_of(&name)
            .ok_or_else(|| CompileError::UnknownIdentifier(name.clone()))?;
        let index = self.symbol_table.index_of(&name).unwrap();
        if self.current_is_symbol('[') {
            self.process_symbol('[')?;
            self.compile_expression()?;
            self.process_symbol(']')?;
            self.push_variable(kind, index)?;
            self.vm.write_arithmetic(ArithmeticCommand::Add)?;
            self.process_symbol('=')?;
            self.compile_expression()?;
            self.process_symbol(';')?;
            self.vm.write_pop(Segment::Temp, 0)?;
            self.vm.write_pop(Segment::Pointer, 1)?;
            self.vm.write_push(Segment::Temp, 0)?;
            self.vm.write_pop(Segment::That, 0)?;
        } else {
            self.process_symbol('=')?;
            self.compile_expression()?;
            self.process_symbol(';')?;
            self.pop_variable(kind, index)?;
        }
        Ok(())
    }

    fn compile_while(&mut self) -> Result<(), CompileError> {
        let start = self.next_label("WHILE_START");
        let end = self.next_label("WHILE_END");
        self.process_keyword(Keyword::While)?;
        self.vm.write_label(&start)?;
        self.process_symbol('(')?;
        self.compile_expression()?;
        self.process_symbol(')')?;
        self.vm.write_arithmetic(ArithmeticCommand::Not)?;
        self.vm.write_if(&end)?;
        self.process_symbol('{')?;
        self.compile_statements()?;
        self.process_symbol('}')?;
        self.vm.write_goto(&start)?;
        self.vm.write_label(&end)?;
        Ok(())
    }

    fn compile_if(&mut self) -> Result<(), CompileError> {
        let else_label = self.next_label("IF_ELSE");
        let end_label = self.next_label("IF_END");
        self.process_keyword(Keyword::If)?;
        self.process_symbol('(')?;
        self.compile_expression()?;
        self.process_symbol(')')?;
        self.vm.write_arithmetic(ArithmeticCommand::Not)?;
        self.vm.write_if(&else_label)?;
        self.process_symbol('{')?;
        self.compile_statements()?;
        self.process_symbol('}')?;
        self.vm.write_goto(&end_label)?;
        self.vm.write_label(&else_label)?;
        if self.current_is_keyword(Keyword::Else) {
            self.process_keyword(Keyword::Else)?;
            self.process_symbol('{')?;
            self.compile_statements()?;
            self.process_symbol('}')?;
        }
        self.vm.write_label(&end_label)?;
        Ok(())
    }

    fn compile_return(&mut self) -> Result<(), CompileError> {
        self.process_keyword(Keyword::Return)?;
        if self.current_is_symbol(';') {
            self.vm.write_push(Segment::Constant, 0)?;
        } else {
            self.compile_expression()?;
        }
        self.process_symbol(';')?;
        self.vm.write_return()?;
        Ok(())
    }

    fn compile_expression(&mut self) -> Result<(), CompileError> {
        self.compile_term()?;
        while let Some(op) = self.current_binary_op() {
            self.tokenizer.advance();
            self.compile_term()?;
            self.emit_op(op)?;
        }
        Ok(())
    }

    fn current_binary_op(&self) -> Option<char> {
        match self.tokenizer.current() {
            Some(Token::Symbol(c)) if "+-*/&|<>=^#".contains(*c) => Some(*c),
            _ => None,
        }
    }

    fn emit_op(&mut self, op: char) -> Result<(), CompileError> {
        match op {
            '+' => self.vm.write_arithmetic(ArithmeticCommand::Add)?,
            '-' => self.vm.write_arithmetic(ArithmeticCommand::Sub)?,
            '*' => self.vm.write_call("Math.multiply", 2)?,
            '/' => self.vm.write_call("Math.divide", 2)?,
            '&' => self.vm.write_arithmetic(ArithmeticCommand::And)?,
            '|' => self.vm.write_arithmetic(ArithmeticCommand::Or)?,
            '<' => self.vm.write_arithmetic(ArithmeticCommand::Lt)?,
            '>' => self.vm.write_arithmetic(ArithmeticCommand::Gt)?,
            '=' => self.vm.write_arithmetic(ArithmeticCommand::Eq)?,
            '^' => self.vm.write_arithmetic(ArithmeticCommand::Shiftleft)?,
            '#' => self.vm.write_arithmetic(ArithmeticCommand::Shiftright)?,
            _ => unreachable!("current_binary_op only yields known operators"),
        }
        Ok(())
    }

    fn compile_string_constant(&mut self, s: &str) -> Result<(), CompileError> {
        #[allow(clippy::cast_possible_truncation)]
        let len = s.chars().count() as u16;
        self.vm.write_push(Segment::Constant, len)?;
        self.vm.write_call("String.new", 1)?;
        for ch in s.chars() {
            self.vm.write_push(Segment::Constant, u16::from(ch as u8))?;
            self.vm.write_call("String.appendChar", 2)?;
        }
        Ok(())
    }

    fn compile_term(&mut self) -> Result<(), CompileError> {
        match self.current()?.clone() {
            Token::IntConst(n) => {
                self.tokenizer.advance();
                self.vm.write_push(Segment::Constant, n)?;
            }
            Token::StringConst(s) => {
                self.tokenizer.advance();
                self.compile_string_constant(&s)?;
            }
            Token::Keyword(Keyword::True) => {
                self.tokenizer.advance();
                self.vm.write_push(Segment::Constant, 0)?;
                self.vm.write_arithmetic(ArithmeticCommand::Not)?;
            }
            Token::Keyword(Keyword::False | Keyword::Null) => {
                self.tokenizer.advance();
                self.vm.write_push(Segment::Constant, 0)?;
            }
            Token::Keyword(Keyword::This) => {
                self.tokenizer.advance();
                self.vm.write_push(Segment::Pointer, 0)?;
            }
            Token::Symbol('(') => {
                self.process_symbol('(')?;
                self.compile_expression()?;
                self.process_symbol(')')?;
            }
            Token::Symbol(c @ ('-' | '~')) => {
                self.tokenizer.advance();
                self.compile_term()?;
                if c == '-' {
                    self.vm.write_arithmetic(ArithmeticCommand::Neg)?;
                } else {
                    self.vm.write_arithmetic(ArithmeticCommand::Not)?;
                }
            }
            Token::Identifier(name) => {
                self.tokenizer.advance();
                if self.current_is_symbol('[') {
                    let kind = self
                        .symbol_table
                        .kind_of(&name)
                        .ok_or_else(|| CompileError::UnknownIdentifier(name.clone()))?;
                    let index = self.symbol_table.index_of(&name).unwrap();
                    self.process_symbol('[')?;
                    self.compile_expression()?;
                    self.process_symbol(']')?;
                    self.push_variable(kind, index)?;
                    self.vm.write_arithmetic(ArithmeticCommand::Add)?;
                    self.vm.write_pop(Segment::Pointer, 1)?;
                    self.vm.write_push(Segment::That, 0)?;
                } else if self.current_is_symbol('(') || self.current_is_symbol('.') {
                    self.compile_subroutine_call_tail(name)?;
                } else {
                    let kind = self
                        .symbol_table
                        .kind_of(&name)
                        .ok_or_else(|| CompileError::UnknownIdentifier(name.clone()))?;
                    let index = self.symbol_table.index_of(&name).unwrap();
                    self.push_variable(kind, index)?;
                }
            }
            other => return Err(CompileError::UnexpectedToken(format!("{other:?}"))),
        }
        Ok(())
    }

    fn compile_expression_list(&mut self) -> Result<u16, CompileError> {
        if self.current_is_symbol(')') {
            return Ok(0);
        }
        let mut count: u16 = 0;
        self.compile_expression()?;
        count += 1;
        while self.current_is_symbol(',') {
            self.process_symbol(',')?;
            self.compile_expression()?;
            count += 1;
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(src: &str) -> Vec<String> {
        let tokenizer = Tokenizer::new(src).unwrap();
        let mut engine = CompilationEngine::new(tokenizer, Vec::new());
        engine.compile_class().unwrap();
        String::from_utf8(engine.into_inner())
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn empty_void_function_returns_zero() {
        let out = compile("class Main { function void main() { return; } }");
        assert_eq!(
            out,
            vec!["function Main.main 0", "push constant 0", "return"]
        );
    }

    #[test]
    fn constructor_allocates_memory_for_its_fields() {
        let out = compile(
            "class Point { field int x, y; constructor Point new(int ax, int ay) { let x = ax; let y = ay; return this; } }",
        );
        assert_eq!(out[0], "function Point.new 0");
        assert_eq!(out[1], "push constant 2");
        assert_eq!(out[2], "call Memory.alloc 1");
        assert_eq!(out[3], "pop pointer 0");
        assert!(out.contains(&"push pointer 0".to_string()));
        assert!(out.contains(&"return".to_string()));
    }

    #[test]
    fn method_pulls_this_from_argument_zero() {
        let out = compile(
            "class Point { field int x; method int getX() { return x; } }",
        );
        assert_eq!(out[0], "function Point.getX 0");
        assert_eq!(out[1], "push argument 0");
        assert_eq!(out[2], "pop pointer 0");
        assert!(out.contains(&"push this 0".to_string()));
    }

    #[test]
    fn implicit_method_call_pushes_pointer_zero_as_first_arg() {
        let out = compile(
            "class Main { function void main() { do draw(); return; } method void draw() { return; } }",
        );
        assert!(out.contains(&"push pointer 0".to_string()));
        assert!(out.contains(&"call Main.draw 1".to_string()));
    }

    #[test]
    fn call_on_object_variable_resolves_via_its_declared_type() {
        let out = compile(
            "class Main { function void main() { var Point p; do p.getX(); return; } }",
        );
        assert!(out.contains(&"push local 0".to_string()));
        assert!(out.contains(&"call Point.getX 1".to_string()));
    }

    #[test]
    fn call_on_unresolved_name_is_a_direct_static_call() {
        let out = compile(
            "class Main { function void main() { do Output.println(); return; } }",
        );
        assert!(out.contains(&"call Output.println 0".to_string()));
        assert!(!out.iter().any(|l| l == "push pointer 0"));
    }

    #[test]
    fn array_assignment_uses_temp_and_pointer_one() {
        let out = compile(
            "class Main { function void main() { var Array a; let a[1] = 2; return; } }",
        );
        assert!(out.contains(&"pop temp 0".to_string()));
        assert!(out.contains(&"pop pointer 1".to_string()));
        assert!(out.contains(&"pop that 0".to_string()));
    }

    #[test]
    fn string_literal_expands_to_new_and_append_char_calls() {
        let out = compile(r#"class Main { function void main() { do Output.printString("hi"); return; } }"#);
        assert!(out.contains(&"push constant 2".to_string()));
        assert!(out.contains(&"call String.new 1".to_string()));
        assert!(out.contains(&"call String.appendChar 2".to_string()));
    }

    #[test]
    fn if_else_emits_two_distinct_labels() {
        let out = compile(
            "class Main { function void main() { var int a; if (true) { let a = 1; } else { let a = 2; } return; } }",
        );
        assert!(out.iter().any(|l| l.starts_with("label IF_ELSE")));
        assert!(out.iter().any(|l| l.starts_with("label IF_END")));
    }

    #[test]
    fn binary_shift_operators_map_to_shift_commands() {
        let out = compile("class Main { function void main() { do f(1 ^ 2, 3 # 4); return; } }");
        assert!(out.contains(&"shiftleft".to_string()));
        assert!(out.contains(&"shiftright".to_string()));
    }
}
