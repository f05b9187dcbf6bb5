//! Compiler from the Jack language to Hack VM code.
//!
//! The crate consists of four modules:
//! - [`tokenizer`]: lexes Jack source text into tokens.
//! - [`symbol_table`]: tracks class- and subroutine-scoped identifiers.
//! - [`vm_writer`]: emits VM commands.
//! - [`compilation_engine`]: recursive-descent parser driving code generation.

#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

pub mod compilation_engine;
pub mod symbol_table;
pub mod tokenizer;
pub mod vm_writer;

pub use compilation_engine::{CompileError, CompilationEngine};
pub use symbol_table::{Kind, SymbolTable};
pub use tokenizer::{Keyword, LexError, Token, Tokenizer};
pub use vm_writer::VmWriter;

/// Compiles one Jack source file's text into VM commands.
pub fn compile(source: &str) -> Result<Vec<String>, CompileError> {
    let tokenizer = Tokenizer::new(source)?;
    let mut engine = CompilationEngine::new(tokenizer, Vec::new());
    engine.compile_class()?;
    Ok(bytes_to_lines(engine.into_inner()))
}

fn bytes_to_lines(bytes: Vec<u8>) -> Vec<String> {
    String::from_utf8_lossy(&bytes)
        .lines()
        .map(str::to_string)
        .collect()
}
