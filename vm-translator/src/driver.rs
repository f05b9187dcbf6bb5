//! File-IO-free translation pipeline: cleans VM source text, parses it, and
//! drives a [`CodeWriter`] over it. Exposed separately from `main.rs` so it
//! can be exercised directly by tests and reused for both single-file and
//! whole-directory translation.

use crate::code_writer::{CodeWriter, CodeWriterError};
use crate::parser::{CommandType, Parser, ParserError};
use std::io::Write;

#[derive(Debug, thiserror::Error)]
pub enum TranslateError {
    #[error(transparent)]
    Parser(#[from] ParserError),
    #[error(transparent)]
    CodeWriter(#[from] CodeWriterError),
}

/// Strips `//` comments from each line, leaving blank lines for the parser
/// to skip. Mirrors `hack-assembler`'s byte-scan comment stripping, kept
/// line-oriented (rather than fused into the parser) to match the teacher's
/// habit of small single-purpose passes over source text.
#[must_use]
pub fn clean_lines(lines: &[String]) -> Vec<String> {
    lines
        .iter()
        .map(|line| match line.find("//") {
            Some(pos) => line[..pos].to_string(),
            None => line.clone(),
        })
        .collect()
}

/// Translates a single VM source file's lines into Hack assembly lines, with
/// no bootstrap code. `file_stem` scopes `static` segment references.
pub fn translate_file(file_stem: &str, lines: &[String]) -> Result<Vec<String>, TranslateError> {
    let mut writer = CodeWriter::new(Vec::new());
    writer.set_file_name(file_stem);
    translate_into(&mut writer, lines)?;
    writer.flush()?;
    Ok(bytes_to_lines(writer.into_inner()))
}

/// Translates a whole program: one or more VM files concatenated into a
/// single assembly output, with the bootstrap sequence emitted once up
/// front when `with_bootstrap` is set (the convention for directory/program
/// input; single standalone files are translated without it).
pub fn translate_program(
    files: &[(String, Vec<String>)],
    with_bootstrap: bool,
) -> Result<Vec<String>, TranslateError> {
    let mut writer = CodeWriter::new(Vec::new());
    if with_bootstrap {
        writer.write_init()?;
    }
    for (file_stem, lines) in files {
        writer.set_file_name(file_stem);
        translate_into(&mut writer, lines)?;
    }
    writer.flush()?;
    Ok(bytes_to_lines(writer.into_inner()))
}

fn translate_into<W: Write>(
    writer: &mut CodeWriter<W>,
    lines: &[String],
) -> Result<(), TranslateError> {
    let cleaned = clean_lines(lines);
    let mut parser = Parser::from_lines(&cleaned);

    while parser.advance() {
        match parser.command_type()? {
            CommandType::Arithmetic => writer.write_arithmetic(parser.arg1()?)?,
            CommandType::Push => writer.write_push_pop("push", parser.arg1()?, parser.arg2()?)?,
            CommandType::Pop => writer.write_push_pop("pop", parser.arg1()?, parser.arg2()?)?,
            CommandType::Label => writer.write_label(parser.arg1()?)?,
            CommandType::Goto => writer.write_goto(parser.arg1()?)?,
            CommandType::If => writer.write_if(parser.arg1()?)?,
            CommandType::Function => {
                writer.write_function(parser.arg1()?, parser.arg2()?)?;
            }
            CommandType::Call => writer.write_call(parser.arg1()?, parser.arg2()?)?,
            CommandType::Return => writer.write_return()?,
        }
    }
    Ok(())
}

fn bytes_to_lines(bytes: Vec<u8>) -> Vec<String> {
    String::from_utf8_lossy(&bytes)
        .lines()
        .map(str::to_string)
        .collect()
}
