//! Library-level assembly driver: the three passes described in the
//! toolchain spec, decoupled from file IO so they can be exercised directly
//! in tests and reused by both the CLI and (eventually) other embedders.

use crate::code;
use crate::parser::{CommandType, ParserError, ParserLines};
use crate::symbol_table::SymbolTable;

/// Errors that can occur while assembling a single `.asm` source.
#[derive(Debug, thiserror::Error)]
pub enum AssembleError {
    #[error("{0}")]
    Parse(#[from] ParserError),
}

/// Assembles cleaned assembly source lines into 16-bit binary text lines.
///
/// Runs the two-pass design from spec.md §4.6: pass 1 binds every label to
/// its ROM address, pass 2 allocates RAM addresses for variables on first
/// use while emitting machine code. A fresh [`SymbolTable`] is used per
/// call, pre-seeded with the 23 reserved symbols.
///
/// # Errors
/// Returns [`AssembleError`] if a line cannot be parsed into a valid
/// A/C/L-command.
pub fn assemble_lines(lines: &[String]) -> Result<Vec<String>, AssembleError> {
    let mut symbol_table = SymbolTable::new();
    first_pass(lines, &mut symbol_table)?;
    second_pass(lines, &mut symbol_table)
}

/// Pass 1: bind every `(LABEL)` pseudo-instruction to the ROM address of the
/// instruction immediately following it. `L` commands do not advance ROM.
fn first_pass(lines: &[String], symbol_table: &mut SymbolTable) -> Result<(), AssembleError> {
    let mut rom_address = 0u16;
    let mut parser = ParserLines::from_lines(lines);

    while parser.advance() {
        match parser.command_type()? {
            CommandType::LCommand => {
                let symbol = parser.symbol()?;
                symbol_table.add_entry(symbol, rom_address);
            }
            CommandType::ACommand | CommandType::CCommand => {
                rom_address += 1;
            }
        }
    }

    Ok(())
}

/// Pass 2: resolve every A-instruction's symbol (allocating a fresh RAM
/// address on first use starting at 16) and emit binary for every A/C
/// instruction, in source order.
fn second_pass(
    lines: &[String],
    symbol_table: &mut SymbolTable,
) -> Result<Vec<String>, AssembleError> {
    let mut ram_address = 16u16;
    let mut parser = ParserLines::from_lines(lines);
    let mut output = Vec::with_capacity(lines.len());

    while parser.advance() {
        match parser.command_type()? {
            CommandType::ACommand => {
                let symbol = parser.symbol()?;
                let address = symbol
                    .parse::<u16>()
                    .unwrap_or_else(|_| symbol_table.get_or_insert(symbol, &mut ram_address));
                output.push(code::encode_a_instruction(address));
            }
            CommandType::CCommand => {
                let dest = parser.dest()?.unwrap_or("");
                let comp = parser.comp()?.unwrap_or("");
                let jump = parser.jump()?.unwrap_or("");
                output.push(code::encode_c_instruction(dest, comp, jump));
            }
            CommandType::LCommand => {
                // Pseudo-instruction: already bound to a ROM address in
                // pass 1, emits nothing here.
            }
        }
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(src: &[&str]) -> Vec<String> {
        src.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn assembles_a_and_c_instructions() {
        let out = assemble_lines(&lines(&["@5", "D=D+A", "@5", "0;JMP"])).unwrap();
        assert_eq!(out[0], "0000000000000101");
        assert_eq!(out[1], "1110000010010001");
    }

    #[test]
    fn allocates_variables_from_sixteen() {
        let out = assemble_lines(&lines(&["@i", "M=0", "@i", "M=M+1"])).unwrap();
        assert_eq!(out[0], "0000000000010000");
        assert_eq!(out[2], "0000000000010000");
    }

    #[test]
    fn labels_resolve_to_rom_addresses_without_advancing_rom() {
        let out = assemble_lines(&lines(&[
            "(LOOP)", "@LOOP", "0;JMP", // single real instruction after the label
        ]))
        .unwrap();
        // LOOP binds to ROM address 0 (the instruction right after it).
        assert_eq!(out[0], "0000000000000000");
    }

    #[test]
    fn every_output_line_is_sixteen_bits() {
        let out = assemble_lines(&lines(&[
            "@16384", "M=0", "(END)", "@END", "0;JMP", "@R13", "MD=M-1;JGT",
        ]))
        .unwrap();
        for line in &out {
            assert_eq!(line.len(), 16);
            assert!(line.chars().all(|c| c == '0' || c == '1'));
        }
    }

    #[test]
    fn identical_input_produces_identical_output() {
        let src = lines(&["@counter", "M=M+1", "@counter", "D=M", "@100", "D;JLT"]);
        let first = assemble_lines(&src).unwrap();
        let second = assemble_lines(&src).unwrap();
        assert_eq!(first, second);
    }
}
