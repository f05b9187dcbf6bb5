//! Lowers Hack VM commands into Hack assembly.
//!
//! Grounded directly on `CodeWriter.py` from the original course materials:
//! the `add`/`sub`/`and`/`or`/`not`/`neg` translations, the R13/R14
//! scratch-register convention for overflow-safe `eq`/`gt`/`lt`, the
//! `func$label` scoping for `label`/`goto`/`if-goto`, and the five-register
//! call/return frame protocol all follow that reference line for line,
//! rendered as Rust/assembly text instead of Python string concatenation.

use std::io::{self, Write};

#[derive(Debug, thiserror::Error)]
pub enum CodeWriterError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("unknown arithmetic command: {0}")]
    UnknownArithmetic(String),
    #[error("unknown memory segment: {0}")]
    UnknownSegment(String),
}

type Result<T> = std::result::Result<T, CodeWriterError>;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Segment {
    Local,
    Argument,
    This,
    That,
    Temp,
    Pointer,
    Static,
    Constant,
}

impl Segment {
    fn parse(segment: &str) -> Option<Self> {
        Some(match segment {
            "local" => Self::Local,
            "argument" => Self::Argument,
            "this" => Self::This,
            "that" => Self::That,
            "temp" => Self::Temp,
            "pointer" => Self::Pointer,
            "static" => Self::Static,
            "constant" => Self::Constant,
            _ => return None,
        })
    }

    /// The assembly symbol backing the segment's base pointer. Only
    /// meaningful for the four pointer-backed segments.
    fn pointer_symbol(self) -> &'static str {
        match self {
            Self::Local => "LCL",
            Self::Argument => "ARG",
            Self::This => "THIS",
            Self::That => "THAT",
            _ => unreachable!("pointer_symbol only called for segment-pointer segments"),
        }
    }
}

const TEMP_BASE: i32 = 5;

/// Writes translated assembly to `W`, tracking the bits of state the
/// translation needs across commands: a per-file static-variable prefix, the
/// function currently being emitted into (for label scoping), and a
/// monotonic counter for generating unique labels.
pub struct CodeWriter<W: Write> {
    out: W,
    label_counter: u64,
    current_file: String,
    current_function: String,
}

impl<W: Write> CodeWriter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            label_counter: 0,
            current_file: String::from("Unknown"),
            current_function: String::from("null"),
        }
    }

    /// Informs the writer that translation of a new source file has begun,
    /// so `static` references are namespaced per file (`Xxx.i`).
    pub fn set_file_name(&mut self, filename: &str) {
        let stem = std::path::Path::new(filename)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("Unknown");
        self.current_file = stem.to_string();
    }

    /// Emits the bootstrap sequence: `SP=256` followed by `call Sys.init 0`.
    pub fn write_init(&mut self) -> Result<()> {
        writeln!(self.out, "// bootstrap")?;
        writeln!(self.out, "@256")?;
        writeln!(self.out, "D=A")?;
        writeln!(self.out, "@SP")?;
        writeln!(self.out, "M=D")?;
        self.current_function = "Sys.init".to_string();
        self.write_call("Sys.init", 0)
    }

    pub fn write_arithmetic(&mut self, command: &str) -> Result<()> {
        writeln!(self.out, "// {command}")?;
        match command {
            "add" => self.write_binary("M=M+D"),
            "sub" => self.write_binary("M=M-D"),
            "and" => self.write_binary("M=D&M"),
            "or" => self.write_binary("M=D|M"),
            "neg" => self.write_unary("M=-M"),
            "not" => self.write_unary("M=!M"),
            "shiftleft" => self.write_unary("M=M<<"),
            "shiftright" => self.write_unary("M=M>>"),
            "eq" => self.write_eq(),
            "gt" => self.write_gt(),
            "lt" => self.write_lt(),
            other => Err(CodeWriterError::UnknownArithmetic(other.to_string())),
        }
    }

    /// Pops the top value into `D` and applies `op` against the new top of
    /// stack (now in `M`), leaving the result there. `add`/`sub`/`and`/`or`.
    fn write_binary(&mut self, op: &str) -> Result<()> {
        writeln!(self.out, "@SP")?;
        writeln!(self.out, "AM=M-1")?;
        writeln!(self.out, "D=M")?;
        writeln!(self.out, "A=A-1")?;
        writeln!(self.out, "{op}")?;
        Ok(())
    }

    /// Applies `op` in place to the current top of stack. `neg`/`not`/shifts.
    fn write_unary(&mut self, op: &str) -> Result<()> {
        writeln!(self.out, "@SP")?;
        writeln!(self.out, "A=M-1")?;
        writeln!(self.out, "{op}")?;
        Ok(())
    }

    fn next_label(&mut self, tag: &str) -> String {
        let n = self.label_counter;
        self.label_counter += 1;
        format!("{tag}_{n}")
    }

    fn write_eq(&mut self) -> Result<()> {
        let label_true = self.next_label("EQ_TRUE");
        let label_end = self.next_label("EQ_END");
        writeln!(self.out, "@SP")?;
        writeln!(self.out, "AM=M-1")?;
        writeln!(self.out, "D=M")?;
        writeln!(self.out, "A=A-1")?;
        writeln!(self.out, "D=M-D")?;
        writeln!(self.out, "@{label_true}")?;
        writeln!(self.out, "D;JEQ")?;
        writeln!(self.out, "@SP")?;
        writeln!(self.out, "A=M-1")?;
        writeln!(self.out, "M=0")?;
        writeln!(self.out, "@{label_end}")?;
        writeln!(self.out, "0;JMP")?;
        writeln!(self.out, "({label_true})")?;
        writeln!(self.out, "@SP")?;
        writeln!(self.out, "A=M-1")?;
        writeln!(self.out, "M=-1")?;
        writeln!(self.out, "({label_end})")?;
        Ok(())
    }

    /// Overflow-safe `x > y`: branches on the operands' signs before ever
    /// subtracting them, so `D=x-y` only happens when both share a sign and
    /// cannot overflow a 16-bit word. R13 holds `x`, R14 holds `y`.
    fn write_gt(&mut self) -> Result<()> {
        let x_pos = self.next_label("GT_X_POS");
        let end = self.next_label("GT_END");
        let is_false = self.next_label("GT_FALSE");
        let is_true = self.next_label("GT_TRUE");
        let same_sign = self.next_label("GT_SAME_SIGN");

        writeln!(self.out, "@SP")?;
        writeln!(self.out, "AM=M-1")?;
        writeln!(self.out, "D=M")?;
        writeln!(self.out, "@R13")?; // R13 = y
        writeln!(self.out, "M=D")?;
        writeln!(self.out, "@SP")?;
        writeln!(self.out, "A=M-1")?;
        writeln!(self.out, "D=M")?;
        writeln!(self.out, "@R14")?; // R14 = x
        writeln!(self.out, "M=D")?;
        writeln!(self.out, "D=M")?;
        writeln!(self.out, "@{x_pos}")?;
        writeln!(self.out, "D;JGT")?;
        // x <= 0
        writeln!(self.out, "@R13")?;
        writeln!(self.out, "D=M")?;
        writeln!(self.out, "@{is_false}")?;
        writeln!(self.out, "D;JGT")?; // x<=0, y>0 => false
        writeln!(self.out, "@{same_sign}")?;
        writeln!(self.out, "0;JMP")?;
        writeln!(self.out, "({x_pos})")?;
        // x > 0
        writeln!(self.out, "@R13")?;
        writeln!(self.out, "D=M")?;
        writeln!(self.out, "@{is_true}")?;
        writeln!(self.out, "D;JLT")?; // x>0, y<0 => true
        writeln!(self.out, "({same_sign})")?;
        writeln!(self.out, "@R13")?;
        writeln!(self.out, "D=M")?;
        writeln!(self.out, "@R14")?;
        writeln!(self.out, "D=M-D")?;
        writeln!(self.out, "@{is_true}")?;
        writeln!(self.out, "D;JGT")?;
        writeln!(self.out, "({is_false})")?;
        writeln!(self.out, "@SP")?;
        writeln!(self.out, "A=M-1")?;
        writeln!(self.out, "M=0")?;
        writeln!(self.out, "@{end}")?;
        writeln!(self.out, "0;JMP")?;
        writeln!(self.out, "({is_true})")?;
        writeln!(self.out, "@SP")?;
        writeln!(self.out, "A=M-1")?;
        writeln!(self.out, "M=-1")?;
        writeln!(self.out, "({end})")?;
        Ok(())
    }

    /// Overflow-safe `x < y`, mirroring [`Self::write_gt`] with the sign
    /// tests reversed.
    fn write_lt(&mut self) -> Result<()> {
        let x_pos = self.next_label("LT_X_POS");
        let end = self.next_label("LT_END");
        let is_false = self.next_label("LT_FALSE");
        let is_true = self.next_label("LT_TRUE");
        let same_sign = self.next_label("LT_SAME_SIGN");

        writeln!(self.out, "@SP")?;
        writeln!(self.out, "AM=M-1")?;
        writeln!(self.out, "D=M")?;
        writeln!(self.out, "@R14")?; // R14 = y
        writeln!(self.out, "M=D")?;
        writeln!(self.out, "@SP")?;
        writeln!(self.out, "A=M-1")?;
        writeln!(self.out, "D=M")?;
        writeln!(self.out, "@R13")?; // R13 = x
        writeln!(self.out, "M=D")?;
        writeln!(self.out, "D=M")?;
        writeln!(self.out, "@{x_pos}")?;
        writeln!(self.out, "D;JGT")?;
        // x <= 0
        writeln!(self.out, "@R14")?;
        writeln!(self.out, "D=M")?;
        writeln!(self.out, "@{is_true}")?;
        writeln!(self.out, "D;JGT")?; // x<=0, y>0 => true
        writeln!(self.out, "@{same_sign}")?;
        writeln!(self.out, "0;JMP")?;
        writeln!(self.out, "({x_pos})")?;
        // x > 0
        writeln!(self.out, "@R14")?;
        writeln!(self.out, "D=M")?;
        writeln!(self.out, "@{is_false}")?;
        writeln!(self.out, "D;JLT")?; // x>0, y<0 => false
        writeln!(self.out, "({same_sign})")?;
        writeln!(self.out, "@R14")?;
        writeln!(self.out, "D=M")?;
        writeln!(self.out, "@R13")?;
        writeln!(self.out, "D=D-M")?;
        writeln!(self.out, "@{is_true}")?;
        writeln!(self.out, "D;JGT")?;
        writeln!(self.out, "({is_false})")?;
        writeln!(self.out, "@SP")?;
        writeln!(self.out, "A=M-1")?;
        writeln!(self.out, "M=0")?;
        writeln!(self.out, "@{end}")?;
        writeln!(self.out, "0;JMP")?;
        writeln!(self.out, "({is_true})")?;
        writeln!(self.out, "@SP")?;
        writeln!(self.out, "A=M-1")?;
        writeln!(self.out, "M=-1")?;
        writeln!(self.out, "({end})")?;
        Ok(())
    }

    pub fn write_push_pop(&mut self, command: &str, segment: &str, index: i32) -> Result<()> {
        writeln!(self.out, "// {command} {segment} {index}")?;
        let seg = Segment::parse(segment)
            .ok_or_else(|| CodeWriterError::UnknownSegment(segment.to_string()))?;
        match command {
            "push" => self.write_push(seg, index),
            "pop" => self.write_pop(seg, index),
            other => Err(CodeWriterError::UnknownArithmetic(other.to_string())),
        }
    }

    fn write_push(&mut self, seg: Segment, index: i32) -> Result<()> {
        match seg {
            Segment::Constant => {
                writeln!(self.out, "@{index}")?;
                writeln!(self.out, "D=A")?;
            }
            Segment::Local | Segment::Argument | Segment::This | Segment::That => {
                writeln!(self.out, "@{}", seg.pointer_symbol())?;
                writeln!(self.out, "D=M")?;
                writeln!(self.out, "@{index}")?;
                writeln!(self.out, "A=D+A")?;
                writeln!(self.out, "D=M")?;
            }
            Segment::Temp => {
                writeln!(self.out, "@{}", TEMP_BASE + index)?;
                writeln!(self.out, "D=M")?;
            }
            Segment::Pointer => {
                let address = if index == 0 { "THIS" } else { "THAT" };
                writeln!(self.out, "@{address}")?;
                writeln!(self.out, "D=M")?;
            }
            Segment::Static => {
                writeln!(self.out, "@{}.{index}", self.current_file)?;
                writeln!(self.out, "D=M")?;
            }
        }
        writeln!(self.out, "@SP")?;
        writeln!(self.out, "AM=M+1")?;
        writeln!(self.out, "A=A-1")?;
        writeln!(self.out, "M=D")?;
        Ok(())
    }

    fn write_pop(&mut self, seg: Segment, index: i32) -> Result<()> {
        match seg {
            Segment::Local | Segment::Argument | Segment::This | Segment::That => {
                writeln!(self.out, "@{}", seg.pointer_symbol())?;
                writeln!(self.out, "D=M")?;
                writeln!(self.out, "@{index}")?;
                writeln!(self.out, "D=D+A")?;
                writeln!(self.out, "@R13")?;
                writeln!(self.out, "M=D")?;
                writeln!(self.out, "@SP")?;
                writeln!(self.out, "AM=M-1")?;
                writeln!(self.out, "D=M")?;
                writeln!(self.out, "@R13")?;
                writeln!(self.out, "A=M")?;
                writeln!(self.out, "M=D")?;
            }
            Segment::Temp => {
                writeln!(self.out, "@SP")?;
                writeln!(self.out, "AM=M-1")?;
                writeln!(self.out, "D=M")?;
                writeln!(self.out, "@{}", TEMP_BASE + index)?;
                writeln!(self.out, "M=D")?;
            }
            Segment::Pointer => {
                let address = if index == 0 { "THIS" } else { "THAT" };
                writeln!(self.out, "@SP")?;
                writeln!(self.out, "AM=M-1")?;
                writeln!(self.out, "D=M")?;
                writeln!(self.out, "@{address}")?;
                writeln!(self.out, "M=D")?;
            }
            Segment::Static => {
                writeln!(self.out, "@SP")?;
                writeln!(self.out, "AM=M-1")?;
                writeln!(self.out, "D=M")?;
                writeln!(self.out, "@{}.{index}", self.current_file)?;
                writeln!(self.out, "M=D")?;
            }
            Segment::Constant => {
                return Err(CodeWriterError::UnknownSegment("constant".to_string()));
            }
        }
        Ok(())
    }

    /// `(func$label)` — scoped to the function currently being emitted.
    pub fn write_label(&mut self, label: &str) -> Result<()> {
        writeln!(self.out, "// label {label}")?;
        writeln!(self.out, "({}${label})", self.current_function)?;
        Ok(())
    }

    pub fn write_goto(&mut self, label: &str) -> Result<()> {
        writeln!(self.out, "// goto {label}")?;
        writeln!(self.out, "@{}${label}", self.current_function)?;
        writeln!(self.out, "0;JMP")?;
        Ok(())
    }

    pub fn write_if(&mut self, label: &str) -> Result<()> {
        writeln!(self.out, "// if-goto {label}")?;
        writeln!(self.out, "@SP")?;
        writeln!(self.out, "AM=M-1")?;
        writeln!(self.out, "D=M")?;
        writeln!(self.out, "@{}${label}", self.current_function)?;
        writeln!(self.out, "D;JNE")?;
        Ok(())
    }

    /// `(name)` followed by `n_locals` pushes of constant 0.
    pub fn write_function(&mut self, function_name: &str, n_locals: i32) -> Result<()> {
        self.current_function = function_name.to_string();
        writeln!(self.out, "// function {function_name} {n_locals}")?;
        writeln!(self.out, "({function_name})")?;
        for _ in 0..n_locals {
            writeln!(self.out, "@SP")?;
            writeln!(self.out, "A=M")?;
            writeln!(self.out, "M=0")?;
            writeln!(self.out, "@SP")?;
            writeln!(self.out, "M=M+1")?;
        }
        Ok(())
    }

    /// Pushes the return address and caller's LCL/ARG/THIS/THAT, repositions
    /// ARG/LCL for the callee, jumps to it, then defines the return label.
    pub fn write_call(&mut self, function_name: &str, n_args: i32) -> Result<()> {
        writeln!(self.out, "// call {function_name} {n_args}")?;
        let return_label = format!("{}$ret.{}", self.current_function, self.label_counter);
        self.label_counter += 1;

        writeln!(self.out, "@{return_label}")?;
        writeln!(self.out, "D=A")?;
        writeln!(self.out, "@SP")?;
        writeln!(self.out, "AM=M+1")?;
        writeln!(self.out, "A=A-1")?;
        writeln!(self.out, "M=D")?;

        for segment in ["LCL", "ARG", "THIS", "THAT"] {
            writeln!(self.out, "@{segment}")?;
            writeln!(self.out, "D=M")?;
            writeln!(self.out, "@SP")?;
            writeln!(self.out, "AM=M+1")?;
            writeln!(self.out, "A=A-1")?;
            writeln!(self.out, "M=D")?;
        }

        let offset = 5 + n_args;
        writeln!(self.out, "@{offset}")?;
        writeln!(self.out, "D=A")?;
        writeln!(self.out, "@SP")?;
        writeln!(self.out, "D=M-D")?;
        writeln!(self.out, "@ARG")?;
        writeln!(self.out, "M=D")?;

        writeln!(self.out, "@SP")?;
        writeln!(self.out, "D=M")?;
        writeln!(self.out, "@LCL")?;
        writeln!(self.out, "M=D")?;

        writeln!(self.out, "@{function_name}")?;
        writeln!(self.out, "0;JMP")?;

        writeln!(self.out, "({return_label})")?;
        Ok(())
    }

    /// Restores the caller's frame and jumps back, saving the return
    /// address to R14 before the argument-0 slot (which may alias the
    /// frame itself when `n_args == 0`) gets overwritten.
    pub fn write_return(&mut self) -> Result<()> {
        writeln!(self.out, "// return")?;
        // FRAME (R13) = LCL
        writeln!(self.out, "@LCL")?;
        writeln!(self.out, "D=M")?;
        writeln!(self.out, "@R13")?;
        writeln!(self.out, "M=D")?;

        // RET (R14) = *(FRAME-5), saved before any restore can clobber it
        writeln!(self.out, "@5")?;
        writeln!(self.out, "A=D-A")?;
        writeln!(self.out, "D=M")?;
        writeln!(self.out, "@R14")?;
        writeln!(self.out, "M=D")?;

        // *ARG = pop()
        writeln!(self.out, "@SP")?;
        writeln!(self.out, "AM=M-1")?;
        writeln!(self.out, "D=M")?;
        writeln!(self.out, "@ARG")?;
        writeln!(self.out, "A=M")?;
        writeln!(self.out, "M=D")?;

        // SP = ARG + 1
        writeln!(self.out, "@ARG")?;
        writeln!(self.out, "D=M+1")?;
        writeln!(self.out, "@SP")?;
        writeln!(self.out, "M=D")?;

        // THAT, THIS, ARG, LCL = *(FRAME-1..4)
        for (offset, segment) in [(1, "THAT"), (2, "THIS"), (3, "ARG"), (4, "LCL")] {
            writeln!(self.out, "@R13")?;
            writeln!(self.out, "D=M")?;
            writeln!(self.out, "@{offset}")?;
            writeln!(self.out, "A=D-A")?;
            writeln!(self.out, "D=M")?;
            writeln!(self.out, "@{segment}")?;
            writeln!(self.out, "M=D")?;
        }

        writeln!(self.out, "@R14")?;
        writeln!(self.out, "A=M")?;
        writeln!(self.out, "0;JMP")?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }

    /// Consumes the writer, returning the underlying sink.
    pub fn into_inner(self) -> W {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn writer() -> CodeWriter<Vec<u8>> {
        CodeWriter::new(Vec::new())
    }

    fn text(cw: &CodeWriter<Vec<u8>>) -> String {
        String::from_utf8(cw.out.clone()).unwrap()
    }

    #[test]
    fn push_constant_emits_immediate_load() {
        let mut cw = writer();
        cw.write_push_pop("push", "constant", 17).unwrap();
        let out = text(&cw);
        assert!(out.contains("@17"));
        assert!(out.contains("D=A"));
    }

    #[test]
    fn static_segment_uses_file_scoped_symbol() {
        let mut cw = writer();
        cw.set_file_name("Foo.vm");
        cw.write_push_pop("pop", "static", 3).unwrap();
        assert!(text(&cw).contains("@Foo.3"));
    }

    #[test]
    fn pointer_segment_selects_this_or_that() {
        let mut cw = writer();
        cw.write_push_pop("push", "pointer", 0).unwrap();
        assert!(text(&cw).contains("@THIS"));

        let mut cw2 = writer();
        cw2.write_push_pop("push", "pointer", 1).unwrap();
        assert!(text(&cw2).contains("@THAT"));
    }

    #[test]
    fn comparisons_generate_distinct_labels_per_call() {
        let mut cw = writer();
        cw.write_arithmetic("eq").unwrap();
        cw.write_arithmetic("eq").unwrap();
        let out = text(&cw);
        assert!(out.contains("EQ_TRUE_0"));
        assert!(out.contains("EQ_TRUE_1"));
    }

    #[test]
    fn label_goto_if_are_scoped_to_current_function() {
        let mut cw = writer();
        cw.write_function("Foo.bar", 0).unwrap();
        cw.write_label("LOOP").unwrap();
        cw.write_goto("LOOP").unwrap();
        cw.write_if("LOOP").unwrap();
        let out = text(&cw);
        assert!(out.contains("(Foo.bar$LOOP)"));
        assert!(out.contains("@Foo.bar$LOOP"));
    }

    #[test]
    fn unknown_arithmetic_command_errors() {
        let mut cw = writer();
        assert!(cw.write_arithmetic("frobnicate").is_err());
    }

    #[test]
    fn unknown_segment_errors() {
        let mut cw = writer();
        assert!(cw.write_push_pop("push", "nonexistent", 0).is_err());
    }

    #[test]
    fn call_and_return_reference_five_saved_registers() {
        let mut cw = writer();
        cw.write_call("Foo.bar", 2).unwrap();
        let out = text(&cw);
        for seg in ["LCL", "ARG", "THIS", "THAT"] {
            assert!(out.contains(&format!("@{seg}")));
        }

        let mut cw2 = writer();
        cw2.write_return().unwrap();
        let out2 = text(&cw2);
        assert!(out2.contains("@R13"));
        assert!(out2.contains("@R14"));
    }
}
