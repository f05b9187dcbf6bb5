//! Emits Hack VM commands. Holds no state beyond the output sink, generic
//! over `Write` so tests can drive it with an in-memory buffer the same way
//! the teacher's assembler and VM translator do.

use std::io::{self, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    Constant,
    Argument,
    Local,
    Static,
    This,
    That,
    Pointer,
    Temp,
}

impl Segment {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Segment::Constant => "constant",
            Segment::Argument => "argument",
            Segment::Local => "local",
            Segment::Static => "static",
            Segment::This => "this",
            Segment::That => "that",
            Segment::Pointer => "pointer",
            Segment::Temp => "temp",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticCommand {
    Add,
    Sub,
    Neg,
    Eq,
    Gt,
    Lt,
    And,
    Or,
    Not,
    Shiftleft,
    Shiftright,
}

impl ArithmeticCommand {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ArithmeticCommand::Add => "add",
            ArithmeticCommand::Sub => "sub",
            ArithmeticCommand::Neg => "neg",
            ArithmeticCommand::Eq => "eq",
            ArithmeticCommand::Gt => "gt",
            ArithmeticCommand::Lt => "lt",
            ArithmeticCommand::And => "and",
            ArithmeticCommand::Or => "or",
            ArithmeticCommand::Not => "not",
            ArithmeticCommand::Shiftleft => "shiftleft",
            ArithmeticCommand::Shiftright => "shiftright",
        }
    }
}

pub struct VmWriter<W: Write> {
    out: W,
}

impl<W: Write> VmWriter<W> {
    pub fn new(out: W) -> Self {
        VmWriter { out }
    }

    pub fn write_push(&mut self, segment: Segment, index: u16) -> io::Result<()> {
        writeln!(self.out, "push {} {index}", segment.as_str())
    }

    pub fn write_pop(&mut self, segment: Segment, index: u16) -> io::Result<()> {
        writeln!(self.out, "pop {} {index}", segment.as_str())
    }

    pub fn write_arithmetic(&mut self, command: ArithmeticCommand) -> io::Result<()> {
        writeln!(self.out, "{}", command.as_str())
    }

    pub fn write_label(&mut self, label: &str) -> io::Result<()> {
        writeln!(self.out, "label {label}")
    }

    pub fn write_goto(&mut self, label: &str) -> io::Result<()> {
        writeln!(self.out, "goto {label}")
    }

    pub fn write_if(&mut self, label: &str) -> io::Result<()> {
        writeln!(self.out, "if-goto {label}")
    }

    pub fn write_call(&mut self, name: &str, n_args: u16) -> io::Result<()> {
        writeln!(self.out, "call {name} {n_args}")
    }

    pub fn write_function(&mut self, name: &str, n_locals: u16) -> io::Result<()> {
        writeln!(self.out, "function {name} {n_locals}")
    }

    pub fn write_return(&mut self) -> io::Result<()> {
        writeln!(self.out, "return")
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(writer: VmWriter<Vec<u8>>) -> Vec<String> {
        String::from_utf8(writer.into_inner())
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn push_and_pop_format_segment_and_index() {
        let mut w = VmWriter::new(Vec::new());
        w.write_push(Segment::Local, 2).unwrap();
        w.write_pop(Segment::That, 0).unwrap();
        let out = lines(w);
        assert_eq!(out, vec!["push local 2", "pop that 0"]);
    }

    #[test]
    fn call_and_function_include_counts() {
        let mut w = VmWriter::new(Vec::new());
        w.write_function("Main.main", 3).unwrap();
        w.write_call("Math.multiply", 2).unwrap();
        let out = lines(w);
        assert_eq!(out, vec!["function Main.main 3", "call Math.multiply 2"]);
    }
}
