//! Parser module for Hack VM commands.
//!
//! Strips comments and whitespace up front, then lexes each remaining line
//! into a [`CommandType`] plus up to two arguments, mirroring the teacher's
//! `hack-assembler` parser: a thin zero-copy cursor over pre-cleaned lines,
//! with fallible accessors instead of command-type-specific panics.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandType {
    Arithmetic,
    Push,
    Pop,
    Label,
    Goto,
    If,
    Function,
    Return,
    Call,
}

#[derive(Debug)]
pub enum ParserError {
    /// No command is currently loaded (`advance` was never called, or it
    /// returned `false`).
    NoCurrentCommand,
    /// `arg1` was requested for a command type that does not carry one.
    NoArg1(CommandType),
    /// `arg2` was requested for a command type that does not carry one.
    NoArg2(CommandType),
    /// A `push`/`pop`/`function`/`call` command's numeric argument did not
    /// parse as an integer.
    InvalidArg2(String),
}

impl std::error::Error for ParserError {}

impl fmt::Display for ParserError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::NoCurrentCommand => write!(f, "no current command available"),
            Self::NoArg1(kind) => write!(f, "arg1 is not defined for {kind:?}"),
            Self::NoArg2(kind) => write!(f, "arg2 is not defined for {kind:?}"),
            Self::InvalidArg2(raw) => write!(f, "invalid numeric argument: {raw}"),
        }
    }
}

/// Cursor over pre-cleaned VM source lines.
///
/// Each line has already had comments stripped and been trimmed by the
/// caller (see [`crate::driver::clean_lines`]); a blank result is skipped.
pub struct Parser<'a> {
    lines: std::slice::Iter<'a, String>,
    parts: Vec<&'a str>,
}

impl<'a> Parser<'a> {
    #[must_use]
    pub fn from_lines(lines: &'a [String]) -> Self {
        Self {
            lines: lines.iter(),
            parts: Vec::new(),
        }
    }

    /// Advances to the next non-blank command. Returns `false` once
    /// exhausted.
    pub fn advance(&mut self) -> bool {
        for line in self.lines.by_ref() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            self.parts = trimmed.split_whitespace().collect();
            return true;
        }
        self.parts.clear();
        false
    }

    pub fn command_type(&self) -> Result<CommandType, ParserError> {
        let head = self.parts.first().ok_or(ParserError::NoCurrentCommand)?;
        Ok(match *head {
            "push" => CommandType::Push,
            "pop" => CommandType::Pop,
            "label" => CommandType::Label,
            "goto" => CommandType::Goto,
            "if-goto" => CommandType::If,
            "function" => CommandType::Function,
            "return" => CommandType::Return,
            "call" => CommandType::Call,
            _ => CommandType::Arithmetic,
        })
    }

    /// The command's first argument: the arithmetic mnemonic itself for
    /// [`CommandType::Arithmetic`], otherwise the segment/label/function
    /// name. Not defined for [`CommandType::Return`].
    pub fn arg1(&self) -> Result<&'a str, ParserError> {
        let kind = self.command_type()?;
        match kind {
            CommandType::Return => Err(ParserError::NoArg1(kind)),
            CommandType::Arithmetic => Ok(self.parts[0]),
            _ => self.parts.get(1).copied().ok_or(ParserError::NoArg1(kind)),
        }
    }

    /// The command's second, numeric argument. Only defined for `push`,
    /// `pop`, `function` and `call`.
    pub fn arg2(&self) -> Result<i32, ParserError> {
        let kind = self.command_type()?;
        match kind {
            CommandType::Push | CommandType::Pop | CommandType::Function | CommandType::Call => {
                let raw = self.parts.get(2).ok_or(ParserError::NoArg2(kind))?;
                raw.parse()
                    .map_err(|_| ParserError::InvalidArg2((*raw).to_string()))
            }
            _ => Err(ParserError::NoArg2(kind)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(src: &[&str]) -> Vec<String> {
        src.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn classifies_every_command_type() {
        let src = lines(&[
            "add",
            "push local 2",
            "pop argument 1",
            "label LOOP",
            "goto LOOP",
            "if-goto LOOP",
            "function Foo.bar 2",
            "call Foo.bar 2",
            "return",
        ]);
        let mut parser = Parser::from_lines(&src);
        let expected = [
            CommandType::Arithmetic,
            CommandType::Push,
            CommandType::Pop,
            CommandType::Label,
            CommandType::Goto,
            CommandType::If,
            CommandType::Function,
            CommandType::Call,
            CommandType::Return,
        ];
        for kind in expected {
            assert!(parser.advance());
            assert_eq!(parser.command_type().unwrap(), kind);
        }
        assert!(!parser.advance());
    }

    #[test]
    fn parses_push_segment_and_index() {
        let src = lines(&["push constant 17"]);
        let mut parser = Parser::from_lines(&src);
        parser.advance();
        assert_eq!(parser.arg1().unwrap(), "constant");
        assert_eq!(parser.arg2().unwrap(), 17);
    }

    #[test]
    fn arithmetic_arg1_is_the_mnemonic_itself() {
        let src = lines(&["eq"]);
        let mut parser = Parser::from_lines(&src);
        parser.advance();
        assert_eq!(parser.arg1().unwrap(), "eq");
    }

    #[test]
    fn return_has_no_arg1() {
        let src = lines(&["return"]);
        let mut parser = Parser::from_lines(&src);
        parser.advance();
        assert!(parser.arg1().is_err());
    }

    #[test]
    fn rejects_non_numeric_arg2() {
        let src = lines(&["push local x"]);
        let mut parser = Parser::from_lines(&src);
        parser.advance();
        assert!(parser.arg2().is_err());
    }
}
