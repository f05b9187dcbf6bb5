//! VM-to-Hack-assembly translator.
//!
//! The crate consists of three modules:
//! - [`parser`]: lexes cleaned VM source lines into commands.
//! - [`code_writer`]: lowers each command to Hack assembly.
//! - [`driver`]: the file-IO-free translation pipeline tying the two
//!   together, reused by both the CLI and integration tests.

#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

pub mod code_writer;
pub mod driver;
pub mod parser;

pub use code_writer::{CodeWriter, CodeWriterError};
pub use driver::{TranslateError, translate_file, translate_program};
pub use parser::{CommandType, Parser, ParserError};
