//! Hack Assembler - command-line entry point
//!
//! A two-pass assembler for the Hack assembly language (`Nand2Tetris` Project 6).
//!
//! # Usage
//! ```text
//! hack-assembler <input.asm|directory> [--output <output.hack>]
//! ```

#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

use clap::Parser;
use hack_assembler::assemble_lines;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process;
use tracing::{error, info};

type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

/// Two-pass assembler that lowers Hack assembly into 16-bit machine code.
#[derive(Parser, Debug)]
#[command(name = "hack-assembler")]
#[command(about = "Assembles .asm files into .hack machine code", long_about = None)]
struct Cli {
    /// Input .asm file, or a directory containing .asm files
    path: PathBuf,

    /// Output file path. Only valid when `path` is a single file.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn read_lines(path: &Path) -> Result<Vec<String>> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    reader
        .lines()
        .collect::<std::io::Result<Vec<_>>>()
        .map_err(Into::into)
}

/// Determines the output path for a single input file.
fn output_path(input: &Path, explicit_output: Option<&Path>) -> PathBuf {
    explicit_output.map_or_else(|| input.with_extension("hack"), Path::to_path_buf)
}

/// Assembles a single `.asm` file, writing the result beside it (or to
/// `explicit_output` if given).
fn assemble_file(input: &Path, explicit_output: Option<&Path>) -> Result<()> {
    info!(input = %input.display(), "assembling");
    let lines = read_lines(input)?;
    let binary = assemble_lines(&lines)?;

    let output = output_path(input, explicit_output);
    let out_file = File::create(&output)?;
    let mut writer = BufWriter::new(out_file);
    for line in &binary {
        writeln!(writer, "{line}")?;
    }
    writer.flush()?;

    info!(output = %output.display(), "wrote machine code");
    Ok(())
}

/// Collects every `.asm` file directly inside a directory, in sorted order.
fn asm_files_in(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(std::result::Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.extension().and_then(|e| e.to_str()) == Some("asm"))
        .collect();
    files.sort();
    Ok(files)
}

fn run(cli: &Cli) -> Result<()> {
    if cli.path.is_dir() {
        if cli.output.is_some() {
            return Err("--output is only valid when assembling a single file".into());
        }
        for asm_file in asm_files_in(&cli.path)? {
            assemble_file(&asm_file, None)?;
        }
    } else {
        assemble_file(&cli.path, cli.output.as_deref())?;
    }
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(err) = run(&cli) {
        error!(%err, "assembly failed");
        process::exit(1);
    }
}
