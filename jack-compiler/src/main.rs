//! Jack Compiler - command-line entry point
//!
//! Compiles Jack (`.jack`) source into Hack VM (`.vm`) code. A single file
//! compiles to a `.vm` file of the same name; a directory compiles every
//! `.jack` file it contains, each to its own `.vm` file alongside it.

#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

use clap::Parser as ClapParser;
use jack_compiler::compile;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use tracing::{error, info};

type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

/// Compiles Jack source files into Hack VM code.
#[derive(ClapParser, Debug)]
#[command(name = "jack-compiler")]
#[command(about = "Compiles .jack files into .vm code", long_about = None)]
struct Cli {
    /// Input .jack file, or a directory containing .jack files
    path: PathBuf,
}

fn jack_files_in(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(std::result::Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.extension().and_then(|e| e.to_str()) == Some("jack"))
        .collect();
    files.sort();
    Ok(files)
}

fn compile_one(path: &Path) -> Result<()> {
    info!(input = %path.display(), "compiling");
    let source = fs::read_to_string(path)?;
    let vm_lines = compile(&source)?;
    let output = path.with_extension("vm");
    let mut contents = vm_lines.join("\n");
    contents.push('\n');
    fs::write(&output, contents)?;
    info!(output = %output.display(), "wrote vm code");
    Ok(())
}

fn run(cli: &Cli) -> Result<()> {
    if cli.path.is_dir() {
        for path in jack_files_in(&cli.path)? {
            compile_one(&path)?;
        }
    } else {
        compile_one(&cli.path)?;
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
        error!(%err, "compilation failed");
        process::exit(1);
    }
}
