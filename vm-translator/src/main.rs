//! VM Translator - command-line entry point
//!
//! Translates Hack VM (`.vm`) source into Hack assembly (`.asm`).
//!
//! A single `.vm` file translates to a `.asm` file of the same name with no
//! bootstrap code. A directory of `.vm` files translates to one concatenated
//! `.asm` file (named after the directory, or `--output`), with the
//! bootstrap sequence (`SP=256`, `call Sys.init 0`) emitted once up front —
//! the standard convention for a complete VM program.

#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

use clap::Parser as ClapParser;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use tracing::{error, info};
use vm_translator::{translate_file, translate_program};

type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

/// Translates Hack VM source into Hack assembly.
#[derive(ClapParser, Debug)]
#[command(name = "vm-translator")]
#[command(about = "Translates .vm files into .asm assembly", long_about = None)]
struct Cli {
    /// Input .vm file, or a directory containing .vm files
    path: PathBuf,

    /// Output .asm path override
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn vm_files_in(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(std::result::Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.extension().and_then(|e| e.to_str()) == Some("vm"))
        .collect();
    files.sort();
    Ok(files)
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("Unknown")
        .to_string()
}

fn write_asm(output: &Path, lines: &[String]) -> Result<()> {
    let mut contents = lines.join("\n");
    contents.push('\n');
    fs::write(output, contents)?;
    Ok(())
}

fn run(cli: &Cli) -> Result<()> {
    if cli.path.is_dir() {
        let vm_files = vm_files_in(&cli.path)?;
        let mut files = Vec::with_capacity(vm_files.len());
        for path in &vm_files {
            info!(input = %path.display(), "reading");
            let lines: Vec<String> = fs::read_to_string(path)?
                .lines()
                .map(str::to_string)
                .collect();
            files.push((file_stem(path), lines));
        }

        let asm = translate_program(&files, true)?;

        let output = cli.output.clone().unwrap_or_else(|| {
            let dir_name = cli
                .path
                .file_name()
                .and_then(|s| s.to_str())
                .unwrap_or("Program");
            cli.path.join(format!("{dir_name}.asm"))
        });
        write_asm(&output, &asm)?;
        info!(output = %output.display(), files = files.len(), "wrote program assembly");
    } else {
        info!(input = %cli.path.display(), "translating");
        let lines: Vec<String> = fs::read_to_string(&cli.path)?
            .lines()
            .map(str::to_string)
            .collect();
        let asm = translate_file(&file_stem(&cli.path), &lines)?;

        let output = cli
            .output
            .clone()
            .unwrap_or_else(|| cli.path.with_extension("asm"));
        write_asm(&output, &asm)?;
        info!(output = %output.display(), "wrote assembly");
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
        error!(%err, "translation failed");
        process::exit(1);
    }
}
