//! necrc - Recompute the stored checksum of MZ/NE executables
//!
//! 16-bit "New Executable" binaries carry a 32-bit checksum in their NE
//! header. This tool recomputes it the way the original toolchain did: a
//! table-driven CRC over the whole file with the stored field folded as
//! zero, tried against one or more candidate generator polynomials.

use anyhow::{bail, Result};
use clap::{Args, Parser};
use necrc_core::digest::{digest_file, DigestResult, DEFAULT_GENERATOR, GENERATOR_CANDIDATES};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn, Level};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

/// Recompute the stored checksum of MZ/NE "New Executable" binaries
#[derive(Parser, Debug)]
#[command(name = "necrc")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(flatten)]
    input: InputMode,

    /// Generator polynomial as 32-bit hex (repeatable; occurrence order is output order)
    #[arg(short, long, value_parser = parse_generator)]
    generator: Vec<u32>,

    /// Also try the five well-known generators, normal and bit-reversed
    #[arg(long)]
    candidates: bool,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct InputMode {
    /// Path to a single executable to checksum
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Path to a directory of executables to process
    #[arg(short, long)]
    directory: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_target(false)
        .init();

    let generators = collect_generators(&cli);
    debug!("Trying {} generator(s)", generators.len());

    // Dispatch based on input mode
    if let Some(ref file) = cli.input.file {
        process_single_file(file, &generators)
    } else if let Some(ref directory) = cli.input.directory {
        process_directory(directory, &generators)
    } else {
        bail!("Either --file or --directory must be specified")
    }
}

/// Parse a 32-bit generator constant from hex, with or without a 0x prefix
fn parse_generator(raw: &str) -> std::result::Result<u32, String> {
    let digits = raw
        .strip_prefix("0x")
        .or_else(|| raw.strip_prefix("0X"))
        .unwrap_or(raw);
    u32::from_str_radix(digits, 16).map_err(|e| format!("invalid generator '{raw}': {e}"))
}

/// Assemble the generator list: explicit values in occurrence order, then
/// the well-known candidate pairs if requested, then the default if nothing
/// else was given
fn collect_generators(cli: &Cli) -> Vec<u32> {
    let mut generators = cli.generator.clone();
    if cli.candidates {
        for pair in GENERATOR_CANDIDATES {
            generators.extend(pair);
        }
    }
    if generators.is_empty() {
        generators.push(DEFAULT_GENERATOR);
    }
    generators
}

/// Checksum a single executable
fn process_single_file(file: &Path, generators: &[u32]) -> Result<()> {
    if !file.exists() {
        bail!("Input file does not exist: {}", file.display());
    }
    if !file.is_file() {
        bail!("Input path is not a file: {}", file.display());
    }

    let results = digest_file(file, generators)?;
    for result in &results {
        println!("{}", render_result(result, results.len() > 1));
    }

    Ok(())
}

/// Checksum every NE executable under a directory recursively
fn process_directory(directory: &Path, generators: &[u32]) -> Result<()> {
    if !directory.exists() {
        bail!("Directory does not exist: {}", directory.display());
    }
    if !directory.is_dir() {
        bail!("Path is not a directory: {}", directory.display());
    }

    info!("Scanning directory: {}", directory.display());

    let mut processed = 0;

    // Walk the directory
    for entry in WalkDir::new(directory)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();

        // Skip directories
        if !path.is_file() {
            continue;
        }

        // Skip hidden files
        if path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.starts_with('.'))
            .unwrap_or(false)
        {
            continue;
        }

        match digest_file(path, generators) {
            Ok(results) => {
                for result in &results {
                    println!(
                        "{}: {}",
                        path.display(),
                        render_result(result, results.len() > 1)
                    );
                }
                processed += 1;
            }
            // Not an MZ/NE executable; keep walking
            Err(e) if e.is_format_error() => {
                debug!("Skipping {}: {}", path.display(), e);
            }
            Err(e) => {
                warn!("Error processing {}: {}", path.display(), e);
            }
        }
    }

    info!("Checksummed {} executables", processed);

    Ok(())
}

/// Render one digest: a bare value for a single generator, a
/// generator-tagged line when comparing several
fn render_result(result: &DigestResult, tagged: bool) -> String {
    if tagged {
        format!("{:08x} -> {:08x}", result.generator, result.crc)
    } else {
        format!("{:08x}", result.crc)
    }
}
