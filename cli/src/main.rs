use clap::{Parser, Subcommand};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::PathBuf;

use wiregen_compiler::describe::to_json;
use wiregen_compiler::error::CompileError;
use wiregen_compiler::gen_layout::layout_report;
use wiregen_compiler::compile_sources;

#[derive(Parser)]
#[command(name = "wiregen")]
#[command(about = "Compile wire-format schema sources", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile schema sources, in order, and report what they define
    Check {
        /// Input schema files, compiled in sequence into one registry
        inputs: Vec<PathBuf>,
    },

    /// Emit a JSON summary of the compiled schema
    Describe {
        inputs: Vec<PathBuf>,

        /// Output file (if omitted, prints to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Emit a wire-layout report, stamped with a digest of the input text
    Layout {
        inputs: Vec<PathBuf>,

        /// Output file (if omitted, prints to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn read_sources(inputs: &[PathBuf]) -> Result<Vec<String>, CompileError> {
    inputs
        .iter()
        .map(|path| fs::read_to_string(path).map_err(CompileError::Io))
        .collect()
}

fn content_digest(sources: &[String]) -> String {
    let mut hasher = Sha256::new();
    for text in sources {
        hasher.update(text.as_bytes());
    }
    format!("{:x}", hasher.finalize())
}

fn main() -> Result<(), CompileError> {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Check { inputs } => {
            let sources = read_sources(inputs)?;
            let registry = compile_sources(sources.iter().map(String::as_str))?;
            let enums = registry.enums().count();
            let records = registry.records().count();
            println!(
                "OK: {} enum/flag definition(s), {} record definition(s)",
                enums, records
            );
            Ok(())
        }

        Commands::Describe { inputs, output } => {
            let sources = read_sources(inputs)?;
            let registry = compile_sources(sources.iter().map(String::as_str))?;
            let json = to_json(&registry);
            match output {
                Some(path) => {
                    fs::write(path, &json).map_err(CompileError::Io)?;
                    println!("Schema summary written to {}", path.display());
                }
                None => println!("{}", json),
            }
            Ok(())
        }

        Commands::Layout { inputs, output } => {
            let sources = read_sources(inputs)?;
            let digest = content_digest(&sources);
            let header = format!("# schema digest: {}\n", digest);

            // Skip regeneration when the existing output was produced from the
            // same input text.
            if let Some(path) = output {
                if let Ok(existing) = fs::read_to_string(path) {
                    if existing.starts_with(&header) {
                        println!("{} is up to date, skipping", path.display());
                        return Ok(());
                    }
                }
            }

            let registry = compile_sources(sources.iter().map(String::as_str))?;
            let report = format!("{}\n{}", header, layout_report(&registry));
            match output {
                Some(path) => {
                    fs::write(path, &report).map_err(CompileError::Io)?;
                    println!("Wire layout written to {}", path.display());
                }
                None => println!("{}", report),
            }
            Ok(())
        }
    }
}
