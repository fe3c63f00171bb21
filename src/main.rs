//! mixalc
//!
//! Compiles a small C-like language to MIXAL assembly for Knuth's MIX.

mod backend;
mod feedback;
mod frontend;
mod pipeline;
mod utils;

use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::Context;
use clap::{Parser, Subcommand};

use feedback::{CompilationFeedback, CompilationStats};
use utils::Error;

/// mixalc compiler
#[derive(Parser, Debug)]
#[command(name = "mixalc")]
#[command(version)]
#[command(about = "Compiler from a small C-like language to MIXAL assembly")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Input source file
    #[arg(value_name = "FILE")]
    input: Option<PathBuf>,

    /// Output file (defaults to the input with a .mixal extension)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Print a JSON compilation report instead of progress lines
    #[arg(long, global = true)]
    json: bool,

    /// Print the assembly instead of writing it to a file
    #[arg(long, global = true)]
    stdout: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compile a source file
    Build {
        /// Input source file
        input: PathBuf,

        /// Output file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Check a source file for errors
    Check {
        /// Input source file
        input: PathBuf,
    },
    /// Print the first tokens of a source file
    Tokens {
        /// Input source file
        input: PathBuf,

        /// Number of tokens to print
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match &cli.command {
        Some(Commands::Build { input, output }) => compile_file(input, output.clone(), &cli),
        Some(Commands::Check { input }) => check_file(input, &cli),
        Some(Commands::Tokens { input, limit }) => dump_tokens(input, *limit),
        None => match &cli.input {
            Some(input) => compile_file(input, cli.output.clone(), &cli),
            None => {
                eprintln!("Error: No input file specified");
                eprintln!("Usage: mixalc <FILE> or mixalc build <FILE>");
                process::exit(1);
            }
        },
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn read_source(input: &Path) -> anyhow::Result<String> {
    fs::read_to_string(input).with_context(|| format!("failed to read {}", input.display()))
}

/// Report a failed stage and exit
fn fail(input: &Path, error: &Error, stats: CompilationStats, json: bool) -> ! {
    if json {
        let feedback =
            CompilationFeedback::failure(input.display().to_string(), error, stats);
        println!("{}", feedback.to_json());
    }
    eprintln!("{} failed: {}", error.stage(), error.to_string().trim_end());
    process::exit(1);
}

/// Compile a source file to MIXAL
fn compile_file(input: &Path, output: Option<PathBuf>, cli: &Cli) -> anyhow::Result<()> {
    let quiet = cli.json || cli.stdout;
    if !quiet {
        println!("mixalc v{}", env!("CARGO_PKG_VERSION"));
        println!("Compiling: {}", input.display());
    }

    let source = read_source(input)?;
    let mut stats = CompilationStats {
        source_lines: source.lines().count(),
        ..CompilationStats::default()
    };

    let compilation = match pipeline::compile(&source) {
        Ok(compilation) => compilation,
        Err(e) => fail(input, &e, stats, cli.json),
    };
    let assembly = compilation.assembly;
    stats.token_count = compilation.token_count;
    stats.method_count = compilation.method_count;
    stats.output_lines = assembly.lines().count();

    if !quiet {
        println!("  [✓] Tokenized {} tokens", stats.token_count);
        println!("  [✓] Parsed {} methods", stats.method_count);
        println!("  [✓] Semantic analysis passed");
        println!("  [✓] Generated {} lines of MIXAL", stats.output_lines);
    }

    if cli.stdout {
        println!("{}", assembly);
    } else {
        let out_path = output.unwrap_or_else(|| input.with_extension("mixal"));
        fs::write(&out_path, &assembly)
            .with_context(|| format!("failed to write {}", out_path.display()))?;
        if !quiet {
            println!("\n✅ Output: {}", out_path.display());
        }
    }

    if cli.json {
        let feedback = CompilationFeedback::success(input.display().to_string(), stats);
        println!("{}", feedback.to_json());
    }

    Ok(())
}

/// Check a source file for errors without generating code
fn check_file(input: &Path, cli: &Cli) -> anyhow::Result<()> {
    if !cli.json {
        println!("Checking: {}", input.display());
    }

    let source = read_source(input)?;
    let mut stats = CompilationStats {
        source_lines: source.lines().count(),
        ..CompilationStats::default()
    };

    let checked = match pipeline::check(&source) {
        Ok(checked) => checked,
        Err(e) => fail(input, &e, stats, cli.json),
    };
    stats.token_count = checked.token_count;
    stats.method_count = checked.program.methods.len();

    if cli.json {
        let feedback = CompilationFeedback::success(input.display().to_string(), stats);
        println!("{}", feedback.to_json());
    } else {
        println!("✅ No errors found");
    }
    Ok(())
}

/// Print the first `limit` tokens
fn dump_tokens(input: &Path, limit: usize) -> anyhow::Result<()> {
    let source = read_source(input)?;
    let tokens = match pipeline::tokenize(&source) {
        Ok(tokens) => tokens,
        Err(e) => fail(input, &e, CompilationStats::default(), false),
    };

    for token in tokens.iter().take(limit) {
        println!("{}", token);
    }
    if tokens.len() > limit {
        println!("... ({} more)", tokens.len() - limit);
    }
    Ok(())
}
