//! Ahead-of-time compiler CLI.
//!
//! Reads a source file, runs it through the full pipeline, and (unless
//! `--asm-only` is given) assembles and links a native Windows executable.
//!
//! # Usage
//!
//! ```text
//! winx64cc source.lang [-o NAME] [--show-ir] [--show-asm] [--asm-only]
//! ```
//!
//! # Architecture
//!
//! 1. **Lexing** ([`winx64cc::lexer`]) - source text to tokens
//! 2. **Adapting** ([`winx64cc::adapter`]) - token-stream normalization
//! 3. **Parsing & checking** ([`winx64cc::parser`]) - AST with inline semantic checks
//! 4. **IR generation** ([`winx64cc::ir`]) - three-address code
//! 5. **Assembly generation** ([`winx64cc::asmgen`]) - NASM source
//! 6. **Assembling & linking** - `nasm` then `gcc`
//!
//! # Error Reporting
//!
//! Uses [ariadne](https://docs.rs/ariadne) via [`winx64cc::diagnostics`] to
//! underline the offending span in the original source.

use clap::Parser;
use std::path::PathBuf;
use winx64cc::diagnostics;
use winx64cc::driver::{self, Options};

/// Command-line interface for the compiler.
#[derive(Parser)]
#[command(name = "winx64cc")]
#[command(about = "Compiles a small C-like language to Windows x86-64 assembly", long_about = None)]
struct Cli {
    /// The source file to compile.
    file: String,

    /// Name of the output executable (defaults to the source file's stem).
    #[arg(short = 'o', long = "output")]
    output: Option<String>,

    /// Print the generated three-address IR before assembling.
    #[arg(long)]
    show_ir: bool,

    /// Print the generated NASM source before assembling.
    #[arg(long)]
    show_asm: bool,

    /// Stop after writing the `.asm` file; do not invoke nasm/gcc.
    #[arg(long)]
    asm_only: bool,
}

fn main() {
    let cli = Cli::parse();

    let opts = Options {
        source_path: PathBuf::from(&cli.file),
        output_name: cli.output,
        show_ir: cli.show_ir,
        show_asm: cli.show_asm,
        asm_only: cli.asm_only,
    };

    let (source, result) = driver::compile(&opts);
    if let Err(e) = result {
        diagnostics::report(&cli.file, &source, &e);
        std::process::exit(1);
    }
}
