//! Orchestrates the whole pipeline: read source, run every stage in turn,
//! and optionally hand the emitted assembly to `nasm` and `gcc` to produce
//! a native Windows executable.
//!
//! A single `CompileError` unifies every stage's failure so
//! [`crate::diagnostics`] has one thing to render.

use crate::adapter::{self, AdapterError};
use crate::asmgen;
use crate::ir;
use crate::lexer::{LexError, Lexer};
use crate::parser::{ParseError, Parser};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Command-line knobs that shape how `compile` runs. Populated by
/// [`crate::main`] from the parsed CLI arguments.
pub struct Options {
    pub source_path: PathBuf,
    pub output_name: Option<String>,
    pub show_ir: bool,
    pub show_asm: bool,
    pub asm_only: bool,
}

/// A subprocess invocation (`nasm` or `gcc`) that ran but exited non-zero.
#[derive(Debug)]
pub struct ToolError {
    pub tool: &'static str,
    pub exit_code: String,
    pub stderr: String,
}

impl std::fmt::Display for ToolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} exited with status {}: {}",
            self.tool, self.exit_code, self.stderr
        )
    }
}

impl std::error::Error for ToolError {}

/// A compilation error from any stage of the pipeline.
#[derive(Debug)]
pub enum CompileError {
    Lex(LexError),
    Adapt(AdapterError),
    Parse(ParseError),
    Io { context: &'static str, source: std::io::Error },
    Nasm(ToolError),
    Link(ToolError),
}

impl std::fmt::Display for CompileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompileError::Lex(e) => write!(f, "{}", e),
            CompileError::Adapt(e) => write!(f, "{}", e),
            CompileError::Parse(e) => write!(f, "{}", e),
            CompileError::Io { context, source } => write!(f, "{}: {}", context, source),
            CompileError::Nasm(e) => write!(f, "{}", e),
            CompileError::Link(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for CompileError {}

impl From<LexError> for CompileError {
    fn from(e: LexError) -> Self {
        CompileError::Lex(e)
    }
}

impl From<AdapterError> for CompileError {
    fn from(e: AdapterError) -> Self {
        CompileError::Adapt(e)
    }
}

impl From<ParseError> for CompileError {
    fn from(e: ParseError) -> Self {
        CompileError::Parse(e)
    }
}

fn run_tool(tool: &'static str, mut command: Command) -> Result<(), CompileError> {
    let output = command.output().map_err(|source| CompileError::Io {
        context: tool,
        source,
    })?;
    if !output.status.success() {
        let exit_code = output
            .status
            .code()
            .map(|c| c.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        let err = ToolError {
            tool,
            exit_code,
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        return Err(if tool == "nasm" {
            CompileError::Nasm(err)
        } else {
            CompileError::Link(err)
        });
    }
    Ok(())
}

/// Runs the full pipeline: read, lex, adapt, parse+check, lower to IR,
/// generate assembly, then (unless `asm_only`) assemble and link. Returns
/// the source text alongside the result so callers can re-render errors
/// with [`crate::diagnostics::report`].
pub fn compile(opts: &Options) -> (String, Result<(), CompileError>) {
    let source = match std::fs::read_to_string(&opts.source_path) {
        Ok(s) => s,
        Err(source) => {
            return (
                String::new(),
                Err(CompileError::Io {
                    context: "reading source file",
                    source,
                }),
            );
        }
    };

    let result = run(&source, opts);
    (source, result)
}

fn run(source: &str, opts: &Options) -> Result<(), CompileError> {
    println!("-- lexing --");
    let raw = Lexer::new(source).tokenize()?;

    println!("-- adapting --");
    let tokens = adapter::adapt(raw)?;

    println!("-- parsing & checking --");
    let program = Parser::new(tokens).parse()?;

    println!("-- generating ir --");
    let (instrs, strings) = ir::generate(&program);
    if opts.show_ir {
        for instr in &instrs {
            println!("{}", instr);
        }
    }

    println!("-- generating asm --");
    let asm = asmgen::generate(&instrs, &strings);
    if opts.show_asm {
        print!("{}", asm);
    }

    let stem = opts
        .source_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("out")
        .to_string();
    let output_name = opts.output_name.clone().unwrap_or_else(|| stem.clone());

    let asm_path = with_extension(&opts.source_path, &stem, "asm");
    std::fs::write(&asm_path, &asm).map_err(|source| CompileError::Io {
        context: "writing assembly file",
        source,
    })?;

    if opts.asm_only {
        println!("wrote {}", asm_path.display());
        return Ok(());
    }

    let obj_path = with_extension(&opts.source_path, &stem, "obj");
    let exe_path = with_extension(&opts.source_path, &output_name, "exe");

    println!("-- assembling --");
    let mut nasm = Command::new("nasm");
    nasm.args(["-f", "win64", asm_path.to_str().unwrap_or_default(), "-o", obj_path.to_str().unwrap_or_default()]);
    run_tool("nasm", nasm)?;

    println!("-- linking --");
    let mut gcc = Command::new("gcc");
    gcc.args([obj_path.to_str().unwrap_or_default(), "-o", exe_path.to_str().unwrap_or_default()]);
    run_tool("gcc", gcc)?;

    println!("built: {}", exe_path.display());
    Ok(())
}

fn with_extension(source_path: &Path, stem: &str, ext: &str) -> PathBuf {
    source_path
        .parent()
        .map(|dir| dir.join(format!("{}.{}", stem, ext)))
        .unwrap_or_else(|| PathBuf::from(format!("{}.{}", stem, ext)))
}
