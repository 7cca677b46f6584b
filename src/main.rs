//! `sablec`, the Sable compiler driver.
//!
//! Reads a source file, runs the front-end and middle-end from
//! `sable_lib`, prints the collected diagnostics to stderr and writes
//! the textual LLVM IR to the output path (or stdout). Exits with code 1
//! when any error was reported; the IR is only written for clean
//! compilations.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context as _;
use clap::{Parser, ValueEnum};
use log::{debug, LevelFilter};

use sable_lib::diag::Diag;
use sable_lib::lexer::{Lexer, TokenKind};
use sable_lib::parser::ast::printer::print_program;
use sable_lib::parser::ast::AstContext;
use sable_lib::types::TypeInterner;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Emit {
    /// Dump the token stream and stop.
    Tokens,
    /// Dump the parsed program and stop.
    Ast,
    /// Emit textual LLVM IR (the default).
    Ir,
}

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Source file to compile.
    file: PathBuf,

    /// Where to write the output; stdout if omitted.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Stage to stop after.
    #[arg(long, value_enum, default_value_t = Emit::Ir)]
    emit: Emit,

    /// Verbose stage logging.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    if let Err(error) = simple_logger::SimpleLogger::new().with_level(level).init() {
        eprintln!("failed to initialize logger: {error}");
    }

    match run(&cli) {
        Ok(errors) if errors == 0 => ExitCode::SUCCESS,
        Ok(_) => ExitCode::FAILURE,
        Err(error) => {
            eprintln!("error: {error:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<usize> {
    let source = fs::read_to_string(&cli.file)
        .with_context(|| format!("cannot open '{}'", cli.file.display()))?;
    let mut diag = Diag::new();

    let output = match cli.emit {
        Emit::Tokens => {
            debug!("lexing {}", cli.file.display());
            let mut lexer = Lexer::new(&source, 0);
            let mut out = String::new();
            loop {
                let token = lexer.next_token(&mut diag);
                out.push_str(&format!("{token}\n"));
                if token.is(TokenKind::End) {
                    break;
                }
            }
            out
        }
        Emit::Ast => {
            debug!("parsing {}", cli.file.display());
            let mut ast = AstContext::new();
            let mut types = TypeInterner::new();
            sable_lib::parser::Parser::new(Lexer::new(&source, 0), &mut ast, &mut types, &mut diag)
                .parse();
            print_program(&ast, &types)
        }
        Emit::Ir => {
            debug!("compiling {}", cli.file.display());
            let llcx = sable_lib::inkwell::context::Context::create();
            let module = llcx.create_module(&cli.file.display().to_string());
            sable_lib::compile_source(&source, &llcx, &module, &mut diag);
            module.print_to_string().to_string()
        }
    };

    for diagnostic in diag.diagnostics() {
        eprintln!("{}: {diagnostic}", cli.file.display());
    }
    debug!(
        "{} errors, {} warnings",
        diag.error_count(),
        diag.warning_count()
    );

    // a failed compilation must not produce output
    if diag.has_errors() && cli.emit == Emit::Ir {
        return Ok(diag.error_count());
    }

    match &cli.output {
        Some(path) => fs::write(path, output)
            .with_context(|| format!("cannot write '{}'", path.display()))?,
        None => print!("{output}"),
    }

    Ok(diag.error_count())
}
