//! Core of the Sable compiler: lexing, parsing, type resolution and
//! LLVM IR emission. The driver binary and the tests consume the
//! pipeline through [`compile_source`].

pub mod diag;
pub mod irgen;
pub mod lexer;
pub mod parser;
pub mod types;

// the driver owns the LLVM context and module, so the backend crate is
// part of the public surface
pub use inkwell;

use inkwell::context::Context;
use inkwell::module::Module;

use crate::diag::Diag;
use crate::lexer::Lexer;
use crate::parser::ast::AstContext;
use crate::parser::Parser;
use crate::types::TypeInterner;

/// Everything a compilation owns once the passes have run: the AST
/// context and the interned types. The populated module and the
/// diagnostics belong to the caller.
pub struct Compilation {
    pub ast: AstContext,
    pub types: TypeInterner,
}

/// Run the whole pipeline over one source buffer, emitting IR into the
/// given module. Diagnostics accumulate in `diag`; the error count
/// decides whether the module should be used.
pub fn compile_source<'ctx>(
    source: &str,
    llcx: &'ctx Context,
    module: &Module<'ctx>,
    diag: &mut Diag,
) -> Compilation {
    let mut ast = AstContext::new();
    let mut types = TypeInterner::new();
    Parser::new(Lexer::new(source, 0), &mut ast, &mut types, diag).parse();
    irgen::generate(&ast, &mut types, diag, llcx, module);
    Compilation { ast, types }
}
