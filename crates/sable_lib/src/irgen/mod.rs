//! # IR Generation Module
//!
//! Middle-end of the compiler: turns the parsed AST into LLVM IR inside
//! a caller-provided module. Three passes run in a fixed order over the
//! global declaration list:
//!
//! 1. **Type resolution** ([`type_resolver`]): class names become class
//!    types, field tables and struct layouts are filled in.
//! 2. **Function resolution** ([`func_resolver`]): every function,
//!    constructor, method and destructor is declared, so calls resolve
//!    regardless of source order.
//! 3. **Emission** ([`emitter`]): one walk that type-checks and lowers
//!    statements and expressions to instructions.
//!
//! All passes share the diagnostics sink; none of them aborts on a
//! source error. The caller decides what to do with a module whose
//! compilation reported errors (the driver refuses to write it out).

pub mod converter;
pub mod emitter;
pub mod func_resolver;
pub mod scope;
pub mod type_resolver;

use inkwell::context::Context;
use inkwell::module::Module;

use crate::diag::Diag;
use crate::parser::ast::AstContext;
use crate::types::TypeInterner;

use self::converter::TypeConverter;
use self::emitter::IrEmitter;
use self::func_resolver::FuncResolver;
use self::scope::GlobalScope;
use self::type_resolver::TypeResolver;

/// Run the full middle-end over a parsed program.
pub fn generate<'ctx>(
    ast: &AstContext,
    types: &mut TypeInterner,
    diag: &mut Diag,
    llcx: &'ctx Context,
    module: &Module<'ctx>,
) {
    let mut converter = TypeConverter::new(llcx);
    TypeResolver::new(ast, types, &mut converter, diag).run();
    let mut global = GlobalScope::new();
    FuncResolver::new(ast, types, &converter, &mut global, module, diag).run();
    IrEmitter::new(ast, types, &converter, &mut global, diag, llcx, module).run();
}
