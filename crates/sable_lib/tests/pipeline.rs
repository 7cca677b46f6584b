//! Pipeline-level properties: determinism, lexer round-trips and the
//! print/reparse fixed point.

use inkwell::context::Context;

use sable_lib::diag::Diag;
use sable_lib::lexer::{Lexer, TokenKind};
use sable_lib::parser::ast::printer::print_program;
use sable_lib::parser::ast::AstContext;
use sable_lib::parser::Parser;
use sable_lib::types::TypeInterner;

const PROGRAM: &str = "\
public func put(c: Int) -> Int external (putchar);\n\
var calls: Int = 0;\n\
class Counter {\n\
    var count: Int;\n\
    init(start: Int) { self.count = start; }\n\
    public func bump() -> Void { self.count = self.count + 1; }\n\
    func get() -> Int { return self.count; }\n\
}\n\
func f(x: Int) -> Int {\n\
    let c: Counter = Counter(start: x);\n\
    if (x % 2 == 0 && x > 0) c.bump();\n\
    return x > 10 ? c.get() : -x;\n\
}\n";

fn compile(src: &str) -> (Vec<sable_lib::diag::DiagKind>, usize, usize, String) {
    let llcx = Context::create();
    let module = llcx.create_module("test");
    let mut diag = Diag::new();
    sable_lib::compile_source(src, &llcx, &module, &mut diag);
    (
        diag.kinds(),
        diag.error_count(),
        diag.warning_count(),
        module.print_to_string().to_string(),
    )
}

fn parse(src: &str) -> (AstContext, TypeInterner, Diag) {
    let mut ast = AstContext::new();
    let mut types = TypeInterner::new();
    let mut diag = Diag::new();
    Parser::new(Lexer::new(src, 0), &mut ast, &mut types, &mut diag).parse();
    (ast, types, diag)
}

#[test]
fn test_compilation_is_deterministic() {
    let (kinds_a, errors_a, warnings_a, ir_a) = compile(PROGRAM);
    let (kinds_b, errors_b, warnings_b, ir_b) = compile(PROGRAM);

    assert_eq!(kinds_a, kinds_b);
    assert_eq!(errors_a, errors_b);
    assert_eq!(warnings_a, warnings_b);
    assert_eq!(ir_a, ir_b);
}

#[test]
fn test_clean_program_compiles_clean() {
    let (kinds, errors, warnings, _) = compile(PROGRAM);

    assert_eq!(0, errors, "kinds were {kinds:?}");
    assert_eq!(0, warnings);
}

#[test]
fn test_relexing_yields_identical_tokens() {
    let lex_all = || {
        let mut diag = Diag::new();
        let mut lexer = Lexer::new(PROGRAM, 0);
        let mut tokens = vec![];
        loop {
            let token = lexer.next_token(&mut diag);
            let done = token.is(TokenKind::End);
            tokens.push(token);
            if done {
                break;
            }
        }
        tokens
    };

    let first = lex_all();
    let second = lex_all();
    assert_eq!(first, second);
    assert_eq!(TokenKind::End, first.last().unwrap().kind);
}

#[test]
fn test_print_reparse_fixed_point() {
    let (ast, types, diag) = parse(PROGRAM);
    assert_eq!(0, diag.error_count());

    let printed = print_program(&ast, &types);
    let (reparsed_ast, reparsed_types, rediag) = parse(&printed);
    assert_eq!(
        0,
        rediag.error_count(),
        "printed program failed to reparse:\n{printed}"
    );

    let reprinted = print_program(&reparsed_ast, &reparsed_types);
    assert_eq!(printed, reprinted);
}

#[test]
fn test_every_emitted_expression_has_a_type() {
    let llcx = Context::create();
    let module = llcx.create_module("test");
    let mut diag = Diag::new();
    let compilation = sable_lib::compile_source(PROGRAM, &llcx, &module, &mut diag);
    assert_eq!(0, diag.error_count());

    for expr in compilation.ast.exprs() {
        assert!(expr.ty().is_some(), "untyped expression at {}", expr.loc);
        // a clean compilation never assigns the error sentinel
        assert_ne!(Some(TypeInterner::ERROR), expr.ty());
    }
}

#[test]
fn test_skipped_subtrees_still_get_types() {
    // each declaration here hits a path that skips emission: surplus
    // call arguments, a non-constant global initializer, top-level
    // control flow, statements after a return, and a duplicate function
    let source = "\
func g(x: Int) -> Void {}\n\
func f() -> Void { g(x: 1, y: 2); }\n\
var bad: Int = g(x: 3);\n\
if (1 == 2) { let z = 4; }\n\
func g(x: Int) -> Void { let w = x + 1; }\n\
func h() -> Int { return 1; h(); }\n";
    let llcx = Context::create();
    let module = llcx.create_module("test");
    let mut diag = Diag::new();
    let compilation = sable_lib::compile_source(source, &llcx, &module, &mut diag);
    assert!(diag.has_errors());

    for expr in compilation.ast.exprs() {
        assert!(expr.ty().is_some(), "untyped expression at {}", expr.loc);
    }
}
