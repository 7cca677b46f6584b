//! End-to-end semantic tests: source text through the whole pipeline
//! into an LLVM module, asserting on diagnostic kinds, counts and the
//! shape of the emitted IR.

use inkwell::context::Context;

use sable_lib::diag::{Diag, DiagKind};

/// Run the full pipeline and hand back the diagnostics and textual IR.
fn compile(src: &str) -> (Diag, String) {
    let llcx = Context::create();
    let module = llcx.create_module("test");
    let mut diag = Diag::new();
    sable_lib::compile_source(src, &llcx, &module, &mut diag);
    (diag, module.print_to_string().to_string())
}

fn valid(src: &str) -> String {
    let (diag, ir) = compile(src);
    assert_eq!(
        0,
        diag.error_count(),
        "expected no errors for {src:?}, got {:?}",
        diag.diagnostics()
    );
    ir
}

fn invalid(src: &str) -> Diag {
    let (diag, _) = compile(src);
    assert!(diag.has_errors(), "expected errors for {src:?}");
    diag
}

/// Exactly one diagnostic, of the given kind.
fn exactly_one(src: &str, kind: DiagKind) {
    let (diag, _) = compile(src);
    assert_eq!(
        vec![kind],
        diag.kinds(),
        "expected exactly one {kind:?} for {src:?}, got {:?}",
        diag.diagnostics()
    );
}

#[test]
fn test_empty_void_function() {
    let ir = valid("func f() -> Void {}");

    assert!(ir.contains("define void @f()"), "ir was: {ir}");
    assert!(ir.contains("ret void"), "ir was: {ir}");
}

#[test]
fn test_add_of_param_and_constant() {
    let ir = valid("func f(x: Int) -> Int { return x + 1; }");

    assert!(ir.contains("define i32 @f(i32"), "ir was: {ir}");
    assert!(ir.contains("add i32"), "ir was: {ir}");
    assert!(ir.contains("ret i32"), "ir was: {ir}");
}

#[test]
fn test_void_return_with_value_of_parameter() {
    valid("func f(x: Int) -> Void { return; }");
}

#[test]
fn test_if_without_else() {
    let ir = valid("func f(x: Int) -> Int { if (x % 2 == 0) return 1337; return x; }");

    assert!(ir.contains("srem i32"), "ir was: {ir}");
    assert!(ir.contains("if.then"), "ir was: {ir}");
    assert!(ir.contains("1337"), "ir was: {ir}");
}

#[test]
fn test_nested_and_chained_if() {
    valid(
        "func f(x: Int) -> Int \
         { \
             if (x > 0) \
                 if (x > 1337) \
                     x = 5; \
                 else \
                     return 1; \
             else \
                 return 2; \
             return x; \
         }",
    );
    valid(
        "func f(x: Int) -> Int { if (x == 0) return 0; \
         else if (x == 1) return 1; else return x; }",
    );
}

#[test]
fn test_recursion_with_named_args() {
    valid(
        "func fibonacci(x: Int) -> Int \
         { \
             if (x <= 0) return 0; \
             else if (x == 1) return 1; \
             else return fibonacci(x: x - 1) + fibonacci(x: x - 2); \
         }",
    );
}

#[test]
fn test_locals_allocate_in_entry_block() {
    let ir = valid("func f(x: Int) -> Int { let y: Int = x * 2; y = y / x; return y; }");

    assert!(ir.contains("sdiv i32"), "ir was: {ir}");
    // both the parameter and the local get entry-block slots, in front
    // of every other instruction
    let entry = ir
        .split("entry:")
        .nth(1)
        .expect("function should have an entry block");
    let first_non_alloca = entry
        .lines()
        .skip(1)
        .position(|line| !line.trim().is_empty() && !line.contains("alloca"));
    let allocas = entry
        .lines()
        .skip(1)
        .take_while(|line| line.contains("alloca"))
        .count();
    assert_eq!(2, allocas, "ir was: {ir}");
    assert!(first_non_alloca.is_some());
}

#[test]
fn test_void_param_is_exactly_one_error() {
    exactly_one(
        "func f(x: Void) -> Void { return x; }",
        DiagKind::InvalidParamType,
    );
}

#[test]
fn test_returning_void_call_is_exactly_one_error() {
    exactly_one(
        "func f() -> Void { return f(); }",
        DiagKind::CantReturnVoidValue,
    );
}

#[test]
fn test_top_level_if_is_exactly_one_error() {
    exactly_one("if (x == 1) {;}", DiagKind::TopLevelCtrlFlow);
}

#[test]
fn test_overflowing_literal_warns_and_truncates() {
    let (diag, ir) = compile(
        "func f() -> Int { return 999999999999999999999999999999999; }",
    );

    assert_eq!(0, diag.error_count());
    assert_eq!(1, diag.warning_count());
    assert_eq!(vec![DiagKind::OverflowDetected], diag.kinds());
    let truncated = (999999999999999999999999999999999u128 & 0xFFFF_FFFF) as u32;
    assert!(
        ir.contains(&format!("{}", truncated as i32)),
        "ir was: {ir}"
    );
}

#[test]
fn test_short_circuit_lowering() {
    let ir = valid(
        "func f(a: Bool, b: Bool) -> Bool { return a && b; } \
         func g(a: Bool, b: Bool) -> Bool { return a || b; }",
    );

    // three-block phi merge, not a select
    assert!(ir.contains("and.long"), "ir was: {ir}");
    assert!(ir.contains("and.cont"), "ir was: {ir}");
    assert!(ir.contains("or.long"), "ir was: {ir}");
    assert!(ir.contains("phi i1"), "ir was: {ir}");
    assert!(!ir.contains("select"), "ir was: {ir}");
}

#[test]
fn test_short_circuit_requires_bools() {
    let diag = invalid("func f(a: Int, b: Bool) -> Bool { return a && b; }");

    assert!(diag.kinds().contains(&DiagKind::CannotConvert));
}

#[test]
fn test_ternary_phi_merge() {
    let ir = valid("func f(c: Bool, x: Int, y: Int) -> Int { return c ? x : y; }");

    assert!(ir.contains("ternary.then"), "ir was: {ir}");
    assert!(ir.contains("ternary.else"), "ir was: {ir}");
    assert!(ir.contains("ternary.phi"), "ir was: {ir}");
    assert!(ir.contains("phi i32"), "ir was: {ir}");
}

#[test]
fn test_ternary_arm_mismatch() {
    exactly_one(
        "func f(c: Bool) -> Int { return c ? 1 : true; }",
        DiagKind::TernaryTypeMismatch,
    );
}

#[test]
fn test_both_arms_returning_drops_end_block() {
    let ir = valid("func f(c: Bool) -> Int { if (c) return 1; else return 2; }");

    assert!(!ir.contains("if.end"), "ir was: {ir}");
}

#[test]
fn test_forward_reference_between_functions() {
    valid("func f() -> Int { return g(); } func g() -> Int { return 1; }");
}

#[test]
fn test_external_function_uses_alias_symbol() {
    let ir = valid(
        "func put(c: Int) -> Int external (putchar); \
         func f() -> Int { return put(c: 65); }",
    );

    assert!(ir.contains("declare i32 @putchar(i32)"), "ir was: {ir}");
    assert!(!ir.contains("@put("), "ir was: {ir}");
}

#[test]
fn test_unknown_identifier() {
    exactly_one("func f() -> Int { return y; }", DiagKind::UnknownIdent);
}

#[test]
fn test_calling_a_non_function() {
    exactly_one(
        "func f(x: Int) -> Void { x(); }",
        DiagKind::NotAFunction,
    );
}

#[test]
fn test_argument_count_mismatch() {
    exactly_one(
        "func g(x: Int) -> Void {} func f() -> Void { g(); }",
        DiagKind::MismatchingArgCount,
    );
}

#[test]
fn test_argument_type_mismatch() {
    exactly_one(
        "func g(x: Int) -> Void {} func f() -> Void { g(x: true); }",
        DiagKind::CannotConvert,
    );
}

#[test]
fn test_missing_return() {
    exactly_one(
        "func f(c: Bool) -> Int { if (c) return 1; }",
        DiagKind::MissingReturn,
    );
}

#[test]
fn test_missing_return_emits_unreachable() {
    let (_, ir) = compile("func f(c: Bool) -> Int { if (c) return 1; }");

    assert!(ir.contains("unreachable"), "ir was: {ir}");
}

#[test]
fn test_duplicate_function() {
    exactly_one(
        "func f() -> Void {} func f() -> Void {}",
        DiagKind::FuncAlreadyDefined,
    );
}

#[test]
fn test_duplicate_function_emits_single_body() {
    let (_, ir) = compile("func f() -> Int { return 1; } func f() -> Int { return 2; }");

    assert_eq!(1, ir.matches("define i32 @f").count(), "ir was: {ir}");
}

#[test]
fn test_variable_redefinition_in_same_frame() {
    exactly_one(
        "func f() -> Void { let x: Int = 1; let x: Int = 2; }",
        DiagKind::VarAlreadyDefined,
    );
}

#[test]
fn test_shadowing_in_inner_block_is_fine() {
    valid("func f() -> Void { let x: Int = 1; { let x: Bool = true; } }");
}

#[test]
fn test_var_type_mismatch() {
    exactly_one(
        "func f() -> Void { let x: Bool = 1; }",
        DiagKind::MismatchingVarTypes,
    );
}

#[test]
fn test_inferred_var_type() {
    valid("func f() -> Int { let x = 41; return x + 1; }");
}

#[test]
fn test_assigning_to_unknown_variable() {
    exactly_one("func f() -> Void { y = 1; }", DiagKind::UnknownIdent);
}

#[test]
fn test_assigning_to_a_literal() {
    exactly_one("func f() -> Void { 1 = 2; }", DiagKind::LhsNotAssignable);
}

#[test]
fn test_unary_bang_requires_bool() {
    exactly_one("func f() -> Void { let x = !1; }", DiagKind::InvalidUnary);
}

#[test]
fn test_mismatching_binary_operands() {
    exactly_one(
        "func f() -> Void { let x = 1 + true; }",
        DiagKind::InvalidBinary,
    );
}

#[test]
fn test_funception_skips_nested_body() {
    let diag = invalid("func f() -> Void { func g() -> Void {} }");

    assert!(diag.kinds().contains(&DiagKind::Funception));
}

#[test]
fn test_global_variable_load_and_store() {
    let ir = valid(
        "var counter: Int = 0; \
         func bump() -> Int { counter = counter + 1; return counter; }",
    );

    assert!(ir.contains("@counter = global i32 0"), "ir was: {ir}");
}

#[test]
fn test_global_requires_constant_initializer() {
    exactly_one(
        "func f() -> Int { return 1; } var x: Int = f();",
        DiagKind::NonConstGlobalInit,
    );
}

#[test]
fn test_class_with_field_method_and_ctor() {
    let ir = valid(
        "class Counter { \
             var count: Int; \
             init(start: Int) { self.count = start; } \
             func get() -> Int { return self.count; } \
             func bump() -> Void { self.count = self.count + 1; } \
         } \
         func f() -> Int { \
             let c: Counter = Counter(start: 3); \
             c.bump(); \
             return c.get(); \
         }",
    );

    // reference-counted layout: { i32, { fields } }
    assert!(
        ir.contains("%Counter = type { i32, %struct.Counter }"),
        "ir was: {ir}"
    );
    assert!(ir.contains("%struct.Counter = type { i32 }"), "ir was: {ir}");
    assert!(ir.contains("@malloc"), "ir was: {ir}");
    assert!(ir.contains("Counter.ctor"), "ir was: {ir}");
    assert!(ir.contains("Counter.dtor"), "ir was: {ir}");
}

#[test]
fn test_private_member_is_inaccessible_outside() {
    exactly_one(
        "class C { \
             private var secret: Int; \
             init() {} \
             func get() -> Int { return self.secret; } \
         } \
         func f() -> Int { return C().secret; }",
        DiagKind::InaccessibleMember,
    );
}

#[test]
fn test_unknown_member() {
    exactly_one(
        "class C { init() {} } \
         func f() -> Void { let c = C(); c.missing(); }",
        DiagKind::UnknownMember,
    );
}

#[test]
fn test_member_access_on_non_class() {
    exactly_one(
        "func f(x: Int) -> Int { return x.field; }",
        DiagKind::NotAClass,
    );
}

#[test]
fn test_class_without_ctor_cannot_be_constructed() {
    exactly_one(
        "class C { var x: Int; } func f() -> Void { let c = C(); }",
        DiagKind::NoCtor,
    );
}

#[test]
fn test_duplicate_class() {
    exactly_one(
        "class C { init() {} } class C { var x: Int; }",
        DiagKind::DuplicateType,
    );
}

#[test]
fn test_duplicate_field() {
    exactly_one(
        "class C { var x: Int; var x: Bool; init() {} }",
        DiagKind::DuplicateField,
    );
}

#[test]
fn test_function_named_after_class() {
    exactly_one(
        "class C { init() {} } func C() -> Void {}",
        DiagKind::FuncNamedAfterType,
    );
}

#[test]
fn test_classes_can_reference_each_other() {
    valid(
        "class A { \
             var other: B; \
             init(other: B) { self.other = other; } \
         } \
         class B { \
             var x: Int; \
             init() { self.x = 0; } \
         } \
         func f() -> Void { let a = A(other: B()); }",
    );
}

#[test]
fn test_class_typed_parameter() {
    valid(
        "class P { var x: Int; init(x: Int) { self.x = x; } } \
         func get(p: P) -> Int { return p.x; }",
    );
}

#[test]
fn test_unknown_class_parameter_type() {
    exactly_one(
        "func f(p: Missing) -> Void {}",
        DiagKind::InvalidParamType,
    );
}
