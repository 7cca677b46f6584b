//! Pass B: global function resolution.
//!
//! Walks the global declarations and enters every free function,
//! external function, constructor, method and destructor into the global
//! scope with its interned function type and LLVM declaration. After
//! this pass a call in one function can resolve to any other regardless
//! of source order; the language has no forward declarations.
//!
//! Constructors and methods receive the implicit `self` reference as
//! LLVM parameter 0; the interned source-level function type tracks
//! `self` separately so the named-argument list excludes it. Every class
//! gets a destructor declaration, user-written or not.

use inkwell::module::{Linkage, Module};

use crate::diag::{Diag, Diagnostic};
use crate::parser::ast::{Access, AstContext, ClassDecl, DeclKind, Param};
use crate::types::{TypeId, TypeInterner};

use super::converter::TypeConverter;
use super::scope::{FuncItem, GlobalScope};

pub struct FuncResolver<'a, 'ctx> {
    ast: &'a AstContext,
    types: &'a mut TypeInterner,
    converter: &'a TypeConverter<'ctx>,
    global: &'a mut GlobalScope<'ctx>,
    module: &'a Module<'ctx>,
    diag: &'a mut Diag,
}

fn linkage(access: Access) -> Option<Linkage> {
    match access {
        Access::Private => Some(Linkage::Internal),
        _ => None,
    }
}

impl<'a, 'ctx> FuncResolver<'a, 'ctx> {
    pub fn new(
        ast: &'a AstContext,
        types: &'a mut TypeInterner,
        converter: &'a TypeConverter<'ctx>,
        global: &'a mut GlobalScope<'ctx>,
        module: &'a Module<'ctx>,
        diag: &'a mut Diag,
    ) -> Self {
        Self {
            ast,
            types,
            converter,
            global,
            module,
            diag,
        }
    }

    pub fn run(&mut self) {
        for decl in self.ast.globals() {
            match &self.ast.decl(*decl).kind {
                DeclKind::Function(f) => {
                    if self.verify_func_name(&f.name, f.loc) {
                        f.set_already_defined();
                        continue;
                    }
                    let ty = self.function_type(&f.params, f.ret, None, false);
                    let item = self.declare(&f.name, ty, f.access);
                    self.global.set_func(&f.name, item);
                }
                DeclKind::ExtFunction(f) => {
                    if self.verify_func_name(&f.name, f.loc) {
                        f.set_already_defined();
                        continue;
                    }
                    let ty = self.function_type(&f.params, f.ret, None, false);
                    // declared under the alias symbol, looked up by the
                    // source name
                    let item = self.declare(&f.alias, ty, f.access);
                    self.global.set_func(&f.name, item);
                }
                DeclKind::Class(c) => {
                    if !c.skipped() {
                        self.resolve_class(c);
                    }
                }
                DeclKind::GlobalVar(_) | DeclKind::CtrlFlow(_) => {}
            }
        }
    }

    fn resolve_class(&mut self, class: &ClassDecl) {
        let Some(class_ty) = class.ty() else {
            return;
        };
        if let Some(ctor) = &class.ctor {
            let ty = self.function_type(&ctor.params, class_ty, Some(class_ty), true);
            let item = self.declare(&format!("{}.ctor", class.name), ty, class.access);
            self.global.set_ctor(
                class_ty,
                item,
                Access::effective(class.access, ctor.access),
            );
        }
        for method in &class.methods {
            let ty = self.function_type(&method.params, method.ret, Some(class_ty), false);
            let item = self.declare(
                &format!("{}.{}", class.name, method.name),
                ty,
                class.access,
            );
            if self.global.set_method(
                class_ty,
                &method.name,
                item,
                Access::effective(class.access, method.access),
            ) {
                self.diag
                    .report(Diagnostic::func_already_defined(method.loc, &method.name));
                method.set_already_defined();
            }
        }
        self.declare_dtor(class, class_ty);
    }

    /// Every class gets a destructor taking only the object reference.
    fn declare_dtor(&mut self, class: &ClassDecl, class_ty: TypeId) {
        let ty = self
            .types
            .function(vec![], TypeInterner::VOID, Some(class_ty), false);
        let item = self.declare(&format!("{}.dtor", class.name), ty, class.access);
        self.global.set_dtor(class_ty, item.func);
    }

    fn function_type(
        &mut self,
        params: &[Param],
        ret: TypeId,
        self_class: Option<TypeId>,
        is_ctor: bool,
    ) -> TypeId {
        let param_types = params.iter().map(|p| p.ty).collect();
        self.types.function(param_types, ret, self_class, is_ctor)
    }

    fn declare(&mut self, symbol: &str, ty: TypeId, access: Access) -> FuncItem<'ctx> {
        let llvm_ty = self.converter.function_type(self.types, ty);
        let func = self.module.add_function(symbol, llvm_ty, linkage(access));
        FuncItem { ty, func }
    }

    /// A function name must not collide with another global or a type.
    fn verify_func_name(&mut self, name: &str, loc: crate::lexer::Location) -> bool {
        if self.global.get(name).is_some() {
            self.diag
                .report(Diagnostic::func_already_defined(loc, name));
            return true;
        }
        if self.types.named(name).is_some() {
            self.diag
                .report(Diagnostic::func_named_after_type(loc, name));
            return true;
        }
        false
    }
}
