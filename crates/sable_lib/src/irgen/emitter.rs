//! # IR Emitter
//!
//! Single walk over the AST that type-checks and lowers at the same
//! time. For every expression it computes the source-level type (stored
//! back on the node) and produces an LLVM value; for every statement it
//! produces control flow through the shared builder.
//!
//! ## Error discipline
//!
//! Nothing here aborts. A failed check reports through the diagnostics
//! sink, assigns the `Error` sentinel type to the offending node and
//! yields no value. `Error`-typed operands poison their parents
//! silently: the parent takes the sentinel type without reporting again,
//! so one source mistake surfaces as exactly one diagnostic.
//!
//! Subtrees that are skipped outright instead of emitted (duplicate
//! functions, dropped classes, top-level control flow, statements after
//! a terminator) are poisoned recursively, so every expression node ends
//! up with a type either way.
//!
//! ## Control-flow discipline
//!
//! - Every basic block ends in exactly one terminator. Emitting `ret` or
//!   `unreachable` clears the builder's insertion position; a block's
//!   statement loop stops once the position is gone, so code after a
//!   fully-terminated `if` is simply not emitted.
//! - The `end` block of an `if` whose arms both terminate has no
//!   predecessors and is removed from the function.
//! - Short-circuit `&&`/`||` and the ternary operator lower to explicit
//!   blocks joined by a phi. `select` would not preserve the
//!   short-circuit law when the right-hand side has side effects.
//!
//! ## Allocation discipline
//!
//! All stack slots go to the top of the function's entry block. A hidden
//! `allocapoint` marker instruction is created on first use; every
//! `alloca` is inserted before it and the marker is erased when the
//! function is done.

use inkwell::basic_block::BasicBlock;
use inkwell::builder::Builder;
use inkwell::context::Context;
use inkwell::module::{Linkage, Module};
use inkwell::values::{
    BasicMetadataValueEnum, BasicValue, BasicValueEnum, FunctionValue, InstructionValue,
    PointerValue,
};
use inkwell::types::BasicTypeEnum;
use inkwell::{AddressSpace, IntPredicate};

use crate::diag::{Diag, Diagnostic};
use crate::lexer::Location;
use crate::parser::ast::{
    Access, Arg, AstContext, BinaryOp, ClassDecl, DeclKind, ExprId, ExprKind, FunctionDecl,
    Param, StmtId, StmtKind, UnaryOp, VarDecl,
};
use crate::types::{Field, TypeId, TypeInterner};

use super::converter::TypeConverter;
use super::scope::{FuncScope, GlobalScope, Symbol, VarItem};

pub struct IrEmitter<'a, 'ctx> {
    ast: &'a AstContext,
    types: &'a TypeInterner,
    converter: &'a TypeConverter<'ctx>,
    global: &'a mut GlobalScope<'ctx>,
    diag: &'a mut Diag,
    llcx: &'ctx Context,
    module: &'a Module<'ctx>,
    builder: Builder<'ctx>,
    func: FuncScope<'ctx>,
    /// Class whose ctor/method body is being emitted; grants access to
    /// private members.
    current_class: Option<TypeId>,
    /// Marker instruction in the entry block that allocas are inserted
    /// before.
    alloca_point: Option<InstructionValue<'ctx>>,
}

impl<'a, 'ctx> IrEmitter<'a, 'ctx> {
    pub fn new(
        ast: &'a AstContext,
        types: &'a TypeInterner,
        converter: &'a TypeConverter<'ctx>,
        global: &'a mut GlobalScope<'ctx>,
        diag: &'a mut Diag,
        llcx: &'ctx Context,
        module: &'a Module<'ctx>,
    ) -> Self {
        Self {
            ast,
            types,
            converter,
            global,
            diag,
            llcx,
            module,
            builder: llcx.create_builder(),
            func: FuncScope::new(),
            current_class: None,
            alloca_point: None,
        }
    }

    pub fn run(&mut self) {
        let ast = self.ast;
        for decl in ast.globals() {
            match &ast.decl(*decl).kind {
                DeclKind::Function(f) => self.emit_function(f),
                // declared by the function resolver; nothing to define
                DeclKind::ExtFunction(_) => {}
                DeclKind::GlobalVar(v) => self.emit_global_var(v),
                DeclKind::Class(c) => {
                    if !c.skipped() {
                        self.emit_class(c);
                    } else {
                        self.poison_class(c);
                    }
                }
                DeclKind::CtrlFlow(stmt) => {
                    let loc = ast.stmt(*stmt).loc;
                    self.diag.report(Diagnostic::top_level_ctrl_flow(loc));
                    self.poison_stmt(*stmt);
                }
            }
        }
    }

    fn expr_ty(&self, id: ExprId) -> TypeId {
        self.ast.expr(id).ty().unwrap_or(TypeInterner::ERROR)
    }

    fn set_ty(&self, id: ExprId, ty: TypeId) {
        self.ast.expr(id).set_ty(ty);
    }

    fn accessible(&self, class: TypeId, effective: Access) -> bool {
        effective != Access::Private || self.current_class == Some(class)
    }

    // ---------------------------------------------------------------
    // declarations
    // ---------------------------------------------------------------

    fn emit_function(&mut self, f: &FunctionDecl) {
        if f.already_defined() {
            // flagged by the function resolver
            self.poison_stmt(f.body);
            return;
        }
        if !self.func.is_empty() {
            // funcception!
            self.diag.report(Diagnostic::func_in_func(f.loc, &f.name));
            self.poison_stmt(f.body);
            return;
        }
        let Some(item) = self.global.get_func(&f.name) else {
            self.poison_stmt(f.body);
            return;
        };
        self.emit_body(item.func, None, &f.params, f.ret, f.body, f.loc, &f.name);
    }

    fn emit_class(&mut self, class: &ClassDecl) {
        let Some(class_ty) = class.ty() else {
            return;
        };
        self.current_class = Some(class_ty);
        if let Some(ctor) = &class.ctor {
            if let Some((item, _)) = self.global.ctor(class_ty) {
                // the body of a ctor initializes an existing object and
                // returns nothing
                self.emit_body(
                    item.func,
                    Some(class_ty),
                    &ctor.params,
                    TypeInterner::VOID,
                    ctor.body,
                    ctor.loc,
                    "init",
                );
            }
        }
        for method in &class.methods {
            if method.already_defined() {
                self.poison_stmt(method.body);
                continue;
            }
            if let Some((item, _)) = self.global.method(class_ty, &method.name) {
                self.emit_body(
                    item.func,
                    Some(class_ty),
                    &method.params,
                    method.ret,
                    method.body,
                    method.loc,
                    &method.name,
                );
            }
        }
        self.emit_dtor(class_ty);
        self.current_class = None;
    }

    /// Define the destructor declared for every class: release the
    /// allocation and return.
    fn emit_dtor(&mut self, class_ty: TypeId) {
        let Some(dtor) = self.global.dtor(class_ty) else {
            return;
        };
        let entry = self.llcx.append_basic_block(dtor, "entry");
        self.builder.position_at_end(entry);
        let this = dtor.get_nth_param(0).unwrap();
        let free = self.free_decl();
        self.builder.build_call(free, &[this.into()], "").unwrap();
        self.builder.build_return(None).unwrap();
        self.builder.clear_insertion_position();
    }

    /// Shared body emission for functions, constructors and methods.
    fn emit_body(
        &mut self,
        llfn: FunctionValue<'ctx>,
        self_class: Option<TypeId>,
        params: &[Param],
        ret: TypeId,
        body: StmtId,
        loc: Location,
        name: &str,
    ) {
        let entry = self.llcx.append_basic_block(llfn, "entry");
        self.builder.position_at_end(entry);
        self.func.enter();
        self.func.set_return_type(ret);
        let offset = self_class.is_some() as u32;
        if let Some(class) = self_class {
            // bind the implicit receiver like any other parameter
            let llty = self.converter.value_type(self.types, class);
            let slot = self.create_entry_alloca(llty, "self");
            let param = llfn.get_nth_param(0).unwrap();
            self.builder.build_store(slot, param).unwrap();
            self.func.set(
                "self",
                VarItem {
                    ty: class,
                    ptr: Some(slot),
                },
            );
        }
        for (i, param) in params.iter().enumerate() {
            self.bind_param(llfn, i as u32 + offset, param);
        }
        self.emit_stmt(body);
        // make sure the last block is terminated
        if let Some(block) = self.builder.get_insert_block() {
            if block.get_terminator().is_none() {
                if self.types.resolve(ret) == TypeInterner::VOID {
                    self.builder.build_return(None).unwrap();
                } else {
                    self.diag.report(Diagnostic::missing_return(loc, name));
                    self.builder.build_unreachable().unwrap();
                }
            }
        }
        self.builder.clear_insertion_position();
        self.func.exit();
        // nobody needs to see the marker
        if let Some(marker) = self.alloca_point.take() {
            marker.erase_from_basic_block();
        }
    }

    /// Give a parameter a stack slot in the entry block, store the
    /// incoming argument and bind the name.
    fn bind_param(&mut self, llfn: FunctionValue<'ctx>, index: u32, param: &Param) {
        if param.ty == TypeInterner::ERROR {
            // the parser already complained about the annotation
            self.func.set(
                &param.name,
                VarItem {
                    ty: TypeInterner::ERROR,
                    ptr: None,
                },
            );
            return;
        }
        if !self.types.is_valid(param.ty) {
            self.diag.report(Diagnostic::invalid_param_type(
                param.loc,
                &param.name,
                &self.types.display(param.ty),
            ));
            self.func.set(
                &param.name,
                VarItem {
                    ty: TypeInterner::ERROR,
                    ptr: None,
                },
            );
            return;
        }
        let llty = self.converter.value_type(self.types, param.ty);
        let slot = self.create_entry_alloca(llty, &param.name);
        let value = llfn.get_nth_param(index).unwrap();
        self.builder.build_store(slot, value).unwrap();
        self.func.set(
            &param.name,
            VarItem {
                ty: param.ty,
                ptr: Some(slot),
            },
        );
    }

    /// Lower a global `let`/`var` to an LLVM global with a constant
    /// initializer.
    fn emit_global_var(&mut self, v: &VarDecl) {
        let init = match v.init {
            Some(expr) => match self.const_eval(expr) {
                Some(pair) => Some(pair),
                None => {
                    self.diag
                        .report(Diagnostic::non_const_global_init(v.loc, &v.name));
                    self.bind_global_error(&v.name);
                    return;
                }
            },
            None => None,
        };
        let ty = match v.ty {
            Some(t) if t == TypeInterner::ERROR => {
                self.bind_global_error(&v.name);
                return;
            }
            Some(t) => {
                if !self.types.is_valid(t) {
                    self.diag.report(Diagnostic::invalid_var_type(
                        v.loc,
                        &v.name,
                        &self.types.display(t),
                    ));
                    self.bind_global_error(&v.name);
                    return;
                }
                if let Some((_, init_ty)) = init {
                    if self.types.is_error(init_ty) {
                        self.bind_global_error(&v.name);
                        return;
                    }
                    if self.types.resolve(init_ty) != self.types.resolve(t) {
                        self.diag.report(Diagnostic::mismatching_var_types(
                            v.loc,
                            &v.name,
                            &self.types.display(t),
                            &self.types.display(init_ty),
                        ));
                        self.bind_global_error(&v.name);
                        return;
                    }
                }
                t
            }
            None => {
                // the parser guarantees an initializer when the type is
                // elided
                let Some((_, init_ty)) = init else {
                    return;
                };
                if self.types.is_error(init_ty) {
                    self.bind_global_error(&v.name);
                    return;
                }
                if !self.types.is_valid(init_ty) {
                    self.diag.report(Diagnostic::invalid_var_type(
                        v.loc,
                        &v.name,
                        &self.types.display(init_ty),
                    ));
                    self.bind_global_error(&v.name);
                    return;
                }
                init_ty
            }
        };
        if self.global.get(&v.name).is_some() {
            self.diag
                .report(Diagnostic::var_already_defined(v.loc, &v.name));
            return;
        }
        let llty = self.converter.value_type(self.types, ty);
        let global = self.module.add_global(llty, None, &v.name);
        match init {
            Some((value, _)) => global.set_initializer(&value),
            None => {
                let zero = llty.const_zero();
                global.set_initializer(&zero);
            }
        }
        if v.access == Access::Private {
            global.set_linkage(Linkage::Internal);
        }
        self.global.set_var(
            &v.name,
            VarItem {
                ty,
                ptr: Some(global.as_pointer_value()),
            },
        );
    }

    fn bind_global_error(&mut self, name: &str) {
        self.global.set_var(
            name,
            VarItem {
                ty: TypeInterner::ERROR,
                ptr: None,
            },
        );
    }

    /// Constant evaluation for global initializers: literals, possibly
    /// negated. Assigns node types along the way.
    fn const_eval(&mut self, id: ExprId) -> Option<(BasicValueEnum<'ctx>, TypeId)> {
        let expr = self.ast.expr(id);
        match &expr.kind {
            ExprKind::Literal { bits, width: 1 } => {
                expr.set_ty(TypeInterner::BOOL);
                let value = self.llcx.bool_type().const_int(*bits as u64, false);
                Some((value.into(), TypeInterner::BOOL))
            }
            ExprKind::Literal { bits, width: 32 } => {
                expr.set_ty(TypeInterner::INT);
                let value = self.llcx.i32_type().const_int(*bits as u64, false);
                Some((value.into(), TypeInterner::INT))
            }
            ExprKind::Unary {
                op: UnaryOp::Neg,
                expr: inner,
            } => {
                let (value, ty) = self.const_eval(*inner)?;
                if ty != TypeInterner::INT {
                    expr.set_ty(TypeInterner::ERROR);
                    return None;
                }
                expr.set_ty(TypeInterner::INT);
                Some((value.into_int_value().const_neg().into(), TypeInterner::INT))
            }
            _ => {
                // not constant; the whole subtree gets the sentinel type
                self.poison_expr(id);
                None
            }
        }
    }

    // ---------------------------------------------------------------
    // statements
    // ---------------------------------------------------------------

    fn emit_stmt(&mut self, id: StmtId) {
        let ast = self.ast;
        let stmt = ast.stmt(id);
        match &stmt.kind {
            StmtKind::Empty => {}
            StmtKind::Block(stmts) => {
                self.func.enter();
                for stmt in stmts {
                    // everything after a terminated block is unreachable
                    // and only gets poisoned types
                    if self.builder.get_insert_block().is_none() {
                        self.poison_stmt(*stmt);
                        continue;
                    }
                    self.emit_stmt(*stmt);
                }
                self.func.exit();
            }
            StmtKind::If {
                cond,
                then_case,
                else_case,
            } => self.emit_if(*cond, *then_case, *else_case),
            StmtKind::Return(value) => self.emit_return(stmt.loc, *value),
            StmtKind::Local(v) => self.emit_local(v),
            StmtKind::Expr(expr) => {
                self.emit_expr(*expr);
            }
        }
    }

    fn emit_if(&mut self, cond: ExprId, then_case: StmtId, else_case: Option<StmtId>) {
        // top-level control flow is rejected in run() before any
        // statement is emitted
        debug_assert!(!self.func.is_empty(), "if statement outside a function");
        self.func.enter();
        let cond_value = self.emit_expr(cond);
        let cond_ty = self.expr_ty(cond);
        let cond = if self.types.resolve(cond_ty) == TypeInterner::BOOL {
            match cond_value {
                Some(value) => value.into_int_value(),
                None => self.llcx.bool_type().const_zero(),
            }
        } else {
            if !self.types.is_error(cond_ty) {
                self.diag.report(Diagnostic::cannot_convert(
                    self.ast.expr(cond).loc,
                    &self.types.display(cond_ty),
                    "Bool",
                ));
            }
            self.llcx.bool_type().const_zero()
        };
        let function = self
            .builder
            .get_insert_block()
            .unwrap()
            .get_parent()
            .unwrap();
        let then_block = self.llcx.append_basic_block(function, "if.then");
        let else_block = self.llcx.append_basic_block(function, "if.else");
        let end_block = self.llcx.append_basic_block(function, "if.end");
        self.builder
            .build_conditional_branch(cond, then_block, else_block)
            .unwrap();
        // then case
        self.func.enter();
        self.builder.position_at_end(then_block);
        self.emit_stmt(then_case);
        self.branch_to(end_block);
        self.func.exit();
        // else case
        self.func.enter();
        self.builder.position_at_end(else_block);
        if let Some(else_case) = else_case {
            self.emit_stmt(else_case);
        }
        self.branch_to(end_block);
        self.func.exit();
        self.func.exit();
        // when both arms terminate, the end block has no predecessors
        // and everything after the if is unreachable
        if end_block.get_first_use().is_some() {
            self.builder.position_at_end(end_block);
        } else {
            end_block.remove_from_function().ok();
            self.builder.clear_insertion_position();
        }
    }

    fn emit_return(&mut self, loc: Location, value: Option<ExprId>) {
        let return_type = self.func.return_type().unwrap_or(TypeInterner::VOID);
        match value {
            None => {
                if self.types.resolve(return_type) == TypeInterner::VOID {
                    self.builder.build_return(None).unwrap();
                } else {
                    self.diag.report(Diagnostic::retval_mismatches_rettype(
                        loc,
                        "Void",
                        &self.types.display(return_type),
                    ));
                    self.builder.build_unreachable().unwrap();
                }
            }
            Some(value) => {
                let emitted = self.emit_expr(value);
                let ty = self.expr_ty(value);
                let value_loc = self.ast.expr(value).loc;
                if self.types.is_error(ty) {
                    // already diagnosed; keep the block well-formed
                    self.builder.build_unreachable().unwrap();
                } else if self.types.resolve(ty) == TypeInterner::VOID {
                    self.diag
                        .report(Diagnostic::cant_return_void_value(value_loc));
                    self.builder.build_unreachable().unwrap();
                } else if self.types.resolve(ty) != self.types.resolve(return_type) {
                    self.diag.report(Diagnostic::retval_mismatches_rettype(
                        value_loc,
                        &self.types.display(ty),
                        &self.types.display(return_type),
                    ));
                    self.builder.build_unreachable().unwrap();
                } else if let Some(result) = emitted {
                    self.builder.build_return(Some(&result)).unwrap();
                } else {
                    self.builder.build_unreachable().unwrap();
                }
            }
        }
        // nothing after a return is reachable
        self.builder.clear_insertion_position();
    }

    fn emit_local(&mut self, v: &VarDecl) {
        let init = v.init.map(|init| (self.emit_expr(init), self.expr_ty(init)));
        let ty = match v.ty {
            Some(t) if t == TypeInterner::ERROR => {
                // annotation failed to parse; already diagnosed
                self.bind_local_error(&v.name);
                return;
            }
            Some(t) => {
                if !self.types.is_valid(t) {
                    self.diag.report(Diagnostic::invalid_var_type(
                        v.loc,
                        &v.name,
                        &self.types.display(t),
                    ));
                    self.bind_local_error(&v.name);
                    return;
                }
                if let Some((_, init_ty)) = init {
                    if self.types.is_error(init_ty) {
                        self.bind_local_error(&v.name);
                        return;
                    }
                    if self.types.resolve(init_ty) != self.types.resolve(t) {
                        self.diag.report(Diagnostic::mismatching_var_types(
                            v.loc,
                            &v.name,
                            &self.types.display(t),
                            &self.types.display(init_ty),
                        ));
                        self.bind_local_error(&v.name);
                        return;
                    }
                }
                t
            }
            None => {
                let Some((_, init_ty)) = init else {
                    return;
                };
                if self.types.is_error(init_ty) {
                    self.bind_local_error(&v.name);
                    return;
                }
                if !self.types.is_valid(init_ty) {
                    self.diag.report(Diagnostic::invalid_var_type(
                        v.loc,
                        &v.name,
                        &self.types.display(init_ty),
                    ));
                    self.bind_local_error(&v.name);
                    return;
                }
                init_ty
            }
        };
        let llty = self.converter.value_type(self.types, ty);
        let slot = self.create_entry_alloca(llty, &v.name);
        if self.func.set(
            &v.name,
            VarItem {
                ty,
                ptr: Some(slot),
            },
        ) {
            self.diag
                .report(Diagnostic::var_already_defined(v.loc, &v.name));
            // nobody can refer to the slot
            if let Some(instruction) = slot.as_instruction_value() {
                instruction.erase_from_basic_block();
            }
            return;
        }
        if let Some((Some(value), _)) = init {
            self.builder.build_store(slot, value).unwrap();
        }
    }

    fn bind_local_error(&mut self, name: &str) {
        self.func.set(
            name,
            VarItem {
                ty: TypeInterner::ERROR,
                ptr: None,
            },
        );
    }

    /// Assign the sentinel type to an expression and every expression
    /// below it. Used for subtrees that are skipped instead of emitted;
    /// types that were already assigned are left alone.
    fn poison_expr(&self, id: ExprId) {
        let expr = self.ast.expr(id);
        if expr.ty().is_none() {
            expr.set_ty(TypeInterner::ERROR);
        }
        match &expr.kind {
            ExprKind::Ident(_) | ExprKind::Literal { .. } | ExprKind::SelfRef => {}
            ExprKind::Unary { expr, .. } => self.poison_expr(*expr),
            ExprKind::Binary { lhs, rhs, .. } => {
                self.poison_expr(*lhs);
                self.poison_expr(*rhs);
            }
            ExprKind::Ternary {
                cond,
                then_case,
                else_case,
            } => {
                self.poison_expr(*cond);
                self.poison_expr(*then_case);
                self.poison_expr(*else_case);
            }
            ExprKind::Call { callee, args } => {
                self.poison_expr(*callee);
                for arg in args {
                    self.poison_expr(arg.value);
                }
            }
            ExprKind::FieldAccess { obj, .. } => self.poison_expr(*obj),
            ExprKind::MethodCall { obj, args, .. } => {
                self.poison_expr(*obj);
                for arg in args {
                    self.poison_expr(arg.value);
                }
            }
        }
    }

    /// Poison every expression reachable from a statement that will not
    /// be emitted.
    fn poison_stmt(&self, id: StmtId) {
        match &self.ast.stmt(id).kind {
            StmtKind::Empty => {}
            StmtKind::Block(stmts) => {
                for stmt in stmts {
                    self.poison_stmt(*stmt);
                }
            }
            StmtKind::If {
                cond,
                then_case,
                else_case,
            } => {
                self.poison_expr(*cond);
                self.poison_stmt(*then_case);
                if let Some(else_case) = else_case {
                    self.poison_stmt(*else_case);
                }
            }
            StmtKind::Return(value) => {
                if let Some(value) = value {
                    self.poison_expr(*value);
                }
            }
            StmtKind::Local(v) => {
                if let Some(init) = v.init {
                    self.poison_expr(init);
                }
            }
            StmtKind::Expr(expr) => self.poison_expr(*expr),
        }
    }

    /// A dropped class declaration still owns constructor and method
    /// bodies; they get poisoned types instead of an emission.
    fn poison_class(&self, class: &ClassDecl) {
        if let Some(ctor) = &class.ctor {
            self.poison_stmt(ctor.body);
        }
        for method in &class.methods {
            self.poison_stmt(method.body);
        }
    }

    /// Branch to `target` unless the current block already terminated.
    fn branch_to(&mut self, target: BasicBlock<'ctx>) {
        if let Some(block) = self.builder.get_insert_block() {
            if block.get_terminator().is_none() {
                self.builder.build_unconditional_branch(target).unwrap();
            }
        }
    }

    /// Allocate a stack slot at the top of the entry block, in front of
    /// the hidden marker instruction.
    fn create_entry_alloca(&mut self, ty: BasicTypeEnum<'ctx>, name: &str) -> PointerValue<'ctx> {
        let current = self.builder.get_insert_block().unwrap();
        if self.alloca_point.is_none() {
            // a no-op at the top of the entry block keeps the allocas in
            // source order in front of every other instruction
            let entry = current
                .get_parent()
                .unwrap()
                .get_first_basic_block()
                .unwrap();
            match entry.get_first_instruction() {
                Some(first) => self.builder.position_before(&first),
                None => self.builder.position_at_end(entry),
            }
            let zero = self.llcx.bool_type().const_zero();
            let marker = self.builder.build_int_add(zero, zero, "allocapoint").unwrap();
            self.alloca_point = marker.as_instruction_value();
            self.builder.position_at_end(current);
        }
        let marker = self.alloca_point.unwrap();
        self.builder.position_before(&marker);
        let slot = self.builder.build_alloca(ty, name).unwrap();
        self.builder.position_at_end(current);
        slot
    }

    // ---------------------------------------------------------------
    // expressions
    // ---------------------------------------------------------------

    fn emit_expr(&mut self, id: ExprId) -> Option<BasicValueEnum<'ctx>> {
        let ast = self.ast;
        let loc = ast.expr(id).loc;
        match &ast.expr(id).kind {
            ExprKind::Ident(name) => self.emit_ident(id, loc, name),
            ExprKind::Literal { bits, width } => self.emit_literal(id, loc, *bits, *width),
            ExprKind::SelfRef => self.emit_self(id, loc),
            ExprKind::Unary { op, expr } => self.emit_unary(id, loc, *op, *expr),
            ExprKind::Binary { op, lhs, rhs } => match op {
                BinaryOp::Assign => self.emit_assign(id, *lhs, *rhs),
                BinaryOp::And | BinaryOp::Or => self.emit_short_circuit(id, *op, *lhs, *rhs),
                _ => self.emit_binary(id, loc, *op, *lhs, *rhs),
            },
            ExprKind::Ternary {
                cond,
                then_case,
                else_case,
            } => self.emit_ternary(id, loc, *cond, *then_case, *else_case),
            ExprKind::Call { callee, args } => self.emit_call(id, loc, *callee, args),
            ExprKind::FieldAccess { obj, member } => self.emit_field_access(id, *obj, member),
            ExprKind::MethodCall { obj, member, args } => {
                self.emit_method_call(id, loc, *obj, member, args)
            }
        }
    }

    fn emit_ident(&mut self, id: ExprId, loc: Location, name: &str) -> Option<BasicValueEnum<'ctx>> {
        // a local variable...
        if let Some(var) = self.func.get(name) {
            self.set_ty(id, var.ty);
            return var.ptr.map(|ptr| {
                let llty = self.converter.value_type(self.types, var.ty);
                self.builder.build_load(llty, ptr, name).unwrap()
            });
        }
        // ...or a global
        match self.global.get(name) {
            Some(Symbol::Var(var)) => {
                self.set_ty(id, var.ty);
                var.ptr.map(|ptr| {
                    let llty = self.converter.value_type(self.types, var.ty);
                    self.builder.build_load(llty, ptr, name).unwrap()
                })
            }
            Some(Symbol::Func(item)) => {
                self.set_ty(id, item.ty);
                Some(item.func.as_global_value().as_pointer_value().into())
            }
            None => {
                self.diag.report(Diagnostic::unknown_ident(loc, name));
                self.set_ty(id, TypeInterner::ERROR);
                None
            }
        }
    }

    fn emit_literal(
        &mut self,
        id: ExprId,
        loc: Location,
        bits: u32,
        width: u32,
    ) -> Option<BasicValueEnum<'ctx>> {
        match width {
            1 => {
                self.set_ty(id, TypeInterner::BOOL);
                Some(self.llcx.bool_type().const_int(bits as u64, false).into())
            }
            32 => {
                self.set_ty(id, TypeInterner::INT);
                Some(self.llcx.i32_type().const_int(bits as u64, false).into())
            }
            width => {
                // should never happen
                self.diag.report(Diagnostic::invalid_int_width(loc, width));
                self.set_ty(id, TypeInterner::ERROR);
                None
            }
        }
    }

    fn emit_self(&mut self, id: ExprId, loc: Location) -> Option<BasicValueEnum<'ctx>> {
        match self.func.get("self") {
            Some(var) => {
                self.set_ty(id, var.ty);
                var.ptr.map(|ptr| {
                    let llty = self.converter.value_type(self.types, var.ty);
                    self.builder.build_load(llty, ptr, "self").unwrap()
                })
            }
            None => {
                self.diag.report(Diagnostic::unknown_ident(loc, "self"));
                self.set_ty(id, TypeInterner::ERROR);
                None
            }
        }
    }

    fn emit_unary(
        &mut self,
        id: ExprId,
        loc: Location,
        op: UnaryOp,
        expr: ExprId,
    ) -> Option<BasicValueEnum<'ctx>> {
        let value = self.emit_expr(expr);
        let ty = self.expr_ty(expr);
        if self.types.is_error(ty) {
            self.set_ty(id, TypeInterner::ERROR);
            return None;
        }
        let resolved = self.types.resolve(ty);
        match op {
            UnaryOp::Neg if resolved == TypeInterner::INT || resolved == TypeInterner::BOOL => {
                self.set_ty(id, resolved);
                let value = value?.into_int_value();
                Some(self.builder.build_int_neg(value, "neg").unwrap().into())
            }
            UnaryOp::Not if resolved == TypeInterner::BOOL => {
                self.set_ty(id, TypeInterner::BOOL);
                let value = value?.into_int_value();
                Some(self.builder.build_not(value, "not").unwrap().into())
            }
            _ => {
                self.diag.report(Diagnostic::invalid_unary(
                    loc,
                    op.symbol(),
                    &self.types.display(ty),
                ));
                self.set_ty(id, TypeInterner::ERROR);
                None
            }
        }
    }

    fn emit_binary(
        &mut self,
        id: ExprId,
        loc: Location,
        op: BinaryOp,
        lhs: ExprId,
        rhs: ExprId,
    ) -> Option<BasicValueEnum<'ctx>> {
        let lhs_value = self.emit_expr(lhs);
        let rhs_value = self.emit_expr(rhs);
        let lhs_ty = self.expr_ty(lhs);
        let rhs_ty = self.expr_ty(rhs);
        if self.types.is_error(lhs_ty) || self.types.is_error(rhs_ty) {
            self.set_ty(id, TypeInterner::ERROR);
            return None;
        }
        // both sides must have identical types
        if self.types.resolve(lhs_ty) != self.types.resolve(rhs_ty) {
            self.diag.report(Diagnostic::invalid_binary(
                loc,
                op.symbol(),
                &self.types.display(lhs_ty),
                &self.types.display(rhs_ty),
            ));
            self.set_ty(id, TypeInterner::ERROR);
            return None;
        }
        let operand = self.types.resolve(lhs_ty);
        let is_int = operand == TypeInterner::INT;
        let is_bool = operand == TypeInterner::BOOL;
        let valid = match op {
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => is_int,
            BinaryOp::Eq | BinaryOp::Ne => is_int || is_bool,
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => is_int,
            _ => false,
        };
        if !valid {
            self.diag.report(Diagnostic::invalid_binary(
                loc,
                op.symbol(),
                &self.types.display(lhs_ty),
                &self.types.display(rhs_ty),
            ));
            self.set_ty(id, TypeInterner::ERROR);
            return None;
        }
        let result_ty = match op {
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => {
                TypeInterner::INT
            }
            _ => TypeInterner::BOOL,
        };
        self.set_ty(id, result_ty);
        let (Some(l), Some(r)) = (lhs_value, rhs_value) else {
            return None;
        };
        let (l, r) = (l.into_int_value(), r.into_int_value());
        let result = match op {
            BinaryOp::Add => self.builder.build_int_add(l, r, "add").unwrap(),
            BinaryOp::Sub => self.builder.build_int_sub(l, r, "sub").unwrap(),
            BinaryOp::Mul => self.builder.build_int_mul(l, r, "mul").unwrap(),
            BinaryOp::Div => self.builder.build_int_signed_div(l, r, "sdiv").unwrap(),
            BinaryOp::Rem => self.builder.build_int_signed_rem(l, r, "srem").unwrap(),
            BinaryOp::Eq => self
                .builder
                .build_int_compare(IntPredicate::EQ, l, r, "cmp")
                .unwrap(),
            BinaryOp::Ne => self
                .builder
                .build_int_compare(IntPredicate::NE, l, r, "cmp")
                .unwrap(),
            BinaryOp::Lt => self
                .builder
                .build_int_compare(IntPredicate::SLT, l, r, "cmp")
                .unwrap(),
            BinaryOp::Le => self
                .builder
                .build_int_compare(IntPredicate::SLE, l, r, "cmp")
                .unwrap(),
            BinaryOp::Gt => self
                .builder
                .build_int_compare(IntPredicate::SGT, l, r, "cmp")
                .unwrap(),
            BinaryOp::Ge => self
                .builder
                .build_int_compare(IntPredicate::SGE, l, r, "cmp")
                .unwrap(),
            _ => return None,
        };
        Some(result.into())
    }

    /// `&&` and `||` never evaluate the right side when the left side
    /// already decides the result. Lowered to a long-check block and a
    /// continuation joined by a phi: the short-circuit edge contributes
    /// the deciding constant, the long edge contributes the right side.
    fn emit_short_circuit(
        &mut self,
        id: ExprId,
        op: BinaryOp,
        lhs: ExprId,
        rhs: ExprId,
    ) -> Option<BasicValueEnum<'ctx>> {
        let lhs_value = self.emit_expr(lhs);
        let lhs_ty = self.expr_ty(lhs);
        if self.types.is_error(lhs_ty) {
            self.set_ty(id, TypeInterner::ERROR);
            return None;
        }
        if self.types.resolve(lhs_ty) != TypeInterner::BOOL {
            self.diag.report(Diagnostic::cannot_convert(
                self.ast.expr(lhs).loc,
                &self.types.display(lhs_ty),
                "Bool",
            ));
            self.set_ty(id, TypeInterner::ERROR);
            return None;
        }
        let cond = lhs_value?.into_int_value();
        let short_block = self.builder.get_insert_block().unwrap();
        let function = short_block.get_parent().unwrap();
        let name = if op == BinaryOp::And { "and" } else { "or" };
        let long_block = self
            .llcx
            .append_basic_block(function, &format!("{name}.long"));
        let cont_block = self
            .llcx
            .append_basic_block(function, &format!("{name}.cont"));
        if op == BinaryOp::And {
            self.builder
                .build_conditional_branch(cond, long_block, cont_block)
                .unwrap();
        } else {
            self.builder
                .build_conditional_branch(cond, cont_block, long_block)
                .unwrap();
        }
        // the long check runs only when the lhs did not decide the
        // result
        self.builder.position_at_end(long_block);
        let rhs_value = self.emit_expr(rhs);
        let rhs_ty = self.expr_ty(rhs);
        let long_end = self.builder.get_insert_block().unwrap();
        self.branch_to(cont_block);
        self.builder.position_at_end(cont_block);
        // checked only now so the continuation block exists and code
        // after the operator has somewhere to go
        if self.types.is_error(rhs_ty) {
            self.set_ty(id, TypeInterner::ERROR);
            return None;
        }
        if self.types.resolve(rhs_ty) != TypeInterner::BOOL {
            self.diag.report(Diagnostic::cannot_convert(
                self.ast.expr(rhs).loc,
                &self.types.display(rhs_ty),
                "Bool",
            ));
            self.set_ty(id, TypeInterner::ERROR);
            return None;
        }
        let rhs_value = rhs_value?;
        let phi = self
            .builder
            .build_phi(self.llcx.bool_type(), name)
            .unwrap();
        // coming from the short block, the result is already decided:
        // false for `&&`, true for `||`
        let decided = self
            .llcx
            .bool_type()
            .const_int((op == BinaryOp::Or) as u64, false);
        phi.add_incoming(&[
            (&decided as &dyn BasicValue, short_block),
            (&rhs_value as &dyn BasicValue, long_end),
        ]);
        self.set_ty(id, TypeInterner::BOOL);
        Some(phi.as_basic_value())
    }

    fn emit_ternary(
        &mut self,
        id: ExprId,
        loc: Location,
        cond: ExprId,
        then_case: ExprId,
        else_case: ExprId,
    ) -> Option<BasicValueEnum<'ctx>> {
        let cond_value = self.emit_expr(cond);
        let cond_ty = self.expr_ty(cond);
        if self.types.is_error(cond_ty) {
            self.set_ty(id, TypeInterner::ERROR);
            return None;
        }
        if self.types.resolve(cond_ty) != TypeInterner::BOOL {
            self.diag.report(Diagnostic::cannot_convert(
                self.ast.expr(cond).loc,
                &self.types.display(cond_ty),
                "Bool",
            ));
            self.set_ty(id, TypeInterner::ERROR);
            return None;
        }
        let function = self
            .builder
            .get_insert_block()
            .unwrap()
            .get_parent()
            .unwrap();
        let then_block = self.llcx.append_basic_block(function, "ternary.then");
        let else_block = self.llcx.append_basic_block(function, "ternary.else");
        let cont_block = self.llcx.append_basic_block(function, "ternary.cont");
        self.builder
            .build_conditional_branch(cond_value?.into_int_value(), then_block, else_block)
            .unwrap();
        // an arm can span several blocks (nested ternaries), so the phi
        // edges come from wherever each arm actually ended
        self.builder.position_at_end(then_block);
        let then_value = self.emit_expr(then_case);
        let then_end = self.builder.get_insert_block().unwrap();
        self.branch_to(cont_block);
        self.builder.position_at_end(else_block);
        let else_value = self.emit_expr(else_case);
        let else_end = self.builder.get_insert_block().unwrap();
        self.branch_to(cont_block);
        self.builder.position_at_end(cont_block);
        let then_ty = self.expr_ty(then_case);
        let else_ty = self.expr_ty(else_case);
        if self.types.is_error(then_ty) || self.types.is_error(else_ty) {
            self.set_ty(id, TypeInterner::ERROR);
            return None;
        }
        if self.types.resolve(then_ty) != self.types.resolve(else_ty) {
            self.diag.report(Diagnostic::ternary_type_mismatch(
                loc,
                &self.types.display(then_ty),
                &self.types.display(else_ty),
            ));
            self.set_ty(id, TypeInterner::ERROR);
            return None;
        }
        self.set_ty(id, then_ty);
        let (Some(then_value), Some(else_value)) = (then_value, else_value) else {
            return None;
        };
        let phi = self
            .builder
            .build_phi(then_value.get_type(), "ternary.phi")
            .unwrap();
        phi.add_incoming(&[
            (&then_value as &dyn BasicValue, then_end),
            (&else_value as &dyn BasicValue, else_end),
        ]);
        Some(phi.as_basic_value())
    }

    fn emit_assign(&mut self, id: ExprId, lhs: ExprId, rhs: ExprId) -> Option<BasicValueEnum<'ctx>> {
        let rhs_value = self.emit_expr(rhs);
        let rhs_ty = self.expr_ty(rhs);
        let rhs_loc = self.ast.expr(rhs).loc;
        // an assignment produces no value
        self.set_ty(id, TypeInterner::VOID);
        let lhs_loc = self.ast.expr(lhs).loc;
        match &self.ast.expr(lhs).kind {
            ExprKind::Ident(name) => {
                let target = self.func.get(name).or_else(|| match self.global.get(name) {
                    Some(Symbol::Var(var)) => Some(var),
                    _ => None,
                });
                match target {
                    Some(var) => {
                        self.set_ty(lhs, var.ty);
                        if self.types.is_error(var.ty) || self.types.is_error(rhs_ty) {
                            return None;
                        }
                        if self.types.resolve(var.ty) != self.types.resolve(rhs_ty) {
                            self.diag.report(Diagnostic::cannot_convert(
                                rhs_loc,
                                &self.types.display(rhs_ty),
                                &self.types.display(var.ty),
                            ));
                            return None;
                        }
                        if let (Some(ptr), Some(value)) = (var.ptr, rhs_value) {
                            self.builder.build_store(ptr, value).unwrap();
                        }
                    }
                    None => {
                        self.diag.report(Diagnostic::unknown_ident(lhs_loc, name));
                        self.set_ty(lhs, TypeInterner::ERROR);
                    }
                }
            }
            ExprKind::FieldAccess { obj, member } => {
                if let Some((field, ptr)) = self.member_ptr(*obj, member, lhs) {
                    if self.types.is_error(field.ty) || self.types.is_error(rhs_ty) {
                        return None;
                    }
                    if self.types.resolve(field.ty) != self.types.resolve(rhs_ty) {
                        self.diag.report(Diagnostic::cannot_convert(
                            rhs_loc,
                            &self.types.display(rhs_ty),
                            &self.types.display(field.ty),
                        ));
                        return None;
                    }
                    if let Some(value) = rhs_value {
                        self.builder.build_store(ptr, value).unwrap();
                    }
                }
            }
            _ => {
                self.diag.report(Diagnostic::lhs_not_assignable(lhs_loc));
                self.set_ty(lhs, TypeInterner::ERROR);
            }
        }
        None
    }

    fn emit_call(
        &mut self,
        id: ExprId,
        loc: Location,
        callee: ExprId,
        args: &[Arg],
    ) -> Option<BasicValueEnum<'ctx>> {
        // a call on a class name constructs an object
        if let ExprKind::Ident(name) = &self.ast.expr(callee).kind {
            if let Some(class) = self.types.named(name) {
                return self.emit_ctor_call(id, loc, callee, class, args);
            }
        }
        let callee_value = self.emit_expr(callee);
        let callee_ty = self.expr_ty(callee);
        if self.types.is_error(callee_ty) {
            self.set_ty(id, TypeInterner::ERROR);
            return None;
        }
        let types = self.types;
        let Some(ft) = types.function_type(callee_ty) else {
            self.diag.report(Diagnostic::not_a_function(
                self.ast.expr(callee).loc,
                &types.display(callee_ty),
            ));
            self.set_ty(id, TypeInterner::ERROR);
            return None;
        };
        let Some(values) = self.check_args(&ft.params, args, loc) else {
            self.set_ty(id, TypeInterner::ERROR);
            return None;
        };
        let callee_value = callee_value?;
        let llvm_ty = self.converter.function_type(types, callee_ty);
        let call = self
            .builder
            .build_indirect_call(llvm_ty, callee_value.into_pointer_value(), &values, "")
            .unwrap();
        self.set_ty(id, ft.ret);
        call.try_as_basic_value().left()
    }

    /// Construction: heap-allocate the reference-counted object, start
    /// the count at one and run the constructor over it.
    fn emit_ctor_call(
        &mut self,
        id: ExprId,
        loc: Location,
        callee: ExprId,
        class: TypeId,
        args: &[Arg],
    ) -> Option<BasicValueEnum<'ctx>> {
        let class_name = self.types.display(class);
        let Some((item, access)) = self.global.ctor(class) else {
            self.diag.report(Diagnostic::no_ctor(loc, &class_name));
            self.set_ty(callee, TypeInterner::ERROR);
            self.set_ty(id, TypeInterner::ERROR);
            return None;
        };
        self.set_ty(callee, item.ty);
        if !self.accessible(class, access) {
            self.diag
                .report(Diagnostic::inaccessible_member(loc, &class_name, "init"));
            self.set_ty(id, TypeInterner::ERROR);
            return None;
        }
        let types = self.types;
        let Some(ft) = types.function_type(item.ty) else {
            return None;
        };
        let Some(values) = self.check_args(&ft.params, args, loc) else {
            self.set_ty(id, TypeInterner::ERROR);
            return None;
        };
        let Some(parts) = self.converter.class_parts(class) else {
            self.set_ty(id, TypeInterner::ERROR);
            return None;
        };
        let size = parts.rc.size_of().unwrap();
        let malloc = self.malloc_decl();
        let object = self
            .builder
            .build_call(malloc, &[size.into()], "new")
            .unwrap()
            .try_as_basic_value()
            .left()
            .unwrap()
            .into_pointer_value();
        let refcount = self
            .builder
            .build_struct_gep(parts.rc, object, 0, "refcount")
            .unwrap();
        self.builder
            .build_store(refcount, self.llcx.i32_type().const_int(1, false))
            .unwrap();
        let mut call_args: Vec<BasicMetadataValueEnum<'ctx>> = vec![object.into()];
        call_args.extend(values);
        self.builder.build_call(item.func, &call_args, "").unwrap();
        self.set_ty(id, class);
        Some(object.into())
    }

    fn emit_method_call(
        &mut self,
        id: ExprId,
        loc: Location,
        obj: ExprId,
        member: &str,
        args: &[Arg],
    ) -> Option<BasicValueEnum<'ctx>> {
        let obj_value = self.emit_expr(obj);
        let obj_ty = self.expr_ty(obj);
        if self.types.is_error(obj_ty) {
            self.set_ty(id, TypeInterner::ERROR);
            return None;
        }
        let types = self.types;
        let resolved = types.resolve(obj_ty);
        let Some(class) = types.class(resolved) else {
            self.diag.report(Diagnostic::not_a_class(
                self.ast.expr(obj).loc,
                &types.display(obj_ty),
            ));
            self.set_ty(id, TypeInterner::ERROR);
            return None;
        };
        let Some((item, access)) = self.global.method(resolved, member) else {
            self.diag
                .report(Diagnostic::unknown_member(loc, &class.name, member));
            self.set_ty(id, TypeInterner::ERROR);
            return None;
        };
        if !self.accessible(resolved, access) {
            self.diag
                .report(Diagnostic::inaccessible_member(loc, &class.name, member));
            self.set_ty(id, TypeInterner::ERROR);
            return None;
        }
        let Some(ft) = types.function_type(item.ty) else {
            return None;
        };
        let Some(values) = self.check_args(&ft.params, args, loc) else {
            self.set_ty(id, TypeInterner::ERROR);
            return None;
        };
        let obj_value = obj_value?;
        let mut call_args: Vec<BasicMetadataValueEnum<'ctx>> = vec![obj_value.into()];
        call_args.extend(values);
        let call = self.builder.build_call(item.func, &call_args, "").unwrap();
        self.set_ty(id, ft.ret);
        call.try_as_basic_value().left()
    }

    fn emit_field_access(
        &mut self,
        id: ExprId,
        obj: ExprId,
        member: &str,
    ) -> Option<BasicValueEnum<'ctx>> {
        let (field, ptr) = self.member_ptr(obj, member, id)?;
        let llty = self.converter.value_type(self.types, field.ty);
        Some(self.builder.build_load(llty, ptr, member).unwrap())
    }

    /// Resolve `obj.member` to the field and its address, checking class
    /// membership and accessibility. Assigns the node's type; on failure
    /// the node is `Error`-typed and `None` is returned.
    fn member_ptr(
        &mut self,
        obj: ExprId,
        member: &str,
        node: ExprId,
    ) -> Option<(Field, PointerValue<'ctx>)> {
        let obj_value = self.emit_expr(obj);
        let obj_ty = self.expr_ty(obj);
        if self.types.is_error(obj_ty) {
            self.set_ty(node, TypeInterner::ERROR);
            return None;
        }
        let types = self.types;
        let resolved = types.resolve(obj_ty);
        let node_loc = self.ast.expr(node).loc;
        let Some(class) = types.class(resolved) else {
            self.diag.report(Diagnostic::not_a_class(
                self.ast.expr(obj).loc,
                &types.display(obj_ty),
            ));
            self.set_ty(node, TypeInterner::ERROR);
            return None;
        };
        let Some(field) = class.field(member) else {
            self.diag
                .report(Diagnostic::unknown_member(node_loc, &class.name, member));
            self.set_ty(node, TypeInterner::ERROR);
            return None;
        };
        if !self.accessible(resolved, field.access) {
            self.diag
                .report(Diagnostic::inaccessible_member(node_loc, &class.name, member));
            self.set_ty(node, TypeInterner::ERROR);
            return None;
        }
        let Some(parts) = self.converter.class_parts(resolved) else {
            self.set_ty(node, TypeInterner::ERROR);
            return None;
        };
        let Some(obj_value) = obj_value else {
            self.set_ty(node, TypeInterner::ERROR);
            return None;
        };
        // fields live behind the leading refcount
        let payload = self
            .builder
            .build_struct_gep(parts.rc, obj_value.into_pointer_value(), 1, "fields")
            .unwrap();
        let ptr = self
            .builder
            .build_struct_gep(parts.payload, payload, field.index as u32, member)
            .unwrap();
        self.set_ty(node, field.ty);
        Some((field, ptr))
    }

    /// Check a named-argument list against a parameter list. Matching is
    /// positional by parse order; the names are surface syntax. Returns
    /// the argument values only when every argument checked out.
    fn check_args(
        &mut self,
        params: &[TypeId],
        args: &[Arg],
        loc: Location,
    ) -> Option<Vec<BasicMetadataValueEnum<'ctx>>> {
        if params.len() != args.len() {
            self.diag.report(Diagnostic::mismatching_arg_count(
                loc,
                args.len(),
                params.len(),
            ));
            // the arguments are still evaluated so their subtrees get
            // types
            for arg in args {
                self.emit_expr(arg.value);
            }
            return None;
        }
        let mut values = vec![];
        let mut poisoned = false;
        for (param, arg) in params.iter().zip(args) {
            let value = self.emit_expr(arg.value);
            let ty = self.expr_ty(arg.value);
            if self.types.is_error(ty) {
                poisoned = true;
                continue;
            }
            if self.types.resolve(ty) != self.types.resolve(*param) {
                self.diag.report(Diagnostic::cannot_convert(
                    self.ast.expr(arg.value).loc,
                    &self.types.display(ty),
                    &self.types.display(*param),
                ));
                poisoned = true;
                continue;
            }
            match value {
                Some(value) => values.push(value.into()),
                None => poisoned = true,
            }
        }
        if poisoned {
            return None;
        }
        Some(values)
    }

    fn malloc_decl(&mut self) -> FunctionValue<'ctx> {
        if let Some(existing) = self.module.get_function("malloc") {
            return existing;
        }
        let ptr = self.llcx.ptr_type(AddressSpace::default());
        let ty = ptr.fn_type(&[self.llcx.i64_type().into()], false);
        self.module.add_function("malloc", ty, None)
    }

    fn free_decl(&mut self) -> FunctionValue<'ctx> {
        if let Some(existing) = self.module.get_function("free") {
            return existing;
        }
        let ptr = self.llcx.ptr_type(AddressSpace::default());
        let ty = self.llcx.void_type().fn_type(&[ptr.into()], false);
        self.module.add_function("free", ty, None)
    }
}
