//! # AST Module
//!
//! Nodes of the Sable abstract syntax tree and the context that owns
//! them.
//!
//! The [`AstContext`] is a typed append-only arena: the parser allocates
//! every expression, statement and declaration into it and works with
//! plain index handles ([`ExprId`], [`StmtId`], [`DeclId`]). All
//! references between nodes are handles into the same owner, which makes
//! them trivially stable for the lifetime of the compilation: the Rust
//! rendition of a context object that outlives every node.
//!
//! Expression nodes carry a type slot that starts empty and is assigned
//! exactly once by the IR emitter; after emission every expression has a
//! type (the `Error` sentinel when a diagnostic was reported for the node
//! or one of its children). Declarations that resolvers need to flag
//! (duplicate functions, duplicate class names) carry interior-mutable
//! markers for the same reason.
//!
//! The global declaration list preserves source order, which is what
//! makes emission deterministic.

mod op;
pub mod printer;

pub use op::*;

use std::cell::Cell;

use serde::{Deserialize, Serialize};

use crate::lexer::Location;
use crate::types::TypeId;

/// Access specifier on declarations and class members. Absent specifiers
/// parse as `None`, which behaves like `Public` everywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Access {
    None,
    Private,
    Public,
}

impl Access {
    /// Effective access of a class member: the least permissive of the
    /// class's and the member's own specifier.
    pub fn effective(class: Access, member: Access) -> Access {
        if class == Access::Private || member == Access::Private {
            Access::Private
        } else {
            Access::Public
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExprId(u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StmtId(u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeclId(u32);

/// A named call argument: `name: value`.
#[derive(Debug, Clone)]
pub struct Arg {
    pub name: String,
    pub value: ExprId,
    pub loc: Location,
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    Ident(String),
    /// An integer-like literal; `width` is 1 for booleans and 32 for
    /// integers.
    Literal { bits: u32, width: u32 },
    SelfRef,
    Unary { op: UnaryOp, expr: ExprId },
    Binary { op: BinaryOp, lhs: ExprId, rhs: ExprId },
    Ternary { cond: ExprId, then_case: ExprId, else_case: ExprId },
    Call { callee: ExprId, args: Vec<Arg> },
    FieldAccess { obj: ExprId, member: String },
    MethodCall { obj: ExprId, member: String, args: Vec<Arg> },
}

#[derive(Debug)]
pub struct Expr {
    pub kind: ExprKind,
    pub loc: Location,
    ty: Cell<Option<TypeId>>,
}

impl Expr {
    /// The type assigned during emission, if any yet.
    pub fn ty(&self) -> Option<TypeId> {
        self.ty.get()
    }

    pub fn set_ty(&self, ty: TypeId) {
        self.ty.set(Some(ty));
    }
}

/// A `let`/`var` declaration, local or global. Type or initializer may be
/// elided, but not both.
#[derive(Debug, Clone)]
pub struct VarDecl {
    pub access: Access,
    pub name: String,
    pub ty: Option<TypeId>,
    pub init: Option<ExprId>,
    pub is_const: bool,
    pub loc: Location,
}

#[derive(Debug)]
pub enum StmtKind {
    Empty,
    Block(Vec<StmtId>),
    If {
        cond: ExprId,
        then_case: StmtId,
        else_case: Option<StmtId>,
    },
    Return(Option<ExprId>),
    Local(VarDecl),
    Expr(ExprId),
}

#[derive(Debug)]
pub struct Stmt {
    pub kind: StmtKind,
    pub loc: Location,
}

#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    pub ty: TypeId,
    pub loc: Location,
}

#[derive(Debug)]
pub struct FunctionDecl {
    pub access: Access,
    pub name: String,
    pub params: Vec<Param>,
    pub ret: TypeId,
    pub body: StmtId,
    pub loc: Location,
    already_defined: Cell<bool>,
}

impl FunctionDecl {
    pub fn new(
        access: Access,
        name: String,
        params: Vec<Param>,
        ret: TypeId,
        body: StmtId,
        loc: Location,
    ) -> FunctionDecl {
        FunctionDecl {
            access,
            name,
            params,
            ret,
            body,
            loc,
            already_defined: Cell::new(false),
        }
    }

    pub fn already_defined(&self) -> bool {
        self.already_defined.get()
    }

    pub fn set_already_defined(&self) {
        self.already_defined.set(true);
    }
}

#[derive(Debug)]
pub struct ExtFunctionDecl {
    pub access: Access,
    pub name: String,
    pub params: Vec<Param>,
    pub ret: TypeId,
    /// Symbol the function is known by outside of Sable.
    pub alias: String,
    pub loc: Location,
    already_defined: Cell<bool>,
}

impl ExtFunctionDecl {
    pub fn new(
        access: Access,
        name: String,
        params: Vec<Param>,
        ret: TypeId,
        alias: String,
        loc: Location,
    ) -> ExtFunctionDecl {
        ExtFunctionDecl {
            access,
            name,
            params,
            ret,
            alias,
            loc,
            already_defined: Cell::new(false),
        }
    }

    pub fn already_defined(&self) -> bool {
        self.already_defined.get()
    }

    pub fn set_already_defined(&self) {
        self.already_defined.set(true);
    }
}

#[derive(Debug)]
pub struct FieldDecl {
    pub access: Access,
    pub name: String,
    pub ty: TypeId,
    pub is_const: bool,
    pub loc: Location,
}

#[derive(Debug)]
pub struct CtorDecl {
    pub access: Access,
    pub params: Vec<Param>,
    pub body: StmtId,
    pub loc: Location,
}

#[derive(Debug)]
pub struct MethodDecl {
    pub access: Access,
    pub name: String,
    pub params: Vec<Param>,
    pub ret: TypeId,
    pub body: StmtId,
    pub loc: Location,
    already_defined: Cell<bool>,
}

impl MethodDecl {
    pub fn new(
        access: Access,
        name: String,
        params: Vec<Param>,
        ret: TypeId,
        body: StmtId,
        loc: Location,
    ) -> MethodDecl {
        MethodDecl {
            access,
            name,
            params,
            ret,
            body,
            loc,
            already_defined: Cell::new(false),
        }
    }

    pub fn already_defined(&self) -> bool {
        self.already_defined.get()
    }

    pub fn set_already_defined(&self) {
        self.already_defined.set(true);
    }
}

#[derive(Debug)]
pub struct ClassDecl {
    pub access: Access,
    pub name: String,
    pub fields: Vec<FieldDecl>,
    pub ctor: Option<CtorDecl>,
    pub methods: Vec<MethodDecl>,
    pub loc: Location,
    ty: Cell<Option<TypeId>>,
    skipped: Cell<bool>,
}

impl ClassDecl {
    pub fn new(
        access: Access,
        name: String,
        fields: Vec<FieldDecl>,
        ctor: Option<CtorDecl>,
        methods: Vec<MethodDecl>,
        loc: Location,
    ) -> ClassDecl {
        ClassDecl {
            access,
            name,
            fields,
            ctor,
            methods,
            loc,
            ty: Cell::new(None),
            skipped: Cell::new(false),
        }
    }

    /// The interned class type, assigned by the type resolver.
    pub fn ty(&self) -> Option<TypeId> {
        self.ty.get()
    }

    pub fn set_ty(&self, ty: TypeId) {
        self.ty.set(Some(ty));
    }

    /// Whether the declaration was dropped as a duplicate.
    pub fn skipped(&self) -> bool {
        self.skipped.get()
    }

    pub fn set_skipped(&self) {
        self.skipped.set(true);
    }
}

#[derive(Debug)]
pub enum DeclKind {
    Function(FunctionDecl),
    ExtFunction(ExtFunctionDecl),
    GlobalVar(VarDecl),
    Class(ClassDecl),
    /// A control-flow statement that appeared at the top level. Parsed so
    /// the emitter can report it, never lowered.
    CtrlFlow(StmtId),
}

#[derive(Debug)]
pub struct Decl {
    pub kind: DeclKind,
    pub loc: Location,
}

/// Exclusive owner of every AST node of one compilation.
#[derive(Debug, Default)]
pub struct AstContext {
    exprs: Vec<Expr>,
    stmts: Vec<Stmt>,
    decls: Vec<Decl>,
    globals: Vec<DeclId>,
}

impl AstContext {
    pub fn new() -> AstContext {
        AstContext::default()
    }

    pub fn alloc_expr(&mut self, kind: ExprKind, loc: Location) -> ExprId {
        let id = ExprId(self.exprs.len() as u32);
        self.exprs.push(Expr {
            kind,
            loc,
            ty: Cell::new(None),
        });
        id
    }

    pub fn alloc_stmt(&mut self, kind: StmtKind, loc: Location) -> StmtId {
        let id = StmtId(self.stmts.len() as u32);
        self.stmts.push(Stmt { kind, loc });
        id
    }

    pub fn alloc_decl(&mut self, kind: DeclKind, loc: Location) -> DeclId {
        let id = DeclId(self.decls.len() as u32);
        self.decls.push(Decl { kind, loc });
        id
    }

    /// Mark a declaration as part of the global scope, in source order.
    pub fn set_global(&mut self, decl: DeclId) {
        self.globals.push(decl);
    }

    pub fn globals(&self) -> &[DeclId] {
        &self.globals
    }

    pub fn expr(&self, id: ExprId) -> &Expr {
        &self.exprs[id.0 as usize]
    }

    /// All expression nodes, in allocation order.
    pub fn exprs(&self) -> impl Iterator<Item = &Expr> {
        self.exprs.iter()
    }

    pub fn stmt(&self, id: StmtId) -> &Stmt {
        &self.stmts[id.0 as usize]
    }

    pub fn decl(&self, id: DeclId) -> &Decl {
        &self.decls[id.0 as usize]
    }
}
