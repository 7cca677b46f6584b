//! Source-level pretty-printer for the AST.
//!
//! Prints a parsed program back as Sable source. Expressions are printed
//! fully parenthesized, which makes the output a fixed point: printing,
//! reparsing and printing again yields the same text. Used by the driver
//! (`--emit ast`) and the round-trip tests.

use crate::types::TypeInterner;

use super::{
    Access, Arg, AstContext, ClassDecl, DeclKind, ExprId, ExprKind, StmtId, StmtKind, VarDecl,
};

pub fn print_program(ast: &AstContext, types: &TypeInterner) -> String {
    let mut printer = Printer {
        ast,
        types,
        out: String::new(),
        indent: 0,
    };
    for decl in ast.globals() {
        printer.print_decl(*decl);
    }
    printer.out
}

struct Printer<'a> {
    ast: &'a AstContext,
    types: &'a TypeInterner,
    out: String,
    indent: usize,
}

impl Printer<'_> {
    fn line(&mut self, text: &str) {
        for _ in 0..self.indent {
            self.out.push_str("    ");
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn access(access: Access) -> &'static str {
        match access {
            Access::None => "",
            Access::Private => "private ",
            Access::Public => "public ",
        }
    }

    fn print_decl(&mut self, id: super::DeclId) {
        match &self.ast.decl(id).kind {
            DeclKind::Function(f) => {
                let header = format!(
                    "{}func {}({}) -> {}",
                    Self::access(f.access),
                    f.name,
                    self.params(&f.params),
                    self.types.display(f.ret),
                );
                self.line(&header);
                self.print_stmt(f.body);
            }
            DeclKind::ExtFunction(f) => {
                let header = format!(
                    "{}func {}({}) -> {} external ({});",
                    Self::access(f.access),
                    f.name,
                    self.params(&f.params),
                    self.types.display(f.ret),
                    f.alias,
                );
                self.line(&header);
            }
            DeclKind::GlobalVar(v) => {
                let text = self.var_decl(v);
                self.line(&text);
            }
            DeclKind::Class(c) => self.print_class(c),
            DeclKind::CtrlFlow(stmt) => self.print_stmt(*stmt),
        }
    }

    fn print_class(&mut self, class: &ClassDecl) {
        let header = format!("{}class {} {{", Self::access(class.access), class.name);
        self.line(&header);
        self.indent += 1;
        for field in &class.fields {
            let keyword = if field.is_const { "let" } else { "var" };
            let text = format!(
                "{}{} {}: {};",
                Self::access(field.access),
                keyword,
                field.name,
                self.types.display(field.ty),
            );
            self.line(&text);
        }
        if let Some(ctor) = &class.ctor {
            let header = format!("{}init({})", Self::access(ctor.access), self.params(&ctor.params));
            self.line(&header);
            self.print_stmt(ctor.body);
        }
        for method in &class.methods {
            let header = format!(
                "{}func {}({}) -> {}",
                Self::access(method.access),
                method.name,
                self.params(&method.params),
                self.types.display(method.ret),
            );
            self.line(&header);
            self.print_stmt(method.body);
        }
        self.indent -= 1;
        self.line("}");
    }

    fn params(&self, params: &[super::Param]) -> String {
        params
            .iter()
            .map(|p| format!("{}: {}", p.name, self.types.display(p.ty)))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn var_decl(&self, v: &VarDecl) -> String {
        let keyword = if v.is_const { "let" } else { "var" };
        let mut text = format!("{}{} {}", Self::access(v.access), keyword, v.name);
        if let Some(ty) = v.ty {
            text.push_str(&format!(": {}", self.types.display(ty)));
        }
        if let Some(init) = v.init {
            text.push_str(&format!(" = {}", self.expr(init)));
        }
        text.push(';');
        text
    }

    fn print_stmt(&mut self, id: StmtId) {
        match &self.ast.stmt(id).kind {
            StmtKind::Empty => self.line(";"),
            StmtKind::Block(stmts) => {
                self.line("{");
                self.indent += 1;
                for stmt in stmts {
                    self.print_stmt(*stmt);
                }
                self.indent -= 1;
                self.line("}");
            }
            StmtKind::If {
                cond,
                then_case,
                else_case,
            } => {
                let header = format!("if ({})", self.expr(*cond));
                self.line(&header);
                self.print_stmt(*then_case);
                if let Some(else_case) = else_case {
                    self.line("else");
                    self.print_stmt(*else_case);
                }
            }
            StmtKind::Return(value) => match value {
                Some(value) => {
                    let text = format!("return {};", self.expr(*value));
                    self.line(&text);
                }
                None => self.line("return;"),
            },
            StmtKind::Local(v) => {
                let text = self.var_decl(v);
                self.line(&text);
            }
            StmtKind::Expr(expr) => {
                let text = format!("{};", self.expr(*expr));
                self.line(&text);
            }
        }
    }

    fn args(&self, args: &[Arg]) -> String {
        args.iter()
            .map(|a| format!("{}: {}", a.name, self.expr(a.value)))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn expr(&self, id: ExprId) -> String {
        match &self.ast.expr(id).kind {
            ExprKind::Ident(name) => name.clone(),
            ExprKind::Literal { bits, width } => match *width {
                1 => {
                    if *bits != 0 {
                        "true".into()
                    } else {
                        "false".into()
                    }
                }
                _ => format!("{bits}"),
            },
            ExprKind::SelfRef => "self".into(),
            ExprKind::Unary { op, expr } => format!("{}{}", op.symbol(), self.expr(*expr)),
            ExprKind::Binary { op, lhs, rhs } => format!(
                "({} {} {})",
                self.expr(*lhs),
                op.symbol(),
                self.expr(*rhs)
            ),
            ExprKind::Ternary {
                cond,
                then_case,
                else_case,
            } => format!(
                "({} ? {} : {})",
                self.expr(*cond),
                self.expr(*then_case),
                self.expr(*else_case)
            ),
            ExprKind::Call { callee, args } => {
                format!("{}({})", self.expr(*callee), self.args(args))
            }
            ExprKind::FieldAccess { obj, member } => {
                format!("{}.{}", self.expr(*obj), member)
            }
            ExprKind::MethodCall { obj, member, args } => {
                format!("{}.{}({})", self.expr(*obj), member, self.args(args))
            }
        }
    }
}
