//! # Parser Module
//!
//! Hand-written recursive-descent parser for Sable. One method per
//! production, a token cache with arbitrary lookahead on top of the
//! lexer's pull API, and precedence climbing for expressions.
//!
//! ## Grammar sketch
//!
//! ```text
//! program  -> decl* end
//! decl     -> access? (function | variable | class)
//! function -> 'func' ident params '->' type (block | 'external' '(' ident ')' ';')
//! variable -> ('let' | 'var') ident (':' type)? ('=' expr)? ';'
//! class    -> 'class' ident '{' member* '}'
//! member   -> access? (field | ctor | method)
//! ctor     -> 'init' params block
//! stmt     -> variable | return | if | exprstmt | block | ';'
//! ```
//!
//! Expressions use top-down operator precedence with the table:
//!
//! | prec | operators                  |
//! |------|----------------------------|
//! | 8    | `.` member access, `(` call |
//! | 7    | `*` `/` `%`                |
//! | 6    | `+` `-`                    |
//! | 5    | `<` `<=` `>` `>=`          |
//! | 4    | `==` `!=`                  |
//! | 3    | `&&` `\|\|`                |
//! | 2    | `?:`                       |
//! | 1    | `=` (right associative)    |
//!
//! Unary `-` and `!` bind just below calls, so `-f(x)` negates the call
//! result. Call arguments are named: `f(x: 1, y: 2)`.
//!
//! ## Error recovery
//!
//! Failed productions report through the diagnostics sink and return
//! `None`; the enclosing production skips the failed child and keeps
//! going, so a single run surfaces as many errors as possible. The parser
//! never aborts.

pub mod ast;

use std::collections::VecDeque;

use crate::diag::{Diag, Diagnostic};
use crate::lexer::{Lexer, Token, TokenKind};
use crate::types::{TypeId, TypeInterner};

use self::ast::{
    Access, Arg, AstContext, BinaryOp, ClassDecl, CtorDecl, DeclId, DeclKind, ExprId, ExprKind,
    ExtFunctionDecl, FieldDecl, FunctionDecl, MethodDecl, Param, StmtId, StmtKind, UnaryOp,
    VarDecl,
};

/// Parsed function header, shared by functions, external functions and
/// methods.
struct FuncHeader {
    loc: crate::lexer::Location,
    name: String,
    params: Vec<Param>,
    ret: TypeId,
}

pub struct Parser<'a, 'src> {
    lexer: Lexer<'src>,
    cache: VecDeque<Token>,
    ast: &'a mut AstContext,
    types: &'a mut TypeInterner,
    diag: &'a mut Diag,
}

impl<'a, 'src> Parser<'a, 'src> {
    pub fn new(
        lexer: Lexer<'src>,
        ast: &'a mut AstContext,
        types: &'a mut TypeInterner,
        diag: &'a mut Diag,
    ) -> Self {
        Self {
            lexer,
            cache: VecDeque::new(),
            ast,
            types,
            diag,
        }
    }

    /// Parse the whole program, pushing every valid declaration onto the
    /// context's global list.
    pub fn parse(&mut self) {
        while self.current().is_not(TokenKind::End) {
            if let Some(decl) = self.parse_decl() {
                self.ast.set_global(decl);
            }
        }
    }

    fn consume(&mut self) -> Token {
        if let Some(token) = self.cache.pop_front() {
            return token;
        }
        self.lexer.next_token(self.diag)
    }

    fn peek(&mut self, depth: usize) -> &Token {
        while depth >= self.cache.len() {
            let token = self.lexer.next_token(self.diag);
            self.cache.push_back(token);
        }
        &self.cache[depth]
    }

    fn current(&mut self) -> &Token {
        self.peek(0)
    }

    fn current_kind(&mut self) -> TokenKind {
        self.current().kind
    }

    pub fn empty(&self) -> bool {
        self.cache.is_empty() && self.lexer.empty()
    }

    fn error_expected(&mut self, expected: &str) {
        let found = self.current().describe();
        let loc = self.current().loc;
        self.diag
            .report(Diagnostic::expected_but_found(loc, expected, &found));
    }

    fn error_unexpected(&mut self, token: &Token) {
        self.diag
            .report(Diagnostic::unexpected_token(token.loc, &token.describe()));
    }

    // decl -> access? (function | variable | class)
    fn parse_decl(&mut self) -> Option<DeclId> {
        let access = self.parse_access();
        match self.current_kind() {
            TokenKind::KwFunc => self.parse_function(access),
            TokenKind::KwLet | TokenKind::KwVar => {
                let var = self.parse_var_data(access)?;
                let loc = var.loc;
                Some(self.ast.alloc_decl(DeclKind::GlobalVar(var), loc))
            }
            TokenKind::KwClass => self.parse_class(access),
            TokenKind::KwIf => {
                // parsed so the emitter can flag it as top-level control
                // flow instead of drowning the user in parse errors
                let stmt = self.parse_if()?;
                let loc = self.ast.stmt(stmt).loc;
                Some(self.ast.alloc_decl(DeclKind::CtrlFlow(stmt), loc))
            }
            _ => {
                let token = self.consume();
                self.error_unexpected(&token);
                None
            }
        }
    }

    /// Access specifiers are optional; absence parses as `Access::None`.
    fn parse_access(&mut self) -> Access {
        match self.current_kind() {
            TokenKind::KwPublic => {
                self.consume();
                Access::Public
            }
            TokenKind::KwPrivate => {
                self.consume();
                Access::Private
            }
            _ => Access::None,
        }
    }

    // function -> funcHeader (block | 'external' '(' ident ')' ';')
    fn parse_function(&mut self, access: Access) -> Option<DeclId> {
        let header = self.parse_func_header()?;
        if self.current().is(TokenKind::KwExternal) {
            self.consume();
            if self.current().is_not(TokenKind::LParen) {
                self.error_expected("'('");
                return None;
            }
            self.consume();
            if self.current().is_not(TokenKind::Identifier) {
                self.error_expected("identifier");
                return None;
            }
            let alias = self.consume().text;
            if self.current().is_not(TokenKind::RParen) {
                self.error_expected("')'");
                return None;
            }
            self.consume();
            if self.current().is_not(TokenKind::Semicolon) {
                self.error_expected("';'");
                return None;
            }
            self.consume();
            let decl = ExtFunctionDecl::new(
                access,
                header.name,
                header.params,
                header.ret,
                alias,
                header.loc,
            );
            return Some(self.ast.alloc_decl(DeclKind::ExtFunction(decl), header.loc));
        }
        let body = self.parse_block()?;
        let decl = FunctionDecl::new(
            access,
            header.name,
            header.params,
            header.ret,
            body,
            header.loc,
        );
        Some(self.ast.alloc_decl(DeclKind::Function(decl), header.loc))
    }

    // funcHeader -> 'func' ident params '->' type
    fn parse_func_header(&mut self) -> Option<FuncHeader> {
        if self.current().is_not(TokenKind::KwFunc) {
            self.error_expected("'func'");
            return None;
        }
        let loc = self.consume().loc;
        if self.current().is_not(TokenKind::Identifier) {
            self.error_expected("identifier");
            return None;
        }
        let name = self.consume().text;
        let params = self.parse_params();
        if self.current().is_not(TokenKind::Arrow) {
            self.error_expected("'->'");
            return None;
        }
        self.consume();
        let ret = self.parse_type();
        Some(FuncHeader {
            loc,
            name,
            params,
            ret,
        })
    }

    // params -> '(' (param (',' param)*)? ')'
    fn parse_params(&mut self) -> Vec<Param> {
        let mut params = vec![];
        if self.current().is_not(TokenKind::LParen) {
            self.error_expected("'('");
        } else {
            self.consume();
        }
        if self.current().is_not(TokenKind::RParen) {
            loop {
                if let Some(param) = self.parse_param() {
                    params.push(param);
                }
                if self.current().is_not(TokenKind::Comma) {
                    break;
                }
                self.consume();
            }
        }
        if self.current().is_not(TokenKind::RParen) {
            self.error_expected("')'");
        } else {
            self.consume();
        }
        params
    }

    // param -> ident ':' type
    fn parse_param(&mut self) -> Option<Param> {
        let loc = self.current().loc;
        let name = if self.current().is_not(TokenKind::Identifier) {
            self.error_expected("identifier");
            self.consume();
            String::new()
        } else {
            self.consume().text
        };
        // consumed unconditionally since a missing colon is likely a typo
        if self.consume().is_not(TokenKind::Colon) {
            self.error_expected("':'");
        }
        let ty = self.parse_type();
        Some(Param { name, ty, loc })
    }

    // variable -> ('let' | 'var') ident (':' type)? ('=' expr)? ';'
    fn parse_var_data(&mut self, access: Access) -> Option<VarDecl> {
        let is_const = match self.current_kind() {
            TokenKind::KwLet => true,
            TokenKind::KwVar => false,
            _ => {
                self.error_expected("'let' or 'var'");
                return None;
            }
        };
        let loc = self.consume().loc;
        if self.current().is_not(TokenKind::Identifier) {
            self.error_expected("identifier");
            return None;
        }
        let name = self.consume().text;
        let ty = if self.current().is(TokenKind::Colon) {
            self.consume();
            Some(self.parse_type())
        } else {
            None
        };
        let init = if self.current().is(TokenKind::Assign) {
            self.consume();
            Some(self.parse_expr()?)
        } else {
            // type and initializer cannot both be elided
            if ty.is_none() {
                self.error_expected("variable initializer");
                self.consume();
                return None;
            }
            None
        };
        if self.current().is_not(TokenKind::Semicolon) {
            self.error_expected("';'");
        } else {
            self.consume();
        }
        Some(VarDecl {
            access,
            name,
            ty,
            init,
            is_const,
            loc,
        })
    }

    // class -> 'class' ident '{' member* '}'
    fn parse_class(&mut self, access: Access) -> Option<DeclId> {
        if self.current().is_not(TokenKind::KwClass) {
            self.error_expected("'class'");
            return None;
        }
        let loc = self.consume().loc;
        if self.current().is_not(TokenKind::Identifier) {
            self.error_expected("identifier");
            return None;
        }
        let name = self.consume().text;
        if self.current().is_not(TokenKind::LBrace) {
            self.error_expected("'{'");
            return None;
        }
        self.consume();
        let mut fields = vec![];
        let mut ctor = None;
        let mut methods = vec![];
        self.parse_members(&mut fields, &mut ctor, &mut methods);
        if self.current().is_not(TokenKind::RBrace) {
            self.error_expected("'}'");
        } else {
            self.consume();
        }
        let class = ClassDecl::new(access, name, fields, ctor, methods, loc);
        Some(self.ast.alloc_decl(DeclKind::Class(class), loc))
    }

    // member -> access? (field | ctor | method)
    fn parse_members(
        &mut self,
        fields: &mut Vec<FieldDecl>,
        ctor: &mut Option<CtorDecl>,
        methods: &mut Vec<MethodDecl>,
    ) {
        while self.current().is_not(TokenKind::RBrace) && self.current().is_not(TokenKind::End) {
            let access = self.parse_access();
            match self.current_kind() {
                TokenKind::KwLet | TokenKind::KwVar => {
                    if let Some(field) = self.parse_field(access) {
                        fields.push(field);
                    }
                }
                TokenKind::KwInit => {
                    if let Some(parsed) = self.parse_ctor(access) {
                        *ctor = Some(parsed);
                    }
                }
                TokenKind::KwFunc => {
                    if let Some(method) = self.parse_method(access) {
                        methods.push(method);
                    }
                }
                _ => {
                    self.error_expected("class member");
                    self.consume();
                }
            }
        }
    }

    // field -> variable, but the type is mandatory and initializers are
    // not allowed
    fn parse_field(&mut self, access: Access) -> Option<FieldDecl> {
        let var = self.parse_var_data(access)?;
        let Some(ty) = var.ty else {
            self.diag
                .report(Diagnostic::missing_field_type(var.loc, &var.name));
            return None;
        };
        if var.init.is_some() {
            self.diag.report(Diagnostic::no_field_inits(var.loc));
            return None;
        }
        Some(FieldDecl {
            access: var.access,
            name: var.name,
            ty,
            is_const: var.is_const,
            loc: var.loc,
        })
    }

    // ctor -> 'init' params block
    fn parse_ctor(&mut self, access: Access) -> Option<CtorDecl> {
        if self.current().is_not(TokenKind::KwInit) {
            self.error_expected("'init'");
            return None;
        }
        let loc = self.consume().loc;
        let params = self.parse_params();
        let body = self.parse_block()?;
        Some(CtorDecl {
            access,
            params,
            body,
            loc,
        })
    }

    // method -> function without the external form
    fn parse_method(&mut self, access: Access) -> Option<MethodDecl> {
        let header = self.parse_func_header()?;
        let body = self.parse_block()?;
        Some(MethodDecl::new(
            access,
            header.name,
            header.params,
            header.ret,
            body,
            header.loc,
        ))
    }

    // stmt -> variable | return | if | exprstmt | block | ';'
    fn parse_statement(&mut self) -> Option<StmtId> {
        match self.current_kind() {
            TokenKind::KwLet | TokenKind::KwVar => {
                let var = self.parse_var_data(Access::None)?;
                let loc = var.loc;
                Some(self.ast.alloc_stmt(StmtKind::Local(var), loc))
            }
            TokenKind::KwReturn => self.parse_return(),
            TokenKind::KwIf => self.parse_if(),
            TokenKind::Identifier
            | TokenKind::Number
            | TokenKind::KwTrue
            | TokenKind::KwFalse
            | TokenKind::Minus
            | TokenKind::Not
            | TokenKind::LParen
            | TokenKind::KwSelf => self.parse_expr_stmt(),
            TokenKind::LBrace => self.parse_block(),
            TokenKind::Semicolon => {
                let loc = self.consume().loc;
                Some(self.ast.alloc_stmt(StmtKind::Empty, loc))
            }
            TokenKind::KwFunc => {
                // funcception!
                let loc = self.consume().loc;
                self.diag.report(Diagnostic::funception(loc));
                None
            }
            _ => {
                let token = self.consume();
                self.error_unexpected(&token);
                None
            }
        }
    }

    // block -> '{' stmt* '}'
    fn parse_block(&mut self) -> Option<StmtId> {
        if self.current().is_not(TokenKind::LBrace) {
            self.error_expected("'{'");
            return None;
        }
        let loc = self.consume().loc;
        let mut statements = vec![];
        while self.current().is_not(TokenKind::RBrace) && self.current().is_not(TokenKind::End) {
            if let Some(statement) = self.parse_statement() {
                statements.push(statement);
            }
        }
        if self.current().is_not(TokenKind::RBrace) {
            self.error_expected("'}'");
            return None;
        }
        self.consume();
        Some(self.ast.alloc_stmt(StmtKind::Block(statements), loc))
    }

    // if -> 'if' '(' expr ')' stmt ('else' stmt)?
    fn parse_if(&mut self) -> Option<StmtId> {
        if self.current().is_not(TokenKind::KwIf) {
            self.error_expected("'if'");
            return None;
        }
        let loc = self.consume().loc;
        if self.current().is_not(TokenKind::LParen) {
            self.error_expected("'('");
            return None;
        }
        self.consume();
        let cond = self.parse_expr()?;
        if self.current().is_not(TokenKind::RParen) {
            self.error_expected("')'");
            return None;
        }
        self.consume();
        let then_case = self.parse_statement()?;
        let else_case = if self.current().is(TokenKind::KwElse) {
            self.consume();
            Some(self.parse_statement()?)
        } else {
            None
        };
        Some(self.ast.alloc_stmt(
            StmtKind::If {
                cond,
                then_case,
                else_case,
            },
            loc,
        ))
    }

    // return -> 'return' expr? ';'
    fn parse_return(&mut self) -> Option<StmtId> {
        if self.current().is_not(TokenKind::KwReturn) {
            self.error_expected("'return'");
            return None;
        }
        let loc = self.consume().loc;
        let value = if self.current().is(TokenKind::Semicolon) {
            self.consume();
            None
        } else {
            let value = self.parse_expr()?;
            if self.current().is_not(TokenKind::Semicolon) {
                self.error_expected("';'");
                return None;
            }
            self.consume();
            Some(value)
        };
        Some(self.ast.alloc_stmt(StmtKind::Return(value), loc))
    }

    fn parse_expr_stmt(&mut self) -> Option<StmtId> {
        let expr = self.parse_expr()?;
        if self.current().is_not(TokenKind::Semicolon) {
            self.error_expected("';'");
        } else {
            self.consume();
        }
        let loc = self.ast.expr(expr).loc;
        Some(self.ast.alloc_stmt(StmtKind::Expr(expr), loc))
    }

    pub fn parse_expr(&mut self) -> Option<ExprId> {
        self.parse_expr_prec(0)
    }

    // top-down operator precedence
    fn parse_expr_prec(&mut self, min_prec: i32) -> Option<ExprId> {
        let mut lhs = self.parse_unary()?;
        while min_prec < Self::prec(self.current_kind()) {
            lhs = self.parse_binary_op(lhs)?;
        }
        Some(lhs)
    }

    // unary -> ident | number | 'true' | 'false' | 'self'
    //        | ('-' | '!') expr | '(' expr ')'
    fn parse_unary(&mut self) -> Option<ExprId> {
        let token = self.consume();
        match token.kind {
            TokenKind::Identifier => Some(
                self.ast
                    .alloc_expr(ExprKind::Ident(token.text), token.loc),
            ),
            TokenKind::Number => Some(self.parse_number(&token)),
            TokenKind::KwTrue => Some(
                self.ast
                    .alloc_expr(ExprKind::Literal { bits: 1, width: 1 }, token.loc),
            ),
            TokenKind::KwFalse => Some(
                self.ast
                    .alloc_expr(ExprKind::Literal { bits: 0, width: 1 }, token.loc),
            ),
            TokenKind::Minus | TokenKind::Not => {
                // only calls and member access bind tighter than unary
                let expr = self.parse_expr_prec(Self::prec(TokenKind::LParen) - 1)?;
                let op = UnaryOp::from_token(token.kind).unwrap_or(UnaryOp::Neg);
                Some(self.ast.alloc_expr(ExprKind::Unary { op, expr }, token.loc))
            }
            TokenKind::LParen => {
                let expr = self.parse_expr()?;
                if self.current().is_not(TokenKind::RParen) {
                    self.error_expected("')'");
                }
                self.consume();
                Some(expr)
            }
            TokenKind::KwSelf => Some(self.ast.alloc_expr(ExprKind::SelfRef, token.loc)),
            _ => {
                self.diag.report(Diagnostic::expected_but_found(
                    token.loc,
                    "expression",
                    &token.describe(),
                ));
                None
            }
        }
    }

    // the ternary/call/member operators are not binary operators, but
    // they follow an expression, which is close enough
    fn parse_binary_op(&mut self, lhs: ExprId) -> Option<ExprId> {
        match self.current_kind() {
            TokenKind::Question => self.parse_ternary(lhs),
            TokenKind::LParen => self.parse_call(lhs),
            TokenKind::Dot => self.parse_member_access(lhs),
            _ => self.parse_binary_expr(lhs),
        }
    }

    fn parse_binary_expr(&mut self, lhs: ExprId) -> Option<ExprId> {
        let token = self.consume();
        let Some(op) = BinaryOp::from_token(token.kind) else {
            self.diag.report(Diagnostic::not_a_binary_op(
                token.loc,
                &token.describe(),
            ));
            return None;
        };
        let mut min_prec = Self::prec(token.kind);
        if op == BinaryOp::Assign {
            // right associative
            min_prec -= 1;
        }
        let rhs = self.parse_expr_prec(min_prec)?;
        Some(self
            .ast
            .alloc_expr(ExprKind::Binary { op, lhs, rhs }, token.loc))
    }

    fn prec(kind: TokenKind) -> i32 {
        match kind {
            TokenKind::Dot | TokenKind::LParen => 8,
            TokenKind::Star | TokenKind::Slash | TokenKind::Percent => 7,
            TokenKind::Plus | TokenKind::Minus => 6,
            TokenKind::Less
            | TokenKind::LessEqual
            | TokenKind::Greater
            | TokenKind::GreaterEqual => 5,
            TokenKind::Equals | TokenKind::NotEquals => 4,
            TokenKind::AndAnd | TokenKind::OrOr => 3,
            TokenKind::Question => 2,
            TokenKind::Assign => 1,
            _ => 0,
        }
    }

    // ternary -> cond '?' expr ':' expr
    fn parse_ternary(&mut self, cond: ExprId) -> Option<ExprId> {
        if self.current().is_not(TokenKind::Question) {
            self.error_expected("'?'");
            return None;
        }
        let loc = self.consume().loc;
        let then_case = self.parse_expr_prec(Self::prec(TokenKind::Question) - 1)?;
        if self.current().is_not(TokenKind::Colon) {
            self.error_expected("':'");
            return None;
        }
        self.consume();
        let else_case = self.parse_expr_prec(Self::prec(TokenKind::Question) - 1)?;
        Some(self.ast.alloc_expr(
            ExprKind::Ternary {
                cond,
                then_case,
                else_case,
            },
            loc,
        ))
    }

    // call -> callee '(' (arg (',' arg)*)? ')'
    fn parse_call(&mut self, callee: ExprId) -> Option<ExprId> {
        if self.current().is_not(TokenKind::LParen) {
            self.error_expected("'('");
            return None;
        }
        let loc = self.current().loc;
        let args = self.parse_call_args();
        Some(self
            .ast
            .alloc_expr(ExprKind::Call { callee, args }, loc))
    }

    fn parse_call_args(&mut self) -> Vec<Arg> {
        let mut args = vec![];
        if self.current().is_not(TokenKind::LParen) {
            self.error_expected("'('");
            return args;
        }
        self.consume();
        if self.current().is_not(TokenKind::RParen) {
            loop {
                if let Some(arg) = self.parse_call_arg() {
                    args.push(arg);
                }
                if self.current().is_not(TokenKind::Comma) {
                    break;
                }
                self.consume();
            }
        }
        if self.current().is_not(TokenKind::RParen) {
            self.error_expected("')'");
        } else {
            self.consume();
        }
        args
    }

    // arg -> ident ':' expr
    fn parse_call_arg(&mut self) -> Option<Arg> {
        if self.current().is_not(TokenKind::Identifier) {
            self.error_expected("identifier");
            return None;
        }
        let token = self.consume();
        let (name, loc) = (token.text, token.loc);
        if self.consume().is_not(TokenKind::Colon) {
            self.error_expected("':'");
            return None;
        }
        let value = self.parse_expr()?;
        Some(Arg { name, value, loc })
    }

    // member -> obj '.' ident | obj '.' ident args
    fn parse_member_access(&mut self, obj: ExprId) -> Option<ExprId> {
        if self.current().is_not(TokenKind::Dot) {
            self.error_expected("'.'");
            return None;
        }
        let loc = self.consume().loc;
        if self.current().is_not(TokenKind::Identifier) {
            self.error_expected("identifier");
            return None;
        }
        let member = self.consume().text;
        if self.current().is(TokenKind::LParen) {
            let args = self.parse_call_args();
            return Some(
                self.ast
                    .alloc_expr(ExprKind::MethodCall { obj, member, args }, loc),
            );
        }
        Some(self
            .ast
            .alloc_expr(ExprKind::FieldAccess { obj, member }, loc))
    }

    /// Turn a number token into a 32-bit literal, truncating with a
    /// warning on overflow.
    fn parse_number(&mut self, token: &Token) -> ExprId {
        let mut value: u64 = 0;
        let mut overflowed = false;
        let mut valid = !token.text.is_empty();
        for c in token.text.chars() {
            let Some(digit) = c.to_digit(10) else {
                valid = false;
                break;
            };
            value = value * 10 + digit as u64;
            if value > u32::MAX as u64 {
                overflowed = true;
                // keep the arithmetic exact mod 2^32
                value &= u32::MAX as u64;
            }
        }
        if !valid {
            self.diag
                .report(Diagnostic::invalid_int(token.loc, &token.text));
            value = 0;
        } else if overflowed {
            self.diag
                .report(Diagnostic::overflow_detected(token.loc, &token.text));
        }
        self.ast.alloc_expr(
            ExprKind::Literal {
                bits: value as u32,
                width: 32,
            },
            token.loc,
        )
    }

    // type -> 'Bool' | 'Int' | 'Void' | ident
    fn parse_type(&mut self) -> TypeId {
        let ty = match self.current_kind() {
            TokenKind::KwBool => TypeInterner::BOOL,
            TokenKind::KwInt => TypeInterner::INT,
            TokenKind::KwVoid => TypeInterner::VOID,
            TokenKind::Identifier => {
                let name = self.current().text.clone();
                self.types.unresolved(&name)
            }
            _ => {
                self.error_expected("type");
                return TypeInterner::ERROR;
            }
        };
        self.consume();
        ty
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diag::DiagKind;

    fn parse(input: &str) -> (AstContext, TypeInterner, Diag) {
        let mut ast = AstContext::new();
        let mut types = TypeInterner::new();
        let mut diag = Diag::new();
        Parser::new(Lexer::new(input, 0), &mut ast, &mut types, &mut diag).parse();
        (ast, types, diag)
    }

    #[test]
    fn test_parse_empty_function() {
        let (ast, _, diag) = parse("func f() -> Void {}");

        assert_eq!(0, diag.error_count());
        assert_eq!(1, ast.globals().len());
        let DeclKind::Function(f) = &ast.decl(ast.globals()[0]).kind else {
            panic!("expected a function");
        };
        assert_eq!("f", f.name);
        assert!(f.params.is_empty());
        assert_eq!(TypeInterner::VOID, f.ret);
    }

    #[test]
    fn test_parse_external_function() {
        let (ast, _, diag) = parse("func put(x: Int) -> Void external (putchar);");

        assert_eq!(0, diag.error_count());
        let DeclKind::ExtFunction(f) = &ast.decl(ast.globals()[0]).kind else {
            panic!("expected an external function");
        };
        assert_eq!("put", f.name);
        assert_eq!("putchar", f.alias);
        assert_eq!(1, f.params.len());
    }

    #[test]
    fn test_parse_precedence() {
        let (ast, _, diag) = parse("func f() -> Int { return 1 + 2 * 3; }");

        assert_eq!(0, diag.error_count());
        let DeclKind::Function(f) = &ast.decl(ast.globals()[0]).kind else {
            panic!("expected a function");
        };
        let StmtKind::Block(stmts) = &ast.stmt(f.body).kind else {
            panic!("expected a block");
        };
        let StmtKind::Return(Some(value)) = &ast.stmt(stmts[0]).kind else {
            panic!("expected a return");
        };
        // multiplication binds tighter, so the root is the addition
        let ExprKind::Binary { op, rhs, .. } = &ast.expr(*value).kind else {
            panic!("expected a binary expression");
        };
        assert_eq!(BinaryOp::Add, *op);
        let ExprKind::Binary { op, .. } = &ast.expr(*rhs).kind else {
            panic!("expected a nested binary expression");
        };
        assert_eq!(BinaryOp::Mul, *op);
    }

    #[test]
    fn test_parse_assignment_is_right_associative() {
        let (ast, _, diag) = parse("func f() -> Void { a = b = 1; }");

        assert_eq!(0, diag.error_count());
        let DeclKind::Function(f) = &ast.decl(ast.globals()[0]).kind else {
            panic!("expected a function");
        };
        let StmtKind::Block(stmts) = &ast.stmt(f.body).kind else {
            panic!("expected a block");
        };
        let StmtKind::Expr(expr) = &ast.stmt(stmts[0]).kind else {
            panic!("expected an expression statement");
        };
        let ExprKind::Binary { op, rhs, .. } = &ast.expr(*expr).kind else {
            panic!("expected a binary expression");
        };
        assert_eq!(BinaryOp::Assign, *op);
        let ExprKind::Binary { op, .. } = &ast.expr(*rhs).kind else {
            panic!("expected the nested assignment on the right");
        };
        assert_eq!(BinaryOp::Assign, *op);
    }

    #[test]
    fn test_parse_named_call_args() {
        let (ast, _, diag) = parse("func f() -> Void { g(x: 1, y: 2); }");

        assert_eq!(0, diag.error_count());
        let DeclKind::Function(f) = &ast.decl(ast.globals()[0]).kind else {
            panic!("expected a function");
        };
        let StmtKind::Block(stmts) = &ast.stmt(f.body).kind else {
            panic!("expected a block");
        };
        let StmtKind::Expr(expr) = &ast.stmt(stmts[0]).kind else {
            panic!("expected an expression statement");
        };
        let ExprKind::Call { args, .. } = &ast.expr(*expr).kind else {
            panic!("expected a call");
        };
        assert_eq!(vec!["x", "y"], args.iter().map(|a| a.name.as_str()).collect::<Vec<_>>());
    }

    #[test]
    fn test_parse_class() {
        let (ast, _, diag) = parse(
            "public class Point { \
                var x: Int; \
                var y: Int; \
                init(x: Int, y: Int) {} \
                public func norm() -> Int { return 0; } \
            }",
        );

        assert_eq!(0, diag.error_count());
        let DeclKind::Class(c) = &ast.decl(ast.globals()[0]).kind else {
            panic!("expected a class");
        };
        assert_eq!("Point", c.name);
        assert_eq!(2, c.fields.len());
        assert!(c.ctor.is_some());
        assert_eq!(1, c.methods.len());
        assert_eq!(Access::Public, c.methods[0].access);
    }

    #[test]
    fn test_field_without_type_is_an_error() {
        let (_, _, diag) = parse("class C { var x = 1; }");

        assert!(diag.kinds().contains(&DiagKind::NoFieldInits) || diag.kinds().contains(&DiagKind::MissingFieldType));
    }

    #[test]
    fn test_nested_function_is_funception() {
        let (_, _, diag) = parse("func f() -> Void { func g() -> Void {} }");

        assert!(diag.kinds().contains(&DiagKind::Funception));
    }

    #[test]
    fn test_recovery_surfaces_multiple_errors() {
        let (_, _, diag) = parse("func f() -> Void { let ; } func g() -> Void { return 1 }");

        assert!(diag.error_count() >= 2);
    }

    #[test]
    fn test_literal_overflow_warns_and_truncates() {
        let (ast, _, diag) = parse("func f() -> Int { return 999999999999999999999999999999999; }");

        assert_eq!(0, diag.error_count());
        assert_eq!(1, diag.warning_count());
        assert_eq!(vec![DiagKind::OverflowDetected], diag.kinds());
        let DeclKind::Function(f) = &ast.decl(ast.globals()[0]).kind else {
            panic!("expected a function");
        };
        let StmtKind::Block(stmts) = &ast.stmt(f.body).kind else {
            panic!("expected a block");
        };
        let StmtKind::Return(Some(value)) = &ast.stmt(stmts[0]).kind else {
            panic!("expected a return");
        };
        let ExprKind::Literal { bits, width } = &ast.expr(*value).kind else {
            panic!("expected a literal");
        };
        assert_eq!(32, *width);
        // low 32 bits of the decimal value
        assert_eq!((999999999999999999999999999999999u128 & 0xFFFF_FFFF) as u32, *bits);
    }

    #[test]
    fn test_var_without_type_and_init_is_an_error() {
        let (_, _, diag) = parse("func f() -> Void { let x; }");

        assert!(diag.kinds().contains(&DiagKind::ExpectedButFound));
    }
}
