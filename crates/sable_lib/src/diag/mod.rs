//! # Diagnostics Module
//!
//! Central sink for everything the compiler has to say about a program.
//! Every pass (lexer, parser, resolvers, emitter) receives an explicit
//! `&mut Diag` collaborator and reports through it; nothing in the core
//! aborts compilation on a source error.
//!
//! ## Design
//!
//! - Diagnostics are categorized by [`DiagKind`]. The kind determines the
//!   [`Severity`]: `OverflowDetected` is the only warning, a couple of
//!   "should never happen" kinds are internal, everything else is an error.
//! - Each kind has a dedicated constructor on [`Diagnostic`] which fixes
//!   the argument shape for that kind at compile time (a location, a name,
//!   a pair of rendered types, ...). Passes never format ad-hoc messages.
//! - The sink counts errors and warnings. Internal, fatal and error
//!   severities bump the error counter; warnings bump the warning counter.
//!   The error count is the core's only externally observable
//!   success/failure signal: the driver maps it to the process exit code.
//! - Past emissions are append-only. Consumers can inspect counts, the
//!   ordered kind list and the stored diagnostics, but never alter them.
//!
//! Rendered message text is advisory; tests assert on kinds and counts.

use std::fmt::Display;

use colored::Colorize;
use serde::{Deserialize, Serialize};

use crate::lexer::Location;

/// How severe a diagnostic is.
///
/// Everything except `Warning` counts as an error. `Internal` marks
/// conditions that indicate a compiler bug rather than a source bug.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    Internal,
    Fatal,
    Error,
    Warning,
}

impl Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Internal => write!(f, "internal"),
            Severity::Fatal => write!(f, "fatal"),
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// The fixed set of diagnostic categories the compiler can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagKind {
    // lexer
    UnknownChar,
    // parser
    InvalidInt,
    OverflowDetected,
    ExpectedButFound,
    UnexpectedToken,
    Funception,
    MissingFieldType,
    NoFieldInits,
    // resolvers
    DuplicateType,
    DuplicateField,
    FuncAlreadyDefined,
    FuncNamedAfterType,
    // emitter
    InvalidParamType,
    InvalidVarType,
    MismatchingVarTypes,
    VarAlreadyDefined,
    MissingReturn,
    RetvalMismatchesRetType,
    CantReturnVoidValue,
    UnknownIdent,
    NotAFunction,
    MismatchingArgCount,
    CannotConvert,
    LhsNotAssignable,
    InvalidUnary,
    InvalidBinary,
    NotABinaryOp,
    TernaryTypeMismatch,
    TopLevelCtrlFlow,
    FuncInFunc,
    InvalidIntWidth,
    NotAClass,
    UnknownMember,
    InaccessibleMember,
    NoCtor,
    NonConstGlobalInit,
}

impl DiagKind {
    /// Severity is a fixed function of the kind.
    pub fn severity(self) -> Severity {
        match self {
            DiagKind::OverflowDetected => Severity::Warning,
            DiagKind::InvalidIntWidth | DiagKind::NotABinaryOp => Severity::Internal,
            _ => Severity::Error,
        }
    }
}

/// A single reported message: kind, derived severity, optional source
/// location and rendered text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagKind,
    pub severity: Severity,
    pub location: Option<Location>,
    pub message: String,
}

impl Diagnostic {
    fn new(kind: DiagKind, location: Option<Location>, message: String) -> Diagnostic {
        Diagnostic {
            kind,
            severity: kind.severity(),
            location,
            message,
        }
    }

    pub fn unknown_char(loc: Location, c: char) -> Diagnostic {
        Self::new(DiagKind::UnknownChar, Some(loc), format!("unknown symbol '{c}'"))
    }

    pub fn invalid_int(loc: Location, text: &str) -> Diagnostic {
        Self::new(
            DiagKind::InvalidInt,
            Some(loc),
            format!("invalid integer '{text}'"),
        )
    }

    pub fn overflow_detected(loc: Location, text: &str) -> Diagnostic {
        Self::new(
            DiagKind::OverflowDetected,
            Some(loc),
            format!("integer '{text}' does not fit in 32 bits and was truncated"),
        )
    }

    pub fn expected_but_found(loc: Location, expected: &str, found: &str) -> Diagnostic {
        Self::new(
            DiagKind::ExpectedButFound,
            Some(loc),
            format!("expected {expected} but found {found}"),
        )
    }

    pub fn unexpected_token(loc: Location, found: &str) -> Diagnostic {
        Self::new(
            DiagKind::UnexpectedToken,
            Some(loc),
            format!("unexpected {found}"),
        )
    }

    pub fn funception(loc: Location) -> Diagnostic {
        Self::new(
            DiagKind::Funception,
            Some(loc),
            "functions cannot be defined within another function".into(),
        )
    }

    pub fn missing_field_type(loc: Location, name: &str) -> Diagnostic {
        Self::new(
            DiagKind::MissingFieldType,
            Some(loc),
            format!("field '{name}' must have a type annotation"),
        )
    }

    pub fn no_field_inits(loc: Location) -> Diagnostic {
        Self::new(
            DiagKind::NoFieldInits,
            Some(loc),
            "fields cannot have initializers".into(),
        )
    }

    pub fn duplicate_type(loc: Location, name: &str) -> Diagnostic {
        Self::new(
            DiagKind::DuplicateType,
            Some(loc),
            format!("type '{name}' is already defined"),
        )
    }

    pub fn duplicate_field(loc: Location, name: &str) -> Diagnostic {
        Self::new(
            DiagKind::DuplicateField,
            Some(loc),
            format!("field '{name}' is already defined"),
        )
    }

    pub fn func_already_defined(loc: Location, name: &str) -> Diagnostic {
        Self::new(
            DiagKind::FuncAlreadyDefined,
            Some(loc),
            format!("function '{name}' is already defined"),
        )
    }

    pub fn func_named_after_type(loc: Location, name: &str) -> Diagnostic {
        Self::new(
            DiagKind::FuncNamedAfterType,
            Some(loc),
            format!("function '{name}' shares its name with a type"),
        )
    }

    pub fn invalid_param_type(loc: Location, name: &str, ty: &str) -> Diagnostic {
        Self::new(
            DiagKind::InvalidParamType,
            Some(loc),
            format!("parameter '{name}' cannot have type '{ty}'"),
        )
    }

    pub fn invalid_var_type(loc: Location, name: &str, ty: &str) -> Diagnostic {
        Self::new(
            DiagKind::InvalidVarType,
            Some(loc),
            format!("variable '{name}' cannot have type '{ty}'"),
        )
    }

    pub fn mismatching_var_types(loc: Location, name: &str, declared: &str, init: &str) -> Diagnostic {
        Self::new(
            DiagKind::MismatchingVarTypes,
            Some(loc),
            format!("variable '{name}' is declared as '{declared}' but initialized with '{init}'"),
        )
    }

    pub fn var_already_defined(loc: Location, name: &str) -> Diagnostic {
        Self::new(
            DiagKind::VarAlreadyDefined,
            Some(loc),
            format!("variable '{name}' is already defined"),
        )
    }

    pub fn missing_return(loc: Location, name: &str) -> Diagnostic {
        Self::new(
            DiagKind::MissingReturn,
            Some(loc),
            format!("function '{name}' does not return on every path"),
        )
    }

    pub fn retval_mismatches_rettype(loc: Location, actual: &str, expected: &str) -> Diagnostic {
        Self::new(
            DiagKind::RetvalMismatchesRetType,
            Some(loc),
            format!("returned value of type '{actual}' does not match return type '{expected}'"),
        )
    }

    pub fn cant_return_void_value(loc: Location) -> Diagnostic {
        Self::new(
            DiagKind::CantReturnVoidValue,
            Some(loc),
            "cannot return an expression of type 'Void'".into(),
        )
    }

    pub fn unknown_ident(loc: Location, name: &str) -> Diagnostic {
        Self::new(
            DiagKind::UnknownIdent,
            Some(loc),
            format!("unknown identifier '{name}'"),
        )
    }

    pub fn not_a_function(loc: Location, ty: &str) -> Diagnostic {
        Self::new(
            DiagKind::NotAFunction,
            Some(loc),
            format!("expression of type '{ty}' is not callable"),
        )
    }

    pub fn mismatching_arg_count(loc: Location, given: usize, expected: usize) -> Diagnostic {
        Self::new(
            DiagKind::MismatchingArgCount,
            Some(loc),
            format!("call takes {given} arguments but {expected} are required"),
        )
    }

    pub fn cannot_convert(loc: Location, from: &str, to: &str) -> Diagnostic {
        Self::new(
            DiagKind::CannotConvert,
            Some(loc),
            format!("cannot convert expression of type '{from}' to type '{to}'"),
        )
    }

    pub fn lhs_not_assignable(loc: Location) -> Diagnostic {
        Self::new(
            DiagKind::LhsNotAssignable,
            Some(loc),
            "left side of assignment must be a variable or field".into(),
        )
    }

    pub fn invalid_unary(loc: Location, op: &str, ty: &str) -> Diagnostic {
        Self::new(
            DiagKind::InvalidUnary,
            Some(loc),
            format!("unary operator '{op}' cannot be applied to type '{ty}'"),
        )
    }

    pub fn invalid_binary(loc: Location, op: &str, lhs: &str, rhs: &str) -> Diagnostic {
        Self::new(
            DiagKind::InvalidBinary,
            Some(loc),
            format!("binary operator '{op}' cannot be applied to types '{lhs}' and '{rhs}'"),
        )
    }

    pub fn not_a_binary_op(loc: Location, found: &str) -> Diagnostic {
        Self::new(
            DiagKind::NotABinaryOp,
            Some(loc),
            format!("{found} is not a binary operator"),
        )
    }

    pub fn ternary_type_mismatch(loc: Location, then_ty: &str, else_ty: &str) -> Diagnostic {
        Self::new(
            DiagKind::TernaryTypeMismatch,
            Some(loc),
            format!("ternary arms have mismatching types '{then_ty}' and '{else_ty}'"),
        )
    }

    pub fn top_level_ctrl_flow(loc: Location) -> Diagnostic {
        Self::new(
            DiagKind::TopLevelCtrlFlow,
            Some(loc),
            "top-level control flow statements are not allowed".into(),
        )
    }

    pub fn func_in_func(loc: Location, name: &str) -> Diagnostic {
        Self::new(
            DiagKind::FuncInFunc,
            Some(loc),
            format!("function '{name}' cannot be defined inside another function"),
        )
    }

    pub fn invalid_int_width(loc: Location, width: u32) -> Diagnostic {
        Self::new(
            DiagKind::InvalidIntWidth,
            Some(loc),
            format!("literal has unsupported bit width {width}"),
        )
    }

    pub fn not_a_class(loc: Location, ty: &str) -> Diagnostic {
        Self::new(
            DiagKind::NotAClass,
            Some(loc),
            format!("type '{ty}' has no members"),
        )
    }

    pub fn unknown_member(loc: Location, class: &str, member: &str) -> Diagnostic {
        Self::new(
            DiagKind::UnknownMember,
            Some(loc),
            format!("class '{class}' has no member '{member}'"),
        )
    }

    pub fn inaccessible_member(loc: Location, class: &str, member: &str) -> Diagnostic {
        Self::new(
            DiagKind::InaccessibleMember,
            Some(loc),
            format!("member '{member}' of class '{class}' is private"),
        )
    }

    pub fn no_ctor(loc: Location, class: &str) -> Diagnostic {
        Self::new(
            DiagKind::NoCtor,
            Some(loc),
            format!("class '{class}' has no constructor"),
        )
    }

    pub fn non_const_global_init(loc: Location, name: &str) -> Diagnostic {
        Self::new(
            DiagKind::NonConstGlobalInit,
            Some(loc),
            format!("global variable '{name}' requires a constant initializer"),
        )
    }
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let severity = match self.severity {
            Severity::Warning => self.severity.to_string().yellow().bold(),
            _ => self.severity.to_string().red().bold(),
        };
        match &self.location {
            Some(loc) => write!(f, "{loc}: {severity}: {}", self.message),
            None => write!(f, "{severity}: {}", self.message),
        }
    }
}

/// The diagnostics sink shared by every pass of a compilation.
#[derive(Debug, Default)]
pub struct Diag {
    diagnostics: Vec<Diagnostic>,
    errors: usize,
    warnings: usize,
}

impl Diag {
    pub fn new() -> Diag {
        Diag::default()
    }

    /// Record a diagnostic and bump the matching counter.
    pub fn report(&mut self, diagnostic: Diagnostic) {
        match diagnostic.severity {
            Severity::Warning => self.warnings += 1,
            _ => self.errors += 1,
        }
        self.diagnostics.push(diagnostic);
    }

    pub fn error_count(&self) -> usize {
        self.errors
    }

    pub fn warning_count(&self) -> usize {
        self.warnings
    }

    pub fn has_errors(&self) -> bool {
        self.errors > 0
    }

    /// All emissions in report order.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// The kinds of all emissions in report order.
    pub fn kinds(&self) -> Vec<DiagKind> {
        self.diagnostics.iter().map(|d| d.kind).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc() -> Location {
        Location::default()
    }

    #[test]
    fn test_counters_split_by_severity() {
        let mut diag = Diag::new();
        diag.report(Diagnostic::unknown_ident(loc(), "x"));
        diag.report(Diagnostic::overflow_detected(loc(), "99999999999"));
        diag.report(Diagnostic::cant_return_void_value(loc()));

        assert_eq!(2, diag.error_count());
        assert_eq!(1, diag.warning_count());
        assert!(diag.has_errors());
    }

    #[test]
    fn test_kinds_keep_report_order() {
        let mut diag = Diag::new();
        diag.report(Diagnostic::unknown_char(loc(), '@'));
        diag.report(Diagnostic::missing_return(loc(), "f"));

        assert_eq!(
            vec![DiagKind::UnknownChar, DiagKind::MissingReturn],
            diag.kinds()
        );
    }

    #[test]
    fn test_internal_severity_counts_as_error() {
        let mut diag = Diag::new();
        diag.report(Diagnostic::invalid_int_width(loc(), 7));

        assert_eq!(Severity::Internal, diag.diagnostics()[0].severity);
        assert_eq!(1, diag.error_count());
        assert_eq!(0, diag.warning_count());
    }
}
