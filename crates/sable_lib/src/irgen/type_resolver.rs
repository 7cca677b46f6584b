//! Pass A: class type resolution.
//!
//! Two sweeps over the global declaration list. The first introduces
//! every class name as an opaque class type (and its LLVM struct pair),
//! so classes can reference each other regardless of declaration order.
//! The second populates each class's field table and fills in the LLVM
//! payload struct body.

use crate::diag::{Diag, Diagnostic};
use crate::parser::ast::{Access, AstContext, ClassDecl, DeclKind};
use crate::types::{Field, TypeInterner};

use super::converter::TypeConverter;

pub struct TypeResolver<'a, 'ctx> {
    ast: &'a AstContext,
    types: &'a mut TypeInterner,
    converter: &'a mut TypeConverter<'ctx>,
    diag: &'a mut Diag,
}

impl<'a, 'ctx> TypeResolver<'a, 'ctx> {
    pub fn new(
        ast: &'a AstContext,
        types: &'a mut TypeInterner,
        converter: &'a mut TypeConverter<'ctx>,
        diag: &'a mut Diag,
    ) -> Self {
        Self {
            ast,
            types,
            converter,
            diag,
        }
    }

    pub fn run(&mut self) {
        // sweep 1: introduce class names
        for decl in self.ast.globals() {
            if let DeclKind::Class(class) = &self.ast.decl(*decl).kind {
                self.declare(class);
            }
        }
        // sweep 2: populate field tables and struct bodies
        for decl in self.ast.globals() {
            if let DeclKind::Class(class) = &self.ast.decl(*decl).kind {
                if !class.skipped() {
                    self.resolve(class);
                }
            }
        }
    }

    fn declare(&mut self, class: &ClassDecl) {
        match self.types.create_class(&class.name) {
            Some(id) => {
                class.set_ty(id);
                self.converter.add_class(id, &class.name);
            }
            None => {
                self.diag
                    .report(Diagnostic::duplicate_type(class.loc, &class.name));
                class.set_skipped();
            }
        }
    }

    fn resolve(&mut self, class: &ClassDecl) {
        let Some(id) = class.ty() else {
            return;
        };
        let mut field_types = vec![];
        for field in &class.fields {
            let index = field_types.len();
            // stored with its effective access so the emitter can check
            // visibility without the class declaration at hand
            let duplicate = self.types.set_field(
                id,
                &field.name,
                Field {
                    ty: field.ty,
                    index,
                    access: Access::effective(class.access, field.access),
                },
            );
            if duplicate {
                self.diag
                    .report(Diagnostic::duplicate_field(field.loc, &field.name));
                continue;
            }
            field_types.push(self.converter.value_type(self.types, field.ty));
        }
        self.converter.set_class_body(id, &field_types);
    }
}
