//! Conversion from Sable types to their LLVM structural representation.
//!
//! Primitives map directly (`Bool` → `i1`, `Int` → `i32`, `Void` →
//! `void`). A class is represented as a pointer to a reference-counted
//! struct: `{ i32 refcount, { fields... } }`. The payload struct is
//! created opaque when the class name is introduced and filled in once
//! the field table is known, which is what makes forward references
//! between classes work.
//!
//! Function types prepend the implicit `self` reference for constructors
//! and methods; constructors return void at the LLVM level since they
//! initialize an already-allocated object. Invalid value types map to an
//! empty placeholder struct so a broken program still produces
//! well-formed IR.

use std::collections::HashMap;

use inkwell::context::Context;
use inkwell::types::{BasicMetadataTypeEnum, BasicType, BasicTypeEnum, FunctionType, StructType};
use inkwell::AddressSpace;

use crate::types::{Type, TypeId, TypeInterner};

/// The two LLVM structs backing a class: the reference-counted wrapper
/// and the field payload.
#[derive(Debug, Clone, Copy)]
pub struct ClassIr<'ctx> {
    pub rc: StructType<'ctx>,
    pub payload: StructType<'ctx>,
}

pub struct TypeConverter<'ctx> {
    llcx: &'ctx Context,
    classes: HashMap<TypeId, ClassIr<'ctx>>,
}

impl<'ctx> TypeConverter<'ctx> {
    pub fn new(llcx: &'ctx Context) -> TypeConverter<'ctx> {
        TypeConverter {
            llcx,
            classes: HashMap::new(),
        }
    }

    /// Create the named struct pair for a class. The payload body is
    /// filled in later by [`TypeConverter::set_class_body`].
    pub fn add_class(&mut self, id: TypeId, name: &str) {
        // the "struct." prefix keeps the payload from colliding with the
        // reference-counted wrapper of the same name
        let payload = self.llcx.opaque_struct_type(&format!("struct.{name}"));
        let rc = self.llcx.opaque_struct_type(name);
        rc.set_body(
            &[self.llcx.i32_type().into(), payload.into()],
            false,
        );
        self.classes.insert(id, ClassIr { rc, payload });
    }

    /// Fill in the payload struct once all field types are known.
    pub fn set_class_body(&self, id: TypeId, fields: &[BasicTypeEnum<'ctx>]) {
        if let Some(class) = self.classes.get(&id) {
            class.payload.set_body(fields, false);
        }
    }

    pub fn class_parts(&self, id: TypeId) -> Option<ClassIr<'ctx>> {
        self.classes.get(&id).copied()
    }

    /// Placeholder for types that cannot be represented as values.
    fn opaque(&self) -> BasicTypeEnum<'ctx> {
        self.llcx.struct_type(&[], false).into()
    }

    /// Structural representation of a type in value position.
    pub fn value_type(&self, types: &TypeInterner, id: TypeId) -> BasicTypeEnum<'ctx> {
        match types.get(types.resolve(id)) {
            Type::Bool => self.llcx.bool_type().into(),
            Type::Int => self.llcx.i32_type().into(),
            Type::Class(_) | Type::Function(_) => {
                self.llcx.ptr_type(AddressSpace::default()).into()
            }
            // Void, Error and anything unresolvable
            _ => self.opaque(),
        }
    }

    /// LLVM function type for an interned function type, with `self`
    /// prepended for ctors and methods.
    pub fn function_type(&self, types: &TypeInterner, id: TypeId) -> FunctionType<'ctx> {
        let Some(ft) = types.function_type(id) else {
            return self.llcx.void_type().fn_type(&[], false);
        };
        let mut params: Vec<BasicMetadataTypeEnum<'ctx>> = vec![];
        if ft.self_class.is_some() {
            params.push(self.llcx.ptr_type(AddressSpace::default()).into());
        }
        for param in &ft.params {
            params.push(self.value_type(types, *param).into());
        }
        let ret = types.resolve(ft.ret);
        if ft.is_ctor || ret == TypeInterner::VOID || ret == TypeInterner::ERROR {
            self.llcx.void_type().fn_type(&params, false)
        } else {
            self.value_type(types, ret).fn_type(&params, false)
        }
    }
}
