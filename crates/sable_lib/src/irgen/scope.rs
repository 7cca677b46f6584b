//! Symbol tables used during emission: the per-function scope stack and
//! the global scope filled by the resolver passes.

use std::collections::HashMap;

use inkwell::values::{FunctionValue, PointerValue};

use crate::parser::ast::Access;
use crate::types::TypeId;

/// A local binding: its source type and its stack slot. Poisoned
/// bindings (those that failed type checking) carry no slot; loading
/// them yields no value and no further diagnostics.
#[derive(Debug, Clone, Copy)]
pub struct VarItem<'ctx> {
    pub ty: TypeId,
    pub ptr: Option<PointerValue<'ctx>>,
}

/// A declared function: its interned source type and LLVM value.
#[derive(Debug, Clone, Copy)]
pub struct FuncItem<'ctx> {
    pub ty: TypeId,
    pub func: FunctionValue<'ctx>,
}

/// A name in the global scope is either a function or a global variable.
#[derive(Debug, Clone, Copy)]
pub enum Symbol<'ctx> {
    Func(FuncItem<'ctx>),
    Var(VarItem<'ctx>),
}

/// Stack of per-function scope frames. Lookup walks frames innermost
/// first; insertion writes only to the top frame. The declared return
/// type of the enclosing function lives beside the stack.
#[derive(Debug, Default)]
pub struct FuncScope<'ctx> {
    frames: Vec<HashMap<String, VarItem<'ctx>>>,
    return_type: Option<TypeId>,
}

impl<'ctx> FuncScope<'ctx> {
    pub fn new() -> FuncScope<'ctx> {
        FuncScope::default()
    }

    pub fn enter(&mut self) {
        self.frames.push(HashMap::new());
    }

    pub fn exit(&mut self) {
        self.frames.pop();
    }

    /// No function has been entered; we are at the global scope.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<VarItem<'ctx>> {
        self.frames
            .iter()
            .rev()
            .find_map(|frame| frame.get(name).copied())
    }

    /// Insert into the top frame. Returns true if the name already
    /// existed there (the insertion is rejected).
    pub fn set(&mut self, name: &str, item: VarItem<'ctx>) -> bool {
        let Some(frame) = self.frames.last_mut() else {
            return true;
        };
        if frame.contains_key(name) {
            return true;
        }
        frame.insert(name.to_string(), item);
        false
    }

    pub fn return_type(&self) -> Option<TypeId> {
        self.return_type
    }

    pub fn set_return_type(&mut self, ty: TypeId) {
        self.return_type = Some(ty);
    }
}

/// Global declarations: free names (functions and global variables),
/// plus per-class constructors, methods and destructors. Member entries
/// carry their effective access so the emitter can enforce visibility.
#[derive(Debug, Default)]
pub struct GlobalScope<'ctx> {
    symtab: HashMap<String, Symbol<'ctx>>,
    ctors: HashMap<TypeId, (FuncItem<'ctx>, Access)>,
    methods: HashMap<(TypeId, String), (FuncItem<'ctx>, Access)>,
    dtors: HashMap<TypeId, FunctionValue<'ctx>>,
}

impl<'ctx> GlobalScope<'ctx> {
    pub fn new() -> GlobalScope<'ctx> {
        GlobalScope::default()
    }

    pub fn get(&self, name: &str) -> Option<Symbol<'ctx>> {
        self.symtab.get(name).copied()
    }

    pub fn get_func(&self, name: &str) -> Option<FuncItem<'ctx>> {
        match self.symtab.get(name) {
            Some(Symbol::Func(item)) => Some(*item),
            _ => None,
        }
    }

    pub fn set_func(&mut self, name: &str, item: FuncItem<'ctx>) -> bool {
        if self.symtab.contains_key(name) {
            return true;
        }
        self.symtab.insert(name.to_string(), Symbol::Func(item));
        false
    }

    pub fn set_var(&mut self, name: &str, item: VarItem<'ctx>) -> bool {
        if self.symtab.contains_key(name) {
            return true;
        }
        self.symtab.insert(name.to_string(), Symbol::Var(item));
        false
    }

    pub fn ctor(&self, class: TypeId) -> Option<(FuncItem<'ctx>, Access)> {
        self.ctors.get(&class).copied()
    }

    pub fn set_ctor(&mut self, class: TypeId, item: FuncItem<'ctx>, access: Access) -> bool {
        self.ctors.insert(class, (item, access)).is_some()
    }

    pub fn method(&self, class: TypeId, name: &str) -> Option<(FuncItem<'ctx>, Access)> {
        self.methods.get(&(class, name.to_string())).copied()
    }

    pub fn set_method(
        &mut self,
        class: TypeId,
        name: &str,
        item: FuncItem<'ctx>,
        access: Access,
    ) -> bool {
        let key = (class, name.to_string());
        if self.methods.contains_key(&key) {
            return true;
        }
        self.methods.insert(key, (item, access));
        false
    }

    pub fn dtor(&self, class: TypeId) -> Option<FunctionValue<'ctx>> {
        self.dtors.get(&class).copied()
    }

    pub fn set_dtor(&mut self, class: TypeId, func: FunctionValue<'ctx>) -> bool {
        self.dtors.insert(class, func).is_some()
    }
}
