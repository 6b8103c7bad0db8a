use std::cell::OnceCell;
use std::rc::Rc;

use crate::ast::Statement;
use crate::runtime::error::RuntimeError;
use crate::runtime::object::{Object, ObjectHolder};
use crate::runtime::{Closure, Context};

pub const INIT_METHOD: &str = "__init__";
pub const STR_METHOD: &str = "__str__";
pub const EQ_METHOD: &str = "__eq__";
pub const LT_METHOD: &str = "__lt__";
pub const ADD_METHOD: &str = "__add__";

const SELF: &str = "self";

/// A named method with its formal parameters (`self` excluded; it is bound
/// implicitly on every call) and the owned body statement.
#[derive(Debug)]
pub struct Method {
    pub name: String,
    pub formal_params: Vec<String>,
    pub body: Statement,
}

/// A class: a name, a method table and an optional parent class.
///
/// Construction is two-phase so that method bodies may instantiate the
/// class they belong to: `declare` hands out the `Rc` first, and
/// `define_methods` fills the table exactly once. After that the table is
/// immutable.
#[derive(Debug)]
pub struct Class {
    name: String,
    methods: OnceCell<Vec<Method>>,
    parent: Option<Rc<Class>>,
}

impl Class {
    pub fn declare(name: String, parent: Option<Rc<Class>>) -> Rc<Self> {
        Rc::new(Self {
            name,
            methods: OnceCell::new(),
            parent,
        })
    }

    /// Fills the method table of a declared class. Returns `false` when the
    /// table was already defined.
    pub fn define_methods(&self, methods: Vec<Method>) -> bool {
        self.methods.set(methods).is_ok()
    }

    pub fn new(name: String, methods: Vec<Method>, parent: Option<Rc<Class>>) -> Rc<Self> {
        let class = Self::declare(name, parent);
        class.define_methods(methods);
        class
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<&Rc<Class>> {
        self.parent.as_ref()
    }

    /// Looks the method up in declaration order, falling through to the
    /// parent chain.
    pub fn get_method(&self, name: &str) -> Option<&Method> {
        self.methods
            .get()
            .and_then(|methods| methods.iter().find(|method| method.name == name))
            .or_else(|| self.parent.as_ref().and_then(|parent| parent.get_method(name)))
    }
}

/// An instance: a non-owning reference to its class plus the owned field
/// closure.
#[derive(Debug)]
pub struct ClassInstance {
    class: Rc<Class>,
    fields: Closure,
}

impl ClassInstance {
    pub fn new(class: Rc<Class>) -> Self {
        Self {
            class,
            fields: Closure::new(),
        }
    }

    pub fn class(&self) -> &Rc<Class> {
        &self.class
    }

    pub fn fields(&self) -> &Closure {
        &self.fields
    }

    pub fn fields_mut(&mut self) -> &mut Closure {
        &mut self.fields
    }
}

fn not_implemented(type_name: &str, method: &str, arity: usize) -> RuntimeError {
    RuntimeError::NotImplemented {
        type_name: type_name.to_string(),
        method: method.to_string(),
        arity,
    }
}

/// Invokes `method` on the instance held by `receiver`.
///
/// A fresh closure binds `self` to a shared view of the receiver and each
/// formal parameter to its positional argument; the method body executes
/// against that closure and the current context.
pub fn call_method(
    receiver: &ObjectHolder,
    method: &str,
    actual_args: Vec<ObjectHolder>,
    context: &mut Context<'_>,
) -> Result<ObjectHolder, RuntimeError> {
    let class = receiver
        .instance_class()
        .ok_or_else(|| not_implemented(receiver.type_name(), method, actual_args.len()))?;
    let class_method = class
        .get_method(method)
        .ok_or_else(|| not_implemented(class.name(), method, actual_args.len()))?;
    if class_method.formal_params.len() != actual_args.len() {
        return Err(not_implemented(class.name(), method, actual_args.len()));
    }

    let mut closure = Closure::new();
    closure.insert(SELF.to_string(), receiver.share());
    for (param, arg) in class_method.formal_params.iter().zip(actual_args) {
        closure.insert(param.clone(), arg);
    }
    Ok(class_method.body.execute(&mut closure, context)?.into_value())
}

/// Allocates a fresh instance of `class` and runs `__init__` when declared
/// in the class or any ancestor. Arguments passed to a class without
/// `__init__` are rejected.
pub fn new_instance(
    class: &Rc<Class>,
    args: Vec<ObjectHolder>,
    context: &mut Context<'_>,
) -> Result<ObjectHolder, RuntimeError> {
    let instance = ObjectHolder::own(Object::Instance(ClassInstance::new(Rc::clone(class))));
    if class.get_method(INIT_METHOD).is_some() {
        call_method(&instance, INIT_METHOD, args, context)?;
    } else if !args.is_empty() {
        return Err(not_implemented(class.name(), INIT_METHOD, args.len()));
    }
    Ok(instance)
}
