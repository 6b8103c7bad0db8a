use std::cell::RefCell;
use std::rc::Rc;

use crate::runtime::Context;
use crate::runtime::class::{self, Class, ClassInstance, STR_METHOD};
use crate::runtime::error::RuntimeError;

/// A language value.
#[derive(Debug)]
pub enum Object {
    Number(i64),
    Str(String),
    Bool(bool),
    Class(Rc<Class>),
    Instance(ClassInstance),
}

impl Object {
    pub fn type_name(&self) -> &'static str {
        match self {
            Object::Number(_) => "Number",
            Object::Str(_) => "String",
            Object::Bool(_) => "Bool",
            Object::Class(_) => "Class",
            Object::Instance(_) => "ClassInstance",
        }
    }
}

/// Possibly-empty, reference-counted handle to an [`Object`]. The empty
/// holder is the language's `None`.
///
/// `own` allocates a fresh object; `share` produces another handle to the
/// same object, which is how `self` is exposed inside method bodies.
#[derive(Debug, Clone, Default)]
pub struct ObjectHolder {
    data: Option<Rc<RefCell<Object>>>,
}

impl ObjectHolder {
    pub fn own(object: Object) -> Self {
        Self {
            data: Some(Rc::new(RefCell::new(object))),
        }
    }

    pub fn none() -> Self {
        Self::default()
    }

    /// A new handle to the same underlying object.
    pub fn share(&self) -> Self {
        Self {
            data: self.data.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_none()
    }

    pub fn type_name(&self) -> &'static str {
        match &self.data {
            None => "None",
            Some(cell) => cell.borrow().type_name(),
        }
    }

    /// Truthiness: `False`, zero, the empty string, classes, instances and
    /// the empty holder are all falsy.
    pub fn is_true(&self) -> bool {
        match &self.data {
            None => false,
            Some(cell) => match &*cell.borrow() {
                Object::Bool(value) => *value,
                Object::Number(value) => *value != 0,
                Object::Str(value) => !value.is_empty(),
                Object::Class(_) | Object::Instance(_) => false,
            },
        }
    }

    pub fn as_number(&self) -> Option<i64> {
        match &self.data {
            Some(cell) => match &*cell.borrow() {
                Object::Number(value) => Some(*value),
                _ => None,
            },
            None => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match &self.data {
            Some(cell) => match &*cell.borrow() {
                Object::Bool(value) => Some(*value),
                _ => None,
            },
            None => None,
        }
    }

    pub fn as_str(&self) -> Option<String> {
        match &self.data {
            Some(cell) => match &*cell.borrow() {
                Object::Str(value) => Some(value.clone()),
                _ => None,
            },
            None => None,
        }
    }

    pub fn as_class(&self) -> Option<Rc<Class>> {
        match &self.data {
            Some(cell) => match &*cell.borrow() {
                Object::Class(class) => Some(Rc::clone(class)),
                _ => None,
            },
            None => None,
        }
    }

    /// The class of the held instance, when the holder holds one.
    pub fn instance_class(&self) -> Option<Rc<Class>> {
        match &self.data {
            Some(cell) => match &*cell.borrow() {
                Object::Instance(instance) => Some(Rc::clone(instance.class())),
                _ => None,
            },
            None => None,
        }
    }

    pub fn get_field(&self, name: &str) -> Option<ObjectHolder> {
        match &self.data {
            Some(cell) => match &*cell.borrow() {
                Object::Instance(instance) => instance.fields().get(name).map(Self::share),
                _ => None,
            },
            None => None,
        }
    }

    /// Sets a field on the held instance. Returns `false` when the holder
    /// does not hold an instance.
    pub fn set_field(&self, name: &str, value: ObjectHolder) -> bool {
        match &self.data {
            Some(cell) => match &mut *cell.borrow_mut() {
                Object::Instance(instance) => {
                    instance.fields_mut().insert(name.to_string(), value);
                    true
                }
                _ => false,
            },
            None => false,
        }
    }

    /// True when the holder holds an instance whose class (or an ancestor)
    /// declares `method` with exactly `arity` formal parameters.
    pub fn has_method(&self, method: &str, arity: usize) -> bool {
        self.instance_class().is_some_and(|class| {
            class
                .get_method(method)
                .is_some_and(|m| m.formal_params.len() == arity)
        })
    }
}

/// The printed form of a value: numbers in decimal, strings raw, booleans
/// as `True`/`False`, classes as `Class <name>`, the empty holder as
/// `None`. Instances defer to a zero-argument `__str__` when declared and
/// fall back to a stable placeholder otherwise.
pub fn render(holder: &ObjectHolder, context: &mut Context<'_>) -> Result<String, RuntimeError> {
    if holder.has_method(STR_METHOD, 0) {
        let result = class::call_method(holder, STR_METHOD, Vec::new(), context)?;
        return render(&result, context);
    }

    let Some(cell) = &holder.data else {
        return Ok("None".to_string());
    };
    let text = match &*cell.borrow() {
        Object::Number(value) => value.to_string(),
        Object::Str(value) => value.clone(),
        Object::Bool(true) => "True".to_string(),
        Object::Bool(false) => "False".to_string(),
        Object::Class(class) => format!("Class {}", class.name()),
        Object::Instance(instance) => format!("<{} object>", instance.class().name()),
    };
    Ok(text)
}
