//! Runtime object model shared by the whole interpreter.
//!
//! Every language value lives behind an [`ObjectHolder`], a possibly-empty
//! reference-counted handle; an empty holder is the language's `None`.
//! Classes, instances and the comparison family are defined in the
//! submodules, the activation-record [`Closure`] and the output [`Context`]
//! here.

mod class;
mod compare;
mod error;
mod object;

pub use class::{
    ADD_METHOD, Class, ClassInstance, EQ_METHOD, INIT_METHOD, LT_METHOD, Method, STR_METHOD,
    call_method, new_instance,
};
pub use compare::{equal, greater, greater_or_equal, less, less_or_equal, not_equal};
pub use error::RuntimeError;
pub use object::{Object, ObjectHolder, render};

use std::collections::HashMap;
use std::io;

/// Identifier-to-handle mapping serving as an activation record.
pub type Closure = HashMap<String, ObjectHolder>;

/// Runtime environment handed to every evaluation step. Its only service
/// is the output stream `print` writes to.
pub struct Context<'a> {
    output: &'a mut dyn io::Write,
}

impl<'a> Context<'a> {
    pub fn new(output: &'a mut dyn io::Write) -> Self {
        Self { output }
    }

    pub fn output_stream(&mut self) -> &mut dyn io::Write {
        self.output
    }
}
