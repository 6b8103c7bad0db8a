use thiserror::Error;

/// Typed errors produced while executing a program. All of them abort the
/// current evaluation and propagate to the embedder.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("Name '{name}' is not defined")]
    NameError { name: String },
    #[error("Operation '{operation}' is not supported for types {lhs} and {rhs}")]
    TypeMismatch {
        operation: &'static str,
        lhs: &'static str,
        rhs: &'static str,
    },
    #[error("Division by zero")]
    ZeroDivision,
    #[error("Method '{method}' with {arity} argument(s) is not implemented for {type_name}")]
    NotImplemented {
        type_name: String,
        method: String,
        arity: usize,
    },
    #[error("Failed to write program output: {message}")]
    OutputStream { message: String },
}
