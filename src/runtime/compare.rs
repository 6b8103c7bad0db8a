use crate::runtime::Context;
use crate::runtime::class::{self, EQ_METHOD, LT_METHOD};
use crate::runtime::error::RuntimeError;
use crate::runtime::object::ObjectHolder;

/// Value equality. Numbers, strings and booleans compare by value, two
/// empty holders are equal, and an instance whose class declares
/// `__eq__(other)` decides for itself. Everything else is a type mismatch.
pub fn equal(
    lhs: &ObjectHolder,
    rhs: &ObjectHolder,
    context: &mut Context<'_>,
) -> Result<bool, RuntimeError> {
    if let (Some(left), Some(right)) = (lhs.as_number(), rhs.as_number()) {
        return Ok(left == right);
    }
    if let (Some(left), Some(right)) = (lhs.as_str(), rhs.as_str()) {
        return Ok(left == right);
    }
    if let (Some(left), Some(right)) = (lhs.as_bool(), rhs.as_bool()) {
        return Ok(left == right);
    }
    if lhs.is_empty() && rhs.is_empty() {
        return Ok(true);
    }
    if lhs.has_method(EQ_METHOD, 1) {
        let result = class::call_method(lhs, EQ_METHOD, vec![rhs.share()], context)?;
        return Ok(result.is_true());
    }
    Err(RuntimeError::TypeMismatch {
        operation: "==",
        lhs: lhs.type_name(),
        rhs: rhs.type_name(),
    })
}

/// Value ordering, symmetric to [`equal`] with `<` and `__lt__(other)`.
pub fn less(
    lhs: &ObjectHolder,
    rhs: &ObjectHolder,
    context: &mut Context<'_>,
) -> Result<bool, RuntimeError> {
    if let (Some(left), Some(right)) = (lhs.as_number(), rhs.as_number()) {
        return Ok(left < right);
    }
    if let (Some(left), Some(right)) = (lhs.as_str(), rhs.as_str()) {
        return Ok(left < right);
    }
    if let (Some(left), Some(right)) = (lhs.as_bool(), rhs.as_bool()) {
        return Ok(!left && right);
    }
    if lhs.has_method(LT_METHOD, 1) {
        let result = class::call_method(lhs, LT_METHOD, vec![rhs.share()], context)?;
        return Ok(result.is_true());
    }
    Err(RuntimeError::TypeMismatch {
        operation: "<",
        lhs: lhs.type_name(),
        rhs: rhs.type_name(),
    })
}

pub fn not_equal(
    lhs: &ObjectHolder,
    rhs: &ObjectHolder,
    context: &mut Context<'_>,
) -> Result<bool, RuntimeError> {
    Ok(!equal(lhs, rhs, context)?)
}

pub fn greater(
    lhs: &ObjectHolder,
    rhs: &ObjectHolder,
    context: &mut Context<'_>,
) -> Result<bool, RuntimeError> {
    Ok(!less(lhs, rhs, context)? && not_equal(lhs, rhs, context)?)
}

pub fn less_or_equal(
    lhs: &ObjectHolder,
    rhs: &ObjectHolder,
    context: &mut Context<'_>,
) -> Result<bool, RuntimeError> {
    Ok(less(lhs, rhs, context)? || equal(lhs, rhs, context)?)
}

pub fn greater_or_equal(
    lhs: &ObjectHolder,
    rhs: &ObjectHolder,
    context: &mut Context<'_>,
) -> Result<bool, RuntimeError> {
    Ok(!less(lhs, rhs, context)?)
}
