//! Unary operators

use crate::interpreter::errors::RuntimeError;
use crate::interpreter::object::Object;
use crate::parser::ast::UnaryOp;

pub fn unary_op(op: UnaryOp, operand: &Object) -> Result<Object, RuntimeError> {
    match op {
        UnaryOp::Not => Ok(Object::Bool(!operand.is_truthy())),
        UnaryOp::Neg => match operand {
            Object::Float(x) => Ok(Object::Float(-x)),
            other => match other.as_int() {
                Some(n) => n
                    .checked_neg()
                    .map(Object::Int)
                    .ok_or_else(RuntimeError::overflow),
                None => Err(bad_operand("-", other)),
            },
        },
        UnaryOp::Pos => match operand {
            Object::Float(x) => Ok(Object::Float(*x)),
            other => other
                .as_int()
                .map(Object::Int)
                .ok_or_else(|| bad_operand("+", other)),
        },
        UnaryOp::Invert => operand
            .as_int()
            .map(|n| Object::Int(!n))
            .ok_or_else(|| bad_operand("~", operand)),
    }
}

fn bad_operand(symbol: &str, operand: &Object) -> RuntimeError {
    RuntimeError::type_error(format!(
        "bad operand type for unary {}: '{}'",
        symbol,
        operand.type_name()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unary_operators() {
        assert_eq!(unary_op(UnaryOp::Neg, &Object::Int(3)).unwrap(), Object::Int(-3));
        assert_eq!(unary_op(UnaryOp::Invert, &Object::Int(0)).unwrap(), Object::Int(-1));
        assert_eq!(
            unary_op(UnaryOp::Not, &Object::str("")).unwrap(),
            Object::Bool(true)
        );
        assert!(unary_op(UnaryOp::Neg, &Object::str("x")).is_err());
        assert!(unary_op(UnaryOp::Neg, &Object::Int(i64::MIN)).is_err());
    }
}
