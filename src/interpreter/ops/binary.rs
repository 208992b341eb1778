//! Binary operators and comparisons

use crate::interpreter::errors::{ExceptionKind, RuntimeError};
use crate::interpreter::loops::iterate;
use crate::interpreter::object::Object;
use crate::parser::ast::{BinOp, CmpOp};
use std::cmp::Ordering;

/// Largest string or list a repetition may build
const MAX_REPEAT_LEN: usize = 10_000_000;

pub fn binary_op(op: BinOp, left: &Object, right: &Object) -> Result<Object, RuntimeError> {
    match op {
        BinOp::Add => match (left, right) {
            (Object::Str(a), Object::Str(b)) => Ok(Object::Str(format!("{}{}", a, b))),
            (Object::List(a), Object::List(b)) => {
                let mut items = a.borrow().clone();
                items.extend(b.borrow().iter().cloned());
                Ok(Object::new_list(items))
            }
            (Object::Tuple(a), Object::Tuple(b)) => {
                let mut items = a.as_ref().clone();
                items.extend(b.iter().cloned());
                Ok(Object::new_tuple(items))
            }
            _ => arithmetic(op, left, right),
        },
        BinOp::Mul => match (left, right) {
            (Object::Str(s), n) | (n, Object::Str(s)) if n.as_int().is_some() => {
                let count = repeat_count(n, s.len())?;
                Ok(Object::Str(s.repeat(count)))
            }
            (Object::List(items), n) | (n, Object::List(items)) if n.as_int().is_some() => {
                let items = items.borrow();
                let count = repeat_count(n, items.len())?;
                Ok(Object::new_list(repeat_items(&items, count)))
            }
            (Object::Tuple(items), n) | (n, Object::Tuple(items)) if n.as_int().is_some() => {
                let count = repeat_count(n, items.len())?;
                Ok(Object::new_tuple(repeat_items(items, count)))
            }
            _ => arithmetic(op, left, right),
        },
        _ => arithmetic(op, left, right),
    }
}

/// `x op= y`: lists extend in place, everything else rebinds
pub fn inplace_op(op: BinOp, left: &Object, right: &Object) -> Result<Object, RuntimeError> {
    if let (BinOp::Add, Object::List(items)) = (op, left) {
        let extra = iterate(right)?;
        items.borrow_mut().extend(extra);
        return Ok(left.clone());
    }
    binary_op(op, left, right)
}

fn repeat_count(n: &Object, unit: usize) -> Result<usize, RuntimeError> {
    let count = usize::try_from(n.as_int().unwrap_or(0).max(0)).unwrap_or(0);
    if unit.saturating_mul(count) > MAX_REPEAT_LEN {
        return Err(RuntimeError::exception(
            ExceptionKind::MemoryError,
            "repetition result too large",
        ));
    }
    Ok(count)
}

fn repeat_items(items: &[Object], count: usize) -> Vec<Object> {
    let mut out = Vec::with_capacity(items.len() * count);
    for _ in 0..count {
        out.extend(items.iter().cloned());
    }
    out
}

fn arithmetic(op: BinOp, left: &Object, right: &Object) -> Result<Object, RuntimeError> {
    if let (Object::Bool(a), Object::Bool(b)) = (left, right) {
        match op {
            BinOp::BitAnd => return Ok(Object::Bool(a & b)),
            BinOp::BitOr => return Ok(Object::Bool(a | b)),
            BinOp::BitXor => return Ok(Object::Bool(a ^ b)),
            _ => {}
        }
    }
    if let (Some(a), Some(b)) = (left.as_int(), right.as_int()) {
        return int_op(op, a, b);
    }
    if let (Some(a), Some(b)) = (left.as_float(), right.as_float()) {
        return float_op(op, a, b).ok_or_else(|| unsupported(op, left, right))?;
    }
    Err(unsupported(op, left, right))
}

fn int_op(op: BinOp, a: i64, b: i64) -> Result<Object, RuntimeError> {
    let value = match op {
        BinOp::Add => a.checked_add(b).ok_or_else(RuntimeError::overflow)?,
        BinOp::Sub => a.checked_sub(b).ok_or_else(RuntimeError::overflow)?,
        BinOp::Mul => a.checked_mul(b).ok_or_else(RuntimeError::overflow)?,
        BinOp::Div => {
            if b == 0 {
                return Err(RuntimeError::zero_division("division by zero"));
            }
            return Ok(Object::Float(a as f64 / b as f64));
        }
        BinOp::FloorDiv => {
            if b == 0 {
                return Err(RuntimeError::zero_division(
                    "integer division or modulo by zero",
                ));
            }
            floor_div(a, b)?
        }
        BinOp::Mod => {
            if b == 0 {
                return Err(RuntimeError::zero_division(
                    "integer division or modulo by zero",
                ));
            }
            floor_mod(a, b)
        }
        BinOp::Pow => {
            if b < 0 {
                if a == 0 {
                    return Err(RuntimeError::zero_division(
                        "0.0 cannot be raised to a negative power",
                    ));
                }
                return Ok(Object::Float((a as f64).powf(b as f64)));
            }
            let exp = u32::try_from(b).map_err(|_| RuntimeError::overflow())?;
            a.checked_pow(exp).ok_or_else(RuntimeError::overflow)?
        }
        BinOp::BitAnd => a & b,
        BinOp::BitOr => a | b,
        BinOp::BitXor => a ^ b,
        BinOp::Shl => {
            if b < 0 {
                return Err(RuntimeError::value_error("negative shift count"));
            }
            if a == 0 {
                0
            } else if b >= 63 {
                return Err(RuntimeError::overflow());
            } else {
                let shifted = a << b;
                if shifted >> b != a {
                    return Err(RuntimeError::overflow());
                }
                shifted
            }
        }
        BinOp::Shr => {
            if b < 0 {
                return Err(RuntimeError::value_error("negative shift count"));
            }
            if b >= 64 {
                if a < 0 {
                    -1
                } else {
                    0
                }
            } else {
                a >> b
            }
        }
    };
    Ok(Object::Int(value))
}

/// Integer division rounding toward negative infinity
fn floor_div(a: i64, b: i64) -> Result<i64, RuntimeError> {
    let q = a.checked_div(b).ok_or_else(RuntimeError::overflow)?;
    if a % b != 0 && ((a < 0) != (b < 0)) {
        Ok(q - 1)
    } else {
        Ok(q)
    }
}

/// Remainder with the sign of the divisor
fn floor_mod(a: i64, b: i64) -> i64 {
    let r = a.wrapping_rem(b);
    if r != 0 && ((r < 0) != (b < 0)) {
        r + b
    } else {
        r
    }
}

/// `None` means the operator does not apply to floats
fn float_op(op: BinOp, a: f64, b: f64) -> Option<Result<Object, RuntimeError>> {
    let value = match op {
        BinOp::Add => a + b,
        BinOp::Sub => a - b,
        BinOp::Mul => a * b,
        BinOp::Div => {
            if b == 0.0 {
                return Some(Err(RuntimeError::zero_division("float division by zero")));
            }
            a / b
        }
        BinOp::FloorDiv => {
            if b == 0.0 {
                return Some(Err(RuntimeError::zero_division(
                    "float floor division by zero",
                )));
            }
            (a / b).floor()
        }
        BinOp::Mod => {
            if b == 0.0 {
                return Some(Err(RuntimeError::zero_division("float modulo")));
            }
            let r = a % b;
            if r != 0.0 && ((r < 0.0) != (b < 0.0)) {
                r + b
            } else {
                r
            }
        }
        BinOp::Pow => {
            if a == 0.0 && b < 0.0 {
                return Some(Err(RuntimeError::zero_division(
                    "0.0 cannot be raised to a negative power",
                )));
            }
            if a < 0.0 && b.fract() != 0.0 {
                return Some(Err(RuntimeError::value_error("math domain error")));
            }
            a.powf(b)
        }
        _ => return None,
    };
    Some(Ok(Object::Float(value)))
}

fn unsupported(op: BinOp, left: &Object, right: &Object) -> RuntimeError {
    let symbol = match op {
        BinOp::Pow => "** or pow()",
        other => other.symbol(),
    };
    RuntimeError::type_error(format!(
        "unsupported operand type(s) for {}: '{}' and '{}'",
        symbol,
        left.type_name(),
        right.type_name()
    ))
}

/// Evaluate one link of a comparison chain
pub fn compare(op: CmpOp, left: &Object, right: &Object) -> Result<bool, RuntimeError> {
    match op {
        CmpOp::Eq => Ok(left == right),
        CmpOp::NotEq => Ok(left != right),
        CmpOp::Lt => Ok(order(left, right, op)? == Some(Ordering::Less)),
        CmpOp::Le => Ok(matches!(
            order(left, right, op)?,
            Some(Ordering::Less | Ordering::Equal)
        )),
        CmpOp::Gt => Ok(order(left, right, op)? == Some(Ordering::Greater)),
        CmpOp::Ge => Ok(matches!(
            order(left, right, op)?,
            Some(Ordering::Greater | Ordering::Equal)
        )),
        CmpOp::In => contains(right, left),
        CmpOp::NotIn => Ok(!contains(right, left)?),
        CmpOp::Is => Ok(left.is_same(right)),
        CmpOp::IsNot => Ok(!left.is_same(right)),
    }
}

/// Total order used by `sorted`, `min` and `max`; unordered floats compare equal
pub fn compare_objects(left: &Object, right: &Object) -> Result<Ordering, RuntimeError> {
    Ok(order(left, right, CmpOp::Lt)?.unwrap_or(Ordering::Equal))
}

fn order(left: &Object, right: &Object, op: CmpOp) -> Result<Option<Ordering>, RuntimeError> {
    match (left, right) {
        (a, b) if a.is_number() && b.is_number() => match (a.as_int(), b.as_int()) {
            (Some(x), Some(y)) => Ok(Some(x.cmp(&y))),
            _ => Ok(a.as_float().partial_cmp(&b.as_float())),
        },
        (Object::Str(a), Object::Str(b)) => Ok(Some(a.cmp(b))),
        (Object::List(a), Object::List(b)) => sequence_order(&a.borrow(), &b.borrow(), op),
        (Object::Tuple(a), Object::Tuple(b)) => sequence_order(a, b, op),
        _ => Err(RuntimeError::type_error(format!(
            "'{}' not supported between instances of '{}' and '{}'",
            op.symbol(),
            left.type_name(),
            right.type_name()
        ))),
    }
}

fn sequence_order(
    left: &[Object],
    right: &[Object],
    op: CmpOp,
) -> Result<Option<Ordering>, RuntimeError> {
    for (a, b) in left.iter().zip(right) {
        if a != b {
            return order(a, b, op);
        }
    }
    Ok(Some(left.len().cmp(&right.len())))
}

/// Membership test for `in`
pub fn contains(container: &Object, item: &Object) -> Result<bool, RuntimeError> {
    match container {
        Object::List(items) => Ok(items.borrow().iter().any(|x| x == item)),
        Object::Tuple(items) => Ok(items.iter().any(|x| x == item)),
        Object::Str(s) => match item {
            Object::Str(sub) => Ok(s.contains(sub.as_str())),
            other => Err(RuntimeError::type_error(format!(
                "'in <string>' requires string as left operand, not {}",
                other.type_name()
            ))),
        },
        Object::Dict(entries) => {
            let key = item.to_key().ok_or_else(|| unhashable(item))?;
            Ok(entries.borrow().contains_key(&key))
        }
        Object::Range { start, stop, step } => {
            let Some(n) = item.as_int() else {
                return Ok(false);
            };
            let in_bounds = if *step > 0 {
                *start <= n && n < *stop
            } else {
                *stop < n && n <= *start
            };
            Ok(in_bounds && (i128::from(n) - i128::from(*start)) % i128::from(*step) == 0)
        }
        other => Err(RuntimeError::type_error(format!(
            "argument of type '{}' is not iterable",
            other.type_name()
        ))),
    }
}

pub fn unhashable(item: &Object) -> RuntimeError {
    RuntimeError::type_error(format!("unhashable type: '{}'", item.type_name()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_floor_division_and_modulo_follow_divisor_sign() {
        let div = binary_op(BinOp::FloorDiv, &Object::Int(-7), &Object::Int(2)).unwrap();
        assert_eq!(div, Object::Int(-4));
        let rem = binary_op(BinOp::Mod, &Object::Int(-7), &Object::Int(2)).unwrap();
        assert_eq!(rem, Object::Int(1));
        let rem = binary_op(BinOp::Mod, &Object::Int(7), &Object::Int(-2)).unwrap();
        assert_eq!(rem, Object::Int(-1));
    }

    #[test]
    fn test_true_division_is_float() {
        let q = binary_op(BinOp::Div, &Object::Int(7), &Object::Int(2)).unwrap();
        assert!(matches!(q, Object::Float(x) if x == 3.5));
    }

    #[test]
    fn test_zero_division() {
        let err = binary_op(BinOp::Div, &Object::Int(1), &Object::Int(0)).unwrap_err();
        assert_eq!(err.kind(), Some(ExceptionKind::ZeroDivisionError));
    }

    #[test]
    fn test_overflow_is_reported() {
        let err = binary_op(BinOp::Mul, &Object::Int(i64::MAX), &Object::Int(2)).unwrap_err();
        assert_eq!(err.kind(), Some(ExceptionKind::OverflowError));
    }

    #[test]
    fn test_mixed_types_rejected() {
        let err = binary_op(BinOp::Add, &Object::Int(1), &Object::str("a")).unwrap_err();
        assert_eq!(err.kind(), Some(ExceptionKind::TypeError));
        assert!(err
            .to_string()
            .contains("unsupported operand type(s) for +: 'int' and 'str'"));
    }

    #[test]
    fn test_repetition() {
        let s = binary_op(BinOp::Mul, &Object::str("ab"), &Object::Int(3)).unwrap();
        assert_eq!(s, Object::str("ababab"));
        let l = binary_op(BinOp::Mul, &Object::Int(2), &Object::new_list(vec![Object::Int(0)]))
            .unwrap();
        assert_eq!(l.repr(), "[0, 0]");
    }

    #[test]
    fn test_shifts() {
        assert_eq!(
            binary_op(BinOp::Shl, &Object::Int(1), &Object::Int(7)).unwrap(),
            Object::Int(128)
        );
        assert_eq!(
            binary_op(BinOp::Shr, &Object::Int(-8), &Object::Int(1)).unwrap(),
            Object::Int(-4)
        );
    }

    #[test]
    fn test_comparisons() {
        assert!(compare(CmpOp::Lt, &Object::Int(1), &Object::Float(1.5)).unwrap());
        assert!(compare(CmpOp::In, &Object::str("pp"), &Object::str("apple")).unwrap());
        assert!(compare(CmpOp::Lt, &Object::str("a"), &Object::Int(1)).is_err());
        let a = Object::new_list(vec![Object::Int(1), Object::Int(2)]);
        let b = Object::new_list(vec![Object::Int(1), Object::Int(3)]);
        assert!(compare(CmpOp::Lt, &a, &b).unwrap());
    }
}
