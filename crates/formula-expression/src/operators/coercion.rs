//! Scalar coercion rules.
//!
//! Checked in order:
//!
//! 1. both operands null;
//! 2. either operand a string, for `+ -`, comparisons and `like`;
//! 3. one operand null;
//! 4. date-times and durations;
//! 5. everything else as numbers.

use super::BinaryOp;
use crate::error::{ExpressionError, ExpressionResult};
use crate::symbols::CaseSensitivity;
use crate::value::Value;
use chrono::{NaiveDateTime, TimeDelta};
use regex::Regex;
use std::cmp::Ordering;

pub fn scalar(
    op: BinaryOp,
    symbol: &str,
    left: Value,
    right: Value,
    case: CaseSensitivity,
) -> ExpressionResult<Value> {
    if op.is_logical() {
        let (l, r) = (left.as_bool()?, right.as_bool()?);
        return Ok(Value::Bool(if op == BinaryOp::And { l && r } else { l || r }));
    }
    if left.is_array() || right.is_array() {
        return Err(ExpressionError::invalid_operator(symbol, "an array and a scalar"));
    }
    match (&left, &right) {
        (Value::Null, Value::Null) => return Ok(both_null(op)),
        (Value::String(_), _) | (_, Value::String(_)) if is_string_op(op) => {
            return strings(op, symbol, &left, &right, case);
        }
        (Value::Null, _) | (_, Value::Null) => return Ok(one_null(op)),
        (Value::DateTime(_) | Value::Duration(_), _) | (_, Value::DateTime(_) | Value::Duration(_)) => {
            return temporal(op, symbol, left, right);
        }
        _ => {}
    }
    numeric(op, symbol, &left, &right)
}

fn is_string_op(op: BinaryOp) -> bool {
    op == BinaryOp::Add || op == BinaryOp::Sub || op.is_comparison()
}

fn both_null(op: BinaryOp) -> Value {
    match op {
        BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Ne => Value::Bool(false),
        BinaryOp::Le | BinaryOp::Ge | BinaryOp::Eq | BinaryOp::Like => Value::Bool(true),
        _ => Value::Null,
    }
}

fn one_null(op: BinaryOp) -> Value {
    match op {
        BinaryOp::Ne => Value::Bool(true),
        op if op.is_comparison() => Value::Bool(false),
        _ => Value::Null,
    }
}

fn compare(op: BinaryOp, ord: Ordering) -> bool {
    match op {
        BinaryOp::Lt => ord == Ordering::Less,
        BinaryOp::Le => ord != Ordering::Greater,
        BinaryOp::Gt => ord == Ordering::Greater,
        BinaryOp::Ge => ord != Ordering::Less,
        BinaryOp::Ne => ord != Ordering::Equal,
        _ => ord == Ordering::Equal,
    }
}

// ---------------------------------------------------------------- Strings

fn strings(
    op: BinaryOp,
    symbol: &str,
    left: &Value,
    right: &Value,
    case: CaseSensitivity,
) -> ExpressionResult<Value> {
    let text = |v: &Value| if v.is_null() { None } else { Some(v.to_string()) };
    let (l, r) = (text(left), text(right));
    match op {
        BinaryOp::Add => return Ok(Value::String(l.unwrap_or_default() + &r.unwrap_or_default())),
        BinaryOp::Sub => return Err(ExpressionError::invalid_operator(symbol, "strings")),
        _ => {}
    }
    let fold = |s: String| {
        if case.contains(CaseSensitivity::STRINGS) {
            s
        } else {
            s.to_uppercase()
        }
    };
    let result = match (l.map(fold), r.map(fold)) {
        (Some(l), Some(r)) if op == BinaryOp::Like => like(&l, &r)?,
        (Some(l), Some(r)) => compare(op, l.cmp(&r)),
        (l, r) => op == BinaryOp::Ne && l != r,
    };
    Ok(Value::Bool(result))
}

/// SQL-style match: `_` is any character, `%` any run of characters, and the
/// pattern may occur anywhere in the value.
fn like(value: &str, pattern: &str) -> ExpressionResult<bool> {
    let body = regex::escape(pattern).replace('_', ".").replace('%', ".*");
    let re = Regex::new(&format!("(?s)^.*{}.*$", body))
        .map_err(|e| ExpressionError::type_error(format!("Invalid like pattern '{}': {}", pattern, e)))?;
    Ok(re.is_match(value))
}

// ------------------------------------------------------------------ Dates

fn temporal(op: BinaryOp, symbol: &str, left: Value, right: Value) -> ExpressionResult<Value> {
    let illegal = || ExpressionError::invalid_operator(symbol, "dates");
    match (left, right) {
        (Value::DateTime(a), Value::DateTime(b)) => match op {
            BinaryOp::Sub => Ok(Value::Duration(a - b)),
            op if op.is_comparison() => Ok(Value::Bool(compare(op, a.cmp(&b)))),
            _ => Err(illegal()),
        },
        (Value::DateTime(d), n) if n.is_numeric() => match op {
            BinaryOp::Add => add_days(d, n.as_f64()?),
            BinaryOp::Sub => add_days(d, -n.as_f64()?),
            _ => Err(illegal()),
        },
        (n, Value::DateTime(d)) if n.is_numeric() && op == BinaryOp::Add => add_days(d, n.as_f64()?),
        (Value::DateTime(d), Value::Duration(t)) => match op {
            BinaryOp::Add => shift(d, t),
            BinaryOp::Sub => shift(d, -t),
            _ => Err(illegal()),
        },
        (Value::Duration(t), Value::DateTime(d)) if op == BinaryOp::Add => shift(d, t),
        (Value::Duration(a), Value::Duration(b)) => match op {
            BinaryOp::Add => a.checked_add(&b).map(Value::Duration).ok_or_else(out_of_range),
            BinaryOp::Sub => a.checked_sub(&b).map(Value::Duration).ok_or_else(out_of_range),
            op if op.is_comparison() => Ok(Value::Bool(compare(op, a.cmp(&b)))),
            _ => Err(illegal()),
        },
        _ => Err(illegal()),
    }
}

fn out_of_range() -> ExpressionError {
    ExpressionError::type_error("Date out of range.")
}

// Fractional days are kept to the millisecond.
fn add_days(date: NaiveDateTime, days: f64) -> ExpressionResult<Value> {
    let millis = (days * 86_400_000.0).round();
    if !millis.is_finite() || millis.abs() >= i64::MAX as f64 {
        return Err(out_of_range());
    }
    let delta = TimeDelta::try_milliseconds(millis as i64).ok_or_else(out_of_range)?;
    shift(date, delta)
}

fn shift(date: NaiveDateTime, delta: TimeDelta) -> ExpressionResult<Value> {
    date.checked_add_signed(delta).map(Value::DateTime).ok_or_else(out_of_range)
}

// ---------------------------------------------------------------- Numbers

fn numeric(op: BinaryOp, symbol: &str, left: &Value, right: &Value) -> ExpressionResult<Value> {
    let value = match op {
        BinaryOp::Add => Value::Number(left.as_f64()? + right.as_f64()?),
        BinaryOp::Sub => Value::Number(left.as_f64()? - right.as_f64()?),
        BinaryOp::Mul => Value::Number(left.as_f64()? * right.as_f64()?),
        BinaryOp::Div => Value::Number(left.as_f64()? / right.as_f64()?),
        BinaryOp::Pow => Value::Number(left.as_f64()?.powf(right.as_f64()?)),
        BinaryOp::Mod => {
            let (a, b) = (left.as_i64()?, right.as_i64()?);
            if b == 0 {
                return Err(ExpressionError::type_error("Division by zero."));
            }
            Value::Int(a.wrapping_rem(b))
        }
        BinaryOp::Shl => Value::Int(left.as_i64()?.wrapping_shl(right.as_i64()? as u32)),
        BinaryOp::Shr => Value::Int(left.as_i64()?.wrapping_shr(right.as_i64()? as u32)),
        BinaryOp::BitAnd => Value::UInt(left.as_u64()? & right.as_u64()?),
        BinaryOp::BitOr => Value::UInt(left.as_u64()? | right.as_u64()?),
        BinaryOp::Xor => Value::UInt(left.as_u64()? ^ right.as_u64()?),
        op if op.is_comparison() => {
            let (a, b) = (left.as_f64()?, right.as_f64()?);
            let result = match op {
                BinaryOp::Lt => a < b,
                BinaryOp::Le => a <= b,
                BinaryOp::Gt => a > b,
                BinaryOp::Ge => a >= b,
                BinaryOp::Ne => a != b,
                _ => a == b,
            };
            Value::Bool(result)
        }
        _ => return Err(ExpressionError::invalid_operator(symbol, left.type_name())),
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn run(op: BinaryOp, l: impl Into<Value>, r: impl Into<Value>) -> ExpressionResult<Value> {
        scalar(op, op.symbol(), l.into(), r.into(), CaseSensitivity::NONE)
    }

    fn date(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(h, 0, 0).unwrap()
    }

    #[test]
    fn null_matrix() {
        assert_eq!(run(BinaryOp::Add, Value::Null, Value::Null).unwrap(), Value::Null);
        assert_eq!(run(BinaryOp::Lt, Value::Null, Value::Null).unwrap(), Value::Bool(false));
        assert_eq!(run(BinaryOp::Ne, Value::Null, Value::Null).unwrap(), Value::Bool(false));
        assert_eq!(run(BinaryOp::Le, Value::Null, Value::Null).unwrap(), Value::Bool(true));
        assert_eq!(run(BinaryOp::Eq, Value::Null, Value::Null).unwrap(), Value::Bool(true));

        assert_eq!(run(BinaryOp::Mul, Value::Null, 2.0).unwrap(), Value::Null);
        assert_eq!(run(BinaryOp::Pow, 2.0, Value::Null).unwrap(), Value::Null);
        assert_eq!(run(BinaryOp::Eq, Value::Null, 2.0).unwrap(), Value::Bool(false));
        assert_eq!(run(BinaryOp::Ne, 2.0, Value::Null).unwrap(), Value::Bool(true));
    }

    #[test]
    fn strings_fold_case_unless_asked() {
        assert_eq!(run(BinaryOp::Eq, "abc", "ABC").unwrap(), Value::Bool(true));
        let sensitive = scalar(BinaryOp::Eq, "=", "abc".into(), "ABC".into(), CaseSensitivity::STRINGS).unwrap();
        assert_eq!(sensitive, Value::Bool(false));
        assert_eq!(run(BinaryOp::Add, "ab", 1.0).unwrap(), Value::from("ab1"));
        assert_eq!(run(BinaryOp::Add, Value::Null, "x").unwrap(), Value::from("x"));
        assert_eq!(run(BinaryOp::Ne, Value::Null, "x").unwrap(), Value::Bool(true));
        assert_eq!(run(BinaryOp::Eq, Value::Null, "x").unwrap(), Value::Bool(false));
        let err = run(BinaryOp::Sub, "a", "b").unwrap_err();
        assert_eq!(err.message, "Operator '-' invalid for strings.");
    }

    #[test]
    fn numeric_strings_multiply() {
        assert_eq!(run(BinaryOp::Mul, "2", "3").unwrap(), Value::Number(6.0));
    }

    #[test]
    fn like_wildcards() {
        assert_eq!(run(BinaryOp::Like, "value1", "val%").unwrap(), Value::Bool(true));
        assert_eq!(run(BinaryOp::Like, "value1", "v_lue").unwrap(), Value::Bool(true));
        assert_eq!(run(BinaryOp::Like, "value1", "x%").unwrap(), Value::Bool(false));
        assert_eq!(run(BinaryOp::Like, "a.b", "a.b").unwrap(), Value::Bool(true));
        assert_eq!(run(BinaryOp::Like, "axb", "a.b").unwrap(), Value::Bool(false));
    }

    #[test]
    fn dates() {
        let d = date(2022, 1, 20, 0);
        assert_eq!(run(BinaryOp::Add, d, 1.5).unwrap(), Value::DateTime(date(2022, 1, 21, 12)));
        assert_eq!(run(BinaryOp::Sub, d, 1.0).unwrap(), Value::DateTime(date(2022, 1, 19, 0)));
        assert_eq!(
            run(BinaryOp::Sub, date(2022, 1, 21, 12), d).unwrap(),
            Value::Duration(TimeDelta::hours(36))
        );
        assert_eq!(run(BinaryOp::Lt, d, date(2023, 1, 1, 0)).unwrap(), Value::Bool(true));
        assert!(run(BinaryOp::Mul, d, 2.0).is_err());
        assert!(run(BinaryOp::Add, d, d).is_err());
    }

    #[test]
    fn integer_operators() {
        assert_eq!(run(BinaryOp::Mod, 7.0, 3.0).unwrap(), Value::Int(1));
        assert_eq!(run(BinaryOp::Shl, 1.0, 4.0).unwrap(), Value::Int(16));
        assert_eq!(run(BinaryOp::Xor, 8.0, 2.0).unwrap(), Value::UInt(10));
        assert!(run(BinaryOp::Mod, 1.0, 0.0).is_err());
        assert!(run(BinaryOp::BitAnd, -1.0, 1.0).is_err());
    }
}
