use super::UnaryOp;
use crate::ast::UnaryNode;
use crate::error::ExpressionResult;
use crate::eval_ctx::EvalCtx;
use crate::evaluate::evaluate;
use crate::value::Value;

pub fn evaluate_unary(node: &UnaryNode, ctx: &EvalCtx<'_>) -> ExpressionResult<Value> {
    let operand = evaluate(&node.operand, ctx)?;
    apply(node.op, operand)
}

/// `+` and `-` coerce to a number, `!` to a boolean and `~` complements the
/// unsigned 64-bit value. Arrays are mapped element-wise; null stays null
/// except under `!`.
pub fn apply(op: UnaryOp, operand: Value) -> ExpressionResult<Value> {
    match operand {
        Value::Array(items) => items
            .into_iter()
            .map(|v| apply(op, v))
            .collect::<ExpressionResult<Vec<_>>>()
            .map(Value::Array),
        Value::Null if op != UnaryOp::Not => Ok(Value::Null),
        v => Ok(match op {
            UnaryOp::Plus => Value::Number(v.as_f64()?),
            UnaryOp::Minus => Value::Number(-v.as_f64()?),
            UnaryOp::Not => Value::Bool(!v.as_bool()?),
            UnaryOp::BitNot => Value::UInt(!v.as_u64()?),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_operators() {
        assert_eq!(apply(UnaryOp::Minus, Value::from("2")).unwrap(), Value::Number(-2.0));
        assert_eq!(apply(UnaryOp::Not, Value::Null).unwrap(), Value::Bool(true));
        assert_eq!(apply(UnaryOp::Minus, Value::Null).unwrap(), Value::Null);
        assert_eq!(apply(UnaryOp::BitNot, Value::UInt(0)).unwrap(), Value::UInt(u64::MAX));
        assert_eq!(
            apply(UnaryOp::Not, Value::Array(vec![true.into(), false.into()])).unwrap(),
            Value::Array(vec![false.into(), true.into()])
        );
    }
}
