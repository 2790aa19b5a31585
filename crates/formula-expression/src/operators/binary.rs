//! Binary operator evaluation.

use super::coercion;
use super::BinaryOp;
use crate::ast::BinaryNode;
use crate::error::{ExpressionError, ExpressionResult};
use crate::eval_ctx::EvalCtx;
use crate::evaluate::evaluate;
use crate::symbols::CaseSensitivity;
use crate::value::{OtherOperand, PendingOperand, Value};

/// Evaluates `left op right`.
///
/// The left side is evaluated first. A custom operand there receives the
/// right side unevaluated; `and`/`or` skip the right side when the left
/// decides the result.
pub fn evaluate_binary(node: &BinaryNode, ctx: &EvalCtx<'_>) -> ExpressionResult<Value> {
    let left = evaluate(&node.left, ctx)?;
    if let Value::Custom(custom) = &left {
        let pending = PendingOperand::new(&node.right, ctx);
        return custom.handle_operation(&node.symbol, OtherOperand::Pending(pending), true);
    }
    if node.op.is_logical() && !left.is_array() {
        let decided = left.as_bool()?;
        match node.op {
            BinaryOp::And if !decided => return Ok(Value::Bool(false)),
            BinaryOp::Or if decided => return Ok(Value::Bool(true)),
            _ => {}
        }
    }
    let right = evaluate(&node.right, ctx)?;
    combine(node.op, &node.symbol, left, right, node.case_sensitivity)
}

/// Applies `op` to two evaluated operands.
///
/// Arrays on the left broadcast element-wise against an array of the same
/// length on the right; comparisons over arrays hold when they hold for every
/// pair.
pub fn combine(
    op: BinaryOp,
    symbol: &str,
    left: Value,
    right: Value,
    case: CaseSensitivity,
) -> ExpressionResult<Value> {
    if let Value::Custom(custom) = &right {
        return custom.handle_operation(symbol, OtherOperand::Evaluated(left), false);
    }
    if let Value::Custom(custom) = &left {
        return custom.handle_operation(symbol, OtherOperand::Evaluated(right), true);
    }
    if op == BinaryOp::In {
        return Ok(Value::Bool(contains(&left, &right, case)));
    }
    match left {
        Value::Array(items) => broadcast(op, symbol, items, right, case),
        left => coercion::scalar(op, symbol, left, right, case),
    }
}

fn broadcast(
    op: BinaryOp,
    symbol: &str,
    left: Vec<Value>,
    right: Value,
    case: CaseSensitivity,
) -> ExpressionResult<Value> {
    let right = match right {
        Value::Array(items) if items.len() == left.len() => items,
        _ => return Err(ExpressionError::array_length()),
    };
    let pairs = left.into_iter().zip(right);
    if op.is_comparison() {
        for (l, r) in pairs {
            if !combine(op, symbol, l, r, case)?.as_bool()? {
                return Ok(Value::Bool(false));
            }
        }
        return Ok(Value::Bool(true));
    }
    pairs
        .map(|(l, r)| combine(op, symbol, l, r, case))
        .collect::<ExpressionResult<Vec<_>>>()
        .map(Value::Array)
}

// `x in [..]`: false for a null needle or a non-array haystack.
fn contains(needle: &Value, haystack: &Value, case: CaseSensitivity) -> bool {
    if needle.is_null() {
        return false;
    }
    let Value::Array(items) = haystack else {
        return false;
    };
    items.iter().any(|item| {
        matches!(
            combine(BinaryOp::Eq, "=", needle.clone(), item.clone(), case),
            Ok(Value::Bool(true))
        )
    })
}
