//! Tree-walking evaluator.

use crate::ast::Node;
use crate::error::ExpressionResult;
use crate::eval_ctx::EvalCtx;
use crate::operators::{binary, functions, unary};
use crate::value::Value;

/// Evaluates a tree against an execution context.
///
/// - Literals and constants are returned as they are.
/// - Variables and declared functions go to the host resolver.
/// - A digit suffix on a variable or constant raises a non-null result to
///   that power.
pub fn evaluate(node: &Node, ctx: &EvalCtx<'_>) -> ExpressionResult<Value> {
    match node {
        Node::Literal(v) => Ok(v.clone()),
        Node::Binary(b) => binary::evaluate_binary(b, ctx),
        Node::Unary(u) => unary::evaluate_unary(u, ctx),
        Node::Array(items) => evaluate_all(items, ctx).map(Value::Array),
        Node::Function(f) => {
            let args = evaluate_all(&f.args, ctx)?;
            ctx.call_function(&f.name, &args)
        }
        Node::Builtin(f) => {
            let args = evaluate_all(&f.args, ctx)?;
            functions::call(f.function, &args)
        }
        Node::Variable(v) => {
            let value = ctx.resolve_variable(&v.name)?;
            apply_power(value, v.power)
        }
        Node::Constant(c) => apply_power(c.value.clone(), c.power),
    }
}

fn evaluate_all(nodes: &[Node], ctx: &EvalCtx<'_>) -> ExpressionResult<Vec<Value>> {
    nodes.iter().map(|n| evaluate(n, ctx)).collect()
}

pub(crate) fn apply_power(value: Value, power: Option<f64>) -> ExpressionResult<Value> {
    match power {
        Some(p) if !value.is_null() => Ok(Value::Number(value.as_f64()?.powf(p))),
        _ => Ok(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operators::BinaryOp;
    use crate::vars::{NoResolver, Vars};

    #[test]
    fn variables_and_powers() {
        let vars = Vars::new().with("x", 3.0).unwrap().with("n", Value::Null).unwrap();
        let ctx = EvalCtx::new(&vars);
        let node = Node::Variable(crate::ast::VariableNode {
            name: "x".into(),
            power: Some(2.0),
        });
        assert_eq!(evaluate(&node, &ctx).unwrap(), Value::Number(9.0));
        let node = Node::Variable(crate::ast::VariableNode {
            name: "n".into(),
            power: Some(2.0),
        });
        assert_eq!(evaluate(&node, &ctx).unwrap(), Value::Null);
    }

    #[test]
    fn arrays_evaluate_each_item() {
        let node = Node::Array(vec![
            Node::literal(1.0),
            Node::binary(BinaryOp::Add, Node::literal(1.0), Node::literal(1.0)),
        ]);
        let ctx = EvalCtx::new(&NoResolver);
        assert_eq!(
            evaluate(&node, &ctx).unwrap(),
            Value::Array(vec![Value::Number(1.0), Value::Number(2.0)])
        );
    }

    #[test]
    fn unresolved_names_fail() {
        let ctx = EvalCtx::new(&NoResolver);
        let err = evaluate(&Node::variable("y"), &ctx).unwrap_err();
        assert_eq!(err.message, "Unable to evaluate expression y");
    }
}
